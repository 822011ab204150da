//! Aggregates over the ledger.
//!
//! Group totals are signed by the effect on the primary wallet: income adds,
//! expense and transfer subtract.

use sea_orm::{
    ConnectionTrait, FromQueryResult, QuerySelect, Statement, prelude::*, sea_query::Expr,
};
use serde::Serialize;
use tracing::{debug, warn};

use crate::{EngineError, MoneyCents, ResultEngine, Violations, util, wallets};

use super::Engine;

const TOTALS_BY_CATEGORY: &str = r#"
SELECT t.category_id AS group_id,
       c.name AS group_name,
       SUM(CASE WHEN t.kind = 'income' THEN t.amount_minor ELSE -t.amount_minor END) AS total,
       COUNT(*) AS count
FROM transactions t
LEFT JOIN categories c ON t.category_id = c.id
WHERE t.occurred_at >= ? AND t.occurred_at <= ?
GROUP BY t.category_id, c.name
ORDER BY total DESC, group_name ASC
"#;

const TOTALS_BY_WALLET: &str = r#"
SELECT t.wallet_id AS group_id,
       w.name AS group_name,
       SUM(CASE WHEN t.kind = 'income' THEN t.amount_minor ELSE -t.amount_minor END) AS total,
       COUNT(*) AS count
FROM transactions t
LEFT JOIN wallets w ON t.wallet_id = w.id
WHERE t.occurred_at >= ? AND t.occurred_at <= ?
GROUP BY t.wallet_id, w.name
ORDER BY total DESC, group_name ASC
"#;

#[derive(Debug, FromQueryResult)]
struct GroupRow {
    group_id: Option<String>,
    group_name: Option<String>,
    total: i64,
    count: i64,
}

/// Signed total of the transactions in one category. Transfers and
/// transactions whose category was deleted share the `None` group.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryTotal {
    pub category_id: Option<String>,
    pub category_name: Option<String>,
    pub total: MoneyCents,
    pub count: u64,
}

/// Signed total of the transactions whose primary wallet is `wallet_id`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletTotal {
    pub wallet_id: String,
    pub wallet_name: Option<String>,
    pub total: MoneyCents,
    pub count: u64,
}

/// Validates an inclusive date range into canonical bounds.
fn date_range(start: &str, end: &str) -> ResultEngine<(String, String)> {
    let mut violations = Vec::new();
    let mut bound = |label: &str, raw: &str, normalize: fn(&str) -> Option<String>| {
        if raw.trim().is_empty() {
            violations.push(format!("{label} is required"));
            return None;
        }
        let parsed = normalize(raw);
        if parsed.is_none() {
            violations.push(format!("{label} must be an ISO-8601 date"));
        }
        parsed
    };
    let start = bound("startDate", start, util::normalize_date);
    let end = bound("endDate", end, util::normalize_end_bound);

    match (start, end) {
        (Some(start), Some(end)) if start <= end => Ok((start, end)),
        (Some(_), Some(_)) => Err(EngineError::invalid(
            "startDate must not be after endDate",
        )),
        _ => Err(EngineError::Validation(Violations(violations))),
    }
}

impl Engine {
    /// Sum of every wallet balance. Zero before init or on a storage error.
    pub async fn total_balance(&self) -> MoneyCents {
        if !self.readable("total balance") {
            return MoneyCents::ZERO;
        }
        let total: Result<Option<Option<i64>>, DbErr> = wallets::Entity::find()
            .select_only()
            .column_as(Expr::col(wallets::Column::Balance).sum(), "total")
            .into_tuple()
            .one(&self.database)
            .await;
        match total {
            Ok(total) => MoneyCents::new(total.flatten().unwrap_or(0)),
            Err(err) => {
                warn!(%err, "failed to compute total balance, returning 0");
                MoneyCents::ZERO
            }
        }
    }

    /// Per-category totals over `[start, end]`, highest total first.
    pub async fn transactions_by_category(
        &self,
        start: &str,
        end: &str,
    ) -> ResultEngine<Vec<CategoryTotal>> {
        let rows = self.group_totals(TOTALS_BY_CATEGORY, start, end).await?;
        Ok(rows
            .into_iter()
            .map(|row| CategoryTotal {
                category_id: row.group_id,
                category_name: row.group_name,
                total: MoneyCents::new(row.total),
                count: row.count.try_into().unwrap_or_default(),
            })
            .collect())
    }

    /// Per-wallet totals over `[start, end]`, highest total first.
    pub async fn transactions_by_wallet(
        &self,
        start: &str,
        end: &str,
    ) -> ResultEngine<Vec<WalletTotal>> {
        let rows = self.group_totals(TOTALS_BY_WALLET, start, end).await?;
        Ok(rows
            .into_iter()
            .map(|row| WalletTotal {
                wallet_id: row.group_id.unwrap_or_default(),
                wallet_name: row.group_name,
                total: MoneyCents::new(row.total),
                count: row.count.try_into().unwrap_or_default(),
            })
            .collect())
    }

    async fn group_totals(&self, sql: &str, start: &str, end: &str) -> ResultEngine<Vec<GroupRow>> {
        let (start, end) = date_range(start, end)?;
        if !self.readable("grouped totals") {
            return Ok(Vec::new());
        }

        let stmt = Statement::from_sql_and_values(
            self.database.get_database_backend(),
            sql,
            [start.clone().into(), end.clone().into()],
        );
        let rows = GroupRow::find_by_statement(stmt).all(&self.database).await?;
        debug!(%start, %end, groups = rows.len(), "grouped totals computed");
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_only_end_covers_the_whole_day() {
        let (start, end) = date_range("2025-01-01", "2025-01-31").unwrap();
        assert_eq!(start, "2025-01-01T00:00:00.000Z");
        assert_eq!(end, "2025-01-31T23:59:59.999Z");
    }

    #[test]
    fn missing_bounds_are_reported_together() {
        assert_eq!(
            date_range("", " ").unwrap_err(),
            EngineError::Validation(Violations(vec![
                "startDate is required".to_string(),
                "endDate is required".to_string(),
            ]))
        );
        assert_eq!(
            date_range("2025-01-01", "soon").unwrap_err(),
            EngineError::invalid("endDate must be an ISO-8601 date")
        );
    }

    #[test]
    fn reversed_range_is_rejected() {
        assert_eq!(
            date_range("2025-02-01", "2025-01-01").unwrap_err(),
            EngineError::invalid("startDate must not be after endDate")
        );
    }
}
