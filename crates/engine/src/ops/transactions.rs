use std::collections::HashMap;

use sea_orm::{
    ActiveModelTrait, Condition, DatabaseTransaction, QueryFilter, QueryOrder, prelude::*,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    EngineError, ResultEngine, Transaction, TransactionKind, categories, transactions, util,
    validation, wallets,
};

use super::{
    Engine,
    balances::{apply_effects, effects_of, revert_effects},
    with_tx,
};

/// Filters for listing transactions. Every field that is set narrows the
/// result.
///
/// Both date bounds are inclusive; a date-only `end_date` covers that whole
/// day.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionFilter {
    /// Matches the wallet on either side of a transfer.
    pub wallet_id: Option<String>,
    pub category_id: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<TransactionKind>,
}

/// A transaction with the display fields of what it references.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDetails {
    #[serde(flatten)]
    pub transaction: Transaction,
    pub category_name: Option<String>,
    pub category_icon: Option<String>,
    pub category_background: Option<String>,
    pub wallet_name: Option<String>,
    pub second_wallet_name: Option<String>,
}

/// Date bounds of a [`TransactionFilter`] in canonical form.
struct DateBounds {
    start: Option<String>,
    end: Option<String>,
}

impl TransactionFilter {
    fn bounds(&self) -> ResultEngine<DateBounds> {
        let parse = |label: &str, raw: &str, normalize: fn(&str) -> Option<String>| {
            normalize(raw).ok_or_else(|| {
                EngineError::invalid(format!("{label} must be an ISO-8601 date, got '{raw}'"))
            })
        };
        Ok(DateBounds {
            start: self
                .start_date
                .as_deref()
                .map(|raw| parse("startDate", raw, util::normalize_date))
                .transpose()?,
            end: self
                .end_date
                .as_deref()
                .map(|raw| parse("endDate", raw, util::normalize_end_bound))
                .transpose()?,
        })
    }
}

trait ApplyTxFilters: QueryFilter + Sized {
    fn apply_tx_filters(self, filter: &TransactionFilter, bounds: &DateBounds) -> Self;
}

impl<T> ApplyTxFilters for T
where
    T: QueryFilter + Sized,
{
    fn apply_tx_filters(mut self, filter: &TransactionFilter, bounds: &DateBounds) -> Self {
        if let Some(wallet_id) = &filter.wallet_id {
            self = self.filter(
                Condition::any()
                    .add(transactions::Column::WalletId.eq(wallet_id.as_str()))
                    .add(transactions::Column::SecondWalletId.eq(wallet_id.as_str())),
            );
        }
        if let Some(category_id) = &filter.category_id {
            self = self.filter(transactions::Column::CategoryId.eq(category_id.as_str()));
        }
        if let Some(start) = &bounds.start {
            self = self.filter(transactions::Column::OccurredAt.gte(start.as_str()));
        }
        if let Some(end) = &bounds.end {
            self = self.filter(transactions::Column::OccurredAt.lte(end.as_str()));
        }
        if let Some(kind) = filter.kind {
            self = self.filter(transactions::Column::Kind.eq(kind.as_str()));
        }
        self
    }
}

/// Fails with [`EngineError::NotFound`] when the transaction points at a
/// category or wallet that does not exist.
async fn ensure_references(db_tx: &DatabaseTransaction, tx: &Transaction) -> ResultEngine<()> {
    if let Some(category_id) = tx.category_id.as_deref()
        && categories::Entity::find_by_id(category_id)
            .one(db_tx)
            .await?
            .is_none()
    {
        return Err(EngineError::NotFound(format!("category {category_id}")));
    }

    let wallet_ids = std::iter::once(tx.wallet_id.as_str()).chain(tx.second_wallet_id.as_deref());
    for wallet_id in wallet_ids {
        if wallets::Entity::find_by_id(wallet_id)
            .one(db_tx)
            .await?
            .is_none()
        {
            return Err(EngineError::NotFound(format!("wallet {wallet_id}")));
        }
    }
    Ok(())
}

async fn stored_transaction(db_tx: &DatabaseTransaction, id: &str) -> ResultEngine<Transaction> {
    let model = transactions::Entity::find_by_id(id)
        .one(db_tx)
        .await?
        .ok_or_else(|| EngineError::NotFound(format!("transaction {id}")))?;
    Transaction::try_from(model)
}

impl Engine {
    /// Stores a transaction and applies its balance effects atomically.
    pub async fn create_transaction<T: Serialize + ?Sized>(
        &self,
        data: &T,
    ) -> ResultEngine<Transaction> {
        self.ensure_initialized()?;
        let tx = Transaction::from_input(&validation::to_raw(data)?)?;

        with_tx!(self, |db_tx| {
            if transactions::Entity::find_by_id(tx.id.as_str())
                .one(&db_tx)
                .await?
                .is_some()
            {
                return Err(EngineError::ExistingKey(tx.id.clone()));
            }
            ensure_references(&db_tx, &tx).await?;

            let model: transactions::ActiveModel = (&tx).into();
            model
                .insert(&db_tx)
                .await
                .map_err(|err| EngineError::from_insert(err, &tx.id))?;
            apply_effects(&db_tx, &tx.balance_effects()?).await?;

            info!(
                transaction_id = %tx.id,
                kind = tx.kind.as_str(),
                amount = %tx.amount,
                "transaction created"
            );
            Ok(tx)
        })
    }

    /// Replaces a transaction.
    ///
    /// The effects of the stored version are reverted before the new ones are
    /// applied, so any change of amount, type or wallets is accounted for.
    pub async fn update_transaction<T: Serialize + ?Sized>(
        &self,
        data: &T,
    ) -> ResultEngine<Transaction> {
        self.ensure_initialized()?;
        let tx = Transaction::from_input(&validation::to_raw(data)?)?;

        with_tx!(self, |db_tx| {
            let previous = stored_transaction(&db_tx, &tx.id).await?;
            ensure_references(&db_tx, &tx).await?;

            revert_effects(&db_tx, &effects_of(&previous)?).await?;
            let model: transactions::ActiveModel = (&tx).into();
            model.update(&db_tx).await?;
            apply_effects(&db_tx, &tx.balance_effects()?).await?;

            info!(transaction_id = %tx.id, "transaction updated");
            Ok(tx)
        })
    }

    /// Reverts the balance effects of a transaction and deletes it.
    pub async fn delete_transaction(&self, id: &str) -> ResultEngine<()> {
        self.ensure_initialized()?;
        with_tx!(self, |db_tx| {
            let previous = stored_transaction(&db_tx, id).await?;
            revert_effects(&db_tx, &effects_of(&previous)?).await?;
            transactions::Entity::delete_by_id(id).exec(&db_tx).await?;

            info!(transaction_id = id, "transaction deleted");
            Ok(())
        })
    }

    pub async fn transaction(&self, id: &str) -> ResultEngine<Transaction> {
        self.ensure_initialized()?;
        let model = transactions::Entity::find_by_id(id)
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("transaction {id}")))?;
        Transaction::try_from(model)
    }

    /// Lists transactions matching `filter`, newest first.
    ///
    /// Before init the result is empty. An unparsable date bound is a
    /// validation error.
    pub async fn transactions(
        &self,
        filter: &TransactionFilter,
    ) -> ResultEngine<Vec<TransactionDetails>> {
        if !self.readable("transactions") {
            return Ok(Vec::new());
        }
        let bounds = filter.bounds()?;

        let rows: Vec<(transactions::Model, Option<categories::Model>)> =
            transactions::Entity::find()
                .find_also_related(categories::Entity)
                .apply_tx_filters(filter, &bounds)
                .order_by_desc(transactions::Column::OccurredAt)
                .order_by_desc(transactions::Column::Id)
                .all(&self.database)
                .await?;

        let wallet_names: HashMap<String, String> = wallets::Entity::find()
            .all(&self.database)
            .await?
            .into_iter()
            .map(|model| (model.id, model.name))
            .collect();
        debug!(count = rows.len(), ?filter, "transactions loaded");

        rows.into_iter()
            .map(|(model, category)| {
                let transaction = Transaction::try_from(model)?;
                let (category_name, category_icon, category_background) = match category {
                    Some(c) => (Some(c.name), c.icon, c.background),
                    None => (None, None, None),
                };
                Ok(TransactionDetails {
                    wallet_name: wallet_names.get(&transaction.wallet_id).cloned(),
                    second_wallet_name: transaction
                        .second_wallet_id
                        .as_ref()
                        .and_then(|id| wallet_names.get(id).cloned()),
                    category_name,
                    category_icon,
                    category_background,
                    transaction,
                })
            })
            .collect()
    }
}
