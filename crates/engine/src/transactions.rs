//! Transaction primitives.
//!
//! A `Transaction` is a single financial event that changes the balance of
//! one wallet (expense, income) or moves money between two (transfer). The
//! amount is stored as a magnitude; the sign of each balance change comes
//! from the kind, see [`Transaction::balance_effects`].

use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};

use crate::{
    EngineError, MoneyCents, ResultEngine, util,
    validation::{self, FieldRule},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Expense,
    Income,
    Transfer,
}

impl TransactionKind {
    pub const NAMES: &'static [&'static str] = &["expense", "income", "transfer"];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Expense => "expense",
            Self::Income => "income",
            Self::Transfer => "transfer",
        }
    }
}

impl TryFrom<&str> for TransactionKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "expense" => Ok(Self::Expense),
            "income" => Ok(Self::Income),
            "transfer" => Ok(Self::Transfer),
            other => Err(EngineError::Integrity(format!(
                "invalid transaction kind: {other}"
            ))),
        }
    }
}

pub(crate) const TRANSACTION_SCHEMA: &[FieldRule] = &[
    FieldRule::string("id").required(),
    FieldRule::number("amount").required(),
    FieldRule::string("categoryId"),
    FieldRule::string("walletId").required(),
    FieldRule::string("secondWalletId"),
    FieldRule::string("date").required(),
    FieldRule::string("title").required().length(1, 200),
    FieldRule::string("description")
        .max_length(500)
        .default_str(""),
    FieldRule::string("type")
        .required()
        .one_of(TransactionKind::NAMES),
];

/// A signed change to one wallet balance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BalanceEffect {
    pub wallet_id: String,
    pub delta: MoneyCents,
}

impl BalanceEffect {
    fn new(wallet_id: &str, delta: MoneyCents) -> Self {
        Self {
            wallet_id: wallet_id.to_string(),
            delta,
        }
    }

    /// The change that undoes this one.
    #[must_use]
    pub fn inverse(&self) -> Self {
        Self {
            wallet_id: self.wallet_id.clone(),
            delta: -self.delta,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    /// Magnitude of the transaction, never negative.
    pub amount: MoneyCents,
    pub category_id: Option<String>,
    pub wallet_id: String,
    pub second_wallet_id: Option<String>,
    /// Canonical UTC timestamp, `YYYY-MM-DDTHH:MM:SS.mmmZ`.
    pub date: String,
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
}

impl Transaction {
    /// Validates a raw record into a transaction.
    ///
    /// On top of the schema rules:
    /// - the amount must be non-zero with at most two decimals, and its sign
    ///   is dropped
    /// - the date must be ISO-8601 and is normalised to UTC
    /// - expense and income need a category and never keep a second wallet
    /// - a transfer needs a second wallet, different from the first, and
    ///   never keeps a category
    pub(crate) fn from_input(raw: &serde_json::Value) -> ResultEngine<Self> {
        let mut report = validation::validate(raw, TRANSACTION_SCHEMA);

        if let Some(amount) = report.money("amount") {
            if amount.is_zero() {
                report.violate("amount must not be zero");
            } else {
                report.set("amount", amount.abs().to_string());
            }
        }

        if let Some(date) = report.str("date").map(str::to_owned) {
            match util::normalize_date(&date) {
                Some(canonical) => report.set("date", canonical),
                None => report.violate("date must be an ISO-8601 date"),
            }
        }

        let wallet_id = report.non_empty_str("walletId").map(str::to_owned);
        let kind = report.str("type").map(str::to_owned);
        match kind.as_deref() {
            Some("transfer") => {
                report.remove("categoryId");
                let second = report.non_empty_str("secondWalletId").map(str::to_owned);
                match second {
                    None => {
                        report.violate("secondWalletId is required for transfer transactions")
                    }
                    Some(second) if Some(&second) == wallet_id.as_ref() => {
                        report.violate("secondWalletId must differ from walletId")
                    }
                    Some(_) => {}
                }
            }
            Some(kind @ ("expense" | "income")) => {
                report.remove("secondWalletId");
                if report.non_empty_str("categoryId").is_none() {
                    report.violate(format!("categoryId is required for {kind} transactions"));
                }
            }
            // Unknown kinds were already reported by the schema pass.
            _ => {}
        }

        report.finish()
    }

    /// Balance changes this transaction applies.
    ///
    /// | kind     | wallet     | second wallet |
    /// |----------|------------|---------------|
    /// | expense  | −amount    |               |
    /// | income   | +amount    |               |
    /// | transfer | −amount    | +amount       |
    ///
    /// A stored transfer without a second wallet is an integrity error.
    pub fn balance_effects(&self) -> ResultEngine<Vec<BalanceEffect>> {
        let amount = self.amount.abs();
        match self.kind {
            TransactionKind::Expense => Ok(vec![BalanceEffect::new(&self.wallet_id, -amount)]),
            TransactionKind::Income => Ok(vec![BalanceEffect::new(&self.wallet_id, amount)]),
            TransactionKind::Transfer => {
                let second = self.second_wallet_id.as_deref().ok_or_else(|| {
                    EngineError::Integrity(format!(
                        "transfer {} has no secondWalletId",
                        self.id
                    ))
                })?;
                Ok(vec![
                    BalanceEffect::new(&self.wallet_id, -amount),
                    BalanceEffect::new(second, amount),
                ])
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub amount_minor: i64,
    pub category_id: Option<String>,
    pub wallet_id: String,
    pub second_wallet_id: Option<String>,
    pub occurred_at: String,
    pub title: String,
    pub description: String,
    pub kind: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::categories::Entity",
        from = "Column::CategoryId",
        to = "super::categories::Column::Id",
        on_update = "NoAction",
        on_delete = "SetNull"
    )]
    Category,
    #[sea_orm(
        belongs_to = "super::wallets::Entity",
        from = "Column::WalletId",
        to = "super::wallets::Column::Id",
        on_update = "NoAction",
        on_delete = "Restrict"
    )]
    Wallet,
    #[sea_orm(
        belongs_to = "super::wallets::Entity",
        from = "Column::SecondWalletId",
        to = "super::wallets::Column::Id",
        on_update = "NoAction",
        on_delete = "Restrict"
    )]
    SecondWallet,
}

impl Related<super::categories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl Related<super::wallets::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Wallet.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Transaction> for ActiveModel {
    fn from(tx: &Transaction) -> Self {
        Self {
            id: ActiveValue::Set(tx.id.clone()),
            amount_minor: ActiveValue::Set(tx.amount.abs().cents()),
            category_id: ActiveValue::Set(tx.category_id.clone()),
            wallet_id: ActiveValue::Set(tx.wallet_id.clone()),
            second_wallet_id: ActiveValue::Set(tx.second_wallet_id.clone()),
            occurred_at: ActiveValue::Set(tx.date.clone()),
            title: ActiveValue::Set(tx.title.clone()),
            description: ActiveValue::Set(tx.description.clone()),
            kind: ActiveValue::Set(tx.kind.as_str().to_string()),
        }
    }
}

impl TryFrom<Model> for Transaction {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            kind: TransactionKind::try_from(model.kind.as_str())?,
            id: model.id,
            amount: MoneyCents::new(model.amount_minor),
            category_id: model.category_id,
            wallet_id: model.wallet_id,
            second_wallet_id: model.second_wallet_id,
            date: model.occurred_at,
            title: model.title,
            description: model.description,
        })
    }
}
