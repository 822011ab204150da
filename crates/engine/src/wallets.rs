//! The module contains `Wallet` struct and its implementation.

use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};

use crate::{
    EngineError, MoneyCents, ResultEngine,
    validation::{self, FieldRule},
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WalletKind {
    Credit,
    #[default]
    Debit,
    Cash,
}

impl WalletKind {
    pub const NAMES: &'static [&'static str] = &["credit", "debit", "cash"];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Credit => "credit",
            Self::Debit => "debit",
            Self::Cash => "cash",
        }
    }
}

impl TryFrom<&str> for WalletKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "credit" => Ok(Self::Credit),
            "debit" => Ok(Self::Debit),
            "cash" => Ok(Self::Cash),
            other => Err(EngineError::Integrity(format!(
                "invalid wallet kind: {other}"
            ))),
        }
    }
}

pub(crate) const WALLET_SCHEMA: &[FieldRule] = &[
    FieldRule::string("id").required(),
    FieldRule::string("name").required().length(1, 100),
    FieldRule::number("balance").default_int(0),
    FieldRule::string("icon"),
    FieldRule::string("background"),
    FieldRule::string("type")
        .one_of(WalletKind::NAMES)
        .default_str("debit"),
];

/// Same as [`WALLET_SCHEMA`] without defaults: an absent balance or type
/// stays absent so the stored one is kept.
pub(crate) const WALLET_UPDATE_SCHEMA: &[FieldRule] = &[
    FieldRule::string("id").required(),
    FieldRule::string("name").required().length(1, 100),
    FieldRule::number("balance"),
    FieldRule::string("icon"),
    FieldRule::string("background"),
    FieldRule::string("type").one_of(WalletKind::NAMES),
];

/// A wallet.
///
/// A wallet is a representation of a real wallet, a bank account, a credit
/// card or anything else where money is kept. Its balance is the running sum
/// of every transaction that touches it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Wallet {
    pub id: String,
    pub name: String,
    pub balance: MoneyCents,
    pub icon: Option<String>,
    pub background: Option<String>,
    #[serde(rename = "type")]
    pub kind: WalletKind,
}

impl Wallet {
    /// Validates a raw record into a new wallet.
    pub(crate) fn from_input(raw: &serde_json::Value) -> ResultEngine<Self> {
        let mut report = validation::validate(raw, WALLET_SCHEMA);
        report.money("balance");
        report.finish()
    }
}

/// Validated input of a wallet update.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WalletUpdate {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub balance: Option<MoneyCents>,
    pub icon: Option<String>,
    pub background: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<WalletKind>,
}

impl WalletUpdate {
    pub(crate) fn from_input(raw: &serde_json::Value) -> ResultEngine<Self> {
        let mut report = validation::validate(raw, WALLET_UPDATE_SCHEMA);
        report.money("balance");
        report.finish()
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "wallets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub balance: i64,
    /// Balance the wallet had before any recorded transaction.
    pub opening_balance: i64,
    pub icon: Option<String>,
    pub background: Option<String>,
    pub kind: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::transactions::Entity")]
    Transactions,
}

impl Related<super::transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Wallet> for ActiveModel {
    /// A new wallet starts with no transactions, so its opening balance is
    /// its balance.
    fn from(value: &Wallet) -> Self {
        Self {
            id: ActiveValue::Set(value.id.clone()),
            name: ActiveValue::Set(value.name.clone()),
            balance: ActiveValue::Set(value.balance.cents()),
            opening_balance: ActiveValue::Set(value.balance.cents()),
            icon: ActiveValue::Set(value.icon.clone()),
            background: ActiveValue::Set(value.background.clone()),
            kind: ActiveValue::Set(value.kind.as_str().to_string()),
        }
    }
}

impl TryFrom<Model> for Wallet {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            kind: WalletKind::try_from(model.kind.as_str())?,
            id: model.id,
            name: model.name,
            balance: MoneyCents::new(model.balance),
            icon: model.icon,
            background: model.background,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn new_wallet_defaults() {
        let wallet = Wallet::from_input(&json!({"id": "w1", "name": "Cash"})).unwrap();
        assert_eq!(wallet.balance, MoneyCents::ZERO);
        assert_eq!(wallet.kind, WalletKind::Debit);
    }

    #[test]
    fn balance_keeps_cents_exactly() {
        let wallet = Wallet::from_input(
            &json!({"id": "w1", "name": "Card", "balance": -450.1, "type": "credit"}),
        )
        .unwrap();
        assert_eq!(wallet.balance.cents(), -45010);
        assert_eq!(wallet.kind, WalletKind::Credit);
    }

    #[test]
    fn update_without_balance_leaves_it_unset() {
        let update = WalletUpdate::from_input(&json!({"id": "w1", "name": "Renamed"})).unwrap();
        assert_eq!(update.balance, None);
        assert_eq!(update.kind, None);

        let update =
            WalletUpdate::from_input(&json!({"id": "w1", "name": "Renamed", "balance": 10}))
                .unwrap();
        assert_eq!(update.balance, Some(MoneyCents::new(1000)));
    }

    #[test]
    fn bad_kind_and_long_name_are_both_reported() {
        let err = Wallet::from_input(&json!({
            "id": "w1",
            "name": "x".repeat(101),
            "balance": "lots",
            "type": "gold",
        }))
        .unwrap_err();
        assert_eq!(
            err,
            EngineError::Validation(crate::Violations(vec![
                "name must be at most 100 characters".to_string(),
                "balance must be a number".to_string(),
                "type must be one of: credit, debit, cash".to_string(),
            ]))
        );
    }
}
