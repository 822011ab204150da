//! Categories label transactions as a kind of expense or income.
//!
//! Transactions only reference a category; deleting one leaves the
//! transactions in place with `category_id` set to `NULL`.

use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};

use crate::{
    EngineError, ResultEngine,
    validation::{self, FieldRule},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryKind {
    Expense,
    Income,
}

impl CategoryKind {
    pub const NAMES: &'static [&'static str] = &["expense", "income"];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Expense => "expense",
            Self::Income => "income",
        }
    }
}

impl TryFrom<&str> for CategoryKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "expense" => Ok(Self::Expense),
            "income" => Ok(Self::Income),
            other => Err(EngineError::Integrity(format!(
                "invalid category kind: {other}"
            ))),
        }
    }
}

pub(crate) const CATEGORY_SCHEMA: &[FieldRule] = &[
    FieldRule::string("id").required(),
    FieldRule::string("name").required().length(1, 100),
    FieldRule::string("icon"),
    FieldRule::string("background"),
    FieldRule::string("type").required().one_of(CategoryKind::NAMES),
];

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    pub icon: Option<String>,
    pub background: Option<String>,
    #[serde(rename = "type")]
    pub kind: CategoryKind,
}

impl Category {
    /// Validates a raw record into a category.
    pub(crate) fn from_input(raw: &serde_json::Value) -> ResultEngine<Self> {
        validation::validate(raw, CATEGORY_SCHEMA).finish()
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "categories")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
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

impl From<&Category> for ActiveModel {
    fn from(value: &Category) -> Self {
        Self {
            id: ActiveValue::Set(value.id.clone()),
            name: ActiveValue::Set(value.name.clone()),
            icon: ActiveValue::Set(value.icon.clone()),
            background: ActiveValue::Set(value.background.clone()),
            kind: ActiveValue::Set(value.kind.as_str().to_string()),
        }
    }
}

impl TryFrom<Model> for Category {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            kind: CategoryKind::try_from(model.kind.as_str())?,
            id: model.id,
            name: model.name,
            icon: model.icon,
            background: model.background,
        })
    }
}
