//! The module contains the errors the engine can return.
//!
//! Callers are expected to branch on the kind:
//!
//! - [`Validation`] carries every violation found in the input; nothing was
//!   written.
//! - [`NotFound`] means the targeted id does not exist.
//! - [`Constraint`] is a business rule refusal (e.g. deleting a wallet that
//!   still has transactions) and deserves its own message in the UI.
//! - [`NotInitialized`] and [`Initialization`] mean the schema is not usable
//!   yet; nothing else will work until [`Engine::init`] succeeds.
//!
//!  [`Validation`]: EngineError::Validation
//!  [`NotFound`]: EngineError::NotFound
//!  [`Constraint`]: EngineError::Constraint
//!  [`NotInitialized`]: EngineError::NotInitialized
//!  [`Initialization`]: EngineError::Initialization
//!  [`Engine::init`]: crate::Engine::init
use std::fmt;

use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Storage is not initialized, call init() first")]
    NotInitialized,
    #[error("Failed to initialize storage: {0}")]
    Initialization(String),
    #[error("Validation failed: {0}")]
    Validation(Violations),
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0}")]
    Constraint(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error("Data integrity error: {0}")]
    Integrity(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl EngineError {
    /// Shortcut for a validation error with a single violation.
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::Validation(Violations(vec![message.into()]))
    }

    /// Maps a unique-constraint failure to [`EngineError::ExistingKey`];
    /// every other database error is kept as is.
    pub(crate) fn from_insert(err: DbErr, key: &str) -> Self {
        match err.sql_err() {
            Some(sea_orm::SqlErr::UniqueConstraintViolation(_)) => {
                Self::ExistingKey(key.to_string())
            }
            _ => Self::Database(err),
        }
    }
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::NotInitialized, Self::NotInitialized) => true,
            (Self::Initialization(a), Self::Initialization(b)) => a == b,
            (Self::Validation(a), Self::Validation(b)) => a == b,
            (Self::NotFound(a), Self::NotFound(b)) => a == b,
            (Self::Constraint(a), Self::Constraint(b)) => a == b,
            (Self::ExistingKey(a), Self::ExistingKey(b)) => a == b,
            (Self::Integrity(a), Self::Integrity(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}

/// Every rule an input record broke, in schema order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Violations(pub Vec<String>);

impl Violations {
    pub fn messages(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, message: &str) -> bool {
        self.0.iter().any(|m| m == message)
    }
}

impl fmt::Display for Violations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(", "))
    }
}
