use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

use chrono::DateTime;
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection, EntityTrait, PaginatorTrait};
use serde::Serialize;
use tracing::{debug, error, info};

use crate::{EngineError, ResultEngine};

mod analytics;
mod balances;
mod categories;
mod maintenance;
mod transactions;
mod wallets;

pub use analytics::{CategoryTotal, WalletTotal};
pub use transactions::{TransactionDetails, TransactionFilter};

/// Run a block inside a DB transaction, committing on success and rolling
/// back on error.
///
/// The block is evaluated as its own async scope, so `?` inside it lands here
/// and the error is returned unchanged after the rollback.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = sea_orm::TransactionTrait::begin(&$self.database).await?;
        let result: $crate::ResultEngine<_> = async { $body }.await;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = $tx.rollback().await {
                    tracing::error!(%rollback_err, "rollback failed");
                }
                tracing::debug!(%err, "transaction rolled back");
                Err(err)
            }
        }
    }};
}

pub(crate) use with_tx;

/// Storage handle over one SQLite database.
///
/// Built once with [`Engine::builder`] and passed by reference. Nothing but
/// [`Engine::init`] and [`Engine::database_status`] is usable until the
/// schema has been migrated: reads return empty results, writes fail with
/// [`EngineError::NotInitialized`].
#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
    initialized: AtomicBool,
    schema_version: AtomicI32,
}

/// One row of the migration history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedMigration {
    pub version: i32,
    pub name: String,
    pub applied_at: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TableCounts {
    pub categories: u64,
    pub wallets: u64,
    pub transactions: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseStatus {
    pub initialized: bool,
    pub schema_version: i32,
    /// Newest first.
    pub migrations: Vec<AppliedMigration>,
    pub counts: TableCounts,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// Applies every pending migration.
    ///
    /// Calling it again is a no-op. When a migration fails the engine stays
    /// uninitialized and [`EngineError::Initialization`] is returned.
    pub async fn init(&self) -> ResultEngine<()> {
        if self.is_initialized() {
            debug!("storage already initialized");
            return Ok(());
        }

        Migrator::up(&self.database, None).await.map_err(|err| {
            error!(%err, "migration failed");
            EngineError::Initialization(err.to_string())
        })?;

        let history = self
            .migration_history()
            .await
            .map_err(|err| EngineError::Initialization(err.to_string()))?;
        let version = history.first().map_or(0, |m| m.version);

        self.schema_version.store(version, Ordering::SeqCst);
        self.initialized.store(true, Ordering::SeqCst);
        info!(schema_version = version, "storage initialized");
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    pub fn schema_version(&self) -> i32 {
        self.schema_version.load(Ordering::SeqCst)
    }

    /// Initialization flag, schema version, migration history and row counts.
    pub async fn database_status(&self) -> ResultEngine<DatabaseStatus> {
        if !self.is_initialized() {
            return Ok(DatabaseStatus::default());
        }

        let db = &self.database;
        Ok(DatabaseStatus {
            initialized: true,
            schema_version: self.schema_version(),
            migrations: self.migration_history().await?,
            counts: TableCounts {
                categories: crate::categories::Entity::find().count(db).await?,
                wallets: crate::wallets::Entity::find().count(db).await?,
                transactions: crate::transactions::Entity::find().count(db).await?,
            },
        })
    }

    async fn migration_history(&self) -> ResultEngine<Vec<AppliedMigration>> {
        let models = Migrator::get_migration_models(&self.database).await?;
        let mut history: Vec<AppliedMigration> = models
            .into_iter()
            .map(|model| AppliedMigration {
                version: migration::schema_version(&model.version).unwrap_or(0),
                applied_at: DateTime::from_timestamp(model.applied_at, 0)
                    .map(|at| at.to_rfc3339())
                    .unwrap_or_default(),
                name: model.version,
            })
            .collect();
        history.sort_by(|a, b| b.version.cmp(&a.version));
        Ok(history)
    }

    /// Fails with [`EngineError::NotInitialized`] before [`Engine::init`].
    fn ensure_initialized(&self) -> ResultEngine<()> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(EngineError::NotInitialized)
        }
    }

    /// Guard for read paths: logs and reports whether the read may go on.
    fn readable(&self, what: &str) -> bool {
        let ready = self.is_initialized();
        if !ready {
            tracing::warn!("{what} requested before init, returning an empty result");
        }
        ready
    }
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: Option<DatabaseConnection>,
    url: Option<String>,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = Some(db);
        self
    }

    /// Connect to `url` at build time instead of passing a connection.
    pub fn url(mut self, url: impl Into<String>) -> EngineBuilder {
        self.url = Some(url.into());
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        let database = match (self.database, self.url) {
            (Some(db), _) => db,
            (None, Some(url)) => {
                let mut options = ConnectOptions::new(url);
                options.sqlx_logging(false);
                Database::connect(options)
                    .await
                    .map_err(|err| EngineError::Initialization(err.to_string()))?
            }
            (None, None) => {
                return Err(EngineError::Initialization(
                    "no database connection configured".to_string(),
                ));
            }
        };

        Ok(Engine {
            database,
            initialized: AtomicBool::new(false),
            schema_version: AtomicI32::new(0),
        })
    }
}
