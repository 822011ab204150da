use std::sync::atomic::Ordering;

use migration::{Migrator, MigratorTrait};
use sea_orm::prelude::*;
use tracing::{error, info};

use crate::{EngineError, ResultEngine, categories, transactions, wallets};

use super::{Engine, with_tx};

impl Engine {
    /// Deletes every category, wallet and transaction in one atomic unit.
    /// The schema and its migration history are kept.
    pub async fn clear_all_data(&self) -> ResultEngine<()> {
        self.ensure_initialized()?;
        with_tx!(self, |db_tx| {
            let removed_transactions = transactions::Entity::delete_many()
                .exec(&db_tx)
                .await?
                .rows_affected;
            let removed_categories = categories::Entity::delete_many()
                .exec(&db_tx)
                .await?
                .rows_affected;
            let removed_wallets = wallets::Entity::delete_many()
                .exec(&db_tx)
                .await?
                .rows_affected;

            info!(
                removed_transactions,
                removed_categories, removed_wallets, "all data cleared"
            );
            Ok(())
        })
    }

    /// Drops every table and rebuilds the schema from the first migration.
    pub async fn reset_database(&self) -> ResultEngine<()> {
        if self.is_initialized() {
            self.clear_all_data().await?;
        }
        self.initialized.store(false, Ordering::SeqCst);

        Migrator::fresh(&self.database).await.map_err(|err| {
            error!(%err, "schema reset failed");
            EngineError::Initialization(err.to_string())
        })?;
        info!("schema rebuilt");
        self.init().await
    }
}
