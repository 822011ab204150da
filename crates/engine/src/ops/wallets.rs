use sea_orm::{
    ActiveModelTrait, ActiveValue, Condition, PaginatorTrait, QueryFilter, QueryOrder, prelude::*,
};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    EngineError, MoneyCents, ResultEngine, Wallet, transactions, validation, wallets,
    wallets::WalletUpdate,
};

use super::{Engine, with_tx};

impl Engine {
    /// Validates and stores a new wallet. The given balance becomes its
    /// opening balance.
    pub async fn create_wallet<T: Serialize + ?Sized>(&self, data: &T) -> ResultEngine<Wallet> {
        self.ensure_initialized()?;
        let wallet = Wallet::from_input(&validation::to_raw(data)?)?;

        with_tx!(self, |db_tx| {
            if wallets::Entity::find_by_id(wallet.id.as_str())
                .one(&db_tx)
                .await?
                .is_some()
            {
                return Err(EngineError::ExistingKey(wallet.id.clone()));
            }
            let model: wallets::ActiveModel = (&wallet).into();
            model
                .insert(&db_tx)
                .await
                .map_err(|err| EngineError::from_insert(err, &wallet.id))?;
            Ok(())
        })?;

        info!(wallet_id = %wallet.id, balance = %wallet.balance, "wallet created");
        Ok(wallet)
    }

    /// Every wallet, by name.
    ///
    /// Never fails: before init or on a storage error the result is empty and
    /// a warning is logged.
    pub async fn wallets(&self) -> Vec<Wallet> {
        if !self.readable("wallets") {
            return Vec::new();
        }
        match self.load_wallets().await {
            Ok(wallets) => wallets,
            Err(err) => {
                warn!(%err, "failed to read wallets, returning an empty list");
                Vec::new()
            }
        }
    }

    async fn load_wallets(&self) -> ResultEngine<Vec<Wallet>> {
        let models = wallets::Entity::find()
            .order_by_asc(wallets::Column::Name)
            .all(&self.database)
            .await?;
        debug!(count = models.len(), "wallets loaded");
        models.into_iter().map(Wallet::try_from).collect()
    }

    /// Return a wallet snapshot from DB.
    pub async fn wallet(&self, id: &str) -> ResultEngine<Wallet> {
        self.ensure_initialized()?;
        let model = wallets::Entity::find_by_id(id)
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("wallet {id}")))?;
        Wallet::try_from(model)
    }

    /// Updates name, icon, background and type of a wallet.
    ///
    /// Without a `type` the stored one is kept, and the same holds for
    /// `balance`. An explicit balance is a
    /// manual adjustment: the opening balance moves by the same amount, so the
    /// balance still equals opening balance plus the ledger.
    pub async fn update_wallet<T: Serialize + ?Sized>(&self, data: &T) -> ResultEngine<Wallet> {
        self.ensure_initialized()?;
        let update = WalletUpdate::from_input(&validation::to_raw(data)?)?;

        with_tx!(self, |db_tx| {
            let current = wallets::Entity::find_by_id(update.id.as_str())
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::NotFound(format!("wallet {}", update.id)))?;

            let stored = MoneyCents::new(current.balance);
            let balance = update.balance.unwrap_or(stored);
            let adjustment = balance - stored;
            let opening_balance = MoneyCents::new(current.opening_balance)
                .checked_add(adjustment)
                .ok_or_else(|| {
                    EngineError::Constraint(format!(
                        "opening balance of wallet {} would overflow",
                        update.id
                    ))
                })?;
            if !adjustment.is_zero() {
                info!(wallet_id = %update.id, %adjustment, "manual balance adjustment");
            }

            let kind = match update.kind {
                Some(kind) => kind.as_str().to_string(),
                None => current.kind,
            };
            let model = wallets::ActiveModel {
                id: ActiveValue::Unchanged(current.id),
                name: ActiveValue::Set(update.name.clone()),
                balance: ActiveValue::Set(balance.cents()),
                opening_balance: ActiveValue::Set(opening_balance.cents()),
                icon: ActiveValue::Set(update.icon.clone()),
                background: ActiveValue::Set(update.background.clone()),
                kind: ActiveValue::Set(kind),
            };
            let model = model.update(&db_tx).await?;
            Wallet::try_from(model)
        })
    }

    /// Deletes a wallet that no transaction references.
    ///
    /// A wallet used as `walletId` or `secondWalletId` by any transaction is
    /// refused with [`EngineError::Constraint`] and left untouched.
    pub async fn delete_wallet(&self, id: &str) -> ResultEngine<()> {
        self.ensure_initialized()?;
        with_tx!(self, |db_tx| {
            let referencing = transactions::Entity::find()
                .filter(
                    Condition::any()
                        .add(transactions::Column::WalletId.eq(id))
                        .add(transactions::Column::SecondWalletId.eq(id)),
                )
                .count(&db_tx)
                .await?;
            if referencing > 0 {
                debug!(wallet_id = id, referencing, "wallet delete refused");
                return Err(EngineError::Constraint(
                    "Cannot delete wallet with existing transactions".to_string(),
                ));
            }

            let result = wallets::Entity::delete_by_id(id).exec(&db_tx).await?;
            if result.rows_affected == 0 {
                return Err(EngineError::NotFound(format!("wallet {id}")));
            }

            info!(wallet_id = id, "wallet deleted");
            Ok(())
        })
    }
}
