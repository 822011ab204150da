use std::collections::HashMap;

use sea_orm::{DatabaseTransaction, QueryFilter, QueryOrder, prelude::*, sea_query::Expr};
use tracing::{debug, error, info, warn};

use crate::{
    BalanceEffect, EngineError, MoneyCents, ResultEngine, Transaction, transactions, wallets,
};

use super::{Engine, with_tx};

/// Balance effects of a stored transaction, logging integrity problems.
pub(super) fn effects_of(tx: &Transaction) -> ResultEngine<Vec<BalanceEffect>> {
    tx.balance_effects().inspect_err(|err| {
        error!(transaction_id = %tx.id, %err, "stored transaction is inconsistent");
    })
}

fn overflow(wallet_id: &str) -> EngineError {
    EngineError::Constraint(format!("balance of wallet {wallet_id} would overflow"))
}

async fn store_balance(
    db_tx: &DatabaseTransaction,
    wallet_id: &str,
    balance: MoneyCents,
) -> ResultEngine<()> {
    wallets::Entity::update_many()
        .col_expr(wallets::Column::Balance, Expr::value(balance.cents()))
        .filter(wallets::Column::Id.eq(wallet_id))
        .exec(db_tx)
        .await?;
    Ok(())
}

/// Adds each delta to its wallet balance.
///
/// A wallet that does not exist aborts the surrounding transaction with
/// [`EngineError::NotFound`], a sum that leaves the `i64` range with
/// [`EngineError::Constraint`].
pub(super) async fn apply_effects(
    db_tx: &DatabaseTransaction,
    effects: &[BalanceEffect],
) -> ResultEngine<()> {
    for effect in effects {
        let wallet = wallets::Entity::find_by_id(effect.wallet_id.as_str())
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("wallet {}", effect.wallet_id)))?;
        let balance = MoneyCents::new(wallet.balance)
            .checked_add(effect.delta)
            .ok_or_else(|| overflow(&effect.wallet_id))?;
        store_balance(db_tx, &effect.wallet_id, balance).await?;
        debug!(wallet_id = %effect.wallet_id, delta = %effect.delta, %balance, "balance adjusted");
    }
    Ok(())
}

/// Undoes `effects`, see [`apply_effects`].
pub(super) async fn revert_effects(
    db_tx: &DatabaseTransaction,
    effects: &[BalanceEffect],
) -> ResultEngine<()> {
    let inverse: Vec<BalanceEffect> = effects.iter().map(BalanceEffect::inverse).collect();
    apply_effects(db_tx, &inverse).await
}

impl Engine {
    /// Rebuilds every wallet balance from the ledger as
    /// `opening_balance + Σ effects`.
    ///
    /// Runs as one atomic unit and returns how many wallets had drifted.
    pub async fn recompute_balances(&self) -> ResultEngine<u64> {
        self.ensure_initialized()?;
        with_tx!(self, |db_tx| {
            let wallet_models: Vec<wallets::Model> = wallets::Entity::find().all(&db_tx).await?;
            let mut expected: HashMap<String, MoneyCents> = wallet_models
                .iter()
                .map(|m| (m.id.clone(), MoneyCents::new(m.opening_balance)))
                .collect();

            let tx_models: Vec<transactions::Model> = transactions::Entity::find()
                .order_by_asc(transactions::Column::OccurredAt)
                .all(&db_tx)
                .await?;
            for model in tx_models {
                let tx = Transaction::try_from(model)?;
                for effect in effects_of(&tx)? {
                    let balance = expected.get_mut(&effect.wallet_id).ok_or_else(|| {
                        EngineError::Integrity(format!(
                            "transaction {} references missing wallet {}",
                            tx.id, effect.wallet_id
                        ))
                    })?;
                    *balance = balance
                        .checked_add(effect.delta)
                        .ok_or_else(|| overflow(&effect.wallet_id))?;
                }
            }

            let mut drifted = 0;
            for model in wallet_models {
                let balance = expected.get(&model.id).copied().unwrap_or_default();
                if balance.cents() == model.balance {
                    continue;
                }
                warn!(
                    wallet_id = %model.id,
                    stored = model.balance,
                    expected = balance.cents(),
                    "wallet balance drifted"
                );
                store_balance(&db_tx, &model.id, balance).await?;
                drifted += 1;
            }

            info!(drifted, "balances recomputed");
            Ok(drifted)
        })
    }
}
