//! Adds `wallets.opening_balance`.
//!
//! The opening balance is the part of a wallet balance that no transaction
//! explains (the amount the wallet was created with, plus manual
//! adjustments). With it the ledger invariant reads
//! `balance = opening_balance + Σ transaction effects`, which lets balances
//! be rebuilt from the transactions table.
//!
//! Existing rows are back-filled from the current balance minus the effect
//! of every stored transaction.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum Wallets {
    Table,
    OpeningBalance,
}

const BACKFILL_OPENING_BALANCE: &str = r#"
UPDATE wallets SET opening_balance = balance
    - COALESCE((
        SELECT SUM(CASE WHEN t.kind = 'income' THEN t.amount_minor ELSE -t.amount_minor END)
        FROM transactions t
        WHERE t.wallet_id = wallets.id
    ), 0)
    - COALESCE((
        SELECT SUM(t.amount_minor)
        FROM transactions t
        WHERE t.kind = 'transfer' AND t.second_wallet_id = wallets.id
    ), 0)
"#;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // SQLite has no `ADD COLUMN IF NOT EXISTS`.
        if manager.has_column("wallets", "opening_balance").await? {
            return Ok(());
        }

        manager
            .alter_table(
                Table::alter()
                    .table(Wallets::Table)
                    .add_column(
                        ColumnDef::new(Wallets::OpeningBalance)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared(BACKFILL_OPENING_BALANCE)
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        if !manager.has_column("wallets", "opening_balance").await? {
            return Ok(());
        }

        manager
            .alter_table(
                Table::alter()
                    .table(Wallets::Table)
                    .drop_column(Wallets::OpeningBalance)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }
}
