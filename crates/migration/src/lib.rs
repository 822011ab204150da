pub use sea_orm_migration::prelude::*;

mod m20250301_000001_initial_schema;
mod m20250315_000002_wallet_opening_balance;

/// Table recording applied migrations (`version` = migration name,
/// `applied_at` = unix seconds).
pub const MIGRATION_TABLE: &str = "migrations";

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_initial_schema::Migration),
            Box::new(m20250315_000002_wallet_opening_balance::Migration),
        ]
    }

    fn migration_table_name() -> DynIden {
        Alias::new(MIGRATION_TABLE).into_iden()
    }
}

/// Numeric schema version of a migration: its 1-based position in
/// [`Migrator::migrations`]. Returns `None` for names this binary does not
/// know about.
pub fn schema_version(name: &str) -> Option<i32> {
    Migrator::migrations()
        .iter()
        .position(|migration| migration.name() == name)
        .and_then(|index| <i32 as TryFrom<usize>>::try_from(index + 1).ok())
}

/// Schema version reached once every known migration is applied.
pub fn latest_schema_version() -> i32 {
    <i32 as TryFrom<usize>>::try_from(Migrator::migrations().len()).unwrap_or(i32::MAX)
}

/// Highest schema version recorded in [`MIGRATION_TABLE`], `0` on an empty
/// database.
pub async fn applied_schema_version<C>(db: &C) -> Result<i32, DbErr>
where
    C: ConnectionTrait,
{
    let applied = Migrator::get_migration_models(db).await?;
    Ok(applied
        .iter()
        .filter_map(|model| schema_version(&model.version))
        .max()
        .unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use sea_orm::{ConnectionTrait, Database, Statement};

    use super::*;

    #[test]
    fn versions_follow_declaration_order() {
        assert_eq!(
            schema_version("m20250301_000001_initial_schema"),
            Some(1)
        );
        assert_eq!(
            schema_version("m20250315_000002_wallet_opening_balance"),
            Some(2)
        );
        assert_eq!(schema_version("m20990101_000000_unknown"), None);
        assert_eq!(latest_schema_version(), 2);
    }

    #[tokio::test]
    async fn up_twice_records_each_migration_once() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        Migrator::up(&db, None).await.unwrap();

        let backend = db.get_database_backend();
        let row = db
            .query_one(Statement::from_string(
                backend,
                format!("SELECT COUNT(*) AS count FROM {MIGRATION_TABLE}"),
            ))
            .await
            .unwrap()
            .unwrap();
        let count: i64 = row.try_get("", "count").unwrap();
        assert_eq!(count, 2);
        assert!(Migrator::get_pending_migrations(&db).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn applied_version_tracks_up_and_down() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        assert_eq!(applied_schema_version(&db).await.unwrap(), 0);

        Migrator::up(&db, Some(1)).await.unwrap();
        assert_eq!(applied_schema_version(&db).await.unwrap(), 1);

        Migrator::up(&db, None).await.unwrap();
        assert_eq!(
            applied_schema_version(&db).await.unwrap(),
            latest_schema_version()
        );

        Migrator::down(&db, Some(1)).await.unwrap();
        assert_eq!(applied_schema_version(&db).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn opening_balance_is_backfilled_from_existing_ledger() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&db, Some(1)).await.unwrap();

        db.execute_unprepared(
            "INSERT INTO wallets (id, name, balance, kind) VALUES ('w1', 'Main', 1500, 'debit');
             INSERT INTO wallets (id, name, balance, kind) VALUES ('w2', 'Savings', 300, 'debit');
             INSERT INTO transactions (id, amount_minor, wallet_id, occurred_at, title, kind)
                 VALUES ('t1', 500, 'w1', '2025-01-01T00:00:00.000Z', 'Rent', 'expense');
             INSERT INTO transactions (id, amount_minor, wallet_id, second_wallet_id, occurred_at, title, kind)
                 VALUES ('t2', 200, 'w1', 'w2', '2025-01-02T00:00:00.000Z', 'Save', 'transfer');",
        )
        .await
        .unwrap();

        Migrator::up(&db, None).await.unwrap();

        let backend = db.get_database_backend();
        let rows = db
            .query_all(Statement::from_string(
                backend,
                "SELECT id, opening_balance FROM wallets ORDER BY id".to_string(),
            ))
            .await
            .unwrap();
        let opening: Vec<(String, i64)> = rows
            .iter()
            .map(|row| {
                (
                    row.try_get("", "id").unwrap(),
                    row.try_get("", "opening_balance").unwrap(),
                )
            })
            .collect();
        assert_eq!(
            opening,
            vec![("w1".to_string(), 2200), ("w2".to_string(), 100)]
        );
    }
}
