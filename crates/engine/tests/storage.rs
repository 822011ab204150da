use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};
use serde_json::json;

use engine::{
    CategoryKind, DatabaseStatus, Engine, EngineError, MoneyCents, TransactionFilter, Violations,
    WalletKind,
};

async fn engine_without_init() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    (engine, db)
}

async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let (engine, db) = engine_without_init().await;
    engine.init().await.unwrap();
    (engine, db)
}

#[tokio::test]
async fn init_twice_keeps_one_record_per_migration() {
    let (engine, db) = engine_with_db().await;
    engine.init().await.unwrap();

    // A second handle over the same database finds nothing left to apply.
    let other = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    other.init().await.unwrap();

    let status = engine.database_status().await.unwrap();
    assert!(status.initialized);
    assert_eq!(status.schema_version, migration::latest_schema_version());
    assert_eq!(other.schema_version(), status.schema_version);
    assert_eq!(
        status
            .migrations
            .iter()
            .map(|m| (m.version, m.name.as_str()))
            .collect::<Vec<_>>(),
        [
            (2, "m20250315_000002_wallet_opening_balance"),
            (1, "m20250301_000001_initial_schema"),
        ]
    );

    let row = db
        .query_one(Statement::from_string(
            db.get_database_backend(),
            "SELECT COUNT(*) AS n FROM migrations",
        ))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.try_get::<i64>("", "n").unwrap(), 2);
}

#[tokio::test]
async fn failed_migration_leaves_the_engine_uninitialized() {
    let (engine, db) = engine_without_init().await;
    // A foreign `wallets` table without a balance column breaks the back-fill.
    db.execute_unprepared("CREATE TABLE wallets (id TEXT PRIMARY KEY)")
        .await
        .unwrap();

    let err = engine.init().await.unwrap_err();
    assert!(matches!(err, EngineError::Initialization(_)), "{err:?}");
    assert!(!engine.is_initialized());
    assert_eq!(
        engine
            .create_category(&json!({"id": "c1", "name": "Food", "type": "expense"}))
            .await
            .unwrap_err(),
        EngineError::NotInitialized
    );
}

#[tokio::test]
async fn unreachable_database_fails_to_build() {
    let err = Engine::builder()
        .url("sqlite:/definitely/missing/dir/walletbook.db")
        .build()
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Initialization(_)), "{err:?}");
}

#[tokio::test]
async fn uninitialized_store_reads_empty_and_refuses_writes() {
    let (engine, _db) = engine_without_init().await;

    assert_eq!(engine.total_balance().await, MoneyCents::ZERO);
    assert!(engine.categories().await.is_empty());
    assert!(engine.wallets().await.is_empty());
    assert!(
        engine
            .transactions(&TransactionFilter::default())
            .await
            .unwrap()
            .is_empty()
    );
    assert_eq!(
        engine.database_status().await.unwrap(),
        DatabaseStatus::default()
    );

    assert_eq!(
        engine
            .create_wallet(&json!({"id": "w1", "name": "Cash"}))
            .await
            .unwrap_err(),
        EngineError::NotInitialized
    );
    assert_eq!(
        engine.delete_wallet("w1").await.unwrap_err(),
        EngineError::NotInitialized
    );
    assert_eq!(
        engine.clear_all_data().await.unwrap_err(),
        EngineError::NotInitialized
    );
}

#[tokio::test]
async fn category_violations_are_aggregated() {
    let (engine, _db) = engine_with_db().await;

    let err = engine
        .create_category(&json!({"id": "c1", "name": "", "type": "gift"}))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::Validation(Violations(vec![
            "name is required".to_string(),
            "type must be one of: expense, income".to_string(),
        ]))
    );
    assert!(engine.categories().await.is_empty());
}

#[tokio::test]
async fn category_crud() {
    let (engine, _db) = engine_with_db().await;

    let created = engine
        .create_category(&json!({
            "id": "c1",
            "name": "Food",
            "icon": "restaurant",
            "background": "#FF6B6B",
            "type": "expense",
            "unknown": 1,
        }))
        .await
        .unwrap();
    assert_eq!(created.icon.as_deref(), Some("restaurant"));

    let err = engine
        .create_category(&json!({"id": "c1", "name": "Again", "type": "expense"}))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::ExistingKey("c1".to_string()));

    let updated = engine
        .update_category(&json!({"id": "c1", "name": "Groceries", "type": "expense"}))
        .await
        .unwrap();
    assert_eq!(updated.icon, None);
    assert_eq!(engine.categories().await, [updated]);

    let err = engine
        .update_category(&json!({"id": "c2", "name": "Rent", "type": "expense"}))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::NotFound("category c2".to_string()));

    engine.delete_category("c1").await.unwrap();
    assert_eq!(
        engine.delete_category("c1").await.unwrap_err(),
        EngineError::NotFound("category c1".to_string())
    );
}

#[tokio::test]
async fn deleting_a_category_keeps_its_transactions() {
    let (engine, _db) = engine_with_db().await;
    engine
        .create_category(&json!({"id": "c1", "name": "Food", "type": "expense"}))
        .await
        .unwrap();
    engine
        .create_wallet(&json!({"id": "w1", "name": "Cash", "type": "cash"}))
        .await
        .unwrap();
    engine
        .create_transaction(&json!({
            "id": "t1",
            "amount": 8,
            "categoryId": "c1",
            "walletId": "w1",
            "date": "2025-03-01",
            "title": "Pizza",
            "type": "expense",
        }))
        .await
        .unwrap();

    engine.delete_category("c1").await.unwrap();

    let tx = engine.transaction("t1").await.unwrap();
    assert_eq!(tx.category_id, None);
    assert_eq!(engine.wallet("w1").await.unwrap().balance.cents(), -800);
}

#[tokio::test]
async fn wallet_crud_and_manual_adjustment() {
    let (engine, _db) = engine_with_db().await;

    let created = engine
        .create_wallet(&json!({"id": "w1", "name": "Card", "balance": -450, "type": "credit"}))
        .await
        .unwrap();
    assert_eq!(created.kind, WalletKind::Credit);
    assert_eq!(created.balance.cents(), -45000);

    let defaults = engine
        .create_wallet(&json!({"id": "w2", "name": "Jar"}))
        .await
        .unwrap();
    assert_eq!(defaults.kind, WalletKind::Debit);
    assert_eq!(defaults.balance, MoneyCents::ZERO);

    engine
        .create_category(&json!({"id": "c1", "name": "Shopping", "type": "expense"}))
        .await
        .unwrap();
    engine
        .create_transaction(&json!({
            "id": "t1",
            "amount": 120,
            "categoryId": "c1",
            "walletId": "w1",
            "date": "2025-03-02",
            "title": "Groceries",
            "type": "expense",
        }))
        .await
        .unwrap();

    // No balance and no type in the update: both stored values are kept.
    let renamed = engine
        .update_wallet(&json!({"id": "w1", "name": "Visa"}))
        .await
        .unwrap();
    assert_eq!(renamed.name, "Visa");
    assert_eq!(renamed.kind, WalletKind::Credit);
    assert_eq!(renamed.balance.cents(), -57000);
    assert_eq!(engine.wallet("w1").await.unwrap(), renamed);

    let retyped = engine
        .update_wallet(&json!({"id": "w2", "name": "Jar", "type": "cash"}))
        .await
        .unwrap();
    assert_eq!(retyped.kind, WalletKind::Cash);

    // An explicit balance is an adjustment that survives a recompute.
    let adjusted = engine
        .update_wallet(&json!({"id": "w1", "name": "Visa", "balance": -500, "type": "credit"}))
        .await
        .unwrap();
    assert_eq!(adjusted.balance.cents(), -50000);
    assert_eq!(engine.recompute_balances().await.unwrap(), 0);
    assert_eq!(engine.wallet("w1").await.unwrap().balance.cents(), -50000);

    assert_eq!(
        engine
            .update_wallet(&json!({"id": "w9", "name": "Nope"}))
            .await
            .unwrap_err(),
        EngineError::NotFound("wallet w9".to_string())
    );

    engine.delete_wallet("w2").await.unwrap();
    assert_eq!(
        engine.delete_wallet("w2").await.unwrap_err(),
        EngineError::NotFound("wallet w2".to_string())
    );
    assert_eq!(
        engine.wallet("w2").await.unwrap_err(),
        EngineError::NotFound("wallet w2".to_string())
    );
}

#[tokio::test]
async fn recompute_repairs_drifted_balances() {
    let (engine, db) = engine_with_db().await;
    engine
        .create_wallet(&json!({"id": "w1", "name": "Cash", "balance": 10}))
        .await
        .unwrap();
    engine
        .create_category(&json!({"id": "c1", "name": "Salary", "type": "income"}))
        .await
        .unwrap();
    engine
        .create_transaction(&json!({
            "id": "t1",
            "amount": 5,
            "categoryId": "c1",
            "walletId": "w1",
            "date": "2025-03-02",
            "title": "Tip",
            "type": "income",
        }))
        .await
        .unwrap();

    db.execute_unprepared("UPDATE wallets SET balance = 0 WHERE id = 'w1'")
        .await
        .unwrap();

    assert_eq!(engine.recompute_balances().await.unwrap(), 1);
    assert_eq!(engine.wallet("w1").await.unwrap().balance.cents(), 1500);
    assert_eq!(engine.recompute_balances().await.unwrap(), 0);
}

#[tokio::test]
async fn clear_keeps_schema_and_reset_rebuilds_it() {
    let (engine, _db) = engine_with_db().await;
    engine.seed_sample_data().await.unwrap();

    engine.clear_all_data().await.unwrap();
    let status = engine.database_status().await.unwrap();
    assert_eq!(status.counts.categories, 0);
    assert_eq!(status.counts.wallets, 0);
    assert_eq!(status.counts.transactions, 0);
    assert_eq!(status.migrations.len(), 2);

    engine.seed_sample_data().await.unwrap();
    engine.reset_database().await.unwrap();
    assert!(engine.is_initialized());
    let status = engine.database_status().await.unwrap();
    assert_eq!(status.counts.wallets, 0);
    assert_eq!(status.schema_version, 2);
    assert_eq!(status.migrations.len(), 2);
}

#[tokio::test]
async fn seed_produces_consistent_sample_data() {
    let (engine, _db) = engine_without_init().await;

    // Seeding initializes the storage on its own.
    let status = engine.seed_sample_data().await.unwrap();
    assert!(status.initialized);
    assert_eq!(status.counts.categories, 5);
    assert_eq!(status.counts.wallets, 4);
    assert_eq!(status.counts.transactions, 4);

    let wallets = engine.wallets().await;
    let balance_of = |name: &str| {
        wallets
            .iter()
            .find(|w| w.name == name)
            .map(|w| w.balance.cents())
            .unwrap()
    };
    assert_eq!(balance_of("Main Checking"), 547_450);
    assert_eq!(balance_of("Savings Account"), 1_550_000);
    assert_eq!(balance_of("Credit Card"), -57_000);
    assert_eq!(balance_of("Cash Wallet"), 12_000);
    assert_eq!(engine.total_balance().await.cents(), 2_052_450);

    let income = engine
        .categories()
        .await
        .into_iter()
        .filter(|c| c.kind == CategoryKind::Income)
        .count();
    assert_eq!(income, 2);

    // Seeding again replaces the data instead of adding to it.
    let status = engine.seed_sample_data().await.unwrap();
    assert_eq!(status.counts.transactions, 4);
    assert_eq!(engine.recompute_balances().await.unwrap(), 0);
}
