//! Schema tool for the walletbook database.
//!
//! `DATABASE_URL` selects the database, `./walletbook.db` otherwise.
use sea_orm::{Database, DatabaseConnection};
use sea_orm_migration::prelude::*;

use migration::{Migrator, applied_schema_version, latest_schema_version, schema_version};

const DEFAULT_URL: &str = "sqlite:./walletbook.db?mode=rwc";
const USAGE: &str = "usage: migration [up|down|fresh|status]";

async fn print_status(db: &DatabaseConnection) -> Result<(), DbErr> {
    for model in Migrator::get_migration_models(db).await? {
        let version = schema_version(&model.version)
            .map_or_else(|| "?".to_string(), |v| v.to_string());
        println!("applied  v{version:<3} {} (at {})", model.version, model.applied_at);
    }
    for pending in Migrator::get_pending_migrations(db).await? {
        let version = schema_version(pending.name())
            .map_or_else(|| "?".to_string(), |v| v.to_string());
        println!("pending  v{version:<3} {}", pending.name());
    }
    print_version(db).await
}

async fn print_version(db: &DatabaseConnection) -> Result<(), DbErr> {
    println!(
        "schema version {} of {}",
        applied_schema_version(db).await?,
        latest_schema_version()
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let command = std::env::args().nth(1).unwrap_or_else(|| "up".to_string());
    if !matches!(command.as_str(), "up" | "down" | "fresh" | "status") {
        eprintln!("{USAGE}");
        std::process::exit(2);
    }

    let url = std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_URL.to_string());
    let db = Database::connect(&url).await?;

    match command.as_str() {
        "up" => {
            Migrator::up(&db, None).await?;
            print_version(&db).await?;
        }
        // Rolls back the most recent migration only.
        "down" => {
            Migrator::down(&db, Some(1)).await?;
            print_version(&db).await?;
        }
        "fresh" => {
            Migrator::fresh(&db).await?;
            print_version(&db).await?;
        }
        _ => print_status(&db).await?,
    }

    Ok(())
}
