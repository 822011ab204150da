use clap::{Args, Parser, Subcommand, ValueEnum};
use engine::{Engine, TransactionFilter, TransactionKind};
use serde::Serialize;

use crate::{error::Result, settings::Settings};

mod error;
mod settings;

#[derive(Parser, Debug)]
#[command(name = "walletbook")]
#[command(about = "Local storage utilities for walletbook (status, sample data, maintenance)")]
struct Cli {
    /// Optional config file path (TOML).
    #[arg(long)]
    config: Option<String>,

    /// Override the database connection string.
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply pending migrations.
    Init,
    /// Schema version, migration history and row counts.
    Status,
    /// Replace all data with the sample data set.
    Seed,
    /// Delete every category, wallet and transaction.
    Clear,
    /// Drop the schema and migrate again from scratch.
    Reset,
    /// Rebuild wallet balances from the ledger.
    Recompute,
    /// Sum of every wallet balance.
    Balance,
    Wallets,
    Categories,
    Transactions(ListArgs),
    /// Signed totals over a date range.
    Report(ReportArgs),
}

#[derive(Args, Debug)]
struct ListArgs {
    #[arg(long)]
    wallet: Option<String>,
    #[arg(long)]
    category: Option<String>,
    #[arg(long)]
    from: Option<String>,
    #[arg(long)]
    to: Option<String>,
    #[arg(long, value_enum)]
    kind: Option<Kind>,
}

#[derive(Args, Debug)]
struct ReportArgs {
    #[arg(long, value_enum, default_value_t = GroupBy::Category)]
    by: GroupBy,
    #[arg(long)]
    from: String,
    #[arg(long)]
    to: String,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Kind {
    Expense,
    Income,
    Transfer,
}

impl From<Kind> for TransactionKind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Expense => TransactionKind::Expense,
            Kind::Income => TransactionKind::Income,
            Kind::Transfer => TransactionKind::Transfer,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum GroupBy {
    Category,
    Wallet,
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        tracing::error!("{err}");
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let settings = Settings::load(cli.config.as_deref())?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "walletbook={level},engine={level},sea_orm_migration=warn",
            level = settings.app.level
        ))
        .with_writer(std::io::stderr)
        .init();

    let url = cli
        .database_url
        .unwrap_or_else(|| settings.database.url());
    tracing::debug!(%url, "opening database");
    let engine = Engine::builder().url(url).build().await?;

    // Reset builds the schema itself; everything else needs it in place.
    if !matches!(cli.command, Command::Reset) {
        engine.init().await?;
    }

    match cli.command {
        Command::Init | Command::Status => print_json(&engine.database_status().await?)?,
        Command::Seed => print_json(&engine.seed_sample_data().await?)?,
        Command::Clear => {
            engine.clear_all_data().await?;
            print_json(&engine.database_status().await?)?;
        }
        Command::Reset => {
            engine.reset_database().await?;
            print_json(&engine.database_status().await?)?;
        }
        Command::Recompute => {
            let drifted = engine.recompute_balances().await?;
            println!("{drifted} wallet balance(s) corrected");
        }
        Command::Balance => println!("{}", engine.total_balance().await),
        Command::Wallets => print_json(&engine.wallets().await)?,
        Command::Categories => print_json(&engine.categories().await)?,
        Command::Transactions(args) => {
            let filter = TransactionFilter {
                wallet_id: args.wallet,
                category_id: args.category,
                start_date: args.from,
                end_date: args.to,
                kind: args.kind.map(Into::into),
            };
            print_json(&engine.transactions(&filter).await?)?;
        }
        Command::Report(args) => match args.by {
            GroupBy::Category => {
                print_json(&engine.transactions_by_category(&args.from, &args.to).await?)?
            }
            GroupBy::Wallet => {
                print_json(&engine.transactions_by_wallet(&args.from, &args.to).await?)?
            }
        },
    }

    Ok(())
}
