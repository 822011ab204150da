//! Sample data for a fresh install or a demo.

use std::collections::HashMap;

use chrono::{Duration, Utc};
use serde_json::{Value, json};
use tracing::info;

use crate::{DatabaseStatus, Engine, ResultEngine, util};

struct SampleCategory {
    name: &'static str,
    icon: &'static str,
    background: &'static str,
    kind: &'static str,
}

struct SampleWallet {
    name: &'static str,
    balance: f64,
    icon: &'static str,
    background: &'static str,
    kind: &'static str,
}

const CATEGORIES: &[SampleCategory] = &[
    SampleCategory {
        name: "Food & Dining",
        icon: "restaurant",
        background: "#FF6B6B",
        kind: "expense",
    },
    SampleCategory {
        name: "Transportation",
        icon: "car",
        background: "#4ECDC4",
        kind: "expense",
    },
    SampleCategory {
        name: "Shopping",
        icon: "shopping-cart",
        background: "#45B7D1",
        kind: "expense",
    },
    SampleCategory {
        name: "Salary",
        icon: "dollar-sign",
        background: "#96CEB4",
        kind: "income",
    },
    SampleCategory {
        name: "Investment",
        icon: "trending-up",
        background: "#FFEAA7",
        kind: "income",
    },
];

const WALLETS: &[SampleWallet] = &[
    SampleWallet {
        name: "Main Checking",
        balance: 2500.0,
        icon: "credit-card",
        background: "#6C5CE7",
        kind: "debit",
    },
    SampleWallet {
        name: "Savings Account",
        balance: 15000.0,
        icon: "piggy-bank",
        background: "#00B894",
        kind: "debit",
    },
    SampleWallet {
        name: "Credit Card",
        balance: -450.0,
        icon: "credit-card",
        background: "#E17055",
        kind: "credit",
    },
    SampleWallet {
        name: "Cash Wallet",
        balance: 120.0,
        icon: "dollar-sign",
        background: "#FDCB6E",
        kind: "cash",
    },
];

fn days_ago(days: i64) -> String {
    util::format_date(Utc::now() - Duration::days(days))
}

impl Engine {
    /// Replaces all data with the sample categories, wallets and
    /// transactions, initializing the storage first when needed.
    ///
    /// Everything goes through the validated write path, so wallet balances
    /// already include the sample transactions.
    pub async fn seed_sample_data(&self) -> ResultEngine<DatabaseStatus> {
        self.init().await?;
        self.clear_all_data().await?;

        let mut category_ids = HashMap::with_capacity(CATEGORIES.len());
        for sample in CATEGORIES {
            let category = self
                .create_category(&json!({
                    "id": util::new_id(),
                    "name": sample.name,
                    "icon": sample.icon,
                    "background": sample.background,
                    "type": sample.kind,
                }))
                .await?;
            category_ids.insert(sample.name, category.id);
        }

        let mut wallet_ids = HashMap::with_capacity(WALLETS.len());
        for sample in WALLETS {
            let wallet = self
                .create_wallet(&json!({
                    "id": util::new_id(),
                    "name": sample.name,
                    "balance": sample.balance,
                    "icon": sample.icon,
                    "background": sample.background,
                    "type": sample.kind,
                }))
                .await?;
            wallet_ids.insert(sample.name, wallet.id);
        }

        let food = category_ids.get("Food & Dining");
        let shopping = category_ids.get("Shopping");
        let salary = category_ids.get("Salary");
        let checking = wallet_ids.get("Main Checking");
        let savings = wallet_ids.get("Savings Account");
        let credit_card = wallet_ids.get("Credit Card");

        let transactions: [Value; 4] = [
            json!({
                "id": util::new_id(),
                "amount": -25.5,
                "categoryId": food,
                "walletId": checking,
                "date": days_ago(1),
                "title": "Lunch at Cafe",
                "description": "Quick lunch with colleagues",
                "type": "expense",
            }),
            json!({
                "id": util::new_id(),
                "amount": -120.0,
                "categoryId": shopping,
                "walletId": credit_card,
                "date": days_ago(2),
                "title": "Grocery Shopping",
                "description": "Weekly groceries",
                "type": "expense",
            }),
            json!({
                "id": util::new_id(),
                "amount": 3500.0,
                "categoryId": salary,
                "walletId": checking,
                "date": days_ago(3),
                "title": "Monthly Salary",
                "description": "Salary deposit",
                "type": "income",
            }),
            json!({
                "id": util::new_id(),
                "amount": 500.0,
                "categoryId": null,
                "walletId": checking,
                "secondWalletId": savings,
                "date": days_ago(1),
                "title": "Monthly Savings",
                "description": "Transfer to savings",
                "type": "transfer",
            }),
        ];
        for transaction in &transactions {
            self.create_transaction(transaction).await?;
        }

        let status = self.database_status().await?;
        info!(counts = ?status.counts, "sample data seeded");
        Ok(status)
    }
}
