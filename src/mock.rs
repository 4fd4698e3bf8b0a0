use chrono::Utc;
use std::collections::HashMap;

use crate::normalize::format_timestamp;
use crate::schema::{Account, Balance, Transaction};

/// The fixed demo dataset served whenever live data is unavailable.
#[derive(Debug, Clone, PartialEq)]
pub struct MockStore {
    accounts: Vec<Account>,
    balances: HashMap<String, Balance>,
    transactions: HashMap<String, Vec<Transaction>>,
}

impl MockStore {
    /// Balances are stamped with the construction time, so every read from the
    /// same store returns identical values.
    pub fn new() -> Self {
        let cached_at = format_timestamp(&Utc::now());

        let accounts = vec![
            demo_account("acc_checking", "Checking", "1234"),
            demo_account("acc_savings", "Savings", "9876"),
        ];

        let mut balances = HashMap::new();
        balances.insert(
            "acc_checking".to_string(),
            demo_balance(1250.25, 1300.25, &cached_at),
        );
        balances.insert(
            "acc_savings".to_string(),
            demo_balance(8200.00, 8200.00, &cached_at),
        );

        let mut transactions = HashMap::new();
        transactions.insert(
            "acc_checking".to_string(),
            vec![
                demo_transaction("Coffee Shop", -3.75, "2025-10-08"),
                demo_transaction("Payroll", 2500.00, "2025-10-01"),
            ],
        );
        transactions.insert("acc_savings".to_string(), Vec::new());

        Self {
            accounts,
            balances,
            transactions,
        }
    }

    pub fn accounts(&self) -> Vec<Account> {
        self.accounts.clone()
    }

    /// `None` for ids outside the demo dataset.
    pub fn balance(&self, account_id: &str) -> Option<Balance> {
        self.balances.get(account_id).cloned()
    }

    pub fn transactions(&self, account_id: &str) -> Vec<Transaction> {
        self.transactions
            .get(account_id)
            .cloned()
            .unwrap_or_default()
    }
}

impl Default for MockStore {
    fn default() -> Self {
        Self::new()
    }
}

fn demo_account(id: &str, name: &str, last_four: &str) -> Account {
    Account {
        id: id.to_string(),
        name: name.to_string(),
        institution: Some("Demo Bank".to_string()),
        last_four: Some(last_four.to_string()),
        currency: "USD".to_string(),
    }
}

fn demo_balance(available: f64, ledger: f64, cached_at: &str) -> Balance {
    Balance {
        available: Some(available),
        ledger: Some(ledger),
        currency: "USD".to_string(),
        cached_at: Some(cached_at.to_string()),
    }
}

fn demo_transaction(description: &str, amount: f64, date: &str) -> Transaction {
    Transaction {
        description: description.to_string(),
        amount,
        date: Some(date.to_string()),
    }
}
