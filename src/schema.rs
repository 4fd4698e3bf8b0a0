use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct Account {
    #[schemars(description = "Stable, non-empty account identifier")]
    pub id: String,

    #[schemars(description = "Display name, 'Account' when upstream provides none")]
    pub name: String,

    #[schemars(description = "Institution or provider holding the account")]
    pub institution: Option<String>,

    #[schemars(description = "Up to four trailing digits of the account number")]
    pub last_four: Option<String>,

    #[schemars(description = "Upper-case currency code, 'USD' when upstream provides none")]
    pub currency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct Balance {
    #[schemars(
        description = "Available balance; null when the upstream value is missing or not numeric"
    )]
    pub available: Option<f64>,

    #[schemars(description = "Ledger balance; falls back to the available balance")]
    pub ledger: Option<f64>,

    pub currency: String,

    #[schemars(description = "ISO-8601 UTC timestamp of the cached snapshot")]
    pub cached_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct Transaction {
    pub description: String,

    #[schemars(description = "Signed amount; 0 when the upstream value is missing or not numeric")]
    pub amount: f64,

    pub date: Option<String>,
}

/// User-entered data the backend stores next to an account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct ManualData {
    pub account_id: Option<String>,

    #[schemars(description = "Monthly rent roll; null means no value (or a cleared value)")]
    pub rent_roll: Option<f64>,

    pub updated_at: Option<String>,
}

impl ManualData {
    /// The "nothing recorded" value returned when manual data is unavailable.
    pub fn empty(account_id: Option<&str>) -> Self {
        Self {
            account_id: account_id.map(str::to_string),
            rent_roll: None,
            updated_at: None,
        }
    }
}

/// Result of a live refresh. Both fields always come from the same source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct LiveSnapshot {
    pub balance: Option<Balance>,
    pub transactions: Vec<Transaction>,
}

/// Output of a translator, one variant per canonical shape.
#[derive(Debug, Clone, PartialEq)]
pub enum CanonicalValue {
    Accounts(Vec<Account>),
    Balance(Balance),
    Transactions(Vec<Transaction>),
    ManualData(ManualData),
}

impl CanonicalValue {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Accounts(_) => "accounts",
            Self::Balance(_) => "balance",
            Self::Transactions(_) => "transactions",
            Self::ManualData(_) => "manual data",
        }
    }
}

/// JSON Schemas of the canonical shapes, keyed by type name. Handy for anyone
/// writing a translator against a new backend.
pub fn canonical_schemas() -> serde_json::Value {
    serde_json::json!({
        "Account": schemars::schema_for!(Account),
        "Balance": schemars::schema_for!(Balance),
        "Transaction": schemars::schema_for!(Transaction),
        "ManualData": schemars::schema_for!(ManualData),
    })
}
