use std::fmt;

/// The six logical data operations the dashboard knows about, independent of
/// the concrete URL that serves them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Operation {
    Accounts,
    CachedBalance,
    CachedTransactions,
    LiveBalance,
    LiveTransactions,
    ManualRentRoll,
}

impl Operation {
    pub const ALL: [Operation; 6] = [
        Operation::Accounts,
        Operation::CachedBalance,
        Operation::CachedTransactions,
        Operation::LiveBalance,
        Operation::LiveTransactions,
        Operation::ManualRentRoll,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Accounts => "accounts",
            Self::CachedBalance => "cachedBalance",
            Self::CachedTransactions => "cachedTransactions",
            Self::LiveBalance => "liveBalance",
            Self::LiveTransactions => "liveTransactions",
            Self::ManualRentRoll => "manualRentRoll",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.as_str() == name)
    }

    pub const fn default_template(self) -> &'static str {
        match self {
            Self::Accounts => "/db/accounts",
            Self::CachedBalance => "/db/accounts/{accountId}/balances",
            Self::CachedTransactions => "/db/accounts/{accountId}/transactions?limit={limit}",
            Self::LiveBalance => "/accounts/{accountId}/balances",
            Self::LiveTransactions => "/accounts/{accountId}/transactions?count={count}",
            Self::ManualRentRoll => "/db/accounts/{accountId}/rent-roll",
        }
    }

    /// Inventory keys accepted as a template override, highest priority first.
    pub const fn aliases(self) -> &'static [&'static str] {
        match self {
            Self::Accounts => &["accounts", "accountsUrl", "accountsList"],
            Self::CachedBalance => &[
                "cachedBalance",
                "balance",
                "cachedBalanceUrl",
                "accountBalance",
            ],
            Self::CachedTransactions => &[
                "cachedTransactions",
                "transactions",
                "cachedTransactionsUrl",
                "accountTransactions",
            ],
            Self::LiveBalance => &["liveBalance", "liveBalanceUrl", "liveAccountBalance"],
            Self::LiveTransactions => &[
                "liveTransactions",
                "liveTransactionsUrl",
                "liveAccountTransactions",
            ],
            Self::ManualRentRoll => &[
                "manualRentRoll",
                "rentRoll",
                "rentRollUrl",
                "manualData",
                "manualDataUrl",
            ],
        }
    }

    /// Live operations fall back to their cached counterpart's translator.
    pub const fn translation_fallback(self) -> Option<Operation> {
        match self {
            Self::LiveBalance => Some(Self::CachedBalance),
            Self::LiveTransactions => Some(Self::CachedTransactions),
            _ => None,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
