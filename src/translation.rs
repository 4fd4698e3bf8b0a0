use log::debug;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::normalize::{
    coerce_currency, coerce_id, coerce_last_four, coerce_number, coerce_string, coerce_timestamp,
    first_present,
};
use crate::operation::Operation;
use crate::schema::{Account, Balance, CanonicalValue, ManualData, Transaction};

/// Call-site details a translator may need, e.g. the account a payload
/// belongs to when the payload itself omits it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TranslationContext {
    pub account_id: Option<String>,
    pub limit: Option<u32>,
    pub count: Option<u32>,
}

impl TranslationContext {
    pub fn for_account(account_id: &str) -> Self {
        Self {
            account_id: Some(account_id.to_string()),
            ..Self::default()
        }
    }
}

/// `Err` means the translator failed; `Ok(None)` means it produced nothing.
/// Both trigger the one-level fallback in [`TranslationTable::apply`].
pub type Translator =
    Arc<dyn Fn(&Value, &TranslationContext) -> Result<Option<CanonicalValue>> + Send + Sync>;

pub fn translator<F>(f: F) -> Translator
where
    F: Fn(&Value, &TranslationContext) -> Result<Option<CanonicalValue>> + Send + Sync + 'static,
{
    Arc::new(f)
}

#[derive(Clone)]
pub struct TranslationTable {
    translators: HashMap<Operation, Translator>,
}

impl TranslationTable {
    /// Built-in translators with any caller-supplied ones replacing them per key.
    pub fn new(overrides: &HashMap<Operation, Translator>) -> Self {
        let mut translators = default_translators();
        for (operation, translator) in overrides {
            translators.insert(*operation, Arc::clone(translator));
        }
        Self { translators }
    }

    pub fn apply(
        &self,
        operation: Operation,
        payload: &Value,
        context: &TranslationContext,
    ) -> Option<CanonicalValue> {
        if let Some(translate) = self.translators.get(&operation) {
            match translate(payload, context) {
                Ok(Some(value)) => return Some(value),
                Ok(None) => debug!("Translator for {} produced no value", operation),
                Err(e) => debug!("Translator for {} failed: {}", operation, e),
            }
        }
        match operation.translation_fallback() {
            Some(fallback) if fallback != operation => self.apply(fallback, payload, context),
            _ => None,
        }
    }
}

impl Default for TranslationTable {
    fn default() -> Self {
        Self::new(&HashMap::new())
    }
}

impl fmt::Debug for TranslationTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<_> = self.translators.keys().collect();
        keys.sort();
        f.debug_struct("TranslationTable")
            .field("operations", &keys)
            .finish()
    }
}

fn default_translators() -> HashMap<Operation, Translator> {
    let mut map: HashMap<Operation, Translator> = HashMap::new();
    map.insert(
        Operation::Accounts,
        translator(|payload, _| Ok(Some(CanonicalValue::Accounts(translate_accounts(payload))))),
    );
    map.insert(
        Operation::CachedBalance,
        translator(|payload, _| Ok(Some(CanonicalValue::Balance(translate_balance(payload))))),
    );
    map.insert(
        Operation::CachedTransactions,
        translator(|payload, _| {
            Ok(Some(CanonicalValue::Transactions(translate_transactions(payload))))
        }),
    );
    map.insert(
        Operation::LiveBalance,
        translator(|payload, _| Ok(Some(CanonicalValue::Balance(translate_balance(payload))))),
    );
    map.insert(
        Operation::LiveTransactions,
        translator(|payload, _| {
            Ok(Some(CanonicalValue::Transactions(translate_transactions(payload))))
        }),
    );
    map.insert(
        Operation::ManualRentRoll,
        translator(|payload, context| {
            Ok(Some(CanonicalValue::ManualData(translate_manual_rent_roll(
                payload, context,
            ))))
        }),
    );
    map
}

/// Accepts a bare list or `{ "accounts": [...] }`. Entries without an id are dropped.
pub fn translate_accounts(payload: &Value) -> Vec<Account> {
    list_under(payload, "accounts")
        .iter()
        .filter_map(normalize_account)
        .collect()
}

/// Accepts `{ "balance": {...} }` or the balance object itself.
pub fn translate_balance(payload: &Value) -> Balance {
    let balance = match payload.get("balance") {
        Some(nested) if nested.is_object() => nested,
        _ => payload,
    };
    let available = coerce_number(first_present(
        balance,
        &["available", "available_balance", "current"],
    ));
    let ledger = coerce_number(first_present(
        balance,
        &["ledger", "ledger_balance", "current"],
    ));
    let currency = coerce_currency(
        first_present(balance, &["currency"]).or_else(|| first_present(payload, &["currency"])),
    );
    let cached_at = coerce_timestamp(
        first_present(payload, &["cached_at"])
            .or_else(|| first_present(balance, &["cached_at"]))
            .or_else(|| first_present(payload, &["updated_at"])),
    );

    Balance {
        available,
        ledger: ledger.or(available),
        currency,
        cached_at,
    }
}

/// Accepts a bare list or `{ "transactions": [...] }`. Non-object entries are dropped.
pub fn translate_transactions(payload: &Value) -> Vec<Transaction> {
    list_under(payload, "transactions")
        .iter()
        .filter_map(normalize_transaction)
        .collect()
}

pub fn translate_manual_rent_roll(payload: &Value, context: &TranslationContext) -> ManualData {
    let account_id = coerce_id(first_present(payload, &["account_id", "accountId"]))
        .or_else(|| context.account_id.clone());

    // An explicit `rent_roll: null` is a cleared value and stays null; an absent
    // `rent_roll` defers to `rentRoll` and goes through numeric coercion.
    let rent_roll = match payload.get("rent_roll") {
        Some(Value::Null) => None,
        Some(raw) => coerce_number(Some(raw)),
        None => coerce_number(payload.get("rentRoll")),
    };

    let updated_at = coerce_timestamp(first_present(
        payload,
        &["updated_at", "updatedAt", "timestamp", "updated"],
    ));

    ManualData {
        account_id,
        rent_roll,
        updated_at,
    }
}

pub fn normalize_account(raw: &Value) -> Option<Account> {
    if !raw.is_object() {
        return None;
    }
    let id = coerce_id(first_present(
        raw,
        &["id", "account_id", "accountId", "uuid", "external_id"],
    ))?;
    let name = coerce_string(first_present(raw, &["name", "display_name", "account_name"]));
    let institution = coerce_string(first_present(
        raw,
        &["institution", "bank_name", "institution_name", "provider"],
    ));

    Some(Account {
        id,
        name: if name.is_empty() {
            "Account".to_string()
        } else {
            name
        },
        institution: (!institution.is_empty()).then_some(institution),
        last_four: coerce_last_four(first_present(
            raw,
            &["last_four", "last4", "lastFour", "mask", "account_number"],
        )),
        currency: coerce_currency(first_present(
            raw,
            &["currency", "currency_code", "account_currency"],
        )),
    })
}

pub fn normalize_transaction(raw: &Value) -> Option<Transaction> {
    if !raw.is_object() {
        return None;
    }
    let description = coerce_string(first_present(
        raw,
        &["description", "name", "merchant", "memo", "counterparty"],
    ));
    let amount = coerce_number(first_present(
        raw,
        &["amount", "value", "transaction_amount", "total"],
    ));

    Some(Transaction {
        description: if description.is_empty() {
            "Transaction".to_string()
        } else {
            description
        },
        amount: amount.unwrap_or(0.0),
        date: coerce_timestamp(first_present(
            raw,
            &["date", "posted_at", "timestamp", "created_at", "updated_at"],
        )),
    })
}

fn list_under<'a>(payload: &'a Value, key: &str) -> &'a [Value] {
    if let Some(Value::Array(items)) = payload.get(key) {
        return items;
    }
    match payload {
        Value::Array(items) => items,
        _ => &[],
    }
}
