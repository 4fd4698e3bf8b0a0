use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;

use crate::error::{AdapterError, Result};
use crate::operation::Operation;
use crate::translation::Translator;

/// Externally supplied endpoint and translator overrides. This is how a real
/// backend is plugged in without touching the adapter.
#[derive(Clone, Default)]
pub struct BackendInventory {
    endpoints: Map<String, Value>,
    translators: HashMap<Operation, Translator>,
}

impl BackendInventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads endpoint overrides from a JSON inventory. The source is the
    /// `endpoints` object, else `urls`, else the inventory itself.
    pub fn from_json(inventory: &Value) -> Self {
        let source = ["endpoints", "urls"]
            .iter()
            .filter_map(|key| inventory.get(*key))
            .find_map(Value::as_object)
            .or_else(|| inventory.as_object())
            .cloned()
            .unwrap_or_default();
        Self {
            endpoints: source,
            translators: HashMap::new(),
        }
    }

    /// Registers a template under an alias name, e.g. `"balance"` or `"rentRollUrl"`.
    pub fn with_endpoint(mut self, alias: impl Into<String>, template: impl Into<String>) -> Self {
        self.endpoints
            .insert(alias.into(), Value::String(template.into()));
        self
    }

    pub fn with_translator(mut self, operation: Operation, translator: Translator) -> Self {
        self.translators.insert(operation, translator);
        self
    }

    /// Same as [`Self::with_translator`], keyed by the operation's name
    /// (`"accounts"`, `"liveBalance"`, ...). Unknown names are rejected.
    pub fn with_translator_named(self, name: &str, translator: Translator) -> Result<Self> {
        let operation = Operation::from_name(name.trim())
            .ok_or_else(|| AdapterError::UnknownOperation(name.to_string()))?;
        Ok(self.with_translator(operation, translator))
    }

    pub fn endpoint_source(&self) -> Value {
        Value::Object(self.endpoints.clone())
    }

    pub fn translators(&self) -> &HashMap<Operation, Translator> {
        &self.translators
    }
}

impl fmt::Debug for BackendInventory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut translators: Vec<_> = self.translators.keys().collect();
        translators.sort();
        f.debug_struct("BackendInventory")
            .field("endpoints", &self.endpoints)
            .field("translators", &translators)
            .finish()
    }
}
