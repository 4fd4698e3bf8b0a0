use futures::future;
use log::{debug, info, warn};
use serde_json::{json, Map, Value};
use std::sync::Arc;

use crate::config::{
    map_backend_config, AdapterConfig, AdapterOptions, ConfigSnapshot, RuntimeContext,
};
use crate::endpoints::{build_url, EndpointTemplates};
use crate::error::{AdapterError, Result};
use crate::headers::{build_headers, HeaderSet};
use crate::inventory::BackendInventory;
use crate::mock::MockStore;
use crate::operation::Operation;
use crate::schema::{Account, Balance, CanonicalValue, LiveSnapshot, ManualData, Transaction};
use crate::transport::{HttpRequest, HttpResponse, HttpTransport};
use crate::translation::{TranslationContext, TranslationTable};

pub const DEFAULT_TRANSACTION_LIMIT: u32 = 10;

/// Name/value pairs for `{token}` expansion and query strings.
pub type Params<'a> = [(&'a str, Option<&'a str>)];

/// The dashboard's data layer.
///
/// Reads never fail: when the backend is disabled, or anything between
/// building the URL and translating the body goes wrong, they return the
/// matching mock value. The one write, [`BackendAdapter::save_manual_data`],
/// reports failures instead.
///
/// State is written only by the constructor, the setters and
/// [`BackendAdapter::load_config`], all of which need `&mut self`. Call
/// `load_config` once before sharing the adapter for concurrent reads.
pub struct BackendAdapter {
    enabled: bool,
    config: AdapterConfig,
    config_url: String,
    runtime: RuntimeContext,
    test_bearer_token: Option<String>,
    endpoints: EndpointTemplates,
    translations: TranslationTable,
    mock: MockStore,
    transport: Arc<dyn HttpTransport>,
}

impl BackendAdapter {
    pub fn new(
        options: AdapterOptions,
        inventory: BackendInventory,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        let endpoints = EndpointTemplates::resolve(Some(&inventory.endpoint_source()));
        let translations = TranslationTable::new(inventory.translators());
        let config = AdapterConfig {
            api_base_url: options.api_base_url,
            ..AdapterConfig::default()
        };

        Self {
            enabled: options.enabled,
            config,
            config_url: options.config_url,
            runtime: options.runtime,
            test_bearer_token: options.test_bearer_token,
            endpoints,
            translations,
            mock: MockStore::new(),
            transport,
        }
    }

    /// Adapter over a `reqwest` client; relative URLs resolve against `origin`.
    #[cfg(feature = "http")]
    pub fn with_reqwest(
        options: AdapterOptions,
        inventory: BackendInventory,
        origin: Option<String>,
    ) -> Self {
        let transport = crate::transport::ReqwestTransport::new(origin);
        Self::new(options, inventory, Arc::new(transport))
    }

    pub fn is_backend_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_backend_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn set_test_bearer_token(&mut self, token: Option<String>) {
        self.test_bearer_token = token;
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    pub fn endpoint_templates(&self) -> &EndpointTemplates {
        &self.endpoints
    }

    pub fn mock_store(&self) -> &MockStore {
        &self.mock
    }

    /// Fetches the remote config and merges it into the adapter. Never fails:
    /// on any error the current state is kept.
    pub async fn load_config(&mut self) -> ConfigSnapshot {
        if self.runtime == RuntimeContext::LocalFile {
            debug!("Local file context; skipping remote config");
            return self.snapshot();
        }

        let mut headers = HeaderSet::new();
        headers.insert("Accept".to_string(), "application/json".to_string());
        let request = HttpRequest::get(self.config_url.clone(), headers);

        match self.transport.send(request).await {
            Ok(response) if response.is_success() => {
                let raw = response.json().unwrap_or_else(|e| {
                    debug!("Remote config is not valid JSON ({}); treating as empty", e);
                    Value::Object(Map::new())
                });
                let mapped = map_backend_config(&raw);
                if let Some(enabled) = mapped.feature_use_backend {
                    self.enabled = enabled;
                }
                self.config.apply(mapped);
                info!(
                    "Loaded remote config: backend {}, api base '{}'",
                    if self.enabled { "enabled" } else { "disabled" },
                    self.config.api_base_url
                );
            }
            Ok(response) => warn!(
                "Config endpoint returned status {}; keeping current settings",
                response.status
            ),
            Err(e) => warn!("Could not load remote config: {}", e),
        }

        self.snapshot()
    }

    pub fn snapshot(&self) -> ConfigSnapshot {
        ConfigSnapshot {
            enabled: self.enabled,
            api_base_url: self.config.api_base_url.clone(),
        }
    }

    /// Request headers with the current auth settings applied.
    pub fn headers(&self) -> HeaderSet {
        build_headers(
            &self.config.static_headers,
            &self.config.auth,
            self.test_bearer_token.as_deref(),
        )
    }

    pub fn url_for(&self, operation: Operation, path: &Params<'_>, query: &Params<'_>) -> String {
        build_url(
            &self.config.api_base_url,
            self.endpoints.template(operation),
            path,
            query,
        )
    }

    pub fn apply_translation(
        &self,
        operation: Operation,
        payload: &Value,
        context: &TranslationContext,
    ) -> Option<CanonicalValue> {
        self.translations.apply(operation, payload, context)
    }

    pub async fn fetch_accounts(&self) -> Vec<Account> {
        if !self.enabled {
            return self.mock.accounts();
        }
        or_mock(Operation::Accounts, self.accounts_live().await, || {
            self.mock.accounts()
        })
    }

    /// `None` only when the fallback is needed and the id is not a demo account.
    pub async fn fetch_cached_balance(&self, account_id: &str) -> Option<Balance> {
        if !self.enabled {
            return self.mock.balance(account_id);
        }
        or_mock(
            Operation::CachedBalance,
            self.cached_balance_live(account_id).await.map(Some),
            || self.mock.balance(account_id),
        )
    }

    /// `limit` defaults to [`DEFAULT_TRANSACTION_LIMIT`] and is sent as a query
    /// parameter. The mock fallback ignores it.
    pub async fn fetch_cached_transactions(
        &self,
        account_id: &str,
        limit: Option<u32>,
    ) -> Vec<Transaction> {
        if !self.enabled {
            return self.mock.transactions(account_id);
        }
        let limit = limit.unwrap_or(DEFAULT_TRANSACTION_LIMIT);
        or_mock(
            Operation::CachedTransactions,
            self.cached_transactions_live(account_id, limit).await,
            || self.mock.transactions(account_id),
        )
    }

    /// Issues the live balance and live transactions requests concurrently.
    /// Either both results are live or both come from the mock store.
    pub async fn refresh_live(&self, account_id: &str, count: Option<u32>) -> LiveSnapshot {
        let mock_snapshot = || LiveSnapshot {
            balance: self.mock.balance(account_id),
            transactions: self.mock.transactions(account_id),
        };
        if !self.enabled {
            return mock_snapshot();
        }
        let count = count.unwrap_or(DEFAULT_TRANSACTION_LIMIT);
        or_mock(
            Operation::LiveBalance,
            self.live_snapshot(account_id, count).await,
            mock_snapshot,
        )
    }

    pub async fn fetch_manual_data(&self, account_id: &str) -> ManualData {
        if !self.enabled {
            return ManualData::empty(Some(account_id));
        }
        or_mock(
            Operation::ManualRentRoll,
            self.manual_data_live(account_id).await,
            || ManualData::empty(Some(account_id)),
        )
    }

    /// Stores the rent roll (`None` clears it). Fails when the backend is
    /// disabled or the request does not succeed, with the backend's own error
    /// message when it sent one.
    pub async fn save_manual_data(
        &self,
        account_id: &str,
        rent_roll: Option<f64>,
    ) -> Result<ManualData> {
        if !self.enabled {
            return Err(AdapterError::BackendDisabled);
        }
        let url = self.url_for(Operation::ManualRentRoll, &[("accountId", Some(account_id))], &[]);
        let request = HttpRequest::put_json(url, self.headers(), json!({ "rent_roll": rent_roll }));
        let response = self.transport.send(request).await?;

        if !response.is_success() {
            let body = response.json().unwrap_or(Value::Null);
            let message = extract_error_message(&body)
                .or_else(|| Some(response.reason.trim().to_string()).filter(|r| !r.is_empty()))
                .unwrap_or_else(|| "Failed to save".to_string());
            warn!("Saving rent roll for {} failed: {}", account_id, message);
            return Err(AdapterError::SaveFailed(message));
        }

        let payload = response.json().unwrap_or_else(|_| json!({}));
        Ok(self
            .translate_manual(&payload, account_id)
            .unwrap_or_else(|_| ManualData::empty(Some(account_id))))
    }

    async fn accounts_live(&self) -> Result<Vec<Account>> {
        let payload = self.get_json(Operation::Accounts, &[], &[]).await?;
        self.translate(Operation::Accounts, &payload, &TranslationContext::default())
    }

    async fn cached_balance_live(&self, account_id: &str) -> Result<Balance> {
        let path = [("accountId", Some(account_id))];
        let payload = self.get_json(Operation::CachedBalance, &path, &[]).await?;
        self.translate(
            Operation::CachedBalance,
            &payload,
            &TranslationContext::for_account(account_id),
        )
    }

    async fn cached_transactions_live(
        &self,
        account_id: &str,
        limit: u32,
    ) -> Result<Vec<Transaction>> {
        let limit_str = limit.to_string();
        let path = [("accountId", Some(account_id)), ("limit", Some(limit_str.as_str()))];
        let query = [("limit", Some(limit_str.as_str()))];
        let payload = self
            .get_json(Operation::CachedTransactions, &path, &query)
            .await?;
        let context = TranslationContext {
            limit: Some(limit),
            ..TranslationContext::for_account(account_id)
        };
        self.translate(Operation::CachedTransactions, &payload, &context)
    }

    async fn live_snapshot(&self, account_id: &str, count: u32) -> Result<LiveSnapshot> {
        let count_str = count.to_string();
        let balance_path = [("accountId", Some(account_id))];
        let txs_path = [("accountId", Some(account_id)), ("count", Some(count_str.as_str()))];
        let txs_query = [("count", Some(count_str.as_str()))];

        let (balance_raw, txs_raw) = future::join(
            self.get_json(Operation::LiveBalance, &balance_path, &[]),
            self.get_json(Operation::LiveTransactions, &txs_path, &txs_query),
        )
        .await;
        let (balance_raw, txs_raw) = (balance_raw?, txs_raw?);

        let context = TranslationContext {
            count: Some(count),
            ..TranslationContext::for_account(account_id)
        };
        Ok(LiveSnapshot {
            balance: Some(self.translate(Operation::LiveBalance, &balance_raw, &context)?),
            transactions: self.translate(Operation::LiveTransactions, &txs_raw, &context)?,
        })
    }

    // A body that is not JSON reads as `{}`, which still yields a ManualData.
    async fn manual_data_live(&self, account_id: &str) -> Result<ManualData> {
        let path = [("accountId", Some(account_id))];
        let response = self.get(Operation::ManualRentRoll, &path, &[]).await?;
        let payload = response.json().unwrap_or_else(|_| json!({}));
        self.translate_manual(&payload, account_id)
    }

    async fn get(
        &self,
        operation: Operation,
        path: &Params<'_>,
        query: &Params<'_>,
    ) -> Result<HttpResponse> {
        let url = self.url_for(operation, path, query);
        debug!("{} -> GET {}", operation, url);
        let response = self
            .transport
            .send(HttpRequest::get(url, self.headers()))
            .await?;
        if !response.is_success() {
            return Err(AdapterError::Status {
                status: response.status,
                reason: response.reason,
            });
        }
        Ok(response)
    }

    async fn get_json(
        &self,
        operation: Operation,
        path: &Params<'_>,
        query: &Params<'_>,
    ) -> Result<Value> {
        self.get(operation, path, query).await?.json()
    }

    fn translate<T: FromCanonical>(
        &self,
        operation: Operation,
        payload: &Value,
        context: &TranslationContext,
    ) -> Result<T> {
        let value = self
            .translations
            .apply(operation, payload, context)
            .ok_or_else(|| {
                AdapterError::Translation(format!("no value produced for {}", operation))
            })?;
        let found = value.kind();
        T::from_canonical(value).ok_or(AdapterError::UnexpectedShape { operation, found })
    }

    fn translate_manual(&self, payload: &Value, account_id: &str) -> Result<ManualData> {
        self.translate::<ManualData>(
            Operation::ManualRentRoll,
            payload,
            &TranslationContext::for_account(account_id),
        )
    }
}

/// The single place read failures turn into mock data.
fn or_mock<T>(operation: Operation, result: Result<T>, mock: impl FnOnce() -> T) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            warn!("{} unavailable, serving mock data: {}", operation, e);
            mock()
        }
    }
}

trait FromCanonical: Sized {
    fn from_canonical(value: CanonicalValue) -> Option<Self>;
}

impl FromCanonical for Vec<Account> {
    fn from_canonical(value: CanonicalValue) -> Option<Self> {
        match value {
            CanonicalValue::Accounts(accounts) => Some(accounts),
            _ => None,
        }
    }
}

impl FromCanonical for Balance {
    fn from_canonical(value: CanonicalValue) -> Option<Self> {
        match value {
            CanonicalValue::Balance(balance) => Some(balance),
            _ => None,
        }
    }
}

impl FromCanonical for Vec<Transaction> {
    fn from_canonical(value: CanonicalValue) -> Option<Self> {
        match value {
            CanonicalValue::Transactions(transactions) => Some(transactions),
            _ => None,
        }
    }
}

impl FromCanonical for ManualData {
    fn from_canonical(value: CanonicalValue) -> Option<Self> {
        match value {
            CanonicalValue::ManualData(data) => Some(data),
            _ => None,
        }
    }
}

/// Pulls a human-readable message out of an error body: `description`,
/// `message`, the first usable `errors` entry, then `error`.
pub fn extract_error_message(payload: &Value) -> Option<String> {
    if !payload.is_object() {
        return None;
    }
    if let Some(message) =
        text_field(payload, "description").or_else(|| text_field(payload, "message"))
    {
        return Some(message);
    }
    if let Some(errors) = payload.get("errors").and_then(Value::as_array) {
        let found = errors.iter().find_map(|entry| match entry {
            Value::String(s) => non_blank(s),
            Value::Object(_) => {
                text_field(entry, "message").or_else(|| text_field(entry, "description"))
            }
            _ => None,
        });
        if found.is_some() {
            return found;
        }
    }
    match payload.get("error") {
        Some(Value::String(s)) => non_blank(s),
        Some(entry @ Value::Object(_)) => {
            text_field(entry, "message").or_else(|| text_field(entry, "description"))
        }
        _ => None,
    }
}

fn text_field(object: &Value, key: &str) -> Option<String> {
    object.get(key).and_then(Value::as_str).and_then(non_blank)
}

fn non_blank(s: &str) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
