//! # Dashboard Backend Adapter
//!
//! The data layer of the account dashboard. It behaves identically whether a
//! real backend exists or not: every read either returns live data translated
//! into a small canonical schema, or the fixed demo dataset.
//!
//! ## Core Concepts
//!
//! - **Logical operations**: six named reads/writes (`accounts`, `cachedBalance`,
//!   `cachedTransactions`, `liveBalance`, `liveTransactions`, `manualRentRoll`)
//!   independent of their URLs
//! - **Inventory**: endpoint templates and translators supplied at construction
//!   to integrate a backend without code changes
//! - **Canonical schema**: [`Account`], [`Balance`], [`Transaction`], [`ManualData`]
//! - **Mock store**: the deterministic dataset used when live data is unavailable
//!
//! ## Example
//!
//! ```rust,ignore
//! use dashboard_backend_adapter::*;
//!
//! let mut adapter = BackendAdapter::with_reqwest(
//!     AdapterOptions::from_env(),
//!     BackendInventory::new().with_endpoint("balance", "/v2/accounts/{accountId}/balance"),
//!     Some("http://localhost:8080".to_string()),
//! );
//! adapter.load_config().await;
//!
//! for account in adapter.fetch_accounts().await {
//!     let balance = adapter.fetch_cached_balance(&account.id).await;
//!     let txs = adapter.fetch_cached_transactions(&account.id, Some(10)).await;
//! }
//! ```

pub mod adapter;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod headers;
pub mod inventory;
pub mod mock;
pub mod normalize;
pub mod operation;
pub mod schema;
pub mod translation;
pub mod transport;

pub use adapter::{extract_error_message, BackendAdapter, Params, DEFAULT_TRANSACTION_LIMIT};
pub use config::{
    map_backend_config, AdapterConfig, AdapterOptions, ConfigSnapshot, MappedConfig,
    RuntimeContext,
};
pub use endpoints::{build_url, EndpointTemplates};
pub use error::{AdapterError, Result};
pub use headers::{build_headers, AuthConfig, HeaderSet};
pub use inventory::BackendInventory;
pub use mock::MockStore;
pub use operation::Operation;
pub use schema::*;
pub use translation::{translator, TranslationContext, TranslationTable, Translator};
pub use transport::{HttpRequest, HttpResponse, HttpTransport, Method};

#[cfg(feature = "http")]
pub use transport::ReqwestTransport;
