use dashboard_backend_adapter::*;
use futures::future::BoxFuture;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
enum Reply {
    Json(u16, Value),
    Raw(u16, &'static str, String),
    Down,
}

/// Answers by "METHOD url" and records every request it sees.
#[derive(Default)]
struct FakeTransport {
    routes: Mutex<HashMap<String, Reply>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl FakeTransport {
    fn route(&self, method: Method, url: &str, reply: Reply) {
        self.routes
            .lock()
            .unwrap()
            .insert(format!("{} {}", method.as_str(), url), reply);
    }

    fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl HttpTransport for FakeTransport {
    fn send(&self, request: HttpRequest) -> BoxFuture<'_, Result<HttpResponse>> {
        let key = format!("{} {}", request.method.as_str(), request.url);
        let reply = self.routes.lock().unwrap().get(&key).cloned();
        self.requests.lock().unwrap().push(request);
        Box::pin(async move {
            match reply {
                Some(Reply::Json(status, body)) => Ok(HttpResponse::new(
                    status,
                    "",
                    serde_json::to_vec(&body).unwrap(),
                )),
                Some(Reply::Raw(status, reason, body)) => {
                    Ok(HttpResponse::new(status, reason, body.into_bytes()))
                }
                Some(Reply::Down) => Err(AdapterError::Transport("connection refused".to_string())),
                None => Ok(HttpResponse::new(404, "Not Found", Vec::new())),
            }
        })
    }
}

fn adapter_with(enabled: bool, inventory: BackendInventory) -> (BackendAdapter, Arc<FakeTransport>) {
    let transport = Arc::new(FakeTransport::default());
    let options = AdapterOptions {
        enabled,
        ..AdapterOptions::default()
    };
    let adapter = BackendAdapter::new(options, inventory, transport.clone());
    (adapter, transport)
}

fn enabled_adapter() -> (BackendAdapter, Arc<FakeTransport>) {
    adapter_with(true, BackendInventory::new())
}

#[tokio::test]
async fn test_disabled_reads_serve_mock_data_without_requests() {
    let (adapter, transport) = adapter_with(false, BackendInventory::new());
    let mock = adapter.mock_store().clone();

    let accounts = adapter.fetch_accounts().await;
    assert_eq!(accounts, mock.accounts());
    assert_eq!(accounts.len(), 2);

    let balance = adapter.fetch_cached_balance("acc_checking").await.unwrap();
    assert_eq!(balance.available, Some(1250.25));
    assert_eq!(balance.ledger, Some(1300.25));
    assert_eq!(balance.currency, "USD");
    assert_eq!(Some(balance.clone()), mock.balance("acc_checking"));

    let txs = adapter
        .fetch_cached_transactions("acc_checking", Some(5))
        .await;
    assert_eq!(txs, mock.transactions("acc_checking"));
    assert_eq!(txs.len(), 2);

    let live = adapter.refresh_live("acc_checking", Some(5)).await;
    assert_eq!(live.balance, Some(balance));
    assert_eq!(live.transactions, txs);

    let manual = adapter.fetch_manual_data("acc_checking").await;
    assert_eq!(manual.account_id.as_deref(), Some("acc_checking"));
    assert_eq!(manual.rent_roll, None);
    assert_eq!(manual.updated_at, None);

    assert_eq!(transport.request_count(), 0);
}

#[tokio::test]
async fn test_save_fails_when_backend_disabled() {
    let (adapter, transport) = adapter_with(false, BackendInventory::new());
    let err = adapter
        .save_manual_data("acc_checking", Some(1200.0))
        .await
        .unwrap_err();
    assert!(matches!(err, AdapterError::BackendDisabled));
    assert_eq!(err.to_string(), "Backend not enabled");
    assert_eq!(transport.request_count(), 0);
}

#[tokio::test]
async fn test_live_accounts_are_translated_with_auth_headers() {
    let (mut adapter, transport) = enabled_adapter();
    adapter.set_test_bearer_token(Some("test-token".to_string()));
    transport.route(
        Method::Get,
        "/api/db/accounts",
        Reply::Json(
            200,
            json!({"accounts": [
                {"account_id": "real_1", "display_name": "Operating", "last4": "5555", "currency": "gbp"},
                {"display_name": "Missing id"}
            ]}),
        ),
    );

    let accounts = adapter.fetch_accounts().await;
    assert_eq!(accounts.len(), 1);
    assert_eq!(accounts[0].id, "real_1");
    assert_eq!(accounts[0].currency, "GBP");
    assert_eq!(accounts[0].last_four.as_deref(), Some("5555"));

    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].headers["Accept"], "application/json");
    assert_eq!(requests[0].headers["Authorization"], "Bearer test-token");
}

#[tokio::test]
async fn test_empty_live_account_list_is_not_replaced_by_mock() {
    let (adapter, transport) = enabled_adapter();
    transport.route(Method::Get, "/api/db/accounts", Reply::Json(200, json!([])));
    assert!(adapter.fetch_accounts().await.is_empty());
}

#[tokio::test]
async fn test_every_read_failure_kind_falls_back_to_mock() {
    let failures = vec![
        Reply::Json(500, json!({"message": "boom"})),
        Reply::Raw(200, "OK", "<html>not json</html>".to_string()),
        Reply::Down,
    ];
    for failure in failures {
        let (adapter, transport) = enabled_adapter();
        let mock = adapter.mock_store().clone();
        transport.route(Method::Get, "/api/db/accounts", failure.clone());
        transport.route(Method::Get, "/api/db/accounts/acc_checking/balances", failure.clone());
        transport.route(
            Method::Get,
            "/api/db/accounts/acc_checking/transactions?limit=10",
            failure.clone(),
        );

        assert_eq!(adapter.fetch_accounts().await, mock.accounts());
        assert_eq!(
            adapter.fetch_cached_balance("acc_checking").await,
            mock.balance("acc_checking")
        );
        assert_eq!(
            adapter.fetch_cached_transactions("acc_checking", None).await,
            mock.transactions("acc_checking")
        );
        assert_eq!(transport.request_count(), 3);
    }
}

#[tokio::test]
async fn test_unknown_account_falls_back_to_empty_values() {
    let (adapter, _transport) = enabled_adapter();
    assert_eq!(adapter.fetch_cached_balance("acc_unknown").await, None);
    assert!(adapter
        .fetch_cached_transactions("acc_unknown", Some(3))
        .await
        .is_empty());
}

#[tokio::test]
async fn test_cached_transactions_send_limit_once() {
    let (adapter, transport) = enabled_adapter();
    transport.route(
        Method::Get,
        "/api/db/accounts/acc_checking/transactions?limit=5",
        Reply::Json(
            200,
            json!({"transactions": [{"memo": "Rent", "total": "-1200", "date": "2025-09-01"}]}),
        ),
    );

    let txs = adapter
        .fetch_cached_transactions("acc_checking", Some(5))
        .await;
    assert_eq!(
        txs,
        vec![Transaction {
            description: "Rent".to_string(),
            amount: -1200.0,
            date: Some("2025-09-01T00:00:00.000Z".to_string()),
        }]
    );
    assert_eq!(
        transport.requests()[0].url,
        "/api/db/accounts/acc_checking/transactions?limit=5"
    );
}

#[tokio::test]
async fn test_refresh_live_uses_both_live_results() {
    let (adapter, transport) = enabled_adapter();
    transport.route(
        Method::Get,
        "/api/accounts/acc_checking/balances",
        Reply::Json(200, json!({"balance": {"available": 10, "ledger": 12}, "cached_at": "2025-10-10"})),
    );
    transport.route(
        Method::Get,
        "/api/accounts/acc_checking/transactions?count=3",
        Reply::Json(200, json!([{"description": "Live tx", "amount": 1.5}])),
    );

    let live = adapter.refresh_live("acc_checking", Some(3)).await;
    let balance = live.balance.unwrap();
    assert_eq!(balance.available, Some(10.0));
    assert_eq!(balance.ledger, Some(12.0));
    assert_eq!(balance.cached_at.as_deref(), Some("2025-10-10T00:00:00.000Z"));
    assert_eq!(live.transactions.len(), 1);
    assert_eq!(live.transactions[0].description, "Live tx");
    assert_eq!(transport.request_count(), 2);
}

#[tokio::test]
async fn test_refresh_live_fallback_is_atomic() {
    let (adapter, transport) = enabled_adapter();
    let mock = adapter.mock_store().clone();
    transport.route(
        Method::Get,
        "/api/accounts/acc_checking/balances",
        Reply::Json(200, json!({"available": 99})),
    );
    transport.route(
        Method::Get,
        "/api/accounts/acc_checking/transactions?count=10",
        Reply::Json(503, json!({})),
    );

    let live = adapter.refresh_live("acc_checking", None).await;
    assert_eq!(live.balance, mock.balance("acc_checking"));
    assert_eq!(live.transactions, mock.transactions("acc_checking"));
    assert_eq!(transport.request_count(), 2);
}

#[tokio::test]
async fn test_live_override_failure_uses_cached_translator() {
    let inventory = BackendInventory::new().with_translator(
        Operation::LiveBalance,
        translator(|_, _| Err(AdapterError::Translation("unsupported".to_string()))),
    );
    let (adapter, transport) = adapter_with(true, inventory);
    transport.route(
        Method::Get,
        "/api/accounts/acc_savings/balances",
        Reply::Json(200, json!({"current": "42.5"})),
    );
    transport.route(
        Method::Get,
        "/api/accounts/acc_savings/transactions?count=10",
        Reply::Json(200, json!({"transactions": []})),
    );

    let live = adapter.refresh_live("acc_savings", None).await;
    assert_eq!(live.balance.unwrap().available, Some(42.5));
    assert!(live.transactions.is_empty());
}

#[tokio::test]
async fn test_inventory_overrides_templates_and_translators() {
    let inventory = BackendInventory::from_json(&json!({
        "endpoints": {"accountsUrl": "https://bank.example/v2/accounts"}
    }))
    .with_translator(
        Operation::Accounts,
        translator(|payload, _| {
            let accounts = payload["data"]
                .as_array()
                .map(|items| {
                    items
                        .iter()
                        .filter_map(translation::normalize_account)
                        .collect()
                })
                .unwrap_or_default();
            Ok(Some(CanonicalValue::Accounts(accounts)))
        }),
    );
    let (adapter, transport) = adapter_with(true, inventory);
    transport.route(
        Method::Get,
        "https://bank.example/v2/accounts",
        Reply::Json(200, json!({"data": [{"id": "ext_1", "provider": "Bank Co"}]})),
    );

    let accounts = adapter.fetch_accounts().await;
    assert_eq!(accounts.len(), 1);
    assert_eq!(accounts[0].institution.as_deref(), Some("Bank Co"));
}

#[tokio::test]
async fn test_translator_with_wrong_shape_falls_back() {
    let inventory = BackendInventory::new().with_translator(
        Operation::CachedBalance,
        translator(|_, _| Ok(Some(CanonicalValue::Transactions(Vec::new())))),
    );
    let (adapter, transport) = adapter_with(true, inventory);
    transport.route(
        Method::Get,
        "/api/db/accounts/acc_checking/balances",
        Reply::Json(200, json!({"available": 1})),
    );
    assert_eq!(
        adapter.fetch_cached_balance("acc_checking").await,
        adapter.mock_store().balance("acc_checking")
    );
}

#[tokio::test]
async fn test_accounts_translator_without_value_serves_mock_list() {
    let inventory = BackendInventory::new()
        .with_translator(Operation::Accounts, translator(|_, _| Ok(None)));
    let (adapter, transport) = adapter_with(true, inventory);
    transport.route(
        Method::Get,
        "/api/db/accounts",
        Reply::Json(200, json!([{"id": "live_1"}])),
    );

    let accounts = adapter.fetch_accounts().await;
    assert_eq!(accounts, adapter.mock_store().accounts());
    let ids: Vec<_> = accounts.iter().map(|a| a.id.as_str()).collect();
    assert_eq!(ids, vec!["acc_checking", "acc_savings"]);
}

#[tokio::test]
async fn test_failing_manual_translator_serves_empty_manual_data() {
    let inventory = BackendInventory::new()
        .with_translator_named(
            "manualRentRoll",
            translator(|_, _| Err(AdapterError::Translation("unreadable".to_string()))),
        )
        .unwrap();
    let (adapter, transport) = adapter_with(true, inventory);
    transport.route(
        Method::Get,
        "/api/db/accounts/acc_checking/rent-roll",
        Reply::Json(200, json!({"rent_roll": 1800})),
    );

    assert_eq!(
        adapter.fetch_manual_data("acc_checking").await,
        ManualData::empty(Some("acc_checking"))
    );
    assert_eq!(transport.request_count(), 1);
}

#[tokio::test]
async fn test_fetch_manual_data() {
    let (adapter, transport) = enabled_adapter();
    transport.route(
        Method::Get,
        "/api/db/accounts/acc_checking/rent-roll",
        Reply::Json(200, json!({"rentRoll": 2100, "updatedAt": "2025-10-01T12:00:00Z"})),
    );
    let data = adapter.fetch_manual_data("acc_checking").await;
    assert_eq!(
        data,
        ManualData {
            account_id: Some("acc_checking".to_string()),
            rent_roll: Some(2100.0),
            updated_at: Some("2025-10-01T12:00:00.000Z".to_string()),
        }
    );

    transport.route(
        Method::Get,
        "/api/db/accounts/acc_savings/rent-roll",
        Reply::Raw(200, "OK", "not json".to_string()),
    );
    assert_eq!(
        adapter.fetch_manual_data("acc_savings").await,
        ManualData::empty(Some("acc_savings"))
    );

    // Unrouted: 404.
    assert_eq!(
        adapter.fetch_manual_data("acc_other").await,
        ManualData::empty(Some("acc_other"))
    );
}

#[tokio::test]
async fn test_save_manual_data_puts_json_and_translates_reply() {
    let (adapter, transport) = enabled_adapter();
    transport.route(
        Method::Put,
        "/api/db/accounts/acc_checking/rent-roll",
        Reply::Json(
            200,
            json!({"account_id": "acc_checking", "rent_roll": "1500", "updated_at": "2025-10-02"}),
        ),
    );

    let saved = adapter
        .save_manual_data("acc_checking", Some(1500.0))
        .await
        .unwrap();
    assert_eq!(saved.rent_roll, Some(1500.0));
    assert_eq!(saved.updated_at.as_deref(), Some("2025-10-02T00:00:00.000Z"));

    let request = &transport.requests()[0];
    assert_eq!(request.method, Method::Put);
    assert_eq!(request.headers["Content-Type"], "application/json");
    assert_eq!(request.body, Some(json!({"rent_roll": 1500.0})));
}

#[tokio::test]
async fn test_save_manual_data_clears_with_null() {
    let (adapter, transport) = enabled_adapter();
    transport.route(
        Method::Put,
        "/api/db/accounts/acc_checking/rent-roll",
        Reply::Raw(204, "No Content", String::new()),
    );

    let saved = adapter.save_manual_data("acc_checking", None).await.unwrap();
    assert_eq!(saved, ManualData::empty(Some("acc_checking")));
    assert_eq!(transport.requests()[0].body, Some(json!({"rent_roll": null})));
}

#[tokio::test]
async fn test_save_manual_data_error_messages() {
    let cases = vec![
        (
            Reply::Json(422, json!({"errors": [{"message": "Rent roll must be positive"}]})),
            "Rent roll must be positive",
        ),
        (
            Reply::Json(400, json!({"error": {"description": "Bad input"}})),
            "Bad input",
        ),
        (
            Reply::Raw(500, "Internal Server Error", "oops".to_string()),
            "Internal Server Error",
        ),
        (Reply::Raw(500, "", String::new()), "Failed to save"),
    ];

    for (reply, expected) in cases {
        let (adapter, transport) = enabled_adapter();
        transport.route(Method::Put, "/api/db/accounts/acc_checking/rent-roll", reply);
        let err = adapter
            .save_manual_data("acc_checking", Some(1.0))
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::SaveFailed(_)));
        assert_eq!(err.to_string(), expected);
    }
}

#[tokio::test]
async fn test_save_manual_data_propagates_transport_errors() {
    let (adapter, transport) = enabled_adapter();
    transport.route(
        Method::Put,
        "/api/db/accounts/acc_checking/rent-roll",
        Reply::Down,
    );
    let err = adapter
        .save_manual_data("acc_checking", Some(1.0))
        .await
        .unwrap_err();
    assert!(matches!(err, AdapterError::Transport(_)));
}

#[tokio::test]
async fn test_load_config_merges_remote_settings() {
    let (mut adapter, transport) = adapter_with(false, BackendInventory::new());
    transport.route(
        Method::Get,
        "/api/config",
        Reply::Json(
            200,
            json!({
                "featureFlags": {"useBackend": true},
                "api": {"baseUrl": "https://bank.example/api/"},
                "auth": {"header": "X-Api-Key", "prefix": "Key ", "token": "secret"},
                "headers": {"X-Tenant": "demo"},
                "theme": "dark"
            }),
        ),
    );
    transport.route(
        Method::Get,
        "https://bank.example/api/db/accounts",
        Reply::Json(200, json!([{"id": "remote"}])),
    );

    let snapshot = adapter.load_config().await;
    assert!(snapshot.enabled);
    assert_eq!(snapshot.api_base_url, "https://bank.example/api/");
    assert_eq!(adapter.config().extras.get("theme"), Some(&json!("dark")));
    assert!(adapter.config().extras.contains_key("api"));

    let accounts = adapter.fetch_accounts().await;
    assert_eq!(accounts[0].id, "remote");

    let requests = transport.requests();
    assert_eq!(requests[0].url, "/api/config");
    assert!(!requests[0].headers.contains_key("Authorization"));
    let headers = &requests[1].headers;
    assert_eq!(headers["X-Api-Key"], "Key secret");
    assert_eq!(headers["X-Tenant"], "demo");
}

#[tokio::test]
async fn test_load_config_never_fails() {
    for reply in [
        Reply::Down,
        Reply::Json(500, json!({"featureUseBackend": true})),
        Reply::Raw(200, "OK", "{broken".to_string()),
    ] {
        let (mut adapter, transport) = adapter_with(false, BackendInventory::new());
        transport.route(Method::Get, "/api/config", reply);
        let snapshot = adapter.load_config().await;
        assert!(!snapshot.enabled);
        assert_eq!(snapshot.api_base_url, "/api");
        assert_eq!(adapter.config(), &AdapterConfig::default());
    }
}

#[tokio::test]
async fn test_load_config_skipped_in_local_file_context() {
    let transport = Arc::new(FakeTransport::default());
    let options = AdapterOptions {
        runtime: RuntimeContext::LocalFile,
        ..AdapterOptions::default()
    };
    let mut adapter = BackendAdapter::new(options, BackendInventory::new(), transport.clone());
    let snapshot = adapter.load_config().await;
    assert_eq!(
        snapshot,
        ConfigSnapshot {
            enabled: false,
            api_base_url: "/api".to_string()
        }
    );
    assert_eq!(transport.request_count(), 0);
}

#[tokio::test]
async fn test_concurrent_reads_share_one_adapter() {
    let (adapter, transport) = enabled_adapter();
    transport.route(
        Method::Get,
        "/api/db/accounts/acc_checking/balances",
        Reply::Json(200, json!({"available": 1})),
    );
    let adapter = Arc::new(adapter);

    let reads = (0..4).map(|_| {
        let adapter = Arc::clone(&adapter);
        async move { adapter.fetch_cached_balance("acc_checking").await }
    });
    let results = futures::future::join_all(reads).await;
    assert!(results
        .iter()
        .all(|b| b.as_ref().and_then(|b| b.available) == Some(1.0)));
    assert_eq!(transport.request_count(), 4);
}
