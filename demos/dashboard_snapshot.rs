use dashboard_backend_adapter::*;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    println!("📊 Dashboard Snapshot\n");

    let options = AdapterOptions::from_env();
    let origin = std::env::var("BACKEND_ORIGIN").ok();
    if origin.is_none() {
        println!("BACKEND_ORIGIN not set; remote config cannot be fetched, demo data will be shown.\n");
    }

    let mut adapter = BackendAdapter::with_reqwest(options, BackendInventory::new(), origin);
    let snapshot = adapter.load_config().await;
    println!(
        "Backend: {} (api base '{}')\n",
        if snapshot.enabled { "enabled" } else { "disabled" },
        snapshot.api_base_url
    );

    for account in adapter.fetch_accounts().await {
        let masked = account
            .last_four
            .as_deref()
            .map(|digits| format!(" •••• {}", digits))
            .unwrap_or_default();
        println!(
            "🏦 {} ({}){}",
            account.name,
            account.institution.as_deref().unwrap_or("Unknown institution"),
            masked
        );

        match adapter.fetch_cached_balance(&account.id).await {
            Some(balance) => println!(
                "   Available: {:?} {}  Ledger: {:?}  Cached: {}",
                balance.available,
                balance.currency,
                balance.ledger,
                balance.cached_at.as_deref().unwrap_or("-")
            ),
            None => println!("   No balance available"),
        }

        let txs = adapter
            .fetch_cached_transactions(&account.id, Some(DEFAULT_TRANSACTION_LIMIT))
            .await;
        if txs.is_empty() {
            println!("   No recent transactions");
        }
        for tx in txs {
            println!(
                "   {:<12} {:>10.2}  {}",
                tx.description,
                tx.amount,
                tx.date.as_deref().unwrap_or("")
            );
        }

        let manual = adapter.fetch_manual_data(&account.id).await;
        println!("   Rent roll: {:?}\n", manual.rent_roll);
    }

    println!("Canonical schemas:\n{}", serde_json::to_string_pretty(&canonical_schemas())?);

    Ok(())
}
