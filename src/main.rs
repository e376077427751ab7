use baseline_ledger::{
    config::{self, database},
    core::{TransactionFilter, ensure_settings, ledger_overview},
    errors::Result,
};
use dotenvy::dotenv;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // 1. Load .env file (non-fatal, env vars can be set externally)
    let dotenv_loaded = dotenv().is_ok();

    // 2. Load the application configuration
    let app_config = config::load_app_configuration()?;

    // 3. Initialize tracing, preferring RUST_LOG over the configured filter
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&app_config.log_filter)),
        )
        .init();
    info!(dotenv_loaded, "Configuration loaded.");

    // 4. Connect and make sure the schema exists
    let db = database::create_connection(&app_config.database_url)
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db).await?;

    // 5. Seed the settings row on first run
    let settings = ensure_settings(&db, app_config.initial_baseline_balance).await?;
    info!(
        baseline_balance = settings.baseline_balance,
        "Settings ready."
    );

    // 6. Report the current state of the ledger
    let overview = ledger_overview(&db, &TransactionFilter::new()).await?;
    info!(
        projected_balance = overview.projected_balance,
        pending = overview.matching_transactions,
        total = overview.total_transactions,
        "Ledger loaded."
    );
    for view in &overview.transactions {
        debug!(
            transaction_id = view.transaction.id,
            party = %view.transaction.party,
            due_date = ?view.due_date,
            balance = view.balance,
            "Pending transaction"
        );
    }

    Ok(())
}
