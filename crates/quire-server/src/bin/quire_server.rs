use clap::Parser;
use tracing::{info, warn};

use quire_server::server::{AppState, TelemetryConfig, telemetry};
use quire_server::{Config, SqlApiWarehouse, UnconfiguredWarehouse, Warehouse};

#[tokio::main]
async fn main() -> miette::Result<()> {
    dotenvy::dotenv().ok();

    telemetry::init(TelemetryConfig::from_env("quire-server"));

    let config = Config::parse();

    let state = match config.warehouse.sql_api()? {
        Some(api) => {
            let warehouse = SqlApiWarehouse::new(api);
            // Failing here is not fatal: statements reconnect on demand.
            if let Err(err) = warehouse.connect().await {
                warn!(%err, "initial warehouse connection failed");
            }
            AppState::new(warehouse, config.relay_capacity)
        }
        None => {
            warn!("WAREHOUSE_ACCOUNT/WAREHOUSE_TOKEN not set, query endpoints will return 503");
            AppState::new(UnconfiguredWarehouse, config.relay_capacity)
        }
    };

    info!(
        host = %config.host,
        port = config.port,
        relay_capacity = config.relay_capacity,
        "quire server starting"
    );
    quire_server::run(state, &config).await?;
    Ok(())
}
