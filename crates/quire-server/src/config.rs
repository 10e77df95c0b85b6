use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;
use url::Url;

use crate::error::ServerError;

/// Server configuration, from CLI flags or the environment (`.env` is loaded
/// first by the binary).
#[derive(Debug, Clone, Parser)]
#[command(name = "quire-server")]
#[command(about = "quire backend - warehouse query proxy and collaboration relay")]
pub struct Config {
    #[arg(long, env = "QUIRE_HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "PORT", default_value_t = 3001)]
    pub port: u16,

    /// Buffered frames per collaboration room before slow peers lag.
    #[arg(long, env = "QUIRE_RELAY_CAPACITY", default_value_t = 256)]
    pub relay_capacity: usize,

    #[command(flatten)]
    pub warehouse: WarehouseArgs,
}

impl Config {
    pub fn addr(&self) -> Result<SocketAddr, ServerError> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse().map_err(|_| ServerError::Address { addr })
    }
}

/// Warehouse connection settings. Everything is optional so the server can
/// start without a warehouse; see [`WarehouseArgs::sql_api`].
#[derive(Debug, Clone, Default, clap::Args)]
pub struct WarehouseArgs {
    /// Account identifier, e.g. `xy12345.eu-central-1`.
    #[arg(long = "warehouse-account", env = "WAREHOUSE_ACCOUNT")]
    pub account: Option<String>,

    #[arg(long = "warehouse-user", env = "WAREHOUSE_USER")]
    pub user: Option<String>,

    /// Bearer token for the SQL API.
    #[arg(long = "warehouse-token", env = "WAREHOUSE_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    #[arg(long = "warehouse-database", env = "WAREHOUSE_DATABASE")]
    pub database: Option<String>,

    #[arg(long = "warehouse-schema", env = "WAREHOUSE_SCHEMA")]
    pub schema: Option<String>,

    #[arg(long = "warehouse-name", env = "WAREHOUSE_WAREHOUSE")]
    pub warehouse: Option<String>,

    #[arg(long = "warehouse-role", env = "WAREHOUSE_ROLE")]
    pub role: Option<String>,

    /// Overrides the endpoint derived from the account (for proxies and tests).
    #[arg(long = "warehouse-url", env = "WAREHOUSE_URL")]
    pub url: Option<String>,

    /// Per-statement timeout in seconds.
    #[arg(long = "warehouse-timeout", env = "WAREHOUSE_TIMEOUT", default_value_t = 60)]
    pub timeout_secs: u64,
}

/// Resolved settings for [`crate::warehouse::SqlApiWarehouse`].
#[derive(Debug, Clone)]
pub struct SqlApiConfig {
    pub endpoint: Url,
    pub token: String,
    pub user: Option<String>,
    pub database: Option<String>,
    pub schema: Option<String>,
    pub warehouse: Option<String>,
    pub role: Option<String>,
    pub timeout: Duration,
}

impl WarehouseArgs {
    /// Settings for the live warehouse, or `None` when the account or token
    /// is missing.
    pub fn sql_api(&self) -> Result<Option<SqlApiConfig>, ServerError> {
        let (Some(account), Some(token)) = (&self.account, &self.token) else {
            return Ok(None);
        };
        let base = self
            .url
            .clone()
            .unwrap_or_else(|| format!("https://{account}.snowflakecomputing.com"));
        let endpoint = Url::parse(&base)
            .and_then(|url| url.join("/api/v2/statements"))
            .map_err(|e| ServerError::WarehouseUrl {
                url: base,
                message: e.to_string(),
            })?;

        Ok(Some(SqlApiConfig {
            endpoint,
            token: token.clone(),
            user: self.user.clone(),
            database: self.database.clone(),
            schema: self.schema.clone(),
            warehouse: self.warehouse.clone(),
            role: self.role.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(args: &[&str]) -> Config {
        Config::try_parse_from(std::iter::once("quire-server").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn defaults_and_overrides() {
        let config = parse(&["--port", "8080", "--relay-capacity", "16"]);
        assert_eq!(config.port, 8080);
        assert_eq!(config.relay_capacity, 16);
        assert_eq!(config.addr().unwrap().port(), 8080);
    }

    #[test]
    fn warehouse_needs_account_and_token() {
        let mut args = WarehouseArgs {
            account: Some("xy12345".into()),
            timeout_secs: 5,
            ..Default::default()
        };
        assert!(args.sql_api().unwrap().is_none());

        args.token = Some("secret".into());
        let api = args.sql_api().unwrap().unwrap();
        assert_eq!(
            api.endpoint.as_str(),
            "https://xy12345.snowflakecomputing.com/api/v2/statements"
        );
        assert_eq!(api.timeout, Duration::from_secs(5));

        args.url = Some("http://127.0.0.1:9000/proxy/".into());
        let api = args.sql_api().unwrap().unwrap();
        assert_eq!(api.endpoint.as_str(), "http://127.0.0.1:9000/api/v2/statements");
    }

    #[test]
    fn bad_host_is_reported() {
        let config = parse(&["--host", "not a host"]);
        assert!(matches!(config.addr(), Err(ServerError::Address { .. })));
    }
}
