use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use auditry_core::AppError;
use tracing_subscriber::EnvFilter;
use url::Url;

/// Runtime configuration, read from the environment once at startup.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub api_host: String,
    pub api_port: u16,
    pub ingest_api_key: String,
    pub collector_url: String,
    pub clickhouse_url: String,
    pub clickhouse_database: String,
    pub clickhouse_user: String,
    pub clickhouse_password: String,
    pub opensearch_url: String,
    pub forward_queue_depth: usize,
}

impl ApiConfig {
    pub fn load() -> Result<Self, AppError> {
        let api_host = env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".to_owned());
        let api_port = env::var("API_PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(8080);

        let ingest_api_key = required_env("INGEST_API_KEY")?;

        let collector_url = checked_url("COLLECTOR_URL", "http://audit-collector:8080/ingest")?;
        let clickhouse_url = checked_url("CLICKHOUSE_URL", "http://clickhouse:8123")?;
        let clickhouse_database =
            env::var("CLICKHOUSE_DATABASE").unwrap_or_else(|_| "audit".to_owned());
        let clickhouse_user = env::var("CLICKHOUSE_USER").unwrap_or_else(|_| "default".to_owned());
        let clickhouse_password = env::var("CLICKHOUSE_PASSWORD").unwrap_or_default();
        let opensearch_url = checked_url("OPENSEARCH_URL", "http://opensearch:9200")?;

        let forward_queue_depth = env::var("FORWARD_QUEUE_DEPTH")
            .ok()
            .and_then(|value| value.parse::<usize>().ok())
            .filter(|depth| *depth > 0)
            .unwrap_or(1024);

        Ok(Self {
            api_host,
            api_port,
            ingest_api_key,
            collector_url,
            clickhouse_url,
            clickhouse_database,
            clickhouse_user,
            clickhouse_password,
            opensearch_url,
            forward_queue_depth,
        })
    }

    pub fn socket_address(&self) -> Result<SocketAddr, AppError> {
        let host = IpAddr::from_str(&self.api_host).map_err(|error| {
            AppError::Internal(format!("invalid API_HOST '{}': {error}", self.api_host))
        })?;
        Ok(SocketAddr::from((host, self.api_port)))
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn required_env(name: &str) -> Result<String, AppError> {
    env::var(name).map_err(|_| AppError::Validation(format!("{name} is required")))
}

fn checked_url(name: &str, default: &str) -> Result<String, AppError> {
    let value = env::var(name).unwrap_or_else(|_| default.to_owned());
    Url::parse(&value).map_err(|error| AppError::Validation(format!("invalid {name}: {error}")))?;
    Ok(value)
}
