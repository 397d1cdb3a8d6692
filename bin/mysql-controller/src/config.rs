//! Controller configuration read from the environment

use anyhow::{bail, Context, Result};
use std::net::SocketAddr;
use std::time::Duration;

/// Namespace to watch; all namespaces when unset
pub const ENV_WATCH_NAMESPACE: &str = "WATCH_NAMESPACE";
/// Listen address of the metrics and probe server
pub const ENV_METRICS_ADDR: &str = "METRICS_ADDR";
/// Delay before a failed reconciliation is retried
pub const ENV_ERROR_REQUEUE_SECS: &str = "ERROR_REQUEUE_SECS";
/// Upper bound on reconciliations running at once
pub const ENV_MAX_CONCURRENT_RECONCILES: &str = "MAX_CONCURRENT_RECONCILES";
/// `text` or `json`
pub const ENV_LOG_FORMAT: &str = "LOG_FORMAT";

const DEFAULT_METRICS_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_ERROR_REQUEUE_SECS: u64 = 30;
const DEFAULT_MAX_CONCURRENT_RECONCILES: u16 = 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ControllerConfig {
    pub watch_namespace: Option<String>,
    pub metrics_addr: SocketAddr,
    pub error_requeue: Duration,
    pub max_concurrent_reconciles: u16,
    pub log_format: LogFormat,
}

impl ControllerConfig {
    /// Load configuration from process environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup`, which returns the value of a variable if set
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let metrics_addr = get(ENV_METRICS_ADDR)
            .unwrap_or_else(|| DEFAULT_METRICS_ADDR.to_string())
            .parse::<SocketAddr>()
            .with_context(|| format!("{} is not a socket address", ENV_METRICS_ADDR))?;

        let error_requeue = match get(ENV_ERROR_REQUEUE_SECS) {
            Some(v) => v
                .parse::<u64>()
                .with_context(|| format!("{} must be a number of seconds", ENV_ERROR_REQUEUE_SECS))?,
            None => DEFAULT_ERROR_REQUEUE_SECS,
        };

        let max_concurrent_reconciles = match get(ENV_MAX_CONCURRENT_RECONCILES) {
            Some(v) => v.parse::<u16>().with_context(|| {
                format!("{} must be a positive integer", ENV_MAX_CONCURRENT_RECONCILES)
            })?,
            None => DEFAULT_MAX_CONCURRENT_RECONCILES,
        };
        if max_concurrent_reconciles == 0 {
            bail!("{} must be at least 1", ENV_MAX_CONCURRENT_RECONCILES);
        }

        let log_format = match get(ENV_LOG_FORMAT).as_deref().map(str::to_lowercase).as_deref() {
            None | Some("text") => LogFormat::Text,
            Some("json") => LogFormat::Json,
            Some(other) => bail!("unsupported {} {:?}", ENV_LOG_FORMAT, other),
        };

        Ok(Self {
            watch_namespace: get(ENV_WATCH_NAMESPACE),
            metrics_addr,
            error_requeue: Duration::from_secs(error_requeue),
            max_concurrent_reconciles,
            log_format,
        })
    }
}
