//! Demo configuration loaded from environment variables.

use std::time::Duration;

use common::OrderId;
use thiserror::Error;

/// Errors raised while reading configuration.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    /// A variable was set but could not be parsed.
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },

    /// A success rate outside `0.0..=1.0`.
    #[error("{key} must be between 0.0 and 1.0, got {rate}")]
    RateOutOfRange { key: &'static str, rate: f64 },
}

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable, multi-line output.
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Demo configuration with defaults matching the original demo.
///
/// Reads from environment variables:
/// - `SAGA_SEED`: seed for simulated outcomes (default: random)
/// - `ORDER_ID`: UUID to run both sagas under (default: random)
/// - `PAYMENT_SUCCESS_RATE`: choreography payment rate (default: `0.8`)
/// - `INVENTORY_SUCCESS_RATE`: choreography inventory rate (default: `0.9`)
/// - `SHIPPING_SUCCESS_RATE`: choreography shipping rate (default: `0.95`)
/// - `ORCHESTRATED_INVENTORY_SUCCESS_RATE` (default: `0.95`)
/// - `ORCHESTRATED_PAYMENT_SUCCESS_RATE` (default: `0.95`)
/// - `SAGA_TIMEOUT_MS`: choreography completion deadline (default: `1000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `pretty` or `json` (default: `pretty`)
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub seed: Option<u64>,
    pub order_id: Option<OrderId>,
    pub payment_success_rate: f64,
    pub inventory_success_rate: f64,
    pub shipping_success_rate: f64,
    pub orchestrated_inventory_success_rate: f64,
    pub orchestrated_payment_success_rate: f64,
    pub saga_timeout: Duration,
    pub log_level: String,
    pub log_format: LogFormat,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through `lookup`, falling back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            seed: parse(&lookup, "SAGA_SEED")?.or(defaults.seed),
            order_id: parse(&lookup, "ORDER_ID")?.or(defaults.order_id),
            payment_success_rate: rate(&lookup, "PAYMENT_SUCCESS_RATE")?
                .unwrap_or(defaults.payment_success_rate),
            inventory_success_rate: rate(&lookup, "INVENTORY_SUCCESS_RATE")?
                .unwrap_or(defaults.inventory_success_rate),
            shipping_success_rate: rate(&lookup, "SHIPPING_SUCCESS_RATE")?
                .unwrap_or(defaults.shipping_success_rate),
            orchestrated_inventory_success_rate: rate(
                &lookup,
                "ORCHESTRATED_INVENTORY_SUCCESS_RATE",
            )?
            .unwrap_or(defaults.orchestrated_inventory_success_rate),
            orchestrated_payment_success_rate: rate(&lookup, "ORCHESTRATED_PAYMENT_SUCCESS_RATE")?
                .unwrap_or(defaults.orchestrated_payment_success_rate),
            saga_timeout: parse(&lookup, "SAGA_TIMEOUT_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.saga_timeout),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: match lookup("LOG_FORMAT").as_deref() {
                None | Some("pretty") => LogFormat::Pretty,
                Some("json") => LogFormat::Json,
                Some(other) => {
                    return Err(ConfigError::InvalidValue {
                        key: "LOG_FORMAT",
                        value: other.to_string(),
                    });
                }
            },
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            seed: None,
            order_id: None,
            payment_success_rate: 0.8,
            inventory_success_rate: 0.9,
            shipping_success_rate: 0.95,
            orchestrated_inventory_success_rate: 0.95,
            orchestrated_payment_success_rate: 0.95,
            saga_timeout: Duration::from_millis(1000),
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}

fn parse<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, ConfigError> {
    match lookup(key) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { key, value }),
    }
}

fn rate(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<f64>, ConfigError> {
    match parse::<f64>(lookup, key)? {
        Some(rate) if !(0.0..=1.0).contains(&rate) => {
            Err(ConfigError::RateOutOfRange { key, rate })
        }
        other => Ok(other),
    }
}
