//! ServerConfig - 起動設定
//!
//! # 優先順位
//! 1. デフォルト値
//! 2. `COURIER_*` 環境変数（`.env` は CLI 側で dotenvy が読み込む）
//! 3. CLI フラグ（courier-cli が上書き）
//!
//! 空文字の環境変数は未設定として扱う。

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::app::DispatchOptions;

pub const ENV_LISTEN_ADDR: &str = "COURIER_LISTEN_ADDR";
pub const ENV_WS_PATH: &str = "COURIER_WS_PATH";
pub const ENV_MAX_IN_FLIGHT: &str = "COURIER_MAX_IN_FLIGHT";
pub const ENV_HANDLER_TIMEOUT_MS: &str = "COURIER_HANDLER_TIMEOUT_MS";
pub const ENV_HTTP_TIMEOUT_MS: &str = "COURIER_HTTP_TIMEOUT_MS";
pub const ENV_LOG: &str = "COURIER_LOG";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    /// Upgrade path; every other path is answered with 404.
    pub ws_path: String,
    /// `None` = unbounded.
    pub max_in_flight: Option<usize>,
    /// `None` = handlers may run forever.
    pub handler_timeout: Option<Duration>,
    /// Whole-request timeout of the outbound HTTP client.
    pub http_timeout: Duration,
    /// Used when `RUST_LOG` is not set.
    pub log_filter: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    fn invalid(key: &'static str, value: &str, reason: impl ToString) -> Self {
        Self::Invalid {
            key,
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            ws_path: "/ws".to_string(),
            max_in_flight: None,
            handler_timeout: None,
            http_timeout: Duration::from_secs(30),
            log_filter: "info".to_string(),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for the `COURIER_*` keys.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(v) = get(ENV_LISTEN_ADDR) {
            config.listen_addr = parse(ENV_LISTEN_ADDR, &v)?;
        }
        if let Some(v) = get(ENV_WS_PATH) {
            config.ws_path = validate_path(ENV_WS_PATH, v)?;
        }
        if let Some(v) = get(ENV_MAX_IN_FLIGHT) {
            config.max_in_flight = non_zero(parse(ENV_MAX_IN_FLIGHT, &v)?);
        }
        if let Some(v) = get(ENV_HANDLER_TIMEOUT_MS) {
            config.handler_timeout = non_zero(parse(ENV_HANDLER_TIMEOUT_MS, &v)?).map(Duration::from_millis);
        }
        if let Some(v) = get(ENV_HTTP_TIMEOUT_MS) {
            let ms: u64 = parse(ENV_HTTP_TIMEOUT_MS, &v)?;
            if ms == 0 {
                return Err(ConfigError::invalid(ENV_HTTP_TIMEOUT_MS, &v, "must be positive"));
            }
            config.http_timeout = Duration::from_millis(ms);
        }
        if let Some(v) = get(ENV_LOG) {
            config.log_filter = v;
        }

        Ok(config)
    }

    pub fn dispatch_options(&self) -> DispatchOptions {
        DispatchOptions {
            max_in_flight: self.max_in_flight,
            handler_timeout: self.handler_timeout,
        }
    }
}

fn parse<T>(key: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| ConfigError::invalid(key, value, e))
}

/// 0 は「無効」の意味
fn non_zero<T: Default + PartialEq>(value: T) -> Option<T> {
    (value != T::default()).then_some(value)
}

pub fn validate_path(key: &'static str, path: String) -> Result<String, ConfigError> {
    if path.starts_with('/') {
        Ok(path)
    } else {
        Err(ConfigError::invalid(key, &path, "must start with '/'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.listen_addr.port(), 8080);
        assert_eq!(config.dispatch_options(), DispatchOptions::default());
    }

    #[test]
    fn env_overrides_defaults() {
        let config = ServerConfig::from_lookup(lookup(&[
            (ENV_LISTEN_ADDR, "127.0.0.1:9000"),
            (ENV_WS_PATH, "/socket"),
            (ENV_MAX_IN_FLIGHT, "16"),
            (ENV_HANDLER_TIMEOUT_MS, "1500"),
            (ENV_HTTP_TIMEOUT_MS, "2000"),
            (ENV_LOG, "courier_core=debug"),
        ]))
        .unwrap();

        assert_eq!(config.listen_addr, "127.0.0.1:9000".parse().unwrap());
        assert_eq!(config.ws_path, "/socket");
        assert_eq!(
            config.dispatch_options(),
            DispatchOptions {
                max_in_flight: Some(16),
                handler_timeout: Some(Duration::from_millis(1500)),
            }
        );
        assert_eq!(config.http_timeout, Duration::from_secs(2));
        assert_eq!(config.log_filter, "courier_core=debug");
    }

    #[test]
    fn zero_and_empty_mean_unset() {
        let config = ServerConfig::from_lookup(lookup(&[
            (ENV_MAX_IN_FLIGHT, "0"),
            (ENV_HANDLER_TIMEOUT_MS, "0"),
            (ENV_WS_PATH, ""),
        ]))
        .unwrap();
        assert_eq!(config.max_in_flight, None);
        assert_eq!(config.handler_timeout, None);
        assert_eq!(config.ws_path, "/ws");
    }

    #[rstest]
    #[case(ENV_LISTEN_ADDR, "localhost")]
    #[case(ENV_WS_PATH, "ws")]
    #[case(ENV_MAX_IN_FLIGHT, "-1")]
    #[case(ENV_HANDLER_TIMEOUT_MS, "soon")]
    #[case(ENV_HTTP_TIMEOUT_MS, "0")]
    fn invalid_values_are_rejected(#[case] key: &'static str, #[case] value: &str) {
        let err = ServerConfig::from_lookup(lookup(&[(key, value)])).unwrap_err();
        assert!(err.to_string().starts_with(&format!("invalid value for {key}")));
    }
}
