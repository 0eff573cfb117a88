//! Logging setup - tracing-subscriber (fmt + env-filter)

use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
pub enum ObservabilityError {
    #[error("invalid log filter {filter:?}: {reason}")]
    Filter { filter: String, reason: String },
}

/// Install the global subscriber. `RUST_LOG` wins over `default_filter`.
///
/// 2 回目以降の呼び出しは何もしない（テストから複数回呼ばれても安全）。
pub fn init_tracing(default_filter: &str) -> Result<(), ObservabilityError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_filter).map_err(|e| ObservabilityError::Filter {
            filter: default_filter.to_string(),
            reason: e.to_string(),
        })?,
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .compact()
        .try_init();
    Ok(())
}
