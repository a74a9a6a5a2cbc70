//! Tracing bootstrap: `EnvFilter`-from-string configuration plus a
//! `pretty`/`compact`/`full` format switch.

use serde::{Deserialize, Serialize};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Log filter string in the tracing format `target[span{field=value}]=level`.
    /// lvalue is optional and multiple filters can be combined with comma.
    /// e.g. `warn,rbac_core::authorization=debug` will only print `WARN` and
    /// `ERROR` unless the message is logged in a span below
    /// `rbac_core::authorization`, in which case `DEBUG` and `INFO` will
    /// also be printed.
    pub filter: Option<String>,

    pub format: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: None,
            format: "full".to_string(),
        }
    }
}

/// Returned by [`init`]; dropping it is a no-op today but gives callers a
/// value to hold onto for the lifetime of the process, the way a
/// non-blocking writer guard would if one were ever introduced.
pub struct LoggingGuard(());

pub fn init(config: &LogConfig) -> LoggingGuard {
    let subscriber = tracing_subscriber::registry();

    let filter = if let Some(ref filter) = config.filter {
        EnvFilter::new(filter.as_str())
    } else {
        EnvFilter::from_env("RBAC_CORE_LOG")
    };

    let format = config.format.to_lowercase();
    let fmt_layer = tracing_subscriber::fmt::layer();

    match format.as_ref() {
        "pretty" => {
            let fmt_layer = fmt_layer.pretty().with_filter(filter);
            subscriber.with(fmt_layer).init();
        }
        "compact" => {
            let fmt_layer = fmt_layer.compact().with_filter(filter);
            subscriber.with(fmt_layer).init();
        }
        _ => {
            let fmt_layer = fmt_layer.with_filter(filter);
            subscriber.with(fmt_layer).init();
        }
    }

    tracing::info!(format = format.as_str(), "Logging initialized");

    LoggingGuard(())
}
