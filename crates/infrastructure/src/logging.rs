use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{ConfigError, LogFormat, LogLevel};

/// Crates whose events follow the configured level. Everything else is
/// held at `warn` or quieter.
const SERVICE_TARGETS: [&str; 2] = ["application", "infrastructure"];

/// Filter used when `RUST_LOG` is unset: the configured level for the
/// service crates, `warn` for dependencies (or `error` when the configured
/// level is `error`).
pub fn default_directives(level: LogLevel) -> String {
    let floor = match level {
        LogLevel::Error => "error",
        _ => "warn",
    };
    let mut directives = floor.to_string();
    for target in SERVICE_TARGETS {
        directives.push_str(&format!(",{target}={}", level.as_str()));
    }
    directives
}

/// Install the global subscriber writing to stdout.
///
/// Cache and resolution events carry their data as fields (`name`, `ips`,
/// `ttl_secs`, `purged`, `missing`, ...). JSON output flattens them next to
/// the message and omits span context, since the service opens no spans.
/// Text output is one compact line per event.
///
/// `RUST_LOG` overrides [`default_directives`]. Fails if a global subscriber
/// is already installed.
pub fn init_logging(level: LogLevel, format: LogFormat) -> Result<(), ConfigError> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directives(level)))
        .map_err(|e| ConfigError::Logging(e.to_string()))?;

    let registry = tracing_subscriber::registry().with(env_filter);

    let result = match format {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .flatten_event(true)
                    .with_current_span(false)
                    .with_span_list(false)
                    .with_target(true)
                    .with_ansi(false),
            )
            .try_init(),
        LogFormat::Text => registry
            .with(fmt::layer().compact().with_target(true))
            .try_init(),
    };
    result.map_err(|e| ConfigError::Logging(e.to_string()))
}
