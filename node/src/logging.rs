//! # Structured Logging
//!
//! Initializes the `tracing` subscriber with a JSON or pretty formatter and
//! `RUST_LOG`-style filtering. All output goes to stderr; stdout is left for
//! command output such as `custodia-node status`.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable, colored output.
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Builds the default filter directive for a bare level such as `"debug"`.
///
/// The node's own crates log at `level`; HTTP request tracing stays at
/// `info` unless the level asks for more.
pub fn default_directive(level: &str) -> String {
    format!(
        "custodia_node={level},custodia_contracts={level},custodia_protocol={level},tower_http=info"
    )
}

/// Installs the global tracing subscriber.
///
/// Call once, early in `main()`. `RUST_LOG` overrides `default_filter`
/// when set.
pub fn init_logging(default_filter: &str, format: LogFormat) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    match format {
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(true)
                        .with_file(true)
                        .with_line_number(true),
                )
                .init();
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    fmt::layer()
                        .json()
                        .with_writer(std::io::stderr)
                        .with_target(true),
                )
                .init();
        }
    }

    tracing::info!("logging initialized (format={:?})", format);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directive_covers_workspace_crates() {
        let directive = default_directive("debug");
        assert!(directive.contains("custodia_contracts=debug"));
        assert!(EnvFilter::try_new(&directive).is_ok());
    }
}
