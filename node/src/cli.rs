//! # CLI Interface
//!
//! Command-line arguments for `custodia-node`, via `clap` derive. Every
//! `run` option can also be set from a `CUSTODIA_*` environment variable.

use clap::{Parser, Subcommand};

use custodia_protocol::config::{DEFAULT_METRICS_PORT, DEFAULT_RPC_PORT};

use crate::logging::LogFormat;

/// Custodia vault node.
///
/// Runs a priced custody vault on an in-process devnet host and serves it
/// over HTTP, JSON-RPC and WebSocket, with Prometheus metrics.
#[derive(Parser, Debug)]
#[command(
    name = "custodia-node",
    about = "Custodia priced vault node",
    version,
    propagate_version = true
)]
pub struct CustodiaCli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the node.
    Run(RunArgs),
    /// Query the status of a running node.
    Status(StatusArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Port for the JSON-RPC and REST API.
    #[arg(long, env = "CUSTODIA_RPC_PORT", default_value_t = DEFAULT_RPC_PORT)]
    pub rpc_port: u16,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "CUSTODIA_METRICS_PORT", default_value_t = DEFAULT_METRICS_PORT)]
    pub metrics_port: u16,

    /// Owner address (`0x` + 40 hex digits). Defaults to an address derived
    /// from the label `custodia:owner`.
    #[arg(long, env = "CUSTODIA_OWNER")]
    pub owner: Option<String>,

    /// Bank cap in whole reference units.
    #[arg(long, env = "CUSTODIA_BANK_CAP", default_value_t = 100_000)]
    pub bank_cap: u64,

    /// Initial native price in whole reference units.
    #[arg(long, env = "CUSTODIA_NATIVE_PRICE", default_value_t = 2_000)]
    pub native_price: u64,

    /// Seconds between devnet feed refreshes. 0 disables refreshing, and
    /// prices go stale after 30 minutes.
    #[arg(long, env = "CUSTODIA_FEED_REFRESH_SECS", default_value_t = 60)]
    pub feed_refresh_secs: u64,

    /// Log level for the node's own crates.
    #[arg(long, env = "CUSTODIA_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log output format.
    #[arg(long, env = "CUSTODIA_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

/// Arguments for the `status` subcommand.
#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// API endpoint of the running node.
    #[arg(long, default_value = "http://127.0.0.1:9841")]
    pub rpc_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_structure() {
        CustodiaCli::command().debug_assert();
    }

    #[test]
    fn run_defaults() {
        let cli = CustodiaCli::parse_from(["custodia-node", "run"]);
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.rpc_port, DEFAULT_RPC_PORT);
        assert_eq!(args.bank_cap, 100_000);
        assert_eq!(args.log_format, LogFormat::Pretty);
        assert!(args.owner.is_none());
    }

    #[test]
    fn json_log_format_parses() {
        let cli = CustodiaCli::parse_from(["custodia-node", "run", "--log-format", "json"]);
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.log_format, LogFormat::Json);
    }
}
