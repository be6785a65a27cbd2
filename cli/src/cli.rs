//! # CLI Interface
//!
//! Defines the command-line argument structure for `tally` using `clap`
//! derive. Every subcommand is a thin wrapper over one `Chain` operation.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use tally_ledger::config::DEFAULT_DATA_DIR;
use tally_ledger::LedgerConfig;

use crate::logging::LogFormat;

/// Append-only hash-linked ledger.
#[derive(Parser, Debug)]
#[command(
    name = "tally",
    about = "Append-only hash-linked ledger",
    version,
    propagate_version = true
)]
pub struct TallyCli {
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every subcommand.
#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Directory of the ledger database.
    #[arg(long, short = 'd', global = true, env = "TALLY_DATA_DIR", default_value = DEFAULT_DATA_DIR)]
    pub data_dir: PathBuf,

    /// Proof-of-work target in leading zero bits. 0 disables sealing.
    ///
    /// Must match the value the ledger was created with, or `verify` will
    /// reject its blocks.
    #[arg(long, global = true, env = "TALLY_DIFFICULTY", default_value_t = 0)]
    pub difficulty: u32,

    /// Default log filter when `RUST_LOG` is unset.
    #[arg(long, global = true, env = "TALLY_LOG", default_value = "tally=info,tally_ledger=info")]
    pub log_level: String,

    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

impl GlobalArgs {
    /// Ledger configuration described by these flags.
    pub fn ledger_config(&self) -> LedgerConfig {
        LedgerConfig::new(&self.data_dir).with_difficulty(self.difficulty)
    }
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the ledger and its genesis block.
    Init(PayloadArgs),
    /// Seal a new block on top of the tip.
    Append(PayloadArgs),
    /// Dump blocks from the tip back to genesis.
    Print(PrintArgs),
    /// Print the current tip hash.
    Tip,
    /// Re-hash and re-link every block.
    Verify,
    /// Print version information and exit.
    Version,
}

/// Arguments for `init` and `append`.
#[derive(Args, Debug)]
pub struct PayloadArgs {
    /// Block payload, stored as UTF-8 bytes.
    #[arg(long, short = 'p')]
    pub payload: String,
}

/// Arguments for `print`.
#[derive(Args, Debug)]
pub struct PrintArgs {
    /// Emit one JSON object per line instead of the text dump.
    #[arg(long)]
    pub json: bool,

    /// Stop after this many blocks.
    #[arg(long, short = 'n')]
    pub limit: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_structure() {
        TallyCli::command().debug_assert();
    }

    #[test]
    fn parses_append_with_global_flags() {
        let cli = TallyCli::try_parse_from([
            "tally",
            "append",
            "--payload",
            "alice->bob:10",
            "--data-dir",
            "/tmp/ledger",
            "--difficulty",
            "8",
        ])
        .expect("valid arguments");

        match cli.command {
            Commands::Append(args) => assert_eq!(args.payload, "alice->bob:10"),
            other => panic!("unexpected command: {other:?}"),
        }
        let config = cli.global.ledger_config();
        assert_eq!(config.path, PathBuf::from("/tmp/ledger"));
        assert_eq!(config.difficulty_bits, 8);
    }

    #[test]
    fn log_format_is_validated() {
        let cli = TallyCli::try_parse_from(["tally", "tip", "--log-format", "json"]).unwrap();
        assert_eq!(cli.global.log_format, LogFormat::Json);
        assert!(TallyCli::try_parse_from(["tally", "tip", "--log-format", "xml"]).is_err());
    }

    #[test]
    fn init_requires_payload() {
        assert!(TallyCli::try_parse_from(["tally", "init"]).is_err());
    }
}
