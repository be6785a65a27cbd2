// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Tally
//!
//! Entry point for the `tally` binary. Parses CLI arguments, initializes
//! logging, opens the ledger and runs one operation against it.
//!
//! The binary supports six subcommands:
//!
//! - `init`    — create the ledger with a genesis payload
//! - `append`  — seal a new block on top of the tip
//! - `print`   — walk from the tip back to genesis
//! - `tip`     — print the current tip hash
//! - `verify`  — re-check hashes, seals and links
//! - `version` — print build version information

mod cli;
mod logging;
mod view;

use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, Write};

use tally_ledger::{Chain, LedgerConfig};

use cli::{Commands, GlobalArgs, PayloadArgs, PrintArgs, TallyCli};
use view::BlockView;

fn main() -> Result<()> {
    let cli = TallyCli::parse();

    logging::init_logging(&cli.global.log_level, cli.global.log_format)?;
    let config = cli.global.ledger_config();
    tracing::debug!(
        data_dir = %config.path.display(),
        difficulty_bits = config.difficulty_bits,
        "ledger configuration"
    );

    let mut out = io::stdout().lock();
    match cli.command {
        Commands::Init(args) => init_ledger(&config, &args, &mut out),
        Commands::Append(args) => append_block(&config, &args, &mut out),
        Commands::Print(args) => print_chain(&config, &args, &mut out),
        Commands::Tip => print_tip(&config, &mut out),
        Commands::Verify => verify_chain(&config, &mut out),
        Commands::Version => {
            print_version(&mut out)?;
            return Ok(());
        }
    }
    .with_context(|| describe(&cli.global))
}

/// Creates the store and writes the genesis block.
fn init_ledger(config: &LedgerConfig, args: &PayloadArgs, out: &mut impl Write) -> Result<()> {
    if let Some(parent) = config.path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory: {}", parent.display()))?;
    }

    let chain = Chain::initialize_with(config, args.payload.as_bytes())
        .context("failed to initialize ledger")?;
    let genesis = chain.tip_block()?;
    chain.close()?;

    writeln!(out, "initialized ledger at {}", config.path.display())?;
    writeln!(out, "genesis {}", genesis.hash)?;
    Ok(())
}

/// Seals `args.payload` into a new block and commits it as the tip.
fn append_block(config: &LedgerConfig, args: &PayloadArgs, out: &mut impl Write) -> Result<()> {
    let mut chain = open_chain(config)?;
    let block = chain
        .append(args.payload.as_bytes())
        .context("failed to append block")?;
    chain.close()?;

    writeln!(out, "block {} at height {}", block.hash, block.height)?;
    Ok(())
}

/// Walks from the tip to genesis, newest first.
fn print_chain(config: &LedgerConfig, args: &PrintArgs, out: &mut impl Write) -> Result<()> {
    let chain = open_chain(config)?;
    let limit = args.limit.unwrap_or(usize::MAX);

    for block in chain.ancestors().take(limit) {
        let block = block.context("chain walk failed")?;
        if args.json {
            serde_json::to_writer(&mut *out, &BlockView::from(&block))?;
            writeln!(out)?;
        } else {
            writeln!(out, "{block}")?;
        }
    }
    Ok(())
}

fn print_tip(config: &LedgerConfig, out: &mut impl Write) -> Result<()> {
    let chain = open_chain(config)?;
    writeln!(out, "{}", chain.tip())?;
    Ok(())
}

/// Re-verifies every block. Fails on the first inconsistency.
fn verify_chain(config: &LedgerConfig, out: &mut impl Write) -> Result<()> {
    let chain = open_chain(config)?;
    let count = chain
        .verify_integrity()
        .context("ledger failed verification")?;

    tracing::info!(blocks = count, tip = %chain.tip(), "ledger verified");
    writeln!(out, "ok: {count} blocks verified")?;
    Ok(())
}

fn open_chain(config: &LedgerConfig) -> Result<Chain> {
    Chain::open_with(config)
        .with_context(|| format!("failed to open ledger at {}", config.path.display()))
}

fn describe(global: &GlobalArgs) -> String {
    format!("tally ({})", global.data_dir.display())
}

/// Prints version information for the binary.
fn print_version(out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "tally {}", env!("CARGO_PKG_VERSION"))?;
    writeln!(out, "rustc {}", option_env!("RUSTC_VERSION").unwrap_or("unknown"))
}
