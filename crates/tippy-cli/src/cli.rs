//! CLI argument definitions for the `tippy` binary.

use clap::{Parser, Subcommand};

/// Command-line interface for the Tippy devnet controller.
///
/// Configuration flags such as `--chain` or `--project-root` precede the
/// command and are consumed by the configuration loader.
#[derive(Parser, Debug)]
#[command(name = "tippy", version, disable_help_subcommand = true)]
pub(crate) struct Cli {
    /// The operation to perform.
    #[command(subcommand)]
    pub(crate) command: CliCommand,
}

/// Operations on the configured project.
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CliCommand {
    /// Starts the node and indexer and streams their logs until interrupted.
    Run {
        /// Also starts the continuous miner.
        #[arg(long)]
        miner: bool,
    },
    /// Lists configured ports that are already in use.
    Ports,
    /// Starts the project, mines blocks, then stops it.
    Mine {
        /// Number of blocks to mine on a timer. Without it one block is mined.
        #[arg(long)]
        blocks: Option<u64>,
        /// Seconds between timed blocks.
        #[arg(long, default_value_t = 1, requires = "blocks")]
        interval: u64,
    },
    /// Prints a page of user transactions from the running node as JSON.
    Transactions {
        /// One-based page number.
        #[arg(long)]
        page: Option<u64>,
        /// Transactions per page.
        #[arg(long)]
        page_size: Option<u64>,
    },
    /// Deletes the node's chain data.
    Reset,
}
