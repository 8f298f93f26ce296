//! Execution of the `tippy` subcommands.

use std::io::Write;
use std::time::Duration;

use tippy_config::{Config, ProcessKind};
use tippy_ctrl::{
    LogLine, LogSource, LogSubscription, MiningOutcome, PortAuditor, ProcessSupervisor,
    mining_precondition,
};
use tippy_rpc::{PageQuery, RpcClient, TransactionPaginator};
use tracing::debug;

use crate::AppError;
use crate::cli::CliCommand;
use crate::shutdown::ShutdownSignal;

const COMMANDS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::commands");

/// How long a streaming loop waits for a log line before re-checking state.
const STREAM_POLL: Duration = Duration::from_millis(100);

pub(crate) fn execute<W: Write>(
    command: CliCommand,
    config: &Config,
    stdout: &mut W,
) -> Result<(), AppError> {
    debug!(target: COMMANDS_TARGET, ?command, "executing command");
    match command {
        CliCommand::Run { miner } => run_project(config, miner, stdout),
        CliCommand::Ports => report_ports(config, stdout),
        CliCommand::Mine { blocks, interval } => {
            mine(config, blocks, Duration::from_secs(interval), stdout)
        }
        CliCommand::Transactions { page, page_size } => {
            print_transactions(config, page, page_size, stdout)
        }
        CliCommand::Reset => reset(config, stdout),
    }
}

fn run_project<W: Write>(config: &Config, with_miner: bool, stdout: &mut W) -> Result<(), AppError> {
    let mut shutdown = ShutdownSignal::install()?;
    let mut supervisor = ProcessSupervisor::from_config(config)?;
    let logs = supervisor.subscribe_logs();
    supervisor.start()?;
    if with_miner {
        let outcome = supervisor.start_miner()?;
        if let MiningOutcome::NotApplicable(reason) = outcome {
            writeln!(stdout, "Miner not started: {reason}")?;
        }
    }

    while !shutdown.requested() && supervisor.is_running() {
        forward(&logs, stdout, false)?;
    }

    let stopped = supervisor.stop();
    for line in logs.drain() {
        write_line(stdout, &line, false)?;
    }
    stdout.flush()?;
    stopped.map_err(AppError::from)
}

fn report_ports<W: Write>(config: &Config, stdout: &mut W) -> Result<(), AppError> {
    let busy = PortAuditor::system().ports_in_use(&config.project().ports());
    if busy.is_empty() {
        writeln!(stdout, "All configured ports are free")?;
    }
    for port in busy {
        writeln!(stdout, "Port {port} is already in use")?;
    }
    Ok(())
}

fn mine<W: Write>(
    config: &Config,
    blocks: Option<u64>,
    interval: Duration,
    stdout: &mut W,
) -> Result<(), AppError> {
    mining_precondition(config.chain, true).map_err(AppError::Mining)?;
    let mut supervisor = ProcessSupervisor::from_config(config)?;
    let logs = supervisor.subscribe_logs();
    supervisor.start()?;

    let mined = match blocks {
        None => settle(supervisor.mine_one_block()),
        Some(count) => match supervisor.start_advanced_mining(count, interval)? {
            MiningOutcome::Started => {
                while supervisor.is_advanced_mining() {
                    forward(&logs, stdout, true)?;
                }
                Ok(())
            }
            other => settle(other),
        },
    };

    let stopped = supervisor.stop();
    for line in logs.drain() {
        write_line(stdout, &line, true)?;
    }
    mined?;
    stopped.map_err(AppError::from)
}

fn settle(outcome: MiningOutcome) -> Result<(), AppError> {
    match outcome {
        MiningOutcome::Failed(message) => Err(AppError::MiningFailed(message)),
        MiningOutcome::NotApplicable(reason) => Err(AppError::Mining(reason)),
        MiningOutcome::Started | MiningOutcome::AlreadyActive | MiningOutcome::Mined(_) => Ok(()),
    }
}

fn print_transactions<W: Write>(
    config: &Config,
    page: Option<u64>,
    page_size: Option<u64>,
    stdout: &mut W,
) -> Result<(), AppError> {
    let query = PageQuery::from_page(page, page_size).ok_or(AppError::InvalidPage)?;
    let rpc = RpcClient::for_port(config.node_rpc_port, config.rpc_timeout())?;
    let transactions = TransactionPaginator::new(&rpc).page(query)?;
    serde_json::to_writer_pretty(&mut *stdout, &transactions.into_document())
        .map_err(AppError::Serialise)?;
    writeln!(stdout)?;
    Ok(())
}

fn reset<W: Write>(config: &Config, stdout: &mut W) -> Result<(), AppError> {
    let port = config.node_rpc_port;
    if !PortAuditor::system().ports_in_use(&[port]).is_empty() {
        return Err(AppError::NodeRunning { port });
    }
    let mut supervisor = ProcessSupervisor::from_config(config)?;
    supervisor.reset_data()?;
    writeln!(
        stdout,
        "Reset node data in {}",
        config.project().working_dir(ProcessKind::Node)
    )?;
    Ok(())
}

/// Writes the lines arriving within one poll interval.
///
/// With `control_only` set, only controller status lines are written, without
/// their source tag.
fn forward<W: Write>(
    logs: &LogSubscription,
    stdout: &mut W,
    control_only: bool,
) -> Result<(), AppError> {
    let Some(first) = logs.recv_timeout(STREAM_POLL) else {
        return Ok(());
    };
    for line in std::iter::once(first).chain(logs.drain()) {
        write_line(stdout, &line, control_only)?;
    }
    stdout.flush()?;
    Ok(())
}

fn write_line<W: Write>(stdout: &mut W, line: &LogLine, control_only: bool) -> Result<(), AppError> {
    if !control_only {
        writeln!(stdout, "{line}")?;
    } else if line.source == LogSource::Control {
        writeln!(stdout, "{}", line.text)?;
    }
    Ok(())
}
