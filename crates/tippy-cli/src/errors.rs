//! Error types for the CLI runtime.

use std::io;
use std::sync::Arc;

use thiserror::Error;
use tippy_config::ConfigError;
use tippy_ctrl::{NotApplicable, SupervisorError};
use tippy_rpc::RpcError;

use crate::telemetry::TelemetryError;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(#[from] ConfigError),
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error(transparent)]
    Supervisor(#[from] SupervisorError),
    #[error(transparent)]
    Rpc(#[from] RpcError),
    #[error("{0}")]
    Mining(NotApplicable),
    #[error("failed to generate block: {0}")]
    MiningFailed(String),
    #[error("page and page size must both be at least 1")]
    InvalidPage,
    #[error("the node is still listening on port {port}; stop it before resetting")]
    NodeRunning { port: u16 },
    #[error("failed to install signal handlers: {0}")]
    Signals(io::Error),
    #[error("failed to serialise transactions: {0}")]
    Serialise(serde_json::Error),
    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),
}
