//! Per-project runtime view consumed by the process supervisor.
//!
//! The supervisor never reads configuration files itself. It receives a
//! [`ProjectRuntimeConfig`] describing the chain, the three listening ports,
//! the project root, and the command template for every managed process.
//! Argument templates may reference the placeholders listed on
//! [`CommandTemplate::expand`].

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::chain::ChainType;
use crate::defaults::{DEFAULT_INDEXER_BINARY, DEFAULT_NODE_BINARY};

/// External programs supervised for a project.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Deserialize,
    Serialize,
    EnumString,
    Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ProcessKind {
    /// The full node serving JSON-RPC.
    Node,
    /// The block miner attached to the node.
    Miner,
    /// The chain indexer reading from the node.
    Indexer,
}

/// Error returned when parsing a process kind fails.
pub type ProcessKindParseError = strum::ParseError;

/// Executable plus argument template for one managed process.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CommandTemplate {
    /// Program name or path.
    pub program: String,
    /// Argument templates, expanded per project before spawning.
    pub args: Vec<String>,
}

impl CommandTemplate {
    /// Builds a template from a program and its argument templates.
    #[must_use]
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Default template for the supplied process kind.
    #[must_use]
    pub fn default_for(kind: ProcessKind, program: impl Into<String>) -> Self {
        match kind {
            ProcessKind::Node => Self::new(program, ["run"]),
            ProcessKind::Miner => Self::new(program, ["miner"]),
            ProcessKind::Indexer => Self::new(
                program,
                [
                    "-c",
                    "{node_rpc_url}",
                    "-l",
                    "127.0.0.1:{indexer_rpc_port}",
                    "-s",
                    "{working_dir}/data",
                ],
            ),
        }
    }

    /// Expands the argument templates for `kind` within `project`.
    ///
    /// Recognised placeholders are `{node_rpc_port}`, `{node_network_port}`,
    /// `{indexer_rpc_port}`, `{node_rpc_url}`, `{working_dir}` and
    /// `{project_root}`. Unknown braces are left untouched.
    #[must_use]
    pub fn expand(&self, project: &ProjectRuntimeConfig, kind: ProcessKind) -> Vec<String> {
        let working_dir = project.working_dir(kind);
        let substitutions = [
            ("{node_rpc_port}", project.node_rpc_port.to_string()),
            ("{node_network_port}", project.node_network_port.to_string()),
            ("{indexer_rpc_port}", project.indexer_rpc_port.to_string()),
            ("{node_rpc_url}", project.node_rpc_url()),
            ("{working_dir}", working_dir.to_string()),
            ("{project_root}", project.root.to_string()),
        ];
        self.args
            .iter()
            .map(|arg| {
                substitutions
                    .iter()
                    .fold(arg.clone(), |acc, (needle, value)| acc.replace(needle, value))
            })
            .collect()
    }
}

/// Runtime facts about a project, borrowed by the supervisor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectRuntimeConfig {
    /// Chain the project runs.
    pub chain: ChainType,
    /// Node JSON-RPC port.
    pub node_rpc_port: u16,
    /// Node peer-to-peer port.
    pub node_network_port: u16,
    /// Indexer JSON-RPC port.
    pub indexer_rpc_port: u16,
    /// Project root; working directories live under `<root>/data`.
    pub root: Utf8PathBuf,
    /// Node command.
    pub node: CommandTemplate,
    /// Miner command.
    pub miner: CommandTemplate,
    /// Indexer command.
    pub indexer: CommandTemplate,
}

impl ProjectRuntimeConfig {
    /// Builds a project with default command templates.
    #[must_use]
    pub fn new(
        chain: ChainType,
        node_rpc_port: u16,
        node_network_port: u16,
        indexer_rpc_port: u16,
        root: impl Into<Utf8PathBuf>,
    ) -> Self {
        Self {
            chain,
            node_rpc_port,
            node_network_port,
            indexer_rpc_port,
            root: root.into(),
            node: CommandTemplate::default_for(ProcessKind::Node, DEFAULT_NODE_BINARY),
            miner: CommandTemplate::default_for(ProcessKind::Miner, DEFAULT_NODE_BINARY),
            indexer: CommandTemplate::default_for(ProcessKind::Indexer, DEFAULT_INDEXER_BINARY),
        }
    }

    /// Replaces the command template for `kind`.
    #[must_use]
    pub fn with_command(mut self, kind: ProcessKind, command: CommandTemplate) -> Self {
        match kind {
            ProcessKind::Node => self.node = command,
            ProcessKind::Miner => self.miner = command,
            ProcessKind::Indexer => self.indexer = command,
        }
        self
    }

    /// Command template for `kind`.
    #[must_use]
    pub fn command(&self, kind: ProcessKind) -> &CommandTemplate {
        match kind {
            ProcessKind::Node => &self.node,
            ProcessKind::Miner => &self.miner,
            ProcessKind::Indexer => &self.indexer,
        }
    }

    /// Directory holding every managed process's working directory.
    #[must_use]
    pub fn data_root(&self) -> Utf8PathBuf {
        self.root.join("data")
    }

    /// Working directory for `kind`. The miner shares the node's directory.
    #[must_use]
    pub fn working_dir(&self, kind: ProcessKind) -> Utf8PathBuf {
        match kind {
            ProcessKind::Node | ProcessKind::Miner => self.data_root().join("node"),
            ProcessKind::Indexer => self.data_root().join("indexer"),
        }
    }

    /// Directory where the node writes its own log files.
    #[must_use]
    pub fn log_folder(&self) -> Utf8PathBuf {
        self.working_dir(ProcessKind::Node).join("data").join("logs")
    }

    /// Base URL of the node's JSON-RPC endpoint.
    #[must_use]
    pub fn node_rpc_url(&self) -> String {
        format!("http://localhost:{}", self.node_rpc_port)
    }

    /// The three ports the project listens on: node RPC, node P2P, indexer RPC.
    #[must_use]
    pub fn ports(&self) -> [u16; 3] {
        [
            self.node_rpc_port,
            self.node_network_port,
            self.indexer_rpc_port,
        ]
    }

    /// Project root as a path.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        self.root.as_path()
    }
}
