use std::process::{Command, Stdio};

use camino::{Utf8Path, Utf8PathBuf};
use tippy_config::{ProcessKind, ProjectRuntimeConfig};

/// Fully expanded invocation of a managed program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessCommand {
    /// Program name or path.
    pub program: String,
    /// Expanded arguments.
    pub args: Vec<String>,
    /// Directory the program runs in.
    pub working_dir: Utf8PathBuf,
}

impl ProcessCommand {
    /// Expands the project's template for `kind`.
    #[must_use]
    pub fn for_project(project: &ProjectRuntimeConfig, kind: ProcessKind) -> Self {
        let template = project.command(kind);
        Self {
            program: template.program.clone(),
            args: template.expand(project, kind),
            working_dir: project.working_dir(kind),
        }
    }

    /// Working directory.
    #[must_use]
    pub fn working_dir(&self) -> &Utf8Path {
        &self.working_dir
    }

    /// Builds a [`Command`] with stdin closed and both output streams piped.
    ///
    /// On Unix the child leads a new process group so it can be stopped
    /// together with its descendants.
    pub(crate) fn to_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .current_dir(self.working_dir.as_std_path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }
        command
    }
}
