use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info};

use crate::errors::{BestEffort, GridifyError, Result};

/// A program invocation: executable, arguments and optional working directory.
///
/// Arguments are passed to the process as-is; nothing goes through a shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalCommand {
    pub program: String,
    pub args: Vec<OsString>,
    pub current_dir: Option<PathBuf>,
}

impl ExternalCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, A>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Arguments rendered lossily, for assertions and log lines.
    pub fn arg_strings(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }
}

impl fmt::Display for ExternalCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Executes external commands one at a time and maps failures to
/// [`GridifyError::Subprocess`].
///
/// In verbose mode every command line is echoed and the child's output is
/// forwarded to the terminal; otherwise output is captured and only shown
/// as part of an error.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner {
    verbose: bool,
}

impl ProcessRunner {
    pub const fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    pub const fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Runs the command to completion, failing on spawn errors or a non-zero exit.
    pub async fn run(&self, command: &ExternalCommand) -> Result<()> {
        self.execute(command, !self.verbose).await.map(|_| ())
    }

    /// Same as [`run`](Self::run), but the failure is logged and dropped.
    ///
    /// Returns whether the command succeeded.
    pub async fn run_ignoring_errors(&self, command: &ExternalCommand) -> bool {
        self.run(command)
            .await
            .best_effort(&command.to_string())
            .is_some()
    }

    /// Runs the command and returns its captured standard output.
    pub async fn output(&self, command: &ExternalCommand) -> Result<String> {
        self.execute(command, true).await
    }

    async fn execute(&self, command: &ExternalCommand, capture: bool) -> Result<String> {
        if self.verbose {
            info!("{}", command);
        } else {
            debug!("{}", command);
        }

        let mut process = Command::new(&command.program);
        process.args(&command.args).stdin(Stdio::null());
        if let Some(dir) = &command.current_dir {
            process.current_dir(dir);
        }
        if capture {
            process.stdout(Stdio::piped()).stderr(Stdio::piped());
        } else {
            process.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        }

        let output = process
            .output()
            .await
            .map_err(|e| GridifyError::Subprocess {
                command: command.to_string(),
                reason: "could not be started".to_string(),
                source: Some(e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let status = output
                .status
                .code()
                .map_or_else(|| "was terminated by a signal".to_string(), |code| {
                    format!("exited with status {}", code)
                });
            let reason = if stderr.trim().is_empty() {
                status
            } else {
                format!("{}: {}", status, stderr.trim())
            };
            return Err(GridifyError::Subprocess {
                command: command.to_string(),
                reason,
                source: None,
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Renders a path as a command argument.
pub(crate) fn path_arg(path: &Path) -> OsString {
    path.as_os_str().to_os_string()
}
