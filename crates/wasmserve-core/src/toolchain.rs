//! Async wrapper around the Go toolchain program.
//!
//! The toolchain is treated as an opaque subprocess. Every invocation
//! captures both output streams; nothing is inherited from the server's
//! terminal.

use std::ffi::OsStr;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};

use tokio::process::Command;
use tracing::{debug, instrument};

use wasmserve_common::ServeError;

use crate::TargetSpec;

/// Captured result of one toolchain invocation.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// The command line, for logs and error messages.
    pub command: String,
    /// Exit status of the process.
    pub status: ExitStatus,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

impl CommandOutput {
    /// Returns `true` if the process exited with status zero.
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Standard error followed by the exit status, e.g.
    /// `main.go:3:1: syntax error\nexit status: 1`.
    pub fn diagnostics(&self) -> String {
        format!("{}{}", self.stderr, self.status)
    }
}

/// Handle to the `go` program used for builds and metadata queries.
#[derive(Debug, Clone)]
pub struct Toolchain {
    program: PathBuf,
}

impl Toolchain {
    /// Create a handle for the given program (usually just `go`).
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// The program invoked for every command.
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Prepare a command running in `dir` with captured output.
    pub fn command(&self, dir: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.current_dir(dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    /// Render a command line for logs.
    pub fn display<I, S>(&self, args: I) -> String
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut line = self.program.display().to_string();
        for arg in args {
            let _ = write!(line, " {}", arg.as_ref().to_string_lossy());
        }
        line
    }

    /// Run a prepared command to completion and capture its output.
    ///
    /// A non-zero exit status is not an error here; callers decide what it
    /// means. Only a failure to start the process is.
    pub async fn output(&self, mut cmd: Command, command_line: String) -> Result<CommandOutput, ServeError> {
        debug!(command = %command_line, "Running toolchain command");

        let output = cmd
            .output()
            .await
            .map_err(|e| ServeError::toolchain(&command_line, e.to_string()))?;

        Ok(CommandOutput {
            command: command_line,
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    /// Run `go <args>` in `dir`.
    pub async fn run(&self, dir: &Path, args: &[&str]) -> Result<CommandOutput, ServeError> {
        let mut cmd = self.command(dir);
        cmd.args(args);
        self.output(cmd, self.display(args)).await
    }

    /// Run a query whose trimmed standard output is the answer.
    async fn query(&self, dir: &Path, args: &[&str]) -> Result<String, ServeError> {
        let output = self.run(dir, args).await?;
        if !output.success() {
            let diagnostics = output.diagnostics();
            return Err(ServeError::toolchain(output.command, diagnostics));
        }
        Ok(output.stdout.trim().to_string())
    }

    /// The installation root reported by `go env GOROOT`.
    ///
    /// Runs in `dir` because a `toolchain` line in the `go.mod` found there
    /// can switch to a different, automatically downloaded installation.
    #[instrument(skip(self, dir))]
    pub async fn goroot(&self, dir: &Path) -> Result<PathBuf, ServeError> {
        self.query(dir, &["env", "GOROOT"]).await.map(PathBuf::from)
    }

    /// The Go version the target's module asks for, e.g. `go1.22`.
    ///
    /// This is the language version from `go.mod`, which may differ from the
    /// version of the installed toolchain.
    #[instrument(skip(self, dir), fields(target = %target))]
    pub async fn module_go_version(&self, dir: &Path, target: &TargetSpec) -> Result<String, ServeError> {
        self.query(dir, &["list", "-f", "go{{.Module.GoVersion}}", target.as_str()])
            .await
    }
}

impl Default for Toolchain {
    fn default() -> Self {
        Self::new("go")
    }
}
