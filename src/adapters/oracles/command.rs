//! External-command oracle.
//!
//! Spawns a program per trial, writes the encoded candidate to its stdin and
//! classifies the candidate by the exit status. The child is killed when the
//! trial is dropped, which is what happens on timeout or cancellation.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::trace;

use crate::domain::models::{Unit, UnitSequence, Verdict};
use crate::domain::ports::Oracle;
use crate::domain::ReductionError;

/// Which exit statuses mark the candidate as failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailOn {
    /// Any unsuccessful status, including death by signal
    NonZeroExit,
    /// Exactly this exit code
    ExitCode(i32),
}

impl FailOn {
    pub fn classify(self, status: ExitStatus) -> Verdict {
        match self {
            Self::NonZeroExit => Verdict::fail_if(!status.success()),
            Self::ExitCode(code) => Verdict::fail_if(status.code() == Some(code)),
        }
    }
}

/// Command oracle configuration.
#[derive(Debug, Clone)]
pub struct CommandOracleConfig {
    /// Program to run
    pub program: String,
    /// Arguments passed to the program
    pub args: Vec<String>,
    /// Working directory (inherited when unset)
    pub working_dir: Option<PathBuf>,
    pub fail_on: FailOn,
}

impl CommandOracleConfig {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: vec![],
            working_dir: None,
            fail_on: FailOn::NonZeroExit,
        }
    }

    /// Build from a `program arg...` vector, as collected from the command line.
    pub fn from_argv(argv: &[String]) -> Result<Self, ReductionError> {
        let (program, args) = argv.split_first().ok_or_else(|| {
            ReductionError::InvalidArgument("oracle command cannot be empty".to_string())
        })?;
        if program.is_empty() {
            return Err(ReductionError::InvalidArgument(
                "oracle command cannot be empty".to_string(),
            ));
        }
        Ok(Self {
            args: args.to_vec(),
            ..Self::new(program.clone())
        })
    }
}

/// Oracle that delegates classification to an external program.
#[derive(Debug, Clone)]
pub struct CommandOracle {
    config: CommandOracleConfig,
}

impl CommandOracle {
    pub const fn new(config: CommandOracleConfig) -> Self {
        Self { config }
    }

    pub const fn config(&self) -> &CommandOracleConfig {
        &self.config
    }

    async fn run(&self, input: &[u8]) -> Result<ExitStatus> {
        let mut cmd = Command::new(&self.config.program);
        cmd.args(&self.config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        if let Some(ref dir) = self.config.working_dir {
            cmd.current_dir(dir);
        }

        let mut child = cmd
            .spawn()
            .with_context(|| format!("Failed to spawn oracle command '{}'", self.config.program))?;

        if let Some(mut stdin) = child.stdin.take() {
            // The program may exit before consuming its input
            match stdin.write_all(input).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
                Err(e) => return Err(e).context("Failed to write candidate to oracle stdin"),
            }
            drop(stdin);
        }

        child
            .wait()
            .await
            .context("Failed to wait for oracle command")
    }
}

#[async_trait]
impl<U: Unit> Oracle<U> for CommandOracle {
    async fn test(&self, input: &UnitSequence<U>) -> Result<Verdict> {
        let status = self.run(&input.to_bytes()).await?;
        let verdict = self.config.fail_on.classify(status);
        trace!(
            program = %self.config.program,
            units = input.len(),
            code = ?status.code(),
            %verdict,
            "oracle command finished"
        );
        Ok(verdict)
    }

    fn name(&self) -> &str {
        &self.config.program
    }
}
