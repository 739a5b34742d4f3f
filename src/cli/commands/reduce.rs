//! Implementation of the reduction command.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::adapters::oracles::{CommandOracle, CommandOracleConfig, FailOn, RegexOracle};
use crate::cli::output::{output, CommandOutput};
use crate::cli::types::Cli;
use crate::domain::models::{Config, ReductionStats, Unit, UnitKind, UnitSequence, Verdict};
use crate::domain::ports::Oracle;
use crate::domain::ReductionError;
use crate::infrastructure::config::ConfigLoader;
use crate::infrastructure::content::{ContentLoader, LoadedContent};
use crate::infrastructure::logging::LoggerImpl;
use crate::services::{ReductionController, ReductionOptions};

/// Header printed above the reduced content.
pub const RESULT_HEADER: &str = "Minimal content containing the bug:";

#[derive(Debug, Serialize)]
pub struct ReduceOutput {
    pub file: PathBuf,
    pub unit: UnitKind,
    pub oracle: String,
    /// Reduced content, decoded lossily as UTF-8
    pub content: String,
    /// Reduced content exactly as encoded
    #[serde(skip)]
    pub raw: Vec<u8>,
    pub stats: ReductionStats,
}

impl ReduceOutput {
    pub fn new(
        file: PathBuf,
        unit: UnitKind,
        oracle: String,
        raw: Vec<u8>,
        stats: ReductionStats,
    ) -> Self {
        Self {
            file,
            unit,
            oracle,
            content: String::from_utf8_lossy(&raw).into_owned(),
            raw,
            stats,
        }
    }

    /// Write the header and the unmodified reduced bytes.
    pub fn write_human<W: Write>(&self, mut out: W) -> io::Result<()> {
        writeln!(out, "{RESULT_HEADER}")?;
        out.write_all(&self.raw)?;
        writeln!(out)?;
        out.flush()
    }
}

impl CommandOutput for ReduceOutput {
    fn to_human(&self) -> String {
        format!("{RESULT_HEADER}\n{}", self.content)
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// The oracle selected on the command line.
#[derive(Debug)]
pub enum CliOracle {
    Pattern(RegexOracle),
    Command(CommandOracle),
}

impl CliOracle {
    /// `--command` wins; otherwise `--pattern`, otherwise the `<SELECT>` detector.
    pub fn from_cli(cli: &Cli) -> Result<Self, ReductionError> {
        if !cli.command.is_empty() {
            let mut config = CommandOracleConfig::from_argv(&cli.command)?;
            if let Some(code) = cli.fail_exit_code {
                config.fail_on = FailOn::ExitCode(code);
            }
            config.working_dir.clone_from(&cli.command_dir);
            return Ok(Self::Command(CommandOracle::new(config)));
        }
        match cli.pattern.as_deref() {
            Some(pattern) => Ok(Self::Pattern(RegexOracle::new(pattern)?)),
            None => Ok(Self::Pattern(RegexOracle::select_tag())),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::Pattern(regex) => format!("regex {}", regex.pattern()),
            Self::Command(command) => {
                let config = command.config();
                std::iter::once(config.program.as_str())
                    .chain(config.args.iter().map(String::as_str))
                    .collect::<Vec<_>>()
                    .join(" ")
            }
        }
    }
}

#[async_trait]
impl<U: Unit> Oracle<U> for CliOracle {
    async fn test(&self, input: &UnitSequence<U>) -> Result<Verdict> {
        match self {
            Self::Pattern(oracle) => <RegexOracle as Oracle<U>>::test(oracle, input).await,
            Self::Command(oracle) => <CommandOracle as Oracle<U>>::test(oracle, input).await,
        }
    }

    fn name(&self) -> &str {
        match self {
            Self::Pattern(oracle) => <RegexOracle as Oracle<U>>::name(oracle),
            Self::Command(oracle) => <CommandOracle as Oracle<U>>::name(oracle),
        }
    }
}

/// Resolve configuration: file (or `--config`), environment, then flags.
///
/// Validation runs once all layers are merged, so a flag can correct a
/// file or environment value.
pub fn resolve_config(cli: &Cli) -> Result<Config> {
    let mut config = ConfigLoader::load_layers(cli.config.as_deref())?;
    cli.apply_overrides(&mut config);
    ConfigLoader::validate(&config).context("Invalid configuration")?;
    Ok(config)
}

pub async fn execute(cli: &Cli, file_path: &Path) -> Result<()> {
    let config = resolve_config(cli)?;
    let _logger = LoggerImpl::init(&config.logging).context("Failed to initialize logging")?;

    let oracle = Arc::new(CliOracle::from_cli(cli)?);
    let options = ReductionOptions::from(&config.reduction);
    let content = ContentLoader::read(file_path, config.reduction.unit).await?;
    debug!(oracle = %oracle.describe(), ?options, "starting reduction");

    let cancel = CancellationToken::new();
    let watcher = tokio::spawn(cancel_on_ctrl_c(cancel.clone()));

    let result = match content {
        LoadedContent::Bytes(input) => reduce_units(&oracle, &options, input, &cancel).await,
        LoadedContent::Chars(input) => reduce_units(&oracle, &options, input, &cancel).await,
        LoadedContent::Lines(input) | LoadedContent::Tokens(input) => {
            reduce_units(&oracle, &options, input, &cancel).await
        }
    };
    watcher.abort();

    let (raw, stats) =
        result.with_context(|| format!("Failed to reduce {}", file_path.display()))?;
    info!(
        initial_len = stats.initial_len,
        final_len = stats.final_len,
        ratio = stats.reduction_ratio(),
        "reduced input"
    );

    let output_data = ReduceOutput::new(
        file_path.to_path_buf(),
        config.reduction.unit,
        oracle.describe(),
        raw,
        stats,
    );
    if cli.json {
        output(&output_data, true);
    } else {
        // Byte-level results need not be UTF-8
        output_data
            .write_human(io::stdout().lock())
            .context("Failed to write result to stdout")?;
    }
    Ok(())
}

async fn reduce_units<U: Unit>(
    oracle: &Arc<CliOracle>,
    options: &ReductionOptions,
    input: UnitSequence<U>,
    cancel: &CancellationToken,
) -> Result<(Vec<u8>, ReductionStats), ReductionError> {
    let oracle: Arc<dyn Oracle<U>> = Arc::clone(oracle) as Arc<dyn Oracle<U>>;
    let controller = ReductionController::new(oracle, options.clone())?;
    let report = controller
        .reduce_with_cancellation(input, cancel.clone())
        .await?;
    Ok((report.output.to_bytes(), report.stats))
}

async fn cancel_on_ctrl_c(cancel: CancellationToken) {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("interrupt received, cancelling reduction");
        cancel.cancel();
    }
}
