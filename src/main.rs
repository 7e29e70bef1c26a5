use std::io;
use std::path::Path;

use clap::Parser;
use miette::Diagnostic;
use miette::Result;
use reqwest::Client;
use thiserror::Error;
use tracing::info;

use crate::cli::Cli;
use crate::cli::DEFAULT_CONFIG_PATH;
use crate::outputter::OutPutter;
use crate::parser::Settings;
use crate::probe::ProbeError;
use crate::runner::RunContext;
use crate::runner::RunnerError;
use crate::runner::run_suite;
use crate::validator::Overrides;
use crate::validator::RunConfig;
use crate::validator::ValidationError;
use crate::validator::Validator;

mod asserter;
mod cli;
mod logging;
mod outputter;
mod parser;
mod probe;
mod runner;
mod suite;
#[cfg(test)]
mod testing;
mod validator;

#[derive(Error, Debug, Diagnostic)]
pub enum LivrosError {
    #[error("Failed to read config file")]
    FileError(#[from] io::Error),

    #[error("Failed to parse config file")]
    TomlParsing(#[from] toml::de::Error),

    #[error(transparent)]
    #[diagnostic(transparent)]
    ValidationError(#[from] ValidationError),

    #[error("Failed to build the HTTP client")]
    Client(#[source] reqwest::Error),

    #[error(transparent)]
    #[diagnostic(help("Start the catalog server with: npm run dev"))]
    ServerUnavailable(#[from] ProbeError),

    #[error(transparent)]
    Runner(#[from] RunnerError),

    #[error("Failed to write the report")]
    Output(#[source] io::Error),

    #[error("{0} step(s) failed")]
    StepsFailed(usize),
}

/// Reads the config file (if any), applies the command line overrides and
/// validates the result.
///
/// An explicit `--config` must exist. The default path is only read when it
/// is present, so running with no file and no flags targets the local catalog
/// with the full suite.
fn load_and_validate_config(cli: &Cli) -> Result<RunConfig, LivrosError> {
    let (contents, path) = match &cli.config {
        Some(path) => (std::fs::read_to_string(path)?, path.clone()),
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => (
            std::fs::read_to_string(DEFAULT_CONFIG_PATH)?,
            DEFAULT_CONFIG_PATH.to_string(),
        ),
        None => (String::new(), DEFAULT_CONFIG_PATH.to_string()),
    };

    let settings: Settings = toml::from_str(&contents)?;

    let overrides = Overrides {
        base_url: cli.base_url.clone(),
        suite: cli.suite,
    };

    let config = Validator::new(&settings, &contents, &path).validate(&overrides)?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let config = load_and_validate_config(&cli)?;
    info!(base_url = %config.base_url, suite = ?config.suite, "configuration loaded");

    let client = Client::builder().build().map_err(LivrosError::Client)?;
    let mut out = OutPutter::new(io::stdout());

    out.banner("🚀 Livros API - smoke tests")
        .map_err(LivrosError::Output)?;

    // A server that never answers ends the run before any step is sent.
    match probe::run(&client, &config.base_url, config.probe).await {
        Ok(()) => out
            .server_ready(&config.base_url)
            .map_err(LivrosError::Output)?,
        Err(err) => {
            out.server_unavailable().map_err(LivrosError::Output)?;
            return Err(LivrosError::ServerUnavailable(err).into());
        }
    }

    let mut ctx = RunContext::default();
    let summary = run_suite(
        &client,
        &config.base_url,
        config.suite.cases(),
        &mut ctx,
        &mut out,
    )
    .await
    .map_err(LivrosError::Runner)?;
    info!(captured = ctx.captured().len(), "run finished");

    out.summary(&summary).map_err(LivrosError::Output)?;

    if cli.strict && summary.failed > 0 {
        return Err(LivrosError::StepsFailed(summary.failed).into());
    }

    Ok(())
}
