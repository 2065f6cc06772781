//! Run Commands

use anyhow::{Context, Result};
use clap::Args;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};

use uicheck_e2e::preflight::wait_for_app;
use uicheck_e2e::{ChromiumDriver, E2eError, HarnessConfig, Scenario, ScenarioRunner, SuiteReport};

use crate::output::{print_suite, OutputFormat};

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Scenario file, or the name of a scenario under --scenarios
    pub target: String,

    /// Only run scenarios carrying this tag
    #[arg(long)]
    pub tag: Option<String>,
}

#[derive(Args, Debug)]
pub struct RunAllArgs {
    /// Only run scenarios carrying this tag
    #[arg(long)]
    pub tag: Option<String>,
}

pub async fn execute_run(args: RunArgs, config: &HarnessConfig, format: OutputFormat) -> Result<i32> {
    let scenarios = select_target(&args.target, &config.scenarios)?;
    let scenarios = match args.tag {
        Some(tag) => Scenario::filter_by_tag(scenarios, &tag),
        None => scenarios,
    };
    run_scenarios(scenarios, config, format).await
}

pub async fn execute_run_all(args: RunAllArgs, config: &HarnessConfig, format: OutputFormat) -> Result<i32> {
    let scenarios = Scenario::load_all(&config.scenarios)
        .with_context(|| format!("Failed to load scenarios from {}", config.scenarios.display()))?;
    let scenarios = match args.tag {
        Some(tag) => Scenario::filter_by_tag(scenarios, &tag),
        None => scenarios,
    };
    run_scenarios(scenarios, config, format).await
}

/// A path to an existing file runs everything in it; anything else is a
/// scenario name looked up under `scenarios_path`.
pub fn select_target(target: &str, scenarios_path: &Path) -> Result<Vec<Scenario>> {
    let path = Path::new(target);
    if path.is_file() {
        return Scenario::load_all(path).with_context(|| format!("Failed to load {}", target));
    }

    let matching: Vec<Scenario> = Scenario::load_all(scenarios_path)
        .with_context(|| format!("Failed to load scenarios from {}", scenarios_path.display()))?
        .into_iter()
        .filter(|s| s.name == target)
        .collect();

    if matching.is_empty() {
        return Err(E2eError::ScenarioNotFound(target.to_string()).into());
    }
    Ok(matching)
}

async fn run_scenarios(scenarios: Vec<Scenario>, config: &HarnessConfig, format: OutputFormat) -> Result<i32> {
    info!("Running {} scenario(s) against {}", scenarios.len(), config.base_url);

    let suite = match preflight(&scenarios, config).await {
        Some(suite) => suite,
        None => {
            let driver = Arc::new(ChromiumDriver::new(config.chromium_config()));
            let runner = ScenarioRunner::new(driver, config.runner_config());
            runner.run_all(scenarios).await
        }
    };

    suite
        .write(&config.out_dir)
        .with_context(|| format!("Failed to write results to {}", config.out_dir.display()))?;

    print_suite(&suite, format);
    Ok(suite.exit_code())
}

/// Every scenario is Errored when the app never answers.
async fn preflight(scenarios: &[Scenario], config: &HarnessConfig) -> Option<SuiteReport> {
    let preflight = config.preflight_config()?;
    match wait_for_app(&preflight).await {
        Ok(()) => None,
        Err(e) => {
            error!("{}", e);
            Some(ScenarioRunner::errored_suite(scenarios, &e.to_string()))
        }
    }
}
