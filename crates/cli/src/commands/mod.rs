//! CLI Commands

pub mod list;
pub mod run;

use anyhow::{Context, Result};
use clap::Args;
use std::path::{Path, PathBuf};

use uicheck_e2e::HarnessConfig;

/// Settings that override `uicheck.toml`
#[derive(Args, Debug, Default, Clone)]
pub struct Overrides {
    /// Scenario file or directory
    #[arg(long, global = true, env = "UICHECK_SCENARIOS")]
    pub scenarios: Option<PathBuf>,

    /// Base URL relative scenario URLs resolve against
    #[arg(long, global = true, env = "UICHECK_BASE_URL")]
    pub base_url: Option<String>,

    /// Run the browser headless (`--headless=false` to watch it)
    #[arg(
        long,
        global = true,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        env = "UICHECK_HEADLESS"
    )]
    pub headless: Option<bool>,

    /// Default per-step timeout in milliseconds
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,

    /// Directory for screenshots and results.json
    #[arg(long, global = true, env = "UICHECK_OUT_DIR")]
    pub out_dir: Option<PathBuf>,

    /// Scenarios run concurrently
    #[arg(short, long, global = true)]
    pub jobs: Option<usize>,

    /// Overall deadline for the run in milliseconds
    #[arg(long, global = true)]
    pub deadline_ms: Option<u64>,

    /// Chrome/Chromium executable
    #[arg(long, global = true, env = "UICHECK_CHROME")]
    pub chrome: Option<PathBuf>,

    /// Wait up to SECS for the base URL to answer before running
    #[arg(long, global = true, value_name = "SECS")]
    pub wait_for_app: Option<u64>,
}

impl Overrides {
    pub fn apply(self, mut config: HarnessConfig) -> HarnessConfig {
        if let Some(scenarios) = self.scenarios {
            config.scenarios = scenarios;
        }
        if let Some(base_url) = self.base_url {
            config.base_url = base_url;
        }
        if let Some(headless) = self.headless {
            config.headless = headless;
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.timeout_ms = timeout_ms;
        }
        if let Some(out_dir) = self.out_dir {
            config.out_dir = out_dir;
        }
        if let Some(jobs) = self.jobs {
            config.jobs = jobs;
        }
        if self.deadline_ms.is_some() {
            config.deadline_ms = self.deadline_ms;
        }
        if self.chrome.is_some() {
            config.chrome_path = self.chrome;
        }
        if self.wait_for_app.is_some() {
            config.wait_for_app_secs = self.wait_for_app;
        }
        config
    }
}

/// Config file, then command-line overrides, then validation.
pub fn resolve_config(path: Option<&Path>, overrides: Overrides) -> Result<HarnessConfig> {
    let config = HarnessConfig::load(path).with_context(|| match path {
        Some(path) => format!("Failed to load config {}", path.display()),
        None => "Failed to load config".to_string(),
    })?;

    Ok(overrides.apply(config).validated()?)
}
