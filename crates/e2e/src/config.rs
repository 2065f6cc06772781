//! Harness configuration
//!
//! Values come from an optional `uicheck.toml` with a `[run]` table. The
//! command line overrides the file, and the file overrides the defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::chromium::ChromiumConfig;
use crate::error::{E2eError, E2eResult};
use crate::preflight::PreflightConfig;
use crate::runner::RunnerConfig;

pub const DEFAULT_CONFIG_FILE: &str = "uicheck.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Host that relative scenario URLs resolve against
    pub base_url: String,
    pub headless: bool,
    /// Default step timeout
    pub timeout_ms: u64,
    /// Artifact and results directory
    pub out_dir: PathBuf,
    /// Scenario file or directory
    pub scenarios: PathBuf,
    /// Scenarios run concurrently by run-all
    pub jobs: usize,
    /// Overall deadline for a run
    pub deadline_ms: Option<u64>,
    pub chrome_path: Option<PathBuf>,
    /// Wait this long for the target app before running anything
    pub wait_for_app_secs: Option<u64>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            headless: true,
            timeout_ms: 10_000,
            out_dir: PathBuf::from("uicheck-results"),
            scenarios: PathBuf::from("scenarios"),
            jobs: 1,
            deadline_ms: None,
            chrome_path: None,
            wait_for_app_secs: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    run: HarnessConfig,
}

impl HarnessConfig {
    pub fn from_toml(content: &str) -> E2eResult<Self> {
        let file: ConfigFile = toml::from_str(content)?;
        file.run.validated()
    }

    /// Load `path`, or `uicheck.toml` in the working directory when it
    /// exists. Missing default file means defaults.
    pub fn load(path: Option<&Path>) -> E2eResult<Self> {
        match path {
            Some(path) => Self::from_toml(&std::fs::read_to_string(path)?),
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.is_file() {
                    Self::from_toml(&std::fs::read_to_string(default)?)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn validated(self) -> E2eResult<Self> {
        url::Url::parse(&self.base_url)
            .map_err(|e| E2eError::InvalidConfig(format!("base_url {}: {}", self.base_url, e)))?;
        if self.jobs == 0 {
            return Err(E2eError::InvalidConfig("jobs must be at least 1".to_string()));
        }
        if self.timeout_ms == 0 {
            return Err(E2eError::InvalidConfig("timeout_ms must be positive".to_string()));
        }
        Ok(self)
    }

    pub fn runner_config(&self) -> RunnerConfig {
        RunnerConfig {
            base_url: self.base_url.clone(),
            out_dir: self.out_dir.clone(),
            default_timeout: Duration::from_millis(self.timeout_ms),
            jobs: self.jobs,
            deadline: self.deadline_ms.map(Duration::from_millis),
        }
    }

    pub fn chromium_config(&self) -> ChromiumConfig {
        ChromiumConfig {
            headless: self.headless,
            chrome_path: self.chrome_path.clone(),
            ..Default::default()
        }
    }

    pub fn preflight_config(&self) -> Option<PreflightConfig> {
        self.wait_for_app_secs.map(|secs| PreflightConfig {
            url: self.base_url.clone(),
            timeout: Duration::from_secs(secs),
            ..Default::default()
        })
    }
}
