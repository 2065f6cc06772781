//! Error types for scenario runs
//!
//! Two layers: [`E2eError`] covers harness-level failures (loading scenario
//! files, launching the browser, writing results), while [`StepError`] is the
//! per-step taxonomy the runner folds into a [`crate::report::Report`].

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Session setup failed: {0}")]
    SessionSetup(String),

    #[error("Target app not reachable at {url} after {attempts} attempts")]
    AppUnreachable { url: String, attempts: usize },

    #[error("Scenario file parse error: {0}")]
    ScenarioParse(String),

    #[error("Scenario not found: {0}")]
    ScenarioNotFound(String),

    #[error("Unsupported scenario schema version {found} (expected {expected})")]
    SchemaVersion { found: u32, expected: u32 },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type E2eResult<T> = Result<T, E2eError>;

/// Why a single step did not complete.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StepError {
    #[error("Element not found: {locator}")]
    ElementNotFound { locator: String },

    #[error("Timeout after {timeout_ms}ms waiting for: {what}")]
    Timeout { what: String, timeout_ms: u64 },

    #[error("Navigation to {url} failed: {reason}")]
    NavigationFailed { url: String, reason: String },

    #[error("Assertion failed: {0}")]
    AssertionFailed(AssertionFailure),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl StepError {
    pub fn unexpected(context: &str, err: impl std::fmt::Display) -> Self {
        StepError::Unexpected(format!("{}: {}", context, err))
    }

    pub fn timeout(what: impl Into<String>, after: Duration) -> Self {
        StepError::Timeout {
            what: what.into(),
            timeout_ms: after.as_millis() as u64,
        }
    }

    /// Short machine-readable name used in reports.
    pub fn kind(&self) -> &'static str {
        match self {
            StepError::ElementNotFound { .. } => "element_not_found",
            StepError::Timeout { .. } => "timeout",
            StepError::NavigationFailed { .. } => "navigation_failed",
            StepError::AssertionFailed(_) => "assertion_failed",
            StepError::Unexpected(_) => "unexpected",
        }
    }
}

impl From<AssertionFailure> for StepError {
    fn from(failure: AssertionFailure) -> Self {
        StepError::AssertionFailed(failure)
    }
}

/// Assertion sub-cases. "Not in the DOM" and "in the DOM but not visible"
/// are reported separately.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AssertionFailure {
    #[error("{target} is not in the DOM")]
    NotInDom { target: String },

    #[error("{target} is in the DOM but not visible")]
    NotVisible { target: String },

    #[error("{target} is visible")]
    UnexpectedlyVisible { target: String },

    #[error("{target} is present in the DOM")]
    UnexpectedlyPresent { target: String },

    #[error("URL {actual} does not match /{pattern}/")]
    UrlMismatch { pattern: String, actual: String },
}

pub type StepResult<T> = Result<T, StepError>;
