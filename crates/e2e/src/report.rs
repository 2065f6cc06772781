//! Scenario reports
//!
//! A [`ReportBuilder`] is fed while steps execute; [`ReportBuilder::finish`]
//! consumes it and yields the immutable [`Report`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

use crate::error::{E2eResult, StepError};

/// Final verdict of a scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioStatus {
    Passed,
    Failed,
    Errored,
    Timeout,
}

impl ScenarioStatus {
    /// Status a scenario ends in when a step fails with `error`.
    pub fn for_step_error(error: &StepError) -> Self {
        match error {
            StepError::Timeout { .. } => ScenarioStatus::Timeout,
            StepError::Unexpected(_) => ScenarioStatus::Errored,
            _ => ScenarioStatus::Failed,
        }
    }

    fn severity(self) -> u8 {
        match self {
            ScenarioStatus::Passed => 0,
            ScenarioStatus::Failed => 1,
            ScenarioStatus::Timeout => 2,
            ScenarioStatus::Errored => 3,
        }
    }
}

impl fmt::Display for ScenarioStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScenarioStatus::Passed => write!(f, "passed"),
            ScenarioStatus::Failed => write!(f, "failed"),
            ScenarioStatus::Errored => write!(f, "errored"),
            ScenarioStatus::Timeout => write!(f, "timeout"),
        }
    }
}

/// Result of executing one step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepOutcome {
    pub index: usize,
    pub step_name: String,
    pub success: bool,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot_path: Option<PathBuf>,
    /// Native dialogs accepted while the step ran
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dialogs: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// Requested by a screenshot step
    Screenshot,
    /// Captured automatically after a failure
    Diagnostic,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub path: PathBuf,
    /// Hex SHA-256 of the file, when it could be read back
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

impl Artifact {
    pub fn from_file(kind: ArtifactKind, path: PathBuf) -> Self {
        let sha256 = std::fs::read(&path)
            .ok()
            .map(|bytes| hex::encode(Sha256::digest(&bytes)));
        Self { kind, path, sha256 }
    }
}

/// Recorded outcome of one scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub scenario: String,
    pub status: ScenarioStatus,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub steps: Vec<StepOutcome>,
    /// Index of the first failing step
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failing_step: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub artifacts: Vec<Artifact>,
}

impl Report {
    pub fn passed(&self) -> bool {
        self.status == ScenarioStatus::Passed
    }

    pub fn artifact_paths(&self) -> impl Iterator<Item = &Path> {
        self.artifacts.iter().map(|a| a.path.as_path())
    }

    /// One-line human-readable summary
    pub fn summary_line(&self) -> String {
        let mut line = format!(
            "[{}] {} ({} steps, {} ms)",
            self.status,
            self.scenario,
            self.steps.len(),
            self.duration_ms
        );
        if let Some(index) = self.failing_step {
            line.push_str(&format!(" step {}", index));
        }
        if let Some(error) = &self.error {
            line.push_str(&format!(": {}", error));
        }
        for artifact in self.artifacts.iter().filter(|a| a.kind == ArtifactKind::Diagnostic) {
            line.push_str(&format!(" [{}]", artifact.path.display()));
        }
        line
    }
}

/// Accumulates a report while a scenario runs.
#[derive(Debug)]
pub struct ReportBuilder {
    scenario: String,
    started_at: DateTime<Utc>,
    start: Instant,
    status: ScenarioStatus,
    steps: Vec<StepOutcome>,
    failing_step: Option<usize>,
    error: Option<String>,
    artifacts: Vec<Artifact>,
}

impl ReportBuilder {
    pub fn new(scenario: &str) -> Self {
        Self {
            scenario: scenario.to_string(),
            started_at: Utc::now(),
            start: Instant::now(),
            status: ScenarioStatus::Passed,
            steps: Vec::new(),
            failing_step: None,
            error: None,
            artifacts: Vec::new(),
        }
    }

    pub fn record_success(&mut self, index: usize, step_name: String, duration_ms: u64, screenshot: Option<PathBuf>) {
        if let Some(path) = &screenshot {
            self.artifacts
                .push(Artifact::from_file(ArtifactKind::Screenshot, path.clone()));
        }
        self.steps.push(StepOutcome {
            index,
            step_name,
            success: true,
            duration_ms,
            error_kind: None,
            error: None,
            screenshot_path: screenshot,
            dialogs: Vec::new(),
        });
    }

    pub fn record_failure(&mut self, index: usize, step_name: String, duration_ms: u64, error: &StepError) {
        self.steps.push(StepOutcome {
            index,
            step_name,
            success: false,
            duration_ms,
            error_kind: Some(error.kind().to_string()),
            error: Some(error.to_string()),
            screenshot_path: None,
            dialogs: Vec::new(),
        });
        if self.failing_step.is_none() {
            self.failing_step = Some(index);
            self.error = Some(error.to_string());
        }
        self.escalate(ScenarioStatus::for_step_error(error));
    }

    /// Attach accepted dialog messages to the last recorded step.
    pub fn record_dialogs(&mut self, messages: Vec<String>) {
        if let Some(step) = self.steps.last_mut() {
            step.dialogs.extend(messages);
        }
    }

    /// Failure not tied to a step (setup, deadline, terminal expectation).
    pub fn fail(&mut self, status: ScenarioStatus, error: impl Into<String>) {
        if self.error.is_none() {
            self.error = Some(error.into());
        }
        self.escalate(status);
    }

    pub fn add_diagnostic(&mut self, path: PathBuf) {
        self.artifacts
            .push(Artifact::from_file(ArtifactKind::Diagnostic, path));
    }

    pub fn status(&self) -> ScenarioStatus {
        self.status
    }

    fn escalate(&mut self, status: ScenarioStatus) {
        if status.severity() > self.status.severity() {
            self.status = status;
        }
    }

    pub fn finish(self) -> Report {
        Report {
            scenario: self.scenario,
            status: self.status,
            started_at: self.started_at,
            duration_ms: self.start.elapsed().as_millis() as u64,
            steps: self.steps,
            failing_step: self.failing_step,
            error: self.error,
            artifacts: self.artifacts,
        }
    }
}

/// Result of running a list of scenarios
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteReport {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub errored: usize,
    pub timed_out: usize,
    pub duration_ms: u64,
    pub reports: Vec<Report>,
}

impl SuiteReport {
    pub fn new(reports: Vec<Report>, duration_ms: u64) -> Self {
        let count = |status| reports.iter().filter(|r| r.status == status).count();
        Self {
            total: reports.len(),
            passed: count(ScenarioStatus::Passed),
            failed: count(ScenarioStatus::Failed),
            errored: count(ScenarioStatus::Errored),
            timed_out: count(ScenarioStatus::Timeout),
            duration_ms,
            reports,
        }
    }

    /// True iff every scenario passed
    pub fn all_passed(&self) -> bool {
        self.passed == self.total
    }

    /// Process exit code: 0 iff every scenario passed
    pub fn exit_code(&self) -> i32 {
        if self.all_passed() {
            0
        } else {
            1
        }
    }

    /// Write results to `<out_dir>/results.json`
    pub fn write(&self, out_dir: &Path) -> E2eResult<PathBuf> {
        std::fs::create_dir_all(out_dir)?;

        let path = out_dir.join("results.json");
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }
}
