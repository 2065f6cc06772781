//! Scenario runner: executes steps against one browser session per scenario

use futures::{FutureExt, StreamExt};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout, Instant};
use tracing::{debug, error, info, warn};

use crate::driver::{BrowserDriver, PageSession, Presence};
use crate::error::{AssertionFailure, StepError, StepResult};
use crate::report::{Report, ReportBuilder, ScenarioStatus, SuiteReport};
use crate::spec::{Expectation, Locator, Scenario, Step};

/// Bound for best-effort work done after a failure (diagnostics, close).
const CLEANUP_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for the runner
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Base for relative URLs in scenarios
    pub base_url: String,
    /// Where screenshots and results go
    pub out_dir: PathBuf,
    /// Timeout for steps that do not declare one
    pub default_timeout: Duration,
    /// Scenarios executed concurrently by [`ScenarioRunner::run_all`]
    pub jobs: usize,
    /// Overall deadline for a `run` or `run_all` call
    pub deadline: Option<Duration>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            out_dir: PathBuf::from("uicheck-results"),
            default_timeout: Duration::from_secs(10),
            jobs: 1,
            deadline: None,
        }
    }
}

/// A live page bound to exactly one scenario.
///
/// Must be given back through [`Session::release`]; there is no async drop.
struct Session {
    page: Box<dyn PageSession>,
    released: bool,
}

impl Session {
    fn new(page: Box<dyn PageSession>) -> Self {
        Self {
            page,
            released: false,
        }
    }

    async fn release(mut self) {
        match timeout(CLEANUP_TIMEOUT, self.page.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Failed to close session: {}", e),
            Err(_) => warn!("Closing session timed out"),
        }
        self.released = true;
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if !self.released {
            error!("Browser session dropped without being released");
        }
    }
}

/// Main scenario runner
#[derive(Clone)]
pub struct ScenarioRunner {
    driver: Arc<dyn BrowserDriver>,
    config: Arc<RunnerConfig>,
}

impl ScenarioRunner {
    pub fn new(driver: Arc<dyn BrowserDriver>, config: RunnerConfig) -> Self {
        Self {
            driver,
            config: Arc::new(config),
        }
    }

    fn deadline(&self) -> Option<Instant> {
        self.config.deadline.map(|d| Instant::now() + d)
    }

    /// Run a single scenario. Never fails: every outcome is a report,
    /// panics included.
    pub async fn run(&self, scenario: &Scenario) -> Report {
        self.run_until(scenario, self.deadline()).await
    }

    /// Run scenarios, returning reports in input order.
    ///
    /// Up to `jobs` scenarios run at once, each in its own task so a crash
    /// only affects its own report.
    pub async fn run_all(&self, scenarios: Vec<Scenario>) -> SuiteReport {
        let start = Instant::now();
        let deadline = self.deadline();

        info!("Running {} scenario(s)...", scenarios.len());

        let reports: Vec<Report> = futures::stream::iter(scenarios.into_iter().map(|scenario| {
            let runner = self.clone();
            async move {
                let name = scenario.name.clone();
                let task = tokio::spawn(async move { runner.run_until(&scenario, deadline).await });
                match task.await {
                    Ok(report) => report,
                    Err(e) => {
                        error!("✗ {} - scenario task crashed: {}", name, e);
                        let mut report = ReportBuilder::new(&name);
                        report.fail(ScenarioStatus::Errored, format!("scenario task crashed: {}", e));
                        report.finish()
                    }
                }
            }
        }))
        .buffered(self.config.jobs.max(1))
        .collect()
        .await;

        let suite = SuiteReport::new(reports, start.elapsed().as_millis() as u64);

        info!(
            "Scenario results: {} passed, {} failed, {} errored, {} timed out ({} ms)",
            suite.passed, suite.failed, suite.errored, suite.timed_out, suite.duration_ms
        );

        suite
    }

    /// Reports for scenarios that never got a session, e.g. when the
    /// target app is unreachable.
    pub fn errored_suite(scenarios: &[Scenario], reason: &str) -> SuiteReport {
        let reports = scenarios
            .iter()
            .map(|scenario| {
                let mut report = ReportBuilder::new(&scenario.name);
                report.fail(ScenarioStatus::Errored, format!("Session setup failed: {}", reason));
                report.finish()
            })
            .collect();
        SuiteReport::new(reports, 0)
    }

    async fn run_until(&self, scenario: &Scenario, deadline: Option<Instant>) -> Report {
        let mut report = ReportBuilder::new(&scenario.name);
        debug!("Running scenario: {}", scenario.name);

        let entry_url = match scenario.url.as_deref().map(|u| self.resolve_url(u)).transpose() {
            Ok(url) => url,
            Err(e) => {
                report.fail(ScenarioStatus::Errored, e.to_string());
                return log_verdict(report.finish());
            }
        };

        let budget = deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
            .unwrap_or(Duration::MAX);
        let page = match timeout(budget, self.driver.open_session(entry_url.as_deref())).await {
            Ok(Ok(page)) => page,
            Ok(Err(e)) => {
                report.fail(ScenarioStatus::Errored, e.to_string());
                return log_verdict(report.finish());
            }
            Err(_) => {
                report.fail(ScenarioStatus::Timeout, "deadline exceeded during session setup");
                return log_verdict(report.finish());
            }
        };

        let mut session = Session::new(page);
        let body = AssertUnwindSafe(self.execute(scenario, session.page.as_mut(), &mut report, deadline))
            .catch_unwind()
            .await;
        if let Err(panic) = body {
            report.fail(
                ScenarioStatus::Errored,
                format!("scenario panicked: {}", panic_message(panic.as_ref())),
            );
        }
        session.release().await;

        log_verdict(report.finish())
    }

    async fn execute(
        &self,
        scenario: &Scenario,
        page: &mut dyn PageSession,
        report: &mut ReportBuilder,
        deadline: Option<Instant>,
    ) {
        for (index, step) in scenario.steps.iter().enumerate() {
            let step_name = step.name();
            let step_timeout = step.timeout_override().unwrap_or(self.config.default_timeout);
            let remaining = deadline.map(|d| d.saturating_duration_since(Instant::now()));
            let (budget, deadline_bound) = match remaining {
                Some(left) if left < step_timeout => (left, true),
                _ => (step_timeout, false),
            };

            debug!("Executing step {}: {}", index, step_name);
            let start = Instant::now();

            let attempt = AssertUnwindSafe(self.execute_step(scenario, index, step, page, step_timeout))
                .catch_unwind();
            let result = match timeout(budget, attempt).await {
                Ok(Ok(result)) => result,
                Ok(Err(panic)) => Err(StepError::Unexpected(format!(
                    "step panicked: {}",
                    panic_message(panic.as_ref())
                ))),
                Err(_) if deadline_bound => Err(StepError::timeout("overall deadline", budget)),
                Err(_) => Err(StepError::timeout(step_name.clone(), budget)),
            };
            let duration_ms = start.elapsed().as_millis() as u64;

            let failure = match result {
                Ok(screenshot) => {
                    report.record_success(index, step_name, duration_ms, screenshot);
                    None
                }
                Err(e) => {
                    warn!("{} step {} ({}) failed: {}", scenario.name, index, step_name, e);
                    report.record_failure(index, step_name, duration_ms, &e);
                    Some(e)
                }
            };
            report.record_dialogs(page.take_dialogs());

            if let Some(e) = failure {
                self.capture_diagnostic(scenario, &index.to_string(), page, report)
                    .await;

                let out_of_time = deadline.map(|d| Instant::now() >= d).unwrap_or(false);
                if !scenario.best_effort || out_of_time || matches!(e, StepError::Unexpected(_)) {
                    return;
                }
            }
        }

        if report.status() != ScenarioStatus::Passed {
            return;
        }
        if let Some(expect) = &scenario.expect {
            let check = timeout(self.config.default_timeout, check_expectation(expect, page)).await;
            let failure = match check {
                Ok(Ok(())) => return,
                Ok(Err(e)) => e,
                Err(_) => StepError::timeout("terminal expectation", self.config.default_timeout),
            };
            report.fail(
                ScenarioStatus::for_step_error(&failure),
                format!("terminal expectation: {}", failure),
            );
            self.capture_diagnostic(scenario, "expect", page, report).await;
        }
    }

    async fn execute_step(
        &self,
        scenario: &Scenario,
        index: usize,
        step: &Step,
        page: &mut dyn PageSession,
        step_timeout: Duration,
    ) -> StepResult<Option<PathBuf>> {
        match step {
            Step::Navigate { url, .. } => {
                let url = self.resolve_url(url)?;
                page.goto(&url).await?;
            }
            Step::WaitForText { text, .. } => {
                page.wait_for(&Locator::text(text.as_str()), step_timeout).await?;
            }
            Step::WaitForSelector { selector, .. } => {
                page.wait_for(&Locator::css(selector.as_str()), step_timeout).await?;
            }
            Step::WaitForUrl { pattern, .. } => {
                let pattern = compile_pattern(pattern)?;
                page.wait_for_url(&pattern, step_timeout).await?;
            }
            Step::Click { target, .. } => page.click(target).await?,
            Step::Fill { target, value, .. } => page.fill(target, value).await?,
            Step::AssertVisible { target } => assert_visible(page, target).await?,
            Step::AssertHidden { target } => {
                if page.probe(target).await? == Presence::Visible {
                    return Err(AssertionFailure::UnexpectedlyVisible {
                        target: target.to_string(),
                    }
                    .into());
                }
            }
            Step::AssertAbsent { target } => {
                if page.probe(target).await? != Presence::Absent {
                    return Err(AssertionFailure::UnexpectedlyPresent {
                        target: target.to_string(),
                    }
                    .into());
                }
            }
            Step::AssertUrlMatches { pattern } => assert_url_matches(page, pattern).await?,
            Step::Screenshot { path } => {
                let path = self.artifact_path(scenario, &index.to_string(), path.as_deref());
                ensure_parent(&path)?;
                page.screenshot(&path).await?;
                return Ok(Some(path));
            }
            Step::GoBack => page.go_back().await?,
            Step::Log { message } => info!("[{}] {}", scenario.name, message),
        }
        Ok(None)
    }

    /// Best-effort screenshot after a failure. Errors are logged only.
    async fn capture_diagnostic(
        &self,
        scenario: &Scenario,
        suffix: &str,
        page: &mut dyn PageSession,
        report: &mut ReportBuilder,
    ) {
        let path = self.artifact_path(scenario, suffix, None);
        if let Err(e) = ensure_parent(&path) {
            warn!("Could not capture diagnostic screenshot: {}", e);
            return;
        }
        match timeout(CLEANUP_TIMEOUT, page.screenshot(&path)).await {
            Ok(Ok(())) => {
                debug!("Diagnostic screenshot: {}", path.display());
                report.add_diagnostic(path);
            }
            Ok(Err(e)) => warn!("Could not capture diagnostic screenshot: {}", e),
            Err(_) => warn!("Diagnostic screenshot timed out"),
        }
    }

    /// `<out_dir>/<scenario-slug>-<suffix>.png` unless a path is given.
    /// Relative paths land under `out_dir`.
    fn artifact_path(&self, scenario: &Scenario, suffix: &str, requested: Option<&str>) -> PathBuf {
        match requested {
            Some(path) if Path::new(path).is_absolute() => PathBuf::from(path),
            Some(path) => self.config.out_dir.join(path),
            None => self
                .config
                .out_dir
                .join(format!("{}-{}.png", scenario.slug(), suffix)),
        }
    }

    fn resolve_url(&self, url: &str) -> StepResult<String> {
        let base = url::Url::parse(&self.config.base_url).map_err(|e| StepError::NavigationFailed {
            url: self.config.base_url.clone(),
            reason: e.to_string(),
        })?;
        base.join(url)
            .map(String::from)
            .map_err(|e| StepError::NavigationFailed {
                url: url.to_string(),
                reason: e.to_string(),
            })
    }
}

async fn assert_visible(page: &mut dyn PageSession, target: &Locator) -> StepResult<()> {
    let target_name = target.to_string();
    match page.probe(target).await? {
        Presence::Visible => Ok(()),
        Presence::Hidden => Err(AssertionFailure::NotVisible { target: target_name }.into()),
        Presence::Absent => Err(AssertionFailure::NotInDom { target: target_name }.into()),
    }
}

async fn assert_url_matches(page: &mut dyn PageSession, pattern: &str) -> StepResult<()> {
    let regex = compile_pattern(pattern)?;
    let actual = page.current_url().await?;
    if regex.is_match(&actual) {
        Ok(())
    } else {
        Err(AssertionFailure::UrlMismatch {
            pattern: pattern.to_string(),
            actual,
        }
        .into())
    }
}

async fn check_expectation(expect: &Expectation, page: &mut dyn PageSession) -> StepResult<()> {
    if let Some(pattern) = &expect.url_matches {
        assert_url_matches(page, pattern).await?;
    }
    if let Some(target) = &expect.visible {
        assert_visible(page, target).await?;
    }
    Ok(())
}

fn compile_pattern(pattern: &str) -> StepResult<regex::Regex> {
    regex::Regex::new(pattern).map_err(|e| StepError::unexpected("invalid url pattern", e))
}

fn ensure_parent(path: &Path) -> StepResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| StepError::unexpected(&format!("creating {}", parent.display()), e))?;
    }
    Ok(())
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn log_verdict(report: Report) -> Report {
    match report.status {
        ScenarioStatus::Passed => info!("✓ {} ({} ms)", report.scenario, report.duration_ms),
        _ => error!("✗ {}", report.summary_line()),
    }
    report
}
