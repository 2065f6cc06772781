//! Browser automation boundary
//!
//! The runner only talks to a browser through these two traits, so any
//! driver (the CDP one in [`crate::chromium`], or a stub in tests) can be
//! plugged in.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio::time::{sleep, Instant};

use crate::error::{E2eResult, StepError, StepResult};
use crate::spec::Locator;

/// Interval between two presence checks inside [`PageSession::wait_for`].
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Where an element stands on the rendered page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Presence {
    Absent,
    Hidden,
    Visible,
}

/// Launches sessions. One session per scenario, never shared.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Open a fresh page, optionally already pointed at `entry_url`.
    async fn open_session(&self, entry_url: Option<&str>) -> E2eResult<Box<dyn PageSession>>;
}

/// One live browser page.
#[async_trait]
pub trait PageSession: Send {
    /// Navigate and wait for the load to finish
    async fn goto(&mut self, url: &str) -> StepResult<()>;

    async fn click(&mut self, target: &Locator) -> StepResult<()>;

    /// Replace the value of an input
    async fn fill(&mut self, target: &Locator, value: &str) -> StepResult<()>;

    /// Check, without waiting, whether the target is on the page
    async fn probe(&mut self, target: &Locator) -> StepResult<Presence>;

    async fn current_url(&mut self) -> StepResult<String>;

    async fn go_back(&mut self) -> StepResult<()>;

    /// Capture a full-page PNG to `path`
    async fn screenshot(&mut self, path: &Path) -> StepResult<()>;

    /// Release the page and everything backing it
    async fn close(&mut self) -> StepResult<()>;

    /// Messages of native dialogs the page accepted since the last call
    fn take_dialogs(&mut self) -> Vec<String> {
        Vec::new()
    }

    /// Wait until the target is visible, polling [`Self::probe`].
    ///
    /// A failing probe counts as "not yet": pages mid-navigation cannot be
    /// queried. The last error is reported if the wait times out.
    async fn wait_for(&mut self, target: &Locator, timeout: Duration) -> StepResult<()> {
        let deadline = Instant::now() + timeout;
        let mut last_error = None;
        loop {
            match self.probe(target).await {
                Ok(Presence::Visible) => return Ok(()),
                Ok(_) => last_error = None,
                Err(e) => last_error = Some(e),
            }
            if Instant::now() >= deadline {
                return Err(StepError::timeout(with_last_error(target.to_string(), last_error), timeout));
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    /// Wait until the current URL matches `pattern`.
    async fn wait_for_url(&mut self, pattern: &regex::Regex, timeout: Duration) -> StepResult<()> {
        let deadline = Instant::now() + timeout;
        let mut last_error = None;
        loop {
            match self.current_url().await {
                Ok(url) if pattern.is_match(&url) => return Ok(()),
                Ok(_) => last_error = None,
                Err(e) => last_error = Some(e),
            }
            if Instant::now() >= deadline {
                return Err(StepError::timeout(
                    with_last_error(format!("url /{}/", pattern), last_error),
                    timeout,
                ));
            }
            sleep(POLL_INTERVAL).await;
        }
    }
}

fn with_last_error(what: String, last_error: Option<StepError>) -> String {
    match last_error {
        Some(e) => format!("{} (last error: {})", what, e),
        None => what,
    }
}
