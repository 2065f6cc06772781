//! Stub browser driver with spies, shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use uicheck_e2e::{BrowserDriver, E2eError, E2eResult, Locator, PageSession, Presence, StepError, StepResult};

/// Counts sessions and records every page call.
#[derive(Default)]
pub struct Spy {
    opened: AtomicUsize,
    closed: AtomicUsize,
    calls: Mutex<Vec<String>>,
}

impl Spy {
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

/// What the fake page looks like. Locators are keyed by their display form;
/// anything not listed is visible.
#[derive(Clone, Default)]
pub struct PageModel {
    pub presence: HashMap<String, Presence>,
    pub click_delay: HashMap<String, Duration>,
    pub hang_on_click: Vec<String>,
    pub panic_on_click: Vec<String>,
    /// Clicking the key moves the page to the value
    pub click_navigates: HashMap<String, String>,
    /// Clicking the key opens a native dialog with the value as message
    pub click_dialogs: HashMap<String, String>,
    /// The first N probes fail, as they do while a page is navigating
    pub failing_probes: usize,
    pub panic_on_probe: Vec<String>,
}

impl PageModel {
    pub fn with(mut self, locator: &str, presence: Presence) -> Self {
        self.presence.insert(locator.to_string(), presence);
        self
    }

    fn presence_of(&self, target: &Locator) -> Presence {
        self.presence
            .get(&target.to_string())
            .copied()
            .unwrap_or(Presence::Visible)
    }
}

pub struct StubDriver {
    pub spy: Arc<Spy>,
    model: PageModel,
    /// Session setup fails for entry URLs containing this
    fail_setup_for: Option<String>,
}

impl StubDriver {
    pub fn new(model: PageModel) -> Self {
        Self {
            spy: Arc::new(Spy::default()),
            model,
            fail_setup_for: None,
        }
    }

    pub fn failing_setup_for(mut self, url_part: &str) -> Self {
        self.fail_setup_for = Some(url_part.to_string());
        self
    }
}

#[async_trait]
impl BrowserDriver for StubDriver {
    async fn open_session(&self, entry_url: Option<&str>) -> E2eResult<Box<dyn PageSession>> {
        let url = entry_url.unwrap_or("about:blank").to_string();
        if let Some(part) = &self.fail_setup_for {
            if url.contains(part.as_str()) {
                return Err(E2eError::SessionSetup("chromium did not start".to_string()));
            }
        }
        self.spy.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(StubPage {
            spy: self.spy.clone(),
            failing_probes: self.model.failing_probes,
            model: self.model.clone(),
            url,
            dialogs: Vec::new(),
        }))
    }
}

struct StubPage {
    spy: Arc<Spy>,
    model: PageModel,
    url: String,
    failing_probes: usize,
    dialogs: Vec<String>,
}

impl StubPage {
    fn require_visible(&self, target: &Locator) -> StepResult<()> {
        match self.model.presence_of(target) {
            Presence::Visible => Ok(()),
            _ => Err(StepError::ElementNotFound {
                locator: target.to_string(),
            }),
        }
    }
}

#[async_trait]
impl PageSession for StubPage {
    async fn goto(&mut self, url: &str) -> StepResult<()> {
        self.spy.record(format!("goto:{}", url));
        self.url = url.to_string();
        Ok(())
    }

    async fn click(&mut self, target: &Locator) -> StepResult<()> {
        let key = target.to_string();
        self.spy.record(format!("click:{}", key));
        if self.model.panic_on_click.contains(&key) {
            panic!("stub page crashed on {}", key);
        }
        if self.model.hang_on_click.contains(&key) {
            std::future::pending::<()>().await;
        }
        if let Some(delay) = self.model.click_delay.get(&key) {
            tokio::time::sleep(*delay).await;
        }
        self.require_visible(target)?;
        if let Some(url) = self.model.click_navigates.get(&key) {
            self.url = url.clone();
        }
        if let Some(message) = self.model.click_dialogs.get(&key) {
            self.dialogs.push(message.clone());
        }
        Ok(())
    }

    async fn fill(&mut self, target: &Locator, value: &str) -> StepResult<()> {
        self.spy.record(format!("fill:{}={}", target, value));
        self.require_visible(target)
    }

    async fn probe(&mut self, target: &Locator) -> StepResult<Presence> {
        let key = target.to_string();
        self.spy.record(format!("probe:{}", key));
        if self.model.panic_on_probe.contains(&key) {
            panic!("stub page crashed probing {}", key);
        }
        if self.failing_probes > 0 {
            self.failing_probes -= 1;
            return Err(StepError::Unexpected("Execution context was destroyed".to_string()));
        }
        Ok(self.model.presence_of(target))
    }

    async fn current_url(&mut self) -> StepResult<String> {
        Ok(self.url.clone())
    }

    async fn go_back(&mut self) -> StepResult<()> {
        self.spy.record("go_back".to_string());
        Ok(())
    }

    async fn screenshot(&mut self, path: &Path) -> StepResult<()> {
        self.spy.record(format!("screenshot:{}", path.display()));
        std::fs::write(path, b"\x89PNG stub").map_err(|e| StepError::unexpected("screenshot", e))
    }

    fn take_dialogs(&mut self) -> Vec<String> {
        std::mem::take(&mut self.dialogs)
    }

    async fn close(&mut self) -> StepResult<()> {
        self.spy.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
