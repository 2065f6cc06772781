//! Chromium driver over the DevTools protocol
//!
//! Every session launches its own browser with a throwaway profile
//! directory, so cookies and storage never carry over between scenarios.

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::{
    EventJavascriptDialogOpening, GetNavigationHistoryParams, HandleJavaScriptDialogParams,
    NavigateToHistoryEntryParams,
};
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::StreamExt;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::driver::{BrowserDriver, PageSession, Presence};
use crate::error::{E2eError, E2eResult, StepError, StepResult};
use crate::spec::Locator;

const LOCATE_SCRIPT: &str = include_str!("locate.js");
const MARKED: &str = "[data-uicheck-target]";

/// Configuration for the Chromium driver
#[derive(Debug, Clone)]
pub struct ChromiumConfig {
    pub headless: bool,
    pub chrome_path: Option<PathBuf>,
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// Upper bound for a single CDP request
    pub request_timeout: Duration,
}

impl Default for ChromiumConfig {
    fn default() -> Self {
        Self {
            headless: true,
            chrome_path: None,
            viewport_width: 1280,
            viewport_height: 720,
            request_timeout: Duration::from_secs(30),
        }
    }
}

pub struct ChromiumDriver {
    config: ChromiumConfig,
}

impl ChromiumDriver {
    pub fn new(config: ChromiumConfig) -> Self {
        Self { config }
    }

    fn browser_config(&self, profile: &Path) -> E2eResult<BrowserConfig> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .user_data_dir(profile)
            .window_size(self.config.viewport_width, self.config.viewport_height)
            .request_timeout(self.config.request_timeout);

        if !self.config.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &self.config.chrome_path {
            builder = builder.chrome_executable(path);
        }

        builder.build().map_err(E2eError::SessionSetup)
    }
}

#[async_trait]
impl BrowserDriver for ChromiumDriver {
    async fn open_session(&self, entry_url: Option<&str>) -> E2eResult<Box<dyn PageSession>> {
        let profile = tempfile::Builder::new().prefix("uicheck-profile-").tempdir()?;
        let config = self.browser_config(profile.path())?;

        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| E2eError::SessionSetup(format!("failed to launch chromium: {}", e)))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let dialogs = Arc::new(Mutex::new(Vec::new()));
        let (page, dialog_handler) = match open_page(&browser, entry_url, dialogs.clone()).await {
            Ok(opened) => opened,
            Err(e) => {
                let _ = browser.close().await;
                let _ = browser.wait().await;
                handler.abort();
                return Err(e);
            }
        };

        debug!("Opened chromium session (profile {})", profile.path().display());

        Ok(Box::new(ChromiumSession {
            browser: Some(browser),
            page: Some(page),
            handler,
            dialog_handler,
            dialogs,
            _profile: profile,
        }))
    }
}

/// Blank page with dialog handling in place, then the entry URL, so a
/// dialog raised during the first load is accepted too.
async fn open_page(
    browser: &Browser,
    entry_url: Option<&str>,
    dialogs: Arc<Mutex<Vec<String>>>,
) -> E2eResult<(Page, JoinHandle<()>)> {
    let page = browser
        .new_page("about:blank")
        .await
        .map_err(|e| E2eError::SessionSetup(format!("failed to open page: {}", e)))?;
    let dialog_handler = accept_dialogs(&page, dialogs).await?;

    if let Some(url) = entry_url {
        if let Err(e) = page.goto(url).await {
            dialog_handler.abort();
            return Err(E2eError::SessionSetup(format!("failed to open {}: {}", url, e)));
        }
    }
    Ok((page, dialog_handler))
}

/// Accept every native `alert`/`confirm`/`prompt`. An open dialog blocks
/// all script evaluation on the page.
async fn accept_dialogs(page: &Page, seen: Arc<Mutex<Vec<String>>>) -> E2eResult<JoinHandle<()>> {
    let mut events = page
        .event_listener::<EventJavascriptDialogOpening>()
        .await
        .map_err(|e| E2eError::SessionSetup(format!("failed to watch dialogs: {}", e)))?;
    let page = page.clone();

    Ok(tokio::spawn(async move {
        while let Some(event) = events.next().await {
            info!("Accepting {:?} dialog: {}", event.r#type, event.message);
            if let Ok(mut seen) = seen.lock() {
                seen.push(event.message.clone());
            }
            if let Err(e) = page.execute(HandleJavaScriptDialogParams::new(true)).await {
                warn!("Failed to accept dialog: {}", e);
            }
        }
    }))
}

/// What the in-page locate script receives.
#[derive(Serialize)]
struct LocateQuery<'a> {
    kind: &'a str,
    value: &'a str,
    name: Option<&'a str>,
    exact: bool,
    nth: Option<usize>,
}

fn locate_script(target: &Locator) -> StepResult<String> {
    let target = target.normalized();
    let nth = target.nth();
    let query = match &target {
        Locator::Css(selector) => LocateQuery { kind: "css", value: selector, name: None, exact: false, nth },
        Locator::Text { text, exact, .. } => LocateQuery { kind: "text", value: text, name: None, exact: *exact, nth },
        Locator::Placeholder { placeholder, .. } => {
            LocateQuery { kind: "placeholder", value: placeholder, name: None, exact: true, nth }
        }
        Locator::Role { role, name, .. } => {
            LocateQuery { kind: "role", value: role, name: name.as_deref(), exact: false, nth }
        }
    };
    let json = serde_json::to_string(&query).map_err(|e| StepError::unexpected("locator", e))?;
    Ok(LOCATE_SCRIPT.replace("__QUERY__", &json))
}

pub struct ChromiumSession {
    browser: Option<Browser>,
    page: Option<Page>,
    handler: JoinHandle<()>,
    dialog_handler: JoinHandle<()>,
    dialogs: Arc<Mutex<Vec<String>>>,
    _profile: TempDir,
}

impl ChromiumSession {
    fn page(&self) -> StepResult<&Page> {
        self.page
            .as_ref()
            .ok_or_else(|| StepError::Unexpected("session already closed".to_string()))
    }

    /// Resolve and tag the target so it can be addressed by [`MARKED`].
    async fn mark(&self, target: &Locator) -> StepResult<Presence> {
        let script = locate_script(target)?;
        let result = self
            .page()?
            .evaluate(script)
            .await
            .map_err(|e| StepError::unexpected(&format!("locating {}", target), e))?;
        let presence: Presence = result
            .into_value()
            .map_err(|e| StepError::unexpected(&format!("locating {}", target), e))?;
        Ok(presence)
    }

    async fn visible_element(&self, target: &Locator) -> StepResult<chromiumoxide::element::Element> {
        match self.mark(target).await? {
            Presence::Visible => {}
            Presence::Absent | Presence::Hidden => {
                return Err(StepError::ElementNotFound {
                    locator: target.to_string(),
                })
            }
        }
        self.page()?
            .find_element(MARKED)
            .await
            .map_err(|_| StepError::ElementNotFound {
                locator: target.to_string(),
            })
    }
}

#[async_trait]
impl PageSession for ChromiumSession {
    async fn goto(&mut self, url: &str) -> StepResult<()> {
        self.page()?
            .goto(url)
            .await
            .map_err(|e| StepError::NavigationFailed {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        Ok(())
    }

    async fn click(&mut self, target: &Locator) -> StepResult<()> {
        let element = self.visible_element(target).await?;
        element
            .click()
            .await
            .map_err(|e| StepError::unexpected(&format!("click {}", target), e))?;
        Ok(())
    }

    async fn fill(&mut self, target: &Locator, value: &str) -> StepResult<()> {
        let element = self.visible_element(target).await?;
        element
            .click()
            .await
            .map_err(|e| StepError::unexpected(&format!("focus {}", target), e))?;
        // Select the current value so typing replaces it.
        self.page()?
            .evaluate(format!(
                "(() => {{ const el = document.querySelector('{}'); if (el && el.select) el.select(); }})()",
                MARKED
            ))
            .await
            .map_err(|e| StepError::unexpected(&format!("clear {}", target), e))?;
        element
            .type_str(value)
            .await
            .map_err(|e| StepError::unexpected(&format!("fill {}", target), e))?;
        Ok(())
    }

    async fn probe(&mut self, target: &Locator) -> StepResult<Presence> {
        self.mark(target).await
    }

    async fn current_url(&mut self) -> StepResult<String> {
        let url = self
            .page()?
            .url()
            .await
            .map_err(|e| StepError::unexpected("reading url", e))?;
        Ok(url.unwrap_or_default())
    }

    async fn go_back(&mut self) -> StepResult<()> {
        let page = self.page()?;
        let history = page
            .execute(GetNavigationHistoryParams::default())
            .await
            .map_err(|e| StepError::unexpected("reading history", e))?;
        let previous = usize::try_from(history.current_index - 1)
            .ok()
            .and_then(|index| history.entries.get(index))
            .ok_or_else(|| StepError::NavigationFailed {
                url: "history.back".to_string(),
                reason: "no previous page".to_string(),
            })?;
        let url = previous.url.clone();

        page.execute(NavigateToHistoryEntryParams::new(previous.id))
            .await
            .map_err(|e| StepError::NavigationFailed {
                url: url.clone(),
                reason: e.to_string(),
            })?;
        // Bounded by the step timeout in the runner.
        page.wait_for_navigation()
            .await
            .map_err(|e| StepError::NavigationFailed {
                url,
                reason: e.to_string(),
            })?;
        Ok(())
    }

    async fn screenshot(&mut self, path: &Path) -> StepResult<()> {
        let params = ScreenshotParams::builder().full_page(true).build();
        self.page()?
            .save_screenshot(params, path)
            .await
            .map_err(|e| StepError::unexpected(&format!("screenshot {}", path.display()), e))?;
        Ok(())
    }

    fn take_dialogs(&mut self) -> Vec<String> {
        self.dialogs
            .lock()
            .map(|mut seen| std::mem::take(&mut *seen))
            .unwrap_or_default()
    }

    async fn close(&mut self) -> StepResult<()> {
        self.dialog_handler.abort();
        if let Some(page) = self.page.take() {
            if let Err(e) = page.close().await {
                warn!("Failed to close page: {}", e);
            }
        }
        if let Some(mut browser) = self.browser.take() {
            if let Err(e) = browser.close().await {
                warn!("Failed to close browser: {}", e);
            }
            let _ = browser.wait().await;
        }
        self.handler.abort();
        Ok(())
    }
}
