//! uicheck E2E scenario runner
//!
//! This crate provides a Rust-controlled UI verification harness that:
//! - Parses declarative YAML/JSON scenario files
//! - Drives a headless Chromium over the DevTools protocol
//! - Executes each scenario in its own browser session, fail-fast
//! - Records a structured report with diagnostic screenshots
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Scenario Runner (Rust)                   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ScenarioRunner                                             │
//! │    ├── run(scenario) -> Report                              │
//! │    └── run_all(scenarios) -> SuiteReport (input order)      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  BrowserDriver / PageSession (trait boundary)               │
//! │    └── ChromiumDriver: one browser + profile per session    │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Scenario (YAML)                                            │
//! │    ├── name, url, best_effort, expect                       │
//! │    └── steps: [Step]                                        │
//! │          ├── navigate { url }                               │
//! │          ├── wait_for_text / wait_for_selector / _url       │
//! │          ├── click { target } / fill { target, value }      │
//! │          ├── assert_visible / _hidden / _absent / _url      │
//! │          └── screenshot { path? }                           │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod chromium;
pub mod config;
pub mod driver;
pub mod error;
pub mod preflight;
pub mod report;
pub mod runner;
pub mod spec;

pub use chromium::{ChromiumConfig, ChromiumDriver};
pub use config::HarnessConfig;
pub use driver::{BrowserDriver, PageSession, Presence};
pub use error::{AssertionFailure, E2eError, E2eResult, StepError, StepResult};
pub use report::{Report, ScenarioStatus, SuiteReport};
pub use runner::{RunnerConfig, ScenarioRunner};
pub use spec::{Locator, Scenario, Step};
