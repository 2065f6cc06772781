//! Declarative scenario files (YAML or JSON)

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

use crate::error::{E2eError, E2eResult};

/// Only schema version this build understands.
pub const SCHEMA_VERSION: u32 = 1;

/// One end-to-end UI flow to verify
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Unique name, also used for auto-generated artifact paths
    pub name: String,

    /// Entry URL opened when the session is acquired
    #[serde(default)]
    pub url: Option<String>,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Tags for filtering scenarios
    #[serde(default)]
    pub tags: Vec<String>,

    /// Keep executing after a failing step
    #[serde(default)]
    pub best_effort: bool,

    /// Success condition checked after the last step
    #[serde(default)]
    pub expect: Option<Expectation>,

    /// Steps to execute in order
    #[serde(default)]
    pub steps: Vec<Step>,
}

/// Terminal expectation of a scenario.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Expectation {
    #[serde(default)]
    pub url_matches: Option<String>,
    #[serde(default)]
    pub visible: Option<Locator>,
}

/// A single step in a scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Navigate to a URL (relative to base)
    Navigate {
        url: String,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },

    /// Wait for text to appear anywhere on the page
    WaitForText {
        text: String,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },

    /// Wait for a CSS selector to become visible
    WaitForSelector {
        selector: String,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },

    /// Wait until the current URL matches a regex
    WaitForUrl {
        pattern: String,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },

    /// Click an element
    Click {
        target: Locator,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },

    /// Fill an input field
    Fill {
        target: Locator,
        value: String,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },

    /// The target must be in the DOM and visible
    AssertVisible { target: Locator },

    /// The target must not be visible (absent or hidden both pass)
    AssertHidden { target: Locator },

    /// The target must not be in the DOM at all
    AssertAbsent { target: Locator },

    /// The current URL must match a regex
    AssertUrlMatches { pattern: String },

    /// Capture a full-page screenshot
    Screenshot {
        #[serde(default)]
        path: Option<String>,
    },

    /// Go back one entry in history
    GoBack,

    /// Log a message
    Log { message: String },
}

impl Step {
    /// Per-step timeout override, if the step declares one.
    pub fn timeout_override(&self) -> Option<Duration> {
        let ms = match self {
            Step::Navigate { timeout_ms, .. }
            | Step::WaitForText { timeout_ms, .. }
            | Step::WaitForSelector { timeout_ms, .. }
            | Step::WaitForUrl { timeout_ms, .. }
            | Step::Click { timeout_ms, .. }
            | Step::Fill { timeout_ms, .. } => *timeout_ms,
            _ => None,
        };
        ms.map(Duration::from_millis)
    }

    /// Short label used in logs and reports
    pub fn name(&self) -> String {
        match self {
            Step::Navigate { url, .. } => format!("navigate:{}", url),
            Step::WaitForText { text, .. } => format!("wait_for_text:{}", text),
            Step::WaitForSelector { selector, .. } => format!("wait_for_selector:{}", selector),
            Step::WaitForUrl { pattern, .. } => format!("wait_for_url:{}", pattern),
            Step::Click { target, .. } => format!("click:{}", target),
            Step::Fill { target, .. } => format!("fill:{}", target),
            Step::AssertVisible { target } => format!("assert_visible:{}", target),
            Step::AssertHidden { target } => format!("assert_hidden:{}", target),
            Step::AssertAbsent { target } => format!("assert_absent:{}", target),
            Step::AssertUrlMatches { pattern } => format!("assert_url_matches:{}", pattern),
            Step::Screenshot { path } => {
                format!("screenshot:{}", path.as_deref().unwrap_or("auto"))
            }
            Step::GoBack => "go_back".to_string(),
            Step::Log { message } => {
                let cut = message
                    .char_indices()
                    .nth(30)
                    .map(|(i, _)| i)
                    .unwrap_or(message.len());
                format!("log:{}", &message[..cut])
            }
        }
    }
}

/// How a step finds its element.
///
/// A bare string is a CSS selector, or a text query when prefixed with
/// `text=`. The map forms select by ARIA role, visible text or placeholder,
/// and take an optional zero-based `nth` to pick one of several matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Locator {
    Role {
        role: String,
        #[serde(default)]
        name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        nth: Option<usize>,
    },
    Text {
        text: String,
        #[serde(default)]
        exact: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        nth: Option<usize>,
    },
    Placeholder {
        placeholder: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        nth: Option<usize>,
    },
    Css(String),
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css(selector.into())
    }

    pub fn text(text: impl Into<String>) -> Self {
        Locator::Text {
            text: text.into(),
            exact: false,
            nth: None,
        }
    }

    /// Expands the `text=` shorthand into [`Locator::Text`].
    pub fn normalized(&self) -> Locator {
        match self {
            Locator::Css(s) => match s.strip_prefix("text=") {
                Some(text) => Locator::text(text.trim_matches('"')),
                None => self.clone(),
            },
            other => other.clone(),
        }
    }

    /// Index among the matches, `None` meaning the first visible one.
    pub fn nth(&self) -> Option<usize> {
        match self {
            Locator::Role { nth, .. } | Locator::Text { nth, .. } | Locator::Placeholder { nth, .. } => *nth,
            Locator::Css(_) => None,
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(s) => write!(f, "{}", s)?,
            Locator::Text { text, exact: true, .. } => write!(f, "text=\"{}\"", text)?,
            Locator::Text { text, .. } => write!(f, "text={}", text)?,
            Locator::Placeholder { placeholder, .. } => write!(f, "placeholder={}", placeholder)?,
            Locator::Role { role, name: Some(name), .. } => write!(f, "role={}[name={}]", role, name)?,
            Locator::Role { role, name: None, .. } => write!(f, "role={}", role)?,
        }
        if let Some(nth) = self.nth() {
            write!(f, " >> nth={}", nth)?;
        }
        Ok(())
    }
}

/// Multi-scenario document of a scenario file.
#[derive(Debug, Deserialize)]
struct ScenarioSuite {
    version: u32,
    scenarios: Vec<Scenario>,
}

impl ScenarioSuite {
    fn into_scenarios(self) -> E2eResult<Vec<Scenario>> {
        if self.version != SCHEMA_VERSION {
            return Err(E2eError::SchemaVersion {
                found: self.version,
                expected: SCHEMA_VERSION,
            });
        }
        Ok(self.scenarios)
    }
}

impl Scenario {
    /// Parse one or more scenarios from a YAML string. A document with a
    /// `scenarios` key is a versioned suite, anything else a single scenario.
    pub fn from_yaml(yaml: &str) -> E2eResult<Vec<Self>> {
        let value: serde_yaml::Value = serde_yaml::from_str(yaml)?;
        if value.get("scenarios").is_some() {
            serde_yaml::from_value::<ScenarioSuite>(value)?.into_scenarios()
        } else {
            Ok(vec![serde_yaml::from_value(value)?])
        }
    }

    pub fn from_json(json: &str) -> E2eResult<Vec<Self>> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        if value.get("scenarios").is_some() {
            serde_json::from_value::<ScenarioSuite>(value)?.into_scenarios()
        } else {
            Ok(vec![serde_json::from_value(value)?])
        }
    }

    /// Parse scenarios from a file, picking the format from its extension
    pub fn from_file(path: &Path) -> E2eResult<Vec<Self>> {
        let content = std::fs::read_to_string(path)?;
        let parsed = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&content),
            _ => Self::from_yaml(&content),
        };
        parsed.map_err(|e| E2eError::ScenarioParse(format!("{}: {}", path.display(), e)))
    }

    /// Load every scenario under a file or directory. Names must be unique.
    pub fn load_all(path: &Path) -> E2eResult<Vec<Self>> {
        if path.is_file() {
            let scenarios = Self::from_file(path)?;
            ensure_unique(&scenarios)?;
            return Ok(scenarios);
        }

        let mut files: Vec<_> = walkdir::WalkDir::new(path)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .map(|ext| ext == "yaml" || ext == "yml" || ext == "json")
                    .unwrap_or(false)
            })
            .map(|e| e.into_path())
            .collect();
        files.sort();

        let mut scenarios = Vec::new();
        for file in files {
            scenarios.extend(Self::from_file(&file)?);
        }
        ensure_unique(&scenarios)?;

        Ok(scenarios)
    }

    /// Filter scenarios by tag
    pub fn filter_by_tag(scenarios: Vec<Self>, tag: &str) -> Vec<Self> {
        scenarios
            .into_iter()
            .filter(|s| s.tags.iter().any(|t| t == tag))
            .collect()
    }

    /// Filesystem-safe form of the name, used for artifact paths
    pub fn slug(&self) -> String {
        let slug: String = self
            .name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
            .collect();
        let slug = slug.trim_matches('-').to_string();
        if slug.is_empty() {
            "scenario".to_string()
        } else {
            slug
        }
    }
}

fn ensure_unique(scenarios: &[Scenario]) -> E2eResult<()> {
    let mut seen = std::collections::HashSet::new();
    for scenario in scenarios {
        if !seen.insert(scenario.name.as_str()) {
            return Err(E2eError::ScenarioParse(format!(
                "duplicate scenario name: {}",
                scenario.name
            )));
        }
    }
    Ok(())
}
