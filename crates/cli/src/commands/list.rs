//! List Command

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use uicheck_e2e::{HarnessConfig, Scenario};

use crate::output::{print_list, OutputFormat, TableDisplay};

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Only list scenarios carrying this tag
    #[arg(long)]
    pub tag: Option<String>,
}

/// Scenario display wrapper for serialization
#[derive(Serialize)]
pub struct ScenarioDisplay {
    pub name: String,
    pub url: String,
    pub steps: usize,
    pub tags: String,
    pub best_effort: bool,
}

impl From<&Scenario> for ScenarioDisplay {
    fn from(scenario: &Scenario) -> Self {
        Self {
            name: scenario.name.clone(),
            url: scenario.url.clone().unwrap_or_else(|| "-".to_string()),
            steps: scenario.steps.len(),
            tags: scenario.tags.join(","),
            best_effort: scenario.best_effort,
        }
    }
}

impl TableDisplay for ScenarioDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["Name", "URL", "Steps", "Tags", "Best effort"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.url.clone(),
            self.steps.to_string(),
            self.tags.clone(),
            if self.best_effort { "yes" } else { "no" }.to_string(),
        ]
    }
}

pub fn execute(args: ListArgs, config: &HarnessConfig, format: OutputFormat) -> Result<i32> {
    let scenarios = Scenario::load_all(&config.scenarios)
        .with_context(|| format!("Failed to load scenarios from {}", config.scenarios.display()))?;
    let scenarios = match args.tag {
        Some(tag) => Scenario::filter_by_tag(scenarios, &tag),
        None => scenarios,
    };

    let display: Vec<ScenarioDisplay> = scenarios.iter().map(ScenarioDisplay::from).collect();
    print_list(&display, format);
    Ok(0)
}
