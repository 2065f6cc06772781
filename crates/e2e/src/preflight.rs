//! Reachability check for the target app before any browser is launched

use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{info, warn};

use crate::error::{E2eError, E2eResult};

#[derive(Debug, Clone)]
pub struct PreflightConfig {
    pub url: String,
    /// Give up after this long
    pub timeout: Duration,
    pub interval: Duration,
}

impl Default for PreflightConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:3000".to_string(),
            timeout: Duration::from_secs(30),
            interval: Duration::from_millis(250),
        }
    }
}

/// Poll `config.url` until it answers with any HTTP status.
pub async fn wait_for_app(config: &PreflightConfig) -> E2eResult<()> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(2))
        .build()?;

    let start = Instant::now();
    let mut attempts = 0;

    // At least one request, even with a zero timeout.
    loop {
        attempts += 1;

        match client.get(&config.url).send().await {
            Ok(resp) => {
                info!("Target app answered {} at {}", resp.status(), config.url);
                return Ok(());
            }
            Err(e) => {
                if attempts == 1 {
                    info!("Waiting for target app at {}...", config.url);
                }
                // Connection refused is expected while the app is starting
                if !e.is_connect() {
                    warn!("Preflight error: {}", e);
                }
            }
        }

        if start.elapsed() >= config.timeout {
            break;
        }
        sleep(config.interval).await;
    }

    Err(E2eError::AppUnreachable {
        url: config.url.clone(),
        attempts,
    })
}
