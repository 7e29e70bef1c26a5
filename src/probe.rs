use std::time::Duration;

use indicatif::ProgressBar;
use indicatif::ProgressStyle;
use reqwest::Client;
use thiserror::Error;
use tokio::time::sleep;
use tracing::debug;
use url::Url;

/// Attempt budget for the readiness probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbePolicy {
    pub attempts: u32,
    pub delay: Duration,
    pub timeout: Duration,
}

impl ProbePolicy {
    /// Ten one-second attempts, one second apart.
    pub const PATIENT: ProbePolicy = ProbePolicy {
        attempts: 10,
        delay: Duration::from_secs(1),
        timeout: Duration::from_secs(1),
    };

    /// A single attempt with a five second timeout.
    pub const SINGLE_SHOT: ProbePolicy = ProbePolicy {
        attempts: 1,
        delay: Duration::ZERO,
        timeout: Duration::from_secs(5),
    };
}

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("server at {url} did not respond after {attempts} attempt(s): {last_error}")]
    Unreachable {
        url: String,
        attempts: u32,
        last_error: String,
    },
}

/// Polls `url` until the server answers. Any HTTP response counts, whatever
/// its status. Returns the number of attempts it took.
pub async fn wait_for_server(
    client: &Client,
    url: &Url,
    policy: ProbePolicy,
    spinner: &ProgressBar,
) -> Result<u32, ProbeError> {
    let mut last_error = String::from("no attempt was made");

    for attempt in 1..=policy.attempts {
        spinner.set_message(format!(
            "Waiting for server... (attempt {attempt}/{})",
            policy.attempts
        ));

        match client
            .get(url.clone())
            .timeout(policy.timeout)
            .send()
            .await
        {
            Ok(resp) => {
                debug!(attempt, status = %resp.status(), "server answered");
                return Ok(attempt);
            }
            Err(err) => {
                debug!(attempt, error = %err, "server not ready");
                last_error = err.to_string();
            }
        }

        if attempt < policy.attempts {
            sleep(policy.delay).await;
        }
    }

    Err(ProbeError::Unreachable {
        url: url.to_string(),
        attempts: policy.attempts,
        last_error,
    })
}

/// Runs the probe behind a spinner. The caller reports the outcome.
pub async fn run(client: &Client, url: &Url, policy: ProbePolicy) -> Result<(), ProbeError> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.enable_steady_tick(Duration::from_millis(100));

    let result = wait_for_server(client, url, policy, &spinner).await;
    spinner.finish_and_clear();

    result.map(|_| ())
}
