//! Idle penalty computation.
//!
//! The tracker hands the current score to an [`IdlePenaltyService`] and later
//! overwrites the score with whatever comes back. The default service just
//! waits a little and subtracts a fixed amount; the remote one asks an HTTP
//! endpoint for the new score.

use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use super::score::clamp_score;
use crate::error::CoreError;
use crate::storage::{IdlePenaltyConfig, IdlePenaltyMode};

/// Computes the score that replaces the current one after an idle period.
pub trait IdlePenaltyService: Send + Sync + 'static {
    fn penalize(&self, score: f64) -> impl Future<Output = Result<f64, CoreError>> + Send;
}

/// Local stand-in for a remote call: fixed latency, fixed reduction.
#[derive(Debug, Clone)]
pub struct SimulatedIdlePenalty {
    amount: f64,
    delay: Duration,
}

impl SimulatedIdlePenalty {
    pub fn new(amount: f64, delay: Duration) -> Self {
        Self { amount, delay }
    }
}

impl Default for SimulatedIdlePenalty {
    fn default() -> Self {
        Self::new(0.02, Duration::from_millis(300))
    }
}

impl IdlePenaltyService for SimulatedIdlePenalty {
    async fn penalize(&self, score: f64) -> Result<f64, CoreError> {
        tokio::time::sleep(self.delay).await;
        Ok((score - self.amount).max(0.0))
    }
}

#[derive(Serialize)]
struct PenaltyRequest {
    score: f64,
}

#[derive(Deserialize)]
struct PenaltyResponse {
    score: f64,
}

/// POSTs `{"score": x}` and expects `{"score": y}` back.
#[derive(Debug, Clone)]
pub struct RemoteIdlePenalty {
    client: Client,
    endpoint: Url,
}

impl RemoteIdlePenalty {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, CoreError> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| CoreError::IdlePenalty(format!("invalid endpoint '{endpoint}': {e}")))?;
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, endpoint })
    }
}

impl IdlePenaltyService for RemoteIdlePenalty {
    async fn penalize(&self, score: f64) -> Result<f64, CoreError> {
        let resp = self
            .client
            .post(self.endpoint.clone())
            .json(&PenaltyRequest { score })
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(CoreError::IdlePenalty(format!(
                "penalty service answered HTTP {status}"
            )));
        }

        let body: PenaltyResponse = resp.json().await?;
        if !body.score.is_finite() {
            return Err(CoreError::IdlePenalty("non-finite score in response".into()));
        }
        Ok(clamp_score(body.score))
    }
}

/// Service selected by configuration.
#[derive(Debug, Clone)]
pub enum IdlePenalty {
    Simulated(SimulatedIdlePenalty),
    Remote(RemoteIdlePenalty),
}

impl IdlePenalty {
    pub fn from_config(config: &IdlePenaltyConfig) -> Result<Self, CoreError> {
        match config.mode {
            IdlePenaltyMode::Simulated => Ok(IdlePenalty::Simulated(SimulatedIdlePenalty::new(
                config.amount,
                Duration::from_millis(config.delay_ms),
            ))),
            IdlePenaltyMode::Remote => {
                let endpoint = config.endpoint.as_deref().ok_or_else(|| {
                    CoreError::IdlePenalty("remote mode requires an endpoint".into())
                })?;
                Ok(IdlePenalty::Remote(RemoteIdlePenalty::new(
                    endpoint,
                    Duration::from_secs(config.timeout_secs),
                )?))
            }
        }
    }
}

impl Default for IdlePenalty {
    fn default() -> Self {
        IdlePenalty::Simulated(SimulatedIdlePenalty::default())
    }
}

impl IdlePenaltyService for IdlePenalty {
    async fn penalize(&self, score: f64) -> Result<f64, CoreError> {
        match self {
            IdlePenalty::Simulated(s) => s.penalize(score).await,
            IdlePenalty::Remote(r) => r.penalize(score).await,
        }
    }
}
