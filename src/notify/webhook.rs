// src/notify/webhook.rs
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;

use super::NotificationPayload;

pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Result of one POST to one endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered {
        endpoint: String,
        status: u16,
    },
    Failed {
        endpoint: String,
        status: Option<u16>,
        error: String,
    },
}

impl DeliveryOutcome {
    pub fn endpoint(&self) -> &str {
        match self {
            Self::Delivered { endpoint, .. } | Self::Failed { endpoint, .. } => endpoint.as_str(),
        }
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchReport {
    /// Endpoint list was empty; nothing was sent.
    NoDestinations,
    /// One outcome per endpoint, in configured order.
    Attempted(Vec<DeliveryOutcome>),
}

impl DispatchReport {
    pub fn outcomes(&self) -> &[DeliveryOutcome] {
        match self {
            Self::NoDestinations => &[],
            Self::Attempted(v) => v.as_slice(),
        }
    }

    pub fn any_delivered(&self) -> bool {
        self.outcomes().iter().any(DeliveryOutcome::is_delivered)
    }
}

/// Posts adaptive cards to webhook endpoints, each one independently and once.
#[derive(Clone)]
pub struct Dispatcher {
    client: Client,
    timeout: Duration,
}

impl Dispatcher {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .context("building webhook http client")?;
        Ok(Self { client, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Deliver `payload` to every endpoint. A failing endpoint never stops the others
    /// and nothing is retried.
    pub async fn dispatch(
        &self,
        payload: &NotificationPayload,
        endpoints: &[String],
    ) -> DispatchReport {
        if endpoints.is_empty() {
            return DispatchReport::NoDestinations;
        }

        let body = match serde_json::to_vec(&payload.to_card()) {
            Ok(b) => b,
            Err(e) => {
                tracing::error!(error = %e, "serializing adaptive card failed");
                return DispatchReport::Attempted(
                    endpoints
                        .iter()
                        .map(|ep| DeliveryOutcome::Failed {
                            endpoint: ep.clone(),
                            status: None,
                            error: format!("serialize payload: {e}"),
                        })
                        .collect(),
                );
            }
        };

        let mut outcomes = Vec::with_capacity(endpoints.len());
        for endpoint in endpoints {
            let outcome = self.post_one(endpoint, body.clone()).await;
            match &outcome {
                DeliveryOutcome::Delivered { status, .. } => {
                    tracing::info!(endpoint = %endpoint, status, "webhook delivered");
                }
                DeliveryOutcome::Failed { status, error, .. } => {
                    tracing::warn!(endpoint = %endpoint, status = ?status, error = %error, "webhook delivery failed");
                }
            }
            outcomes.push(outcome);
        }
        DispatchReport::Attempted(outcomes)
    }

    async fn post_one(&self, endpoint: &str, body: Vec<u8>) -> DeliveryOutcome {
        let res = self
            .client
            .post(endpoint)
            .timeout(self.timeout)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await;

        match res {
            Ok(rsp) => {
                let status = rsp.status();
                if status.is_success() {
                    DeliveryOutcome::Delivered {
                        endpoint: endpoint.to_string(),
                        status: status.as_u16(),
                    }
                } else {
                    DeliveryOutcome::Failed {
                        endpoint: endpoint.to_string(),
                        status: Some(status.as_u16()),
                        error: format!("webhook HTTP error: {status}"),
                    }
                }
            }
            Err(e) => DeliveryOutcome::Failed {
                endpoint: endpoint.to_string(),
                status: None,
                error: format!("webhook request failed: {:#}", anyhow::Error::from(e)),
            },
        }
    }
}
