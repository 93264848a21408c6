// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Metadata backend submission.
//!
//! Thin client around the backend's `submit` call: one HTTP POST per batch of
//! attributed resources, authenticated with the private key. Transient
//! failures (5xx, network errors) are retried a bounded number of times with
//! linear backoff; 4xx responses are permanent and fail immediately.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::time::sleep;
use tracing::{debug, error};

use crate::error::{InventoryError, Result};
use crate::model::AttributedResource;

const SUBMIT_RETRY_COUNT: u32 = 3;
const SUBMIT_TIMEOUT: Duration = Duration::from_secs(30);
const RETRY_BACKOFF: Duration = Duration::from_secs(1);

#[async_trait]
pub trait MetadataSink: Send + Sync {
    /// Submits one batch of attributed resources under the given collector
    /// id. Re-submission of the same records is safe; it only refreshes
    /// their TTL.
    async fn submit(&self, collector_id: &str, resources: &[AttributedResource]) -> Result<()>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SubmitRequest<'a> {
    collector_id: &'a str,
    resources: &'a [AttributedResource],
}

pub struct IntakeClient {
    client: reqwest::Client,
    url: String,
    private_key: String,
    backoff: Duration,
}

impl IntakeClient {
    pub fn new(url: impl Into<String>, private_key: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(SUBMIT_TIMEOUT)
            .build()
            .map_err(|e| InventoryError::Submit(format!("failed to build HTTP client: {e}")))?;
        Ok(IntakeClient {
            client,
            url: url.into(),
            private_key: private_key.into(),
            backoff: RETRY_BACKOFF,
        })
    }
}

#[async_trait]
impl MetadataSink for IntakeClient {
    async fn submit(&self, collector_id: &str, resources: &[AttributedResource]) -> Result<()> {
        let body = SubmitRequest {
            collector_id,
            resources,
        };

        let mut attempts = 0;
        loop {
            attempts += 1;
            match self
                .client
                .post(&self.url)
                .bearer_auth(&self.private_key)
                .json(&body)
                .send()
                .await
            {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        debug!(
                            "Submitted {} resources for {collector_id}",
                            resources.len()
                        );
                        return Ok(());
                    }
                    // 4xx means the key or the payload is wrong; retrying the
                    // same request cannot succeed.
                    if status.is_client_error() {
                        return Err(InventoryError::Submit(format!(
                            "backend rejected submission: {status}"
                        )));
                    }
                    error!("Metadata submission attempt {attempts} failed with {status}");
                }
                Err(e) => {
                    error!("Metadata submission attempt {attempts} failed: {e}");
                }
            }

            if attempts >= SUBMIT_RETRY_COUNT {
                return Err(InventoryError::Submit(format!(
                    "failed after {attempts} attempts"
                )));
            }
            sleep(self.backoff * attempts).await;
        }
    }
}
