// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Queue publishing for the collection -> generation hop.

use async_trait::async_trait;
use aws_config::SdkConfig;

use crate::error::{InventoryError, Result};
use crate::model::ResourceBatch;

#[async_trait]
pub trait BatchQueue: Send + Sync {
    /// Publishes one batch. Failures are fatal for the collection run.
    async fn publish(&self, batch: &ResourceBatch) -> Result<()>;
}

pub struct SqsBatchQueue {
    client: aws_sdk_sqs::Client,
    queue_url: String,
}

impl SqsBatchQueue {
    #[must_use]
    pub fn new(config: &SdkConfig, queue_url: impl Into<String>) -> Self {
        SqsBatchQueue {
            client: aws_sdk_sqs::Client::new(config),
            queue_url: queue_url.into(),
        }
    }
}

#[async_trait]
impl BatchQueue for SqsBatchQueue {
    async fn publish(&self, batch: &ResourceBatch) -> Result<()> {
        let body = serde_json::to_string(batch)
            .map_err(|e| InventoryError::Publish(format!("failed to encode batch: {e}")))?;

        self.client
            .send_message()
            .queue_url(&self.queue_url)
            .message_body(body)
            .send()
            .await
            .map_err(|e| {
                InventoryError::Publish(format!(
                    "{}",
                    aws_sdk_sqs::error::DisplayErrorContext(&e)
                ))
            })?;
        Ok(())
    }
}
