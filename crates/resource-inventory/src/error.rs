// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

/// Errors that can occur while collecting or generating resource metadata
#[derive(Debug, thiserror::Error)]
pub enum InventoryError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("{service} request was throttled")]
    Throttled { service: &'static str },

    #[error("{service} request failed: {message}")]
    Api {
        service: &'static str,
        message: String,
    },

    #[error("Failed to assume role {role_arn}: {message}")]
    AssumeRole { role_arn: String, message: String },

    #[error("Failed to publish batch to the queue: {0}")]
    Publish(String),

    #[error("Metadata submission failed: {0}")]
    Submit(String),

    #[error("Failed to enrich any resource in a non-empty batch")]
    AllEnrichmentFailed,

    #[error("Unsupported batch source: {0}")]
    UnsupportedSource(String),
}

impl InventoryError {
    /// True for provider rate-limit signals, which enumeration retries with a
    /// fixed backoff instead of escalating.
    #[must_use]
    pub fn is_throttled(&self) -> bool {
        matches!(self, InventoryError::Throttled { .. })
    }
}

pub type Result<T> = std::result::Result<T, InventoryError>;
