// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Provider API seams and their AWS SDK implementations.
//!
//! Each service the pipeline talks to sits behind a trait (`FunctionsApi`,
//! `InstancesApi`, `IdentityApi`, `TaggingApi`, `AggregatorApi`,
//! `BatchQueue`), so the collector and generator are testable against
//! in-memory fakes. The implementations normalize every SDK response into the
//! canonical model shapes at the boundary.

pub mod config_agg;
pub mod ec2;
pub mod lambda;
pub mod sqs;
pub mod sts;
pub mod tagging;

use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_lambda::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};

use crate::error::InventoryError;
use crate::model::Credentials;

/// The (region, account, credentials) triple one enumeration pass runs under.
/// Credentials are present only for assumed-role scopes and are never shared
/// across accounts.
#[derive(Debug, Clone)]
pub struct AccountScope {
    pub region: String,
    pub account_id: String,
    pub credentials: Option<Credentials>,
}

impl AccountScope {
    #[must_use]
    pub fn current(region: impl Into<String>, account_id: impl Into<String>) -> Self {
        AccountScope {
            region: region.into(),
            account_id: account_id.into(),
            credentials: None,
        }
    }

    #[must_use]
    pub fn assumed(
        region: impl Into<String>,
        account_id: impl Into<String>,
        credentials: Credentials,
    ) -> Self {
        AccountScope {
            region: region.into(),
            account_id: account_id.into(),
            credentials: Some(credentials),
        }
    }
}

/// Builds an SDK configuration for a region, optionally under assumed-role
/// credentials. With no credentials the ambient provider chain is used.
pub(crate) async fn sdk_config(region: &str, credentials: Option<&Credentials>) -> SdkConfig {
    let mut loader =
        aws_config::defaults(BehaviorVersion::latest()).region(Region::new(region.to_string()));
    if let Some(creds) = credentials {
        loader = loader.credentials_provider(aws_credential_types::Credentials::new(
            creds.access_key_id.clone(),
            creds.secret_access_key.clone(),
            Some(creds.session_token.clone()),
            None,
            "cross-account-assume-role",
        ));
    }
    loader.load().await
}

/// Error codes the provider uses to signal rate limiting.
const THROTTLING_CODES: [&str; 4] = [
    "Throttling",
    "ThrottlingException",
    "TooManyRequestsException",
    "RequestLimitExceeded",
];

/// Maps an SDK error into the pipeline taxonomy, distinguishing rate-limit
/// signals (retried with backoff) from everything else (fatal for the scope).
pub(crate) fn api_error<E, R>(service: &'static str, err: SdkError<E, R>) -> InventoryError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug + Send + Sync + 'static,
{
    if let Some(code) = err.code() {
        if THROTTLING_CODES.contains(&code) {
            return InventoryError::Throttled { service };
        }
    }
    InventoryError::Api {
        service,
        message: format!("{}", DisplayErrorContext(&err)),
    }
}
