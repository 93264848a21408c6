// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Function listing and enrichment calls.
//!
//! Listing runs under an [`AccountScope`] (any region, optionally assumed
//! credentials); the enrichment calls always run with ambient credentials in
//! the runtime region, because the generator never assumes roles.

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_lambda::types::FunctionConfiguration;

use super::AccountScope;
use crate::error::{InventoryError, Result};
use crate::model::{FunctionSummary, Tag};

/// The listing API's maximum page size; each page becomes one batch.
pub const LIST_PAGE_SIZE: i32 = 50;

/// One page of enumerated functions plus the cursor for the next one.
#[derive(Debug, Clone)]
pub struct FunctionPage {
    pub functions: Vec<FunctionSummary>,
    pub next: Option<String>,
}

/// Full configuration of a single function version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionVersionDetail {
    pub function_arn: String,
    pub function_name: String,
    /// `$LATEST` or a numeric version, as returned by the provider.
    pub version: String,
    pub memory_size: Option<i64>,
    pub architectures: Vec<String>,
    pub runtime: Option<String>,
    pub code_size: i64,
    pub handler: Option<String>,
    pub ephemeral_storage_size: Option<i64>,
    pub timeout: Option<i64>,
    pub role: Option<String>,
    pub layers: Vec<LayerRef>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerRef {
    pub arn: String,
    pub code_size: i64,
}

/// Result of a function describe call: the `$LATEST` configuration plus the
/// function-level state the listing does not carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDetail {
    pub latest: FunctionVersionDetail,
    pub last_update_status: Option<String>,
    /// Normalized from the provider's tag map, ordered by key so repeated
    /// enrichment passes build identical attribute lists.
    pub tags: Vec<Tag>,
    pub reserved_concurrency: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionAlias {
    pub alias_arn: String,
    pub name: String,
    pub function_version: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventSourceMapping {
    pub event_source_arn: Option<String>,
}

#[async_trait]
pub trait FunctionsApi: Send + Sync {
    /// Fetches one listing page. `cursor` is the provider's page token.
    async fn list_page(&self, scope: &AccountScope, cursor: Option<String>)
        -> Result<FunctionPage>;

    async fn get_function(&self, function_name: &str) -> Result<FunctionDetail>;

    async fn list_aliases(&self, function_name: &str) -> Result<Vec<FunctionAlias>>;

    /// Versions in provider order (newest first); retention logic relies on
    /// that ordering and never re-sorts.
    async fn list_versions(&self, function_name: &str) -> Result<Vec<FunctionVersionDetail>>;

    async fn event_source_mappings(&self, function_name: &str) -> Result<Vec<EventSourceMapping>>;

    /// The attached resource policy. A function without one is an expected
    /// outcome and returns `None`.
    async fn policy(&self, function_name: &str) -> Result<Option<String>>;
}

pub struct AwsFunctionsApi {
    ambient: aws_sdk_lambda::Client,
}

impl AwsFunctionsApi {
    #[must_use]
    pub fn new(config: &SdkConfig) -> Self {
        AwsFunctionsApi {
            ambient: aws_sdk_lambda::Client::new(config),
        }
    }

    async fn scoped_client(&self, scope: &AccountScope) -> aws_sdk_lambda::Client {
        let config = super::sdk_config(&scope.region, scope.credentials.as_ref()).await;
        aws_sdk_lambda::Client::new(&config)
    }
}

fn summary_from(fc: &FunctionConfiguration) -> Option<FunctionSummary> {
    Some(FunctionSummary {
        function_arn: fc.function_arn()?.to_string(),
        function_name: fc.function_name()?.to_string(),
    })
}

fn version_from(fc: &FunctionConfiguration) -> Option<FunctionVersionDetail> {
    Some(FunctionVersionDetail {
        function_arn: fc.function_arn()?.to_string(),
        function_name: fc.function_name()?.to_string(),
        version: fc.version().unwrap_or("$LATEST").to_string(),
        memory_size: fc.memory_size().map(i64::from),
        architectures: fc
            .architectures()
            .iter()
            .map(|a| a.as_str().to_string())
            .collect(),
        runtime: fc.runtime().map(|r| r.as_str().to_string()),
        code_size: fc.code_size(),
        handler: fc.handler().map(str::to_string),
        ephemeral_storage_size: fc.ephemeral_storage().map(|s| i64::from(s.size())),
        timeout: fc.timeout().map(i64::from),
        role: fc.role().map(str::to_string),
        layers: fc
            .layers()
            .iter()
            .filter_map(|l| {
                Some(LayerRef {
                    arn: l.arn()?.to_string(),
                    code_size: l.code_size(),
                })
            })
            .collect(),
    })
}

#[async_trait]
impl FunctionsApi for AwsFunctionsApi {
    async fn list_page(
        &self,
        scope: &AccountScope,
        cursor: Option<String>,
    ) -> Result<FunctionPage> {
        let client = self.scoped_client(scope).await;
        let mut request = client.list_functions().max_items(LIST_PAGE_SIZE);
        if let Some(marker) = cursor {
            request = request.marker(marker);
        }
        let output = request
            .send()
            .await
            .map_err(|e| super::api_error("lambda", e))?;

        Ok(FunctionPage {
            functions: output.functions().iter().filter_map(summary_from).collect(),
            next: output.next_marker().map(str::to_string),
        })
    }

    async fn get_function(&self, function_name: &str) -> Result<FunctionDetail> {
        let output = self
            .ambient
            .get_function()
            .function_name(function_name)
            .send()
            .await
            .map_err(|e| super::api_error("lambda", e))?;

        let configuration = output.configuration().ok_or_else(|| InventoryError::Api {
            service: "lambda",
            message: format!("describe of {function_name} returned no configuration"),
        })?;
        let latest = version_from(configuration).ok_or_else(|| InventoryError::Api {
            service: "lambda",
            message: format!("describe of {function_name} returned no ARN"),
        })?;

        let mut tags: Vec<Tag> = output
            .tags()
            .map(|tags| tags.iter().map(|(k, v)| Tag::new(k, v)).collect())
            .unwrap_or_default();
        tags.sort_by(|a, b| a.key.cmp(&b.key));

        Ok(FunctionDetail {
            latest,
            last_update_status: configuration
                .last_update_status()
                .map(|s| s.as_str().to_string()),
            tags,
            reserved_concurrency: output
                .concurrency()
                .and_then(|c| c.reserved_concurrent_executions())
                .map(i64::from),
        })
    }

    async fn list_aliases(&self, function_name: &str) -> Result<Vec<FunctionAlias>> {
        let output = self
            .ambient
            .list_aliases()
            .function_name(function_name)
            .send()
            .await
            .map_err(|e| super::api_error("lambda", e))?;

        Ok(output
            .aliases()
            .iter()
            .filter_map(|a| {
                Some(FunctionAlias {
                    alias_arn: a.alias_arn()?.to_string(),
                    name: a.name()?.to_string(),
                    function_version: a.function_version()?.to_string(),
                })
            })
            .collect())
    }

    async fn list_versions(&self, function_name: &str) -> Result<Vec<FunctionVersionDetail>> {
        let output = self
            .ambient
            .list_versions_by_function()
            .function_name(function_name)
            .send()
            .await
            .map_err(|e| super::api_error("lambda", e))?;

        Ok(output.versions().iter().filter_map(version_from).collect())
    }

    async fn event_source_mappings(&self, function_name: &str) -> Result<Vec<EventSourceMapping>> {
        let output = self
            .ambient
            .list_event_source_mappings()
            .function_name(function_name)
            .send()
            .await
            .map_err(|e| super::api_error("lambda", e))?;

        Ok(output
            .event_source_mappings()
            .iter()
            .map(|m| EventSourceMapping {
                event_source_arn: m.event_source_arn().map(str::to_string),
            })
            .collect())
    }

    async fn policy(&self, function_name: &str) -> Result<Option<String>> {
        match self
            .ambient
            .get_policy()
            .function_name(function_name)
            .send()
            .await
        {
            Ok(output) => Ok(output.policy().map(str::to_string)),
            Err(err) => {
                // No attached policy is an expected outcome, not an error.
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_resource_not_found_exception())
                {
                    Ok(None)
                } else {
                    Err(super::api_error("lambda", err))
                }
            }
        }
    }
}
