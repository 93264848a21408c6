// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Configuration aggregator queries.
//!
//! The aggregator pre-indexes resources across every account and region it
//! aggregates, so one query per resource kind replaces per-account role
//! assumption. Rows carry identity fields only; the generator re-describes
//! them.

use async_trait::async_trait;
use aws_config::SdkConfig;
use serde::Deserialize;

use crate::error::{InventoryError, Result};
use crate::model::{CollectorKind, ResourceIdentity, ResourceKind};

/// Query page size, also used as the batch chunk boundary for
/// aggregator-sourced identities.
pub const AGGREGATOR_PAGE_SIZE: i32 = 50;

#[async_trait]
pub trait AggregatorApi: Send + Sync {
    /// Runs the aggregator select for one resource kind and returns every
    /// identity it knows, across all aggregated accounts and regions.
    async fn select_identities(
        &self,
        aggregator_name: &str,
        kind: CollectorKind,
    ) -> Result<Vec<ResourceIdentity>>;
}

/// One aggregator result row, as returned by the select expression.
#[derive(Debug, Deserialize)]
struct AggregatorRow {
    arn: String,
    #[serde(rename = "resourceId")]
    resource_id: String,
    #[serde(rename = "awsRegion")]
    region: String,
    #[serde(rename = "accountId")]
    account_id: String,
}

pub struct AwsAggregatorApi {
    client: aws_sdk_config::Client,
}

impl AwsAggregatorApi {
    #[must_use]
    pub fn new(config: &SdkConfig) -> Self {
        AwsAggregatorApi {
            client: aws_sdk_config::Client::new(config),
        }
    }
}

#[async_trait]
impl AggregatorApi for AwsAggregatorApi {
    async fn select_identities(
        &self,
        aggregator_name: &str,
        kind: CollectorKind,
    ) -> Result<Vec<ResourceIdentity>> {
        let expression = format!(
            "SELECT arn, resourceId, awsRegion, accountId WHERE resourceType = '{}'",
            kind.aggregator_resource_type()
        );
        let record_kind = match kind {
            CollectorKind::Lambda => ResourceKind::Function,
            CollectorKind::Ec2 => ResourceKind::Instance,
        };

        let mut identities = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let mut request = self
                .client
                .select_aggregate_resource_config()
                .expression(&expression)
                .configuration_aggregator_name(aggregator_name)
                .limit(AGGREGATOR_PAGE_SIZE);
            if let Some(token) = cursor {
                request = request.next_token(token);
            }
            let output = request
                .send()
                .await
                .map_err(|e| super::api_error("config", e))?;

            for result in output.results() {
                let row: AggregatorRow =
                    serde_json::from_str(result).map_err(|e| InventoryError::Api {
                        service: "config",
                        message: format!("aggregator returned an unparseable row: {e}"),
                    })?;
                identities.push(ResourceIdentity {
                    kind: record_kind,
                    arn: row.arn,
                    resource_id: row.resource_id,
                    region: row.region,
                    account_id: row.account_id,
                });
            }

            cursor = output.next_token().map(str::to_string);
            if cursor.is_none() {
                break;
            }
        }
        Ok(identities)
    }
}
