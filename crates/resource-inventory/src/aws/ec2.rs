// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Instance listing and bulk re-describe.

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_ec2::types::Instance;

use super::AccountScope;
use crate::error::Result;
use crate::model::{InstanceSnapshot, Placement, Tag};

/// One page of described instances, flattened across reservations.
#[derive(Debug, Clone)]
pub struct InstancePage {
    pub instances: Vec<InstanceSnapshot>,
    pub next: Option<String>,
}

#[async_trait]
pub trait InstancesApi: Send + Sync {
    /// Fetches one describe page under the given scope.
    async fn describe_page(
        &self,
        scope: &AccountScope,
        cursor: Option<String>,
    ) -> Result<InstancePage>;

    /// Re-describes instances in bulk by id. Used for aggregator-sourced
    /// identities, which carry no attributes of their own.
    async fn describe_by_ids(&self, region: &str, ids: &[String]) -> Result<Vec<InstanceSnapshot>>;
}

pub struct AwsInstancesApi;

impl AwsInstancesApi {
    #[must_use]
    pub fn new(_config: &SdkConfig) -> Self {
        AwsInstancesApi
    }

    async fn scoped_client(&self, scope: &AccountScope) -> aws_sdk_ec2::Client {
        let config = super::sdk_config(&scope.region, scope.credentials.as_ref()).await;
        aws_sdk_ec2::Client::new(&config)
    }
}

fn snapshot_from(instance: &Instance) -> Option<InstanceSnapshot> {
    let mut tags: Vec<Tag> = instance
        .tags()
        .iter()
        .filter_map(|t| Some(Tag::new(t.key()?, t.value()?)))
        .collect();
    tags.sort_by(|a, b| a.key.cmp(&b.key));

    Some(InstanceSnapshot {
        instance_id: instance.instance_id()?.to_string(),
        instance_type: instance.instance_type().map(|t| t.as_str().to_string()),
        image_id: instance.image_id().map(str::to_string),
        placement: instance.placement().map(|p| Placement {
            availability_zone: p.availability_zone().map(str::to_string),
        }),
        tags,
    })
}

#[async_trait]
impl InstancesApi for AwsInstancesApi {
    async fn describe_page(
        &self,
        scope: &AccountScope,
        cursor: Option<String>,
    ) -> Result<InstancePage> {
        let client = self.scoped_client(scope).await;
        let mut request = client.describe_instances();
        if let Some(token) = cursor {
            request = request.next_token(token);
        }
        let output = request
            .send()
            .await
            .map_err(|e| super::api_error("ec2", e))?;

        let instances = output
            .reservations()
            .iter()
            .flat_map(|r| r.instances())
            .filter_map(snapshot_from)
            .collect();

        Ok(InstancePage {
            instances,
            next: output.next_token().map(str::to_string),
        })
    }

    async fn describe_by_ids(&self, region: &str, ids: &[String]) -> Result<Vec<InstanceSnapshot>> {
        let scope = AccountScope::current(region, "");
        let client = self.scoped_client(&scope).await;

        let mut instances = Vec::with_capacity(ids.len());
        let mut cursor: Option<String> = None;
        loop {
            let mut request = client.describe_instances().set_instance_ids(Some(ids.to_vec()));
            if let Some(token) = cursor {
                request = request.next_token(token);
            }
            let output = request
                .send()
                .await
                .map_err(|e| super::api_error("ec2", e))?;

            instances.extend(
                output
                    .reservations()
                    .iter()
                    .flat_map(|r| r.instances())
                    .filter_map(snapshot_from),
            );

            cursor = output.next_token().map(str::to_string);
            if cursor.is_none() {
                break;
            }
        }
        Ok(instances)
    }
}
