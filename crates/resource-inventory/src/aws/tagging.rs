// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Tag-based resource lookup, used to resolve tag filters into the set of
//! matching ARNs.

use std::collections::HashSet;

use async_trait::async_trait;
use aws_config::SdkConfig;

use super::AccountScope;
use crate::error::Result;
use crate::filter::TagFilter;
use crate::model::CollectorKind;

#[async_trait]
pub trait TaggingApi: Send + Sync {
    /// Returns the ARNs of all resources of `kind` matching every given tag
    /// filter, for intersection with an enumerated candidate set.
    async fn resources_matching(
        &self,
        scope: &AccountScope,
        kind: CollectorKind,
        filters: &[TagFilter],
    ) -> Result<HashSet<String>>;
}

pub struct AwsTaggingApi;

impl AwsTaggingApi {
    #[must_use]
    pub fn new(_config: &SdkConfig) -> Self {
        AwsTaggingApi
    }
}

#[async_trait]
impl TaggingApi for AwsTaggingApi {
    async fn resources_matching(
        &self,
        scope: &AccountScope,
        kind: CollectorKind,
        filters: &[TagFilter],
    ) -> Result<HashSet<String>> {
        let config = super::sdk_config(&scope.region, scope.credentials.as_ref()).await;
        let client = aws_sdk_resourcegroupstaggingapi::Client::new(&config);

        let sdk_filters: Vec<aws_sdk_resourcegroupstaggingapi::types::TagFilter> = filters
            .iter()
            .map(|f| {
                aws_sdk_resourcegroupstaggingapi::types::TagFilter::builder()
                    .key(&f.key)
                    .set_values(Some(f.values.clone()))
                    .build()
            })
            .collect();

        let mut arns = HashSet::new();
        let mut cursor: Option<String> = None;
        loop {
            let mut request = client
                .get_resources()
                .resource_type_filters(kind.tagging_filter())
                .set_tag_filters(Some(sdk_filters.clone()));
            if let Some(token) = cursor {
                request = request.pagination_token(token);
            }
            let output = request
                .send()
                .await
                .map_err(|e| super::api_error("tagging", e))?;

            arns.extend(
                output
                    .resource_tag_mapping_list()
                    .iter()
                    .filter_map(|m| m.resource_arn())
                    .map(str::to_string),
            );

            // The tagging API signals the last page with an empty token.
            cursor = output
                .pagination_token()
                .filter(|t| !t.is_empty())
                .map(str::to_string);
            if cursor.is_none() {
                break;
            }
        }
        Ok(arns)
    }
}
