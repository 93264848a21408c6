// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Function enrichment and attributed-resource construction.
//!
//! Per candidate function: one describe call, an optional alias listing, and
//! an optional version listing. Retained versions then get an event-source
//! lookup and a policy lookup each. The provider returns version lists newest
//! first; retention relies on that ordering and never re-sorts.

use std::collections::HashSet;

use futures::stream::{self, StreamExt};
use tracing::{debug, error, info, warn};

use super::{Generator, MAX_IN_FLIGHT};
use crate::arn::{self, parse_function_arn, FunctionArn};
use crate::aws::lambda::{EventSourceMapping, FunctionAlias, FunctionDetail, FunctionVersionDetail};
use crate::aws::AccountScope;
use crate::error::{InventoryError, Result};
use crate::model::{
    int_attr, string_attr, AttributedResource, CollectorKind, FunctionSummary, ResourceKind,
    ResourceTtl, SCHEMA_URL,
};

struct FunctionEnrichment {
    function_resource: AttributedResource,
    alias_resources: Vec<AttributedResource>,
    versions_to_collect: Vec<FunctionVersionDetail>,
}

impl Generator {
    pub(crate) async fn generate_function_resources(
        &self,
        candidates: Vec<FunctionSummary>,
    ) -> Result<Vec<AttributedResource>> {
        // The same filters apply here as in the collector, because direct
        // invocations and CloudTrail events bypass the collection stage.
        let scope = AccountScope::current(
            self.config.current_region.clone().unwrap_or_default(),
            String::new(),
        );
        let candidates = self
            .config
            .function_filters
            .apply(
                candidates,
                |f| f.function_arn.as_str(),
                self.tagging.as_ref(),
                CollectorKind::Lambda,
                &scope,
            )
            .await?;
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        info!("Generating function details for {} candidates", candidates.len());
        let total = candidates.len();
        let enriched: Vec<Option<FunctionEnrichment>> =
            stream::iter(candidates.into_iter().enumerate())
                .map(|(index, summary)| self.enrich_function(index, total, summary))
                .buffered(MAX_IN_FLIGHT)
                .collect()
                .await;
        let enriched: Vec<FunctionEnrichment> = enriched.into_iter().flatten().collect();

        if enriched.is_empty() {
            error!("Failed to generate metadata of any function in the batch");
            return Err(InventoryError::AllEnrichmentFailed);
        }

        let versions_to_collect: Vec<FunctionVersionDetail> = enriched
            .iter()
            .flat_map(|e| e.versions_to_collect.clone())
            .collect();

        info!(
            "Generating version details for {} function versions",
            versions_to_collect.len()
        );
        let version_resources: Vec<AttributedResource> = stream::iter(versions_to_collect)
            .map(|version| self.enrich_version(version))
            .buffered(MAX_IN_FLIGHT)
            .collect()
            .await;

        let mut resources: Vec<AttributedResource> = Vec::new();
        let function_count = enriched.len();
        let alias_count: usize = enriched.iter().map(|e| e.alias_resources.len()).sum();
        for enrichment in &enriched {
            resources.push(enrichment.function_resource.clone());
        }
        let version_count = version_resources.len();
        resources.extend(version_resources);
        for enrichment in enriched {
            resources.extend(enrichment.alias_resources);
        }

        info!(
            "Generated {function_count} functions, {version_count} function versions and \
             {alias_count} aliases"
        );
        Ok(resources)
    }

    async fn enrich_function(
        &self,
        index: usize,
        total: usize,
        summary: FunctionSummary,
    ) -> Option<FunctionEnrichment> {
        let _permit = self.function_throttle.acquire().await;
        match self.try_enrich_function(&summary).await {
            Ok(enrichment) => {
                debug!(
                    "Function ({}/{total}): {}",
                    index + 1,
                    summary.function_name
                );
                Some(enrichment)
            }
            Err(e) => {
                warn!(
                    "Failed to generate metadata of {}: {e}",
                    summary.function_name
                );
                None
            }
        }
    }

    async fn try_enrich_function(&self, summary: &FunctionSummary) -> Result<FunctionEnrichment> {
        let detail = self.functions.get_function(&summary.function_name).await?;

        let aliases = if self.config.collect_aliases {
            self.functions.list_aliases(&summary.function_name).await?
        } else {
            Vec::new()
        };

        let versions_to_collect = if self.config.latest_versions_per_function > 0 {
            let versions = self.functions.list_versions(&summary.function_name).await?;
            select_versions(
                versions,
                &aliases,
                self.config.latest_versions_per_function,
            )
        } else {
            // No published versions requested: collect $LATEST only, which
            // the describe call already returned.
            vec![detail.latest.clone()]
        };

        Ok(FunctionEnrichment {
            function_resource: make_function_resource(&detail, self.ttl()),
            alias_resources: aliases
                .iter()
                .map(|alias| make_alias_resource(&summary.function_name, alias, self.ttl()))
                .collect(),
            versions_to_collect,
        })
    }

    async fn enrich_version(&self, version: FunctionVersionDetail) -> AttributedResource {
        let _permit = self.version_throttle.acquire().await;

        let request_name = if version.version == "$LATEST" {
            version.function_name.clone()
        } else {
            format!("{}:{}", version.function_name, version.version)
        };

        // Neither lookup is load-bearing for the version record itself:
        // failures degrade to a record without the corresponding attributes.
        let mappings = match self.functions.event_source_mappings(&request_name).await {
            Ok(mappings) => mappings,
            Err(e) => {
                warn!("Failed to list event source mappings of {request_name}: {e}");
                Vec::new()
            }
        };
        let policy = match self.functions.policy(&request_name).await {
            Ok(policy) => policy,
            Err(e) => {
                warn!("Failed to fetch the resource policy of {request_name}: {e}");
                None
            }
        };

        make_function_version_resource(&version, &mappings, policy.as_deref(), self.ttl())
    }
}

/// Retains the `latest` most recent versions (the list is newest first) plus
/// any version referenced by an alias, deduplicated, preserving order.
#[must_use]
pub fn select_versions(
    versions: Vec<FunctionVersionDetail>,
    aliases: &[FunctionAlias],
    latest: usize,
) -> Vec<FunctionVersionDetail> {
    let alias_versions: HashSet<&str> = aliases
        .iter()
        .map(|alias| alias.function_version.as_str())
        .collect();

    let mut seen = HashSet::new();
    versions
        .into_iter()
        .enumerate()
        .filter(|(index, version)| {
            *index < latest || alias_versions.contains(version.version.as_str())
        })
        .map(|(_, version)| version)
        .filter(|version| seen.insert(version.version.clone()))
        .collect()
}

fn parsed_or_fallback(function_arn: &str, function_name: &str) -> FunctionArn {
    parse_function_arn(function_arn).unwrap_or_else(|| FunctionArn {
        region: String::new(),
        account_id: String::new(),
        function_name: function_name.to_string(),
        version: None,
    })
}

fn make_function_resource(detail: &FunctionDetail, ttl: ResourceTtl) -> AttributedResource {
    let function_arn = &detail.latest.function_arn;
    let parsed = parsed_or_fallback(function_arn, &detail.latest.function_name);

    let mut attributes = vec![
        string_attr("cloud.provider", "aws"),
        string_attr("cloud.platform", "aws_lambda"),
        string_attr("cloud.account.id", &parsed.account_id),
        string_attr("cloud.region", &parsed.region),
        string_attr("cloud.resource_id", function_arn),
        string_attr("faas.name", &parsed.function_name),
    ];
    if let Some(status) = &detail.last_update_status {
        attributes.push(string_attr("lambda.last_update_status", status));
    }
    for tag in &detail.tags {
        attributes.push(string_attr(format!("cloud.tag.{}", tag.key), &tag.value));
    }
    if let Some(reserved) = detail.reserved_concurrency {
        attributes.push(int_attr("lambda.reserved_concurrency", reserved));
    }

    AttributedResource {
        resource_id: function_arn.clone(),
        resource_type: ResourceKind::Function,
        attributes,
        schema_url: SCHEMA_URL.to_string(),
        resource_ttl: ttl,
    }
}

fn make_function_version_resource(
    version: &FunctionVersionDetail,
    mappings: &[EventSourceMapping],
    policy: Option<&str>,
    ttl: ResourceTtl,
) -> AttributedResource {
    let parsed = parsed_or_fallback(&version.function_arn, &version.function_name);
    let function_arn = arn::function_arn(&parsed.region, &parsed.account_id, &parsed.function_name);
    let resource_id = arn::function_version_arn(
        &parsed.region,
        &parsed.account_id,
        &parsed.function_name,
        &version.version,
    );

    let mut attributes = vec![
        string_attr("cloud.provider", "aws"),
        string_attr("cloud.platform", "aws_lambda"),
        string_attr("cloud.account.id", &parsed.account_id),
        string_attr("cloud.region", &parsed.region),
        string_attr("cloud.resource_id", &resource_id),
        string_attr("faas.name", &parsed.function_name),
        string_attr("faas.version", &version.version),
    ];
    if let Some(memory) = version.memory_size {
        attributes.push(int_attr("faas.max_memory", memory));
    }
    attributes.push(string_attr(
        "host.arch",
        extract_architecture(&version.architectures),
    ));
    if let Some(runtime) = &version.runtime {
        attributes.push(string_attr("lambda.runtime.name", runtime));
    }
    attributes.push(int_attr("lambda.code_size", version.code_size));
    if let Some(handler) = &version.handler {
        attributes.push(string_attr("lambda.handler", handler));
    }
    if let Some(size) = version.ephemeral_storage_size {
        attributes.push(string_attr("lambda.ephemeral_storage.size", size.to_string()));
    }
    if let Some(timeout) = version.timeout {
        attributes.push(int_attr("lambda.timeout", timeout));
    }
    if let Some(role) = &version.role {
        attributes.push(string_attr("lambda.iam_role", role));
    }
    attributes.push(string_attr("lambda.function_arn", &function_arn));

    for (index, layer) in version.layers.iter().enumerate() {
        attributes.push(string_attr(format!("lambda.layer.{index}.arn"), &layer.arn));
        attributes.push(string_attr(
            format!("lambda.layer.{index}.code_size"),
            layer.code_size.to_string(),
        ));
    }
    for (index, mapping) in mappings.iter().enumerate() {
        if let Some(source_arn) = &mapping.event_source_arn {
            attributes.push(string_attr(
                format!("lambda.event_source.{index}.arn"),
                source_arn,
            ));
        }
    }
    if let Some(policy) = policy {
        attributes.push(string_attr("lambda.policy", policy));
    }

    AttributedResource {
        resource_id,
        resource_type: ResourceKind::FunctionVersion,
        attributes,
        schema_url: SCHEMA_URL.to_string(),
        resource_ttl: ttl,
    }
}

fn make_alias_resource(
    function_name: &str,
    alias: &FunctionAlias,
    ttl: ResourceTtl,
) -> AttributedResource {
    AttributedResource {
        resource_id: alias.alias_arn.clone(),
        resource_type: ResourceKind::FunctionAlias,
        attributes: vec![
            string_attr("cloud.resource_id", &alias.alias_arn),
            string_attr("faas.name", function_name),
            string_attr("lambda.alias.name", &alias.name),
            string_attr("faas.version", &alias.function_version),
        ],
        schema_url: SCHEMA_URL.to_string(),
        resource_ttl: ttl,
    }
}

fn extract_architecture(architectures: &[String]) -> &'static str {
    match architectures.first().map(String::as_str) {
        Some("x86_64") => "amd64",
        Some("arm64") => "arm64",
        _ => "",
    }
}
