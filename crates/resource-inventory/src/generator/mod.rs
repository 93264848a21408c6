// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Generation: consume a batch, enrich every resource in it, and submit the
//! attributed records to the metadata backend.
//!
//! The generator is stateless across invocations and idempotent with respect
//! to the backend: reprocessing a redelivered batch only refreshes record
//! TTLs. Per-resource enrichment failures drop the resource and continue; a
//! batch where every enrichment fails errors out instead, because that
//! pattern means something systemic (wrong credentials, missing permissions),
//! not a handful of deleted resources.

mod function;
mod instance;

pub use function::select_versions;

use std::sync::Arc;

use tracing::info;

use crate::aws::ec2::InstancesApi;
use crate::aws::lambda::FunctionsApi;
use crate::aws::tagging::TaggingApi;
use crate::config::InventoryConfig;
use crate::error::{InventoryError, Result};
use crate::intake::MetadataSink;
use crate::model::{
    BatchOrigin, BatchResources, CollectorKind, FunctionSummary, ResourceBatch, ResourceTtl,
};
use crate::throttle::Throttle;

/// In-flight ceiling for enrichment calls. The rate throttle is the primary
/// guard and should trigger first.
const MAX_IN_FLIGHT: usize = 10;

/// Counts reported by one processed batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationSummary {
    pub generated: usize,
    pub submitted: bool,
}

pub struct Generator {
    config: Arc<InventoryConfig>,
    functions: Arc<dyn FunctionsApi>,
    instances: Arc<dyn InstancesApi>,
    tagging: Arc<dyn TaggingApi>,
    sink: Arc<dyn MetadataSink>,
    function_throttle: Throttle,
    version_throttle: Throttle,
}

impl Generator {
    #[must_use]
    pub fn new(
        config: Arc<InventoryConfig>,
        functions: Arc<dyn FunctionsApi>,
        instances: Arc<dyn InstancesApi>,
        tagging: Arc<dyn TaggingApi>,
        sink: Arc<dyn MetadataSink>,
    ) -> Self {
        // Function enrichment issues two classes of calls per resource (the
        // function pass and the version pass), so the shared budget is split
        // between them.
        let per_pass = config.api_rate_limit / 2;
        Generator {
            config,
            functions,
            instances,
            tagging,
            sink,
            function_throttle: Throttle::new(per_pass, MAX_IN_FLIGHT),
            version_throttle: Throttle::new(per_pass, MAX_IN_FLIGHT),
        }
    }

    pub(crate) fn ttl(&self) -> ResourceTtl {
        ResourceTtl::from_minutes(self.config.resource_ttl_minutes)
    }

    /// Processes one batch end to end. An empty enrichment result skips the
    /// submission call entirely.
    pub async fn process_batch(
        &self,
        collector_id: &str,
        batch: &ResourceBatch,
    ) -> Result<GenerationSummary> {
        let origin: BatchOrigin = batch.source.parse()?;
        info!(
            "Collector {collector_id} processing {} batch from {}/{}",
            batch.source, batch.account, batch.region
        );

        let records = match origin.kind() {
            CollectorKind::Lambda => {
                let candidates = function_candidates(batch)?;
                self.generate_function_resources(candidates).await?
            }
            CollectorKind::Ec2 => {
                let snapshots = match &batch.resources {
                    BatchResources::Instances(snapshots) => snapshots.clone(),
                    // Aggregator-sourced identities carry no attributes;
                    // re-describe them in bulk in the batch's region.
                    BatchResources::Identities(identities) => {
                        let ids: Vec<String> = identities
                            .iter()
                            .map(|identity| identity.resource_id.clone())
                            .collect();
                        self.instances.describe_by_ids(&batch.region, &ids).await?
                    }
                    BatchResources::Functions(f) if f.is_empty() => Vec::new(),
                    BatchResources::Functions(_) => {
                        return Err(InventoryError::UnsupportedSource(format!(
                            "{} carries a function payload",
                            batch.source
                        )))
                    }
                };
                instance::generate_instance_resources(
                    &batch.region,
                    &batch.account,
                    &snapshots,
                    self.ttl(),
                )
            }
        };

        if records.is_empty() {
            info!("No resources generated for this batch; skipping submission");
            return Ok(GenerationSummary {
                generated: 0,
                submitted: false,
            });
        }

        self.sink.submit(collector_id, &records).await?;
        info!("Submitted {} resources", records.len());
        Ok(GenerationSummary {
            generated: records.len(),
            submitted: true,
        })
    }
}

fn function_candidates(batch: &ResourceBatch) -> Result<Vec<FunctionSummary>> {
    match &batch.resources {
        BatchResources::Functions(functions) => Ok(functions.clone()),
        // Tolerate identity payloads: the ARN carries the name.
        BatchResources::Identities(identities) => Ok(identities
            .iter()
            .filter_map(|identity| {
                let parsed = crate::arn::parse_function_arn(&identity.arn)?;
                Some(FunctionSummary {
                    function_arn: identity.arn.clone(),
                    function_name: parsed.function_name,
                })
            })
            .collect()),
        BatchResources::Instances(i) if i.is_empty() => Ok(Vec::new()),
        BatchResources::Instances(_) => Err(InventoryError::UnsupportedSource(format!(
            "{} carries an instance payload",
            batch.source
        ))),
    }
}
