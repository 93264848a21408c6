// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Collection orchestration.
//!
//! One run enumerates every configured region and resource kind in the
//! current account, fans out to other accounts according to the cross-account
//! mode, and only then publishes the materialized batches to the queue.
//! Publishing waits until all enumeration is finished: if batches went out
//! incrementally, the generator's enrichment calls would start competing for
//! the provider's API rate while the collector is still making its own
//! listing calls.
//!
//! Cross-account failures degrade rather than abort: a role that cannot be
//! assumed is skipped with a warning, and an aggregator failure falls back to
//! static role assumption when roles are configured, or to the current
//! account only.

mod pages;

pub use pages::{FunctionPages, InstancePages};

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::arn::parse_function_arn;
use crate::aws::config_agg::{AggregatorApi, AGGREGATOR_PAGE_SIZE};
use crate::aws::ec2::InstancesApi;
use crate::aws::lambda::FunctionsApi;
use crate::aws::sqs::BatchQueue;
use crate::aws::sts::IdentityApi;
use crate::aws::tagging::TaggingApi;
use crate::aws::AccountScope;
use crate::batch::chunk;
use crate::config::InventoryConfig;
use crate::error::{InventoryError, Result};
use crate::model::{
    BatchOrigin, BatchResources, CollectionMode, CollectorKind, CrossAccountMode, FunctionSummary,
    ResourceBatch, ResourceIdentity,
};

/// Counts reported by one collection run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionSummary {
    pub batches: usize,
    pub resources: usize,
}

pub struct Collector {
    pub config: Arc<InventoryConfig>,
    pub functions: Arc<dyn FunctionsApi>,
    pub instances: Arc<dyn InstancesApi>,
    pub identity: Arc<dyn IdentityApi>,
    pub tagging: Arc<dyn TaggingApi>,
    pub aggregator: Arc<dyn AggregatorApi>,
    pub queue: Arc<dyn BatchQueue>,
}

impl Collector {
    /// Runs one collection: enumerate everything, then publish every batch.
    /// A publish failure is fatal to the run; the queue's redelivery handles
    /// the consuming side.
    pub async fn run(&self) -> Result<CollectionSummary> {
        let account_id = self.identity.account_id(None).await?;
        info!("Starting a one-time collection of resources for account {account_id}");

        let mut batches: Vec<ResourceBatch> = Vec::new();

        let mut jobs = Vec::new();
        for region in &self.config.regions {
            for kind in self.enabled_kinds() {
                let scope = AccountScope::current(region.clone(), account_id.clone());
                jobs.push(async move { self.collect_scope(scope, kind).await });
            }
        }
        for result in join_all(jobs).await {
            batches.extend(result?);
        }

        match self.config.cross_account_mode {
            CrossAccountMode::Disabled => {}
            CrossAccountMode::StaticIam => {
                batches.extend(self.collect_static_iam().await);
            }
            CrossAccountMode::Config => match self.collect_via_aggregator().await {
                Ok(found) => batches.extend(found),
                Err(e) => {
                    if self.config.cross_account_role_arns.is_empty() {
                        warn!(
                            "Aggregator collection failed ({e}); continuing with the current \
                             account only"
                        );
                    } else {
                        warn!(
                            "Aggregator collection failed ({e}); falling back to static role \
                             assumption"
                        );
                        batches.extend(self.collect_static_iam().await);
                    }
                }
            },
        }

        let resources = batches.iter().map(|b| b.resources.len()).sum();
        for batch in &batches {
            self.queue.publish(batch).await?;
            info!(
                "Published {} batch for {}/{}",
                batch.source, batch.account, batch.region
            );
        }

        let summary = CollectionSummary {
            batches: batches.len(),
            resources,
        };
        info!(
            "Collection done: {} batches, {} resources",
            summary.batches, summary.resources
        );
        Ok(summary)
    }

    fn enabled_kinds(&self) -> Vec<CollectorKind> {
        let mut kinds = Vec::new();
        if !self.config.exclude_ec2 {
            kinds.push(CollectorKind::Ec2);
        }
        if !self.config.exclude_lambda {
            kinds.push(CollectorKind::Lambda);
        }
        kinds
    }

    async fn collect_scope(
        &self,
        scope: AccountScope,
        kind: CollectorKind,
    ) -> Result<Vec<ResourceBatch>> {
        match kind {
            CollectorKind::Lambda => self.collect_functions(scope).await,
            CollectorKind::Ec2 => self.collect_instances(scope).await,
        }
    }

    async fn collect_functions(&self, scope: AccountScope) -> Result<Vec<ResourceBatch>> {
        info!("Collecting functions in {}", scope.region);
        let filters = &self.config.function_filters;

        // Resolve the tag filter once per scope, then intersect every page.
        let tag_matches = if filters.has_tag_filters() {
            Some(
                self.tagging
                    .resources_matching(&scope, CollectorKind::Lambda, filters.tag_filters())
                    .await?,
            )
        } else {
            None
        };

        let mut batches = Vec::new();
        let mut pages = FunctionPages::new(self.functions.as_ref(), &scope);
        while let Some(page) = pages.next_page().await? {
            let mut functions: Vec<FunctionSummary> = page
                .into_iter()
                .filter(|f| filters.matches_arn(&f.function_arn))
                .collect();
            if let Some(matches) = &tag_matches {
                functions.retain(|f| matches.contains(&f.function_arn));
            }
            if functions.is_empty() {
                continue;
            }
            batches.push(self.make_batch(
                CollectorKind::Lambda,
                CollectionMode::Api,
                &scope,
                BatchResources::Functions(functions),
            ));
        }
        Ok(batches)
    }

    async fn collect_instances(&self, scope: AccountScope) -> Result<Vec<ResourceBatch>> {
        info!("Collecting instances in {}", scope.region);
        let chunk_size = self.config.ec2_chunk_size.ok_or_else(|| {
            InventoryError::InvalidConfig(
                "EC2_CHUNK_SIZE is required when EC2 collection is enabled".to_string(),
            )
        })?;

        let mut batches = Vec::new();
        let mut pages = InstancePages::new(self.instances.as_ref(), &scope);
        while let Some(page) = pages.next_page().await? {
            for instances in chunk(page, chunk_size) {
                debug!("Yielding chunk with {} instances", instances.len());
                batches.push(self.make_batch(
                    CollectorKind::Ec2,
                    CollectionMode::Api,
                    &scope,
                    BatchResources::Instances(instances),
                ));
            }
        }
        Ok(batches)
    }

    /// Collects from every configured role, skipping roles that fail.
    async fn collect_static_iam(&self) -> Vec<ResourceBatch> {
        let mut batches = Vec::new();
        for role_arn in &self.config.cross_account_role_arns {
            match self.collect_role(role_arn).await {
                Ok(found) => batches.extend(found),
                Err(e) => {
                    warn!("Skipping collection for role {role_arn}: {e}");
                }
            }
        }
        info!("Collected cross-account resources via static role assumption");
        batches
    }

    async fn collect_role(&self, role_arn: &str) -> Result<Vec<ResourceBatch>> {
        let credentials = self.identity.assume_role(role_arn).await?;
        let account_id = self.identity.account_id(Some(&credentials)).await?;

        let mut batches = Vec::new();
        for region in &self.config.regions {
            for kind in self.enabled_kinds() {
                let scope =
                    AccountScope::assumed(region.clone(), account_id.clone(), credentials.clone());
                batches.extend(self.collect_scope(scope, kind).await?);
            }
        }
        Ok(batches)
    }

    /// One aggregator query per kind covers every account and region the
    /// aggregator spans; results are grouped back into per-region/account
    /// batches of partial identities.
    async fn collect_via_aggregator(&self) -> Result<Vec<ResourceBatch>> {
        let name = self.config.config_aggregator_name.as_deref().ok_or_else(|| {
            InventoryError::InvalidConfig("CONFIG_AGGREGATOR_NAME is required".to_string())
        })?;

        let mut batches = Vec::new();
        for kind in self.enabled_kinds() {
            let identities = self.aggregator.select_identities(name, kind).await?;
            let total = identities.len();

            let mut grouped: BTreeMap<(String, String), Vec<ResourceIdentity>> = BTreeMap::new();
            for identity in identities {
                grouped
                    .entry((identity.region.clone(), identity.account_id.clone()))
                    .or_default()
                    .push(identity);
            }

            for ((region, account), group) in grouped {
                let scope = AccountScope::current(region, account);
                for identities in chunk(group, AGGREGATOR_PAGE_SIZE as usize) {
                    let resources = match kind {
                        // Function identities are complete enough to enrich
                        // by name; instances must be re-described.
                        CollectorKind::Lambda => BatchResources::Functions(
                            identities
                                .into_iter()
                                .filter_map(|identity| {
                                    let parsed = parse_function_arn(&identity.arn)?;
                                    Some(FunctionSummary {
                                        function_arn: identity.arn,
                                        function_name: parsed.function_name,
                                    })
                                })
                                .collect(),
                        ),
                        CollectorKind::Ec2 => BatchResources::Identities(identities),
                    };
                    batches.push(self.make_batch(kind, CollectionMode::Config, &scope, resources));
                }
            }
            info!(
                "Collected {total} {} resources via the configuration aggregator",
                kind.as_str()
            );
        }
        Ok(batches)
    }

    fn make_batch(
        &self,
        kind: CollectorKind,
        mode: CollectionMode,
        scope: &AccountScope,
        resources: BatchResources,
    ) -> ResourceBatch {
        ResourceBatch {
            source: BatchOrigin::Collector { kind, mode }.to_string(),
            region: scope.region.clone(),
            account: scope.account_id.clone(),
            resources,
            timestamp: Some(Utc::now().to_rfc3339()),
        }
    }
}
