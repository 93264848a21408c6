// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! In-memory fakes for the provider API seams, shared by the integration
//! tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use resource_inventory::aws::config_agg::AggregatorApi;
use resource_inventory::aws::ec2::{InstancePage, InstancesApi};
use resource_inventory::aws::lambda::{
    EventSourceMapping, FunctionAlias, FunctionDetail, FunctionPage, FunctionVersionDetail,
    FunctionsApi,
};
use resource_inventory::aws::sqs::BatchQueue;
use resource_inventory::aws::sts::IdentityApi;
use resource_inventory::aws::tagging::TaggingApi;
use resource_inventory::aws::AccountScope;
use resource_inventory::error::{InventoryError, Result};
use resource_inventory::filter::TagFilter;
use resource_inventory::intake::MetadataSink;
use resource_inventory::model::{
    AttributedResource, CollectorKind, Credentials, FunctionSummary, InstanceSnapshot,
    ResourceBatch, ResourceIdentity, Tag,
};

/// Shared, ordered record of notable fake-API events, used to assert
/// sequencing (e.g. all enumeration happens before any publish).
pub type EventLog = Arc<Mutex<Vec<String>>>;

pub fn new_log() -> EventLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn function_arn(name: &str) -> String {
    format!("arn:aws:lambda:us-east-1:123456789012:function:{name}")
}

pub fn summary(name: &str) -> FunctionSummary {
    FunctionSummary {
        function_arn: function_arn(name),
        function_name: name.to_string(),
    }
}

pub fn version_detail(name: &str, version: &str) -> FunctionVersionDetail {
    FunctionVersionDetail {
        function_arn: function_arn(name),
        function_name: name.to_string(),
        version: version.to_string(),
        memory_size: Some(128),
        architectures: vec!["arm64".to_string()],
        runtime: Some("nodejs20.x".to_string()),
        code_size: 2048,
        handler: Some("index.handler".to_string()),
        ephemeral_storage_size: Some(512),
        timeout: Some(15),
        role: None,
        layers: vec![],
    }
}

pub fn detail(name: &str) -> FunctionDetail {
    FunctionDetail {
        latest: version_detail(name, "$LATEST"),
        last_update_status: Some("Successful".to_string()),
        tags: vec![Tag::new("env", "prod")],
        reserved_concurrency: None,
    }
}

pub fn instance(id: &str) -> InstanceSnapshot {
    InstanceSnapshot {
        instance_id: id.to_string(),
        instance_type: Some("t3.micro".to_string()),
        image_id: Some("ami-1234".to_string()),
        placement: None,
        tags: vec![Tag::new("Name", id)],
    }
}

fn page_of<T: Clone>(items: &[T], cursor: Option<String>, page_size: usize) -> (Vec<T>, Option<String>) {
    let offset: usize = cursor.and_then(|c| c.parse().ok()).unwrap_or(0);
    let end = (offset + page_size).min(items.len());
    let next = (end < items.len()).then(|| end.to_string());
    (items[offset..end].to_vec(), next)
}

#[derive(Default)]
pub struct FakeFunctions {
    pub page_size: usize,
    /// Listing results, keyed by account id ("" matches any account).
    pub listings: HashMap<String, Vec<FunctionSummary>>,
    pub details: HashMap<String, FunctionDetail>,
    pub aliases: HashMap<String, Vec<FunctionAlias>>,
    pub versions: HashMap<String, Vec<FunctionVersionDetail>>,
    pub failing_details: HashSet<String>,
    pub log: Option<EventLog>,
}

impl FakeFunctions {
    fn record(&self, event: String) {
        if let Some(log) = &self.log {
            log.lock().unwrap().push(event);
        }
    }
}

#[async_trait]
impl FunctionsApi for FakeFunctions {
    async fn list_page(
        &self,
        scope: &AccountScope,
        cursor: Option<String>,
    ) -> Result<FunctionPage> {
        self.record(format!("list-functions:{}:{}", scope.region, scope.account_id));
        let listing = self
            .listings
            .get(&scope.account_id)
            .or_else(|| self.listings.get(""))
            .cloned()
            .unwrap_or_default();
        let (functions, next) = page_of(&listing, cursor, self.page_size.max(1));
        Ok(FunctionPage { functions, next })
    }

    async fn get_function(&self, function_name: &str) -> Result<FunctionDetail> {
        if self.failing_details.contains(function_name) {
            return Err(InventoryError::Api {
                service: "lambda",
                message: format!("describe of {function_name} failed"),
            });
        }
        self.details
            .get(function_name)
            .cloned()
            .ok_or_else(|| InventoryError::Api {
                service: "lambda",
                message: format!("unknown function {function_name}"),
            })
    }

    async fn list_aliases(&self, function_name: &str) -> Result<Vec<FunctionAlias>> {
        Ok(self.aliases.get(function_name).cloned().unwrap_or_default())
    }

    async fn list_versions(&self, function_name: &str) -> Result<Vec<FunctionVersionDetail>> {
        Ok(self.versions.get(function_name).cloned().unwrap_or_default())
    }

    async fn event_source_mappings(&self, _function_name: &str) -> Result<Vec<EventSourceMapping>> {
        Ok(vec![])
    }

    async fn policy(&self, _function_name: &str) -> Result<Option<String>> {
        Ok(None)
    }
}

#[derive(Default)]
pub struct FakeInstances {
    pub page_size: usize,
    /// Listing results, keyed by account id ("" matches any account).
    pub listings: HashMap<String, Vec<InstanceSnapshot>>,
    /// Snapshots returned by bulk re-describe, keyed by instance id.
    pub by_id: HashMap<String, InstanceSnapshot>,
    pub described: Mutex<Vec<Vec<String>>>,
    pub log: Option<EventLog>,
}

impl FakeInstances {
    fn record(&self, event: String) {
        if let Some(log) = &self.log {
            log.lock().unwrap().push(event);
        }
    }
}

#[async_trait]
impl InstancesApi for FakeInstances {
    async fn describe_page(
        &self,
        scope: &AccountScope,
        cursor: Option<String>,
    ) -> Result<InstancePage> {
        self.record(format!("list-instances:{}:{}", scope.region, scope.account_id));
        let listing = self
            .listings
            .get(&scope.account_id)
            .or_else(|| self.listings.get(""))
            .cloned()
            .unwrap_or_default();
        let (instances, next) = page_of(&listing, cursor, self.page_size.max(1));
        Ok(InstancePage { instances, next })
    }

    async fn describe_by_ids(&self, _region: &str, ids: &[String]) -> Result<Vec<InstanceSnapshot>> {
        self.described.lock().unwrap().push(ids.to_vec());
        Ok(ids
            .iter()
            .filter_map(|id| self.by_id.get(id).cloned())
            .collect())
    }
}

#[derive(Default)]
pub struct FakeIdentity {
    pub current_account: String,
    /// Role ARN -> account id it resolves to.
    pub role_accounts: HashMap<String, String>,
    pub failing_roles: HashSet<String>,
}

#[async_trait]
impl IdentityApi for FakeIdentity {
    async fn account_id(&self, credentials: Option<&Credentials>) -> Result<String> {
        // Assumed-role fakes smuggle the account id through the key id.
        match credentials {
            None => Ok(self.current_account.clone()),
            Some(creds) => Ok(creds.access_key_id.clone()),
        }
    }

    async fn assume_role(&self, role_arn: &str) -> Result<Credentials> {
        if self.failing_roles.contains(role_arn) {
            return Err(InventoryError::AssumeRole {
                role_arn: role_arn.to_string(),
                message: "trust policy rejected the session".to_string(),
            });
        }
        let account = self
            .role_accounts
            .get(role_arn)
            .cloned()
            .ok_or_else(|| InventoryError::AssumeRole {
                role_arn: role_arn.to_string(),
                message: "unknown role".to_string(),
            })?;
        Ok(Credentials {
            access_key_id: account,
            secret_access_key: "secret".to_string(),
            session_token: "token".to_string(),
        })
    }
}

#[derive(Default)]
pub struct FakeTagging {
    pub matching: HashSet<String>,
}

#[async_trait]
impl TaggingApi for FakeTagging {
    async fn resources_matching(
        &self,
        _scope: &AccountScope,
        _kind: CollectorKind,
        _filters: &[TagFilter],
    ) -> Result<HashSet<String>> {
        Ok(self.matching.clone())
    }
}

#[derive(Default)]
pub struct FakeAggregator {
    pub identities: HashMap<&'static str, Vec<ResourceIdentity>>,
    pub fail: bool,
}

#[async_trait]
impl AggregatorApi for FakeAggregator {
    async fn select_identities(
        &self,
        _aggregator_name: &str,
        kind: CollectorKind,
    ) -> Result<Vec<ResourceIdentity>> {
        if self.fail {
            return Err(InventoryError::Api {
                service: "config",
                message: "aggregator unavailable".to_string(),
            });
        }
        Ok(self.identities.get(kind.as_str()).cloned().unwrap_or_default())
    }
}

#[derive(Default)]
pub struct RecordingQueue {
    pub published: Mutex<Vec<ResourceBatch>>,
    /// Fail every publish once this many batches have been accepted.
    pub fail_after: Option<usize>,
    pub log: Option<EventLog>,
}

#[async_trait]
impl BatchQueue for RecordingQueue {
    async fn publish(&self, batch: &ResourceBatch) -> Result<()> {
        let mut published = self.published.lock().unwrap();
        if let Some(limit) = self.fail_after {
            if published.len() >= limit {
                return Err(InventoryError::Publish("queue unavailable".to_string()));
            }
        }
        if let Some(log) = &self.log {
            log.lock().unwrap().push(format!("publish:{}", batch.source));
        }
        published.push(batch.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingSink {
    pub submissions: Mutex<Vec<(String, Vec<AttributedResource>)>>,
}

#[async_trait]
impl MetadataSink for RecordingSink {
    async fn submit(&self, collector_id: &str, resources: &[AttributedResource]) -> Result<()> {
        self.submissions
            .lock()
            .unwrap()
            .push((collector_id.to_string(), resources.to_vec()));
        Ok(())
    }
}
