// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! End-to-end collection runs against in-memory provider fakes.

mod common;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use common::*;
use resource_inventory::collector::Collector;
use resource_inventory::config::InventoryConfig;
use resource_inventory::filter::{ResourceFilters, TagFilter};
use resource_inventory::model::{
    BatchResources, CrossAccountMode, ResourceIdentity, ResourceKind,
};

const CURRENT_ACCOUNT: &str = "123456789012";

fn test_config() -> InventoryConfig {
    InventoryConfig {
        regions: vec!["us-east-1".to_string()],
        ec2_chunk_size: Some(25),
        api_rate_limit: 100,
        ..Default::default()
    }
}

fn identity() -> FakeIdentity {
    FakeIdentity {
        current_account: CURRENT_ACCOUNT.to_string(),
        ..Default::default()
    }
}

struct Setup {
    config: InventoryConfig,
    functions: FakeFunctions,
    instances: FakeInstances,
    identity: FakeIdentity,
    tagging: FakeTagging,
    aggregator: FakeAggregator,
    queue: RecordingQueue,
}

impl Default for Setup {
    fn default() -> Self {
        Setup {
            config: test_config(),
            functions: FakeFunctions {
                page_size: 50,
                ..Default::default()
            },
            instances: FakeInstances {
                page_size: 1000,
                ..Default::default()
            },
            identity: identity(),
            tagging: FakeTagging::default(),
            aggregator: FakeAggregator::default(),
            queue: RecordingQueue::default(),
        }
    }
}

impl Setup {
    fn build(self) -> (Collector, Arc<RecordingQueue>) {
        let queue = Arc::new(self.queue);
        let collector = Collector {
            config: Arc::new(self.config),
            functions: Arc::new(self.functions),
            instances: Arc::new(self.instances),
            identity: Arc::new(self.identity),
            tagging: Arc::new(self.tagging),
            aggregator: Arc::new(self.aggregator),
            queue: queue.clone(),
        };
        (collector, queue)
    }
}

#[tokio::test]
async fn test_instances_are_chunked_to_the_configured_size() {
    let mut setup = Setup::default();
    setup.instances.listings.insert(
        String::new(),
        (0..237).map(|i| instance(&format!("i-{i:04}"))).collect(),
    );
    let (collector, queue) = setup.build();

    let summary = collector.run().await.unwrap();

    let published = queue.published.lock().unwrap();
    assert_eq!(published.len(), 10);
    assert_eq!(summary.batches, 10);
    assert_eq!(summary.resources, 237);
    for batch in published.iter() {
        assert_eq!(batch.source, "collector.ec2.api");
        assert_eq!(batch.region, "us-east-1");
        assert_eq!(batch.account, CURRENT_ACCOUNT);
    }
    for full in &published[..9] {
        assert_eq!(full.resources.len(), 25);
    }
    assert_eq!(published[9].resources.len(), 12);
}

#[tokio::test]
async fn test_function_batches_follow_the_listing_page_size() {
    let mut setup = Setup::default();
    setup.functions.listings.insert(
        String::new(),
        (0..120).map(|i| summary(&format!("fn-{i:03}"))).collect(),
    );
    let (collector, queue) = setup.build();

    collector.run().await.unwrap();

    let published = queue.published.lock().unwrap();
    let sizes: Vec<usize> = published.iter().map(|b| b.resources.len()).collect();
    assert_eq!(sizes, vec![50, 50, 20]);
    for batch in published.iter() {
        assert_eq!(batch.source, "collector.lambda.api");
    }
}

#[tokio::test]
async fn test_tag_filter_intersects_enumerated_candidates() {
    let mut setup = Setup::default();
    setup.functions.listings.insert(
        String::new(),
        (0..10).map(|i| summary(&format!("fn-{i}"))).collect(),
    );
    setup.config.function_filters = ResourceFilters::new(
        None,
        None,
        Some(vec![TagFilter {
            key: "env".to_string(),
            values: vec!["prod".to_string()],
        }]),
    );
    setup.tagging.matching = ["fn-1", "fn-4", "fn-7"]
        .iter()
        .map(|name| function_arn(name))
        .collect::<HashSet<String>>();
    let (collector, queue) = setup.build();

    collector.run().await.unwrap();

    let published = queue.published.lock().unwrap();
    assert_eq!(published.len(), 1);
    match &published[0].resources {
        BatchResources::Functions(functions) => {
            let names: Vec<&str> = functions.iter().map(|f| f.function_name.as_str()).collect();
            assert_eq!(names, vec!["fn-1", "fn-4", "fn-7"]);
        }
        other => panic!("expected functions, got {other:?}"),
    }
}

#[tokio::test]
async fn test_publish_failure_aborts_the_run() {
    let mut setup = Setup::default();
    setup.instances.listings.insert(
        String::new(),
        (0..75).map(|i| instance(&format!("i-{i:04}"))).collect(),
    );
    setup.queue.fail_after = Some(1);
    let (collector, queue) = setup.build();

    assert!(collector.run().await.is_err());
    assert_eq!(queue.published.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_all_enumeration_completes_before_any_publish() {
    let log = new_log();
    let mut setup = Setup::default();
    setup.functions.log = Some(log.clone());
    setup.instances.log = Some(log.clone());
    setup.queue.log = Some(log.clone());
    setup.functions.listings.insert(
        String::new(),
        (0..120).map(|i| summary(&format!("fn-{i:03}"))).collect(),
    );
    setup.instances.listings.insert(
        String::new(),
        (0..30).map(|i| instance(&format!("i-{i:04}"))).collect(),
    );
    let (collector, _queue) = setup.build();

    collector.run().await.unwrap();

    let events = log.lock().unwrap();
    let last_list = events
        .iter()
        .rposition(|e| e.starts_with("list-"))
        .unwrap();
    let first_publish = events
        .iter()
        .position(|e| e.starts_with("publish:"))
        .unwrap();
    assert!(
        last_list < first_publish,
        "publishing started before enumeration finished: {events:?}"
    );
}

#[tokio::test]
async fn test_failed_role_is_skipped_and_others_proceed() {
    let good_role = "arn:aws:iam::222222222222:role/inventory-readonly";
    let bad_role = "arn:aws:iam::333333333333:role/inventory-readonly";

    let mut setup = Setup::default();
    setup.config.exclude_ec2 = true;
    setup.config.cross_account_mode = CrossAccountMode::StaticIam;
    setup.config.cross_account_role_arns = vec![bad_role.to_string(), good_role.to_string()];
    setup.functions.listings.insert(String::new(), vec![summary("current-fn")]);
    setup.functions.listings.insert(
        "222222222222".to_string(),
        vec![summary("other-a"), summary("other-b")],
    );
    setup.identity.role_accounts =
        HashMap::from([(good_role.to_string(), "222222222222".to_string())]);
    setup.identity.failing_roles = HashSet::from([bad_role.to_string()]);
    let (collector, queue) = setup.build();

    collector.run().await.unwrap();

    let published = queue.published.lock().unwrap();
    let accounts: Vec<&str> = published.iter().map(|b| b.account.as_str()).collect();
    assert_eq!(accounts, vec![CURRENT_ACCOUNT, "222222222222"]);
    assert_eq!(published[1].resources.len(), 2);
}

fn lambda_identity(name: &str, region: &str, account: &str) -> ResourceIdentity {
    ResourceIdentity {
        kind: ResourceKind::Function,
        arn: format!("arn:aws:lambda:{region}:{account}:function:{name}"),
        resource_id: name.to_string(),
        region: region.to_string(),
        account_id: account.to_string(),
    }
}

fn instance_identity(id: &str, region: &str, account: &str) -> ResourceIdentity {
    ResourceIdentity {
        kind: ResourceKind::Instance,
        arn: format!("arn:aws:ec2:{region}:{account}:instance/{id}"),
        resource_id: id.to_string(),
        region: region.to_string(),
        account_id: account.to_string(),
    }
}

#[tokio::test]
async fn test_aggregator_results_group_by_region_and_account() {
    let mut setup = Setup::default();
    setup.config.cross_account_mode = CrossAccountMode::Config;
    setup.config.config_aggregator_name = Some("org-aggregator".to_string());
    setup.aggregator.identities = HashMap::from([
        (
            "lambda",
            vec![
                lambda_identity("a", "us-east-1", "222222222222"),
                lambda_identity("b", "eu-west-1", "333333333333"),
                lambda_identity("c", "us-east-1", "222222222222"),
            ],
        ),
        (
            "ec2",
            vec![instance_identity("i-0abc", "us-east-1", "222222222222")],
        ),
    ]);
    let (collector, queue) = setup.build();

    collector.run().await.unwrap();

    let published = queue.published.lock().unwrap();
    let config_batches: Vec<_> = published
        .iter()
        .filter(|b| b.source.ends_with(".config"))
        .collect();
    assert_eq!(config_batches.len(), 3);

    let ec2_batch = config_batches
        .iter()
        .find(|b| b.source == "collector.ec2.config")
        .unwrap();
    assert!(matches!(
        &ec2_batch.resources,
        BatchResources::Identities(ids) if ids.len() == 1
    ));

    let grouped: Vec<(&str, &str, usize)> = config_batches
        .iter()
        .filter(|b| b.source == "collector.lambda.config")
        .map(|b| (b.region.as_str(), b.account.as_str(), b.resources.len()))
        .collect();
    assert!(grouped.contains(&("us-east-1", "222222222222", 2)));
    assert!(grouped.contains(&("eu-west-1", "333333333333", 1)));

    // Aggregator rows carry only identities; function names come from ARNs.
    let lambda_batch = config_batches
        .iter()
        .find(|b| b.region == "eu-west-1")
        .unwrap();
    match &lambda_batch.resources {
        BatchResources::Functions(functions) => {
            assert_eq!(functions[0].function_name, "b");
        }
        other => panic!("expected functions, got {other:?}"),
    }
}

#[tokio::test]
async fn test_aggregator_failure_falls_back_to_static_roles() {
    let role = "arn:aws:iam::222222222222:role/inventory-readonly";

    let mut setup = Setup::default();
    setup.config.exclude_ec2 = true;
    setup.config.cross_account_mode = CrossAccountMode::Config;
    setup.config.config_aggregator_name = Some("org-aggregator".to_string());
    setup.config.cross_account_role_arns = vec![role.to_string()];
    setup.aggregator.fail = true;
    setup.functions.listings.insert(
        "222222222222".to_string(),
        vec![summary("fallback-fn")],
    );
    setup.identity.role_accounts =
        HashMap::from([(role.to_string(), "222222222222".to_string())]);
    let (collector, queue) = setup.build();

    collector.run().await.unwrap();

    let published = queue.published.lock().unwrap();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].source, "collector.lambda.api");
    assert_eq!(published[0].account, "222222222222");
}

#[tokio::test]
async fn test_aggregator_failure_without_roles_degrades_to_current_account() {
    let mut setup = Setup::default();
    setup.config.exclude_ec2 = true;
    setup.config.cross_account_mode = CrossAccountMode::Config;
    setup.config.config_aggregator_name = Some("org-aggregator".to_string());
    setup.aggregator.fail = true;
    setup.functions.listings.insert(String::new(), vec![summary("local-fn")]);
    let (collector, queue) = setup.build();

    let summary = collector.run().await.unwrap();

    assert_eq!(summary.batches, 1);
    let published = queue.published.lock().unwrap();
    assert_eq!(published[0].account, CURRENT_ACCOUNT);
}
