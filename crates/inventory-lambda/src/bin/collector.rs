// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Collector entrypoint: one scheduled invocation runs one full collection.

use std::sync::Arc;

use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;
use tracing::info;

use inventory_lambda::{init_tracing, DirectDelivery};
use resource_inventory::aws::config_agg::AwsAggregatorApi;
use resource_inventory::aws::ec2::{AwsInstancesApi, InstancesApi};
use resource_inventory::aws::lambda::{AwsFunctionsApi, FunctionsApi};
use resource_inventory::aws::sqs::{BatchQueue, SqsBatchQueue};
use resource_inventory::aws::sts::AwsIdentityApi;
use resource_inventory::aws::tagging::{AwsTaggingApi, TaggingApi};
use resource_inventory::collector::Collector;
use resource_inventory::generator::Generator;
use resource_inventory::intake::IntakeClient;
use resource_inventory::InventoryConfig;

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_tracing();

    let config = Arc::new(InventoryConfig::from_env()?);
    config.validate_for_collector()?;

    let sdk = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let functions: Arc<dyn FunctionsApi> = Arc::new(AwsFunctionsApi::new(&sdk));
    let instances: Arc<dyn InstancesApi> = Arc::new(AwsInstancesApi::new(&sdk));
    let tagging: Arc<dyn TaggingApi> = Arc::new(AwsTaggingApi::new(&sdk));

    let queue: Arc<dyn BatchQueue> = match &config.queue_url {
        Some(url) => Arc::new(SqsBatchQueue::new(&sdk, url)),
        None => {
            // Non-queued deployment: batches go straight to the generator,
            // so the generator-side settings must be present too.
            config.validate_for_generator()?;
            let url = config.metadata_url.clone().ok_or("METADATA_URL is required")?;
            let key = config.private_key.clone().ok_or("PRIVATE_KEY is required")?;
            let generator = Generator::new(
                config.clone(),
                functions.clone(),
                instances.clone(),
                tagging.clone(),
                Arc::new(IntakeClient::new(url, key)?),
            );
            info!("No queue configured; running in direct delivery mode");
            Arc::new(DirectDelivery {
                generator: Arc::new(generator),
            })
        }
    };

    let collector = Arc::new(Collector {
        config,
        functions,
        instances,
        identity: Arc::new(AwsIdentityApi::new(&sdk)),
        tagging,
        aggregator: Arc::new(AwsAggregatorApi::new(&sdk)),
        queue,
    });

    lambda_runtime::run(service_fn(move |_event: LambdaEvent<Value>| {
        let collector = collector.clone();
        async move {
            let summary = collector.run().await?;
            Ok::<Value, Error>(serde_json::json!({
                "batches": summary.batches,
                "resources": summary.resources,
            }))
        }
    }))
    .await
}
