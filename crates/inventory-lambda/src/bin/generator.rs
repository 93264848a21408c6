// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Generator entrypoint.
//!
//! Handles queue deliveries (a batch of messages per invocation, with
//! partial-batch failure reporting so only failed messages are redelivered)
//! as well as direct invocations and CloudTrail-derived events.

use std::sync::Arc;

use aws_lambda_events::event::sqs::{BatchItemFailure, SqsBatchResponse, SqsEvent, SqsMessage};
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;
use tracing::{error, info};

use inventory_lambda::{batch_from_event, canonical_collector_id, init_tracing};
use resource_inventory::aws::ec2::AwsInstancesApi;
use resource_inventory::aws::lambda::AwsFunctionsApi;
use resource_inventory::aws::tagging::AwsTaggingApi;
use resource_inventory::generator::Generator;
use resource_inventory::intake::IntakeClient;
use resource_inventory::model::ResourceBatch;
use resource_inventory::InventoryConfig;

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_tracing();

    let config = Arc::new(InventoryConfig::from_env()?);
    config.validate_for_generator()?;

    let url = config.metadata_url.clone().ok_or("METADATA_URL is required")?;
    let key = config.private_key.clone().ok_or("PRIVATE_KEY is required")?;

    let sdk = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let generator = Arc::new(Generator::new(
        config,
        Arc::new(AwsFunctionsApi::new(&sdk)),
        Arc::new(AwsInstancesApi::new(&sdk)),
        Arc::new(AwsTaggingApi::new(&sdk)),
        Arc::new(IntakeClient::new(url, key)?),
    ));

    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| {
        let generator = generator.clone();
        async move { handle(generator, event).await }
    }))
    .await
}

async fn handle(generator: Arc<Generator>, event: LambdaEvent<Value>) -> Result<Value, Error> {
    let collector_id = canonical_collector_id(&event.context.invoked_function_arn);

    // Queue deliveries arrive wrapped in a Records array; everything else is
    // a direct invocation payload.
    if event.payload.get("Records").is_some() {
        let sqs_event: SqsEvent = serde_json::from_value(event.payload)?;
        info!("Processing {} queued messages", sqs_event.records.len());

        let mut batch_item_failures = Vec::new();
        for record in sqs_event.records {
            let message_id = record.message_id.clone().unwrap_or_default();
            if let Err(e) = process_record(&generator, &collector_id, &record).await {
                error!("Failed to process message {message_id}: {e}");
                batch_item_failures.push(BatchItemFailure {
                    item_identifier: message_id,
                });
            }
        }
        return Ok(serde_json::to_value(SqsBatchResponse {
            batch_item_failures,
        })?);
    }

    let batch = batch_from_event(&event.payload, &event.context.invoked_function_arn)?;
    generator.process_batch(&collector_id, &batch).await?;
    Ok(Value::Null)
}

async fn process_record(
    generator: &Generator,
    collector_id: &str,
    record: &SqsMessage,
) -> Result<(), Error> {
    let body = record.body.as_deref().ok_or("message has no body")?;
    let batch: ResourceBatch = serde_json::from_str(body)?;
    generator.process_batch(collector_id, &batch).await?;
    Ok(())
}
