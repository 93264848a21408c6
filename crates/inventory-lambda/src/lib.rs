// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Shared wiring for the Lambda entrypoints: logging setup, collector id
//! derivation, and conversion of incoming events into resource batches.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use resource_inventory::arn::parse_function_arn;
use resource_inventory::aws::sqs::BatchQueue;
use resource_inventory::generator::Generator;
use resource_inventory::model::{BatchResources, FunctionSummary, InstanceSnapshot, ResourceBatch};

/// Collector id used when the collector feeds the generator in-process and
/// no invocation context is available at delivery time.
pub const DIRECT_COLLECTOR_ID: &str = "resource-inventory";

/// Installs the global tracing subscriber. The execution environment stamps
/// its own timestamps on log lines, so none are emitted here.
pub fn init_tracing() {
    let log_level = std::env::var("LOG_LEVEL")
        .map(|val| val.to_lowercase())
        .unwrap_or_else(|_| "info".to_string());
    let env_filter = format!("hyper=off,rustls=off,{log_level}");

    #[allow(clippy::expect_used)]
    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_new(env_filter).expect("could not parse log level in configuration"),
        )
        .with_target(true)
        .without_time()
        .finish();

    #[allow(clippy::expect_used)]
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
}

/// Canonical (unqualified) ARN of the invoked function, used as the
/// collector id on submissions. Falls back to the raw invoked ARN when it
/// does not parse.
#[must_use]
pub fn canonical_collector_id(invoked_function_arn: &str) -> String {
    match parse_function_arn(invoked_function_arn) {
        Some(parsed) => resource_inventory::arn::function_arn(
            &parsed.region,
            &parsed.account_id,
            &parsed.function_name,
        ),
        None => invoked_function_arn.to_string(),
    }
}

/// Converts a direct invocation payload into a [`ResourceBatch`].
///
/// Collector-produced payloads already have the batch shape. CloudTrail
/// events (`aws.ec2`, `aws.lambda`) carry the resources inside
/// `detail.responseElements` and are normalized here, scoped to the invoked
/// function's region and account.
pub fn batch_from_event(
    payload: &Value,
    invoked_function_arn: &str,
) -> Result<ResourceBatch, lambda_runtime::Error> {
    let source = payload
        .get("source")
        .and_then(Value::as_str)
        .ok_or("Event source property is missing")?
        .to_string();

    if !source.starts_with("aws.") {
        return Ok(serde_json::from_value(payload.clone())?);
    }

    let invoked = parse_function_arn(invoked_function_arn)
        .ok_or("invoked function ARN does not parse")?;

    let resources = match source.as_str() {
        "aws.ec2" => {
            let items = payload
                .pointer("/detail/responseElements/instancesSet/items")
                .cloned()
                .unwrap_or_else(|| Value::Array(Vec::new()));
            let snapshots: Vec<InstanceSnapshot> = serde_json::from_value(items)?;
            BatchResources::Instances(snapshots)
        }
        "aws.lambda" => {
            let elements = payload
                .pointer("/detail/responseElements")
                .cloned()
                .ok_or("Event detail carries no response elements")?;
            let summary: FunctionSummary = serde_json::from_value(elements)?;
            BatchResources::Functions(vec![summary])
        }
        other => return Err(format!("Unsupported event type: {other}").into()),
    };

    Ok(ResourceBatch {
        source,
        region: invoked.region,
        account: invoked.account_id,
        resources,
        timestamp: None,
    })
}

/// Queue stand-in for the non-queued deployment mode: each published batch
/// is handed straight to the generator.
pub struct DirectDelivery {
    pub generator: Arc<Generator>,
}

#[async_trait]
impl BatchQueue for DirectDelivery {
    async fn publish(&self, batch: &ResourceBatch) -> resource_inventory::Result<()> {
        self.generator
            .process_batch(DIRECT_COLLECTOR_ID, batch)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const INVOKED: &str = "arn:aws:lambda:us-east-1:123456789012:function:generator:$LATEST";

    #[test]
    fn test_canonical_collector_id_strips_qualifier() {
        assert_eq!(
            canonical_collector_id(INVOKED),
            "arn:aws:lambda:us-east-1:123456789012:function:generator"
        );
    }

    #[test]
    fn test_canonical_collector_id_fallback() {
        assert_eq!(canonical_collector_id("not-an-arn"), "not-an-arn");
    }

    #[test]
    fn test_batch_from_collector_payload() {
        let payload = json!({
            "source": "collector.lambda.api",
            "region": "us-east-1",
            "account": "123456789012",
            "resources": [
                {"FunctionArn": "arn:aws:lambda:us-east-1:123456789012:function:a", "FunctionName": "a"}
            ]
        });
        let batch = batch_from_event(&payload, INVOKED).unwrap();
        assert_eq!(batch.source, "collector.lambda.api");
        assert_eq!(batch.resources.len(), 1);
    }

    #[test]
    fn test_batch_from_cloudtrail_ec2_event() {
        let payload = json!({
            "source": "aws.ec2",
            "detail": {
                "responseElements": {
                    "instancesSet": {
                        "items": [
                            {
                                "instanceId": "i-0abc",
                                "instanceType": "t3.micro",
                                "placement": {"availabilityZone": "us-east-1a"},
                                "tagSet": {"items": [{"key": "Name", "value": "web-1"}]}
                            }
                        ]
                    }
                }
            }
        });
        let batch = batch_from_event(&payload, INVOKED).unwrap();
        assert_eq!(batch.source, "aws.ec2");
        assert_eq!(batch.region, "us-east-1");
        assert_eq!(batch.account, "123456789012");
        match batch.resources {
            BatchResources::Instances(instances) => {
                assert_eq!(instances.len(), 1);
                assert_eq!(instances[0].instance_id, "i-0abc");
            }
            other => panic!("expected instances, got {other:?}"),
        }
    }

    #[test]
    fn test_batch_from_cloudtrail_lambda_event() {
        let payload = json!({
            "source": "aws.lambda",
            "detail": {
                "responseElements": {
                    "functionArn": "arn:aws:lambda:us-east-1:123456789012:function:new-fn",
                    "functionName": "new-fn"
                }
            }
        });
        let batch = batch_from_event(&payload, INVOKED).unwrap();
        match batch.resources {
            BatchResources::Functions(functions) => {
                assert_eq!(functions.len(), 1);
                assert_eq!(functions[0].function_name, "new-fn");
            }
            other => panic!("expected functions, got {other:?}"),
        }
    }

    #[test]
    fn test_batch_from_event_requires_source() {
        let payload = json!({"region": "us-east-1"});
        assert!(batch_from_event(&payload, INVOKED).is_err());
    }

    #[test]
    fn test_batch_from_event_rejects_unknown_aws_source() {
        let payload = json!({"source": "aws.sqs", "detail": {}});
        assert!(batch_from_event(&payload, INVOKED).is_err());
    }
}
