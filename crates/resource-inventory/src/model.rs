// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Canonical data model for the inventory pipeline.
//!
//! Every provider response is converted into one of the shapes in this module
//! at the API boundary, immediately upon receipt. Provider payloads spell the
//! same field as `FunctionArn`, `functionArn` or `arn` depending on the call
//! origin (SDK describe call, configuration aggregator row, CloudTrail event
//! detail); the serde aliases here absorb that, and internal logic never
//! branches on casing.
//!
//! The module also defines the transport shapes (`ResourceBatch`) that cross
//! the queue boundary and the output shape (`AttributedResource`) submitted to
//! the metadata backend.

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::InventoryError;

/// Schema URL stamped on every attributed resource.
pub const SCHEMA_URL: &str = "";

/// Resource kinds the collector enumerates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectorKind {
    Lambda,
    Ec2,
}

impl CollectorKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            CollectorKind::Lambda => "lambda",
            CollectorKind::Ec2 => "ec2",
        }
    }

    /// Resource type string understood by the configuration aggregator query.
    #[must_use]
    pub fn aggregator_resource_type(&self) -> &'static str {
        match self {
            CollectorKind::Lambda => "AWS::Lambda::Function",
            CollectorKind::Ec2 => "AWS::EC2::Instance",
        }
    }

    /// Resource type filter understood by the tagging API.
    #[must_use]
    pub fn tagging_filter(&self) -> &'static str {
        match self {
            CollectorKind::Lambda => "lambda:function",
            CollectorKind::Ec2 => "ec2:instance",
        }
    }
}

/// How a batch was collected: the provider listing API or the configuration
/// aggregator. Aggregator-sourced batches carry partial identities that need
/// a full describe during generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionMode {
    Api,
    Config,
}

impl CollectionMode {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionMode::Api => "api",
            CollectionMode::Config => "config",
        }
    }
}

/// Parsed form of a batch `source` string.
///
/// Collector-produced batches are tagged `collector.<kind>.<mode>`; the
/// `<mode>` segment is omitted by older collectors and defaults to `api`.
/// CloudTrail-derived events arrive tagged `aws.<kind>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOrigin {
    Collector {
        kind: CollectorKind,
        mode: CollectionMode,
    },
    CloudTrail {
        kind: CollectorKind,
    },
}

impl BatchOrigin {
    #[must_use]
    pub fn kind(&self) -> CollectorKind {
        match self {
            BatchOrigin::Collector { kind, .. } | BatchOrigin::CloudTrail { kind } => *kind,
        }
    }
}

impl std::fmt::Display for BatchOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BatchOrigin::Collector { kind, mode } => {
                write!(f, "collector.{}.{}", kind.as_str(), mode.as_str())
            }
            BatchOrigin::CloudTrail { kind } => write!(f, "aws.{}", kind.as_str()),
        }
    }
}

impl std::str::FromStr for BatchOrigin {
    type Err = InventoryError;

    fn from_str(source: &str) -> Result<Self, Self::Err> {
        let unsupported = || InventoryError::UnsupportedSource(source.to_string());
        let lowered = source.to_lowercase();
        let parts: Vec<&str> = lowered.split('.').collect();
        let kind = match parts.get(1) {
            Some(&"lambda") => CollectorKind::Lambda,
            Some(&"ec2") => CollectorKind::Ec2,
            _ => return Err(unsupported()),
        };
        match (parts.first(), parts.get(2)) {
            (Some(&"collector"), None) | (Some(&"collector"), Some(&"api")) => {
                Ok(BatchOrigin::Collector {
                    kind,
                    mode: CollectionMode::Api,
                })
            }
            (Some(&"collector"), Some(&"config")) => Ok(BatchOrigin::Collector {
                kind,
                mode: CollectionMode::Config,
            }),
            (Some(&"aws"), None) => Ok(BatchOrigin::CloudTrail { kind }),
            _ => Err(unsupported()),
        }
    }
}

/// Output record types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceKind {
    #[serde(rename = "aws:lambda:function")]
    Function,
    #[serde(rename = "aws:lambda:function-version")]
    FunctionVersion,
    #[serde(rename = "aws:lambda:function-alias")]
    FunctionAlias,
    #[serde(rename = "aws:ec2:instance")]
    Instance,
}

impl ResourceKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Function => "aws:lambda:function",
            ResourceKind::FunctionVersion => "aws:lambda:function-version",
            ResourceKind::FunctionAlias => "aws:lambda:function-alias",
            ResourceKind::Instance => "aws:ec2:instance",
        }
    }
}

/// A single normalized tag. The two source APIs disagree on the structure
/// (`Tags` map for functions, `Tags`/`tagSet.items` lists for instances) and
/// on casing; everything is folded into this one shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Tag {
    #[serde(alias = "key")]
    pub key: String,
    #[serde(alias = "value")]
    pub value: String,
}

impl Tag {
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Tag {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Minimal reference to a cloud resource, the join key between the collection
/// and generation stages. Aggregator rows produce exactly this shape and are
/// re-described during generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceIdentity {
    #[serde(rename = "resourceType")]
    pub kind: ResourceKind,
    #[serde(alias = "resourceArn")]
    pub arn: String,
    pub resource_id: String,
    #[serde(alias = "awsRegion")]
    pub region: String,
    pub account_id: String,
}

/// Identity of one enumerated function, as carried across the queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FunctionSummary {
    #[serde(alias = "functionArn")]
    pub function_arn: String,
    #[serde(alias = "functionName")]
    pub function_name: String,
}

/// Instance placement; only the availability zone is carried forward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Placement {
    #[serde(default, alias = "availabilityZone")]
    pub availability_zone: Option<String>,
}

/// One enumerated EC2 instance, normalized from either the describe API or a
/// CloudTrail event detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InstanceSnapshot {
    #[serde(alias = "instanceId")]
    pub instance_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "instanceType")]
    pub instance_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "imageId")]
    pub image_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "placement")]
    pub placement: Option<Placement>,
    #[serde(
        default,
        alias = "tagSet",
        alias = "tags",
        deserialize_with = "deserialize_tag_list"
    )]
    pub tags: Vec<Tag>,
}

impl InstanceSnapshot {
    #[must_use]
    pub fn availability_zone(&self) -> Option<&str> {
        self.placement
            .as_ref()
            .and_then(|p| p.availability_zone.as_deref())
    }
}

/// Accepts a tag list in any of the shapes the provider emits: a plain array
/// of key/value pairs, or an object wrapping the array under `items`.
fn deserialize_tag_list<'de, D>(deserializer: D) -> Result<Vec<Tag>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum TagListRepr {
        List(Vec<Tag>),
        Wrapped { items: Vec<Tag> },
    }

    Ok(match Option::<TagListRepr>::deserialize(deserializer)? {
        Some(TagListRepr::List(tags)) => tags,
        Some(TagListRepr::Wrapped { items }) => items,
        None => Vec::new(),
    })
}

/// The resources carried by one batch. The `source` tag on the batch decides
/// how the payload is interpreted; an empty payload deserializes into the
/// first variant regardless of kind, which consumers tolerate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BatchResources {
    Functions(Vec<FunctionSummary>),
    Identities(Vec<ResourceIdentity>),
    Instances(Vec<InstanceSnapshot>),
}

impl BatchResources {
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            BatchResources::Functions(v) => v.len(),
            BatchResources::Identities(v) => v.len(),
            BatchResources::Instances(v) => v.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The unit of transport across the queue boundary. Batches for the same
/// region/account/kind may be split into multiple messages, and arrival order
/// is not guaranteed; the timestamp is informational only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceBatch {
    pub source: String,
    pub region: String,
    #[serde(default)]
    pub account: String,
    pub resources: BatchResources,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

/// Attribute value, either a string or an integer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AttributeValue {
    StringValue(String),
    IntValue(i64),
}

/// One key/value attribute of an attributed resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub key: String,
    pub value: AttributeValue,
}

#[must_use]
pub fn string_attr(key: impl Into<String>, value: impl Into<String>) -> Attribute {
    Attribute {
        key: key.into(),
        value: AttributeValue::StringValue(value.into()),
    }
}

#[must_use]
pub fn int_attr(key: impl Into<String>, value: i64) -> Attribute {
    Attribute {
        key: key.into(),
        value: AttributeValue::IntValue(value),
    }
}

/// Time-to-live after which the backend considers a record stale absent a
/// refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceTtl {
    pub seconds: i64,
    pub nanos: i32,
}

impl ResourceTtl {
    #[must_use]
    pub fn from_minutes(minutes: u64) -> Self {
        ResourceTtl {
            seconds: (minutes * 60) as i64,
            nanos: 0,
        }
    }
}

/// The output record submitted to the metadata backend.
///
/// `resource_id` is always a fully qualified ARN. Attribute construction is
/// deterministic: two enrichment passes over the same underlying resource
/// produce the same record, differing only in TTL and newly observed tags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributedResource {
    pub resource_id: String,
    pub resource_type: ResourceKind,
    pub attributes: Vec<Attribute>,
    pub schema_url: String,
    pub resource_ttl: ResourceTtl,
}

/// Temporary credentials for one assumed role. Held only for the duration of
/// one account's enumeration calls, never persisted.
#[derive(Clone)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &"<redacted>")
            .finish()
    }
}

/// How cross-account resources are collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CrossAccountMode {
    #[default]
    Disabled,
    StaticIam,
    Config,
}

impl std::str::FromStr for CrossAccountMode {
    type Err = InventoryError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "disabled" => Ok(CrossAccountMode::Disabled),
            "static_iam" | "staticiam" => Ok(CrossAccountMode::StaticIam),
            "config" => Ok(CrossAccountMode::Config),
            other => Err(InventoryError::InvalidConfig(format!(
                "Invalid cross-account mode '{other}'. Must be one of: disabled, static_iam, config"
            ))),
        }
    }
}
