// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Instance attributed-resource construction. Pure: snapshots are already
//! complete by the time they reach this module.

use tracing::info;

use crate::arn::instance_arn;
use crate::model::{
    string_attr, AttributedResource, InstanceSnapshot, ResourceKind, ResourceTtl, SCHEMA_URL,
};

pub(crate) fn generate_instance_resources(
    region: &str,
    account_id: &str,
    snapshots: &[InstanceSnapshot],
    ttl: ResourceTtl,
) -> Vec<AttributedResource> {
    let resources: Vec<AttributedResource> = snapshots
        .iter()
        .map(|snapshot| make_instance_resource(snapshot, region, account_id, ttl))
        .collect();
    info!("Generated {} instance resources", resources.len());
    resources
}

fn make_instance_resource(
    snapshot: &InstanceSnapshot,
    region: &str,
    account_id: &str,
    ttl: ResourceTtl,
) -> AttributedResource {
    let arn = instance_arn(region, account_id, &snapshot.instance_id);

    let mut attributes = vec![
        string_attr("cloud.provider", "aws"),
        string_attr("cloud.platform", "aws_ec2"),
        string_attr("cloud.account.id", account_id),
        string_attr("cloud.region", region),
    ];
    if let Some(zone) = snapshot.availability_zone() {
        attributes.push(string_attr("cloud.availability_zone", zone));
    }
    attributes.push(string_attr("cloud.resource_id", &arn));
    attributes.push(string_attr("host.id", &snapshot.instance_id));
    if let Some(image_id) = &snapshot.image_id {
        attributes.push(string_attr("host.image.id", image_id));
    }
    if let Some(instance_type) = &snapshot.instance_type {
        attributes.push(string_attr("host.type", instance_type));
    }
    if let Some(name) = snapshot.tags.iter().find(|t| t.key == "Name") {
        attributes.push(string_attr("host.name", &name.value));
    }
    for tag in &snapshot.tags {
        attributes.push(string_attr(format!("cloud.tag.{}", tag.key), &tag.value));
    }

    AttributedResource {
        resource_id: arn,
        resource_type: ResourceKind::Instance,
        attributes,
        schema_url: SCHEMA_URL.to_string(),
        resource_ttl: ttl,
    }
}
