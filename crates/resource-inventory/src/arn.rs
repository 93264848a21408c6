// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! ARN parsing and formatting helpers.
//!
//! A Lambda function ARN has the shape
//! `arn:aws:lambda:<region>:<account>:function:<name>[:<version>]`; the
//! helpers here split on `:` and pick fields by position rather than pulling
//! in a full ARN grammar, which is all the pipeline needs.

/// Components of a Lambda function ARN, with the version qualifier when the
/// ARN carries one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionArn {
    pub region: String,
    pub account_id: String,
    pub function_name: String,
    pub version: Option<String>,
}

/// Parses a (possibly version-qualified) Lambda function ARN.
///
/// Returns `None` when the string does not have the function ARN shape.
#[must_use]
pub fn parse_function_arn(arn: &str) -> Option<FunctionArn> {
    let parts: Vec<&str> = arn.split(':').collect();
    if parts.len() < 7 || parts[2] != "lambda" || parts[5] != "function" {
        return None;
    }
    Some(FunctionArn {
        region: parts[3].to_string(),
        account_id: parts[4].to_string(),
        function_name: parts[6].to_string(),
        version: parts.get(7).map(|v| (*v).to_string()),
    })
}

/// Unqualified function ARN.
#[must_use]
pub fn function_arn(region: &str, account_id: &str, function_name: &str) -> String {
    format!("arn:aws:lambda:{region}:{account_id}:function:{function_name}")
}

/// Version-qualified function ARN.
#[must_use]
pub fn function_version_arn(
    region: &str,
    account_id: &str,
    function_name: &str,
    version: &str,
) -> String {
    format!("arn:aws:lambda:{region}:{account_id}:function:{function_name}:{version}")
}

/// ARN of an EC2 instance.
#[must_use]
pub fn instance_arn(region: &str, account_id: &str, instance_id: &str) -> String {
    format!("arn:aws:ec2:{region}:{account_id}:instance/{instance_id}")
}
