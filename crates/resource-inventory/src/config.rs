// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Configuration for the collector and generator.
//!
//! The configuration is read from the environment exactly once, at process
//! start, into an explicit struct that is passed by reference into every
//! component. Components never read ambient environment state themselves.
//!
//! Validation is split by role: both binaries share `from_env`, then apply
//! the checks for the settings they actually require, so a generator does not
//! fail on a missing collector-only setting and vice versa.

use std::env;

use regex::Regex;

use crate::error::{InventoryError, Result};
use crate::filter::{ResourceFilters, TagFilter};
use crate::model::CrossAccountMode;

/// Default provider API budget, in requests per second.
const DEFAULT_API_RATE_LIMIT: u32 = 15;

/// Default record TTL, in minutes.
const DEFAULT_RESOURCE_TTL_MINUTES: u64 = 60;

#[derive(Debug, Clone)]
pub struct InventoryConfig {
    /// Skip EC2 instance collection entirely.
    pub exclude_ec2: bool,
    /// Skip Lambda function collection entirely.
    pub exclude_lambda: bool,
    /// Regions to enumerate. Falls back to the runtime region.
    pub regions: Vec<String>,
    /// The region this process runs in.
    pub current_region: Option<String>,
    pub cross_account_mode: CrossAccountMode,
    /// Role ARNs to assume in StaticIam mode (explicit list, or derived from
    /// an account-id list and a role name template).
    pub cross_account_role_arns: Vec<String>,
    /// Aggregator to query in Config mode.
    pub config_aggregator_name: Option<String>,
    /// Include/exclude/tag filters applied to function candidates.
    pub function_filters: ResourceFilters,
    /// Queue payload chunk size for EC2 instances. Required when EC2 is
    /// collected, with no default: the value is tuned to the transport's
    /// maximum message size.
    pub ec2_chunk_size: Option<usize>,
    /// How many of the most recent function versions to retain, in addition
    /// to alias-referenced versions. Zero collects only `$LATEST`.
    pub latest_versions_per_function: usize,
    pub collect_aliases: bool,
    pub resource_ttl_minutes: u64,
    /// Shared provider API budget in requests per second; enrichment divides
    /// it across the call types issued per resource.
    pub api_rate_limit: u32,
    /// Queue for the collection -> generation hop. Absent selects the
    /// non-queued mode, where batches are handed directly to the generator.
    pub queue_url: Option<String>,
    pub metadata_url: Option<String>,
    pub private_key: Option<String>,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        InventoryConfig {
            exclude_ec2: false,
            exclude_lambda: false,
            regions: Vec::new(),
            current_region: None,
            cross_account_mode: CrossAccountMode::Disabled,
            cross_account_role_arns: Vec::new(),
            config_aggregator_name: None,
            function_filters: ResourceFilters::default(),
            ec2_chunk_size: None,
            latest_versions_per_function: 0,
            collect_aliases: false,
            resource_ttl_minutes: DEFAULT_RESOURCE_TTL_MINUTES,
            api_rate_limit: DEFAULT_API_RATE_LIMIT,
            queue_url: None,
            metadata_url: None,
            private_key: None,
        }
    }
}

/// Returns a trimmed, non-empty environment variable.
fn env_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_flag(name: &str) -> bool {
    env_var(name).is_some_and(|v| v.to_lowercase() == "true")
}

fn env_parsed<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match env_var(name) {
        None => Ok(None),
        Some(raw) => raw.parse::<T>().map(Some).map_err(|_| {
            InventoryError::InvalidConfig(format!("{name} must be a number, got '{raw}'"))
        }),
    }
}

impl InventoryConfig {
    /// Builds the configuration from the environment. Malformed values fail
    /// here; required-but-missing values fail in the role-specific
    /// validation, before any API call is made.
    pub fn from_env() -> Result<Self> {
        let current_region = env_var("AWS_REGION");

        let regions = match env_var("REGIONS") {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(str::to_string)
                .collect(),
            None => current_region.iter().cloned().collect(),
        };

        let cross_account_mode = match env_var("CROSS_ACCOUNT_MODE") {
            Some(raw) => raw.parse::<CrossAccountMode>()?,
            None => CrossAccountMode::Disabled,
        };

        let mut cross_account_role_arns: Vec<String> = env_var("CROSS_ACCOUNT_IAM_ROLE_ARNS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|a| !a.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        // Account-id list plus a role name template is the other spelling of
        // the same setting.
        if let (Some(ids), Some(role_name)) = (
            env_var("CROSS_ACCOUNT_IDS"),
            env_var("CROSS_ACCOUNT_ROLE_NAME"),
        ) {
            for id in ids.split(',').map(str::trim).filter(|a| !a.is_empty()) {
                cross_account_role_arns.push(format!("arn:aws:iam::{id}:role/{role_name}"));
            }
        }

        let include = compile_filter_regex("LAMBDA_FUNCTION_INCLUDE_REGEX_FILTER")?;
        let exclude = compile_filter_regex("LAMBDA_FUNCTION_EXCLUDE_REGEX_FILTER")?;
        let tag_filters = match env_var("LAMBDA_FUNCTION_TAG_FILTERS") {
            None => None,
            Some(raw) => Some(serde_json::from_str::<Vec<TagFilter>>(&raw).map_err(|e| {
                InventoryError::InvalidConfig(format!(
                    "LAMBDA_FUNCTION_TAG_FILTERS is not valid tag filter JSON: {e}"
                ))
            })?),
        };

        Ok(InventoryConfig {
            exclude_ec2: env_flag("IS_EC2_RESOURCE_TYPE_EXCLUDED"),
            exclude_lambda: env_flag("IS_LAMBDA_RESOURCE_TYPE_EXCLUDED"),
            regions,
            current_region,
            cross_account_mode,
            cross_account_role_arns,
            config_aggregator_name: env_var("CONFIG_AGGREGATOR_NAME"),
            function_filters: ResourceFilters::new(include, exclude, tag_filters),
            ec2_chunk_size: env_parsed::<usize>("EC2_CHUNK_SIZE")?,
            latest_versions_per_function: env_parsed::<usize>("LATEST_VERSIONS_PER_FUNCTION")?
                .unwrap_or(0),
            collect_aliases: env_flag("COLLECT_ALIASES"),
            resource_ttl_minutes: env_parsed::<u64>("RESOURCE_TTL_MINUTES")?
                .unwrap_or(DEFAULT_RESOURCE_TTL_MINUTES),
            api_rate_limit: env_parsed::<u32>("API_RATE_LIMIT")?.unwrap_or(DEFAULT_API_RATE_LIMIT),
            queue_url: env_var("METADATA_QUEUE_URL"),
            metadata_url: env_var("METADATA_URL"),
            private_key: env_var("PRIVATE_KEY"),
        })
    }

    /// Checks the settings the collector requires.
    pub fn validate_for_collector(&self) -> Result<()> {
        if self.regions.is_empty() {
            return Err(InventoryError::InvalidConfig(
                "No regions configured: set REGIONS or run with AWS_REGION".to_string(),
            ));
        }
        if !self.exclude_ec2 {
            match self.ec2_chunk_size {
                None => {
                    return Err(InventoryError::InvalidConfig(
                        "EC2_CHUNK_SIZE is required when EC2 collection is enabled".to_string(),
                    ))
                }
                Some(0) => {
                    return Err(InventoryError::InvalidConfig(
                        "EC2_CHUNK_SIZE must be greater than 0".to_string(),
                    ))
                }
                Some(_) => {}
            }
        }
        match self.cross_account_mode {
            CrossAccountMode::Disabled => {}
            CrossAccountMode::StaticIam => {
                if self.cross_account_role_arns.is_empty() {
                    return Err(InventoryError::InvalidConfig(
                        "CROSS_ACCOUNT_MODE=static_iam requires CROSS_ACCOUNT_IAM_ROLE_ARNS or \
                         CROSS_ACCOUNT_IDS + CROSS_ACCOUNT_ROLE_NAME"
                            .to_string(),
                    ));
                }
            }
            CrossAccountMode::Config => {
                if self.config_aggregator_name.is_none() {
                    return Err(InventoryError::InvalidConfig(
                        "CROSS_ACCOUNT_MODE=config requires CONFIG_AGGREGATOR_NAME".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Checks the settings the generator requires.
    pub fn validate_for_generator(&self) -> Result<()> {
        if self.metadata_url.is_none() {
            return Err(InventoryError::InvalidConfig(
                "METADATA_URL is required".to_string(),
            ));
        }
        if self.private_key.is_none() {
            return Err(InventoryError::InvalidConfig(
                "PRIVATE_KEY is required".to_string(),
            ));
        }
        if self.resource_ttl_minutes == 0 {
            return Err(InventoryError::InvalidConfig(
                "RESOURCE_TTL_MINUTES must be greater than 0".to_string(),
            ));
        }
        if self.api_rate_limit == 0 {
            return Err(InventoryError::InvalidConfig(
                "API_RATE_LIMIT must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

fn compile_filter_regex(name: &str) -> Result<Option<Regex>> {
    match env_var(name) {
        None => Ok(None),
        Some(raw) => Regex::new(&raw).map(Some).map_err(|e| {
            InventoryError::InvalidConfig(format!("{name} is not a valid regex: {e}"))
        }),
    }
}
