// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Identity resolution: caller account lookup and cross-account role
//! assumption.

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_sts::error::DisplayErrorContext;

use crate::error::{InventoryError, Result};
use crate::model::Credentials;

/// Session name stamped on every assumed-role session.
pub const SESSION_NAME: &str = "resource-inventory-collection";

#[async_trait]
pub trait IdentityApi: Send + Sync {
    /// Resolves the account id of the given credentials, or of the ambient
    /// identity when none are given.
    async fn account_id(&self, credentials: Option<&Credentials>) -> Result<String>;

    /// Obtains temporary credentials for the given role, with the provider's
    /// default session duration.
    async fn assume_role(&self, role_arn: &str) -> Result<Credentials>;
}

pub struct AwsIdentityApi {
    client: aws_sdk_sts::Client,
    region: String,
}

impl AwsIdentityApi {
    #[must_use]
    pub fn new(config: &SdkConfig) -> Self {
        let region = config
            .region()
            .map(ToString::to_string)
            .unwrap_or_else(|| "us-east-1".to_string());
        AwsIdentityApi {
            client: aws_sdk_sts::Client::new(config),
            region,
        }
    }
}

#[async_trait]
impl IdentityApi for AwsIdentityApi {
    async fn account_id(&self, credentials: Option<&Credentials>) -> Result<String> {
        let client = match credentials {
            None => self.client.clone(),
            Some(creds) => {
                let config = super::sdk_config(&self.region, Some(creds)).await;
                aws_sdk_sts::Client::new(&config)
            }
        };
        let output = client
            .get_caller_identity()
            .send()
            .await
            .map_err(|e| super::api_error("sts", e))?;
        output
            .account()
            .map(str::to_string)
            .ok_or_else(|| InventoryError::Api {
                service: "sts",
                message: "caller identity did not include an account id".to_string(),
            })
    }

    async fn assume_role(&self, role_arn: &str) -> Result<Credentials> {
        let output = self
            .client
            .assume_role()
            .role_arn(role_arn)
            .role_session_name(SESSION_NAME)
            .send()
            .await
            .map_err(|e| InventoryError::AssumeRole {
                role_arn: role_arn.to_string(),
                message: format!("{}", DisplayErrorContext(&e)),
            })?;

        let creds = output
            .credentials()
            .ok_or_else(|| InventoryError::AssumeRole {
                role_arn: role_arn.to_string(),
                message: "response carried no credentials".to_string(),
            })?;

        Ok(Credentials {
            access_key_id: creds.access_key_id().to_string(),
            secret_access_key: creds.secret_access_key().to_string(),
            session_token: creds.session_token().to_string(),
        })
    }
}
