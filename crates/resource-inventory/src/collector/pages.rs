// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Cursor-driven pagination over the provider listing APIs.
//!
//! Pagination state is a first-class object: the collector pulls pages one at
//! a time and the cursor lives here, not in implicit control flow. A
//! throttled page request sleeps a fixed backoff and retries the same page
//! indefinitely; any other error propagates as a fatal enumeration error for
//! the scope being listed.

use std::time::Duration;

use tokio::time::sleep;
use tracing::warn;

use crate::aws::ec2::InstancesApi;
use crate::aws::lambda::FunctionsApi;
use crate::aws::AccountScope;
use crate::error::Result;
use crate::model::{FunctionSummary, InstanceSnapshot};

/// Fixed backoff between retries of a throttled page request.
const ENUMERATION_BACKOFF: Duration = Duration::from_secs(30);

pub struct FunctionPages<'a> {
    api: &'a dyn FunctionsApi,
    scope: &'a AccountScope,
    cursor: Option<String>,
    done: bool,
}

impl<'a> FunctionPages<'a> {
    #[must_use]
    pub fn new(api: &'a dyn FunctionsApi, scope: &'a AccountScope) -> Self {
        FunctionPages {
            api,
            scope,
            cursor: None,
            done: false,
        }
    }

    /// Fetches the next page, or `None` once the listing is exhausted.
    pub async fn next_page(&mut self) -> Result<Option<Vec<FunctionSummary>>> {
        if self.done {
            return Ok(None);
        }
        loop {
            match self.api.list_page(self.scope, self.cursor.clone()).await {
                Ok(page) => {
                    self.cursor = page.next;
                    self.done = self.cursor.is_none();
                    return Ok(Some(page.functions));
                }
                Err(e) if e.is_throttled() => {
                    warn!(
                        "{e}; retrying the page in {}s",
                        ENUMERATION_BACKOFF.as_secs()
                    );
                    sleep(ENUMERATION_BACKOFF).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

pub struct InstancePages<'a> {
    api: &'a dyn InstancesApi,
    scope: &'a AccountScope,
    cursor: Option<String>,
    done: bool,
}

impl<'a> InstancePages<'a> {
    #[must_use]
    pub fn new(api: &'a dyn InstancesApi, scope: &'a AccountScope) -> Self {
        InstancePages {
            api,
            scope,
            cursor: None,
            done: false,
        }
    }

    /// Fetches the next page, or `None` once the listing is exhausted.
    pub async fn next_page(&mut self) -> Result<Option<Vec<InstanceSnapshot>>> {
        if self.done {
            return Ok(None);
        }
        loop {
            match self.api.describe_page(self.scope, self.cursor.clone()).await {
                Ok(page) => {
                    self.cursor = page.next;
                    self.done = self.cursor.is_none();
                    return Ok(Some(page.instances));
                }
                Err(e) if e.is_throttled() => {
                    warn!(
                        "{e}; retrying the page in {}s",
                        ENUMERATION_BACKOFF.as_secs()
                    );
                    sleep(ENUMERATION_BACKOFF).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
