// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Candidate filtering: include/exclude ARN patterns and tag matching.
//!
//! Filters apply in a fixed order: include regex, exclude regex, then tag
//! filters. Tag filters are resolved through the tagging API, which returns
//! the set of ARNs matching the requested key/value pairs; the enumerated
//! candidates are intersected with that set.

use std::collections::HashSet;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::aws::tagging::TaggingApi;
use crate::aws::AccountScope;
use crate::error::Result;
use crate::model::CollectorKind;

/// One tag filter: a key and the set of acceptable values (any value when
/// empty). Deserialized from the configured JSON, which uses the tagging
/// API's own `Key`/`Values` spelling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TagFilter {
    #[serde(alias = "key")]
    pub key: String,
    #[serde(default, alias = "values")]
    pub values: Vec<String>,
}

/// The compiled filter set for one resource kind.
#[derive(Debug, Clone, Default)]
pub struct ResourceFilters {
    include: Option<Regex>,
    exclude: Option<Regex>,
    tag_filters: Option<Vec<TagFilter>>,
}

impl ResourceFilters {
    #[must_use]
    pub fn new(
        include: Option<Regex>,
        exclude: Option<Regex>,
        tag_filters: Option<Vec<TagFilter>>,
    ) -> Self {
        ResourceFilters {
            include,
            exclude,
            tag_filters,
        }
    }

    #[must_use]
    pub fn has_tag_filters(&self) -> bool {
        self.tag_filters.as_ref().is_some_and(|f| !f.is_empty())
    }

    #[must_use]
    pub fn tag_filters(&self) -> &[TagFilter] {
        self.tag_filters.as_deref().unwrap_or_default()
    }

    /// Applies the include and exclude patterns to one ARN.
    #[must_use]
    pub fn matches_arn(&self, arn: &str) -> bool {
        if let Some(include) = &self.include {
            if !include.is_match(arn) {
                return false;
            }
        }
        if let Some(exclude) = &self.exclude {
            if exclude.is_match(arn) {
                return false;
            }
        }
        true
    }

    /// Applies all filters to a candidate set, in order: include regex,
    /// exclude regex, tag filters (one tagging API lookup, intersected).
    pub async fn apply<T, F>(
        &self,
        items: Vec<T>,
        arn_of: F,
        tagging: &dyn TaggingApi,
        kind: CollectorKind,
        scope: &AccountScope,
    ) -> Result<Vec<T>>
    where
        F: Fn(&T) -> &str,
    {
        let mut items: Vec<T> = items
            .into_iter()
            .filter(|item| self.matches_arn(arn_of(item)))
            .collect();

        if self.has_tag_filters() {
            let matching: HashSet<String> = tagging
                .resources_matching(scope, kind, self.tag_filters())
                .await?;
            items.retain(|item| matching.contains(arn_of(item)));
        }

        Ok(items)
    }
}
