// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Cloud resource inventory pipeline.
//!
//! Inventories serverless functions and VM instances across an
//! organization's accounts and regions, normalizes them into attributed
//! resource records, and submits them to a metadata backend.
//!
//! The pipeline has two stages connected by a queue:
//!
//! - [`collector`] enumerates resources (paginated listing APIs, or a
//!   cross-account configuration aggregator), slices them into
//!   transport-sized batches, and publishes each batch.
//! - [`generator`] consumes batches, issues the per-resource describe calls
//!   that fill in full attributes, and submits the resulting records via
//!   [`intake`].
//!
//! Both stages share the [`aws`] API seams, the [`throttle`] call budget and
//! the [`config`] settings struct. In the non-queued deployment mode the
//! collector hands batches directly to the generator in-process.

pub mod arn;
pub mod aws;
pub mod batch;
pub mod collector;
pub mod config;
pub mod error;
pub mod filter;
pub mod generator;
pub mod intake;
pub mod model;
pub mod throttle;

pub use config::InventoryConfig;
pub use error::{InventoryError, Result};
