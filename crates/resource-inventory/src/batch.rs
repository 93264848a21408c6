// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Pure, size-bounded chunking for queue payloads.
//!
//! The queue transport has a maximum message size, so an enumerated sequence
//! is sliced into fixed-size chunks before publishing. The chunk size is a
//! required configuration input tuned to the transport; there is no default.
//!
//! # Guarantees
//!
//! For any input of length `L` and `size > 0`:
//! - `ceil(L / size)` chunks are produced
//! - every chunk has exactly `size` elements except possibly the last
//! - concatenating the chunks reproduces the input exactly

/// Slices `items` into chunks of at most `size` elements, preserving order.
///
/// `size` must be non-zero; it is validated at configuration load.
#[must_use]
pub fn chunk<T>(items: Vec<T>, size: usize) -> Vec<Vec<T>> {
    assert!(size > 0, "chunk size must be non-zero");

    let mut chunks = Vec::with_capacity(items.len().div_ceil(size));
    let mut iter = items.into_iter();
    loop {
        let chunk: Vec<T> = iter.by_ref().take(size).collect();
        if chunk.is_empty() {
            break;
        }
        chunks.push(chunk);
    }
    chunks
}
