// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Utilities.

use crate::{tree_index::TreeHeight, Address, OramError};
use rand::seq::SliceRandom;
use rand::{CryptoRng, RngCore};

/// The height `ceil(log2(block_capacity))` of the smallest tree with at least `block_capacity` leaves.
pub(crate) fn tree_height_for(block_capacity: Address) -> Result<TreeHeight, OramError> {
    if block_capacity == 0 {
        return Err(OramError::InvalidConfigurationError);
    }
    let leaves = block_capacity
        .checked_next_power_of_two()
        .ok_or(OramError::InvalidConfigurationError)?;
    Ok(leaves.ilog2().into())
}

/// Keeps a uniformly random subset of `min(k, items.len())` elements of `items`, discarding the rest.
/// The result is deterministic for a seeded `rng`.
pub(crate) fn retain_random_subset<T: Clone, R: RngCore + CryptoRng>(
    items: &mut Vec<T>,
    k: usize,
    rng: &mut R,
) {
    if items.len() <= k {
        return;
    }
    *items = items.choose_multiple(rng, k).cloned().collect();
}
