// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! A Path ORAM bucket.

use crate::{block::Block, Address, BucketSize, OramBlock, OramError};

#[derive(Clone, Copy, PartialEq)]
/// A Path ORAM bucket: exactly `Z` block slots, each either real or dummy.
pub struct Bucket<V: OramBlock, const Z: BucketSize> {
    /// The Path ORAM blocks stored by this bucket.
    pub(crate) blocks: [Block<V>; Z],
}

impl<V: OramBlock, const Z: BucketSize> Bucket<V, Z> {
    /// The blocks of this bucket, real and dummy. Always of length `Z`.
    pub fn blocks(&self) -> &[Block<V>; Z] {
        &self.blocks
    }

    /// Places `block` in the first dummy slot.
    ///
    /// # Errors
    ///
    /// Returns a `BucketFullError` if every slot already holds a real block.
    pub fn insert(&mut self, block: Block<V>) -> Result<(), OramError> {
        match self.blocks.iter_mut().find(|slot| slot.is_dummy()) {
            Some(slot) => {
                *slot = block;
                Ok(())
            }
            None => Err(OramError::BucketFullError),
        }
    }

    /// Removes and returns the `(address, value)` pairs of every real block,
    /// leaving the bucket filled with dummies.
    pub fn drain_and_reset(&mut self) -> Vec<(Address, V)> {
        let mut result = Vec::new();
        for slot in self.blocks.iter_mut() {
            if let Block::Real { address, value } = *slot {
                result.push((address, value));
            }
            *slot = Block::Dummy;
        }
        result
    }

    /// The number of real blocks in this bucket.
    pub fn occupancy(&self) -> usize {
        self.blocks.iter().filter(|block| !block.is_dummy()).count()
    }

    /// The number of dummy slots in this bucket.
    pub fn free_slots(&self) -> usize {
        Z - self.occupancy()
    }
}

impl<V: OramBlock, const Z: BucketSize> std::fmt::Debug for Bucket<V, Z> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.occupancy() == 0 {
            write!(f, "Bucket::Dummy")
        } else {
            f.debug_struct("Bucket")
                .field("blocks", &self.blocks)
                .finish()
        }
    }
}

impl<V: OramBlock, const Z: BucketSize> Default for Bucket<V, Z> {
    fn default() -> Self {
        Self {
            blocks: [Block::<V>::Dummy; Z],
        }
    }
}

impl<V: OramBlock, const Z: BucketSize> OramBlock for Bucket<V, Z> {}
