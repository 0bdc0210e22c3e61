// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! A Path ORAM position map, held by the client.

use crate::{
    tree_index::{random_leaf, LeafIndex, TreeHeight},
    Address, OramError,
};
use log::debug;
use rand::{CryptoRng, RngCore};

/// Maps each address in `0..block_capacity` to the leaf whose path may hold its block.
#[derive(Debug)]
pub struct PositionMap {
    positions: Vec<LeafIndex>,
    height: TreeHeight,
}

impl PositionMap {
    /// Returns a position map for `block_capacity` addresses, each assigned an independent uniformly random leaf
    /// of a tree of height `height`.
    pub fn new<R: RngCore + CryptoRng>(
        block_capacity: Address,
        height: TreeHeight,
        rng: &mut R,
    ) -> Result<Self, OramError> {
        debug!(
            "PositionMap::new(C = {}, height = {})",
            block_capacity, height
        );

        let mut positions = Vec::with_capacity(block_capacity.try_into()?);
        for _ in 0..block_capacity {
            positions.push(random_leaf(height, rng));
        }
        Ok(Self { positions, height })
    }

    fn slot(&self, address: Address) -> Result<usize, OramError> {
        let index: usize = address.try_into()?;
        if index >= self.positions.len() {
            return Err(OramError::AddressOutOfBoundsError);
        }
        Ok(index)
    }

    /// The leaf currently assigned to `address`.
    ///
    /// # Errors
    ///
    /// Returns an `AddressOutOfBoundsError` if `address` is not below the block capacity.
    pub fn get_leaf(&self, address: Address) -> Result<LeafIndex, OramError> {
        Ok(self.positions[self.slot(address)?])
    }

    /// Assigns `address` a fresh leaf drawn uniformly at random, independently of its previous leaf,
    /// and returns the new leaf.
    pub fn remap<R: RngCore + CryptoRng>(
        &mut self,
        address: Address,
        rng: &mut R,
    ) -> Result<LeafIndex, OramError> {
        let index = self.slot(address)?;
        let new_leaf = random_leaf(self.height, rng);
        self.positions[index] = new_leaf;
        Ok(new_leaf)
    }

    /// The height of the tree whose leaves this map assigns.
    pub fn height(&self) -> TreeHeight {
        self.height
    }

    /// The number of addresses mapped.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Whether the map holds no addresses.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}
