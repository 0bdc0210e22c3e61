// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! The client-side Path ORAM stash.

use crate::{block::Block, Address, OramBlock, OramError, StashSize};
use std::collections::BTreeMap;

/// Holds real blocks between their removal from the tree and their eviction back into it.
///
/// The stash has no hard capacity; its occupancy stays small with overwhelming probability
/// for reasonable bucket sizes, and growth beyond that is reported by the owning ORAM.
/// Entries are kept in address order, so that iteration (and therefore eviction under a seeded rng)
/// is deterministic.
#[derive(Debug)]
pub struct Stash<V: OramBlock> {
    blocks: BTreeMap<Address, V>,
}

impl<V: OramBlock> Default for Stash<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: OramBlock> Stash<V> {
    /// Returns an empty stash.
    pub fn new() -> Self {
        Self {
            blocks: BTreeMap::new(),
        }
    }

    /// Stores `value` for `address`, overwriting any value already held. Returns the overwritten value.
    pub fn put(&mut self, address: Address, value: V) -> Option<V> {
        self.blocks.insert(address, value)
    }

    /// Stores a block just read from the tree.
    ///
    /// # Errors
    ///
    /// Returns a `DuplicateBlockError` if the stash already holds a block for `address`;
    /// the existing block is left untouched.
    pub fn insert_unique(&mut self, address: Address, value: V) -> Result<(), OramError> {
        match self.blocks.entry(address) {
            std::collections::btree_map::Entry::Occupied(_) => {
                Err(OramError::DuplicateBlockError)
            }
            std::collections::btree_map::Entry::Vacant(slot) => {
                slot.insert(value);
                Ok(())
            }
        }
    }

    /// The block held for `address`, or `Block::Dummy` if there is none.
    pub fn take(&self, address: Address) -> Block<V> {
        match self.blocks.get(&address) {
            Some(value) => Block::real(address, *value),
            None => Block::Dummy,
        }
    }

    /// Removes and returns the value held for `address`.
    pub fn remove(&mut self, address: Address) -> Option<V> {
        self.blocks.remove(&address)
    }

    /// Iterates over `(address, value)` pairs in ascending address order.
    pub fn entries(&self) -> impl Iterator<Item = (Address, &V)> + '_ {
        self.blocks.iter().map(|(address, value)| (*address, value))
    }

    /// Whether a block is held for `address`.
    pub fn contains(&self, address: Address) -> bool {
        self.blocks.contains_key(&address)
    }

    /// The number of blocks held.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Whether the stash is empty.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// The number of blocks held, as a `StashSize`.
    pub fn occupancy(&self) -> Result<StashSize, OramError> {
        Ok(self.len().try_into()?)
    }
}
