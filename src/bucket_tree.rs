// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! The server-held tree of Path ORAM buckets.

use crate::{
    bucket::Bucket,
    database::{Database, SimpleDatabase},
    tree_index::{self, BucketId, LeafIndex, TreeHeight, MAXIMUM_TREE_HEIGHT},
    BucketSize, OramBlock, OramError,
};

/// A complete binary tree of `Bucket`s of height `height`, stored breadth-first in a `Database`.
///
/// Bucket `i` has parent `(i - 1) / 2` and children `2i + 1`, `2i + 2`
/// (see [`tree_index`](crate::tree_index)). Every bucket starts out holding `Z` dummies.
#[derive(Debug)]
pub struct BucketTree<V: OramBlock, const Z: BucketSize, D = SimpleDatabase<Bucket<V, Z>>> {
    /// The buckets, indexed by `BucketId`.
    pub(crate) physical_memory: D,
    height: TreeHeight,
    _marker: std::marker::PhantomData<V>,
}

impl<V: OramBlock, const Z: BucketSize, D: Database<Bucket<V, Z>>> BucketTree<V, Z, D> {
    /// Builds a tree of height `height` whose buckets are all empty.
    ///
    /// # Errors
    ///
    /// Returns an `InvalidConfigurationError` if `Z` is 0 or `height` exceeds the supported maximum.
    pub fn new(height: TreeHeight) -> Result<Self, OramError> {
        if Z == 0 || height > MAXIMUM_TREE_HEIGHT {
            return Err(OramError::InvalidConfigurationError);
        }

        let physical_memory = D::new(tree_index::bucket_count(height))?;
        Ok(Self {
            physical_memory,
            height,
            _marker: std::marker::PhantomData,
        })
    }

    /// The height of the tree; leaves sit at level `height` and the root at level 0.
    pub fn height(&self) -> TreeHeight {
        self.height
    }

    /// The number of leaves, `2^height`.
    pub fn leaf_count(&self) -> u64 {
        tree_index::leaf_count(self.height)
    }

    /// The total number of buckets, `2^(height + 1) - 1`.
    pub fn bucket_count(&self) -> u64 {
        tree_index::bucket_count(self.height)
    }

    /// The leaf bucket with leaf index `leaf`.
    pub fn leaf(&self, leaf: LeafIndex) -> Result<&Bucket<V, Z>, OramError> {
        self.physical_memory
            .peek(tree_index::leaf_bucket(leaf, self.height)?)
    }

    /// The bucket at level `level` on the path to leaf `leaf`.
    ///
    /// # Errors
    ///
    /// Returns a `LevelOutOfRangeError` if `level > height`.
    pub fn ancestor(&self, leaf: LeafIndex, level: TreeHeight) -> Result<&Bucket<V, Z>, OramError> {
        self.physical_memory
            .peek(tree_index::node_on_path(leaf, level, self.height)?)
    }

    /// The identifiers of the buckets on the path to `leaf`, ordered from the root (index 0) to the leaf (index `height`).
    pub fn path_of(&self, leaf: LeafIndex) -> Result<Vec<BucketId>, OramError> {
        (0..=self.height)
            .map(|level| tree_index::node_on_path(leaf, level, self.height))
            .collect()
    }

    /// Fetches the bucket `id` from physical memory. This counts as a physical access.
    pub fn read_bucket(&mut self, id: BucketId) -> Result<Bucket<V, Z>, OramError> {
        self.physical_memory.read_db(id)
    }

    /// Stores `bucket` at `id` in physical memory. This counts as a physical access.
    pub fn write_bucket(&mut self, id: BucketId, bucket: Bucket<V, Z>) -> Result<(), OramError> {
        self.physical_memory.write_db(id, bucket)?;
        Ok(())
    }

    /// Iterates over all `(id, bucket)` pairs in breadth-first order, without counting as physical accesses.
    pub fn iter_buckets(
        &self,
    ) -> impl Iterator<Item = Result<(BucketId, &Bucket<V, Z>), OramError>> + '_ {
        (0..self.bucket_count()).map(move |id| Ok((id, self.physical_memory.peek(id)?)))
    }

    /// The underlying physical memory.
    pub fn physical_memory(&self) -> &D {
        &self.physical_memory
    }

    /// The underlying physical memory, mutably (e.g. to reset access counters).
    pub fn physical_memory_mut(&mut self) -> &mut D {
        &mut self.physical_memory
    }
}
