// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! An implementation of Path ORAM.

use crate::{
    block::Block,
    bucket::Bucket,
    bucket_tree::BucketTree,
    database::{CountAccessesDatabase, Database, SimpleDatabase},
    position_map::PositionMap,
    stash::Stash,
    tree_index::{ct_shares_prefix, BucketId, LeafIndex, TreeHeight},
    utils::{retain_random_subset, tree_height_for},
    Address, BucketSize, Operation, Oram, OramBlock, OramError, StashSize,
};
use rand::{CryptoRng, RngCore};

/// The parameter "Z" from the Path ORAM literature that sets the number of blocks per bucket; typical values are 3 or 4.
/// Here we adopt the more conservative setting of 4.
pub const DEFAULT_BLOCKS_PER_BUCKET: BucketSize = 4;

/// The default stash occupancy above which accesses are reported as stash overflows.
pub const DEFAULT_STASH_OVERFLOW_SIZE: StashSize = 40;

/// A Path ORAM client together with the (in-memory) server tree it accesses.
///
/// ## Parameters
///
/// - Block type `V`: the type of elements stored by the ORAM.
/// - Bucket size `Z`: the number of blocks per Path ORAM bucket. Must be at least 1;
///     typical values are 3, 4, or 5. Small values make the stash grow.
/// - Physical memory `D`: the storage holding the tree's buckets.
///     `CountAccessesDatabase` can be substituted to observe which buckets each access touches.
/// - Overflow size: the stash occupancy above which an access is logged and counted as a stash overflow.
///     The stash itself is unbounded, so this is an operational signal, not a limit.
///
/// ## Security
///
/// Every access reads and then rewrites exactly the buckets on the path to a leaf that was chosen
/// uniformly at random, independently of everything else, the previous time the accessed address was touched.
/// The set of buckets touched therefore reveals nothing about the address, the kind of operation or the value.
/// The time taken by an access does depend on the stash occupancy, and bucket contents are stored in the clear;
/// encrypting buckets before they reach an untrusted server is left to the `Database` implementation.
///
/// An instance must not be accessed concurrently; wrap it in a [`SharedOram`](crate::SharedOram) to share it.
#[derive(Debug)]
pub struct PathOram<V: OramBlock, const Z: BucketSize, D = SimpleDatabase<Bucket<V, Z>>> {
    /// The server-held bucket tree.
    tree: BucketTree<V, Z, D>,
    /// The Path ORAM stash.
    stash: Stash<V>,
    /// The Path ORAM position map.
    position_map: PositionMap,
    block_capacity: Address,
    stash_overflow_size: StashSize,
    max_stash_occupancy: StashSize,
    stash_overflow_count: u64,
    /// Set once an access fails after remapping its address; all later accesses are refused.
    poisoned: bool,
}

/// A `PathOram` with the default bucket size, backed by a plain in-memory tree.
pub type DefaultOram<V> = PathOram<V, DEFAULT_BLOCKS_PER_BUCKET>;

impl<V: OramBlock, const Z: BucketSize, D: Database<Bucket<V, Z>>> PathOram<V, Z, D> {
    /// Returns a new `PathOram` for addresses `0 <= address < block_capacity`, none of which hold a value yet.
    ///
    /// # Errors
    ///
    /// Returns an `InvalidConfigurationError` if `block_capacity` or `Z` is 0,
    /// or if `block_capacity` needs a tree taller than the supported maximum.
    pub fn new<R: RngCore + CryptoRng>(
        block_capacity: Address,
        rng: &mut R,
    ) -> Result<Self, OramError> {
        Self::new_with_parameters(block_capacity, rng, DEFAULT_STASH_OVERFLOW_SIZE)
    }

    /// Returns a new `PathOram` for addresses `0 <= address < block_capacity`,
    /// with a stash overflow size of `stash_overflow_size` blocks (see [`PathOram`]).
    ///
    /// The tree has height `ceil(log2(block_capacity))`, so `block_capacity` need not be a power of two.
    ///
    /// # Errors
    ///
    /// Returns an `InvalidConfigurationError` in the following cases.
    ///
    /// - `block_capacity` is 0.
    /// - `Z` is 0.
    /// - The tree would be taller than the supported maximum.
    pub fn new_with_parameters<R: RngCore + CryptoRng>(
        block_capacity: Address,
        rng: &mut R,
        stash_overflow_size: StashSize,
    ) -> Result<Self, OramError> {
        if Z == 0 {
            return Err(OramError::InvalidConfigurationError);
        }

        let height = tree_height_for(block_capacity)?;

        log::info!(
            "PathOram::new(capacity = {}, Z = {}, height = {})",
            block_capacity,
            Z,
            height
        );

        let tree = BucketTree::new(height)?;
        let position_map = PositionMap::new(block_capacity, height, rng)?;

        Ok(Self {
            tree,
            stash: Stash::new(),
            position_map,
            block_capacity,
            stash_overflow_size,
            max_stash_occupancy: 0,
            stash_overflow_count: 0,
            poisoned: false,
        })
    }

    /// The height of the bucket tree.
    pub fn height(&self) -> TreeHeight {
        self.tree.height()
    }

    /// The number of blocks currently held in the stash.
    pub fn stash_occupancy(&self) -> Result<StashSize, OramError> {
        self.stash.occupancy()
    }

    /// The largest stash occupancy observed at the end of any access so far.
    pub fn max_stash_occupancy(&self) -> StashSize {
        self.max_stash_occupancy
    }

    /// The number of accesses that ended with the stash holding more than the overflow size.
    pub fn stash_overflow_count(&self) -> u64 {
        self.stash_overflow_count
    }

    /// Whether an earlier access failed partway through, leaving the instance unusable.
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// The bucket tree.
    pub fn tree(&self) -> &BucketTree<V, Z, D> {
        &self.tree
    }

    /// The bucket tree, mutably.
    #[cfg(test)]
    pub(crate) fn tree_mut(&mut self) -> &mut BucketTree<V, Z, D> {
        &mut self.tree
    }

    /// The stash.
    pub fn stash(&self) -> &Stash<V> {
        &self.stash
    }

    /// The position map.
    pub fn position_map(&self) -> &PositionMap {
        &self.position_map
    }

    /// Reads every bucket of `path` (leaf first), moving its real blocks into the stash.
    /// Returns the emptied buckets in the same root-to-leaf order as `path`.
    fn read_path(&mut self, path: &[BucketId]) -> Result<Vec<Bucket<V, Z>>, OramError> {
        let mut buckets = Vec::with_capacity(path.len());

        for bucket_id in path.iter().rev() {
            let mut bucket = self.tree.read_bucket(*bucket_id)?;
            for (address, value) in bucket.drain_and_reset() {
                self.stash.insert_unique(address, value)?;
            }
            buckets.push(bucket);
        }

        buckets.reverse();
        Ok(buckets)
    }

    /// Evicts blocks from the stash into `buckets`, the emptied buckets of the path to `position`,
    /// deepest level first, then writes the whole path back to the tree.
    fn write_path<R: RngCore + CryptoRng>(
        &mut self,
        path: &[BucketId],
        mut buckets: Vec<Bucket<V, Z>>,
        position: LeafIndex,
        rng: &mut R,
    ) -> Result<(), OramError> {
        let height = self.tree.height();

        for (level, bucket) in buckets.iter_mut().enumerate().rev() {
            let level: TreeHeight = level.try_into()?;

            // Blocks whose assigned path passes through this bucket.
            let mut candidates = Vec::new();
            for (address, _) in self.stash.entries() {
                let block_position = self.position_map.get_leaf(address)?;
                if ct_shares_prefix(block_position, position, level, height).into() {
                    candidates.push(address);
                }
            }

            retain_random_subset(&mut candidates, bucket.free_slots(), rng);

            for address in candidates {
                if let Some(value) = self.stash.remove(address) {
                    bucket.insert(Block::real(address, value))?;
                }
            }
        }

        for (bucket_id, bucket) in path.iter().zip(buckets) {
            self.tree.write_bucket(*bucket_id, bucket)?;
        }

        Ok(())
    }

    /// Runs the read, serve and evict phases along the path to `position`, the leaf `address`
    /// was mapped to before this access remapped it.
    fn access_path<R: RngCore + CryptoRng>(
        &mut self,
        address: Address,
        position: LeafIndex,
        operation: Operation<V>,
        rng: &mut R,
    ) -> Result<Option<V>, OramError> {
        let path = self.tree.path_of(position)?;
        let buckets = self.read_path(&path)?;

        let result = self.stash.take(address).value();
        if let Operation::Write(value) = operation {
            self.stash.put(address, value);
        }

        self.write_path(&path, buckets, position, rng)?;

        Ok(result)
    }

    fn record_stash_occupancy(&mut self) -> Result<(), OramError> {
        let occupancy = self.stash.occupancy()?;
        self.max_stash_occupancy = self.max_stash_occupancy.max(occupancy);
        if occupancy > self.stash_overflow_size {
            self.stash_overflow_count += 1;
            log::warn!(
                "Stash occupancy {} exceeds overflow size {} ({} overflows so far)",
                occupancy,
                self.stash_overflow_size,
                self.stash_overflow_count
            );
        }
        Ok(())
    }
}

impl<V: OramBlock, const Z: BucketSize> PathOram<V, Z, CountAccessesDatabase<Bucket<V, Z>>> {
    /// Zeroes the physical read and write counters of the underlying memory.
    pub fn reset_access_counts(&mut self) {
        self.tree.physical_memory_mut().reset_counts();
    }
}

impl<V: OramBlock, const Z: BucketSize, D: Database<Bucket<V, Z>>> Oram for PathOram<V, Z, D> {
    type V = V;

    fn access<R: RngCore + CryptoRng>(
        &mut self,
        address: Address,
        operation: Operation<V>,
        rng: &mut R,
    ) -> Result<Option<V>, OramError> {
        if self.poisoned {
            return Err(OramError::PoisonedError);
        }

        // This check leaks only whether the address is well-formed.
        if address >= self.block_capacity {
            return Err(OramError::AddressOutOfBoundsError);
        }

        // Get the position of the target block, and assign it a fresh random position for next time.
        // This access reads and evicts along the old position only.
        let position = self.position_map.get_leaf(address)?;
        let new_position = self.position_map.remap(address, rng)?;
        log::debug!(
            "PathOram access: path {} (next position {} kept client-side)",
            position,
            new_position
        );

        // From here on the block may sit off the path to its mapped leaf until eviction completes,
        // so any failure leaves the instance in an unusable state.
        match self.access_path(address, position, operation, rng) {
            Ok(result) => {
                self.record_stash_occupancy()?;
                Ok(result)
            }
            Err(error) => {
                if error.is_invariant_violation() {
                    log::error!("PathOram invariant violated, refusing further accesses: {error}");
                } else {
                    log::error!("PathOram access aborted after remapping, refusing further accesses: {error}");
                }
                self.poisoned = true;
                Err(error)
            }
        }
    }

    fn block_capacity(&self) -> Result<Address, OramError> {
        Ok(self.block_capacity)
    }
}
