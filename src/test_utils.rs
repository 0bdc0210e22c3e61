// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! This module contains common test utilities for the `pathoram` crate.

use crate::bucket::Bucket;
use crate::database::{CountAccessesDatabase, Database, SimpleDatabase};
use crate::path_oram::PathOram;
use crate::tree_index::{node_on_path, CompleteBinaryTreeIndex};
use crate::{Address, BucketSize, Operation, Oram, OramBlock, OramError, StashSize};
use duplicate::duplicate_item;
use rand::{
    distributions::{Distribution, Standard},
    rngs::StdRng,
    CryptoRng, Rng, RngCore, SeedableRng,
};
use simplelog::{Config, WriteLogger};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Once;

static INIT: Once = Once::new();

// For use in manual testing and inspection.
pub(crate) fn init_logger() {
    INIT.call_once(|| {
        WriteLogger::init(log::LevelFilter::Info, Config::default(), std::io::stdout()).unwrap()
    })
}

/// An `Oram` that the generic workloads below can construct and inspect.
pub(crate) trait Testable: Oram {
    fn new_for_test<R: RngCore + CryptoRng>(block_capacity: Address, rng: &mut R) -> Self;
    fn test_hook(&self) {}
}

pub(crate) type CountingPathOram<V, const Z: BucketSize> =
    PathOram<V, Z, CountAccessesDatabase<Bucket<V, Z>>>;

#[duplicate_item(
    database_type;
    [SimpleDatabase];
    [CountAccessesDatabase];
)]
impl<V: OramBlock, const Z: BucketSize> Testable for PathOram<V, Z, database_type<Bucket<V, Z>>> {
    fn new_for_test<R: RngCore + CryptoRng>(block_capacity: Address, rng: &mut R) -> Self {
        PathOram::new(block_capacity, rng).unwrap()
    }

    fn test_hook(&self) {
        assert!(!self.is_poisoned());
        assert_block_invariants(self);
    }
}

/// The number of real blocks stored in the tree, excluding the stash.
pub(crate) fn tree_occupancy<V: OramBlock, const Z: BucketSize, D: Database<Bucket<V, Z>>>(
    oram: &PathOram<V, Z, D>,
) -> StashSize {
    let mut result = 0;
    for entry in oram.tree().iter_buckets() {
        let (_, bucket) = entry.unwrap();
        result += bucket.occupancy() as StashSize;
    }
    result
}

/// Checks that every bucket holds exactly `Z` slots, and that every real block sits either in the stash
/// or in a single bucket on the path to its currently assigned leaf. Returns the addresses holding real blocks.
pub(crate) fn assert_block_invariants<V: OramBlock, const Z: BucketSize, D: Database<Bucket<V, Z>>>(
    oram: &PathOram<V, Z, D>,
) -> BTreeSet<Address> {
    let height = oram.height();
    let mut locations: BTreeMap<Address, u64> = BTreeMap::new();

    for entry in oram.tree().iter_buckets() {
        let (bucket_id, bucket) = entry.unwrap();
        assert_eq!(bucket.blocks().len(), Z);

        for block in bucket.blocks() {
            if let Some(address) = block.address() {
                let leaf = oram.position_map().get_leaf(address).unwrap();
                let expected_bucket = node_on_path(leaf, bucket_id.depth(), height).unwrap();
                assert_eq!(
                    bucket_id, expected_bucket,
                    "block {address} is off the path to its leaf {leaf}"
                );
                *locations.entry(address).or_default() += 1;
            }
        }
    }

    for (address, _) in oram.stash().entries() {
        *locations.entry(address).or_default() += 1;
    }

    for (address, count) in &locations {
        assert_eq!(*count, 1, "address {address} has {count} real blocks");
    }

    locations.into_keys().collect()
}

/// Tests the correctness of an `Oram` type T on a workload of random reads and writes.
pub(crate) fn test_correctness_random_workload<T: Testable>(
    capacity: Address,
    num_operations: u32,
) where
    Standard: Distribution<T::V>,
{
    init_logger();
    let mut rng = StdRng::seed_from_u64(0);

    let mut oram = T::new_for_test(capacity, &mut rng);
    let mut mirror_array = vec![None; usize::try_from(capacity).unwrap()];

    for _ in 0..num_operations {
        let random_index = rng.gen_range(0..capacity);
        let slot = usize::try_from(random_index).unwrap();
        let random_block_value = rng.gen::<T::V>();

        let read_versus_write = rng.gen::<bool>();

        if read_versus_write {
            assert_eq!(oram.read(random_index, &mut rng).unwrap(), mirror_array[slot]);
        } else {
            assert_eq!(
                oram.write(random_index, random_block_value, &mut rng)
                    .unwrap(),
                mirror_array[slot]
            );
            mirror_array[slot] = Some(random_block_value);
        }
    }

    for index in 0..capacity {
        let slot = usize::try_from(index).unwrap();
        assert_eq!(oram.read(index, &mut rng).unwrap(), mirror_array[slot], "{index}")
    }

    oram.test_hook();
}

/// Tests the correctness of an `Oram` type T on repeated passes of sequential accesses 0, 1, ..., `capacity`.
pub(crate) fn test_correctness_linear_workload<T: Testable>(capacity: Address, num_operations: u32)
where
    Standard: Distribution<T::V>,
{
    init_logger();
    let mut rng = StdRng::seed_from_u64(0);

    let mut oram = T::new_for_test(capacity, &mut rng);
    let mut mirror_array = vec![None; usize::try_from(capacity).unwrap()];

    let num_passes = u64::from(num_operations) / capacity;

    for _ in 0..num_passes {
        for index in 0..capacity {
            let slot = usize::try_from(index).unwrap();
            let random_block_value = rng.gen::<T::V>();

            let read_versus_write: bool = rng.gen::<bool>();

            if read_versus_write {
                assert_eq!(oram.read(index, &mut rng).unwrap(), mirror_array[slot]);
            } else {
                oram.write(index, random_block_value, &mut rng).unwrap();
                mirror_array[slot] = Some(random_block_value);
            }
        }
    }

    for index in 0..capacity {
        let slot = usize::try_from(index).unwrap();
        assert_eq!(oram.read(index, &mut rng).unwrap(), mirror_array[slot], "{index}")
    }

    oram.test_hook();
}

macro_rules! monitor_boilerplate {
    () => {
        type V = V;

        fn block_capacity(&self) -> Result<crate::Address, crate::OramError> {
            self.oram.block_capacity()
        }
    };
}

/// Checks the block invariants after every access, and that exactly the written addresses hold real blocks.
#[derive(Debug)]
pub(crate) struct InvariantMonitor<V: OramBlock, const Z: BucketSize> {
    oram: PathOram<V, Z>,
    written: BTreeSet<Address>,
}

impl<V: OramBlock, const Z: BucketSize> Oram for InvariantMonitor<V, Z> {
    monitor_boilerplate!();

    fn access<R: RngCore + CryptoRng>(
        &mut self,
        index: Address,
        operation: Operation<V>,
        rng: &mut R,
    ) -> Result<Option<V>, OramError> {
        let is_write = matches!(operation, Operation::Write(_));
        let result = self.oram.access(index, operation, rng)?;
        if is_write {
            self.written.insert(index);
        }

        let holding_real_blocks = assert_block_invariants(&self.oram);
        assert_eq!(holding_real_blocks, self.written);
        Ok(result)
    }
}

impl<V: OramBlock, const Z: BucketSize> Testable for InvariantMonitor<V, Z> {
    fn new_for_test<R: RngCore + CryptoRng>(block_capacity: Address, rng: &mut R) -> Self {
        Self {
            oram: PathOram::new(block_capacity, rng).unwrap(),
            written: BTreeSet::new(),
        }
    }
}

/// Checks that every access reads and writes each bucket on the path to the accessed address's
/// previous leaf exactly once, and touches no other bucket.
#[derive(Debug)]
pub(crate) struct PathLocalityMonitor<V: OramBlock, const Z: BucketSize> {
    oram: CountingPathOram<V, Z>,
    accesses_checked: u64,
}

impl<V: OramBlock, const Z: BucketSize> PathLocalityMonitor<V, Z> {
    pub(crate) fn accesses_checked(&self) -> u64 {
        self.accesses_checked
    }
}

impl<V: OramBlock, const Z: BucketSize> Oram for PathLocalityMonitor<V, Z> {
    monitor_boilerplate!();

    fn access<R: RngCore + CryptoRng>(
        &mut self,
        index: Address,
        operation: Operation<V>,
        rng: &mut R,
    ) -> Result<Option<V>, OramError> {
        let position = self.oram.position_map().get_leaf(index)?;
        let reads_before = self.oram.tree().physical_memory().reads.clone();
        let writes_before = self.oram.tree().physical_memory().writes.clone();

        let result = self.oram.access(index, operation, rng)?;

        let path: BTreeSet<u64> = self.oram.tree().path_of(position)?.into_iter().collect();
        assert_eq!(path.len() as u64, self.oram.height() + 1);

        let memory = self.oram.tree().physical_memory();
        for bucket_id in 0..self.oram.tree().bucket_count() {
            let i = usize::try_from(bucket_id)?;
            let expected = u64::from(path.contains(&bucket_id));
            assert_eq!(memory.reads[i] - reads_before[i], expected, "read of {bucket_id}");
            assert_eq!(memory.writes[i] - writes_before[i], expected, "write of {bucket_id}");
        }

        self.accesses_checked += 1;
        Ok(result)
    }
}

impl<V: OramBlock, const Z: BucketSize> Testable for PathLocalityMonitor<V, Z> {
    fn new_for_test<R: RngCore + CryptoRng>(block_capacity: Address, rng: &mut R) -> Self {
        let mut oram: CountingPathOram<V, Z> = PathOram::new(block_capacity, rng).unwrap();
        oram.reset_access_counts();
        Self {
            oram,
            accesses_checked: 0,
        }
    }

    fn test_hook(&self) {
        let memory = self.oram.tree().physical_memory();
        assert_eq!(memory.reads, memory.writes);
        assert_eq!(
            memory.reads[0], self.accesses_checked,
            "the root lies on every path"
        );
    }
}

/// The stash occupancy that `StashSizeMonitor` treats as a regression.
pub(crate) const STASH_SIZE_BOUND: StashSize = 40;

/// Checks that the stash stays small after every access.
#[derive(Debug)]
pub(crate) struct StashSizeMonitor<V: OramBlock, const Z: BucketSize> {
    oram: PathOram<V, Z>,
}

impl<V: OramBlock, const Z: BucketSize> Oram for StashSizeMonitor<V, Z> {
    monitor_boilerplate!();

    fn access<R: RngCore + CryptoRng>(
        &mut self,
        index: Address,
        operation: Operation<V>,
        rng: &mut R,
    ) -> Result<Option<V>, OramError> {
        let result = self.oram.access(index, operation, rng)?;
        let stash_size = self.oram.stash_occupancy()?;
        assert!(stash_size < STASH_SIZE_BOUND, "{stash_size}");
        Ok(result)
    }
}

impl<V: OramBlock, const Z: BucketSize> Testable for StashSizeMonitor<V, Z> {
    fn new_for_test<R: RngCore + CryptoRng>(block_capacity: Address, rng: &mut R) -> Self {
        Self {
            oram: PathOram::new(block_capacity, rng).unwrap(),
        }
    }

    fn test_hook(&self) {
        assert_eq!(self.oram.stash_overflow_count(), 0);
    }
}

macro_rules! create_correctness_test {
    ($function_name:ident, $oram_type:ident, $bucket_size:expr, $block_capacity:expr, $iterations_to_test:expr) => {
        paste::paste! {
            #[test]
            fn [<$function_name _ $oram_type:snake _ $bucket_size _ $block_capacity _ $iterations_to_test>]() {
                $function_name::<$oram_type<crate::block_value::BlockValue<8>, $bucket_size>>($block_capacity, $iterations_to_test);
            }
        }
    };
}

macro_rules! create_correctness_tests_for_workload_and_oram_type {
    ($function_name:ident, $oram_type:ident) => {
        create_correctness_test!($function_name, $oram_type, 4, 1, 10);
        create_correctness_test!($function_name, $oram_type, 4, 2, 10);
        create_correctness_test!($function_name, $oram_type, 4, 8, 100);
        create_correctness_test!($function_name, $oram_type, 1, 8, 100);
        create_correctness_test!($function_name, $oram_type, 2, 16, 100);
        create_correctness_test!($function_name, $oram_type, 3, 16, 200);
        // Block capacities that are not powers of two.
        create_correctness_test!($function_name, $oram_type, 4, 5, 100);
        create_correctness_test!($function_name, $oram_type, 5, 100, 500);
        create_correctness_test!($function_name, $oram_type, 4, 64, 1000);
    };
}

macro_rules! create_path_oram_correctness_tests {
    ($oram_type:ident) => {
        create_correctness_tests_for_workload_and_oram_type!(
            test_correctness_linear_workload,
            $oram_type
        );
        create_correctness_tests_for_workload_and_oram_type!(
            test_correctness_random_workload,
            $oram_type
        );
    };
}

macro_rules! create_path_oram_stash_size_tests {
    ($oram_type:ident) => {
        create_correctness_test!(test_correctness_linear_workload, $oram_type, 4, 64, 1000);
        create_correctness_test!(test_correctness_random_workload, $oram_type, 4, 64, 1000);
        create_correctness_test!(test_correctness_random_workload, $oram_type, 4, 1024, 4000);
        create_correctness_test!(test_correctness_random_workload, $oram_type, 5, 1000, 4000);
    };
}

pub(crate) use create_correctness_test;
pub(crate) use create_correctness_tests_for_workload_and_oram_type;
pub(crate) use create_path_oram_correctness_tests;
pub(crate) use create_path_oram_stash_size_tests;
