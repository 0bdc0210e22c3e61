// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! An implementation of Path ORAM.
//!
//! A client keeps a position map and a stash locally, while logical blocks live in a
//! binary tree of fixed-capacity buckets held by an (untrusted) server. Every access reads
//! and rewrites one full root-to-leaf path, chosen by a leaf that was drawn uniformly at
//! random the last time the accessed block was touched.
//!
//! ```
//! use pathoram::{BlockValue, DefaultOram, Oram};
//! use rand::rngs::OsRng;
//!
//! let mut rng = OsRng;
//! let mut oram = DefaultOram::<BlockValue<4>>::new(64, &mut rng).unwrap();
//! assert_eq!(oram.read(3, &mut rng).unwrap(), None);
//! oram.write(3, BlockValue::new([1, 2, 3, 4]), &mut rng).unwrap();
//! assert_eq!(
//!     oram.read(3, &mut rng).unwrap(),
//!     Some(BlockValue::new([1, 2, 3, 4]))
//! );
//! ```

#![warn(clippy::cargo, clippy::doc_markdown, missing_docs, rustdoc::all)]

use rand::{CryptoRng, RngCore};
use std::fmt::Debug;
use std::num::TryFromIntError;
use thiserror::Error;

pub mod block;
pub mod block_value;
pub mod bucket;
pub mod bucket_tree;
pub mod database;
pub mod path_oram;
pub mod position_map;
pub mod shared;
pub mod stash;
pub mod tree_index;
pub(crate) mod utils;

#[cfg(test)]
mod test_utils;

pub use crate::block::Block;
pub use crate::block_value::BlockValue;
pub use crate::path_oram::{DefaultOram, PathOram, DEFAULT_BLOCKS_PER_BUCKET};
pub use crate::shared::SharedOram;

/// The numeric type used to specify the size of an ORAM block in bytes.
pub type BlockSize = usize;
/// The numeric type used to specify the size of an ORAM in blocks, and to index into the ORAM.
pub type Address = u64;
/// The numeric type used to specify the size of an ORAM bucket in blocks.
pub type BucketSize = usize;
/// Numeric type used to represent the size of a Path ORAM stash in blocks.
pub type StashSize = u64;

/// A "trait alias" for ORAM blocks: the values read and written by ORAMs.
pub trait OramBlock: Copy + Clone + Debug + Default + PartialEq {}

impl OramBlock for u8 {}
impl OramBlock for u16 {}
impl OramBlock for u32 {}
impl OramBlock for u64 {}

/// The kind of a single ORAM access.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation<V> {
    /// Return the value stored at the address, leaving it unchanged.
    Read,
    /// Store the given value at the address, returning the value it replaces.
    Write(V),
}

/// A list of error types which are produced during ORAM protocol execution.
#[derive(Error, Debug)]
pub enum OramError {
    /// Errors arising from conversions between integer types.
    #[error("Arithmetic error encountered.")]
    IntegerConversionError(#[from] TryFromIntError),
    /// Errors arising from attempting to make an ORAM access to an invalid address.
    #[error("Attempted to access an out-of-bounds ORAM address.")]
    AddressOutOfBoundsError,
    /// Errors arising from invalid parameters or configuration.
    #[error("Invalid configuration.")]
    InvalidConfigurationError,
    /// A tree level outside `0..=height` was requested.
    #[error("Tree level out of range.")]
    LevelOutOfRangeError,
    /// A block was inserted into a bucket holding no dummy slot.
    #[error("Attempted to insert a block into a full bucket.")]
    BucketFullError,
    /// Two real blocks with the same address were found between the tree and the stash.
    #[error("Found more than one real block for a single address.")]
    DuplicateBlockError,
    /// An earlier access failed partway through; the ORAM state can no longer be trusted.
    #[error("The ORAM is poisoned by an earlier invariant violation.")]
    PoisonedError,
}

impl OramError {
    /// Returns true for errors that indicate corrupted protocol state rather than caller misuse.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            OramError::LevelOutOfRangeError
                | OramError::BucketFullError
                | OramError::DuplicateBlockError
        )
    }
}

/// Represents an oblivious RAM (ORAM) mapping addresses of type `Address` to values of type `V: OramBlock`.
pub trait Oram
where
    Self: Sized,
{
    /// The type of the values stored by this ORAM.
    type V: OramBlock;

    /// Returns the capacity in blocks of this ORAM.
    fn block_capacity(&self) -> Result<Address, OramError>;

    /// Performs an ORAM access.
    /// Returns the value stored at `index` before the access, or `None` if `index` was never written.
    fn access<R: RngCore + CryptoRng>(
        &mut self,
        index: Address,
        operation: Operation<Self::V>,
        rng: &mut R,
    ) -> Result<Option<Self::V>, OramError>;

    /// Obliviously reads the value stored at `index`.
    fn read<R: RngCore + CryptoRng>(
        &mut self,
        index: Address,
        rng: &mut R,
    ) -> Result<Option<Self::V>, OramError> {
        log::debug!("ORAM read: {}", index);
        self.access(index, Operation::Read, rng)
    }

    /// Obliviously writes the value stored at `index`. Returns the value previously stored at `index`.
    fn write<R: RngCore + CryptoRng>(
        &mut self,
        index: Address,
        new_value: Self::V,
        rng: &mut R,
    ) -> Result<Option<Self::V>, OramError> {
        log::debug!("ORAM write: {}", index);
        self.access(index, Operation::Write(new_value), rng)
    }
}
