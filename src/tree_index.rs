// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Index arithmetic for a complete binary tree stored as a flat array.
//!
//! Buckets are numbered in breadth-first order starting from 0 at the root, so that
//! `parent(i) = (i - 1) / 2` and `children(i) = (2i + 1, 2i + 2)`.
//! Leaves are identified separately by a leaf index in `0..2^height`; the leaf with index `l`
//! is stored at bucket `2^height - 1 + l`. Under this numbering the ancestor of leaf `l` at level
//! `d` (0 = root) is the bucket `2^d - 1 + (l >> (height - d))`, so two leaves share their
//! level-`d` ancestor exactly when the top `d` bits of their leaf indices agree.

use crate::OramError;
use rand::{CryptoRng, Rng, RngCore};
use subtle::{Choice, ConstantTimeEq};

/// The identifier of a bucket in the flat tree array.
pub type BucketId = u64;
/// The index of a leaf, in `0..2^height`.
pub type LeafIndex = u64;
/// The height of a tree, or the level of a node within it (0 = root).
pub type TreeHeight = u64;

/// The largest supported tree height; keeps the bucket count representable as a `u64`.
pub const MAXIMUM_TREE_HEIGHT: TreeHeight = 62;

/// Navigation within a complete binary tree numbered in breadth-first order.
pub trait CompleteBinaryTreeIndex
where
    Self: Sized,
{
    /// The parent of this node, or `None` for the root.
    fn parent(&self) -> Option<Self>;
    /// The left and right children of this node, or `None` if it sits at depth `height`.
    fn children(&self, height: TreeHeight) -> Option<(Self, Self)>;
    /// The level of this node; the root has depth 0.
    fn depth(&self) -> TreeHeight;
    /// Whether this node is a leaf of a tree of height `height`.
    fn is_leaf(&self, height: TreeHeight) -> bool;
}

impl CompleteBinaryTreeIndex for BucketId {
    fn parent(&self) -> Option<Self> {
        if *self == 0 {
            None
        } else {
            Some((self - 1) / 2)
        }
    }

    fn children(&self, height: TreeHeight) -> Option<(Self, Self)> {
        if self.depth() >= height {
            None
        } else {
            Some((2 * self + 1, 2 * self + 2))
        }
    }

    fn depth(&self) -> TreeHeight {
        let leading_zeroes: u64 = (self + 1).leading_zeros().into();
        let index_bitlength = 64;
        index_bitlength - leading_zeroes - 1
    }

    fn is_leaf(&self, height: TreeHeight) -> bool {
        self.depth() == height
    }
}

/// The number of leaves of a tree of height `height`.
pub fn leaf_count(height: TreeHeight) -> u64 {
    1u64 << height
}

/// The number of buckets of a tree of height `height`.
pub fn bucket_count(height: TreeHeight) -> u64 {
    (1u64 << (height + 1)) - 1
}

/// Returns the bucket at level `level` on the path from the root to leaf `leaf`.
///
/// # Errors
///
/// Returns a `LevelOutOfRangeError` if `level > height`,
/// and an `AddressOutOfBoundsError` if `leaf` is not a leaf index of the tree.
pub fn node_on_path(
    leaf: LeafIndex,
    level: TreeHeight,
    height: TreeHeight,
) -> Result<BucketId, OramError> {
    if level > height {
        return Err(OramError::LevelOutOfRangeError);
    }
    if leaf >= leaf_count(height) {
        return Err(OramError::AddressOutOfBoundsError);
    }
    let shift = height - level;
    Ok((1u64 << level) - 1 + (leaf >> shift))
}

/// Returns the bucket storing leaf `leaf`.
pub fn leaf_bucket(leaf: LeafIndex, height: TreeHeight) -> Result<BucketId, OramError> {
    node_on_path(leaf, height, height)
}

/// Draws a leaf index uniformly at random from `0..2^height`.
pub fn random_leaf<R: RngCore + CryptoRng>(height: TreeHeight, rng: &mut R) -> LeafIndex {
    rng.gen_range(0..leaf_count(height))
}

/// Whether leaves `a` and `b` share their ancestor at level `level`, i.e. agree on their top `level` bits.
/// Runs in time independent of the leaf values.
pub fn ct_shares_prefix(
    a: LeafIndex,
    b: LeafIndex,
    level: TreeHeight,
    height: TreeHeight,
) -> Choice {
    let shift = height - level;
    (a >> shift).ct_eq(&(b >> shift))
}
