// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Implements a generic ORAM value `BlockValue` consisting of unstructured bytes.

use crate::BlockSize;
use crate::OramBlock;
use rand::{
    distributions::{Distribution, Standard},
    Rng,
};
use subtle::{Choice, ConstantTimeEq};

#[derive(Clone, Copy, Debug)]
/// An `OramBlock` consisting of unstructured bytes.
pub struct BlockValue<const B: BlockSize>([u8; B]);

impl<const B: BlockSize> BlockValue<B> {
    /// Instantiates a `BlockValue` from an array of `B` bytes.
    pub fn new(data: [u8; B]) -> Self {
        Self(data)
    }

    /// Returns the bytes of this value.
    pub fn as_bytes(&self) -> &[u8; B] {
        &self.0
    }

    /// Copies `bytes` into a new value, zero-padding on the right.
    /// Returns `None` if `bytes` is longer than `B`.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        if bytes.len() > B {
            return None;
        }
        let mut result = Self::default();
        result.0[..bytes.len()].copy_from_slice(bytes);
        Some(result)
    }
}

impl<const B: BlockSize> Default for BlockValue<B> {
    fn default() -> Self {
        BlockValue::<B>([0u8; B])
    }
}

impl<const B: BlockSize> ConstantTimeEq for BlockValue<B> {
    fn ct_eq(&self, other: &Self) -> Choice {
        self.0[..].ct_eq(&other.0[..])
    }
}

// Payloads are secrets; comparing them should not leak the position of the first difference.
impl<const B: BlockSize> PartialEq for BlockValue<B> {
    fn eq(&self, other: &Self) -> bool {
        self.ct_eq(other).into()
    }
}

impl<const B: BlockSize> Eq for BlockValue<B> {}

impl<const B: BlockSize> OramBlock for BlockValue<B> {}

impl<const B: BlockSize> Distribution<BlockValue<B>> for Standard {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> BlockValue<B> {
        let mut result = BlockValue::default();
        for i in 0..B {
            result.0[i] = rng.gen();
        }
        result
    }
}
