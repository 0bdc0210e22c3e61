// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! A Path ORAM block.

use crate::{Address, OramBlock};

/// A slot in a Path ORAM bucket: either a real value bound to its ORAM `address`, or a dummy.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Block<V> {
    /// A placeholder with no logical identity.
    #[default]
    Dummy,
    /// A stored value together with the logical address it belongs to.
    Real {
        /// The logical address of the block.
        address: Address,
        /// The payload.
        value: V,
    },
}

impl<V: OramBlock> Block<V> {
    /// Returns a real block for `address` holding `value`.
    pub fn real(address: Address, value: V) -> Self {
        Block::Real { address, value }
    }

    /// Returns true if this block is a dummy.
    pub fn is_dummy(&self) -> bool {
        matches!(self, Block::Dummy)
    }

    /// The address of a real block, or `None` for a dummy.
    pub fn address(&self) -> Option<Address> {
        match self {
            Block::Dummy => None,
            Block::Real { address, .. } => Some(*address),
        }
    }

    /// The payload of a real block, or `None` for a dummy.
    pub fn value(&self) -> Option<V> {
        match self {
            Block::Dummy => None,
            Block::Real { value, .. } => Some(*value),
        }
    }
}
