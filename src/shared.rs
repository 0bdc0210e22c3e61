// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Sharing one ORAM between several callers.

use crate::{Address, Operation, Oram, OramError};
use parking_lot::Mutex;
use rand::{CryptoRng, RngCore};

/// An `Oram` that can be accessed through a shared reference.
///
/// Each access holds a single lock from the first bucket read until the last bucket is written back,
/// so accesses never interleave and the buckets touched by each one remain exactly one path.
#[derive(Debug)]
pub struct SharedOram<T: Oram> {
    inner: Mutex<T>,
}

impl<T: Oram> SharedOram<T> {
    /// Wraps `oram`.
    pub fn new(oram: T) -> Self {
        Self {
            inner: Mutex::new(oram),
        }
    }

    /// Performs one complete access while holding the lock. See [`Oram::access`].
    pub fn access<R: RngCore + CryptoRng>(
        &self,
        index: Address,
        operation: Operation<T::V>,
        rng: &mut R,
    ) -> Result<Option<T::V>, OramError> {
        self.inner.lock().access(index, operation, rng)
    }

    /// Obliviously reads the value stored at `index`.
    pub fn read<R: RngCore + CryptoRng>(
        &self,
        index: Address,
        rng: &mut R,
    ) -> Result<Option<T::V>, OramError> {
        self.access(index, Operation::Read, rng)
    }

    /// Obliviously writes the value stored at `index`. Returns the value previously stored at `index`.
    pub fn write<R: RngCore + CryptoRng>(
        &self,
        index: Address,
        new_value: T::V,
        rng: &mut R,
    ) -> Result<Option<T::V>, OramError> {
        self.access(index, Operation::Write(new_value), rng)
    }

    /// Returns the capacity in blocks of the wrapped ORAM.
    pub fn block_capacity(&self) -> Result<Address, OramError> {
        self.inner.lock().block_capacity()
    }

    /// Unwraps the ORAM.
    pub fn into_inner(self) -> T {
        self.inner.into_inner()
    }
}
