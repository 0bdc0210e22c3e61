// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Memory abstractions for the server side of an ORAM.

use crate::{Address, OramBlock, OramError};

/// A simple Memory trait to model the untrusted storage the ORAM client is interacting with.
///
/// Encrypting and authenticating stored values before they leave the client is the job of an
/// implementation backed by a real server; the implementations here keep plaintext in memory.
pub trait Database<V: OramBlock>
where
    Self: Sized,
{
    /// Returns a new `Database` filled with default values.
    fn new(number_of_addresses: Address) -> Result<Self, OramError>;
    /// Returns the number of values stored by `self`.
    fn capacity(&self) -> Result<Address, OramError>;
    /// Reads the value stored at `index`.
    fn read_db(&mut self, index: Address) -> Result<V, OramError>;
    /// Writes the value stored at `index`, returning the value it replaces.
    fn write_db(&mut self, index: Address, value: V) -> Result<V, OramError>;
    /// Borrows the value stored at `index` without it counting as a physical access.
    /// Intended for inspection by the client's own bookkeeping and tests.
    fn peek(&self, index: Address) -> Result<&V, OramError>;
}

/// A simple Database that stores its data as a Vec.
#[derive(Debug)]
pub struct SimpleDatabase<V>(Vec<V>);

impl<V> SimpleDatabase<V> {
    fn slot(&self, index: Address) -> Result<usize, OramError> {
        let index: usize = index.try_into()?;
        if index >= self.0.len() {
            return Err(OramError::AddressOutOfBoundsError);
        }
        Ok(index)
    }
}

impl<V: OramBlock> Database<V> for SimpleDatabase<V> {
    fn new(number_of_addresses: Address) -> Result<Self, OramError> {
        Ok(Self(vec![V::default(); number_of_addresses.try_into()?]))
    }

    fn capacity(&self) -> Result<Address, OramError> {
        Ok(self.0.len().try_into()?)
    }

    fn read_db(&mut self, index: Address) -> Result<V, OramError> {
        let index = self.slot(index)?;
        Ok(self.0[index])
    }

    fn write_db(&mut self, index: Address, value: V) -> Result<V, OramError> {
        let index = self.slot(index)?;
        let result = self.0[index];
        self.0[index] = value;
        Ok(result)
    }

    fn peek(&self, index: Address) -> Result<&V, OramError> {
        let index = self.slot(index)?;
        Ok(&self.0[index])
    }
}

/// A Database that counts reads and writes.
#[derive(Debug)]
pub struct CountAccessesDatabase<V> {
    data: SimpleDatabase<V>,
    /// `reads[i]` tracks the total number of reads made to index `i`.
    pub reads: Vec<u64>,
    /// `writes[i]` tracks the total number of writes made to index `i`.
    pub writes: Vec<u64>,
}

impl<V> CountAccessesDatabase<V> {
    /// Returns the total number of reads to the database.
    pub fn get_read_count(&self) -> u64 {
        self.reads.iter().sum()
    }

    /// Returns the total number of writes to the database.
    pub fn get_write_count(&self) -> u64 {
        self.writes.iter().sum()
    }

    /// Zeroes all counters, e.g. to discard accesses made during initialization.
    pub fn reset_counts(&mut self) {
        self.reads.iter_mut().for_each(|r| *r = 0);
        self.writes.iter_mut().for_each(|w| *w = 0);
    }
}

impl<V: OramBlock> Database<V> for CountAccessesDatabase<V> {
    fn new(number_of_addresses: Address) -> Result<Self, OramError> {
        Ok(Self {
            data: Database::new(number_of_addresses)?,
            reads: vec![0u64; number_of_addresses.try_into()?],
            writes: vec![0u64; number_of_addresses.try_into()?],
        })
    }

    fn read_db(&mut self, index: Address) -> Result<V, OramError> {
        log::debug!("Physical read -- {}", index);

        let value = self.data.read_db(index)?;
        self.reads[usize::try_from(index)?] += 1;
        Ok(value)
    }

    fn write_db(&mut self, index: Address, value: V) -> Result<V, OramError> {
        log::debug!("Physical write -- {}", index);

        let previous = self.data.write_db(index, value)?;
        self.writes[usize::try_from(index)?] += 1;
        Ok(previous)
    }

    fn capacity(&self) -> Result<Address, OramError> {
        self.data.capacity()
    }

    fn peek(&self, index: Address) -> Result<&V, OramError> {
        self.data.peek(index)
    }
}
