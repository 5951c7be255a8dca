// Copyright (C) Microsoft Corporation. All rights reserved.

//! Capacity-checked output writer.

use crate::error::require;
use crate::error::require_capacity;
use crate::error::ModelResult;
use crate::provider::Provider;

/// Writer over a caller buffer that may receive at most `max` bytes.
///
/// Construction fails with a capacity violation when the destination is
/// shorter than `max`, so no write can run past what the caller declared.
#[derive(Debug)]
pub struct BoundedWriter<'a> {
    op: &'static str,
    dest: &'a mut [u8],
    max: usize,
}

impl<'a> BoundedWriter<'a> {
    /// Wraps `dest` for an operation that may write up to `max` bytes.
    ///
    /// # Argument
    /// * `op` - Operation name used in diagnostics
    /// * `dest` - Caller output buffer
    /// * `max` - Largest number of bytes the operation may write
    #[track_caller]
    pub fn new(op: &'static str, dest: &'a mut [u8], max: usize) -> ModelResult<Self> {
        require_capacity(op, max, dest.len())?;
        Ok(Self { op, dest, max })
    }

    /// Largest write this writer accepts.
    pub fn max(&self) -> usize {
        self.max
    }

    /// Writes exactly `len` bytes of unconstrained content.
    #[track_caller]
    pub fn write_unconstrained(
        self,
        provider: &Provider,
        site: &'static str,
        len: usize,
    ) -> ModelResult<usize> {
        require(len <= self.max, self.op, "write exceeds declared bound")?;
        provider.fill(site, &mut self.dest[..len]);
        Ok(len)
    }

    /// Writes an unconstrained amount of unconstrained content, nominally
    /// the full bound, and returns how much was written.
    pub fn write_any(self, provider: &Provider, site: &'static str) -> usize {
        let len = provider.any_len(site, self.max);
        provider.fill(site, &mut self.dest[..len]);
        len
    }
}
