//! Executable scratch region for branch stubs.

use crate::{Error, Result, sys};
use std::ptr;

/// Size reserved by default; far more than the stubs this process needs.
pub const DEFAULT_TRAMPOLINE_SIZE: usize = 64 * 1024;

const STUB_ALIGN: usize = 16;

/// Bump-allocated executable memory.
///
/// The region is never released: patched code keeps branching into it for
/// the rest of the process lifetime.
#[derive(Debug)]
pub struct Trampoline {
    base: usize,
    capacity: usize,
    used: usize,
}

impl Trampoline {
    /// Allocate `size` bytes of executable memory within rel32 reach of
    /// `near` (pass the patched module's base address).
    pub fn allocate(size: usize, near: usize) -> Result<Self> {
        let base = sys::alloc_executable(near, size).map_err(Error::TrampolineAlloc)?;
        tracing::debug!(base = format_args!("{base:#x}"), size, "allocated trampoline");
        Ok(Self {
            base,
            capacity: size,
            used: 0,
        })
    }

    /// Adopt a region the caller already owns, e.g. one the host loader
    /// hands out.
    ///
    /// # Safety
    /// `base..base + capacity` must be writable for the process lifetime,
    /// and executable if stubs placed there will run.
    pub unsafe fn from_raw_parts(base: usize, capacity: usize) -> Self {
        Self {
            base,
            capacity,
            used: 0,
        }
    }

    pub fn base(&self) -> usize {
        self.base
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn remaining(&self) -> usize {
        self.capacity - self.used
    }

    /// Copy `code` into the region and return its address.
    pub fn write(&mut self, code: &[u8]) -> Result<usize> {
        let start = (self.base + self.used).next_multiple_of(STUB_ALIGN);
        let offset = start - self.base;
        if offset + code.len() > self.capacity {
            return Err(Error::TrampolineFull {
                needed: code.len(),
                available: self.capacity.saturating_sub(offset),
            });
        }
        // SAFETY: `start..start + code.len()` lies inside the owned region.
        unsafe { ptr::copy_nonoverlapping(code.as_ptr(), start as *mut u8, code.len()) };
        self.used = offset + code.len();
        Ok(start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_aligns_and_fills_until_full() {
        let mut buf = vec![0u128; 4];
        let base = buf.as_mut_ptr() as usize;
        let mut trampoline = unsafe { Trampoline::from_raw_parts(base, 64) };

        let stub = [0xAAu8; 14];
        for n in 0..4 {
            assert_eq!(trampoline.write(&stub).unwrap(), base + n * 16);
        }
        let err = trampoline.write(&stub).unwrap_err();
        assert!(matches!(err, Error::TrampolineFull { needed: 14, available: 0 }));

        let bytes: Vec<u8> = buf.iter().flat_map(|w| w.to_ne_bytes()).collect();
        assert_eq!(&bytes[16..30], &stub);
        assert_eq!(bytes[30], 0);
    }

    #[test]
    fn test_allocate_is_fallible_not_fatal() {
        match Trampoline::allocate(DEFAULT_TRAMPOLINE_SIZE, 0) {
            Ok(mut trampoline) => {
                assert!(trampoline.capacity() >= DEFAULT_TRAMPOLINE_SIZE);
                assert_ne!(trampoline.base(), 0);
                assert!(trampoline.write(&[0xC3]).is_ok());
            }
            Err(err) => assert!(matches!(err, Error::TrampolineAlloc(_))),
        }
    }
}
