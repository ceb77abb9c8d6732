//! Writes into the host's protected code and data pages.

use crate::Result;
use crate::sys;
use std::ptr;

/// Sink for every byte a hook writes into host memory.
pub trait PatchWriter {
    /// Overwrite `bytes.len()` bytes at `dst`.
    ///
    /// # Safety
    /// `dst..dst + bytes.len()` must be mapped memory of this process, and no
    /// other thread may be executing or reading it mid-write.
    unsafe fn write(&self, dst: usize, bytes: &[u8]) -> Result<()>;
}

/// Lifts page protection around each write and flushes the instruction
/// cache afterwards.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProtectedWriter;

impl PatchWriter for ProtectedWriter {
    unsafe fn write(&self, dst: usize, bytes: &[u8]) -> Result<()> {
        {
            // SAFETY: the caller guarantees the range is mapped.
            let _unprotected = unsafe { sys::Unprotect::new(dst, bytes.len())? };
            // SAFETY: the range is mapped and now writable.
            unsafe { ptr::copy_nonoverlapping(bytes.as_ptr(), dst as *mut u8, bytes.len()) };
        }
        sys::flush_instruction_cache(dst, bytes.len());
        Ok(())
    }
}

/// Writes straight through; for buffers the test owns.
#[cfg(test)]
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct PlainWriter;

#[cfg(test)]
impl PatchWriter for PlainWriter {
    unsafe fn write(&self, dst: usize, bytes: &[u8]) -> Result<()> {
        // SAFETY: tests only hand in ranges of their own live buffers.
        unsafe { ptr::copy_nonoverlapping(bytes.as_ptr(), dst as *mut u8, bytes.len()) };
        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_protected_writer_patches_heap_word() {
        let mut word = Box::new(0usize);
        let addr = &mut *word as *mut usize as usize;

        unsafe { ProtectedWriter.write(addr, &0xDEAD_BEEFusize.to_ne_bytes()) }.unwrap();

        assert_eq!(*word, 0xDEAD_BEEF);
    }
}
