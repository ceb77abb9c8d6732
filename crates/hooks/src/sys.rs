//! Page protection, instruction cache and executable allocation.

#[cfg(windows)]
pub(crate) use self::windows::{Unprotect, alloc_executable, flush_instruction_cache};

#[cfg(unix)]
pub(crate) use self::unix::{Unprotect, alloc_executable, flush_instruction_cache};

#[cfg(windows)]
mod windows {
    use crate::{Error, Result};
    use core::ffi::c_void;
    use std::io;
    use windows_sys::Win32::System::Diagnostics::Debug::FlushInstructionCache;
    use windows_sys::Win32::System::Memory::{
        MEM_COMMIT, MEM_RESERVE, PAGE_EXECUTE_READWRITE, PAGE_PROTECTION_FLAGS, VirtualAlloc,
        VirtualProtect,
    };
    use windows_sys::Win32::System::Threading::GetCurrentProcess;

    /// Allocation granularity on every supported Windows target.
    const GRANULARITY: usize = 0x1_0000;

    /// Stay a little inside ±2 GiB so every stub is reachable with rel32.
    const REACH: usize = 0x7FF0_0000;

    /// Makes a range writable, restoring the previous protection on drop.
    pub(crate) struct Unprotect {
        addr: usize,
        len: usize,
        old: PAGE_PROTECTION_FLAGS,
    }

    impl Unprotect {
        pub(crate) unsafe fn new(addr: usize, len: usize) -> Result<Self> {
            let mut old: PAGE_PROTECTION_FLAGS = 0;
            // SAFETY: VirtualProtect validates the range itself and reports
            // failure through its return value.
            let ok = unsafe {
                VirtualProtect(addr as *const c_void, len, PAGE_EXECUTE_READWRITE, &mut old)
            };
            if ok == 0 {
                return Err(Error::Protect {
                    addr,
                    source: io::Error::last_os_error(),
                });
            }
            Ok(Self { addr, len, old })
        }
    }

    impl Drop for Unprotect {
        fn drop(&mut self) {
            let mut previous: PAGE_PROTECTION_FLAGS = 0;
            // SAFETY: same range that was successfully unprotected in `new`.
            unsafe {
                VirtualProtect(self.addr as *const c_void, self.len, self.old, &mut previous);
            }
        }
    }

    pub(crate) fn flush_instruction_cache(addr: usize, len: usize) {
        // SAFETY: flushing is advisory and tolerates any range.
        unsafe {
            FlushInstructionCache(GetCurrentProcess(), addr as *const c_void, len);
        }
    }

    /// Reserve and commit `size` bytes of RWX memory, within rel32 reach of
    /// `near` when `near` is non-zero.
    pub(crate) fn alloc_executable(near: usize, size: usize) -> io::Result<usize> {
        let size = size.next_multiple_of(GRANULARITY);
        let try_at = |addr: usize| -> usize {
            // SAFETY: VirtualAlloc only reserves fresh pages; a taken range
            // makes it return null.
            unsafe {
                VirtualAlloc(
                    addr as *const c_void,
                    size,
                    MEM_COMMIT | MEM_RESERVE,
                    PAGE_EXECUTE_READWRITE,
                ) as usize
            }
        };

        if near == 0 {
            return match try_at(0) {
                0 => Err(io::Error::last_os_error()),
                base => Ok(base),
            };
        }

        let origin = near & !(GRANULARITY - 1);
        let lowest = origin.saturating_sub(REACH);
        let highest = origin.saturating_add(REACH).saturating_sub(size);
        let mut step = GRANULARITY;
        while step <= REACH {
            let below = origin.checked_sub(step).filter(|a| *a >= lowest && *a != 0);
            let above = origin.checked_add(step).filter(|a| *a <= highest);
            if below.is_none() && above.is_none() {
                break;
            }
            for candidate in [below, above].into_iter().flatten() {
                let base = try_at(candidate);
                if base != 0 {
                    return Ok(base);
                }
            }
            step += GRANULARITY;
        }
        Err(io::Error::new(
            io::ErrorKind::OutOfMemory,
            format!("no free region within rel32 reach of {near:#x}"),
        ))
    }
}

#[cfg(unix)]
mod unix {
    use crate::{Error, Result};
    use std::io;

    fn page_size() -> usize {
        // SAFETY: sysconf has no preconditions.
        match unsafe { libc::sysconf(libc::_SC_PAGESIZE) } {
            n if n > 0 => n as usize,
            _ => 4096,
        }
    }

    /// Makes a range writable.
    ///
    /// Unix offers no query for the previous protection, so pages are left
    /// writable after the patch.
    pub(crate) struct Unprotect;

    impl Unprotect {
        pub(crate) unsafe fn new(addr: usize, len: usize) -> Result<Self> {
            let page = page_size();
            let start = addr & !(page - 1);
            let end = (addr + len).next_multiple_of(page);
            let rwx = libc::PROT_READ | libc::PROT_WRITE | libc::PROT_EXEC;
            // SAFETY: the range is page aligned and covers memory the caller
            // vouched for. Exec is kept so code pages stay runnable.
            let rc = unsafe { libc::mprotect(start as *mut libc::c_void, end - start, rwx) };
            if rc == 0 {
                Ok(Self)
            } else {
                Err(Error::Protect {
                    addr,
                    source: io::Error::last_os_error(),
                })
            }
        }
    }

    /// x86 keeps instruction fetch coherent with data writes.
    pub(crate) fn flush_instruction_cache(_addr: usize, _len: usize) {}

    pub(crate) fn alloc_executable(near: usize, size: usize) -> io::Result<usize> {
        let size = size.next_multiple_of(page_size());
        // SAFETY: anonymous private mapping; `near` is only a hint.
        let base = unsafe {
            libc::mmap(
                near as *mut libc::c_void,
                size,
                libc::PROT_READ | libc::PROT_WRITE | libc::PROT_EXEC,
                libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
                -1,
                0,
            )
        };
        if base == libc::MAP_FAILED {
            Err(io::Error::last_os_error())
        } else {
            Ok(base as usize)
        }
    }
}
