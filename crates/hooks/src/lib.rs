//! Redirection of host dispatch points to local wrappers.
//!
//! Two mechanisms, matching the two kinds of call sites the host has:
//!
//! - [`VfuncHook`] overwrites one slot of a dispatch table and keeps the
//!   previous slot value as the original entry point.
//! - [`BranchHook`] rewrites an existing rel32 `call`/`jmp` so it lands on an
//!   absolute-jump stub in a [`Trampoline`]; the old branch target becomes
//!   the original entry point.
//!
//! An installed hook value carries the original. `VfuncHook::current` and
//! `BranchHook::current_target` read the same entry point before patching,
//! so a wrapper can have somewhere to forward to from its very first call.
//! Hooks are never removed: the host may hold return addresses into them for
//! as long as the process lives.
//!
//! The [`HookManager`] owns the trampoline and refuses to patch the same
//! slot or site twice. All memory writes go through a [`PatchWriter`].
//!
//! # Example
//!
//! ```no_run
//! use hooks::HookManager;
//!
//! type Accept = extern "C" fn(*mut std::ffi::c_void);
//!
//! extern "C" fn on_accept(_this: *mut std::ffi::c_void) {}
//!
//! # fn vtable_address() -> usize { 0 }
//! let mut manager = HookManager::new();
//! // SAFETY: the table address comes from the host's relocation data and
//! // slot 1 has the `Accept` signature.
//! let hook = unsafe { manager.install_vfunc("scrap accept", vtable_address(), 1, on_accept as Accept) }?;
//! let original: Accept = hook.original();
//! # let _ = original;
//! # Ok::<(), hooks::Error>(())
//! ```

mod address;
mod branch;
mod error;
mod manager;
mod sys;
mod trampoline;
mod vtable;
mod writer;

pub use address::{AddressId, AddressResolver, AddressTable, BuildVariant, CallSite};
pub use branch::{BranchHook, BranchKind};
pub use error::{Error, Result};
pub use manager::HookManager;
pub use trampoline::{DEFAULT_TRAMPOLINE_SIZE, Trampoline};
pub use vtable::VfuncHook;
pub use writer::{PatchWriter, ProtectedWriter};

/// Address of a function pointer.
fn fn_addr<F: Copy>(f: F) -> usize {
    const { assert!(std::mem::size_of::<F>() == std::mem::size_of::<usize>()) };
    // SAFETY: `F` is pointer-sized (checked above); callers only pass
    // function pointers.
    unsafe { std::mem::transmute_copy(&f) }
}

/// Function pointer at `addr`.
///
/// # Safety
/// `addr` must be the entry point of a function with signature `F`.
unsafe fn fn_from_addr<F: Copy>(addr: usize) -> F {
    const { assert!(std::mem::size_of::<F>() == std::mem::size_of::<usize>()) };
    // SAFETY: size checked above; the caller vouches for the signature.
    unsafe { std::mem::transmute_copy(&addr) }
}
