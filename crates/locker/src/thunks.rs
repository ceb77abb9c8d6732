//! The `extern "C"` entry points the redirected slots and branch reach.
//!
//! Each site's original entry point is read and published before its slot
//! or branch is rewritten, so a thunk always has somewhere to forward to.
//! Without a published runtime, or without a menu view for the receiver,
//! the call goes straight to the original.

use crate::bridge::HostBridge;
use crate::interceptor::Interceptors;
use crate::{Error, HookSite, Result};
use hooks::{BranchHook, HookManager, PatchWriter, VfuncHook};
use host::Direction;
use policy::Policy;
use std::ffi::c_void;
use std::sync::OnceLock;

pub(crate) type TransferFn = unsafe extern "C" fn(*mut c_void, u32, u32, bool);
pub(crate) type ScrapAcceptFn = unsafe extern "C" fn(*mut c_void);
pub(crate) type TakeAllFn = unsafe extern "C" fn(*mut c_void);

/// State shared by all thunks, published once during load.
pub(crate) struct Runtime {
    pub(crate) policy: Policy,
    pub(crate) bridge: Box<dyn HostBridge>,
}

impl Runtime {
    fn interceptors(&self) -> Interceptors<'_> {
        Interceptors::new(&self.policy, self.bridge.inventory())
    }
}

pub(crate) static RUNTIME: OnceLock<Runtime> = OnceLock::new();

static CONTAINER_TRANSFER: OnceLock<TransferFn> = OnceLock::new();
static BARTER_TRANSFER: OnceLock<TransferFn> = OnceLock::new();
static SCRAP_ACCEPT: OnceLock<ScrapAcceptFn> = OnceLock::new();
static TAKE_ALL: OnceLock<TakeAllFn> = OnceLock::new();

// The `else` arms below are unreachable once a slot points at its thunk.

unsafe extern "C" fn container_transfer(this: *mut c_void, index: u32, count: u32, from_container: bool) {
    let Some(&original) = CONTAINER_TRANSFER.get() else {
        return;
    };
    // SAFETY: called by the host through the redirected slot.
    unsafe {
        dispatch_transfer(
            RUNTIME.get(),
            HookSite::ContainerTransfer,
            original,
            this,
            index,
            count,
            from_container,
        )
    }
}

unsafe extern "C" fn barter_transfer(this: *mut c_void, index: u32, count: u32, from_container: bool) {
    let Some(&original) = BARTER_TRANSFER.get() else {
        return;
    };
    // SAFETY: called by the host through the redirected slot.
    unsafe {
        dispatch_transfer(
            RUNTIME.get(),
            HookSite::BarterTransfer,
            original,
            this,
            index,
            count,
            from_container,
        )
    }
}

unsafe extern "C" fn scrap_accept(this: *mut c_void) {
    let Some(&original) = SCRAP_ACCEPT.get() else {
        return;
    };
    // SAFETY: called by the host through the redirected slot.
    unsafe { dispatch_scrap(RUNTIME.get(), original, this) }
}

unsafe extern "C" fn take_all(this: *mut c_void) {
    let Some(&original) = TAKE_ALL.get() else {
        return;
    };
    // SAFETY: called by the host through the redirected branch.
    unsafe { dispatch_take_all(RUNTIME.get(), original, CONTAINER_TRANSFER.get().copied(), this) }
}

/// # Safety
/// `original` and `this` must be the entry point and receiver of a host
/// transfer call; the bridge must accept `this` for `site`.
unsafe fn dispatch_transfer(
    runtime: Option<&Runtime>,
    site: HookSite,
    original: TransferFn,
    this: *mut c_void,
    index: u32,
    count: u32,
    from_container: bool,
) {
    // SAFETY: the host's own arguments, passed on unchanged.
    let forward = || unsafe { original(this, index, count, from_container) };

    let Some(runtime) = runtime else {
        return forward();
    };
    // SAFETY: `this` is the receiver of the current dispatch.
    let Some(menu) = (unsafe { runtime.bridge.transfer_menu(site, this) }) else {
        return forward();
    };
    let direction = Direction::from_container_flag(from_container);
    runtime
        .interceptors()
        .transfer(site, menu.as_ref(), index, count, direction, forward);
}

/// # Safety
/// As for [`dispatch_transfer`], for the scrap accept call.
unsafe fn dispatch_scrap(runtime: Option<&Runtime>, original: ScrapAcceptFn, this: *mut c_void) {
    // SAFETY: the host's own receiver, passed on unchanged.
    let forward = || unsafe { original(this) };

    let Some(runtime) = runtime else {
        return forward();
    };
    // SAFETY: `this` is the receiver of the current dispatch.
    let Some(callback) = (unsafe { runtime.bridge.scrap_callback(this) }) else {
        return forward();
    };
    runtime.interceptors().scrap_accept(callback.as_ref(), forward);
}

/// Per-row transfers go through `unwrapped`, the container transfer as the
/// host had it before redirection.
///
/// # Safety
/// `original` and `this` must be the host's take-all routine and a live
/// container menu; `unwrapped` must accept that menu as its receiver.
unsafe fn dispatch_take_all(
    runtime: Option<&Runtime>,
    original: TakeAllFn,
    unwrapped: Option<TransferFn>,
    this: *mut c_void,
) {
    // SAFETY: the host's own receiver, passed on unchanged.
    let run_original = || unsafe { original(this) };

    let (Some(runtime), Some(unwrapped)) = (runtime, unwrapped) else {
        return run_original();
    };
    // SAFETY: `this` is the receiver of the current dispatch.
    let Some(menu) = (unsafe { runtime.bridge.transfer_menu(HookSite::TakeAll, this) }) else {
        return run_original();
    };
    runtime.interceptors().take_all(menu.as_ref(), run_original, |index, count| {
        // SAFETY: `this` is a live container menu for the whole pass.
        unsafe { unwrapped(this, index, count, true) }
    });
}

fn publish<T>(cell: &OnceLock<T>, original: T) -> Result<()> {
    cell.set(original).map_err(|_| Error::AlreadyLoaded)
}

/// Publish what slot `index` of `table` holds now, then point it at `thunk`.
///
/// # Safety
/// As for [`install_slot`].
unsafe fn redirect_slot<W: PatchWriter, F: Copy>(
    manager: &mut HookManager<W>,
    cell: &OnceLock<F>,
    site: HookSite,
    table: usize,
    index: usize,
    thunk: F,
) -> Result<()> {
    // SAFETY: forwarded caller contract.
    let original = unsafe { VfuncHook::<F>::current(table, index)? };
    publish(cell, original)?;
    // SAFETY: forwarded caller contract.
    unsafe { manager.install_vfunc(site.name(), table, index, thunk)? };
    Ok(())
}

/// Redirect the slot of `site` in `table` to its thunk.
///
/// # Safety
/// `table` must be the host's dispatch table for `site`, with at least
/// `site.slot_index() + 1` slots of the thunk's signature.
pub(crate) unsafe fn install_slot<W: PatchWriter>(
    manager: &mut HookManager<W>,
    site: HookSite,
    table: usize,
) -> Result<()> {
    let index = site.slot_index().ok_or(Error::MissingTable(site))?;
    // SAFETY: forwarded caller contract.
    unsafe {
        match site {
            HookSite::ContainerTransfer => redirect_slot(
                manager,
                &CONTAINER_TRANSFER,
                site,
                table,
                index,
                container_transfer as TransferFn,
            ),
            HookSite::BarterTransfer => redirect_slot(
                manager,
                &BARTER_TRANSFER,
                site,
                table,
                index,
                barter_transfer as TransferFn,
            ),
            HookSite::ScrapAccept => redirect_slot(
                manager,
                &SCRAP_ACCEPT,
                site,
                table,
                index,
                scrap_accept as ScrapAcceptFn,
            ),
            HookSite::TakeAll => Err(Error::MissingTable(site)),
        }
    }
}

/// Redirect the take-all branch at `site` to its thunk.
///
/// # Safety
/// `site` must be the rel32 branch into the host's take-all routine.
pub(crate) unsafe fn install_take_all<W: PatchWriter>(
    manager: &mut HookManager<W>,
    site: usize,
) -> Result<()> {
    // SAFETY: forwarded caller contract.
    let original = unsafe { BranchHook::<TakeAllFn>::current_target(site)? };
    publish(&TAKE_ALL, original)?;
    // SAFETY: forwarded caller contract.
    unsafe { manager.install_branch(HookSite::TakeAll.name(), site, take_all as TakeAllFn)? };
    Ok(())
}

/// How many originals have been published.
#[cfg(test)]
pub(crate) fn published() -> usize {
    [
        CONTAINER_TRANSFER.get().is_some(),
        BARTER_TRANSFER.get().is_some(),
        SCRAP_ACCEPT.get().is_some(),
        TAKE_ALL.get().is_some(),
    ]
    .into_iter()
    .filter(|set| *set)
    .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        EQUIPPED, HostCall, PLAIN, TestBridge, host_scrap, host_take_all, host_transfer, receiver,
        take_calls,
    };
    use host::mock::entry;

    fn runtime(policy: Policy) -> Runtime {
        Runtime {
            policy,
            bridge: Box::new(TestBridge::with_items()),
        }
    }

    fn moved(index: u32, from_container: bool) -> HostCall {
        HostCall::Transfer {
            index,
            count: 1,
            from_container,
        }
    }

    #[test]
    fn test_transfer_forwards_without_runtime() {
        let rows = vec![entry(EQUIPPED, &[0])];
        // SAFETY: `rows` outlives the call.
        unsafe {
            dispatch_transfer(
                None,
                HookSite::ContainerTransfer,
                host_transfer,
                receiver(&rows),
                0,
                1,
                false,
            )
        };
        assert_eq!(take_calls(), vec![moved(0, false)]);
    }

    #[test]
    fn test_transfer_forwards_without_menu() {
        let rt = runtime(Policy::default());
        // SAFETY: a null receiver has no menu and is never read.
        unsafe {
            dispatch_transfer(
                Some(&rt),
                HookSite::BarterTransfer,
                host_transfer,
                std::ptr::null_mut(),
                3,
                1,
                true,
            )
        };
        assert_eq!(take_calls(), vec![moved(3, true)]);
    }

    #[test]
    fn test_transfer_blocks_equipped_row() {
        let rt = runtime(Policy::default());
        let equipped = vec![entry(EQUIPPED, &[0])];
        let plain = vec![entry(PLAIN, &[0])];
        let site = HookSite::ContainerTransfer;
        // SAFETY: the rows outlive the calls.
        unsafe {
            dispatch_transfer(Some(&rt), site, host_transfer, receiver(&equipped), 0, 1, true);
            dispatch_transfer(Some(&rt), site, host_transfer, receiver(&plain), 0, 1, true);
        }
        assert_eq!(take_calls(), vec![moved(0, true)]);
    }

    #[test]
    fn test_scrap_forwards_without_runtime_and_blocks_equipped() {
        let rt = runtime(Policy::default());
        let equipped = vec![entry(EQUIPPED, &[0])];
        // SAFETY: `equipped` outlives the calls.
        unsafe {
            dispatch_scrap(None, host_scrap, receiver(&equipped));
            dispatch_scrap(Some(&rt), host_scrap, receiver(&equipped));
        }
        assert_eq!(take_calls(), vec![HostCall::Scrap]);

        let unlocked = runtime(Policy {
            lock_scrap: false,
            ..Policy::default()
        });
        // SAFETY: as above.
        unsafe { dispatch_scrap(Some(&unlocked), host_scrap, receiver(&equipped)) };
        assert_eq!(take_calls(), vec![HostCall::Scrap]);
    }

    #[test]
    fn test_take_all_runs_host_routine_when_anything_is_missing() {
        let rt = runtime(Policy::default());
        let rows = vec![entry(PLAIN, &[0]), entry(EQUIPPED, &[0])];
        // SAFETY: `rows` outlives the calls; null has no menu.
        unsafe {
            dispatch_take_all(None, host_take_all, Some(host_transfer), receiver(&rows));
            dispatch_take_all(Some(&rt), host_take_all, None, receiver(&rows));
            dispatch_take_all(Some(&rt), host_take_all, Some(host_transfer), std::ptr::null_mut());
        }
        assert_eq!(take_calls(), vec![HostCall::TakeAll; 3]);
    }

    #[test]
    fn test_take_all_moves_only_unprotected_rows() {
        let rt = runtime(Policy::default());
        let rows = vec![entry(PLAIN, &[0]), entry(EQUIPPED, &[0]), entry(PLAIN, &[0])];
        // SAFETY: `rows` outlives the call.
        unsafe { dispatch_take_all(Some(&rt), host_take_all, Some(host_transfer), receiver(&rows)) };
        // Reverse order, the equipped row left behind, no host routine.
        assert_eq!(take_calls(), vec![moved(2, true), moved(0, true)]);
    }

    #[test]
    fn test_take_all_gate_closed_runs_host_routine() {
        let rt = runtime(Policy {
            lock_take_all: false,
            ..Policy::default()
        });
        let rows = vec![entry(EQUIPPED, &[0])];
        // SAFETY: `rows` outlives the call.
        unsafe { dispatch_take_all(Some(&rt), host_take_all, Some(host_transfer), receiver(&rows)) };
        assert_eq!(take_calls(), vec![HostCall::TakeAll]);
    }
}
