//! Fake host entry points and bridge shared by the thunk and load tests.
//!
//! Receivers are `*const Vec<InventoryEntryRef>`: the rows of whichever menu
//! the call is about. A null receiver has no menu.

use crate::{HookSite, HostBridge};
use hooks::{AddressResolver, AddressTable, CallSite, PatchWriter};
use host::mock::{MockContainer, MockExamineMenu, MockItem, MockScrapCallback, MockStack, MockTransferMenu};
use host::{InventoryEntryRef, InventoryHandle, InventoryResolver, ResolvedItem, ScrapCallback, TransferMenu};
use std::cell::RefCell;
use std::collections::HashMap;
use std::ffi::c_void;

pub(crate) const PLAIN: u32 = 1;
pub(crate) const EQUIPPED: u32 = 2;

/// A call that reached one of the host's own routines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HostCall {
    Transfer { index: u32, count: u32, from_container: bool },
    Scrap,
    TakeAll,
}

thread_local! {
    static CALLS: RefCell<Vec<HostCall>> = const { RefCell::new(Vec::new()) };
}

/// Host calls made on this thread since the last call.
pub(crate) fn take_calls() -> Vec<HostCall> {
    CALLS.with(|calls| calls.take())
}

fn record(call: HostCall) {
    CALLS.with(|calls| calls.borrow_mut().push(call));
}

pub(crate) unsafe extern "C" fn host_transfer(_this: *mut c_void, index: u32, count: u32, from_container: bool) {
    record(HostCall::Transfer {
        index,
        count,
        from_container,
    });
}

pub(crate) unsafe extern "C" fn host_scrap(_this: *mut c_void) {
    record(HostCall::Scrap);
}

pub(crate) unsafe extern "C" fn host_take_all(_this: *mut c_void) {
    record(HostCall::TakeAll);
}

#[allow(clippy::ptr_arg)]
pub(crate) fn receiver(rows: &Vec<InventoryEntryRef>) -> *mut c_void {
    rows as *const Vec<InventoryEntryRef> as *mut c_void
}

/// Writes straight into buffers the test owns.
pub(crate) struct DirectWriter;

impl PatchWriter for DirectWriter {
    unsafe fn write(&self, dst: usize, bytes: &[u8]) -> hooks::Result<()> {
        // SAFETY: tests only patch buffers they own.
        unsafe { std::ptr::copy_nonoverlapping(bytes.as_ptr(), dst as *mut u8, bytes.len()) };
        Ok(())
    }
}

pub(crate) struct Items(HashMap<InventoryHandle, MockItem>);

impl InventoryResolver for Items {
    fn resolve(&self, handle: InventoryHandle) -> Option<&dyn ResolvedItem> {
        self.0.get(&handle).map(|i| i as &dyn ResolvedItem)
    }
}

#[derive(Default)]
pub(crate) struct TestBridge {
    pub(crate) tables: HashMap<HookSite, usize>,
    pub(crate) addresses: Option<AddressTable>,
    pub(crate) take_all_site: Option<CallSite>,
    pub(crate) items: Option<Items>,
}

impl TestBridge {
    /// One plain and one equipped item, no tables.
    pub(crate) fn with_items() -> Self {
        Self {
            items: Some(Items(HashMap::from([
                (InventoryHandle(PLAIN), MockItem::new([MockStack::plain(1)])),
                (InventoryHandle(EQUIPPED), MockItem::new([MockStack::equipped()])),
            ]))),
            ..Self::default()
        }
    }
}

impl HostBridge for TestBridge {
    fn inventory(&self) -> Option<&dyn InventoryResolver> {
        self.items.as_ref().map(|i| i as &dyn InventoryResolver)
    }

    unsafe fn transfer_menu(&self, _site: HookSite, this: *mut c_void) -> Option<Box<dyn TransferMenu + '_>> {
        // SAFETY: see the receiver convention above.
        let rows = unsafe { (this as *const Vec<InventoryEntryRef>).as_ref() }?;
        let menu = MockTransferMenu::new()
            .with_player_items(rows.clone())
            .with_container_items(rows.clone())
            .with_container(MockContainer::object());
        Some(Box::new(menu))
    }

    unsafe fn scrap_callback(&self, this: *mut c_void) -> Option<Box<dyn ScrapCallback + '_>> {
        // SAFETY: see the receiver convention above.
        let rows = unsafe { (this as *const Vec<InventoryEntryRef>).as_ref() }?;
        Some(Box::new(MockScrapCallback::new(MockExamineMenu::new(rows.clone(), 0))))
    }

    fn dispatch_table(&self, site: HookSite) -> Option<usize> {
        self.tables.get(&site).copied()
    }

    fn address_resolver(&self) -> Option<&dyn AddressResolver> {
        self.addresses.as_ref().map(|a| a as &dyn AddressResolver)
    }

    fn build_discriminator(&self) -> &str {
        "ng"
    }

    fn take_all_site(&self) -> Option<CallSite> {
        self.take_all_site
    }

    fn module_base(&self) -> usize {
        0
    }
}
