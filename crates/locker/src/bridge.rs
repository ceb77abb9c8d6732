//! What the plugin needs from the process it is loaded into.

use crate::HookSite;
use hooks::{AddressResolver, CallSite};
use host::{InventoryResolver, ScrapCallback, TransferMenu};
use std::ffi::c_void;

/// Host access supplied by the embedding glue.
///
/// Raw receivers arrive in the thunks exactly as the host passed them; the
/// bridge is the only place that turns them into typed views.
pub trait HostBridge: Send + Sync {
    /// The inventory interface, or `None` if the host did not provide it.
    fn inventory(&self) -> Option<&dyn InventoryResolver>;

    /// View over the container or barter menu `this`.
    ///
    /// # Safety
    /// `this` must be the receiver the host dispatched `site` on, and the
    /// view must not outlive the call it was created for.
    unsafe fn transfer_menu(&self, site: HookSite, this: *mut c_void)
    -> Option<Box<dyn TransferMenu + '_>>;

    /// View over the scrap confirmation callback `this`.
    ///
    /// # Safety
    /// As for [`HostBridge::transfer_menu`].
    unsafe fn scrap_callback(&self, this: *mut c_void) -> Option<Box<dyn ScrapCallback + '_>>;

    /// Dispatch-table address for a slot-hooked site.
    fn dispatch_table(&self, site: HookSite) -> Option<usize>;

    /// The address library for the running build.
    fn address_resolver(&self) -> Option<&dyn AddressResolver>;

    /// Build discriminator the host reports (`"og"`, `"ng"`, ...).
    fn build_discriminator(&self) -> &str;

    /// The branch into the host's take-all routine, if known for this host.
    fn take_all_site(&self) -> Option<CallSite>;

    /// Load address of the host's main module; trampolines are placed
    /// within branch reach of it.
    fn module_base(&self) -> usize;
}
