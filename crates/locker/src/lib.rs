//! Inventory lock plugin: keeps equipped and favorited items from leaving
//! the player's inventory through container, barter, scrap and take-all
//! menus.
//!
//! The embedding glue implements [`HostBridge`] and calls [`load`] once
//! from the host's plugin entry point. Loading reads `InvLocker.toml`,
//! opens `InvLocker.log` and redirects each menu operation to a wrapper
//! that asks the policy before forwarding to the host's original routine.
//!
//! The wrappers themselves live in [`Interceptors`] and take typed views
//! of the host menus, so they can be driven by `host::mock` in tests.

mod bridge;
mod error;
mod interceptor;
pub mod logging;
mod plugin;
mod sites;
#[cfg(test)]
mod testing;
mod thunks;

pub use bridge::HostBridge;
pub use error::{Error, Result};
pub use interceptor::{Interceptors, Outcome, TakeAllOutcome, TakeAllSummary};
pub use plugin::{HookStatus, LoadOptions, LoadReport, PLUGIN_NAME, load};
pub use sites::HookSite;
