//! Capability view of the host process's object graph.
//!
//! The host owns every inventory, menu and actor object; this crate only
//! describes the handful of accessors the locker needs from them. Each
//! accessor that can miss returns an `Option`, so absence is propagated
//! explicitly rather than checked for at every call site.
//!
//! # Overview
//!
//! - [`InventoryEntryRef`] is the listing a menu row refers to: a handle
//!   plus the stack indices it covers.
//! - [`InventoryResolver`] turns a handle into a [`ResolvedItem`], whose
//!   [`Stack`]s carry the equipped / favorite state.
//! - [`TransferMenu`], [`ExamineMenu`] and [`ScrapCallback`] are the menus
//!   whose operations get intercepted.
//! - [`Container`] and [`Actor`] answer the corpse-looting question.
//!
//! With the `mock` feature the [`mock`] module provides an in-memory host
//! that records every call made against it.

mod actor;
mod inventory;
mod menu;

#[cfg(feature = "mock")]
pub mod mock;

pub use actor::{Actor, Container};
pub use inventory::{InventoryEntryRef, InventoryHandle, InventoryResolver, ResolvedItem, Stack};
pub use menu::{Direction, ExamineMenu, ScrapCallback, TransferMenu};
