//! Inventory handles, menu entries and the resolution capability.

use serde::{Deserialize, Serialize};

/// Identifier of an inventory item as handed out by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InventoryHandle(pub u32);

impl InventoryHandle {
    /// The host's "no item" sentinel.
    pub const INVALID: Self = Self(0xFFFF_FFFF);

    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }
}

impl Default for InventoryHandle {
    fn default() -> Self {
        Self::INVALID
    }
}

impl std::fmt::Display for InventoryHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

/// The inventory listing a menu row points at.
///
/// A listing does not have to map 1:1 onto an item: several stacks of the
/// same item may be folded into one row, and a row may name no stack at all.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InventoryEntryRef {
    pub handle: InventoryHandle,
    pub stack_index: Vec<u32>,
}

impl InventoryEntryRef {
    pub fn new(handle: InventoryHandle, stack_index: impl Into<Vec<u32>>) -> Self {
        Self {
            handle,
            stack_index: stack_index.into(),
        }
    }

    /// The first stack index, if the row identifies a specific stack.
    pub fn stack_selection(&self) -> Option<u32> {
        self.stack_index.first().copied()
    }
}

/// Host-side inventory lookup.
pub trait InventoryResolver {
    /// Resolve a handle, or `None` when it is invalid or stale.
    fn resolve(&self, handle: InventoryHandle) -> Option<&dyn ResolvedItem>;
}

/// An item resolved from a handle.
pub trait ResolvedItem {
    fn stack(&self, id: u32) -> Option<&dyn Stack>;
}

/// One stack of a resolved item.
pub trait Stack {
    fn is_equipped(&self) -> bool;

    /// True when the stack carries favorite-marking extra data.
    fn is_favorite(&self) -> bool;

    fn count(&self) -> u32;
}
