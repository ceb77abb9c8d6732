//! Decision engine: classify a menu row and decide whether to block.
//!
//! Everything here fails open. A row that cannot be tied to one specific
//! stack is treated as unprotected, never as "whatever the item as a whole
//! looks like": other stacks of the same item may be equipped or favorited
//! without this one being either.

use crate::Policy;
use host::{Container, InventoryEntryRef, InventoryResolver};

/// Protection-relevant state of the stack a row refers to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Classification {
    pub equipped: bool,
    pub favorite: bool,
}

impl Classification {
    pub const UNPROTECTED: Self = Self {
        equipped: false,
        favorite: false,
    };

    pub fn new(equipped: bool, favorite: bool) -> Self {
        Self { equipped, favorite }
    }
}

/// Which lock caused a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protection {
    Equipped,
    Favorite,
}

impl std::fmt::Display for Protection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Equipped => f.write_str("equipped"),
            Self::Favorite => f.write_str("favorite"),
        }
    }
}

/// Result of evaluating a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Block { protection: Protection },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

/// Classify the stack a menu row refers to.
pub fn classify_protection(
    resolver: &dyn InventoryResolver,
    entry: Option<&InventoryEntryRef>,
) -> Classification {
    let Some(entry) = entry.filter(|e| e.handle.is_valid()) else {
        return Classification::UNPROTECTED;
    };
    let Some(item) = resolver.resolve(entry.handle) else {
        tracing::debug!(handle = %entry.handle, "inventory handle did not resolve");
        return Classification::UNPROTECTED;
    };
    let Some(stack_id) = entry.stack_selection() else {
        tracing::debug!(
            handle = %entry.handle,
            "no stack index for entry, skipping equipped/favorite check"
        );
        return Classification::UNPROTECTED;
    };

    match item.stack(stack_id) {
        Some(stack) => Classification::new(stack.is_equipped(), stack.is_favorite()),
        None => {
            tracing::debug!(handle = %entry.handle, stack_id, "stack not found on item");
            Classification::UNPROTECTED
        }
    }
}

/// The lock that applies to `classification`, if any. Equipped wins.
fn blocking_protection(policy: &Policy, classification: Classification) -> Option<Protection> {
    if policy.lock_equipped && classification.equipped {
        Some(Protection::Equipped)
    } else if policy.lock_favorites && classification.favorite {
        Some(Protection::Favorite)
    } else {
        None
    }
}

/// `(lock_equipped && equipped) || (lock_favorites && favorite)`.
pub fn should_block(policy: &Policy, classification: Classification) -> bool {
    blocking_protection(policy, classification).is_some()
}

/// True when the container is a dead actor, whose remains are always free
/// to loot.
pub fn is_exempt_container(container: Option<&dyn Container>) -> bool {
    container
        .and_then(|c| c.as_actor())
        .is_some_and(|actor| actor.is_dead())
}

/// Shared decision path for every interceptor.
///
/// `resolver` is `None` when the host's inventory capability is unavailable,
/// in which case the transfer is allowed.
pub fn evaluate_transfer(
    policy: &Policy,
    resolver: Option<&dyn InventoryResolver>,
    entry: Option<&InventoryEntryRef>,
    container: Option<&dyn Container>,
) -> Decision {
    if is_exempt_container(container) {
        tracing::debug!("container is a dead actor, protections waived");
        return Decision::Allow;
    }
    let Some(resolver) = resolver else {
        tracing::debug!("inventory interface unavailable, allowing");
        return Decision::Allow;
    };

    let classification = classify_protection(resolver, entry);
    match blocking_protection(policy, classification) {
        Some(protection) => Decision::Block { protection },
        None => Decision::Allow,
    }
}
