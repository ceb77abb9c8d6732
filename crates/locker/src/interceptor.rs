//! Per-call interception logic, independent of raw host pointers.
//!
//! Each wrapper extracts the entry its call is about, runs the shared
//! [`evaluate_transfer`] decision and then either calls `forward` (the
//! original entry point) or returns without it. Nothing is kept between
//! calls.

use crate::HookSite;
use host::{Direction, InventoryEntryRef, InventoryResolver, ScrapCallback, TransferMenu};
use policy::{Decision, Policy, evaluate_transfer};

/// What a wrapper did with the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The original ran with the host's arguments.
    Forwarded,
    /// The call was suppressed.
    Intercepted,
}

/// Indices touched by a take-all pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TakeAllSummary {
    pub transferred: Vec<u32>,
    pub blocked: Vec<u32>,
    pub skipped: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TakeAllOutcome {
    /// Protections do not apply; the host's own routine ran.
    Forwarded,
    /// Inventory lookups are unavailable; nothing was transferred.
    Aborted,
    Completed(TakeAllSummary),
}

/// The wrappers, bound to the loaded policy and the host inventory.
#[derive(Clone, Copy)]
pub struct Interceptors<'a> {
    policy: &'a Policy,
    inventory: Option<&'a dyn InventoryResolver>,
}

impl<'a> Interceptors<'a> {
    /// `inventory` is `None` when the host's inventory interface is missing.
    pub fn new(policy: &'a Policy, inventory: Option<&'a dyn InventoryResolver>) -> Self {
        Self { policy, inventory }
    }

    pub fn container_transfer(
        &self,
        menu: &dyn TransferMenu,
        index: u32,
        count: u32,
        direction: Direction,
        forward: impl FnOnce(),
    ) -> Outcome {
        self.transfer(HookSite::ContainerTransfer, menu, index, count, direction, forward)
    }

    pub fn barter_transfer(
        &self,
        menu: &dyn TransferMenu,
        index: u32,
        count: u32,
        direction: Direction,
        forward: impl FnOnce(),
    ) -> Outcome {
        self.transfer(HookSite::BarterTransfer, menu, index, count, direction, forward)
    }

    pub(crate) fn transfer(
        &self,
        site: HookSite,
        menu: &dyn TransferMenu,
        index: u32,
        count: u32,
        direction: Direction,
        forward: impl FnOnce(),
    ) -> Outcome {
        tracing::debug!(hook = %site, index, count, %direction, "item transfer");
        if !self.policy.gates_transfer(direction) {
            return forwarded(forward);
        }

        // Pane indexing is direction-relative: only one side has this row.
        let entry = menu
            .entry_at(direction, index)
            .or_else(|| menu.entry_at(direction.opposite(), index));
        let decision = evaluate_transfer(self.policy, self.inventory, entry.as_ref(), menu.container());
        self.apply(site, index, decision, forward)
    }

    pub fn scrap_accept(&self, callback: &dyn ScrapCallback, forward: impl FnOnce()) -> Outcome {
        tracing::debug!(hook = %HookSite::ScrapAccept, "scrap accepted");
        if !self.policy.gates_scrap() {
            return forwarded(forward);
        }
        let Some(menu) = callback.menu() else {
            tracing::debug!("scrap callback has no menu");
            return forwarded(forward);
        };

        let selected = menu.selected_index();
        let listing = menu.listing();
        let Some((index, entry)) = selected_entry(&listing, selected) else {
            tracing::debug!(selected, rows = listing.len(), "selected index outside listing");
            return forwarded(forward);
        };
        let decision = evaluate_transfer(self.policy, self.inventory, Some(entry), None);
        self.apply(HookSite::ScrapAccept, index, decision, forward)
    }

    /// Move every unprotected row of the container into the player
    /// inventory.
    ///
    /// `original` is the host's take-all routine; `transfer` is the
    /// unwrapped single-item transfer, reached here only through the
    /// policy-checked container path.
    pub fn take_all(
        &self,
        menu: &dyn TransferMenu,
        original: impl FnOnce(),
        mut transfer: impl FnMut(u32, u32),
    ) -> TakeAllOutcome {
        if !self.policy.gates_take_all() {
            original();
            return TakeAllOutcome::Forwarded;
        }
        // Falling back to the unchecked routine here destabilizes the host.
        let Some(inventory) = self.inventory else {
            tracing::warn!("inventory interface unavailable, take all aborted");
            return TakeAllOutcome::Aborted;
        };

        let listing = menu.container_listing();
        let mut summary = TakeAllSummary::default();
        // Reverse order: a transfer removes its row and shifts the ones after it.
        for (index, entry) in listing.iter().enumerate().rev() {
            let Ok(index) = u32::try_from(index) else {
                continue;
            };
            let count = full_count(inventory, entry);
            if count == 0 {
                summary.skipped.push(index);
                continue;
            }

            let outcome = self.transfer(
                HookSite::TakeAll,
                menu,
                index,
                count,
                Direction::FromContainer,
                || transfer(index, count),
            );
            match outcome {
                Outcome::Forwarded => {
                    menu.refresh_list();
                    summary.transferred.push(index);
                }
                Outcome::Intercepted => summary.blocked.push(index),
            }
        }
        menu.recompute_totals();

        tracing::debug!(
            transferred = summary.transferred.len(),
            blocked = summary.blocked.len(),
            skipped = summary.skipped.len(),
            "take all finished"
        );
        TakeAllOutcome::Completed(summary)
    }

    fn apply(&self, site: HookSite, index: u32, decision: Decision, forward: impl FnOnce()) -> Outcome {
        match decision {
            Decision::Allow => forwarded(forward),
            Decision::Block { protection } => {
                tracing::debug!(hook = %site, index, %protection, "blocked protected item");
                Outcome::Intercepted
            }
        }
    }
}

fn forwarded(forward: impl FnOnce()) -> Outcome {
    forward();
    Outcome::Forwarded
}

fn selected_entry(listing: &[InventoryEntryRef], selected: i32) -> Option<(u32, &InventoryEntryRef)> {
    let index = u32::try_from(selected).ok()?;
    listing.get(index as usize).map(|entry| (index, entry))
}

/// Total count across the stacks a row lists; zero when the row cannot be
/// transferred as a whole.
fn full_count(inventory: &dyn InventoryResolver, entry: &InventoryEntryRef) -> u32 {
    if !entry.handle.is_valid() || entry.stack_index.is_empty() {
        return 0;
    }
    let Some(item) = inventory.resolve(entry.handle) else {
        return 0;
    };
    entry
        .stack_index
        .iter()
        .filter_map(|id| item.stack(*id))
        .fold(0u32, |total, stack| total.saturating_add(stack.count()))
}
