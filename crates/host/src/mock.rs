//! In-memory host used by tests.
//!
//! Menus record what was done to them so tests can assert on forwarded
//! transfers, list refreshes and totals recomputation.

use crate::{
    Actor, Container, Direction, ExamineMenu, InventoryEntryRef, InventoryHandle,
    InventoryResolver, ResolvedItem, ScrapCallback, Stack, TransferMenu,
};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MockStack {
    pub equipped: bool,
    pub favorite: bool,
    pub count: u32,
}

impl MockStack {
    pub fn plain(count: u32) -> Self {
        Self {
            count,
            ..Self::default()
        }
    }

    pub fn equipped() -> Self {
        Self {
            equipped: true,
            count: 1,
            ..Self::default()
        }
    }

    pub fn favorite() -> Self {
        Self {
            favorite: true,
            count: 1,
            ..Self::default()
        }
    }
}

impl Stack for MockStack {
    fn is_equipped(&self) -> bool {
        self.equipped
    }

    fn is_favorite(&self) -> bool {
        self.favorite
    }

    fn count(&self) -> u32 {
        self.count
    }
}

#[derive(Debug, Clone, Default)]
pub struct MockItem {
    pub stacks: Vec<MockStack>,
}

impl MockItem {
    pub fn new(stacks: impl Into<Vec<MockStack>>) -> Self {
        Self {
            stacks: stacks.into(),
        }
    }
}

impl ResolvedItem for MockItem {
    fn stack(&self, id: u32) -> Option<&dyn Stack> {
        self.stacks.get(id as usize).map(|s| s as &dyn Stack)
    }
}

/// Handle table backing [`InventoryResolver`].
#[derive(Debug, Clone, Default)]
pub struct MockInventory {
    items: HashMap<InventoryHandle, MockItem>,
    lookups: Cell<usize>,
}

impl MockInventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_item(mut self, handle: u32, item: MockItem) -> Self {
        self.items.insert(InventoryHandle(handle), item);
        self
    }

    /// How many times `resolve` has been called.
    pub fn lookups(&self) -> usize {
        self.lookups.get()
    }
}

impl InventoryResolver for MockInventory {
    fn resolve(&self, handle: InventoryHandle) -> Option<&dyn ResolvedItem> {
        self.lookups.set(self.lookups.get() + 1);
        self.items.get(&handle).map(|i| i as &dyn ResolvedItem)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MockActor {
    pub dead: bool,
}

impl Actor for MockActor {
    fn is_dead(&self) -> bool {
        self.dead
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MockContainer {
    pub actor: Option<MockActor>,
}

impl MockContainer {
    /// A plain chest or workbench.
    pub fn object() -> Self {
        Self { actor: None }
    }

    pub fn actor(dead: bool) -> Self {
        Self {
            actor: Some(MockActor { dead }),
        }
    }
}

impl Container for MockContainer {
    fn as_actor(&self) -> Option<&dyn Actor> {
        self.actor.as_ref().map(|a| a as &dyn Actor)
    }
}

/// A transfer the mock host carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transfer {
    pub index: u32,
    pub count: u32,
    pub direction: Direction,
}

/// Container or barter menu with a container pane and a player pane.
#[derive(Debug, Default)]
pub struct MockTransferMenu {
    container_items: RefCell<Vec<InventoryEntryRef>>,
    player_items: RefCell<Vec<InventoryEntryRef>>,
    container: Option<MockContainer>,
    transfers: RefCell<Vec<Transfer>>,
    refreshes: Cell<usize>,
    recomputes: Cell<usize>,
}

impl MockTransferMenu {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_container_items(self, items: impl Into<Vec<InventoryEntryRef>>) -> Self {
        *self.container_items.borrow_mut() = items.into();
        self
    }

    pub fn with_player_items(self, items: impl Into<Vec<InventoryEntryRef>>) -> Self {
        *self.player_items.borrow_mut() = items.into();
        self
    }

    pub fn with_container(mut self, container: MockContainer) -> Self {
        self.container = Some(container);
        self
    }

    /// Stands in for the host's unwrapped item transfer: moves the row to
    /// the other pane and records the call.
    pub fn transfer(&self, index: u32, count: u32, direction: Direction) {
        self.transfers.borrow_mut().push(Transfer {
            index,
            count,
            direction,
        });

        let (from, to) = match direction {
            Direction::FromContainer => (&self.container_items, &self.player_items),
            Direction::ToContainer => (&self.player_items, &self.container_items),
        };
        let mut from = from.borrow_mut();
        if (index as usize) < from.len() {
            let row = from.remove(index as usize);
            to.borrow_mut().push(row);
        }
    }

    pub fn transfers(&self) -> Vec<Transfer> {
        self.transfers.borrow().clone()
    }

    pub fn container_items(&self) -> Vec<InventoryEntryRef> {
        self.container_items.borrow().clone()
    }

    pub fn player_items(&self) -> Vec<InventoryEntryRef> {
        self.player_items.borrow().clone()
    }

    pub fn refresh_count(&self) -> usize {
        self.refreshes.get()
    }

    pub fn recompute_count(&self) -> usize {
        self.recomputes.get()
    }
}

impl TransferMenu for MockTransferMenu {
    fn entry_at(&self, direction: Direction, index: u32) -> Option<InventoryEntryRef> {
        let pane = match direction {
            Direction::FromContainer => self.container_items.borrow(),
            Direction::ToContainer => self.player_items.borrow(),
        };
        pane.get(index as usize).cloned()
    }

    fn container(&self) -> Option<&dyn Container> {
        self.container.as_ref().map(|c| c as &dyn Container)
    }

    fn container_listing(&self) -> Vec<InventoryEntryRef> {
        self.container_items()
    }

    fn refresh_list(&self) {
        self.refreshes.set(self.refreshes.get() + 1);
    }

    fn recompute_totals(&self) {
        self.recomputes.set(self.recomputes.get() + 1);
    }
}

#[derive(Debug, Clone, Default)]
pub struct MockExamineMenu {
    pub selected: i32,
    pub listing: Vec<InventoryEntryRef>,
}

impl MockExamineMenu {
    pub fn new(listing: impl Into<Vec<InventoryEntryRef>>, selected: i32) -> Self {
        Self {
            selected,
            listing: listing.into(),
        }
    }
}

impl ExamineMenu for MockExamineMenu {
    fn selected_index(&self) -> i32 {
        self.selected
    }

    fn listing(&self) -> Vec<InventoryEntryRef> {
        self.listing.clone()
    }
}

#[derive(Debug, Clone, Default)]
pub struct MockScrapCallback {
    pub menu: Option<MockExamineMenu>,
}

impl MockScrapCallback {
    pub fn new(menu: MockExamineMenu) -> Self {
        Self { menu: Some(menu) }
    }
}

impl ScrapCallback for MockScrapCallback {
    fn menu(&self) -> Option<&dyn ExamineMenu> {
        self.menu.as_ref().map(|m| m as &dyn ExamineMenu)
    }
}

/// Shorthand for an entry naming `stacks` of `handle`.
pub fn entry(handle: u32, stacks: &[u32]) -> InventoryEntryRef {
    InventoryEntryRef::new(InventoryHandle(handle), stacks.to_vec())
}
