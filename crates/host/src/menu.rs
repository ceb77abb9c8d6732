//! Menus whose operations get intercepted.

use crate::{Container, InventoryEntryRef};
use serde::{Deserialize, Serialize};

/// Which way an item moves in a two-pane transfer menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Player inventory into the container (storing, selling).
    ToContainer,
    /// Container into the player inventory (looting, buying).
    FromContainer,
}

impl Direction {
    /// Maps the host's `fromContainer` flag.
    pub fn from_container_flag(from_container: bool) -> Self {
        if from_container {
            Self::FromContainer
        } else {
            Self::ToContainer
        }
    }

    pub fn is_from_container(self) -> bool {
        matches!(self, Self::FromContainer)
    }

    pub fn opposite(self) -> Self {
        match self {
            Self::ToContainer => Self::FromContainer,
            Self::FromContainer => Self::ToContainer,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ToContainer => f.write_str("to-container"),
            Self::FromContainer => f.write_str("from-container"),
        }
    }
}

/// A two-pane transfer menu (container or barter).
///
/// The unwrapped item transfer is deliberately absent: it is only reachable
/// through the original entry point captured when the hook was installed.
pub trait TransferMenu {
    /// The entry at `index` in the list belonging to `direction`.
    ///
    /// List indexing is relative to the pane, so for a given call only one
    /// direction yields an entry.
    fn entry_at(&self, direction: Direction, index: u32) -> Option<InventoryEntryRef>;

    fn container(&self) -> Option<&dyn Container>;

    /// Every row of the container pane, in list order.
    fn container_listing(&self) -> Vec<InventoryEntryRef>;

    /// Rebuild the visible lists after a transfer.
    fn refresh_list(&self);

    /// Recompute carry weight and currency totals.
    fn recompute_totals(&self);
}

/// The examine (workbench) menu scrapping happens from.
pub trait ExamineMenu {
    /// Currently highlighted row; negative when nothing is selected.
    fn selected_index(&self) -> i32;

    fn listing(&self) -> Vec<InventoryEntryRef>;
}

/// The confirmation callback the host runs when a scrap is accepted.
pub trait ScrapCallback {
    fn menu(&self) -> Option<&dyn ExamineMenu>;
}
