//! The host dispatch points the locker redirects.

/// Each intercepted operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookSite {
    /// `ContainerMenu::DoItemTransfer`.
    ContainerTransfer,
    /// `BarterMenu::DoItemTransfer`.
    BarterTransfer,
    /// `ScrapItemCallback::OnAccept`.
    ScrapAccept,
    /// The call into the container menu's "take all" routine.
    TakeAll,
}

impl HookSite {
    pub const ALL: [HookSite; 4] = [
        HookSite::ContainerTransfer,
        HookSite::BarterTransfer,
        HookSite::ScrapAccept,
        HookSite::TakeAll,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::ContainerTransfer => "container transfer",
            Self::BarterTransfer => "barter transfer",
            Self::ScrapAccept => "scrap accept",
            Self::TakeAll => "take all",
        }
    }

    /// Dispatch-table slot for the vtable-hooked sites.
    pub fn slot_index(self) -> Option<usize> {
        match self {
            Self::ContainerTransfer | Self::BarterTransfer => Some(0x15),
            Self::ScrapAccept => Some(0x01),
            Self::TakeAll => None,
        }
    }
}

impl std::fmt::Display for HookSite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
