//! A one-row host used to show what the interceptors decide for an item.

use host::{
    Actor, Container, Direction, ExamineMenu, InventoryEntryRef, InventoryHandle,
    InventoryResolver, ResolvedItem, ScrapCallback, Stack, TransferMenu,
};
use locker::{Interceptors, Outcome, TakeAllOutcome};
use policy::Policy;
use serde::Serialize;

const HANDLE: InventoryHandle = InventoryHandle(1);

/// The single item being explained and where it is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Scenario {
    pub equipped: bool,
    pub favorite: bool,
    /// The other side of the menu is a dead actor.
    pub corpse: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Container(Direction),
    Barter(Direction),
    Scrap,
    TakeAll,
}

impl Operation {
    pub fn transfers(direction: Option<Direction>) -> Vec<Operation> {
        let directions = match direction {
            Some(d) => vec![d],
            None => vec![Direction::ToContainer, Direction::FromContainer],
        };
        let mut ops: Vec<_> = directions.iter().map(|d| Operation::Container(*d)).collect();
        ops.extend(directions.iter().map(|d| Operation::Barter(*d)));
        ops
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Container(d) => write!(f, "container transfer ({d})"),
            Self::Barter(d) => write!(f, "barter transfer ({d})"),
            Self::Scrap => f.write_str("scrap"),
            Self::TakeAll => f.write_str("take all"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verdict {
    pub operation: String,
    pub outcome: &'static str,
}

impl Scenario {
    fn row(&self) -> InventoryEntryRef {
        InventoryEntryRef::new(HANDLE, vec![0])
    }

    pub fn explain(&self, policy: &Policy, operation: Operation) -> Verdict {
        let icpt = Interceptors::new(policy, Some(self));
        let outcome = match operation {
            Operation::Container(d) => describe(icpt.container_transfer(self, 0, 1, d, || {})),
            Operation::Barter(d) => describe(icpt.barter_transfer(self, 0, 1, d, || {})),
            Operation::Scrap => describe(icpt.scrap_accept(self, || {})),
            Operation::TakeAll => match icpt.take_all(self, || {}, |_, _| {}) {
                TakeAllOutcome::Forwarded => "host routine",
                TakeAllOutcome::Aborted => "aborted",
                TakeAllOutcome::Completed(summary) if summary.blocked.is_empty() => "allowed",
                TakeAllOutcome::Completed(_) => "left behind",
            },
        };
        Verdict {
            operation: operation.to_string(),
            outcome,
        }
    }
}

fn describe(outcome: Outcome) -> &'static str {
    match outcome {
        Outcome::Forwarded => "allowed",
        Outcome::Intercepted => "blocked",
    }
}

impl Stack for Scenario {
    fn is_equipped(&self) -> bool {
        self.equipped
    }

    fn is_favorite(&self) -> bool {
        self.favorite
    }

    fn count(&self) -> u32 {
        1
    }
}

impl ResolvedItem for Scenario {
    fn stack(&self, id: u32) -> Option<&dyn Stack> {
        (id == 0).then_some(self as &dyn Stack)
    }
}

impl InventoryResolver for Scenario {
    fn resolve(&self, handle: InventoryHandle) -> Option<&dyn ResolvedItem> {
        (handle == HANDLE).then_some(self as &dyn ResolvedItem)
    }
}

impl Actor for Scenario {
    fn is_dead(&self) -> bool {
        self.corpse
    }
}

impl Container for Scenario {
    fn as_actor(&self) -> Option<&dyn Actor> {
        self.corpse.then_some(self as &dyn Actor)
    }
}

impl TransferMenu for Scenario {
    fn entry_at(&self, _direction: Direction, index: u32) -> Option<InventoryEntryRef> {
        (index == 0).then(|| self.row())
    }

    fn container(&self) -> Option<&dyn Container> {
        Some(self)
    }

    fn container_listing(&self) -> Vec<InventoryEntryRef> {
        vec![self.row()]
    }

    fn refresh_list(&self) {}

    fn recompute_totals(&self) {}
}

impl ExamineMenu for Scenario {
    fn selected_index(&self) -> i32 {
        0
    }

    fn listing(&self) -> Vec<InventoryEntryRef> {
        vec![self.row()]
    }
}

impl ScrapCallback for Scenario {
    fn menu(&self) -> Option<&dyn ExamineMenu> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EQUIPPED: Scenario = Scenario {
        equipped: true,
        favorite: false,
        corpse: false,
    };

    fn outcome(policy: &Policy, scenario: Scenario, op: Operation) -> &'static str {
        scenario.explain(policy, op).outcome
    }

    #[test]
    fn test_equipped_item_blocked_everywhere_by_default() {
        let policy = Policy::default();
        for op in Operation::transfers(None) {
            assert_eq!(outcome(&policy, EQUIPPED, op), "blocked", "{op}");
        }
        assert_eq!(outcome(&policy, EQUIPPED, Operation::Scrap), "blocked");
        assert_eq!(outcome(&policy, EQUIPPED, Operation::TakeAll), "left behind");
    }

    #[test]
    fn test_plain_item_allowed() {
        let policy = Policy::default();
        let plain = Scenario::default();
        for op in Operation::transfers(None) {
            assert_eq!(outcome(&policy, plain, op), "allowed", "{op}");
        }
        assert_eq!(outcome(&policy, plain, Operation::TakeAll), "allowed");
    }

    #[test]
    fn test_corpse_exempts_transfers_but_not_scrap() {
        let policy = Policy::default();
        let looted = Scenario {
            corpse: true,
            ..EQUIPPED
        };
        let op = Operation::Container(Direction::FromContainer);
        assert_eq!(outcome(&policy, looted, op), "allowed");
        assert_eq!(outcome(&policy, looted, Operation::Scrap), "blocked");
    }

    #[test]
    fn test_take_all_unchecked_without_its_lock() {
        let policy = Policy {
            lock_take_all: false,
            ..Policy::default()
        };
        assert_eq!(outcome(&policy, EQUIPPED, Operation::TakeAll), "host routine");
    }

    #[test]
    fn test_direction_filter() {
        let ops = Operation::transfers(Some(Direction::ToContainer));
        assert_eq!(
            ops,
            vec![
                Operation::Container(Direction::ToContainer),
                Operation::Barter(Direction::ToContainer),
            ]
        );
        let verdict = EQUIPPED.explain(&Policy::default(), ops[1]);
        assert_eq!(verdict.operation, "barter transfer (to-container)");
    }
}
