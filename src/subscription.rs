use bevy::prelude::*;

use crate::config::PriorityOrder;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Reflect)]
pub struct SubscriptionEntry {
    pub interactable: Entity,
    pub priority: i32,
    /// Insertion sequence, the tie breaker between equal priorities.
    seq: u64,
}

/// What `insert` did to the set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Membership {
    /// The set was empty before this entry.
    First,
    Added,
    AlreadyPresent,
}

/// What `remove` did to the set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    /// The set is now empty.
    LastRemoved,
    Removed,
    NotPresent,
}

/// An agent's ordered set of interactables in range. Sorted by priority in the
/// agent's order; equal priorities keep insertion order.
#[derive(Debug, Clone, Default, Reflect)]
pub struct SubscriptionSet {
    entries: Vec<SubscriptionEntry>,
    order: PriorityOrder,
    next_seq: u64,
}

impl SubscriptionSet {
    pub fn new(order: PriorityOrder) -> Self {
        Self {
            order,
            ..default()
        }
    }

    pub fn order(&self) -> PriorityOrder {
        self.order
    }

    pub fn set_order(&mut self, order: PriorityOrder) {
        self.order = order;
        self.sort();
    }

    pub fn insert(&mut self, interactable: Entity, priority: i32) -> Membership {
        if self.contains(interactable) {
            return Membership::AlreadyPresent;
        }
        let first = self.entries.is_empty();
        self.entries.push(SubscriptionEntry {
            interactable,
            priority,
            seq: self.next_seq,
        });
        self.next_seq += 1;
        self.sort();
        if first {
            Membership::First
        } else {
            Membership::Added
        }
    }

    pub fn remove(&mut self, interactable: Entity) -> Removal {
        let Some(index) = self.entries.iter().position(|entry| entry.interactable == interactable) else {
            return Removal::NotPresent;
        };
        self.entries.remove(index);
        if self.entries.is_empty() {
            Removal::LastRemoved
        } else {
            Removal::Removed
        }
    }

    pub fn contains(&self, interactable: Entity) -> bool {
        self.entries.iter().any(|entry| entry.interactable == interactable)
    }

    /// Interactables in resolution order.
    pub fn iter(&self) -> impl Iterator<Item = Entity> + '_ {
        self.entries.iter().map(|entry| entry.interactable)
    }

    pub fn entries(&self) -> &[SubscriptionEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn sort(&mut self) {
        let order = self.order;
        self.entries.sort_by(|a, b| {
            let by_priority = match order {
                PriorityOrder::HigherFirst => b.priority.cmp(&a.priority),
                PriorityOrder::LowerFirst => a.priority.cmp(&b.priority),
            };
            by_priority.then(a.seq.cmp(&b.seq))
        });
    }
}
