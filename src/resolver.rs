use bevy::prelude::*;

use crate::subscription::SubscriptionSet;

/// Picks the single interactable an agent acts on. The current target is kept
/// for as long as it stays eligible, even if something of higher priority
/// becomes eligible meanwhile.
#[derive(Debug, Clone, Default, Reflect)]
pub struct InteractionResolver {
    current: Option<Entity>,
}

/// What a resolution pass did to the current target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Kept(Entity),
    Selected { previous: Option<Entity>, target: Entity },
    Cleared(Entity),
    Empty,
}

impl Resolution {
    pub fn target(&self) -> Option<Entity> {
        match *self {
            Resolution::Kept(target) | Resolution::Selected { target, .. } => Some(target),
            Resolution::Cleared(_) | Resolution::Empty => None,
        }
    }
}

impl InteractionResolver {
    pub fn current(&self) -> Option<Entity> {
        self.current
    }

    /// Sticky-until-invalid resolution over `set`. `eligible` answers for one
    /// interactable; a destroyed interactable must answer `false`.
    pub fn resolve(&mut self, set: &SubscriptionSet, mut eligible: impl FnMut(Entity) -> bool) -> Resolution {
        let previous = self.current;
        if let Some(current) = previous {
            if set.contains(current) && eligible(current) {
                return Resolution::Kept(current);
            }
        }

        self.current = set
            .iter()
            .filter(|candidate| Some(*candidate) != previous)
            .find(|candidate| eligible(*candidate));

        match (previous, self.current) {
            (_, Some(target)) => Resolution::Selected { previous, target },
            (Some(previous), None) => Resolution::Cleared(previous),
            (None, None) => Resolution::Empty,
        }
    }

    /// Forgets `interactable` if it is the current target.
    pub fn release(&mut self, interactable: Entity) -> bool {
        if self.current == Some(interactable) {
            self.current = None;
            return true;
        }
        false
    }

    pub fn clear(&mut self) -> Option<Entity> {
        self.current.take()
    }
}

/// Multi-select resolution: every eligible interactable, in set order.
pub fn eligible_targets(set: &SubscriptionSet, mut eligible: impl FnMut(Entity) -> bool) -> Vec<Entity> {
    set.iter().filter(|candidate| eligible(*candidate)).collect()
}
