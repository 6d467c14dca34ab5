use bevy::{platform::collections::HashSet, prelude::*};
use thiserror::Error;
use tracing::warn;

/// Everything that can go wrong inside the interaction core. None of these are
/// fatal: callers log them and carry on with fail-closed behavior.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InteractionError {
    #[error("{operation}: entity {entity:?} does not exist or lacks the required component")]
    InvalidReference {
        operation: &'static str,
        entity: Entity,
    },
    #[error("agent {agent:?} is not subscribed")]
    NotSubscribed { agent: Entity },
    #[error("agent {agent:?} cannot be evaluated: missing {capability}")]
    MissingCapability {
        agent: Entity,
        capability: Capability,
    },
    #[error("invalid configuration: {field} = {value} ({reason})")]
    ConfigurationInvalid {
        field: &'static str,
        value: f32,
        reason: &'static str,
    },
}

/// Data an agent or the world must provide before a check can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect)]
pub enum Capability {
    /// The agent has no `Interactor` component.
    Interactor,
    /// The agent has no transform to measure from.
    Position,
    /// The agent's view direction is missing or degenerate.
    Orientation,
    /// No line of sight provider is installed.
    WorldQuery,
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Capability::Interactor => "interaction component",
            Capability::Position => "position",
            Capability::Orientation => "orientation",
            Capability::WorldQuery => "line of sight provider",
        };
        f.write_str(name)
    }
}

/// Remembers which (agent, target, capability) failures were already reported
/// so a missing capability is logged once instead of every tick.
#[derive(Default, Debug, Clone)]
pub struct DiagnosticLatch {
    reported: HashSet<(Entity, Entity, Capability)>,
}

impl DiagnosticLatch {
    /// Logs the failure the first time it is seen. Returns whether it was logged.
    pub fn report(&mut self, agent: Entity, target: Entity, capability: Capability) -> bool {
        if !self.reported.insert((agent, target, capability)) {
            return false;
        }
        let error = InteractionError::MissingCapability { agent, capability };
        warn!(target_entity = ?target, "{error}");
        true
    }

    /// Forgets every latched failure involving `target`, so a fresh
    /// subscription reports again.
    pub fn forget_target(&mut self, target: Entity) {
        self.reported.retain(|(_, t, _)| *t != target);
    }

    pub fn is_empty(&self) -> bool {
        self.reported.is_empty()
    }
}
