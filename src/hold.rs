use bevy::prelude::*;

use crate::config::InteractableConfig;

#[derive(Debug, Clone, Copy, PartialEq, Default, Reflect)]
pub enum HoldPhase {
    #[default]
    Idle,
    Holding { target: Entity, elapsed: f32 },
}

/// One step of the hold machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HoldStep {
    Idle,
    Progress { target: Entity, fraction: f32 },
    /// The hold finished and the effect must fire. With `repeat` the machine is
    /// already holding again from zero.
    Completed { target: Entity, repeat: bool },
    Cancelled { target: Entity },
}

/// Per-agent hold-to-interact state. Time only accumulates while the intent is
/// held and the target stays valid.
#[derive(Debug, Clone, Default, Reflect)]
pub struct HoldInteraction {
    phase: HoldPhase,
}

impl HoldInteraction {
    pub fn phase(&self) -> HoldPhase {
        self.phase
    }

    pub fn target(&self) -> Option<Entity> {
        match self.phase {
            HoldPhase::Holding { target, .. } => Some(target),
            HoldPhase::Idle => None,
        }
    }

    pub fn is_holding(&self) -> bool {
        matches!(self.phase, HoldPhase::Holding { .. })
    }

    pub fn elapsed(&self) -> f32 {
        match self.phase {
            HoldPhase::Holding { elapsed, .. } => elapsed,
            HoldPhase::Idle => 0.0,
        }
    }

    /// Starts holding `target` from zero. Returns the target of a hold that was
    /// abandoned to start this one.
    pub fn begin(&mut self, target: Entity) -> Option<Entity> {
        let previous = self.target().filter(|previous| *previous != target);
        self.phase = HoldPhase::Holding { target, elapsed: 0.0 };
        previous
    }

    /// Advances by `dt` seconds. `still_valid` is false once the intent was
    /// released or the target stopped being eligible.
    pub fn advance(&mut self, dt: f32, config: &InteractableConfig, still_valid: bool) -> HoldStep {
        let HoldPhase::Holding { target, elapsed } = self.phase else {
            return HoldStep::Idle;
        };
        if !still_valid {
            self.phase = HoldPhase::Idle;
            return HoldStep::Cancelled { target };
        }

        let elapsed = elapsed + dt.max(0.0);
        let duration = config.hold_duration_seconds;
        if elapsed >= duration {
            let repeat = config.repeatable_hold;
            self.phase = if repeat {
                HoldPhase::Holding { target, elapsed: 0.0 }
            } else {
                HoldPhase::Idle
            };
            return HoldStep::Completed { target, repeat };
        }

        self.phase = HoldPhase::Holding { target, elapsed };
        HoldStep::Progress {
            target,
            fraction: (elapsed / duration).clamp(0.0, 1.0),
        }
    }

    /// Drops any hold. Returns the abandoned target.
    pub fn cancel(&mut self) -> Option<Entity> {
        let target = self.target();
        self.phase = HoldPhase::Idle;
        target
    }
}
