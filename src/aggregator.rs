use std::time::Duration;

use bevy::{platform::collections::HashSet, prelude::*};
use tracing::debug;

use crate::{
    config::{CompletionPolicy, GateConfig, TimerStart},
    error::InteractionError,
};

/// What a single trigger notification did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NotifyOutcome {
    /// The notification started a new cycle and reset progress first.
    pub reset: bool,
    /// The trigger was newly counted.
    pub counted: bool,
    /// This notification completed the set.
    pub satisfied: bool,
}

/// Counts distinct required triggers until all of them have fired, then applies
/// the gate's completion policy.
#[derive(Debug, Clone, Reflect)]
pub struct ObserverAggregator {
    required: Vec<Entity>,
    satisfied: HashSet<Entity>,
    config: GateConfig,
    timer: Option<Timer>,
    locked: bool,
    completed: bool,
}

impl ObserverAggregator {
    pub fn new(required: impl IntoIterator<Item = Entity>, config: GateConfig) -> Self {
        let mut unique = Vec::new();
        for trigger in required {
            if !unique.contains(&trigger) {
                unique.push(trigger);
            }
        }
        Self {
            required: unique,
            satisfied: HashSet::default(),
            config,
            timer: None,
            locked: false,
            completed: false,
        }
    }

    pub fn required(&self) -> &[Entity] {
        &self.required
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    pub(crate) fn config_mut(&mut self) -> &mut GateConfig {
        &mut self.config
    }

    pub fn satisfied_count(&self) -> usize {
        self.satisfied.len()
    }

    pub fn is_satisfied(&self) -> bool {
        self.completed
    }

    /// Permanently satisfied; every further notify and reset is ignored.
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Time left in the armed window, if any.
    pub fn remaining(&self) -> Option<Duration> {
        self.timer.as_ref().map(Timer::remaining)
    }

    /// Records that `trigger` fired. With `reset_cycle` the trigger has fired
    /// before; if it already counts toward the current cycle, progress is reset
    /// before counting it again. Otherwise it simply joins the current cycle.
    pub fn notify(&mut self, trigger: Entity, reset_cycle: bool) -> Result<NotifyOutcome, InteractionError> {
        let mut outcome = NotifyOutcome::default();
        if self.locked {
            debug!(?trigger, "gate locked, notification ignored");
            return Ok(outcome);
        }
        if !self.required.contains(&trigger) {
            return Err(InteractionError::InvalidReference {
                operation: "notify",
                entity: trigger,
            });
        }

        if reset_cycle && self.satisfied.contains(&trigger) {
            outcome.reset = self.reset();
        }
        if !self.satisfied.insert(trigger) {
            return Ok(outcome);
        }
        outcome.counted = true;

        let window = self.window();
        if self.config.timer_start == TimerStart::OnFirstTrigger && self.timer.is_none() {
            self.timer = window.map(|window| Timer::new(window, TimerMode::Once));
        }

        if !self.completed && self.satisfied.len() == self.required.len() {
            self.completed = true;
            outcome.satisfied = true;
            match self.config.completion {
                CompletionPolicy::Permanent => {
                    self.locked = true;
                    self.timer = None;
                }
                CompletionPolicy::TimedWindow { .. } => {
                    if self.timer.is_none() {
                        self.timer = window.map(|window| Timer::new(window, TimerMode::Once));
                    }
                }
                CompletionPolicy::Latched => {}
            }
        }
        Ok(outcome)
    }

    /// Advances an armed window. Returns true when the window ran out and the
    /// gate reset.
    pub fn tick(&mut self, delta: Duration) -> bool {
        let Some(timer) = self.timer.as_mut() else {
            return false;
        };
        timer.tick(delta);
        if !timer.finished() {
            return false;
        }
        debug!("gate window expired");
        self.reset()
    }

    /// Clears progress and disarms the window. Does nothing once locked.
    pub fn reset(&mut self) -> bool {
        if self.locked {
            return false;
        }
        self.satisfied.clear();
        self.completed = false;
        self.timer = None;
        true
    }

    /// The follow-on action happened inside the window: disarm the timer so the
    /// gate stays satisfied until an explicit reset.
    pub fn follow_through(&mut self) -> bool {
        if !self.completed {
            return false;
        }
        self.timer.take().is_some()
    }

    fn window(&self) -> Option<Duration> {
        match self.config.completion {
            CompletionPolicy::TimedWindow { seconds } if seconds > 0.0 => Duration::try_from_secs_f32(seconds).ok(),
            _ => None,
        }
    }
}
