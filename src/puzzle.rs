use bevy::prelude::*;
use tracing::{debug, info, warn};

use crate::{
    aggregator::ObserverAggregator, config::GateConfig, error::InteractionError, registry::Interactable, Interacted,
};

/// A switch, lever or plate that reports to the gates observing it whenever
/// its interactable fires.
#[derive(Component, Reflect, Debug, Clone)]
#[reflect(Component)]
pub struct PuzzleTrigger {
    enabled: bool,
    fired_before: bool,
    gates: Vec<Entity>,
}

impl Default for PuzzleTrigger {
    fn default() -> Self {
        Self {
            enabled: true,
            fired_before: false,
            gates: Vec::new(),
        }
    }
}

impl PuzzleTrigger {
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn has_fired(&self) -> bool {
        self.fired_before
    }

    /// Gates observing this trigger.
    pub fn gates(&self) -> &[Entity] {
        &self.gates
    }

    fn observe(&mut self, gate: Entity) {
        if !self.gates.contains(&gate) {
            self.gates.push(gate);
        }
    }
}

/// A door or mechanism that opens once every required trigger has fired.
#[derive(Component, Reflect, Debug, Clone)]
#[reflect(Component)]
pub struct TriggerGate {
    aggregator: ObserverAggregator,
}

impl TriggerGate {
    pub fn new(required: impl IntoIterator<Item = Entity>, config: GateConfig) -> Self {
        Self {
            aggregator: ObserverAggregator::new(required, config),
        }
    }

    pub fn aggregator(&self) -> &ObserverAggregator {
        &self.aggregator
    }

    pub fn is_satisfied(&self) -> bool {
        self.aggregator.is_satisfied()
    }
}

/// Sent to a gate when one of its triggers fired.
#[derive(Event, Debug, Clone, Copy)]
pub struct TriggerActivated {
    pub trigger: Entity,
    /// The trigger had fired before. A gate that already counted it this
    /// cycle starts a new one.
    pub reset_cycle: bool,
}

/// An event that is triggered on a gate when every required trigger has fired.
#[derive(Event, Debug, Clone, Copy)]
pub struct RequirementsSatisfied;

/// An event that is triggered on a gate when its progress is cleared.
#[derive(Event, Debug, Clone, Copy)]
pub struct GateReset;

/// Trigger on a gate to clear its progress. Ignored by a permanently satisfied
/// gate.
#[derive(Event, Debug, Clone, Copy)]
pub struct ResetGate;

/// Trigger on a gate to report that the follow-on action happened inside its
/// timed window.
#[derive(Event, Debug, Clone, Copy)]
pub struct FollowThroughGate;

/// Enables or disables a trigger, along with its interactable.
#[derive(Event, Debug, Clone, Copy)]
pub struct SetTriggerEnabled {
    pub enabled: bool,
}

fn broadcast_enabled(gate: &TriggerGate, enabled: bool, commands: &mut Commands) {
    for &trigger in gate.aggregator.required() {
        commands.trigger_targets(SetTriggerEnabled { enabled }, trigger);
    }
}

fn announce_reset(entity: Entity, gate: &TriggerGate, commands: &mut Commands) {
    debug!(gate = ?entity, "gate reset");
    commands.trigger_targets(GateReset, entity);
    broadcast_enabled(gate, true, commands);
}

/// Subscribes a new gate to the triggers that already exist.
pub(crate) fn register_gate(
    trigger: Trigger<OnAdd, TriggerGate>,
    mut gates: Query<&mut TriggerGate>,
    mut triggers: Query<&mut PuzzleTrigger>,
) {
    let entity = trigger.target();
    let Ok(mut gate) = gates.get_mut(entity) else {
        return;
    };
    if let Some(issue) = gate.aggregator.config_mut().sanitize() {
        debug!(gate = ?entity, "{issue}");
    }
    for &required in gate.aggregator.required() {
        match triggers.get_mut(required) {
            Ok(mut puzzle_trigger) => puzzle_trigger.observe(entity),
            Err(_) => warn!(
                gate = ?entity,
                "{}",
                InteractionError::InvalidReference { operation: "register gate", entity: required }
            ),
        }
    }
}

/// Hooks a trigger added after its gate up to that gate.
pub(crate) fn register_trigger(
    trigger: Trigger<OnAdd, PuzzleTrigger>,
    gates: Query<(Entity, &TriggerGate)>,
    mut triggers: Query<&mut PuzzleTrigger>,
) {
    let entity = trigger.target();
    let Ok(mut puzzle_trigger) = triggers.get_mut(entity) else {
        return;
    };
    for (gate_entity, gate) in &gates {
        if gate.aggregator.required().contains(&entity) {
            puzzle_trigger.observe(gate_entity);
        }
    }
}

/// Reports an interaction on a trigger to every gate observing it.
pub(crate) fn activate_trigger(
    trigger: Trigger<Interacted>,
    mut triggers: Query<&mut PuzzleTrigger>,
    mut commands: Commands,
) {
    let entity = trigger.target();
    let Ok(mut puzzle_trigger) = triggers.get_mut(entity) else {
        return;
    };
    if !puzzle_trigger.enabled {
        debug!(trigger = ?entity, "trigger disabled, ignoring interaction");
        return;
    }
    let reset_cycle = puzzle_trigger.fired_before;
    puzzle_trigger.fired_before = true;
    for &gate in &puzzle_trigger.gates {
        commands.trigger_targets(
            TriggerActivated {
                trigger: entity,
                reset_cycle,
            },
            gate,
        );
    }
}

pub(crate) fn notify_gate(
    trigger: Trigger<TriggerActivated>,
    mut gates: Query<&mut TriggerGate>,
    mut commands: Commands,
) {
    let entity = trigger.target();
    let event = trigger.event();
    let Ok(mut gate) = gates.get_mut(entity) else {
        return;
    };
    let outcome = match gate.aggregator.notify(event.trigger, event.reset_cycle) {
        Ok(outcome) => outcome,
        Err(error) => {
            warn!(gate = ?entity, "{error}");
            return;
        }
    };

    if outcome.reset {
        announce_reset(entity, &gate, &mut commands);
    }
    if outcome.counted {
        debug!(
            gate = ?entity,
            satisfied = gate.aggregator.satisfied_count(),
            required = gate.aggregator.required().len(),
            "trigger counted"
        );
    }
    if outcome.satisfied {
        info!(gate = ?entity, "requirements satisfied");
        commands.trigger_targets(RequirementsSatisfied, entity);
        broadcast_enabled(&gate, false, &mut commands);
    }
}

/// Runs down timed windows.
pub(crate) fn tick_gates(time: Res<Time>, mut gates: Query<(Entity, &mut TriggerGate)>, mut commands: Commands) {
    for (entity, mut gate) in &mut gates {
        if gate.aggregator.remaining().is_none() {
            continue;
        }
        if gate.aggregator.tick(time.delta()) {
            announce_reset(entity, &gate, &mut commands);
        }
    }
}

pub(crate) fn reset_gate(trigger: Trigger<ResetGate>, mut gates: Query<&mut TriggerGate>, mut commands: Commands) {
    let entity = trigger.target();
    let Ok(mut gate) = gates.get_mut(entity) else {
        warn!("{}", InteractionError::InvalidReference { operation: "reset gate", entity });
        return;
    };
    if gate.aggregator.reset() {
        announce_reset(entity, &gate, &mut commands);
    } else {
        debug!(gate = ?entity, "gate locked, reset ignored");
    }
}

pub(crate) fn follow_through_gate(trigger: Trigger<FollowThroughGate>, mut gates: Query<&mut TriggerGate>) {
    let entity = trigger.target();
    let Ok(mut gate) = gates.get_mut(entity) else {
        warn!("{}", InteractionError::InvalidReference { operation: "follow through", entity });
        return;
    };
    if gate.aggregator.follow_through() {
        debug!(gate = ?entity, "window disarmed, gate stays satisfied");
    }
}

pub(crate) fn apply_trigger_enabled(
    trigger: Trigger<SetTriggerEnabled>,
    mut triggers: Query<(&mut PuzzleTrigger, Option<&mut Interactable>)>,
) {
    let entity = trigger.target();
    let enabled = trigger.event().enabled;
    let Ok((mut puzzle_trigger, interactable)) = triggers.get_mut(entity) else {
        return;
    };
    puzzle_trigger.enabled = enabled;
    if let Some(mut interactable) = interactable {
        if enabled {
            interactable.enable();
        } else {
            interactable.disable();
        }
    }
}
