use bevy::prelude::*;

use crate::eligibility::LineOfSightProvider;

pub mod agent;
pub mod aggregator;
pub mod config;
pub mod eligibility;
pub mod error;
pub mod hold;
pub mod prelude;
pub mod presentation;
pub mod puzzle;
pub mod registry;
pub mod resolver;
pub mod subscription;

/// The main plugin for `bevy_interaction`. Registers events, observers and the
/// per-tick pipeline.
pub struct InteractionPlugin;

impl Plugin for InteractionPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<RangeEvent>()
            .add_event::<InteractIntent>();

        if !app.world().contains_resource::<LineOfSightProvider>() {
            app.insert_resource(LineOfSightProvider::open_space());
        }

        app.configure_sets(
            Update,
            (
                InteractionSet::Membership,
                InteractionSet::Resolve,
                InteractionSet::Interact,
                InteractionSet::Aggregate,
                InteractionSet::Present,
            )
                .chain(),
        );

        app.add_systems(
            Update,
            (
                (agent::record_intents, agent::apply_range_events)
                    .chain()
                    .in_set(InteractionSet::Membership),
                agent::resolve_targets.in_set(InteractionSet::Resolve),
                agent::advance_interactions.in_set(InteractionSet::Interact),
                puzzle::tick_gates.in_set(InteractionSet::Aggregate),
                presentation::update_presentation.in_set(InteractionSet::Present),
            ),
        );

        app.add_observer(registry::initialize_interactable)
            .add_observer(agent::release_removed_agent)
            .add_observer(puzzle::register_gate)
            .add_observer(puzzle::register_trigger)
            .add_observer(puzzle::activate_trigger)
            .add_observer(puzzle::notify_gate)
            .add_observer(puzzle::reset_gate)
            .add_observer(puzzle::follow_through_gate)
            .add_observer(puzzle::apply_trigger_enabled);

        app.register_type::<registry::Interactable>();
        app.register_type::<agent::Interactor>();
        app.register_type::<agent::ViewDirection>();
        app.register_type::<presentation::PresentationFlags>();
        app.register_type::<puzzle::PuzzleTrigger>();
        app.register_type::<puzzle::TriggerGate>();
        app.register_type::<config::InteractableConfig>();
        app.register_type::<config::AgentPolicy>();
        app.register_type::<config::GateConfig>();
    }
}

/// The stages every interaction tick runs through, in order.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InteractionSet {
    /// Range enter/exit and intent input.
    Membership,
    /// Eligibility evaluation and target selection.
    Resolve,
    /// Immediate interactions and the hold machine.
    Interact,
    /// Puzzle gate windows.
    Aggregate,
    /// Marker, name label and prompt notifications.
    Present,
}

/// Proximity input from the host's overlap detection.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeEvent {
    Entered { agent: Entity, interactable: Entity },
    Exited { agent: Entity, interactable: Entity },
}

/// Interact button input for an agent.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractIntent {
    Pressed { agent: Entity },
    Released { agent: Entity },
}

/// An event that is triggered on an interactable when an agent subscribes to it.
#[derive(Event, Debug, Clone, Copy)]
pub struct Subscribed {
    pub agent: Entity,
}

/// An event that is triggered on an interactable when an agent unsubscribes
/// from it, including when the agent is removed.
#[derive(Event, Debug, Clone, Copy)]
pub struct Unsubscribed {
    pub agent: Entity,
}

/// An event that is triggered on an interactable when agents first become able
/// to interact with it. Not repeated until no agent can.
#[derive(Event, Debug, Clone, Copy)]
pub struct CanInteract {
    pub agent: Entity,
}

/// An event that is triggered on an interactable when its effect fires.
#[derive(Event, Debug, Clone, Copy)]
pub struct Interacted {
    pub agent: Entity,
}

/// An event that is triggered on an agent when its subscription set goes from
/// empty to non-empty.
#[derive(Event, Debug, Clone, Copy)]
pub struct FirstSubscribed {
    pub interactable: Entity,
}

/// An event that is triggered on an agent when its last subscription is removed.
#[derive(Event, Debug, Clone, Copy)]
pub struct NoneLeft;

/// An event that is triggered on an agent when its resolved target changes to
/// `interactable`.
#[derive(Event, Debug, Clone, Copy)]
pub struct TargetSelected {
    pub interactable: Entity,
}

/// An event that is triggered on an agent when `interactable` stops being its
/// resolved target.
#[derive(Event, Debug, Clone, Copy)]
pub struct TargetCleared {
    pub interactable: Entity,
}

/// Hold progress for an agent's current hold.
#[derive(Event, Debug, Clone, Copy)]
pub struct ShowProgress {
    pub interactable: Entity,
    pub fraction: f32,
}

#[derive(Event, Debug, Clone, Copy)]
pub struct HideProgress;

#[derive(Event, Debug, Clone, Copy)]
pub struct ShowMarker;

#[derive(Event, Debug, Clone, Copy)]
pub struct HideMarker;

#[derive(Event, Debug, Clone)]
pub struct ShowNameLabel {
    pub name: String,
}

#[derive(Event, Debug, Clone, Copy)]
pub struct HideNameLabel;

#[derive(Event, Debug, Clone)]
pub struct ShowPrompt {
    pub text: String,
}

#[derive(Event, Debug, Clone, Copy)]
pub struct HidePrompt;
