use bevy::prelude::*;
use tracing::{debug, info, warn};

use crate::{
    config::AgentPolicy,
    eligibility::{AgentView, Eligibility, LineOfSightProvider},
    error::{Capability, DiagnosticLatch, InteractionError},
    hold::{HoldInteraction, HoldStep},
    registry::Interactable,
    resolver::{InteractionResolver, Resolution},
    subscription::{Membership, Removal, SubscriptionSet},
    FirstSubscribed, HideProgress, InteractIntent, Interacted, NoneLeft, RangeEvent, ShowProgress, Subscribed,
    TargetCleared, TargetSelected, Unsubscribed,
};

/// Overrides the view direction used for angle checks. Without it the agent's
/// `Transform` forward is used.
#[derive(Component, Reflect, Debug, Clone, Copy)]
#[reflect(Component)]
pub struct ViewDirection(pub Vec3);

/// An agent capable of interacting: holds its subscription set, its resolved
/// target and its hold state.
#[derive(Component, Reflect, Debug, Clone, Default)]
#[reflect(Component)]
pub struct Interactor {
    policy: AgentPolicy,
    subscriptions: SubscriptionSet,
    resolver: InteractionResolver,
    hold: HoldInteraction,
    intent_held: bool,
    pending_press: bool,
    progress_shown: bool,
    #[reflect(ignore)]
    evaluations: Vec<(Entity, Eligibility)>,
    #[reflect(ignore)]
    diagnostics: DiagnosticLatch,
}

impl Interactor {
    pub fn new(policy: AgentPolicy) -> Self {
        Self {
            subscriptions: SubscriptionSet::new(policy.priority_order),
            policy,
            ..default()
        }
    }

    pub fn policy(&self) -> &AgentPolicy {
        &self.policy
    }

    pub fn set_policy(&mut self, policy: AgentPolicy) {
        self.subscriptions.set_order(policy.priority_order);
        self.policy = policy;
    }

    pub fn subscriptions(&self) -> &SubscriptionSet {
        &self.subscriptions
    }

    /// The resolved target in single-select mode.
    pub fn current_target(&self) -> Option<Entity> {
        self.resolver.current()
    }

    pub fn hold(&self) -> &HoldInteraction {
        &self.hold
    }

    pub fn is_intent_held(&self) -> bool {
        self.intent_held
    }

    /// This tick's evaluation of `interactable`, if it was evaluated.
    pub fn evaluation(&self, interactable: Entity) -> Option<Eligibility> {
        self.evaluations
            .iter()
            .find_map(|(candidate, eligibility)| (*candidate == interactable).then_some(*eligibility))
    }

    pub fn is_eligible(&self, interactable: Entity) -> bool {
        self.evaluation(interactable).is_some_and(|eligibility| eligibility.is_eligible())
    }

    /// Eligible interactables in resolution order.
    pub fn eligible(&self) -> impl Iterator<Item = Entity> + '_ {
        self.evaluations
            .iter()
            .filter(|(_, eligibility)| eligibility.is_eligible())
            .map(|(entity, _)| *entity)
    }

    /// Whether `interactable` is what this agent would act on: the resolved
    /// target in single-select mode, any eligible one otherwise.
    pub fn is_focused_on(&self, interactable: Entity) -> bool {
        if self.policy.single_select {
            self.resolver.current() == Some(interactable)
        } else {
            self.is_eligible(interactable)
        }
    }

    fn view(&self, agent: Entity, transform: Option<&Transform>, direction: Option<&ViewDirection>) -> AgentView {
        AgentView {
            entity: agent,
            position: transform.map(|transform| transform.translation),
            forward: direction
                .map(|direction| direction.0)
                .or_else(|| transform.map(|transform| transform.forward().as_vec3())),
            angle_mode: self.policy.angle_mode,
        }
    }

    /// Removes `interactable` from this agent and cleans up everything that
    /// pointed at it. Returns what happened to the set.
    fn detach(&mut self, agent: Entity, interactable: Entity, commands: &mut Commands) -> Removal {
        let removal = self.subscriptions.remove(interactable);
        if removal == Removal::NotPresent {
            return removal;
        }
        self.evaluations.retain(|(candidate, _)| *candidate != interactable);
        self.diagnostics.forget_target(interactable);

        if self.resolver.release(interactable) {
            commands.trigger_targets(TargetCleared { interactable }, agent);
        }
        if self.hold.target() == Some(interactable) {
            self.hold.cancel();
            self.hide_progress(agent, commands);
        }
        if removal == Removal::LastRemoved {
            commands.trigger_targets(NoneLeft, agent);
        }
        removal
    }

    /// Handles a press. Returns true if a hold started, in which case the
    /// hold does not advance this tick.
    fn press(&mut self, agent: Entity, interactables: &mut Query<&mut Interactable>, commands: &mut Commands) -> bool {
        let targets: Vec<Entity> = if self.policy.single_select {
            self.resolver.current().into_iter().collect()
        } else {
            self.eligible().collect()
        };
        if targets.is_empty() {
            debug!(?agent, "press with nothing to interact with");
            return false;
        }

        let mut started = false;
        for target in targets {
            let Ok(mut registry) = interactables.get_mut(target) else {
                continue;
            };
            if !registry.is_enabled() {
                continue;
            }
            if !registry.config.hold_to_interact {
                fire(agent, target, &mut registry, commands);
                continue;
            }
            if started {
                continue;
            }
            if let Some(abandoned) = self.hold.begin(target) {
                debug!(?agent, interactable = ?abandoned, "hold abandoned for a new target");
            }
            started = true;
            self.progress_shown = true;
            commands.trigger_targets(
                ShowProgress {
                    interactable: target,
                    fraction: 0.0,
                },
                agent,
            );
        }
        started
    }

    fn advance_hold(
        &mut self,
        agent: Entity,
        dt: f32,
        interactables: &mut Query<&mut Interactable>,
        commands: &mut Commands,
    ) {
        let Some(target) = self.hold.target() else {
            return;
        };
        let Ok(mut registry) = interactables.get_mut(target) else {
            self.hold.cancel();
            self.hide_progress(agent, commands);
            return;
        };

        let still_valid = self.intent_held && self.is_eligible(target) && self.is_focused_on(target);
        match self.hold.advance(dt, &registry.config, still_valid) {
            HoldStep::Idle => {}
            HoldStep::Progress { target, fraction } => {
                self.progress_shown = true;
                commands.trigger_targets(
                    ShowProgress {
                        interactable: target,
                        fraction,
                    },
                    agent,
                );
            }
            HoldStep::Completed { target, repeat } => {
                fire(agent, target, &mut registry, commands);
                if repeat {
                    commands.trigger_targets(
                        ShowProgress {
                            interactable: target,
                            fraction: 0.0,
                        },
                        agent,
                    );
                } else {
                    self.hide_progress(agent, commands);
                }
            }
            HoldStep::Cancelled { target } => {
                debug!(?agent, interactable = ?target, "hold cancelled");
                self.hide_progress(agent, commands);
            }
        }
    }

    fn hide_progress(&mut self, agent: Entity, commands: &mut Commands) {
        if std::mem::take(&mut self.progress_shown) {
            commands.trigger_targets(HideProgress, agent);
        }
    }
}

fn fire(agent: Entity, target: Entity, registry: &mut Interactable, commands: &mut Commands) {
    info!(?agent, interactable = ?target, name = %registry.config.name, "interacted");
    registry.consume();
    commands.trigger_targets(Interacted { agent }, target);
}

pub(crate) fn record_intents(mut intents: EventReader<InteractIntent>, mut agents: Query<&mut Interactor>) {
    for intent in intents.read() {
        match *intent {
            InteractIntent::Pressed { agent } => {
                let Ok(mut interactor) = agents.get_mut(agent) else {
                    warn!("{}", InteractionError::MissingCapability { agent, capability: Capability::Interactor });
                    continue;
                };
                interactor.intent_held = true;
                interactor.pending_press = true;
            }
            InteractIntent::Released { agent } => {
                if let Ok(mut interactor) = agents.get_mut(agent) {
                    interactor.intent_held = false;
                }
            }
        }
    }
}

/// Applies range enter/exit input, then drops subscriptions to interactables
/// that no longer exist.
pub(crate) fn apply_range_events(
    mut events: EventReader<RangeEvent>,
    mut agents: Query<(Entity, &mut Interactor)>,
    mut interactables: Query<&mut Interactable>,
    mut commands: Commands,
) {
    for event in events.read() {
        match *event {
            RangeEvent::Entered { agent, interactable } => {
                let Ok(mut registry) = interactables.get_mut(interactable) else {
                    warn!("{}", InteractionError::InvalidReference { operation: "subscribe", entity: interactable });
                    continue;
                };
                let Ok((_, mut interactor)) = agents.get_mut(agent) else {
                    warn!(
                        ?interactable,
                        "{}",
                        InteractionError::MissingCapability { agent, capability: Capability::Interactor }
                    );
                    continue;
                };

                registry.subscribe(agent);
                let membership = interactor.subscriptions.insert(interactable, registry.priority());
                if membership == Membership::AlreadyPresent {
                    continue;
                }
                debug!(?agent, ?interactable, name = %registry.config.name, "subscribed");
                commands.trigger_targets(Subscribed { agent }, interactable);
                if membership == Membership::First {
                    commands.trigger_targets(FirstSubscribed { interactable }, agent);
                }
            }
            RangeEvent::Exited { agent, interactable } => {
                let Ok((_, mut interactor)) = agents.get_mut(agent) else {
                    warn!("{}", InteractionError::InvalidReference { operation: "unsubscribe", entity: agent });
                    continue;
                };
                let removal = interactor.detach(agent, interactable, &mut commands);
                let Ok(mut registry) = interactables.get_mut(interactable) else {
                    continue;
                };
                match registry.unsubscribe(agent) {
                    Ok(remaining) if removal != Removal::NotPresent => {
                        debug!(?agent, ?interactable, remaining, "unsubscribed");
                        commands.trigger_targets(Unsubscribed { agent }, interactable);
                    }
                    Ok(_) => {}
                    Err(error) => debug!(?interactable, "{error}"),
                }
            }
        }
    }

    for (agent, mut interactor) in &mut agents {
        let stale: Vec<Entity> = interactor
            .subscriptions
            .iter()
            .filter(|interactable| !interactables.contains(*interactable))
            .collect();
        for interactable in stale {
            debug!(?agent, ?interactable, "interactable gone, dropping subscription");
            interactor.detach(agent, interactable, &mut commands);
        }
    }
}

/// Evaluates every subscription of every agent and resolves single-select
/// targets.
pub(crate) fn resolve_targets(
    mut agents: Query<(Entity, &mut Interactor, Option<&Transform>, Option<&ViewDirection>)>,
    interactables: Query<(&Interactable, Option<&Transform>)>,
    line_of_sight: Option<Res<LineOfSightProvider>>,
    mut commands: Commands,
) {
    let line_of_sight = line_of_sight.as_deref().map(|provider| &*provider.0);
    for (agent, interactor, transform, direction) in &mut agents {
        let interactor = interactor.into_inner();
        let view = interactor.view(agent, transform, direction);

        interactor.evaluations.clear();
        for target in interactor.subscriptions.iter() {
            let Ok((registry, target_transform)) = interactables.get(target) else {
                continue;
            };
            let position = target_transform.map(|transform| transform.translation);
            let eligibility = match registry.eligibility_for(target, position, &view, line_of_sight) {
                Ok(eligibility) => eligibility,
                Err(error) => {
                    debug!(interactable = ?target, "{error}");
                    continue;
                }
            };
            if let Some(capability) = eligibility.missing_capability() {
                interactor.diagnostics.report(agent, target, capability);
            }
            interactor.evaluations.push((target, eligibility));
        }

        if !interactor.policy.single_select {
            if let Some(previous) = interactor.resolver.clear() {
                commands.trigger_targets(TargetCleared { interactable: previous }, agent);
            }
            continue;
        }

        let evaluations = &interactor.evaluations;
        let resolution = interactor.resolver.resolve(&interactor.subscriptions, |candidate| {
            evaluations
                .iter()
                .any(|(entity, eligibility)| *entity == candidate && eligibility.is_eligible())
        });
        match resolution {
            Resolution::Selected { previous, target } => {
                if let Some(previous) = previous {
                    commands.trigger_targets(TargetCleared { interactable: previous }, agent);
                }
                debug!(?agent, interactable = ?target, "target selected");
                commands.trigger_targets(TargetSelected { interactable: target }, agent);
            }
            Resolution::Cleared(previous) => {
                commands.trigger_targets(TargetCleared { interactable: previous }, agent);
            }
            Resolution::Kept(_) | Resolution::Empty => {}
        }
    }
}

/// Fires immediate interactions and drives the hold machine.
pub(crate) fn advance_interactions(
    time: Res<Time>,
    mut agents: Query<(Entity, &mut Interactor)>,
    mut interactables: Query<&mut Interactable>,
    mut commands: Commands,
) {
    let dt = time.delta_secs();
    for (agent, interactor) in &mut agents {
        let interactor = interactor.into_inner();
        let started = std::mem::take(&mut interactor.pending_press)
            && interactor.press(agent, &mut interactables, &mut commands);
        if !started {
            interactor.advance_hold(agent, dt, &mut interactables, &mut commands);
        }
    }
}

/// Unsubscribes a removed agent from everything it was subscribed to.
pub(crate) fn release_removed_agent(
    trigger: Trigger<OnRemove, Interactor>,
    agents: Query<&Interactor>,
    mut interactables: Query<&mut Interactable>,
    mut commands: Commands,
) {
    let agent = trigger.target();
    let Ok(interactor) = agents.get(agent) else {
        return;
    };
    for interactable in interactor.subscriptions.iter() {
        let Ok(mut registry) = interactables.get_mut(interactable) else {
            continue;
        };
        if registry.unsubscribe(agent).is_ok() {
            commands.trigger_targets(Unsubscribed { agent }, interactable);
        }
    }
}
