use bevy::prelude::*;
use rand::Rng;
use tracing::debug;

use crate::{
    config::InteractableConfig,
    eligibility::{evaluate, AgentView, Eligibility, LineOfSight, TargetView},
    error::{Capability, InteractionError},
    presentation::PresentationFlags,
};

/// A world object agents can interact with. Owns its configuration, the
/// agents currently subscribed to it and its transient disable state.
#[derive(Component, Reflect, Debug, Clone)]
#[reflect(Component)]
#[require(PresentationFlags)]
pub struct Interactable {
    pub config: InteractableConfig,
    priority: i32,
    rarity: i32,
    subscribers: Vec<Entity>,
    disabled: bool,
}

impl Default for Interactable {
    fn default() -> Self {
        Self::new(InteractableConfig::default())
    }
}

/// Result of a successful subscribe call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subscription {
    Added,
    AlreadySubscribed,
}

impl Interactable {
    pub fn new(config: InteractableConfig) -> Self {
        let priority = config.priority.fallback();
        let rarity = config.rarity.fallback();
        Self {
            config,
            priority,
            rarity,
            subscribers: Vec::new(),
            disabled: false,
        }
    }

    /// Spawn-time setup: validates the configuration (disabling broken checks)
    /// and rolls randomized priority and rarity once.
    pub fn initialize(&mut self, rng: &mut impl Rng) -> Vec<InteractionError> {
        let issues = self.config.sanitize();
        self.priority = self.config.priority.roll(rng);
        self.rarity = self.config.rarity.roll(rng);
        issues
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn rarity(&self) -> i32 {
        self.rarity
    }

    pub fn subscribe(&mut self, agent: Entity) -> Subscription {
        if self.subscribers.contains(&agent) {
            return Subscription::AlreadySubscribed;
        }
        self.subscribers.push(agent);
        Subscription::Added
    }

    /// Removes `agent`. Returns how many subscribers remain.
    pub fn unsubscribe(&mut self, agent: Entity) -> Result<usize, InteractionError> {
        let Some(index) = self.subscribers.iter().position(|subscriber| *subscriber == agent) else {
            return Err(InteractionError::NotSubscribed { agent });
        };
        self.subscribers.remove(index);
        Ok(self.subscribers.len())
    }

    pub fn is_subscribed(&self, agent: Entity) -> bool {
        self.subscribers.contains(&agent)
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    pub fn subscribers(&self) -> &[Entity] {
        &self.subscribers
    }

    /// No subscribers: nothing needs to evaluate this object.
    pub fn is_idle(&self) -> bool {
        self.subscribers.is_empty()
    }

    pub fn enable(&mut self) {
        self.disabled = false;
    }

    /// Stays disabled until an explicit `enable`.
    pub fn disable(&mut self) {
        self.disabled = true;
    }

    pub fn is_enabled(&self) -> bool {
        !self.disabled && !self.config.disabled
    }

    /// Applies the disable-after-use rule once the effect has fired.
    pub fn consume(&mut self) {
        if self.config.disable_after_use {
            debug!(name = %self.config.name, "disabled after use");
            self.disable();
        }
    }

    pub fn target_view(&self, entity: Entity, position: Vec3) -> TargetView<'_> {
        TargetView {
            entity,
            position,
            config: &self.config,
            disabled: self.disabled,
        }
    }

    /// Evaluates a subscribed agent against this object located at `position`.
    /// Without a position only checks that need none can pass.
    pub fn eligibility_for(
        &self,
        entity: Entity,
        position: Option<Vec3>,
        agent: &AgentView,
        line_of_sight: Option<&dyn LineOfSight>,
    ) -> Result<Eligibility, InteractionError> {
        if !self.is_subscribed(agent.entity) {
            return Err(InteractionError::NotSubscribed { agent: agent.entity });
        }
        if position.is_none() && self.is_enabled() && self.config.needs_position() {
            return Ok(Eligibility::Missing(Capability::Position));
        }
        let view = self.target_view(entity, position.unwrap_or_default());
        Ok(evaluate(agent, &view, line_of_sight))
    }

    pub fn is_eligible_for(
        &self,
        entity: Entity,
        position: Option<Vec3>,
        agent: &AgentView,
        line_of_sight: Option<&dyn LineOfSight>,
    ) -> bool {
        self.eligibility_for(entity, position, agent, line_of_sight)
            .is_ok_and(|eligibility| eligibility.is_eligible())
    }
}

/// Validates the configuration and rolls randomized values when an
/// interactable is spawned.
pub(crate) fn initialize_interactable(trigger: Trigger<OnAdd, Interactable>, mut interactables: Query<&mut Interactable>) {
    let Ok(mut interactable) = interactables.get_mut(trigger.target()) else {
        return;
    };
    let issues = interactable.initialize(&mut rand::thread_rng());
    debug!(
        entity = ?trigger.target(),
        name = %interactable.config.name,
        priority = interactable.priority(),
        issues = issues.len(),
        "interactable ready"
    );
}
