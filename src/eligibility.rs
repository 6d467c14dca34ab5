use bevy::prelude::*;

use crate::{
    config::{AngleMode, InteractableConfig},
    error::Capability,
};

/// What an agent looks like to the eligibility checks this tick.
#[derive(Debug, Clone, Copy)]
pub struct AgentView {
    pub entity: Entity,
    pub position: Option<Vec3>,
    pub forward: Option<Vec3>,
    pub angle_mode: AngleMode,
}

/// What a candidate interactable looks like to the eligibility checks.
#[derive(Debug, Clone, Copy)]
pub struct TargetView<'a> {
    pub entity: Entity,
    pub position: Vec3,
    pub config: &'a InteractableConfig,
    /// Transient disable state held by the registry, on top of `config.disabled`.
    pub disabled: bool,
}

/// Result of a single ray cast from the agent toward a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RayHit {
    /// The ray hit something blocking.
    pub hit: bool,
    /// The first blocking hit was the target or something belonging to it.
    pub hit_is_target: bool,
}

impl RayHit {
    pub const REACHED: RayHit = RayHit { hit: true, hit_is_target: true };
    pub const BLOCKED: RayHit = RayHit { hit: true, hit_is_target: false };

    pub fn reached(&self) -> bool {
        self.hit && self.hit_is_target
    }
}

/// Geometry collaborator answering straight line visibility queries. Must
/// answer synchronously within the tick.
pub trait LineOfSight: Send + Sync + 'static {
    fn cast(&self, from: Vec3, to: Vec3, target: Entity, ignore: &[Entity]) -> RayHit;
}

impl<F> LineOfSight for F
where
    F: Fn(Vec3, Vec3, Entity, &[Entity]) -> RayHit + Send + Sync + 'static,
{
    fn cast(&self, from: Vec3, to: Vec3, target: Entity, ignore: &[Entity]) -> RayHit {
        self(from, to, target, ignore)
    }
}

/// A world without occluders: every ray reaches its target.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenSpace;

impl LineOfSight for OpenSpace {
    fn cast(&self, _from: Vec3, _to: Vec3, _target: Entity, _ignore: &[Entity]) -> RayHit {
        RayHit::REACHED
    }
}

/// The installed geometry collaborator. Remove it and reachability checks fail
/// closed.
#[derive(Resource)]
pub struct LineOfSightProvider(pub Box<dyn LineOfSight>);

impl LineOfSightProvider {
    pub fn new(line_of_sight: impl LineOfSight) -> Self {
        Self(Box::new(line_of_sight))
    }

    pub fn open_space() -> Self {
        Self::new(OpenSpace)
    }
}

/// The measured view angle between the agent's forward vector and the target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AngleReading {
    /// Within the look-directly tolerance.
    LookingAt,
    Degrees(f32),
    /// Forward or direction to target is degenerate.
    Unavailable,
}

/// Outcome of evaluating one agent against one target. Anything other than
/// `Eligible` names the first check that failed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Eligibility {
    Eligible,
    Disabled,
    TooFar { distance: f32, max_distance: f32 },
    Obstructed,
    OutsideAngle(AngleReading),
    Missing(Capability),
}

impl Eligibility {
    pub fn is_eligible(&self) -> bool {
        matches!(self, Eligibility::Eligible)
    }

    /// Whether the failure is caused by missing data rather than by the world.
    pub fn missing_capability(&self) -> Option<Capability> {
        match self {
            Eligibility::Missing(capability) => Some(*capability),
            _ => None,
        }
    }
}

/// Measures the view angle from `position` along `forward` toward `target`.
pub fn measure_angle(position: Vec3, forward: Vec3, target: Vec3, mode: AngleMode) -> AngleReading {
    let (Some(forward), Some(to_target)) = (forward.try_normalize(), (target - position).try_normalize())
    else {
        return AngleReading::Unavailable;
    };
    let degrees = forward.dot(to_target).clamp(-1.0, 1.0).acos().to_degrees();
    match mode {
        AngleMode::LookDirectly { tolerance_degrees } if degrees <= tolerance_degrees => {
            AngleReading::LookingAt
        }
        _ => AngleReading::Degrees(degrees),
    }
}

/// Runs the checks in cost order: disabled, distance, reachability, angle.
/// Pure: safe to call any number of times per tick.
pub fn evaluate(agent: &AgentView, target: &TargetView, line_of_sight: Option<&dyn LineOfSight>) -> Eligibility {
    let config = target.config;
    if config.disabled || target.disabled {
        return Eligibility::Disabled;
    }

    let position = match agent.position {
        Some(position) => position,
        None if config.needs_position() => return Eligibility::Missing(Capability::Position),
        None => return Eligibility::Eligible,
    };

    if config.requires_distance_check {
        let distance = position.distance(target.position);
        if distance > config.max_distance {
            return Eligibility::TooFar {
                distance,
                max_distance: config.max_distance,
            };
        }
    }

    if config.requires_reachability {
        let Some(line_of_sight) = line_of_sight else {
            return Eligibility::Missing(Capability::WorldQuery);
        };
        let hit = line_of_sight.cast(position, target.position, target.entity, &[agent.entity]);
        if !hit.reached() {
            return Eligibility::Obstructed;
        }
    }

    if config.requires_angle_check {
        let Some(forward) = agent.forward.filter(|forward| forward.length_squared() > 0.0) else {
            return Eligibility::Missing(Capability::Orientation);
        };
        let reading = measure_angle(position, forward, target.position, agent.angle_mode);
        let within = match (agent.angle_mode, reading) {
            (_, AngleReading::Unavailable) => false,
            (AngleMode::LookDirectly { .. }, reading) => reading == AngleReading::LookingAt,
            (AngleMode::Margin, AngleReading::Degrees(degrees)) => degrees <= config.angle_margin_degrees,
            (AngleMode::Margin, AngleReading::LookingAt) => true,
        };
        if !within {
            return Eligibility::OutsideAngle(reading);
        }
    }

    Eligibility::Eligible
}

/// Boolean form of [`evaluate`].
pub fn can_interact(agent: &AgentView, target: &TargetView, line_of_sight: Option<&dyn LineOfSight>) -> bool {
    evaluate(agent, target, line_of_sight).is_eligible()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent_at(position: Vec3, forward: Vec3) -> AgentView {
        AgentView {
            entity: Entity::from_raw(1),
            position: Some(position),
            forward: Some(forward),
            angle_mode: AngleMode::Margin,
        }
    }

    fn target<'a>(position: Vec3, config: &'a InteractableConfig) -> TargetView<'a> {
        TargetView {
            entity: Entity::from_raw(2),
            position,
            config,
            disabled: false,
        }
    }

    #[test]
    fn distance_flips_once_past_max() {
        let config = InteractableConfig {
            requires_reachability: false,
            requires_angle_check: false,
            max_distance: 10.0,
            ..default()
        };
        let mut was_eligible = true;
        for step in 0..40 {
            let x = step as f32 * 0.5;
            let eligible = can_interact(&agent_at(Vec3::ZERO, Vec3::X), &target(Vec3::new(x, 0.0, 0.0), &config), None);
            assert_eq!(eligible, x <= 10.0, "at distance {x}");
            assert!(was_eligible || !eligible, "became eligible again at {x}");
            was_eligible = eligible;
        }
    }

    #[test]
    fn disabled_fails_before_anything_else() {
        let config = InteractableConfig {
            disabled: true,
            ..default()
        };
        let view = AgentView {
            position: None,
            ..agent_at(Vec3::ZERO, Vec3::X)
        };
        assert_eq!(evaluate(&view, &target(Vec3::X, &config), None), Eligibility::Disabled);

        let config = InteractableConfig::immediate();
        let mut transient = target(Vec3::X, &config);
        transient.disabled = true;
        assert_eq!(evaluate(&view, &transient, None), Eligibility::Disabled);
    }

    #[test]
    fn blocked_ray_fails_reachability() {
        let config = InteractableConfig {
            requires_angle_check: false,
            ..default()
        };
        let wall = |_: Vec3, _: Vec3, _: Entity, _: &[Entity]| RayHit::BLOCKED;
        let result = evaluate(&agent_at(Vec3::ZERO, Vec3::X), &target(Vec3::X * 5.0, &config), Some(&wall));
        assert_eq!(result, Eligibility::Obstructed);

        let result = evaluate(&agent_at(Vec3::ZERO, Vec3::X), &target(Vec3::X * 5.0, &config), Some(&OpenSpace));
        assert_eq!(result, Eligibility::Eligible);
    }

    #[test]
    fn ray_that_hits_nothing_does_not_reach() {
        let config = InteractableConfig {
            requires_angle_check: false,
            ..default()
        };
        let void = |_: Vec3, _: Vec3, _: Entity, _: &[Entity]| RayHit::default();
        let result = evaluate(&agent_at(Vec3::ZERO, Vec3::X), &target(Vec3::X, &config), Some(&void));
        assert_eq!(result, Eligibility::Obstructed);
    }

    #[test]
    fn missing_world_query_fails_closed() {
        let config = InteractableConfig::default();
        let result = evaluate(&agent_at(Vec3::ZERO, Vec3::X), &target(Vec3::X, &config), None);
        assert_eq!(result, Eligibility::Missing(Capability::WorldQuery));
    }

    #[test]
    fn angle_margin_bounds_view_cone() {
        let config = InteractableConfig {
            requires_reachability: false,
            angle_margin_degrees: 45.0,
            ..default()
        };
        let agent = agent_at(Vec3::ZERO, Vec3::X);
        assert!(can_interact(&agent, &target(Vec3::new(10.0, 5.0, 0.0), &config), None));
        assert!(!can_interact(&agent, &target(Vec3::new(5.0, 10.0, 0.0), &config), None));
        assert!(!can_interact(&agent, &target(Vec3::new(-10.0, 0.0, 0.0), &config), None));
    }

    #[test]
    fn look_directly_requires_near_zero_angle() {
        let config = InteractableConfig {
            requires_reachability: false,
            angle_margin_degrees: 90.0,
            ..default()
        };
        let agent = AgentView {
            angle_mode: AngleMode::LookDirectly { tolerance_degrees: 1.0 },
            ..agent_at(Vec3::ZERO, Vec3::X)
        };
        assert!(can_interact(&agent, &target(Vec3::new(20.0, 0.0, 0.0), &config), None));
        let Eligibility::OutsideAngle(AngleReading::Degrees(degrees)) =
            evaluate(&agent, &target(Vec3::new(20.0, 5.0, 0.0), &config), None)
        else {
            panic!("a 14 degree offset should fail the look-directly test");
        };
        assert!((degrees - 14.036).abs() < 0.01);
    }

    #[test]
    fn missing_orientation_never_passes() {
        let config = InteractableConfig {
            requires_reachability: false,
            ..default()
        };
        let agent = AgentView {
            forward: None,
            ..agent_at(Vec3::ZERO, Vec3::X)
        };
        assert_eq!(
            evaluate(&agent, &target(Vec3::X, &config), None),
            Eligibility::Missing(Capability::Orientation)
        );

        let degenerate = agent_at(Vec3::ZERO, Vec3::ZERO);
        assert!(!can_interact(&degenerate, &target(Vec3::X, &config), None));

        let on_top = agent_at(Vec3::X, Vec3::X);
        assert_eq!(
            evaluate(&on_top, &target(Vec3::X, &config), None),
            Eligibility::OutsideAngle(AngleReading::Unavailable)
        );
    }

    #[test]
    fn checks_that_do_not_matter_skip_position() {
        let config = InteractableConfig::immediate();
        let agent = AgentView {
            position: None,
            forward: None,
            ..agent_at(Vec3::ZERO, Vec3::X)
        };
        assert!(can_interact(&agent, &target(Vec3::X, &config), None));
    }
}
