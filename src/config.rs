use std::time::Duration;

use bevy::prelude::*;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::InteractionError;

/// Per-object interaction settings, supplied by the authoring layer at spawn.
#[derive(Reflect, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractableConfig {
    /// Display name handed to name label consumers.
    pub name: String,
    /// Prompt text handed to prompt consumers.
    pub prompt: String,
    pub disabled: bool,
    pub requires_reachability: bool,
    pub requires_distance_check: bool,
    pub requires_angle_check: bool,
    pub max_distance: f32,
    pub angle_margin_degrees: f32,
    pub hold_to_interact: bool,
    pub hold_duration_seconds: f32,
    pub repeatable_hold: bool,
    pub disable_after_use: bool,
    pub priority: Priority,
    pub rarity: Priority,
}

impl Default for InteractableConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            prompt: String::new(),
            disabled: false,
            requires_reachability: true,
            requires_distance_check: true,
            requires_angle_check: true,
            max_distance: 125.0,
            angle_margin_degrees: 40.0,
            hold_to_interact: true,
            hold_duration_seconds: 2.0,
            repeatable_hold: false,
            disable_after_use: false,
            priority: Priority::Fixed(0),
            rarity: Priority::Fixed(0),
        }
    }
}

impl InteractableConfig {
    /// An interactable that fires on a single press with no geometric checks.
    pub fn immediate() -> Self {
        Self {
            requires_reachability: false,
            requires_distance_check: false,
            requires_angle_check: false,
            hold_to_interact: false,
            ..default()
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Priority::Fixed(priority);
        self
    }

    pub fn with_hold(mut self, seconds: f32, repeatable: bool) -> Self {
        self.hold_to_interact = true;
        self.hold_duration_seconds = seconds;
        self.repeatable_hold = repeatable;
        self
    }

    pub fn with_max_distance(mut self, max_distance: f32) -> Self {
        self.requires_distance_check = true;
        self.max_distance = max_distance;
        self
    }

    /// Whether any enabled check needs positions.
    pub fn needs_position(&self) -> bool {
        self.requires_distance_check || self.requires_reachability || self.requires_angle_check
    }

    /// Lists every threshold that cannot be honored as configured.
    pub fn validate(&self) -> Vec<InteractionError> {
        let mut issues = Vec::new();
        if self.requires_distance_check && !(self.max_distance.is_finite() && self.max_distance > 0.0) {
            issues.push(InteractionError::ConfigurationInvalid {
                field: "max_distance",
                value: self.max_distance,
                reason: "must be positive when the distance check is enabled",
            });
        }
        if self.hold_to_interact
            && !(self.hold_duration_seconds.is_finite() && self.hold_duration_seconds > 0.0)
        {
            issues.push(InteractionError::ConfigurationInvalid {
                field: "hold_duration_seconds",
                value: self.hold_duration_seconds,
                reason: "must be positive when hold to interact is enabled",
            });
        }
        if self.requires_angle_check
            && !(self.angle_margin_degrees.is_finite() && self.angle_margin_degrees >= 0.0)
        {
            issues.push(InteractionError::ConfigurationInvalid {
                field: "angle_margin_degrees",
                value: self.angle_margin_degrees,
                reason: "must be zero or positive when the angle check is enabled",
            });
        }
        for (field, range) in [("priority", &self.priority), ("rarity", &self.rarity)] {
            if let Priority::Randomized { min, max } = range {
                if min > max {
                    issues.push(InteractionError::ConfigurationInvalid {
                        field,
                        value: *min as f32,
                        reason: "randomized range minimum exceeds its maximum",
                    });
                }
            }
        }
        issues
    }

    /// Logs every invalid threshold and turns the affected check off, so a
    /// misconfigured object degrades instead of failing. Returns the issues found.
    pub fn sanitize(&mut self) -> Vec<InteractionError> {
        let issues = self.validate();
        for issue in &issues {
            warn!(interactable = %self.name, "{issue}");
            let InteractionError::ConfigurationInvalid { field, .. } = issue else {
                continue;
            };
            match *field {
                "max_distance" => self.requires_distance_check = false,
                "hold_duration_seconds" => self.hold_to_interact = false,
                "angle_margin_degrees" => self.requires_angle_check = false,
                "priority" => self.priority = Priority::Fixed(self.priority.fallback()),
                "rarity" => self.rarity = Priority::Fixed(self.rarity.fallback()),
                _ => {}
            }
        }
        issues
    }
}

/// A priority (or rarity) value, either authored or rolled once at spawn.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    Fixed(i32),
    Randomized { min: i32, max: i32 },
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Fixed(0)
    }
}

impl Priority {
    /// The original authoring range for randomized priorities.
    pub const DEFAULT_RANDOM: Priority = Priority::Randomized { min: 0, max: 255 };

    /// Produces the concrete value. Randomized ranges roll with `rng`; an
    /// inverted range never reaches here after `sanitize`, but falls back to
    /// its minimum if it does.
    pub fn roll(&self, rng: &mut impl Rng) -> i32 {
        match *self {
            Priority::Fixed(value) => value,
            Priority::Randomized { min, max } if min <= max => rng.gen_range(min..=max),
            Priority::Randomized { min, .. } => min,
        }
    }

    /// The value used before a roll, and for inverted ranges.
    pub fn fallback(&self) -> i32 {
        match *self {
            Priority::Fixed(value) => value,
            Priority::Randomized { min, max } => min.min(max),
        }
    }
}

/// Sort direction for an agent's subscription set.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PriorityOrder {
    #[default]
    HigherFirst,
    LowerFirst,
}

/// How the view angle check is judged for an agent.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum AngleMode {
    /// The angle to the target must not exceed the interactable's margin.
    Margin,
    /// The agent must look straight at the target; only angles within
    /// `tolerance_degrees` of zero count.
    LookDirectly { tolerance_degrees: f32 },
}

impl Default for AngleMode {
    fn default() -> Self {
        AngleMode::Margin
    }
}

/// Per-agent resolution and presentation policy.
#[derive(Reflect, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentPolicy {
    pub single_select: bool,
    pub priority_order: PriorityOrder,
    pub angle_mode: AngleMode,
    pub show_only_one_name: bool,
    pub hide_marker_when_can_interact: bool,
    pub hide_name_when_can_interact: bool,
    pub hide_marker_when_unreachable: bool,
}

impl Default for AgentPolicy {
    fn default() -> Self {
        Self {
            single_select: true,
            priority_order: PriorityOrder::HigherFirst,
            angle_mode: AngleMode::Margin,
            show_only_one_name: false,
            hide_marker_when_can_interact: false,
            hide_name_when_can_interact: false,
            hide_marker_when_unreachable: true,
        }
    }
}

/// What a gate does once every required trigger has fired.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CompletionPolicy {
    /// Lock satisfied forever; triggers stay disabled.
    Permanent,
    /// Stay satisfied for the window, then reset unless the follow-on action
    /// was reported first.
    TimedWindow { seconds: f32 },
    /// Stay satisfied until an explicit reset.
    Latched,
}

/// When the timed window of a gate starts counting.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TimerStart {
    /// Once every required trigger has fired.
    #[default]
    AfterAllSatisfied,
    /// As soon as the first trigger of a cycle fires; the rest must follow
    /// within the window.
    OnFirstTrigger,
}

#[derive(Reflect, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    pub completion: CompletionPolicy,
    pub timer_start: TimerStart,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            completion: CompletionPolicy::Permanent,
            timer_start: TimerStart::AfterAllSatisfied,
        }
    }
}

impl GateConfig {
    pub fn timed(seconds: f32) -> Self {
        Self {
            completion: CompletionPolicy::TimedWindow { seconds },
            ..default()
        }
    }

    /// A timed window must be positive and fit a `Duration`; otherwise the gate
    /// latches instead.
    pub fn sanitize(&mut self) -> Option<InteractionError> {
        let CompletionPolicy::TimedWindow { seconds } = self.completion else {
            return None;
        };
        if seconds > 0.0 && Duration::try_from_secs_f32(seconds).is_ok() {
            return None;
        }
        let issue = InteractionError::ConfigurationInvalid {
            field: "window_seconds",
            value: seconds,
            reason: "timed window must be positive",
        };
        warn!("{issue}");
        self.completion = CompletionPolicy::Latched;
        Some(issue)
    }
}
