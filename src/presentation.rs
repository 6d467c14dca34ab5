use bevy::prelude::*;

use crate::{
    agent::Interactor, eligibility::Eligibility, registry::Interactable, CanInteract, HideMarker, HideNameLabel,
    HidePrompt, ShowMarker, ShowNameLabel, ShowPrompt,
};

/// What is currently shown for an interactable. Show and hide notifications
/// are only sent when these change.
#[derive(Component, Reflect, Debug, Clone, Default)]
#[reflect(Component)]
pub struct PresentationFlags {
    marker: bool,
    name_label: bool,
    prompt: bool,
    can_interact_sent: bool,
}

impl PresentationFlags {
    pub fn marker(&self) -> bool {
        self.marker
    }

    pub fn name_label(&self) -> bool {
        self.name_label
    }

    pub fn prompt(&self) -> bool {
        self.prompt
    }
}

/// What the subscribed agents want shown this tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Wanted {
    marker: bool,
    name_label: bool,
    prompt: bool,
}

fn wanted_by(interactor: &Interactor, interactable: Entity, enabled: bool) -> (Wanted, bool) {
    let eligibility = interactor.evaluation(interactable);
    let eligible = eligibility.is_some_and(|eligibility| eligibility.is_eligible());
    if !enabled {
        return (Wanted::default(), false);
    }

    let policy = interactor.policy();
    let focused = interactor.is_focused_on(interactable);
    let unreachable = eligibility == Some(Eligibility::Obstructed);
    let wanted = Wanted {
        marker: !(policy.hide_marker_when_can_interact && eligible)
            && !(policy.hide_marker_when_unreachable && unreachable),
        name_label: (!policy.show_only_one_name || focused) && !(policy.hide_name_when_can_interact && eligible),
        prompt: focused && eligible,
    };
    (wanted, eligible)
}

/// Sends marker, name label and prompt notifications for every interactable
/// whose visibility changed, plus the once-per-streak `CanInteract`.
pub(crate) fn update_presentation(
    mut interactables: Query<(Entity, &Interactable, &mut PresentationFlags)>,
    agents: Query<&Interactor>,
    mut commands: Commands,
) {
    for (entity, registry, mut flags) in &mut interactables {
        let shows_anything = flags.marker || flags.name_label || flags.prompt || flags.can_interact_sent;
        if registry.is_idle() && !shows_anything {
            continue;
        }

        let mut wanted = Wanted::default();
        let mut eligible_agents = Vec::new();
        for &agent in registry.subscribers() {
            let Ok(interactor) = agents.get(agent) else {
                continue;
            };
            let (by_agent, eligible) = wanted_by(interactor, entity, registry.is_enabled());
            wanted.marker |= by_agent.marker;
            wanted.name_label |= by_agent.name_label;
            wanted.prompt |= by_agent.prompt;
            if eligible {
                eligible_agents.push(agent);
            }
        }

        let current = Wanted {
            marker: flags.marker,
            name_label: flags.name_label,
            prompt: flags.prompt,
        };
        if current != wanted {
            let flags = &mut *flags;
            if flags.marker != wanted.marker {
                flags.marker = wanted.marker;
                if wanted.marker {
                    commands.trigger_targets(ShowMarker, entity);
                } else {
                    commands.trigger_targets(HideMarker, entity);
                }
            }
            if flags.name_label != wanted.name_label {
                flags.name_label = wanted.name_label;
                if wanted.name_label {
                    let name = registry.config.name.clone();
                    commands.trigger_targets(ShowNameLabel { name }, entity);
                } else {
                    commands.trigger_targets(HideNameLabel, entity);
                }
            }
            if flags.prompt != wanted.prompt {
                flags.prompt = wanted.prompt;
                if wanted.prompt {
                    let text = registry.config.prompt.clone();
                    commands.trigger_targets(ShowPrompt { text }, entity);
                } else {
                    commands.trigger_targets(HidePrompt, entity);
                }
            }
        }

        if eligible_agents.is_empty() {
            if flags.can_interact_sent {
                flags.can_interact_sent = false;
            }
        } else if !flags.can_interact_sent {
            flags.can_interact_sent = true;
            for agent in eligible_agents {
                commands.trigger_targets(CanInteract { agent }, entity);
            }
        }
    }
}
