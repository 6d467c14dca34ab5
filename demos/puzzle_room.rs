//! A headless puzzle room: three levers open a door for five seconds. The
//! player walks past each lever, pulls it, then walks through the door.
//!
//! Run with `RUST_LOG=debug` to see every step of the pipeline.

use std::time::Duration;

use bevy::{prelude::*, time::TimeUpdateStrategy};
use bevy_interaction::prelude::*;
use tracing::info;
use tracing_subscriber::EnvFilter;

const FRAME: Duration = Duration::from_millis(100);

#[derive(Component)]
struct Door;

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).compact().init();

    let mut app = App::new();
    app.add_plugins(MinimalPlugins)
        .add_plugins(InteractionPlugin)
        .insert_resource(TimeUpdateStrategy::ManualDuration(FRAME))
        .add_observer(print_prompt)
        .add_observer(print_progress)
        .add_observer(open_door)
        .add_observer(close_door);

    let player = app
        .world_mut()
        .spawn((Name::new("Player"), Interactor::default(), Transform::default()))
        .id();

    let levers: Vec<Entity> = (0..3)
        .map(|index| {
            let config = InteractableConfig {
                name: format!("Lever {}", index + 1),
                prompt: "Hold to pull".into(),
                requires_reachability: false,
                ..default()
            }
            .with_hold(0.5, false);
            app.world_mut()
                .spawn((
                    Interactable::new(config),
                    PuzzleTrigger::default(),
                    Transform::from_xyz(index as f32 * 10.0, 0.0, -2.0),
                ))
                .id()
        })
        .collect();

    let door = app
        .world_mut()
        .spawn((Door, Name::new("Door"), TriggerGate::new(levers.clone(), GateConfig::timed(5.0))))
        .id();

    app.update();

    for (index, &lever) in levers.iter().enumerate() {
        if let Some(mut transform) = app.world_mut().get_mut::<Transform>(player) {
            transform.translation.x = index as f32 * 10.0;
        }
        app.world_mut().send_event(RangeEvent::Entered {
            agent: player,
            interactable: lever,
        });
        app.update();

        app.world_mut().send_event(InteractIntent::Pressed { agent: player });
        for _ in 0..8 {
            app.update();
        }
        app.world_mut().send_event(InteractIntent::Released { agent: player });
        app.world_mut().send_event(RangeEvent::Exited {
            agent: player,
            interactable: lever,
        });
        app.update();
    }

    let satisfied = app.world().get::<TriggerGate>(door).is_some_and(TriggerGate::is_satisfied);
    info!(satisfied, "player reaches the door");

    // Too slow: the window runs out before the player walks through.
    for _ in 0..60 {
        app.update();
    }
    let satisfied = app.world().get::<TriggerGate>(door).is_some_and(TriggerGate::is_satisfied);
    info!(satisfied, "six seconds later");
}

fn print_prompt(trigger: Trigger<ShowPrompt>, interactables: Query<&Interactable>) {
    if let Ok(interactable) = interactables.get(trigger.target()) {
        info!("[{}] {}", interactable.config.name, trigger.event().text);
    }
}

fn print_progress(trigger: Trigger<ShowProgress>) {
    let fraction = trigger.event().fraction;
    info!("pulling... {:>3.0}%", fraction * 100.0);
}

fn open_door(trigger: Trigger<RequirementsSatisfied>, doors: Query<&Name, With<Door>>) {
    if let Ok(name) = doors.get(trigger.target()) {
        info!("{name} opens");
    }
}

fn close_door(trigger: Trigger<GateReset>, doors: Query<&Name, With<Door>>) {
    if let Ok(name) = doors.get(trigger.target()) {
        info!("{name} slams shut");
    }
}
