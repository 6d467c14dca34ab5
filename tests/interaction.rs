use std::time::Duration;

use bevy::{prelude::*, time::TimeUpdateStrategy};
use bevy_interaction::prelude::*;

#[derive(Debug, Clone, PartialEq)]
enum Note {
    Subscribed { interactable: Entity, agent: Entity },
    Unsubscribed { interactable: Entity, agent: Entity },
    FirstSubscribed { agent: Entity, interactable: Entity },
    NoneLeft(Entity),
    Selected { agent: Entity, interactable: Entity },
    Cleared { agent: Entity, interactable: Entity },
    Interacted { interactable: Entity, agent: Entity },
    CanInteract { interactable: Entity, agent: Entity },
    ShowPrompt(Entity, String),
    HidePrompt(Entity),
    Progress(Entity, f32),
    HideProgress(Entity),
}

#[derive(Resource, Default, Debug)]
struct Log(Vec<Note>);

impl Log {
    fn count(&self, matches: impl Fn(&Note) -> bool) -> usize {
        self.0.iter().filter(|note| matches(note)).count()
    }
}

fn test_app() -> App {
    let mut app = App::new();
    app.add_plugins(MinimalPlugins);
    app.add_plugins(InteractionPlugin);
    app.insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_millis(100)));
    app.init_resource::<Log>();

    app.add_observer(|trigger: Trigger<Subscribed>, mut log: ResMut<Log>| {
        log.0.push(Note::Subscribed {
            interactable: trigger.target(),
            agent: trigger.event().agent,
        });
    });
    app.add_observer(|trigger: Trigger<Unsubscribed>, mut log: ResMut<Log>| {
        log.0.push(Note::Unsubscribed {
            interactable: trigger.target(),
            agent: trigger.event().agent,
        });
    });
    app.add_observer(|trigger: Trigger<FirstSubscribed>, mut log: ResMut<Log>| {
        log.0.push(Note::FirstSubscribed {
            agent: trigger.target(),
            interactable: trigger.event().interactable,
        });
    });
    app.add_observer(|trigger: Trigger<NoneLeft>, mut log: ResMut<Log>| {
        log.0.push(Note::NoneLeft(trigger.target()));
    });
    app.add_observer(|trigger: Trigger<TargetSelected>, mut log: ResMut<Log>| {
        log.0.push(Note::Selected {
            agent: trigger.target(),
            interactable: trigger.event().interactable,
        });
    });
    app.add_observer(|trigger: Trigger<TargetCleared>, mut log: ResMut<Log>| {
        log.0.push(Note::Cleared {
            agent: trigger.target(),
            interactable: trigger.event().interactable,
        });
    });
    app.add_observer(|trigger: Trigger<Interacted>, mut log: ResMut<Log>| {
        log.0.push(Note::Interacted {
            interactable: trigger.target(),
            agent: trigger.event().agent,
        });
    });
    app.add_observer(|trigger: Trigger<CanInteract>, mut log: ResMut<Log>| {
        log.0.push(Note::CanInteract {
            interactable: trigger.target(),
            agent: trigger.event().agent,
        });
    });
    app.add_observer(|trigger: Trigger<ShowPrompt>, mut log: ResMut<Log>| {
        log.0.push(Note::ShowPrompt(trigger.target(), trigger.event().text.clone()));
    });
    app.add_observer(|trigger: Trigger<HidePrompt>, mut log: ResMut<Log>| {
        log.0.push(Note::HidePrompt(trigger.target()));
    });
    app.add_observer(|trigger: Trigger<ShowProgress>, mut log: ResMut<Log>| {
        log.0.push(Note::Progress(trigger.target(), trigger.event().fraction));
    });
    app.add_observer(|trigger: Trigger<HideProgress>, mut log: ResMut<Log>| {
        log.0.push(Note::HideProgress(trigger.target()));
    });
    app
}

fn spawn_agent(app: &mut App) -> Entity {
    app.world_mut().spawn((Interactor::default(), Transform::default())).id()
}

fn spawn_interactable(app: &mut App, config: InteractableConfig) -> Entity {
    app.world_mut().spawn((Interactable::new(config), Transform::default())).id()
}

fn enter(app: &mut App, agent: Entity, interactable: Entity) {
    app.world_mut().send_event(RangeEvent::Entered { agent, interactable });
}

fn exit(app: &mut App, agent: Entity, interactable: Entity) {
    app.world_mut().send_event(RangeEvent::Exited { agent, interactable });
}

fn press(app: &mut App, agent: Entity) {
    app.world_mut().send_event(InteractIntent::Pressed { agent });
}

fn release(app: &mut App, agent: Entity) {
    app.world_mut().send_event(InteractIntent::Released { agent });
}

fn log(app: &App) -> &Log {
    app.world().resource::<Log>()
}

fn interacted(app: &App, interactable: Entity) -> usize {
    log(app).count(|note| matches!(note, Note::Interacted { interactable: i, .. } if *i == interactable))
}

#[test]
fn entering_range_subscribes_and_announces_first() {
    let mut app = test_app();
    let agent = spawn_agent(&mut app);
    let lever = spawn_interactable(&mut app, InteractableConfig::immediate());
    let crate_lid = spawn_interactable(&mut app, InteractableConfig::immediate());

    enter(&mut app, agent, lever);
    enter(&mut app, agent, crate_lid);
    enter(&mut app, agent, lever);
    app.update();

    assert_eq!(app.world().get::<Interactor>(agent).unwrap().subscriptions().len(), 2);
    assert_eq!(app.world().get::<Interactable>(lever).unwrap().subscriber_count(), 1);
    assert_eq!(log(&app).count(|note| matches!(note, Note::Subscribed { .. })), 2);
    assert_eq!(
        log(&app).count(|note| matches!(note, Note::FirstSubscribed { .. })),
        1,
        "only the first subscription is announced"
    );
    assert!(log(&app).0.contains(&Note::FirstSubscribed {
        agent,
        interactable: lever
    }));
}

#[test]
fn agent_without_interactor_is_rejected() {
    let mut app = test_app();
    let bystander = app.world_mut().spawn(Transform::default()).id();
    let lever = spawn_interactable(&mut app, InteractableConfig::immediate());

    enter(&mut app, bystander, lever);
    app.update();

    assert_eq!(app.world().get::<Interactable>(lever).unwrap().subscriber_count(), 0);
    assert!(log(&app).0.is_empty());
}

#[test]
fn resolution_is_sticky_until_target_becomes_ineligible() {
    let mut app = test_app();
    let agent = spawn_agent(&mut app);
    let low = spawn_interactable(&mut app, InteractableConfig::immediate().with_priority(1));
    let high = spawn_interactable(&mut app, InteractableConfig::immediate().with_priority(10));

    enter(&mut app, agent, low);
    app.update();
    assert_eq!(app.world().get::<Interactor>(agent).unwrap().current_target(), Some(low));

    enter(&mut app, agent, high);
    for _ in 0..3 {
        app.update();
        assert_eq!(app.world().get::<Interactor>(agent).unwrap().current_target(), Some(low));
    }

    app.world_mut().get_mut::<Interactable>(low).unwrap().disable();
    app.update();

    assert_eq!(app.world().get::<Interactor>(agent).unwrap().current_target(), Some(high));
    let notes = &log(&app).0;
    let cleared = notes
        .iter()
        .position(|note| *note == Note::Cleared { agent, interactable: low })
        .expect("low target cleared");
    let selected = notes
        .iter()
        .position(|note| *note == Note::Selected { agent, interactable: high })
        .expect("high target selected");
    assert!(cleared < selected);
}

#[test]
fn immediate_press_fires_once_on_resolved_target() {
    let mut app = test_app();
    let agent = spawn_agent(&mut app);
    let low = spawn_interactable(&mut app, InteractableConfig::immediate().with_priority(1));
    let high = spawn_interactable(&mut app, InteractableConfig::immediate().with_priority(5));

    enter(&mut app, agent, low);
    enter(&mut app, agent, high);
    app.update();

    press(&mut app, agent);
    app.update();
    app.update();

    assert_eq!(interacted(&app, high), 1);
    assert_eq!(interacted(&app, low), 0);
}

#[test]
fn press_without_target_does_nothing() {
    let mut app = test_app();
    let agent = spawn_agent(&mut app);
    press(&mut app, agent);
    app.update();
    assert_eq!(log(&app).count(|note| matches!(note, Note::Interacted { .. })), 0);
}

#[test]
fn multi_select_fires_every_eligible_target() {
    let mut app = test_app();
    let agent = app
        .world_mut()
        .spawn((
            Interactor::new(AgentPolicy {
                single_select: false,
                ..default()
            }),
            Transform::default(),
        ))
        .id();
    let first = spawn_interactable(&mut app, InteractableConfig::immediate());
    let second = spawn_interactable(&mut app, InteractableConfig::immediate());
    let switched_off = spawn_interactable(
        &mut app,
        InteractableConfig {
            disabled: true,
            ..InteractableConfig::immediate()
        },
    );

    for interactable in [first, second, switched_off] {
        enter(&mut app, agent, interactable);
    }
    app.update();
    press(&mut app, agent);
    app.update();

    assert_eq!(interacted(&app, first), 1);
    assert_eq!(interacted(&app, second), 1);
    assert_eq!(interacted(&app, switched_off), 0);
    assert_eq!(app.world().get::<Interactor>(agent).unwrap().current_target(), None);
}

#[test]
fn disable_after_use_blocks_every_agent_until_enabled() {
    let mut app = test_app();
    let first = spawn_agent(&mut app);
    let second = spawn_agent(&mut app);
    let chest = spawn_interactable(
        &mut app,
        InteractableConfig {
            disable_after_use: true,
            ..InteractableConfig::immediate()
        },
    );

    enter(&mut app, first, chest);
    enter(&mut app, second, chest);
    app.update();

    press(&mut app, first);
    app.update();
    assert_eq!(interacted(&app, chest), 1);

    press(&mut app, second);
    app.update();
    app.update();
    assert_eq!(interacted(&app, chest), 1);
    assert!(!app.world().get::<Interactable>(chest).unwrap().is_enabled());
    assert_eq!(
        app.world().get::<Interactor>(second).unwrap().evaluation(chest),
        Some(Eligibility::Disabled)
    );

    app.world_mut().get_mut::<Interactable>(chest).unwrap().enable();
    app.update();
    press(&mut app, second);
    app.update();
    assert!(log(&app).0.contains(&Note::Interacted {
        interactable: chest,
        agent: second
    }));
}

#[test]
fn unsubscribing_twice_fires_once() {
    let mut app = test_app();
    let agent = spawn_agent(&mut app);
    let other = spawn_agent(&mut app);
    let door = spawn_interactable(&mut app, InteractableConfig::immediate());

    enter(&mut app, agent, door);
    enter(&mut app, other, door);
    app.update();

    exit(&mut app, agent, door);
    exit(&mut app, agent, door);
    app.update();

    assert_eq!(app.world().get::<Interactable>(door).unwrap().subscriber_count(), 1);
    assert_eq!(log(&app).count(|note| matches!(note, Note::Unsubscribed { .. })), 1);
    assert_eq!(log(&app).count(|note| *note == Note::NoneLeft(agent)), 1);
    assert!(log(&app).0.contains(&Note::Cleared { agent, interactable: door }));
}

#[test]
fn despawned_interactable_is_an_implicit_unsubscribe() {
    let mut app = test_app();
    let agent = spawn_agent(&mut app);
    let barrel = spawn_interactable(&mut app, InteractableConfig::immediate());

    enter(&mut app, agent, barrel);
    app.update();
    assert_eq!(app.world().get::<Interactor>(agent).unwrap().current_target(), Some(barrel));

    app.world_mut().despawn(barrel);
    app.update();

    let interactor = app.world().get::<Interactor>(agent).unwrap();
    assert!(interactor.subscriptions().is_empty());
    assert_eq!(interactor.current_target(), None);
    assert!(log(&app).0.contains(&Note::NoneLeft(agent)));
}

#[test]
fn despawned_agent_leaves_every_interactable() {
    let mut app = test_app();
    let agent = spawn_agent(&mut app);
    let first = spawn_interactable(&mut app, InteractableConfig::immediate());
    let second = spawn_interactable(&mut app, InteractableConfig::immediate());

    enter(&mut app, agent, first);
    enter(&mut app, agent, second);
    app.update();

    app.world_mut().despawn(agent);
    app.update();

    assert_eq!(app.world().get::<Interactable>(first).unwrap().subscriber_count(), 0);
    assert_eq!(app.world().get::<Interactable>(second).unwrap().subscriber_count(), 0);
    assert_eq!(log(&app).count(|note| matches!(note, Note::Unsubscribed { .. })), 2);
}

#[test]
fn hold_fires_after_duration_and_release_cancels() {
    let mut app = test_app();
    let agent = spawn_agent(&mut app);
    let valve = spawn_interactable(&mut app, InteractableConfig::immediate().with_hold(0.5, false));

    enter(&mut app, agent, valve);
    app.update();
    app.update();

    press(&mut app, agent);
    app.update();
    assert!(app.world().get::<Interactor>(agent).unwrap().hold().is_holding());
    assert!(log(&app).0.contains(&Note::Progress(agent, 0.0)));

    for _ in 0..3 {
        app.update();
    }
    assert_eq!(interacted(&app, valve), 0);

    release(&mut app, agent);
    app.update();
    assert!(!app.world().get::<Interactor>(agent).unwrap().hold().is_holding());
    assert!(log(&app).0.contains(&Note::HideProgress(agent)));
    assert_eq!(interacted(&app, valve), 0);

    press(&mut app, agent);
    for _ in 0..12 {
        app.update();
    }
    assert_eq!(interacted(&app, valve), 1, "a non repeatable hold fires once");
    assert!(!app.world().get::<Interactor>(agent).unwrap().hold().is_holding());
}

#[test]
fn completed_hold_disables_a_single_use_target() {
    let mut app = test_app();
    let agent = spawn_agent(&mut app);
    let crank = spawn_interactable(
        &mut app,
        InteractableConfig {
            disable_after_use: true,
            ..InteractableConfig::immediate().with_hold(0.3, false)
        },
    );

    enter(&mut app, agent, crank);
    app.update();
    app.update();
    press(&mut app, agent);
    for _ in 0..8 {
        app.update();
    }

    assert_eq!(interacted(&app, crank), 1);
    assert!(!app.world().get::<Interactable>(crank).unwrap().is_enabled());
    let interactor = app.world().get::<Interactor>(agent).unwrap();
    assert!(!interactor.hold().is_holding());
    assert_eq!(interactor.current_target(), None);
    assert_eq!(interactor.evaluation(crank), Some(Eligibility::Disabled));
    assert!(log(&app).0.contains(&Note::Cleared { agent, interactable: crank }));
}

#[test]
fn repeatable_hold_keeps_firing_while_held() {
    let mut app = test_app();
    let agent = spawn_agent(&mut app);
    let pump = spawn_interactable(&mut app, InteractableConfig::immediate().with_hold(0.2, true));

    enter(&mut app, agent, pump);
    app.update();
    app.update();
    press(&mut app, agent);
    for _ in 0..12 {
        app.update();
    }

    assert!(interacted(&app, pump) >= 2);
    assert!(app.world().get::<Interactor>(agent).unwrap().hold().is_holding());
}

#[test]
fn leaving_range_cancels_a_hold() {
    let mut app = test_app();
    let agent = spawn_agent(&mut app);
    let valve = spawn_interactable(&mut app, InteractableConfig::immediate().with_hold(0.5, false));

    enter(&mut app, agent, valve);
    app.update();
    app.update();
    press(&mut app, agent);
    app.update();
    exit(&mut app, agent, valve);
    for _ in 0..10 {
        app.update();
    }

    assert_eq!(interacted(&app, valve), 0);
    assert!(log(&app).0.contains(&Note::HideProgress(agent)));
}

#[test]
fn distance_limits_eligibility() {
    let mut app = test_app();
    let agent = spawn_agent(&mut app);
    let sign = app
        .world_mut()
        .spawn((
            Interactable::new(InteractableConfig::immediate().with_max_distance(5.0)),
            Transform::from_xyz(3.0, 0.0, 0.0),
        ))
        .id();

    enter(&mut app, agent, sign);
    app.update();
    assert_eq!(app.world().get::<Interactor>(agent).unwrap().current_target(), Some(sign));

    app.world_mut().get_mut::<Transform>(sign).unwrap().translation.x = 10.0;
    app.update();
    assert_eq!(app.world().get::<Interactor>(agent).unwrap().current_target(), None);
    assert!(matches!(
        app.world().get::<Interactor>(agent).unwrap().evaluation(sign),
        Some(Eligibility::TooFar { .. })
    ));
}

#[test]
fn view_angle_follows_agent_facing() {
    let mut app = test_app();
    let agent = app
        .world_mut()
        .spawn((Interactor::default(), Transform::default(), ViewDirection(Vec3::X)))
        .id();
    let button = app
        .world_mut()
        .spawn((
            Interactable::new(InteractableConfig {
                requires_angle_check: true,
                angle_margin_degrees: 30.0,
                ..InteractableConfig::immediate()
            }),
            Transform::from_xyz(4.0, 0.0, 0.0),
        ))
        .id();

    enter(&mut app, agent, button);
    app.update();
    assert_eq!(app.world().get::<Interactor>(agent).unwrap().current_target(), Some(button));

    app.world_mut().get_mut::<ViewDirection>(agent).unwrap().0 = Vec3::NEG_X;
    app.update();
    assert_eq!(app.world().get::<Interactor>(agent).unwrap().current_target(), None);
}

#[test]
fn blocked_line_of_sight_hides_marker_and_prompt() {
    let mut app = test_app();
    app.insert_resource(LineOfSightProvider::new(
        |_: Vec3, _: Vec3, _: Entity, _: &[Entity]| RayHit::BLOCKED,
    ));
    let agent = spawn_agent(&mut app);
    let terminal = spawn_interactable(
        &mut app,
        InteractableConfig {
            name: "Terminal".into(),
            prompt: "Use".into(),
            requires_reachability: true,
            ..InteractableConfig::immediate()
        },
    );

    enter(&mut app, agent, terminal);
    app.update();
    let flags = app.world().get::<PresentationFlags>(terminal).unwrap();
    assert!(!flags.marker());
    assert!(flags.name_label());
    assert!(!flags.prompt());

    app.insert_resource(LineOfSightProvider::open_space());
    app.update();
    let flags = app.world().get::<PresentationFlags>(terminal).unwrap();
    assert!(flags.marker());
    assert!(flags.prompt());
    assert!(log(&app).0.contains(&Note::ShowPrompt(terminal, "Use".into())));

    exit(&mut app, agent, terminal);
    app.update();
    let flags = app.world().get::<PresentationFlags>(terminal).unwrap();
    assert!(!flags.marker());
    assert!(!flags.name_label());
    assert!(log(&app).0.contains(&Note::HidePrompt(terminal)));
}

#[test]
fn missing_line_of_sight_provider_fails_closed() {
    let mut app = test_app();
    app.world_mut().remove_resource::<LineOfSightProvider>();
    let agent = spawn_agent(&mut app);
    let hatch = spawn_interactable(
        &mut app,
        InteractableConfig {
            requires_reachability: true,
            ..InteractableConfig::immediate()
        },
    );

    enter(&mut app, agent, hatch);
    app.update();
    app.update();

    let interactor = app.world().get::<Interactor>(agent).unwrap();
    assert_eq!(interactor.current_target(), None);
    assert_eq!(interactor.evaluation(hatch), Some(Eligibility::Missing(Capability::WorldQuery)));
}

#[test]
fn can_interact_is_sent_once_per_streak() {
    let mut app = test_app();
    let agent = spawn_agent(&mut app);
    let lamp = spawn_interactable(&mut app, InteractableConfig::immediate());

    enter(&mut app, agent, lamp);
    for _ in 0..3 {
        app.update();
    }
    let can_interact = |app: &App| log(app).count(|note| matches!(note, Note::CanInteract { .. }));
    assert_eq!(can_interact(&app), 1);

    app.world_mut().get_mut::<Interactable>(lamp).unwrap().disable();
    app.update();
    app.world_mut().get_mut::<Interactable>(lamp).unwrap().enable();
    app.update();
    assert_eq!(can_interact(&app), 2);
}
