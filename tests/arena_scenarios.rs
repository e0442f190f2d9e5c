//! End-to-end combat scenarios against the arena state machine

use std::time::Instant;

use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use uuid::Uuid;

use arena_shooter::client::{ClientWorld, FrameInput};
use arena_shooter::game::combat::MAX_HEALTH;
use arena_shooter::game::spawn::SpawnCatalog;
use arena_shooter::game::{ArenaState, Outbound, ParticipantId, Recipient};
use arena_shooter::physics::movement::MovementConfig;
use arena_shooter::physics::{BoxWorld, MoveInput, MovementController, SurfaceTag};
use arena_shooter::ws::protocol::{ClientMsg, ServerMsg, WireVec3};

const BULLDOG_DAMAGE: u32 = 34;

fn arena_with_two() -> (ArenaState, ParticipantId, ParticipantId) {
    let mut arena = ArenaState::new(SpawnCatalog::dust2(99));
    let shooter = ParticipantId::new();
    let target = ParticipantId::new();
    arena.connect(shooter, 0);
    arena.connect(target, 1);
    (arena, shooter, target)
}

fn hit(shooter: ParticipantId, target: ParticipantId, damage: u32) -> ClientMsg {
    ClientMsg::HitReport {
        bullet_id: Uuid::new_v4(),
        target_id: target,
        damage,
        shooter_id: shooter,
    }
}

fn kills(out: &[Outbound]) -> usize {
    out.iter()
        .filter(|o| matches!(o.msg, ServerMsg::KillAnnouncement { .. }))
        .count()
}

#[test]
fn single_hit_notifies_victim_only() {
    let (mut arena, shooter, target) = arena_with_two();

    let out = arena.handle_client(shooter, hit(shooter, target, BULLDOG_DAMAGE), 10);

    assert_eq!(
        out,
        vec![Outbound {
            to: Recipient::One(target),
            msg: ServerMsg::DamageNotice {
                damage: BULLDOG_DAMAGE,
                health: 66,
                shooter_id: shooter,
            },
        }]
    );
    let state = arena.participant(&target).unwrap();
    assert_eq!(state.health(), 66);
    assert!(state.is_alive());
}

#[test]
fn third_hit_kills_exactly_once() {
    let (mut arena, shooter, target) = arena_with_two();

    let mut out = Vec::new();
    for t in 0..3 {
        out.extend(arena.handle_client(shooter, hit(shooter, target, BULLDOG_DAMAGE), t));
    }

    let victim = arena.participant(&target).unwrap();
    assert_eq!(victim.health(), 0);
    assert!(!victim.is_alive());
    assert_eq!(kills(&out), 1);
    assert_eq!(arena.participant(&shooter).unwrap().score, 1);
    assert!(out.contains(&Outbound {
        to: Recipient::All,
        msg: ServerMsg::KillAnnouncement {
            killer_id: shooter,
            victim_id: target,
            killer_score: 1,
        },
    }));

    // Late hits against the corpse change nothing
    let late = arena.handle_client(shooter, hit(shooter, target, BULLDOG_DAMAGE), 5);
    assert!(late.is_empty());
    assert_eq!(arena.participant(&shooter).unwrap().score, 1);
}

#[test]
fn self_hit_is_ignored() {
    let (mut arena, shooter, _) = arena_with_two();
    let out = arena.handle_client(shooter, hit(shooter, shooter, BULLDOG_DAMAGE), 0);
    assert!(out.is_empty());
    assert_eq!(arena.participant(&shooter).unwrap().health(), MAX_HEALTH);
}

#[test]
fn departed_shooter_cannot_land_hits() {
    let (mut arena, shooter, target) = arena_with_two();
    let out = arena.disconnect(shooter);
    assert_eq!(
        out,
        vec![Outbound {
            to: Recipient::All,
            msg: ServerMsg::ParticipantDisconnected { id: shooter },
        }]
    );

    // Another client reports the departed participant's in-flight bullet
    let late = arena.handle_client(target, hit(shooter, target, BULLDOG_DAMAGE), 50);
    assert!(late.is_empty());
    assert_eq!(arena.participant(&target).unwrap().health(), MAX_HEALTH);
}

#[test]
fn departed_shooter_bullet_keeps_flying_on_clients() {
    let me = ParticipantId::new();
    let gone = ParticipantId::new();
    let mut world = BoxWorld::new();
    world.add_floor(0.0, 5_000.0);

    let mut client = ClientWorld::new(MovementConfig::default(), 3);
    client.set_connected(true);
    let me_snapshot = arena_shooter::ws::protocol::ParticipantSnapshot {
        id: me,
        username: "me".into(),
        position: Vec3::new(0.0, 2.0, 0.0).into(),
        rotation: WireVec3::default(),
        health: MAX_HEALTH,
        alive: true,
        score: 0,
        current_weapon: Default::default(),
    };
    client.receive(ServerMsg::Join {
        id: me,
        participant: me_snapshot.clone(),
        roster: vec![me_snapshot],
    });
    client.receive(ServerMsg::ShotFired {
        id: gone,
        origin: Vec3::new(500.0, 20.0, 500.0).into(),
        direction: Vec3::X.into(),
        weapon: None,
        bullet_id: Some(Uuid::new_v4()),
    });
    client.receive(ServerMsg::ParticipantDisconnected { id: gone });

    let now = Instant::now();
    client.tick(now, 1.0 / 60.0, &FrameInput::default(), &world);
    assert_eq!(client.projectiles().len(), 1);
    assert_eq!(client.projectiles().iter().next().unwrap().shooter, gone);
}

#[test]
fn sprint_into_wall_keeps_only_free_component() {
    let mut world = BoxWorld::new();
    world.add_floor(0.0, 1_000.0);
    world.add_box(
        Vec3::new(2.5, 10.0, 0.0),
        Vec3::new(0.5, 10.0, 100.0),
        SurfaceTag::Wall,
    );

    let mut controller = MovementController::new(Vec3::new(0.0, 2.0, 0.0), MovementConfig::default());
    controller.update(&MoveInput::default(), 1.0 / 60.0, &world);
    controller.set_look(0.0, std::f32::consts::FRAC_PI_4);

    let frame = controller.update(
        &MoveInput {
            forward: true,
            sprint: true,
            ..Default::default()
        },
        1.0 / 30.0,
        &world,
    );

    assert!(frame.position.x.abs() < 1e-4, "moved into the wall");
    assert!(frame.position.z > 1.0, "did not slide");
    assert!(frame.position.z < 225.0 / 30.0, "moved the full diagonal");
}

#[test]
fn respawn_while_alive_is_a_no_op() {
    let (mut arena, shooter, _) = arena_with_two();
    let before = arena.participant(&shooter).unwrap().position;
    assert!(arena
        .handle_client(shooter, ClientMsg::RespawnRequest, 0)
        .is_empty());
    assert_eq!(arena.participant(&shooter).unwrap().position, before);
}

#[test]
fn respawn_restores_full_health_at_catalog_point() {
    let (mut arena, shooter, target) = arena_with_two();
    arena.handle_client(shooter, hit(shooter, target, 250), 0);
    assert!(!arena.participant(&target).unwrap().is_alive());

    let out = arena.handle_client(target, ClientMsg::RespawnRequest, 100);
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].to, Recipient::All);
    match &out[0].msg {
        ServerMsg::RespawnAnnouncement { id, participant } => {
            assert_eq!(*id, target);
            assert_eq!(participant.health, MAX_HEALTH);
            assert!(participant.alive);
            assert!(arena
                .spawns()
                .points()
                .contains(&Vec3::from(participant.position)));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn health_stays_in_range_for_random_reports() {
    let mut rng = ChaCha8Rng::seed_from_u64(2024);
    let mut arena = ArenaState::new(SpawnCatalog::dust2(5));
    let ids: Vec<ParticipantId> = (0..4).map(|_| ParticipantId::new()).collect();
    for (i, id) in ids.iter().enumerate() {
        arena.connect(*id, i as u64);
    }

    for t in 0..2_000u64 {
        let shooter = ids[rng.gen_range(0..ids.len())];
        let target = ids[rng.gen_range(0..ids.len())];
        let msg = if rng.gen_bool(0.1) {
            ClientMsg::RespawnRequest
        } else {
            hit(shooter, target, rng.gen_range(0..=150))
        };
        let sender = if matches!(msg, ClientMsg::RespawnRequest) { target } else { shooter };
        arena.handle_client(sender, msg, t);

        for id in &ids {
            let p = arena.participant(id).unwrap();
            assert!(p.health() <= MAX_HEALTH);
            assert_eq!(p.is_alive(), p.health() > 0);
        }
    }
}

#[test]
fn every_spawn_is_a_catalog_point() {
    let mut arena = ArenaState::new(SpawnCatalog::dust2(17));
    for t in 0..200 {
        let id = ParticipantId::new();
        arena.connect(id, t);
        let position = arena.participant(&id).unwrap().position;
        assert!(arena.spawns().points().contains(&position));
    }
}
