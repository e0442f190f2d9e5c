//! Client game loop
//!
//! [`ClientWorld`] composes the local movement controller, fire control,
//! projectile engine, remote avatars and the outbound link into one
//! fixed-tick update. Inbound server messages are queued as they arrive and
//! applied at the start of the next tick, so the order of effects inside a
//! tick never depends on network timing.

use std::collections::{HashMap, VecDeque};
use std::time::Instant;

use glam::{Affine3A, EulerRot, Quat, Vec3};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use crate::game::combat::MAX_HEALTH;
use crate::game::participant::{sanitize_username, ParticipantId};
use crate::game::weapons::WeaponKind;
use crate::physics::ballistics;
use crate::physics::collision::CollisionQuery;
use crate::physics::movement::{MoveInput, MovementConfig, MovementController};
use crate::ws::protocol::{ClientMsg, ParticipantSnapshot, ServerMsg};

use super::link::ClientLink;
use super::projectiles::{
    FireControl, Impact, KnownParticipant, ProjectileEngine, ProjectileEvent, ShotParams,
};
use super::remote::RemoteAvatar;

/// Kill count at which the streak effect is at full intensity
pub const MAX_KILL_STREAK: u32 = 10;

/// Per-frame input from the presentation layer
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameInput {
    pub movement: MoveInput,
    pub trigger: bool,
}

/// Kills since the local participant last died
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KillStreak {
    count: u32,
}

impl KillStreak {
    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn record_kill(&mut self) -> u32 {
        self.count += 1;
        self.count
    }

    pub fn reset(&mut self) {
        self.count = 0;
    }

    /// 0.0 with no kills, 1.0 at [`MAX_KILL_STREAK`] and beyond
    pub fn intensity(&self) -> f32 {
        (self.count as f32 / MAX_KILL_STREAK as f32).min(1.0)
    }
}

/// Things the presentation layer reacts to
#[derive(Debug, Clone, PartialEq)]
pub enum WorldEvent {
    Joined { id: ParticipantId },
    ParticipantJoined { id: ParticipantId },
    ParticipantLeft { id: ParticipantId },
    LocalShot { origin: Vec3, direction: Vec3 },
    RemoteShot { shooter: ParticipantId, origin: Vec3 },
    HitReported { target: ParticipantId },
    Impact { point: Vec3 },
    Damaged { damage: u32, health: u32, shooter: ParticipantId },
    Died { killer: ParticipantId },
    KillFeed { killer: ParticipantId, victim: ParticipantId },
    KillScored { victim: ParticipantId, streak: u32 },
    Respawned { position: Vec3 },
    Renamed { id: ParticipantId, username: String },
}

/// Result of one client tick
#[derive(Debug, Default)]
pub struct ClientFrame {
    pub outbound: Vec<ClientMsg>,
    pub events: Vec<WorldEvent>,
}

/// Local participant as the server last described it
#[derive(Debug, Clone)]
pub struct LocalPlayer {
    pub id: Option<ParticipantId>,
    pub username: Option<String>,
    pub health: u32,
    pub alive: bool,
    pub score: u32,
}

impl Default for LocalPlayer {
    fn default() -> Self {
        Self {
            id: None,
            username: None,
            health: MAX_HEALTH,
            alive: true,
            score: 0,
        }
    }
}

/// Everything one client simulates
pub struct ClientWorld {
    local: LocalPlayer,
    controller: MovementController,
    fire: FireControl,
    projectiles: ProjectileEngine,
    remotes: HashMap<ParticipantId, RemoteAvatar>,
    link: ClientLink,
    streak: KillStreak,
    inbound: VecDeque<ServerMsg>,
    events: Vec<WorldEvent>,
    rng: ChaCha8Rng,
}

impl ClientWorld {
    pub fn new(movement: MovementConfig, seed: u64) -> Self {
        Self {
            local: LocalPlayer::default(),
            controller: MovementController::new(Vec3::ZERO, movement),
            fire: FireControl::new(WeaponKind::default()),
            projectiles: ProjectileEngine::new(),
            remotes: HashMap::new(),
            link: ClientLink::new(),
            streak: KillStreak::default(),
            inbound: VecDeque::new(),
            events: Vec::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn local(&self) -> &LocalPlayer {
        &self.local
    }

    pub fn controller(&self) -> &MovementController {
        &self.controller
    }

    pub fn projectiles(&self) -> &ProjectileEngine {
        &self.projectiles
    }

    pub fn impacts(&self) -> &[Impact] {
        self.projectiles.impacts()
    }

    pub fn remote(&self, id: &ParticipantId) -> Option<&RemoteAvatar> {
        self.remotes.get(id)
    }

    pub fn remotes(&self) -> impl Iterator<Item = &RemoteAvatar> {
        self.remotes.values()
    }

    pub fn streak(&self) -> KillStreak {
        self.streak
    }

    pub fn weapon(&self) -> WeaponKind {
        self.fire.weapon()
    }

    /// Transport state change from the socket layer
    pub fn set_connected(&mut self, connected: bool) {
        self.link.set_connected(connected);
        if !connected {
            self.local.id = None;
            self.remotes.clear();
            self.projectiles.clear();
        }
    }

    /// Queue a server message for the next tick
    pub fn receive(&mut self, msg: ServerMsg) {
        self.inbound.push_back(msg);
    }

    pub fn equip(&mut self, weapon: WeaponKind) {
        self.fire.equip(weapon);
    }

    /// Ask the server for a new display name
    pub fn set_username(&mut self, raw: &str) -> bool {
        match sanitize_username(raw) {
            Some(name) => {
                self.link.set_username(&name);
                self.local.username = Some(name);
                true
            }
            None => false,
        }
    }

    /// Ask to come back after dying; ignored while alive
    pub fn request_respawn(&mut self) {
        if !self.local.alive {
            self.link.request_respawn();
        }
    }

    /// Camera transform; the weapon is carried in camera space
    pub fn camera_transform(&self) -> Affine3A {
        let rotation = self.controller.rotation();
        Affine3A::from_rotation_translation(
            Quat::from_euler(EulerRot::YXZ, rotation.y, rotation.x, rotation.z),
            self.controller.eye_position(),
        )
    }

    /// Run one client tick
    pub fn tick<W: CollisionQuery + ?Sized>(
        &mut self,
        now: Instant,
        dt: f32,
        input: &FrameInput,
        world: &W,
    ) -> ClientFrame {
        while let Some(msg) = self.inbound.pop_front() {
            self.apply(msg);
        }

        if self.local.alive {
            let frame = self.controller.update(&input.movement, dt, world);
            if self.local.id.is_some() {
                self.link.send_movement(now, frame.position, frame.rotation);
            }
        }

        let trigger = input.trigger && self.local.alive;
        if self.fire.update(dt, trigger) {
            self.fire_local(&input.movement);
        }

        for avatar in self.remotes.values_mut() {
            avatar.update(dt);
        }

        let known = self.known_participants();
        for event in self.projectiles.tick(dt, world, &known) {
            self.on_projectile(event);
        }

        ClientFrame {
            outbound: self.link.drain(now),
            events: std::mem::take(&mut self.events),
        }
    }

    fn fire_local(&mut self, movement: &MoveInput) {
        let Some(shooter) = self.local.id else {
            return;
        };
        let weapon = self.fire.weapon();
        let config = weapon.config();

        let sprinting = movement.sprint && self.controller.is_moving();
        let spread = ballistics::spread_angle(
            &config.accuracy,
            self.controller.horizontal_speed(),
            sprinting,
        );
        let aim = self.controller.aim_direction();
        let direction = ballistics::apply_spread(aim, spread, &mut self.rng);
        let origin = ballistics::barrel_origin(&self.camera_transform(), config, aim);

        let bullet_id = uuid::Uuid::new_v4();
        let spawned = self.projectiles.spawn_with_id(
            ShotParams {
                shooter,
                origin,
                direction,
                weapon,
            },
            bullet_id,
        );
        if spawned.is_some() {
            self.link.send_shot(origin, direction, weapon, bullet_id);
            self.events.push(WorldEvent::LocalShot { origin, direction });
        }
    }

    fn known_participants(&self) -> Vec<KnownParticipant> {
        let mut known: Vec<KnownParticipant> = self
            .remotes
            .values()
            .map(|avatar| KnownParticipant {
                id: avatar.id,
                position: avatar.position(),
                alive: avatar.is_alive(),
            })
            .collect();
        if let Some(id) = self.local.id {
            known.push(KnownParticipant {
                id,
                position: self.controller.position(),
                alive: self.local.alive,
            });
        }
        known
    }

    fn on_projectile(&mut self, event: ProjectileEvent) {
        if let Some(report) = event.hit_report() {
            // Damage waits for the server; only the report goes out
            self.link.send_hit(&report);
            self.events.push(WorldEvent::HitReported {
                target: report.target,
            });
            return;
        }
        if let ProjectileEvent::EnvironmentHit { point, .. } = event {
            self.events.push(WorldEvent::Impact { point });
        }
    }

    fn is_local(&self, id: ParticipantId) -> bool {
        self.local.id == Some(id)
    }

    fn add_remote(&mut self, snapshot: &ParticipantSnapshot) {
        if self.is_local(snapshot.id) {
            return;
        }
        self.remotes
            .insert(snapshot.id, RemoteAvatar::from_snapshot(snapshot));
    }

    /// Apply one server message
    fn apply(&mut self, msg: ServerMsg) {
        match msg {
            ServerMsg::Join {
                id,
                participant,
                roster,
            } => {
                info!(participant_id = %id, roster = roster.len(), "Joined arena");
                self.local.id = Some(id);
                self.local.health = participant.health;
                self.local.alive = participant.alive;
                self.local.score = participant.score;
                self.controller.teleport(participant.position.into());

                self.remotes.clear();
                for snapshot in &roster {
                    self.add_remote(snapshot);
                }

                // Re-announce a name chosen before the connection came up
                if let Some(name) = self.local.username.clone() {
                    self.link.set_username(&name);
                }
                self.events.push(WorldEvent::Joined { id });
            }

            ServerMsg::ParticipantConnected { participant } => {
                self.add_remote(&participant);
                self.events
                    .push(WorldEvent::ParticipantJoined { id: participant.id });
            }

            ServerMsg::ParticipantDisconnected { id } => {
                if self.remotes.remove(&id).is_some() {
                    self.events.push(WorldEvent::ParticipantLeft { id });
                }
            }

            ServerMsg::MovementUpdate {
                id,
                position,
                rotation,
            } => {
                if let Some(avatar) = self.remotes.get_mut(&id) {
                    avatar.set_target(position.into(), rotation.into());
                }
            }

            ServerMsg::ShotFired {
                id,
                origin,
                direction,
                weapon,
                bullet_id,
            } => {
                let weapon = match (weapon, self.remotes.get_mut(&id)) {
                    (Some(weapon), Some(avatar)) => {
                        avatar.weapon = weapon;
                        weapon
                    }
                    (Some(weapon), None) => weapon,
                    (None, Some(avatar)) => avatar.weapon,
                    (None, None) => WeaponKind::default(),
                };
                let shot = ShotParams {
                    shooter: id,
                    origin: origin.into(),
                    direction: direction.into(),
                    weapon,
                };
                let spawned = match bullet_id {
                    Some(bullet_id) => self.projectiles.spawn_with_id(shot, bullet_id),
                    None => self.projectiles.spawn(shot),
                };
                if spawned.is_none() {
                    debug!(shooter = %id, "Dropped relayed shot with zero direction");
                }
                self.events.push(WorldEvent::RemoteShot {
                    shooter: id,
                    origin: origin.into(),
                });
            }

            ServerMsg::DamageNotice {
                damage,
                health,
                shooter_id,
            } => {
                self.local.health = health;
                self.events.push(WorldEvent::Damaged {
                    damage,
                    health,
                    shooter: shooter_id,
                });
            }

            ServerMsg::KillAnnouncement {
                killer_id,
                victim_id,
                killer_score,
            } => self.apply_kill(killer_id, victim_id, killer_score),

            ServerMsg::RespawnAnnouncement { id, participant } => {
                if self.is_local(id) {
                    let position = participant.position.into();
                    self.controller.teleport(position);
                    self.local.health = participant.health;
                    self.local.alive = true;
                    self.events.push(WorldEvent::Respawned { position });
                } else if let Some(avatar) = self.remotes.get_mut(&id) {
                    avatar.respawn(&participant);
                }
            }

            ServerMsg::IdentityUpdate { id, username } => {
                if self.is_local(id) {
                    self.local.username = Some(username.clone());
                } else if let Some(avatar) = self.remotes.get_mut(&id) {
                    avatar.username = username.clone();
                }
                self.events.push(WorldEvent::Renamed { id, username });
            }
        }
    }

    fn apply_kill(&mut self, killer: ParticipantId, victim: ParticipantId, killer_score: u32) {
        if self.is_local(victim) {
            self.local.alive = false;
            self.local.health = 0;
            self.streak.reset();
            self.events.push(WorldEvent::Died { killer });
        } else if let Some(avatar) = self.remotes.get_mut(&victim) {
            avatar.kill(&mut self.rng);
        }

        if self.is_local(killer) {
            self.local.score = killer_score;
            let streak = self.streak.record_kill();
            self.events.push(WorldEvent::KillScored { victim, streak });
        } else if let Some(avatar) = self.remotes.get_mut(&killer) {
            avatar.score = killer_score;
        }

        self.events.push(WorldEvent::KillFeed { killer, victim });
    }
}
