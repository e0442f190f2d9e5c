//! Client projectile engine
//!
//! Every bullet seen by a client lives here, whether it was fired locally or
//! spawned from a relayed shot. Projectiles sit in a generation-tagged slab
//! so a handle held past the projectile's removal can never alias a newer
//! bullet that reused the slot.

use glam::Vec3;
use uuid::Uuid;

use crate::game::combat::HitReport;
use crate::game::participant::ParticipantId;
use crate::game::weapons::{FireMode, WeaponKind};
use crate::physics::ballistics;
use crate::physics::collision::{CollisionQuery, QueryFilter, SurfaceTag};
use crate::util::time::clamp_frame_delta;

/// Radius of the fallback sphere test around known participants
pub const PROXIMITY_RADIUS: f32 = 1.0;

/// Seconds an environment impact stays visible
pub const IMPACT_LIFETIME: f32 = 0.2;

/// Handle to a live projectile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProjectileId {
    index: u32,
    generation: u32,
}

/// Bullet in flight
#[derive(Debug, Clone)]
pub struct Projectile {
    pub bullet_id: Uuid,
    pub shooter: ParticipantId,
    pub weapon: WeaponKind,
    pub position: Vec3,
    pub velocity: Vec3,
    pub gravity: f32,
    pub damage: u32,
    pub lifetime_remaining: f32,
}

/// Parameters of a discharge, local or relayed
#[derive(Debug, Clone, Copy)]
pub struct ShotParams {
    pub shooter: ParticipantId,
    pub origin: Vec3,
    /// Aim after spread; normalized on spawn
    pub direction: Vec3,
    pub weapon: WeaponKind,
}

/// Participant a projectile may strike
#[derive(Debug, Clone, Copy)]
pub struct KnownParticipant {
    pub id: ParticipantId,
    pub position: Vec3,
    pub alive: bool,
}

/// How a projectile resolved
#[derive(Debug, Clone, PartialEq)]
pub enum ProjectileEvent {
    /// Struck someone other than the shooter
    PlayerHit {
        bullet_id: Uuid,
        shooter: ParticipantId,
        target: ParticipantId,
        damage: u32,
        point: Vec3,
    },
    /// Struck world geometry
    EnvironmentHit {
        bullet_id: Uuid,
        shooter: ParticipantId,
        point: Vec3,
    },
    /// Lifetime ran out
    Expired {
        bullet_id: Uuid,
        shooter: ParticipantId,
    },
}

impl ProjectileEvent {
    /// Report to send to the server for a player hit
    pub fn hit_report(&self) -> Option<HitReport> {
        match self {
            ProjectileEvent::PlayerHit {
                bullet_id,
                shooter,
                target,
                damage,
                ..
            } => Some(HitReport {
                bullet_id: *bullet_id,
                shooter: *shooter,
                target: *target,
                damage: *damage,
            }),
            _ => None,
        }
    }
}

/// Transient impact marker for the effects layer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Impact {
    pub point: Vec3,
    pub remaining: f32,
}

#[derive(Debug)]
enum Slot {
    Occupied {
        generation: u32,
        projectile: Projectile,
    },
    Vacant {
        generation: u32,
        next_free: Option<u32>,
    },
}

/// Live projectiles plus the impacts they left behind
#[derive(Debug, Default)]
pub struct ProjectileEngine {
    slots: Vec<Slot>,
    free_head: Option<u32>,
    live: usize,
    impacts: Vec<Impact>,
}

impl ProjectileEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn a projectile with a fresh bullet id.
    /// Returns `None` for a zero-length aim.
    pub fn spawn(&mut self, shot: ShotParams) -> Option<ProjectileId> {
        self.spawn_with_id(shot, Uuid::new_v4())
    }

    pub fn spawn_with_id(&mut self, shot: ShotParams, bullet_id: Uuid) -> Option<ProjectileId> {
        let direction = shot.direction.try_normalize()?;
        let config = shot.weapon.config();

        let projectile = Projectile {
            bullet_id,
            shooter: shot.shooter,
            weapon: shot.weapon,
            position: shot.origin,
            velocity: direction * config.projectile.muzzle_velocity,
            gravity: config.projectile.gravity,
            damage: config.damage,
            lifetime_remaining: config.projectile.lifetime,
        };

        Some(self.insert(projectile))
    }

    pub fn get(&self, id: ProjectileId) -> Option<&Projectile> {
        match self.slots.get(id.index as usize) {
            Some(Slot::Occupied {
                generation,
                projectile,
            }) if *generation == id.generation => Some(projectile),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Projectile> {
        self.slots.iter().filter_map(|slot| match slot {
            Slot::Occupied { projectile, .. } => Some(projectile),
            Slot::Vacant { .. } => None,
        })
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn impacts(&self) -> &[Impact] {
        &self.impacts
    }

    /// Advance every projectile by `dt` and collect the ones that resolved.
    ///
    /// Each projectile moves, checks the segment it just travelled and only
    /// then loses lifetime, so its last step is still tested. `participants`
    /// drives the proximity fallback and decides whether a player-volume hit
    /// counts.
    pub fn tick<W: CollisionQuery + ?Sized>(
        &mut self,
        dt: f32,
        world: &W,
        participants: &[KnownParticipant],
    ) -> Vec<ProjectileEvent> {
        let dt = clamp_frame_delta(dt);

        self.impacts.retain_mut(|impact| {
            impact.remaining -= dt;
            impact.remaining > 0.0
        });

        let mut events = Vec::new();
        for index in 0..self.slots.len() {
            let event = match &mut self.slots[index] {
                Slot::Occupied { projectile, .. } => advance(projectile, dt, world, participants),
                Slot::Vacant { .. } => continue,
            };

            if let Some(event) = event {
                if let ProjectileEvent::EnvironmentHit { point, .. } = &event {
                    self.impacts.push(Impact {
                        point: *point,
                        remaining: IMPACT_LIFETIME,
                    });
                }
                self.release(index as u32);
                events.push(event);
            }
        }
        events
    }

    /// Drop everything (map change, disconnect)
    pub fn clear(&mut self) {
        let indices: Vec<u32> = self
            .slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| matches!(slot, Slot::Occupied { .. }))
            .map(|(i, _)| i as u32)
            .collect();
        for index in indices {
            self.release(index);
        }
        self.impacts.clear();
    }

    fn insert(&mut self, projectile: Projectile) -> ProjectileId {
        self.live += 1;

        if let Some(index) = self.free_head {
            let slot = &mut self.slots[index as usize];
            if let Slot::Vacant {
                generation,
                next_free,
            } = *slot
            {
                self.free_head = next_free;
                *slot = Slot::Occupied {
                    generation,
                    projectile,
                };
                return ProjectileId { index, generation };
            }
        }

        let index = self.slots.len() as u32;
        self.slots.push(Slot::Occupied {
            generation: 0,
            projectile,
        });
        ProjectileId {
            index,
            generation: 0,
        }
    }

    fn release(&mut self, index: u32) {
        let slot = &mut self.slots[index as usize];
        if let Slot::Occupied { generation, .. } = *slot {
            *slot = Slot::Vacant {
                generation: generation.wrapping_add(1),
                next_free: self.free_head,
            };
            self.free_head = Some(index);
            self.live -= 1;
        }
    }
}

/// Move one projectile and decide whether it resolved
fn advance<W: CollisionQuery + ?Sized>(
    projectile: &mut Projectile,
    dt: f32,
    world: &W,
    participants: &[KnownParticipant],
) -> Option<ProjectileEvent> {
    let previous = projectile.position;
    (projectile.position, projectile.velocity) = ballistics::step(
        projectile.position,
        projectile.velocity,
        projectile.gravity,
        dt,
    );

    if let Some(event) = segment_hit(projectile, previous, world, participants) {
        return Some(event);
    }

    let nearby = participants.iter().find(|p| {
        p.alive
            && p.id != projectile.shooter
            && p.position.distance(projectile.position) <= PROXIMITY_RADIUS
    });
    if let Some(p) = nearby {
        return Some(ProjectileEvent::PlayerHit {
            bullet_id: projectile.bullet_id,
            shooter: projectile.shooter,
            target: p.id,
            damage: projectile.damage,
            point: p.position,
        });
    }

    projectile.lifetime_remaining -= dt;
    if projectile.lifetime_remaining <= 0.0 {
        return Some(ProjectileEvent::Expired {
            bullet_id: projectile.bullet_id,
            shooter: projectile.shooter,
        });
    }
    None
}

/// Nearest surface on the segment just travelled.
/// Volumes of dead or unknown participants are looked through.
fn segment_hit<W: CollisionQuery + ?Sized>(
    projectile: &Projectile,
    from: Vec3,
    world: &W,
    participants: &[KnownParticipant],
) -> Option<ProjectileEvent> {
    let strikable = |id: ParticipantId| {
        participants
            .iter()
            .any(|p| p.id == id && p.alive && p.id != projectile.shooter)
    };

    let mut seen_through: Vec<ParticipantId> = Vec::new();
    loop {
        let filter = QueryFilter::projectile(projectile.shooter).skipping(&seen_through);
        let hit = world.segment(from, projectile.position, &filter)?;

        match hit.tag {
            SurfaceTag::Player(target) if strikable(target) => {
                return Some(ProjectileEvent::PlayerHit {
                    bullet_id: projectile.bullet_id,
                    shooter: projectile.shooter,
                    target,
                    damage: projectile.damage,
                    point: hit.point,
                });
            }
            SurfaceTag::Player(target) => seen_through.push(target),
            _ => {
                return Some(ProjectileEvent::EnvironmentHit {
                    bullet_id: projectile.bullet_id,
                    shooter: projectile.shooter,
                    point: hit.point,
                });
            }
        }
    }
}

/// Trigger gating for the local weapon
#[derive(Debug, Clone)]
pub struct FireControl {
    weapon: WeaponKind,
    cooldown_remaining: f32,
    /// Trigger was released since the last shot
    armed: bool,
}

impl FireControl {
    pub fn new(weapon: WeaponKind) -> Self {
        Self {
            weapon,
            cooldown_remaining: 0.0,
            armed: true,
        }
    }

    pub fn weapon(&self) -> WeaponKind {
        self.weapon
    }

    /// Switch weapons; the new weapon is ready once the trigger is released
    pub fn equip(&mut self, weapon: WeaponKind) {
        self.weapon = weapon;
        self.cooldown_remaining = 0.0;
        self.armed = false;
    }

    /// Advance the cooldown and report whether a shot leaves the barrel
    pub fn update(&mut self, dt: f32, trigger_held: bool) -> bool {
        let config = self.weapon.config();
        self.cooldown_remaining = (self.cooldown_remaining - dt.max(0.0)).max(0.0);

        if !trigger_held {
            self.armed = true;
            return false;
        }
        if self.cooldown_remaining > 0.0 {
            return false;
        }
        if config.fire_mode == FireMode::SemiAutomatic && !self.armed {
            return false;
        }

        self.cooldown_remaining = config.cooldown();
        self.armed = false;
        true
    }
}
