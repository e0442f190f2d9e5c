//! Remote avatar interpolation
//!
//! Network updates for other participants arrive at most every ~16 ms and
//! often less. Each avatar keeps a displayed transform that chases the latest
//! received transform by exponential smoothing, and mirrors the server's
//! alive/dead state with a short death arc before the avatar is hidden.

use glam::Vec3;
use rand::Rng;

use crate::game::participant::ParticipantId;
use crate::game::weapons::WeaponKind;
use crate::ws::protocol::ParticipantSnapshot;

/// Fraction of the remaining distance covered per second
pub const INTERPOLATION_RATE: f32 = 10.0;

/// Targets further than this from the displayed position are snapped to
pub const SNAP_DISTANCE: f32 = 100.0;

/// Seconds the death arc plays before the avatar is hidden
pub const DEATH_ARC_DURATION: f32 = 3.0;

const DEATH_ARC_GRAVITY: f32 = -19.62;
const DEATH_LAUNCH_SPEED: f32 = 550.0;
const DEATH_LATERAL_SPREAD: f32 = 6.0;
const DEATH_SPIN_SPREAD: f32 = 10.0;

/// What the avatar is doing on screen
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AvatarPhase {
    Alive,
    Dying {
        velocity: Vec3,
        spin: Vec3,
        elapsed: f32,
    },
    Hidden,
}

/// Local mirror of another participant
#[derive(Debug, Clone)]
pub struct RemoteAvatar {
    pub id: ParticipantId,
    pub username: String,
    pub health: u32,
    pub score: u32,
    pub weapon: WeaponKind,
    position: Vec3,
    rotation: Vec3,
    target_position: Vec3,
    target_rotation: Vec3,
    phase: AvatarPhase,
}

impl RemoteAvatar {
    pub fn from_snapshot(snapshot: &ParticipantSnapshot) -> Self {
        let position = snapshot.position.into();
        let rotation = snapshot.rotation.into();
        Self {
            id: snapshot.id,
            username: snapshot.username.clone(),
            health: snapshot.health,
            score: snapshot.score,
            weapon: snapshot.current_weapon,
            position,
            rotation,
            target_position: position,
            target_rotation: rotation,
            phase: if snapshot.alive {
                AvatarPhase::Alive
            } else {
                AvatarPhase::Hidden
            },
        }
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn rotation(&self) -> Vec3 {
        self.rotation
    }

    /// Facing used for the body mesh; only yaw turns the avatar
    pub fn body_yaw(&self) -> f32 {
        self.rotation.y
    }

    pub fn phase(&self) -> AvatarPhase {
        self.phase
    }

    pub fn is_alive(&self) -> bool {
        self.phase == AvatarPhase::Alive
    }

    pub fn is_visible(&self) -> bool {
        !matches!(self.phase, AvatarPhase::Hidden)
    }

    /// New transform from a relayed movement update
    pub fn set_target(&mut self, position: Vec3, rotation: Vec3) {
        self.target_position = position;
        self.target_rotation = rotation;

        if self.phase == AvatarPhase::Alive
            && self.position.distance(position) > SNAP_DISTANCE
        {
            self.position = position;
            self.rotation = rotation;
        }
    }

    /// Server says this participant died; starts the death arc once
    pub fn kill<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.health = 0;
        if self.phase != AvatarPhase::Alive {
            return;
        }

        let velocity = Vec3::new(
            (rng.gen::<f32>() - 0.5) * DEATH_LATERAL_SPREAD,
            DEATH_LAUNCH_SPEED,
            (rng.gen::<f32>() - 0.5) * DEATH_LATERAL_SPREAD,
        );
        let spin = Vec3::new(
            (rng.gen::<f32>() - 0.5) * DEATH_SPIN_SPREAD,
            (rng.gen::<f32>() - 0.5) * DEATH_SPIN_SPREAD,
            (rng.gen::<f32>() - 0.5) * DEATH_SPIN_SPREAD,
        );
        self.phase = AvatarPhase::Dying {
            velocity,
            spin,
            elapsed: 0.0,
        };
    }

    /// Server brought this participant back; appears at the new spot at once
    pub fn respawn(&mut self, snapshot: &ParticipantSnapshot) {
        self.position = snapshot.position.into();
        self.rotation = snapshot.rotation.into();
        self.target_position = self.position;
        self.target_rotation = self.rotation;
        self.health = snapshot.health;
        self.score = snapshot.score;
        self.weapon = snapshot.current_weapon;
        self.phase = AvatarPhase::Alive;
    }

    /// Advance one frame
    pub fn update(&mut self, dt: f32) {
        match &mut self.phase {
            AvatarPhase::Dying {
                velocity,
                spin,
                elapsed,
            } => {
                *elapsed += dt;
                if *elapsed >= DEATH_ARC_DURATION {
                    self.phase = AvatarPhase::Hidden;
                    return;
                }
                velocity.y += DEATH_ARC_GRAVITY * dt;
                self.position += *velocity * dt;
                self.rotation += *spin * dt;
            }
            AvatarPhase::Alive => {
                let factor = (dt * INTERPOLATION_RATE).min(1.0);
                self.position = self.position.lerp(self.target_position, factor);
                self.rotation = self.rotation.lerp(self.target_rotation, factor);
            }
            AvatarPhase::Hidden => {}
        }
    }
}
