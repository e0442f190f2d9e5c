//! Static weapon catalog
//!
//! Weapon data is read-only at runtime. Both the client simulation and the
//! relay server refer to weapons by [`WeaponKind`].

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Weapons available in the arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeaponKind {
    /// Automatic assault rifle
    Bulldog,
    /// Semi-automatic sniper rifle
    L118a1,
}

impl Default for WeaponKind {
    fn default() -> Self {
        Self::Bulldog
    }
}

/// Trigger behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireMode {
    /// Fires while the trigger is held
    Automatic,
    /// One shot per trigger press
    SemiAutomatic,
}

/// Spread parameters (radians)
#[derive(Debug, Clone, Copy)]
pub struct AccuracyStats {
    /// Spread when standing still
    pub base_spread: f32,
    /// Spread added per unit of speed above the threshold
    pub movement_multiplier: f32,
    /// Cap on the movement contribution
    pub max_movement_penalty: f32,
    /// Multiplier on the movement contribution while sprinting
    pub sprint_multiplier: f32,
    /// Horizontal speed below which movement adds no spread
    pub movement_threshold: f32,
}

/// Projectile ballistics
#[derive(Debug, Clone, Copy)]
pub struct ProjectileStats {
    /// Muzzle velocity (units/second)
    pub muzzle_velocity: f32,
    /// Vertical acceleration (units/second², negative pulls down)
    pub gravity: f32,
    /// Seconds before an unresolved projectile expires
    pub lifetime: f32,
}

/// Weapon-space recoil kick
#[derive(Debug, Clone, Copy)]
pub struct RecoilStats {
    pub intensity: Vec3,
    /// Frames the kick lasts
    pub duration_frames: u32,
    pub recovery: f32,
}

/// Full configuration of one weapon
#[derive(Debug, Clone, Copy)]
pub struct WeaponConfig {
    pub kind: WeaponKind,
    pub name: &'static str,
    /// Rounds per minute
    pub fire_rate: f32,
    pub fire_mode: FireMode,
    pub damage: u32,
    pub projectile: ProjectileStats,
    pub accuracy: AccuracyStats,
    /// Muzzle position in weapon space
    pub barrel_offset: Vec3,
    /// Distance the spawn point is pushed along the aim to clear weapon geometry
    pub barrel_ray_offset: f32,
    pub recoil: RecoilStats,
}

impl WeaponConfig {
    /// Seconds between two shots
    pub fn cooldown(&self) -> f32 {
        60.0 / self.fire_rate
    }
}

/// Rifle spread model. Weapons without their own tuning share it.
const RIFLE_ACCURACY: AccuracyStats = AccuracyStats {
    base_spread: 0.005,
    movement_multiplier: 0.008,
    max_movement_penalty: 0.05,
    sprint_multiplier: 1.5,
    movement_threshold: 10.0,
};

/// Standing spread of the sniper relative to the rifle
const SNIPER_BASE_SPREAD_RATIO: f32 = 0.1;

const BULLDOG: WeaponConfig = WeaponConfig {
    kind: WeaponKind::Bulldog,
    name: "Bulldog",
    fire_rate: 600.0,
    fire_mode: FireMode::Automatic,
    damage: 34,
    projectile: ProjectileStats {
        muzzle_velocity: 2500.0,
        gravity: -10.0,
        lifetime: 5.0,
    },
    accuracy: RIFLE_ACCURACY,
    barrel_offset: Vec3::new(0.0, 0.0, 0.8),
    barrel_ray_offset: 1.0,
    recoil: RecoilStats {
        intensity: Vec3::new(0.03, 0.015, 0.03),
        duration_frames: 6,
        recovery: 0.8,
    },
};

const L118A1: WeaponConfig = WeaponConfig {
    kind: WeaponKind::L118a1,
    name: "L118A1 Sniper",
    fire_rate: 45.0,
    fire_mode: FireMode::SemiAutomatic,
    damage: 120,
    projectile: ProjectileStats {
        muzzle_velocity: 4000.0,
        gravity: -3.0,
        lifetime: 10.0,
    },
    // Precise standing shot, same movement penalty as the rifle
    accuracy: AccuracyStats {
        base_spread: RIFLE_ACCURACY.base_spread * SNIPER_BASE_SPREAD_RATIO,
        ..RIFLE_ACCURACY
    },
    barrel_offset: Vec3::new(0.0, 0.0, 1.0),
    barrel_ray_offset: 1.2,
    recoil: RecoilStats {
        intensity: Vec3::new(0.25, 0.03, 0.08),
        duration_frames: 35,
        recovery: 0.95,
    },
};

impl WeaponKind {
    /// Every weapon in the catalog
    pub const ALL: [WeaponKind; 2] = [WeaponKind::Bulldog, WeaponKind::L118a1];

    /// Static configuration for this weapon
    pub fn config(self) -> &'static WeaponConfig {
        match self {
            WeaponKind::Bulldog => &BULLDOG,
            WeaponKind::L118a1 => &L118A1,
        }
    }
}
