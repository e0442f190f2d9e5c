//! Projectile integration and the accuracy model

use std::f32::consts::TAU;

use glam::{Affine3A, Vec3};
use rand::Rng;

use crate::game::weapons::{AccuracyStats, WeaponConfig};

/// Aim vectors whose vertical component exceeds this use X as the
/// reference axis for the spread basis
const NEAR_VERTICAL: f32 = 0.99;

/// Advance one ballistic step.
///
/// Gravity acts on the vertical velocity first, then the position moves by
/// the updated velocity. Returns `(new_position, new_velocity)`.
pub fn step(position: Vec3, velocity: Vec3, gravity: f32, dt: f32) -> (Vec3, Vec3) {
    let mut vel = velocity;
    vel.y += gravity * dt;
    (position + vel * dt, vel)
}

/// Positions visited for a fixed sequence of frame deltas
pub fn trajectory(
    origin: Vec3,
    direction: Vec3,
    muzzle_velocity: f32,
    gravity: f32,
    deltas: &[f32],
) -> Vec<Vec3> {
    let mut position = origin;
    let mut velocity = direction.normalize_or_zero() * muzzle_velocity;
    deltas
        .iter()
        .map(|dt| {
            (position, velocity) = step(position, velocity, gravity, *dt);
            position
        })
        .collect()
}

/// Spread cone half-angle for the shooter's current motion
pub fn spread_angle(accuracy: &AccuracyStats, horizontal_speed: f32, sprinting: bool) -> f32 {
    let mut penalty = ((horizontal_speed - accuracy.movement_threshold)
        * accuracy.movement_multiplier)
        .max(0.0)
        .min(accuracy.max_movement_penalty);
    if sprinting {
        penalty *= accuracy.sprint_multiplier;
    }
    accuracy.base_spread + penalty
}

/// Two unit vectors orthogonal to `direction` and to each other
pub fn perpendicular_basis(direction: Vec3) -> (Vec3, Vec3) {
    let reference = if direction.y.abs() < NEAR_VERTICAL {
        Vec3::Y
    } else {
        Vec3::X
    };
    let right = direction.cross(reference).normalize();
    let up = right.cross(direction).normalize();
    (right, up)
}

/// Rotate `direction` by a random angle in `[-spread, spread]` about a
/// random azimuth around it
pub fn apply_spread<R: Rng + ?Sized>(direction: Vec3, spread: f32, rng: &mut R) -> Vec3 {
    let direction = direction.normalize_or_zero();
    if spread <= 0.0 || direction == Vec3::ZERO {
        return direction;
    }

    let angle = rng.gen_range(-spread..=spread);
    let azimuth = rng.gen_range(0.0..TAU);
    let (right, up) = perpendicular_basis(direction);
    let axis = right * azimuth.cos() + up * azimuth.sin();

    (direction * angle.cos() + axis * angle.sin()).normalize()
}

/// World-space muzzle point: barrel offset through the weapon transform,
/// pushed along the aim to clear the weapon's own geometry
pub fn barrel_origin(weapon_transform: &Affine3A, weapon: &WeaponConfig, aim: Vec3) -> Vec3 {
    weapon_transform.transform_point3(weapon.barrel_offset)
        + aim.normalize_or_zero() * weapon.barrel_ray_offset
}
