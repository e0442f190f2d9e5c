//! First-person movement and collision controller.
//!
//! Each tick turns key/mouse input into a displacement and resolves it
//! against a [`CollisionQuery`] in two phases:
//!
//! 1. **Horizontal**: rays cast from several body heights along the
//!    displacement. Fast moves are sampled at several points along the path
//!    with a larger clearance and extra rays a little to each side. A blocked
//!    move falls back to sliding along whichever axis component is clear.
//! 2. **Vertical**: a downward probe from just above the new position snaps
//!    the body onto the ground or leaves it airborne under gravity.
//!
//! Yaw `0` faces `+Z`; `right` is `+X` at yaw `0`. Positive pitch looks down.

use std::f32::consts::FRAC_PI_2;

use glam::{Vec2, Vec3};

use crate::util::time::clamp_frame_delta;

use super::collision::{CollisionQuery, QueryFilter};

/// Tunables for one body type
#[derive(Debug, Clone)]
pub struct MovementConfig {
    /// Forward/backward speed (units/second)
    pub walk_speed: f32,
    /// Left/right speed
    pub strafe_speed: f32,
    /// Applied to forward/backward speed while sprinting
    pub sprint_multiplier: f32,
    /// Applied when both axes are pressed
    pub diagonal_damping: f32,
    /// Instant upward velocity on jump
    pub jump_velocity: f32,
    /// Vertical acceleration (negative pulls down)
    pub gravity: f32,
    /// Camera height above the body origin
    pub eye_height: f32,
    /// Heights above the body origin that wall rays are cast from
    pub body_ray_heights: Vec<f32>,
    /// Per-tick horizontal distance above which a move counts as fast
    pub high_speed_step: f32,
    /// Path samples for a fast move
    pub high_speed_samples: u32,
    /// Wall clearance for normal moves
    pub safety_margin: f32,
    /// Wall clearance for fast moves
    pub high_speed_safety_margin: f32,
    /// Angle (radians) of the side rays on fast moves
    pub side_ray_angle: f32,
    /// Side rays use this fraction of the forward reach
    pub side_reach_scale: f32,
    /// Damping on each axis component applied by a wall slide
    pub slide_damping: f32,
    /// How far above the new position the ground probe starts
    pub ground_probe_lift: f32,
    /// Longest ground probe
    pub ground_probe_distance: f32,
    /// Height of the body origin above the ground surface
    pub stand_offset: f32,
    /// Horizontal displacement below this is treated as standing still
    pub move_noise: f32,
    /// Radians per mouse count
    pub mouse_sensitivity: f32,
    /// Rate of exponential approach of the view toward the mouse target
    pub look_smoothing: f32,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            walk_speed: 150.0,
            strafe_speed: 75.0,
            sprint_multiplier: 1.5,
            diagonal_damping: 2.0 / 3.0,
            jump_velocity: 70.0,
            gravity: -200.0,
            eye_height: 16.0,
            body_ray_heights: vec![1.0, 3.0, 5.0, 7.0, 9.0],
            high_speed_step: 3.0,
            high_speed_samples: 3,
            safety_margin: 2.5,
            high_speed_safety_margin: 4.0,
            side_ray_angle: 0.3,
            side_reach_scale: 0.8,
            slide_damping: 0.9,
            ground_probe_lift: 1.0,
            ground_probe_distance: 12.0,
            stand_offset: 2.0,
            move_noise: 0.01,
            mouse_sensitivity: 0.003,
            look_smoothing: 50.0,
        }
    }
}

/// Input held during one tick
#[derive(Debug, Clone, Copy, Default)]
pub struct MoveInput {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
    pub sprint: bool,
    pub jump: bool,
    /// Mouse counts since the last tick (x = yaw, y = pitch)
    pub look_delta: Vec2,
}

impl MoveInput {
    pub fn any_direction(&self) -> bool {
        self.forward || self.backward || self.left || self.right
    }
}

/// Result of one controller tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MovementFrame {
    pub position: Vec3,
    /// (pitch, yaw, roll)
    pub rotation: Vec3,
    pub grounded: bool,
    /// Keys held, on the ground and actually displaced
    pub moving: bool,
}

/// Local participant's body
#[derive(Debug, Clone)]
pub struct MovementController {
    config: MovementConfig,
    position: Vec3,
    velocity: Vec3,
    /// Smoothed (pitch, yaw)
    look: Vec2,
    /// Raw (pitch, yaw) accumulated from the mouse
    look_target: Vec2,
    grounded: bool,
    moving: bool,
}

impl MovementController {
    pub fn new(spawn: Vec3, config: MovementConfig) -> Self {
        Self {
            config,
            position: spawn,
            velocity: Vec3::ZERO,
            look: Vec2::ZERO,
            look_target: Vec2::ZERO,
            grounded: false,
            moving: false,
        }
    }

    pub fn config(&self) -> &MovementConfig {
        &self.config
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    pub fn eye_position(&self) -> Vec3 {
        self.position + Vec3::Y * self.config.eye_height
    }

    pub fn is_grounded(&self) -> bool {
        self.grounded
    }

    pub fn is_moving(&self) -> bool {
        self.moving
    }

    /// (pitch, yaw, roll) as sent on the wire
    pub fn rotation(&self) -> Vec3 {
        Vec3::new(self.look.x, self.look.y, 0.0)
    }

    pub fn horizontal_speed(&self) -> f32 {
        Vec2::new(self.velocity.x, self.velocity.z).length()
    }

    /// Unit vector the camera looks along
    pub fn aim_direction(&self) -> Vec3 {
        let (pitch, yaw) = (self.look.x, self.look.y);
        Vec3::new(
            yaw.sin() * pitch.cos(),
            -pitch.sin(),
            yaw.cos() * pitch.cos(),
        )
    }

    /// Horizontal forward and right unit vectors for the current yaw
    pub fn ground_basis(&self) -> (Vec3, Vec3) {
        let yaw = self.look.y;
        (
            Vec3::new(yaw.sin(), 0.0, yaw.cos()),
            Vec3::new(yaw.cos(), 0.0, -yaw.sin()),
        )
    }

    /// Place the body at a new spot with no momentum (spawn, respawn)
    pub fn teleport(&mut self, position: Vec3) {
        self.position = position;
        self.velocity = Vec3::ZERO;
        self.grounded = false;
        self.moving = false;
    }

    /// Point the view without smoothing
    pub fn set_look(&mut self, pitch: f32, yaw: f32) {
        self.look = Vec2::new(pitch, yaw);
        self.look_target = self.look;
    }

    /// Run one tick
    pub fn update<W: CollisionQuery + ?Sized>(
        &mut self,
        input: &MoveInput,
        dt: f32,
        world: &W,
    ) -> MovementFrame {
        let dt = clamp_frame_delta(dt);

        let wish = self.wish_velocity(input);
        self.velocity.x = wish.x;
        self.velocity.z = wish.z;

        if input.jump && self.grounded {
            self.velocity.y = self.config.jump_velocity;
            self.grounded = false;
        }
        self.velocity.y += self.config.gravity * dt;

        let displacement = self.velocity * dt;
        let mut next = self.position;

        let applied = self.resolve_horizontal(Vec3::new(displacement.x, 0.0, displacement.z), world);
        next.x += applied.x;
        next.z += applied.z;
        next.y += displacement.y;

        self.resolve_vertical(&mut next, world);
        self.position = next;

        let travelled = Vec2::new(applied.x, applied.z).length();
        self.moving = input.any_direction() && self.grounded && travelled > self.config.move_noise;

        self.update_look(input.look_delta, dt);

        MovementFrame {
            position: self.position,
            rotation: self.rotation(),
            grounded: self.grounded,
            moving: self.moving,
        }
    }

    /// Horizontal velocity requested by the keys
    fn wish_velocity(&self, input: &MoveInput) -> Vec3 {
        let (forward, right) = self.ground_basis();
        let cfg = &self.config;

        let mut along = Vec3::ZERO;
        if input.forward {
            along += forward;
        }
        if input.backward {
            along -= forward;
        }

        let mut across = Vec3::ZERO;
        if input.right {
            across += right;
        }
        if input.left {
            across -= right;
        }

        let along_active = along.length_squared() > 0.0;
        let across_active = across.length_squared() > 0.0;

        if along_active {
            let speed = if input.sprint {
                cfg.walk_speed * cfg.sprint_multiplier
            } else {
                cfg.walk_speed
            };
            along = along.normalize() * speed;
        }
        if across_active {
            across = across.normalize() * cfg.strafe_speed;
        }

        let mut wish = along + across;
        if along_active && across_active {
            wish *= cfg.diagonal_damping;
        }
        wish
    }

    /// Displacement actually allowed this tick
    fn resolve_horizontal<W: CollisionQuery + ?Sized>(&self, displacement: Vec3, world: &W) -> Vec3 {
        if displacement.length() <= self.config.move_noise {
            return Vec3::ZERO;
        }

        if !self.path_blocked(displacement, true, world) {
            return displacement;
        }

        // Slide: keep whichever axis component is clear
        let mut slide = Vec3::ZERO;
        for component in [
            Vec3::new(displacement.x, 0.0, 0.0),
            Vec3::new(0.0, 0.0, displacement.z),
        ] {
            if component.length() > self.config.move_noise
                && !self.path_blocked(component, false, world)
            {
                slide += component * self.config.slide_damping;
            }
        }
        slide
    }

    /// Would moving by `displacement` bring the body within the clearance
    /// of a wall anywhere along the path?
    fn path_blocked<W: CollisionQuery + ?Sized>(
        &self,
        displacement: Vec3,
        wide: bool,
        world: &W,
    ) -> bool {
        let cfg = &self.config;
        let length = displacement.length();
        let direction = displacement / length;

        let high_speed = length > cfg.high_speed_step;
        let samples = if high_speed { cfg.high_speed_samples.max(1) } else { 1 };
        let margin = if high_speed {
            cfg.high_speed_safety_margin
        } else {
            cfg.safety_margin
        };

        // Each sample covers its share of the path plus the clearance beyond it
        let reach = length / samples as f32 + margin;
        let side_reach = reach * cfg.side_reach_scale;
        let side_dirs = [
            rotate_about_y(direction, -cfg.side_ray_angle),
            rotate_about_y(direction, cfg.side_ray_angle),
        ];

        for sample in 0..samples {
            let base = self.position + displacement * (sample as f32 / samples as f32);

            for height in &cfg.body_ray_heights {
                let origin = base + Vec3::Y * *height;

                if world
                    .raycast(origin, direction, reach, &QueryFilter::MOVEMENT)
                    .is_some()
                {
                    return true;
                }

                if high_speed && wide {
                    let side_hit = side_dirs.iter().any(|dir| {
                        world
                            .raycast(origin, *dir, side_reach, &QueryFilter::MOVEMENT)
                            .is_some()
                    });
                    if side_hit {
                        return true;
                    }
                }
            }
        }

        false
    }

    /// Snap onto ground found below `next`, or stay airborne
    fn resolve_vertical<W: CollisionQuery + ?Sized>(&mut self, next: &mut Vec3, world: &W) {
        let cfg = &self.config;
        let probe_origin = *next + Vec3::Y * cfg.ground_probe_lift;

        let ground = world
            .raycast(
                probe_origin,
                Vec3::NEG_Y,
                cfg.ground_probe_distance,
                &QueryFilter::MOVEMENT,
            )
            .filter(|hit| hit.tag.is_solid());

        match ground {
            Some(hit) => {
                let stand_height = hit.point.y + cfg.stand_offset;
                if next.y <= stand_height {
                    next.y = stand_height;
                    self.velocity.y = self.velocity.y.max(0.0);
                    self.grounded = true;
                } else {
                    self.grounded = false;
                }
            }
            None => self.grounded = false,
        }
    }

    /// Move the smoothed view toward the mouse target
    fn update_look(&mut self, delta: Vec2, dt: f32) {
        self.look_target.y += delta.x * self.config.mouse_sensitivity;
        self.look_target.x += delta.y * self.config.mouse_sensitivity;
        self.look_target.x = self.look_target.x.clamp(-FRAC_PI_2, FRAC_PI_2);

        let factor = (self.config.look_smoothing * dt).min(1.0);
        self.look = self.look.lerp(self.look_target, factor);
    }
}

fn rotate_about_y(v: Vec3, angle: f32) -> Vec3 {
    let (sin, cos) = angle.sin_cos();
    Vec3::new(v.x * cos - v.z * sin, 0.0, v.x * sin + v.z * cos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::collision::{BoxWorld, SurfaceTag};
    use std::f32::consts::FRAC_PI_4;

    const DT: f32 = 1.0 / 60.0;

    fn flat_world() -> BoxWorld {
        let mut world = BoxWorld::new();
        world.add_floor(0.0, 2_000.0);
        world
    }

    fn standing(world: &BoxWorld) -> MovementController {
        let mut pc = MovementController::new(Vec3::new(0.0, 2.0, 0.0), MovementConfig::default());
        pc.update(&MoveInput::default(), DT, world);
        assert!(pc.is_grounded());
        pc
    }

    #[test]
    fn walks_forward_at_walk_speed() {
        let world = flat_world();
        let mut pc = standing(&world);
        let input = MoveInput {
            forward: true,
            ..Default::default()
        };
        for _ in 0..60 {
            pc.update(&input, DT, &world);
        }
        assert!((pc.position().z - 150.0).abs() < 0.5, "z = {}", pc.position().z);
        assert!(pc.position().x.abs() < 1e-3);
        assert!((pc.position().y - 2.0).abs() < 1e-4);
        assert!(pc.is_moving());
    }

    #[test]
    fn strafe_is_slower_and_sprint_only_boosts_forward() {
        let world = flat_world();
        let mut pc = standing(&world);
        let frame = pc.update(
            &MoveInput {
                right: true,
                sprint: true,
                ..Default::default()
            },
            DT,
            &world,
        );
        assert!((frame.position.x - 75.0 * DT).abs() < 1e-3);

        let mut pc = standing(&world);
        let frame = pc.update(
            &MoveInput {
                forward: true,
                sprint: true,
                ..Default::default()
            },
            DT,
            &world,
        );
        assert!((frame.position.z - 225.0 * DT).abs() < 1e-3);
    }

    #[test]
    fn diagonal_is_damped() {
        let world = flat_world();
        let mut pc = standing(&world);
        pc.update(
            &MoveInput {
                forward: true,
                right: true,
                ..Default::default()
            },
            DT,
            &world,
        );
        let speed = pc.horizontal_speed();
        let expected = (150.0f32.powi(2) + 75.0f32.powi(2)).sqrt() * 2.0 / 3.0;
        assert!((speed - expected).abs() < 1e-2);
        assert!(speed < 150.0);
    }

    #[test]
    fn jump_rises_and_lands() {
        let world = flat_world();
        let mut pc = standing(&world);
        pc.update(
            &MoveInput {
                jump: true,
                ..Default::default()
            },
            DT,
            &world,
        );
        assert!(pc.position().y > 2.0);
        assert!(!pc.is_grounded());

        let mut peak = pc.position().y;
        for _ in 0..120 {
            pc.update(&MoveInput::default(), DT, &world);
            peak = peak.max(pc.position().y);
        }
        assert!(peak > 10.0);
        assert!(pc.is_grounded());
        assert!((pc.position().y - 2.0).abs() < 1e-4);
    }

    #[test]
    fn free_falls_without_ground() {
        let world = BoxWorld::new();
        let mut pc = MovementController::new(Vec3::new(0.0, 100.0, 0.0), MovementConfig::default());
        let mut last = pc.position().y;
        for _ in 0..30 {
            let frame = pc.update(&MoveInput::default(), DT, &world);
            assert!(!frame.grounded);
            assert!(frame.position.y < last);
            last = frame.position.y;
        }
    }

    #[test]
    fn fast_move_into_thin_wall_is_stopped() {
        let mut world = flat_world();
        world.add_box(
            Vec3::new(0.0, 10.0, 5.0),
            Vec3::new(50.0, 10.0, 0.1),
            SurfaceTag::Wall,
        );
        let mut pc = standing(&world);
        let input = MoveInput {
            forward: true,
            sprint: true,
            ..Default::default()
        };
        for _ in 0..30 {
            pc.update(&input, 1.0 / 30.0, &world);
        }
        assert!(pc.position().z < 4.9, "tunnelled to z = {}", pc.position().z);
    }

    #[test]
    fn side_rays_catch_walls_beside_a_fast_path() {
        let mut world = flat_world();
        // Pillar just right of the +Z path; the centre ray at x = 0 misses it
        world.add_box(
            Vec3::new(1.9, 10.0, 3.0),
            Vec3::new(1.1, 10.0, 1.0),
            SurfaceTag::Wall,
        );

        // 2.5 units per tick: not fast, only the centre ray is cast
        let mut pc = standing(&world);
        let frame = pc.update(
            &MoveInput {
                forward: true,
                ..Default::default()
            },
            DT,
            &world,
        );
        assert!((frame.position.z - 150.0 * DT).abs() < 1e-4, "z = {}", frame.position.z);

        // 3.75 units per tick: the side ray hits, so only the damped slide remains
        let mut pc = standing(&world);
        let frame = pc.update(
            &MoveInput {
                forward: true,
                sprint: true,
                ..Default::default()
            },
            DT,
            &world,
        );
        assert!(
            (frame.position.z - 225.0 * DT * 0.9).abs() < 1e-4,
            "z = {}",
            frame.position.z
        );
        assert!(frame.position.x.abs() < 1e-4);
    }

    #[test]
    fn blocked_diagonal_slides_along_wall() {
        let mut world = flat_world();
        // Wall face at x = 2, running along Z
        world.add_box(
            Vec3::new(2.5, 10.0, 0.0),
            Vec3::new(0.5, 10.0, 100.0),
            SurfaceTag::Wall,
        );
        let mut pc = standing(&world);
        pc.set_look(0.0, FRAC_PI_4);

        let dt = 1.0 / 30.0;
        let frame = pc.update(
            &MoveInput {
                forward: true,
                sprint: true,
                ..Default::default()
            },
            dt,
            &world,
        );

        let component = 225.0 * dt * FRAC_PI_4.sin();
        assert!(frame.position.x.abs() < 1e-4, "x = {}", frame.position.x);
        assert!((frame.position.z - component * 0.9).abs() < 1e-3, "z = {}", frame.position.z);
    }

    #[test]
    fn idle_is_not_moving() {
        let world = flat_world();
        let mut pc = standing(&world);
        let frame = pc.update(&MoveInput::default(), DT, &world);
        assert!(!frame.moving);
        assert!(frame.grounded);
    }

    #[test]
    fn look_is_smoothed_toward_target() {
        let world = flat_world();
        let mut pc = standing(&world);
        let input = MoveInput {
            look_delta: Vec2::new(100.0, 0.0),
            ..Default::default()
        };
        pc.update(&input, DT, &world);
        let yaw = pc.rotation().y;
        assert!(yaw > 0.0 && yaw < 0.3, "yaw = {yaw}");

        for _ in 0..10 {
            pc.update(&MoveInput::default(), DT, &world);
        }
        assert!((pc.rotation().y - 0.3).abs() < 1e-3);
    }

    #[test]
    fn pitch_is_clamped() {
        let world = flat_world();
        let mut pc = standing(&world);
        let input = MoveInput {
            look_delta: Vec2::new(0.0, 10_000.0),
            ..Default::default()
        };
        for _ in 0..20 {
            pc.update(&input, DT, &world);
        }
        assert!(pc.rotation().x <= FRAC_PI_2 + 1e-6);
        assert!(pc.aim_direction().y < -0.99);
    }

    #[test]
    fn teleport_clears_momentum() {
        let world = flat_world();
        let mut pc = standing(&world);
        pc.update(
            &MoveInput {
                jump: true,
                ..Default::default()
            },
            DT,
            &world,
        );
        pc.teleport(Vec3::new(10.0, 2.0, 10.0));
        assert_eq!(pc.velocity(), Vec3::ZERO);
        assert_eq!(pc.position(), Vec3::new(10.0, 2.0, 10.0));
    }
}
