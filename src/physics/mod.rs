//! Movement, collision and ballistics shared by client and tooling

pub mod ballistics;
pub mod collision;
pub mod movement;

pub use collision::{BoxWorld, CollisionQuery, QueryFilter, RayHit, SurfaceTag};
pub use movement::{MoveInput, MovementConfig, MovementController, MovementFrame};
