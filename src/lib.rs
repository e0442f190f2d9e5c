//! Arena shooter core
//!
//! Real-time combat and movement simulation for a browser first-person
//! shooter, plus the authoritative relay server that keeps participants in
//! sync:
//! - `physics`: movement controller, collision queries and ballistics
//! - `client`: projectile engine, remote avatars and the outbound link
//! - `game`: participant table, combat resolution and the arena task
//! - `ws` / `http`: wire protocol and the axum server surface

pub mod app;
pub mod client;
pub mod config;
pub mod game;
pub mod http;
pub mod physics;
pub mod util;
pub mod ws;
