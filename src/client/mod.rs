//! Client-side simulation: projectiles, remote avatars and the outbound link

pub mod link;
pub mod projectiles;
pub mod remote;
pub mod world;

pub use link::{ClientLink, MovementThrottle};
pub use projectiles::{FireControl, ProjectileEngine, ProjectileEvent};
pub use remote::RemoteAvatar;
pub use world::{ClientFrame, ClientWorld, FrameInput, WorldEvent};
