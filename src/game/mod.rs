//! Authoritative arena: participants, combat resolution and the relay loop

pub mod arena;
pub mod combat;
pub mod participant;
pub mod spawn;
pub mod weapons;

pub use arena::{Arena, ArenaCommand, ArenaHandle, ArenaState, Outbound, Recipient};
pub use combat::{CombatSystem, HitReport, LifeState};
pub use participant::{ParticipantId, ParticipantState};
