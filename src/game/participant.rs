//! Participant identity and authoritative per-connection state

use std::fmt;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::combat::{LifeState, MAX_HEALTH};
use super::weapons::WeaponKind;

/// Longest display name accepted, in characters
pub const MAX_USERNAME_LEN: usize = 20;

/// Characters that are significant to HTML and never reach a name tag
const MARKUP_CHARS: [char; 6] = ['<', '>', '"', '/', '\\', '&'];

/// Connection-scoped participant identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(pub Uuid);

impl ParticipantId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Short suffix used for default display names
    pub fn short(&self) -> String {
        let s = self.0.simple().to_string();
        s[s.len() - 4..].to_string()
    }
}

impl Default for ParticipantId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Authoritative state for one connected participant
#[derive(Debug, Clone)]
pub struct ParticipantState {
    pub id: ParticipantId,
    pub username: String,
    pub position: Vec3,
    /// Euler angles; only yaw (`y`) drives avatar facing
    pub rotation: Vec3,
    pub life: LifeState,
    /// Kill count
    pub score: u32,
    pub current_weapon: WeaponKind,
    pub connected_at: u64,
}

impl ParticipantState {
    pub fn new(id: ParticipantId, spawn: Vec3, now_ms: u64) -> Self {
        Self {
            id,
            username: default_username(&id),
            position: spawn,
            rotation: Vec3::ZERO,
            life: LifeState::Alive { health: MAX_HEALTH },
            score: 0,
            current_weapon: WeaponKind::default(),
            connected_at: now_ms,
        }
    }

    pub fn health(&self) -> u32 {
        self.life.health()
    }

    pub fn is_alive(&self) -> bool {
        self.life.is_alive()
    }
}

/// Fallback display name for a participant that never sent one
pub fn default_username(id: &ParticipantId) -> String {
    format!("Player_{}", id.short())
}

/// Clean a client-supplied display name.
///
/// Markup characters and control characters are stripped, surrounding
/// whitespace trimmed and the result truncated to [`MAX_USERNAME_LEN`]
/// characters. Returns `None` when nothing printable is left.
pub fn sanitize_username(raw: &str) -> Option<String> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_control() && !MARKUP_CHARS.contains(c))
        .collect();
    let trimmed: String = cleaned.trim().chars().take(MAX_USERNAME_LEN).collect();
    let trimmed = trimmed.trim_end().to_string();

    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}
