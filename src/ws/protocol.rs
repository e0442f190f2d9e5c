//! WebSocket protocol message definitions
//! These are the wire types for client-server communication.
//! Frames are JSON text; every message carries a `type` tag.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::participant::{ParticipantId, ParticipantState};
use crate::game::weapons::WeaponKind;

/// Plain `{x, y, z}` coordinate in world units
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WireVec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl WireVec3 {
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl From<Vec3> for WireVec3 {
    fn from(v: Vec3) -> Self {
        Self {
            x: v.x,
            y: v.y,
            z: v.z,
        }
    }
}

impl From<WireVec3> for Vec3 {
    fn from(v: WireVec3) -> Self {
        Vec3::new(v.x, v.y, v.z)
    }
}

/// Messages sent from client to server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMsg {
    /// Latest local transform
    MovementUpdate {
        position: WireVec3,
        rotation: WireVec3,
    },

    /// A local weapon discharged
    #[serde(rename_all = "camelCase")]
    ShotFired {
        origin: WireVec3,
        /// Unit aim vector after spread
        direction: WireVec3,
        /// Weapon used, so observers simulate the same ballistics
        #[serde(default, skip_serializing_if = "Option::is_none")]
        weapon: Option<WeaponKind>,
        /// Shooter-assigned projectile id, shared by every observer's copy
        #[serde(default, skip_serializing_if = "Option::is_none")]
        bullet_id: Option<Uuid>,
    },

    /// A projectile simulated on this client struck a participant
    #[serde(rename_all = "camelCase")]
    HitReport {
        bullet_id: Uuid,
        target_id: ParticipantId,
        damage: u32,
        shooter_id: ParticipantId,
    },

    /// Dead participant asks to rejoin play
    RespawnRequest,

    /// Display name change
    IdentityUpdate { username: String },
}

/// Messages sent from server to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMsg {
    /// Sent once to a new connection
    Join {
        id: ParticipantId,
        participant: ParticipantSnapshot,
        /// Everyone connected, including the new participant
        roster: Vec<ParticipantSnapshot>,
    },

    /// Someone else connected
    ParticipantConnected { participant: ParticipantSnapshot },

    /// Someone left
    ParticipantDisconnected { id: ParticipantId },

    /// Relayed movement of another participant
    MovementUpdate {
        id: ParticipantId,
        position: WireVec3,
        rotation: WireVec3,
    },

    /// Relayed shot of another participant
    #[serde(rename_all = "camelCase")]
    ShotFired {
        id: ParticipantId,
        origin: WireVec3,
        direction: WireVec3,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        weapon: Option<WeaponKind>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        bullet_id: Option<Uuid>,
    },

    /// Unicast to a victim that survived a hit
    #[serde(rename_all = "camelCase")]
    DamageNotice {
        damage: u32,
        health: u32,
        shooter_id: ParticipantId,
    },

    /// A participant died
    #[serde(rename_all = "camelCase")]
    KillAnnouncement {
        killer_id: ParticipantId,
        victim_id: ParticipantId,
        killer_score: u32,
    },

    /// A participant came back
    RespawnAnnouncement {
        id: ParticipantId,
        participant: ParticipantSnapshot,
    },

    /// A participant renamed themselves
    IdentityUpdate {
        id: ParticipantId,
        username: String,
    },
}

/// Participant state as seen on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantSnapshot {
    pub id: ParticipantId,
    pub username: String,
    pub position: WireVec3,
    pub rotation: WireVec3,
    pub health: u32,
    pub alive: bool,
    pub score: u32,
    pub current_weapon: WeaponKind,
}

impl From<&ParticipantState> for ParticipantSnapshot {
    fn from(p: &ParticipantState) -> Self {
        Self {
            id: p.id,
            username: p.username.clone(),
            position: p.position.into(),
            rotation: p.rotation.into(),
            health: p.health(),
            alive: p.is_alive(),
            score: p.score,
            current_weapon: p.current_weapon,
        }
    }
}

/// Inbound frame could not be used
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("frame carries a non-finite coordinate")]
    NonFinite,
}

impl ClientMsg {
    /// Parse and validate a text frame
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        let msg: ClientMsg = serde_json::from_str(text)?;
        let finite = match &msg {
            ClientMsg::MovementUpdate { position, rotation } => {
                position.is_finite() && rotation.is_finite()
            }
            ClientMsg::ShotFired {
                origin, direction, ..
            } => origin.is_finite() && direction.is_finite(),
            _ => true,
        };
        if !finite {
            return Err(ProtocolError::NonFinite);
        }
        Ok(msg)
    }

    pub fn encode(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Shots and hit reports, rate limited apart from movement
    pub fn is_combat_event(&self) -> bool {
        matches!(self, ClientMsg::ShotFired { .. } | ClientMsg::HitReport { .. })
    }
}

impl ServerMsg {
    pub fn encode(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn hit_report_uses_camel_case_fields() {
        let shooter = ParticipantId::new();
        let target = ParticipantId::new();
        let bullet = Uuid::new_v4();
        let text = json!({
            "type": "hitReport",
            "bulletId": bullet,
            "targetId": target,
            "damage": 34,
            "shooterId": shooter,
        })
        .to_string();

        let msg = ClientMsg::decode(&text).unwrap();
        assert_eq!(
            msg,
            ClientMsg::HitReport {
                bullet_id: bullet,
                target_id: target,
                damage: 34,
                shooter_id: shooter,
            }
        );
    }

    #[test]
    fn only_shots_and_hits_are_combat_events() {
        let hit = ClientMsg::HitReport {
            bullet_id: Uuid::new_v4(),
            target_id: ParticipantId::new(),
            damage: 34,
            shooter_id: ParticipantId::new(),
        };
        let movement = ClientMsg::MovementUpdate {
            position: WireVec3::default(),
            rotation: WireVec3::default(),
        };
        assert!(hit.is_combat_event());
        assert!(!movement.is_combat_event());
        assert!(!ClientMsg::RespawnRequest.is_combat_event());
    }

    #[test]
    fn respawn_request_has_no_payload() {
        let msg = ClientMsg::decode(r#"{"type":"respawnRequest"}"#).unwrap();
        assert_eq!(msg, ClientMsg::RespawnRequest);
    }

    #[test]
    fn shot_without_weapon_still_parses() {
        let msg = ClientMsg::decode(
            r#"{"type":"shotFired","origin":{"x":1,"y":2,"z":3},"direction":{"x":0,"y":0,"z":1}}"#,
        )
        .unwrap();
        match msg {
            ClientMsg::ShotFired {
                weapon,
                origin,
                bullet_id,
                ..
            } => {
                assert!(weapon.is_none());
                assert!(bullet_id.is_none());
                assert_eq!(Vec3::from(origin), Vec3::new(1.0, 2.0, 3.0));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn malformed_frames_are_errors_not_panics() {
        assert!(ClientMsg::decode("not json").is_err());
        assert!(ClientMsg::decode(r#"{"type":"hitReport","damage":-5}"#).is_err());
        assert!(ClientMsg::decode(r#"{"type":"teleport"}"#).is_err());
        assert!(matches!(
            ClientMsg::decode(
                r#"{"type":"movementUpdate","position":{"x":1e39,"y":0,"z":0},"rotation":{"x":0,"y":0,"z":0}}"#
            ),
            Err(ProtocolError::NonFinite)
        ));
    }

    #[test]
    fn kill_announcement_shape() {
        let killer = ParticipantId::new();
        let victim = ParticipantId::new();
        let text = ServerMsg::KillAnnouncement {
            killer_id: killer,
            victim_id: victim,
            killer_score: 3,
        }
        .encode()
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["type"], "killAnnouncement");
        assert_eq!(value["killerScore"], 3);
        assert_eq!(value["victimId"], json!(victim));
    }

    #[test]
    fn relayed_shot_carries_bullet_id() {
        let bullet = Uuid::new_v4();
        let text = ServerMsg::ShotFired {
            id: ParticipantId::new(),
            origin: WireVec3::default(),
            direction: Vec3::Z.into(),
            weapon: Some(WeaponKind::L118a1),
            bullet_id: Some(bullet),
        }
        .encode()
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["bulletId"], json!(bullet));
        assert_eq!(value["weapon"], "l118a1");
    }
}
