//! Sender side of the protocol
//!
//! Movement is throttled to one message per [`MOVEMENT_SEND_INTERVAL`]. An
//! update offered too early replaces the single pending update, which is
//! flushed on the next permitted tick. Shots, hits, respawn requests and
//! identity changes go out immediately.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use glam::Vec3;
use uuid::Uuid;

use crate::game::combat::HitReport;
use crate::game::weapons::WeaponKind;
use crate::util::time::MOVEMENT_SEND_INTERVAL;
use crate::ws::protocol::ClientMsg;

/// Rate limiter with last-value coalescing for movement updates
#[derive(Debug, Clone)]
pub struct MovementThrottle {
    interval: Duration,
    last_sent: Option<Instant>,
    pending: Option<ClientMsg>,
}

impl MovementThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_sent: None,
            pending: None,
        }
    }

    fn ready(&self, now: Instant) -> bool {
        self.last_sent
            .map_or(true, |sent| now.saturating_duration_since(sent) >= self.interval)
    }

    /// Offer the latest transform. Returns the message to send now, if any.
    pub fn offer(&mut self, now: Instant, position: Vec3, rotation: Vec3) -> Option<ClientMsg> {
        let msg = ClientMsg::MovementUpdate {
            position: position.into(),
            rotation: rotation.into(),
        };

        if self.ready(now) {
            self.pending = None;
            self.last_sent = Some(now);
            Some(msg)
        } else {
            self.pending = Some(msg);
            None
        }
    }

    /// Release the buffered update once the interval has elapsed
    pub fn flush(&mut self, now: Instant) -> Option<ClientMsg> {
        if self.pending.is_none() || !self.ready(now) {
            return None;
        }
        self.last_sent = Some(now);
        self.pending.take()
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }
}

impl Default for MovementThrottle {
    fn default() -> Self {
        Self::new(MOVEMENT_SEND_INTERVAL)
    }
}

/// Outbound message queue for one client connection
#[derive(Debug, Default)]
pub struct ClientLink {
    connected: bool,
    movement: MovementThrottle,
    outbox: VecDeque<ClientMsg>,
}

impl ClientLink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Transport came up or went down. Nothing queued while down is kept.
    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
        if !connected {
            self.outbox.clear();
            self.movement = MovementThrottle::new(self.movement.interval);
        }
    }

    fn push(&mut self, msg: ClientMsg) {
        if self.connected {
            self.outbox.push_back(msg);
        }
    }

    pub fn send_movement(&mut self, now: Instant, position: Vec3, rotation: Vec3) {
        if !self.connected {
            return;
        }
        if let Some(msg) = self.movement.offer(now, position, rotation) {
            self.outbox.push_back(msg);
        }
    }

    pub fn send_shot(
        &mut self,
        origin: Vec3,
        direction: Vec3,
        weapon: WeaponKind,
        bullet_id: Uuid,
    ) {
        self.push(ClientMsg::ShotFired {
            origin: origin.into(),
            direction: direction.into(),
            weapon: Some(weapon),
            bullet_id: Some(bullet_id),
        });
    }

    pub fn send_hit(&mut self, report: &HitReport) {
        self.push(ClientMsg::HitReport {
            bullet_id: report.bullet_id,
            target_id: report.target,
            damage: report.damage,
            shooter_id: report.shooter,
        });
    }

    pub fn request_respawn(&mut self) {
        self.push(ClientMsg::RespawnRequest);
    }

    pub fn set_username(&mut self, username: &str) {
        self.push(ClientMsg::IdentityUpdate {
            username: username.to_string(),
        });
    }

    /// Flush due throttled traffic and hand over everything queued
    pub fn drain(&mut self, now: Instant) -> Vec<ClientMsg> {
        if self.connected {
            if let Some(msg) = self.movement.flush(now) {
                self.outbox.push_back(msg);
            }
        }
        self.outbox.drain(..).collect()
    }
}
