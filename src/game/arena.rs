//! Arena state and the relay event loop
//!
//! [`ArenaState`] owns every participant and resolves one inbound event at a
//! time, returning the messages to fan out. [`Arena`] wraps it in a tokio
//! task that drains a command queue once per tick, so health mutations are
//! applied strictly in arrival order without any locking.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use glam::Vec3;
use tokio::sync::mpsc::{self, error::TryRecvError};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::util::time::{tick_interval, unix_millis};
use crate::ws::protocol::{ClientMsg, ParticipantSnapshot, ServerMsg, WireVec3};

use super::combat::{
    BulletLedger, CombatSystem, HitOutcome, HitRejection, HitReport, RespawnOutcome,
};
use super::participant::{sanitize_username, ParticipantId, ParticipantState};
use super::spawn::SpawnCatalog;
use super::weapons::WeaponKind;

/// Inbound command queue depth
const COMMAND_QUEUE: usize = 1024;

/// Ticks between bullet ledger sweeps
const LEDGER_SWEEP_TICKS: u64 = 60;

/// Who an outbound message is for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    One(ParticipantId),
    All,
    AllExcept(ParticipantId),
}

impl Recipient {
    pub fn includes(&self, id: ParticipantId) -> bool {
        match self {
            Recipient::One(target) => *target == id,
            Recipient::All => true,
            Recipient::AllExcept(excluded) => *excluded != id,
        }
    }
}

/// Message addressed to one or more connections
#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    pub to: Recipient,
    pub msg: ServerMsg,
}

impl Outbound {
    fn one(id: ParticipantId, msg: ServerMsg) -> Self {
        Self {
            to: Recipient::One(id),
            msg,
        }
    }

    fn all(msg: ServerMsg) -> Self {
        Self {
            to: Recipient::All,
            msg,
        }
    }

    fn all_except(id: ParticipantId, msg: ServerMsg) -> Self {
        Self {
            to: Recipient::AllExcept(id),
            msg,
        }
    }
}

/// Authoritative participant table
#[derive(Debug)]
pub struct ArenaState {
    participants: HashMap<ParticipantId, ParticipantState>,
    spawns: SpawnCatalog,
    bullets: BulletLedger,
}

impl ArenaState {
    pub fn new(spawns: SpawnCatalog) -> Self {
        Self {
            participants: HashMap::new(),
            spawns,
            bullets: BulletLedger::new(),
        }
    }

    pub fn participant(&self, id: &ParticipantId) -> Option<&ParticipantState> {
        self.participants.get(id)
    }

    pub fn contains(&self, id: &ParticipantId) -> bool {
        self.participants.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn spawns(&self) -> &SpawnCatalog {
        &self.spawns
    }

    /// Everyone, oldest connection first
    pub fn roster(&self) -> Vec<ParticipantSnapshot> {
        let mut all: Vec<&ParticipantState> = self.participants.values().collect();
        all.sort_by_key(|p| (p.connected_at, p.id));
        all.into_iter().map(ParticipantSnapshot::from).collect()
    }

    /// Admit a new connection at a random spawn point
    pub fn connect(&mut self, id: ParticipantId, now_ms: u64) -> Vec<Outbound> {
        if self.participants.contains_key(&id) {
            warn!(participant_id = %id, "Participant already connected");
            return Vec::new();
        }

        let spawn = self.spawns.pick();
        let state = ParticipantState::new(id, spawn, now_ms);
        let snapshot = ParticipantSnapshot::from(&state);
        self.participants.insert(id, state);

        info!(
            participant_id = %id,
            participants = self.participants.len(),
            "Participant connected"
        );

        vec![
            Outbound::one(
                id,
                ServerMsg::Join {
                    id,
                    participant: snapshot.clone(),
                    roster: self.roster(),
                },
            ),
            Outbound::all_except(
                id,
                ServerMsg::ParticipantConnected {
                    participant: snapshot,
                },
            ),
        ]
    }

    /// Remove a participant in whatever state it is in
    pub fn disconnect(&mut self, id: ParticipantId) -> Vec<Outbound> {
        if self.participants.remove(&id).is_none() {
            return Vec::new();
        }
        self.bullets.forget_shooter(id);

        info!(
            participant_id = %id,
            participants = self.participants.len(),
            "Participant disconnected"
        );
        vec![Outbound::all(ServerMsg::ParticipantDisconnected { id })]
    }

    /// Resolve one message from a connected participant
    pub fn handle_client(
        &mut self,
        id: ParticipantId,
        msg: ClientMsg,
        now_ms: u64,
    ) -> Vec<Outbound> {
        if !self.participants.contains_key(&id) {
            debug!(participant_id = %id, "Message from unknown participant dropped");
            return Vec::new();
        }

        match msg {
            ClientMsg::MovementUpdate { position, rotation } => {
                self.handle_movement(id, position.into(), rotation.into())
            }
            ClientMsg::ShotFired {
                origin,
                direction,
                weapon,
                bullet_id,
            } => self.handle_shot(id, origin, direction, weapon, bullet_id),
            ClientMsg::HitReport {
                bullet_id,
                target_id,
                damage,
                shooter_id,
            } => self.handle_hit(
                id,
                HitReport {
                    bullet_id,
                    shooter: shooter_id,
                    target: target_id,
                    damage,
                },
                now_ms,
            ),
            ClientMsg::RespawnRequest => self.handle_respawn(id),
            ClientMsg::IdentityUpdate { username } => self.handle_identity(id, &username),
        }
    }

    /// Forget bullet ids older than the ledger window
    pub fn prune(&mut self, now_ms: u64) {
        self.bullets.prune(now_ms);
    }

    fn handle_movement(
        &mut self,
        id: ParticipantId,
        position: Vec3,
        rotation: Vec3,
    ) -> Vec<Outbound> {
        let Some(participant) = self.participants.get_mut(&id) else {
            return Vec::new();
        };
        if !participant.is_alive() {
            return Vec::new();
        }

        participant.position = position;
        participant.rotation = rotation;
        vec![Outbound::all_except(
            id,
            ServerMsg::MovementUpdate {
                id,
                position: position.into(),
                rotation: rotation.into(),
            },
        )]
    }

    fn handle_shot(
        &mut self,
        id: ParticipantId,
        origin: WireVec3,
        direction: WireVec3,
        weapon: Option<WeaponKind>,
        bullet_id: Option<Uuid>,
    ) -> Vec<Outbound> {
        let Some(participant) = self.participants.get_mut(&id) else {
            return Vec::new();
        };
        if !participant.is_alive() {
            debug!(participant_id = %id, "Shot from dead participant dropped");
            return Vec::new();
        }
        if let Some(weapon) = weapon {
            participant.current_weapon = weapon;
        }

        vec![Outbound::all_except(
            id,
            ServerMsg::ShotFired {
                id,
                origin,
                direction,
                weapon,
                bullet_id,
            },
        )]
    }

    fn handle_hit(
        &mut self,
        reporter: ParticipantId,
        report: HitReport,
        now_ms: u64,
    ) -> Vec<Outbound> {
        let outcome = if self.bullets.seen(report.shooter, report.bullet_id, now_ms) {
            Err(HitRejection::DuplicateBullet(report.bullet_id))
        } else {
            CombatSystem::resolve_hit(&mut self.participants, &report, now_ms)
        };

        match outcome {
            Ok(HitOutcome::Damaged {
                target,
                shooter,
                damage,
                health,
            }) => {
                self.bullets.record(report.shooter, report.bullet_id, now_ms);
                debug!(
                    participant_id = %target,
                    shooter_id = %shooter,
                    damage,
                    health,
                    "Hit applied"
                );
                vec![Outbound::one(
                    target,
                    ServerMsg::DamageNotice {
                        damage,
                        health,
                        shooter_id: shooter,
                    },
                )]
            }
            Ok(HitOutcome::Killed {
                killer,
                victim,
                killer_score,
            }) => {
                self.bullets.record(report.shooter, report.bullet_id, now_ms);
                info!(
                    killer_id = %killer,
                    victim_id = %victim,
                    killer_score,
                    "Participant killed"
                );
                vec![Outbound::all(ServerMsg::KillAnnouncement {
                    killer_id: killer,
                    victim_id: victim,
                    killer_score,
                })]
            }
            Err(rejection) => {
                debug!(reporter_id = %reporter, reason = %rejection, "Hit report dropped");
                Vec::new()
            }
        }
    }

    fn handle_respawn(&mut self, id: ParticipantId) -> Vec<Outbound> {
        let Some(participant) = self.participants.get_mut(&id) else {
            return Vec::new();
        };
        if participant.is_alive() {
            return Vec::new();
        }

        let spawn = self.spawns.pick();
        match CombatSystem::respawn(participant, spawn) {
            RespawnOutcome::Respawned { position } => {
                info!(participant_id = %id, ?position, "Participant respawned");
                vec![Outbound::all(ServerMsg::RespawnAnnouncement {
                    id,
                    participant: ParticipantSnapshot::from(&*participant),
                })]
            }
            RespawnOutcome::Ignored => Vec::new(),
        }
    }

    fn handle_identity(&mut self, id: ParticipantId, raw: &str) -> Vec<Outbound> {
        let Some(username) = sanitize_username(raw) else {
            debug!(participant_id = %id, "Empty username ignored");
            return Vec::new();
        };
        let Some(participant) = self.participants.get_mut(&id) else {
            return Vec::new();
        };

        participant.username = username.clone();
        vec![Outbound::all(ServerMsg::IdentityUpdate { id, username })]
    }
}

/// Work queued for the arena task
#[derive(Debug)]
pub enum ArenaCommand {
    Connect {
        id: ParticipantId,
        outbox: mpsc::UnboundedSender<ServerMsg>,
    },
    Client {
        id: ParticipantId,
        msg: ClientMsg,
    },
    Disconnect {
        id: ParticipantId,
    },
}

#[derive(Debug, thiserror::Error)]
#[error("arena task has stopped")]
pub struct ArenaClosed;

/// Cloneable handle to the running arena
#[derive(Clone)]
pub struct ArenaHandle {
    cmd_tx: mpsc::Sender<ArenaCommand>,
    participant_count: Arc<AtomicUsize>,
}

impl ArenaHandle {
    pub fn participant_count(&self) -> usize {
        self.participant_count.load(Ordering::Relaxed)
    }

    pub async fn connect(
        &self,
        id: ParticipantId,
        outbox: mpsc::UnboundedSender<ServerMsg>,
    ) -> Result<(), ArenaClosed> {
        self.send(ArenaCommand::Connect { id, outbox }).await
    }

    pub async fn client(&self, id: ParticipantId, msg: ClientMsg) -> Result<(), ArenaClosed> {
        self.send(ArenaCommand::Client { id, msg }).await
    }

    pub async fn disconnect(&self, id: ParticipantId) -> Result<(), ArenaClosed> {
        self.send(ArenaCommand::Disconnect { id }).await
    }

    async fn send(&self, cmd: ArenaCommand) -> Result<(), ArenaClosed> {
        self.cmd_tx.send(cmd).await.map_err(|_| ArenaClosed)
    }
}

/// The relay task
pub struct Arena {
    state: ArenaState,
    cmd_rx: mpsc::Receiver<ArenaCommand>,
    outboxes: HashMap<ParticipantId, mpsc::UnboundedSender<ServerMsg>>,
    participant_count: Arc<AtomicUsize>,
    tick_rate: u32,
    tick: u64,
}

impl Arena {
    pub fn new(spawns: SpawnCatalog, tick_rate: u32) -> (Self, ArenaHandle) {
        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_QUEUE);
        let participant_count = Arc::new(AtomicUsize::new(0));

        let handle = ArenaHandle {
            cmd_tx,
            participant_count: participant_count.clone(),
        };

        let arena = Self {
            state: ArenaState::new(spawns),
            cmd_rx,
            outboxes: HashMap::new(),
            participant_count,
            tick_rate,
            tick: 0,
        };

        (arena, handle)
    }

    /// Drain commands once per tick until every handle is dropped
    pub async fn run(mut self) {
        info!(tick_rate = self.tick_rate, "Arena started");

        let mut ticker = interval(tick_interval(self.tick_rate));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;

            if !self.drain_commands() {
                break;
            }

            self.tick += 1;
            if self.tick % LEDGER_SWEEP_TICKS == 0 {
                self.state.prune(unix_millis());
            }
        }

        info!(participants = self.state.len(), "Arena stopped");
    }

    /// Returns false once the command channel is closed
    fn drain_commands(&mut self) -> bool {
        loop {
            match self.cmd_rx.try_recv() {
                Ok(cmd) => self.execute(cmd),
                Err(TryRecvError::Empty) => return true,
                Err(TryRecvError::Disconnected) => return false,
            }
        }
    }

    fn execute(&mut self, cmd: ArenaCommand) {
        let now = unix_millis();
        let outbound = match cmd {
            ArenaCommand::Connect { id, outbox } => {
                self.outboxes.insert(id, outbox);
                self.state.connect(id, now)
            }
            ArenaCommand::Client { id, msg } => self.state.handle_client(id, msg, now),
            ArenaCommand::Disconnect { id } => {
                self.outboxes.remove(&id);
                self.state.disconnect(id)
            }
        };

        self.participant_count
            .store(self.state.len(), Ordering::Relaxed);
        self.dispatch(outbound);
    }

    /// Fan messages out; a closed outbox means the connection is gone
    fn dispatch(&mut self, outbound: Vec<Outbound>) {
        let mut closed = Vec::new();

        for Outbound { to, msg } in outbound {
            for (id, outbox) in &self.outboxes {
                if to.includes(*id) && outbox.send(msg.clone()).is_err() && !closed.contains(id) {
                    closed.push(*id);
                }
            }
        }

        for id in closed {
            debug!(participant_id = %id, "Outbox closed, disconnecting");
            self.execute(ArenaCommand::Disconnect { id });
        }
    }
}
