//! Combat resolution - health, death and respawn transitions
//!
//! The server is the only place health changes. Each participant is either
//! [`LifeState::Alive`] with a health value in `1..=MAX_HEALTH` or
//! [`LifeState::Dead`]; a hit report moves a participant down the health
//! range or into `Dead`, a respawn request moves it back to full health.

use std::collections::HashMap;

use glam::Vec3;
use uuid::Uuid;

use super::participant::{ParticipantId, ParticipantState};

/// Health of a freshly spawned participant
pub const MAX_HEALTH: u32 = 100;

/// How long a resolved bullet id is remembered (milliseconds)
pub const BULLET_MEMORY_MS: u64 = 10_000;

/// Explicit alive/dead state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifeState {
    Alive { health: u32 },
    Dead { since_ms: u64 },
}

impl LifeState {
    pub fn health(&self) -> u32 {
        match self {
            LifeState::Alive { health } => *health,
            LifeState::Dead { .. } => 0,
        }
    }

    pub fn is_alive(&self) -> bool {
        matches!(self, LifeState::Alive { .. })
    }
}

/// A client's claim that a projectile struck a participant
#[derive(Debug, Clone)]
pub struct HitReport {
    pub bullet_id: Uuid,
    pub shooter: ParticipantId,
    pub target: ParticipantId,
    pub damage: u32,
}

/// Accepted hit report
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HitOutcome {
    /// Target survived; only the victim is told
    Damaged {
        target: ParticipantId,
        shooter: ParticipantId,
        damage: u32,
        health: u32,
    },
    /// Target died; everyone is told
    Killed {
        killer: ParticipantId,
        victim: ParticipantId,
        killer_score: u32,
    },
}

/// Reasons a hit report is dropped. Never sent to clients.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HitRejection {
    #[error("shooter {0} is not connected")]
    UnknownShooter(ParticipantId),

    #[error("target {0} is not connected")]
    UnknownTarget(ParticipantId),

    #[error("participant {0} reported hitting themselves")]
    SelfHit(ParticipantId),

    #[error("target {0} is already dead")]
    TargetDead(ParticipantId),

    #[error("bullet {0} was already resolved")]
    DuplicateBullet(Uuid),

    #[error("hit carried no damage")]
    NoDamage,
}

/// Result of a respawn request
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RespawnOutcome {
    Respawned { position: Vec3 },
    /// Participant was alive; nothing happens
    Ignored,
}

/// Combat system for resolving hits and respawns
pub struct CombatSystem;

impl CombatSystem {
    /// Apply damage to a life state.
    /// Health never drops below zero; reaching zero is death.
    pub fn apply_damage(state: LifeState, damage: u32, now_ms: u64) -> LifeState {
        match state {
            LifeState::Alive { health } => {
                let remaining = health.saturating_sub(damage);
                if remaining == 0 {
                    LifeState::Dead { since_ms: now_ms }
                } else {
                    LifeState::Alive { health: remaining }
                }
            }
            dead @ LifeState::Dead { .. } => dead,
        }
    }

    /// Validate and apply a hit report against the participant table
    pub fn resolve_hit(
        participants: &mut HashMap<ParticipantId, ParticipantState>,
        report: &HitReport,
        now_ms: u64,
    ) -> Result<HitOutcome, HitRejection> {
        if !participants.contains_key(&report.shooter) {
            return Err(HitRejection::UnknownShooter(report.shooter));
        }
        if report.shooter == report.target {
            return Err(HitRejection::SelfHit(report.target));
        }
        if report.damage == 0 {
            return Err(HitRejection::NoDamage);
        }

        let target = participants
            .get_mut(&report.target)
            .ok_or(HitRejection::UnknownTarget(report.target))?;
        if !target.is_alive() {
            return Err(HitRejection::TargetDead(report.target));
        }

        target.life = Self::apply_damage(target.life, report.damage, now_ms);

        if let LifeState::Alive { health } = target.life {
            return Ok(HitOutcome::Damaged {
                target: report.target,
                shooter: report.shooter,
                damage: report.damage,
                health,
            });
        }

        let killer_score = match participants.get_mut(&report.shooter) {
            Some(shooter) => {
                shooter.score += 1;
                shooter.score
            }
            None => 0,
        };

        Ok(HitOutcome::Killed {
            killer: report.shooter,
            victim: report.target,
            killer_score,
        })
    }

    /// Bring a dead participant back at `spawn` with full health
    pub fn respawn(participant: &mut ParticipantState, spawn: Vec3) -> RespawnOutcome {
        if participant.is_alive() {
            return RespawnOutcome::Ignored;
        }

        participant.position = spawn;
        participant.rotation = Vec3::ZERO;
        participant.life = LifeState::Alive { health: MAX_HEALTH };
        RespawnOutcome::Respawned { position: spawn }
    }
}

/// Remembers recently resolved bullet ids per shooter so a repeated
/// report for the same projectile is applied once
#[derive(Debug, Default)]
pub struct BulletLedger {
    resolved: HashMap<(ParticipantId, Uuid), u64>,
}

impl BulletLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if this bullet was already resolved and is still remembered
    pub fn seen(&self, shooter: ParticipantId, bullet_id: Uuid, now_ms: u64) -> bool {
        self.resolved
            .get(&(shooter, bullet_id))
            .is_some_and(|expires| *expires > now_ms)
    }

    pub fn record(&mut self, shooter: ParticipantId, bullet_id: Uuid, now_ms: u64) {
        self.resolved
            .insert((shooter, bullet_id), now_ms + BULLET_MEMORY_MS);
    }

    /// Drop expired entries
    pub fn prune(&mut self, now_ms: u64) {
        self.resolved.retain(|_, expires| *expires > now_ms);
    }

    /// Forget everything fired by a departed participant
    pub fn forget_shooter(&mut self, shooter: ParticipantId) {
        self.resolved.retain(|(owner, _), _| *owner != shooter);
    }

    pub fn len(&self) -> usize {
        self.resolved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolved.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn table() -> (HashMap<ParticipantId, ParticipantState>, ParticipantId, ParticipantId) {
        let a = ParticipantId::new();
        let b = ParticipantId::new();
        let mut players = HashMap::new();
        players.insert(a, ParticipantState::new(a, Vec3::ZERO, 0));
        players.insert(b, ParticipantState::new(b, Vec3::ZERO, 0));
        (players, a, b)
    }

    fn hit(shooter: ParticipantId, target: ParticipantId, damage: u32) -> HitReport {
        HitReport {
            bullet_id: Uuid::new_v4(),
            shooter,
            target,
            damage,
        }
    }

    #[test]
    fn single_hit_reduces_health() {
        let (mut players, a, b) = table();
        let outcome = CombatSystem::resolve_hit(&mut players, &hit(a, b, 34), 10).unwrap();
        assert_eq!(
            outcome,
            HitOutcome::Damaged {
                target: b,
                shooter: a,
                damage: 34,
                health: 66
            }
        );
        assert!(players[&b].is_alive());
    }

    #[test]
    fn third_hit_kills_and_clamps() {
        let (mut players, a, b) = table();
        CombatSystem::resolve_hit(&mut players, &hit(a, b, 34), 1).unwrap();
        CombatSystem::resolve_hit(&mut players, &hit(a, b, 34), 2).unwrap();
        let outcome = CombatSystem::resolve_hit(&mut players, &hit(a, b, 34), 3).unwrap();

        assert_eq!(
            outcome,
            HitOutcome::Killed {
                killer: a,
                victim: b,
                killer_score: 1
            }
        );
        assert_eq!(players[&b].health(), 0);
        assert_eq!(players[&b].life, LifeState::Dead { since_ms: 3 });
        assert_eq!(players[&a].score, 1);

        let again = CombatSystem::resolve_hit(&mut players, &hit(a, b, 34), 4);
        assert_eq!(again, Err(HitRejection::TargetDead(b)));
        assert_eq!(players[&a].score, 1);
    }

    #[test]
    fn self_hits_are_rejected() {
        let (mut players, a, _) = table();
        let result = CombatSystem::resolve_hit(&mut players, &hit(a, a, 34), 0);
        assert_eq!(result, Err(HitRejection::SelfHit(a)));
        assert_eq!(players[&a].health(), MAX_HEALTH);
    }

    #[test]
    fn unknown_ids_are_rejected() {
        let (mut players, a, b) = table();
        let ghost = ParticipantId::new();
        assert_eq!(
            CombatSystem::resolve_hit(&mut players, &hit(ghost, b, 34), 0),
            Err(HitRejection::UnknownShooter(ghost))
        );
        assert_eq!(
            CombatSystem::resolve_hit(&mut players, &hit(a, ghost, 34), 0),
            Err(HitRejection::UnknownTarget(ghost))
        );
        assert_eq!(players[&b].health(), MAX_HEALTH);
    }

    #[test]
    fn respawn_restores_full_health_only_when_dead() {
        let (mut players, a, b) = table();
        let alive = players.get_mut(&b).unwrap();
        assert_eq!(
            CombatSystem::respawn(alive, Vec3::ONE),
            RespawnOutcome::Ignored
        );
        assert_eq!(alive.position, Vec3::ZERO);

        CombatSystem::resolve_hit(&mut players, &hit(a, b, 500), 5).unwrap();
        let dead = players.get_mut(&b).unwrap();
        let spawn = Vec3::new(421.0, 40.0, -599.0);
        assert_eq!(
            CombatSystem::respawn(dead, spawn),
            RespawnOutcome::Respawned { position: spawn }
        );
        assert_eq!(dead.health(), MAX_HEALTH);
        assert!(dead.is_alive());
        assert_eq!(dead.position, spawn);
    }

    #[test]
    fn health_stays_in_range_for_random_sequences() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let (mut players, a, b) = table();

        for step in 0..500u64 {
            let (shooter, target) = if rng.gen_bool(0.5) { (a, b) } else { (b, a) };
            let shooter = if rng.gen_bool(0.1) { target } else { shooter };
            let damage = rng.gen_range(0..150);
            let _ = CombatSystem::resolve_hit(&mut players, &hit(shooter, target, damage), step);

            if rng.gen_bool(0.2) {
                let who = if rng.gen_bool(0.5) { a } else { b };
                CombatSystem::respawn(players.get_mut(&who).unwrap(), Vec3::ZERO);
            }

            for p in players.values() {
                assert!(p.health() <= MAX_HEALTH);
                assert_eq!(p.is_alive(), p.health() > 0);
            }
        }
    }

    #[test]
    fn ledger_remembers_then_forgets() {
        let mut ledger = BulletLedger::new();
        let shooter = ParticipantId::new();
        let bullet = Uuid::new_v4();

        assert!(!ledger.seen(shooter, bullet, 0));
        ledger.record(shooter, bullet, 0);
        assert!(ledger.seen(shooter, bullet, BULLET_MEMORY_MS - 1));
        assert!(!ledger.seen(shooter, bullet, BULLET_MEMORY_MS));

        ledger.prune(BULLET_MEMORY_MS);
        assert!(ledger.is_empty());
    }
}
