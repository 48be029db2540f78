//! Hit accounting and display snapshots
//!
//! Everything a stats panel or chart reads after a tick: running totals,
//! hits per second over a trailing window, and the recent cast instances.

use std::collections::VecDeque;

use serde::Serialize;

use super::scheduler::CastInstance;
use crate::consts::{HISTORY_LEN, HIT_RATE_WINDOW};

/// Summary of a retired cast instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InstanceRecord {
    pub instance_id: u32,
    /// Best hit count of any single emission (main cast or a repeat)
    pub hits: u32,
    pub projectiles: u32,
    pub expected_projectiles: u32,
}

impl From<&CastInstance> for InstanceRecord {
    fn from(instance: &CastInstance) -> Self {
        Self {
            instance_id: instance.id,
            hits: instance.max_hits(),
            projectiles: instance.projectile_count,
            expected_projectiles: instance.expected_count,
        }
    }
}

/// Running hit/damage totals
#[derive(Debug, Clone, Default)]
pub struct HitStats {
    pub total_hits: u64,
    pub total_damage: f64,
    /// Hit timestamps inside the trailing window (oldest first)
    recent_hits: VecDeque<f64>,
    history: VecDeque<InstanceRecord>,
}

impl HitStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Count a granted hit
    pub fn record_hit(&mut self, now: f64, damage: f64) {
        self.total_hits += 1;
        self.total_damage += damage;
        self.recent_hits.push_back(now);
    }

    /// Forget hits older than the window
    pub fn trim(&mut self, now: f64) {
        while let Some(&t) = self.recent_hits.front() {
            if t > now - HIT_RATE_WINDOW {
                break;
            }
            self.recent_hits.pop_front();
        }
    }

    /// Hits per second over the trailing window (shorter at startup)
    pub fn hits_per_second(&self, now: f64) -> f64 {
        let span = now.min(HIT_RATE_WINDOW);
        if span <= 0.0 {
            return 0.0;
        }
        let count = self
            .recent_hits
            .iter()
            .filter(|&&t| t > now - HIT_RATE_WINDOW)
            .count();
        count as f64 / span
    }

    /// Append a retired instance, keeping only the most recent
    pub fn push_history(&mut self, record: InstanceRecord) {
        self.history.push_back(record);
        while self.history.len() > HISTORY_LEN {
            self.history.pop_front();
        }
    }

    pub fn history(&self) -> impl Iterator<Item = &InstanceRecord> {
        self.history.iter()
    }
}

/// A projectile as the renderer needs it
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ProjectileView {
    pub x: f64,
    pub y: f64,
    pub radius: f64,
    pub instance_id: u32,
    pub barrage_index: u32,
    pub salvo_group: u32,
    /// Its hit group cannot hit the target right now
    pub on_cooldown: bool,
}

/// Caster or target as the renderer needs it
#[derive(Debug, Clone, Copy, Serialize)]
pub struct EntityView {
    pub x: f64,
    pub y: f64,
    pub radius: f64,
    /// Position in arena-radius units
    pub nx: f64,
    pub ny: f64,
}

/// Consistent post-tick view of the simulation
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub time: f64,
    pub running: bool,
    pub seals: u32,
    pub max_seals: u32,
    pub caster: EntityView,
    pub target: EntityView,
    pub projectiles: Vec<ProjectileView>,
    pub total_hits: u64,
    pub total_damage: f64,
    pub hits_per_second: f64,
    /// Oldest first, at most `HISTORY_LEN`
    pub recent_instance_hits: Vec<u32>,
    pub recent_instance_projectiles: Vec<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: u32) -> InstanceRecord {
        InstanceRecord {
            instance_id: id,
            hits: id,
            projectiles: 4,
            expected_projectiles: 4,
        }
    }

    #[test]
    fn test_history_is_bounded() {
        let mut stats = HitStats::new();
        for id in 0..25 {
            stats.push_history(record(id));
        }
        let ids: Vec<u32> = stats.history().map(|r| r.instance_id).collect();
        assert_eq!(ids.len(), HISTORY_LEN);
        assert_eq!(ids.first(), Some(&15));
        assert_eq!(ids.last(), Some(&24));
    }

    #[test]
    fn test_hits_per_second_window() {
        let mut stats = HitStats::new();
        for i in 0..10 {
            stats.record_hit(i as f64, 100.0);
        }
        // At t=9.5 the window (4.5, 9.5] holds hits at 5..=9
        stats.trim(9.5);
        assert!((stats.hits_per_second(9.5) - 1.0).abs() < 1e-12);
        assert_eq!(stats.total_hits, 10);
        assert!((stats.total_damage - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn test_hits_per_second_startup() {
        let mut stats = HitStats::new();
        assert_eq!(stats.hits_per_second(0.0), 0.0);
        stats.record_hit(0.5, 1.0);
        stats.record_hit(0.9, 1.0);
        assert!((stats.hits_per_second(1.0) - 2.0).abs() < 1e-12);
    }
}
