//! Projectile entity
//!
//! A straight-line mover with a radius, a lifetime and budgets for the
//! on-hit behaviors. Speed only changes direction: walls reflect elastically,
//! and pierce/chain keep the velocity untouched.

use glam::DVec2;
use serde::{Deserialize, Serialize};

/// Duration value meaning "never expires"
pub const INFINITE_DURATION: f64 = -1.0;

/// Cooldown-pool identity shared by every projectile of one emission salvo
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HitGroupTag {
    /// Cast instance (main cast plus all its barrage repeats)
    pub instance_id: u32,
    /// 0 = main cast, n = n-th barrage repeat
    pub barrage_index: u32,
    /// 0 = base emission, n = salvo of the n-th consumed seal
    pub salvo_group: u32,
}

/// Remaining on-hit behavior budgets
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BehaviorBudget {
    pub pierce: u32,
    pub fork: u32,
    pub chain: u32,
    /// Children spawned when the projectile splits
    pub split: u32,
}

/// A projectile entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Projectile {
    pub id: u32,
    pub pos: DVec2,
    pub vel: DVec2,
    pub radius: f64,
    /// Clock time at spawn
    pub spawn_time: f64,
    /// Lifetime in seconds, negative = infinite
    pub duration: f64,
    /// Emission (main cast or a single repeat) this projectile came from
    pub cast_id: u32,
    pub group: HitGroupTag,
    pub budget: BehaviorBudget,
    pub has_split: bool,
    /// Barrage penalty and whirlwind bonus combined
    pub damage_multiplier: f64,
}

impl Projectile {
    /// Seconds alive at `now`
    #[inline]
    pub fn age(&self, now: f64) -> f64 {
        now - self.spawn_time
    }

    /// Expired once age is strictly greater than the duration
    pub fn is_expired(&self, now: f64) -> bool {
        self.duration >= 0.0 && self.age(now) > self.duration
    }

    /// Lifetime left at `now` (infinite stays infinite)
    pub fn remaining_duration(&self, now: f64) -> f64 {
        if self.duration < 0.0 {
            INFINITE_DURATION
        } else {
            (self.duration - self.age(now)).max(0.0)
        }
    }

    #[inline]
    pub fn speed(&self) -> f64 {
        self.vel.length()
    }

    /// Unit heading (zero when stationary)
    #[inline]
    pub fn direction(&self) -> DVec2 {
        self.vel.normalize_or_zero()
    }

    /// Child launched from the current position along `dir` at the parent's
    /// speed. Inherits group, budgets and damage; lifetime is what the parent
    /// had left. The caller assigns the id.
    pub fn spawn_child(&self, dir: DVec2, now: f64) -> Projectile {
        Projectile {
            id: 0,
            pos: self.pos,
            vel: dir * self.speed(),
            radius: self.radius,
            spawn_time: now,
            duration: self.remaining_duration(now),
            cast_id: self.cast_id,
            group: self.group,
            budget: self.budget,
            has_split: self.has_split,
            damage_multiplier: self.damage_multiplier,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn projectile(duration: f64) -> Projectile {
        Projectile {
            id: 1,
            pos: DVec2::new(10.0, 0.0),
            vel: DVec2::new(0.0, 300.0),
            radius: 5.0,
            spawn_time: 2.0,
            duration,
            cast_id: 1,
            group: HitGroupTag {
                instance_id: 1,
                barrage_index: 0,
                salvo_group: 0,
            },
            budget: BehaviorBudget {
                pierce: 1,
                ..Default::default()
            },
            has_split: false,
            damage_multiplier: 1.0,
        }
    }

    #[test]
    fn test_expiry_boundary_is_strict() {
        let p = projectile(1.0);
        assert!(!p.is_expired(3.0));
        assert!(p.is_expired(3.0 + 1e-9));
    }

    #[test]
    fn test_infinite_duration_never_expires() {
        let p = projectile(INFINITE_DURATION);
        assert!(!p.is_expired(1e9));
        assert_eq!(p.remaining_duration(1e9), INFINITE_DURATION);
    }

    #[test]
    fn test_child_inherits_remaining_duration() {
        let p = projectile(1.0);
        let child = p.spawn_child(DVec2::X, 2.25);
        assert!((child.duration - 0.75).abs() < 1e-12);
        assert_eq!(child.spawn_time, 2.25);
        assert!((child.speed() - 300.0).abs() < 1e-9);
        assert_eq!(child.group, p.group);
        assert_eq!(child.budget, p.budget);
    }
}
