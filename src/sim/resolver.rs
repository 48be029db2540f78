//! On-hit behavior resolution
//!
//! A granted target hit triggers exactly one behavior, first applicable in
//! priority order: split, pierce, fork, chain, absorb. Denied hits never get
//! here. Terrain contacts never trigger behaviors.

use std::f64::consts::TAU;

use glam::DVec2;
use rand::Rng;

use super::geometry::GEOM_EPSILON;
use super::projectile::Projectile;
use crate::consts::{FORK_ANGLE, PIERCE_NUDGE};
use crate::heading;

/// The single behavior a granted hit triggered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitBehavior {
    /// Replaced by evenly spread children
    Split,
    /// Passed through, pierce budget spent
    Pierce,
    /// Replaced by two (or three) deflected children
    Fork,
    /// No alternate target exists, so this behaves like pierce
    Chain,
    /// Consumed by the target
    Absorb,
}

impl HitBehavior {
    /// Whether the hitting projectile stays alive
    pub fn keeps_projectile(self) -> bool {
        matches!(self, HitBehavior::Pierce | HitBehavior::Chain)
    }
}

/// Outcome of a granted hit
#[derive(Debug, Clone)]
pub struct HitResolution {
    pub behavior: HitBehavior,
    /// Projectiles that replace the parent (split/fork); ids unassigned
    pub children: Vec<Projectile>,
}

/// The circle a projectile just hit
#[derive(Debug, Clone, Copy)]
pub struct HitTarget {
    pub pos: DVec2,
    pub radius: f64,
}

/// Apply the on-hit behavior for a granted hit at `now`.
///
/// `fork_chance` is a percentage. Mutates the projectile when it survives.
pub fn resolve_target_hit<R: Rng>(
    projectile: &mut Projectile,
    target: HitTarget,
    fork_chance: f64,
    now: f64,
    rng: &mut R,
) -> HitResolution {
    let budget = projectile.budget;

    if !projectile.has_split && budget.split > 0 {
        let count = budget.split.max(1);
        let base = heading(projectile.vel);
        let children = (0..count)
            .map(|i| {
                let angle = base + i as f64 * TAU / count as f64;
                let mut child = projectile.spawn_child(DVec2::from_angle(angle), now);
                child.has_split = true;
                child
            })
            .collect();
        return HitResolution {
            behavior: HitBehavior::Split,
            children,
        };
    }

    if budget.pierce > 0 {
        projectile.budget.pierce -= 1;
        nudge_outside(projectile, target);
        return HitResolution {
            behavior: HitBehavior::Pierce,
            children: Vec::new(),
        };
    }

    if budget.fork > 0 {
        let dir = projectile.direction();
        let mut dirs = vec![
            DVec2::from_angle(FORK_ANGLE).rotate(dir),
            DVec2::from_angle(-FORK_ANGLE).rotate(dir),
        ];
        if fork_chance > 0.0 && rng.random_bool((fork_chance / 100.0).clamp(0.0, 1.0)) {
            dirs.push(dir);
        }
        let children = dirs
            .into_iter()
            .map(|d| {
                let mut child = projectile.spawn_child(d, now);
                child.budget.fork = budget.fork - 1;
                child
            })
            .collect();
        return HitResolution {
            behavior: HitBehavior::Fork,
            children,
        };
    }

    if budget.chain > 0 {
        projectile.budget.chain -= 1;
        nudge_outside(projectile, target);
        return HitResolution {
            behavior: HitBehavior::Chain,
            children: Vec::new(),
        };
    }

    HitResolution {
        behavior: HitBehavior::Absorb,
        children: Vec::new(),
    }
}

/// Place the projectile just outside the target rim along the hit normal
fn nudge_outside(projectile: &mut Projectile, target: HitTarget) {
    let offset = projectile.pos - target.pos;
    let normal = if offset.length_squared() > GEOM_EPSILON {
        offset.normalize()
    } else {
        // Dead center: leave along the direction of travel
        let dir = projectile.direction();
        if dir == DVec2::ZERO { DVec2::X } else { dir }
    };
    projectile.pos = target.pos + normal * (target.radius + projectile.radius + PIERCE_NUDGE);
}
