//! Fixed timestep simulation tick
//!
//! Advances the sandbox deterministically: casts, projectile motion with
//! substepped target and wall sweeps, expiry, and instance retirement.

use glam::DVec2;

use super::arena::{Arena, Segment};
use super::geometry::{reflect_velocity, swept_circle_vs_capsule_toi, swept_circle_vs_circle_toi};
use super::projectile::Projectile;
use super::resolver::{HitTarget, resolve_target_hit};
use super::state::SimState;
use crate::consts::*;

/// Advance the simulation by one fixed timestep
pub fn tick(state: &mut SimState, dt: f64) {
    let now = state.time;

    if state.running {
        let emissions = state
            .scheduler
            .advance(&state.config, now, dt, &mut state.rng);
        for emission in &emissions {
            state.spawn_emission(emission, now);
        }
    }

    let projectiles = std::mem::take(&mut state.projectiles);
    let mut survivors = Vec::with_capacity(projectiles.len());
    let mut spawned = Vec::new();
    for projectile in projectiles {
        if let Some(p) = step_projectile(state, projectile, now, dt, &mut spawned) {
            survivors.push(p);
        }
    }
    // Children start moving next tick
    survivors.extend(spawned);
    state.projectiles = survivors;

    state.time += dt;
    state.time_ticks += 1;

    let now = state.time;
    state.projectiles.retain(|p| !p.is_expired(now));
    state.retire_instances();
    state.stats.trim(now);
}

/// Substeps needed so no substep travels further than `MAX_SUBSTEP_TRAVEL`
pub fn substep_count(speed: f64, dt: f64) -> usize {
    let travel = speed * dt;
    if !travel.is_finite() || travel <= MAX_SUBSTEP_TRAVEL {
        return 1;
    }
    ((travel / MAX_SUBSTEP_TRAVEL).ceil() as usize).clamp(1, MAX_PROJECTILE_SUBSTEPS)
}

/// Move one projectile through a tick. Returns it if it survives; split and
/// fork children are pushed to `spawned` with fresh ids.
fn step_projectile(
    state: &mut SimState,
    mut p: Projectile,
    now: f64,
    dt: f64,
    spawned: &mut Vec<Projectile>,
) -> Option<Projectile> {
    let steps = substep_count(p.speed(), dt);
    let h = dt / steps as f64;
    let target = HitTarget {
        pos: state.target.pos,
        radius: state.target.radius,
    };

    for i in 0..steps {
        let step_start = now + i as f64 * h;
        let mut remaining = 1.0;

        let d = p.vel * h;
        if let Some(t) =
            swept_circle_vs_circle_toi(p.pos, d, target.pos, target.radius + p.radius)
        {
            let hit_time = step_start + t * h;
            let key = state.hit_key(&p);
            if state.ledger.try_register(key, hit_time) {
                p.pos += d * t;
                state.record_hit(&p, hit_time);
                let fork_chance = state.config.fork_chance;
                let resolution =
                    resolve_target_hit(&mut p, target, fork_chance, hit_time, &mut state.rng);
                if !resolution.behavior.keeps_projectile() {
                    for mut child in resolution.children {
                        child.id = state.next_entity_id();
                        spawned.push(child);
                    }
                    return None;
                }
                remaining = 1.0 - t;
            }
        }

        let d = p.vel * h * remaining;
        move_with_terrain(&state.arena, &mut p, d);
    }

    Some(p)
}

/// Move by `d`, reflecting off the arena boundary
fn move_with_terrain(arena: &Arena, p: &mut Projectile, d: DVec2) {
    if let Some(segments) = arena.segments() {
        sweep_walls(segments, p, d);
        return;
    }

    p.pos += d;
    let contact = arena.collide_circle(p.pos, p.radius);
    if contact.hit {
        p.pos = contact.corrected;
        if p.vel.dot(contact.normal) < 0.0 {
            p.vel = reflect_velocity(p.vel, contact.normal);
        }
    }
}

/// Swept wall resolution: take the earliest capsule contact, reflect, and
/// spend the rest of the displacement along the new heading
fn sweep_walls(segments: &[Segment], p: &mut Projectile, mut d: DVec2) {
    for _ in 0..MAX_WALL_BOUNCES {
        let earliest = segments
            .iter()
            .filter_map(|s| swept_circle_vs_capsule_toi(p.pos, d, s.a, s.b, p.radius))
            .min_by(|a, b| a.t.total_cmp(&b.t));

        let Some(hit) = earliest else {
            p.pos += d;
            return;
        };

        p.pos += d * hit.t + hit.normal * WALL_SKIN;
        p.vel = reflect_velocity(p.vel, hit.normal);
        d = reflect_velocity(d, hit.normal) * (1.0 - hit.t);
    }
    // Bounce budget spent: hold position for the rest of this substep
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ArenaKind, EntityLayout, HitGroupPolicy, SimConfig};
    use crate::sim::projectile::{BehaviorBudget, HitGroupTag};
    use proptest::prelude::*;

    fn state(config: SimConfig) -> SimState {
        SimState::new(config, 800.0, 800.0, 12345).unwrap()
    }

    fn projectile(pos: DVec2, vel: DVec2) -> Projectile {
        Projectile {
            id: 100,
            pos,
            vel,
            radius: 10.0,
            spawn_time: 0.0,
            duration: -1.0,
            cast_id: 1,
            group: HitGroupTag {
                instance_id: 1,
                barrage_index: 0,
                salvo_group: 0,
            },
            budget: BehaviorBudget::default(),
            has_split: false,
            damage_multiplier: 1.0,
        }
    }

    #[test]
    fn test_substep_count() {
        assert_eq!(substep_count(0.0, SIM_DT), 1);
        assert_eq!(substep_count(120.0, SIM_DT), 1);
        assert_eq!(substep_count(1200.0, SIM_DT), 5);
        assert_eq!(substep_count(1e12, SIM_DT), MAX_PROJECTILE_SUBSTEPS);
    }

    #[test]
    fn test_projectile_moves_straight() {
        let mut state = state(SimConfig::default());
        state
            .projectiles
            .push(projectile(DVec2::new(-100.0, -100.0), DVec2::new(120.0, 0.0)));
        tick(&mut state, SIM_DT);
        let p = &state.projectiles[0];
        assert!((p.pos - DVec2::new(-99.0, -100.0)).length() < 1e-9);
        assert_eq!(state.time_ticks, 1);
        assert!((state.time - SIM_DT).abs() < 1e-15);
    }

    #[test]
    fn test_stopped_sandbox_never_casts() {
        let mut state = state(SimConfig::default());
        for _ in 0..600 {
            tick(&mut state, SIM_DT);
        }
        assert!(state.projectiles.is_empty());
        assert!(state.scheduler.instances().is_empty());
        assert_eq!(state.scheduler.seals, 0);
    }

    #[test]
    fn test_circle_wall_reflects() {
        let mut state = state(SimConfig::default());
        let limit = state.scale.arena_radius_px - 10.0;
        state
            .projectiles
            .push(projectile(DVec2::new(limit - 1.0, 0.0), DVec2::new(1200.0, 0.0)));
        tick(&mut state, SIM_DT);
        let p = &state.projectiles[0];
        assert!(p.vel.x < 0.0);
        assert!((p.speed() - 1200.0).abs() < 1e-6);
        assert!(p.pos.length() <= limit + 1e-9);
    }

    #[test]
    fn test_corridor_wall_reflects_without_tunneling() {
        let mut state = state(SimConfig {
            arena: ArenaKind::Corridor,
            ..Default::default()
        });
        // Stem walls are vertical at x = +-half_stem; head straight for one
        let segments = state.arena.segments().unwrap().to_vec();
        let half_stem = segments
            .iter()
            .filter(|s| s.a.x == s.b.x && s.a.x > 0.0)
            .map(|s| s.a.x)
            .fold(f64::MAX, f64::min);
        let speed = 60_000.0;
        state
            .projectiles
            .push(projectile(DVec2::new(0.0, -100.0), DVec2::new(speed, 0.0)));
        tick(&mut state, SIM_DT);

        let p = &state.projectiles[0];
        assert!(p.pos.x.abs() < half_stem, "escaped to x = {}", p.pos.x);
        assert!((p.speed() - speed).abs() < 1e-6);
    }

    #[test]
    fn test_granted_hit_absorbs_and_records() {
        let mut state = state(SimConfig::default());
        let target = state.target.pos;
        state
            .projectiles
            .push(projectile(target - DVec2::new(100.0, 0.0), DVec2::new(1200.0, 0.0)));
        for _ in 0..10 {
            tick(&mut state, SIM_DT);
        }
        assert!(state.projectiles.is_empty());
        assert_eq!(state.stats.total_hits, 1);
        assert!((state.stats.total_damage - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn test_denied_hit_passes_through() {
        let mut state = state(SimConfig::default());
        let target = state.target.pos;
        let p = projectile(target - DVec2::new(100.0, 0.0), DVec2::new(1200.0, 0.0));
        let key = state.hit_key(&p);
        state.ledger.try_register(key, 0.0);
        state.projectiles.push(p);
        for _ in 0..30 {
            tick(&mut state, SIM_DT);
        }
        assert_eq!(state.stats.total_hits, 0);
        let p = &state.projectiles[0];
        assert!(p.pos.x > target.x + 36.0);
        assert_eq!(p.vel, DVec2::new(1200.0, 0.0));
    }

    #[test]
    fn test_split_children_spawn_with_ids() {
        let mut state = state(SimConfig::default());
        let target = state.target.pos;
        let mut p = projectile(target - DVec2::new(60.0, 0.0), DVec2::new(1200.0, 0.0));
        p.budget.split = 3;
        p.duration = 2.0;
        state.projectiles.push(p);
        for _ in 0..4 {
            tick(&mut state, SIM_DT);
        }
        assert_eq!(state.projectiles.len(), 3);
        let mut ids: Vec<u32> = state.projectiles.iter().map(|p| p.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 3);
        assert!(state.projectiles.iter().all(|c| c.has_split && c.duration < 2.0));
        assert_eq!(state.stats.total_hits, 1);
    }

    #[test]
    fn test_projectiles_expire() {
        let mut state = state(SimConfig::default());
        let mut p = projectile(DVec2::new(-100.0, -100.0), DVec2::ZERO);
        p.duration = 0.055;
        state.projectiles.push(p);
        for _ in 0..6 {
            tick(&mut state, SIM_DT);
        }
        assert_eq!(state.projectiles.len(), 1);
        tick(&mut state, SIM_DT);
        assert!(state.projectiles.is_empty());
    }

    #[test]
    fn test_colocated_cast_hits_once_per_group() {
        for (policy, expected) in [(HitGroupPolicy::Independent, 2), (HitGroupPolicy::Merged, 1)] {
            let mut state = state(SimConfig {
                hit_group_policy: policy,
                ..Default::default()
            });
            state.set_entity_layout(EntityLayout {
                caster: DVec2::new(0.0, 0.4),
                target: DVec2::new(0.0, 0.4),
            });
            state.running = true;
            while state.scheduler.instances().is_empty() && state.stats.history().count() == 0 {
                tick(&mut state, SIM_DT);
            }
            // One seal: base projectile plus a salvo of two
            assert_eq!(state.stats.total_hits, expected, "{policy:?}");
        }
    }

    #[test]
    fn test_instances_retire_into_history() {
        let mut state = state(SimConfig {
            projectile_duration: 0.2,
            ..Default::default()
        });
        state.running = true;
        for _ in 0..240 {
            tick(&mut state, SIM_DT);
        }
        let records: Vec<_> = state.stats.history().copied().collect();
        assert!(!records.is_empty());
        assert!(
            records
                .iter()
                .all(|r| r.projectiles == r.expected_projectiles)
        );
    }

    #[test]
    fn test_determinism() {
        let config = SimConfig {
            fork: 1,
            fork_chance: 50.0,
            seal_frequency: 6.0,
            ..Default::default()
        };
        let mut a = state(config.clone());
        let mut b = state(config);
        a.running = true;
        b.running = true;
        for _ in 0..600 {
            tick(&mut a, SIM_DT);
            tick(&mut b, SIM_DT);
        }
        assert_eq!(a.stats.total_hits, b.stats.total_hits);
        assert_eq!(a.projectiles.len(), b.projectiles.len());
        for (pa, pb) in a.projectiles.iter().zip(&b.projectiles) {
            assert_eq!(pa.pos, pb.pos);
        }
    }

    proptest! {
        #[test]
        fn prop_square_reflection_preserves_speed(
            angle in 0.0f64..std::f64::consts::TAU,
            speed in 100.0f64..20_000.0,
        ) {
            let mut state = state(SimConfig {
                arena: ArenaKind::Square,
                ..Default::default()
            });
            state.set_entity_layout(EntityLayout {
                caster: DVec2::ZERO,
                target: DVec2::new(5.0, 5.0),
            });
            state
                .projectiles
                .push(projectile(DVec2::ZERO, DVec2::from_angle(angle) * speed));
            for _ in 0..120 {
                tick(&mut state, SIM_DT);
            }
            let p = &state.projectiles[0];
            prop_assert!((p.speed() - speed).abs() < 1e-6);
            let bound = state.scale.arena_radius_px - p.radius + 1e-9;
            prop_assert!(p.pos.x.abs() <= bound && p.pos.y.abs() <= bound);
        }
    }
}
