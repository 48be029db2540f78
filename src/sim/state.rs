//! Simulation state
//!
//! Everything the step loop owns between ticks: entities, projectiles, the
//! cooldown ledger, the cast scheduler and the stats. Hosts read it (or a
//! `Snapshot`) only after a tick has completed.

use std::collections::HashSet;

use glam::DVec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::arena::{Arena, PolygonArena, WorldScale};
use super::ledger::{HitGroupKey, HitLedger};
use super::projectile::{BehaviorBudget, HitGroupTag, Projectile};
use super::scheduler::{CastScheduler, Emission};
use super::stats::{EntityView, HitStats, InstanceRecord, ProjectileView, Snapshot};
use crate::config::{EntityLayout, SimConfig};
use crate::consts::HIT_COOLDOWN;
use crate::error::SimError;

/// What an entity is used for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityRole {
    /// Spawn origin of every cast
    Caster,
    /// Collision sink for projectiles
    Target,
}

/// A passive circle the user can drag around
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub id: u32,
    pub role: EntityRole,
    pub pos: DVec2,
    pub radius: f64,
}

impl Entity {
    fn view(&self, scale: &WorldScale) -> EntityView {
        let n = scale.normalize(self.pos);
        EntityView {
            x: self.pos.x,
            y: self.pos.y,
            radius: self.radius,
            nx: n.x,
            ny: n.y,
        }
    }
}

/// Complete simulation state (pixels, seconds)
#[derive(Debug, Clone)]
pub struct SimState {
    pub config: SimConfig,
    pub scale: WorldScale,
    pub arena: Arena,
    pub caster: Entity,
    pub target: Entity,
    /// Live projectiles (spawn order)
    pub projectiles: Vec<Projectile>,
    pub ledger: HitLedger,
    pub scheduler: CastScheduler,
    pub stats: HitStats,
    /// Whether new casts are scheduled
    pub running: bool,
    /// Logical clock (seconds)
    pub time: f64,
    /// Simulation tick counter
    pub time_ticks: u64,
    /// Run seed for reproducibility
    pub seed: u64,
    pub(crate) rng: Pcg32,
    polygon: Option<PolygonArena>,
    viewport: (f64, f64),
    next_id: u32,
}

impl SimState {
    /// Build a stopped simulation for a `width` x `height` viewport
    pub fn new(config: SimConfig, width: f64, height: f64, seed: u64) -> Result<Self, SimError> {
        Self::with_polygon(config, width, height, seed, None)
    }

    /// Build with an imported polygon available for the polygon arena
    pub fn with_polygon(
        mut config: SimConfig,
        width: f64,
        height: f64,
        seed: u64,
        polygon: Option<PolygonArena>,
    ) -> Result<Self, SimError> {
        config.sanitize();
        let scale = WorldScale::from_viewport(width, height, config.arena_radius)?;
        let arena = Arena::build(&config, &scale, polygon.as_ref());
        let layout = EntityLayout::default();

        let caster = Entity {
            id: 1,
            role: EntityRole::Caster,
            pos: scale.denormalize(layout.caster),
            radius: scale.px(config.projectile_radius),
        };
        let target = Entity {
            id: 2,
            role: EntityRole::Target,
            pos: scale.denormalize(layout.target),
            radius: scale.px(config.target_radius),
        };

        log::info!(
            "Simulation ready: {} arena, {:.1} px/unit, seed {seed}",
            arena.kind().as_str(),
            scale.pixels_per_unit
        );

        Ok(Self {
            config,
            scale,
            arena,
            caster,
            target,
            projectiles: Vec::new(),
            ledger: HitLedger::new(HIT_COOLDOWN),
            scheduler: CastScheduler::new(),
            stats: HitStats::new(),
            running: false,
            time: 0.0,
            time_ticks: 0,
            seed,
            rng: Pcg32::seed_from_u64(seed),
            polygon,
            viewport: (width, height),
            next_id: 1,
        })
    }

    /// Allocate a new projectile id
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Clear every projectile, cooldown, cast and stat; rewind the clock.
    ///
    /// Entities, config and the running flag are kept.
    pub fn reset(&mut self) {
        self.projectiles.clear();
        self.ledger.clear();
        self.scheduler.reset();
        self.stats.reset();
        self.time = 0.0;
        self.time_ticks = 0;
        self.rng = Pcg32::seed_from_u64(self.seed);
        self.next_id = 1;
        log::info!("Simulation reset");
    }

    /// Install a new config. The arena is rebuilt only when its shape or
    /// scale changed, which also drops projectiles in flight.
    pub fn set_config(&mut self, mut config: SimConfig) {
        config.sanitize();
        let rebuild = config.arena != self.config.arena
            || config.arena_radius != self.config.arena_radius
            || config.corridor != self.config.corridor;
        self.config = config;
        if rebuild {
            // Viewport was validated when it was installed
            if let Ok(scale) =
                WorldScale::from_viewport(self.viewport.0, self.viewport.1, self.config.arena_radius)
            {
                self.rebuild_arena(scale);
            }
        }
        self.caster.radius = self.scale.px(self.config.projectile_radius);
        self.target.radius = self.scale.px(self.config.target_radius);
    }

    /// Refit the arena to a new viewport
    pub fn resize(&mut self, width: f64, height: f64) -> Result<(), SimError> {
        let scale = WorldScale::from_viewport(width, height, self.config.arena_radius)?;
        self.viewport = (width, height);
        self.rebuild_arena(scale);
        self.caster.radius = self.scale.px(self.config.projectile_radius);
        self.target.radius = self.scale.px(self.config.target_radius);
        Ok(())
    }

    /// Make an imported polygon available (and active if selected)
    pub fn load_polygon(&mut self, polygon: PolygonArena) {
        self.polygon = Some(polygon);
        self.rebuild_arena(self.scale);
    }

    fn rebuild_arena(&mut self, scale: WorldScale) {
        let layout = self.entity_layout();
        self.scale = scale;
        self.arena = Arena::build(&self.config, &self.scale, self.polygon.as_ref());
        self.set_entity_layout(layout);
        if !self.projectiles.is_empty() {
            log::info!(
                "Arena rebuilt, dropping {} projectiles in flight",
                self.projectiles.len()
            );
            self.projectiles.clear();
        }
    }

    /// Entity positions in arena-radius units
    pub fn entity_layout(&self) -> EntityLayout {
        EntityLayout {
            caster: self.scale.normalize(self.caster.pos),
            target: self.scale.normalize(self.target.pos),
        }
    }

    pub fn set_entity_layout(&mut self, layout: EntityLayout) {
        let finite = |p: DVec2| p.is_finite();
        if finite(layout.caster) {
            self.caster.pos = self.scale.denormalize(layout.caster);
        }
        if finite(layout.target) {
            self.target.pos = self.scale.denormalize(layout.target);
        }
    }

    /// Behavior budgets for a freshly cast projectile
    fn spawn_budget(&self) -> BehaviorBudget {
        if self.config.pierce_only {
            BehaviorBudget {
                pierce: self.config.pierce,
                ..Default::default()
            }
        } else {
            BehaviorBudget {
                pierce: self.config.pierce,
                fork: self.config.fork,
                chain: self.config.chain,
                split: self.config.split,
            }
        }
    }

    /// Spawn an emission's projectiles from the caster
    pub fn spawn_emission(&mut self, emission: &Emission, now: f64) {
        let speed = self.scale.px(self.config.effective_speed());
        let radius = self.scale.px(self.config.projectile_radius);
        let budget = self.spawn_budget();

        for (index, &angle) in emission.angles.iter().enumerate() {
            let id = self.next_entity_id();
            self.projectiles.push(Projectile {
                id,
                pos: self.caster.pos,
                vel: DVec2::from_angle(angle) * speed,
                radius,
                spawn_time: now,
                duration: self.config.projectile_duration,
                cast_id: emission.cast_id,
                group: HitGroupTag {
                    instance_id: emission.instance_id,
                    barrage_index: emission.barrage_index,
                    salvo_group: emission.salvo_group(index),
                },
                budget,
                has_split: false,
                damage_multiplier: emission.damage_multiplier,
            });
        }
    }

    /// Cooldown key for a projectile against the target
    pub fn hit_key(&self, projectile: &Projectile) -> HitGroupKey {
        self.config
            .hit_group_policy
            .key(projectile.group, self.target.id)
    }

    /// Book a granted hit into the stats and its cast instance
    pub fn record_hit(&mut self, projectile: &Projectile, now: f64) {
        let damage = self.config.avg_hit * projectile.damage_multiplier;
        self.stats.record_hit(now, damage);
        self.scheduler
            .record_hit(projectile.group.instance_id, projectile.group.barrage_index);
        log::trace!(
            "Hit at {now:.4}s by instance {} repeat {} salvo {} for {damage:.1}",
            projectile.group.instance_id,
            projectile.group.barrage_index,
            projectile.group.salvo_group
        );
    }

    /// Cast instances still referenced by a live projectile
    pub fn live_instances(&self) -> HashSet<u32> {
        self.projectiles
            .iter()
            .map(|p| p.group.instance_id)
            .collect()
    }

    /// Move finished cast instances into the bounded history
    pub fn retire_instances(&mut self) {
        let live = self.live_instances();
        for instance in self.scheduler.retire_completed(&live) {
            if instance.projectile_count != instance.expected_count {
                log::warn!(
                    "Instance {} emitted {} projectiles, expected {}",
                    instance.id,
                    instance.projectile_count,
                    instance.expected_count
                );
            }
            self.ledger.prune_instance(instance.id);
            self.stats.push_history(InstanceRecord::from(&instance));
        }
    }

    /// Read-only view for display after a tick
    pub fn snapshot(&self) -> Snapshot {
        let projectiles = self
            .projectiles
            .iter()
            .map(|p| ProjectileView {
                x: p.pos.x,
                y: p.pos.y,
                radius: p.radius,
                instance_id: p.group.instance_id,
                barrage_index: p.group.barrage_index,
                salvo_group: p.group.salvo_group,
                on_cooldown: self.ledger.is_on_cooldown(self.hit_key(p), self.time),
            })
            .collect();

        Snapshot {
            time: self.time,
            running: self.running,
            seals: self.scheduler.seals,
            max_seals: self.config.max_seals,
            caster: self.caster.view(&self.scale),
            target: self.target.view(&self.scale),
            projectiles,
            total_hits: self.stats.total_hits,
            total_damage: self.stats.total_damage,
            hits_per_second: self.stats.hits_per_second(self.time),
            recent_instance_hits: self.stats.history().map(|r| r.hits).collect(),
            recent_instance_projectiles: self.stats.history().map(|r| r.projectiles).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ArenaKind;
    use rand::Rng;

    fn state() -> SimState {
        SimState::new(SimConfig::default(), 800.0, 800.0, 42).unwrap()
    }

    #[test]
    fn test_new_places_entities_from_layout() {
        let state = state();
        let layout = state.entity_layout();
        assert!((layout.caster - EntityLayout::default().caster).length() < 1e-12);
        assert!((layout.target - EntityLayout::default().target).length() < 1e-12);
        assert!((state.target.radius - state.scale.px(1.0)).abs() < 1e-12);
        assert!(!state.running);
    }

    #[test]
    fn test_invalid_viewport_is_an_error() {
        assert!(SimState::new(SimConfig::default(), -1.0, 800.0, 1).is_err());
    }

    #[test]
    fn test_spawn_emission_uses_caster_and_scale() {
        let mut state = state();
        let config = SimConfig {
            whirlwind_stages: 1,
            pierce: 2,
            fork: 1,
            pierce_only: true,
            ..Default::default()
        };
        state.set_config(config);
        let mut rng = Pcg32::seed_from_u64(3);
        let emission = state
            .scheduler
            .begin_cast(&state.config.clone(), 1, 0.0, &mut rng);
        state.spawn_emission(&emission, 0.0);

        assert_eq!(state.projectiles.len(), 4);
        let speed = state.scale.px(state.config.effective_speed());
        for p in &state.projectiles {
            assert_eq!(p.pos, state.caster.pos);
            assert!((p.speed() - speed).abs() < 1e-9);
            assert_eq!(p.budget.pierce, 2);
            assert_eq!(p.budget.fork, 0);
        }
        let groups: Vec<u32> = state.projectiles.iter().map(|p| p.group.salvo_group).collect();
        assert_eq!(groups, vec![0, 0, 1, 1]);
    }

    #[test]
    fn test_reset_clears_everything_but_entities() {
        let mut state = state();
        state.set_entity_layout(EntityLayout {
            caster: DVec2::new(0.1, 0.2),
            target: DVec2::new(-0.3, 0.0),
        });
        let emission = state
            .scheduler
            .begin_cast(&SimConfig::default(), 0, 0.0, &mut Pcg32::seed_from_u64(1));
        state.spawn_emission(&emission, 0.0);
        state.time = 3.0;
        state.reset();

        assert!(state.projectiles.is_empty());
        assert!(state.scheduler.instances().is_empty());
        assert_eq!(state.time, 0.0);
        assert!((state.entity_layout().caster - DVec2::new(0.1, 0.2)).length() < 1e-12);
    }

    #[test]
    fn test_reset_reseeds_rng() {
        let mut state = state();
        let first: f64 = state.rng.random();
        state.reset();
        let again: f64 = state.rng.random();
        assert_eq!(first, again);
    }

    #[test]
    fn test_arena_change_rebuilds_and_keeps_layout() {
        let mut state = state();
        let layout = state.entity_layout();
        state.set_config(SimConfig {
            arena: ArenaKind::Corridor,
            ..Default::default()
        });
        assert_eq!(state.arena.kind(), ArenaKind::Corridor);
        assert!(state.arena.segments().is_some());
        assert!((state.entity_layout().target - layout.target).length() < 1e-12);
    }

    #[test]
    fn test_resize_rescales_entities() {
        let mut state = state();
        let before = state.target.pos;
        state.resize(400.0, 400.0).unwrap();
        assert!((state.target.pos - before * 0.5).length() < 1e-9);
        assert!(state.resize(0.0, 400.0).is_err());
    }

    #[test]
    fn test_snapshot_reports_cooldown() {
        let mut state = state();
        let emission = state
            .scheduler
            .begin_cast(&SimConfig::default(), 0, 0.0, &mut Pcg32::seed_from_u64(1));
        state.spawn_emission(&emission, 0.0);
        let key = state.hit_key(&state.projectiles[0]);
        assert!(!state.snapshot().projectiles[0].on_cooldown);
        state.ledger.try_register(key, 0.0);
        assert!(state.snapshot().projectiles[0].on_cooldown);
    }
}
