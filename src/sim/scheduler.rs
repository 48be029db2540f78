//! Cast scheduling
//!
//! Turns elapsed time into casts. Seals accrue at the configured frequency;
//! once enough are banked a cast fires, consuming all of them. Each cast
//! opens a cast instance that owns its barrage repeats, which re-emit the
//! same angle pattern later under their own hit groups.

use std::collections::HashSet;
use std::f64::consts::TAU;

use rand::Rng;

use crate::config::SimConfig;
use crate::consts::CAST_STEP;

/// Slack when comparing the logical clock against scheduled fire times
const FIRE_TIME_EPSILON: f64 = 1e-9;

/// A barrage repeat waiting to fire
#[derive(Debug, Clone)]
pub struct ScheduledRepeat {
    /// 1-based repeat number
    pub barrage_index: u32,
    /// Emission id used for this repeat's projectiles
    pub cast_id: u32,
    pub fire_time: f64,
    pub damage_multiplier: f64,
    pub fired: bool,
}

/// One trigger event and all of its barrage repeats
#[derive(Debug, Clone)]
pub struct CastInstance {
    pub id: u32,
    pub cast_time: f64,
    /// Launch angles shared by the main cast and every repeat
    pub angles: Vec<f64>,
    /// Size of the base salvo within `angles`
    pub base_count: u32,
    pub seals_consumed: u32,
    pub repeats: Vec<ScheduledRepeat>,
    /// Granted hits per barrage index (0 = main cast)
    pub hits_by_repeat: Vec<u32>,
    /// Projectiles emitted so far (main cast plus fired repeats)
    pub projectile_count: u32,
    /// Projectiles the instance will have emitted once every repeat fires
    pub expected_count: u32,
    pub complete: bool,
}

impl CastInstance {
    /// Best hit count of any single emission in this instance
    pub fn max_hits(&self) -> u32 {
        self.hits_by_repeat.iter().copied().max().unwrap_or(0)
    }

    pub fn has_pending_repeats(&self) -> bool {
        self.repeats.iter().any(|r| !r.fired)
    }

    fn emission(&self, cast_id: u32, barrage_index: u32, damage_multiplier: f64) -> Emission {
        Emission {
            instance_id: self.id,
            cast_id,
            barrage_index,
            angles: self.angles.clone(),
            base_count: self.base_count,
            damage_multiplier,
        }
    }
}

/// A batch of projectiles to spawn from the caster
#[derive(Debug, Clone)]
pub struct Emission {
    pub instance_id: u32,
    pub cast_id: u32,
    pub barrage_index: u32,
    pub angles: Vec<f64>,
    pub base_count: u32,
    pub damage_multiplier: f64,
}

impl Emission {
    pub fn len(&self) -> usize {
        self.angles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.angles.is_empty()
    }

    /// Salvo group of the projectile at `index`: 0 for the base salvo, then
    /// one group per consumed seal holding two projectiles each
    pub fn salvo_group(&self, index: usize) -> u32 {
        let base = self.base_count as usize;
        if index < base {
            0
        } else {
            ((index - base) / 2 + 1) as u32
        }
    }
}

/// Seal accumulator, cast trigger and live cast instances
#[derive(Debug, Clone, Default)]
pub struct CastScheduler {
    /// Banked seals, in `[0, max_seals]`
    pub seals: u32,
    seal_elapsed: f64,
    cast_elapsed: f64,
    next_instance_id: u32,
    next_cast_id: u32,
    instances: Vec<CastInstance>,
}

impl CastScheduler {
    pub fn new() -> Self {
        Self {
            next_instance_id: 1,
            next_cast_id: 1,
            ..Default::default()
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Live (not yet retired) cast instances
    pub fn instances(&self) -> &[CastInstance] {
        &self.instances
    }

    pub fn instance(&self, id: u32) -> Option<&CastInstance> {
        self.instances.iter().find(|i| i.id == id)
    }

    fn alloc_instance_id(&mut self) -> u32 {
        let id = self.next_instance_id;
        self.next_instance_id += 1;
        id
    }

    fn alloc_cast_id(&mut self) -> u32 {
        let id = self.next_cast_id;
        self.next_cast_id += 1;
        id
    }

    /// Bank seals for `dt` seconds. Several may accrue in one call; the timer
    /// does not bank while seals are capped.
    pub fn accrue_seals(&mut self, config: &SimConfig, dt: f64) {
        let Some(interval) = config.seal_interval() else {
            return;
        };
        if self.seals >= config.max_seals {
            self.seals = config.max_seals;
            self.seal_elapsed = 0.0;
            return;
        }
        self.seal_elapsed += dt;
        while self.seal_elapsed >= interval && self.seals < config.max_seals {
            self.seal_elapsed -= interval;
            self.seals += 1;
        }
        if self.seals >= config.max_seals {
            self.seal_elapsed = 0.0;
        }
    }

    /// Advance one tick: accrue seals, trigger casts, fire due repeats.
    ///
    /// Returns the emissions to spawn, in firing order.
    pub fn advance<R: Rng>(
        &mut self,
        config: &SimConfig,
        now: f64,
        dt: f64,
        rng: &mut R,
    ) -> Vec<Emission> {
        self.accrue_seals(config, dt);

        let mut emissions = Vec::new();
        let threshold = config.cast_threshold();
        self.cast_elapsed += dt;
        while self.cast_elapsed >= CAST_STEP && self.seals >= threshold {
            let seals = std::mem::take(&mut self.seals);
            emissions.push(self.begin_cast(config, seals, now, rng));
            self.cast_elapsed -= CAST_STEP;
        }
        if self.seals < threshold {
            // Nothing to cast: keep the accumulator from banking idle time
            self.cast_elapsed = self.cast_elapsed.min(CAST_STEP);
        }

        emissions.extend(self.fire_due_repeats(now));
        emissions
    }

    /// Open a new cast instance consuming `seals` and return its main emission.
    ///
    /// Rolls one uniform angle per projectile and schedules the barrage
    /// repeats, which reuse those angles.
    pub fn begin_cast<R: Rng>(
        &mut self,
        config: &SimConfig,
        seals: u32,
        now: f64,
        rng: &mut R,
    ) -> Emission {
        let id = self.alloc_instance_id();
        let cast_id = self.alloc_cast_id();
        let total = config.emission_count(seals);
        let angles: Vec<f64> = (0..total).map(|_| rng.random_range(0.0..TAU)).collect();

        let repeats: Vec<ScheduledRepeat> = (1..=config.barrage_count)
            .map(|barrage_index| ScheduledRepeat {
                barrage_index,
                cast_id: self.alloc_cast_id(),
                fire_time: now + config.barrage_interval * barrage_index as f64,
                damage_multiplier: config.damage_multiplier(barrage_index),
                fired: false,
            })
            .collect();

        log::debug!(
            "Cast instance {id} at {now:.3}s: {total} projectiles, {seals} seals, {} repeats",
            repeats.len()
        );

        let instance = CastInstance {
            id,
            cast_time: now,
            angles,
            base_count: config.base_count(),
            seals_consumed: seals,
            hits_by_repeat: vec![0; repeats.len() + 1],
            repeats,
            projectile_count: total,
            expected_count: config.expected_projectile_count(seals),
            complete: false,
        };
        let emission = instance.emission(cast_id, 0, config.damage_multiplier(0));
        self.instances.push(instance);
        emission
    }

    /// Fire every repeat whose time has come
    pub fn fire_due_repeats(&mut self, now: f64) -> Vec<Emission> {
        let mut emissions = Vec::new();
        for instance in &mut self.instances {
            let mut due = Vec::new();
            for repeat in &mut instance.repeats {
                if !repeat.fired && now + FIRE_TIME_EPSILON >= repeat.fire_time {
                    repeat.fired = true;
                    due.push((repeat.cast_id, repeat.barrage_index, repeat.damage_multiplier));
                }
            }
            for (cast_id, barrage_index, damage_multiplier) in due {
                log::debug!(
                    "Barrage repeat {barrage_index} of instance {} at {now:.3}s",
                    instance.id
                );
                instance.projectile_count += instance.angles.len() as u32;
                emissions.push(instance.emission(cast_id, barrage_index, damage_multiplier));
            }
        }
        emissions
    }

    /// Drop repeats that have not fired yet; their instances then retire with
    /// what they actually emitted. Returns how many repeats were dropped.
    pub fn cancel_pending_repeats(&mut self) -> usize {
        let mut dropped = 0;
        for instance in &mut self.instances {
            let before = instance.repeats.len();
            instance.repeats.retain(|r| r.fired);
            if instance.repeats.len() < before {
                dropped += before - instance.repeats.len();
                // Repeats fire in index order, so the survivors are 1..=len
                instance.hits_by_repeat.truncate(instance.repeats.len() + 1);
                instance.expected_count = instance.projectile_count;
            }
        }
        dropped
    }

    /// Count a granted hit toward its instance
    pub fn record_hit(&mut self, instance_id: u32, barrage_index: u32) {
        let hits = self
            .instances
            .iter_mut()
            .find(|i| i.id == instance_id)
            .and_then(|i| i.hits_by_repeat.get_mut(barrage_index as usize));
        if let Some(hits) = hits {
            *hits += 1;
        }
    }

    /// Remove instances with no pending repeats and no live projectiles
    pub fn retire_completed(&mut self, live_instances: &HashSet<u32>) -> Vec<CastInstance> {
        let (mut done, active): (Vec<CastInstance>, Vec<CastInstance>) =
            std::mem::take(&mut self.instances)
                .into_iter()
                .partition(|i| !i.has_pending_repeats() && !live_instances.contains(&i.id));
        self.instances = active;
        for instance in &mut done {
            instance.complete = true;
        }
        done
    }
}
