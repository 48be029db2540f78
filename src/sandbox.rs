//! Frame driver
//!
//! Hosts call `advance` once per rendered frame with the frame delta; the
//! sandbox runs as many fixed ticks as fit. Between calls the state is
//! consistent and can be snapshotted.

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::config::{EntityLayout, SimConfig};
use crate::consts::*;
use crate::error::SimError;
use crate::sim::arena::PolygonArena;
use crate::sim::stats::Snapshot;
use crate::sim::{SimState, tick};

/// Drawing surface size in pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// A simulation plus its fixed-step accumulator
#[derive(Debug, Clone)]
pub struct Sandbox {
    state: SimState,
    accumulator: f64,
}

impl Sandbox {
    pub fn new(config: SimConfig, viewport: Viewport, seed: u64) -> Result<Self, SimError> {
        Self::with_polygon(config, viewport, seed, None)
    }

    pub fn with_polygon(
        config: SimConfig,
        viewport: Viewport,
        seed: u64,
        polygon: Option<PolygonArena>,
    ) -> Result<Self, SimError> {
        let state =
            SimState::with_polygon(config, viewport.width, viewport.height, seed, polygon)?;
        Ok(Self {
            state,
            accumulator: 0.0,
        })
    }

    /// Run the fixed ticks covered by `frame_dt` seconds; returns how many ran
    pub fn advance(&mut self, frame_dt: f64) -> u32 {
        let dt = if frame_dt.is_finite() {
            frame_dt.clamp(0.0, MAX_FRAME_DT)
        } else {
            0.0
        };
        self.accumulator += dt;

        let mut ticks = 0;
        while self.accumulator >= SIM_DT && ticks < MAX_TICKS_PER_FRAME {
            tick(&mut self.state, SIM_DT);
            self.accumulator -= SIM_DT;
            ticks += 1;
        }
        if ticks == MAX_TICKS_PER_FRAME {
            // Drop the backlog rather than spiral
            self.accumulator = self.accumulator.min(SIM_DT);
        }
        ticks
    }

    /// Run exactly `ticks` fixed ticks, bypassing the accumulator
    pub fn run_ticks(&mut self, ticks: u64) {
        for _ in 0..ticks {
            tick(&mut self.state, SIM_DT);
        }
    }

    pub fn start(&mut self) {
        if !self.state.running {
            self.state.running = true;
            log::info!("Casting started at {:.2}s", self.state.time);
        }
    }

    /// Stop casting. Unfired barrage repeats are dropped; projectiles in
    /// flight keep moving.
    pub fn stop(&mut self) {
        if self.state.running {
            self.state.running = false;
            let dropped = self.state.scheduler.cancel_pending_repeats();
            log::info!(
                "Casting stopped at {:.2}s ({dropped} pending repeats dropped)",
                self.state.time
            );
        }
    }

    pub fn is_running(&self) -> bool {
        self.state.running
    }

    pub fn reset(&mut self) {
        self.state.reset();
        self.accumulator = 0.0;
    }

    pub fn config(&self) -> &SimConfig {
        &self.state.config
    }

    pub fn set_config(&mut self, config: SimConfig) {
        self.state.set_config(config);
    }

    pub fn resize(&mut self, viewport: Viewport) -> Result<(), SimError> {
        self.state.resize(viewport.width, viewport.height)
    }

    pub fn load_polygon(&mut self, polygon: PolygonArena) {
        self.state.load_polygon(polygon);
    }

    /// Parse, validate and load a polygon arena definition
    pub fn load_polygon_json(&mut self, json: &str) -> Result<(), SimError> {
        let polygon = PolygonArena::from_json(json)?;
        self.state.load_polygon(polygon);
        Ok(())
    }

    pub fn snapshot(&self) -> Snapshot {
        self.state.snapshot()
    }

    pub fn entity_layout(&self) -> EntityLayout {
        self.state.entity_layout()
    }

    pub fn set_entity_layout(&mut self, layout: EntityLayout) {
        self.state.set_entity_layout(layout);
    }

    /// Place the caster at a pixel position
    pub fn move_caster(&mut self, pos: DVec2) {
        if pos.is_finite() {
            self.state.caster.pos = pos;
        }
    }

    /// Place the target at a pixel position
    pub fn move_target(&mut self, pos: DVec2) {
        if pos.is_finite() {
            self.state.target.pos = pos;
        }
    }

    pub fn state(&self) -> &SimState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut SimState {
        &mut self.state
    }
}
