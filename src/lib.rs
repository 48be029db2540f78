//! Barrage Sandbox - projectile physics for skill DPS estimation
//!
//! Core modules:
//! - `sim`: Deterministic simulation (geometry, arenas, casts, hit groups)
//! - `sandbox`: Frame driver that runs fixed ticks from variable frame deltas
//! - `config`: Skill/arena configuration with tolerant parsing
//! - `share`: Flat key/value encoding of a sandbox setup
//! - `platform`: Browser bindings (wasm32 only)

pub mod config;
pub mod error;
pub mod platform;
pub mod sandbox;
pub mod share;
pub mod sim;

pub use config::{ArenaKind, EntityLayout, SimConfig};
pub use error::{ArenaError, SimError};
pub use sandbox::{Sandbox, Viewport};

use glam::DVec2;

/// Simulation constants
pub mod consts {
    /// Fixed simulation timestep (120 Hz)
    pub const SIM_DT: f64 = 1.0 / 120.0;
    /// Largest frame delta accepted by the driver (seconds)
    pub const MAX_FRAME_DT: f64 = 0.1;
    /// Maximum ticks per frame to prevent spiral of death
    pub const MAX_TICKS_PER_FRAME: u32 = 12;

    /// Seconds a hit group must wait before it can hit the same target again
    pub const HIT_COOLDOWN: f64 = 0.66;
    /// Cast accumulator step (decouples cast emission from frame delta)
    pub const CAST_STEP: f64 = 0.01;

    /// Damage multiplier applied to every barrage repeat
    pub const BARRAGE_REPEAT_DAMAGE: f64 = 0.5;
    /// Additive damage bonus per whirlwind stage
    pub const WHIRLWIND_STAGE_BONUS: f64 = 0.2;

    /// Upper bound for every count in the config (projectiles, seals, repeats, budgets)
    pub const MAX_CONFIG_COUNT: u32 = 100;
    /// Upper bound for projectile speed after increases (units/s)
    pub const MAX_PROJECTILE_SPEED: f64 = 1_000.0;

    /// Max distance (px) a projectile travels in one substep
    pub const MAX_SUBSTEP_TRAVEL: f64 = 2.0;
    pub const MAX_PROJECTILE_SUBSTEPS: usize = 256;
    /// Wall reflections resolved within a single substep (corners)
    pub const MAX_WALL_BOUNCES: usize = 4;
    /// Gap left between a reflected projectile and the wall (px)
    pub const WALL_SKIN: f64 = 1e-4;
    /// Clearance outside the target rim after a pierce/chain (px)
    pub const PIERCE_NUDGE: f64 = 0.5;
    /// Fork child deflection from the parent heading (radians, 60°)
    pub const FORK_ANGLE: f64 = std::f64::consts::FRAC_PI_3;

    /// Retired cast instances kept for the stats display
    pub const HISTORY_LEN: usize = 10;
    /// Trailing window for hits-per-second (seconds)
    pub const HIT_RATE_WINDOW: f64 = 5.0;

    /// Fraction of the half viewport occupied by the arena
    pub const ARENA_FILL: f64 = 0.9;
}

/// Convert polar (r, theta) to cartesian (x, y)
#[inline]
pub fn polar_to_cartesian(r: f64, theta: f64) -> DVec2 {
    DVec2::new(r * theta.cos(), r * theta.sin())
}

/// Heading of a vector in radians (0 for the zero vector)
#[inline]
pub fn heading(v: DVec2) -> f64 {
    v.y.atan2(v.x)
}
