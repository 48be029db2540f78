//! Deterministic simulation module
//!
//! All physics and scheduling lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (spawn order)
//! - No rendering or platform dependencies

pub mod arena;
pub mod geometry;
pub mod ledger;
pub mod projectile;
pub mod resolver;
pub mod scheduler;
pub mod state;
pub mod stats;
pub mod tick;

pub use arena::{Arena, ArenaContact, ArenaPoint, PolygonArena, Segment, WorldScale};
pub use geometry::{
    SweepHit, closest_point_on_segment, closest_points_between_segments, reflect_velocity,
    swept_circle_vs_capsule_toi, swept_circle_vs_circle_toi,
};
pub use ledger::{HitGroupKey, HitLedger};
pub use projectile::{BehaviorBudget, HitGroupTag, Projectile};
pub use resolver::{HitBehavior, HitResolution, HitTarget, resolve_target_hit};
pub use scheduler::{CastInstance, CastScheduler, Emission};
pub use state::{Entity, EntityRole, SimState};
pub use stats::{EntityView, HitStats, InstanceRecord, ProjectileView, Snapshot};
pub use tick::tick;
