//! Error types
//!
//! Configuration faults never surface here: they fall back to defaults in
//! `config`. Only arena import and core construction can fail.

use thiserror::Error;

/// Problems with an imported polygon arena
#[derive(Debug, Error)]
pub enum ArenaError {
    #[error("invalid arena json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported arena type `{0}` (expected `polygon`)")]
    UnsupportedType(String),
    #[error("polygon needs at least 3 points, got {0}")]
    TooFewPoints(usize),
    #[error("polygon point {index} is not a finite coordinate")]
    NonFinitePoint { index: usize },
    #[error("polygon edges {first} and {second} intersect")]
    SelfIntersecting { first: usize, second: usize },
}

/// Failure to build a simulation core
#[derive(Debug, Error)]
pub enum SimError {
    #[error("viewport {width}x{height} cannot hold an arena")]
    InvalidViewport { width: f64, height: f64 },
    #[error(transparent)]
    Arena(#[from] ArenaError),
}
