//! Arena boundaries
//!
//! Four shapes share one collision contract. Closed convex shapes (circle,
//! square) resolve walls by discrete penetration correction; wall-segment
//! shapes (T-corridor, imported polygon) expose their segments so the tick
//! can sweep capsules against them instead.
//!
//! Geometry is built once for a given scale and never mutated; a resize or
//! config change rebuilds the arena.

use glam::DVec2;
use serde::{Deserialize, Serialize};

use super::geometry::{closest_point_on_segment, closest_points_between_segments, GEOM_EPSILON};
use crate::config::{ArenaKind, CorridorDims, SimConfig};
use crate::consts::ARENA_FILL;
use crate::error::{ArenaError, SimError};
use crate::polar_to_cartesian;

/// Points used to export a circular boundary
const CIRCLE_OUTLINE_POINTS: usize = 64;

/// Pixel scale shared by the arena and every entity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldScale {
    /// Pixels per world unit
    pub pixels_per_unit: f64,
    /// Arena radius in pixels (also the unit of normalized positions)
    pub arena_radius_px: f64,
}

impl WorldScale {
    /// Fit an arena of `arena_radius` world units into a viewport
    pub fn from_viewport(width: f64, height: f64, arena_radius: f64) -> Result<Self, SimError> {
        let valid = |v: f64| v.is_finite() && v > 0.0;
        if !valid(width) || !valid(height) || !valid(arena_radius) {
            return Err(SimError::InvalidViewport { width, height });
        }
        let arena_radius_px = width.min(height) / 2.0 * ARENA_FILL;
        Ok(Self {
            pixels_per_unit: arena_radius_px / arena_radius,
            arena_radius_px,
        })
    }

    /// World units to pixels
    #[inline]
    pub fn px(&self, units: f64) -> f64 {
        units * self.pixels_per_unit
    }

    /// Arena-radius-normalized position to pixels
    #[inline]
    pub fn denormalize(&self, p: DVec2) -> DVec2 {
        p * self.arena_radius_px
    }

    /// Pixel position to arena-radius units
    #[inline]
    pub fn normalize(&self, p: DVec2) -> DVec2 {
        p / self.arena_radius_px
    }
}

/// A wall segment (pixels)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub a: DVec2,
    pub b: DVec2,
}

impl Segment {
    pub fn new(a: DVec2, b: DVec2) -> Self {
        Self { a, b }
    }
}

/// Result of a discrete boundary check
#[derive(Debug, Clone, Copy)]
pub struct ArenaContact {
    /// Whether the circle penetrated the boundary
    pub hit: bool,
    /// Unit normal pointing back into the arena
    pub normal: DVec2,
    /// Position with the penetration removed
    pub corrected: DVec2,
}

impl ArenaContact {
    pub fn miss(pos: DVec2) -> Self {
        Self {
            hit: false,
            normal: DVec2::ZERO,
            corrected: pos,
        }
    }
}

/// Arena boundary
#[derive(Debug, Clone)]
pub enum Arena {
    Circle { center: DVec2, radius: f64 },
    Square { min: DVec2, max: DVec2 },
    Corridor { segments: Vec<Segment> },
    Polygon { name: String, segments: Vec<Segment> },
}

impl Arena {
    /// Build the configured arena at the given scale.
    ///
    /// A polygon arena with no loaded definition falls back to a circle.
    pub fn build(config: &SimConfig, scale: &WorldScale, polygon: Option<&PolygonArena>) -> Self {
        let r = scale.arena_radius_px;
        match (config.arena, polygon) {
            (ArenaKind::Circle, _) => Arena::Circle {
                center: DVec2::ZERO,
                radius: r,
            },
            (ArenaKind::Square, _) => Arena::Square {
                min: DVec2::splat(-r),
                max: DVec2::splat(r),
            },
            (ArenaKind::Corridor, _) => Arena::Corridor {
                segments: corridor_segments(&config.corridor, 2.0 * r),
            },
            (ArenaKind::Polygon, Some(def)) => Arena::Polygon {
                name: def.name.clone(),
                segments: def.segments(scale.pixels_per_unit),
            },
            (ArenaKind::Polygon, None) => {
                log::warn!("Polygon arena selected with no polygon loaded, using circle");
                Arena::Circle {
                    center: DVec2::ZERO,
                    radius: r,
                }
            }
        }
    }

    pub fn kind(&self) -> ArenaKind {
        match self {
            Arena::Circle { .. } => ArenaKind::Circle,
            Arena::Square { .. } => ArenaKind::Square,
            Arena::Corridor { .. } => ArenaKind::Corridor,
            Arena::Polygon { .. } => ArenaKind::Polygon,
        }
    }

    /// Wall segments for shapes that must be swept rather than corrected
    pub fn segments(&self) -> Option<&[Segment]> {
        match self {
            Arena::Corridor { segments } | Arena::Polygon { segments, .. } => Some(segments),
            Arena::Circle { .. } | Arena::Square { .. } => None,
        }
    }

    /// Discrete penetration check for a circle at `pos`
    pub fn collide_circle(&self, pos: DVec2, radius: f64) -> ArenaContact {
        match self {
            Arena::Circle {
                center,
                radius: arena_radius,
            } => {
                let limit = arena_radius - radius;
                let offset = pos - *center;
                let dist = offset.length();
                if dist <= limit || dist < GEOM_EPSILON {
                    return ArenaContact::miss(pos);
                }
                let outward = offset / dist;
                ArenaContact {
                    hit: true,
                    normal: -outward,
                    corrected: *center + outward * limit.max(0.0),
                }
            }
            Arena::Square { min, max } => {
                let mut corrected = pos;
                let mut normal = DVec2::ZERO;
                if pos.x - radius < min.x {
                    corrected.x = min.x + radius;
                    normal.x += 1.0;
                } else if pos.x + radius > max.x {
                    corrected.x = max.x - radius;
                    normal.x -= 1.0;
                }
                if pos.y - radius < min.y {
                    corrected.y = min.y + radius;
                    normal.y += 1.0;
                } else if pos.y + radius > max.y {
                    corrected.y = max.y - radius;
                    normal.y -= 1.0;
                }
                if normal == DVec2::ZERO {
                    return ArenaContact::miss(pos);
                }
                ArenaContact {
                    hit: true,
                    normal: normal.normalize(),
                    corrected,
                }
            }
            Arena::Corridor { segments } | Arena::Polygon { segments, .. } => {
                collide_segments(segments, pos, radius)
            }
        }
    }

    /// Boundary as point chains for display/export (pixels)
    pub fn outline(&self) -> Vec<Vec<DVec2>> {
        match self {
            Arena::Circle { center, radius } => {
                let mut ring: Vec<DVec2> = (0..CIRCLE_OUTLINE_POINTS)
                    .map(|i| {
                        let theta = i as f64 / CIRCLE_OUTLINE_POINTS as f64 * std::f64::consts::TAU;
                        *center + polar_to_cartesian(*radius, theta)
                    })
                    .collect();
                ring.push(ring[0]);
                vec![ring]
            }
            Arena::Square { min, max } => vec![vec![
                *min,
                DVec2::new(max.x, min.y),
                *max,
                DVec2::new(min.x, max.y),
                *min,
            ]],
            Arena::Corridor { segments } | Arena::Polygon { segments, .. } => {
                segments.iter().map(|s| vec![s.a, s.b]).collect()
            }
        }
    }
}

/// Push a circle out of the deepest-penetrated segment
fn collide_segments(segments: &[Segment], pos: DVec2, radius: f64) -> ArenaContact {
    let nearest = segments
        .iter()
        .map(|s| (s, closest_point_on_segment(pos, s.a, s.b)))
        .map(|(s, closest)| (s, closest, pos.distance(closest)))
        .filter(|&(_, _, dist)| dist < radius)
        .min_by(|a, b| a.2.total_cmp(&b.2));

    let Some((segment, closest, dist)) = nearest else {
        return ArenaContact::miss(pos);
    };

    let normal = if dist > GEOM_EPSILON {
        (pos - closest) / dist
    } else {
        // Center on the wall line: no side information, use the segment normal
        (segment.b - segment.a).perp().normalize_or_zero()
    };
    ArenaContact {
        hit: true,
        normal,
        corrected: closest + normal * radius,
    }
}

/// Hollow-T outline scaled to `target_height` pixels, centered on the origin.
///
/// The stem opens into the bar: no wall crosses the junction.
pub fn corridor_segments(dims: &CorridorDims, target_height: f64) -> Vec<Segment> {
    let total_height = (dims.bar_height + dims.stem_length).max(GEOM_EPSILON);
    let k = target_height / total_height;

    let half_bar = dims.bar_width * k / 2.0;
    let half_stem = dims.stem_width * k / 2.0;
    let top = target_height / 2.0;
    let junction = top - dims.bar_height * k;
    let bottom = -target_height / 2.0;

    let outline = [
        DVec2::new(-half_bar, top),
        DVec2::new(half_bar, top),
        DVec2::new(half_bar, junction),
        DVec2::new(half_stem, junction),
        DVec2::new(half_stem, bottom),
        DVec2::new(-half_stem, bottom),
        DVec2::new(-half_stem, junction),
        DVec2::new(-half_bar, junction),
    ];
    closed_chain(&outline)
}

fn closed_chain(points: &[DVec2]) -> Vec<Segment> {
    (0..points.len())
        .map(|i| Segment::new(points[i], points[(i + 1) % points.len()]))
        .collect()
}

/// Imported arena point (world units, origin-centered)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArenaPoint {
    pub x: f64,
    pub y: f64,
}

/// Polygon arena as written by the arena authoring tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolygonArena {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub points: Vec<ArenaPoint>,
    /// Author-facing edge lengths; carried along, never checked
    #[serde(default)]
    pub distances: Vec<f64>,
}

impl PolygonArena {
    /// Parse and validate an arena definition
    pub fn from_json(json: &str) -> Result<Self, ArenaError> {
        let def: PolygonArena = serde_json::from_str(json)?;
        def.validate()?;
        log::info!(
            "Loaded polygon arena '{}' ({} points)",
            def.name,
            def.points.len()
        );
        Ok(def)
    }

    /// Check type tag, vertex count, finiteness and simplicity
    pub fn validate(&self) -> Result<(), ArenaError> {
        if self.kind != "polygon" {
            return Err(ArenaError::UnsupportedType(self.kind.clone()));
        }
        let n = self.points.len();
        if n < 3 {
            return Err(ArenaError::TooFewPoints(n));
        }
        if let Some(index) = self
            .points
            .iter()
            .position(|p| !p.x.is_finite() || !p.y.is_finite())
        {
            return Err(ArenaError::NonFinitePoint { index });
        }

        let edges = self.segments(1.0);
        for first in 0..n {
            for second in (first + 1)..n {
                // Adjacent edges share a vertex
                if second == first + 1 || (first == 0 && second == n - 1) {
                    continue;
                }
                let (e1, e2) = (edges[first], edges[second]);
                let (c1, c2) = closest_points_between_segments(e1.a, e1.b, e2.a, e2.b);
                if c1.distance(c2) < GEOM_EPSILON {
                    return Err(ArenaError::SelfIntersecting { first, second });
                }
            }
        }
        Ok(())
    }

    /// Boundary segments closing back to the first point, scaled to pixels
    pub fn segments(&self, pixels_per_unit: f64) -> Vec<Segment> {
        let points: Vec<DVec2> = self
            .points
            .iter()
            .map(|p| DVec2::new(p.x, p.y) * pixels_per_unit)
            .collect();
        closed_chain(&points)
    }
}
