//! Continuous collision kernel
//!
//! Swept tests for a moving circle against the target (circle) and against
//! walls (segments thickened into capsules), plus clamped closest-point
//! helpers. All functions are pure; times of impact are fractions of the
//! displacement `d`, in `[0, 1]`.

use glam::DVec2;

/// Below this, lengths and determinants are treated as zero
pub const GEOM_EPSILON: f64 = 1e-9;

/// Earliest contact along a sweep
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepHit {
    /// Fraction of the displacement at first contact
    pub t: f64,
    /// Unit surface normal at contact, pointing toward the moving circle
    pub normal: DVec2,
}

/// Time of impact of a point moving from `p0` by `d` against a circle of
/// combined radius `radius` centered at `center`.
///
/// Starting inside (or touching) the circle is an immediate hit at `t = 0`.
/// Returns `None` with no real root in range or no motion.
pub fn swept_circle_vs_circle_toi(p0: DVec2, d: DVec2, center: DVec2, radius: f64) -> Option<f64> {
    let m = p0 - center;
    let c = m.length_squared() - radius * radius;
    if c <= 0.0 {
        return Some(0.0);
    }

    let a = d.length_squared();
    if a < GEOM_EPSILON {
        return None;
    }
    let b = 2.0 * m.dot(d);
    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        return None;
    }

    // Outside the circle both roots share a sign, so the smaller one decides
    let t = (-b - disc.sqrt()) / (2.0 * a);
    (0.0..=1.0).contains(&t).then_some(t)
}

/// Time of impact of a circle of radius `radius` moving from `p0` by `d`
/// against the segment `a..b`.
///
/// The segment is treated as a capsule: two offset lines at `±radius` bounded
/// by the segment's extent, plus a circular cap at each end. Only contacts the
/// circle is moving into are reported, so a circle resting against a wall and
/// moving away is not re-hit. A zero-length segment is a plain circle test.
pub fn swept_circle_vs_capsule_toi(
    p0: DVec2,
    d: DVec2,
    a: DVec2,
    b: DVec2,
    radius: f64,
) -> Option<SweepHit> {
    let seg = b - a;
    let len_sq = seg.length_squared();
    if len_sq < GEOM_EPSILON {
        return cap_hit(p0, d, a, radius);
    }

    let n = seg.perp() / len_sq.sqrt();
    let mut best: Option<SweepHit> = None;

    for normal in [n, -n] {
        let dist0 = (p0 - a).dot(normal);
        let approach = d.dot(normal);
        // Must start on this side and be closing on the line
        if dist0 < 0.0 || approach >= -GEOM_EPSILON {
            continue;
        }
        let t = ((radius - dist0) / approach).max(0.0);
        if t > 1.0 {
            continue;
        }
        let u = (p0 + d * t - a).dot(seg) / len_sq;
        if !(0.0..=1.0).contains(&u) {
            continue;
        }
        best = earliest(best, SweepHit { t, normal });
    }

    for cap in [a, b] {
        if let Some(hit) = cap_hit(p0, d, cap, radius) {
            best = earliest(best, hit);
        }
    }

    best
}

/// Swept test against one end cap, reporting only approaching contacts
fn cap_hit(p0: DVec2, d: DVec2, cap: DVec2, radius: f64) -> Option<SweepHit> {
    let t = swept_circle_vs_circle_toi(p0, d, cap, radius)?;
    let normal = (p0 + d * t - cap).normalize_or_zero();
    if normal == DVec2::ZERO || d.dot(normal) >= 0.0 {
        return None;
    }
    Some(SweepHit { t, normal })
}

#[inline]
fn earliest(best: Option<SweepHit>, candidate: SweepHit) -> Option<SweepHit> {
    match best {
        Some(hit) if hit.t <= candidate.t => Some(hit),
        _ => Some(candidate),
    }
}

/// Closest point to `p` on the segment `a..b`
pub fn closest_point_on_segment(p: DVec2, a: DVec2, b: DVec2) -> DVec2 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq < GEOM_EPSILON {
        return a;
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    a + ab * t
}

/// Closest points between segments `p1..q1` and `p2..q2`.
///
/// Returns `(on_first, on_second)`. Degenerate (point) segments and parallel
/// pairs fall back to clamped projections.
pub fn closest_points_between_segments(
    p1: DVec2,
    q1: DVec2,
    p2: DVec2,
    q2: DVec2,
) -> (DVec2, DVec2) {
    let d1 = q1 - p1;
    let d2 = q2 - p2;
    let r = p1 - p2;
    let a = d1.length_squared();
    let e = d2.length_squared();
    let f = d2.dot(r);

    if a <= GEOM_EPSILON && e <= GEOM_EPSILON {
        return (p1, p2);
    }

    let (s, t) = if a <= GEOM_EPSILON {
        (0.0, (f / e).clamp(0.0, 1.0))
    } else {
        let c = d1.dot(r);
        if e <= GEOM_EPSILON {
            ((-c / a).clamp(0.0, 1.0), 0.0)
        } else {
            let b = d1.dot(d2);
            let denom = a * e - b * b;
            let s = if denom > GEOM_EPSILON {
                ((b * f - c * e) / denom).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let t = (b * s + f) / e;
            if t < 0.0 {
                ((-c / a).clamp(0.0, 1.0), 0.0)
            } else if t > 1.0 {
                (((b - c) / a).clamp(0.0, 1.0), 1.0)
            } else {
                (s, t)
            }
        }
    };

    (p1 + d1 * s, p2 + d2 * t)
}

/// Reflect velocity off a surface
///
/// Standard reflection: v' = v - 2(v·n)n. Preserves speed for unit `n`.
#[inline]
pub fn reflect_velocity(velocity: DVec2, normal: DVec2) -> DVec2 {
    velocity - 2.0 * velocity.dot(normal) * normal
}
