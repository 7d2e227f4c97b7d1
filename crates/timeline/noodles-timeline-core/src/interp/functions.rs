//! Interpolation helpers:
//! - lerp_f32 (linear)
//! - quadratic/cubic Bezier basis functions
//! - frame-parameterized Bezier evaluation: solve the curve parameter for a
//!   frame position first, then read the value component at that parameter
//!
//! Points are `[frame, value]` pairs in timeline space.

/// Bisection steps used to invert the frame component of a curve.
const SOLVE_ITERATIONS: usize = 32;
/// Frame-space tolerance for the inversion.
const SOLVE_EPSILON: f32 = 1e-5;

/// Linear interpolation of scalars.
#[inline]
pub fn lerp_f32(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Quadratic Bezier basis function.
#[inline]
pub fn quadratic_bezier(p0: f32, p1: f32, p2: f32, t: f32) -> f32 {
    let u = 1.0 - t;
    u * u * p0 + 2.0 * u * t * p1 + t * t * p2
}

/// Cubic Bezier basis function.
#[inline]
pub fn cubic_bezier(p0: f32, p1: f32, p2: f32, p3: f32, t: f32) -> f32 {
    let u = 1.0 - t;
    u * u * u * p0 + 3.0 * u * u * t * p1 + 3.0 * u * t * t * p2 + t * t * t * p3
}

/// Find `t` in [0,1] with `x_of(t) == x`, assuming `x_of` is non-decreasing.
fn solve_parameter(x: f32, x_of: impl Fn(f32) -> f32) -> f32 {
    let mut lo = 0.0f32;
    let mut hi = 1.0f32;
    let mut mid = 0.5f32;
    for _ in 0..SOLVE_ITERATIONS {
        let at = x_of(mid);
        if (at - x).abs() < SOLVE_EPSILON {
            break;
        }
        if at < x {
            lo = mid;
        } else {
            hi = mid;
        }
        mid = 0.5 * (lo + hi);
    }
    mid
}

/// Keep a control point's frame inside the segment so the frame component
/// stays monotonic and the inversion is well defined.
#[inline]
fn clamp_control(p: [f32; 2], start: f32, end: f32) -> [f32; 2] {
    [p[0].clamp(start, end), p[1]]
}

/// Value of the quadratic curve `p0 -> c -> p2` at the frame lying `ratio`
/// of the way from `p0` to `p2`.
pub fn quadratic_value(p0: [f32; 2], c: [f32; 2], p2: [f32; 2], ratio: f32) -> f32 {
    let ratio = ratio.clamp(0.0, 1.0);
    if ratio == 0.0 {
        return p0[1];
    }
    if ratio == 1.0 {
        return p2[1];
    }
    let c = clamp_control(c, p0[0], p2[0]);
    let x = lerp_f32(p0[0], p2[0], ratio);
    let t = solve_parameter(x, |t| quadratic_bezier(p0[0], c[0], p2[0], t));
    quadratic_bezier(p0[1], c[1], p2[1], t)
}

/// Value of the cubic curve `p0 -> c1 -> c2 -> p3` at the frame lying
/// `ratio` of the way from `p0` to `p3`.
pub fn cubic_value(p0: [f32; 2], c1: [f32; 2], c2: [f32; 2], p3: [f32; 2], ratio: f32) -> f32 {
    let ratio = ratio.clamp(0.0, 1.0);
    if ratio == 0.0 {
        return p0[1];
    }
    if ratio == 1.0 {
        return p3[1];
    }
    let c1 = clamp_control(c1, p0[0], p3[0]);
    let c2 = clamp_control(c2, p0[0], p3[0]);
    let x = lerp_f32(p0[0], p3[0], ratio);
    let t = solve_parameter(x, |t| cubic_bezier(p0[0], c1[0], c2[0], p3[0], t));
    cubic_bezier(p0[1], c1[1], c2[1], p3[1], t)
}
