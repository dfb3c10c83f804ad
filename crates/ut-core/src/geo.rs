//! Vector math shared by the road compiler and the navigation controller.
//!
//! World space is Z-up.  With `right = UP × forward`, a heading of `+X` has
//! `+Y` on its right, and a positive yaw delta turns towards the right hand.

use glam::Quat;

pub use glam::Vec3;

/// World up axis.
pub const UP: Vec3 = Vec3::Z;

/// Linearly map `value` from `input` onto `output`, clamping to the output
/// range.  Either range may be descending.
///
/// A degenerate input range maps everything at or past its end onto
/// `output.1` and the rest onto `output.0`.
pub fn map_range_clamped(value: f32, input: (f32, f32), output: (f32, f32)) -> f32 {
    let span = input.1 - input.0;
    let pct = if span == 0.0 {
        if value >= input.1 { 1.0 } else { 0.0 }
    } else {
        ((value - input.0) / span).clamp(0.0, 1.0)
    };
    output.0 + (output.1 - output.0) * pct
}

/// Heading of `v` in the XY plane, in degrees.
#[inline]
pub fn yaw_deg(v: Vec3) -> f32 {
    v.y.atan2(v.x).to_degrees()
}

/// Heading of the direction from `from` towards `to`, in degrees.
#[inline]
pub fn look_at_yaw_deg(from: Vec3, to: Vec3) -> f32 {
    yaw_deg(to - from)
}

/// Wrap an angle into `(-180, 180]`.
pub fn normalize_axis_deg(angle: f32) -> f32 {
    let mut a = angle % 360.0;
    if a > 180.0 {
        a -= 360.0;
    } else if a <= -180.0 {
        a += 360.0;
    }
    a
}

/// Signed change of heading going from `from_yaw` to `to_yaw`, in `(-180, 180]`.
#[inline]
pub fn delta_yaw_deg(from_yaw: f32, to_yaw: f32) -> f32 {
    normalize_axis_deg(to_yaw - from_yaw)
}

/// Rotate `v` about the up axis by `degrees`.
#[inline]
pub fn rotate_yaw(v: Vec3, degrees: f32) -> Vec3 {
    Quat::from_rotation_z(degrees.to_radians()) * v
}

/// Right-hand vector for a heading.
#[inline]
pub fn right_of(forward: Vec3) -> Vec3 {
    UP.cross(forward)
}
