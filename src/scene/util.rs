use std::ops;

use nalgebra as na;
use na::{vector, Vector3, Vector4};

/// Transformation of a point to homogenous coordinates.
pub fn to_hom_point(v: Vector3<f32>) -> Vector4<f32> {
    return vector![v.x, v.y, v.z, 1.0];
}

/// Transformation of a point from homogenous coordinates.
/// Returns None if w is too close to zero for the division to be meaningful.
pub fn from_hom_point(v: Vector4<f32>) -> Option<Vector3<f32>> {
    if !v.iter().all(|c| c.is_finite()) || v.w.abs() < W_EPSILON {
        return None;
    }
    return Some(vector![v.x / v.w, v.y / v.w, v.z / v.w]);
}

/// Smallest |w| accepted by the perspective divide.
pub const W_EPSILON: f32 = 1e-6;

/// Linear interpolation of two floats, t = 0 gives a.
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    return a + (b - a) * t;
}

/// Floating point rgb color. Channels are nominally in [0, 1], anything outside
/// is saturated only when converting to 8 bit.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const BLACK: Color = Color { r: 0.0, g: 0.0, b: 0.0 };
    pub const WHITE: Color = Color { r: 1.0, g: 1.0, b: 1.0 };

    pub const fn new(r: f32, g: f32, b: f32) -> Color {
        return Color { r, g, b };
    }

    /// Get interpolation between two colors: (1 - t) * c_1 + t * c_2, like glsl mix.
    /// t is unrestricted.
    pub fn mix(color_1: Color, color_2: Color, t: f32) -> Color {
        return Color {
            r: lerp(color_1.r, color_2.r, t),
            g: lerp(color_1.g, color_2.g, t),
            b: lerp(color_1.b, color_2.b, t),
        };
    }

    pub fn clamped(self) -> Color {
        return Color {
            r: self.r.clamp(0.0, 1.0),
            g: self.g.clamp(0.0, 1.0),
            b: self.b.clamp(0.0, 1.0),
        };
    }

    /// Saturating conversion to rgb8.
    pub fn to_rgb8(self) -> [u8; 3] {
        fn channel(value: f32) -> u8 {
            // NaN saturates to 0 through the float to int cast.
            return (value.clamp(0.0, 1.0) * 255.0).round() as u8;
        }
        return [channel(self.r), channel(self.g), channel(self.b)];
    }
}

impl ops::Mul<f32> for Color {
    type Output = Color;

    fn mul(self, rhs: f32) -> Color {
        return Color {
            r: self.r * rhs,
            g: self.g * rhs,
            b: self.b * rhs,
        };
    }
}

impl ops::Add<Color> for Color {
    type Output = Color;

    fn add(self, rhs: Color) -> Color {
        return Color {
            r: self.r + rhs.r,
            g: self.g + rhs.g,
            b: self.b + rhs.b,
        };
    }
}
