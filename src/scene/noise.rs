//! Deterministic 2D coherent noise used by the surface shaders.
//!
//! Gradient noise over a hashed integer lattice: Perlin on a square grid and simplex on a
//! skewed triangular one, optionally summed over several octaves (fractal Brownian motion).
//! A `NoiseConfig` is a plain value with no internal state, so equal inputs always give
//! equal outputs.

use std::f32::consts::FRAC_1_SQRT_2;

use super::util::lerp;

const PRIME_X: i32 = 501125321;
const PRIME_Y: i32 = 1136930381;

// Unit gradient directions picked by the lattice hash.
const GRADIENTS: [(f32, f32); 8] = [
    (1.0, 0.0),
    (-1.0, 0.0),
    (0.0, 1.0),
    (0.0, -1.0),
    (FRAC_1_SQRT_2, FRAC_1_SQRT_2),
    (-FRAC_1_SQRT_2, FRAC_1_SQRT_2),
    (FRAC_1_SQRT_2, -FRAC_1_SQRT_2),
    (-FRAC_1_SQRT_2, -FRAC_1_SQRT_2),
];

/// Lattice the gradients live on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Basis {
    Perlin,
    Simplex,
}

/// Fractal Brownian motion: octaves of the basis noise at growing frequency and shrinking amplitude.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fbm {
    pub octaves: u32,
    pub lacunarity: f32, // Frequency multiplier between octaves.
    pub gain: f32,       // Amplitude multiplier between octaves.
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseConfig {
    pub basis: Basis,
    pub frequency: f32,
    pub seed: i32,
    pub fractal: Option<Fbm>,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        return Self::perlin();
    }
}

impl NoiseConfig {
    /// Single octave Perlin noise at frequency 0.01 and seed 1337.
    pub const fn perlin() -> Self {
        return Self {
            basis: Basis::Perlin,
            frequency: 0.01,
            seed: 1337,
            fractal: None,
        };
    }

    pub const fn simplex_fbm(octaves: u32, lacunarity: f32, gain: f32) -> Self {
        return Self {
            basis: Basis::Simplex,
            frequency: 0.01,
            seed: 1337,
            fractal: Some(Fbm { octaves, lacunarity, gain }),
        };
    }

    /// Noise value at (x, y), in [-1, 1].
    pub fn sample(&self, x: f32, y: f32) -> f32 {
        let x = x * self.frequency;
        let y = y * self.frequency;
        let value = match self.fractal {
            None => single(self.basis, self.seed, x, y),
            Some(fbm) => {
                let mut sum = 0.0;
                let mut amplitude = 1.0;
                let mut total_amplitude = 0.0;
                let mut frequency = 1.0;
                let mut seed = self.seed;
                for _ in 0..fbm.octaves.max(1) {
                    sum += single(self.basis, seed, x * frequency, y * frequency) * amplitude;
                    total_amplitude += amplitude;
                    amplitude *= fbm.gain;
                    frequency *= fbm.lacunarity;
                    seed = seed.wrapping_add(1);
                }
                if total_amplitude > 0.0 { sum / total_amplitude } else { 0.0 }
            }
        };
        return value.clamp(-1.0, 1.0);
    }
}

fn single(basis: Basis, seed: i32, x: f32, y: f32) -> f32 {
    return match basis {
        Basis::Perlin => perlin(seed, x, y),
        Basis::Simplex => simplex(seed, x, y),
    };
}

/// Dot product of the offset from a lattice point with the gradient hashed for that point.
/// Lattice coordinates come pre-multiplied by the primes.
fn gradient_dot(seed: i32, x_primed: i32, y_primed: i32, xd: f32, yd: f32) -> f32 {
    let mut hash = (seed ^ x_primed ^ y_primed).wrapping_mul(0x27d4eb2d);
    hash ^= hash >> 15;
    let (xg, yg) = GRADIENTS[(hash & 7) as usize];
    return xd * xg + yd * yg;
}

fn quintic(t: f32) -> f32 {
    return t * t * t * (t * (t * 6.0 - 15.0) + 10.0);
}

fn perlin(seed: i32, x: f32, y: f32) -> f32 {
    let x0 = x.floor();
    let y0 = y.floor();
    let xd0 = x - x0;
    let yd0 = y - y0;
    let xd1 = xd0 - 1.0;
    let yd1 = yd0 - 1.0;
    let xs = quintic(xd0);
    let ys = quintic(yd0);

    let x0 = (x0 as i32).wrapping_mul(PRIME_X);
    let y0 = (y0 as i32).wrapping_mul(PRIME_Y);
    let x1 = x0.wrapping_add(PRIME_X);
    let y1 = y0.wrapping_add(PRIME_Y);

    let xf0 = lerp(gradient_dot(seed, x0, y0, xd0, yd0), gradient_dot(seed, x1, y0, xd1, yd0), xs);
    let xf1 = lerp(gradient_dot(seed, x0, y1, xd0, yd1), gradient_dot(seed, x1, y1, xd1, yd1), xs);
    // Unit gradients reach at most 1/sqrt(2), stretch to the full range.
    return lerp(xf0, xf1, ys) * std::f32::consts::SQRT_2;
}

fn simplex(seed: i32, x: f32, y: f32) -> f32 {
    const F2: f32 = 0.366_025_4; // (sqrt(3) - 1) / 2
    const G2: f32 = 0.211_324_87; // (3 - sqrt(3)) / 6

    // Skew to find the simplex cell, unskew back to get the offsets.
    let s = (x + y) * F2;
    let i = (x + s).floor();
    let j = (y + s).floor();
    let t = (i + j) * G2;
    let x0 = x - (i - t);
    let y0 = y - (j - t);

    let (i1, j1) = if x0 > y0 { (1, 0) } else { (0, 1) };
    let x1 = x0 - i1 as f32 + G2;
    let y1 = y0 - j1 as f32 + G2;
    let x2 = x0 - 1.0 + 2.0 * G2;
    let y2 = y0 - 1.0 + 2.0 * G2;

    let ip = (i as i32).wrapping_mul(PRIME_X);
    let jp = (j as i32).wrapping_mul(PRIME_Y);

    fn corner(seed: i32, x_primed: i32, y_primed: i32, xd: f32, yd: f32) -> f32 {
        let falloff = 0.5 - xd * xd - yd * yd;
        if falloff <= 0.0 {
            return 0.0;
        }
        let falloff = falloff * falloff;
        return falloff * falloff * gradient_dot(seed, x_primed, y_primed, xd, yd);
    }

    let n0 = corner(seed, ip, jp, x0, y0);
    let n1 = corner(
        seed,
        ip.wrapping_add(PRIME_X.wrapping_mul(i1)),
        jp.wrapping_add(PRIME_Y.wrapping_mul(j1)),
        x1,
        y1,
    );
    let n2 = corner(seed, ip.wrapping_add(PRIME_X), jp.wrapping_add(PRIME_Y), x2, y2);
    return 70.0 * (n0 + n1 + n2);
}
