use std::fmt;
use std::str::FromStr;

use nalgebra as na;
use na::{matrix, vector, Matrix4, Point3, Vector3};
use rand::Rng;

use super::noise::NoiseConfig;
use super::raster::Fragment;
use super::util::{from_hom_point, to_hom_point, Color};
use crate::error::RenderError;

/// Per-vertex attributes carried through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub position: Vector3<f32>,          // Model space before the vertex shader, screen space after it.
    pub normal: Vector3<f32>,            // World space after the vertex shader.
    pub tex_coords: Vector3<f32>,
    pub world_position: Vector3<f32>,
    pub original_position: Vector3<f32>, // Model space, never touched by the vertex shader.
}

impl Vertex {
    pub fn new(position: Vector3<f32>, normal: Vector3<f32>, tex_coords: Vector3<f32>) -> Self {
        return Self {
            position,
            normal,
            tex_coords,
            world_position: position,
            original_position: position,
        };
    }
}

/// Transforms of one draw call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Uniforms {
    pub model: Matrix4<f32>,
    pub view: Matrix4<f32>,
    pub projection: Matrix4<f32>,
    pub viewport: Matrix4<f32>,
}

impl Default for Uniforms {
    fn default() -> Self {
        return Self {
            model: Matrix4::identity(),
            view: Matrix4::identity(),
            projection: Matrix4::identity(),
            viewport: Matrix4::identity(),
        };
    }
}

/// Maps normalized device coordinates to the frame: x from [-1, 1] to [0, width],
/// y to [0, height] and z to [0.25, 0.75].
pub fn viewport_matrix(width: u32, height: u32) -> Matrix4<f32> {
    // Scale by (w / 2, h / 2, 1 / 2) after a translation by (1, 1, 1 / 2).
    let w = width as f32 / 2.0;
    let h = height as f32 / 2.0;
    return matrix![w,   0.0, 0.0, w;
                   0.0, h,   0.0, h;
                   0.0, 0.0, 0.5, 0.25;
                   0.0, 0.0, 0.0, 1.0];
}

/// Right handed perspective projection, fov is the vertical field of view in degrees.
pub fn perspective_matrix(fov_degrees: f32, aspect: f32, near: f32, far: f32) -> Matrix4<f32> {
    return Matrix4::new_perspective(aspect, fov_degrees.to_radians(), near, far);
}

/// View matrix of a camera placed at `eye` and looking at `target`.
pub fn look_at(eye: Vector3<f32>, target: Vector3<f32>, up: Vector3<f32>) -> Matrix4<f32> {
    return Matrix4::look_at_rh(&Point3::from(eye), &Point3::from(target), &up);
}

/// Takes a model space vertex to screen space.
/// Returns None if the vertex can't be projected (w close to zero or non-finite values),
/// in which case its triangle has to be skipped.
pub fn vertex_shader(vertex: &Vertex, uniforms: &Uniforms) -> Option<Vertex> {
    let clip = uniforms.projection * uniforms.view * uniforms.model * to_hom_point(vertex.position);
    let ndc = from_hom_point(clip)?;
    let screen = uniforms.viewport * to_hom_point(ndc);

    // Not interested in translation when transforming normals.
    let normal = uniforms.model.transform_vector(&vertex.normal);
    let normal = normal.try_normalize(f32::EPSILON).unwrap_or(normal);

    let world_position = uniforms.model.transform_point(&Point3::from(vertex.position)).coords;

    return Some(Vertex {
        position: vector![screen.x, screen.y, screen.z],
        normal,
        tex_coords: vertex.tex_coords,
        world_position,
        original_position: vertex.original_position,
    });
}

/// Noise read by a surface shader at (uv + offset) * scale and remapped from [-1, 1].
struct SurfaceNoise {
    offset: (f32, f32),
    scale: f32,
    config: NoiseConfig,
}

impl SurfaceNoise {
    fn sample(&self, u: f32, v: f32) -> f32 {
        return self.config.sample((u + self.offset.0) * self.scale, (v + self.offset.1) * self.scale);
    }
}

// Rocky surface also offsets by the uv itself, (uv + uv * 200) * 100.
const ROCKY_UV_OFFSET: f32 = 200.0;
const ROCKY_NOISE: SurfaceNoise = SurfaceNoise { offset: (0.0, 0.0), scale: 100.0, config: NoiseConfig::perlin() };
const GAS_NOISE: SurfaceNoise = SurfaceNoise { offset: (1000.0, 1000.0), scale: 900.0, config: NoiseConfig::perlin() };
const MOON_NOISE: SurfaceNoise = SurfaceNoise { offset: (5000.0, 8000.0), scale: 500.0, config: NoiseConfig::perlin() };
const VOLCANIC_NOISE: SurfaceNoise = MOON_NOISE;
const ICE_NOISE: SurfaceNoise = MOON_NOISE;
const CRYSTAL_NOISE: SurfaceNoise = SurfaceNoise {
    offset: (5000.0, 8000.0),
    scale: 500.0,
    config: NoiseConfig::simplex_fbm(6, 2.0, 0.5),
};

/// Grey surface broken up by darker rock.
pub fn rocky(mut fragment: Fragment) -> Fragment {
    let surface_color = Color::new(0.4, 0.4, 0.4);
    let rock_color = Color::new(0.6, 0.6, 0.6);
    let texture_color = Color::new(0.2, 0.2, 0.2);

    let (u, v) = (fragment.original_position.x, fragment.original_position.y);
    let noise = ROCKY_NOISE.sample(u + u * ROCKY_UV_OFFSET, v + v * ROCKY_UV_OFFSET);
    let noise = (noise + 1.2) * 0.7;

    let surface = Color::mix(surface_color, rock_color, noise);
    let texture = Color::mix(rock_color, texture_color, noise);
    fragment.color = Color::mix(surface, texture, noise) * fragment.intensity;
    return fragment;
}

/// Bands of gas, tinted by the position on the body.
pub fn gaseous(mut fragment: Fragment) -> Fragment {
    let u = fragment.original_position.x * 2.0 - 1.0;
    let v = fragment.original_position.y * 2.0 - 1.0;
    let noise = (GAS_NOISE.sample(u, v) + 1.2) * 0.9;

    let cloud_color = Color::new(0.5 + u + noise, 0.5 + v + noise, 0.5 - u + noise);
    fragment.color = cloud_color * fragment.intensity;
    return fragment;
}

/// Flickering star. The only shader, whose result is not a function of the fragment,
/// so the source of randomness is injected.
pub fn star<R: Rng + ?Sized>(mut fragment: Fragment, rng: &mut R) -> Fragment {
    let phase: f32 = rng.gen();
    let base = Color::new(rng.gen(), rng.gen(), rng.gen());
    let color = base + Color::new(phase.sin(), phase.cos(), (phase * 0.5).sin());

    // Flare, flicker and glow.
    let mut intensity = 1.0 + rng.gen_range(0..5) as f32 / 10.0;
    intensity *= 0.8 + rng.gen_range(0..4) as f32 / 10.0;
    intensity *= 1.0 + rng.gen_range(0..2) as f32 / 10.0;

    fragment.color = color.clamped() * intensity.max(1.0);
    return fragment;
}

/// Dusty grey moon.
pub fn moon(mut fragment: Fragment) -> Fragment {
    let rock_color = Color::new(0.7, 0.7, 0.7);
    let surface_color = Color::new(0.4, 0.4, 0.4);

    let noise = MOON_NOISE.sample(fragment.original_position.x, fragment.original_position.y);
    let noise = (noise + 1.0) * 0.5;

    fragment.color = Color::mix(rock_color, surface_color, noise) * fragment.intensity;
    return fragment;
}

/// Lava seeping through rock. Glows regardless of how the fragment is lit.
pub fn volcanic(mut fragment: Fragment) -> Fragment {
    let lava_color = Color::new(1.0, 0.1, 0.0);
    let rock_color = Color::new(0.6, 0.6, 0.6);

    let noise = VOLCANIC_NOISE.sample(fragment.original_position.x, fragment.original_position.y);
    let noise = (noise + 1.0) * 0.5;
    let glow = 1.0 + noise * 0.2;

    fragment.color = Color::mix(rock_color, lava_color, noise) * glow;
    return fragment;
}

/// Blue crystal with fractal facets.
pub fn crystal(mut fragment: Fragment) -> Fragment {
    let crystal_color = Color::new(0.0, 0.5, 1.0);

    let noise = CRYSTAL_NOISE.sample(fragment.original_position.x, fragment.original_position.y);
    let noise = (noise + 1.0) * 0.5;

    fragment.color = crystal_color * noise * fragment.intensity;
    return fragment;
}

/// Pale ice with highlights drifting over time, `time` in seconds.
pub fn icy(mut fragment: Fragment, time: f32) -> Fragment {
    let base_color = Color::new(0.7, 0.9, 1.0);

    let noise = ICE_NOISE.sample(fragment.original_position.x, fragment.original_position.y);
    let noise = (noise + 1.0) * 0.5;

    let drift = Color::new((time * 2.0).sin(), (time * 1.4).cos(), time.sin()) * 0.1;
    fragment.color = (base_color * noise + drift) * fragment.intensity;
    return fragment;
}

/// Fragment shader of a mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderKind {
    Rocky,
    Gaseous,
    Star,
    Moon,
    Volcanic,
    Crystal,
    Icy,
}

impl ShaderKind {
    pub const ALL: [ShaderKind; 7] = [
        ShaderKind::Rocky,
        ShaderKind::Gaseous,
        ShaderKind::Star,
        ShaderKind::Moon,
        ShaderKind::Volcanic,
        ShaderKind::Crystal,
        ShaderKind::Icy,
    ];

    pub fn name(self) -> &'static str {
        return match self {
            ShaderKind::Rocky => "rocky",
            ShaderKind::Gaseous => "gaseous",
            ShaderKind::Star => "star",
            ShaderKind::Moon => "moon",
            ShaderKind::Volcanic => "volcanic",
            ShaderKind::Crystal => "crystal",
            ShaderKind::Icy => "icy",
        };
    }

    /// Applies the shader to a fragment. `time` is the frame time in seconds, `rng` feeds the star.
    pub fn shade<R: Rng + ?Sized>(self, fragment: Fragment, time: f32, rng: &mut R) -> Fragment {
        return match self {
            ShaderKind::Rocky => rocky(fragment),
            ShaderKind::Gaseous => gaseous(fragment),
            ShaderKind::Star => star(fragment, rng),
            ShaderKind::Moon => moon(fragment),
            ShaderKind::Volcanic => volcanic(fragment),
            ShaderKind::Crystal => crystal(fragment),
            ShaderKind::Icy => icy(fragment, time),
        };
    }
}

impl FromStr for ShaderKind {
    type Err = RenderError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        return ShaderKind::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(name.trim()))
            .ok_or_else(|| RenderError::UnknownShader(name.to_string()));
    }
}

impl fmt::Display for ShaderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return f.write_str(self.name());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn fragment_at(original_position: Vector3<f32>) -> Fragment {
        return Fragment {
            x: 0,
            y: 0,
            depth: 0.5,
            color: Color::WHITE,
            intensity: 1.0,
            normal: vector![0.0, 0.0, 1.0],
            world_position: original_position,
            original_position,
            tex_coords: Vector3::zeros(),
            barycentric: vector![1.0, 0.0, 0.0],
        };
    }

    fn probe_positions() -> Vec<Vector3<f32>> {
        return (0..25)
            .map(|i| {
                let t = i as f32 / 24.0;
                vector![t * 2.0 - 1.0, (t * 7.0).sin(), (t * 3.0).cos()]
            })
            .collect();
    }

    #[test]
    fn vertex_shader_maps_to_screen() {
        let uniforms = Uniforms {
            viewport: viewport_matrix(100, 80),
            ..Default::default()
        };
        let vertex = Vertex::new(vector![0.0, 0.0, 0.0], vector![0.0, 0.0, 2.0], vector![0.3, 0.4, 0.0]);
        let t = vertex_shader(&vertex, &uniforms).unwrap();
        assert_eq!(t.position, vector![50.0, 40.0, 0.25]);
        assert_eq!(t.normal, vector![0.0, 0.0, 1.0]);
        assert_eq!(t.tex_coords, vertex.tex_coords);

        let corner = Vertex::new(vector![1.0, 1.0, 1.0], Vector3::zeros(), Vector3::zeros());
        let t = vertex_shader(&corner, &uniforms).unwrap();
        assert_eq!(t.position, vector![100.0, 80.0, 0.75]);
    }

    #[test]
    fn vertex_shader_keeps_original_position() {
        let model = Matrix4::new_translation(&vector![2.0, 0.0, 0.0]) * Matrix4::new_scaling(0.5);
        let uniforms = Uniforms {
            model,
            view: look_at(vector![0.0, 0.0, 4.0], Vector3::zeros(), Vector3::y()),
            projection: perspective_matrix(60.0, 1.25, 0.1, 100.0),
            viewport: viewport_matrix(1000, 800),
        };
        let vertex = Vertex::new(vector![1.0, 0.0, 0.0], vector![1.0, 0.0, 0.0], Vector3::zeros());
        let t = vertex_shader(&vertex, &uniforms).unwrap();
        assert_eq!(t.original_position, vector![1.0, 0.0, 0.0]);
        assert!((t.world_position - vector![2.5, 0.0, 0.0]).norm() < 1e-5);
        assert!((t.normal - vector![1.0, 0.0, 0.0]).norm() < 1e-5);
        // Right of the center of the screen, in front of the camera.
        assert!(t.position.x > 500.0 && t.position.x < 1000.0);
        assert!((t.position.y - 400.0).abs() < 1e-2);
        assert!(t.position.z > 0.25 && t.position.z < 0.75);
    }

    #[test]
    fn vertex_shader_rejects_zero_w() {
        let mut projection = Matrix4::identity();
        projection[(3, 3)] = 0.0;
        let uniforms = Uniforms { projection, ..Default::default() };
        let vertex = Vertex::new(vector![1.0, 2.0, 0.0], Vector3::z(), Vector3::zeros());
        assert!(vertex_shader(&vertex, &uniforms).is_none());
    }

    #[test]
    fn nearer_points_get_smaller_depth() {
        let uniforms = Uniforms {
            view: look_at(vector![0.0, 0.0, 4.0], Vector3::zeros(), Vector3::y()),
            projection: perspective_matrix(90.0, 1.0, 0.1, 100.0),
            viewport: viewport_matrix(100, 100),
            ..Default::default()
        };
        let near = Vertex::new(vector![0.0, 0.0, 1.0], Vector3::z(), Vector3::zeros());
        let far = Vertex::new(vector![0.0, 0.0, -1.0], Vector3::z(), Vector3::zeros());
        let near = vertex_shader(&near, &uniforms).unwrap();
        let far = vertex_shader(&far, &uniforms).unwrap();
        assert!(near.position.z < far.position.z);
    }

    #[test]
    fn deterministic_shaders_repeat() {
        let mut rng = StdRng::seed_from_u64(1);
        for kind in ShaderKind::ALL.into_iter().filter(|k| *k != ShaderKind::Star) {
            for position in probe_positions() {
                let a = kind.shade(fragment_at(position), 1.5, &mut rng);
                let b = kind.shade(fragment_at(position), 1.5, &mut rng);
                assert_eq!(a.color, b.color, "{} is not deterministic", kind);
                assert!(a.color.r.is_finite() && a.color.g.is_finite() && a.color.b.is_finite());
            }
        }
    }

    #[test]
    fn shaders_only_touch_color() {
        let mut rng = StdRng::seed_from_u64(2);
        for kind in ShaderKind::ALL {
            let fragment = fragment_at(vector![0.3, -0.2, 0.9]);
            let mut shaded = kind.shade(fragment, 0.0, &mut rng);
            shaded.color = fragment.color;
            assert_eq!(shaded, fragment);
        }
    }

    #[test]
    fn lit_shaders_follow_intensity() {
        let mut rng = StdRng::seed_from_u64(3);
        for kind in [ShaderKind::Rocky, ShaderKind::Gaseous, ShaderKind::Moon, ShaderKind::Crystal, ShaderKind::Icy] {
            let mut dark = fragment_at(vector![0.1, 0.2, 0.3]);
            dark.intensity = 0.0;
            assert_eq!(kind.shade(dark, 0.7, &mut rng).color, Color::BLACK);
        }
        // Lava glows in the dark.
        let mut dark = fragment_at(vector![0.1, 0.2, 0.3]);
        dark.intensity = 0.0;
        assert!(volcanic(dark).color.r > 0.5);
    }

    #[test]
    fn surface_shaders_vary_over_the_surface() {
        for shader in [rocky, moon, volcanic, crystal] {
            let colors: Vec<Color> = probe_positions().into_iter().map(|p| shader(fragment_at(p)).color).collect();
            assert!(colors.iter().any(|c| *c != colors[0]));
        }
    }

    #[test]
    fn ice_drifts_with_time() {
        let fragment = fragment_at(vector![0.4, 0.4, 0.0]);
        assert_ne!(icy(fragment, 0.0).color, icy(fragment, 1.0).color);
        assert_eq!(icy(fragment, 1.0).color, icy(fragment, 1.0).color);
    }

    #[test]
    fn star_stays_in_bounds() {
        let mut rng = StdRng::seed_from_u64(4);
        let fragment = fragment_at(vector![0.0, 0.0, 0.0]);
        // Largest possible flare is 1.4 * 1.1 * 1.1.
        let max = 1.4 * 1.1 * 1.1 + 1e-4;
        for _ in 0..1000 {
            let c = star(fragment, &mut rng).color;
            for channel in [c.r, c.g, c.b] {
                assert!(channel >= 0.0 && channel <= max);
            }
        }
        // Cosine of the phase keeps green saturated at least at the minimum intensity of 1.
        let c = star(fragment, &mut rng).color;
        assert!(c.g >= 0.5);
    }

    #[test]
    fn star_is_reproducible_with_the_same_seed() {
        let fragment = fragment_at(vector![0.0, 0.0, 0.0]);
        let a = star(fragment, &mut StdRng::seed_from_u64(9));
        let b = star(fragment, &mut StdRng::seed_from_u64(9));
        assert_eq!(a, b);
    }

    #[test]
    fn shader_names_round_trip() {
        for kind in ShaderKind::ALL {
            assert_eq!(kind.name().parse::<ShaderKind>().unwrap(), kind);
        }
        assert_eq!(" Crystal ".parse::<ShaderKind>().unwrap(), ShaderKind::Crystal);
        assert!(matches!("plasma".parse::<ShaderKind>(), Err(RenderError::UnknownShader(name)) if name == "plasma"));
    }
}
