use std::sync::Arc;

use nalgebra as na;
use na::{vector, Matrix4, Vector3};

use crate::scene::shader::{look_at, perspective_matrix, viewport_matrix, ShaderKind, Uniforms, Vertex};
use crate::scene::Mesh;

/// Orbit speeds below are given in degrees per frame at this rate.
const REFERENCE_FRAME_RATE: f32 = 60.0;

pub const MIN_ZOOM: f32 = 0.5;
pub const MAX_ZOOM: f32 = 1.0;
const ZOOM_STEP: f32 = 1.1;

/// A celestial body, drawn with the shared sphere geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    pub shader: ShaderKind,
    pub orbit_radius: f32,
    pub scale: f32,
    pub orbit_speed: f32,       // Degrees per frame at the reference frame rate.
    pub parent: Option<usize>,  // Index of the body this one circles, the origin otherwise.
}

pub struct SolarSystem {
    pub bodies: Vec<Body>,
}

impl Default for SolarSystem {
    /// A star with five planets and a moon around the gas giant.
    fn default() -> Self {
        let body = |shader, orbit_radius, scale, orbit_speed, parent| Body {
            shader,
            orbit_radius,
            scale,
            orbit_speed,
            parent,
        };
        return Self {
            bodies: vec![
                body(ShaderKind::Star, 0.0, 1.0, 0.0, None),
                body(ShaderKind::Rocky, 1.5, 0.3, 1.0, None),
                body(ShaderKind::Gaseous, 2.5, 0.5, 0.7, None),
                body(ShaderKind::Volcanic, 3.3, 0.4, 0.5, None),
                body(ShaderKind::Crystal, 4.1, 0.75, 0.3, None),
                body(ShaderKind::Icy, 5.5, 0.5, 0.2, None),
                body(ShaderKind::Moon, 0.8, 0.12, 3.0, Some(2)),
            ],
        };
    }
}

impl SolarSystem {
    /// Placement of the body's center at `time` seconds, without its scale.
    /// Orbits are circles in the xy plane.
    fn orbit_matrix(&self, index: usize, time: f32) -> Matrix4<f32> {
        let Some(body) = self.bodies.get(index) else {
            return Matrix4::identity();
        };
        let angle = (body.orbit_speed * REFERENCE_FRAME_RATE * time).to_radians();
        let orbit = Matrix4::from_axis_angle(&Vector3::z_axis(), angle)
            * Matrix4::new_translation(&vector![body.orbit_radius, 0.0, 0.0]);
        return match body.parent {
            // Parents are listed before their satellites, which keeps this from looping.
            Some(parent) if parent < index => self.orbit_matrix(parent, time) * orbit,
            _ => orbit,
        };
    }

    pub fn model_matrix(&self, index: usize, time: f32) -> Matrix4<f32> {
        let scale = self.bodies.get(index).map_or(1.0, |body| body.scale);
        return self.orbit_matrix(index, time) * Matrix4::new_scaling(scale);
    }

    /// World position of the body's center.
    pub fn body_origin(&self, index: usize, time: f32) -> Vector3<f32> {
        let m = self.orbit_matrix(index, time);
        return vector![m[(0, 3)], m[(1, 3)], m[(2, 3)]];
    }

    /// Meshes of all bodies for the frame at `time`, sharing `geometry`.
    /// `camera` supplies view, projection and viewport.
    pub fn meshes(&self, geometry: &Arc<Vec<Vertex>>, camera: &Uniforms, time: f32) -> Vec<Mesh> {
        return (0..self.bodies.len())
            .map(|index| Mesh {
                vertices: Arc::clone(geometry),
                uniforms: Uniforms {
                    model: self.model_matrix(index, time),
                    ..*camera
                },
                shader: self.bodies[index].shader.name().to_string(),
            })
            .collect();
    }
}

/// Projection settings of the camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lens {
    pub width: u32,
    pub height: u32,
    pub fov: f32, // Degrees, at zoom 1.
    pub near: f32,
    pub far: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub position: Vector3<f32>,
    pub up: Vector3<f32>,
    pub zoom: f32,            // Multiplies the field of view, kept in [MIN_ZOOM, MAX_ZOOM].
    pub focus: Option<usize>, // Body to look at, the origin otherwise.
}

impl Default for Camera {
    fn default() -> Self {
        return Self {
            position: vector![0.0, 0.0, 4.0],
            up: Vector3::y(),
            zoom: MAX_ZOOM,
            focus: None,
        };
    }
}

impl Camera {
    pub fn translate(&mut self, offset: Vector3<f32>) {
        self.position += offset;
    }

    /// Scrolling towards the user widens the view, away from the user narrows it.
    pub fn scroll(&mut self, delta: f32) {
        if delta < 0.0 {
            self.zoom *= ZOOM_STEP;
        } else if delta > 0.0 {
            self.zoom /= ZOOM_STEP;
        }
        self.zoom = self.zoom.clamp(MIN_ZOOM, MAX_ZOOM);
    }

    /// Looks at a body with a narrow field of view until released.
    pub fn focus_on(&mut self, index: usize) {
        self.focus = Some(index);
        self.zoom = MIN_ZOOM;
    }

    pub fn release_focus(&mut self) {
        self.focus = None;
        self.zoom = MAX_ZOOM;
    }

    /// View, projection and viewport for the frame at `time`; model is left as identity.
    pub fn uniforms(&self, system: &SolarSystem, lens: &Lens, time: f32) -> Uniforms {
        let target = match self.focus {
            Some(index) if index < system.bodies.len() => system.body_origin(index, time),
            _ => Vector3::zeros(),
        };
        let aspect = lens.width as f32 / lens.height.max(1) as f32;
        return Uniforms {
            model: Matrix4::identity(),
            view: look_at(self.position, target, self.up),
            projection: perspective_matrix(lens.fov * self.zoom, aspect, lens.near, lens.far),
            viewport: viewport_matrix(lens.width, lens.height),
        };
    }
}
