pub mod buffer;
pub mod noise;
pub mod raster;
pub mod shader;
pub mod util;

use std::ops::AddAssign;
use std::sync::Arc;

use log::warn;
use nalgebra::Vector3;
use rand::Rng;

use crate::error::RenderError;
use buffer::FrameBuffer;
use raster::{Fragment, RasterTarget};
use shader::{vertex_shader, ShaderKind, Uniforms, Vertex};

/// One object to draw this frame: shared base geometry with its own transforms and shader.
/// Consecutive triples of vertices are triangles.
#[derive(Debug, Clone)]
pub struct Mesh {
    pub vertices: Arc<Vec<Vertex>>,
    pub uniforms: Uniforms,
    // Tag as it arrives with the mesh, resolved by render_mesh so that an unknown one
    // skips only this mesh. Parsing it is a lookup among seven names.
    pub shader: String,
}

/// Values, constant over a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameContext {
    pub time: f32, // Seconds since start, drives animated shaders.
    pub light_direction: Vector3<f32>,
}

/// Counters of what a frame (or a part of it) did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FrameStats {
    pub meshes_drawn: usize,
    pub meshes_skipped: usize,
    pub triangles: usize,
    pub triangles_skipped: usize, // Triangles with a vertex that could not be projected.
    pub fragments: usize,
    pub pixels_written: usize,
}

impl AddAssign for FrameStats {
    fn add_assign(&mut self, rhs: FrameStats) {
        self.meshes_drawn += rhs.meshes_drawn;
        self.meshes_skipped += rhs.meshes_skipped;
        self.triangles += rhs.triangles;
        self.triangles_skipped += rhs.triangles_skipped;
        self.fragments += rhs.fragments;
        self.pixels_written += rhs.pixels_written;
    }
}

/// Rasterizes screen space triangles, shades every fragment and writes it to the buffer.
pub fn draw_triangles<F>(
    buffer: &FrameBuffer,
    triangles: &[[Vertex; 3]],
    light_direction: Vector3<f32>,
    mut fragment_shader: F,
) -> FrameStats
where
    F: FnMut(Fragment) -> Fragment,
{
    let target = RasterTarget {
        width: buffer.width,
        height: buffer.height,
        light_direction,
    };
    let mut stats = FrameStats::default();
    for [a, b, c] in triangles {
        stats.triangles += 1;
        for fragment in raster::triangle(a, b, c, &target) {
            stats.fragments += 1;
            let fragment = fragment_shader(fragment);
            if buffer.write(fragment.x, fragment.y, fragment.color, fragment.depth) {
                stats.pixels_written += 1;
            }
        }
    }
    return stats;
}

/// Runs the whole pipeline for one mesh: vertex shader, primitive assembly, rasterization,
/// fragment shader and depth-tested write. Fails only on a shader name nobody knows, before
/// anything is drawn.
pub fn render_mesh<R: Rng + ?Sized>(
    buffer: &FrameBuffer,
    mesh: &Mesh,
    frame: &FrameContext,
    rng: &mut R,
) -> Result<FrameStats, RenderError> {
    let shader: ShaderKind = mesh.shader.parse()?;

    let transformed: Vec<Option<Vertex>> = mesh
        .vertices
        .iter()
        .map(|vertex| vertex_shader(vertex, &mesh.uniforms))
        .collect();

    let mut skipped = 0;
    let mut triangles = Vec::with_capacity(transformed.len() / 3);
    for corners in transformed.chunks_exact(3) {
        match (corners[0], corners[1], corners[2]) {
            (Some(a), Some(b), Some(c)) => triangles.push([a, b, c]),
            _ => skipped += 1,
        }
    }

    let time = frame.time;
    let mut stats = draw_triangles(buffer, &triangles, frame.light_direction, |fragment| {
        shader.shade(fragment, time, rng)
    });
    stats.meshes_drawn = 1;
    stats.triangles_skipped = skipped;
    return Ok(stats);
}

/// Renders meshes one after another. A mesh that fails is reported and left out,
/// the rest of the frame is still drawn.
pub fn render_frame<R: Rng + ?Sized>(
    buffer: &FrameBuffer,
    meshes: &[Mesh],
    frame: &FrameContext,
    rng: &mut R,
) -> FrameStats {
    let mut stats = FrameStats::default();
    for mesh in meshes {
        match render_mesh(buffer, mesh, frame, rng) {
            Ok(mesh_stats) => stats += mesh_stats,
            Err(error) => {
                warn!("Skipping mesh: {}", error);
                stats.meshes_skipped += 1;
            }
        }
    }
    return stats;
}
