use nalgebra as na;
use na::{vector, Vector3};

use super::shader::Vertex;
use super::util::Color;

/// Twice the signed area under which a triangle is considered degenerate, in pixels squared.
const AREA_EPSILON: f32 = 1e-4;

/// Candidate pixel produced by rasterization, carrying attributes interpolated from the
/// vertices of its triangle. Lives only until it is shaded and written to the frame buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fragment {
    pub x: i32,
    pub y: i32,
    pub depth: f32,
    pub color: Color,
    pub intensity: f32,
    pub normal: Vector3<f32>,
    pub world_position: Vector3<f32>,
    pub original_position: Vector3<f32>,
    pub tex_coords: Vector3<f32>,
    pub barycentric: Vector3<f32>, // Weights of the three vertices, sum to 1.
}

/// Size of the surface being rasterized into and the light used for vertex intensities.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterTarget {
    pub width: u32,
    pub height: u32,
    pub light_direction: Vector3<f32>,
}

/// Integer pixel rectangle, both corners inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct BoundingBox {
    min_x: i32,
    min_y: i32,
    max_x: i32,
    max_y: i32,
}

/// Bounding box of the triangle clamped to the target, None if nothing of it is on screen.
fn get_triangle_bounding_box(points: [(f32, f32); 3], width: u32, height: u32) -> Option<BoundingBox> {
    if width == 0 || height == 0 {
        return None;
    }
    let min_x = points.iter().map(|p| p.0).fold(f32::MAX, f32::min);
    let min_y = points.iter().map(|p| p.1).fold(f32::MAX, f32::min);
    let max_x = points.iter().map(|p| p.0).fold(f32::MIN, f32::max);
    let max_y = points.iter().map(|p| p.1).fold(f32::MIN, f32::max);
    let bbox = BoundingBox {
        min_x: min_x.floor().max(0.0) as i32,
        min_y: min_y.floor().max(0.0) as i32,
        max_x: max_x.ceil().min((width - 1) as f32) as i32,
        max_y: max_y.ceil().min((height - 1) as f32) as i32,
    };
    if bbox.min_x > bbox.max_x || bbox.min_y > bbox.max_y {
        return None;
    }
    return Some(bbox);
}

/// Edge function: twice the signed area of the triangle (a, b, p).
fn edge(a: (f32, f32), b: (f32, f32), p: (f32, f32)) -> f32 {
    return (b.0 - a.0) * (p.1 - a.1) - (b.1 - a.1) * (p.0 - a.0);
}

/// Barycentric-weighted sum of a per-vertex attribute.
fn interpolate(values: [Vector3<f32>; 3], bar_coord: &Vector3<f32>) -> Vector3<f32> {
    return values[0] * bar_coord.x + values[1] * bar_coord.y + values[2] * bar_coord.z;
}

/// Lambert term of a vertex normal.
fn vertex_intensity(normal: &Vector3<f32>, light_direction: &Vector3<f32>) -> f32 {
    return normal.dot(light_direction).max(0.0);
}

/// Enumerates the pixels covered by the triangle (a, b, c), given in screen coordinates, and
/// produces a fragment with interpolated attributes for each of them.
///
/// The pixel (x, y) is sampled at the lattice point (x, y) rather than at its center (x + 0.5,
/// y + 0.5), since the viewport maps [-1, 1] onto [0, width] and a vertex of integer screen
/// coordinates then lies exactly on a sample. It counts as covered if none of its barycentric
/// weights is negative, so pixels on an edge shared by two triangles are produced by both.
/// A triangle which covers no sample point produces nothing, whatever its area.
/// Depth is interpolated linearly in screen space. Degenerate triangles produce nothing.
pub fn triangle(a: &Vertex, b: &Vertex, c: &Vertex, target: &RasterTarget) -> Vec<Fragment> {
    let mut fragments = Vec::new();
    let vertices = [a, b, c];
    if !vertices.iter().all(|v| v.position.iter().all(|p| p.is_finite())) {
        return fragments;
    }

    let points = vertices.map(|v| (v.position.x, v.position.y));
    let area = edge(points[0], points[1], points[2]);
    if area.abs() < AREA_EPSILON {
        return fragments;
    }
    let Some(bbox) = get_triangle_bounding_box(points, target.width, target.height) else {
        return fragments;
    };

    let depths = vector![a.position.z, b.position.z, c.position.z];
    let intensities = vertices.map(|v| vertex_intensity(&v.normal, &target.light_direction));
    let intensities = vector![intensities[0], intensities[1], intensities[2]];

    for y in bbox.min_y..=bbox.max_y {
        for x in bbox.min_x..=bbox.max_x {
            let p = (x as f32, y as f32);
            let w_a = edge(points[1], points[2], p) / area;
            let w_b = edge(points[2], points[0], p) / area;
            let w_c = edge(points[0], points[1], p) / area;
            if w_a < 0.0 || w_b < 0.0 || w_c < 0.0 {
                // If any of the weights are negative, point is not in the triangle, so skipping it.
                continue;
            }
            let bar_coord = vector![w_a, w_b, w_c];
            fragments.push(Fragment {
                x,
                y,
                depth: bar_coord.dot(&depths),
                color: Color::WHITE,
                intensity: bar_coord.dot(&intensities),
                normal: interpolate([a.normal, b.normal, c.normal], &bar_coord),
                world_position: interpolate([a.world_position, b.world_position, c.world_position], &bar_coord),
                original_position: interpolate(
                    [a.original_position, b.original_position, c.original_position],
                    &bar_coord,
                ),
                tex_coords: interpolate([a.tex_coords, b.tex_coords, c.tex_coords], &bar_coord),
                barycentric: bar_coord,
            });
        }
    }

    return fragments;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn screen_vertex(x: f32, y: f32, z: f32) -> Vertex {
        return Vertex::new(vector![x, y, z], vector![0.0, 0.0, 1.0], vector![0.0, 0.0, 0.0]);
    }

    fn target() -> RasterTarget {
        return RasterTarget { width: 100, height: 80, light_direction: vector![0.0, 0.0, 1.0] };
    }

    #[test]
    fn covers_interior_pixels_with_valid_weights() {
        let a = screen_vertex(10.0, 10.0, 1.0);
        let b = screen_vertex(50.0, 10.0, 1.0);
        let c = screen_vertex(30.0, 50.0, 1.0);
        let fragments = triangle(&a, &b, &c, &target());
        assert!(!fragments.is_empty());
        assert!(fragments.iter().any(|f| f.x == 30 && f.y == 20));
        assert!(!fragments.iter().any(|f| f.x == 0 && f.y == 0));
        for f in &fragments {
            let w = f.barycentric;
            assert!(w.x >= 0.0 && w.y >= 0.0 && w.z >= 0.0);
            assert!((w.x + w.y + w.z - 1.0).abs() < 1e-5);
            assert!((f.depth - 1.0).abs() < 1e-5);
            assert!((f.intensity - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn winding_does_not_matter() {
        let a = screen_vertex(10.0, 10.0, 1.0);
        let b = screen_vertex(50.0, 10.0, 1.0);
        let c = screen_vertex(30.0, 50.0, 1.0);
        let ccw = triangle(&a, &b, &c, &target());
        let cw = triangle(&a, &c, &b, &target());
        assert_eq!(ccw.len(), cw.len());
    }

    #[test]
    fn edges_and_vertices_are_covered() {
        let a = screen_vertex(0.0, 0.0, 0.5);
        let b = screen_vertex(4.0, 0.0, 0.5);
        let c = screen_vertex(0.0, 4.0, 0.5);
        let fragments = triangle(&a, &b, &c, &target());
        for (x, y) in [(0, 0), (4, 0), (0, 4), (2, 2), (2, 0)] {
            assert!(fragments.iter().any(|f| f.x == x && f.y == y), "({}, {}) not covered", x, y);
        }
        // Right triangle with legs of 4 has 15 lattice points inside or on the border.
        assert_eq!(fragments.len(), 15);
    }

    #[test]
    fn only_covered_sample_points_produce_fragments() {
        // Well above the degenerate threshold, but strictly between lattice points.
        let a = screen_vertex(10.1, 10.1, 1.0);
        let b = screen_vertex(10.9, 10.1, 1.0);
        let c = screen_vertex(10.5, 10.9, 1.0);
        assert!(edge((10.1, 10.1), (10.9, 10.1), (10.5, 10.9)).abs() >= AREA_EPSILON);
        assert!(triangle(&a, &b, &c, &target()).is_empty());

        // A pixel sized triangle around (10, 10).
        let a = screen_vertex(9.6, 9.6, 1.0);
        let b = screen_vertex(10.6, 9.6, 1.0);
        let c = screen_vertex(10.1, 10.6, 1.0);
        let fragments = triangle(&a, &b, &c, &target());
        assert_eq!(fragments.len(), 1);
        assert_eq!((fragments[0].x, fragments[0].y), (10, 10));
        let w = fragments[0].barycentric;
        assert!(w.x >= 0.0 && w.y >= 0.0 && w.z >= 0.0);
        assert!((w.x + w.y + w.z - 1.0).abs() < 1e-5);
    }

    #[test]
    fn degenerate_triangles_produce_nothing() {
        let a = screen_vertex(10.0, 10.0, 1.0);
        let b = screen_vertex(20.0, 20.0, 1.0);
        let c = screen_vertex(30.0, 30.0, 1.0);
        assert!(triangle(&a, &b, &c, &target()).is_empty());
        assert!(triangle(&a, &a, &b, &target()).is_empty());
        assert!(triangle(&a, &a, &a, &target()).is_empty());
        let broken = screen_vertex(f32::NAN, 5.0, 1.0);
        assert!(triangle(&a, &b, &broken, &target()).is_empty());
    }

    #[test]
    fn fragments_are_clamped_to_target() {
        let a = screen_vertex(-50.0, -50.0, 1.0);
        let b = screen_vertex(500.0, -50.0, 1.0);
        let c = screen_vertex(-50.0, 500.0, 1.0);
        let target = target();
        let fragments = triangle(&a, &b, &c, &target);
        assert_eq!(fragments.len(), (target.width * target.height) as usize);
        assert!(fragments.iter().all(|f| f.x >= 0 && f.y >= 0 && f.x < 100 && f.y < 80));
        let offscreen = [screen_vertex(-30.0, -30.0, 1.0), screen_vertex(-10.0, -30.0, 1.0), screen_vertex(-20.0, -10.0, 1.0)];
        assert!(triangle(&offscreen[0], &offscreen[1], &offscreen[2], &target).is_empty());
    }

    #[test]
    fn attributes_are_interpolated_linearly() {
        let mut a = screen_vertex(0.0, 0.0, 0.0);
        let mut b = screen_vertex(10.0, 0.0, 1.0);
        let mut c = screen_vertex(0.0, 10.0, 2.0);
        a.original_position = vector![1.0, 0.0, 0.0];
        b.original_position = vector![0.0, 1.0, 0.0];
        c.original_position = vector![0.0, 0.0, 1.0];
        b.normal = vector![0.0, 0.0, -1.0];
        let fragments = triangle(&a, &b, &c, &target());
        let f = fragments.iter().find(|f| f.x == 5 && f.y == 0).unwrap();
        assert!((f.depth - 0.5).abs() < 1e-5);
        assert!((f.original_position - vector![0.5, 0.5, 0.0]).norm() < 1e-5);
        // Vertex b faces away from the light and contributes no intensity.
        assert!((f.intensity - 0.5).abs() < 1e-5);
        let f = fragments.iter().find(|f| f.x == 0 && f.y == 5).unwrap();
        assert!((f.depth - 1.0).abs() < 1e-5);
    }
}
