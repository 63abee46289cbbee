use std::sync::{Mutex, MutexGuard, PoisonError};

use rand::Rng;

use super::util::Color;

/// One pixel of the frame buffer - color together with the depth it was written at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cell {
    pub color: Color,
    pub depth: f32,
}

/// Depth of a cell nothing was drawn into.
pub const FAR_DEPTH: f32 = f32::MAX;

/// Frame buffer with a lock per cell, so that fragments of different triangles may be
/// written from several threads at once.
/// (0, 0) is the bottom left coordinate.
pub struct FrameBuffer {
    pub width: u32,
    pub height: u32,
    background: Color,
    cells: Vec<Mutex<Cell>>,
    // Background stars, painted over every cleared frame. Generated once.
    star_field: Vec<(u32, u32)>,
}

impl FrameBuffer {
    /// Generates new cleared FrameBuffer with specified width, height and background color.
    pub fn new(width: u32, height: u32, background: Color) -> FrameBuffer {
        let n_cells = width as usize * height as usize;
        let blank = Cell { color: background, depth: FAR_DEPTH };
        let cells = (0..n_cells).map(|_| Mutex::new(blank)).collect();
        return FrameBuffer {
            width,
            height,
            background,
            cells,
            star_field: Vec::new(),
        };
    }

    /// Scatters `count` stars at random positions. They are drawn by every subsequent clear().
    pub fn with_star_field<R: Rng + ?Sized>(mut self, count: usize, rng: &mut R) -> FrameBuffer {
        if self.width == 0 || self.height == 0 {
            return self;
        }
        self.star_field = (0..count)
            .map(|_| (rng.gen_range(0..self.width), rng.gen_range(0..self.height)))
            .collect();
        self.clear();
        return self;
    }

    /// Index of the cell at given coordinate, None if the coordinate is outside of the buffer.
    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return None;
        }
        return Some(x as usize + y as usize * self.width as usize);
    }

    fn lock(&self, index: usize) -> MutexGuard<'_, Cell> {
        // A cell holds plain values, so a panic while it was locked can't leave it
        // half-written and the poisoned value is still valid.
        return self.cells[index].lock().unwrap_or_else(PoisonError::into_inner);
    }

    /// Resets every cell to the background color and farthest depth, then draws the star field.
    pub fn clear(&self) {
        let blank = Cell { color: self.background, depth: FAR_DEPTH };
        for i in 0..self.cells.len() {
            *self.lock(i) = blank;
        }
        for &(x, y) in &self.star_field {
            if let Some(index) = self.index(x as i32, y as i32) {
                self.lock(index).color = Color::WHITE;
            }
        }
    }

    /// Depth-tested write. Replaces the cell only if `depth` is strictly nearer than the stored one.
    /// Coordinates outside of the buffer are dropped. Returns true if the cell was replaced.
    ///
    /// Comparison and replacement happen under the cell lock, so the final cell state is the
    /// nearest write of the frame no matter in which order concurrent writers arrive.
    pub fn write(&self, x: i32, y: i32, color: Color, depth: f32) -> bool {
        if !depth.is_finite() {
            return false;
        }
        let Some(index) = self.index(x, y) else {
            return false;
        };
        let mut cell = self.lock(index);
        if depth < cell.depth {
            *cell = Cell { color, depth };
            return true;
        }
        return false;
    }

    /// Current state of a single cell.
    pub fn cell(&self, x: i32, y: i32) -> Option<Cell> {
        return self.index(x, y).map(|index| *self.lock(index));
    }

    /// Copy of the whole grid, row by row starting from the bottom row.
    /// Meant to be called once the frame is complete.
    pub fn snapshot(&self) -> Vec<Cell> {
        return (0..self.cells.len()).map(|i| *self.lock(i)).collect();
    }

    /// Get rendered frame as rgb8 data of size 3 * (number of pixels), top row first.
    pub fn to_rgb8(&self) -> Vec<u8> {
        let width = self.width as usize;
        let cells = self.snapshot();
        let mut render_data = Vec::with_capacity(3 * cells.len());
        // Buffer rows start from the bottom, images from the top.
        for row in cells.chunks(width.max(1)).rev() {
            for cell in row {
                render_data.extend_from_slice(&cell.color.to_rgb8());
            }
        }
        return render_data;
    }
}
