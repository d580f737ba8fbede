/// Line rasterization into a depth-index frame
use nalgebra::{Matrix4, Vector4};
use wire3d_core::HLine;

use crate::frame::Frame;

/// Maps view-space samples onto a grid for a given palette size.
///
/// View space is treated directly as normalized device coordinates: the
/// grid spans `[-1, 1]` on x and y, and z in `[-1, 1]` spreads across the
/// palette. Larger depth indices are nearer the camera and win ties.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Raster {
    width: usize,
    height: usize,
    levels: usize,
    steps: usize,
}

impl Raster {
    pub fn new(width: usize, height: usize, levels: usize) -> Self {
        Self {
            width,
            height,
            levels,
            steps: width.max(height).max(levels).max(1),
        }
    }

    /// Samples taken along every line
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Grid cell and depth index for a view-space point, `None` when the
    /// point falls outside the grid or is not finite
    pub fn cell(&self, p: &Vector4<f32>) -> Option<(usize, usize, u16)> {
        if !(p.x.is_finite() && p.y.is_finite() && p.z.is_finite()) {
            return None;
        }

        let x = ((p.x + 1.0) * 0.5 * self.width as f32).floor();
        let y = ((1.0 - p.y) * 0.5 * self.height as f32).floor();
        if x < 0.0 || y < 0.0 || x >= self.width as f32 || y >= self.height as f32 {
            return None;
        }

        // Index 0 is the background, so geometry never quantizes below 1
        let top = self.levels.saturating_sub(1) as f32;
        let depth = ((p.z + 1.0) * 0.5 * self.levels as f32).floor();
        let depth = depth.max(1.0).min(top);

        Some((x as usize, y as usize, depth as u16))
    }

    /// Plot one view-space point, returning whether it landed on the grid
    pub fn plot_point(&self, frame: &mut Frame, p: &Vector4<f32>) -> bool {
        match self.cell(p) {
            Some((x, y, depth)) => frame.plot(x, y, depth),
            None => false,
        }
    }

    /// Transform `line` by `view` and walk it in [`Raster::steps`] uniform
    /// samples starting at the first endpoint. Returns the samples plotted.
    pub fn draw_line(&self, frame: &mut Frame, view: &Matrix4<f32>, line: &HLine) -> usize {
        let p0 = view * line.start;
        let p1 = view * line.end;
        let step = (p1 - p0) / self.steps as f32;

        (0..self.steps)
            .filter(|&i| self.plot_point(frame, &(p0 + step * i as f32)))
            .count()
    }
}
