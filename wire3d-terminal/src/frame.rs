/// Fixed-size grid of depth indices
use wire3d_core::Palette;

/// Depth index of an empty cell
pub const BACKGROUND: u16 = 0;

/// A width × height grid of palette indices, row-major
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: usize,
    height: usize,
    cells: Vec<u16>,
}

impl Frame {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![BACKGROUND; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn get(&self, x: usize, y: usize) -> Option<u16> {
        if x < self.width && y < self.height {
            Some(self.cells[y * self.width + x])
        } else {
            None
        }
    }

    pub fn clear(&mut self) {
        self.cells.fill(BACKGROUND);
    }

    /// Store `depth` at (x, y) unless the cell already holds a larger index.
    ///
    /// Returns false when the cell is off the grid.
    pub fn plot(&mut self, x: usize, y: usize, depth: u16) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        let cell = &mut self.cells[y * self.width + x];
        *cell = (*cell).max(depth);
        true
    }

    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|&c| c == BACKGROUND)
    }

    /// Cells holding anything other than the background
    pub fn lit_cells(&self) -> impl Iterator<Item = (usize, usize, u16)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|&(_, &depth)| depth != BACKGROUND)
            .map(move |(i, &depth)| (i % self.width, i / self.width, depth))
    }

    /// Append the grid as glyphs, one line per row, each ending in `\n`
    pub fn write_glyphs(&self, palette: &Palette, out: &mut String) {
        if self.width == 0 {
            return;
        }
        for row in self.cells.chunks_exact(self.width) {
            for &depth in row {
                out.push_str(palette.glyph(depth));
            }
            out.push('\n');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_plot_keeps_largest_index() {
        let mut frame = Frame::new(4, 3);
        assert!(frame.plot(1, 2, 3));
        assert!(frame.plot(1, 2, 1));
        assert_eq!(frame.get(1, 2), Some(3));
        assert!(frame.plot(1, 2, 5));
        assert_eq!(frame.get(1, 2), Some(5));
    }

    #[test]
    fn test_plot_off_grid() {
        let mut frame = Frame::new(4, 3);
        assert_eq!((frame.width(), frame.height()), (4, 3));
        assert!(!frame.plot(4, 0, 1));
        assert!(!frame.plot(0, 3, 1));
        assert!(frame.is_blank());
    }

    #[test]
    fn test_clear() {
        let mut frame = Frame::new(2, 2);
        frame.plot(0, 0, 2);
        frame.plot(1, 1, 1);
        assert_eq!(frame.lit_cells().count(), 2);
        frame.clear();
        assert!(frame.is_blank());
    }

    #[test]
    fn test_write_glyphs() {
        let palette = Palette::new([".", "o", "#"]).unwrap();
        let mut frame = Frame::new(3, 2);
        frame.plot(0, 0, 1);
        frame.plot(2, 1, 2);

        let mut out = String::new();
        frame.write_glyphs(&palette, &mut out);
        assert_eq!(out, "o..\n..#\n");
    }
}
