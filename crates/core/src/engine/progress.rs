//! Progress bands of the pipeline stages.
//!
//! Each stage owns a fixed slice of the 0..=100 range. The bands are
//! checkpoints, not estimates of time spent.

/// A contiguous slice of the progress range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Band {
    start: u8,
    end: u8,
}

pub const PREPARE: Band = Band::new(0, 5);
pub const EXTRACT: Band = Band::new(5, 15);
pub const POSE: Band = Band::new(15, 40);
pub const STYLIZE: Band = Band::new(40, 95);
pub const ASSEMBLE: Band = Band::new(95, 100);

impl Band {
    pub const fn new(start: u8, end: u8) -> Self {
        Self { start, end }
    }

    pub fn start(self) -> u8 {
        self.start
    }

    pub fn end(self) -> u8 {
        self.end
    }

    /// Percentage after `done` of `total` units of this band.
    pub fn at(self, done: usize, total: usize) -> u8 {
        if total == 0 || done >= total {
            return self.end;
        }
        let width = usize::from(self.end - self.start);
        self.start + (width * done / total) as u8
    }
}
