//! Output elevation grids.

/// Sample value marking "no elevation available".
pub const NODATA: i16 = -32768;

/// A square, row-major grid of elevation samples for one cell.
///
/// Row 0 is the northern edge, column 0 the western edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputGrid {
    side: usize,
    samples: Vec<i16>,
    /// No sample received real data.
    pub all_no_data: bool,
    /// At least one sample received real data and none is above 0 m.
    pub all_sea_level: bool,
}

impl OutputGrid {
    /// A grid with every sample set to [`NODATA`].
    pub fn new(side: usize) -> Self {
        Self {
            side,
            samples: vec![NODATA; side * side],
            all_no_data: true,
            all_sea_level: false,
        }
    }

    /// Number of rows (and columns).
    pub fn side(&self) -> usize {
        self.side
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub(crate) fn samples_mut(&mut self) -> &mut [i16] {
        &mut self.samples
    }

    /// Sample at `row`, `col`.
    pub fn get(&self, row: usize, col: usize) -> i16 {
        self.samples[row * self.side + col]
    }

    /// One row of samples.
    pub fn row(&self, row: usize) -> &[i16] {
        &self.samples[row * self.side..(row + 1) * self.side]
    }

    /// Samples as big-endian bytes (SRTM `.hgt` layout).
    pub fn to_be_bytes(&self) -> Vec<u8> {
        self.samples.iter().flat_map(|s| s.to_be_bytes()).collect()
    }

    /// Samples as little-endian bytes.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        self.samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }
}

/// Result of resampling one cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellOutcome {
    /// `None` when no tile touched by the cell could be decoded.
    pub grid: Option<OutputGrid>,
    pub all_no_data: bool,
    pub all_sea_level: bool,
}

impl CellOutcome {
    /// Outcome for a cell with nothing to sample.
    pub fn empty() -> Self {
        Self {
            grid: None,
            all_no_data: true,
            all_sea_level: false,
        }
    }

    pub(crate) fn from_grid(grid: OutputGrid) -> Self {
        Self {
            all_no_data: grid.all_no_data,
            all_sea_level: grid.all_sea_level,
            grid: Some(grid),
        }
    }
}
