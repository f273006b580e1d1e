//! Fixed-range histograms with guard bins
//!
//! Bins are half-open `[from + i·delta, from + (i+1)·delta)`. Slot 0 collects
//! underflow, slot `bins + 1` collects overflow, so no fill is ever lost.
//!
//! # Example
//!
//! ```
//! use g4ants_session_core::monitor::Histogram1D;
//!
//! let mut h = Histogram1D::new(4, 0.0, 4.0);
//! h.fill(-1.0); // underflow
//! h.fill(1.0);  // exactly on an edge: upper bin
//! h.fill(4.0);  // `to` itself overflows
//!
//! assert_eq!(h.data(), &[1.0, 0.0, 1.0, 0.0, 0.0, 1.0]);
//! assert_eq!(h.entries(), 3);
//! ```

use serde::Serialize;

fn guarded_slot(x: f64, bins: usize, from: f64, delta: f64) -> usize {
    // NaN lands in underflow
    if !(x >= from) {
        return 0;
    }
    let bin = ((x - from) / delta).floor();
    if bin >= bins as f64 {
        bins + 1
    } else {
        bin as usize + 1
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram1D {
    bins: usize,
    from: f64,
    to: f64,
    #[serde(skip)]
    delta: f64,
    data: Vec<f64>,
    #[serde(skip)]
    entries: u64,
}

impl Histogram1D {
    /// # Panics
    ///
    /// If `bins` is 0 or the range is empty. Ranges are validated with the
    /// monitor configuration before construction.
    pub fn new(bins: usize, from: f64, to: f64) -> Self {
        assert!(bins > 0, "histogram needs at least one bin");
        assert!(to > from, "histogram range must be non-empty");
        Self {
            bins,
            from,
            to,
            delta: (to - from) / bins as f64,
            data: vec![0.0; bins + 2],
            entries: 0,
        }
    }

    pub fn fill(&mut self, x: f64) {
        self.fill_weighted(x, 1.0);
    }

    pub fn fill_weighted(&mut self, x: f64, weight: f64) {
        let slot = guarded_slot(x, self.bins, self.from, self.delta);
        self.data[slot] += weight;
        self.entries += 1;
    }

    pub fn bins(&self) -> usize {
        self.bins
    }

    pub fn range(&self) -> (f64, f64) {
        (self.from, self.to)
    }

    /// Contents: `[underflow, bin 0, ..., bin n-1, overflow]`
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn entries(&self) -> u64 {
        self.entries
    }
}

/// Two-dimensional histogram stored row-major as `[y][x]`, with guard bins
/// on both axes
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram2D {
    x_bins: usize,
    x_from: f64,
    x_delta: f64,
    y_bins: usize,
    y_from: f64,
    y_delta: f64,
    data: Vec<Vec<f64>>,
    entries: u64,
}

impl Histogram2D {
    /// # Panics
    ///
    /// Under the same conditions as [`Histogram1D::new`], on either axis.
    pub fn new(x_bins: usize, x_range: (f64, f64), y_bins: usize, y_range: (f64, f64)) -> Self {
        assert!(x_bins > 0 && y_bins > 0, "histogram needs at least one bin");
        assert!(
            x_range.1 > x_range.0 && y_range.1 > y_range.0,
            "histogram range must be non-empty"
        );
        Self {
            x_bins,
            x_from: x_range.0,
            x_delta: (x_range.1 - x_range.0) / x_bins as f64,
            y_bins,
            y_from: y_range.0,
            y_delta: (y_range.1 - y_range.0) / y_bins as f64,
            data: vec![vec![0.0; x_bins + 2]; y_bins + 2],
            entries: 0,
        }
    }

    pub fn fill(&mut self, x: f64, y: f64) {
        let ix = guarded_slot(x, self.x_bins, self.x_from, self.x_delta);
        let iy = guarded_slot(y, self.y_bins, self.y_from, self.y_delta);
        self.data[iy][ix] += 1.0;
        self.entries += 1;
    }

    pub fn data(&self) -> &[Vec<f64>] {
        &self.data
    }

    pub fn entries(&self) -> u64 {
        self.entries
    }

    pub fn total(&self) -> f64 {
        self.data.iter().flatten().sum()
    }
}
