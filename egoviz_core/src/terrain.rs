//! The TERRAIN model - height fields queryable at continuous coordinates
//!
//! Two storage layouts share one capability interface ([`HeightQueryable`]):
//! - [`DenseGrid`]: uniform spacing, origin + row-major samples
//! - [`LatticeGrid`]: explicit per-axis coordinates deduced from scattered points
//!
//! [`TerrainGrid`] is the tagged union the loaders produce. A grid is never
//! mutated after construction; reloading builds a new value.

use nalgebra::Point3;
use serde::{Deserialize, Serialize};

use crate::error::{EgoVizError, Result};

/// Axis-aligned extent of a grid in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bounds {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl Bounds {
    /// Returns true if (x, y) lies inside or on the boundary.
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    pub fn width(&self) -> f32 {
        self.max_x - self.min_x
    }

    pub fn depth(&self) -> f32 {
        self.max_y - self.min_y
    }
}

/// Integer grid extents: `width` samples along x, `height` samples along y.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GridDimensions {
    pub width: usize,
    pub height: usize,
}

impl GridDimensions {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    /// Total samples, or `None` when `width * height` overflows.
    pub fn cell_count(&self) -> Option<usize> {
        self.width.checked_mul(self.height)
    }

    /// Fewer than two samples on either axis: no cell can be formed.
    pub fn is_degenerate(&self) -> bool {
        self.width < 2 || self.height < 2
    }
}

/// Anything that can answer "how high is the ground at (x, y)?".
///
/// Queries outside [`bounds`](Self::bounds) clamp to the nearest edge; a
/// degenerate grid answers 0 everywhere.
pub trait HeightQueryable: Send + Sync {
    /// Terrain height at world coordinates (x, y).
    fn height_at(&self, x: f32, y: f32) -> f32;

    /// World-space extent of the samples.
    fn bounds(&self) -> Bounds;

    /// Number of samples per axis.
    fn dimensions(&self) -> GridDimensions;
}

/// How a [`DenseGrid`] turns continuous coordinates into a height.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HeightSampling {
    /// Blend of the four enclosing samples
    #[default]
    Bilinear,

    /// Sample at the lower-left corner of the enclosing cell, no blending.
    /// Matches legacy data sets rendered with cell-snapped heights.
    NearestLower,
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    // Exact at t == 0 and t == 1
    a * (1.0 - t) + b * t
}

#[inline]
fn blend(z00: f32, z10: f32, z01: f32, z11: f32, tx: f32, ty: f32) -> f32 {
    lerp(lerp(z00, z10, tx), lerp(z01, z11, tx), ty)
}

// =============================================================================
// DENSE GRID
// =============================================================================

/// Uniformly spaced height samples, row-major (y outer, x inner).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseGrid {
    /// World x of column 0
    min_x: f32,

    /// World y of row 0
    min_y: f32,

    /// Distance between adjacent samples on both axes
    spacing: f32,

    dims: GridDimensions,

    /// `heights[row * width + col]`
    heights: Vec<f32>,

    sampling: HeightSampling,
}

impl DenseGrid {
    /// Builds a dense grid, validating sizes and spacing.
    pub fn new(
        min_x: f32,
        min_y: f32,
        spacing: f32,
        dims: GridDimensions,
        heights: Vec<f32>,
    ) -> Result<Self> {
        if !(spacing.is_finite() && spacing > 0.0) {
            return Err(EgoVizError::format(format!(
                "grid spacing must be positive and finite, got {}",
                spacing
            )));
        }
        if !min_x.is_finite() || !min_y.is_finite() {
            return Err(EgoVizError::format("grid origin must be finite"));
        }
        let expected = dims.cell_count().ok_or_else(|| {
            EgoVizError::format(format!(
                "grid of {}x{} samples is too large",
                dims.width, dims.height
            ))
        })?;
        if heights.len() != expected {
            return Err(EgoVizError::format(format!(
                "expected {}x{} = {} height samples, got {}",
                dims.width,
                dims.height,
                expected,
                heights.len()
            )));
        }

        Ok(Self {
            min_x,
            min_y,
            spacing,
            dims,
            heights,
            sampling: HeightSampling::default(),
        })
    }

    /// Returns the grid with a different sampling policy.
    pub fn with_sampling(mut self, sampling: HeightSampling) -> Self {
        self.sampling = sampling;
        self
    }

    pub fn sampling(&self) -> HeightSampling {
        self.sampling
    }

    pub fn origin(&self) -> (f32, f32) {
        (self.min_x, self.min_y)
    }

    pub fn spacing(&self) -> f32 {
        self.spacing
    }

    pub fn heights(&self) -> &[f32] {
        &self.heights
    }

    /// Stored height at (col, row).
    pub fn sample(&self, col: usize, row: usize) -> Option<f32> {
        if col >= self.dims.width || row >= self.dims.height {
            return None;
        }
        Some(self.heights[row * self.dims.width + col])
    }

    /// World-space position of sample (col, row).
    pub fn vertex(&self, col: usize, row: usize) -> Option<Point3<f32>> {
        let z = self.sample(col, row)?;
        Some(Point3::new(
            self.min_x + col as f32 * self.spacing,
            self.min_y + row as f32 * self.spacing,
            z,
        ))
    }

    /// Continuous grid coordinate along one axis, clamped into `[0, count-1]`.
    fn grid_coord(&self, v: f32, min: f32, count: usize) -> f32 {
        ((v - min) / self.spacing).clamp(0.0, (count - 1) as f32)
    }

    fn bilinear(&self, x: f32, y: f32) -> f32 {
        let w = self.dims.width;
        let fx = self.grid_coord(x, self.min_x, w);
        let fy = self.grid_coord(y, self.min_y, self.dims.height);

        let i0 = (fx.floor() as usize).min(w - 2);
        let j0 = (fy.floor() as usize).min(self.dims.height - 2);
        let tx = fx - i0 as f32;
        let ty = fy - j0 as f32;

        let z00 = self.heights[j0 * w + i0];
        let z10 = self.heights[j0 * w + i0 + 1];
        let z01 = self.heights[(j0 + 1) * w + i0];
        let z11 = self.heights[(j0 + 1) * w + i0 + 1];

        blend(z00, z10, z01, z11, tx, ty)
    }

    fn nearest_lower(&self, x: f32, y: f32) -> f32 {
        let col = self.grid_coord(x, self.min_x, self.dims.width).floor() as usize;
        let row = self.grid_coord(y, self.min_y, self.dims.height).floor() as usize;
        self.heights[row * self.dims.width + col]
    }
}

impl HeightQueryable for DenseGrid {
    fn height_at(&self, x: f32, y: f32) -> f32 {
        if self.dims.is_degenerate() {
            return 0.0;
        }
        match self.sampling {
            HeightSampling::Bilinear => self.bilinear(x, y),
            HeightSampling::NearestLower => self.nearest_lower(x, y),
        }
    }

    fn bounds(&self) -> Bounds {
        let span = |count: usize| count.saturating_sub(1) as f32 * self.spacing;
        Bounds {
            min_x: self.min_x,
            min_y: self.min_y,
            max_x: self.min_x + span(self.dims.width),
            max_y: self.min_y + span(self.dims.height),
        }
    }

    fn dimensions(&self) -> GridDimensions {
        self.dims
    }
}

// =============================================================================
// LATTICE GRID
// =============================================================================

/// Height samples on a rectilinear lattice with explicit axis coordinates.
///
/// Produced from scattered `(x, y, z)` points: `xs` and `ys` hold the
/// distinct coordinates in ascending order. Queries scan the axes linearly,
/// so a lookup costs O(width + height) rather than O(1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatticeGrid {
    xs: Vec<f32>,
    ys: Vec<f32>,

    /// `heights[row * xs.len() + col]`
    heights: Vec<f32>,
}

impl LatticeGrid {
    /// Builds a lattice, validating ordering and sizes.
    pub fn new(xs: Vec<f32>, ys: Vec<f32>, heights: Vec<f32>) -> Result<Self> {
        for (axis, coords) in [("x", &xs), ("y", &ys)] {
            if coords.windows(2).any(|pair| !(pair[0] < pair[1])) {
                return Err(EgoVizError::format(format!(
                    "{} coordinates must be strictly ascending",
                    axis
                )));
            }
        }
        if xs.len().checked_mul(ys.len()) != Some(heights.len()) {
            return Err(EgoVizError::format(format!(
                "expected {}x{} height samples, got {}",
                xs.len(),
                ys.len(),
                heights.len()
            )));
        }
        Ok(Self { xs, ys, heights })
    }

    pub fn xs(&self) -> &[f32] {
        &self.xs
    }

    pub fn ys(&self) -> &[f32] {
        &self.ys
    }

    pub fn heights(&self) -> &[f32] {
        &self.heights
    }

    pub fn sample(&self, col: usize, row: usize) -> Option<f32> {
        if col >= self.xs.len() || row >= self.ys.len() {
            return None;
        }
        Some(self.heights[row * self.xs.len() + col])
    }

    pub fn vertex(&self, col: usize, row: usize) -> Option<Point3<f32>> {
        let z = self.sample(col, row)?;
        Some(Point3::new(self.xs[col], self.ys[row], z))
    }
}

/// Finds the bracketing index pair for `v` and the fractional offset within it.
///
/// `v` is clamped into the coordinate range first; the scan takes the first
/// pair that contains it. Requires at least two coordinates.
fn bracket(coords: &[f32], v: f32) -> (usize, usize, f32) {
    let last = coords.len() - 1;
    let v = v.clamp(coords[0], coords[last]);

    let i0 = coords
        .windows(2)
        .position(|pair| pair[0] <= v && v <= pair[1])
        .unwrap_or(0);
    let (c0, c1) = (coords[i0], coords[i0 + 1]);

    let span = c1 - c0;
    let t = if span > 0.0 { (v - c0) / span } else { 0.0 };
    (i0, i0 + 1, t)
}

impl HeightQueryable for LatticeGrid {
    fn height_at(&self, x: f32, y: f32) -> f32 {
        if self.dimensions().is_degenerate() {
            return 0.0;
        }
        let w = self.xs.len();
        let (i0, i1, tx) = bracket(&self.xs, x);
        let (j0, j1, ty) = bracket(&self.ys, y);

        blend(
            self.heights[j0 * w + i0],
            self.heights[j0 * w + i1],
            self.heights[j1 * w + i0],
            self.heights[j1 * w + i1],
            tx,
            ty,
        )
    }

    fn bounds(&self) -> Bounds {
        let first_last = |c: &[f32]| match (c.first(), c.last()) {
            (Some(a), Some(b)) => (*a, *b),
            _ => (0.0, 0.0),
        };
        let (min_x, max_x) = first_last(&self.xs);
        let (min_y, max_y) = first_last(&self.ys);
        Bounds {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    fn dimensions(&self) -> GridDimensions {
        GridDimensions::new(self.xs.len(), self.ys.len())
    }
}

// =============================================================================
// TERRAIN GRID
// =============================================================================

/// A loaded terrain, whichever layout it came from.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum TerrainGrid {
    /// Nothing loaded yet
    #[default]
    Empty,

    /// Metadata + dense array
    Dense(DenseGrid),

    /// Lattice deduced from scattered points
    Lattice(LatticeGrid),
}

impl TerrainGrid {
    /// Short layout name for logs and exports.
    pub fn kind(&self) -> &'static str {
        match self {
            TerrainGrid::Empty => "empty",
            TerrainGrid::Dense(_) => "dense",
            TerrainGrid::Lattice(_) => "lattice",
        }
    }

    /// All samples, row-major.
    pub fn heights(&self) -> &[f32] {
        match self {
            TerrainGrid::Empty => &[],
            TerrainGrid::Dense(grid) => grid.heights(),
            TerrainGrid::Lattice(grid) => grid.heights(),
        }
    }

    /// Stored height at (col, row).
    pub fn sample(&self, col: usize, row: usize) -> Option<f32> {
        match self {
            TerrainGrid::Empty => None,
            TerrainGrid::Dense(grid) => grid.sample(col, row),
            TerrainGrid::Lattice(grid) => grid.sample(col, row),
        }
    }

    /// World-space position of sample (col, row).
    pub fn vertex(&self, col: usize, row: usize) -> Option<Point3<f32>> {
        match self {
            TerrainGrid::Empty => None,
            TerrainGrid::Dense(grid) => grid.vertex(col, row),
            TerrainGrid::Lattice(grid) => grid.vertex(col, row),
        }
    }

    /// Lowest and highest stored sample, `None` when there are no samples.
    pub fn height_range(&self) -> Option<(f32, f32)> {
        let heights = self.heights();
        if heights.is_empty() {
            return None;
        }
        Some(heights.iter().fold((f32::MAX, -f32::MAX), |(lo, hi), &h| {
            (lo.min(h), hi.max(h))
        }))
    }

    pub fn is_degenerate(&self) -> bool {
        self.dimensions().is_degenerate()
    }
}

impl HeightQueryable for TerrainGrid {
    fn height_at(&self, x: f32, y: f32) -> f32 {
        match self {
            TerrainGrid::Empty => 0.0,
            TerrainGrid::Dense(grid) => grid.height_at(x, y),
            TerrainGrid::Lattice(grid) => grid.height_at(x, y),
        }
    }

    fn bounds(&self) -> Bounds {
        match self {
            TerrainGrid::Empty => Bounds::default(),
            TerrainGrid::Dense(grid) => grid.bounds(),
            TerrainGrid::Lattice(grid) => grid.bounds(),
        }
    }

    fn dimensions(&self) -> GridDimensions {
        match self {
            TerrainGrid::Empty => GridDimensions::default(),
            TerrainGrid::Dense(grid) => grid.dimensions(),
            TerrainGrid::Lattice(grid) => grid.dimensions(),
        }
    }
}

impl From<DenseGrid> for TerrainGrid {
    fn from(grid: DenseGrid) -> Self {
        TerrainGrid::Dense(grid)
    }
}

impl From<LatticeGrid> for TerrainGrid {
    fn from(grid: LatticeGrid) -> Self {
        TerrainGrid::Lattice(grid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    /// 2x2 grid: row 0 (y=0) = [0, 10], row 1 (y=1) = [20, 30]
    fn square() -> DenseGrid {
        DenseGrid::new(0.0, 0.0, 1.0, GridDimensions::new(2, 2), vec![0.0, 10.0, 20.0, 30.0])
            .unwrap()
    }

    #[test]
    fn test_bilinear_midpoint() {
        let grid = square();
        assert_relative_eq!(grid.height_at(0.5, 0.5), 15.0, epsilon = 1e-6);
        assert_relative_eq!(grid.height_at(0.5, 0.0), 5.0, epsilon = 1e-6);
        assert_relative_eq!(grid.height_at(0.0, 0.5), 10.0, epsilon = 1e-6);
    }

    #[test]
    fn test_exact_at_corners() {
        let grid = square();
        assert_eq!(grid.height_at(0.0, 0.0), 0.0);
        assert_eq!(grid.height_at(1.0, 0.0), 10.0);
        assert_eq!(grid.height_at(0.0, 1.0), 20.0);
        assert_eq!(grid.height_at(1.0, 1.0), 30.0);
    }

    #[test]
    fn test_out_of_range_clamps_to_edge() {
        let grid = square();
        assert_eq!(grid.height_at(-5.0, -5.0), 0.0);
        assert_eq!(grid.height_at(9.0, -1.0), 10.0);
        assert_eq!(grid.height_at(9.0, 9.0), 30.0);
        assert_relative_eq!(grid.height_at(0.5, 42.0), 25.0, epsilon = 1e-6);
    }

    #[test]
    fn test_nearest_lower_policy() {
        let grid = square().with_sampling(HeightSampling::NearestLower);
        assert_eq!(grid.height_at(0.5, 0.5), 0.0);
        assert_eq!(grid.height_at(1.0, 0.2), 10.0);
        assert_eq!(grid.height_at(0.99, 1.5), 20.0);
        assert_eq!(grid.height_at(-3.0, 7.0), 20.0);
    }

    #[test]
    fn test_degenerate_grid_returns_zero() {
        let grid = DenseGrid::new(0.0, 0.0, 1.0, GridDimensions::new(1, 3), vec![4.0, 5.0, 6.0])
            .unwrap();
        assert_eq!(grid.height_at(0.0, 1.0), 0.0);
        assert_eq!(TerrainGrid::Empty.height_at(1.0, 1.0), 0.0);
    }

    #[test]
    fn test_dense_rejects_bad_input() {
        let dims = GridDimensions::new(2, 2);
        assert!(DenseGrid::new(0.0, 0.0, 1.0, dims, vec![0.0; 3]).is_err());
        assert!(DenseGrid::new(0.0, 0.0, 0.0, dims, vec![0.0; 4]).is_err());
        assert!(DenseGrid::new(0.0, 0.0, f32::NAN, dims, vec![0.0; 4]).is_err());
    }

    #[test]
    fn test_dense_bounds_and_vertices() {
        let grid = DenseGrid::new(-1.0, 2.0, 0.5, GridDimensions::new(3, 2), vec![0.0; 6]).unwrap();
        let bounds = grid.bounds();
        assert_eq!(bounds.max_x, 0.0);
        assert_eq!(bounds.max_y, 2.5);
        assert_eq!(grid.vertex(2, 1), Some(Point3::new(0.0, 2.5, 0.0)));
        assert_eq!(grid.vertex(3, 0), None);
    }

    #[test]
    fn test_lattice_bilinear() {
        // Non-uniform spacing: xs = [0, 1, 3], ys = [0, 2]
        let lattice = LatticeGrid::new(
            vec![0.0, 1.0, 3.0],
            vec![0.0, 2.0],
            vec![0.0, 10.0, 30.0, 0.0, 10.0, 30.0],
        )
        .unwrap();

        assert_relative_eq!(lattice.height_at(2.0, 1.0), 20.0, epsilon = 1e-6);
        assert_relative_eq!(lattice.height_at(0.5, 0.0), 5.0, epsilon = 1e-6);
        assert_eq!(lattice.height_at(1.0, 2.0), 10.0);
        assert_eq!(lattice.height_at(100.0, -100.0), 30.0);
    }

    #[test]
    fn test_lattice_rejects_unsorted_axis() {
        let result = LatticeGrid::new(vec![1.0, 0.0], vec![0.0, 1.0], vec![0.0; 4]);
        assert!(result.is_err());
    }

    #[test]
    fn test_bracket_first_match_on_shared_breakpoint() {
        let (i0, i1, t) = bracket(&[0.0, 1.0, 2.0], 1.0);
        assert_eq!((i0, i1), (0, 1));
        assert_eq!(t, 1.0);
    }

    #[test]
    fn test_terrain_height_range() {
        let terrain = TerrainGrid::from(square());
        assert_eq!(terrain.height_range(), Some((0.0, 30.0)));
        assert_eq!(TerrainGrid::Empty.height_range(), None);
        assert_eq!(terrain.kind(), "dense");
    }

    fn grid_strategy() -> impl Strategy<Value = DenseGrid> {
        (2usize..8, 2usize..8, 0.25f32..4.0, -50.0f32..50.0, -50.0f32..50.0).prop_flat_map(
            |(w, h, spacing, min_x, min_y)| {
                prop::collection::vec(-100.0f32..100.0, w * h).prop_map(move |heights| {
                    DenseGrid::new(min_x, min_y, spacing, GridDimensions::new(w, h), heights)
                        .unwrap()
                })
            },
        )
    }

    proptest! {
        #[test]
        fn prop_lattice_points_return_stored_height(grid in grid_strategy()) {
            let dims = grid.dimensions();
            for row in 0..dims.height {
                for col in 0..dims.width {
                    let v = grid.vertex(col, row).unwrap();
                    let got = grid.height_at(v.x, v.y);
                    prop_assert!((got - v.z).abs() <= 1e-2, "({}, {}): {} vs {}", col, row, got, v.z);
                }
            }
        }

        #[test]
        fn prop_bilinear_is_bounded(grid in grid_strategy(), u in 0.0f32..1.0, v in 0.0f32..1.0) {
            let bounds = grid.bounds();
            let x = bounds.min_x + u * bounds.width();
            let y = bounds.min_y + v * bounds.depth();

            let (min_x, min_y) = grid.origin();
            let dims = grid.dimensions();
            let col = (((x - min_x) / grid.spacing()).floor() as usize).min(dims.width - 2);
            let row = (((y - min_y) / grid.spacing()).floor() as usize).min(dims.height - 2);
            let corners = [
                grid.sample(col, row).unwrap(),
                grid.sample(col + 1, row).unwrap(),
                grid.sample(col, row + 1).unwrap(),
                grid.sample(col + 1, row + 1).unwrap(),
            ];
            let lo = corners.iter().cloned().fold(f32::MAX, f32::min);
            let hi = corners.iter().cloned().fold(-f32::MAX, f32::max);

            let h = grid.height_at(x, y);
            prop_assert!(h >= lo - 1e-3 && h <= hi + 1e-3, "{} not in [{}, {}]", h, lo, hi);
        }

        #[test]
        fn prop_lattice_grid_returns_stored_height(lattice in lattice_strategy()) {
            let dims = lattice.dimensions();
            for row in 0..dims.height {
                for col in 0..dims.width {
                    let v = lattice.vertex(col, row).unwrap();
                    let got = lattice.height_at(v.x, v.y);
                    prop_assert!((got - v.z).abs() <= 1e-2, "({}, {}): {} vs {}", col, row, got, v.z);
                }
            }
        }

        #[test]
        fn prop_lattice_bilinear_is_bounded(lattice in lattice_strategy(), u in 0.0f32..1.0, v in 0.0f32..1.0) {
            let bounds = lattice.bounds();
            let x = bounds.min_x + u * bounds.width();
            let y = bounds.min_y + v * bounds.depth();

            let (i0, i1, _) = bracket(lattice.xs(), x);
            let (j0, j1, _) = bracket(lattice.ys(), y);
            let corners = [
                lattice.sample(i0, j0).unwrap(),
                lattice.sample(i1, j0).unwrap(),
                lattice.sample(i0, j1).unwrap(),
                lattice.sample(i1, j1).unwrap(),
            ];
            let lo = corners.iter().cloned().fold(f32::MAX, f32::min);
            let hi = corners.iter().cloned().fold(-f32::MAX, f32::max);

            let h = lattice.height_at(x, y);
            prop_assert!(h >= lo - 1e-3 && h <= hi + 1e-3, "{} not in [{}, {}]", h, lo, hi);
        }
    }

    /// Strictly ascending coordinates with uneven gaps.
    fn axis_strategy() -> impl Strategy<Value = Vec<f32>> {
        (-50.0f32..50.0, prop::collection::vec(0.1f32..5.0, 1..7)).prop_map(|(start, gaps)| {
            let mut coords = vec![start];
            for gap in gaps {
                let next = coords[coords.len() - 1] + gap;
                coords.push(next);
            }
            coords
        })
    }

    fn lattice_strategy() -> impl Strategy<Value = LatticeGrid> {
        (axis_strategy(), axis_strategy()).prop_flat_map(|(xs, ys)| {
            let n = xs.len() * ys.len();
            prop::collection::vec(-100.0f32..100.0, n).prop_map(move |heights| {
                LatticeGrid::new(xs.clone(), ys.clone(), heights).unwrap()
            })
        })
    }
}
