//! Terrain ingestion: JSON metadata + binary heights, or scattered point tables.

use std::path::{Path, PathBuf};

use egoviz_env::AssetSource;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{EgoVizError, Result};
use crate::terrain::{
    DenseGrid, GridDimensions, HeightQueryable, HeightSampling, LatticeGrid, TerrainGrid,
};

/// Scalar description of a dense height grid.
///
/// Field names follow the generator output (`x_min`, `delta`); the
/// `min_x`/`min_y`/`spacing` spellings are accepted as well.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TerrainMetadata {
    #[serde(alias = "min_x")]
    pub x_min: f32,

    #[serde(alias = "min_y")]
    pub y_min: f32,

    /// Samples along x
    pub width: usize,

    /// Samples along y
    pub height: usize,

    /// Sample spacing on both axes
    #[serde(alias = "spacing")]
    pub delta: f32,
}

impl TerrainMetadata {
    pub fn dimensions(&self) -> GridDimensions {
        GridDimensions::new(self.width, self.height)
    }

    /// Size in bytes of the matching little-endian f32 blob, `None` on overflow.
    pub fn expected_blob_len(&self) -> Option<usize> {
        self.dimensions()
            .cell_count()?
            .checked_mul(std::mem::size_of::<f32>())
    }
}

/// Where a terrain comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerrainSource {
    /// JSON metadata plus a binary blob of heights
    Dense { metadata: PathBuf, heights: PathBuf },

    /// Delimited `(x, y, z)` table
    Scattered { table: PathBuf },
}

impl TerrainSource {
    /// Picks the ingestion path from the file extension.
    ///
    /// `.json` is dense metadata whose heights sit next to it with a `.bin`
    /// extension; everything else is read as a scattered table.
    pub fn detect(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        if is_json {
            TerrainSource::Dense {
                metadata: path.to_path_buf(),
                heights: path.with_extension("bin"),
            }
        } else {
            TerrainSource::Scattered {
                table: path.to_path_buf(),
            }
        }
    }

    /// Overrides the height blob location of a dense source.
    pub fn with_heights(self, heights: impl Into<PathBuf>) -> Self {
        match self {
            TerrainSource::Dense { metadata, .. } => TerrainSource::Dense {
                metadata,
                heights: heights.into(),
            },
            other => other,
        }
    }
}

/// Loads a terrain through the host's asset source.
///
/// Returns a fresh grid; a failed load leaves whatever the caller already
/// holds untouched.
pub fn load_terrain<A: AssetSource + ?Sized>(
    assets: &A,
    source: &TerrainSource,
    sampling: HeightSampling,
) -> Result<TerrainGrid> {
    match source {
        TerrainSource::Dense { metadata, heights } => {
            let json = assets
                .read_text(metadata)
                .map_err(|e| EgoVizError::io(metadata, e))?;
            let meta = parse_metadata(&json)?;
            info!(
                "Parsed terrain metadata: x_min={} y_min={} width={} height={} delta={}",
                meta.x_min, meta.y_min, meta.width, meta.height, meta.delta
            );

            let blob = assets
                .read_bytes(heights)
                .map_err(|e| EgoVizError::io(heights, e))?;
            let grid = dense_from_blob(&meta, &blob)?.with_sampling(sampling);
            info!("Loaded heightmap: {}x{}", meta.width, meta.height);
            Ok(TerrainGrid::Dense(grid))
        }
        TerrainSource::Scattered { table } => {
            let text = assets
                .read_text(table)
                .map_err(|e| EgoVizError::io(table, e))?;
            let lattice = parse_scattered(&text)?;
            let dims = lattice.dimensions();
            info!("Loaded lattice terrain: {}x{}", dims.width, dims.height);
            Ok(TerrainGrid::Lattice(lattice))
        }
    }
}

/// Parses the JSON metadata record.
pub fn parse_metadata(json: &str) -> Result<TerrainMetadata> {
    serde_json::from_str(json)
        .map_err(|e| EgoVizError::format(format!("invalid terrain metadata: {}", e)))
}

/// Decodes a blob of little-endian f32 samples, insisting on an exact size.
pub fn decode_heights(blob: &[u8], expected_samples: usize) -> Result<Vec<f32>> {
    let expected_len = expected_samples
        .checked_mul(std::mem::size_of::<f32>())
        .ok_or_else(|| {
            EgoVizError::format(format!("{} height samples is too many", expected_samples))
        })?;
    if blob.len() != expected_len {
        return Err(EgoVizError::format(format!(
            "binary size mismatch: expected {} bytes, got {}",
            expected_len,
            blob.len()
        )));
    }

    Ok(blob
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

/// Encodes samples the way [`decode_heights`] expects them.
pub fn encode_heights(heights: &[f32]) -> Vec<u8> {
    heights.iter().flat_map(|h| h.to_le_bytes()).collect()
}

/// Builds a dense grid from metadata and its height blob.
pub fn dense_from_blob(meta: &TerrainMetadata, blob: &[u8]) -> Result<DenseGrid> {
    let samples = meta.dimensions().cell_count().ok_or_else(|| {
        EgoVizError::format(format!(
            "terrain of {}x{} samples is too large",
            meta.width, meta.height
        ))
    })?;
    let heights = decode_heights(blob, samples)?;
    DenseGrid::new(meta.x_min, meta.y_min, meta.delta, meta.dimensions(), heights)
}

/// Parses a scattered `(x, y, z)` table and deduces its lattice.
///
/// The first row is a header and is skipped. Rows with fewer than three
/// fields, unparseable numbers or non-finite values are dropped with a
/// warning rather than failing the load.
pub fn parse_scattered(text: &str) -> Result<LatticeGrid> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let mut points = Vec::new();
    let mut dropped = 0usize;

    for (line, record) in reader.records().enumerate() {
        let record = record?;
        let parsed = (record.len() >= 3)
            .then(|| {
                let field = |i: usize| record[i].parse::<f32>().ok().filter(|v| v.is_finite());
                Some((field(0)?, field(1)?, field(2)?))
            })
            .flatten();

        match parsed {
            Some(point) => points.push(point),
            None => {
                dropped += 1;
                warn!("Skipping terrain row {}: {:?}", line + 2, record);
            }
        }
    }

    if dropped > 0 {
        warn!("Dropped {} malformed terrain rows", dropped);
    }
    lattice_from_points(&points)
}

/// Normalises `-0.0` to `0.0` so both land on the same lattice line.
fn canonical(v: f32) -> f32 {
    v + 0.0
}

fn distinct_sorted(values: impl Iterator<Item = f32>) -> Vec<f32> {
    let mut coords: Vec<f32> = values.map(canonical).collect();
    coords.sort_by(|a, b| a.total_cmp(b));
    coords.dedup();
    coords
}

/// Deduces a rectilinear lattice from unordered points.
///
/// The distinct x and y values, sorted ascending, become the axes. Every
/// point is placed at the cell its coordinates match exactly. Cells that
/// no point reaches are filled with 0; when two points share a cell the
/// later one wins.
pub fn lattice_from_points(points: &[(f32, f32, f32)]) -> Result<LatticeGrid> {
    let xs = distinct_sorted(points.iter().map(|p| p.0));
    let ys = distinct_sorted(points.iter().map(|p| p.1));

    let width = xs.len();
    let mut heights = vec![0.0f32; width * ys.len()];
    let mut filled = vec![false; heights.len()];
    let mut unmatched = 0usize;
    let mut duplicates = 0usize;

    for &(x, y, z) in points {
        let col = xs.binary_search_by(|c| c.total_cmp(&canonical(x)));
        let row = ys.binary_search_by(|c| c.total_cmp(&canonical(y)));
        match (col, row) {
            (Ok(col), Ok(row)) => {
                let idx = row * width + col;
                if filled[idx] {
                    duplicates += 1;
                }
                heights[idx] = z;
                filled[idx] = true;
            }
            _ => {
                unmatched += 1;
                warn!("Point ({}, {}) does not match any lattice cell", x, y);
            }
        }
    }

    let holes = filled.iter().filter(|f| !**f).count();
    if unmatched > 0 {
        warn!("Dropped {} points outside the deduced lattice", unmatched);
    }
    if duplicates > 0 {
        warn!("{} points landed on an already filled cell; kept the later ones", duplicates);
    }
    if holes > 0 {
        warn!("{} lattice cells have no sample and were set to 0", holes);
    }
    if width < 2 || ys.len() < 2 {
        warn!(
            "Deduced lattice is {}x{}; surface generation will be skipped",
            width,
            ys.len()
        );
    }

    LatticeGrid::new(xs, ys, heights)
}
