//! Surface generation - triangulated, height-coloured terrain meshes.

use egoviz_env::{MeshBuffer, NodeId, Rgba, SceneHost, SurfaceMaterial};
use nalgebra::Point3;
use tracing::{info, warn};

use crate::error::{EgoVizError, Result};
use crate::terrain::{HeightQueryable, TerrainGrid};

/// Maps a height onto the blue → green → brown → white terrain gradient.
///
/// The normalised height `n = clamp((h - min_h) / range, 0, 1)` selects one
/// of four bands:
///
/// | band          | colour                         |
/// |---------------|--------------------------------|
/// | `[0, 0.25)`   | water to grass                 |
/// | `[0.25, 0.6)` | grass to earth                 |
/// | `[0.6, 0.85)` | earth to rock                  |
/// | `[0.85, 1]`   | rock to snow                   |
///
/// A flat terrain (`range <= 0`) is mid gray. `n` and the band parameter are
/// computed in `f32`, the channel polynomials in `f64`, then narrowed; any
/// reimplementation must keep that order to match colours bit for bit.
pub fn height_to_color(h: f32, min_h: f32, range: f32) -> Rgba {
    if range <= 0.0 {
        return Rgba::GRAY;
    }

    let n = ((h - min_h) / range).clamp(0.0, 1.0);

    let (r, g, b) = if n < 0.25 {
        let t = f64::from(n / 0.25);
        (0.0, 0.2 + 0.6 * t, 0.8 - 0.4 * t)
    } else if n < 0.6 {
        let t = f64::from((n - 0.25) / 0.35);
        (0.2 + 0.4 * t, 0.8 - 0.3 * t, 0.4 - 0.2 * t)
    } else if n < 0.85 {
        let t = f64::from((n - 0.6) / 0.25);
        (0.6 + 0.2 * t, 0.5 - 0.1 * t, 0.2 + 0.1 * t)
    } else {
        let t = f64::from((n - 0.85) / 0.15);
        (0.8 + 0.2 * t, 0.4 + 0.6 * t, 0.3 + 0.7 * t)
    };

    Rgba::new(r as f32, g as f32, b as f32, 1.0)
}

/// Triangulates a terrain into a height-coloured triangle list.
///
/// Each cell with corners p1=(col,row), p2=(col+1,row), p3=(col,row+1),
/// p4=(col+1,row+1) yields triangles (p1, p2, p3) and (p2, p4, p3).
/// Returns `None` (after logging) for grids too small to form a cell.
pub fn generate_surface(grid: &TerrainGrid) -> Option<MeshBuffer> {
    let dims = grid.dimensions();
    if dims.is_degenerate() {
        warn!(
            "Grid too small to generate mesh ({}x{})",
            dims.width, dims.height
        );
        return None;
    }

    let (min_h, max_h) = grid.height_range()?;
    let range = max_h - min_h;
    info!("Height range: {} to {}", min_h, max_h);

    let corner = |col: usize, row: usize| -> Option<(Point3<f32>, Rgba)> {
        let p = grid.vertex(col, row)?;
        Some((p, height_to_color(p.z, min_h, range)))
    };

    let cells = (dims.width - 1) * (dims.height - 1);
    let mut mesh = MeshBuffer::with_triangle_capacity(cells * 2);

    for row in 0..dims.height - 1 {
        for col in 0..dims.width - 1 {
            let (Some(p1), Some(p2), Some(p3), Some(p4)) = (
                corner(col, row),
                corner(col + 1, row),
                corner(col, row + 1),
                corner(col + 1, row + 1),
            ) else {
                continue;
            };

            mesh.push_triangle([p1, p2, p3]);
            mesh.push_triangle([p2, p4, p3]);
        }
    }

    info!("Terrain mesh generated with {} triangles", mesh.triangle_count());
    Some(mesh)
}

/// Generates the terrain surface and hands it to the host.
///
/// Returns `Ok(false)` when the grid is degenerate and nothing was committed.
pub fn commit_terrain<H: SceneHost + ?Sized>(
    host: &mut H,
    grid: &TerrainGrid,
    material: &SurfaceMaterial,
) -> Result<bool> {
    let Some(mesh) = generate_surface(grid) else {
        return Ok(false);
    };
    host.commit_surface(NodeId::Terrain, &mesh, material)
        .map_err(EgoVizError::Host)?;
    Ok(true)
}

/// Marker mesh for the agent: a flat triangle pointing along local +Z.
pub fn agent_marker() -> (MeshBuffer, SurfaceMaterial) {
    let mut mesh = MeshBuffer::with_triangle_capacity(1);
    mesh.push_triangle([
        (Point3::new(-1.0, 0.0, -1.0), Rgba::RED),
        (Point3::new(1.0, 0.0, -1.0), Rgba::RED),
        (Point3::new(0.0, 0.0, 1.0), Rgba::RED),
    ]);

    let material = SurfaceMaterial {
        albedo: Rgba::RED,
        roughness: 1.0,
        emission: Some((Rgba::new(0.5, 0.0, 0.0, 1.0), 3.0)),
        vertex_colors: false,
    };
    (mesh, material)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::{DenseGrid, GridDimensions, LatticeGrid};
    use approx::assert_relative_eq;
    use egoviz_env::HeadlessScene;
    use proptest::prelude::*;

    fn grid(width: usize, height: usize) -> TerrainGrid {
        let heights = (0..width * height).map(|i| i as f32).collect();
        DenseGrid::new(10.0, 20.0, 2.0, GridDimensions::new(width, height), heights)
            .unwrap()
            .into()
    }

    #[test]
    fn test_color_flat_terrain_is_gray() {
        assert_eq!(height_to_color(3.0, 3.0, 0.0), Rgba::GRAY);
        assert_eq!(height_to_color(3.0, 3.0, -1.0), Rgba::GRAY);
    }

    #[test]
    fn test_color_band_endpoints() {
        let low = height_to_color(0.0, 0.0, 1.0);
        assert_eq!(low, Rgba::new(0.0, 0.2, 0.8, 1.0));

        let snow = height_to_color(1.0, 0.0, 1.0);
        assert_relative_eq!(snow.r, 1.0, epsilon = 1e-6);
        assert_relative_eq!(snow.g, 1.0, epsilon = 1e-6);
        assert_relative_eq!(snow.b, 1.0, epsilon = 1e-6);

        // Clamped above and below
        assert_eq!(height_to_color(-50.0, 0.0, 1.0), low);
        assert_eq!(height_to_color(50.0, 0.0, 1.0), snow);
    }

    #[test]
    fn test_color_continuity_across_bands() {
        let eps = 1e-4;
        let below = |n: f32| height_to_color(n - eps, 0.0, 1.0);
        let at = |n: f32| height_to_color(n, 0.0, 1.0);

        for n in [0.6f32, 0.85] {
            let (a, b) = (below(n), at(n));
            assert_relative_eq!(a.r, b.r, epsilon = 1e-3);
            assert_relative_eq!(a.g, b.g, epsilon = 1e-3);
            assert_relative_eq!(a.b, b.b, epsilon = 1e-3);
        }

        // Water → grass keeps green and blue continuous; red steps from 0 to 0.2
        let (a, b) = (below(0.25), at(0.25));
        assert_relative_eq!(a.g, b.g, epsilon = 1e-3);
        assert_relative_eq!(a.b, b.b, epsilon = 1e-3);
        assert_relative_eq!(b.r, 0.2, epsilon = 1e-6);
    }

    #[test]
    fn test_color_matches_f64_channel_math() {
        // n = 0.5 → band 2, t = 0.25 / 0.35 computed in f32
        let t = f64::from((0.5f32 - 0.25) / 0.35);
        let c = height_to_color(5.0, 0.0, 10.0);
        assert_eq!(c.r, (0.2 + 0.4 * t) as f32);
        assert_eq!(c.g, (0.8 - 0.3 * t) as f32);
        assert_eq!(c.b, (0.4 - 0.2 * t) as f32);
        assert_eq!(c.a, 1.0);
    }

    #[test]
    fn test_surface_triangle_count_and_winding() {
        let terrain = grid(3, 2);
        let mesh = generate_surface(&terrain).unwrap();

        assert_eq!(mesh.triangle_count(), (3 - 1) * (2 - 1) * 2);
        assert_eq!(mesh.colors.len(), mesh.positions.len());

        // First cell: p1=(10,20,0) p2=(12,20,1) p3=(10,22,3) p4=(12,22,4)
        let [a, b, c] = mesh.triangle(0).unwrap();
        assert_eq!(a, Point3::new(10.0, 20.0, 0.0));
        assert_eq!(b, Point3::new(12.0, 20.0, 1.0));
        assert_eq!(c, Point3::new(10.0, 22.0, 3.0));

        let [a, b, c] = mesh.triangle(1).unwrap();
        assert_eq!(a, Point3::new(12.0, 20.0, 1.0));
        assert_eq!(b, Point3::new(12.0, 22.0, 4.0));
        assert_eq!(c, Point3::new(10.0, 22.0, 3.0));
    }

    #[test]
    fn test_surface_vertex_colors_follow_height() {
        let mesh = generate_surface(&grid(2, 2)).unwrap();
        // heights 0..=3, so the lowest vertex is the first one
        assert_eq!(mesh.colors[0], height_to_color(0.0, 0.0, 3.0));
        assert_eq!(mesh.colors[4], height_to_color(3.0, 0.0, 3.0));
    }

    #[test]
    fn test_surface_lattice_uses_stored_points() {
        let lattice = LatticeGrid::new(vec![0.0, 5.0], vec![-1.0, 1.0], vec![1.0, 2.0, 3.0, 4.0])
            .unwrap();
        let mesh = generate_surface(&lattice.into()).unwrap();
        assert_eq!(mesh.positions[1], Point3::new(5.0, -1.0, 2.0));
    }

    #[test]
    fn test_surface_skipped_for_degenerate_grid() {
        assert!(generate_surface(&grid(1, 5)).is_none());
        assert!(generate_surface(&TerrainGrid::Empty).is_none());
    }

    #[test]
    fn test_commit_terrain() {
        let mut scene = HeadlessScene::new();
        assert!(commit_terrain(&mut scene, &grid(4, 4), &SurfaceMaterial::default()).unwrap());
        assert!(!commit_terrain(&mut scene, &grid(1, 1), &SurfaceMaterial::default()).unwrap());

        let (mesh, material) = scene.surface(NodeId::Terrain).unwrap();
        assert_eq!(mesh.triangle_count(), 18);
        assert_eq!(material.roughness, 0.8);
    }

    #[test]
    fn test_agent_marker_points_forward() {
        let (mesh, material) = agent_marker();
        assert_eq!(mesh.triangle_count(), 1);
        assert_eq!(mesh.positions[2], Point3::new(0.0, 0.0, 1.0));
        assert!(material.emission.is_some());
    }

    proptest! {
        #[test]
        fn prop_color_is_pure_and_in_range(h in -1e3f32..1e3, min_h in -1e3f32..1e3, range in 0.001f32..1e3) {
            let a = height_to_color(h, min_h, range);
            let b = height_to_color(h, min_h, range);
            prop_assert_eq!(a, b);
            for c in [a.r, a.g, a.b] {
                prop_assert!((0.0..=1.0).contains(&c));
            }
            prop_assert_eq!(a.a, 1.0);
        }
    }
}
