//! Surface construction: angular grid, harmonic evaluation, the spherical to
//! Cartesian transform, color normalization and the three planar contour
//! projections that accompany the 3-D surface.

use std::f64::consts::PI;

use ndarray::{Array1, Array2, Zip};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::colormap::Colormap;
use crate::config::RenderConfig;
use crate::error::HarmonicError;
use crate::physics::{real_harmonic, y00, QuantumNumbers};

/// Rectangular mesh over θ ∈ [0, π] and φ ∈ [0, 2π].
///
/// Shape is `(phi_resolution, theta_resolution)`: row `j` holds φ_j and
/// column `i` holds θ_i, so every (θ_i, φ_j) pair appears exactly once.
#[derive(Debug, Clone, PartialEq)]
pub struct AngularGrid {
    pub theta: Array2<f64>,
    pub phi: Array2<f64>,
}

impl AngularGrid {
    pub fn from_config(config: &RenderConfig) -> Self {
        build_grid(config.theta_resolution, config.phi_resolution)
    }

    pub fn shape(&self) -> (usize, usize) {
        self.theta.dim()
    }
}

impl Default for AngularGrid {
    fn default() -> Self {
        let config = RenderConfig::default();
        build_grid(config.theta_resolution, config.phi_resolution)
    }
}

/// Linearly spaced θ and φ sequences expanded into a 2-D mesh.
pub fn build_grid(theta_resolution: usize, phi_resolution: usize) -> AngularGrid {
    let thetas = Array1::linspace(0.0, PI, theta_resolution);
    let phis = Array1::linspace(0.0, 2.0 * PI, phi_resolution);
    let shape = (phi_resolution, theta_resolution);
    AngularGrid {
        theta: Array2::from_shape_fn(shape, |(_, i)| thetas[i]),
        phi: Array2::from_shape_fn(shape, |(j, _)| phis[j]),
    }
}

/// Cartesian coordinate fields derived from (R, θ, φ).
#[derive(Debug, Clone, PartialEq)]
pub struct Cartesian {
    pub x: Array2<f64>,
    pub y: Array2<f64>,
    pub z: Array2<f64>,
}

/// X = R sin θ cos φ, Y = R sin θ sin φ, Z = R cos θ
pub fn to_cartesian(radius: &Array2<f64>, theta: &Array2<f64>, phi: &Array2<f64>) -> Cartesian {
    let x = Zip::from(radius)
        .and(theta)
        .and(phi)
        .map_collect(|&r, &t, &p| r * t.sin() * p.cos());
    let y = Zip::from(radius)
        .and(theta)
        .and(phi)
        .map_collect(|&r, &t, &p| r * t.sin() * p.sin());
    let z = Zip::from(radius).and(theta).map_collect(|&r, &t| r * t.cos());
    Cartesian { x, y, z }
}

/// Which branch produced the color scalar field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Normalization {
    /// (l, m) = (0, 0): the field is the constant Y_00 and is divided by it.
    FixedDivisor { divisor: f64 },
    /// (v - min) / (max - min) over the whole field.
    MinMax { min: f64, max: f64 },
    /// Zero-range field outside (0, 0); every color is the neutral midpoint.
    Degenerate { value: f64 },
}

/// Color used for every point of a zero-range field.
pub const DEGENERATE_COLOR: f64 = 0.5;

/// Maps the signed harmonic field into the colormap domain.
///
/// The constant (0, 0) harmonic is always routed through the fixed divisor
/// (4π)^(-1/2), which maps it to 1.0 everywhere. Any other field with zero
/// range is painted with [`DEGENERATE_COLOR`] instead of dividing by zero.
pub fn normalize_colors(values: &Array2<f64>, qn: QuantumNumbers) -> (Array2<f64>, Normalization) {
    match normalize(values, qn) {
        Ok(result) => result,
        Err(value) => {
            warn!(
                l = qn.l,
                m = qn.m,
                value,
                "harmonic field has zero range; using a constant color"
            );
            (
                Array2::from_elem(values.dim(), DEGENERATE_COLOR),
                Normalization::Degenerate { value },
            )
        }
    }
}

/// Like [`normalize_colors`], but reports a zero-range field as
/// [`HarmonicError::NumericDegeneracy`].
pub fn normalize_colors_strict(
    values: &Array2<f64>,
    qn: QuantumNumbers,
) -> Result<(Array2<f64>, Normalization), HarmonicError> {
    normalize(values, qn).map_err(HarmonicError::NumericDegeneracy)
}

/// Err carries the constant value of a zero-range field.
fn normalize(values: &Array2<f64>, qn: QuantumNumbers) -> Result<(Array2<f64>, Normalization), f64> {
    if qn.is_constant() {
        let divisor = y00();
        return Ok((values.mapv(|v| v / divisor), Normalization::FixedDivisor { divisor }));
    }

    let (min, max) = field_range(values);
    if !min.is_finite() || !max.is_finite() {
        return Err(if min.is_finite() { min } else { 0.0 });
    }
    let range = max - min;
    let scale = min.abs().max(max.abs());
    if range <= f64::EPSILON * scale {
        return Err(min);
    }
    Ok((values.mapv(|v| (v - min) / range), Normalization::MinMax { min, max }))
}

/// Minimum and maximum, ignoring NaN. Empty input yields (inf, -inf).
pub fn field_range(values: &Array2<f64>) -> (f64, f64) {
    values.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
        (lo.min(v), hi.max(v))
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// Puts in-plane coordinates (u, v) back into 3-D with this axis pinned
    /// to `offset`.
    fn place(self, u: f64, v: f64, offset: f64) -> [f64; 3] {
        match self {
            Axis::X => [offset, u, v],
            Axis::Y => [u, offset, v],
            Axis::Z => [u, v, offset],
        }
    }
}

/// One contour level projected onto a coordinate plane.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContourLine {
    pub level: f64,
    pub color: [f32; 3],
    pub segments: Vec<[[f64; 3]; 2]>,
}

/// Level sets of one coordinate field, drawn flat on the plane
/// `axis = offset`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContourProjection {
    pub axis: Axis,
    pub offset: f64,
    pub colormap: Colormap,
    pub lines: Vec<ContourLine>,
}

impl ContourProjection {
    pub fn segment_count(&self) -> usize {
        self.lines.iter().map(|line| line.segments.len()).sum()
    }
}

/// `count` levels evenly spaced strictly inside (min, max).
pub fn contour_levels(min: f64, max: f64, count: usize) -> Vec<f64> {
    if count == 0 || !min.is_finite() || !max.is_finite() || max <= min {
        return Vec::new();
    }
    let step = (max - min) / (count + 1) as f64;
    (1..=count).map(|k| min + step * k as f64).collect()
}

/// Builds the contour projection of `height` over the parametric grid, using
/// `u` and `v` as the in-plane coordinates.
pub fn project_contours(
    height: &Array2<f64>,
    u: &Array2<f64>,
    v: &Array2<f64>,
    axis: Axis,
    offset: f64,
    colormap: Colormap,
    level_count: usize,
) -> ContourProjection {
    let (min, max) = field_range(height);
    let lines = contour_levels(min, max, level_count)
        .into_iter()
        .map(|level| {
            let segments = marching_squares(height, u, v, level)
                .into_iter()
                .map(|[a, b]| [axis.place(a[0], a[1], offset), axis.place(b[0], b[1], offset)])
                .collect();
            ContourLine {
                level,
                color: colormap.sample((level - min) / (max - min)),
                segments,
            }
        })
        .collect();
    ContourProjection {
        axis,
        offset,
        colormap,
        lines,
    }
}

/// Marching squares over a 2-D field. Returns segments in (u, v)
/// coordinates, linearly interpolated along cell edges. Cells touching a
/// non-finite value are skipped; saddles are resolved by the cell mean.
pub fn marching_squares(
    field: &Array2<f64>,
    u: &Array2<f64>,
    v: &Array2<f64>,
    level: f64,
) -> Vec<[[f64; 2]; 2]> {
    let (rows, cols) = field.dim();
    let mut segments = Vec::new();
    if rows < 2 || cols < 2 {
        return segments;
    }

    for j in 0..rows - 1 {
        for i in 0..cols - 1 {
            // Corners in winding order: c0 (j,i), c1 (j,i+1), c2 (j+1,i+1), c3 (j+1,i)
            let corners = [(j, i), (j, i + 1), (j + 1, i + 1), (j + 1, i)];
            let f = corners.map(|idx| field[idx]);
            if f.iter().any(|value| !value.is_finite()) {
                continue;
            }

            let mut case = 0u8;
            for (bit, value) in f.iter().enumerate() {
                if *value > level {
                    case |= 1 << bit;
                }
            }
            if case == 0 || case == 15 {
                continue;
            }

            // Edge k joins corner k and corner (k + 1) % 4.
            let crossing = |edge: usize| -> [f64; 2] {
                let a = corners[edge];
                let b = corners[(edge + 1) % 4];
                let (fa, fb) = (field[a], field[b]);
                let t = (level - fa) / (fb - fa);
                [u[a] + t * (u[b] - u[a]), v[a] + t * (v[b] - v[a])]
            };

            let center_above = f.iter().sum::<f64>() / 4.0 > level;
            let pairs: &[(usize, usize)] = match case {
                1 | 14 => &[(3, 0)],
                2 | 13 => &[(0, 1)],
                3 | 12 => &[(3, 1)],
                4 | 11 => &[(1, 2)],
                6 | 9 => &[(0, 2)],
                7 | 8 => &[(3, 2)],
                5 if center_above => &[(0, 1), (2, 3)],
                5 => &[(3, 0), (1, 2)],
                10 if center_above => &[(3, 0), (1, 2)],
                10 => &[(0, 1), (2, 3)],
                _ => &[],
            };
            for &(a, b) in pairs {
                segments.push([crossing(a), crossing(b)]);
            }
        }
    }

    segments
}

/// Everything produced by one evaluate-and-render cycle.
#[derive(Debug, Clone)]
pub struct Surface {
    pub quantum_numbers: QuantumNumbers,
    pub grid: AngularGrid,
    pub values: Array2<f64>,
    pub radius: Array2<f64>,
    pub cartesian: Cartesian,
    pub colors: Array2<f64>,
    pub rgba: Array2<[f32; 4]>,
    pub normalization: Normalization,
    /// Projections onto z = -extent, y = +extent and x = -extent, in that order.
    pub projections: Vec<ContourProjection>,
    pub view_extent: f64,
}

impl Surface {
    pub fn shape(&self) -> (usize, usize) {
        self.values.dim()
    }

    pub fn max_radius(&self) -> f64 {
        self.radius.iter().cloned().fold(0.0, f64::max)
    }

    /// Surface points as `[x, y, z]`, row-major over the grid.
    pub fn vertices(&self) -> Vec<[f64; 3]> {
        Zip::from(&self.cartesian.x)
            .and(&self.cartesian.y)
            .and(&self.cartesian.z)
            .map_collect(|&x, &y, &z| [x, y, z])
            .iter()
            .copied()
            .collect()
    }
}

/// Runs the full pipeline for one pair of quantum numbers.
///
/// `qn` is assumed valid; `config` supplies the view extent, the contour
/// density and the surface opacity. The grid is used as given.
pub fn render(qn: QuantumNumbers, grid: &AngularGrid, config: &RenderConfig) -> Surface {
    let values = real_harmonic(&grid.theta, &grid.phi, qn.l, qn.m);
    let radius = values.mapv(f64::abs);
    let cartesian = to_cartesian(&radius, &grid.theta, &grid.phi);

    let (colors, normalization) = normalize_colors(&values, qn);
    let rgba = colors.mapv(|c| Colormap::Coolwarm.rgba(c, config.surface_alpha));

    let extent = config.view_extent;
    let levels = config.contour_levels;
    let Cartesian { x, y, z } = &cartesian;
    let projections = vec![
        project_contours(z, x, y, Axis::Z, -extent, Colormap::Winter, levels),
        project_contours(y, x, z, Axis::Y, extent, Colormap::Summer, levels),
        project_contours(x, y, z, Axis::X, -extent, Colormap::Autumn, levels),
    ];

    for projection in &projections {
        debug!(
            axis = ?projection.axis,
            colormap = projection.colormap.name(),
            lines = projection.lines.len(),
            segments = projection.segment_count(),
            "contour projection"
        );
    }

    let surface = Surface {
        quantum_numbers: qn,
        grid: grid.clone(),
        values,
        radius,
        cartesian,
        colors,
        rgba,
        normalization,
        projections,
        view_extent: extent,
    };
    info!(
        l = qn.l,
        m = qn.m,
        shape = ?surface.shape(),
        max_radius = surface.max_radius(),
        normalization = ?surface.normalization,
        "rendered {}",
        qn.label()
    );
    surface
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    const TOL: f64 = 1e-12;

    fn qn(l: i64, m: i64) -> QuantumNumbers {
        QuantumNumbers::new(l, m).unwrap()
    }

    #[test]
    fn test_grid_shape_and_bounds() {
        let grid = build_grid(5, 3);
        assert_eq!(grid.shape(), (3, 5));
        assert_eq!(grid.phi.dim(), (3, 5));
        assert!((grid.theta[[0, 4]] - PI).abs() < TOL);
        assert!((grid.phi[[2, 0]] - 2.0 * PI).abs() < TOL);
        assert_eq!(grid.theta[[0, 0]], 0.0);
        // theta varies along columns only, phi along rows only
        for j in 0..3 {
            for i in 0..5 {
                assert_eq!(grid.theta[[j, i]], grid.theta[[0, i]]);
                assert_eq!(grid.phi[[j, i]], grid.phi[[j, 0]]);
            }
        }
    }

    #[test]
    fn test_default_grid_is_200_by_200() {
        assert_eq!(AngularGrid::default().shape(), (200, 200));
    }

    #[test]
    fn test_every_pair_appears_once() {
        let grid = build_grid(4, 6);
        let mut pairs: Vec<(u64, u64)> = grid
            .theta
            .iter()
            .zip(grid.phi.iter())
            .map(|(t, p)| (t.to_bits(), p.to_bits()))
            .collect();
        pairs.sort();
        pairs.dedup();
        assert_eq!(pairs.len(), 24);
    }

    #[test]
    fn test_constant_harmonic_maps_to_one() {
        let grid = build_grid(20, 20);
        let surface = render(qn(0, 0), &grid, &RenderConfig::default());
        assert!(matches!(surface.normalization, Normalization::FixedDivisor { .. }));
        for v in surface.values.iter() {
            assert!((v - y00()).abs() < TOL);
        }
        for c in surface.colors.iter() {
            assert!((c - 1.0).abs() < TOL);
        }
    }

    #[test]
    fn test_min_max_normalization_spans_unit_interval() {
        let grid = build_grid(40, 40);
        let surface = render(qn(2, 1), &grid, &RenderConfig::default());
        let (lo, hi) = field_range(&surface.colors);
        assert!(lo.abs() < TOL);
        assert!((hi - 1.0).abs() < TOL);
        assert!(matches!(surface.normalization, Normalization::MinMax { .. }));
    }

    #[test]
    fn test_zero_range_field_uses_constant_color() {
        let values = Array2::from_elem((3, 3), 0.25);
        let (colors, normalization) = normalize_colors(&values, qn(1, 0));
        assert_eq!(normalization, Normalization::Degenerate { value: 0.25 });
        assert!(colors.iter().all(|&c| c == DEGENERATE_COLOR));

        assert_eq!(
            normalize_colors_strict(&values, qn(1, 0)).unwrap_err(),
            HarmonicError::NumericDegeneracy(0.25)
        );

        let zeros = Array2::zeros((2, 2));
        let (colors, _) = normalize_colors(&zeros, qn(3, 3));
        assert!(colors.iter().all(|c| c.is_finite()));
    }

    #[test]
    fn test_cartesian_round_trip() {
        let grid = build_grid(30, 30);
        let surface = render(qn(3, -2), &grid, &RenderConfig::default());
        let Cartesian { x, y, z } = &surface.cartesian;
        for (((idx, &r), &t), ((xv, yv), zv)) in surface
            .radius
            .indexed_iter()
            .zip(surface.grid.theta.iter())
            .zip(x.iter().zip(y.iter()).zip(z.iter()))
        {
            let norm = (xv * xv + yv * yv + zv * zv).sqrt();
            assert!((norm - r).abs() < 1e-12, "radius mismatch at {idx:?}");
            if r > 1e-9 {
                let theta = (zv / r).clamp(-1.0, 1.0).acos();
                assert!((theta - t).abs() < 1e-6, "theta mismatch at {idx:?}");
            }
        }
    }

    #[test]
    fn test_pz_scenario() {
        let grid = AngularGrid::default();
        let config = RenderConfig::default();
        let surface = render(qn(1, 0), &grid, &config);
        let (_, cols) = surface.shape();

        let max_r = surface.max_radius();
        let expected = (3.0 / (4.0 * PI)).sqrt();
        assert!((max_r - expected).abs() < 1e-9);
        assert!((surface.radius[[0, 0]] - max_r).abs() < 1e-9);
        assert!((surface.radius[[0, cols - 1]] - max_r).abs() < 1e-9);

        // the minimum sits next to the equator
        let row = surface.radius.row(0);
        let (argmin, &min_r) = row
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.total_cmp(b.1))
            .unwrap();
        assert!(argmin == cols / 2 - 1 || argmin == cols / 2);
        assert!(min_r < 0.01 * max_r);

        // values flip sign across the equator
        assert!(surface.values[[0, 10]] > 0.0);
        assert!(surface.values[[0, cols - 11]] < 0.0);

        // the viewing box ignores the data range
        assert_eq!(surface.view_extent, 1.0);
        assert!(max_r < surface.view_extent);
    }

    #[test]
    fn test_contour_levels() {
        assert_eq!(contour_levels(0.0, 4.0, 3), vec![1.0, 2.0, 3.0]);
        assert!(contour_levels(1.0, 1.0, 5).is_empty());
        assert!(contour_levels(0.0, 1.0, 0).is_empty());
    }

    #[test]
    fn test_marching_squares_vertical_line() {
        // field = column index, so level 0.5 is the line u = 0.5
        let field = array![[0.0, 1.0, 2.0], [0.0, 1.0, 2.0], [0.0, 1.0, 2.0]];
        let u = field.clone();
        let v = array![[0.0, 0.0, 0.0], [1.0, 1.0, 1.0], [2.0, 2.0, 2.0]];
        let segments = marching_squares(&field, &u, &v, 0.5);
        assert_eq!(segments.len(), 2);
        for [a, b] in &segments {
            assert!((a[0] - 0.5).abs() < TOL);
            assert!((b[0] - 0.5).abs() < TOL);
            assert!((a[1] - b[1]).abs() == 1.0);
        }
    }

    #[test]
    fn test_marching_squares_skips_non_finite_cells() {
        let field = array![[0.0, f64::NAN], [1.0, 1.0]];
        let segments = marching_squares(&field, &field, &field, 0.5);
        assert!(segments.is_empty());
    }

    #[test]
    fn test_projections_sit_on_their_planes() {
        let grid = build_grid(40, 40);
        let config = RenderConfig { view_extent: 1.5, ..Default::default() };
        let surface = render(qn(2, 0), &grid, &config);
        let axes: Vec<Axis> = surface.projections.iter().map(|p| p.axis).collect();
        assert_eq!(axes, vec![Axis::Z, Axis::Y, Axis::X]);

        let expected = [(2, -1.5), (1, 1.5), (0, -1.5)];
        for (projection, &(component, offset)) in surface.projections.iter().zip(expected.iter()) {
            assert_eq!(projection.offset, offset);
            assert!(projection.segment_count() > 0);
            assert!(projection.lines.len() <= config.contour_levels);
            for line in &projection.lines {
                for segment in &line.segments {
                    for point in segment {
                        assert_eq!(point[component], offset);
                    }
                }
            }
        }
        assert_eq!(surface.projections[0].colormap, Colormap::Winter);
        assert_eq!(surface.projections[1].colormap, Colormap::Summer);
        assert_eq!(surface.projections[2].colormap, Colormap::Autumn);
    }

    #[test]
    fn test_vertices_are_row_major() {
        let grid = build_grid(3, 2);
        let surface = render(qn(1, 1), &grid, &RenderConfig::default());
        let vertices = surface.vertices();
        assert_eq!(vertices.len(), 6);
        assert_eq!(vertices[4][0], surface.cartesian.x[[1, 1]]);
        assert_eq!(vertices[2][2], surface.cartesian.z[[0, 2]]);
    }
}
