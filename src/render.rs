//! Software rasterizer for a [`Surface`]: orthographic camera, painter's
//! algorithm for the translucent surface, contour projections on the back
//! planes of the fixed viewing cube, PNG output.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ColorType, ImageEncoder, Rgba, RgbaImage};
use tracing::debug;

use crate::config::RenderConfig;
use crate::error::RenderError;
use crate::surface::Surface;

const BACKGROUND: [u8; 4] = [255, 255, 255, 255];
const CUBE_EDGE: [f32; 3] = [0.75, 0.75, 0.75];

/// Orthographic camera at spherical (azimuth, elevation), in radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub azimuth: f64,
    pub elevation: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Camera {
            azimuth: (-60.0_f64).to_radians(),
            elevation: 30.0_f64.to_radians(),
        }
    }
}

impl Camera {
    /// Screen coordinates, y up.
    pub fn project(&self, p: [f64; 3]) -> (f64, f64) {
        let (sa, ca) = self.azimuth.sin_cos();
        let (se, ce) = self.elevation.sin_cos();
        let screen_x = -p[0] * sa + p[1] * ca;
        let screen_y = -p[0] * ca * se - p[1] * sa * se + p[2] * ce;
        (screen_x, screen_y)
    }

    /// Distance along the view direction. Larger is further away.
    pub fn depth(&self, p: [f64; 3]) -> f64 {
        let (sa, ca) = self.azimuth.sin_cos();
        let (se, ce) = self.elevation.sin_cos();
        -(p[0] * ce * ca + p[1] * ce * sa + p[2] * se)
    }
}

/// Maps projected coordinates onto pixels so the whole cube fits.
struct Viewport {
    scale: f64,
    center: f64,
}

impl Viewport {
    fn new(size: u32, extent: f64) -> Self {
        // The cube's projection never exceeds its half-diagonal.
        let half_diagonal = extent * 3.0_f64.sqrt();
        Viewport {
            scale: size as f64 * 0.47 / half_diagonal,
            center: size as f64 / 2.0,
        }
    }

    fn to_pixel(&self, (sx, sy): (f64, f64)) -> (f64, f64) {
        (self.center + sx * self.scale, self.center - sy * self.scale)
    }
}

struct Triangle {
    points: [(f64, f64); 3],
    depth: f64,
    color: [f32; 4],
}

/// Draws the figure with the default camera.
pub fn rasterize(surface: &Surface, config: &RenderConfig) -> RgbaImage {
    rasterize_with_camera(surface, config, &Camera::default())
}

pub fn rasterize_with_camera(surface: &Surface, config: &RenderConfig, camera: &Camera) -> RgbaImage {
    let size = config.image_size;
    let extent = surface.view_extent;
    let viewport = Viewport::new(size, extent);
    let mut img = RgbaImage::from_pixel(size, size, Rgba(BACKGROUND));
    let screen = |p: [f64; 3]| viewport.to_pixel(camera.project(p));

    for [a, b] in cube_edges(extent) {
        draw_line(&mut img, screen(a), screen(b), CUBE_EDGE);
    }

    for projection in &surface.projections {
        for line in &projection.lines {
            for [a, b] in &line.segments {
                draw_line(&mut img, screen(*a), screen(*b), line.color);
            }
        }
    }

    let triangles = surface_triangles(surface, camera, &screen);
    debug!(triangles = triangles.len(), size, "rasterizing surface");
    for triangle in &triangles {
        fill_triangle(&mut img, triangle.points, triangle.color);
    }

    img
}

/// Two triangles per grid cell, colored by the cell's first vertex and
/// sorted far to near.
fn surface_triangles(
    surface: &Surface,
    camera: &Camera,
    screen: &impl Fn([f64; 3]) -> (f64, f64),
) -> Vec<Triangle> {
    let (rows, cols) = surface.shape();
    let cart = &surface.cartesian;
    let point = |j: usize, i: usize| [cart.x[[j, i]], cart.y[[j, i]], cart.z[[j, i]]];

    let mut triangles = Vec::with_capacity(2 * rows.saturating_sub(1) * cols.saturating_sub(1));
    for j in 0..rows.saturating_sub(1) {
        for i in 0..cols.saturating_sub(1) {
            let color = surface.rgba[[j, i]];
            let p00 = point(j, i);
            let p01 = point(j, i + 1);
            let p10 = point(j + 1, i);
            let p11 = point(j + 1, i + 1);
            for corners in [[p00, p01, p10], [p11, p10, p01]] {
                if corners.iter().flatten().any(|c| !c.is_finite()) {
                    continue;
                }
                let center = [
                    (corners[0][0] + corners[1][0] + corners[2][0]) / 3.0,
                    (corners[0][1] + corners[1][1] + corners[2][1]) / 3.0,
                    (corners[0][2] + corners[1][2] + corners[2][2]) / 3.0,
                ];
                triangles.push(Triangle {
                    points: corners.map(|c| screen(c)),
                    depth: camera.depth(center),
                    color,
                });
            }
        }
    }

    triangles.sort_by(|a, b| b.depth.total_cmp(&a.depth));
    triangles
}

fn cube_edges(e: f64) -> Vec<[[f64; 3]; 2]> {
    let corners: Vec<[f64; 3]> = (0..8)
        .map(|k| {
            let pick = |bit: usize| if k & (1 << bit) != 0 { e } else { -e };
            [pick(0), pick(1), pick(2)]
        })
        .collect();
    let mut edges = Vec::with_capacity(12);
    for a in 0..8usize {
        for bit in 0..3 {
            let b = a | (1 << bit);
            if b != a {
                edges.push([corners[a], corners[b]]);
            }
        }
    }
    edges
}

fn blend(pixel: &mut Rgba<u8>, color: [f32; 3], alpha: f32) {
    for (channel, &c) in pixel.0.iter_mut().take(3).zip(color.iter()) {
        let dst = *channel as f32 / 255.0;
        let out = c * alpha + dst * (1.0 - alpha);
        *channel = (out.clamp(0.0, 1.0) * 255.0).round() as u8;
    }
}

fn put(img: &mut RgbaImage, x: i64, y: i64, color: [f32; 3], alpha: f32) {
    if x < 0 || y < 0 || x >= img.width() as i64 || y >= img.height() as i64 {
        return;
    }
    blend(img.get_pixel_mut(x as u32, y as u32), color, alpha);
}

fn draw_line(img: &mut RgbaImage, a: (f64, f64), b: (f64, f64), color: [f32; 3]) {
    let steps = (b.0 - a.0).abs().max((b.1 - a.1).abs()).ceil().max(1.0);
    if !steps.is_finite() {
        return;
    }
    let n = steps as i64;
    for k in 0..=n {
        let t = k as f64 / steps;
        let x = a.0 + (b.0 - a.0) * t;
        let y = a.1 + (b.1 - a.1) * t;
        put(img, x.round() as i64, y.round() as i64, color, 1.0);
    }
}

fn edge(a: (f64, f64), b: (f64, f64), p: (f64, f64)) -> f64 {
    (b.0 - a.0) * (p.1 - a.1) - (b.1 - a.1) * (p.0 - a.0)
}

fn fill_triangle(img: &mut RgbaImage, pts: [(f64, f64); 3], color: [f32; 4]) {
    let area = edge(pts[0], pts[1], pts[2]);
    if area.abs() < 1e-12 {
        return;
    }
    let (w, h) = (img.width() as f64, img.height() as f64);
    let min_x = pts.iter().map(|p| p.0).fold(f64::INFINITY, f64::min).floor().max(0.0);
    let max_x = pts.iter().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max).ceil().min(w - 1.0);
    let min_y = pts.iter().map(|p| p.1).fold(f64::INFINITY, f64::min).floor().max(0.0);
    let max_y = pts.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max).ceil().min(h - 1.0);
    if min_x > max_x || min_y > max_y {
        return;
    }

    let rgb = [color[0], color[1], color[2]];
    for y in min_y as i64..=max_y as i64 {
        for x in min_x as i64..=max_x as i64 {
            let p = (x as f64 + 0.5, y as f64 + 0.5);
            let w0 = edge(pts[1], pts[2], p) / area;
            let w1 = edge(pts[2], pts[0], p) / area;
            let w2 = edge(pts[0], pts[1], p) / area;
            if w0 >= 0.0 && w1 >= 0.0 && w2 >= 0.0 {
                put(img, x, y, rgb, color[3]);
            }
        }
    }
}

/// Encodes an image as PNG in memory.
pub fn encode_png(img: &RgbaImage) -> Result<Vec<u8>, RenderError> {
    let mut bytes = Vec::new();
    let encoder =
        PngEncoder::new_with_quality(&mut bytes, CompressionType::Default, FilterType::Adaptive);
    encoder.write_image(img.as_raw(), img.width(), img.height(), ColorType::Rgba8)?;
    Ok(bytes)
}

/// Writes an image to `path` as PNG.
pub fn write_png(img: &RgbaImage, path: &Path) -> Result<(), RenderError> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let encoder =
        PngEncoder::new_with_quality(writer, CompressionType::Default, FilterType::Adaptive);
    encoder.write_image(img.as_raw(), img.width(), img.height(), ColorType::Rgba8)?;
    Ok(())
}
