//! Real spherical harmonic surfaces.
//!
//! Evaluates complex and real spherical harmonics Y_lm over an angular grid,
//! turns |Y_lm| into a colored 3-D surface with three planar contour
//! projections, and rasterizes the result.

pub mod colormap;
pub mod config;
pub mod error;
pub mod physics;
pub mod render;
pub mod surface;
pub mod telemetry;

pub use colormap::Colormap;
pub use config::RenderConfig;
pub use error::{HarmonicError, RenderError};
pub use physics::{complex_harmonic, real_harmonic, QuantumNumbers};
pub use surface::{build_grid, render, AngularGrid, Normalization, Surface};
