//! Error types shared by the evaluator, the renderer and both front ends.

use thiserror::Error;

/// Errors raised while validating inputs or normalizing a harmonic field.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HarmonicError {
    #[error("invalid angular quantum number: {0}")]
    InvalidQuantumNumber(String),
    #[error("invalid magnetic quantum number: {0}")]
    InvalidMagneticNumber(String),
    #[error("harmonic field has zero range (min = max = {0})")]
    NumericDegeneracy(f64),
    #[error("invalid render configuration: {0}")]
    InvalidConfig(String),
}

impl HarmonicError {
    /// True for errors the input collector should answer with a re-prompt.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            HarmonicError::InvalidQuantumNumber(_) | HarmonicError::InvalidMagneticNumber(_)
        )
    }
}

/// Errors that can occur while rasterizing or encoding a figure.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image encoding error: {0}")]
    Image(#[from] image::ImageError),
    #[error(transparent)]
    Harmonic(#[from] HarmonicError),
}
