//! Harmonics CLI - plots a real spherical harmonic as a colored surface.
//!
//! Quantum numbers come from flags or, when omitted, from an interactive
//! prompt that repeats until the input is valid.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use tracing::info;

use harmonics::config::RenderConfig;
use harmonics::error::HarmonicError;
use harmonics::physics::QuantumNumbers;
use harmonics::render::{rasterize, write_png};
use harmonics::surface::{render, AngularGrid};
use harmonics::telemetry::init_tracing;

/// Real spherical harmonic plotter.
#[derive(Parser, Debug)]
#[command(name = "harmonics")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Angular momentum quantum number (prompted when omitted).
    #[arg(short, long, allow_negative_numbers = true)]
    l: Option<i64>,

    /// Magnetic quantum number, between -l and l (prompted when omitted).
    #[arg(short, long, allow_negative_numbers = true)]
    m: Option<i64>,

    /// Grid density over the polar angle.
    #[arg(long, default_value = "200")]
    theta_resolution: usize,

    /// Grid density over the azimuthal angle.
    #[arg(long, default_value = "200")]
    phi_resolution: usize,

    /// Half-width of the fixed cubic viewing box.
    #[arg(long, default_value = "1.0")]
    view_extent: f64,

    /// Contour lines per planar projection.
    #[arg(long, default_value = "8")]
    contour_levels: usize,

    /// Opacity of the surface (0-1).
    #[arg(long, default_value = "0.3")]
    surface_alpha: f32,

    /// Output image size in pixels.
    #[arg(long, default_value = "800")]
    image_size: u32,

    /// Output PNG path. Defaults to harmonic_l{l}_m{m}.png.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl Cli {
    fn render_config(&self) -> RenderConfig {
        RenderConfig {
            theta_resolution: self.theta_resolution,
            phi_resolution: self.phi_resolution,
            view_extent: self.view_extent,
            contour_levels: self.contour_levels,
            surface_alpha: self.surface_alpha,
            image_size: self.image_size,
        }
    }
}

/// The user-facing part of a validation error. Anything else is fatal.
fn input_message(err: HarmonicError) -> io::Result<String> {
    if !err.is_input_error() {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, err));
    }
    match err {
        HarmonicError::InvalidQuantumNumber(msg) | HarmonicError::InvalidMagneticNumber(msg) => {
            Ok(msg)
        }
        other => Ok(other.to_string()),
    }
}

fn read_line<R: BufRead>(input: &mut R) -> io::Result<String> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "input closed"));
    }
    Ok(line)
}

fn prompt_degree<R: BufRead, W: Write>(input: &mut R, out: &mut W) -> io::Result<u32> {
    loop {
        writeln!(out, "Enter the angular quantum number (must be a nonnegative integer):")?;
        out.flush()?;
        match QuantumNumbers::parse_degree(&read_line(input)?) {
            Ok(l) => return Ok(l),
            Err(err) => writeln!(out, "{}", input_message(err)?)?,
        }
    }
}

fn prompt_order<R: BufRead, W: Write>(input: &mut R, out: &mut W, l: u32) -> io::Result<i32> {
    loop {
        writeln!(out, "Enter the magnetic quantum number (must be an integer between -L and L):")?;
        out.flush()?;
        match QuantumNumbers::parse_order(&read_line(input)?, l) {
            Ok(m) => return Ok(m),
            Err(err) => writeln!(out, "{}", input_message(err)?)?,
        }
    }
}

/// Resolves (l, m) from flags, prompting for whatever is missing. Invalid
/// flag values are reported, not re-prompted.
fn collect_quantum_numbers<R: BufRead, W: Write>(
    l: Option<i64>,
    m: Option<i64>,
    input: &mut R,
    out: &mut W,
) -> Result<QuantumNumbers, Box<dyn std::error::Error>> {
    let l = match l {
        Some(l) => QuantumNumbers::new(l, 0)?.l,
        None => prompt_degree(input, out)?,
    };
    let m = match m {
        Some(m) => QuantumNumbers::new(l as i64, m)?.m,
        None => prompt_order(input, out, l)?,
    };
    Ok(QuantumNumbers { l, m })
}

fn main() {
    let cli = Cli::parse();
    init_tracing();

    let config = cli.render_config();
    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    println!("Real Spherical Harmonic Plotter");
    println!("===============================");

    let stdin = io::stdin();
    let stdout = io::stdout();
    let qn = match collect_quantum_numbers(cli.l, cli.m, &mut stdin.lock(), &mut stdout.lock()) {
        Ok(qn) => qn,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("harmonic_l{}_m{}.png", qn.l, qn.m)));

    println!("Orbital: {} (l = {}, m = {})", qn.label(), qn.l, qn.m);
    println!("Grid: {}x{} (theta x phi)", config.theta_resolution, config.phi_resolution);

    let start = Instant::now();
    let grid = AngularGrid::from_config(&config);
    let surface = render(qn, &grid, &config);
    let img = rasterize(&surface, &config);
    info!(elapsed = ?start.elapsed(), "figure rasterized");

    if let Err(e) = write_png(&img, &output) {
        eprintln!("Error writing {}: {}", output.display(), e);
        std::process::exit(1);
    }
    println!("Saved {}", output.display());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_prompt(
        l: Option<i64>,
        m: Option<i64>,
        text: &str,
    ) -> (Result<QuantumNumbers, String>, String) {
        let mut input = io::Cursor::new(text.as_bytes().to_vec());
        let mut out = Vec::new();
        let result = collect_quantum_numbers(l, m, &mut input, &mut out).map_err(|e| e.to_string());
        (result, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_prompt_retries_until_valid() {
        let (result, transcript) = run_prompt(None, None, "abc\n-1\n2\n5\nx\n-2\n");
        assert_eq!(result, Ok(QuantumNumbers { l: 2, m: -2 }));
        assert!(transcript.contains("Invalid Characters Entered. Please Try Again!"));
        assert!(transcript.contains("L must be a nonnegative integer"));
        assert!(transcript.contains("M must be an integer between -L and L"));
        assert_eq!(
            transcript.matches("Enter the angular quantum number").count(),
            3
        );
        assert_eq!(
            transcript.matches("Enter the magnetic quantum number").count(),
            3
        );
    }

    #[test]
    fn test_flags_skip_prompt() {
        let (result, transcript) = run_prompt(Some(3), Some(-1), "");
        assert_eq!(result, Ok(QuantumNumbers { l: 3, m: -1 }));
        assert!(transcript.is_empty());
    }

    #[test]
    fn test_missing_m_is_prompted() {
        let (result, transcript) = run_prompt(Some(1), None, "1\n");
        assert_eq!(result, Ok(QuantumNumbers { l: 1, m: 1 }));
        assert!(!transcript.contains("angular quantum number"));
    }

    #[test]
    fn test_invalid_flags_are_errors() {
        let (result, _) = run_prompt(Some(-1), Some(0), "");
        assert!(result.is_err());
        let (result, _) = run_prompt(Some(1), Some(4), "");
        assert!(result.is_err());
    }

    #[test]
    fn test_closed_input_is_an_error() {
        let (result, _) = run_prompt(None, None, "7\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_only_input_errors_are_reprompted() {
        let msg = input_message(HarmonicError::InvalidMagneticNumber("bad m".to_string()));
        assert_eq!(msg.unwrap(), "bad m");
        let fatal = input_message(HarmonicError::NumericDegeneracy(0.0));
        assert_eq!(fatal.unwrap_err().kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn test_cli_parses_negative_m() {
        let cli = Cli::try_parse_from(["harmonics", "-l", "2", "-m", "-2", "--view-extent", "1.5"])
            .unwrap();
        assert_eq!(cli.l, Some(2));
        assert_eq!(cli.m, Some(-2));
        assert_eq!(cli.render_config().view_extent, 1.5);
        assert_eq!(cli.render_config().theta_resolution, 200);
    }
}
