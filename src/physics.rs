//! Spherical harmonic evaluation.
//!
//! Complex harmonics Y_lm carry the Condon-Shortley phase through the
//! associated Legendre function. Real harmonics are the fixed linear
//! combinations of Y_lm and Y_l,-m that chemists draw as orbitals.

use std::f64::consts::{FRAC_1_SQRT_2, PI};

use ndarray::{Array, ArrayBase, Data, Dimension, Zip};
use num_complex::Complex64;

use crate::error::HarmonicError;

/// Subshell letters indexed by l (the spectroscopic sequence skips j).
const SUBSHELL_LETTERS: &[char] = &[
    's', 'p', 'd', 'f', 'g', 'h', 'i', 'k', 'l', 'm', 'n', 'o', 'q', 'r', 't', 'u', 'v',
];

/// Validated pair of quantum numbers (l, m_l).
/// l: angular momentum quantum number (0, 1, 2, ...)
/// m: magnetic quantum number (-l to l)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuantumNumbers {
    pub l: u32,
    pub m: i32,
}

impl QuantumNumbers {
    pub fn new(l: i64, m: i64) -> Result<Self, HarmonicError> {
        let l = Self::validate_degree(l)?;
        let m = Self::validate_order(m, l)?;
        Ok(QuantumNumbers { l, m })
    }

    /// Parses both numbers from user text.
    pub fn parse(l: &str, m: &str) -> Result<Self, HarmonicError> {
        let l = Self::parse_degree(l)?;
        let m = Self::parse_order(m, l)?;
        Ok(QuantumNumbers { l, m })
    }

    pub fn parse_degree(text: &str) -> Result<u32, HarmonicError> {
        let l = text
            .trim()
            .parse::<i64>()
            .map_err(|_| HarmonicError::InvalidQuantumNumber(INVALID_CHARACTERS.to_string()))?;
        Self::validate_degree(l)
    }

    pub fn parse_order(text: &str, l: u32) -> Result<i32, HarmonicError> {
        let m = text
            .trim()
            .parse::<i64>()
            .map_err(|_| HarmonicError::InvalidMagneticNumber(INVALID_CHARACTERS.to_string()))?;
        Self::validate_order(m, l)
    }

    fn validate_degree(l: i64) -> Result<u32, HarmonicError> {
        if l < 0 {
            return Err(HarmonicError::InvalidQuantumNumber(
                "L must be a nonnegative integer".to_string(),
            ));
        }
        i32::try_from(l)
            .map(|l| l as u32)
            .map_err(|_| HarmonicError::InvalidQuantumNumber(format!("L = {l} is too large")))
    }

    fn validate_order(m: i64, l: u32) -> Result<i32, HarmonicError> {
        let out_of_range =
            || HarmonicError::InvalidMagneticNumber("M must be an integer between -L and L".to_string());
        if m.unsigned_abs() > u64::from(l) {
            return Err(out_of_range());
        }
        i32::try_from(m).map_err(|_| out_of_range())
    }

    pub fn is_constant(&self) -> bool {
        self.l == 0 && self.m == 0
    }

    /// Chemistry-style name, e.g. `p (m=0)` or `d (m=-2)`.
    pub fn label(&self) -> String {
        match SUBSHELL_LETTERS.get(self.l as usize) {
            Some(letter) => format!("{letter} (m={})", self.m),
            None => format!("l={} (m={})", self.l, self.m),
        }
    }
}

pub const INVALID_CHARACTERS: &str = "Invalid Characters Entered. Please Try Again!";

/// Sign class of the magnetic quantum number, which selects the
/// complex-to-real combination rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Zero,
    Positive,
    Negative,
}

impl Order {
    pub fn of(m: i32) -> Self {
        match m {
            0 => Order::Zero,
            m if m > 0 => Order::Positive,
            _ => Order::Negative,
        }
    }
}

/// Value of Y_00, the only constant harmonic: (4π)^(-1/2).
pub fn y00() -> f64 {
    (4.0 * PI).sqrt().recip()
}

/// (-1)^m for any integer m.
fn parity_sign(m: i32) -> f64 {
    if m.rem_euclid(2) == 0 {
        1.0
    } else {
        -1.0
    }
}

/// Normalization sqrt((2l+1)(l-m)! / (4π(l+m)!)) for signed m.
///
/// The factorial quotient is built as a running product, so it stays finite
/// well past the point where the individual factorials would overflow. For
/// very large l the quotient still underflows and the harmonic degrades to 0.
pub fn normalization(l: u32, m: i32) -> f64 {
    let l_i = l as i64;
    let m_i = m as i64;
    let ratio = factorial_ratio((l_i - m_i) as u32, (l_i + m_i) as u32);
    ((2.0 * l as f64 + 1.0) * ratio / (4.0 * PI)).sqrt()
}

/// Complex spherical harmonic Y_lm(θ, φ) at a single point.
///
/// Expects `|m| <= l`. The polar angle may be any real; cos θ is clamped to
/// [-1, 1] so the poles evaluate cleanly.
pub fn complex_harmonic_at(theta: f64, phi: f64, l: u32, m: i32) -> Complex64 {
    let x = theta.cos().clamp(-1.0, 1.0);
    let legendre = associated_legendre_signed(x, l, m);
    let phase = Complex64::from_polar(1.0, m as f64 * phi);
    phase * (normalization(l, m) * legendre)
}

/// Complex spherical harmonic evaluated elementwise over matching arrays of
/// polar and azimuthal angles.
///
/// # Panics
/// If `theta` and `phi` differ in shape.
pub fn complex_harmonic<S, D>(
    theta: &ArrayBase<S, D>,
    phi: &ArrayBase<S, D>,
    l: u32,
    m: i32,
) -> Array<Complex64, D>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    Zip::from(theta)
        .and(phi)
        .map_collect(|&t, &p| complex_harmonic_at(t, p, l, m))
}

/// Real spherical harmonic over matching arrays of angles.
///
/// m = 0: Y_l0
/// m > 0: Re[ (Y_lm + (-1)^m Y_l,-m) / √2 ]
/// m < 0: Re[ i ((-1)^m Y_lm - Y_l,-m) / √2 ]
///
/// Only the real part of the combination is kept. In exact arithmetic the
/// imaginary part vanishes; in floating point it is small noise and is
/// dropped on purpose.
pub fn real_harmonic<S, D>(
    theta: &ArrayBase<S, D>,
    phi: &ArrayBase<S, D>,
    l: u32,
    m: i32,
) -> Array<f64, D>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    match Order::of(m) {
        Order::Zero => complex_harmonic(theta, phi, l, 0).mapv(|y| y.re),
        Order::Positive | Order::Negative => {
            let y_m = complex_harmonic(theta, phi, l, m);
            let y_neg = complex_harmonic(theta, phi, l, -m);
            Zip::from(&y_m)
                .and(&y_neg)
                .map_collect(|&a, &b| combine_real(a, b, m))
        }
    }
}

/// Scalar form of [`real_harmonic`].
pub fn real_harmonic_at(theta: f64, phi: f64, l: u32, m: i32) -> f64 {
    match Order::of(m) {
        Order::Zero => complex_harmonic_at(theta, phi, l, 0).re,
        Order::Positive | Order::Negative => combine_real(
            complex_harmonic_at(theta, phi, l, m),
            complex_harmonic_at(theta, phi, l, -m),
            m,
        ),
    }
}

/// Combines Y_lm and Y_l,-m into the real harmonic for m != 0.
fn combine_real(y_m: Complex64, y_neg: Complex64, m: i32) -> f64 {
    let sign = parity_sign(m);
    let combined = match Order::of(m) {
        Order::Positive => (y_m + y_neg * sign) * FRAC_1_SQRT_2,
        _ => Complex64::i() * FRAC_1_SQRT_2 * (y_m * sign - y_neg),
    };
    combined.re
}

/// a! / b! without forming either factorial.
pub fn factorial_ratio(a: u32, b: u32) -> f64 {
    if a >= b {
        ((b + 1)..=a).map(|k| k as f64).product()
    } else {
        ((a + 1)..=b).map(|k| (k as f64).recip()).product()
    }
}

/// Double factorial n!! = n * (n-2) * (n-4) * ... * 1 or 2
pub fn factorial_double(n: u32) -> f64 {
    let mut result = 1.0;
    let mut i = n as i64;

    while i > 0 {
        result *= i as f64;
        i -= 2;
    }

    result
}

/// Associated Legendre function P_l^m(x) for any |m| <= l.
/// Negative orders use P_l^{-m} = (-1)^m (l-m)!/(l+m)! P_l^m.
pub fn associated_legendre_signed(x: f64, l: u32, m: i32) -> f64 {
    if m >= 0 {
        return associated_legendre(x, l, m as u32);
    }
    let k = m.unsigned_abs();
    if k > l {
        return 0.0;
    }
    parity_sign(m) * factorial_ratio(l - k, l + k) * associated_legendre(x, l, k)
}

/// Associated Legendre function P^m_n(x), including the Condon-Shortley
/// phase (-1)^m.
pub fn associated_legendre(x: f64, n: u32, m: u32) -> f64 {
    if m > n {
        return 0.0;
    }

    // Base cases
    if m == 0 {
        return legendre_polynomial(x, n);
    }

    let m_f = m as f64;
    let one_minus_sq = (1.0 - x * x).max(0.0);

    // P^m_m = (-1)^m (2m-1)!! (1-x²)^(m/2)
    let sign = if m % 2 == 0 { 1.0 } else { -1.0 };
    let pmm = sign * one_minus_sq.powf(m_f / 2.0) * factorial_double(2 * m - 1);

    if n == m {
        return pmm;
    }

    let pm1m = x * (2.0 * m_f + 1.0) * pmm;

    if n == m + 1 {
        return pm1m;
    }

    let mut pmn = pmm;
    let mut pm1n = pm1m;

    for i in (m + 2)..=n {
        let i_f = i as f64;
        let pn = ((2.0 * i_f - 1.0) * x * pm1n - (i_f + m_f - 1.0) * pmn) / (i_f - m_f);
        pmn = pm1n;
        pm1n = pn;
    }

    pm1n
}

/// Legendre polynomial P_n(x)
pub fn legendre_polynomial(x: f64, n: u32) -> f64 {
    match n {
        0 => 1.0,
        1 => x,
        _ => {
            let mut p0 = 1.0;
            let mut p1 = x;

            for i in 2..=n {
                let i_f = i as f64;
                let p_new = ((2.0 * i_f - 1.0) * x * p1 - (i_f - 1.0) * p0) / i_f;
                p0 = p1;
                p1 = p_new;
            }

            p1
        }
    }
}
