// Complex arithmetic kernel: guarded division and impedance helpers.
//
// Addition and multiplication are the `Complex64` operators. Every division
// in the crate goes through `safe_div` so that a zero frequency or a
// zero-valued component yields a zero result instead of NaN/Inf.

use num_complex::Complex64;

/// Minimum `|b|²` accepted as a divisor.
pub const DIV_EPSILON: f64 = 1e-12;

pub const ZERO: Complex64 = Complex64::new(0.0, 0.0);
pub const ONE: Complex64 = Complex64::new(1.0, 0.0);

/// `a / b`, or `0 + 0j` when `|b|²` is below [`DIV_EPSILON`].
#[inline]
pub fn safe_div(a: Complex64, b: Complex64) -> Complex64 {
    let denom = b.norm_sqr();
    if denom.is_nan() || denom < DIV_EPSILON {
        return ZERO;
    }
    // a · conj(b) / |b|²
    let num = a * b.conj();
    Complex64::new(num.re / denom, num.im / denom)
}

/// `1 / z`, guarded.
#[inline]
pub fn reciprocal(z: Complex64) -> Complex64 {
    safe_div(ONE, z)
}

/// Two impedances in parallel: `(z1·z2)/(z1+z2)`.
#[inline]
pub fn parallel(z1: Complex64, z2: Complex64) -> Complex64 {
    safe_div(z1 * z2, z1 + z2)
}

#[inline]
pub fn magnitude(z: Complex64) -> f64 {
    (z.re * z.re + z.im * z.im).sqrt()
}

/// Argument in degrees, `atan2(im, re)`.
#[inline]
pub fn phase_deg(z: Complex64) -> f64 {
    z.im.atan2(z.re).to_degrees()
}

/// Build a complex value from a magnitude and an angle in degrees.
#[inline]
pub fn from_polar_deg(magnitude: f64, phase_deg: f64) -> Complex64 {
    let rad = phase_deg.to_radians();
    Complex64::new(magnitude * rad.cos(), magnitude * rad.sin())
}
