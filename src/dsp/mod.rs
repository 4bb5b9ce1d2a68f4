pub mod complex;
pub mod ear_sim;
mod interpolation;

pub use interpolation::{interpolate_at, AboveBandPolicy, ValueDomain};

/// Level reported for silence, in dB.
pub const SPL_FLOOR_DB: f64 = -200.0;

/// Convert a linear amplitude to dB, clamped at [`SPL_FLOOR_DB`].
pub fn amplitude_to_db(amplitude: f64) -> f64 {
    let floor = 10.0_f64.powf(SPL_FLOOR_DB / 20.0);
    if amplitude.is_finite() && amplitude > floor {
        20.0 * amplitude.log10()
    } else if amplitude == f64::INFINITY {
        f64::INFINITY
    } else {
        SPL_FLOOR_DB
    }
}

/// Generate a logarithmically-spaced frequency grid from `f_min` to `f_max`
/// inclusive, with at least `points_per_octave` points per octave.
///
/// The first and last entries are exactly `f_min` and `f_max`.
pub fn log_frequency_grid(f_min: f64, f_max: f64, points_per_octave: usize) -> Vec<f64> {
    if !(f_max > f_min) || points_per_octave == 0 {
        return vec![f_min];
    }
    let octaves = (f_max / f_min).log2();
    let n = ((octaves * points_per_octave as f64).ceil() as usize).max(1) + 1;

    let log_min = f_min.ln();
    let log_max = f_max.ln();
    let mut grid: Vec<f64> = (0..n)
        .map(|i| (log_min + (log_max - log_min) * i as f64 / (n - 1) as f64).exp())
        .collect();
    grid[0] = f_min;
    grid[n - 1] = f_max;
    grid
}
