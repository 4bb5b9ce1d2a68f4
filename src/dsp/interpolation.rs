use serde::{Deserialize, Serialize};

/// How values are blended between two bracketing samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueDomain {
    /// Interpolate `log10(value)`; SPL and impedance magnitude.
    /// Falls back to linear when either bracketing value is non-positive.
    Logarithmic,
    /// Plain linear blend; phase in degrees (no unwrapping).
    Linear,
}

/// What a response series reports above its highest measured frequency.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AboveBandPolicy {
    /// Hold the top-of-band sample.
    #[default]
    Hold,
    /// Subtract `db_per_octave · log2(f / f_max)` from the top-of-band SPL.
    RollOff { db_per_octave: f64 },
}

impl AboveBandPolicy {
    /// Adjust an SPL value (dB) that was held at `f_max` for a query at `f`.
    pub fn apply(&self, spl_at_max: f64, f: f64, f_max: f64) -> f64 {
        match *self {
            AboveBandPolicy::Hold => spl_at_max,
            AboveBandPolicy::RollOff { db_per_octave } => {
                if f > f_max && f_max > 0.0 {
                    spl_at_max - db_per_octave * (f / f_max).log2()
                } else {
                    spl_at_max
                }
            }
        }
    }
}

/// Interpolate a single value on a logarithmic frequency axis.
///
/// `x_data` must be sorted ascending with positive entries.
/// - below the first sample: first value
/// - above the last sample: last value
/// - exact match: that sample, untouched
pub fn interpolate_at(x_data: &[f64], y_data: &[f64], xq: f64, domain: ValueDomain) -> f64 {
    if x_data.is_empty() || y_data.is_empty() {
        return 0.0;
    }
    let last = x_data.len().min(y_data.len()) - 1;
    // Also catches NaN queries
    if !(xq > x_data[0]) {
        return y_data[0];
    }
    if xq >= x_data[last] {
        return y_data[last];
    }

    // First index with x >= xq; guaranteed in 1..=last here
    let idx = x_data[..=last].partition_point(|&v| v < xq);
    if x_data[idx] == xq {
        return y_data[idx];
    }

    let x0 = x_data[idx - 1];
    let x1 = x_data[idx];
    let y0 = y_data[idx - 1];
    let y1 = y_data[idx];

    if y0 == y1 {
        return y0;
    }

    let t = (xq.log10() - x0.log10()) / (x1.log10() - x0.log10());

    match domain {
        ValueDomain::Logarithmic if y0 > 0.0 && y1 > 0.0 => {
            let l0 = y0.log10();
            let l1 = y1.log10();
            10.0_f64.powf(l0 + t * (l1 - l0))
        }
        _ => y0 + t * (y1 - y0),
    }
}
