mod parser;

pub use parser::{import_measurement, parse_frd, parse_measurement, parse_zma};

use serde::{Deserialize, Serialize};

use crate::dsp::{interpolate_at, AboveBandPolicy, ValueDomain};

/// What a measurement series holds in its value column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasurementKind {
    /// SPL in dB (FRD-style)
    Response,
    /// Impedance magnitude in Ohms (ZMA-style)
    Impedance,
}

/// One row of a measurement file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeasurementPoint {
    pub freq: f64,
    pub value: f64,
    /// degrees, 0 when the source had no phase column
    pub phase: f64,
}

/// A measured curve, sorted ascending by frequency.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementSeries {
    pub kind: MeasurementKind,
    /// Hz, sorted ascending, all positive
    freq: Vec<f64>,
    /// dB SPL or Ohms depending on `kind`
    value: Vec<f64>,
    /// degrees, as measured (no unwrapping)
    phase: Vec<f64>,
}

impl MeasurementSeries {
    /// Build a series from unordered points.
    ///
    /// Points with a non-positive or non-finite frequency, or a non-finite
    /// value or phase, are dropped. The rest are stably sorted by frequency.
    pub fn from_points(kind: MeasurementKind, points: impl IntoIterator<Item = MeasurementPoint>) -> Self {
        let mut points: Vec<MeasurementPoint> = points
            .into_iter()
            .filter(|p| {
                p.freq.is_finite() && p.freq > 0.0 && p.value.is_finite() && p.phase.is_finite()
            })
            .collect();
        points.sort_by(|a, b| a.freq.total_cmp(&b.freq));

        let mut series = Self {
            kind,
            freq: Vec::with_capacity(points.len()),
            value: Vec::with_capacity(points.len()),
            phase: Vec::with_capacity(points.len()),
        };
        for p in points {
            series.freq.push(p.freq);
            series.value.push(p.value);
            series.phase.push(p.phase);
        }
        series
    }

    /// A flat series between two frequencies. Handy for defaults and tests.
    pub fn flat(kind: MeasurementKind, f_min: f64, f_max: f64, value: f64, phase: f64) -> Self {
        Self::from_points(
            kind,
            [
                MeasurementPoint { freq: f_min, value, phase },
                MeasurementPoint { freq: f_max, value, phase },
            ],
        )
    }

    pub fn len(&self) -> usize {
        self.freq.len()
    }

    pub fn is_empty(&self) -> bool {
        self.freq.is_empty()
    }

    pub fn freq(&self) -> &[f64] {
        &self.freq
    }

    pub fn values(&self) -> &[f64] {
        &self.value
    }

    pub fn phases(&self) -> &[f64] {
        &self.phase
    }

    pub fn points(&self) -> impl Iterator<Item = MeasurementPoint> + '_ {
        self.freq
            .iter()
            .zip(&self.value)
            .zip(&self.phase)
            .map(|((&freq, &value), &phase)| MeasurementPoint { freq, value, phase })
    }

    /// (lowest, highest) measured frequency.
    pub fn frequency_range(&self) -> Option<(f64, f64)> {
        Some((*self.freq.first()?, *self.freq.last()?))
    }

    /// (min, max) of the value column.
    pub fn value_range(&self) -> Option<(f64, f64)> {
        if self.value.is_empty() {
            return None;
        }
        let lo = self.value.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = self.value.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Some((lo, hi))
    }

    /// Value at `f`, log-of-value interpolated on a log frequency axis.
    ///
    /// `policy` only affects response series above the top sample; impedance
    /// series always hold their boundary value.
    pub fn value_at(&self, f: f64, policy: AboveBandPolicy) -> f64 {
        let v = interpolate_at(&self.freq, &self.value, f, ValueDomain::Logarithmic);
        match (self.kind, self.freq.last()) {
            (MeasurementKind::Response, Some(&f_max)) if f > f_max => policy.apply(v, f, f_max),
            _ => v,
        }
    }

    /// Phase at `f` in degrees, linearly interpolated.
    pub fn phase_at(&self, f: f64) -> f64 {
        interpolate_at(&self.freq, &self.phase, f, ValueDomain::Linear)
    }
}
