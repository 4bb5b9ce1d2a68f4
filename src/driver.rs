use num_complex::Complex64;

use crate::crossover::{validate_chain, CrossoverElement};
use crate::dsp::complex::from_polar_deg;
use crate::dsp::AboveBandPolicy;
use crate::error::AppError;
use crate::io::{MeasurementKind, MeasurementSeries};

/// Electrical impedance assumed for a driver without impedance data.
pub const DEFAULT_DRIVER_IMPEDANCE: Complex64 = Complex64::new(8.0, 0.0);

/// One driver of the IEM and the crossover chain that feeds it.
#[derive(Debug, Clone, PartialEq)]
pub struct Driver {
    pub name: String,
    /// Invert polarity (+180°)
    pub inverted: bool,
    pub response: Option<MeasurementSeries>,
    pub impedance: Option<MeasurementSeries>,
    /// The response was measured on a coupler already
    pub response_includes_coupler: bool,
    pub crossover: Vec<CrossoverElement>,
}

impl Driver {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inverted: false,
            response: None,
            impedance: None,
            response_includes_coupler: false,
            crossover: Vec::new(),
        }
    }

    pub fn with_response(mut self, series: MeasurementSeries) -> Self {
        self.response = Some(series);
        self
    }

    pub fn with_impedance(mut self, series: MeasurementSeries) -> Self {
        self.impedance = Some(series);
        self
    }

    pub fn with_element(mut self, element: CrossoverElement) -> Self {
        self.crossover.push(element);
        self
    }

    pub fn inverted(mut self, inverted: bool) -> Self {
        self.inverted = inverted;
        self
    }

    pub fn includes_coupler(mut self, includes: bool) -> Self {
        self.response_includes_coupler = includes;
        self
    }

    /// Response series, if present and non-empty.
    pub fn usable_response(&self) -> Option<&MeasurementSeries> {
        self.response.as_ref().filter(|s| !s.is_empty())
    }

    /// Impedance series, if present and non-empty.
    pub fn usable_impedance(&self) -> Option<&MeasurementSeries> {
        self.impedance.as_ref().filter(|s| !s.is_empty())
    }

    /// Whether the driver loads the source (impedance data or a crossover).
    pub fn loads_source(&self) -> bool {
        self.usable_impedance().is_some() || !self.crossover.is_empty()
    }

    /// Electrical impedance at `freq`, 8 Ω resistive without data.
    pub fn impedance_at(&self, freq: f64) -> Complex64 {
        match self.usable_impedance() {
            Some(z) => from_polar_deg(z.value_at(freq, AboveBandPolicy::Hold), z.phase_at(freq)),
            None => DEFAULT_DRIVER_IMPEDANCE,
        }
    }

    /// Measured (SPL dB, phase deg) at `freq`, if a response is present.
    pub fn response_at(&self, freq: f64, policy: AboveBandPolicy) -> Option<(f64, f64)> {
        self.usable_response()
            .map(|r| (r.value_at(freq, policy), r.phase_at(freq)))
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.name.trim().is_empty() {
            return Err(AppError::Config {
                message: "Driver name must not be empty".into(),
            });
        }
        for (series, expected) in [
            (&self.response, MeasurementKind::Response),
            (&self.impedance, MeasurementKind::Impedance),
        ] {
            if let Some(s) = series {
                if s.kind != expected {
                    return Err(AppError::Config {
                        message: format!(
                            "Driver '{}': {:?} data supplied where {:?} was expected",
                            self.name, s.kind, expected
                        ),
                    });
                }
            }
        }
        validate_chain(&self.name, &self.crossover)
    }
}
