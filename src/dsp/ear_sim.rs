use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::error::AppError;

use super::amplitude_to_db;
use super::complex::{magnitude, parallel, reciprocal};

// Coupler analog in normalized acoustic units (R0 = 1).
//
// Branch 0: canal, series R0 + jωL0.
// Branch 1: first resonance (~2.7 kHz, Q ≈ 2), parallel R1 L1 C1.
// Branch 2: second resonance (~13.5 kHz, Q ≈ 3), parallel R2 L2 C2.
const R0: f64 = 1.0;
const L0: f64 = 4.0e-6;
const R1: f64 = 2.0;
const L1: f64 = 5.894e-5;
const C1: f64 = 5.894e-5;
const R2: f64 = 1.0;
const L2: f64 = 3.93e-6;
const C2: f64 = 3.537e-5;

/// Canal length the reference constants were fitted for.
pub const NOMINAL_CANAL_LENGTH: f64 = 1.2;
/// Coupler volume the reference constants were fitted for.
pub const NOMINAL_COUPLER_VOLUME: f64 = 1.0;
/// Leakage resistance at 50% leakage is `LEAK_RESISTANCE_SCALE`.
const LEAK_RESISTANCE_SCALE: f64 = 10.0;

/// Purely resistive load returned when the simulator is disabled.
pub const REFERENCE_IMPEDANCE: Complex64 = Complex64::new(R0, 0.0);

/// Ear simulator (coupler) settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EarSimulatorConfig {
    pub enabled: bool,
    /// Canal length; inductance scales with `canal_length / 1.2`
    pub canal_length: f64,
    /// Coupler volume; first-branch capacitance scales with it
    pub coupler_volume: f64,
    /// Eardrum compliance multiplier for the second branch
    pub eardrum_compliance: f64,
    /// Seal leakage fraction, 0 = perfect seal, 1 = open
    pub seal_leakage: f64,
}

impl Default for EarSimulatorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            canal_length: NOMINAL_CANAL_LENGTH,
            coupler_volume: NOMINAL_COUPLER_VOLUME,
            eardrum_compliance: 1.0,
            seal_leakage: 0.0,
        }
    }
}

impl EarSimulatorConfig {
    pub fn validate(&self) -> Result<(), AppError> {
        for (name, value) in [
            ("canal_length", self.canal_length),
            ("coupler_volume", self.coupler_volume),
            ("eardrum_compliance", self.eardrum_compliance),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(AppError::Config {
                    message: format!("Ear simulator {name} must be positive, got {value}"),
                });
            }
        }
        if !(0.0..=1.0).contains(&self.seal_leakage) {
            return Err(AppError::Config {
                message: format!(
                    "Ear simulator seal_leakage must be within [0, 1], got {}",
                    self.seal_leakage
                ),
            });
        }
        Ok(())
    }
}

/// Parallel RLC branch impedance via admittance summation.
fn parallel_rlc(omega: f64, r: f64, l: f64, c: f64) -> Complex64 {
    let y = reciprocal(Complex64::new(r, 0.0))
        + reciprocal(Complex64::new(0.0, omega * l))
        + Complex64::new(0.0, omega * c);
    reciprocal(y)
}

/// Resistance of the seal leak, infinite (None) for a perfect seal.
fn leak_resistance(leakage: f64) -> Option<f64> {
    if leakage <= 0.0 {
        None
    } else {
        Some(LEAK_RESISTANCE_SCALE * (1.0 - leakage.min(1.0)) / leakage)
    }
}

/// Acoustic load impedance of the coupler at `freq` Hz.
pub fn ear_impedance(freq: f64, config: &EarSimulatorConfig) -> Complex64 {
    if !config.enabled {
        return REFERENCE_IMPEDANCE;
    }
    let omega = 2.0 * PI * freq;

    let l0 = L0 * config.canal_length / NOMINAL_CANAL_LENGTH;
    let c1 = C1 * config.coupler_volume / NOMINAL_COUPLER_VOLUME;
    let c2 = C2 * config.eardrum_compliance;

    let canal = Complex64::new(R0, omega * l0);
    let first = parallel_rlc(omega, R1, L1, c1);
    let second = parallel_rlc(omega, R2, L2, c2);
    let z = canal + first + second;

    match leak_resistance(config.seal_leakage) {
        Some(r_leak) => parallel(z, Complex64::new(r_leak, 0.0)),
        None => z,
    }
}

/// Acoustic gain of the coupler relative to the reference load, in dB.
pub fn ear_gain_db(freq: f64, config: &EarSimulatorConfig) -> f64 {
    if !config.enabled {
        return 0.0;
    }
    let z = ear_impedance(freq, config);
    amplitude_to_db(magnitude(z) / magnitude(REFERENCE_IMPEDANCE))
}
