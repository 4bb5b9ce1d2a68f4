use serde::{Deserialize, Serialize};

use crate::crossover::{EarContribution, Traversal};
use crate::dsp::ear_sim::EarSimulatorConfig;
use crate::dsp::AboveBandPolicy;
use crate::error::AppError;

// ---------------------------------------------------------------------------
// Source voltage
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoltagePreset {
    /// 1 mW into 32 Ω
    #[serde(rename = "milliwatt_32_ohm")]
    Milliwatt32Ohm,
    Phone,
    OneVolt,
    Desktop,
    /// 1 W into 8 Ω
    Reference,
}

impl VoltagePreset {
    pub fn volts(self) -> f64 {
        match self {
            VoltagePreset::Milliwatt32Ohm => (0.001_f64 * 32.0).sqrt(),
            VoltagePreset::Phone => 0.5,
            VoltagePreset::OneVolt => 1.0,
            VoltagePreset::Desktop => 2.0,
            VoltagePreset::Reference => 2.83,
        }
    }
}

/// Drive level applied to every driver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceVoltage {
    Preset(VoltagePreset),
    Custom(f64),
}

impl Default for SourceVoltage {
    fn default() -> Self {
        SourceVoltage::Preset(VoltagePreset::OneVolt)
    }
}

impl SourceVoltage {
    pub fn volts(&self) -> f64 {
        match *self {
            SourceVoltage::Preset(p) => p.volts(),
            SourceVoltage::Custom(v) => v,
        }
    }
}

// ---------------------------------------------------------------------------
// Sweep + solver settings
// ---------------------------------------------------------------------------

fn default_f_min() -> f64 { 20.0 }
fn default_f_max() -> f64 { 20000.0 }
fn default_points_per_octave() -> usize { 48 }

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepConfig {
    #[serde(default = "default_f_min")]
    pub f_min: f64,
    #[serde(default = "default_f_max")]
    pub f_max: f64,
    /// Grid density; finer is smoother and slower
    #[serde(default = "default_points_per_octave")]
    pub points_per_octave: usize,
    /// Response data above the top measured sample
    #[serde(default)]
    pub above_band: AboveBandPolicy,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            f_min: default_f_min(),
            f_max: default_f_max(),
            points_per_octave: default_points_per_octave(),
            above_band: AboveBandPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SolverOptions {
    pub traversal: Traversal,
    pub ear_contribution: EarContribution,
}

/// Everything a sweep reads besides the drivers themselves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SimulationConfig {
    pub source_voltage: SourceVoltage,
    pub ear_simulator: EarSimulatorConfig,
    pub sweep: SweepConfig,
    pub solver: SolverOptions,
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<(), AppError> {
        let volts = self.source_voltage.volts();
        if !volts.is_finite() || volts <= 0.0 {
            return Err(AppError::Config {
                message: format!("Source voltage must be positive, got {volts} V"),
            });
        }

        let sweep = &self.sweep;
        if !sweep.f_min.is_finite() || sweep.f_min <= 0.0 {
            return Err(AppError::Config {
                message: format!("Sweep start must be positive, got {} Hz", sweep.f_min),
            });
        }
        if !sweep.f_max.is_finite() || sweep.f_max <= sweep.f_min {
            return Err(AppError::Config {
                message: format!(
                    "Sweep end ({} Hz) must be above sweep start ({} Hz)",
                    sweep.f_max, sweep.f_min
                ),
            });
        }
        if sweep.points_per_octave == 0 {
            return Err(AppError::Config {
                message: "Sweep needs at least one point per octave".into(),
            });
        }
        if let AboveBandPolicy::RollOff { db_per_octave } = sweep.above_band {
            if !db_per_octave.is_finite() || db_per_octave < 0.0 {
                return Err(AppError::Config {
                    message: format!("Roll-off slope must be non-negative, got {db_per_octave} dB/oct"),
                });
            }
        }

        self.ear_simulator.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = SimulationConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.source_voltage.volts(), 1.0);
        assert_eq!(config.sweep.f_min, 20.0);
        assert_eq!(config.sweep.f_max, 20000.0);
        assert_eq!(config.solver.traversal, Traversal::DriverOutward);
        assert_eq!(config.solver.ear_contribution, EarContribution::SkipIfIncluded);
    }

    #[test]
    fn test_presets() {
        assert!((VoltagePreset::Milliwatt32Ohm.volts() - 0.1789).abs() < 1e-4);
        assert_eq!(VoltagePreset::Reference.volts(), 2.83);
    }

    #[test]
    fn test_rejects_bad_voltage_and_range() {
        let config = SimulationConfig {
            source_voltage: SourceVoltage::Custom(0.0),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(AppError::Config { .. })));

        let mut config = SimulationConfig::default();
        config.sweep.f_max = 10.0;
        assert!(config.validate().is_err());

        let mut config = SimulationConfig::default();
        config.sweep.above_band = AboveBandPolicy::RollOff { db_per_octave: -3.0 };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_deserialize_partial_json() {
        let json = r#"{
            "source_voltage": { "custom": 0.75 },
            "ear_simulator": { "enabled": true, "seal_leakage": 0.2 },
            "sweep": { "points_per_octave": 12, "above_band": { "roll_off": { "db_per_octave": 12.0 } } },
            "solver": { "traversal": "source_inward" }
        }"#;
        let config: SimulationConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.source_voltage.volts(), 0.75);
        assert!(config.ear_simulator.enabled);
        assert_eq!(config.ear_simulator.canal_length, 1.2);
        assert_eq!(config.sweep.points_per_octave, 12);
        assert_eq!(config.sweep.f_min, 20.0);
        assert_eq!(config.sweep.above_band, AboveBandPolicy::RollOff { db_per_octave: 12.0 });
        assert_eq!(config.solver.traversal, Traversal::SourceInward);
        assert_eq!(config.solver.ear_contribution, EarContribution::SkipIfIncluded);

        let preset: SimulationConfig =
            serde_json::from_str(r#"{ "source_voltage": { "preset": "desktop" } }"#).unwrap();
        assert_eq!(preset.source_voltage.volts(), 2.0);
    }
}
