// Sweep orchestrator: per-frequency, per-driver solve and coherent summation.
//
// Drivers share one voltage source, so their network admittances add.
// Acoustic outputs add as complex pressures (phase-aware).

use std::collections::HashSet;

use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::SimulationConfig;
use crate::crossover::solve_driver;
use crate::driver::Driver;
use crate::dsp::complex::{from_polar_deg, magnitude, phase_deg, reciprocal, DIV_EPSILON, ZERO};
use crate::dsp::{amplitude_to_db, log_frequency_grid, SPL_FLOOR_DB};
use crate::error::AppError;

/// Impedance reported when no driver loads the source.
pub const OPEN_LOAD_OHMS: f64 = 1e9;

/// A coherent sum this small relative to its parts is cancellation residue.
pub const CANCELLATION_RATIO: f64 = 1e-12;

/// One driver's contribution at one frequency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverResultPoint {
    pub name: String,
    /// None without a response series
    pub spl_db: Option<f64>,
    /// Acoustic phase including crossover shift and polarity
    pub phase_deg: Option<f64>,
    /// None when the driver does not load the source
    pub impedance_ohm: Option<f64>,
    pub impedance_phase_deg: Option<f64>,
}

/// System response at one frequency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResultPoint {
    pub freq: f64,
    pub drivers: Vec<DriverResultPoint>,
    /// Coherent sum, floored at -200 dB
    pub total_spl_db: f64,
    /// Phase of the summed pressure; None at the floor
    pub total_phase_deg: Option<f64>,
    /// Parallel combination of all loading drivers
    pub total_impedance_ohm: f64,
    /// None at open load
    pub total_impedance_phase_deg: Option<f64>,
}

/// Validate drivers and configuration before a sweep.
pub fn validate_inputs(drivers: &[Driver], config: &SimulationConfig) -> Result<(), AppError> {
    config.validate()?;
    let mut names = HashSet::with_capacity(drivers.len());
    for driver in drivers {
        driver.validate()?;
        if !names.insert(driver.name.as_str()) {
            return Err(AppError::Topology {
                message: format!("Driver name '{}' is used more than once", driver.name),
            });
        }
    }
    Ok(())
}

/// Run a full sweep over the configured log grid.
///
/// Inputs are validated first; after that every frequency produces a result,
/// with degenerate values floored rather than reported as errors.
pub fn run_sweep(
    drivers: &[Driver],
    config: &SimulationConfig,
) -> Result<Vec<SimulationResultPoint>, AppError> {
    validate_inputs(drivers, config)?;

    let grid = log_frequency_grid(
        config.sweep.f_min,
        config.sweep.f_max,
        config.sweep.points_per_octave,
    );
    info!(
        "run_sweep: {} drivers, {} points ({:.0}-{:.0} Hz), V={:.3}, ear={}",
        drivers.len(),
        grid.len(),
        config.sweep.f_min,
        config.sweep.f_max,
        config.source_voltage.volts(),
        config.ear_simulator.enabled
    );
    for driver in drivers {
        if driver.usable_impedance().is_none() && !driver.crossover.is_empty() {
            debug!("driver '{}': no impedance data, solving against 8 Ω", driver.name);
        }
        match driver.usable_response().and_then(|r| r.frequency_range()) {
            None => debug!("driver '{}': no response data, contributes no SPL", driver.name),
            Some((lo, hi)) if lo > config.sweep.f_min || hi < config.sweep.f_max => warn!(
                "driver '{}': response covers {:.0}-{:.0} Hz, extrapolating to the sweep edges",
                driver.name, lo, hi
            ),
            Some(_) => {}
        }
    }

    let results = evaluate_grid(&grid, drivers, config);

    info!("run_sweep: done, {} result points", results.len());
    Ok(results)
}

#[cfg(not(feature = "parallel"))]
fn evaluate_grid(
    grid: &[f64],
    drivers: &[Driver],
    config: &SimulationConfig,
) -> Vec<SimulationResultPoint> {
    grid.iter()
        .map(|&f| simulate_frequency(f, drivers, config))
        .collect()
}

#[cfg(feature = "parallel")]
fn evaluate_grid(
    grid: &[f64],
    drivers: &[Driver],
    config: &SimulationConfig,
) -> Vec<SimulationResultPoint> {
    use rayon::prelude::*;

    // Indexed parallel iterators collect in grid order
    grid.par_iter()
        .map(|&f| simulate_frequency(f, drivers, config))
        .collect()
}

/// Compute the system response at a single frequency.
///
/// Pure: reads drivers and config, allocates a fresh result.
pub fn simulate_frequency(
    freq: f64,
    drivers: &[Driver],
    config: &SimulationConfig,
) -> SimulationResultPoint {
    let mut pressure_sum = ZERO;
    let mut pressure_magnitude = 0.0;
    let mut admittance_sum = ZERO;
    let mut loaded = false;
    let mut per_driver = Vec::with_capacity(drivers.len());

    for driver in drivers {
        let z_driver = driver.impedance_at(freq);
        let xo = solve_driver(
            freq,
            &driver.crossover,
            z_driver,
            driver.response_includes_coupler,
            config,
        );

        let mut point = DriverResultPoint {
            name: driver.name.clone(),
            spl_db: None,
            phase_deg: None,
            impedance_ohm: None,
            impedance_phase_deg: None,
        };

        if let Some((base_spl, base_phase)) = driver.response_at(freq, config.sweep.above_band) {
            let spl = base_spl + xo.gain_db;
            let polarity = if driver.inverted { 180.0 } else { 0.0 };
            let phase = base_phase + xo.phase_shift_deg + polarity;
            let amplitude = 10.0_f64.powf(spl / 20.0);
            pressure_sum += from_polar_deg(amplitude, phase);
            pressure_magnitude += amplitude;
            point.spl_db = Some(spl);
            point.phase_deg = Some(phase);
        }

        if driver.loads_source() {
            admittance_sum += reciprocal(xo.impedance);
            loaded = true;
            point.impedance_ohm = Some(xo.impedance_ohm);
            point.impedance_phase_deg = Some(xo.impedance_phase_deg);
        }

        per_driver.push(point);
    }

    let (total_impedance_ohm, total_impedance_phase_deg) = total_impedance(admittance_sum, loaded);
    let (total_spl_db, total_phase_deg) = sum_pressure(pressure_sum, pressure_magnitude);

    SimulationResultPoint {
        freq,
        drivers: per_driver,
        total_spl_db,
        total_phase_deg,
        total_impedance_ohm,
        total_impedance_phase_deg,
    }
}

/// Total impedance from the summed admittance, open load when nothing loads.
fn total_impedance(admittance: Complex64, loaded: bool) -> (f64, Option<f64>) {
    if !loaded || admittance.norm_sqr() < DIV_EPSILON {
        return (OPEN_LOAD_OHMS, None);
    }
    let z = reciprocal(admittance);
    (magnitude(z), Some(phase_deg(z)))
}

/// SPL and phase of a summed complex pressure.
///
/// `magnitude_sum` is the sum of the individual pressure magnitudes; a total
/// at or below `CANCELLATION_RATIO` of it is rounding residue and reads as
/// silence.
pub fn sum_pressure(pressure: Complex64, magnitude_sum: f64) -> (f64, Option<f64>) {
    let amplitude = magnitude(pressure);
    if amplitude <= CANCELLATION_RATIO * magnitude_sum {
        return (SPL_FLOOR_DB, None);
    }
    let spl = amplitude_to_db(amplitude);
    if spl <= SPL_FLOOR_DB {
        (SPL_FLOOR_DB, None)
    } else {
        (spl, Some(phase_deg(pressure)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crossover::{ComponentKind, CrossoverElement, Topology};
    use crate::io::{MeasurementKind, MeasurementSeries};

    fn flat_driver(name: &str, spl: f64, ohms: f64) -> Driver {
        Driver::new(name)
            .with_response(MeasurementSeries::flat(MeasurementKind::Response, 20.0, 20000.0, spl, 0.0))
            .with_impedance(MeasurementSeries::flat(MeasurementKind::Impedance, 20.0, 20000.0, ohms, 0.0))
    }

    #[test]
    fn test_single_driver_passthrough() {
        let drivers = [flat_driver("ba", 90.0, 8.0)];
        let p = simulate_frequency(1000.0, &drivers, &SimulationConfig::default());
        assert!((p.total_spl_db - 90.0).abs() < 1e-9, "got {}", p.total_spl_db);
        assert!((p.total_impedance_ohm - 8.0).abs() < 1e-9);
        assert_eq!(p.drivers.len(), 1);
        assert_eq!(p.drivers[0].spl_db, Some(90.0));
        assert_eq!(p.drivers[0].impedance_ohm, Some(8.0));
    }

    #[test]
    fn test_coherent_doubling() {
        let drivers = [flat_driver("a", 90.0, 8.0), flat_driver("b", 90.0, 8.0)];
        let p = simulate_frequency(1000.0, &drivers, &SimulationConfig::default());
        assert!((p.total_spl_db - (90.0 + 6.0206)).abs() < 1e-3, "got {}", p.total_spl_db);
        // Two 8 Ω loads in parallel
        assert!((p.total_impedance_ohm - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_polarity_cancellation() {
        let drivers = [
            flat_driver("a", 90.0, 8.0),
            flat_driver("b", 90.0, 8.0).inverted(true),
        ];
        let p = simulate_frequency(1000.0, &drivers, &SimulationConfig::default());
        assert!(p.total_spl_db <= SPL_FLOOR_DB, "got {}", p.total_spl_db);
        assert_eq!(p.total_phase_deg, None);
    }

    #[test]
    fn test_loud_cancellation_reaches_floor() {
        let p = from_polar_deg(1e6, 37.0);
        let residue = p + from_polar_deg(1e6, 217.0);
        assert_eq!(sum_pressure(residue, 2e6), (SPL_FLOOR_DB, None));

        let (spl, phase) = sum_pressure(p, 1e6);
        assert!((spl - 120.0).abs() < 1e-9);
        assert!((phase.unwrap() - 37.0).abs() < 1e-9);
    }

    #[test]
    fn test_open_load_without_loading_drivers() {
        let driver = Driver::new("resp-only")
            .with_response(MeasurementSeries::flat(MeasurementKind::Response, 20.0, 20000.0, 85.0, 0.0));
        let p = simulate_frequency(500.0, &[driver], &SimulationConfig::default());
        assert_eq!(p.total_impedance_ohm, OPEN_LOAD_OHMS);
        assert_eq!(p.total_impedance_phase_deg, None);
        assert!((p.total_spl_db - 85.0).abs() < 1e-9);
        assert_eq!(p.drivers[0].impedance_ohm, None);
    }

    #[test]
    fn test_no_drivers_is_silent_open_load() {
        let p = simulate_frequency(1000.0, &[], &SimulationConfig::default());
        assert_eq!(p.total_spl_db, SPL_FLOOR_DB);
        assert_eq!(p.total_impedance_ohm, OPEN_LOAD_OHMS);
    }

    #[test]
    fn test_crossover_without_impedance_uses_default() {
        let driver = Driver::new("ba").with_element(CrossoverElement::new(
            ComponentKind::Resistor,
            8.0,
            Topology::Series,
            1,
        ));
        let p = simulate_frequency(1000.0, &[driver], &SimulationConfig::default());
        // 8 Ω default + 8 Ω series
        assert!((p.total_impedance_ohm - 16.0).abs() < 1e-9);
        assert_eq!(p.total_spl_db, SPL_FLOOR_DB);
    }

    #[test]
    fn test_run_sweep_rejects_duplicate_names() {
        let drivers = [flat_driver("a", 90.0, 8.0), flat_driver("a", 90.0, 8.0)];
        let result = run_sweep(&drivers, &SimulationConfig::default());
        assert!(matches!(result, Err(AppError::Topology { .. })));
    }

    #[test]
    fn test_run_sweep_is_ascending_and_idempotent() {
        let drivers = [flat_driver("a", 90.0, 8.0)];
        let config = SimulationConfig::default();
        let first = run_sweep(&drivers, &config).unwrap();
        let second = run_sweep(&drivers, &config).unwrap();
        assert_eq!(first, second);
        for w in first.windows(2) {
            assert!(w[1].freq > w[0].freq);
        }
    }
}
