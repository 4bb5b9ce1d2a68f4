// Passive crossover network solver.
//
// A driver's chain is walked from the driver outward. Each series element
// forms a voltage divider with everything already accumulated toward the
// driver; each parallel element shunts the accumulated network without
// changing the voltage that reaches the driver.

use std::collections::HashSet;
use std::f64::consts::PI;

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::config::{SimulationConfig, SolverOptions};
use crate::dsp::complex::{magnitude, parallel, phase_deg, reciprocal, safe_div, ONE};
use crate::dsp::ear_sim::ear_gain_db;
use crate::dsp::amplitude_to_db;
use crate::error::AppError;

/// Capacitor ESR used when none is given (Ohms).
pub const DEFAULT_ESR_OHMS: f64 = 0.01;
/// Inductor DCR used when none is given (Ohms).
pub const DEFAULT_DCR_OHMS: f64 = 0.05;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    /// value in µF
    Capacitor,
    /// value in mH
    Inductor,
    /// value in Ω
    Resistor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topology {
    Series,
    Parallel,
}

/// Order in which a chain is walked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Traversal {
    /// Highest order key first (nearest the driver).
    #[default]
    DriverOutward,
    /// Lowest order key first. Kept for comparison; builds a different circuit.
    SourceInward,
}

/// When the coupler gain is added to a driver's SPL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EarContribution {
    /// Skip drivers whose response already includes the coupler.
    #[default]
    SkipIfIncluded,
    /// Add to every driver.
    Always,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossoverElement {
    pub kind: ComponentKind,
    /// µF, mH or Ω depending on `kind`
    pub value: f64,
    pub topology: Topology,
    /// Position in the chain; higher is nearer the driver
    pub order: i32,
    /// ESR / DCR in Ohms; ignored for resistors
    #[serde(default)]
    pub parasitic_ohms: Option<f64>,
}

impl CrossoverElement {
    pub fn new(kind: ComponentKind, value: f64, topology: Topology, order: i32) -> Self {
        Self {
            kind,
            value,
            topology,
            order,
            parasitic_ohms: None,
        }
    }

    pub fn with_parasitic(mut self, ohms: f64) -> Self {
        self.parasitic_ohms = Some(ohms);
        self
    }

    /// Effective ESR/DCR, 0 for resistors.
    pub fn parasitic(&self) -> f64 {
        match self.kind {
            ComponentKind::Capacitor => self.parasitic_ohms.unwrap_or(DEFAULT_ESR_OHMS),
            ComponentKind::Inductor => self.parasitic_ohms.unwrap_or(DEFAULT_DCR_OHMS),
            ComponentKind::Resistor => 0.0,
        }
    }

    /// Complex impedance of the element at `freq` Hz.
    pub fn impedance(&self, freq: f64) -> Complex64 {
        let omega = 2.0 * PI * freq;
        match self.kind {
            ComponentKind::Capacitor => {
                let c = self.value * 1e-6;
                Complex64::new(self.parasitic(), 0.0) + reciprocal(Complex64::new(0.0, omega * c))
            }
            ComponentKind::Inductor => {
                let l = self.value * 1e-3;
                Complex64::new(self.parasitic(), omega * l)
            }
            ComponentKind::Resistor => Complex64::new(self.value, 0.0),
        }
    }
}

/// Impedance and transfer function of a chain at one frequency.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NetworkResponse {
    /// Impedance seen at the network input
    pub impedance: Complex64,
    /// Voltage at the driver terminals over voltage at the input
    pub transfer: Complex64,
}

/// Everything the sweep needs from one driver at one frequency.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrossoverResponse {
    pub impedance: Complex64,
    pub impedance_ohm: f64,
    pub impedance_phase_deg: f64,
    /// electrical + source voltage + coupler gain
    pub gain_db: f64,
    /// `phase(H)`, added to the driver's acoustic phase
    pub phase_shift_deg: f64,
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Reject chains the solver cannot interpret unambiguously.
pub fn validate_chain(driver: &str, elements: &[CrossoverElement]) -> Result<(), AppError> {
    let mut seen = HashSet::with_capacity(elements.len());
    for el in elements {
        if !seen.insert(el.order) {
            return Err(AppError::Topology {
                message: format!("Driver '{driver}' has more than one element with order {}", el.order),
            });
        }
        if !el.value.is_finite() || el.value < 0.0 {
            return Err(AppError::Topology {
                message: format!(
                    "Driver '{driver}': {:?} at order {} has invalid value {}",
                    el.kind, el.order, el.value
                ),
            });
        }
        if let Some(p) = el.parasitic_ohms {
            if !p.is_finite() || p < 0.0 {
                return Err(AppError::Topology {
                    message: format!(
                        "Driver '{driver}': {:?} at order {} has invalid parasitic resistance {p}",
                        el.kind, el.order
                    ),
                });
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Solver
// ---------------------------------------------------------------------------

/// Solve a chain at `freq` Hz against the driver impedance `z_driver`.
///
/// The chain is not modified; it is walked through a sorted list of
/// references.
pub fn solve_network(
    freq: f64,
    elements: &[CrossoverElement],
    z_driver: Complex64,
    traversal: Traversal,
) -> NetworkResponse {
    let mut ordered: Vec<&CrossoverElement> = elements.iter().collect();
    match traversal {
        Traversal::DriverOutward => ordered.sort_by(|a, b| b.order.cmp(&a.order)),
        Traversal::SourceInward => ordered.sort_by(|a, b| a.order.cmp(&b.order)),
    }

    let mut z = z_driver;
    let mut h = ONE;

    for el in ordered {
        let z_el = el.impedance(freq);
        match el.topology {
            Topology::Series => {
                h *= safe_div(z, z_el + z);
                z += z_el;
            }
            Topology::Parallel => {
                z = parallel(z, z_el);
            }
        }
    }

    NetworkResponse {
        impedance: z,
        transfer: h,
    }
}

/// Gain of the coupler for one driver, honoring the double-counting rule.
pub fn acoustic_gain_db(freq: f64, includes_coupler: bool, config: &SimulationConfig) -> f64 {
    let ear = &config.ear_simulator;
    if !ear.enabled {
        return 0.0;
    }
    match config.solver.ear_contribution {
        EarContribution::SkipIfIncluded if includes_coupler => 0.0,
        _ => ear_gain_db(freq, ear),
    }
}

/// Solve one driver's chain and fold in source voltage and coupler gain.
pub fn solve_driver(
    freq: f64,
    elements: &[CrossoverElement],
    z_driver: Complex64,
    includes_coupler: bool,
    config: &SimulationConfig,
) -> CrossoverResponse {
    let SolverOptions { traversal, .. } = config.solver;
    let network = solve_network(freq, elements, z_driver, traversal);

    let electrical_db = amplitude_to_db(magnitude(network.transfer));
    let source_db = amplitude_to_db(config.source_voltage.volts());
    let acoustic_db = acoustic_gain_db(freq, includes_coupler, config);

    CrossoverResponse {
        impedance: network.impedance,
        impedance_ohm: magnitude(network.impedance),
        impedance_phase_deg: phase_deg(network.impedance),
        gain_db: electrical_db + source_db + acoustic_db,
        phase_shift_deg: phase_deg(network.transfer),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SourceVoltage;
    use crate::dsp::ear_sim::EarSimulatorConfig;

    fn r(ohms: f64) -> Complex64 {
        Complex64::new(ohms, 0.0)
    }

    #[test]
    fn test_element_impedances() {
        let c = CrossoverElement::new(ComponentKind::Capacitor, 10.0, Topology::Series, 1);
        let z = c.impedance(1000.0);
        let xc = 1.0 / (2.0 * PI * 1000.0 * 10e-6);
        assert!((z.re - DEFAULT_ESR_OHMS).abs() < 1e-12);
        assert!((z.im + xc).abs() < 1e-9, "capacitor reactance: {} vs {}", z.im, -xc);

        let l = CrossoverElement::new(ComponentKind::Inductor, 0.5, Topology::Series, 1)
            .with_parasitic(0.2);
        let z = l.impedance(1000.0);
        assert!((z.re - 0.2).abs() < 1e-12);
        assert!((z.im - 2.0 * PI * 1000.0 * 0.5e-3).abs() < 1e-9);

        let res = CrossoverElement::new(ComponentKind::Resistor, 4.7, Topology::Series, 1)
            .with_parasitic(1.0);
        assert_eq!(res.impedance(1000.0), r(4.7));
    }

    #[test]
    fn test_capacitor_at_dc_is_guarded() {
        let c = CrossoverElement::new(ComponentKind::Capacitor, 10.0, Topology::Series, 1);
        let z = c.impedance(0.0);
        assert!(z.re.is_finite() && z.im.is_finite());
        let zero = CrossoverElement::new(ComponentKind::Capacitor, 0.0, Topology::Series, 1);
        let z = zero.impedance(1000.0);
        assert!(z.re.is_finite() && z.im.is_finite());
    }

    #[test]
    fn test_series_resistor_is_voltage_divider() {
        let chain = [CrossoverElement::new(ComponentKind::Resistor, 4.0, Topology::Series, 1)];
        let zd = r(8.0);
        let resp = solve_network(1000.0, &chain, zd, Traversal::DriverOutward);
        let expected = zd / (r(4.0) + zd);
        assert_eq!(resp.transfer, expected);
        assert_eq!(resp.impedance, r(12.0));
    }

    #[test]
    fn test_parallel_only_leaves_transfer_unity() {
        let chain = [
            CrossoverElement::new(ComponentKind::Resistor, 10.0, Topology::Parallel, 1),
            CrossoverElement::new(ComponentKind::Capacitor, 4.7, Topology::Parallel, 2),
            CrossoverElement::new(ComponentKind::Inductor, 0.1, Topology::Parallel, 3),
        ];
        for f in [20.0, 1000.0, 20000.0] {
            let resp = solve_network(f, &chain, r(8.0), Traversal::DriverOutward);
            assert_eq!(resp.transfer, ONE, "parallel elements must not attenuate at {f} Hz");
            assert!(magnitude(resp.impedance) < 8.0);
        }
    }

    #[test]
    fn test_traversal_order_matters() {
        // Source -> series 4 Ω (order 1) -> shunt 8 Ω (order 2) -> driver 8 Ω
        let chain = [
            CrossoverElement::new(ComponentKind::Resistor, 4.0, Topology::Series, 1),
            CrossoverElement::new(ComponentKind::Resistor, 8.0, Topology::Parallel, 2),
        ];
        let outward = solve_network(1000.0, &chain, r(8.0), Traversal::DriverOutward);
        let inward = solve_network(1000.0, &chain, r(8.0), Traversal::SourceInward);

        // Shunt first: 8 || 8 = 4, then 4 in series: H = 4 / 8, Z = 8
        assert!((outward.transfer.re - 0.5).abs() < 1e-12);
        assert!((outward.impedance.re - 8.0).abs() < 1e-12);
        // Series first: H = 8 / 12, Z = 12 || 8 = 4.8
        assert!((inward.transfer.re - 8.0 / 12.0).abs() < 1e-12);
        assert!((inward.impedance.re - 4.8).abs() < 1e-12);

        assert_ne!(outward.transfer, inward.transfer);
        assert_ne!(outward.impedance, inward.impedance);
    }

    #[test]
    fn test_order_independent_of_input_order() {
        let a = CrossoverElement::new(ComponentKind::Inductor, 0.3, Topology::Series, 3);
        let b = CrossoverElement::new(ComponentKind::Capacitor, 6.8, Topology::Parallel, 7);
        let c = CrossoverElement::new(ComponentKind::Resistor, 2.2, Topology::Series, 5);
        let one = [a.clone(), b.clone(), c.clone()];
        let two = [c, a, b];
        let r1 = solve_network(3000.0, &one, r(16.0), Traversal::DriverOutward);
        let r2 = solve_network(3000.0, &two, r(16.0), Traversal::DriverOutward);
        assert_eq!(r1, r2);
    }

    #[test]
    fn test_validate_duplicate_order() {
        let chain = [
            CrossoverElement::new(ComponentKind::Resistor, 4.0, Topology::Series, 1),
            CrossoverElement::new(ComponentKind::Capacitor, 1.0, Topology::Parallel, 1),
        ];
        assert!(matches!(
            validate_chain("tweeter", &chain),
            Err(AppError::Topology { .. })
        ));
    }

    #[test]
    fn test_validate_negative_value() {
        let chain = [CrossoverElement::new(ComponentKind::Inductor, -1.0, Topology::Series, 1)];
        assert!(validate_chain("woofer", &chain).is_err());
        let chain = [CrossoverElement::new(ComponentKind::Inductor, 1.0, Topology::Series, 1)
            .with_parasitic(f64::NAN)];
        assert!(validate_chain("woofer", &chain).is_err());
    }

    #[test]
    fn test_source_voltage_gain() {
        let config = SimulationConfig {
            source_voltage: SourceVoltage::Custom(2.0),
            ..Default::default()
        };
        let resp = solve_driver(1000.0, &[], r(8.0), false, &config);
        assert!((resp.gain_db - 6.0206).abs() < 1e-3, "got {}", resp.gain_db);
        assert_eq!(resp.phase_shift_deg, 0.0);
        assert_eq!(resp.impedance_ohm, 8.0);
    }

    #[test]
    fn test_coupler_not_double_counted() {
        let config = SimulationConfig {
            source_voltage: SourceVoltage::Custom(1.0),
            ear_simulator: EarSimulatorConfig {
                enabled: true,
                ..Default::default()
            },
            ..Default::default()
        };
        let f = 2700.0;
        let raw = solve_driver(f, &[], r(8.0), false, &config);
        let baked = solve_driver(f, &[], r(8.0), true, &config);
        assert!(raw.gain_db > 3.0, "coupler gain should apply, got {}", raw.gain_db);
        assert!(baked.gain_db.abs() < 1e-12, "already-coupled response must not gain");

        let mut always = config.clone();
        always.solver.ear_contribution = EarContribution::Always;
        let forced = solve_driver(f, &[], r(8.0), true, &always);
        assert!((forced.gain_db - raw.gain_db).abs() < 1e-12);
    }
}
