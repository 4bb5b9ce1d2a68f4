use tracing::info;

use crate::config::{SimulationConfig, SourceVoltage};
use crate::crossover::{validate_chain, CrossoverElement};
use crate::driver::Driver;
use crate::dsp::ear_sim::EarSimulatorConfig;
use crate::error::AppError;
use crate::sweep::{run_sweep, SimulationResultPoint};

/// Editable set of drivers and settings.
///
/// Mutators validate immediately so that a sweep never sees a structurally
/// broken configuration. Sweeps borrow the session read-only.
#[derive(Debug, Clone, Default)]
pub struct Session {
    drivers: Vec<Driver>,
    config: SimulationConfig,
}

impl Session {
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            drivers: Vec::new(),
            config,
        }
    }

    pub fn drivers(&self) -> &[Driver] {
        &self.drivers
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn driver(&self, name: &str) -> Option<&Driver> {
        self.drivers.iter().find(|d| d.name == name)
    }

    pub fn add_driver(&mut self, driver: Driver) -> Result<(), AppError> {
        if self.driver(&driver.name).is_some() {
            return Err(AppError::Topology {
                message: format!("Driver name '{}' is used more than once", driver.name),
            });
        }
        driver.validate()?;
        self.drivers.push(driver);
        Ok(())
    }

    /// Remove a driver together with its crossover chain.
    pub fn remove_driver(&mut self, name: &str) -> Option<Driver> {
        let idx = self.drivers.iter().position(|d| d.name == name)?;
        Some(self.drivers.remove(idx))
    }

    /// Append an element to a driver's chain.
    pub fn add_element(&mut self, driver: &str, element: CrossoverElement) -> Result<(), AppError> {
        let target = self
            .drivers
            .iter_mut()
            .find(|d| d.name == driver)
            .ok_or_else(|| AppError::Topology {
                message: format!("Crossover element references unknown driver '{driver}'"),
            })?;

        let mut chain = target.crossover.clone();
        chain.push(element);
        validate_chain(&target.name, &chain)?;
        target.crossover = chain;
        Ok(())
    }

    /// Remove the element with `order` from a driver's chain.
    pub fn remove_element(&mut self, driver: &str, order: i32) -> Option<CrossoverElement> {
        let target = self.drivers.iter_mut().find(|d| d.name == driver)?;
        let idx = target.crossover.iter().position(|e| e.order == order)?;
        Some(target.crossover.remove(idx))
    }

    pub fn set_ear_simulator(&mut self, ear: EarSimulatorConfig) -> Result<(), AppError> {
        ear.validate()?;
        self.config.ear_simulator = ear;
        Ok(())
    }

    pub fn set_source_voltage(&mut self, voltage: SourceVoltage) -> Result<(), AppError> {
        let mut next = self.config.clone();
        next.source_voltage = voltage;
        next.validate()?;
        self.config = next;
        Ok(())
    }

    pub fn set_config(&mut self, config: SimulationConfig) -> Result<(), AppError> {
        config.validate()?;
        self.config = config;
        Ok(())
    }

    /// Sweep the current snapshot.
    pub fn run(&self) -> Result<Vec<SimulationResultPoint>, AppError> {
        info!("session run: {} drivers", self.drivers.len());
        run_sweep(&self.drivers, &self.config)
    }
}
