use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::SimulationConfig;
use crate::crossover::{ComponentKind, CrossoverElement, Topology};
use crate::driver::Driver;
use crate::error::AppError;
use crate::io::{import_measurement, MeasurementKind};
use crate::session::Session;

// ---------------------------------------------------------------------------
// Project file data model (v1)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectFile {
    pub version: u32,
    #[serde(default)]
    pub name: Option<String>,
    pub drivers: Vec<DriverData>,
    /// Flat list; each entry names the driver it belongs to
    #[serde(default)]
    pub crossover: Vec<ElementData>,
    #[serde(default)]
    pub simulation: SimulationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverData {
    pub name: String,
    #[serde(default)]
    pub inverted: bool,
    /// Relative to the project file
    #[serde(default)]
    pub response_file: Option<String>,
    #[serde(default)]
    pub impedance_file: Option<String>,
    #[serde(default)]
    pub response_includes_coupler: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementData {
    pub driver: String,
    pub kind: ComponentKind,
    pub value: f64,
    pub topology: Topology,
    pub order: i32,
    #[serde(default)]
    pub parasitic_ohms: Option<f64>,
}

impl From<&ElementData> for CrossoverElement {
    fn from(e: &ElementData) -> Self {
        CrossoverElement {
            kind: e.kind,
            value: e.value,
            topology: e.topology,
            order: e.order,
            parasitic_ohms: e.parasitic_ohms,
        }
    }
}

pub const MAX_VERSION: u32 = 1;

pub fn save_project(path: &Path, project: &ProjectFile) -> Result<(), AppError> {
    info!("save_project: {}", path.display());
    let json = serde_json::to_string_pretty(project)?;
    std::fs::write(path, json)?;
    Ok(())
}

pub fn load_project(path: &Path) -> Result<ProjectFile, AppError> {
    info!("load_project: {}", path.display());
    let json = std::fs::read_to_string(path)?;
    let project: ProjectFile = serde_json::from_str(&json)?;
    if project.version > MAX_VERSION {
        return Err(AppError::Config {
            message: format!(
                "Project version {} is newer than supported (max {})",
                project.version, MAX_VERSION
            ),
        });
    }
    info!(
        "load_project: {} drivers, {} crossover elements",
        project.drivers.len(),
        project.crossover.len()
    );
    Ok(project)
}

impl ProjectFile {
    /// Resolve measurement files against `base_dir` and build a validated
    /// session.
    pub fn into_session(&self, base_dir: &Path) -> Result<Session, AppError> {
        let mut chains: HashMap<&str, Vec<CrossoverElement>> = HashMap::new();
        for el in &self.crossover {
            if !self.drivers.iter().any(|d| d.name == el.driver) {
                return Err(AppError::Topology {
                    message: format!("Crossover element references unknown driver '{}'", el.driver),
                });
            }
            chains.entry(el.driver.as_str()).or_default().push(el.into());
        }

        let mut session = Session::new(SimulationConfig::default());
        session.set_config(self.simulation.clone())?;

        for data in &self.drivers {
            let mut driver = Driver::new(data.name.clone())
                .inverted(data.inverted)
                .includes_coupler(data.response_includes_coupler);
            if let Some(file) = &data.response_file {
                let path = resolve(base_dir, file);
                driver.response = Some(import_measurement(&path, Some(MeasurementKind::Response))?);
            }
            if let Some(file) = &data.impedance_file {
                let path = resolve(base_dir, file);
                driver.impedance = Some(import_measurement(&path, Some(MeasurementKind::Impedance))?);
            }
            driver.crossover = chains.remove(data.name.as_str()).unwrap_or_default();
            session.add_driver(driver)?;
        }

        Ok(session)
    }
}

fn resolve(base_dir: &Path, file: &str) -> PathBuf {
    let p = Path::new(file);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base_dir.join(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROJECT: &str = r#"{
        "version": 1,
        "name": "2-way",
        "drivers": [
            { "name": "woofer" },
            { "name": "tweeter", "inverted": true }
        ],
        "crossover": [
            { "driver": "tweeter", "kind": "capacitor", "value": 4.7, "topology": "series", "order": 2 },
            { "driver": "tweeter", "kind": "resistor", "value": 10.0, "topology": "parallel", "order": 1 },
            { "driver": "woofer", "kind": "inductor", "value": 0.2, "topology": "series", "order": 1, "parasitic_ohms": 0.3 }
        ]
    }"#;

    #[test]
    fn test_into_session_groups_elements() {
        let project: ProjectFile = serde_json::from_str(PROJECT).unwrap();
        let session = project.into_session(Path::new(".")).unwrap();
        assert_eq!(session.drivers().len(), 2);
        let tweeter = session.driver("tweeter").unwrap();
        assert!(tweeter.inverted);
        assert_eq!(tweeter.crossover.len(), 2);
        let woofer = session.driver("woofer").unwrap();
        assert_eq!(woofer.crossover[0].parasitic_ohms, Some(0.3));
        assert_eq!(session.config(), &SimulationConfig::default());
    }

    #[test]
    fn test_unknown_driver_reference() {
        let mut project: ProjectFile = serde_json::from_str(PROJECT).unwrap();
        project.crossover[0].driver = "mid".into();
        assert!(matches!(
            project.into_session(Path::new(".")),
            Err(AppError::Topology { .. })
        ));
    }

    #[test]
    fn test_duplicate_order_rejected() {
        let mut project: ProjectFile = serde_json::from_str(PROJECT).unwrap();
        project.crossover[1].order = 2;
        assert!(matches!(
            project.into_session(Path::new(".")),
            Err(AppError::Topology { .. })
        ));
    }

    #[test]
    fn test_missing_measurement_file() {
        let mut project: ProjectFile = serde_json::from_str(PROJECT).unwrap();
        project.drivers[0].response_file = Some("does-not-exist.frd".into());
        assert!(matches!(
            project.into_session(Path::new("/nonexistent")),
            Err(AppError::Io(_))
        ));
    }
}
