//! Frequency response simulator for multi-driver in-ear monitors.
//!
//! Measured driver curves, a passive RLC crossover per driver and an
//! ear-coupler model go in; per-frequency SPL, phase and impedance come out.
//!
//! ```no_run
//! use iemforge::config::SimulationConfig;
//! use iemforge::driver::Driver;
//! use iemforge::io::{MeasurementKind, MeasurementSeries};
//!
//! let driver = Driver::new("ba")
//!     .with_response(MeasurementSeries::flat(MeasurementKind::Response, 20.0, 20000.0, 90.0, 0.0));
//! let results = iemforge::sweep::run_sweep(&[driver], &SimulationConfig::default()).unwrap();
//! println!("{} points", results.len());
//! ```

pub mod config;
pub mod crossover;
pub mod driver;
pub mod dsp;
pub mod error;
pub mod export;
pub mod io;
pub mod project;
pub mod session;
pub mod sweep;

pub use config::{SimulationConfig, SourceVoltage, VoltagePreset};
pub use driver::Driver;
pub use error::AppError;
pub use session::Session;
pub use sweep::{run_sweep, SimulationResultPoint};

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` wins; otherwise `default_level` is used.
pub fn init_tracing(default_level: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .try_init();
}
