use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::info;

use crate::error::AppError;
use crate::sweep::SimulationResultPoint;

pub const CSV_HEADER: &str = "Frequency(Hz),Total SPL(dB),Total Impedance(Ohm),Total Phase(deg)";

/// Column layout of the CSV export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CsvLayout {
    /// Frequency and system totals only
    #[default]
    Totals,
    /// Totals followed by SPL, acoustic phase, impedance and impedance
    /// phase per driver
    WithDrivers,
}

/// Two decimals, blank for undefined.
fn field(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{v:.2}"),
        _ => String::new(),
    }
}

/// Write results as CSV, one row per frequency.
pub fn write_csv<W: Write>(
    mut out: W,
    points: &[SimulationResultPoint],
    layout: CsvLayout,
) -> Result<(), AppError> {
    let mut header = CSV_HEADER.to_string();
    if layout == CsvLayout::WithDrivers {
        if let Some(first) = points.first() {
            for d in &first.drivers {
                header.push_str(&format!(
                    ",{0} SPL(dB),{0} Phase(deg),{0} Impedance(Ohm),{0} Impedance Phase(deg)",
                    d.name
                ));
            }
        }
    }
    writeln!(out, "{header}")?;

    for p in points {
        let mut row = format!(
            "{},{},{},{}",
            field(Some(p.freq)),
            field(Some(p.total_spl_db)),
            field(Some(p.total_impedance_ohm)),
            field(p.total_impedance_phase_deg)
        );
        if layout == CsvLayout::WithDrivers {
            for d in &p.drivers {
                row.push_str(&format!(
                    ",{},{},{},{}",
                    field(d.spl_db),
                    field(d.phase_deg),
                    field(d.impedance_ohm),
                    field(d.impedance_phase_deg)
                ));
            }
        }
        writeln!(out, "{row}")?;
    }
    out.flush()?;
    Ok(())
}

/// Write results to a CSV file.
pub fn export_csv(
    path: &Path,
    points: &[SimulationResultPoint],
    layout: CsvLayout,
) -> Result<(), AppError> {
    let file = File::create(path)?;
    write_csv(BufWriter::new(file), points, layout)?;
    info!("export_csv: {} rows -> {}", points.len(), path.display());
    Ok(())
}
