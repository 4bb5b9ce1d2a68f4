use std::path::Path;

use tracing::debug;

use crate::error::AppError;

use super::{MeasurementKind, MeasurementPoint, MeasurementSeries};

/// Import a measurement file.
///
/// With `kind == None` the kind is taken from the extension: `.frd` is a
/// response, `.zma` an impedance. Anything else needs an explicit kind.
pub fn import_measurement(
    path: &Path,
    kind: Option<MeasurementKind>,
) -> Result<MeasurementSeries, AppError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    let kind = match (kind, ext.as_str()) {
        (Some(kind), _) => kind,
        (None, "frd") => MeasurementKind::Response,
        (None, "zma") => MeasurementKind::Impedance,
        (None, _) => {
            return Err(AppError::Parse {
                message: format!(
                    "Cannot infer measurement kind from '.{ext}' ({}), pass it explicitly",
                    path.display()
                ),
            })
        }
    };

    let content = std::fs::read_to_string(path).map_err(AppError::Io)?;
    let series = parse_measurement(&content, kind).map_err(|e| match e {
        AppError::Parse { message } => AppError::Parse {
            message: format!("{}: {message}", path.display()),
        },
        other => other,
    })?;

    debug!(
        "import_measurement: {} -> {} {:?} points",
        path.display(),
        series.len(),
        kind
    );
    Ok(series)
}

/// Parse a columnar measurement export.
///
/// Format:
/// ```text
/// * Freq(Hz)  SPL(dB)  Phase(deg)
/// 1000.0      104.8    -12.0
/// ```
///
/// Lines starting with `*` or `#` are comments. Columns are separated by
/// whitespace (commas and semicolons are tolerated). A missing phase column
/// reads as 0°. Rows that do not parse are skipped; a file without a single
/// valid row is an error.
pub fn parse_measurement(content: &str, kind: MeasurementKind) -> Result<MeasurementSeries, AppError> {
    let mut points = Vec::new();
    let mut skipped = 0usize;

    for line in content.lines() {
        let trimmed = line.trim();

        if trimmed.is_empty() || trimmed.starts_with('*') || trimmed.starts_with('#') {
            continue;
        }

        match parse_row(trimmed) {
            Some(point) => points.push(point),
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        debug!("parse_measurement: skipped {} malformed {:?} rows", skipped, kind);
    }

    if points.is_empty() {
        return Err(AppError::Parse {
            message: "No data points found in file".to_string(),
        });
    }

    Ok(MeasurementSeries::from_points(kind, points))
}

/// Parse an .frd (frequency, SPL, phase) export.
pub fn parse_frd(content: &str) -> Result<MeasurementSeries, AppError> {
    parse_measurement(content, MeasurementKind::Response)
}

/// Parse a .zma (frequency, impedance, phase) export.
pub fn parse_zma(content: &str) -> Result<MeasurementSeries, AppError> {
    parse_measurement(content, MeasurementKind::Impedance)
}

fn parse_row(line: &str) -> Option<MeasurementPoint> {
    let mut parts = line
        .split(|c: char| c.is_whitespace() || c == ',' || c == ';')
        .filter(|s| !s.is_empty());

    let freq: f64 = parts.next()?.parse().ok()?;
    let value: f64 = parts.next()?.parse().ok()?;
    let phase: f64 = match parts.next() {
        Some(p) => p.parse().ok()?,
        None => 0.0,
    };

    if !freq.is_finite() || freq <= 0.0 || !value.is_finite() || !phase.is_finite() {
        return None;
    }

    Some(MeasurementPoint { freq, value, phase })
}
