//! CSV export of measurement history

use chrono::SecondsFormat;
use std::collections::HashMap;

use crate::calibration::Calibration;
use crate::measurement::Measurement;

/// Column names, in output order
pub const CSV_HEADER: [&str; 22] = [
    "date",
    "grinder",
    "setting",
    "coffee",
    "calibrationName",
    "micronsPerPixel",
    "n",
    "mean",
    "std",
    "D10",
    "D50",
    "D90",
    "span",
    "cov",
    "finePct",
    "coarsePct",
    "binWidth",
    "minAreaPx",
    "maxAreaPx",
    "blur",
    "open",
    "invert",
];

/// Render measurements as CSV, header first, one row per measurement
///
/// Calibration names are looked up by id; a measurement whose calibration
/// was deleted gets an empty name cell. Text cells are quoted when they
/// contain a comma, quote or line break.
pub fn measurements_csv(measurements: &[Measurement], calibrations: &[Calibration]) -> String {
    let names: HashMap<&str, &str> = calibrations
        .iter()
        .map(|calibration| (calibration.id.as_str(), calibration.name.as_str()))
        .collect();

    let mut csv = CSV_HEADER.join(",");
    csv.push('\n');

    for m in measurements {
        let calibration_name = names.get(m.calibration_id.as_str()).copied().unwrap_or("");
        let row = [
            m.date_created.to_rfc3339_opts(SecondsFormat::Millis, true),
            escape(m.grinder.as_deref().unwrap_or("")),
            escape(m.setting.as_deref().unwrap_or("")),
            escape(m.coffee_label.as_deref().unwrap_or("")),
            escape(calibration_name),
            m.microns_per_pixel.to_string(),
            m.sample_size.to_string(),
            m.stats.mean.to_string(),
            m.stats.std_dev.to_string(),
            m.stats.p10.to_string(),
            m.stats.p50.to_string(),
            m.stats.p90.to_string(),
            m.stats.span.to_string(),
            m.stats.coefficient_of_variation.to_string(),
            m.fine_pct.to_string(),
            m.coarse_pct.to_string(),
            m.params.bin_width_microns.to_string(),
            m.params.min_area_px.to_string(),
            m.params.max_area_px.to_string(),
            m.params.blur_kernel_px.to_string(),
            m.params.open_kernel_px.to_string(),
            m.params.invert_binary.to_string(),
        ];
        csv.push_str(&row.join(","));
        csv.push('\n');
    }

    csv
}

/// RFC 4180 quoting
fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
