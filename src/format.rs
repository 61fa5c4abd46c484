//! Engineering-prefix formatting for sensor readings

/// Text stored for a reading that is not available
pub const NULL_READING: &str = "null";

/// Scale `value` into the p/n/u/m band matching its magnitude and render it
/// with three decimals, e.g. `format_engineering(2.5e-7, "A") == "250.000 nA"`.
pub fn format_engineering(value: f64, unit: &str) -> String {
    let magnitude = value.abs();

    let (scaled, prefix) = if magnitude < 1e-9 {
        (value * 1e12, "p")
    } else if magnitude < 1e-6 {
        (value * 1e9, "n")
    } else if magnitude < 1e-3 {
        (value * 1e6, "u")
    } else if magnitude < 1.0 {
        (value * 1e3, "m")
    } else {
        (value, "")
    };

    format!("{:.3} {}{}", scaled, prefix, unit)
}

/// Render a raw reading for the run log, mapping NaN to [`NULL_READING`]
pub fn format_reading(value: f64, unit: &str) -> String {
    if value.is_nan() {
        NULL_READING.to_string()
    } else {
        format_engineering(value, unit)
    }
}
