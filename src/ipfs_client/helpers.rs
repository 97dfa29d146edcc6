const UNITS: [&str; 5] = ["KB", "MB", "GB", "TB", "PB"];

/// Decimal (1000-based) human readable byte count, e.g. `1.5 MB`.
pub fn format_byte_count(bytes: i64) -> String {
    let bytes = bytes.max(0);
    if bytes == 1 {
        return "1 byte".to_string();
    }
    if bytes < 1000 {
        return format!("{bytes} bytes");
    }

    let mut value = bytes as f64 / 1000.0;
    let mut unit = 0;
    while value >= 999.95 && unit < UNITS.len() - 1 {
        value /= 1000.0;
        unit += 1;
    }

    let rounded = format!("{value:.1}");
    let trimmed = rounded.strip_suffix(".0").unwrap_or(&rounded);
    format!("{} {}", trimmed, UNITS[unit])
}

/// Per-second rate label for charts, e.g. `400 bytes/s`.
pub fn format_rate(bytes_per_sec: u64) -> String {
    let clamped = i64::try_from(bytes_per_sec).unwrap_or(i64::MAX);
    format!("{}/s", format_byte_count(clamped))
}
