//! Human-readable byte sizes.

use thiserror::Error;

/// Display units, each 1024 times the previous one.
const UNITS: [&str; 6] = ["B", "KB", "MB", "GB", "TB", "PB"];

/// Format a byte count with one decimal place.
///
/// The value is divided by 1024 until it drops below 1024, stopping at PB.
///
/// ```
/// assert_eq!(dirsight_core::format_size(1024), "1.0 KB");
/// assert_eq!(dirsight_core::format_size(1536), "1.5 KB");
/// ```
pub fn format_size(bytes: u64) -> String {
    let mut size = bytes as f64;
    for unit in &UNITS[..UNITS.len() - 1] {
        if size < 1024.0 {
            return format!("{size:.1} {unit}");
        }
        size /= 1024.0;
    }
    format!("{size:.1} {}", UNITS[UNITS.len() - 1])
}

/// Error returned by [`parse_size`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SizeParseError {
    /// The numeric part is missing or malformed.
    #[error("Invalid number in size: {0:?}")]
    InvalidNumber(String),
    /// The unit is not one of B, KB, MB, GB, TB, PB.
    #[error("Unknown size unit: {0:?}")]
    UnknownUnit(String),
}

/// Parse a size such as `"1.5 KB"`, `"10MB"` or `"512"` back into bytes.
///
/// Units are case-insensitive and the trailing `B` may be omitted (`"4k"`).
/// Fractions are truncated towards zero.
pub fn parse_size(text: &str) -> Result<u64, SizeParseError> {
    let text = text.trim();
    let split = text
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(text.len());
    let (number, unit) = text.split_at(split);

    let value: f64 = number
        .parse()
        .map_err(|_| SizeParseError::InvalidNumber(text.to_string()))?;

    let unit = unit.trim().to_ascii_uppercase();
    let exponent = match unit.as_str() {
        "" | "B" => 0,
        "K" | "KB" => 1,
        "M" | "MB" => 2,
        "G" | "GB" => 3,
        "T" | "TB" => 4,
        "P" | "PB" => 5,
        _ => return Err(SizeParseError::UnknownUnit(unit)),
    };

    Ok((value * 1024f64.powi(exponent)) as u64)
}
