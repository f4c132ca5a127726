// Byte sizes: parsing operator input and formatting for reports.
// Units are binary (1 MB = 1024 * 1024 bytes), matching the storage tooling.

const KB: u64 = 1024;
const MB: u64 = KB * 1024;
const GB: u64 = MB * 1024;
const TB: u64 = GB * 1024;

/// Bytes per MB.
pub const MIB: u64 = MB;

/// Parses a signed size. A bare number is megabytes; `B`, `KB`, `MB`, `GB`
/// and `TB` suffixes are accepted case-insensitively, with optional space.
pub fn parse_size(raw: &str) -> Result<i64, String> {
    let s = raw.trim();
    if s.is_empty() {
        return Err("empty size".into());
    }
    let split = s
        .find(|c: char| c.is_ascii_alphabetic())
        .unwrap_or(s.len());
    let (number, unit) = s.split_at(split);
    let number = number.trim();
    let multiplier: u64 = match unit.trim().to_ascii_uppercase().as_str() {
        "" | "M" | "MB" => MB,
        "B" => 1,
        "K" | "KB" => KB,
        "G" | "GB" => GB,
        "T" | "TB" => TB,
        other => return Err(format!("unknown unit '{}'", other)),
    };
    let value: i64 = number
        .parse()
        .map_err(|_| format!("'{}' is not a whole number", number))?;
    value
        .checked_mul(multiplier as i64)
        .ok_or_else(|| format!("'{}' is too large", s))
}

/// Formats bytes in megabytes, falling back to KB/B below one megabyte.
pub fn format_bytes(bytes: u64) -> String {
    if bytes >= MB {
        if bytes % MB == 0 {
            format!("{} MB", bytes / MB)
        } else {
            format!("{:.2} MB", bytes as f64 / MB as f64)
        }
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
