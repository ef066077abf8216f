//! Size formatting utilities: human-readable byte counts.
//!
//! All internal sizes are `u64` bytes. Floating point is only used
//! at the display-formatting boundary.

/// Binary unit labels, smallest first.
const UNITS: [&str; 9] = ["B", "KiB", "MiB", "GiB", "TiB", "PiB", "EiB", "ZiB", "YiB"];

/// Format a byte count into a human-readable string with a binary unit.
///
/// Divides by 1024 until the magnitude drops below 1024 and prints one
/// decimal place with no separating space, e.g. `1.5KiB`. Values beyond
/// the YiB range stay in YiB.
pub fn format_size(bytes: u64) -> String {
    let mut value = bytes as f64;
    for unit in &UNITS[..UNITS.len() - 1] {
        if value < 1024.0 {
            return format!("{value:.1}{unit}");
        }
        value /= 1024.0;
    }
    format!("{value:.1}{}", UNITS[UNITS.len() - 1])
}

/// Format a file count with thousand separators.
pub fn format_count(count: u64) -> String {
    if count < 1_000 {
        return count.to_string();
    }
    let s = count.to_string();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    for (i, ch) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(ch);
    }
    result.chars().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size_bytes() {
        assert_eq!(format_size(0), "0.0B");
        assert_eq!(format_size(512), "512.0B");
        assert_eq!(format_size(1023), "1023.0B");
    }

    #[test]
    fn test_format_size_kib() {
        assert_eq!(format_size(1024), "1.0KiB");
        assert_eq!(format_size(1536), "1.5KiB");
    }

    #[test]
    fn test_format_size_mib() {
        assert_eq!(format_size(1_048_576), "1.0MiB");
    }

    #[test]
    fn test_format_size_gib() {
        assert_eq!(format_size(1024u64.pow(3)), "1.0GiB");
    }

    #[test]
    fn test_format_size_exbibytes() {
        assert_eq!(format_size(1024u64.pow(6)), "1.0EiB");
        assert_eq!(format_size(u64::MAX), "16.0EiB");
    }

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1_000), "1,000");
        assert_eq!(format_count(1_234_567), "1,234,567");
    }
}
