//! Byte-count formatting shared by the width resolver and the renderer.

const UNIT: f64 = 1024.0;
const SUFFIXES: [&str; 6] = ["KB", "MB", "GB", "TB", "PB", "EB"];

/// Format a byte count with a binary unit suffix.
///
/// Values below 1024 are printed as whole bytes (`512B`). Larger values are
/// divided by 1024 until they drop below 1024 and printed with one
/// fractional digit (`1536` -> `1.5KB`). Negative values print as `-`.
pub fn format_size(bytes: i64) -> String {
    if bytes < 0 {
        return "-".to_string();
    }
    if bytes < 1024 {
        return format!("{bytes}B");
    }

    let mut value = bytes as f64;
    for suffix in SUFFIXES {
        value /= UNIT;
        if value < UNIT {
            return format!("{value:.1}{suffix}");
        }
    }

    // i64::MAX is below 8 EB, so the loop always returns.
    format!("{bytes}B")
}

/// Format a size column value, either as raw decimal bytes or with units.
pub fn format_size_column(bytes: i64, raw_bytes: bool) -> String {
    if raw_bytes {
        bytes.to_string()
    } else {
        format_size(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size_units() {
        assert_eq!(format_size(0), "0B");
        assert_eq!(format_size(512), "512B");
        assert_eq!(format_size(1023), "1023B");
        assert_eq!(format_size(1024), "1.0KB");
        assert_eq!(format_size(1536), "1.5KB");
        assert_eq!(format_size(1_048_576), "1.0MB");
        assert_eq!(format_size(5 * 1024 * 1024 * 1024), "5.0GB");
        assert_eq!(format_size(3 * 1024_i64.pow(4)), "3.0TB");
        assert_eq!(format_size(2 * 1024_i64.pow(6)), "2.0EB");
    }

    #[test]
    fn test_format_size_negative() {
        assert_eq!(format_size(-1), "-");
        assert_eq!(format_size(i64::MIN), "-");
    }

    #[test]
    fn test_format_size_column() {
        assert_eq!(format_size_column(0, false), "0B");
        assert_eq!(format_size_column(0, true), "0");
        assert_eq!(format_size_column(1536, false), "1.5KB");
        assert_eq!(format_size_column(1536, true), "1536");
        assert_eq!(format_size_column(1024 * 1024, false), "1.0MB");
    }
}
