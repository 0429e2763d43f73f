//! Utility functions shared by Warren services.

/// Parse a duration string like "5m", "1h", "30s", "2d" into seconds.
pub fn parse_duration_secs(s: &str) -> Result<u64, String> {
    let s = s.trim();
    let (split, _) = s.char_indices().last().ok_or("Empty duration string")?;
    let (num_str, unit) = s.split_at(split);
    let num: u64 = num_str.parse().map_err(|_| format!("Invalid number: {num_str}"))?;

    let multiplier = match unit {
        "s" => 1,
        "m" => 60,
        "h" => 3600,
        "d" => 86400,
        _ => return Err(format!("Unknown unit: {unit}")),
    };

    num.checked_mul(multiplier)
        .ok_or_else(|| format!("Duration too large: {s}"))
}

/// Round to a fixed number of decimal places. Non-finite values pass through.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Render a fraction as a percentage with one decimal ("0.05" -> "5.0%").
pub fn format_percent(fraction: f64) -> String {
    format!("{:.1}%", fraction * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration_secs() {
        assert_eq!(parse_duration_secs("30s"), Ok(30));
        assert_eq!(parse_duration_secs("5m"), Ok(300));
        assert_eq!(parse_duration_secs("24h"), Ok(86400));
        assert_eq!(parse_duration_secs("2d"), Ok(172800));
        assert!(parse_duration_secs("").is_err());
        assert!(parse_duration_secs("10x").is_err());
        assert!(parse_duration_secs("h").is_err());
    }

    #[test]
    fn test_parse_duration_secs_rejects_multibyte_unit() {
        assert_eq!(parse_duration_secs("5µ"), Err("Unknown unit: µ".to_string()));
        assert!(parse_duration_secs("µ").is_err());
    }

    #[test]
    fn test_parse_duration_secs_rejects_overflow() {
        let huge = format!("{}d", u64::MAX / 2);
        assert!(parse_duration_secs(&huge).unwrap_err().starts_with("Duration too large"));
        assert_eq!(parse_duration_secs(&format!("{}s", u64::MAX)), Ok(u64::MAX));
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(123.456, 2), 123.46);
        assert_eq!(round_to(0.125, 0), 0.0);
        assert!(round_to(f64::NAN, 2).is_nan());
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(0.05), "5.0%");
        assert_eq!(format_percent(0.1215), "12.2%");
    }
}
