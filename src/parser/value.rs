//! # Value Normalizer
//!
//! Best-effort cleanup of raw value tokens into typed values.

use crate::telemetry::TelemetryValue;

/// Normalize a raw value token.
///
/// - Strips surrounding whitespace and a leading run of `=`/`>` characters
/// - Strips a trailing alphabetic unit (`degC`, `V`, `A`, `bytes`, `dBm`)
///   when it follows a number
/// - Coerces to a float if a decimal point remains, otherwise to an integer
/// - Falls back to the cleaned string (case preserved) when coercion fails
///
/// Returns `None` when nothing is left after cleanup. Never panics.
///
/// # Examples
///
/// ```
/// use satlog_ingest::parser::value::normalize;
/// use satlog_ingest::telemetry::TelemetryValue;
///
/// assert_eq!(normalize("  ==>  12.50 degC  "), Some(TelemetryValue::Float(12.5)));
/// assert_eq!(normalize("429"), Some(TelemetryValue::Int(429)));
/// assert_eq!(normalize("ON "), Some(TelemetryValue::Text("ON".into())));
/// assert_eq!(normalize(" => "), None);
/// ```
pub fn normalize(raw: &str) -> Option<TelemetryValue> {
    let cleaned = strip_unit(strip_prefix(raw));
    if cleaned.is_empty() {
        return None;
    }

    let coerced = if cleaned.contains('.') {
        cleaned.parse::<f64>().ok().map(TelemetryValue::Float)
    } else {
        cleaned.parse::<i64>().ok().map(TelemetryValue::Int)
    };

    Some(coerced.unwrap_or_else(|| TelemetryValue::Text(cleaned.to_string())))
}

/// Normalize a token known to be numeric, dropping thousands separators.
///
/// Used for memory sizes such as `1,048,576`.
pub fn normalize_numeric(raw: &str) -> Option<TelemetryValue> {
    normalize(&raw.replace(',', ""))
}

fn strip_prefix(raw: &str) -> &str {
    raw.trim()
        .trim_start_matches(|c: char| c == '=' || c == '>')
        .trim_start()
}

fn strip_unit(value: &str) -> &str {
    let value = value.trim_end();
    let head = value.trim_end_matches(|c: char| c.is_ascii_alphabetic());
    if head.len() == value.len() {
        return value;
    }

    // Bare words such as "ON", "N/A" or "0x1F" are values, not units
    let head = head.trim_end();
    let numeric_head = head.ends_with(|c: char| c.is_ascii_digit() || c == '.')
        && !head.contains(|c: char| c.is_ascii_alphabetic());
    if numeric_head {
        head
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_with_prefix_and_unit() {
        assert_eq!(normalize("  ==>  12.50 degC  "), Some(TelemetryValue::Float(12.5)));
    }

    #[test]
    fn test_plain_integer() {
        assert_eq!(normalize("429"), Some(TelemetryValue::Int(429)));
    }

    #[test]
    fn test_signed_numbers() {
        assert_eq!(normalize("-90dBm"), Some(TelemetryValue::Int(-90)));
        assert_eq!(normalize("+1.5 A"), Some(TelemetryValue::Float(1.5)));
    }

    #[test]
    fn test_word_values_keep_case() {
        assert_eq!(normalize("ON "), Some(TelemetryValue::Text("ON".into())));
        assert_eq!(normalize("N/A"), Some(TelemetryValue::Text("N/A".into())));
        assert_eq!(normalize("Idle"), Some(TelemetryValue::Text("Idle".into())));
    }

    #[test]
    fn test_unparsable_numeric_falls_back_to_string() {
        assert_eq!(normalize("1.2.3 V"), Some(TelemetryValue::Text("1.2.3".into())));
        assert_eq!(normalize("0x1F"), Some(TelemetryValue::Text("0x1F".into())));
    }

    #[test]
    fn test_empty_after_cleanup_is_none() {
        assert_eq!(normalize(""), None);
        assert_eq!(normalize("   "), None);
        assert_eq!(normalize("=>"), None);
        assert_eq!(normalize("==> "), None);
    }

    #[test]
    fn test_bytes_unit() {
        assert_eq!(normalize("4096 bytes"), Some(TelemetryValue::Int(4096)));
    }

    #[test]
    fn test_numeric_drops_thousands_separators() {
        assert_eq!(normalize_numeric("1,048,576"), Some(TelemetryValue::Int(1_048_576)));
        assert_eq!(normalize_numeric(",,"), None);
    }

    #[test]
    fn test_commas_are_kept_in_general_values() {
        assert_eq!(normalize("1,024"), Some(TelemetryValue::Text("1,024".into())));
    }

    #[test]
    fn test_never_panics_on_odd_input() {
        for raw in ["\u{0}", "ü", "=>ü V", ".", "-", "e", "9999999999999999999999"] {
            let _ = normalize(raw);
        }
        assert_eq!(
            normalize("9999999999999999999999"),
            Some(TelemetryValue::Text("9999999999999999999999".into()))
        );
    }
}
