//! # Log Protocol Constants
//!
//! Marker strings and header patterns printed by the ground-station debug log.

use regex::Regex;
use std::sync::LazyLock;

/// Starts a new telemetry frame: `Received TM Id:- 210`
pub const TM_ID_MARKER: &str = "Received TM Id:-";

/// Frame receive time in epoch seconds: `TM Received Time:- 1695700000`
pub const TM_RECEIVED_TIME_MARKER: &str = "TM Received Time:-";

/// Frame local timestamp: `TM Recv Local Date and Time:- 2023-09-26 10:00:00`
pub const TM_LOCAL_DATE_TIME_MARKER: &str = "TM Recv Local Date and Time:-";

/// Lines containing any of these never reach the line parsers.
pub const METADATA_MARKERS: &[&str] = &[
    TM_ID_MARKER,
    TM_RECEIVED_TIME_MARKER,
    "TM Recv Local Date",
    "Encryption",
];

/// Section divider run, e.g. `====== UHF ======`
pub const SECTION_DIVIDER: &str = "======";

pub(crate) static TM_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Received TM Id:-\s*(\d+)").expect("Invalid regex pattern"));

pub(crate) static TM_RECEIVED_TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"TM Received Time:-\s*(\d+)").expect("Invalid regex pattern"));

pub(crate) static TM_LOCAL_DATE_TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"TM Recv Local Date and Time:-\s*(\d{4}-\d{1,2}-\d{1,2}\s+\d{1,2}:\d{1,2}:\d{1,2})",
    )
    .expect("Invalid regex pattern")
});

/// Returns true if the line carries one of the metadata markers.
pub fn is_metadata_line(line: &str) -> bool {
    METADATA_MARKERS.iter().any(|marker| line.contains(marker))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tm_id_pattern() {
        let caps = TM_ID_RE.captures("  Received TM Id:- 210").unwrap();
        assert_eq!(&caps[1], "210");
        assert!(TM_ID_RE.captures("Received TM Id:- abc").is_none());
    }

    #[test]
    fn test_received_time_pattern() {
        let caps = TM_RECEIVED_TIME_RE
            .captures("TM Received Time:-1695700000")
            .unwrap();
        assert_eq!(&caps[1], "1695700000");
    }

    #[test]
    fn test_local_date_time_pattern() {
        let caps = TM_LOCAL_DATE_TIME_RE
            .captures("TM Recv Local Date and Time:- 2023-9-26  7:05:09 IST")
            .unwrap();
        assert_eq!(&caps[1], "2023-9-26  7:05:09");
    }

    #[test]
    fn test_metadata_lines() {
        assert!(is_metadata_line("Encryption: disabled"));
        assert!(is_metadata_line("TM Recv Local Date and Time:- garbage"));
        assert!(!is_metadata_line("up time:429"));
    }
}
