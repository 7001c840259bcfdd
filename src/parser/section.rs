//! # Section Context Tracker
//!
//! The device prints a section header (`ERAM MEMORY`, `Conv MPPT reading`,
//! `====== UHF ======`) and then any number of lines or whole frames that
//! belong to it. Identical line shapes mean different things depending on
//! the last header seen, so the tracker remembers it across frame boundaries
//! until another header overwrites it.

use std::fmt;

use super::protocol::SECTION_DIVIDER;

/// Physical subsystem section the following lines belong to.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SectionContext {
    /// No header seen yet
    #[default]
    None,
    Eram,
    Eflash,
    Flash,
    Iram,
    Mppt,
    Panel,
    Output,
    /// Free-form token taken from a `======` divider
    Other(String),
}

/// Header substrings and the section token they select, in match order.
const SECTION_HEADERS: &[(&str, &str)] = &[
    ("ERAM MEMORY", "eram"),
    ("EFLASH QSPI MEMORY", "eflash"),
    ("FLASH FMC MEMORY", "flash"),
    ("IRAM HEAP MEMORY", "iram"),
    ("ERAM HEAP MEMORY", "eram"),
    ("Conv MPPT reading", "mppt"),
    ("Panel reading", "panel"),
    ("O/P Conv Volt", "output"),
];

impl SectionContext {
    /// Build a context from a lowercase token.
    ///
    /// Known names map onto their variant so that a divider such as
    /// `====== MPPT ======` behaves exactly like `Conv MPPT reading`.
    pub fn from_token(token: &str) -> Self {
        match token {
            "" => SectionContext::None,
            "eram" => SectionContext::Eram,
            "eflash" => SectionContext::Eflash,
            "flash" => SectionContext::Flash,
            "iram" => SectionContext::Iram,
            "mppt" => SectionContext::Mppt,
            "panel" => SectionContext::Panel,
            "output" => SectionContext::Output,
            other => SectionContext::Other(other.to_string()),
        }
    }

    /// Lowercase token for this context (`""` for [`SectionContext::None`]).
    pub fn as_str(&self) -> &str {
        match self {
            SectionContext::None => "",
            SectionContext::Eram => "eram",
            SectionContext::Eflash => "eflash",
            SectionContext::Flash => "flash",
            SectionContext::Iram => "iram",
            SectionContext::Mppt => "mppt",
            SectionContext::Panel => "panel",
            SectionContext::Output => "output",
            SectionContext::Other(token) => token,
        }
    }
}

impl fmt::Display for SectionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SectionContext::None => f.write_str("none"),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Detect a section header line.
///
/// Returns the new context, or `None` if the line is not a header. Divider
/// lines are checked first; their payload (all `=` and whitespace removed,
/// lowercased) becomes the context verbatim.
///
/// # Examples
///
/// ```
/// use satlog_ingest::parser::section::{detect_section, SectionContext};
///
/// assert_eq!(detect_section("---- Conv MPPT reading ----"), Some(SectionContext::Mppt));
/// assert_eq!(
///     detect_section("====== UHF Beacon ======"),
///     Some(SectionContext::Other("uhfbeacon".into()))
/// );
/// assert_eq!(detect_section("0 = [10.0] V"), None);
/// ```
pub fn detect_section(line: &str) -> Option<SectionContext> {
    if line.contains(SECTION_DIVIDER) {
        let token: String = line
            .chars()
            .filter(|c| *c != '=' && !c.is_whitespace())
            .collect::<String>()
            .to_lowercase();
        return Some(SectionContext::from_token(&token));
    }

    SECTION_HEADERS
        .iter()
        .find(|(marker, _)| line.contains(marker))
        .map(|(_, token)| SectionContext::from_token(token))
}

/// Holds the current section context for a log stream position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionTracker {
    current: SectionContext,
}

impl SectionTracker {
    /// Creates a tracker with no section.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one line; returns true if it was a section header.
    ///
    /// Non-header lines leave the context unchanged.
    pub fn update(&mut self, line: &str) -> bool {
        match detect_section(line) {
            Some(context) => {
                self.current = context;
                true
            }
            None => false,
        }
    }

    /// The active section context.
    pub fn current(&self) -> &SectionContext {
        &self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_headers() {
        assert_eq!(detect_section("***** ERAM MEMORY *****"), Some(SectionContext::Eram));
        assert_eq!(detect_section("EFLASH QSPI MEMORY"), Some(SectionContext::Eflash));
        assert_eq!(detect_section("FLASH FMC MEMORY usage"), Some(SectionContext::Flash));
        assert_eq!(detect_section("IRAM HEAP MEMORY"), Some(SectionContext::Iram));
        assert_eq!(detect_section("ERAM HEAP MEMORY"), Some(SectionContext::Eram));
    }

    #[test]
    fn test_converter_headers() {
        assert_eq!(detect_section("Conv MPPT reading:"), Some(SectionContext::Mppt));
        assert_eq!(detect_section("Panel reading:"), Some(SectionContext::Panel));
        assert_eq!(detect_section("O/P Conv Volt:"), Some(SectionContext::Output));
    }

    #[test]
    fn test_divider_checked_before_named_headers() {
        assert_eq!(
            detect_section("====== ERAM MEMORY ======"),
            Some(SectionContext::Other("erammemory".into()))
        );
    }

    #[test]
    fn test_divider_with_known_token() {
        assert_eq!(detect_section("======== MPPT ========"), Some(SectionContext::Mppt));
    }

    #[test]
    fn test_empty_divider_clears_context() {
        assert_eq!(detect_section("=================="), Some(SectionContext::None));
    }

    #[test]
    fn test_short_equals_run_is_not_a_divider() {
        assert_eq!(detect_section("a == b"), None);
    }

    #[test]
    fn test_tracker_keeps_context_until_overwritten() {
        let mut tracker = SectionTracker::new();
        assert_eq!(tracker.current(), &SectionContext::None);

        assert!(tracker.update("Conv MPPT reading"));
        assert!(!tracker.update("0 = [10.0] V [1.53] A"));
        assert!(!tracker.update("Received TM Id:- 211"));
        assert_eq!(tracker.current(), &SectionContext::Mppt);

        assert!(tracker.update("Panel reading"));
        assert_eq!(tracker.current(), &SectionContext::Panel);
    }

    #[test]
    fn test_display() {
        assert_eq!(SectionContext::None.to_string(), "none");
        assert_eq!(SectionContext::Other("uhf".into()).to_string(), "uhf");
        assert_eq!(SectionContext::Iram.to_string(), "iram");
    }
}
