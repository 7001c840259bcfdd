//! # Subsystem Families
//!
//! The three onboard subsystems and the telemetry id range each one owns.

use std::fmt;
use std::ops::RangeInclusive;

/// EPS (electrical power system) telemetry ids
pub const EPS_ID_RANGE: RangeInclusive<u32> = 200..=300;

/// OBC (onboard computer) telemetry ids
pub const OBC_ID_RANGE: RangeInclusive<u32> = 500..=650;

/// UHF radio telemetry ids
pub const UHF_ID_RANGE: RangeInclusive<u32> = 800..=900;

/// A subsystem family, distinguished by a disjoint telemetry id range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Subsystem {
    Eps,
    Obc,
    Uhf,
}

impl Subsystem {
    /// All subsystems in categorization order.
    pub const ALL: [Subsystem; 3] = [Subsystem::Eps, Subsystem::Obc, Subsystem::Uhf];

    /// Short name used for allow-list files and log output.
    pub fn name(self) -> &'static str {
        match self {
            Subsystem::Eps => "eps",
            Subsystem::Obc => "obc",
            Subsystem::Uhf => "uhf",
        }
    }

    /// Name of the store collection (table) holding this subsystem's records.
    pub fn collection(self) -> &'static str {
        match self {
            Subsystem::Eps => "eps_telemetry",
            Subsystem::Obc => "obc_telemetry",
            Subsystem::Uhf => "uhf_telemetry",
        }
    }

    /// Inclusive id range owned by this subsystem.
    pub fn id_range(self) -> RangeInclusive<u32> {
        match self {
            Subsystem::Eps => EPS_ID_RANGE,
            Subsystem::Obc => OBC_ID_RANGE,
            Subsystem::Uhf => UHF_ID_RANGE,
        }
    }

    /// Find the subsystem owning a telemetry id.
    ///
    /// # Examples
    ///
    /// ```
    /// use satlog_ingest::telemetry::Subsystem;
    ///
    /// assert_eq!(Subsystem::for_id(210), Some(Subsystem::Eps));
    /// assert_eq!(Subsystem::for_id(999), None);
    /// ```
    pub fn for_id(id: u32) -> Option<Subsystem> {
        Self::ALL.into_iter().find(|s| s.id_range().contains(&id))
    }
}

impl fmt::Display for Subsystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_boundaries_are_inclusive() {
        assert_eq!(Subsystem::for_id(200), Some(Subsystem::Eps));
        assert_eq!(Subsystem::for_id(300), Some(Subsystem::Eps));
        assert_eq!(Subsystem::for_id(500), Some(Subsystem::Obc));
        assert_eq!(Subsystem::for_id(650), Some(Subsystem::Obc));
        assert_eq!(Subsystem::for_id(800), Some(Subsystem::Uhf));
        assert_eq!(Subsystem::for_id(900), Some(Subsystem::Uhf));
    }

    #[test]
    fn test_gaps_between_ranges_have_no_owner() {
        for id in [0, 199, 301, 499, 651, 799, 901, 999] {
            assert_eq!(Subsystem::for_id(id), None, "id {} should be unowned", id);
        }
    }

    #[test]
    fn test_ranges_are_disjoint() {
        for a in Subsystem::ALL {
            for b in Subsystem::ALL {
                if a != b {
                    let (ra, rb) = (a.id_range(), b.id_range());
                    assert!(ra.end() < rb.start() || rb.end() < ra.start());
                }
            }
        }
    }

    #[test]
    fn test_names_and_collections() {
        assert_eq!(Subsystem::Eps.name(), "eps");
        assert_eq!(Subsystem::Obc.collection(), "obc_telemetry");
        assert_eq!(Subsystem::Uhf.to_string(), "uhf");
    }
}
