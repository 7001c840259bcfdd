//! # Telemetry Module
//!
//! Telemetry record types and the subsystem categorizer.
//!
//! This module handles:
//! - The canonical `TelemetryRecord` and its natural key
//! - Typed measurement values
//! - Subsystem id ranges (EPS, OBC, UHF)
//! - Partitioning a record batch into per-subsystem buckets

pub mod categorizer;
pub mod record;
pub mod subsystem;

pub use categorizer::{categorize, Categorized};
pub use record::{RecordKey, TelemetryRecord, TelemetryValue};
pub use subsystem::Subsystem;
