//! # Satlog Ingest Library
//!
//! Turn satellite subsystem debug logs into structured telemetry records.
//!
//! This library provides the contextual line parser, the chunk processor
//! that splits new log text into telemetry frames, the id-range categorizer,
//! and the idempotent per-subsystem sinks the records are upserted into.

pub mod allow_list;
pub mod config;
pub mod error;
pub mod notifier;
pub mod parser;
pub mod pipeline;
pub mod sink;
pub mod source;
pub mod telemetry;
