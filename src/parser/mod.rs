//! # Parser Module
//!
//! Contextual line parser for the satellite debug log.
//!
//! This module handles:
//! - Splitting new log text into telemetry frames (`Received TM Id:-` blocks)
//! - Tracking the section header that disambiguates identical line shapes
//! - Parsing body lines into zero, one or several telemetry records
//! - Normalizing raw value tokens and parameter labels

pub mod chunk;
pub mod lines;
pub mod names;
pub mod protocol;
pub mod section;
pub mod value;

pub use chunk::{ChunkOutput, ChunkProcessor, FrameHeader, ParserState};
pub use lines::{LineContext, LineParser, LineShape, ParserVariant};
pub use section::{SectionContext, SectionTracker};
