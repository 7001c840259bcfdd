//! # Chunk Processor
//!
//! Splits newly read log text into telemetry frames and drives the section
//! tracker and line parsers over every body line.
//!
//! The processor itself holds no mutable state: the active frame header and
//! section context travel in a [`ParserState`] passed in and handed back, so
//! the same input and state always produce the same records.

use chrono::Utc;
use tracing::{debug, warn};

use super::lines::{LineContext, LineParser};
use super::protocol::{
    is_metadata_line, TM_ID_MARKER, TM_ID_RE, TM_LOCAL_DATE_TIME_MARKER, TM_LOCAL_DATE_TIME_RE,
    TM_RECEIVED_TIME_MARKER, TM_RECEIVED_TIME_RE,
};
use super::section::{SectionContext, SectionTracker};
use crate::telemetry::TelemetryRecord;

/// Header fields of the active telemetry frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameHeader {
    /// Telemetry message id
    pub id: u32,
    /// Epoch seconds from `TM Received Time:-`, if seen
    pub received_time: Option<i64>,
    /// Timestamp from `TM Recv Local Date and Time:-`, if seen
    pub local_date_time: Option<String>,
}

impl FrameHeader {
    pub fn new(id: u32) -> Self {
        Self {
            id,
            received_time: None,
            local_date_time: None,
        }
    }
}

/// Running transducer state between lines and between chunks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParserState {
    /// Active frame; `None` until the first `Received TM Id:-` header
    pub frame: Option<FrameHeader>,
    /// Section context, kept across frame boundaries
    pub section: SectionTracker,
}

impl ParserState {
    /// Keep only the section context, dropping any active frame.
    pub fn carry_section(&self) -> Self {
        Self {
            frame: None,
            section: self.section.clone(),
        }
    }

    /// Current section context.
    pub fn section(&self) -> &SectionContext {
        self.section.current()
    }
}

/// Result of processing one chunk of text.
#[derive(Debug, Clone, Default)]
pub struct ChunkOutput {
    /// State after the last line of the chunk
    pub state: ParserState,
    /// Records in line order
    pub records: Vec<TelemetryRecord>,
    /// Non-blank lines seen
    pub lines: usize,
    /// Lines dropped because a parser reported them malformed
    pub errors: usize,
}

/// Turns log text into telemetry records.
#[derive(Debug, Clone, Default)]
pub struct ChunkProcessor {
    parser: LineParser,
}

impl ChunkProcessor {
    pub fn new(parser: LineParser) -> Self {
        Self { parser }
    }

    /// Process a chunk using the current time as `processed_at`.
    pub fn process(&self, state: ParserState, text: &str) -> ChunkOutput {
        self.process_at(state, text, Utc::now().timestamp())
    }

    /// Process a chunk with an explicit processing time.
    ///
    /// `now` is also the receive time of frames that never printed a
    /// `TM Received Time:-` header.
    ///
    /// # Examples
    ///
    /// ```
    /// use satlog_ingest::parser::chunk::{ChunkProcessor, ParserState};
    ///
    /// let text = "Conv MPPT reading\n\
    ///             Received TM Id:- 210\n\
    ///             TM Received Time:- 1695700000\n\
    ///             0 = [10.0] V [1.53] A\n";
    ///
    /// let out = ChunkProcessor::default().process_at(ParserState::default(), text, 1_695_700_100);
    /// assert_eq!(out.records.len(), 2);
    /// assert_eq!(out.records[0].received_time, 1_695_700_000);
    /// assert_eq!(out.records[0].parameter, "mppt_conv_0_voltage");
    /// ```
    pub fn process_at(&self, mut state: ParserState, text: &str, now: i64) -> ChunkOutput {
        let mut records = Vec::new();
        let mut lines = 0;
        let mut errors = 0;

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            lines += 1;

            if self.consume_header(&mut state, line) {
                continue;
            }
            if is_metadata_line(line) {
                debug!("Skipping metadata line: {}", line);
                continue;
            }
            if state.section.update(line) {
                debug!("Section context: {}", state.section());
                continue;
            }

            let Some(frame) = state.frame.as_ref() else {
                continue;
            };

            let ctx = LineContext {
                id: frame.id,
                received_time: frame.received_time.unwrap_or(now),
                local_date_time: frame.local_date_time.as_deref(),
                section: state.section.current(),
                processed_at: now,
            };

            match self.parser.parse_line(line, &ctx) {
                Ok(Some(parsed)) => {
                    if !parsed.is_empty() {
                        debug!("Parsed {} record(s) from: {}", parsed.len(), line);
                    }
                    records.extend(parsed);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!("Dropping line for TM id {}: {}", frame.id, e);
                    errors += 1;
                }
            }
        }

        ChunkOutput {
            state,
            records,
            lines,
            errors,
        }
    }

    /// Apply a frame header line to the state; returns true if consumed.
    fn consume_header(&self, state: &mut ParserState, line: &str) -> bool {
        if line.contains(TM_ID_MARKER) {
            let Some(caps) = TM_ID_RE.captures(line) else {
                return false;
            };
            return match caps[1].parse::<u32>() {
                Ok(id) => {
                    debug!("Found TM id: {}", id);
                    state.frame = Some(FrameHeader::new(id));
                    true
                }
                Err(e) => {
                    warn!("Invalid TM id in '{}': {}", line, e);
                    state.frame = None;
                    true
                }
            };
        }

        if line.contains(TM_RECEIVED_TIME_MARKER) {
            let Some(caps) = TM_RECEIVED_TIME_RE.captures(line) else {
                return false;
            };
            let received_time = caps[1].parse::<i64>().ok();
            if received_time.is_none() {
                warn!("Unparsable TM received time in '{}', using current time", line);
            }
            if let Some(frame) = state.frame.as_mut() {
                debug!("Found TM time: {:?}", received_time);
                frame.received_time = received_time;
            }
            return true;
        }

        if self.parser.variant().track_local_date_time && line.contains(TM_LOCAL_DATE_TIME_MARKER) {
            let Some(caps) = TM_LOCAL_DATE_TIME_RE.captures(line) else {
                return false;
            };
            if let Some(frame) = state.frame.as_mut() {
                debug!("Found local date time: {}", &caps[1]);
                frame.local_date_time = Some(caps[1].to_string());
            }
            return true;
        }

        false
    }
}
