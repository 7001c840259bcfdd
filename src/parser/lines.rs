//! # Line Parsers
//!
//! One parser per body-line shape, tried in a fixed priority order.
//!
//! | Rank | Shape | Example |
//! |------|-------|---------|
//! | 1 | Memory usage | `TOTAL: 1,048,576 bytes` |
//! | 2 | Radio (strict) | `up time:429` (radio ids only) |
//! | 3 | Converter voltage + current | `0 = [10.0] V [1.53] A` |
//! | 4 | Converter voltage | `2 = [5.02] V` |
//! | 5 | Battery temperature | `Btry temp [1] = [24.5] degC` |
//! | 6 | Port status | `CHNL[3V3] => PORT[2]=ON` |
//! | 7 | Aggregate battery | `Totl Btry reading = [7.4] V [-0.3] A` |
//! | 8 | Generic key/value | `Boot count = 17` |
//!
//! Every parser returns a [`ParseOutcome`]:
//! - `Ok(None)`: the line is not this shape, try the next one
//! - `Ok(Some(records))`: the line is claimed; `records` may be empty
//! - `Err(_)`: the line is this shape but malformed
//!
//! The radio parser claims every line of a radio-family frame, so strict
//! allow-listing is never bypassed by the generic fallback.

use regex::{Captures, Regex};
use std::sync::LazyLock;

use super::names::canonicalize;
use super::section::SectionContext;
use super::value::{normalize, normalize_numeric};
use crate::allow_list::{label_allowed, AllowListTable, AllowLists};
use crate::error::{IngestError, Result};
use crate::telemetry::{Subsystem, TelemetryRecord, TelemetryValue};

/// Result of offering one line to one parser.
pub type ParseOutcome = Result<Option<Vec<TelemetryRecord>>>;

/// Substring identifying the radio RSSI report line.
pub const RSSI_MARKER: &str = "RSSI value in dBm is";

/// Parameter name emitted for the RSSI report line.
pub const RSSI_PARAMETER: &str = "rssi_value_dbm";

/// Substring identifying the aggregate battery line.
pub const BATTERY_AGGREGATE_MARKER: &str = "Totl Btry reading";

/// Separators recognized by the radio parser, in priority order.
const RADIO_SEPARATORS: &[&str] = &[":", "=", "=>"];

/// Suffix dropped from memory parameter names in OBC reports.
const MEMORY_BYTES_SUFFIX: &str = "_memory_bytes";

fn pattern(re: &str) -> Regex {
    Regex::new(re).expect("Invalid regex pattern")
}

/// Section token → parameter name for one memory line pattern.
type SectionNames = &'static [(&'static str, &'static str)];

const TOTAL_BANK_NAMES: SectionNames = &[
    ("eram", "total_eram_memory_bytes"),
    ("eflash", "total_eflash_qspi_memory_bytes"),
    ("flash", "total_flash_fmc_memory_bytes"),
];

const USED_BANK_NAMES: SectionNames = &[
    ("eram", "used_eram_memory_bytes"),
    ("eflash", "used_eflash_qspi_memory_bytes"),
    ("flash", "used_flash_fmc_memory_bytes"),
];

const TOTAL_HEAP_NAMES: SectionNames = &[
    ("iram", "total_iram_heap_memory_bytes"),
    ("eram", "total_eram_heap_memory_bytes"),
];

const REMAINING_HEAP_NAMES: SectionNames = &[
    ("iram", "remaining_iram_heap_memory_bytes"),
    ("eram", "remaining_eram_heap_memory_bytes"),
];

struct MemoryPattern {
    regex: Regex,
    names: SectionNames,
}

static MEMORY_PATTERNS: LazyLock<Vec<MemoryPattern>> = LazyLock::new(|| {
    vec![
        MemoryPattern {
            regex: pattern(r"^TOTAL:\s*([\d,]+)\s*bytes"),
            names: TOTAL_BANK_NAMES,
        },
        MemoryPattern {
            regex: pattern(r"^USED\s*:\s*([\d,]+)\s*bytes"),
            names: USED_BANK_NAMES,
        },
        MemoryPattern {
            regex: pattern(r"^TOTAL\s*:\s*([\d,]+)\s*bytes"),
            names: TOTAL_HEAP_NAMES,
        },
        MemoryPattern {
            regex: pattern(r"^REMAINING\s*:\s*([\d,]+)\s*bytes"),
            names: REMAINING_HEAP_NAMES,
        },
    ]
});

static CONVERTER_DUAL_RE: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"^(\d+)\s*=\s*\[([^\]]+)\]\s*V\s*\[([^\]]+)\]\s*A"));

static CONVERTER_SINGLE_RE: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"^(\d+)\s*=\s*\[([^\]]+)\]\s*V"));

static BATTERY_TEMP_RE: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"(?i)Btry temp\s*\[(\d+)\]\s*=\s*\[?([\d.]+)\]?\s*degC"));

static PORT_STATUS_RE: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"^CHNL\[(.+?)\]\s*=>\s*PORT\[(\d+)\]=(\w+)"));

static BATTERY_AGGREGATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r"\[\s*([-+]?[\d.]+)\s*\]\s*V\s*\[\s*([-+]?[\d.]+)\s*\]\s*A")
});

/// Id-family variations between the device's report formats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserVariant {
    /// Leading digit of OBC ids; OBC memory names drop `_memory_bytes`
    pub obc_id_prefix: char,

    /// Leading digit of radio ids; these frames use the strict parser
    pub radio_id_prefix: char,

    /// Whether `TM Recv Local Date and Time:-` headers are tracked
    pub track_local_date_time: bool,
}

impl Default for ParserVariant {
    fn default() -> Self {
        Self {
            obc_id_prefix: '5',
            radio_id_prefix: '8',
            track_local_date_time: true,
        }
    }
}

/// Frame and section state a body line is parsed against.
#[derive(Debug, Clone, Copy)]
pub struct LineContext<'a> {
    pub id: u32,
    pub received_time: i64,
    pub local_date_time: Option<&'a str>,
    pub section: &'a SectionContext,
    pub processed_at: i64,
}

impl LineContext<'_> {
    fn record(
        &self,
        parameter: impl Into<String>,
        value: Option<TelemetryValue>,
    ) -> TelemetryRecord {
        TelemetryRecord {
            received_time: self.received_time,
            id: self.id,
            parameter: parameter.into(),
            value,
            processed_at: self.processed_at,
            local_date_time: self.local_date_time.map(str::to_string),
        }
    }

    fn id_starts_with(&self, prefix: char) -> bool {
        self.id.to_string().starts_with(prefix)
    }
}

/// Body-line shapes in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineShape {
    MemoryUsage,
    RadioStrict,
    ConverterDual,
    ConverterSingle,
    BatteryTemperature,
    PortStatus,
    BatteryAggregate,
    KeyValue,
}

impl LineShape {
    /// All shapes, highest priority first.
    pub const PRIORITY: [LineShape; 8] = [
        LineShape::MemoryUsage,
        LineShape::RadioStrict,
        LineShape::ConverterDual,
        LineShape::ConverterSingle,
        LineShape::BatteryTemperature,
        LineShape::PortStatus,
        LineShape::BatteryAggregate,
        LineShape::KeyValue,
    ];
}

/// The configured line parser family.
#[derive(Debug, Clone, Default)]
pub struct LineParser {
    variant: ParserVariant,
    radio_allow_list: AllowListTable,
}

impl LineParser {
    /// Creates a parser using the radio allow-list from `allow_lists`.
    pub fn new(variant: ParserVariant, allow_lists: &AllowLists) -> Self {
        Self {
            variant,
            radio_allow_list: allow_lists
                .table(Subsystem::Uhf)
                .cloned()
                .unwrap_or_default(),
        }
    }

    pub fn variant(&self) -> &ParserVariant {
        &self.variant
    }

    /// Offer a body line to every shape in priority order.
    ///
    /// Stops at the first shape that claims the line or reports it malformed.
    ///
    /// # Examples
    ///
    /// ```
    /// use satlog_ingest::parser::lines::{LineContext, LineParser};
    /// use satlog_ingest::parser::section::SectionContext;
    ///
    /// let parser = LineParser::default();
    /// let ctx = LineContext {
    ///     id: 210,
    ///     received_time: 1_695_700_000,
    ///     local_date_time: None,
    ///     section: &SectionContext::Mppt,
    ///     processed_at: 1_695_700_001,
    /// };
    ///
    /// let records = parser.parse_line("0 = [10.0] V [1.53] A", &ctx).unwrap().unwrap();
    /// assert_eq!(records[0].parameter, "mppt_conv_0_voltage");
    /// assert_eq!(records[1].parameter, "mppt_conv_0_current");
    /// ```
    pub fn parse_line(&self, line: &str, ctx: &LineContext<'_>) -> ParseOutcome {
        for shape in LineShape::PRIORITY {
            if let Some(records) = self.parse_shape(shape, line, ctx)? {
                return Ok(Some(records));
            }
        }
        Ok(None)
    }

    /// Offer a body line to a single shape.
    pub fn parse_shape(&self, shape: LineShape, line: &str, ctx: &LineContext<'_>) -> ParseOutcome {
        match shape {
            LineShape::MemoryUsage => self.parse_memory_usage(line, ctx),
            LineShape::RadioStrict => self.parse_radio(line, ctx),
            LineShape::ConverterDual => parse_converter_dual(line, ctx),
            LineShape::ConverterSingle => parse_converter_single(line, ctx),
            LineShape::BatteryTemperature => parse_battery_temperature(line, ctx),
            LineShape::PortStatus => parse_port_status(line, ctx),
            LineShape::BatteryAggregate => parse_battery_aggregate(line, ctx),
            LineShape::KeyValue => parse_key_value(line, ctx),
        }
    }

    fn parse_memory_usage(&self, line: &str, ctx: &LineContext<'_>) -> ParseOutcome {
        let section = ctx.section.as_str();

        for memory in MEMORY_PATTERNS.iter() {
            let Some(caps) = memory.regex.captures(line) else {
                continue;
            };
            let Some((_, name)) = memory.names.iter().find(|(s, _)| *s == section) else {
                continue;
            };

            let raw = group(&caps, 1, line)?;
            let parameter = if ctx.id_starts_with(self.variant.obc_id_prefix) {
                name.replace(MEMORY_BYTES_SUFFIX, "")
            } else {
                name.to_string()
            };
            return Ok(Some(vec![ctx.record(parameter, normalize_numeric(raw))]));
        }

        Ok(None)
    }

    fn parse_radio(&self, line: &str, ctx: &LineContext<'_>) -> ParseOutcome {
        if !ctx.id_starts_with(self.variant.radio_id_prefix) {
            return Ok(None);
        }
        let Some(allowed) = self.radio_allow_list.get(&ctx.id.to_string()) else {
            return Ok(Some(Vec::new()));
        };

        let split = RADIO_SEPARATORS.iter().find_map(|sep| line.split_once(sep));
        let record = match split {
            Some((label, value)) if label_allowed(allowed, label) => {
                Some(ctx.record(canonicalize(label), normalize(value)))
            }
            Some(_) => None,
            None if line.contains(RSSI_MARKER)
                && (allowed.contains("rssi") || allowed.contains(RSSI_PARAMETER)) =>
            {
                line.split_whitespace()
                    .last()
                    .map(|token| ctx.record(RSSI_PARAMETER, normalize(token)))
            }
            None => None,
        };

        Ok(Some(record.into_iter().collect()))
    }
}

fn group<'t>(caps: &Captures<'t>, index: usize, line: &str) -> Result<&'t str> {
    caps.get(index)
        .map(|m| m.as_str())
        .ok_or_else(|| IngestError::line_parse(line, format!("missing capture group {}", index)))
}

fn parse_converter_dual(line: &str, ctx: &LineContext<'_>) -> ParseOutcome {
    let Some(caps) = CONVERTER_DUAL_RE.captures(line) else {
        return Ok(None);
    };
    let index = group(&caps, 1, line)?;
    let voltage = group(&caps, 2, line)?;
    let current = group(&caps, 3, line)?;

    let prefix = if *ctx.section == SectionContext::Mppt {
        "mppt"
    } else {
        "panel"
    };

    Ok(Some(vec![
        ctx.record(format!("{}_conv_{}_voltage", prefix, index), normalize(voltage)),
        ctx.record(format!("{}_conv_{}_current", prefix, index), normalize(current)),
    ]))
}

fn parse_converter_single(line: &str, ctx: &LineContext<'_>) -> ParseOutcome {
    let Some(caps) = CONVERTER_SINGLE_RE.captures(line) else {
        return Ok(None);
    };
    let index = group(&caps, 1, line)?;
    let voltage = group(&caps, 2, line)?;

    let prefix = if *ctx.section == SectionContext::Mppt {
        "mppt"
    } else {
        "output"
    };

    Ok(Some(vec![ctx.record(
        format!("{}_conv_{}_voltage", prefix, index),
        normalize(voltage),
    )]))
}

fn parse_battery_temperature(line: &str, ctx: &LineContext<'_>) -> ParseOutcome {
    let Some(caps) = BATTERY_TEMP_RE.captures(line) else {
        return Ok(None);
    };
    let index = group(&caps, 1, line)?;
    let temperature = group(&caps, 2, line)?;

    Ok(Some(vec![ctx.record(
        format!("btry_temp_{}", index),
        normalize(temperature),
    )]))
}

fn parse_port_status(line: &str, ctx: &LineContext<'_>) -> ParseOutcome {
    let Some(caps) = PORT_STATUS_RE.captures(line) else {
        return Ok(None);
    };
    let channel = group(&caps, 1, line)?;
    let port = group(&caps, 2, line)?;
    let status = group(&caps, 3, line)?;

    Ok(Some(vec![ctx.record(
        format!("{}_port_{}_status", canonicalize(channel), port),
        Some(TelemetryValue::Text(status.trim().to_string())),
    )]))
}

fn parse_battery_aggregate(line: &str, ctx: &LineContext<'_>) -> ParseOutcome {
    if !line.contains(BATTERY_AGGREGATE_MARKER) {
        return Ok(None);
    }
    let Some(caps) = BATTERY_AGGREGATE_RE.captures(line) else {
        return Ok(None);
    };
    let voltage = group(&caps, 1, line)?;
    let current = group(&caps, 2, line)?;

    Ok(Some(vec![
        ctx.record("total_battery_voltage", normalize(voltage)),
        ctx.record("total_battery_current", normalize(current)),
    ]))
}

fn parse_key_value(line: &str, ctx: &LineContext<'_>) -> ParseOutcome {
    let Some((label, raw)) = line.split_once('=') else {
        return Ok(None);
    };
    let Some(value) = normalize(raw) else {
        return Ok(None);
    };

    let parameter = canonicalize(label);
    if parameter.is_empty() {
        return Err(IngestError::line_parse(line, "empty parameter name"));
    }

    Ok(Some(vec![ctx.record(parameter, Some(value))]))
}
