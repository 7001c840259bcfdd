//! # Parameter Name Canonicalizer

/// Map a raw label to a stable snake-case identifier.
///
/// Lower-cases, replaces every run of characters outside `[a-z0-9_]` with a
/// single underscore, collapses repeated underscores and trims underscores at
/// both ends. Idempotent.
///
/// # Examples
///
/// ```
/// use satlog_ingest::parser::names::canonicalize;
///
/// assert_eq!(canonicalize("Base   Frequency!!"), "base_frequency");
/// assert_eq!(canonicalize(&canonicalize("Up Time")), "up_time");
/// ```
pub fn canonicalize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());

    for c in raw.trim().to_lowercase().chars() {
        let c = if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' {
            c
        } else {
            '_'
        };
        if c == '_' && (out.is_empty() || out.ends_with('_')) {
            continue;
        }
        out.push(c);
    }

    while out.ends_with('_') {
        out.pop();
    }
    out
}
