//! Conversions from raw JTL field values to their canonical typed form.
//!
//! Every codec treats an absent value and an empty string the same way: the
//! field's default. Only content that is present and unparseable is an error.

use crate::error::{Error, Result};
use crate::models::ResponseHeaders;
use chrono::{DateTime, TimeDelta, Utc};
use log::warn;
use std::collections::HashMap;

/// The literal JMeter writes for a set boolean flag.
pub const TRUE_LITERAL: &str = "true";

/// Separators for the `cookies` element: `name=value; name=value`.
pub const COOKIE_PAIR_SEP: &str = "=";
pub const COOKIE_LINE_SEP: &str = "; ";

/// Separators for request/response header blocks: one `Key: Value` per line.
pub const HEADER_PAIR_SEP: &str = ": ";
pub const HEADER_LINE_SEP: &str = "\n";

/// Exact, case-sensitive match against `true_literal`.
pub fn parse_bool_literal(raw: Option<&str>, true_literal: &str) -> bool {
    raw == Some(true_literal)
}

/// Parse a signed integer field, defaulting to `0` when absent or blank.
pub fn parse_int(raw: Option<&str>, field: &str) -> Result<i64> {
    parse_int_or(raw, 0, field)
}

fn parse_int_or(raw: Option<&str>, default: i64, field: &str) -> Result<i64> {
    match raw.map(str::trim) {
        None | Some("") => Ok(default),
        Some(value) => value.parse::<i64>().map_err(|_| {
            Error::malformed(format!("field '{}' is not an integer: {:?}", field, value))
        }),
    }
}

/// Parse an integer count of milliseconds, using `default` milliseconds when
/// the value is absent or blank.
///
/// JMeter sometimes writes an empty `IdleTime` column instead of `0`.
/// Negative values are kept as they are.
pub fn parse_duration_ms(raw: Option<&str>, default: i64, field: &str) -> Result<TimeDelta> {
    let millis = parse_int_or(raw, default, field)?;
    TimeDelta::try_milliseconds(millis)
        .ok_or_else(|| Error::malformed(format!("field '{}' is out of range: {}", field, millis)))
}

/// Parse milliseconds since the Unix epoch into a UTC instant, keeping
/// millisecond precision. `default` is used when the value is absent or blank.
pub fn parse_instant_ms_epoch(
    raw: Option<&str>,
    default: i64,
    field: &str,
) -> Result<DateTime<Utc>> {
    let millis = parse_int_or(raw, default, field)?;
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| Error::malformed(format!("field '{}' is out of range: {}", field, millis)))
}

/// Split `raw` into pieces on `line_sep`, then each piece on the first
/// `pair_sep`. Empty pieces are skipped. A piece with no separator maps its
/// whole text to an empty value.
pub fn parse_kv_block(raw: &str, pair_sep: &str, line_sep: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();

    for piece in raw.split(line_sep) {
        let piece = piece.strip_suffix('\r').unwrap_or(piece);
        if piece.is_empty() {
            continue;
        }

        match piece.split_once(pair_sep) {
            Some((key, value)) => {
                map.insert(key.to_string(), value.to_string());
            }
            None => {
                warn!("key/value piece without '{}' separator: {:?}", pair_sep, piece);
                map.insert(piece.to_string(), String::new());
            }
        }
    }

    map
}

/// Split a response header block into its status line and the remaining
/// header lines.
pub fn split_status_and_headers(raw: &str) -> (&str, &str) {
    match raw.split_once('\n') {
        Some((status, rest)) => (status.strip_suffix('\r').unwrap_or(status), rest),
        None => (raw, ""),
    }
}

pub fn parse_cookies(raw: &str) -> HashMap<String, String> {
    parse_kv_block(raw, COOKIE_PAIR_SEP, COOKIE_LINE_SEP)
}

pub fn parse_headers(raw: &str) -> HashMap<String, String> {
    parse_kv_block(raw, HEADER_PAIR_SEP, HEADER_LINE_SEP)
}

pub fn parse_response_headers(raw: &str) -> ResponseHeaders {
    let (status_line, block) = split_status_and_headers(raw);
    ResponseHeaders {
        status_line: status_line.to_string(),
        headers: parse_headers(block),
    }
}
