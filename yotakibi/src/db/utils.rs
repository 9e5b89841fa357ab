// SPDX-License-Identifier: AGPL-3.0-or-later

//! Helpers to move values in and out of SQL text columns.
use chrono::{NaiveDateTime, Timelike};

/// Fixed-width format of all timestamps, lexical order equals chronological order.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// Formats a timestamp for storage.
pub fn encode_timestamp(timestamp: &NaiveDateTime) -> String {
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}

/// Parses a stored timestamp.
pub fn decode_timestamp(value: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
}

/// Drops the sub-microsecond part of a timestamp, which storage does not keep.
pub fn truncate_to_micros(timestamp: NaiveDateTime) -> NaiveDateTime {
    let nanos = timestamp.nanosecond();
    timestamp
        .with_nanosecond(nanos - nanos % 1_000)
        .unwrap_or(timestamp)
}

/// Escapes `LIKE` wildcards, to be used with `ESCAPE '\'`.
pub fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for char in text.chars() {
        if matches!(char, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(char);
    }
    escaped
}

/// Returns a `LIKE` pattern matching every text containing `text`.
pub fn contains_pattern(text: &str) -> String {
    format!("%{}%", escape_like(text))
}
