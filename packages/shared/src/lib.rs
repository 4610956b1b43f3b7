// Shared types and utilities for the DID registry on CosmWasm

use chrono::{DateTime, SecondsFormat};
use cosmwasm_std::{StdError, StdResult, Timestamp};
use serde::de::IgnoredAny;

// Common helper functions

/// Render a block timestamp as ISO-8601 with millisecond precision, e.g.
/// `2019-10-23T01:30:00.000Z`.
pub fn iso8601(time: Timestamp) -> StdResult<String> {
    let secs = i64::try_from(time.seconds())
        .map_err(|_| StdError::generic_err("timestamp out of range"))?;
    let nanos = time.subsec_nanos() as u32;
    DateTime::from_timestamp(secs, nanos)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
        .ok_or_else(|| StdError::generic_err("timestamp out of range"))
}

/// Check that `text` holds exactly one well-formed JSON value.
///
/// Nothing is built from the text. Numbers are scanned, never converted, so
/// every JSON number form passes and no floating point reaches the wasm VM.
pub fn validate_json(text: &str) -> StdResult<()> {
    serde_json::from_str::<IgnoredAny>(text)
        .map(|_| ())
        .map_err(|err| StdError::parse_err("JSON document", err))
}
