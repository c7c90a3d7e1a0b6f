//! Order-store timestamps and their normalization to Unix epoch seconds.

use chrono::DateTime;
use serde::{Deserialize, Serialize};

/// Earliest instant the document store can represent (0001-01-01T00:00:00Z).
pub const MIN_STORE_SECONDS: i64 = -62_135_596_800;

/// Latest whole second the document store can represent (9999-12-31T23:59:59Z).
pub const MAX_STORE_SECONDS: i64 = 253_402_300_799;

const NANOS_PER_SECOND: i32 = 1_000_000_000;

/// Errors raised when a stored timestamp cannot be normalized.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum TimestampError {
    /// The record has no timestamp field.
    #[error("timestamp is missing")]
    Missing,
    /// The timestamp text could not be parsed.
    #[error("timestamp is malformed: {0}")]
    Malformed(String),
    /// The stored field is not a temporal value.
    #[error("timestamp has unsupported type '{0}'")]
    UnsupportedType(String),
    /// The instant lies outside the range the store can represent.
    #[error("timestamp is out of range ({seconds}s, {nanos}ns)")]
    OutOfRange {
        /// Seconds component as stored.
        seconds: i64,
        /// Nanoseconds component as stored.
        nanos: i32,
    },
}

/// A timestamp exactly as it was read from the order store.
///
/// The store hands timestamps back in different shapes depending on the
/// access path: the native seconds/nanos pair or RFC 3339 text. Values that are
/// absent or of a non-temporal type are kept rather than rejected, so that the
/// fault can be reported against the single order that carries it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreTimestamp {
    /// Native seconds/nanos pair.
    Parts {
        /// Whole seconds since the Unix epoch.
        seconds: i64,
        /// Non-negative fraction of a second, `0..1_000_000_000`.
        nanos: i32,
    },
    /// RFC 3339 text, e.g. `2023-01-01T00:00:00.123456Z`.
    Rfc3339(String),
    /// The field was not present on the record.
    Missing,
    /// The field held a value of another type (the store's type name).
    Unsupported(String),
}

impl StoreTimestamp {
    /// Normalize to whole-second Unix epoch time.
    ///
    /// Sub-second precision is floored, so the result is the epoch second the
    /// instant falls in. The conversion is deterministic: the same stored value
    /// always yields the same number.
    ///
    /// # Errors
    ///
    /// Returns [`TimestampError`] if the value is missing, malformed, of an
    /// unsupported type, or outside the store's representable range.
    pub fn to_epoch_seconds(&self) -> Result<i64, TimestampError> {
        match self {
            Self::Parts { seconds, nanos } => {
                if !(0..NANOS_PER_SECOND).contains(nanos)
                    || !(MIN_STORE_SECONDS..=MAX_STORE_SECONDS).contains(seconds)
                {
                    return Err(TimestampError::OutOfRange {
                        seconds: *seconds,
                        nanos: *nanos,
                    });
                }
                Ok(*seconds)
            }
            Self::Rfc3339(text) => {
                let parsed = DateTime::parse_from_rfc3339(text)
                    .map_err(|e| TimestampError::Malformed(format!("{text:?}: {e}")))?;
                let seconds = parsed.timestamp();
                if !(MIN_STORE_SECONDS..=MAX_STORE_SECONDS).contains(&seconds) {
                    #[allow(clippy::cast_possible_wrap)]
                    let nanos = parsed.timestamp_subsec_nanos() as i32;
                    return Err(TimestampError::OutOfRange { seconds, nanos });
                }
                Ok(seconds)
            }
            Self::Missing => Err(TimestampError::Missing),
            Self::Unsupported(kind) => Err(TimestampError::UnsupportedType(kind.clone())),
        }
    }
}
