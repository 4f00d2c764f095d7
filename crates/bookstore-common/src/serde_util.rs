//! Serde helpers shared by the request and response models.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serializer};

/// `2024-03-01T09:30:00.250000Z`: UTC, microsecond precision, `Z` suffix.
///
/// Documents rendered by Postgres use the same shape, so every timestamp in the
/// API reads alike whether it came from a typed row or a JSON document.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// `serialize_with` adapter for [`format_timestamp`].
pub fn timestamp<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_timestamp(ts))
}

/// `deserialize_with` for `Option<Option<T>>` patch fields.
///
/// Pair with `#[serde(default)]`: a missing key stays `None`, an explicit
/// `null` becomes `Some(None)` and clears the column.
pub fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
