//! Identity and timestamps shared by every entity.
//!
//! A [`BaseModel`] is created either fresh (new id, both timestamps set to now) or from a
//! previously serialized representation, in which case the stored id and timestamps win.
//! Attributes that are not part of an entity's schema travel in [`BaseModel::extra`] so
//! that a representation survives a round-trip through the file backend unchanged.

use crate::errors::{Error, Result};
use chrono::{DateTime, NaiveDateTime, Timelike, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer, ser::SerializeMap};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Format used when rendering timestamps into a representation.
pub const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// Identity and bookkeeping fields of an entity.
#[derive(Debug, Clone, PartialEq)]
pub struct BaseModel {
    /// Opaque identifier, unique across every entity kind
    pub id: String,
    /// Set once when the entity is first constructed
    pub created_at: NaiveDateTime,
    /// Refreshed every time the entity is persisted
    pub updated_at: NaiveDateTime,
    /// Attributes outside the typed schema of the entity
    pub extra: Map<String, Value>,
}

impl BaseModel {
    /// Creates a fresh identity with both timestamps set to the current instant.
    #[must_use]
    pub fn new() -> Self {
        let now = now();
        Self {
            id: Uuid::new_v4().to_string(),
            created_at: now,
            updated_at: now,
            extra: Map::new(),
        }
    }

    /// Refreshes `updated_at`.
    pub fn touch(&mut self) {
        self.updated_at = now();
    }
}

impl Default for BaseModel {
    fn default() -> Self {
        Self::new()
    }
}

// A bare BaseModel has no typed fields of its own; identity and extras are rendered by
// `models::to_representation`, so serde only ever sees an empty map here.
impl Serialize for BaseModel {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_map(Some(0))?.end()
    }
}

impl<'de> Deserialize<'de> for BaseModel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        serde::de::IgnoredAny::deserialize(deserializer)?;
        Ok(Self::new())
    }
}

/// Current UTC instant with microsecond precision, the finest precision a representation keeps.
#[must_use]
pub fn now() -> NaiveDateTime {
    let now = Utc::now().naive_utc();
    now.with_nanosecond(now.nanosecond() / 1_000 * 1_000)
        .unwrap_or(now)
}

/// Renders a timestamp the way it is stored in a representation.
#[must_use]
pub fn format_timestamp(timestamp: &NaiveDateTime) -> String {
    timestamp.format(TIME_FORMAT).to_string()
}

/// Parses an ISO-8601 date-time, with or without fractional seconds or offset.
///
/// # Errors
/// Returns [`Error::Parse`] when the string is not a valid ISO-8601 date-time.
pub fn parse_timestamp(value: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f"))
        .or_else(|_| DateTime::parse_from_rfc3339(value).map(|dt| dt.naive_utc()))
        .map_err(|e| Error::Parse {
            message: format!("invalid ISO-8601 timestamp {value:?}: {e}"),
        })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use chrono::Datelike;

    #[test]
    fn test_new_assigns_unique_ids() {
        let a = BaseModel::new();
        let b = BaseModel::new();
        assert_ne!(a.id, b.id);
        assert_eq!(a.created_at, a.updated_at);
        assert!(a.extra.is_empty());
    }

    #[test]
    fn test_touch_moves_updated_at_forward() {
        let mut base = BaseModel::new();
        let created = base.created_at;
        std::thread::sleep(std::time::Duration::from_millis(2));
        base.touch();
        assert_eq!(base.created_at, created);
        assert!(base.updated_at > created);
    }

    #[test]
    fn test_timestamp_format_round_trip() -> Result<()> {
        let stamp = now();
        let rendered = format_timestamp(&stamp);
        assert_eq!(parse_timestamp(&rendered)?, stamp);
        Ok(())
    }

    #[test]
    fn test_parse_timestamp_accepts_python_isoformat() -> Result<()> {
        let parsed = parse_timestamp("2017-09-28T21:05:54.119427")?;
        assert_eq!(parsed.year(), 2017);
        assert_eq!(parsed.second(), 54);
        assert_eq!(parsed.nanosecond(), 119_427_000);

        let spaced = parse_timestamp("2017-09-28 21:05:54.119427")?;
        assert_eq!(spaced, parsed);
        Ok(())
    }

    #[test]
    fn test_parse_timestamp_accepts_offset() -> Result<()> {
        let parsed = parse_timestamp("2017-09-28T23:05:54.5+02:00")?;
        assert_eq!(parsed.hour(), 21);
        Ok(())
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        let result = parse_timestamp("yesterday at noon");
        assert!(matches!(result.unwrap_err(), Error::Parse { message: _ }));
    }
}
