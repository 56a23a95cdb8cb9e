//! The persisted LED state record and its on-disk schema.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use utoipa::ToSchema;

use crate::validate::{is_hex_color, LED_MAX};

/// Color of a freshly initialized record.
pub const DEFAULT_COLOR: &str = "#ff0000";

/// LED count of a freshly initialized record.
pub const DEFAULT_COUNT: u8 = 0;

/// Revision of a freshly initialized record.
pub const INITIAL_REV: u64 = 1;

/// Current LED state shared between the front-end and polling devices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StateRecord {
    /// LED color as `#RRGGBB`, case preserved from the last write
    #[schema(example = "#ff0000")]
    pub color: String,
    /// Number of lit LEDs, 0 to 8
    #[schema(minimum = 0, maximum = 8)]
    pub count: u8,
    /// Revision, bumped by one on every successful write
    #[schema(minimum = 1)]
    pub rev: u64,
    /// Time of creation or of the last successful write (UTC)
    #[serde(with = "time::serde::rfc3339")]
    #[schema(value_type = String, format = DateTime)]
    pub updated_at: OffsetDateTime,
}

impl StateRecord {
    /// The record a new or reinitialized store starts from.
    pub fn initial(now: OffsetDateTime) -> Self {
        Self {
            color: DEFAULT_COLOR.to_string(),
            count: DEFAULT_COUNT,
            rev: INITIAL_REV,
            updated_at: now,
        }
    }
}

/// A record as found on disk, where any field may be missing.
///
/// Files written by older versions may lack newer fields or still use
/// the `updated_at` spelling.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StoredRecord {
    color: Option<String>,
    count: Option<u8>,
    rev: Option<u64>,
    #[serde(default, alias = "updated_at", with = "time::serde::rfc3339::option")]
    updated_at: Option<OffsetDateTime>,
}

impl StoredRecord {
    /// Parse file contents. Anything that is not a JSON object of the right
    /// field types is an error.
    pub(crate) fn parse(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }

    /// Fill absent fields with the defaults of a fresh record.
    ///
    /// Returns the completed record and whether anything was filled in, or
    /// a description of the first field that breaks the schema.
    pub(crate) fn complete(
        self,
        now: OffsetDateTime,
    ) -> Result<(StateRecord, bool), &'static str> {
        let repaired = self.color.is_none()
            || self.count.is_none()
            || self.rev.is_none()
            || self.updated_at.is_none();

        let record = StateRecord {
            color: self.color.unwrap_or_else(|| DEFAULT_COLOR.to_string()),
            count: self.count.unwrap_or(DEFAULT_COUNT),
            rev: self.rev.unwrap_or(INITIAL_REV),
            updated_at: self.updated_at.unwrap_or(now),
        };

        if !is_hex_color(&record.color) {
            return Err("color is not #RRGGBB");
        }
        if record.count > LED_MAX {
            return Err("count out of range");
        }
        if record.rev < INITIAL_REV {
            return Err("rev below initial revision");
        }

        Ok((record, repaired))
    }
}
