//! Layer 2: Wire date handling
//!
//! The backend exchanges dates as plain `yyyy-mm-dd` strings with no time
//! or zone component. Tombstoned records are end-dated with the local
//! calendar date of the edit.

use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Date, OffsetDateTime};

use super::error::{CoreError, DateError};

pub(crate) const WIRE_DATE: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]");

/// Calendar date used for state dates and tombstone end-dating.
pub fn today() -> Date {
    OffsetDateTime::now_utc().date()
}

pub fn parse_wire_date(raw: &str) -> Result<Date, CoreError> {
    Date::parse(raw, WIRE_DATE).map_err(|e| {
        DateError {
            raw: raw.to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}

pub fn format_wire_date(date: Date) -> String {
    // The format description is infallible for a valid Date.
    date.format(WIRE_DATE).unwrap_or_default()
}

/// Serde adapter for required `Date` fields: `#[serde(with = "wire_date")]`.
pub mod wire_date {
    use serde::{Deserialize, Deserializer, Serializer};
    use time::Date;

    use super::WIRE_DATE;

    pub fn serialize<S: Serializer>(date: &Date, serializer: S) -> Result<S::Ok, S::Error> {
        let s = date.format(WIRE_DATE).map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Date, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Date::parse(&raw, WIRE_DATE).map_err(serde::de::Error::custom)
    }
}

/// Serde adapter for nullable `Date` fields: `#[serde(with = "wire_date_opt")]`.
pub mod wire_date_opt {
    use serde::{Deserialize, Deserializer, Serializer};
    use time::Date;

    use super::WIRE_DATE;

    pub fn serialize<S: Serializer>(
        date: &Option<Date>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match date {
            Some(d) => {
                let s = d.format(WIRE_DATE).map_err(serde::ser::Error::custom)?;
                serializer.serialize_some(&s)
            }
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Date>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(raw) => Date::parse(&raw, WIRE_DATE)
                .map(Some)
                .map_err(serde::de::Error::custom),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};
    use time::macros::date;

    use super::*;

    #[derive(Serialize, Deserialize)]
    struct Dated {
        #[serde(with = "wire_date")]
        on: Date,
        #[serde(default, with = "wire_date_opt", skip_serializing_if = "Option::is_none")]
        until: Option<Date>,
    }

    #[test]
    fn wire_format_is_iso_date_only() {
        assert_eq!(format_wire_date(date!(2024 - 03 - 05)), "2024-03-05");
        assert_eq!(parse_wire_date("2024-03-05").unwrap(), date!(2024 - 03 - 05));
        assert!(parse_wire_date("05/03/2024").is_err());
        assert!(parse_wire_date("2024-03-05T00:00:00Z").is_err());
    }

    #[test]
    fn optional_dates_skip_when_absent() {
        let json = serde_json::to_string(&Dated {
            on: date!(2024 - 01 - 31),
            until: None,
        })
        .unwrap();
        assert_eq!(json, r#"{"on":"2024-01-31"}"#);

        let parsed: Dated = serde_json::from_str(r#"{"on":"2024-01-31","until":null}"#).unwrap();
        assert!(parsed.until.is_none());

        let parsed: Dated =
            serde_json::from_str(r#"{"on":"2024-01-31","until":"2025-12-01"}"#).unwrap();
        assert_eq!(parsed.until, Some(date!(2025 - 12 - 01)));
    }
}
