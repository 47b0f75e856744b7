use std::fmt::{Display, Formatter};

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::format_description::well_known::Rfc3339;
use time::{OffsetDateTime, UtcOffset};

use crate::domain::TradingDate;
use crate::ValidationError;

/// Minute-bar timestamp guaranteed to be UTC.
///
/// Providers report bucket starts in various zones; everything is normalized
/// to UTC at the adapter boundary so one run never mixes zones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UtcMinute(OffsetDateTime);

impl UtcMinute {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let parsed = OffsetDateTime::parse(input, &Rfc3339).map_err(|_| {
            ValidationError::TimestampNotUtc {
                value: input.to_owned(),
            }
        })?;

        Self::from_offset_datetime(parsed).map_err(|_| ValidationError::TimestampNotUtc {
            value: input.to_owned(),
        })
    }

    pub fn from_offset_datetime(value: OffsetDateTime) -> Result<Self, ValidationError> {
        if value.offset() != UtcOffset::UTC {
            return Err(ValidationError::TimestampNotUtc {
                value: value
                    .format(&Rfc3339)
                    .unwrap_or_else(|_| String::from("<unformattable>")),
            });
        }

        Ok(Self(value))
    }

    /// Provider epochs arrive as Unix seconds.
    pub fn from_unix_seconds(seconds: i64) -> Result<Self, ValidationError> {
        let value = OffsetDateTime::from_unix_timestamp(seconds)
            .map_err(|_| ValidationError::TimestampOutOfRange { seconds })?;
        Self::from_offset_datetime(value)
    }

    pub fn into_inner(self) -> OffsetDateTime {
        self.0
    }

    pub fn date(self) -> TradingDate {
        TradingDate::new(self.0.date())
    }

    pub fn hour(self) -> u8 {
        self.0.hour()
    }

    pub fn minute(self) -> u8 {
        self.0.minute()
    }

    pub fn format_rfc3339(self) -> String {
        self.0
            .format(&Rfc3339)
            .expect("UtcMinute must be RFC3339 formattable")
    }

    /// `YYYY-MM-DD HH:MM:SS` rendering for warehouse TIMESTAMP casts.
    pub fn format_sql(self) -> String {
        format!(
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.0.year(),
            u8::from(self.0.month()),
            self.0.day(),
            self.0.hour(),
            self.0.minute(),
            self.0.second(),
        )
    }
}

impl Display for UtcMinute {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.format_rfc3339())
    }
}

impl Serialize for UtcMinute {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.format_rfc3339())
    }
}

impl<'de> Deserialize<'de> for UtcMinute {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Self::parse(&value).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_utc_timestamp() {
        let parsed = UtcMinute::parse("2025-06-02T13:30:00Z").expect("must parse");
        assert_eq!(parsed.format_rfc3339(), "2025-06-02T13:30:00Z");
        assert_eq!(parsed.hour(), 13);
        assert_eq!(parsed.minute(), 30);
    }

    #[test]
    fn rejects_non_utc_timestamp() {
        let err = UtcMinute::parse("2025-06-02T09:30:00-04:00").expect_err("must fail");
        assert!(matches!(err, ValidationError::TimestampNotUtc { .. }));
    }

    #[test]
    fn converts_unix_seconds() {
        let parsed = UtcMinute::from_unix_seconds(1_748_870_100).expect("must convert");
        assert_eq!(parsed.format_sql(), "2025-06-02 13:15:00");
    }
}
