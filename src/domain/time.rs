use crate::error::{OrderError, Result};
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A UTC instant with microsecond precision.
///
/// The canonical text form is RFC 3339 with six fractional digits and a `Z`
/// suffix, e.g. `2024-05-01T12:30:00.000000Z`. Every value has the same width,
/// so lexical order of the text equals chronological order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        Self(at.trunc_subsecs(6))
    }

    pub fn parse(text: &str) -> Result<Self> {
        DateTime::parse_from_rfc3339(text)
            .map(|at| Self::from_datetime(at.with_timezone(&Utc)))
            .map_err(|e| OrderError::invalid(format!("invalid timestamp '{}': {}", text, e)))
    }

    pub fn to_canonical(&self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::Micros, true)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_canonical())
    }
}

impl TryFrom<String> for Timestamp {
    type Error = OrderError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Timestamp> for String {
    fn from(ts: Timestamp) -> Self {
        ts.to_canonical()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_canonical_format() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        let ts = Timestamp::from_datetime(at);
        assert_eq!(ts.to_canonical(), "2024-05-01T12:30:00.000000Z");
        assert_eq!(Timestamp::parse(&ts.to_canonical()).unwrap(), ts);
    }

    #[test]
    fn test_parse_normalizes_offset() {
        let ts = Timestamp::parse("2024-05-01T14:30:00+02:00").unwrap();
        assert_eq!(ts.to_canonical(), "2024-05-01T12:30:00.000000Z");
    }

    #[test]
    fn test_lexical_order_matches_time_order() {
        let earlier = Timestamp::parse("2024-05-01T09:59:59.999999Z").unwrap();
        let later = Timestamp::parse("2024-05-01T10:00:00Z").unwrap();
        assert!(earlier < later);
        assert!(earlier.to_canonical() < later.to_canonical());
    }

    #[test]
    fn test_now_roundtrips_through_text() {
        let now = Timestamp::now();
        assert_eq!(Timestamp::parse(&now.to_canonical()).unwrap(), now);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Timestamp::parse("yesterday").is_err());
    }
}
