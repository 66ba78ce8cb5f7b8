use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use respsync_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

const NULL_TOKEN: &str = "null";
const SERVER_NOW_TOKEN: &str = "sysdate";

const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
];

/// A validity-window boundary as exchanged with the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum TemporalValue {
    /// An explicit point in time.
    Explicit(NaiveDateTime),
    /// No boundary.
    Null,
    /// Resolved by the store to its current server time when written.
    ServerNow,
}

impl TemporalValue {
    /// Parses one date field of the delimited record format.
    pub fn parse(raw: &str) -> AppResult<Self> {
        let value = raw.trim();
        if value.is_empty() || value.eq_ignore_ascii_case(NULL_TOKEN) {
            return Ok(Self::Null);
        }

        if value.eq_ignore_ascii_case(SERVER_NOW_TOKEN) {
            return Ok(Self::ServerNow);
        }

        for format in DATE_TIME_FORMATS {
            if let Ok(parsed) = NaiveDateTime::parse_from_str(value, format) {
                return Ok(Self::Explicit(parsed));
            }
        }

        NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map(|date| Self::Explicit(date.and_time(NaiveTime::MIN)))
            .map_err(|error| AppError::MalformedRecord(format!("invalid date '{value}': {error}")))
    }

    /// Renders the value in the store's native literal form.
    ///
    /// Explicit values use `YYYY-MM-DD HH:MM:SS.f`, where the fraction keeps
    /// at least one digit and drops trailing zeros.
    #[must_use]
    pub fn to_literal(&self) -> String {
        match self {
            Self::Explicit(value) => {
                let nanos = value.nanosecond() % 1_000_000_000;
                let fraction = if nanos == 0 {
                    "0".to_owned()
                } else {
                    format!("{nanos:09}").trim_end_matches('0').to_owned()
                };
                format!("{}.{fraction}", value.format("%Y-%m-%d %H:%M:%S"))
            }
            Self::Null => NULL_TOKEN.to_owned(),
            Self::ServerNow => SERVER_NOW_TOKEN.to_owned(),
        }
    }

    /// Returns the explicit timestamp, if any.
    #[must_use]
    pub fn explicit(&self) -> Option<NaiveDateTime> {
        match self {
            Self::Explicit(value) => Some(*value),
            Self::Null | Self::ServerNow => None,
        }
    }

    /// Returns true only for explicit timestamps strictly before `now`.
    #[must_use]
    pub fn is_explicitly_before(&self, now: NaiveDateTime) -> bool {
        self.explicit().is_some_and(|value| value < now)
    }

    /// Truncates the value to day resolution for comparison.
    #[must_use]
    pub fn truncated_to_day(&self) -> NormalizedTemporal {
        match self {
            Self::Explicit(value) => NormalizedTemporal::Day(value.date()),
            Self::Null => NormalizedTemporal::Null,
            Self::ServerNow => NormalizedTemporal::ServerNow,
        }
    }
}

/// Day-resolution form of [`TemporalValue`], used only for equality checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NormalizedTemporal {
    /// Calendar day of an explicit value.
    Day(NaiveDate),
    /// No boundary.
    Null,
    /// Server-time sentinel.
    ServerNow,
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveDateTime};

    use super::{NormalizedTemporal, TemporalValue};

    fn at(raw: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f").unwrap_or_default()
    }

    #[test]
    fn null_token_is_case_insensitive() {
        assert!(matches!(TemporalValue::parse("NULL"), Ok(TemporalValue::Null)));
        assert!(matches!(TemporalValue::parse("Null"), Ok(TemporalValue::Null)));
        assert!(matches!(TemporalValue::parse(""), Ok(TemporalValue::Null)));
    }

    #[test]
    fn server_now_token_is_recognized() {
        assert!(matches!(
            TemporalValue::parse("SYSDATE"),
            Ok(TemporalValue::ServerNow)
        ));
    }

    #[test]
    fn parses_date_and_timestamp_literals() {
        let date_only = TemporalValue::parse("2024-01-01");
        let timestamp = TemporalValue::parse("2024-01-01 13:45:10.5");

        assert!(matches!(
            date_only,
            Ok(TemporalValue::Explicit(value)) if value == at("2024-01-01 00:00:00.0")
        ));
        assert!(matches!(
            timestamp,
            Ok(TemporalValue::Explicit(value)) if value == at("2024-01-01 13:45:10.5")
        ));
    }

    #[test]
    fn rejects_unrecognized_dates() {
        assert!(TemporalValue::parse("yesterday").is_err());
        assert!(TemporalValue::parse("2024-13-01").is_err());
    }

    #[test]
    fn literal_uses_store_timestamp_form() {
        assert_eq!(
            TemporalValue::Explicit(at("2024-01-01 00:00:00.0")).to_literal(),
            "2024-01-01 00:00:00.0"
        );
        assert_eq!(
            TemporalValue::Explicit(at("2024-01-01 08:30:00.250")).to_literal(),
            "2024-01-01 08:30:00.25"
        );
        assert_eq!(TemporalValue::Null.to_literal(), "null");
        assert_eq!(TemporalValue::ServerNow.to_literal(), "sysdate");
    }

    #[test]
    fn only_explicit_values_can_be_before_now() {
        let now = at("2024-01-01 00:00:00.0");

        assert!(TemporalValue::Explicit(at("2023-12-31 23:59:59.0")).is_explicitly_before(now));
        assert!(!TemporalValue::Explicit(now).is_explicitly_before(now));
        assert!(!TemporalValue::Null.is_explicitly_before(now));
        assert!(!TemporalValue::ServerNow.is_explicitly_before(now));
    }

    #[test]
    fn truncation_drops_time_of_day() {
        let truncated = TemporalValue::Explicit(at("2024-03-05 17:02:11.0")).truncated_to_day();
        let expected = NaiveDate::from_ymd_opt(2024, 3, 5).map(NormalizedTemporal::Day);

        assert_eq!(Some(truncated), expected);
    }
}
