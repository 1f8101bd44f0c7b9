use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, ParseError, Utc};

/// Parses device-supplied timestamps. Devices in the field send RFC 3339 with
/// offsets and fractional seconds, but older firmware emits naive local-less
/// datetimes and occasionally bare dates; those are taken as UTC.
pub fn parse_flexible_timestamp(s: &str) -> Result<DateTime<Utc>, ParseError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(naive.and_utc());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map(|d| d.and_time(NaiveTime::MIN).and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_rfc3339_with_offset() {
        let dt = parse_flexible_timestamp("2024-03-05T10:15:30+02:00").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2024, 3, 5, 8, 15, 30).unwrap());
    }

    #[test]
    fn parses_fractional_seconds() {
        let dt = parse_flexible_timestamp("2024-03-05T10:15:30.250Z").unwrap();
        assert_eq!(dt.timestamp_subsec_millis(), 250);
    }

    #[test]
    fn parses_naive_datetime_as_utc() {
        let dt = parse_flexible_timestamp("2024-03-05T10:15:30").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2024, 3, 5, 10, 15, 30).unwrap());
    }

    #[test]
    fn parses_bare_date_as_midnight_utc() {
        let dt = parse_flexible_timestamp("2024-03-05").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap());
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_flexible_timestamp("not a timestamp").is_err());
    }
}
