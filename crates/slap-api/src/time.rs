use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::warn;

/// SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS" without timezone.
/// Try RFC 3339 first, then parse as naive UTC. A row that defeats both
/// is logged and carried as "no timestamp" rather than failing the request.
pub(crate) fn parse_timestamp(raw: &str, what: &str) -> Option<DateTime<Utc>> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .map_err(|e| warn!("Corrupt timestamp '{}' on {}: {}", raw, what, e))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sqlite_datetime_format() {
        let ts = parse_timestamp("2026-08-06 12:30:00", "test").unwrap();
        assert_eq!(ts.to_rfc3339(), "2026-08-06T12:30:00+00:00");
    }

    #[test]
    fn parses_rfc3339() {
        assert!(parse_timestamp("2026-08-06T12:30:00Z", "test").is_some());
    }

    #[test]
    fn garbage_becomes_none() {
        assert!(parse_timestamp("not a date", "test").is_none());
    }
}
