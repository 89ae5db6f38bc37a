use time::macros::format_description;
use time::{Date, OffsetDateTime};

/// Parse a `YYYY-MM-DD` bound into the unix timestamp of midnight UTC that day.
pub fn parse_day_start(s: &str) -> Result<i64, String> {
    let fmt = format_description!("[year]-[month]-[day]");
    let date = Date::parse(s.trim(), &fmt).map_err(|e| format!("expected YYYY-MM-DD, got {s:?}: {e}"))?;
    Ok(date.midnight().assume_utc().unix_timestamp())
}

/// Render a unix timestamp as `YYYY-MM-DD HH:MM:SS` (UTC).
/// Out-of-range timestamps fall back to the epoch, like the rest of the date helpers.
pub fn human_date(ts: i64) -> String {
    let fmt = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    let dt = OffsetDateTime::from_unix_timestamp(ts).unwrap_or(OffsetDateTime::UNIX_EPOCH);
    dt.format(&fmt).unwrap_or_default()
}

/// Inverse of `parse_day_start`, used for log lines.
pub fn day_of(ts: i64) -> String {
    let fmt = format_description!("[year]-[month]-[day]");
    let dt = OffsetDateTime::from_unix_timestamp(ts).unwrap_or(OffsetDateTime::UNIX_EPOCH);
    dt.format(&fmt).unwrap_or_default()
}
