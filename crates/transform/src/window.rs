use crate::error::RestoreError;
use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};

/// The provider can't restore to the last few minutes.
const MINIMUM_AGE_MINUTES: i64 = 5;

const OFFSET_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f%:z";
const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Parse a restore time. Times without an offset are taken as UTC.
pub fn parse_restore_time(value: &str) -> Option<DateTime<Utc>> {
    let value: &str = value.trim();

    if let Ok(time) = DateTime::parse_from_rfc3339(value) {
        return Some(time.with_timezone(&Utc));
    }

    if let Ok(time) = DateTime::parse_from_str(value, OFFSET_FORMAT) {
        return Some(time.with_timezone(&Utc));
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|time| time.and_utc())
}

/// Check `requested` lies strictly inside the restorable window of an instance
/// keeping `retention_days` of backups, returning the parsed time.
pub fn validate_restore_window(
    requested: &str,
    retention_days: i32,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>, RestoreError> {
    let time: DateTime<Utc> = parse_restore_time(requested).ok_or_else(|| {
        RestoreError::InvalidRestoreWindow(format!("'{requested}' is not a point in time"))
    })?;

    let earliest: DateTime<Utc> = now - TimeDelta::days(i64::from(retention_days));
    let latest: DateTime<Utc> = now - TimeDelta::minutes(MINIMUM_AGE_MINUTES);

    if earliest < time && time < latest {
        Ok(time)
    } else {
        Err(RestoreError::InvalidRestoreWindow(format!(
            "{time} is not between {earliest} and {latest}"
        )))
    }
}
