use chrono::{DateTime, Duration, Utc};
use chrono_tz::America::New_York;

/// True when the game is on the same US-Eastern calendar day as `now`.
pub fn is_today_et(commence: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    commence.with_timezone(&New_York).date_naive() == now.with_timezone(&New_York).date_naive()
}

/// Skip live games and games starting within `buffer_minutes`.
pub fn is_pregame_ok(commence: DateTime<Utc>, now: DateTime<Utc>, buffer_minutes: i64) -> bool {
    commence >= now + Duration::minutes(buffer_minutes)
}

pub fn format_et_timestamp(now: DateTime<Utc>) -> String {
    now.with_timezone(&New_York)
        .format("%a %b %d %I:%M %p ET")
        .to_string()
}
