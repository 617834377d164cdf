use time::OffsetDateTime;

/// Renders how long ago `created_at` was, relative to `now`, as the
/// "N seconds/minutes/hours/days ago" string the listing endpoints attach to
/// their entries. Buckets switch at exactly one minute, one hour and one day
/// of elapsed wall time; the count always truncates.
pub fn time_ago(created_at: OffsetDateTime, now: OffsetDateTime) -> String {
    let elapsed_ms = (now - created_at).whole_milliseconds().unsigned_abs();

    if elapsed_ms < 60_000 {
        format!("{} seconds ago", elapsed_ms / 1_000)
    } else if elapsed_ms < 3_600_000 {
        format!("{} minutes ago", elapsed_ms / 60_000)
    } else if elapsed_ms < 86_400_000 {
        format!("{} hours ago", elapsed_ms / 3_600_000)
    } else {
        format!("{} days ago", elapsed_ms / 86_400_000)
    }
}
