use chrono::{DateTime, Local, Utc};

/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Collapse a post onto one line for list rows
pub fn single_line(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Format a post timestamp in local time, or "" when the server sent none
pub fn format_timestamp(timestamp: Option<&DateTime<Utc>>) -> String {
    match timestamp {
        Some(ts) => ts.with_timezone(&Local).format("%b %d, %Y %H:%M").to_string(),
        None => String::new(),
    }
}

/// Short relative age for list rows ("now", "5m", "3h", "2d", or a date)
pub fn format_age(timestamp: Option<&DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(ts) = timestamp else {
        return String::new();
    };
    let seconds = (now - *ts).num_seconds().max(0);
    match seconds {
        0..=59 => "now".to_string(),
        60..=3599 => format!("{}m", seconds / 60),
        3600..=86_399 => format!("{}h", seconds / 3600),
        86_400..=604_799 => format!("{}d", seconds / 86_400),
        _ => ts.format("%b %d").to_string(),
    }
}

/// Characters left in a post draft
pub fn remaining_chars(draft: &str, limit: usize) -> usize {
    limit.saturating_sub(draft.chars().count())
}
