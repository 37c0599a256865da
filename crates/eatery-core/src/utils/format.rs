use chrono::{DateTime, Utc};

/// Describe an age in minutes as "just now", "12m ago", "3h ago" or "2d ago".
/// Hours and days round half up.
pub fn format_age(minutes: i64) -> String {
    match minutes {
        // negative ages come from clock skew
        m if m < 1 => "just now".to_string(),
        m if m < 60 => format!("{}m ago", m),
        m if m < 1440 => format!("{}h ago", (m + 30) / 60),
        m => format!("{}d ago", (m + 720) / 1440),
    }
}

/// Render a review timestamp for display.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format("%b %d, %Y %H:%M").to_string()
}

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

/// Keep the first occurrence of every value, preserving order.
pub fn distinct<T, I>(values: I) -> Vec<T>
where
    T: PartialEq,
    I: IntoIterator<Item = T>,
{
    let mut unique: Vec<T> = Vec::new();
    for value in values {
        if !unique.contains(&value) {
            unique.push(value);
        }
    }
    unique
}
