//! Display helpers shared by the CLI tables.

use chrono::{DateTime, Utc};

/// Group digits the Indian way: last three, then pairs (`12,34,567`).
pub fn format_indian_number(n: u64) -> String {
    let digits = n.to_string();
    if digits.len() <= 3 {
        return digits;
    }

    let (head, tail) = digits.split_at(digits.len() - 3);
    let mut groups: Vec<&str> = Vec::new();
    let mut end = head.len();
    while end > 0 {
        let start = end.saturating_sub(2);
        groups.push(&head[start..end]);
        end = start;
    }
    groups.reverse();
    format!("{},{tail}", groups.join(","))
}

/// `dd MMM yyyy, HH:mm`, e.g. `01 Mar 2025, 10:15`.
pub fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.format("%d %b %Y, %H:%M").to_string()
}

/// Truncate to `max_chars` characters, appending "…" if truncated.
pub fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let kept: String = s.chars().take(max_chars.saturating_sub(1)).collect();
    format!("{kept}…")
}
