//! Human-readable data formatting utilities.
//!
//! Sizes use binary units (KiB, MiB) and dates get a relative form next to
//! the value reported by the registry.

use chrono::{DateTime, Utc};
use chrono_humanize::Humanize;
use humansize::{BINARY, format_size as format_size_human};


/// Formats a byte size into a human-readable string using binary units (KiB, MiB).
///
/// # Examples
///
/// ```
/// use libimageq::format::format_size;
///
/// let size = 1024 * 1024 * 5; // 5 MiB
/// assert_eq!(format_size(size), "5 MiB");
///
/// let size = 1024; // 1 KiB
/// assert_eq!(format_size(size), "1 KiB");
/// ```
pub fn format_size(size_bytes: u64) -> String {
    format_size_human(size_bytes, BINARY)
}

/// Formats a timestamp into a human-readable relative string.
///
/// # Examples
///
/// ```
/// use libimageq::format::format_timestamp;
/// use chrono::{Duration, Utc};
///
/// let one_day_ago = Utc::now() - Duration::days(1);
/// assert_eq!(format_timestamp(&one_day_ago), "a day ago");
/// ```
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.humanize()
}

/// Renders an RFC 3339 date as `<date> (<relative>)`.
///
/// Values that do not parse are returned unchanged.
pub fn format_date(raw: &str) -> String {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(timestamp) => format!(
            "{} ({})",
            raw,
            format_timestamp(&timestamp.with_timezone(&Utc))
        ),
        Err(_) => raw.to_string(),
    }
}
