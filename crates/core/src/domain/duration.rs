// Compact duration notation: "1d12h", "155m", "2m24.5s", "2h"
//
// Only seconds allow a fractional part. Segments must appear in d, h, m, s order.

use super::error::{DomainError, Result};
use std::time::Duration;

const SECONDS_PER_MINUTE: u64 = 60;
const SECONDS_PER_HOUR: u64 = 60 * SECONDS_PER_MINUTE;
const SECONDS_PER_DAY: u64 = 24 * SECONDS_PER_HOUR;

/// Parse a duration such as `3d12h37m24.25s`. Blank input is zero.
pub fn parse_duration(input: &str) -> Result<Duration> {
    let text = input.trim();
    if text.is_empty() {
        return Ok(Duration::ZERO);
    }
    let invalid = || DomainError::InvalidDuration(input.to_string());

    let mut total = Duration::ZERO;
    let mut number = String::new();
    // Index into [d, h, m, s] of the last segment seen
    let mut last_unit: Option<usize> = None;

    for c in text.chars() {
        if c.is_ascii_digit() || c == '.' {
            number.push(c);
            continue;
        }

        let unit = match c.to_ascii_lowercase() {
            'd' => 0,
            'h' => 1,
            'm' => 2,
            's' => 3,
            _ => return Err(invalid()),
        };
        if last_unit.is_some_and(|last| unit <= last) {
            return Err(invalid());
        }
        last_unit = Some(unit);

        let segment = if unit == 3 {
            parse_seconds(&number).ok_or_else(invalid)?
        } else {
            let value: u64 = if number.is_empty() || number.contains('.') {
                return Err(invalid());
            } else {
                number.parse().map_err(|_| invalid())?
            };
            let scale = [SECONDS_PER_DAY, SECONDS_PER_HOUR, SECONDS_PER_MINUTE][unit];
            Duration::from_secs(value.checked_mul(scale).ok_or_else(invalid)?)
        };
        total = total.checked_add(segment).ok_or_else(invalid)?;
        number.clear();
    }

    if !number.is_empty() {
        return Err(invalid());
    }
    Ok(total)
}

fn parse_seconds(number: &str) -> Option<Duration> {
    let (whole, fraction) = match number.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (number, ""),
    };
    if fraction.contains('.') || (whole.is_empty() && fraction.is_empty()) {
        return None;
    }

    let secs: u64 = if whole.is_empty() { 0 } else { whole.parse().ok()? };

    let mut nanos: u32 = 0;
    let mut scale: u32 = 100_000_000;
    for digit in fraction.chars().take(9) {
        nanos += digit.to_digit(10)? * scale;
        scale /= 10;
    }
    Some(Duration::new(secs, nanos))
}

/// Format a duration in the notation accepted by [`parse_duration`],
/// with millisecond precision: `3d12h37m24.250s`, `0s`.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let days = secs / SECONDS_PER_DAY;
    let hours = (secs % SECONDS_PER_DAY) / SECONDS_PER_HOUR;
    let minutes = (secs % SECONDS_PER_HOUR) / SECONDS_PER_MINUTE;
    let seconds = secs % SECONDS_PER_MINUTE;
    let millis = duration.subsec_millis();

    let mut out = String::new();
    if days > 0 {
        out.push_str(&format!("{days}d"));
    }
    if hours > 0 {
        out.push_str(&format!("{hours}h"));
    }
    if minutes > 0 {
        out.push_str(&format!("{minutes}m"));
    }
    if seconds > 0 || millis > 0 || out.is_empty() {
        out.push_str(&seconds.to_string());
        if millis > 0 {
            out.push_str(&format!(".{millis:03}"));
        }
        out.push('s');
    }
    out
}
