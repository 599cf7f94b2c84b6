use std::time::SystemTime;
use std::time::UNIX_EPOCH;

/// return second
pub(crate) fn get_now_as_u64() -> u64 {
    let now = SystemTime::now();
    let since_epoch = now.duration_since(UNIX_EPOCH).unwrap_or_default();
    since_epoch.as_secs()
}

/// Parses a period such as `30`, `90s`, `5m`, `1h`, `7d` or `2w` into seconds.
///
/// Returns `None` for empty input, unknown suffixes and overflow.
pub fn parse_time_suffix(text: &str) -> Option<u32> {
    let text = text.trim();
    let (digits, multiplier) = match text.char_indices().last()? {
        (i, 's') => (&text[..i], 1),
        (i, 'm') => (&text[..i], 60),
        (i, 'h') => (&text[..i], 3_600),
        (i, 'd') => (&text[..i], 86_400),
        (i, 'w') => (&text[..i], 7 * 86_400),
        (_, c) if c.is_ascii_digit() => (text, 1),
        _ => return None,
    };

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse::<u32>().ok()?.checked_mul(multiplier)
}
