// Byte-offset based helpers for scanning markup. All needles are
// ASCII, so offsets returned are always on char boundaries.

/// Whether `s` starts with the ASCII `prefix`, ignoring ASCII case.
pub fn starts_with_ignore_ascii_case(s: &str, prefix: &str) -> bool {
    s.len() >= prefix.len()
        && s.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}

/// Find the first occurrence of the ASCII `needle` at or after byte
/// offset `from`, ignoring ASCII case.
pub fn find_ignore_ascii_case(s: &str, needle: &str, from: usize) -> Option<usize> {
    let hay = s.as_bytes();
    let nee = needle.as_bytes();
    if nee.is_empty() {
        return Some(from.min(hay.len()))
    }
    if hay.len() < nee.len() {
        return None
    }
    (from..=(hay.len() - nee.len())).find(
        |&i| hay[i..i + nee.len()].eq_ignore_ascii_case(nee))
}

/// `\w` in the regex sense, ASCII only.
pub fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Length of the run of word bytes at the start of `s`.
pub fn word_len(s: &str) -> usize {
    s.bytes().take_while(|b| is_word_byte(*b)).count()
}

/// The first `n` characters of `s` (or all of it).
pub fn str_take_chars(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((i, _)) => &s[..i],
        None => s
    }
}
