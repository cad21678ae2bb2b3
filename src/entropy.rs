//! Shannon entropy over a character sequence, plus charset classification.

use std::collections::HashMap;

/// `H = -sum p(c) * log2 p(c)` over the empirical character distribution.
/// Empty input returns 0.
pub fn shannon_entropy(input: &str) -> f64 {
    if input.is_empty() {
        return 0.0;
    }
    let mut counts: HashMap<char, usize> = HashMap::new();
    let mut total = 0usize;
    for c in input.chars() {
        *counts.entry(c).or_insert(0) += 1;
        total += 1;
    }
    let total = total as f64;
    counts
        .values()
        .map(|&count| {
            let p = count as f64 / total;
            -p * p.log2()
        })
        .sum()
}

/// Character sets a candidate string can be classified as, ordered from
/// the most restrictive (checked first) to the least.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Charset {
    Hex,
    Base64,
    Alphanumeric,
    Ascii,
}

impl Charset {
    /// Maximum possible entropy for this alphabet: `log2(|alphabet|)`.
    pub fn max_entropy(self) -> f64 {
        let alphabet_size: f64 = match self {
            Charset::Hex => 16.0,
            Charset::Base64 => 64.0,
            Charset::Alphanumeric => 62.0,
            Charset::Ascii => 95.0,
        };
        alphabet_size.log2()
    }

    /// The confidence threshold a candidate's raw entropy must clear to be
    /// treated as high-entropy for this charset.
    pub fn detection_threshold(self) -> f64 {
        match self {
            Charset::Hex => 3.0,
            Charset::Base64 => 4.5,
            Charset::Alphanumeric => 3.5,
            Charset::Ascii => 4.0,
        }
    }
}

/// Classifies `input`'s character set by set inclusion. Hex is a strict
/// subset of base64's alphabet, so it is checked first.
pub fn classify_charset(input: &str) -> Charset {
    if input.is_empty() {
        return Charset::Ascii;
    }
    if input.chars().all(|c| c.is_ascii_hexdigit()) {
        return Charset::Hex;
    }
    if input
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '/' | '=' | '-' | '_'))
    {
        return Charset::Base64;
    }
    if input.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Charset::Alphanumeric;
    }
    Charset::Ascii
}

/// Normalized entropy in `[0, 1]`: raw entropy divided by the charset's
/// maximum possible entropy.
pub fn normalized_entropy(input: &str) -> f64 {
    let charset = classify_charset(input);
    let raw = shannon_entropy(input);
    let max = charset.max_entropy();
    if max <= 0.0 {
        0.0
    } else {
        (raw / max).clamp(0.0, 1.0)
    }
}

/// True when characters are monotonically increasing or decreasing (by
/// code point) over at least `ratio` of adjacent positions — a cheap
/// signal that a "random-looking" string is actually sequential filler
/// (`abcdefg...`, `000111222...`).
pub fn is_sequential(input: &str, ratio: f64) -> bool {
    let chars: Vec<u32> = input.chars().map(|c| c as u32).collect();
    if chars.len() < 3 {
        return false;
    }
    let windows = chars.len() - 1;
    let increasing = chars.windows(2).filter(|w| w[1] == w[0] + 1).count();
    let decreasing = chars.windows(2).filter(|w| w[1] + 1 == w[0]).count();
    let best = increasing.max(decreasing);
    (best as f64 / windows as f64) >= ratio
}

/// True when some substring covering at least `ratio` of the input's
/// length repeats contiguously (e.g. `"abcabcabcabc"`).
pub fn has_repeating_substring(input: &str, ratio: f64) -> bool {
    let chars: Vec<char> = input.chars().collect();
    let len = chars.len();
    if len < 4 {
        return false;
    }
    for period in 1..=(len / 2) {
        let covered = len - (len % period);
        if (covered as f64 / len as f64) < ratio {
            continue;
        }
        let repeats = covered / period;
        if repeats < 2 {
            continue;
        }
        let unit = &chars[..period];
        let mut matches_all = true;
        for block in 1..repeats {
            let start = block * period;
            if &chars[start..start + period] != unit {
                matches_all = false;
                break;
            }
        }
        if matches_all {
            return true;
        }
    }
    false
}

/// Ratio of distinct characters to total length.
pub fn unique_char_ratio(input: &str) -> f64 {
    if input.is_empty() {
        return 0.0;
    }
    let total = input.chars().count();
    let unique = input.chars().collect::<std::collections::HashSet<_>>().len();
    unique as f64 / total as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_has_zero_entropy() {
        assert_eq!(shannon_entropy(""), 0.0);
    }

    #[test]
    fn entropy_never_exceeds_alphabet_bound() {
        let s = "abcdefgh12345678";
        let h = shannon_entropy(s);
        let charset = classify_charset(s);
        assert!(h <= charset.max_entropy() + 1e-9);
    }

    #[test]
    fn repetition_preserves_entropy() {
        let s = "aXb91!kq";
        let doubled = format!("{s}{s}");
        assert!((shannon_entropy(s) - shannon_entropy(&doubled)).abs() < 1e-9);
    }

    #[test]
    fn hex_checked_before_base64() {
        assert_eq!(classify_charset("deadbeef0123"), Charset::Hex);
        assert_eq!(classify_charset("deadbeefXYZ+"), Charset::Base64);
    }

    #[test]
    fn sequential_strings_detected() {
        assert!(is_sequential("abcdefgh", 0.7));
        assert!(!is_sequential("k3nQ9wZp", 0.7));
    }

    #[test]
    fn repeating_substring_detected() {
        assert!(has_repeating_substring("abcabcabcabc", 0.5));
        assert!(!has_repeating_substring("k3nQ9wZpR7mL", 0.5));
    }
}
