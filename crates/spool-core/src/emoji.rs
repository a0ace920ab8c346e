//! Emoji alphabet and emoji-sequence classification.
//!
//! The emoji namespace is keyed by strings made only of emoji. A single
//! "symbol" here is what a reader perceives as one emoji: a pictograph with
//! its variation selector and skin tone, a ZWJ family, a keycap, a regional
//! indicator flag or a tag-sequence flag.

use std::sync::LazyLock;

/// Upper bound on the number of symbols in an emoji short code.
pub const MAX_EMOJI_SYMBOLS: usize = 15;

/// Inclusive code point ranges of single-code-point emoji with default emoji
/// presentation. None of them is a modifier, a regional indicator or a
/// joiner, so concatenating any of them never forms a combined sequence.
const ALPHABET_RANGES: &[(u32, u32)] = &[
    (0x1F300, 0x1F320), // weather, sky
    (0x1F32D, 0x1F335), // food, plants
    (0x1F337, 0x1F37C),
    (0x1F37E, 0x1F393), // celebration
    (0x1F3A0, 0x1F3CA), // activities
    (0x1F3E0, 0x1F3F0), // buildings
    (0x1F400, 0x1F43E), // animals
    (0x1F442, 0x1F4FC), // body parts, objects
    (0x1F600, 0x1F64F), // emoticons
    (0x1F680, 0x1F6C5), // transport
    (0x1F910, 0x1F93A), // supplemental faces
    (0x1F980, 0x1F997), // supplemental animals
];

static ALPHABET: LazyLock<Vec<char>> = LazyLock::new(|| {
    ALPHABET_RANGES
        .iter()
        .flat_map(|&(start, end)| (start..=end).filter_map(char::from_u32))
        .collect()
});

const ZWJ: char = '\u{200D}';
const VARIATION_SELECTOR: char = '\u{FE0F}';
const COMBINING_KEYCAP: char = '\u{20E3}';
const CANCEL_TAG: char = '\u{E007F}';

/// Returns the curated alphabet emoji codes are generated from.
pub fn alphabet() -> &'static [char] {
    &ALPHABET
}

/// Returns `true` if `input` is a non-empty sequence of at most
/// [`MAX_EMOJI_SYMBOLS`] emoji and nothing else.
pub fn is_emoji_sequence(input: &str) -> bool {
    split_emoji(input).is_some_and(|symbols| {
        !symbols.is_empty() && symbols.len() <= MAX_EMOJI_SYMBOLS
    })
}

/// Splits `input` into emoji symbols.
///
/// Returns `None` as soon as any part of the input is not an emoji.
pub fn split_emoji(input: &str) -> Option<Vec<&str>> {
    let mut symbols = Vec::new();
    let mut rest = input;
    while !rest.is_empty() {
        let len = symbol_len(rest)?;
        let (symbol, tail) = rest.split_at(len);
        symbols.push(symbol);
        rest = tail;
    }
    Some(symbols)
}

/// Byte length of the emoji symbol at the start of `s`.
fn symbol_len(s: &str) -> Option<usize> {
    let mut chars = s.char_indices().peekable();
    let (_, first) = chars.next()?;
    let mut end = first.len_utf8();

    if is_regional_indicator(first) {
        let (idx, second) = chars.next()?;
        return is_regional_indicator(second).then(|| idx + second.len_utf8());
    }

    if is_keycap_base(first) {
        let (mut idx, mut next) = chars.next()?;
        if next == VARIATION_SELECTOR {
            (idx, next) = chars.next()?;
        }
        return (next == COMBINING_KEYCAP).then(|| idx + next.len_utf8());
    }

    if !is_pictographic(first) {
        return None;
    }

    loop {
        while let Some(&(idx, c)) = chars.peek() {
            if c == VARIATION_SELECTOR || is_skin_tone(c) {
                end = idx + c.len_utf8();
                chars.next();
            } else {
                break;
            }
        }

        if chars.peek().is_some_and(|&(_, c)| is_tag(c)) {
            while let Some(&(_, c)) = chars.peek() {
                if !is_tag(c) {
                    break;
                }
                chars.next();
            }
            let (idx, terminator) = chars.next()?;
            if terminator != CANCEL_TAG {
                return None;
            }
            end = idx + terminator.len_utf8();
        }

        match chars.peek() {
            Some(&(_, ZWJ)) => {
                chars.next();
                let (idx, joined) = chars.next()?;
                if !is_pictographic(joined) {
                    return None;
                }
                end = idx + joined.len_utf8();
            }
            _ => return Some(end),
        }
    }
}

fn is_regional_indicator(c: char) -> bool {
    ('\u{1F1E6}'..='\u{1F1FF}').contains(&c)
}

fn is_skin_tone(c: char) -> bool {
    ('\u{1F3FB}'..='\u{1F3FF}').contains(&c)
}

fn is_tag(c: char) -> bool {
    ('\u{E0020}'..='\u{E007E}').contains(&c)
}

fn is_keycap_base(c: char) -> bool {
    c.is_ascii_digit() || c == '#' || c == '*'
}

/// Approximation of the Unicode `Extended_Pictographic` property.
fn is_pictographic(c: char) -> bool {
    if is_regional_indicator(c) || is_skin_tone(c) {
        return false;
    }
    matches!(
        c as u32,
        0x00A9
            | 0x00AE
            | 0x203C
            | 0x2049
            | 0x2122
            | 0x2139
            | 0x2194..=0x2199
            | 0x21A9..=0x21AA
            | 0x231A..=0x231B
            | 0x2328
            | 0x23CF
            | 0x23E9..=0x23F3
            | 0x23F8..=0x23FA
            | 0x24C2
            | 0x25AA..=0x25AB
            | 0x25B6
            | 0x25C0
            | 0x25FB..=0x25FE
            | 0x2600..=0x27BF
            | 0x2934..=0x2935
            | 0x2B05..=0x2B07
            | 0x2B1B..=0x2B1C
            | 0x2B50
            | 0x2B55
            | 0x3030
            | 0x303D
            | 0x3297
            | 0x3299
            | 0x1F000..=0x1FAFF
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn alphabet_is_large_and_unique() {
        let alphabet = alphabet();
        assert!(alphabet.len() >= 300, "alphabet has {} symbols", alphabet.len());

        let unique: HashSet<_> = alphabet.iter().collect();
        assert_eq!(unique.len(), alphabet.len());
    }

    #[test]
    fn every_alphabet_symbol_is_one_emoji() {
        for &c in alphabet() {
            let s = c.to_string();
            assert_eq!(split_emoji(&s), Some(vec![s.as_str()]), "U+{:X}", c as u32);
        }
    }

    #[test]
    fn concatenated_alphabet_symbols_stay_separate() {
        let alphabet = alphabet();
        let s: String = alphabet.iter().rev().take(15).collect();
        assert_eq!(split_emoji(&s).map(|v| v.len()), Some(15));
        assert!(is_emoji_sequence(&s));
    }

    #[test]
    fn plain_text_is_not_emoji() {
        assert!(!is_emoji_sequence("abc123"));
        assert!(!is_emoji_sequence("1"));
        assert!(!is_emoji_sequence("😀a"));
        assert!(!is_emoji_sequence(""));
    }

    #[test]
    fn combined_sequences_count_as_one() {
        assert_eq!(split_emoji("👍🏽").map(|v| v.len()), Some(1));
        assert_eq!(split_emoji("👨\u{200D}👩\u{200D}👧").map(|v| v.len()), Some(1));
        assert_eq!(split_emoji("🇯🇵").map(|v| v.len()), Some(1));
        assert_eq!(split_emoji("1\u{FE0F}\u{20E3}").map(|v| v.len()), Some(1));
        assert_eq!(split_emoji("❤\u{FE0F}").map(|v| v.len()), Some(1));
        assert_eq!(
            split_emoji("🏴\u{E0067}\u{E0062}\u{E0065}\u{E006E}\u{E0067}\u{E007F}")
                .map(|v| v.len()),
            Some(1)
        );
    }

    #[test]
    fn dangling_joiners_are_rejected() {
        assert!(split_emoji("😀\u{200D}").is_none());
        assert!(split_emoji("🇯").is_none());
        assert!(split_emoji("1\u{FE0F}").is_none());
    }

    #[test]
    fn sequence_length_is_bounded() {
        let fifteen = "😀".repeat(15);
        let sixteen = "😀".repeat(16);
        assert!(is_emoji_sequence(&fifteen));
        assert!(!is_emoji_sequence(&sixteen));
    }
}
