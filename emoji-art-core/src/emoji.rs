//! Emoji string helpers used at the UI boundary and by palettes.
//!
//! Text is split into extended grapheme clusters, so ZWJ families, skin
//! tones, keycaps, tags and flags each stay one cluster. Whether a cluster
//! is an emoji is decided from its first scalar.

use std::collections::HashSet;

use unicode_segmentation::UnicodeSegmentation;

/// First scalar treated as emoji on its own (start of "Miscellaneous
/// Technical" pictographs); lower emoji-capable scalars such as digits only
/// count as part of a longer sequence.
const FIRST_STANDALONE_EMOJI: u32 = 0x238D;

/// Whether `c` can carry emoji presentation.
fn is_emoji_scalar(c: char) -> bool {
    matches!(c,
        '#' | '*' | '0'..='9'
        | '\u{00A9}' | '\u{00AE}'
        | '\u{203C}' | '\u{2049}' | '\u{2122}' | '\u{2139}'
        | '\u{2194}'..='\u{21AA}'
        | '\u{231A}'..='\u{23FF}'
        | '\u{24C2}'
        | '\u{25AA}'..='\u{25FE}'
        | '\u{2600}'..='\u{27BF}'
        | '\u{2934}' | '\u{2935}'
        | '\u{2B05}'..='\u{2B55}'
        | '\u{3030}' | '\u{303D}' | '\u{3297}' | '\u{3299}'
        | '\u{1F000}'..='\u{1FAFF}'
    )
}

/// Split `s` into extended grapheme clusters.
#[must_use]
pub fn graphemes(s: &str) -> Vec<&str> {
    s.graphemes(true).collect()
}

/// Whether a single cluster is an emoji.
///
/// The first scalar must be emoji-capable, and either sit at or above
/// U+238D or be followed by further scalars (so `1` is not an emoji, but the
/// keycap `1️⃣` is).
#[must_use]
pub fn is_emoji(cluster: &str) -> bool {
    let mut scalars = cluster.chars();
    let Some(first) = scalars.next() else {
        return false;
    };
    is_emoji_scalar(first) && (u32::from(first) >= FIRST_STANDALONE_EMOJI || scalars.next().is_some())
}

/// Keep only the emoji clusters of `s`.
#[must_use]
pub fn emoji_only(s: &str) -> String {
    graphemes(s).into_iter().filter(|g| is_emoji(g)).collect()
}

/// Keep the first occurrence of every cluster of `s`.
#[must_use]
pub fn removing_duplicates(s: &str) -> String {
    let mut seen = HashSet::new();
    graphemes(s)
        .into_iter()
        .filter(|g| seen.insert(*g))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graphemes_keep_sequences_together() {
        let family = "👨\u{200D}👩\u{200D}👧";
        let thumbs = "👍🏽";
        let keycap = "1\u{FE0F}\u{20E3}";
        let flag = "🇧🇷";
        let input = format!("{family}{thumbs}{keycap}{flag}🇵🇹a");
        assert_eq!(graphemes(&input), vec![family, thumbs, keycap, flag, "🇵🇹", "a"]);
    }

    #[test]
    fn test_graphemes_keep_combining_marks() {
        let accented = "e\u{301}";
        let rainbow = "🏳\u{FE0F}\u{200D}🌈";
        let input = format!("{accented}{rainbow}🐶");
        assert_eq!(graphemes(&input), vec![accented, rainbow, "🐶"]);
        assert_eq!(emoji_only(&input), format!("{rainbow}🐶"));
        assert_eq!(removing_duplicates(&format!("{accented}e{accented}")), format!("{accented}e"));
    }

    #[test]
    fn test_is_emoji() {
        assert!(is_emoji("😀"));
        assert!(is_emoji("⭐"));
        assert!(is_emoji("1\u{FE0F}\u{20E3}"));
        assert!(is_emoji("👍🏽"));
        assert!(!is_emoji("1"));
        assert!(!is_emoji("a"));
        assert!(!is_emoji(""));
    }

    #[test]
    fn test_emoji_only() {
        assert_eq!(emoji_only("a😀b🎉 1"), "😀🎉");
    }

    #[test]
    fn test_removing_duplicates() {
        assert_eq!(removing_duplicates("🐶🐱🐶👍🏽👍"), "🐶🐱👍🏽👍");
    }
}
