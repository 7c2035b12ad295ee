//! Text folding shared by index build and query.

use std::collections::HashSet;

use unicode_normalization::UnicodeNormalization;

/// Characters per gram.
pub const GRAM_LEN: usize = 3;

/// Compatibility-fold (NFKC) and lowercase, so full-width and half-width forms and
/// letter case all compare equal.
pub fn normalize(text: &str) -> String {
    text.nfkc().collect::<String>().to_lowercase()
}

/// Distinct 3-character substrings of already normalized text, in first-seen order.
///
/// Text shorter than [`GRAM_LEN`] characters has no grams.
pub fn unique_grams(normalized: &str) -> Vec<String> {
    let chars: Vec<char> = normalized.chars().collect();
    if chars.len() < GRAM_LEN {
        return Vec::new();
    }

    let mut seen = HashSet::with_capacity(chars.len());
    chars
        .windows(GRAM_LEN)
        .map(|w| w.iter().collect::<String>())
        .filter(|gram| seen.insert(gram.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_folds_width_and_case() {
        assert_eq!(normalize("ＡＢＣ"), "abc");
        assert_eq!(normalize("Hello World"), "hello world");
        // half-width katakana composes to full-width
        assert_eq!(normalize("ｶﾞ"), "ガ");
    }

    #[test]
    fn test_unique_grams() {
        assert_eq!(unique_grams("abcd"), vec!["abc", "bcd"]);
        assert_eq!(unique_grams("aaaa"), vec!["aaa"]);
        assert!(unique_grams("ab").is_empty());
    }

    #[test]
    fn test_grams_count_characters_not_bytes() {
        assert_eq!(unique_grams("日本語だ"), vec!["日本語", "本語だ"]);
    }
}
