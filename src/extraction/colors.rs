//! Paint color dictionary
//!
//! Keys are folded tokens (no diacritics, uppercase). A multi-token key such
//! as `XAM DEN` matches with any separator between tokens, or none, so
//! `Xám Đen`, `XAM-DEN` and `xamden` all resolve to the same display value.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use super::normalize::fold_diacritics;

/// A color dictionary entry
#[derive(Debug)]
pub struct ColorEntry {
    /// Folded tokens, in order
    pub tokens: &'static [&'static str],
    /// Display value shown to the user
    pub display: &'static str,
    /// Word-bounded matcher over folded text
    matcher: Regex,
}

impl ColorEntry {
    fn new(tokens: &'static [&'static str], display: &'static str) -> Self {
        let body = tokens.join(r"[\s\-]*");
        let matcher = Regex::new(&format!(r"\b{}\b", body)).expect("color tokens are literal words");
        Self {
            tokens,
            display,
            matcher,
        }
    }

    /// Tokens joined without separators
    pub fn compact_key(&self) -> String {
        self.tokens.concat()
    }
}

/// Entries ordered longest key first, so `XAM DEN` is tried before `XAM`
/// and `DEN`. Ties keep insertion order.
pub static COLOR_DICTIONARY: Lazy<Vec<ColorEntry>> = Lazy::new(|| {
    let mut entries = vec![
        ColorEntry::new(&["XAM", "DEN"], "Xám Đen"),
        ColorEntry::new(&["XAM"], "Xám"),
        ColorEntry::new(&["GRAY"], "Xám"),
        ColorEntry::new(&["GREY"], "Xám"),
        ColorEntry::new(&["DO"], "Đỏ"),
        ColorEntry::new(&["RED"], "Đỏ"),
        ColorEntry::new(&["TRANG"], "Trắng"),
        ColorEntry::new(&["WHITE"], "Trắng"),
        ColorEntry::new(&["DEN"], "Đen"),
        ColorEntry::new(&["BLACK"], "Đen"),
        ColorEntry::new(&["XANH"], "Xanh"),
        ColorEntry::new(&["BLUE"], "Xanh"),
        ColorEntry::new(&["BAC"], "Bạc"),
        ColorEntry::new(&["SILVER"], "Bạc"),
        ColorEntry::new(&["VANG"], "Vàng"),
        ColorEntry::new(&["YELLOW"], "Vàng"),
    ];
    // Stable sort keeps first-registered order among equal lengths
    entries.sort_by_key(|e| std::cmp::Reverse(e.compact_key().len()));
    entries
});

/// Map a short color phrase (a label value) to its display value.
///
/// Tries an exact match on the compacted phrase first, then the longest
/// key contained in it.
pub fn lookup_color(phrase: &str) -> Option<&'static str> {
    let compact: String = fold_diacritics(phrase)
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect();
    if compact.is_empty() {
        return None;
    }

    COLOR_DICTIONARY
        .iter()
        .find(|e| e.compact_key() == compact)
        .or_else(|| {
            COLOR_DICTIONARY
                .iter()
                .find(|e| compact.contains(&e.compact_key()))
        })
        .map(|e| e.display)
}

/// `đến ngày` ("until the date") folds to `DEN NGAY`. A preceding `XAM`
/// makes it a color again.
static UNTIL_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(XAM[\s\-]*)?DEN\s+NGAY\b").expect("literal pattern"));

/// Find the first dictionary color mentioned as a word in folded text.
///
/// Folding loses the difference between `đen` (black) and `đến` (until), so
/// a bare `DEN` anywhere still reads as `Đen`. Only the `đến ngày` phrase is
/// skipped. Callers must treat the result as a guess.
pub fn scan_colors(folded: &str) -> Option<&'static str> {
    let text = UNTIL_DATE.replace_all(folded, |caps: &Captures<'_>| {
        if caps.get(1).is_some() {
            caps[0].to_string()
        } else {
            " NGAY".to_string()
        }
    });

    COLOR_DICTIONARY
        .iter()
        .find(|e| e.matcher.is_match(&text))
        .map(|e| e.display)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_xam_den_variants() {
        for phrase in ["XAM DEN", "xám đen", "Xám-Đen", "XAMDEN", "  xam   den "] {
            assert_eq!(lookup_color(phrase), Some("Xám Đen"), "{:?}", phrase);
        }
    }

    #[test]
    fn test_lookup_single_colors() {
        assert_eq!(lookup_color("SILVER"), Some("Bạc"));
        assert_eq!(lookup_color("Bạc"), Some("Bạc"));
        assert_eq!(lookup_color("Trắng"), Some("Trắng"));
        assert_eq!(lookup_color("grey"), Some("Xám"));
        assert_eq!(lookup_color("Đỏ"), Some("Đỏ"));
    }

    #[test]
    fn test_lookup_unknown() {
        assert_eq!(lookup_color("Hồng"), None);
        assert_eq!(lookup_color(" - "), None);
    }

    #[test]
    fn test_dictionary_longest_first() {
        assert_eq!(COLOR_DICTIONARY[0].display, "Xám Đen");
        let lengths: Vec<usize> = COLOR_DICTIONARY.iter().map(|e| e.compact_key().len()).collect();
        assert!(lengths.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn test_scan_is_word_bounded() {
        assert_eq!(scan_colors("MAU SON XAM DEN HOAT DONG"), Some("Xám Đen"));
        // "DO" inside "DONG" and "DEN" inside "DENTAL" do not count
        assert_eq!(scan_colors("HOAT DONG DENTAL"), None);
        assert_eq!(scan_colors("COLOUR: SILVER"), Some("Bạc"));
    }

    #[test]
    fn test_scan_skips_until_date() {
        assert_eq!(scan_colors("CO GIA TRI DEN NGAY 05/03/2029"), None);
        assert_eq!(scan_colors("MAU XAM DEN NGAY DANG KY"), Some("Xám Đen"));
        // A lone "den" is still ambiguous
        assert_eq!(scan_colors("CO GIA TRI DEN 2029"), Some("Đen"));
    }
}
