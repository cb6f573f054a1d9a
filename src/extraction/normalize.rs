//! Text normalization helpers
//!
//! Both helpers are idempotent: applying them twice gives the same result as
//! applying them once.

/// Glyphs the recognizer confuses with digits, keyed by the digit they become
const DIGIT_LOOKALIKES: &[(&str, char)] = &[
    // Latin O, Vietnamese O variants, Cyrillic О
    ("OÓÒỎÕỌÔỐỒỔỖỘƠỚỜỞỠỢО", '0'),
    ("IÍÌỈĨỊĬĮİ", '1'),
    ("SŚŜŞŠ", '5'),
    ("ZŽŹŻ", '2'),
];

/// Vietnamese accented letters, keyed by their base letter
const DIACRITIC_GROUPS: &[(&str, char)] = &[
    ("àáạảãăằắẳẵặâầấẩẫậÀÁẠẢÃĂẰẮẲẴẶÂẦẤẨẪẬ", 'A'),
    ("èéẹẻẽêềếểễệÈÉẸẺẼÊỀẾỂỄỆ", 'E'),
    ("ìíịỉĩÌÍỊỈĨ", 'I'),
    ("òóọỏõôồốổỗộơờớởỡợÒÓỌỎÕÔỒỐỔỖỘƠỜỚỞỠỢ", 'O'),
    ("ùúụủũưừứửữựÙÚỤỦŨƯỪỨỬỮỰ", 'U'),
    ("ỳýỵỷỹỲÝỴỶỸ", 'Y'),
    ("đĐ", 'D'),
];

fn lookup(groups: &[(&str, char)], c: char) -> Option<char> {
    groups
        .iter()
        .find(|(members, _)| members.contains(c))
        .map(|&(_, base)| base)
}

/// Clean an identifier field (VIN, engine number, plate).
///
/// Uppercases, maps digit look-alikes (O→0, I→1, S→5, Z→2, including their
/// accented variants) and strips everything outside `[A-Z0-9]`.
pub fn clean_alphanumeric(text: &str) -> String {
    text.to_uppercase()
        .chars()
        .map(|c| lookup(DIGIT_LOOKALIKES, c).unwrap_or(c))
        .filter(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        .collect()
}

/// Fold Vietnamese diacritics to base letters and uppercase.
///
/// Used for accent-insensitive keyword matching (`Nhãn hiệu` → `NHAN HIEU`).
pub fn fold_diacritics(text: &str) -> String {
    text.chars()
        .map(|c| lookup(DIACRITIC_GROUPS, c).unwrap_or(c))
        .collect::<String>()
        .to_uppercase()
}

/// Collapse every whitespace run into a single space and trim
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
