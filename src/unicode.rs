//! POSIX class names and a practical Unicode general-category/script subset
//! (spec.md §4.5's "known set" and §4.11's Unicode-aware alphabet). This is
//! not a full Unicode Character Database — it covers the categories and
//! scripts that show up in real-world patterns, as static block-range
//! tables rather than a generated crate.

/// PCRE2's recognized POSIX class names (without the `[: :]` delimiters).
pub const POSIX_CLASSES: &[&str] = &[
    "alpha", "digit", "alnum", "upper", "lower", "space", "punct", "cntrl",
    "graph", "print", "blank", "xdigit", "word",
];

pub fn is_known_posix_class(name: &str) -> bool {
    POSIX_CLASSES.contains(&name)
}

/// `[:^word:]`-style negation is rejected by PCRE2: a POSIX class name may
/// not itself start with `^`. Negation is expressed by `PosixClass::negated`,
/// which the lexer only sets via `[:^name:]` syntax support — but PCRE2 does
/// not support that form at all, so the validator rejects it outright.
pub fn allows_posix_negation() -> bool {
    false
}

/// Single-letter (and `Is`-prefixed) general categories, `\p{...}` style.
const GENERAL_CATEGORIES: &[&str] = &[
    "L", "Lu", "Ll", "Lt", "Lm", "Lo",
    "N", "Nd", "Nl", "No",
    "P", "Pc", "Pd", "Ps", "Pe", "Pi", "Pf", "Po",
    "S", "Sm", "Sc", "Sk", "So",
    "Z", "Zs", "Zl", "Zp",
    "C", "Cc", "Cf", "Co", "Cs", "Cn",
];

/// Scripts recognized via `\p{Script}` / PCRE2's `\p{Is...}` aliasing.
const SCRIPTS: &[&str] = &[
    "Latin", "Greek", "Cyrillic", "Armenian", "Hebrew", "Arabic", "Georgian",
    "Thai", "Devanagari", "Han", "Hiragana", "Katakana", "Hangul", "Common",
];

/// Derived binary properties PCRE2 exposes via `\p{...}`.
const DERIVED_PROPERTIES: &[&str] = &[
    "Alpha", "Alphabetic", "White_Space", "Any", "Assigned", "ASCII",
];

pub fn is_known_unicode_property(name: &str) -> bool {
    let trimmed = name.strip_prefix("Is").unwrap_or(name);
    GENERAL_CATEGORIES.contains(&name)
        || SCRIPTS.contains(&name)
        || SCRIPTS.contains(&trimmed)
        || DERIVED_PROPERTIES.contains(&name)
        || DERIVED_PROPERTIES.contains(&trimmed)
}

pub const MAX_CODE_POINT: u32 = 0x10FFFF;

pub fn is_valid_code_point(cp: u32) -> bool {
    cp <= MAX_CODE_POINT
}

/// Approximate block ranges backing `category_ranges`/`script_ranges`, used
/// by the optimizer's char-class canonicalization and the sample generator.
/// These are well-known fixed Unicode block boundaries, not derived data.
const LATIN_LETTER_RANGES: &[(u32, u32)] = &[(0x41, 0x5A), (0x61, 0x7A), (0xC0, 0xFF)];
const DIGIT_RANGES: &[(u32, u32)] = &[(0x30, 0x39)];
const GREEK_RANGES: &[(u32, u32)] = &[(0x370, 0x3FF)];
const CYRILLIC_RANGES: &[(u32, u32)] = &[(0x400, 0x4FF)];
const ARMENIAN_RANGES: &[(u32, u32)] = &[(0x530, 0x58F)];
const HEBREW_RANGES: &[(u32, u32)] = &[(0x590, 0x5FF)];
const ARABIC_RANGES: &[(u32, u32)] = &[(0x600, 0x6FF)];
const GEORGIAN_RANGES: &[(u32, u32)] = &[(0x10A0, 0x10FF)];
const THAI_RANGES: &[(u32, u32)] = &[(0xE00, 0xE7F)];
const DEVANAGARI_RANGES: &[(u32, u32)] = &[(0x900, 0x97F)];
const HIRAGANA_RANGES: &[(u32, u32)] = &[(0x3040, 0x309F)];
const KATAKANA_RANGES: &[(u32, u32)] = &[(0x30A0, 0x30FF)];
const HANGUL_RANGES: &[(u32, u32)] = &[(0xAC00, 0xD7A3)];
const HAN_RANGES: &[(u32, u32)] = &[(0x4E00, 0x9FFF)];

pub fn script_ranges(script: &str) -> Option<&'static [(u32, u32)]> {
    Some(match script {
        "Latin" => LATIN_LETTER_RANGES,
        "Greek" => GREEK_RANGES,
        "Cyrillic" => CYRILLIC_RANGES,
        "Armenian" => ARMENIAN_RANGES,
        "Hebrew" => HEBREW_RANGES,
        "Arabic" => ARABIC_RANGES,
        "Georgian" => GEORGIAN_RANGES,
        "Thai" => THAI_RANGES,
        "Devanagari" => DEVANAGARI_RANGES,
        "Hiragana" => HIRAGANA_RANGES,
        "Katakana" => KATAKANA_RANGES,
        "Hangul" => HANGUL_RANGES,
        "Han" => HAN_RANGES,
        _ => return None,
    })
}

pub fn category_ranges(category: &str) -> Option<&'static [(u32, u32)]> {
    Some(match category {
        "Nd" | "N" => DIGIT_RANGES,
        "L" | "Lu" | "Ll" => LATIN_LETTER_RANGES,
        _ => return None,
    })
}

/// One representative codepoint for a property name, used by the sample
/// generator to materialize `\p{...}`/POSIX members without enumerating a
/// full range.
pub fn representative_char(name: &str) -> char {
    if let Some(ranges) = script_ranges(name).or_else(|| category_ranges(name)) {
        if let Some((start, _)) = ranges.first() {
            if let Some(c) = char::from_u32(*start) {
                return c;
            }
        }
    }
    match name {
        "Alpha" | "Alphabetic" | "L" | "Lu" => 'A',
        "Ll" => 'a',
        "White_Space" => ' ',
        _ => 'x',
    }
}

pub fn posix_representative(name: &str) -> char {
    match name {
        "digit" | "xdigit" => '5',
        "upper" => 'A',
        "lower" => 'a',
        "alpha" | "alnum" | "word" | "graph" | "print" => 'a',
        "space" | "blank" => ' ',
        "punct" => '.',
        "cntrl" => '\u{1}',
        _ => 'a',
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_posix_classes() {
        assert!(is_known_posix_class("alpha"));
        assert!(!is_known_posix_class("bogus"));
    }

    #[test]
    fn recognizes_unicode_properties() {
        assert!(is_known_unicode_property("Lu"));
        assert!(is_known_unicode_property("Greek"));
        assert!(is_known_unicode_property("IsGreek"));
        assert!(is_known_unicode_property("Alphabetic"));
        assert!(!is_known_unicode_property("NotAThing"));
    }

    #[test]
    fn code_point_bound() {
        assert!(is_valid_code_point(0x10FFFF));
        assert!(!is_valid_code_point(0x110000));
    }
}
