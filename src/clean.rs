use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

// Bullet glyphs from text extraction (U+F0B7 is the Symbol-font bullet).
const BULLETS: &[char] = &['\u{2022}', '\u{f0b7}'];

static DISALLOWED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\t\n\r\x20-\x7EÄÖÜäöüß€]").unwrap());
static BLANK_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());
static STRAY_E_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^e[ \t]*$").unwrap());

/// Normalise raw page text: NFKC composition, bullets to `-`, drop characters
/// outside the printable-ASCII/German whitelist, blank out the lone `e` lines
/// OCR leaves behind and squeeze blank runs to one empty line.
pub fn clean_text(text: &str) -> String {
    let normalised: String = text
        .nfkc()
        .map(|c| if BULLETS.contains(&c) { '-' } else { c })
        .collect();
    let sanitized = DISALLOWED_RE.replace_all(&normalised, "");
    let sanitized = STRAY_E_RE.replace_all(&sanitized, "");
    let sanitized = BLANK_RUN_RE.replace_all(&sanitized, "\n\n");
    sanitized.trim().to_string()
}
