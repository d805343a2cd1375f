use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Case-fold and clean raw document text.
///
/// Diacritics are dropped after NFKD decomposition. Punctuation, symbols and
/// digits are deleted outright (no separator is inserted), so `"anak-anak"`
/// becomes `"anakanak"`. Runs of whitespace collapse to a single space.
pub fn normalize(text: &str) -> String {
    let mut cleaned = String::with_capacity(text.len());
    for c in text.nfkd().filter(|c| !is_combining_mark(*c)) {
        if c.is_whitespace() {
            cleaned.push(' ');
        } else if c.is_alphabetic() {
            cleaned.extend(c.to_lowercase());
        }
    }
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}
