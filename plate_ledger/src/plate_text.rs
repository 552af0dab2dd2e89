//! Cleaning and validation of recognized plate text.

use lazy_static::lazy_static;
use regex::Regex;

/// Known OCR confusions, applied in order over the whole string.
pub const CORRECTIONS: [(&str, &str); 4] = [("LN", "TN"), ("lN", "TN"), ("lM", "TN"), ("IN", "TN")];

lazy_static! {
    static ref NON_WORD: Regex = Regex::new(r"\W+").expect("static regex");
    static ref PLATE_GRAMMAR: Regex =
        Regex::new(r"^[A-Z]{2}[0-9]{1,2}[A-Z]{1,2}[0-9]{4}$").expect("static regex");
}

/// Strips surrounding whitespace and every non-word character, then applies
/// the correction table.
pub fn normalize(raw: &str) -> String {
    let mut plate = NON_WORD.replace_all(raw.trim(), "").into_owned();
    for (wrong, correct) in CORRECTIONS {
        if plate.contains(wrong) {
            plate = plate.replace(wrong, correct);
        }
    }
    plate
}

/// Full match against the plate grammar: two letters, one or two digits,
/// one or two letters, four digits.
pub fn is_valid_plate(text: &str) -> bool {
    PLATE_GRAMMAR.is_match(text)
}
