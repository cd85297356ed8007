//! Text normalization.
//!
//! Cleans raw input before phonemization: accent folding, smart-quote and
//! ellipsis replacement, abbreviation expansion, small-number expansion,
//! spoken forms for `&`, `@`, `%` and currency symbols, control-character
//! stripping, whitespace collapsing, and a hard length cap.
//!
//! Normalization is a pure function and never fails; exotic input degrades
//! to stripping everything non-printable.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Hard cap on input length. Longer input is truncated and flagged.
pub const MAX_INPUT_CHARS: usize = 10_000;

const ONES: &[&str] = &[
    "zero", "one", "two", "three", "four", "five", "six", "seven", "eight",
    "nine", "ten", "eleven", "twelve", "thirteen", "fourteen", "fifteen",
    "sixteen", "seventeen", "eighteen", "nineteen",
];
const TENS: &[&str] = &[
    "", "", "twenty", "thirty", "forty", "fifty", "sixty", "seventy",
    "eighty", "ninety",
];

const ABBREVIATIONS: &[(&str, &str)] = &[
    ("Mr.", "Mister"),
    ("Mrs.", "Misses"),
    ("Ms.", "Miss"),
    ("Dr.", "Doctor"),
    ("Prof.", "Professor"),
    ("Jr.", "Junior"),
    ("Sr.", "Senior"),
    ("St.", "Saint"),
    ("vs.", "versus"),
    ("etc.", "etcetera"),
    ("e.g.", "for example"),
    ("i.e.", "that is"),
];

static RE_SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static RE_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").unwrap());

/// Result of normalization: cleaned text plus a truncation flag the caller
/// can surface to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedText {
    pub text: String,
    pub truncated: bool,
}

/// Normalize raw input text for synthesis.
pub fn normalize(text: &str) -> NormalizedText {
    let truncated = text.chars().count() > MAX_INPUT_CHARS;
    if truncated {
        log::warn!(
            "Input exceeded {MAX_INPUT_CHARS} characters, truncating"
        );
    }
    let text: String = text.chars().take(MAX_INPUT_CHARS).collect();

    let text = fold_unicode(&text);
    let text = expand_abbreviations(&text);
    let text = expand_symbols(&text);
    let text = expand_numbers(&text);
    let text = RE_SPACES.replace_all(text.trim(), " ").into_owned();

    NormalizedText { text, truncated }
}

/// Replace smart punctuation with ASCII, fold common accented Latin letters,
/// and drop control characters.
fn fold_unicode(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\u{2018}' | '\u{2019}' | '`' | '´' => out.push('\''),
            '\u{201c}' | '\u{201d}' | '«' | '»' => out.push('"'),
            '…' => out.push_str("..."),
            '—' | '–' => out.push_str(", "),
            'à' | 'á' | 'â' | 'ä' | 'ã' | 'å' => out.push('a'),
            'è' | 'é' | 'ê' | 'ë' => out.push('e'),
            'ì' | 'í' | 'î' | 'ï' => out.push('i'),
            'ò' | 'ó' | 'ô' | 'ö' | 'õ' => out.push('o'),
            'ù' | 'ú' | 'û' | 'ü' => out.push('u'),
            'ç' => out.push('c'),
            'ñ' => out.push('n'),
            'À' | 'Á' | 'Â' | 'Ä' | 'Ã' | 'Å' => out.push('A'),
            'È' | 'É' | 'Ê' | 'Ë' => out.push('E'),
            'Ç' => out.push('C'),
            'Ñ' => out.push('N'),
            // Whitespace (including \n, \t, \r, which are also control
            // characters) becomes a plain space; the later collapse pass
            // squeezes repeats.
            c if c.is_whitespace() => out.push(' '),
            c if c.is_control() => {}
            c => out.push(c),
        }
    }
    out
}

fn expand_abbreviations(text: &str) -> String {
    let mut out = text.to_string();
    for (abbr, expansion) in ABBREVIATIONS {
        out = out.replace(abbr, expansion);
    }
    out
}

fn expand_symbols(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str(" and "),
            '@' => out.push_str(" at "),
            '%' => out.push_str(" percent "),
            '$' => out.push_str(" dollars "),
            '€' => out.push_str(" euros "),
            '£' => out.push_str(" pounds "),
            '¥' => out.push_str(" yen "),
            '+' => out.push_str(" plus "),
            '=' => out.push_str(" equals "),
            c => out.push(c),
        }
    }
    out
}

/// Expand integers below 100 to words; larger numbers are read digit by digit.
fn expand_numbers(text: &str) -> String {
    RE_NUMBER
        .replace_all(text, |caps: &Captures| {
            let raw = &caps[0];
            match raw.parse::<u64>() {
                Ok(n) if n < 100 => small_number_to_words(n),
                _ => digits_to_words(raw),
            }
        })
        .into_owned()
}

fn small_number_to_words(n: u64) -> String {
    debug_assert!(n < 100);
    if n < 20 {
        ONES[n as usize].to_string()
    } else {
        let tens_word = TENS[(n / 10) as usize];
        let rest = n % 10;
        if rest == 0 {
            tens_word.to_string()
        } else {
            format!("{}-{}", tens_word, ONES[rest as usize])
        }
    }
}

fn digits_to_words(raw: &str) -> String {
    raw.chars()
        .filter_map(|c| c.to_digit(10))
        .map(|d| ONES[d as usize])
        .collect::<Vec<_>>()
        .join(" ")
}
