//! Symbol-to-id vocabulary shared by every engine family.
//!
//! The table maps symbols of one to three Unicode code points (letters,
//! punctuation, IPA phonemes including digraphs like `eɪ` and `iː`) to
//! non-negative integer ids. Id 0 is the pad symbol, id 1 the unknown
//! symbol. Built once at startup and shared read-only thereafter.

use std::collections::HashMap;
use std::path::Path;

use crate::error::SynthesisError;

/// Pad symbol, always id 0.
const PAD: &str = "$";

/// Unknown symbol, always id 1. Unmatched input characters map here.
const UNKNOWN: &str = "□";

/// Punctuation entries, one code point each.
const PUNCTUATION: &[&str] = &[
    ";", ":", ",", ".", "!", "?", "¡", "¿", "—", "…", "\"", "«", "»",
    "\u{201c}", "\u{201d}", "(", ")", " ",
];

/// ASCII letters.
const LETTERS: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Single-code-point IPA phonemes.
const IPA_SINGLE: &[&str] = &[
    "ɑ", "ɐ", "ɒ", "æ", "β", "ɔ", "ɕ", "ç", "ɖ", "ð", "ʤ", "ə", "ɚ", "ɛ",
    "ɜ", "ɟ", "ɡ", "ɥ", "ɨ", "ɪ", "ʝ", "ɯ", "ɰ", "ŋ", "ɳ", "ɲ", "ɴ", "ø",
    "ɸ", "θ", "œ", "ɹ", "ɾ", "ɻ", "ʁ", "ɽ", "ʂ", "ʃ", "ʈ", "ʧ", "ʊ", "ʋ",
    "ʌ", "ɣ", "ɤ", "χ", "ʎ", "ʒ", "ʔ", "ˈ", "ˌ", "ː", "ʰ", "ʲ", "↓", "→",
    "↗", "↘", "ᵻ", "ᵊ",
];

/// Multi-code-point phonemes (diphthongs and length-marked vowels).
///
/// Greedy longest-match tokenization depends on these being present: a
/// phonemizer emitting `eɪ` must tokenize to one id, not two.
const IPA_MULTI: &[&str] = &[
    "eɪ", "aɪ", "ɔɪ", "aʊ", "oʊ", "ɪə", "eə", "ʊə", "iː", "uː", "ɑː", "ɔː",
    "ɜː", "əl", "ɛə",
];

/// Immutable symbol → id table.
///
/// Symbols are 1–3 Unicode code points. The id space is dense: ids run from
/// 0 to `len() - 1` in insertion order.
pub struct Vocabulary {
    map: HashMap<String, i64>,
    max_symbol_chars: usize,
}

impl Vocabulary {
    /// Build the built-in vocabulary used when a model ships no config.
    pub fn builtin() -> Self {
        let mut symbols: Vec<String> = Vec::new();
        symbols.push(PAD.to_string());
        symbols.push(UNKNOWN.to_string());
        symbols.extend(PUNCTUATION.iter().map(|s| s.to_string()));
        symbols.extend(LETTERS.chars().map(|c| c.to_string()));
        symbols.extend(IPA_SINGLE.iter().map(|s| s.to_string()));
        symbols.extend(IPA_MULTI.iter().map(|s| s.to_string()));
        Self::from_symbols(symbols)
    }

    fn from_symbols(symbols: Vec<String>) -> Self {
        let max_symbol_chars = symbols
            .iter()
            .map(|s| s.chars().count())
            .max()
            .unwrap_or(1);
        let map = symbols
            .into_iter()
            .enumerate()
            .map(|(i, s)| (s, i as i64))
            .collect();
        Self {
            map,
            max_symbol_chars,
        }
    }

    /// Load a vocabulary from a model-shipped `config.json` string.
    ///
    /// The config must contain a `"vocab"` object mapping symbol strings
    /// (1–3 code points) to integer ids.
    pub fn from_config_str(content: &str) -> Result<Self, SynthesisError> {
        let json: serde_json::Value = serde_json::from_str(content)
            .map_err(|e| SynthesisError::Config(format!("Failed to parse JSON: {e}")))?;

        let vocab_obj = json
            .get("vocab")
            .ok_or_else(|| SynthesisError::Config("Missing 'vocab' field".to_string()))?
            .as_object()
            .ok_or_else(|| SynthesisError::Config("'vocab' must be an object".to_string()))?;

        let mut map = HashMap::new();
        let mut max_symbol_chars = 1;
        for (k, v) in vocab_obj {
            let nchars = k.chars().count();
            if nchars == 0 || nchars > 3 {
                return Err(SynthesisError::Config(format!(
                    "Symbol {k:?} must be 1-3 code points"
                )));
            }
            let id = v.as_i64().ok_or_else(|| {
                SynthesisError::Config(format!("Non-integer vocab value for key {k:?}"))
            })?;
            if id < 0 {
                return Err(SynthesisError::Config(format!(
                    "Negative id {id} for key {k:?}"
                )));
            }
            max_symbol_chars = max_symbol_chars.max(nchars);
            map.insert(k.clone(), id);
        }

        if !map.contains_key(PAD) {
            return Err(SynthesisError::Config("Missing pad symbol '$'".to_string()));
        }

        Ok(Self {
            map,
            max_symbol_chars,
        })
    }

    /// Load a vocabulary from a `config.json` file on disk.
    pub fn from_config_json(path: &Path) -> Result<Self, SynthesisError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_config_str(&content)
    }

    /// Look up a symbol. Symbols may be 1–3 code points long.
    pub fn id(&self, symbol: &str) -> Option<i64> {
        self.map.get(symbol).copied()
    }

    /// Id of the pad symbol (0 for the built-in table).
    pub fn pad_id(&self) -> i64 {
        self.map.get(PAD).copied().unwrap_or(0)
    }

    /// Id unmatched characters map to.
    pub fn unknown_id(&self) -> i64 {
        self.map.get(UNKNOWN).copied().unwrap_or(1)
    }

    /// Longest symbol length in code points (bounds the tokenizer's window).
    pub fn max_symbol_chars(&self) -> usize {
        self.max_symbol_chars
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_pad_is_zero() {
        let v = Vocabulary::builtin();
        assert_eq!(v.id("$"), Some(0));
        assert_eq!(v.pad_id(), 0);
    }

    #[test]
    fn builtin_unknown_is_one() {
        let v = Vocabulary::builtin();
        assert_eq!(v.unknown_id(), 1);
    }

    #[test]
    fn builtin_covers_letters_and_punctuation() {
        let v = Vocabulary::builtin();
        for ch in "ABCZabcz".chars() {
            assert!(v.id(&ch.to_string()).is_some(), "missing letter {ch}");
        }
        for p in [";", ":", ",", ".", "!", "?", " "] {
            assert!(v.id(p).is_some(), "missing punctuation {p:?}");
        }
    }

    #[test]
    fn builtin_has_multi_char_phonemes() {
        let v = Vocabulary::builtin();
        assert!(v.id("eɪ").is_some());
        assert!(v.id("iː").is_some());
        assert!(v.max_symbol_chars() >= 2);
    }

    #[test]
    fn builtin_ids_are_unique() {
        let v = Vocabulary::builtin();
        let mut seen = std::collections::HashSet::new();
        for id in v.map.values() {
            assert!(seen.insert(*id), "duplicate id {id}");
        }
    }

    #[test]
    fn config_json_roundtrip() {
        let v = Vocabulary::from_config_str(
            r#"{"vocab": {"$": 0, "□": 1, "a": 2, "eɪ": 3}}"#,
        )
        .unwrap();
        assert_eq!(v.id("a"), Some(2));
        assert_eq!(v.id("eɪ"), Some(3));
        assert_eq!(v.max_symbol_chars(), 2);
    }

    #[test]
    fn config_rejects_long_symbols() {
        let result = Vocabulary::from_config_str(r#"{"vocab": {"$": 0, "abcd": 2}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn config_requires_pad() {
        let result = Vocabulary::from_config_str(r#"{"vocab": {"a": 2}}"#);
        assert!(result.is_err());
    }
}
