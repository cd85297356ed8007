//! Rule-based grapheme-to-phoneme conversion.
//!
//! Fully deterministic and self-contained: each word is first looked up in a
//! small curated dictionary (case-insensitive, trailing punctuation
//! stripped), then falls through to greedy longest-match substitution over
//! 3-, 2- and 1-character windows of per-language rule tables. Alphabetic
//! characters with no rule pass through unchanged; everything else is
//! dropped. Words longer than two phonemes receive a primary stress marker
//! before their first vowel.
//!
//! Unsupported language codes fall back to `en-us`. That fallback is a
//! policy decision, not a silent default: the output carries a
//! `used_fallback` flag so callers can surface it.

use std::collections::HashMap;

use once_cell::sync::Lazy;

/// Primary stress marker prefixed before the first vowel of longer words.
const STRESS: &str = "ˈ";

/// Characters treated as word-trailing punctuation and re-emitted verbatim.
const TRAIL_PUNCT: &[char] = &['.', ',', '!', '?', ';', ':'];

/// First code points that mark a phoneme as a vowel.
const VOWEL_STARTS: &str = "aeiouɑɐɒæɔəɚɛɜɨɪɯøœʊʌɤᵻ";

struct LangRules {
    dictionary: HashMap<&'static str, &'static str>,
    trigraphs: HashMap<&'static str, &'static str>,
    digraphs: HashMap<&'static str, &'static str>,
    singles: HashMap<char, &'static str>,
}

impl LangRules {
    fn new(
        dictionary: &[(&'static str, &'static str)],
        trigraphs: &[(&'static str, &'static str)],
        digraphs: &[(&'static str, &'static str)],
        singles: &[(char, &'static str)],
    ) -> Self {
        Self {
            dictionary: dictionary.iter().copied().collect(),
            trigraphs: trigraphs.iter().copied().collect(),
            digraphs: digraphs.iter().copied().collect(),
            singles: singles.iter().copied().collect(),
        }
    }
}

const DICT_EN_US: &[(&str, &str)] = &[
    ("a", "ə"),
    ("an", "ən"),
    ("and", "ænd"),
    ("are", "ɑːɹ"),
    ("do", "duː"),
    ("does", "dʌz"),
    ("for", "fɔːɹ"),
    ("have", "hæv"),
    ("he", "hiː"),
    ("hello", "həloʊ"),
    ("his", "hɪz"),
    ("is", "ɪz"),
    ("it", "ɪt"),
    ("of", "ʌv"),
    ("one", "wʌn"),
    ("said", "sɛd"),
    ("she", "ʃiː"),
    ("test", "tɛst"),
    ("that", "ðæt"),
    ("the", "ðə"),
    ("there", "ðɛə"),
    ("they", "ðeɪ"),
    ("this", "ðɪs"),
    ("to", "tuː"),
    ("two", "tuː"),
    ("was", "wʌz"),
    ("were", "wɜːɹ"),
    ("what", "wʌt"),
    ("who", "huː"),
    ("with", "wɪð"),
    ("world", "wɜːld"),
    ("you", "juː"),
    ("your", "jɔːɹ"),
];

const TRIGRAPHS_EN: &[(&str, &str)] = &[
    ("tch", "ʧ"),
    ("dge", "ʤ"),
    ("igh", "aɪ"),
    ("eau", "oʊ"),
    ("sch", "sk"),
];

const DIGRAPHS_EN_US: &[(&str, &str)] = &[
    ("ch", "ʧ"),
    ("sh", "ʃ"),
    ("th", "θ"),
    ("ph", "f"),
    ("wh", "w"),
    ("ng", "ŋ"),
    ("ck", "k"),
    ("qu", "kw"),
    ("kn", "n"),
    ("wr", "ɹ"),
    ("ee", "iː"),
    ("ea", "iː"),
    ("oo", "uː"),
    ("ou", "aʊ"),
    ("ow", "aʊ"),
    ("ai", "eɪ"),
    ("ay", "eɪ"),
    ("oa", "oʊ"),
    ("oi", "ɔɪ"),
    ("oy", "ɔɪ"),
    ("au", "ɔː"),
    ("aw", "ɔː"),
    ("ar", "ɑːɹ"),
    ("er", "ɚ"),
    ("ir", "ɜː"),
    ("or", "ɔːɹ"),
    ("ur", "ɜː"),
];

const SINGLES_EN: &[(char, &str)] = &[
    ('a', "æ"),
    ('b', "b"),
    ('c', "k"),
    ('d', "d"),
    ('e', "ɛ"),
    ('f', "f"),
    ('g', "ɡ"),
    ('h', "h"),
    ('i', "ɪ"),
    ('j', "ʤ"),
    ('k', "k"),
    ('l', "l"),
    ('m', "m"),
    ('n', "n"),
    ('o', "ɒ"),
    ('p', "p"),
    ('q', "k"),
    ('r', "ɹ"),
    ('s', "s"),
    ('t', "t"),
    ('u', "ʌ"),
    ('v', "v"),
    ('w', "w"),
    ('x', "ks"),
    ('y', "j"),
    ('z', "z"),
];

// British English shares the consonant inventory; the differences that
// matter at this granularity are rhoticity and a couple of vowels.
const DIGRAPHS_EN_GB: &[(&str, &str)] = &[
    ("ch", "ʧ"),
    ("sh", "ʃ"),
    ("th", "θ"),
    ("ph", "f"),
    ("wh", "w"),
    ("ng", "ŋ"),
    ("ck", "k"),
    ("qu", "kw"),
    ("kn", "n"),
    ("wr", "ɹ"),
    ("ee", "iː"),
    ("ea", "iː"),
    ("oo", "uː"),
    ("ou", "aʊ"),
    ("ow", "aʊ"),
    ("ai", "eɪ"),
    ("ay", "eɪ"),
    ("oa", "oʊ"),
    ("oi", "ɔɪ"),
    ("oy", "ɔɪ"),
    ("au", "ɔː"),
    ("aw", "ɔː"),
    ("ar", "ɑː"),
    ("er", "ə"),
    ("ir", "ɜː"),
    ("or", "ɔː"),
    ("ur", "ɜː"),
];

const DICT_EN_GB: &[(&str, &str)] = &[
    ("a", "ə"),
    ("an", "ən"),
    ("and", "ænd"),
    ("are", "ɑː"),
    ("for", "fɔː"),
    ("hello", "hɛloʊ"),
    ("is", "ɪz"),
    ("the", "ðə"),
    ("there", "ðɛə"),
    ("to", "tuː"),
    ("world", "wɜːld"),
    ("you", "juː"),
    ("your", "jɔː"),
];

static RULES_EN_US: Lazy<LangRules> =
    Lazy::new(|| LangRules::new(DICT_EN_US, TRIGRAPHS_EN, DIGRAPHS_EN_US, SINGLES_EN));

static RULES_EN_GB: Lazy<LangRules> =
    Lazy::new(|| LangRules::new(DICT_EN_GB, TRIGRAPHS_EN, DIGRAPHS_EN_GB, SINGLES_EN));

/// Phonemization result: the phoneme string plus whether the requested
/// language was unsupported and `en-us` was substituted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhonemeOutput {
    pub phonemes: String,
    pub used_fallback: bool,
}

fn resolve_language(lang: &str) -> (&'static LangRules, bool) {
    match lang.to_ascii_lowercase().as_str() {
        "en-us" | "en" => (&RULES_EN_US, false),
        "en-gb" => (&RULES_EN_GB, false),
        other => {
            log::warn!("Unsupported language '{other}', falling back to en-us");
            (&RULES_EN_US, true)
        }
    }
}

/// Convert normalized text to a phoneme string for the given language code.
///
/// Word boundaries are preserved as single spaces; output is truncated to
/// `max_len` characters.
pub fn phonemize(text: &str, lang: &str, max_len: usize) -> PhonemeOutput {
    let (rules, used_fallback) = resolve_language(lang);

    let mut words: Vec<String> = Vec::new();
    for raw_word in text.split_whitespace() {
        let (core, trail) = split_trailing_punctuation(raw_word);
        let mut out = String::new();
        if !core.is_empty() {
            let units = word_to_phonemes(&core.to_lowercase(), rules);
            out.push_str(&join_with_stress(&units));
        }
        out.push_str(&trail);
        if !out.is_empty() {
            words.push(out);
        }
    }

    let mut phonemes = words.join(" ");
    if phonemes.chars().count() > max_len {
        log::debug!(
            "Phoneme string exceeded limit ({} > {max_len}), truncating",
            phonemes.chars().count()
        );
        phonemes = phonemes.chars().take(max_len).collect();
    }

    PhonemeOutput {
        phonemes,
        used_fallback,
    }
}

fn split_trailing_punctuation(word: &str) -> (String, String) {
    let mut core: Vec<char> = word.chars().collect();
    let mut trail = String::new();
    while let Some(&last) = core.last() {
        if TRAIL_PUNCT.contains(&last) {
            trail.insert(0, last);
            core.pop();
        } else {
            break;
        }
    }
    (core.into_iter().collect(), trail)
}

/// Phonemes for one lowercased word: dictionary first, then greedy
/// longest-match over 3-, 2- and 1-character windows.
fn word_to_phonemes(word: &str, rules: &LangRules) -> Vec<&'static str> {
    if let Some(&ipa) = rules.dictionary.get(word) {
        return vec![ipa];
    }

    let chars: Vec<char> = word.chars().collect();
    let mut units: Vec<&'static str> = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        if i + 3 <= chars.len() {
            let window: String = chars[i..i + 3].iter().collect();
            if let Some(&ipa) = rules.trigraphs.get(window.as_str()) {
                units.push(ipa);
                i += 3;
                continue;
            }
        }
        if i + 2 <= chars.len() {
            let window: String = chars[i..i + 2].iter().collect();
            if let Some(&ipa) = rules.digraphs.get(window.as_str()) {
                units.push(ipa);
                i += 2;
                continue;
            }
        }
        let ch = chars[i];
        if let Some(&ipa) = rules.singles.get(&ch) {
            units.push(ipa);
        } else if ch.is_alphabetic() {
            // No rule but still a letter: pass it through rather than drop it.
            units.push(pass_through(ch));
        }
        i += 1;
    }
    units
}

/// Interned single-character pass-through for alphabetic input the rule
/// tables do not cover (the vocabulary carries plain letters too).
fn pass_through(ch: char) -> &'static str {
    static ASCII: Lazy<Vec<String>> =
        Lazy::new(|| (0u8..128).map(|b| (b as char).to_string()).collect());
    if ch.is_ascii() {
        &ASCII[ch as usize]
    } else {
        // Rare non-ASCII letters surviving normalization are dropped.
        ""
    }
}

/// Join phoneme units, prefixing a stress marker before the first vowel of
/// words longer than two phonemes.
fn join_with_stress(units: &[&str]) -> String {
    let units: Vec<&str> = units.iter().copied().filter(|u| !u.is_empty()).collect();
    let mut out = String::new();
    let stress_target = if units.len() > 2 {
        units.iter().position(|u| {
            u.chars()
                .next()
                .map(|c| VOWEL_STARTS.contains(c))
                .unwrap_or(false)
        })
    } else {
        None
    };
    for (i, unit) in units.iter().enumerate() {
        if Some(i) == stress_target {
            out.push_str(STRESS);
        }
        out.push_str(unit);
    }
    out
}
