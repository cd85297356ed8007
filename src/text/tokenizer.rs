//! Phoneme-string tokenization against the shared vocabulary.
//!
//! Greedy longest-match: at each cursor position try the 3-, then 2-, then
//! 1-code-point substring against the vocabulary and advance by the matched
//! length. Characters with no match map to the unknown id and advance by
//! one. Tokenization never fails and the output never exceeds the input
//! character count (plus two when pad-wrapped).

use super::vocab::Vocabulary;

/// Map a phoneme string to vocabulary ids.
pub fn tokenize(phonemes: &str, vocab: &Vocabulary) -> Vec<i64> {
    let chars: Vec<char> = phonemes.chars().collect();
    let max_window = vocab.max_symbol_chars().min(3).max(1);
    let mut ids = Vec::with_capacity(chars.len());

    let mut i = 0;
    while i < chars.len() {
        let mut matched = false;
        let longest = max_window.min(chars.len() - i);
        for window in (1..=longest).rev() {
            let symbol: String = chars[i..i + window].iter().collect();
            if let Some(id) = vocab.id(&symbol) {
                ids.push(id);
                i += window;
                matched = true;
                break;
            }
        }
        if !matched {
            ids.push(vocab.unknown_id());
            i += 1;
        }
    }
    ids
}

/// Wrap a token sequence with start/end pad ids.
///
/// Engine family B models expect `[pad, t1..tN, pad]`; family A engines call
/// this too before building their input tensor.
pub fn wrap_with_pads(ids: &[i64], vocab: &Vocabulary) -> Vec<i64> {
    let mut wrapped = Vec::with_capacity(ids.len() + 2);
    wrapped.push(vocab.pad_id());
    wrapped.extend_from_slice(ids);
    wrapped.push(vocab.pad_id());
    wrapped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letters_tokenize_non_empty() {
        let vocab = Vocabulary::builtin();
        let ids = tokenize("abc", &vocab);
        assert_eq!(ids.len(), 3);
        assert!(ids.iter().all(|&id| id != vocab.unknown_id()));
    }

    #[test]
    fn multi_char_phonemes_match_greedily() {
        let vocab = Vocabulary::builtin();
        // "eɪ" must become one id, not two.
        let ids = tokenize("eɪ", &vocab);
        assert_eq!(ids.len(), 1);
        assert_eq!(ids[0], vocab.id("eɪ").unwrap());
    }

    #[test]
    fn length_never_exceeds_input() {
        let vocab = Vocabulary::builtin();
        for input in ["həloʊ wɜːld", "aaa", "ˈtɛst!", ""] {
            let nchars = input.chars().count();
            let ids = tokenize(input, &vocab);
            assert!(ids.len() <= nchars, "{input:?}: {} > {nchars}", ids.len());
            let wrapped = wrap_with_pads(&ids, &vocab);
            assert!(wrapped.len() <= nchars + 2);
        }
    }

    #[test]
    fn unknown_characters_map_to_unknown_id() {
        let vocab = Vocabulary::builtin();
        let ids = tokenize("中", &vocab);
        assert_eq!(ids, vec![vocab.unknown_id()]);
    }

    #[test]
    fn wrapping_adds_pads_at_both_ends() {
        let vocab = Vocabulary::builtin();
        let ids = tokenize("ab", &vocab);
        let wrapped = wrap_with_pads(&ids, &vocab);
        assert_eq!(wrapped.first(), Some(&vocab.pad_id()));
        assert_eq!(wrapped.last(), Some(&vocab.pad_id()));
        assert_eq!(wrapped.len(), ids.len() + 2);
    }

    #[test]
    fn empty_input_yields_empty_output() {
        let vocab = Vocabulary::builtin();
        assert!(tokenize("", &vocab).is_empty());
    }
}
