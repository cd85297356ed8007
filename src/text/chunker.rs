//! Splits a synthesis request into model-sized chunks.
//!
//! Raw text is segmented on sentence-ending punctuation and on explicit
//! `<break time="0.5s"/>` pause directives. Each segment is phonemized and
//! tokenized, then windowed so no chunk exceeds the engine's context window
//! minus the start/end padding reserve. A short implicit pause is inserted
//! between adjacent text chunks that have no explicit pause, to avoid
//! run-on speech. Chunk order is deterministic.

use once_cell::sync::Lazy;
use regex::Regex;

use super::phonemizer;
use super::tokenizer;
use super::vocab::Vocabulary;

/// Pause inserted between adjacent text chunks with no explicit break.
const IMPLICIT_PAUSE_S: f32 = 0.2;

/// Explicit pause durations are clamped into this range.
const MAX_PAUSE_S: f32 = 5.0;

static RE_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<break\s+time="(\d+(?:\.\d+)?)(ms|s)"\s*/>"#).unwrap());

/// One unit of synthesis work: tokens to run through a model, or silence to
/// emit directly. Consumed once, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum TextChunk {
    Text { tokens: Vec<i64> },
    Silence { duration_s: f32 },
}

/// Engine-facing limits the chunker must respect.
#[derive(Debug, Clone)]
pub struct ChunkerConfig {
    /// Maximum tokens a single model invocation accepts.
    pub context_window: usize,
    /// Token slots reserved for start/end pads inside the window.
    pub reserved_padding: usize,
    /// Phonemizer output cap per segment, in characters.
    pub max_phoneme_chars: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            context_window: 512,
            reserved_padding: 2,
            max_phoneme_chars: 510,
        }
    }
}

impl ChunkerConfig {
    fn max_tokens(&self) -> usize {
        self.context_window.saturating_sub(self.reserved_padding).max(1)
    }
}

/// Ordered chunk sequence plus aggregate diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkPlan {
    pub chunks: Vec<TextChunk>,
    /// True when any segment was phonemized with the en-us fallback tables.
    pub used_language_fallback: bool,
}

/// Split `text` into an ordered chunk sequence for the given language.
pub fn chunk_text(
    text: &str,
    lang: &str,
    vocab: &Vocabulary,
    cfg: &ChunkerConfig,
) -> ChunkPlan {
    let mut chunks: Vec<TextChunk> = Vec::new();
    let mut used_language_fallback = false;
    let mut last_was_text = false;

    let push_text = |chunks: &mut Vec<TextChunk>, tokens: Vec<i64>, last_was_text: &mut bool| {
        if tokens.is_empty() {
            return;
        }
        if *last_was_text {
            chunks.push(TextChunk::Silence {
                duration_s: IMPLICIT_PAUSE_S,
            });
        }
        chunks.push(TextChunk::Text { tokens });
        *last_was_text = true;
    };

    let mut cursor = 0;
    for caps in RE_BREAK.captures_iter(text) {
        let Some(m) = caps.get(0) else { continue };
        let segment = &text[cursor..m.start()];
        for tokens in segment_tokens(segment, lang, vocab, cfg, &mut used_language_fallback) {
            push_text(&mut chunks, tokens, &mut last_was_text);
        }

        let value: f32 = caps[1].parse().unwrap_or(0.0);
        let seconds = match &caps[2] {
            "ms" => value / 1000.0,
            _ => value,
        };
        let duration_s = seconds.clamp(0.0, MAX_PAUSE_S);
        chunks.push(TextChunk::Silence { duration_s });
        last_was_text = false;

        cursor = m.end();
    }
    for tokens in segment_tokens(&text[cursor..], lang, vocab, cfg, &mut used_language_fallback) {
        push_text(&mut chunks, tokens, &mut last_was_text);
    }

    ChunkPlan {
        chunks,
        used_language_fallback,
    }
}

/// Tokenize one directive-free segment: sentence split, phonemize, window.
fn segment_tokens(
    segment: &str,
    lang: &str,
    vocab: &Vocabulary,
    cfg: &ChunkerConfig,
    used_language_fallback: &mut bool,
) -> Vec<Vec<i64>> {
    let mut out = Vec::new();
    for sentence in split_sentences(segment) {
        let phonemes = phonemizer::phonemize(&sentence, lang, cfg.max_phoneme_chars);
        *used_language_fallback |= phonemes.used_fallback;
        let ids = tokenizer::tokenize(&phonemes.phonemes, vocab);
        if ids.is_empty() {
            continue;
        }
        for window in ids.chunks(cfg.max_tokens()) {
            out.push(window.to_vec());
        }
    }
    out
}

/// Split on sentence-ending punctuation, keeping the terminator attached.
fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    for ch in text.chars() {
        current.push(ch);
        if matches!(ch, '.' | '!' | '?') {
            let trimmed = current.trim();
            if !trimmed.is_empty() {
                sentences.push(trimmed.to_string());
            }
            current.clear();
        }
    }
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        sentences.push(trimmed.to_string());
    }
    sentences
}
