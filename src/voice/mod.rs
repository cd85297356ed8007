//! Voice catalog and style-embedding lookup.
//!
//! A voice carries a language, an engine family, and a style embedding.
//! Single-shot voices hold exactly one 256-float vector. Windowed voices
//! hold a flat buffer of row-major 256-float vectors addressed by phoneme
//! token count: `offset = clamp(token_count, 0, 509) * 256`. The windowed
//! models were exported with one style row per token count, so the lookup
//! key is the token count itself.

pub mod archive;

use std::collections::HashMap;

use serde::Deserialize;

use crate::error::SynthesisError;

/// Style vector dimension shared by both engine families.
pub const STYLE_DIM: usize = 256;

/// Highest token count used for windowed style addressing.
const MAX_STYLE_INDEX: usize = 509;

/// The two incompatible model input conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineFamily {
    /// One inference call per request; speed consumed in-model.
    SingleShot,
    /// One inference call per chunk; style broadcast across the context
    /// window; speed applied in post-processing.
    Windowed,
}

impl EngineFamily {
    /// Context window the family's reference models ship with, including the
    /// two pad slots.
    pub fn default_context_window(self) -> usize {
        match self {
            EngineFamily::SingleShot => 402,
            EngineFamily::Windowed => 512,
        }
    }
}

/// One catalog entry: metadata plus the style embedding.
#[derive(Debug, Clone)]
pub struct Voice {
    pub id: String,
    pub language: String,
    pub family: EngineFamily,
    pub gender: Option<String>,
    pub quality: Option<String>,
    embedding: Vec<f32>,
}

impl Voice {
    /// Construct a voice, validating the embedding against its family.
    pub fn new(
        id: impl Into<String>,
        language: impl Into<String>,
        family: EngineFamily,
        embedding: Vec<f32>,
    ) -> Result<Self, SynthesisError> {
        let id = id.into();
        match family {
            EngineFamily::SingleShot if embedding.len() != STYLE_DIM => {
                return Err(SynthesisError::VoiceParse(format!(
                    "{id}: single-shot embedding must be {STYLE_DIM} floats, got {}",
                    embedding.len()
                )));
            }
            EngineFamily::Windowed
                if embedding.is_empty() || embedding.len() % STYLE_DIM != 0 =>
            {
                return Err(SynthesisError::VoiceParse(format!(
                    "{id}: windowed embedding length {} is not a positive multiple of {STYLE_DIM}",
                    embedding.len()
                )));
            }
            _ => {}
        }
        Ok(Self {
            id,
            language: language.into(),
            family,
            gender: None,
            quality: None,
            embedding,
        })
    }

    pub fn with_metadata(mut self, gender: Option<String>, quality: Option<String>) -> Self {
        self.gender = gender;
        self.quality = quality;
        self
    }

    /// Raw embedding buffer (one vector, or row-major rows for windowed).
    pub fn embedding(&self) -> &[f32] {
        &self.embedding
    }
}

/// Read-only catalog of voices, populated once at startup.
#[derive(Default)]
pub struct VoiceStore {
    voices: HashMap<String, Voice>,
}

impl VoiceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a voice. Later registrations replace earlier ones with the
    /// same id, with a logged warning.
    pub fn register(&mut self, voice: Voice) {
        if self.voices.contains_key(&voice.id) {
            log::warn!("Voice '{}' registered twice, replacing", voice.id);
        }
        self.voices.insert(voice.id.clone(), voice);
    }

    pub fn get(&self, voice_id: &str) -> Option<&Voice> {
        self.voices.get(voice_id)
    }

    pub fn has_embedding(&self, voice_id: &str) -> bool {
        self.voices
            .get(voice_id)
            .map(|v| !v.embedding.is_empty())
            .unwrap_or(false)
    }

    /// All voice ids in sorted order.
    pub fn list_voices(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.voices.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.voices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }

    /// Resolve the 256-float style vector to feed the model for this voice
    /// and token count.
    ///
    /// Single-shot voices ignore `token_count`. Windowed voices slice the
    /// flat buffer at `clamp(token_count, 0, 509) * 256`; if that offset
    /// would overrun the buffer the first row is used instead.
    pub fn resolve_style_vector(
        &self,
        voice_id: &str,
        token_count: usize,
    ) -> Result<[f32; STYLE_DIM], SynthesisError> {
        let voice = self
            .voices
            .get(voice_id)
            .ok_or_else(|| SynthesisError::VoiceNotFound(voice_id.to_string()))?;
        if voice.embedding.is_empty() {
            return Err(SynthesisError::EmbeddingMissing(voice_id.to_string()));
        }

        let slice = match voice.family {
            EngineFamily::SingleShot => &voice.embedding[..STYLE_DIM],
            EngineFamily::Windowed => {
                let offset = token_count.min(MAX_STYLE_INDEX) * STYLE_DIM;
                if offset + STYLE_DIM <= voice.embedding.len() {
                    &voice.embedding[offset..offset + STYLE_DIM]
                } else {
                    log::debug!(
                        "Voice '{voice_id}': style offset {offset} overruns buffer ({}), using first row",
                        voice.embedding.len()
                    );
                    &voice.embedding[..STYLE_DIM]
                }
            }
        };

        let mut out = [0f32; STYLE_DIM];
        out.copy_from_slice(slice);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn windowed_voice(rows: usize) -> Voice {
        // Row i is filled with the value i so slices are recognizable.
        let mut buf = Vec::with_capacity(rows * STYLE_DIM);
        for i in 0..rows {
            buf.extend(std::iter::repeat(i as f32).take(STYLE_DIM));
        }
        Voice::new("kkr_test", "en-us", EngineFamily::Windowed, buf).unwrap()
    }

    #[test]
    fn single_shot_embedding_must_be_256() {
        assert!(Voice::new("v", "en-us", EngineFamily::SingleShot, vec![0.0; 256]).is_ok());
        assert!(Voice::new("v", "en-us", EngineFamily::SingleShot, vec![0.0; 255]).is_err());
    }

    #[test]
    fn windowed_embedding_must_be_multiple_of_256() {
        assert!(Voice::new("v", "en-us", EngineFamily::Windowed, vec![0.0; 512]).is_ok());
        assert!(Voice::new("v", "en-us", EngineFamily::Windowed, vec![0.0; 300]).is_err());
        assert!(Voice::new("v", "en-us", EngineFamily::Windowed, vec![]).is_err());
    }

    #[test]
    fn style_offset_follows_token_count() {
        let mut store = VoiceStore::new();
        store.register(windowed_voice(8));
        let style = store.resolve_style_vector("kkr_test", 3).unwrap();
        assert_eq!(style[0], 3.0);
        assert_eq!(style[255], 3.0);
    }

    #[test]
    fn style_offset_is_clamped_to_509() {
        let mut store = VoiceStore::new();
        store.register(windowed_voice(600));
        let style = store.resolve_style_vector("kkr_test", 10_000).unwrap();
        assert_eq!(style[0], 509.0);
    }

    #[test]
    fn overrunning_offset_falls_back_to_first_row() {
        let mut store = VoiceStore::new();
        store.register(windowed_voice(4));
        let style = store.resolve_style_vector("kkr_test", 100).unwrap();
        assert_eq!(style[0], 0.0);
    }

    #[test]
    fn single_shot_ignores_token_count() {
        let mut store = VoiceStore::new();
        let v = Voice::new("ktn_a", "en-us", EngineFamily::SingleShot, vec![0.5; 256]).unwrap();
        store.register(v);
        let a = store.resolve_style_vector("ktn_a", 0).unwrap();
        let b = store.resolve_style_vector("ktn_a", 400).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn missing_voice_is_an_error() {
        let store = VoiceStore::new();
        assert!(matches!(
            store.resolve_style_vector("ghost", 1),
            Err(SynthesisError::VoiceNotFound(_))
        ));
        assert!(store.get("ghost").is_none());
        assert!(!store.has_embedding("ghost"));
    }

    #[test]
    fn list_voices_is_sorted() {
        let mut store = VoiceStore::new();
        store.register(
            Voice::new("ktn_b", "en-us", EngineFamily::SingleShot, vec![0.0; 256]).unwrap(),
        );
        store.register(
            Voice::new("ktn_a", "en-us", EngineFamily::SingleShot, vec![0.0; 256]).unwrap(),
        );
        assert_eq!(store.list_voices(), vec!["ktn_a", "ktn_b"]);
    }
}
