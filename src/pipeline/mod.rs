//! The synthesis orchestrator.
//!
//! [`Synthesizer`] drives one request through the fixed stage sequence:
//! normalize, chunk, per-chunk inference, post-process, encode. All of its
//! collaborators arrive through [`PipelineContext`] and `attach_engine`;
//! nothing is looked up globally. A failed chunk is logged and skipped, a
//! missing model session degrades to the synthetic generator, and only
//! "no audio possible" conditions reach the caller.

pub mod sink;
pub mod worker;

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use crossbeam::channel::Sender;
use derive_builder::Builder;

use crate::audio::{self, PostProcessor};
use crate::engine::fallback::SyntheticVoiceGenerator;
use crate::engine::InferenceEngine;
use crate::error::SynthesisError;
use crate::text::chunker::{self, ChunkerConfig, TextChunk};
use crate::text::normalizer;
use crate::text::vocab::Vocabulary;
use crate::voice::{EngineFamily, VoiceStore};

pub use worker::CancelToken;

/// Shared read-only collaborators the orchestrator is constructed with.
#[derive(Clone)]
pub struct PipelineContext {
    pub vocabulary: Arc<Vocabulary>,
    pub voices: Arc<VoiceStore>,
}

impl PipelineContext {
    pub fn new(vocabulary: Vocabulary, voices: VoiceStore) -> Self {
        Self {
            vocabulary: Arc::new(vocabulary),
            voices: Arc::new(voices),
        }
    }
}

/// One synthesis request.
///
/// `speed` and `pitch` are rate multipliers clamped to [0.5, 2.0] before
/// use; `language` overrides the voice's default language when set.
#[derive(Debug, Clone, Builder)]
#[builder(setter(into))]
pub struct SynthesisRequest {
    pub text: String,
    pub voice_id: String,
    #[builder(default = "1.0")]
    pub speed: f32,
    #[builder(default = "1.0")]
    pub pitch: f32,
    #[builder(default)]
    pub language: Option<String>,
}

impl SynthesisRequest {
    pub fn builder() -> SynthesisRequestBuilder {
        SynthesisRequestBuilder::default()
    }

    /// Shorthand for a plain request with default speed and pitch.
    pub fn new(text: impl Into<String>, voice_id: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            voice_id: voice_id.into(),
            speed: 1.0,
            pitch: 1.0,
            language: None,
        }
    }
}

/// Finished audio plus synthesis metadata.
#[derive(Debug, Clone)]
pub struct SynthesisResult {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub chunk_count: usize,
    pub processing_time_ms: u64,
}

impl SynthesisResult {
    pub fn duration_secs(&self) -> f32 {
        self.samples.len() as f32 / self.sample_rate as f32
    }

    /// Encode as 16-bit PCM bytes.
    pub fn to_pcm16(&self) -> Vec<u8> {
        audio::wav::encode_pcm16(&self.samples)
    }

    /// Encode as a complete in-memory WAV file.
    pub fn to_wav_bytes(&self) -> Vec<u8> {
        audio::wav::encode_wav(&self.samples, self.sample_rate)
    }

    pub fn write_wav(&self, path: &Path) -> Result<(), SynthesisError> {
        audio::wav::write_wav(path, &self.samples, self.sample_rate)
    }
}

/// Progress events published while a request is being synthesized.
#[derive(Debug, Clone, PartialEq)]
pub enum Progress {
    Preparing,
    /// Emitted after each chunk, successful or skipped.
    Synthesizing { chunk: usize, total: usize },
    PostProcessing,
    Done,
    Failed(String),
}

/// Orchestrator state, advanced strictly forward per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PipelineState {
    Idle,
    Preparing,
    Synthesizing,
    PostProcessing,
    Done,
    Failed,
}

pub struct Synthesizer {
    ctx: PipelineContext,
    engines: HashMap<EngineFamily, Box<dyn InferenceEngine>>,
    fallback: SyntheticVoiceGenerator,
    post: PostProcessor,
    progress: Option<Sender<Progress>>,
    state: PipelineState,
}

impl Synthesizer {
    pub fn new(ctx: PipelineContext) -> Self {
        Self {
            ctx,
            engines: HashMap::new(),
            fallback: SyntheticVoiceGenerator::default(),
            post: PostProcessor::default(),
            progress: None,
            state: PipelineState::Idle,
        }
    }

    /// Attach a model-backed engine for its family. At most one engine per
    /// family; a later attach replaces the earlier one.
    pub fn attach_engine(&mut self, engine: Box<dyn InferenceEngine>) {
        let family = engine.family();
        if self.engines.insert(family, engine).is_some() {
            log::warn!("Replacing already-attached engine for {family:?}");
        }
    }

    pub fn has_engine(&self, family: EngineFamily) -> bool {
        self.engines.contains_key(&family)
    }

    /// Publish progress events to this channel. Sends are best-effort; a
    /// full or disconnected receiver never stalls synthesis.
    pub fn with_progress(mut self, tx: Sender<Progress>) -> Self {
        self.progress = Some(tx);
        self
    }

    pub fn set_post_processor(&mut self, post: PostProcessor) {
        self.post = post;
    }

    pub fn list_voices(&self) -> Vec<&str> {
        self.ctx.voices.list_voices()
    }

    pub fn synthesize(
        &mut self,
        request: &SynthesisRequest,
    ) -> Result<SynthesisResult, SynthesisError> {
        self.synthesize_cancellable(request, &CancelToken::new())
    }

    /// Synthesize with a cancellation token checked before each chunk's
    /// inference. Cancellation discards any partial audio.
    pub fn synthesize_cancellable(
        &mut self,
        request: &SynthesisRequest,
        cancel: &CancelToken,
    ) -> Result<SynthesisResult, SynthesisError> {
        let started = Instant::now();
        let result = self.run(request, cancel);
        match &result {
            Ok(r) => {
                self.advance(PipelineState::Done);
                self.emit(Progress::Done);
                log::info!(
                    "Synthesized {:.2}s of audio from {} chunks in {}ms",
                    r.duration_secs(),
                    r.chunk_count,
                    started.elapsed().as_millis()
                );
            }
            Err(e) => {
                self.advance(PipelineState::Failed);
                self.emit(Progress::Failed(e.to_string()));
            }
        }
        result
    }

    fn run(
        &mut self,
        request: &SynthesisRequest,
        cancel: &CancelToken,
    ) -> Result<SynthesisResult, SynthesisError> {
        let started = Instant::now();
        self.advance(PipelineState::Preparing);
        self.emit(Progress::Preparing);

        let voice = self
            .ctx
            .voices
            .get(&request.voice_id)
            .ok_or_else(|| SynthesisError::VoiceNotFound(request.voice_id.clone()))?;
        let family = voice.family;
        let language = request
            .language
            .clone()
            .unwrap_or_else(|| voice.language.clone());

        let normalized = normalizer::normalize(&request.text);
        if normalized.truncated {
            log::warn!("Input text truncated to the maximum supported length");
        }

        let chunk_cfg = self.chunker_config(family);
        let plan = chunker::chunk_text(&normalized.text, &language, &self.ctx.vocabulary, &chunk_cfg);
        if plan.chunks.is_empty() {
            return Err(SynthesisError::NoAudioProduced);
        }

        let sample_rate = match self.engines.get(&family) {
            Some(engine) => engine.sample_rate(),
            None => self.fallback.sample_rate(),
        };
        let speed = request.speed.clamp(0.5, 2.0);
        let pitch = request.pitch.clamp(0.5, 2.0);

        self.advance(PipelineState::Synthesizing);
        let total = plan.chunks.len();
        let mut samples: Vec<f32> = Vec::new();
        let mut voiced_ok = 0usize;
        let mut fell_back = false;

        for (index, chunk) in plan.chunks.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(SynthesisError::Cancelled);
            }
            match chunk {
                TextChunk::Silence { duration_s } => {
                    let n = (duration_s * sample_rate as f32) as usize;
                    samples.extend(std::iter::repeat(0.0).take(n));
                }
                TextChunk::Text { tokens } => {
                    let style = self
                        .ctx
                        .voices
                        .resolve_style_vector(&request.voice_id, tokens.len())?;
                    match self.engines.get_mut(&family) {
                        Some(engine) => {
                            // Only the single-shot family consumes speed
                            // in-model; the windowed family gets it in post.
                            let model_speed = match family {
                                EngineFamily::SingleShot => speed,
                                EngineFamily::Windowed => 1.0,
                            };
                            match engine.infer(tokens, &style, model_speed) {
                                Ok(chunk_samples) => {
                                    samples.extend(chunk_samples);
                                    voiced_ok += 1;
                                }
                                Err(e) => {
                                    log::warn!("Chunk {index} failed, skipping: {e}");
                                }
                            }
                        }
                        None => {
                            fell_back = true;
                            samples.extend(self.fallback.generate(tokens.len(), &style));
                            voiced_ok += 1;
                        }
                    }
                }
            }
            self.emit(Progress::Synthesizing {
                chunk: index + 1,
                total,
            });
        }

        if voiced_ok == 0 {
            return Err(SynthesisError::NoAudioProduced);
        }
        if fell_back {
            log::warn!(
                "No model session for {family:?}; used synthetic placeholder audio"
            );
        }

        self.advance(PipelineState::PostProcessing);
        self.emit(Progress::PostProcessing);

        // Pitch rides on the same resampler as speed, as its own pass so the
        // two factors compound instead of sharing one clamp. The single-shot
        // family already applied speed in-model, so only pitch remains; the
        // windowed family and the fallback path apply both here.
        let post_speed = match (family, fell_back) {
            (EngineFamily::SingleShot, false) => 1.0,
            _ => speed,
        };
        let (samples, sample_rate) = self.post.process(samples, sample_rate, post_speed, pitch);

        Ok(SynthesisResult {
            samples,
            sample_rate,
            chunk_count: total,
            processing_time_ms: started.elapsed().as_millis() as u64,
        })
    }

    fn chunker_config(&self, family: EngineFamily) -> ChunkerConfig {
        let (window, padding) = match self.engines.get(&family) {
            Some(engine) => (engine.context_window(), engine.reserved_padding()),
            None => (family.default_context_window(), 2),
        };
        ChunkerConfig {
            context_window: window,
            reserved_padding: padding,
            // Phoneme cap tracks the usable token window: tokenization never
            // yields more ids than input characters.
            max_phoneme_chars: window.saturating_sub(padding),
        }
    }

    fn advance(&mut self, next: PipelineState) {
        log::debug!("Pipeline state {:?} -> {next:?}", self.state);
        self.state = next;
    }

    fn emit(&self, event: Progress) {
        if let Some(tx) = &self.progress {
            let _ = tx.try_send(event);
        }
    }
}
