//! # ttskit
//!
//! Offline text-to-speech synthesis: a text front-end (normalization,
//! rule-based phonemization, tokenization, chunking), a voice catalog with
//! style embeddings, a model-agnostic inference contract with ONNX-backed
//! adapters, a deterministic synthetic fallback for model-less operation,
//! and audio post-processing down to PCM16/WAV.
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! ttskit = "0.1"
//! ```
//!
//! ```no_run
//! use ttskit::{PipelineContext, SynthesisRequest, Synthesizer, Vocabulary, VoiceStore};
//! use ttskit::voice::{EngineFamily, Voice};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), ttskit::SynthesisError> {
//! let mut voices = VoiceStore::new();
//! voices.register(Voice::new(
//!     "ktn_f1",
//!     "en-us",
//!     EngineFamily::SingleShot,
//!     vec![0.1; 256],
//! )?);
//!
//! let ctx = PipelineContext::new(Vocabulary::builtin(), voices);
//! let mut synth = Synthesizer::new(ctx);
//!
//! // No model attached: the synthetic placeholder voice is used.
//! let result = synth.synthesize(&SynthesisRequest::new("Hello, world!", "ktn_f1"))?;
//! result.write_wav(Path::new("output.wav"))?;
//! # Ok(())
//! # }
//! ```
//!
//! Real model inference lives behind the `onnx` cargo feature; see
//! [`engine::onnx`] for the two adapter families.

pub mod audio;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod text;
pub mod voice;

pub use engine::{EngineError, InferenceEngine, DEFAULT_SAMPLE_RATE};
pub use error::SynthesisError;
pub use pipeline::{
    CancelToken, PipelineContext, Progress, SynthesisRequest, SynthesisResult, Synthesizer,
};
pub use text::Vocabulary;
pub use voice::{EngineFamily, Voice, VoiceStore};
