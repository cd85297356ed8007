//! The inference contract and its implementations.
//!
//! The pipeline treats the model runtime as an opaque collaborator behind
//! [`InferenceEngine`]: one chunk of token ids plus a style vector and a
//! speed scalar in, raw float samples out. Two families exist with
//! incompatible tensor conventions; a voice declares its family once and
//! the orchestrator selects the engine from that, never per call site.

pub mod fallback;
#[cfg(feature = "onnx")]
pub mod onnx;

use crate::voice::EngineFamily;

/// Output sample rate shared by the supported models.
pub const DEFAULT_SAMPLE_RATE: u32 = 24_000;

/// Engine-level failures. Shape mismatches, unsupported dtypes and empty
/// outputs are reported, never silently coerced.
#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    #[error("No model session is loaded.")]
    SessionUnavailable,
    #[error("Bad engine input: {0}")]
    BadInput(String),
    #[error("Bad engine output: {0}")]
    BadOutput(String),
    #[error("Engine runtime failure: {0}")]
    Runtime(String),
}

/// One model invocation: a chunk of token ids, a 256-float style vector and
/// a speed scalar, producing raw samples in [-1, 1].
pub trait InferenceEngine: Send {
    fn family(&self) -> EngineFamily;

    /// Maximum token count a single invocation accepts, including padding.
    fn context_window(&self) -> usize;

    /// Token slots reserved for start/end pads inside the window.
    fn reserved_padding(&self) -> usize {
        2
    }

    fn sample_rate(&self) -> u32 {
        DEFAULT_SAMPLE_RATE
    }

    /// Run one chunk. `tokens` excludes start/end pads; the engine applies
    /// its own wrapping convention.
    fn infer(&mut self, tokens: &[i64], style: &[f32], speed: f32)
        -> Result<Vec<f32>, EngineError>;
}
