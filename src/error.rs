//! Error kinds for the synthesis pipeline.
//!
//! Only conditions where no audio can possibly be produced reach the caller.
//! Recoverable conditions (unknown phoneme characters, unsupported languages,
//! a missing model session, a single failed chunk) are absorbed close to where
//! they occur, with a logged diagnostic and a documented fallback.

#[derive(thiserror::Error, Debug)]
pub enum SynthesisError {
    #[error("Voice '{0}' not found. Call list_voices() to see available voices.")]
    VoiceNotFound(String),
    #[error("Voice '{0}' has no style embedding loaded.")]
    EmbeddingMissing(String),
    #[error("No model session available for the requested engine family.")]
    ModelUnavailable,
    #[error("Inference failed: {0}")]
    Inference(String),
    #[error("No audio produced: every chunk failed.")]
    NoAudioProduced,
    #[error("Request cancelled before completion.")]
    Cancelled,
    #[error("Synthesis queue is full, try again later.")]
    Busy,
    #[error("Synthesis worker is no longer running.")]
    WorkerGone,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid vocabulary config: {0}")]
    Config(String),
    #[error("Failed to parse voice data: {0}")]
    VoiceParse(String),
    #[error("Audio sink rejected output: {0}")]
    Sink(String),
}
