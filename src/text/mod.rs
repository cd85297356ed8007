//! The text front-end: normalization, phonemization, tokenization and
//! chunking, in that order.

pub mod chunker;
pub mod normalizer;
pub mod phonemizer;
pub mod tokenizer;
pub mod vocab;

pub use chunker::{chunk_text, ChunkPlan, ChunkerConfig, TextChunk};
pub use normalizer::{normalize, NormalizedText, MAX_INPUT_CHARS};
pub use phonemizer::{phonemize, PhonemeOutput};
pub use tokenizer::{tokenize, wrap_with_pads};
pub use vocab::Vocabulary;
