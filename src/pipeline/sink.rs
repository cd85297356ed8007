//! Streaming output boundary.
//!
//! An [`AudioSink`] receives the finished utterance as PCM16 pushed in
//! bounded slices, bracketed by `start`/`done` calls. The producer side is
//! [`stream_to_sink`]; failures mid-stream are reported to the sink before
//! propagating.

use super::SynthesisResult;
use crate::error::SynthesisError;

/// Default slice size when the consumer does not negotiate one.
pub const DEFAULT_CHUNK_BYTES: usize = 4096;

/// Consumer side of a synthesis stream.
pub trait AudioSink {
    /// Announce format before any audio arrives.
    fn start(&mut self, sample_rate: u32, channels: u16) -> Result<(), SynthesisError>;

    /// One slice of little-endian PCM16 bytes, at most the negotiated size.
    fn audio_available(&mut self, pcm: &[u8]) -> Result<(), SynthesisError>;

    /// End of stream; no further calls follow.
    fn done(&mut self) -> Result<(), SynthesisError>;

    /// Stream aborted; no further calls follow.
    fn error(&mut self, reason: &str);
}

/// Push a finished result into a sink in slices of at most
/// `max_chunk_bytes`.
pub fn stream_to_sink(
    result: &SynthesisResult,
    sink: &mut dyn AudioSink,
    max_chunk_bytes: usize,
) -> Result<(), SynthesisError> {
    let chunk_bytes = if max_chunk_bytes == 0 {
        DEFAULT_CHUNK_BYTES
    } else {
        max_chunk_bytes
    };
    // Keep sample pairs intact across slice boundaries.
    let chunk_bytes = (chunk_bytes / 2).max(1) * 2;

    if let Err(e) = sink.start(result.sample_rate, 1) {
        sink.error(&e.to_string());
        return Err(e);
    }

    let pcm = result.to_pcm16();
    for slice in pcm.chunks(chunk_bytes) {
        if let Err(e) = sink.audio_available(slice) {
            sink.error(&e.to_string());
            return Err(e);
        }
    }
    sink.done()
}

/// Sink that accumulates everything in memory. Useful in tests and as the
/// simplest consumer.
#[derive(Default)]
pub struct MemorySink {
    pub sample_rate: u32,
    pub channels: u16,
    pub pcm: Vec<u8>,
    pub finished: bool,
    pub failure: Option<String>,
}

impl AudioSink for MemorySink {
    fn start(&mut self, sample_rate: u32, channels: u16) -> Result<(), SynthesisError> {
        self.sample_rate = sample_rate;
        self.channels = channels;
        Ok(())
    }

    fn audio_available(&mut self, pcm: &[u8]) -> Result<(), SynthesisError> {
        self.pcm.extend_from_slice(pcm);
        Ok(())
    }

    fn done(&mut self) -> Result<(), SynthesisError> {
        self.finished = true;
        Ok(())
    }

    fn error(&mut self, reason: &str) {
        self.failure = Some(reason.to_string());
    }
}
