//! PCM16 conversion and WAV container encoding.
//!
//! In-memory encoding writes the 44-byte RIFF header by hand so the byte
//! layout is exact and streamable; writing to disk goes through `hound`.

use std::path::Path;

use crate::error::SynthesisError;

/// Bytes in the canonical RIFF/WAVE header for 16-bit mono PCM.
pub const WAV_HEADER_LEN: usize = 44;

/// Convert float samples in [-1, 1] to little-endian 16-bit PCM bytes.
///
/// Out-of-range samples are clamped before scaling.
pub fn encode_pcm16(samples: &[f32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(samples.len() * 2);
    for &s in samples {
        let v = (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        out.extend_from_slice(&v.to_le_bytes());
    }
    out
}

/// Encode a complete mono 16-bit WAV file in memory.
pub fn encode_wav(samples: &[f32], sample_rate: u32) -> Vec<u8> {
    let pcm = encode_pcm16(samples);
    let data_len = pcm.len() as u32;
    let byte_rate = sample_rate * 2;

    let mut out = Vec::with_capacity(WAV_HEADER_LEN + pcm.len());
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len).to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes()); // fmt chunk size
    out.extend_from_slice(&1u16.to_le_bytes()); // PCM
    out.extend_from_slice(&1u16.to_le_bytes()); // mono
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&2u16.to_le_bytes()); // block align
    out.extend_from_slice(&16u16.to_le_bytes()); // bits per sample
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());
    out.extend_from_slice(&pcm);
    out
}

/// Write a mono 16-bit WAV file to disk.
pub fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) -> Result<(), SynthesisError> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)
        .map_err(|e| SynthesisError::Sink(format!("Failed to create WAV file: {e}")))?;
    for &s in samples {
        let v = (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        writer
            .write_sample(v)
            .map_err(|e| SynthesisError::Sink(format!("Failed to write sample: {e}")))?;
    }
    writer
        .finalize()
        .map_err(|e| SynthesisError::Sink(format!("Failed to finalize WAV file: {e}")))?;
    log::info!("Wrote {} samples to {}", samples.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pcm_is_two_bytes_per_sample() {
        assert_eq!(encode_pcm16(&[0.0, 0.5, -0.5]).len(), 6);
    }

    #[test]
    fn pcm_clamps_out_of_range_samples() {
        let bytes = encode_pcm16(&[2.0, -2.0]);
        assert_eq!(i16::from_le_bytes([bytes[0], bytes[1]]), i16::MAX);
        assert_eq!(i16::from_le_bytes([bytes[2], bytes[3]]), -i16::MAX);
    }

    #[test]
    fn wav_header_layout_is_exact() {
        let wav = encode_wav(&[0.0; 100], 24_000);
        assert_eq!(wav.len(), WAV_HEADER_LEN + 200);
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(&wav[12..16], b"fmt ");
        // Sample rate at offset 24, data length at offset 40.
        assert_eq!(u32::from_le_bytes([wav[24], wav[25], wav[26], wav[27]]), 24_000);
        assert_eq!(u32::from_le_bytes([wav[40], wav[41], wav[42], wav[43]]), 200);
    }

    #[test]
    fn riff_size_covers_header_remainder_plus_data() {
        let wav = encode_wav(&[0.1; 10], 16_000);
        assert_eq!(u32::from_le_bytes([wav[4], wav[5], wav[6], wav[7]]), 36 + 20);
    }

    #[test]
    fn empty_input_still_produces_a_header() {
        let wav = encode_wav(&[], 24_000);
        assert_eq!(wav.len(), WAV_HEADER_LEN);
    }

    #[test]
    fn write_wav_roundtrips_through_hound() {
        let dir = std::env::temp_dir().join("ttskit-wav-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("out.wav");
        let samples: Vec<f32> = (0..1000).map(|i| (i as f32 / 30.0).sin() * 0.5).collect();
        write_wav(&path, &samples, 24_000).unwrap();

        let mut reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().sample_rate, 24_000);
        assert_eq!(reader.samples::<i16>().count(), 1000);
        std::fs::remove_file(&path).unwrap();
    }
}
