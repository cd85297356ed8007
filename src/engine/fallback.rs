//! Degraded-mode waveform synthesis.
//!
//! When no real model session is available the pipeline must still produce
//! audible, plausible output rather than fail. This generator builds a
//! formant-like waveform from the voice embedding alone: a fundamental
//! derived from the embedding, two harmonics, two fixed formant sinusoids,
//! intermittent noise bursts standing in for consonants, and a half-sine
//! envelope over the whole utterance. Everything is seeded from the
//! embedding, so output is deterministic for a given voice and text length.

use std::f32::consts::PI;

use crate::engine::DEFAULT_SAMPLE_RATE;

/// Seconds of audio per estimated input character.
const SECONDS_PER_CHAR: f32 = 0.1;
const MIN_DURATION_S: f32 = 1.0;
const MAX_DURATION_S: f32 = 10.0;

/// Fundamental frequency range the embedding is mapped into.
const F0_MIN_HZ: f32 = 80.0;
const F0_MAX_HZ: f32 = 300.0;

/// Fixed formant frequencies approximating an open vowel.
const FORMANT_1_HZ: f32 = 800.0;
const FORMANT_2_HZ: f32 = 1200.0;

/// Noise-burst scheduling: one decision per segment, bursts at the start.
const BURST_SEGMENT_S: f32 = 0.15;
const BURST_LEN_S: f32 = 0.03;
const BURST_AMPLITUDE: f32 = 0.06;

pub struct SyntheticVoiceGenerator {
    sample_rate: u32,
}

impl Default for SyntheticVoiceGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_RATE)
    }
}

impl SyntheticVoiceGenerator {
    pub fn new(sample_rate: u32) -> Self {
        Self { sample_rate }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Generate a placeholder waveform for roughly `estimated_chars` of
    /// input, voiced by the given style embedding.
    pub fn generate(&self, estimated_chars: usize, embedding: &[f32]) -> Vec<f32> {
        let duration_s =
            (estimated_chars as f32 * SECONDS_PER_CHAR).clamp(MIN_DURATION_S, MAX_DURATION_S);
        let n = (duration_s * self.sample_rate as f32) as usize;
        let f0 = fundamental_from_embedding(embedding);
        let sr = self.sample_rate as f32;

        let mut rng = XorShift::from_embedding(embedding);
        let segment_len = (BURST_SEGMENT_S * sr) as usize;
        let burst_len = (BURST_LEN_S * sr) as usize;
        let n_segments = n / segment_len.max(1) + 1;
        let burst_segments: Vec<bool> = (0..n_segments).map(|_| rng.next_f32() > 0.5).collect();

        let mut samples = Vec::with_capacity(n);
        for i in 0..n {
            let t = i as f32 / sr;
            let mut s = 0.5 * (2.0 * PI * f0 * t).sin()
                + 0.25 * (2.0 * PI * 2.0 * f0 * t).sin()
                + 0.15 * (2.0 * PI * 3.0 * f0 * t).sin()
                + 0.05 * (2.0 * PI * FORMANT_1_HZ * t).sin()
                + 0.05 * (2.0 * PI * FORMANT_2_HZ * t).sin();

            let segment = i / segment_len.max(1);
            if burst_segments[segment] && i % segment_len.max(1) < burst_len {
                s += BURST_AMPLITUDE * (rng.next_f32() * 2.0 - 1.0);
            }

            // Half-sine envelope over the whole utterance.
            let envelope = (PI * i as f32 / n as f32).sin();
            samples.push((s * envelope).clamp(-1.0, 1.0));
        }
        samples
    }
}

/// Map the mean of the first ten embedding floats into [80, 300] Hz.
fn fundamental_from_embedding(embedding: &[f32]) -> f32 {
    let head = &embedding[..embedding.len().min(10)];
    if head.is_empty() {
        return (F0_MIN_HZ + F0_MAX_HZ) / 2.0;
    }
    let mean: f32 = head.iter().sum::<f32>() / head.len() as f32;
    // tanh squashes unbounded embedding space into (-1, 1) before scaling.
    let unit = (mean.tanh() + 1.0) / 2.0;
    F0_MIN_HZ + unit * (F0_MAX_HZ - F0_MIN_HZ)
}

/// Minimal xorshift64 PRNG seeded from the embedding, so the consonant
/// bursts are reproducible in tests.
struct XorShift {
    state: u64,
}

impl XorShift {
    fn from_embedding(embedding: &[f32]) -> Self {
        let mut seed = 0x9e37_79b9_7f4a_7c15u64;
        for &v in embedding.iter().take(16) {
            seed = seed
                .rotate_left(7)
                .wrapping_add(u64::from(v.to_bits()));
        }
        Self {
            state: if seed == 0 { 1 } else { seed },
        }
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    fn next_f32(&mut self) -> f32 {
        (self.next_u64() >> 40) as f32 / (1u64 << 24) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_yields_at_least_one_second() {
        let gen = SyntheticVoiceGenerator::default();
        let audio = gen.generate("Test".len(), &[0.1; 256]);
        assert!(audio.len() >= gen.sample_rate() as usize);
    }

    #[test]
    fn duration_is_clamped_to_ten_seconds() {
        let gen = SyntheticVoiceGenerator::default();
        let audio = gen.generate(5_000, &[0.1; 256]);
        assert!(audio.len() <= (10 * gen.sample_rate()) as usize + 1);
    }

    #[test]
    fn samples_stay_in_range() {
        let gen = SyntheticVoiceGenerator::default();
        let audio = gen.generate(50, &[0.9; 256]);
        assert!(audio.iter().all(|s| (-1.0..=1.0).contains(s)));
    }

    #[test]
    fn output_is_deterministic_per_embedding() {
        let gen = SyntheticVoiceGenerator::default();
        let a = gen.generate(20, &[0.3; 256]);
        let b = gen.generate(20, &[0.3; 256]);
        assert_eq!(a, b);
    }

    #[test]
    fn different_embeddings_differ() {
        let gen = SyntheticVoiceGenerator::default();
        let a = gen.generate(20, &[0.9; 256]);
        let b = gen.generate(20, &[-0.9; 256]);
        assert_ne!(a, b);
    }

    #[test]
    fn output_is_not_silent() {
        let gen = SyntheticVoiceGenerator::default();
        let audio = gen.generate(10, &[0.0; 256]);
        let peak = audio.iter().fold(0f32, |m, s| m.max(s.abs()));
        assert!(peak > 0.1, "peak was {peak}");
    }

    #[test]
    fn fundamental_stays_in_voice_range() {
        for mean in [-100.0f32, -1.0, 0.0, 1.0, 100.0] {
            let f0 = fundamental_from_embedding(&[mean; 10]);
            assert!((F0_MIN_HZ..=F0_MAX_HZ).contains(&f0), "f0 {f0} for {mean}");
        }
    }
}
