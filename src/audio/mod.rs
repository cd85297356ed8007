//! Audio post-processing.
//!
//! Stages always run in the same order: normalize, fade in/out, trim
//! silence, change speed, resample. The ordering matters — trimming after
//! the fades keeps the fade ramps from being eaten by the trim threshold,
//! and speed change before resampling keeps the two interpolations from
//! compounding.

pub mod wav;

/// Target peak after normalization.
const NORMALIZE_PEAK: f32 = 0.95;

/// Default fade length at each end.
const DEFAULT_FADE_S: f32 = 0.03;

/// A fade never covers more than a quarter of the signal.
const MAX_FADE_FRACTION: f32 = 0.25;

/// Amplitude below which a sample counts as silence when trimming.
const TRIM_THRESHOLD: f32 = 0.01;

/// Minimum run of leading/trailing silence kept after trimming.
const TRIM_KEEP_S: f32 = 0.05;

/// Speed factor bounds.
const MIN_SPEED: f32 = 0.5;
const MAX_SPEED: f32 = 2.0;

/// Scale the signal so its peak sits at 0.95.
///
/// All-zero input is returned unchanged, and a peak already at exactly 0.95
/// is left alone to keep the operation idempotent.
pub fn normalize(samples: &mut [f32]) {
    let peak = samples.iter().fold(0f32, |m, s| m.max(s.abs()));
    if peak <= f32::EPSILON || (peak - NORMALIZE_PEAK).abs() <= f32::EPSILON {
        return;
    }
    let gain = NORMALIZE_PEAK / peak;
    for s in samples.iter_mut() {
        *s *= gain;
    }
}

/// Apply half-sine fade-in and fade-out ramps of `fade_s` seconds each,
/// clamped to a quarter of the signal length.
pub fn fade(samples: &mut [f32], sample_rate: u32, fade_s: f32) {
    if samples.is_empty() {
        return;
    }
    let requested = (fade_s * sample_rate as f32) as usize;
    let max_len = (samples.len() as f32 * MAX_FADE_FRACTION) as usize;
    let fade_len = requested.min(max_len);
    if fade_len == 0 {
        return;
    }

    for i in 0..fade_len {
        // Quarter-sine ramp: 0 at the edge, 1 at the end of the fade.
        let gain = (std::f32::consts::FRAC_PI_2 * i as f32 / fade_len as f32).sin();
        samples[i] *= gain;
        let j = samples.len() - 1 - i;
        samples[j] *= gain;
    }
}

/// Apply the default 30 ms fades.
pub fn fade_default(samples: &mut [f32], sample_rate: u32) {
    fade(samples, sample_rate, DEFAULT_FADE_S);
}

/// Drop leading and trailing samples below the silence threshold, keeping a
/// 50 ms cushion at each end. A fully silent signal is returned unchanged.
pub fn trim_silence(samples: &[f32], sample_rate: u32) -> Vec<f32> {
    let first = samples.iter().position(|s| s.abs() > TRIM_THRESHOLD);
    let Some(first) = first else {
        return samples.to_vec();
    };
    let last = samples
        .iter()
        .rposition(|s| s.abs() > TRIM_THRESHOLD)
        .unwrap_or(samples.len() - 1);

    let keep = (TRIM_KEEP_S * sample_rate as f32) as usize;
    let start = first.saturating_sub(keep);
    let end = (last + 1 + keep).min(samples.len());
    samples[start..end].to_vec()
}

/// Resample by linear interpolation to change playback speed.
///
/// `speed` is clamped to [0.5, 2.0]. A factor of exactly 1.0 is a bit-exact
/// copy, never an interpolation pass.
pub fn change_speed(samples: &[f32], speed: f32) -> Vec<f32> {
    let speed = speed.clamp(MIN_SPEED, MAX_SPEED);
    if speed == 1.0 || samples.len() < 2 {
        return samples.to_vec();
    }

    let out_len = ((samples.len() as f32 / speed) as usize).max(1);
    let mut out = Vec::with_capacity(out_len);
    for i in 0..out_len {
        let pos = i as f32 * speed;
        let idx = pos as usize;
        if idx + 1 < samples.len() {
            let frac = pos - idx as f32;
            out.push(samples[idx] * (1.0 - frac) + samples[idx + 1] * frac);
        } else {
            out.push(samples[samples.len() - 1]);
        }
    }
    out
}

/// Linear-interpolation resampling between arbitrary rates.
///
/// Equal rates return a bit-exact copy.
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.len() < 2 {
        return samples.to_vec();
    }
    let ratio = from_rate as f32 / to_rate as f32;
    let out_len = ((samples.len() as f32 / ratio) as usize).max(1);
    let mut out = Vec::with_capacity(out_len);
    for i in 0..out_len {
        let pos = i as f32 * ratio;
        let idx = pos as usize;
        if idx + 1 < samples.len() {
            let frac = pos - idx as f32;
            out.push(samples[idx] * (1.0 - frac) + samples[idx + 1] * frac);
        } else {
            out.push(samples[samples.len() - 1]);
        }
    }
    out
}

/// The fixed post-processing chain applied to every finished utterance.
#[derive(Debug, Clone)]
pub struct PostProcessor {
    pub fade_s: f32,
    pub target_sample_rate: Option<u32>,
}

impl Default for PostProcessor {
    fn default() -> Self {
        Self {
            fade_s: DEFAULT_FADE_S,
            target_sample_rate: None,
        }
    }
}

impl PostProcessor {
    /// Run the full chain. Returns the processed samples and their final
    /// sample rate.
    ///
    /// `speed` and `pitch` are applied as separate resampler passes, each
    /// clamped to [0.5, 2.0] on its own, so a request combining both keeps
    /// the full product (up to 4x) instead of collapsing to one clamp.
    pub fn process(
        &self,
        samples: Vec<f32>,
        sample_rate: u32,
        speed: f32,
        pitch: f32,
    ) -> (Vec<f32>, u32) {
        let mut samples = samples;
        normalize(&mut samples);
        fade(&mut samples, sample_rate, self.fade_s);
        let mut samples = trim_silence(&samples, sample_rate);
        if (speed - 1.0).abs() > f32::EPSILON {
            samples = change_speed(&samples, speed);
        }
        if (pitch - 1.0).abs() > f32::EPSILON {
            samples = change_speed(&samples, pitch);
        }
        match self.target_sample_rate {
            Some(target) if target != sample_rate => {
                let out = resample(&samples, sample_rate, target);
                (out, target)
            }
            _ => (samples, sample_rate),
        }
    }
}
