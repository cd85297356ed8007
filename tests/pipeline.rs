//! End-to-end pipeline tests with a deterministic stand-in engine.

use ttskit::engine::EngineError;
use ttskit::pipeline::sink::{stream_to_sink, MemorySink};
use ttskit::pipeline::worker::WorkerPool;
use ttskit::text::{chunk_text, ChunkerConfig, TextChunk};
use ttskit::voice::{EngineFamily, Voice};
use ttskit::{
    CancelToken, InferenceEngine, PipelineContext, SynthesisError, SynthesisRequest, Synthesizer,
    Vocabulary, VoiceStore,
};

const SR: u32 = 24_000;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Produces a quarter-amplitude 220 Hz tone, 100 samples per token.
struct ToneEngine {
    family: EngineFamily,
    fail_every_other: bool,
    calls: usize,
}

impl ToneEngine {
    fn new(family: EngineFamily) -> Self {
        Self {
            family,
            fail_every_other: false,
            calls: 0,
        }
    }
}

impl InferenceEngine for ToneEngine {
    fn family(&self) -> EngineFamily {
        self.family
    }

    fn context_window(&self) -> usize {
        self.family.default_context_window()
    }

    fn infer(
        &mut self,
        tokens: &[i64],
        _style: &[f32],
        _speed: f32,
    ) -> Result<Vec<f32>, EngineError> {
        self.calls += 1;
        if self.fail_every_other && self.calls % 2 == 0 {
            return Err(EngineError::Runtime("induced failure".to_string()));
        }
        let n = tokens.len() * 100;
        Ok((0..n)
            .map(|i| 0.25 * (2.0 * std::f32::consts::PI * 220.0 * i as f32 / SR as f32).sin())
            .collect())
    }
}

fn context(family: EngineFamily) -> PipelineContext {
    let mut voices = VoiceStore::new();
    let embedding = match family {
        EngineFamily::SingleShot => vec![0.1; 256],
        EngineFamily::Windowed => vec![0.1; 256 * 510],
    };
    voices.register(Voice::new("test_voice", "en-us", family, embedding).unwrap());
    PipelineContext::new(Vocabulary::builtin(), voices)
}

#[test]
fn hello_world_is_one_chunk_with_bounded_duration() {
    init_logging();
    let vocab = Vocabulary::builtin();
    let plan = chunk_text("Hello world.", "en-us", &vocab, &ChunkerConfig::default());
    assert_eq!(plan.chunks.len(), 1);
    assert!(matches!(plan.chunks[0], TextChunk::Text { .. }));

    let mut synth = Synthesizer::new(context(EngineFamily::SingleShot));
    synth.attach_engine(Box::new(ToneEngine::new(EngineFamily::SingleShot)));
    let result = synth
        .synthesize(&SynthesisRequest::new("Hello world.", "test_voice"))
        .unwrap();

    let duration = result.duration_secs();
    assert!(duration > 0.0 && duration <= 5.0, "duration was {duration}");
    assert_eq!(result.to_pcm16().len(), result.samples.len() * 2);
}

#[test]
fn break_directive_produces_silence_between_chunks() {
    init_logging();
    let vocab = Vocabulary::builtin();
    let plan = chunk_text(
        r#"Hello world. <break time="0.5s"/> This is a test."#,
        "en-us",
        &vocab,
        &ChunkerConfig::default(),
    );
    assert_eq!(plan.chunks.len(), 3);
    assert!(matches!(plan.chunks[0], TextChunk::Text { .. }));
    assert!(
        matches!(plan.chunks[1], TextChunk::Silence { duration_s } if (duration_s - 0.5).abs() < 1e-6)
    );
    assert!(matches!(plan.chunks[2], TextChunk::Text { .. }));
}

#[test]
fn control_characters_only_produces_no_audio() {
    init_logging();
    let mut synth = Synthesizer::new(context(EngineFamily::SingleShot));
    synth.attach_engine(Box::new(ToneEngine::new(EngineFamily::SingleShot)));
    let err = synth
        .synthesize(&SynthesisRequest::new("\u{0000}\u{0001}\u{0007}", "test_voice"))
        .unwrap_err();
    assert!(matches!(err, SynthesisError::NoAudioProduced));
}

#[test]
fn failed_chunks_are_skipped_not_fatal() {
    init_logging();
    let mut synth = Synthesizer::new(context(EngineFamily::Windowed));
    let mut engine = ToneEngine::new(EngineFamily::Windowed);
    engine.fail_every_other = true;
    synth.attach_engine(Box::new(engine));

    // Three sentences: the second inference call fails, the others succeed.
    let result = synth
        .synthesize(&SynthesisRequest::new(
            "First sentence. Second sentence. Third sentence.",
            "test_voice",
        ))
        .unwrap();
    assert!(!result.samples.is_empty());
    assert_eq!(result.chunk_count, 5); // 3 text + 2 implicit pauses
}

#[test]
fn windowed_voice_without_engine_uses_fallback() {
    init_logging();
    let mut synth = Synthesizer::new(context(EngineFamily::Windowed));
    let result = synth
        .synthesize(&SynthesisRequest::new("Hello.", "test_voice"))
        .unwrap();
    assert!(result.duration_secs() >= 0.5, "fallback audio too short");
}

#[test]
fn speed_changes_output_length() {
    init_logging();
    let mut synth = Synthesizer::new(context(EngineFamily::Windowed));
    synth.attach_engine(Box::new(ToneEngine::new(EngineFamily::Windowed)));

    let slow = synth
        .synthesize(
            &SynthesisRequest::builder()
                .text("Hello world.")
                .voice_id("test_voice")
                .speed(0.5)
                .build()
                .unwrap(),
        )
        .unwrap();
    let fast = synth
        .synthesize(
            &SynthesisRequest::builder()
                .text("Hello world.")
                .voice_id("test_voice")
                .speed(2.0)
                .build()
                .unwrap(),
        )
        .unwrap();
    assert!(
        slow.samples.len() > fast.samples.len() * 2,
        "slow {} vs fast {}",
        slow.samples.len(),
        fast.samples.len()
    );
}

#[test]
fn pitch_compounds_with_speed_instead_of_being_clamped_away() {
    init_logging();
    let mut synth = Synthesizer::new(context(EngineFamily::Windowed));
    synth.attach_engine(Box::new(ToneEngine::new(EngineFamily::Windowed)));

    let request = |pitch: f32| {
        SynthesisRequest::builder()
            .text("Hello world.")
            .voice_id("test_voice")
            .speed(2.0)
            .pitch(pitch)
            .build()
            .unwrap()
    };
    let speed_only = synth.synthesize(&request(1.0)).unwrap();
    let both = synth.synthesize(&request(2.0)).unwrap();
    // At speed 2.0 + pitch 2.0 the effective rate is 4x, so the output must
    // shrink well past what speed alone produces.
    assert!(
        both.samples.len() * 3 < speed_only.samples.len() * 2,
        "both {} vs speed-only {}",
        both.samples.len(),
        speed_only.samples.len()
    );
}

#[test]
fn cancellation_mid_request_discards_partial_audio() {
    init_logging();
    let mut synth = Synthesizer::new(context(EngineFamily::SingleShot));
    synth.attach_engine(Box::new(ToneEngine::new(EngineFamily::SingleShot)));
    let cancel = CancelToken::new();
    cancel.cancel();
    let err = synth
        .synthesize_cancellable(&SynthesisRequest::new("One. Two. Three.", "test_voice"), &cancel)
        .unwrap_err();
    assert!(matches!(err, SynthesisError::Cancelled));
}

#[test]
fn worker_pool_round_trip() {
    init_logging();
    let mut synth = Synthesizer::new(context(EngineFamily::SingleShot));
    synth.attach_engine(Box::new(ToneEngine::new(EngineFamily::SingleShot)));

    let mut pool = WorkerPool::new();
    pool.spawn(EngineFamily::SingleShot, synth, 2);
    let ticket = pool
        .try_submit(
            EngineFamily::SingleShot,
            SynthesisRequest::new("Hello world.", "test_voice"),
            CancelToken::new(),
        )
        .unwrap();
    let result = ticket.wait().unwrap();
    assert!(!result.samples.is_empty());
    pool.shutdown();
}

#[test]
fn synthesized_audio_streams_to_a_sink() {
    init_logging();
    let mut synth = Synthesizer::new(context(EngineFamily::SingleShot));
    synth.attach_engine(Box::new(ToneEngine::new(EngineFamily::SingleShot)));
    let result = synth
        .synthesize(&SynthesisRequest::new("Hello world.", "test_voice"))
        .unwrap();

    let mut sink = MemorySink::default();
    stream_to_sink(&result, &mut sink, 1024).unwrap();
    assert!(sink.finished);
    assert_eq!(sink.pcm.len(), result.samples.len() * 2);
    assert_eq!(sink.sample_rate, result.sample_rate);
}

#[test]
fn wav_bytes_carry_the_sample_rate() {
    init_logging();
    let mut synth = Synthesizer::new(context(EngineFamily::SingleShot));
    synth.attach_engine(Box::new(ToneEngine::new(EngineFamily::SingleShot)));
    let result = synth
        .synthesize(&SynthesisRequest::new("Hello.", "test_voice"))
        .unwrap();

    let wav = result.to_wav_bytes();
    assert_eq!(&wav[0..4], b"RIFF");
    let rate = u32::from_le_bytes([wav[24], wav[25], wav[26], wav[27]]);
    assert_eq!(rate, result.sample_rate);
}
