//! Minimal command-line front-end.
//!
//! Synthesizes the given text and writes a WAV file. Without a voice
//! archive the built-in demo voice uses the synthetic placeholder
//! generator, which needs no model assets.
//!
//! Usage:
//!   say "Hello, world!" [--voice ID] [--speed N] [--pitch N] [--out FILE]
//!   say --voices path/to/voices.zip --catalog path/to/catalog.json ...

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use ttskit::voice::{archive, EngineFamily, Voice};
use ttskit::{
    PipelineContext, SynthesisError, SynthesisRequest, Synthesizer, Vocabulary, VoiceStore,
};

struct Args {
    text: String,
    voice_id: String,
    speed: f32,
    pitch: f32,
    out: PathBuf,
    voices_archive: Option<PathBuf>,
    catalog: Option<PathBuf>,
}

fn parse_args() -> Result<Args, String> {
    let mut text = None;
    let mut voice_id = "demo".to_string();
    let mut speed = 1.0f32;
    let mut pitch = 1.0f32;
    let mut out = PathBuf::from("output.wav");
    let mut voices_archive = None;
    let mut catalog = None;

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        let mut value_for = |name: &str| {
            iter.next().ok_or_else(|| format!("{name} needs a value"))
        };
        match arg.as_str() {
            "--voice" => voice_id = value_for("--voice")?,
            "--speed" => {
                speed = value_for("--speed")?
                    .parse()
                    .map_err(|e| format!("bad --speed: {e}"))?;
            }
            "--pitch" => {
                pitch = value_for("--pitch")?
                    .parse()
                    .map_err(|e| format!("bad --pitch: {e}"))?;
            }
            "--out" => out = PathBuf::from(value_for("--out")?),
            "--voices" => voices_archive = Some(PathBuf::from(value_for("--voices")?)),
            "--catalog" => catalog = Some(PathBuf::from(value_for("--catalog")?)),
            other if other.starts_with("--") => {
                return Err(format!("unknown option {other}"));
            }
            other => {
                if text.replace(other.to_string()).is_some() {
                    return Err("only one text argument is allowed".to_string());
                }
            }
        }
    }

    let text = text.ok_or_else(|| "no text given".to_string())?;
    Ok(Args {
        text,
        voice_id,
        speed,
        pitch,
        out,
        voices_archive,
        catalog,
    })
}

fn build_store(args: &Args) -> Result<VoiceStore, SynthesisError> {
    match (&args.voices_archive, &args.catalog) {
        (Some(archive_path), Some(catalog_path)) => {
            let embeddings = archive::load_embedding_archive(archive_path)?;
            let catalog_json = std::fs::read_to_string(catalog_path)?;
            archive::build_store(&catalog_json, embeddings)
        }
        (None, None) => {
            // A fixed embedding keeps the placeholder voice deterministic.
            let mut store = VoiceStore::new();
            store.register(Voice::new(
                "demo",
                "en-us",
                EngineFamily::SingleShot,
                vec![0.2; 256],
            )?);
            Ok(store)
        }
        _ => Err(SynthesisError::Config(
            "--voices and --catalog must be given together".to_string(),
        )),
    }
}

fn run() -> Result<(), String> {
    let args = parse_args()?;
    let store = build_store(&args).map_err(|e| e.to_string())?;

    let ctx = PipelineContext::new(Vocabulary::builtin(), store);
    let mut synth = Synthesizer::new(ctx);

    let request = SynthesisRequest::builder()
        .text(args.text.clone())
        .voice_id(args.voice_id.clone())
        .speed(args.speed)
        .pitch(args.pitch)
        .build()
        .map_err(|e| e.to_string())?;

    let result = synth.synthesize(&request).map_err(|e| e.to_string())?;
    result
        .write_wav(Path::new(&args.out))
        .map_err(|e| e.to_string())?;

    println!(
        "Wrote {:.2}s of audio ({} chunks) to {}",
        result.duration_secs(),
        result.chunk_count,
        args.out.display()
    );
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {message}");
            eprintln!(
                "usage: say \"text\" [--voice ID] [--speed N] [--pitch N] [--out FILE] \
                 [--voices ARCHIVE --catalog JSON]"
            );
            ExitCode::FAILURE
        }
    }
}
