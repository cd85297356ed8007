//! ONNX Runtime adapters for both engine families.
//!
//! These adapters own the `ort` session and translate the neutral
//! [`InferenceEngine`] contract into each family's tensor convention:
//!
//! | Input       | Single-shot       | Windowed                 |
//! |-------------|-------------------|--------------------------|
//! | `input_ids` | `[1, N]` int64    | `[1, M]` int64           |
//! | `style`     | `[1, 256]` f32    | `[ctx, 1, 256]` f32      |
//! | `speed`     | `[1]` f32 in-model| `[1]` f32, always 1.0    |
//!
//! The windowed family applies speed in post-processing, never in-model.

use std::path::Path;

use ndarray::{Array2, Array3};
use ort::execution_providers::CPUExecutionProvider;
use ort::inputs;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::{Session, SessionOutputs};
use ort::value::TensorRef;

use super::{EngineError, InferenceEngine};
use crate::voice::{EngineFamily, STYLE_DIM};

/// Pad id used when wrapping token sequences.
const PAD_ID: i64 = 0;

/// Family-A adapter: one call per request, speed consumed in-model.
pub struct SingleShotOnnxEngine {
    session: Session,
    tokens_input_name: String,
}

impl SingleShotOnnxEngine {
    pub fn load(model_path: &Path) -> Result<Self, EngineError> {
        let session = init_session(model_path)?;
        let tokens_input_name = detect_tokens_input(&session);
        Ok(Self {
            session,
            tokens_input_name,
        })
    }
}

impl InferenceEngine for SingleShotOnnxEngine {
    fn family(&self) -> EngineFamily {
        EngineFamily::SingleShot
    }

    fn context_window(&self) -> usize {
        EngineFamily::SingleShot.default_context_window()
    }

    fn infer(
        &mut self,
        tokens: &[i64],
        style: &[f32],
        speed: f32,
    ) -> Result<Vec<f32>, EngineError> {
        let padded = check_and_pad(tokens, style, self.context_window())?;
        let seq_len = padded.len();

        let tokens_arr = Array2::from_shape_vec((1, seq_len), padded)
            .map_err(|e| EngineError::BadInput(e.to_string()))?;
        let style_view = ndarray::ArrayView2::from_shape((1, STYLE_DIM), style)
            .map_err(|e| EngineError::BadInput(e.to_string()))?;
        let speed_arr = ndarray::arr1(&[speed]);

        let outputs = self
            .session
            .run(inputs![
                self.tokens_input_name.as_str() =>
                    TensorRef::from_array_view(tokens_arr.view())
                        .map_err(|e| EngineError::Runtime(e.to_string()))?,
                "style" => TensorRef::from_array_view(style_view)
                    .map_err(|e| EngineError::Runtime(e.to_string()))?,
                "speed" => TensorRef::from_array_view(speed_arr.view())
                    .map_err(|e| EngineError::Runtime(e.to_string()))?,
            ])
            .map_err(|e| EngineError::Runtime(e.to_string()))?;

        extract_waveform(&outputs)
    }
}

/// Family-B adapter: one call per chunk, style broadcast over the context
/// window, speed pinned to 1.0 (applied later in post-processing).
pub struct WindowedOnnxEngine {
    session: Session,
    tokens_input_name: String,
}

impl WindowedOnnxEngine {
    pub fn load(model_path: &Path) -> Result<Self, EngineError> {
        let session = init_session(model_path)?;
        let tokens_input_name = detect_tokens_input(&session);
        Ok(Self {
            session,
            tokens_input_name,
        })
    }
}

impl InferenceEngine for WindowedOnnxEngine {
    fn family(&self) -> EngineFamily {
        EngineFamily::Windowed
    }

    fn context_window(&self) -> usize {
        EngineFamily::Windowed.default_context_window()
    }

    fn infer(
        &mut self,
        tokens: &[i64],
        style: &[f32],
        speed: f32,
    ) -> Result<Vec<f32>, EngineError> {
        if (speed - 1.0).abs() > f32::EPSILON {
            log::debug!("Windowed engine ignores in-model speed {speed}; applied in post");
        }
        let padded = check_and_pad(tokens, style, self.context_window())?;
        let seq_len = padded.len();

        let tokens_arr = Array2::from_shape_vec((1, seq_len), padded)
            .map_err(|e| EngineError::BadInput(e.to_string()))?;

        // The model expects the style vector broadcast across the context
        // length: shape [ctx, 1, 256] with identical rows.
        let ctx = self.context_window();
        let style_arr = Array3::from_shape_fn((ctx, 1, STYLE_DIM), |(_, _, j)| style[j]);
        let speed_arr = ndarray::arr1(&[1.0f32]);

        let outputs = self
            .session
            .run(inputs![
                self.tokens_input_name.as_str() =>
                    TensorRef::from_array_view(tokens_arr.view())
                        .map_err(|e| EngineError::Runtime(e.to_string()))?,
                "style" => TensorRef::from_array_view(style_arr.view())
                    .map_err(|e| EngineError::Runtime(e.to_string()))?,
                "speed" => TensorRef::from_array_view(speed_arr.view())
                    .map_err(|e| EngineError::Runtime(e.to_string()))?,
            ])
            .map_err(|e| EngineError::Runtime(e.to_string()))?;

        extract_waveform(&outputs)
    }
}

/// Validate style dimensionality and the context-window invariant, then wrap
/// the tokens with start/end pads.
fn check_and_pad(
    tokens: &[i64],
    style: &[f32],
    context_window: usize,
) -> Result<Vec<i64>, EngineError> {
    if style.len() != STYLE_DIM {
        return Err(EngineError::BadInput(format!(
            "style vector must be {STYLE_DIM} floats, got {}",
            style.len()
        )));
    }
    if tokens.is_empty() {
        return Err(EngineError::BadInput("empty token sequence".to_string()));
    }
    if tokens.len() + 2 > context_window {
        return Err(EngineError::BadInput(format!(
            "token count {} exceeds context window {context_window}",
            tokens.len() + 2
        )));
    }
    let mut padded = Vec::with_capacity(tokens.len() + 2);
    padded.push(PAD_ID);
    padded.extend_from_slice(tokens);
    padded.push(PAD_ID);
    Ok(padded)
}

fn extract_waveform(outputs: &SessionOutputs) -> Result<Vec<f32>, EngineError> {
    let first = outputs
        .iter()
        .next()
        .ok_or_else(|| EngineError::BadOutput("no output tensors".to_string()))?;
    let waveform = first
        .1
        .try_extract_array::<f32>()
        .map_err(|e| EngineError::BadOutput(format!("not a float32 tensor: {e}")))?;
    let samples = waveform.as_slice().unwrap_or(&[]).to_vec();
    if samples.is_empty() {
        return Err(EngineError::BadOutput("empty waveform".to_string()));
    }
    Ok(samples)
}

fn init_session(onnx_path: &Path) -> Result<Session, EngineError> {
    log::info!("Loading model from {}", onnx_path.display());
    let providers = vec![CPUExecutionProvider::default().build()];
    Session::builder()
        .and_then(|b| b.with_optimization_level(GraphOptimizationLevel::Level3))
        .and_then(|b| b.with_execution_providers(providers))
        .and_then(|b| b.commit_from_file(onnx_path))
        .map_err(|e| EngineError::Runtime(e.to_string()))
}

/// Detect the token input name ("input_ids" or "tokens") from session inputs.
fn detect_tokens_input(session: &Session) -> String {
    for input in session.inputs() {
        if input.name() == "input_ids" || input.name() == "tokens" {
            return input.name().to_string();
        }
    }
    "input_ids".to_string()
}
