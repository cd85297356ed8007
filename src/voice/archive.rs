//! Loading voice embeddings and catalog metadata from disk.
//!
//! Embeddings ship as a zip archive of `.npy` members (little-endian
//! float32, C order), one member per voice id. Catalog metadata ships as a
//! JSON array describing language, engine family, gender and quality per
//! voice. Both are parsed once at startup; the resulting [`VoiceStore`] is
//! read-only.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use super::{EngineFamily, Voice, VoiceStore};
use crate::error::SynthesisError;

/// One JSON catalog entry.
#[derive(Debug, Clone, Deserialize)]
pub struct VoiceCatalogEntry {
    pub id: String,
    pub language: String,
    pub family: EngineFamily,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub quality: Option<String>,
}

/// Load all embeddings from a zip archive of `.npy` members.
///
/// The member name without its `.npy` extension is the voice id.
pub fn load_embedding_archive(path: &Path) -> Result<HashMap<String, Vec<f32>>, SynthesisError> {
    let file = File::open(path)?;
    let mut zip = zip::ZipArchive::new(file)
        .map_err(|e| SynthesisError::VoiceParse(format!("Failed to open zip archive: {e}")))?;

    let mut embeddings = HashMap::new();
    for i in 0..zip.len() {
        let mut entry = zip
            .by_index(i)
            .map_err(|e| SynthesisError::VoiceParse(format!("Failed to read zip entry {i}: {e}")))?;

        let raw_name = entry.name().to_string();
        let voice_id = raw_name
            .trim_end_matches('/')
            .trim_end_matches(".npy")
            .to_string();
        if voice_id.is_empty() || raw_name.ends_with('/') {
            continue;
        }

        let mut data = Vec::new();
        entry
            .read_to_end(&mut data)
            .map_err(|e| SynthesisError::VoiceParse(format!("Failed to read {raw_name}: {e}")))?;

        embeddings.insert(voice_id, parse_npy_f32(&data, &raw_name)?);
    }

    log::info!("Loaded {} voice embeddings", embeddings.len());
    Ok(embeddings)
}

/// Build a [`VoiceStore`] from a JSON catalog string and loaded embeddings.
///
/// Catalog entries without a matching embedding are skipped with a logged
/// warning; embeddings without a catalog entry are ignored.
pub fn build_store(
    catalog_json: &str,
    mut embeddings: HashMap<String, Vec<f32>>,
) -> Result<VoiceStore, SynthesisError> {
    let entries: Vec<VoiceCatalogEntry> = serde_json::from_str(catalog_json)
        .map_err(|e| SynthesisError::Config(format!("Invalid voice catalog: {e}")))?;

    let mut store = VoiceStore::new();
    for entry in entries {
        let Some(embedding) = embeddings.remove(&entry.id) else {
            log::warn!("Voice '{}' has no embedding in the archive, skipping", entry.id);
            continue;
        };
        let voice = Voice::new(entry.id, entry.language, entry.family, embedding)?
            .with_metadata(entry.gender, entry.quality);
        store.register(voice);
    }
    Ok(store)
}

/// Parse a `.npy` buffer into flat little-endian float32 data.
///
/// Accepts format versions 1.0 and 2.0, float32 dtype, C order.
fn parse_npy_f32(data: &[u8], name: &str) -> Result<Vec<f32>, SynthesisError> {
    if data.len() < 10 {
        return Err(SynthesisError::VoiceParse(format!(
            "{name}: file too short ({} bytes)",
            data.len()
        )));
    }
    if &data[0..6] != b"\x93NUMPY" {
        return Err(SynthesisError::VoiceParse(format!(
            "{name}: invalid numpy magic bytes"
        )));
    }

    let major = data[6];
    let (header_len, header_start) = match major {
        1 => (u16::from_le_bytes([data[8], data[9]]) as usize, 10),
        2 => {
            if data.len() < 12 {
                return Err(SynthesisError::VoiceParse(format!("{name}: v2 header truncated")));
            }
            (
                u32::from_le_bytes([data[8], data[9], data[10], data[11]]) as usize,
                12,
            )
        }
        other => {
            return Err(SynthesisError::VoiceParse(format!(
                "{name}: unsupported npy version {other}"
            )));
        }
    };

    let data_offset = header_start + header_len;
    if data.len() < data_offset {
        return Err(SynthesisError::VoiceParse(format!(
            "{name}: header truncated (need {data_offset} bytes, got {})",
            data.len()
        )));
    }

    let header = std::str::from_utf8(&data[header_start..data_offset])
        .map_err(|_| SynthesisError::VoiceParse(format!("{name}: header is not UTF-8")))?;
    if !header.contains("<f4") && !header.contains("=f4") && !header.contains("|f4") {
        return Err(SynthesisError::VoiceParse(format!(
            "{name}: only little-endian float32 arrays are supported"
        )));
    }

    let float_data = &data[data_offset..];
    if float_data.len() % 4 != 0 {
        return Err(SynthesisError::VoiceParse(format!(
            "{name}: float data length {} is not a multiple of 4",
            float_data.len()
        )));
    }

    Ok(float_data
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a minimal v1.0 npy buffer.
    fn make_npy(values: &[f32]) -> Vec<u8> {
        let header_str = format!(
            "{{'descr': '<f4', 'fortran_order': False, 'shape': ({},), }}",
            values.len()
        );
        let raw_len = header_str.len() + 1;
        let padded_len = raw_len.div_ceil(64) * 64;
        let mut header = header_str;
        for _ in 0..(padded_len - raw_len) {
            header.push(' ');
        }
        header.push('\n');

        let mut buf = Vec::new();
        buf.extend_from_slice(b"\x93NUMPY");
        buf.push(1);
        buf.push(0);
        buf.extend_from_slice(&(header.len() as u16).to_le_bytes());
        buf.extend_from_slice(header.as_bytes());
        for &v in values {
            buf.extend_from_slice(&v.to_le_bytes());
        }
        buf
    }

    #[test]
    fn parses_flat_f32_npy() {
        let values = vec![1.0f32, -0.5, 0.25];
        let buf = make_npy(&values);
        assert_eq!(parse_npy_f32(&buf, "test").unwrap(), values);
    }

    #[test]
    fn rejects_bad_magic() {
        assert!(parse_npy_f32(b"NOTANPYFILE", "test").is_err());
    }

    #[test]
    fn builds_store_from_catalog_and_embeddings() {
        let mut embeddings = HashMap::new();
        embeddings.insert("ktn_f1".to_string(), vec![0.1f32; 256]);
        let catalog = r#"[
            {"id": "ktn_f1", "language": "en-us", "family": "single_shot",
             "gender": "female", "quality": "high"},
            {"id": "ktn_missing", "language": "en-us", "family": "single_shot"}
        ]"#;
        let store = build_store(catalog, embeddings).unwrap();
        assert_eq!(store.len(), 1);
        let voice = store.get("ktn_f1").unwrap();
        assert_eq!(voice.gender.as_deref(), Some("female"));
    }

    #[test]
    fn bad_catalog_json_is_an_error() {
        assert!(build_store("not json", HashMap::new()).is_err());
    }
}
