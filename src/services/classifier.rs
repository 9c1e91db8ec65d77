use anyhow::{Context, Result};
use std::path::Path;

use crate::models::Observation;

/// Raw image payload handed to a classifier.
#[derive(Debug, Clone)]
pub struct ImageInput {
    pub bytes: Vec<u8>,
    pub mime_type: &'static str,
}

impl ImageInput {
    /// Sniffs the MIME type from magic bytes; `None` for anything that is not PNG, JPEG, GIF, WebP or HEIC/HEIF.
    pub fn from_bytes(bytes: Vec<u8>) -> Option<Self> {
        let mime_type = sniff_mime_type(&bytes)?;
        Some(Self { bytes, mime_type })
    }
}

fn sniff_mime_type(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        Some("image/png")
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("image/jpeg")
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        Some("image/gif")
    } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some("image/webp")
    } else if bytes.len() >= 12 && &bytes[4..8] == b"ftyp" {
        // ISO-BMFF container, the major brand tells HEIC apart from other HEIF payloads
        match &bytes[8..12] {
            b"heic" | b"heix" | b"hevc" | b"hevx" | b"heim" | b"heis" => Some("image/heic"),
            b"mif1" | b"msf1" | b"heif" => Some("image/heif"),
            _ => None,
        }
    } else {
        None
    }
}

/// Anything that can rank labels for an image (remote vision model, recorded output, ...)
#[async_trait::async_trait]
pub trait ImageClassifier: Send + Sync {
    /// Observations in descending confidence order.
    async fn classify(&self, image: &ImageInput) -> Result<Vec<Observation>>;
}

/// Replays a fixed observation list regardless of the image.
pub struct StaticClassifier {
    observations: Vec<Observation>,
}

impl StaticClassifier {
    pub fn new(mut observations: Vec<Observation>) -> Self {
        observations.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        Self { observations }
    }

    /// Loads `[{"identifier": ..., "confidence": ...}]` recorded from an earlier run.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read observations {}", path.display()))?;
        let observations: Vec<Observation> = serde_json::from_str(&json)
            .with_context(|| format!("invalid observations file {}", path.display()))?;
        log::info!("📼 Loaded {} recorded observations", observations.len());
        Ok(Self::new(observations))
    }
}

#[async_trait::async_trait]
impl ImageClassifier for StaticClassifier {
    async fn classify(&self, image: &ImageInput) -> Result<Vec<Observation>> {
        log::debug!("📼 Replaying observations for {} image ({} bytes)", image.mime_type, image.bytes.len());
        Ok(self.observations.clone())
    }
}
