use base64::Engine;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

pub const BLOB_PREFIX: &str = "blob:genstudio/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaBlob {
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl MediaBlob {
    pub fn extension(&self) -> &'static str {
        let mime = self.mime.split(';').next().unwrap_or_default().trim();
        match mime {
            "video/mp4" => "mp4",
            "image/png" => "png",
            "image/jpeg" => "jpg",
            "image/webp" => "webp",
            "audio/wav" | "audio/x-wav" => "wav",
            "audio/mpeg" => "mp3",
            _ => "bin",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("Unknown media reference: {0}")]
    UnknownReference(String),
    #[error("Malformed data URI")]
    MalformedDataUri,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Session-local registry of generated media, handing out `blob:` style
/// references much like a browser object URL.
#[derive(Debug, Clone, Default)]
pub struct MediaStore {
    blobs: Arc<RwLock<HashMap<Uuid, MediaBlob>>>,
}

impl MediaStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, mime: impl Into<String>, bytes: Vec<u8>) -> String {
        let id = Uuid::new_v4();
        let blob = MediaBlob {
            mime: mime.into(),
            bytes,
        };
        tracing::debug!("Registered {} bytes of {} as {}", blob.bytes.len(), blob.mime, id);
        self.blobs.write().await.insert(id, blob);
        format!("{BLOB_PREFIX}{id}")
    }

    /// Resolves a `blob:` handle from this store or an inline `data:` URI.
    pub async fn resolve(&self, url: &str) -> Result<MediaBlob, MediaError> {
        if url.starts_with("data:") {
            return decode_data_uri(url);
        }
        let id = parse_handle(url).ok_or_else(|| MediaError::UnknownReference(url.to_string()))?;
        self.blobs
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| MediaError::UnknownReference(url.to_string()))
    }

    /// Drops a blob handle. Returns `false` if it was unknown.
    pub async fn revoke(&self, url: &str) -> bool {
        match parse_handle(url) {
            Some(id) => self.blobs.write().await.remove(&id).is_some(),
            None => false,
        }
    }

    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Writes the referenced media to `path`.
    pub async fn export(&self, url: &str, path: &Path) -> Result<MediaBlob, MediaError> {
        let blob = self.resolve(url).await?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(path, &blob.bytes).await?;
        Ok(blob)
    }
}

fn parse_handle(url: &str) -> Option<Uuid> {
    url.strip_prefix(BLOB_PREFIX)
        .and_then(|id| Uuid::parse_str(id).ok())
}

pub fn data_uri(mime: &str, base64_data: &str) -> String {
    format!("data:{mime};base64,{base64_data}")
}

pub fn decode_data_uri(url: &str) -> Result<MediaBlob, MediaError> {
    let rest = url.strip_prefix("data:").ok_or(MediaError::MalformedDataUri)?;
    let (meta, data) = rest.split_once(',').ok_or(MediaError::MalformedDataUri)?;
    let mime = meta
        .strip_suffix(";base64")
        .ok_or(MediaError::MalformedDataUri)?;
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(data)
        .map_err(|_| MediaError::MalformedDataUri)?;
    Ok(MediaBlob {
        mime: mime.to_string(),
        bytes,
    })
}

/// Wraps raw signed 16-bit little-endian PCM in a RIFF/WAVE container.
pub fn pcm16_to_wav(pcm: &[u8], sample_rate: u32, channels: u16) -> Vec<u8> {
    let bits_per_sample: u16 = 16;
    let block_align = channels * bits_per_sample / 8;
    let byte_rate = sample_rate * u32::from(block_align);
    let data_len = pcm.len() as u32;

    let mut wav = Vec::with_capacity(44 + pcm.len());
    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&(36 + data_len).to_le_bytes());
    wav.extend_from_slice(b"WAVE");
    wav.extend_from_slice(b"fmt ");
    wav.extend_from_slice(&16u32.to_le_bytes());
    wav.extend_from_slice(&1u16.to_le_bytes()); // PCM
    wav.extend_from_slice(&channels.to_le_bytes());
    wav.extend_from_slice(&sample_rate.to_le_bytes());
    wav.extend_from_slice(&byte_rate.to_le_bytes());
    wav.extend_from_slice(&block_align.to_le_bytes());
    wav.extend_from_slice(&bits_per_sample.to_le_bytes());
    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&data_len.to_le_bytes());
    wav.extend_from_slice(pcm);
    wav
}
