use crate::modality::{Modality, ParseError};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Prebuilt speech voices offered by the upstream TTS model.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Voice {
    Puck,
    Charon,
    #[default]
    Kore,
    Fenrir,
    Zephyr,
}

impl Voice {
    pub fn all() -> [Voice; 5] {
        [
            Voice::Puck,
            Voice::Charon,
            Voice::Kore,
            Voice::Fenrir,
            Voice::Zephyr,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Voice::Puck => "Puck",
            Voice::Charon => "Charon",
            Voice::Kore => "Kore",
            Voice::Fenrir => "Fenrir",
            Voice::Zephyr => "Zephyr",
        }
    }
}

impl std::fmt::Display for Voice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Voice {
    type Err = ParseError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Voice::all()
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseError::UnknownVoice(s.to_string()))
    }
}

/// Modality-specific payload of a finished generation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum GeneratedMedia {
    Video { url: String },
    Image { url: String },
    Audio { url: String, voice: Voice },
}

impl GeneratedMedia {
    pub fn modality(&self) -> Modality {
        match self {
            GeneratedMedia::Video { .. } => Modality::Video,
            GeneratedMedia::Image { .. } => Modality::Image,
            GeneratedMedia::Audio { .. } => Modality::Audio,
        }
    }

    pub fn url(&self) -> &str {
        match self {
            GeneratedMedia::Video { url }
            | GeneratedMedia::Image { url }
            | GeneratedMedia::Audio { url, .. } => url,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GeneratedContent {
    #[serde(flatten)]
    pub media: GeneratedMedia,
    pub prompt: String,
    /// Unix epoch milliseconds.
    pub timestamp: i64,
}

impl GeneratedContent {
    /// Builds a record stamped with the current time.
    pub fn new(media: GeneratedMedia, prompt: impl Into<String>) -> Self {
        Self::with_timestamp(media, prompt, Utc::now().timestamp_millis())
    }

    pub fn with_timestamp(media: GeneratedMedia, prompt: impl Into<String>, timestamp: i64) -> Self {
        Self {
            media,
            prompt: prompt.into(),
            timestamp,
        }
    }

    pub fn modality(&self) -> Modality {
        self.media.modality()
    }

    pub fn url(&self) -> &str {
        self.media.url()
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.timestamp).single()
    }
}
