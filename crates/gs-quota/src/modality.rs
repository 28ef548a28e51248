use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Unknown modality: {0}")]
    UnknownModality(String),
    #[error("Unknown voice: {0}")]
    UnknownVoice(String),
}

/// The three kinds of media a generation can produce.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    Video,
    Image,
    Audio,
}

impl Modality {
    pub fn all() -> [Modality; 3] {
        [Modality::Video, Modality::Image, Modality::Audio]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Modality::Video => "video",
            Modality::Image => "image",
            Modality::Audio => "audio",
        }
    }
}

impl std::fmt::Display for Modality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Modality {
    type Err = ParseError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "video" => Ok(Modality::Video),
            "image" => Ok(Modality::Image),
            "audio" | "speech" => Ok(Modality::Audio),
            _ => Err(ParseError::UnknownModality(s.to_string())),
        }
    }
}

/// Per-modality generation counters owned by a user.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UsageCounters {
    #[serde(default)]
    pub video: u32,
    #[serde(default)]
    pub image: u32,
    #[serde(default)]
    pub audio: u32,
}

impl UsageCounters {
    pub fn get(&self, modality: Modality) -> u32 {
        match modality {
            Modality::Video => self.video,
            Modality::Image => self.image,
            Modality::Audio => self.audio,
        }
    }

    /// Returns a copy with the counter for `modality` bumped by one.
    pub fn incremented(mut self, modality: Modality) -> Self {
        let slot = match modality {
            Modality::Video => &mut self.video,
            Modality::Image => &mut self.image,
            Modality::Audio => &mut self.audio,
        };
        *slot = slot.saturating_add(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modality_parses_case_insensitively() {
        assert_eq!("Video".parse::<Modality>().unwrap(), Modality::Video);
        assert_eq!("IMAGE".parse::<Modality>().unwrap(), Modality::Image);
        assert_eq!("speech".parse::<Modality>().unwrap(), Modality::Audio);
        assert!(matches!(
            "gif".parse::<Modality>(),
            Err(ParseError::UnknownModality(_))
        ));
    }

    #[test]
    fn modality_serializes_lowercase() {
        let json = serde_json::to_string(&Modality::Audio).unwrap();
        assert_eq!(json, "\"audio\"");
    }

    #[test]
    fn incremented_touches_one_counter() {
        let usage = UsageCounters {
            video: 1,
            image: 2,
            audio: 3,
        };
        let next = usage.incremented(Modality::Image);
        assert_eq!(next.image, 3);
        assert_eq!(next.video, 1);
        assert_eq!(next.audio, 3);
        // original untouched
        assert_eq!(usage.image, 2);
    }

    #[test]
    fn incremented_saturates() {
        let usage = UsageCounters {
            video: u32::MAX,
            ..Default::default()
        };
        assert_eq!(usage.incremented(Modality::Video).video, u32::MAX);
    }
}
