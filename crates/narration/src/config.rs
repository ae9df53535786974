use std::path::Path;

use narration_audio::{AudioFormat, ContainerKind};
use narration_storage::chapter::{VERSES_FILENAME, WORKING_AUDIO_FILENAME};

pub const SETTINGS_KEY: &str = "narration";

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[cfg_attr(feature = "specta", derive(specta::Type))]
#[serde(default)]
pub struct NarrationConfig {
    pub format: AudioFormat,
    pub container_kind: ContainerKind,
    pub working_audio_file: String,
    pub verses_file: String,
}

impl Default for NarrationConfig {
    fn default() -> Self {
        Self {
            format: AudioFormat::default(),
            container_kind: ContainerKind::Pcm,
            working_audio_file: WORKING_AUDIO_FILENAME.to_string(),
            verses_file: VERSES_FILENAME.to_string(),
        }
    }
}

impl NarrationConfig {
    /// Reads the `"narration"` object of a settings document. Missing keys
    /// fall back to defaults.
    pub fn from_settings(settings: &serde_json::Value) -> crate::Result<Self> {
        match settings.get(SETTINGS_KEY) {
            Some(value) => Ok(serde_json::from_value(value.clone())?),
            None => Ok(Self::default()),
        }
    }

    /// Loads from a settings file; a missing file yields the defaults.
    pub async fn load(path: &Path) -> crate::Result<Self> {
        let settings = match tokio::fs::read_to_string(path).await {
            Ok(content) => serde_json::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => serde_json::json!({}),
            Err(e) => return Err(e.into()),
        };
        Self::from_settings(&settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_section_uses_defaults() {
        let config = NarrationConfig::from_settings(&json!({"theme": "dark"})).unwrap();
        assert_eq!(config, NarrationConfig::default());
        assert_eq!(config.working_audio_file, "narration.pcm");
        assert_eq!(config.verses_file, "narration_verses.json");
    }

    #[test]
    fn partial_section_is_merged_with_defaults() {
        let settings = json!({
            "narration": {
                "container_kind": "wav",
                "working_audio_file": "chapter.wav",
                "format": { "sample_rate": 48000, "channels": 2, "bits_per_sample": 16 }
            }
        });
        let config = NarrationConfig::from_settings(&settings).unwrap();

        assert_eq!(config.container_kind, ContainerKind::Wav);
        assert_eq!(config.working_audio_file, "chapter.wav");
        assert_eq!(config.format, AudioFormat::new(48000, 2, 16));
        assert_eq!(config.verses_file, "narration_verses.json");
    }

    #[test]
    fn keys_follow_the_nested_format_convention() {
        let value = serde_json::to_value(NarrationConfig::default()).unwrap();
        assert_eq!(
            value,
            json!({
                "format": { "sample_rate": 44100, "channels": 1, "bits_per_sample": 16 },
                "container_kind": "pcm",
                "working_audio_file": "narration.pcm",
                "verses_file": "narration_verses.json",
            })
        );
    }

    #[test]
    fn malformed_section_is_an_error() {
        let settings = json!({ "narration": { "container_kind": "mp3" } });
        assert!(matches!(
            NarrationConfig::from_settings(&settings),
            Err(crate::Error::Json(_))
        ));
    }

    #[tokio::test]
    async fn load_without_file_yields_defaults() {
        let temp = tempfile::tempdir().unwrap();
        let config = NarrationConfig::load(&temp.path().join("settings.json"))
            .await
            .unwrap();
        assert_eq!(config, NarrationConfig::default());
    }

    #[tokio::test]
    async fn load_reads_settings_file() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("settings.json");
        std::fs::write(&path, r#"{"narration":{"verses_file":"active_verses.json"}}"#).unwrap();

        let config = NarrationConfig::load(&path).await.unwrap();
        assert_eq!(config.verses_file, "active_verses.json");
    }
}
