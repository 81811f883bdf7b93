//! Named format presets handed to the media fetcher.
//!
//! The built-in table covers the usual video/audio choices. A `[[presets]]`
//! list in config.toml replaces it wholesale.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Post-processing step applied by the fetcher after download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "key")]
pub enum PostProcessor {
    /// Extract the audio track and transcode it.
    ExtractAudio {
        preferred_codec: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        preferred_quality: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preset {
    pub name: String,
    /// Format selector, e.g. `bestvideo+bestaudio/best`.
    pub format: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merge_output_format: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub postprocessors: Vec<PostProcessor>,
}

impl Preset {
    fn video(name: &str, format: &str) -> Self {
        Self {
            name: name.to_string(),
            format: format.to_string(),
            merge_output_format: Some("mp4".to_string()),
            postprocessors: Vec::new(),
        }
    }

    fn audio(name: &str, format: &str, codec: &str, quality: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            format: format.to_string(),
            merge_output_format: None,
            postprocessors: vec![PostProcessor::ExtractAudio {
                preferred_codec: codec.to_string(),
                preferred_quality: quality.map(str::to_string),
            }],
        }
    }
}

/// Ordered preset lookup table with a default entry.
#[derive(Debug, Clone)]
pub struct PresetTable {
    presets: Vec<Preset>,
    default_index: usize,
}

pub const DEFAULT_PRESET: &str = "Video (Best MP4)";

impl PresetTable {
    /// Validates the table: non-empty, unique names, and `default` (if given) present.
    /// Without `default` the first entry is the default.
    pub fn new(presets: Vec<Preset>, default: Option<&str>) -> Result<Self, CoreError> {
        if presets.is_empty() {
            return Err(CoreError::validation("preset table is empty"));
        }
        for (i, preset) in presets.iter().enumerate() {
            if presets[..i].iter().any(|p| p.name == preset.name) {
                return Err(CoreError::validation(format!(
                    "duplicate preset name: {}",
                    preset.name
                )));
            }
        }
        let default_index = match default {
            Some(name) => presets
                .iter()
                .position(|p| p.name == name)
                .ok_or_else(|| CoreError::validation(format!("Unknown preset: {name}")))?,
            None => 0,
        };
        Ok(Self {
            presets,
            default_index,
        })
    }

    pub fn builtin() -> Self {
        Self {
            presets: builtin_presets(),
            default_index: 0,
        }
    }

    pub fn get(&self, name: &str) -> Option<&Preset> {
        self.presets.iter().find(|p| p.name == name)
    }

    /// Like `get`, but an unknown name is a validation error.
    pub fn resolve(&self, name: &str) -> Result<&Preset, CoreError> {
        self.get(name)
            .ok_or_else(|| CoreError::validation(format!("Unknown preset: {name}")))
    }

    pub fn default_preset(&self) -> &Preset {
        &self.presets[self.default_index]
    }

    pub fn names(&self) -> Vec<&str> {
        self.presets.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Preset> {
        self.presets.iter()
    }
}

impl Default for PresetTable {
    fn default() -> Self {
        Self::builtin()
    }
}

fn builtin_presets() -> Vec<Preset> {
    vec![
        Preset::video(DEFAULT_PRESET, "bestvideo+bestaudio/best"),
        Preset::video("Video (4K/High Res)", "bestvideo[height>1080]+bestaudio/best"),
        Preset::video(
            "Video (1080p MP4)",
            "bestvideo[height<=1080]+bestaudio/best[height<=1080]/best",
        ),
        Preset::video(
            "Video (720p MP4)",
            "bestvideo[height<=720]+bestaudio/best[height<=720]/best",
        ),
        Preset::audio("Audio (MP3 Best)", "bestaudio/best", "mp3", Some("192")),
        Preset::audio("Audio (M4A)", "bestaudio[ext=m4a]/bestaudio", "m4a", None),
    ]
}
