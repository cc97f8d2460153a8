//! Remote voice catalog.
//!
//! The remote synthesis service exposes a small set of prebuilt voices,
//! addressed by name. The catalog here is what the selection UI renders;
//! documents store only the [`VoiceId`].

use serde::{Deserialize, Serialize};

/// Identifier of a synthesis voice.
#[derive(Debug, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VoiceId(pub String);

impl VoiceId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for VoiceId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl std::fmt::Display for VoiceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A selectable remote synthesis voice.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceInfo {
    /// Voice identifier sent to the synthesis service.
    pub id: VoiceId,

    /// Human-readable display label.
    pub label: String,
}

/// Voice used when the caller does not pick one.
pub const DEFAULT_VOICE: &str = "Zephyr";

/// All remote voices selectable in the app.
#[must_use]
pub fn remote_voices() -> Vec<VoiceInfo> {
    [
        ("Kore", "Kore (Youthful)"),
        ("Puck", "Puck (Energetic)"),
        ("Charon", "Charon (Wise)"),
        ("Fenrir", "Fenrir (Deep)"),
        ("Zephyr", "Zephyr (Warm)"),
    ]
    .into_iter()
    .map(|(id, label)| VoiceInfo {
        id: VoiceId::from(id),
        label: label.to_string(),
    })
    .collect()
}
