//! Song model

use serde::{Deserialize, Serialize};

use super::Language;

/// A song in the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Song {
    /// Database ID
    #[serde(rename = "_id")]
    pub id: i64,
    /// Display title
    #[serde(rename = "song_name")]
    pub name: String,
    pub artist: String,
    #[serde(default)]
    pub album: Option<String>,
    pub language: Language,
    /// Language initial plus ordinal, e.g. "H1"
    pub short_code: String,
    /// Public URL of the hosted intro audio
    #[serde(rename = "intro_audio_url")]
    pub media_url: String,
    /// Host-side handle used to release the audio (not exposed)
    #[serde(skip_serializing, default)]
    pub media_id: Option<String>,
    #[serde(rename = "lyrics_link", default)]
    pub lyrics_url: String,
    /// Whether the song belongs to the current shared round
    #[serde(default)]
    pub is_selected: bool,
    /// Username of whoever added the song
    #[serde(default)]
    pub added_by: Option<String>,
    /// Unix timestamp (seconds)
    #[serde(rename = "createdAt", default)]
    pub created_at: i64,
}

/// Metadata supplied when adding a song
#[derive(Debug, Clone, Default)]
pub struct NewSong {
    pub name: String,
    pub artist: String,
    pub album: Option<String>,
    pub language: String,
    pub lyrics_url: Option<String>,
}

impl NewSong {
    /// Trim whitespace and drop empty optional fields
    pub fn normalized(mut self) -> Self {
        self.name = self.name.trim().to_string();
        self.artist = self.artist.trim().to_string();
        self.language = self.language.trim().to_string();
        self.album = self
            .album
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty());
        self.lyrics_url = self
            .lyrics_url
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty());
        self
    }
}

/// Short code for the n-th (1-based) song of a language
pub fn short_code(language: Language, ordinal: i64) -> String {
    format!("{}{}", language.initial(), ordinal)
}
