//! Catalog maintenance: listing, adding and deleting songs

use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{info, warn};

use super::error::{Result, ShuffleError};
use super::media::{MediaAsset, MediaHost, Upload};
use crate::db::SongTable;
use crate::models::{short_code, Language, NewSong, Song};

pub struct Catalog {
    pool: SqlitePool,
    media: Arc<dyn MediaHost>,
    max_upload_bytes: usize,
}

impl Catalog {
    pub fn new(pool: SqlitePool, media: Arc<dyn MediaHost>, max_upload_bytes: usize) -> Self {
        Self {
            pool,
            media,
            max_upload_bytes,
        }
    }

    /// All songs, newest first
    pub async fn list_songs(&self) -> Result<Vec<Song>> {
        Ok(SongTable::all(&self.pool).await?)
    }

    /// Songs in the current shared round
    pub async fn selected_songs(&self) -> Result<Vec<Song>> {
        Ok(SongTable::selected(&self.pool).await?)
    }

    /// Check an upload before it is sent anywhere
    pub fn check_upload(&self, upload: &Upload) -> Result<()> {
        if !upload.is_audio() {
            return Err(ShuffleError::Validation(
                "Only audio files are allowed!".to_string(),
            ));
        }
        if upload.bytes.is_empty() {
            return Err(ShuffleError::Validation("Uploaded file is empty".to_string()));
        }
        if upload.bytes.len() > self.max_upload_bytes {
            return Err(ShuffleError::Validation(format!(
                "File exceeds the {} MB upload limit",
                self.max_upload_bytes / (1024 * 1024)
            )));
        }
        Ok(())
    }

    /// Upload the audio, then record the song. The upload is released again
    /// if the song cannot be recorded.
    pub async fn add_uploaded_song(
        &self,
        new_song: NewSong,
        upload: Upload,
        added_by: Option<String>,
    ) -> Result<Song> {
        let new_song = new_song.normalized();
        let language = validate(&new_song)?;
        self.check_upload(&upload)?;
        self.ensure_unique_name(&new_song.name).await?;

        let asset = self
            .media
            .upload(&upload)
            .await
            .map_err(|e| ShuffleError::Media(e.to_string()))?;

        match self.insert(new_song, language, &asset, added_by).await {
            Ok(song) => Ok(song),
            Err(err) => {
                if let Err(e) = self.media.release(&asset.media_id).await {
                    warn!("Failed to release orphaned upload {}: {}", asset.media_id, e);
                }
                Err(err)
            }
        }
    }

    /// Record a song whose audio is already hosted. An empty `media_id` means
    /// the audio is not ours to release.
    pub async fn add_song(
        &self,
        new_song: NewSong,
        asset: MediaAsset,
        added_by: Option<String>,
    ) -> Result<Song> {
        let new_song = new_song.normalized();
        let language = validate(&new_song)?;
        self.ensure_unique_name(&new_song.name).await?;
        self.insert(new_song, language, &asset, added_by).await
    }

    /// Remove a song and release its hosted audio
    pub async fn delete_song(&self, id: i64) -> Result<Song> {
        let song = SongTable::get_by_id(&self.pool, id)
            .await?
            .ok_or_else(|| ShuffleError::NotFound(format!("Song {}", id)))?;

        if !SongTable::delete(&self.pool, id).await? {
            return Err(ShuffleError::NotFound(format!("Song {}", id)));
        }
        info!("Deleted song {} ({})", song.short_code, song.name);

        if let Some(media_id) = song.media_id.as_deref() {
            if let Err(e) = self.media.release(media_id).await {
                warn!("Failed to release media for song {}: {}", song.short_code, e);
            }
        }

        Ok(song)
    }

    async fn ensure_unique_name(&self, name: &str) -> Result<()> {
        if let Some(existing) = SongTable::find_by_name(&self.pool, name).await? {
            return Err(ShuffleError::Conflict(format!(
                "A song with the name \"{}\" already exists. Please choose a different name.",
                existing.name
            )));
        }
        Ok(())
    }

    /// Assign the next short code for the language and insert, in one transaction
    async fn insert(
        &self,
        new_song: NewSong,
        language: Language,
        asset: &MediaAsset,
        added_by: Option<String>,
    ) -> Result<Song> {
        let mut tx = self.pool.begin().await?;

        let count = SongTable::count_by_language(&mut *tx, language).await?;
        let mut song = Song {
            id: 0,
            name: new_song.name,
            artist: new_song.artist,
            album: new_song.album,
            language,
            short_code: short_code(language, count + 1),
            media_url: asset.url.clone(),
            media_id: Some(asset.media_id.clone()).filter(|id| !id.is_empty()),
            lyrics_url: new_song.lyrics_url.unwrap_or_default(),
            is_selected: false,
            added_by,
            created_at: chrono::Utc::now().timestamp(),
        };

        song.id = match SongTable::insert(&mut *tx, &song).await {
            Ok(id) => id,
            Err(e) if is_unique_violation(&e) => {
                // codes follow the per-language count, so a delete leaves a gap
                return Err(ShuffleError::Conflict(format!(
                    "Short code {} is already taken: the {} code sequence has a gap. \
                     Re-add the missing song or renumber the catalog.",
                    song.short_code, language
                )));
            }
            Err(e) => return Err(e.into()),
        };

        tx.commit().await?;
        info!("Added song {} ({})", song.short_code, song.name);

        Ok(song)
    }
}

fn validate(new_song: &NewSong) -> Result<Language> {
    if new_song.name.is_empty() || new_song.artist.is_empty() || new_song.language.is_empty() {
        return Err(ShuffleError::Validation(
            "Please provide name, artist, language, and a song file".to_string(),
        ));
    }

    Language::from_str(&new_song.language).ok_or_else(|| {
        ShuffleError::Validation(format!("Unsupported language '{}'", new_song.language))
    })
}

fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.downcast_ref::<sqlx::Error>()
        .and_then(|e| e.as_database_error())
        .map(|e| e.is_unique_violation())
        .unwrap_or(false)
}
