//! Song table operations
//!
//! Every query takes a generic executor so the same call works against the
//! pool or inside a transaction (`&mut *tx`).

use anyhow::Result;
use sqlx::{Executor, FromRow, Sqlite};

use crate::models::{Language, Song};

/// Database row for song table
#[derive(Debug, FromRow)]
struct SongRow {
    id: i64,
    name: String,
    artist: String,
    album: Option<String>,
    language: String,
    short_code: String,
    media_url: String,
    media_id: Option<String>,
    lyrics_url: String,
    is_selected: bool,
    added_by: Option<String>,
    created_at: i64,
}

impl SongRow {
    fn into_song(self) -> Option<Song> {
        let Some(language) = Language::from_str(&self.language) else {
            tracing::warn!(
                "Skipping song {} ({}) with unknown language '{}'",
                self.id,
                self.short_code,
                self.language
            );
            return None;
        };

        Some(Song {
            id: self.id,
            name: self.name,
            artist: self.artist,
            album: self.album,
            language,
            short_code: self.short_code,
            media_url: self.media_url,
            media_id: self.media_id,
            lyrics_url: self.lyrics_url,
            is_selected: self.is_selected,
            added_by: self.added_by,
            created_at: self.created_at,
        })
    }
}

fn into_songs(rows: Vec<SongRow>) -> Vec<Song> {
    rows.into_iter().filter_map(SongRow::into_song).collect()
}

/// Song table operations
pub struct SongTable;

impl SongTable {
    /// Get all songs, newest first
    pub async fn all<'e, E>(executor: E) -> Result<Vec<Song>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let rows: Vec<SongRow> =
            sqlx::query_as("SELECT * FROM song ORDER BY created_at DESC, id DESC")
                .fetch_all(executor)
                .await?;

        Ok(into_songs(rows))
    }

    /// Get song by ID
    pub async fn get_by_id<'e, E>(executor: E, id: i64) -> Result<Option<Song>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let row: Option<SongRow> = sqlx::query_as("SELECT * FROM song WHERE id = ?")
            .bind(id)
            .fetch_optional(executor)
            .await?;

        Ok(row.and_then(SongRow::into_song))
    }

    /// Case-insensitive lookup by display name
    pub async fn find_by_name<'e, E>(executor: E, name: &str) -> Result<Option<Song>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let row: Option<SongRow> =
            sqlx::query_as("SELECT * FROM song WHERE lower(name) = lower(?) LIMIT 1")
                .bind(name)
                .fetch_optional(executor)
                .await?;

        Ok(row.and_then(SongRow::into_song))
    }

    /// Songs flagged as part of the current round, in catalog order
    pub async fn selected<'e, E>(executor: E) -> Result<Vec<Song>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let rows: Vec<SongRow> =
            sqlx::query_as("SELECT * FROM song WHERE is_selected = 1 ORDER BY language, id")
                .fetch_all(executor)
                .await?;

        Ok(into_songs(rows))
    }

    /// Number of songs in a language
    pub async fn count_by_language<'e, E>(executor: E, language: Language) -> Result<i64>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM song WHERE language = ?")
            .bind(language.as_str())
            .fetch_one(executor)
            .await?;

        Ok(count)
    }

    /// Total number of songs
    pub async fn count<'e, E>(executor: E) -> Result<i64>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM song")
            .fetch_one(executor)
            .await?;

        Ok(count)
    }

    /// Insert a song, returning its new ID. `id` and `is_selected` are ignored.
    pub async fn insert<'e, E>(executor: E, song: &Song) -> Result<i64>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            r#"
            INSERT INTO song (
                name, artist, album, language, short_code,
                media_url, media_id, lyrics_url, is_selected, added_by, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, 0, ?, ?)
            "#,
        )
        .bind(&song.name)
        .bind(&song.artist)
        .bind(&song.album)
        .bind(song.language.as_str())
        .bind(&song.short_code)
        .bind(&song.media_url)
        .bind(&song.media_id)
        .bind(&song.lyrics_url)
        .bind(&song.added_by)
        .bind(song.created_at)
        .execute(executor)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Delete a song by ID
    pub async fn delete<'e, E>(executor: E, id: i64) -> Result<bool>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM song WHERE id = ?")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Make exactly the songs whose short code is in `codes` selected.
    ///
    /// One statement rewrites every flag, so no reader ever sees the
    /// cleared-but-not-yet-set state.
    pub async fn replace_selection<'e, E>(executor: E, codes: &[String]) -> Result<()>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let codes_json = serde_json::to_string(codes)?;

        sqlx::query(
            r#"
            UPDATE song
            SET is_selected = (short_code IN (SELECT value FROM json_each(?)))
            "#,
        )
        .bind(codes_json)
        .execute(executor)
        .await?;

        Ok(())
    }
}

/// Catalog fixture: insert one song per short code, language taken from the initial
#[cfg(test)]
pub async fn insert_codes(pool: &sqlx::SqlitePool, codes: &[&str]) -> Vec<i64> {
    let mut ids = Vec::with_capacity(codes.len());
    for code in codes {
        let language = code
            .chars()
            .next()
            .and_then(Language::from_initial)
            .expect("fixture code must start with a language initial");
        let song = Song {
            id: 0,
            name: format!("Song {}", code),
            artist: "Fixture Artist".to_string(),
            album: None,
            language,
            short_code: code.to_string(),
            media_url: format!("https://media.test/{}.mp3", code),
            media_id: None,
            lyrics_url: String::new(),
            is_selected: false,
            added_by: None,
            created_at: 0,
        };
        ids.push(SongTable::insert(pool, &song).await.unwrap());
    }
    ids
}
