//! First-run data: demo catalog, rotation placeholders and the host account

use anyhow::Result;
use std::collections::HashSet;
use tracing::{info, warn};

use super::{DbEngine, SongTable, UserTable};
use crate::core::RotationTable;
use crate::models::{short_code, Language, Song, User};
use crate::utils::auth::hash_password;

pub const ADMIN_USERNAME: &str = "AdminUser";
const PLACEHOLDER_AUDIO: &str =
    "https://res.cloudinary.com/demo/video/upload/v1689123456/sample_audio.mp3";

/// (title, artist) per language, in short-code order
const DEMO_SONGS: &[(Language, &[(&str, &str)])] = &[
    (
        Language::Hindi,
        &[
            ("Tum Hi Ho", "Arijit Singh"),
            ("Chaiyya Chaiyya", "Sukhwinder Singh"),
            ("Kal Ho Naa Ho", "Sonu Nigam"),
            ("Jai Ho", "A.R. Rahman"),
            ("Kabira", "Tochi Raina"),
            ("Senorita", "Farhan Akhtar"),
            ("Gerua", "Arijit Singh"),
            ("Zinda", "Farhan Akhtar"),
            ("Galliyan", "Ankit Tiwari"),
            ("Raabta", "Arijit Singh"),
        ],
    ),
    (
        Language::Bengali,
        &[
            ("Ami Je Tomar", "Shreya Ghoshal"),
            ("Bhebe Dekhecho Ki", "Moheener Ghoraguli"),
            ("Tomake", "Shreya Ghoshal"),
            ("Amake Amar Moto", "Anupam Roy"),
            ("Bojhena Shey Bojhena", "Arijit Singh"),
            ("Tumi Ashbe Bole", "Nachiketa"),
            ("Ei Obelay", "Shreya"),
            ("Pherari Mon", "Anupam Roy"),
            ("Hariye Jawar Gaan", "Fossils"),
            ("Hasnuhana", "Fossils"),
        ],
    ),
    (
        Language::English,
        &[
            ("Shape of You", "Ed Sheeran"),
            ("Blinding Lights", "The Weeknd"),
            ("Someone Like You", "Adele"),
            ("Bohemian Rhapsody", "Queen"),
            ("Hotel California", "Eagles"),
            ("Imagine", "John Lennon"),
            ("Smells Like Teen Spirit", "Nirvana"),
            ("Billie Jean", "Michael Jackson"),
            ("Rolling in the Deep", "Adele"),
            ("Uptown Funk", "Mark Ronson"),
        ],
    ),
];

const DEMO_AUDIO_TRACKS: usize = 16;

/// Insert the demo catalog when the song table is empty. Returns songs inserted.
pub async fn seed_demo_catalog(engine: &DbEngine) -> Result<usize> {
    let pool = engine.pool();

    let existing = SongTable::count(pool).await?;
    if existing > 0 {
        info!("Catalog already has {} songs; skipping demo seed", existing);
        return Ok(0);
    }

    let now = chrono::Utc::now().timestamp();
    let mut tx = pool.begin().await?;
    let mut inserted = 0;

    for (language, songs) in DEMO_SONGS {
        for (i, (title, artist)) in songs.iter().enumerate() {
            let ordinal = i as i64 + 1;
            let song = Song {
                id: 0,
                name: title.to_string(),
                artist: artist.to_string(),
                album: None,
                language: *language,
                short_code: short_code(*language, ordinal),
                media_url: format!(
                    "https://www.soundhelix.com/examples/mp3/SoundHelix-Song-{}.mp3",
                    inserted % DEMO_AUDIO_TRACKS + 1
                ),
                media_id: None,
                lyrics_url: format!("https://example.com/lyrics{}", inserted + 1),
                is_selected: false,
                added_by: Some("Admin".to_string()),
                created_at: now,
            };
            SongTable::insert(&mut *tx, &song).await?;
            inserted += 1;
        }
    }

    tx.commit().await?;
    info!("Seeded demo catalog with {} songs", inserted);

    Ok(inserted)
}

/// Insert a placeholder song for every rotation code the catalog lacks.
///
/// Only runs against a non-empty catalog; an empty one is left for
/// [`seed_demo_catalog`]. Returns songs inserted.
pub async fn ensure_rotation_codes(engine: &DbEngine, rotation: &RotationTable) -> Result<usize> {
    let pool = engine.pool();

    let existing = SongTable::all(pool).await?;
    if existing.is_empty() {
        return Ok(0);
    }

    let mut present: HashSet<String> = existing.into_iter().map(|s| s.short_code).collect();
    let now = chrono::Utc::now().timestamp();
    let mut tx = pool.begin().await?;
    let mut inserted = 0;

    for code in rotation.slots().iter().flatten() {
        if present.contains(code) {
            continue;
        }
        let Some(language) = code.chars().next().and_then(Language::from_initial) else {
            warn!("Rotation code {} has no language; skipping", code);
            continue;
        };

        let song = Song {
            id: 0,
            name: format!("Dummy Song {}", code),
            artist: "Placeholder Artist".to_string(),
            album: Some("Placeholder Album".to_string()),
            language,
            short_code: code.clone(),
            media_url: PLACEHOLDER_AUDIO.to_string(),
            media_id: None,
            lyrics_url: "https://example.com/lyrics".to_string(),
            is_selected: false,
            added_by: Some("Admin".to_string()),
            created_at: now,
        };
        SongTable::insert(&mut *tx, &song).await?;
        present.insert(code.clone());
        inserted += 1;
    }

    tx.commit().await?;
    if inserted > 0 {
        info!("Added {} placeholder songs for rotation codes", inserted);
    }

    Ok(inserted)
}

/// Create the host account when no user holds `email`. Returns true if created.
pub async fn ensure_admin_account(engine: &DbEngine, email: &str, password: &str) -> Result<bool> {
    let pool = engine.pool();

    if UserTable::get_by_email(pool, email).await?.is_some() {
        return Ok(false);
    }

    let user = User::new(
        ADMIN_USERNAME.to_string(),
        email.trim().to_lowercase(),
        hash_password(password),
    );
    UserTable::insert(pool, &user).await?;
    info!("Created host account {}", user.email);

    Ok(true)
}
