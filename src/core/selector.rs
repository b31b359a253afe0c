//! Round selection
//!
//! The privileged requester walks the fixed rotation: each advance rewrites
//! the catalog's `is_selected` flags to the next slot and moves the shared
//! cursor, so every viewer sees the same round. Ordinary requesters get a
//! fresh random sample per language that is returned to them only; the
//! catalog and the cursor are left untouched. While the round is locked,
//! ordinary requesters are turned away.

use rand::seq::SliceRandom;
use rand::Rng;
use sqlx::SqlitePool;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::error::{Result, ShuffleError};
use super::lock::LockController;
use super::rotation::RotationTable;
use crate::db::{SongTable, StateTable, CURRENT_SHUFFLE_INDEX};
use crate::models::{Language, Requester, Song};

pub struct RoundSelector {
    pool: SqlitePool,
    lock: LockController,
    rotation: Arc<RotationTable>,
    sample_per_language: usize,
    /// Serializes rigged advances within this process
    round_gate: Mutex<()>,
}

impl RoundSelector {
    pub fn new(
        pool: SqlitePool,
        lock: LockController,
        rotation: Arc<RotationTable>,
        sample_per_language: usize,
    ) -> Self {
        Self {
            pool,
            lock,
            rotation,
            sample_per_language,
            round_gate: Mutex::new(()),
        }
    }

    /// Compute the next round for `requester`
    pub async fn advance_round(&self, requester: &Requester) -> Result<Vec<Song>> {
        let locked = self.lock.lock_state().await?;

        if requester.is_privileged() {
            // the host overrides their own lock
            return self.rigged_round(requester).await;
        }

        if locked {
            debug!("Rejected shuffle from {}: round is locked", requester.username);
            return Err(ShuffleError::Locked);
        }

        self.free_round().await
    }

    /// Advance the shared rotation and persist the new slot as the selection
    async fn rigged_round(&self, requester: &Requester) -> Result<Vec<Song>> {
        let _gate = self.round_gate.lock().await;

        let mut tx = self.pool.begin().await?;

        let cursor = StateTable::get_or_init(&mut *tx, CURRENT_SHUFFLE_INDEX, 0).await?;
        let slot = self.rotation.slot_index(cursor);
        let codes = self.rotation.slot(cursor);

        SongTable::replace_selection(&mut *tx, codes).await?;

        let next = self.rotation.next_cursor(cursor);
        StateTable::set(&mut *tx, CURRENT_SHUFFLE_INDEX, next).await?;

        let songs = SongTable::selected(&mut *tx).await?;
        tx.commit().await?;

        info!(
            "Rotation slot {} applied by {} ({} of {} codes in catalog)",
            slot,
            requester.username,
            songs.len(),
            codes.len()
        );

        Ok(songs)
    }

    /// Random sample per language, not persisted
    async fn free_round(&self) -> Result<Vec<Song>> {
        let catalog = SongTable::all(&self.pool).await?;
        let songs = sample_per_language(catalog, self.sample_per_language, &mut rand::thread_rng());
        debug!("Free round drew {} songs", songs.len());
        Ok(songs)
    }
}

/// Draw up to `per_language` songs of every language present, without
/// replacement. Languages come out in `Language` order.
pub fn sample_per_language<R: Rng + ?Sized>(
    songs: Vec<Song>,
    per_language: usize,
    rng: &mut R,
) -> Vec<Song> {
    let mut by_language: BTreeMap<Language, Vec<Song>> = BTreeMap::new();
    for song in songs {
        by_language.entry(song.language).or_default().push(song);
    }

    by_language
        .into_values()
        .flat_map(|group| {
            group
                .choose_multiple(&mut *rng, per_language)
                .cloned()
                .collect::<Vec<_>>()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{insert_codes, test_engine, DbEngine};
    use crate::models::Role;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;
    use tempfile::TempDir;

    fn host() -> Requester {
        Requester::new(1, "host", Role::Privileged)
    }

    fn player() -> Requester {
        Requester::new(2, "player", Role::Ordinary)
    }

    fn code_set(songs: &[Song]) -> HashSet<String> {
        songs.iter().map(|s| s.short_code.clone()).collect()
    }

    fn slot_set(table: &RotationTable, cursor: i64) -> HashSet<String> {
        table.slot(cursor).iter().cloned().collect()
    }

    /// Every code referenced by the default rotation, plus extras for free rounds
    const FULL_CATALOG: &[&str] = &[
        "H1", "H2", "H3", "H4", "H5", "H6", "H7", "B1", "B2", "B3", "B4", "B5", "B6", "B7", "E1",
        "E2", "E3", "E4", "E5", "E6", "E7",
    ];

    async fn setup(codes: &[&str]) -> (TempDir, DbEngine, RoundSelector) {
        let (dir, engine) = test_engine().await;
        insert_codes(engine.pool(), codes).await;
        let pool = engine.pool().clone();
        let selector = RoundSelector::new(
            pool.clone(),
            LockController::new(pool),
            Arc::new(RotationTable::default()),
            5,
        );
        (dir, engine, selector)
    }

    async fn selected_codes(engine: &DbEngine) -> HashSet<String> {
        code_set(&SongTable::selected(engine.pool()).await.unwrap())
    }

    async fn cursor(engine: &DbEngine) -> Option<i64> {
        StateTable::get(engine.pool(), CURRENT_SHUFFLE_INDEX)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_rotation_determinism() {
        let (_dir, engine, selector) = setup(FULL_CATALOG).await;
        let table = RotationTable::default();

        for n in 0..6 {
            let songs = selector.advance_round(&host()).await.unwrap();
            assert_eq!(code_set(&songs), slot_set(&table, n), "advance {}", n);
            assert_eq!(selected_codes(&engine).await, slot_set(&table, n));
        }
    }

    #[tokio::test]
    async fn test_rotation_cycles_back() {
        let (_dir, engine, selector) = setup(FULL_CATALOG).await;

        let first = selector.advance_round(&host()).await.unwrap();
        assert_eq!(cursor(&engine).await, Some(1));

        for _ in 1..4 {
            selector.advance_round(&host()).await.unwrap();
        }
        assert_eq!(cursor(&engine).await, Some(0));

        let again = selector.advance_round(&host()).await.unwrap();
        assert_eq!(code_set(&first), code_set(&again));
    }

    #[tokio::test]
    async fn test_missing_code_is_skipped() {
        let without_h6: Vec<&str> = FULL_CATALOG.iter().copied().filter(|c| *c != "H6").collect();
        let (_dir, engine, selector) = setup(&without_h6).await;
        StateTable::set(engine.pool(), CURRENT_SHUFFLE_INDEX, 2)
            .await
            .unwrap();

        let songs = selector.advance_round(&host()).await.unwrap();
        assert_eq!(songs.len(), 14);
        assert!(!code_set(&songs).contains("H6"));
    }

    #[tokio::test]
    async fn test_last_slot_wraps_cursor() {
        let (_dir, engine, selector) = setup(FULL_CATALOG).await;
        StateTable::set(engine.pool(), CURRENT_SHUFFLE_INDEX, 3)
            .await
            .unwrap();

        let songs = selector.advance_round(&host()).await.unwrap();
        assert_eq!(code_set(&songs), slot_set(&RotationTable::default(), 3));
        assert_eq!(cursor(&engine).await, Some(0));
    }

    #[tokio::test]
    async fn test_out_of_range_cursor_is_wrapped() {
        let (_dir, engine, selector) = setup(FULL_CATALOG).await;
        StateTable::set(engine.pool(), CURRENT_SHUFFLE_INDEX, 9)
            .await
            .unwrap();

        let songs = selector.advance_round(&host()).await.unwrap();
        assert_eq!(code_set(&songs), slot_set(&RotationTable::default(), 1));
        assert_eq!(cursor(&engine).await, Some(2));
    }

    #[tokio::test]
    async fn test_lock_gates_ordinary_only() {
        let (_dir, engine, selector) = setup(FULL_CATALOG).await;
        let lock = LockController::new(engine.pool().clone());

        selector.advance_round(&host()).await.unwrap();
        lock.toggle_lock(&host()).await.unwrap();
        let frozen = selected_codes(&engine).await;

        let err = selector.advance_round(&player()).await.unwrap_err();
        assert!(matches!(err, ShuffleError::Locked));
        assert_eq!(selected_codes(&engine).await, frozen);
        assert_eq!(cursor(&engine).await, Some(1));

        // the host still advances, and does change the catalog
        let songs = selector.advance_round(&host()).await.unwrap();
        assert_ne!(code_set(&songs), frozen);
        assert_eq!(selected_codes(&engine).await, code_set(&songs));
        assert_eq!(cursor(&engine).await, Some(2));
    }

    #[tokio::test]
    async fn test_free_round_does_not_persist() {
        let (_dir, engine, selector) = setup(FULL_CATALOG).await;
        selector.advance_round(&host()).await.unwrap();
        let before = selected_codes(&engine).await;

        for _ in 0..5 {
            selector.advance_round(&player()).await.unwrap();
        }

        assert_eq!(selected_codes(&engine).await, before);
        assert_eq!(cursor(&engine).await, Some(1));
    }

    #[tokio::test]
    async fn test_free_round_on_fresh_catalog_leaves_nothing_selected() {
        let (_dir, engine, selector) = setup(FULL_CATALOG).await;

        let songs = selector.advance_round(&player()).await.unwrap();
        assert_eq!(songs.len(), 15);
        assert!(selected_codes(&engine).await.is_empty());
        assert_eq!(cursor(&engine).await, None);
    }

    #[tokio::test]
    async fn test_free_round_sample_bounds() {
        // 7 Hindi, 3 Bengali, no English
        let (_dir, _engine, selector) = setup(&[
            "H1", "H2", "H3", "H4", "H5", "H6", "H7", "B1", "B2", "B3",
        ])
        .await;

        for _ in 0..10 {
            let songs = selector.advance_round(&player()).await.unwrap();
            let hindi = songs.iter().filter(|s| s.language == Language::Hindi).count();
            let bengali = songs.iter().filter(|s| s.language == Language::Bengali).count();
            assert_eq!(hindi, 5);
            assert_eq!(bengali, 3);
            assert_eq!(songs.len(), 8);
            // sampled without replacement
            assert_eq!(code_set(&songs).len(), songs.len());
        }
    }

    #[tokio::test]
    async fn test_concurrent_rigged_advances_do_not_lose_updates() {
        let (_dir, engine, selector) = setup(FULL_CATALOG).await;
        let selector = Arc::new(selector);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let selector = Arc::clone(&selector);
                tokio::spawn(async move { selector.advance_round(&host()).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        // eight advances over four slots land back on slot 0
        assert_eq!(cursor(&engine).await, Some(0));
    }

    #[test]
    fn test_sample_per_language_is_grouped_and_bounded() {
        let mut rng = StdRng::seed_from_u64(7);
        let songs: Vec<Song> = ["H1", "E1", "H2", "B1", "E2", "H3"]
            .iter()
            .enumerate()
            .map(|(i, code)| Song {
                id: i as i64,
                name: code.to_string(),
                artist: String::new(),
                album: None,
                language: Language::from_initial(code.chars().next().unwrap()).unwrap(),
                short_code: code.to_string(),
                media_url: String::new(),
                media_id: None,
                lyrics_url: String::new(),
                is_selected: false,
                added_by: None,
                created_at: 0,
            })
            .collect();

        let sample = sample_per_language(songs, 2, &mut rng);
        let languages: Vec<Language> = sample.iter().map(|s| s.language).collect();
        assert_eq!(
            languages,
            vec![
                Language::Bengali,
                Language::English,
                Language::English,
                Language::Hindi,
                Language::Hindi
            ]
        );

        assert!(sample_per_language(Vec::new(), 5, &mut rng).is_empty());
    }
}
