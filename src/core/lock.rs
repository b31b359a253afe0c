//! Round lock: freezes the active selection for ordinary players

use sqlx::SqlitePool;
use tracing::info;

use super::error::{Result, ShuffleError};
use crate::db::{SongTable, StateTable, IS_SHUFFLE_LOCKED};
use crate::models::{Requester, Song};

#[derive(Debug, Clone)]
pub struct LockController {
    pool: SqlitePool,
}

impl LockController {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Whether ordinary players are currently frozen
    pub async fn lock_state(&self) -> Result<bool> {
        // a missing row reads as unlocked
        let value = StateTable::get(&self.pool, IS_SHUFFLE_LOCKED).await?;
        Ok(value.unwrap_or(0) != 0)
    }

    /// Flip the lock. Only the privileged requester may do this.
    pub async fn toggle_lock(&self, requester: &Requester) -> Result<bool> {
        if !requester.is_privileged() {
            return Err(ShuffleError::Forbidden);
        }

        let locked = StateTable::toggle(&self.pool, IS_SHUFFLE_LOCKED).await? != 0;
        info!(
            "Round {} by {}",
            if locked { "locked" } else { "unlocked" },
            requester.username
        );

        Ok(locked)
    }

    /// Lock flag plus the frozen round. The song list is empty while unlocked.
    pub async fn active_selection_if_locked(&self) -> Result<(bool, Vec<Song>)> {
        if !self.lock_state().await? {
            return Ok((false, Vec::new()));
        }

        let songs = SongTable::selected(&self.pool).await?;
        Ok((true, songs))
    }
}
