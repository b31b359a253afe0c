//! Shared application state handed to every request

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::core::{Catalog, LockController, MediaHost, RotationTable, RoundSelector};
use crate::db::DbEngine;
use crate::models::{Requester, Role, User};

pub struct AppState {
    pub db: DbEngine,
    pub config: ServerConfig,
    pub selector: RoundSelector,
    pub lock: LockController,
    pub catalog: Catalog,
}

impl AppState {
    pub fn new(
        db: DbEngine,
        config: ServerConfig,
        rotation: RotationTable,
        media: Arc<dyn MediaHost>,
    ) -> Self {
        let pool = db.pool().clone();
        let lock = LockController::new(pool.clone());
        let selector = RoundSelector::new(
            pool.clone(),
            lock.clone(),
            Arc::new(rotation),
            config.sample_per_language,
        );
        let catalog = Catalog::new(pool, media, config.max_upload_bytes());

        Self {
            db,
            config,
            selector,
            lock,
            catalog,
        }
    }

    /// Secret used to sign and verify tokens
    pub fn jwt_secret(&self) -> &str {
        &self.config.server_id
    }

    /// The privileged role belongs to the account registered with the admin email
    pub fn role_for(&self, user: &User) -> Role {
        if self.config.is_admin_email(&user.email) {
            Role::Privileged
        } else {
            Role::Ordinary
        }
    }

    pub fn requester_for(&self, user: &User) -> Requester {
        Requester::new(user.id, user.username.clone(), self.role_for(user))
    }
}
