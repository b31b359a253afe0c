//! REST API routes

pub mod auth;
pub mod response;
pub mod songs;

#[cfg(test)]
pub(crate) mod testing;

use actix_web::web;

/// Configure all API routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        // Auth routes
        .service(web::scope("/auth").configure(auth::configure))
        // Song routes
        .service(web::scope("/songs").configure(songs::configure));
}
