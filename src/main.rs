//! Antakshari - song catalog and round shuffler for antakshari party games
//!
//! Serves the song catalog, the shared round and its lock over a JSON API.

mod api;
mod config;
mod core;
mod db;
mod models;
mod state;
mod utils;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::config::{MediaProvider, Paths, ServerConfig};
use crate::core::RotationTable;
use crate::db::{
    ensure_admin_account, ensure_rotation_codes, run_migrations, seed_demo_catalog, DbEngine,
    UserTable,
};
use crate::state::AppState;

/// Antakshari round shuffler server
#[derive(Parser, Debug)]
#[command(name = "antakshari")]
#[command(version = "1.0.0")]
#[command(about = "Song catalog and round shuffler for antakshari party games")]
struct Args {
    /// Host address to bind to
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(long, default_value_t = 5000)]
    port: u16,

    /// Enable debug mode
    #[arg(long)]
    debug: bool,

    /// Path to config directory
    #[arg(long)]
    config: Option<PathBuf>,

    /// Insert the demo catalog when the catalog is empty, or placeholder
    /// songs for rotation codes it lacks
    #[arg(long)]
    seed: bool,

    /// Password for the host account, created at startup when missing
    /// (falls back to ANTAKSHARI_ADMIN_PASSWORD)
    #[arg(long)]
    admin_password: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.debug { "debug" } else { "info" };

    // keep sqlx statement logging out of the default output
    let filter = tracing_subscriber::EnvFilter::new(format!("{},sqlx=warn", log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    info!("Antakshari v1.0.0 starting...");

    let paths = Paths::init(args.config)?;
    info!("Config directory: {:?}", paths.config_dir());

    let admin_password = args
        .admin_password
        .or_else(|| std::env::var("ANTAKSHARI_ADMIN_PASSWORD").ok())
        .filter(|p| !p.is_empty());

    let state = setup(args.seed, admin_password).await?;
    serve(args.host, args.port, state).await
}

/// Load settings, open the database and build the shared state
async fn setup(seed: bool, admin_password: Option<String>) -> Result<AppState> {
    let paths = Paths::get()?;

    let mut config = ServerConfig::load()?;

    // Generate server ID if missing
    if config.server_id.is_empty() {
        config.server_id = uuid::Uuid::new_v4().to_string();
        config.save()?;
    }

    config.apply_env_overrides(|key| std::env::var(key).ok());
    info!("Privileged account: {}", config.admin_email);

    let rotation = match config.rotation.clone() {
        Some(slots) => RotationTable::new(slots).context("Invalid rotation in settings")?,
        None => RotationTable::default(),
    };
    info!("Rotation has {} slots", rotation.len());

    let engine = DbEngine::open(&paths.app_db_path()).await?;
    run_migrations(&engine).await?;

    if seed {
        let inserted = seed_demo_catalog(&engine).await?;
        if inserted > 0 {
            info!("Seeded {} demo songs", inserted);
        } else {
            ensure_rotation_codes(&engine, &rotation).await?;
        }
    }

    if let Some(password) = admin_password {
        ensure_admin_account(&engine, &config.admin_email, &password).await?;
    } else if UserTable::get_by_email(engine.pool(), &config.admin_email)
        .await?
        .is_none()
    {
        warn!("No host account; start with --admin-password to create one");
    }

    let media = core::media::from_config(&config.media, &paths.media_dir());

    Ok(AppState::new(engine, config, rotation, media))
}

async fn serve(host: String, port: u16, state: AppState) -> Result<()> {
    use actix_cors::Cors;
    use actix_web::{middleware, web, App, HttpServer};

    let serve_local_media = state.config.media.provider == MediaProvider::Local;
    let media_dir = Paths::get()?.media_dir();
    let state = web::Data::new(state);

    let addr = format!("{}:{}", host, port);
    info!("Server listening on http://{}", addr);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        let mut app = App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .app_data(state.clone())
            .service(web::scope("/api").configure(api::configure));

        if serve_local_media {
            app = app.service(actix_files::Files::new("/media", media_dir.clone()));
        }

        app
    })
    .bind(addr)?
    .run()
    .await?;

    Ok(())
}
