//! Shared fixtures for route tests

use actix_web::body::MessageBody;
use actix_web::dev::ServiceResponse;
use actix_web::{test, web};
use std::sync::Arc;
use tempfile::TempDir;

use crate::config::ServerConfig;
use crate::core::media::LocalMediaHost;
use crate::core::RotationTable;
use crate::db::{test_engine, UserTable};
use crate::models::User;
use crate::state::AppState;
use crate::utils::auth::{create_jwt, UserIdentity, TOKEN_MAX_AGE};

const BOUNDARY: &str = "antakshari-test-boundary";

pub async fn test_state() -> (TempDir, web::Data<AppState>) {
    let (dir, engine) = test_engine().await;
    let media = Arc::new(LocalMediaHost::new(dir.path().join("media"), "/media"));
    let config = ServerConfig {
        server_id: "test-secret".to_string(),
        ..ServerConfig::default()
    };
    let state = AppState::new(engine, config, RotationTable::default(), media);
    (dir, web::Data::new(state))
}

/// Insert a user and return a valid bearer token for them
pub async fn token_for(state: &AppState, username: &str, email: &str) -> String {
    let mut user = User::new(username.to_string(), email.to_string(), String::new());
    user.id = UserTable::insert(state.db.pool(), &user).await.unwrap();

    let identity = UserIdentity {
        id: user.id,
        username: user.username,
        email: user.email,
    };
    create_jwt(identity, state.jwt_secret(), "access", TOKEN_MAX_AGE).unwrap()
}

pub async fn body_json<B: MessageBody>(resp: ServiceResponse<B>) -> serde_json::Value {
    let bytes = test::read_body(resp).await;
    serde_json::from_slice(&bytes).unwrap()
}

/// Build a multipart/form-data body; returns the content type and payload
pub fn multipart_body(
    fields: &[(&str, &str)],
    file: Option<(&str, &str, &str, &[u8])>,
) -> (String, Vec<u8>) {
    let mut body = Vec::new();

    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
    }

    if let Some((name, filename, content_type, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                BOUNDARY, name, filename, content_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }

    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    (
        format!("multipart/form-data; boundary={}", BOUNDARY),
        body,
    )
}
