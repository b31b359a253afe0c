//! Song routes: round shuffling, lock and catalog maintenance

use actix_multipart::Multipart;
use actix_web::http::StatusCode;
use actix_web::{delete, get, post, web, HttpRequest, Responder};
use bytes::BytesMut;
use futures::StreamExt;
use serde::Serialize;

use super::auth::require_requester;
use super::response::{error_response, failure, success};
use crate::core::{MediaAsset, ShuffleError, Upload};
use crate::models::{NewSong, Song};
use crate::state::AppState;

/// Text fields are short; anything longer is a malformed form
const MAX_TEXT_FIELD: usize = 16 * 1024;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub is_locked: bool,
    pub locked_songs: Vec<Song>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LockState {
    pub is_locked: bool,
}

/// songs in the current shared round
#[get("/selected")]
pub async fn get_selected_songs(state: web::Data<AppState>) -> impl Responder {
    match state.catalog.selected_songs().await {
        Ok(songs) => success(StatusCode::OK, songs, "Selected songs fetched successfully"),
        Err(e) => error_response(&e),
    }
}

/// lock flag and, while locked, the frozen round
#[get("/state")]
pub async fn get_game_state(state: web::Data<AppState>) -> impl Responder {
    match state.lock.active_selection_if_locked().await {
        Ok((is_locked, locked_songs)) => success(
            StatusCode::OK,
            GameState {
                is_locked,
                locked_songs,
            },
            "Game state fetched",
        ),
        Err(e) => error_response(&e),
    }
}

/// flip the round lock (host only)
#[post("/lock")]
pub async fn toggle_lock(req: HttpRequest, state: web::Data<AppState>) -> impl Responder {
    let (_, requester) = match require_requester(&req, &state).await {
        Ok(r) => r,
        Err(resp) => return resp,
    };

    match state.lock.toggle_lock(&requester).await {
        Ok(is_locked) => success(
            StatusCode::OK,
            LockState { is_locked },
            if is_locked {
                "Shuffle locked"
            } else {
                "Shuffle unlocked"
            },
        ),
        Err(e) => error_response(&e),
    }
}

/// next round: the rotation for the host, a private random draw for everyone else
#[post("/shuffle")]
pub async fn shuffle(req: HttpRequest, state: web::Data<AppState>) -> impl Responder {
    let (_, requester) = match require_requester(&req, &state).await {
        Ok(r) => r,
        Err(resp) => return resp,
    };

    match state.selector.advance_round(&requester).await {
        Ok(songs) => success(StatusCode::OK, songs, "Songs shuffled successfully"),
        Err(e) => error_response(&e),
    }
}

/// whole catalog, newest first
#[get("")]
pub async fn get_all_songs(state: web::Data<AppState>) -> impl Responder {
    match state.catalog.list_songs().await {
        Ok(songs) => success(StatusCode::OK, songs, "All songs fetched"),
        Err(e) => error_response(&e),
    }
}

/// add a song from a multipart form carrying `songFile`, or a hosted `url`
#[post("")]
pub async fn add_song(
    req: HttpRequest,
    state: web::Data<AppState>,
    mut payload: Multipart,
) -> impl Responder {
    let (user, _) = match require_requester(&req, &state).await {
        Ok(r) => r,
        Err(resp) => return resp,
    };

    let form = match read_song_form(&mut payload, state.config.max_upload_bytes()).await {
        Ok(form) => form,
        Err(e) => return error_response(&e),
    };

    let added_by = Some(user.username);
    let result = match (form.upload, form.url) {
        (Some(upload), _) => {
            state
                .catalog
                .add_uploaded_song(form.song, upload, added_by)
                .await
        }
        (None, Some(url)) => {
            let asset = MediaAsset {
                url,
                media_id: String::new(),
            };
            state.catalog.add_song(form.song, asset, added_by).await
        }
        (None, None) => Err(ShuffleError::Validation(
            "Please provide name, artist, language, and a song file".to_string(),
        )),
    };

    match result {
        Ok(song) => success(StatusCode::CREATED, song, "Song added successfully"),
        Err(e) => error_response(&e),
    }
}

/// remove a song and its hosted audio
#[delete("/{id}")]
pub async fn delete_song(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> impl Responder {
    if let Err(resp) = require_requester(&req, &state).await {
        return resp;
    }

    let Ok(id) = path.parse::<i64>() else {
        return failure(StatusCode::NOT_FOUND, "Song not found");
    };

    match state.catalog.delete_song(id).await {
        Ok(song) => success(StatusCode::OK, song, "Song deleted successfully"),
        Err(e) => error_response(&e),
    }
}

struct SongForm {
    song: NewSong,
    upload: Option<Upload>,
    url: Option<String>,
}

async fn read_song_form(payload: &mut Multipart, max_file: usize) -> Result<SongForm, ShuffleError> {
    let mut song = NewSong::default();
    let mut upload = None;
    let mut url = None;

    while let Some(field) = payload.next().await {
        let mut field =
            field.map_err(|e| ShuffleError::Validation(format!("Malformed upload: {}", e)))?;

        let disp = field.content_disposition().clone();
        let name = disp.get_name().map(|s| s.to_string()).unwrap_or_default();
        let is_file = name == "songFile";
        let limit = if is_file { max_file } else { MAX_TEXT_FIELD };

        let mut bytes = BytesMut::new();
        while let Some(chunk) = field.next().await {
            let data =
                chunk.map_err(|e| ShuffleError::Validation(format!("Malformed upload: {}", e)))?;
            if bytes.len() + data.len() > limit {
                return Err(ShuffleError::Validation(if is_file {
                    format!("File exceeds the {} MB upload limit", max_file / (1024 * 1024))
                } else {
                    format!("Field '{}' is too long", name)
                }));
            }
            bytes.extend_from_slice(&data);
        }

        if is_file {
            upload = Some(Upload {
                filename: disp.get_filename().unwrap_or("audio").to_string(),
                content_type: field
                    .content_type()
                    .map(|m| m.essence_str().to_string())
                    .unwrap_or_default(),
                bytes: bytes.freeze(),
            });
            continue;
        }

        let value = String::from_utf8_lossy(&bytes).to_string();
        match name.as_str() {
            "name" => song.name = value,
            "artist" => song.artist = value,
            "album" => song.album = Some(value),
            "language" => song.language = value,
            "lyrics" => song.lyrics_url = Some(value),
            "url" => url = Some(value.trim().to_string()).filter(|u| !u.is_empty()),
            _ => {}
        }
    }

    Ok(SongForm { song, upload, url })
}

/// Configure song routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(get_selected_songs)
        .service(get_game_state)
        .service(toggle_lock)
        .service(shuffle)
        .service(get_all_songs)
        .service(add_song)
        .service(delete_song);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::{body_json, multipart_body, test_state, token_for};
    use crate::db::insert_codes;
    use actix_web::{test, App};

    const ROUND: &[&str] = &[
        "H1", "H2", "H3", "H4", "H5", "H6", "B1", "B2", "B3", "B4", "B5", "B6", "E1", "E2", "E3",
        "E4", "E5", "E6",
    ];

    macro_rules! songs_app {
        ($state:expr) => {
            test::init_service(
                App::new()
                    .app_data($state.clone())
                    .service(web::scope("/api/songs").configure(configure)),
            )
            .await
        };
    }

    fn bearer(token: &str) -> (&'static str, String) {
        ("Authorization", format!("Bearer {}", token))
    }

    #[actix_web::test]
    async fn test_lock_and_shuffle_flow() {
        let (_dir, state) = test_state().await;
        insert_codes(state.db.pool(), ROUND).await;
        let host = token_for(&state, "host", "admin@gmail.com").await;
        let player = token_for(&state, "player", "player@example.com").await;
        let app = songs_app!(state);

        let req = test::TestRequest::get().uri("/api/songs/state").to_request();
        let body = body_json(test::call_service(&app, req).await).await;
        assert_eq!(body["data"]["isLocked"], false);
        assert_eq!(body["data"]["lockedSongs"], serde_json::json!([]));

        let req = test::TestRequest::post()
            .uri("/api/songs/shuffle")
            .insert_header(bearer(&host))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["data"].as_array().unwrap().len(), 15);

        // players cannot lock
        let req = test::TestRequest::post()
            .uri("/api/songs/lock")
            .insert_header(bearer(&player))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::FORBIDDEN
        );

        let req = test::TestRequest::post()
            .uri("/api/songs/lock")
            .insert_header(bearer(&host))
            .to_request();
        let body = body_json(test::call_service(&app, req).await).await;
        assert_eq!(body["data"]["isLocked"], true);

        let req = test::TestRequest::post()
            .uri("/api/songs/shuffle")
            .insert_header(bearer(&player))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            body_json(resp).await["message"],
            "Shuffle is locked by the host"
        );

        let req = test::TestRequest::get().uri("/api/songs/state").to_request();
        let body = body_json(test::call_service(&app, req).await).await;
        assert_eq!(body["data"]["isLocked"], true);
        assert_eq!(body["data"]["lockedSongs"].as_array().unwrap().len(), 15);

        let req = test::TestRequest::get().uri("/api/songs/selected").to_request();
        let body = body_json(test::call_service(&app, req).await).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 15);
        assert_eq!(body["data"][0]["is_selected"], true);
    }

    #[actix_web::test]
    async fn test_shuffle_requires_token() {
        let (_dir, state) = test_state().await;
        let app = songs_app!(state);

        let req = test::TestRequest::post().uri("/api/songs/shuffle").to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[actix_web::test]
    async fn test_add_and_delete_song() {
        let (_dir, state) = test_state().await;
        let token = token_for(&state, "dj", "dj@example.com").await;
        let app = songs_app!(state);

        let form = || {
            let (content_type, body) = multipart_body(
                &[
                    ("name", "Tum Hi Ho"),
                    ("artist", "Arijit Singh"),
                    ("language", "Hindi"),
                    ("lyrics", "https://lyrics.test/tum-hi-ho"),
                ],
                Some(("songFile", "intro.mp3", "audio/mpeg", b"ID3audio".as_slice())),
            );
            test::TestRequest::post()
                .uri("/api/songs")
                .insert_header(bearer(&token))
                .insert_header(("Content-Type", content_type))
                .set_payload(body)
                .to_request()
        };

        let resp = test::call_service(&app, form()).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body = body_json(resp).await;
        assert_eq!(body["data"]["short_code"], "H1");
        assert_eq!(body["data"]["song_name"], "Tum Hi Ho");
        assert_eq!(body["data"]["added_by"], "dj");
        assert_eq!(body["data"]["lyrics_link"], "https://lyrics.test/tum-hi-ho");
        let id = body["data"]["_id"].as_i64().unwrap();

        let resp = test::call_service(&app, form()).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        let req = test::TestRequest::get().uri("/api/songs").to_request();
        let body = body_json(test::call_service(&app, req).await).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 1);

        let req = test::TestRequest::delete()
            .uri(&format!("/api/songs/{}", id))
            .insert_header(bearer(&token))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let req = test::TestRequest::delete()
            .uri(&format!("/api/songs/{}", id))
            .insert_header(bearer(&token))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::NOT_FOUND
        );
    }

    #[actix_web::test]
    async fn test_add_song_rejects_non_audio() {
        let (_dir, state) = test_state().await;
        let token = token_for(&state, "dj", "dj@example.com").await;
        let app = songs_app!(state);

        let (content_type, body) = multipart_body(
            &[("name", "Cover"), ("artist", "Nobody"), ("language", "English")],
            Some(("songFile", "cover.png", "image/png", b"\x89PNG".as_slice())),
        );
        let req = test::TestRequest::post()
            .uri("/api/songs")
            .insert_header(bearer(&token))
            .insert_header(("Content-Type", content_type))
            .set_payload(body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(resp).await["message"],
            "Only audio files are allowed!"
        );
    }

    #[actix_web::test]
    async fn test_add_song_from_hosted_url() {
        let (_dir, state) = test_state().await;
        let token = token_for(&state, "dj", "dj@example.com").await;
        let app = songs_app!(state);

        let (content_type, body) = multipart_body(
            &[
                ("name", "Imagine"),
                ("artist", "John Lennon"),
                ("language", "english"),
                ("url", "https://cdn.test/imagine.mp3"),
            ],
            None,
        );
        let req = test::TestRequest::post()
            .uri("/api/songs")
            .insert_header(bearer(&token))
            .insert_header(("Content-Type", content_type))
            .set_payload(body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body = body_json(resp).await;
        assert_eq!(body["data"]["short_code"], "E1");
        assert_eq!(body["data"]["intro_audio_url"], "https://cdn.test/imagine.mp3");
    }
}
