//! Authentication routes: bearer JWT issued on register/login

use actix_web::http::StatusCode;
use actix_web::{get, post, web, HttpRequest, HttpResponse, Responder};
use serde::{Deserialize, Serialize};

use super::response::{failure, success};
use crate::db::tables::UserTable;
use crate::models::{Requester, User};
use crate::state::AppState;
use crate::utils::auth::{
    create_jwt, hash_password, verify_jwt, verify_password, UserIdentity, TOKEN_MAX_AGE,
};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// register/login payload
#[derive(Debug, Serialize)]
pub struct AuthPayload {
    #[serde(rename = "_id")]
    pub id: i64,
    pub username: String,
    pub email: String,
    pub token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MePayload {
    #[serde(rename = "_id")]
    pub id: i64,
    pub username: String,
    pub email: String,
    pub is_admin: bool,
}

/// register endpoint
#[post("/register")]
pub async fn register(state: web::Data<AppState>, body: web::Json<RegisterRequest>) -> impl Responder {
    let username = body.username.trim();
    let email = body.email.trim();
    if username.is_empty() || email.is_empty() || body.password.is_empty() {
        return failure(StatusCode::BAD_REQUEST, "Please add all fields");
    }

    // the host account is only created at startup
    if state.config.is_admin_email(email) {
        return failure(StatusCode::BAD_REQUEST, "This email is reserved for the host");
    }

    let pool = state.db.pool();
    match UserTable::get_by_email(pool, email).await {
        Ok(Some(_)) => return failure(StatusCode::BAD_REQUEST, "User already exists"),
        Ok(None) => {}
        Err(e) => {
            tracing::error!("Failed to look up user {}: {}", email, e);
            return failure(StatusCode::INTERNAL_SERVER_ERROR, "Database error");
        }
    }

    let mut user = User::new(
        username.to_string(),
        email.to_string(),
        hash_password(&body.password),
    );
    user.id = match UserTable::insert(pool, &user).await {
        Ok(id) => id,
        Err(e) if is_unique_violation(&e) => {
            return failure(StatusCode::BAD_REQUEST, "User already exists");
        }
        Err(e) => {
            tracing::error!("Failed to create user {}: {}", email, e);
            return failure(StatusCode::INTERNAL_SERVER_ERROR, "Invalid user data");
        }
    };

    tracing::info!("Registered user {}", user.username);
    issue_token(&state, &user, StatusCode::CREATED, "User registered successfully")
}

/// login endpoint
#[post("/login")]
pub async fn login(state: web::Data<AppState>, body: web::Json<LoginRequest>) -> impl Responder {
    match UserTable::get_by_email(state.db.pool(), &body.email).await {
        Ok(Some(user)) if verify_password(&body.password, &user.password) => {
            issue_token(&state, &user, StatusCode::OK, "Login successful")
        }
        Ok(_) => failure(StatusCode::UNAUTHORIZED, "Invalid credentials"),
        Err(e) => {
            tracing::error!("Failed to look up user: {}", e);
            failure(StatusCode::INTERNAL_SERVER_ERROR, "Database error")
        }
    }
}

/// current user
#[get("/me")]
pub async fn me(req: HttpRequest, state: web::Data<AppState>) -> impl Responder {
    let (user, requester) = match require_requester(&req, &state).await {
        Ok(r) => r,
        Err(resp) => return resp,
    };

    success(
        StatusCode::OK,
        MePayload {
            id: user.id,
            username: user.username,
            email: user.email,
            is_admin: requester.is_privileged(),
        },
        "User fetched successfully",
    )
}

fn issue_token(state: &AppState, user: &User, status: StatusCode, message: &str) -> HttpResponse {
    let identity = UserIdentity {
        id: user.id,
        username: user.username.clone(),
        email: user.email.clone(),
    };

    match create_jwt(identity, state.jwt_secret(), "access", TOKEN_MAX_AGE) {
        Ok(token) => success(
            status,
            AuthPayload {
                id: user.id,
                username: user.username.clone(),
                email: user.email.clone(),
                token,
            },
            message,
        ),
        Err(e) => {
            tracing::error!("Failed to create token: {}", e);
            failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to create token")
        }
    }
}

fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.downcast_ref::<sqlx::Error>()
        .and_then(|e| e.as_database_error())
        .map(|e| e.is_unique_violation())
        .unwrap_or(false)
}

fn bearer_token(req: &HttpRequest) -> Option<String> {
    let header = req.headers().get("Authorization")?.to_str().ok()?.trim();
    let token = header.strip_prefix("Bearer ")?.trim();

    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Resolve the caller from the bearer token and derive their role
pub(crate) async fn require_requester(
    req: &HttpRequest,
    state: &AppState,
) -> Result<(User, Requester), HttpResponse> {
    let Some(token) = bearer_token(req) else {
        return Err(failure(StatusCode::UNAUTHORIZED, "Not authorized, no token"));
    };

    let user_id = verify_jwt(&token, state.jwt_secret(), Some("access"))
        .and_then(|claims| claims.user_id())
        .map_err(|_| failure(StatusCode::UNAUTHORIZED, "Not authorized, token failed"))?;

    match UserTable::get_by_id(state.db.pool(), user_id).await {
        Ok(Some(user)) => {
            let requester = state.requester_for(&user);
            Ok((user, requester))
        }
        Ok(None) => Err(failure(StatusCode::UNAUTHORIZED, "Not authorized, token failed")),
        Err(e) => {
            tracing::error!("Failed to load user {}: {}", user_id, e);
            Err(failure(StatusCode::INTERNAL_SERVER_ERROR, "Database error"))
        }
    }
}

/// Configure auth routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(register).service(login).service(me);
}
