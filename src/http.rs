//! HTTP module for the study-buddy service
//!
//! Axum router exposing the study page, the flashcard generation API, and
//! the auth endpoints. Bodies in and out are plain JSON.

use crate::auth::{self, AuthUser, LoginRequest, RegisterRequest};
use crate::cards::{CardListResponse, GenerateRequest, GenerateResponse};
use crate::config::Config;
use crate::error::{Result, StudyBuddyError};
use crate::generate::CardGenerator;
use crate::storage::CardStore;
use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    response::{Html, IntoResponse},
    routing::{get, post},
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

const INDEX_HTML: &str = include_str!("../assets/index.html");
const SCRIPT_JS: &str = include_str!("../assets/script.js");

/// Shared state for the HTTP server
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: CardStore,
    pub generator: Arc<dyn CardGenerator>,
}

/// Body of `POST /save-session`; both fields are optional.
#[derive(Debug, Deserialize)]
pub struct SaveSessionRequest {
    #[serde(default)]
    pub session_name: Option<String>,
    #[serde(default)]
    pub flashcard_ids: Option<Vec<String>>,
}

fn authorization_header(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
}

/// Resolve the caller's identity from the Authorization header, if any.
async fn current_user(state: &AppState, headers: &HeaderMap) -> Result<Option<AuthUser>> {
    match auth::bearer_token(authorization_header(headers)) {
        Some(token) => state.store.verify_auth_session(&token).await,
        None => Ok(None),
    }
}

/// Identity lookup that fails when the server is configured to require
/// login. With auth optional, an anonymous caller simply gets no identity.
async fn identify_caller(state: &AppState, headers: &HeaderMap) -> Result<Option<AuthUser>> {
    let user = current_user(state, headers).await?;
    if user.is_none() && state.config.server.require_auth {
        return Err(StudyBuddyError::Auth {
            message: "Authentication required".to_string(),
        });
    }
    Ok(user)
}

/// Main page
pub async fn index_handler() -> impl IntoResponse {
    Html(INDEX_HTML)
}

/// Browser controller script
pub async fn script_handler() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/javascript")], SCRIPT_JS)
}

/// Generate flashcards from study notes
pub async fn generate_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>> {
    if request.notes.trim().is_empty() {
        return Err(StudyBuddyError::Validation {
            message: "Please provide study notes".to_string(),
        });
    }
    let user = identify_caller(&state, &headers).await?;

    let num_cards = state.config.limits.resolve(request.num_cards);
    let subject = request.subject.as_deref().unwrap_or("General");

    let cards = state
        .generator
        .generate(&request.notes, num_cards)
        .await
        .map_err(|e| StudyBuddyError::Generation {
            message: e.to_string(),
        })?;
    let card_ids = state
        .store
        .insert_cards(&cards, subject, user.as_ref().map(|u| u.user_id.as_str()))
        .await?;

    Ok(Json(GenerateResponse {
        message: Some(format!(
            "Successfully generated {} flashcards!",
            cards.len()
        )),
        cards,
        card_ids,
    }))
}

/// List stored flashcards, newest first.
/// Authenticated callers only see their own cards.
pub async fn flashcards_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<CardListResponse>> {
    let user = identify_caller(&state, &headers).await?;
    let flashcards = state
        .store
        .list_cards(user.as_ref().map(|u| u.user_id.as_str()))
        .await?;
    Ok(Json(CardListResponse {
        flashcards,
        format: None,
    }))
}

/// Save a study session
pub async fn save_session_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<SaveSessionRequest>,
) -> Result<Json<serde_json::Value>> {
    let user = identify_caller(&state, &headers).await?;
    let session_name = request.session_name.as_deref().unwrap_or("Study Session");
    let flashcard_ids = request.flashcard_ids.unwrap_or_default();
    let session = state
        .store
        .save_session(
            session_name,
            &flashcard_ids,
            user.as_ref().map(|u| u.user_id.as_str()),
        )
        .await?;
    Ok(Json(json!({
        "session_id": session.id,
        "message": "Session saved successfully!"
    })))
}

/// Export flashcards in the requested format
pub async fn export_handler(
    State(state): State<AppState>,
    Path(format): Path<String>,
) -> Result<Json<CardListResponse>> {
    let flashcards = state.store.list_cards(None).await?;
    match format.as_str() {
        "json" => Ok(Json(CardListResponse {
            flashcards,
            format: None,
        })),
        // PDF rendering is still a placeholder; the payload is tagged instead.
        "pdf" => Ok(Json(CardListResponse {
            flashcards,
            format: Some("pdf".to_string()),
        })),
        _ => Err(StudyBuddyError::Validation {
            message: "Unsupported format".to_string(),
        }),
    }
}

/// User registration endpoint
pub async fn register_handler(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<impl IntoResponse> {
    let username = request.username.trim();
    let email = request.email.trim();
    auth::validate_registration(username, email, &request.password)?;

    let salt = auth::generate_salt();
    let password_hash = auth::hash_password(&request.password, &salt);
    let user_id = state
        .store
        .create_user(username, email, &password_hash, &salt)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "User registered successfully!",
            "user_id": user_id
        })),
    ))
}

/// User login endpoint
pub async fn login_handler(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<serde_json::Value>> {
    let username = request.username.trim();
    auth::validate_login(username, &request.password)?;

    let invalid = || StudyBuddyError::Auth {
        message: "Invalid username or password".to_string(),
    };
    let user = state
        .store
        .get_user_by_username(username)
        .await?
        .ok_or_else(invalid)?;
    if !auth::verify_password(&request.password, &user.password_hash, &user.salt) {
        return Err(invalid());
    }

    let session_token = auth::generate_token();
    let expires_at = auth::session_expiry(state.config.server.session_ttl_days);
    state
        .store
        .create_auth_session(&user.id, &session_token, expires_at)
        .await?;
    state.store.touch_last_login(&user.id).await?;

    Ok(Json(json!({
        "message": "Login successful!",
        "user": {
            "user_id": user.id,
            "username": user.username,
            "email": user.email,
            "session_token": session_token
        }
    })))
}

/// User logout endpoint
pub async fn logout_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>> {
    if let Some(token) = auth::bearer_token(authorization_header(&headers)) {
        state.store.delete_auth_session(&token).await?;
    }
    Ok(Json(json!({ "message": "Logout successful!" })))
}

/// Current user's profile
pub async fn profile_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<AuthUser>> {
    let user = current_user(&state, &headers)
        .await?
        .ok_or_else(|| StudyBuddyError::Auth {
            message: "Authentication required".to_string(),
        })?;
    Ok(Json(user))
}

/// Health check endpoint, never authenticated
pub async fn health_handler() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Mode and feature report
pub async fn status_handler(State(state): State<AppState>) -> Result<Json<serde_json::Value>> {
    let counts = state.store.counts().await?;
    Ok(Json(json!({
        "mode": state.generator.name(),
        "database_path": state.config.server.database_path,
        "openai_configured": state.config.openai_key().is_some(),
        "auth_required": state.config.server.require_auth,
        "storage": counts,
        "features": {
            "flashcard_generation": true,
            "user_registration": true,
            "user_login": true,
            "save_flashcards": true,
            "export_flashcards": true,
            "save_sessions": true
        }
    })))
}

/// Assemble the application router around shared state.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/static/script.js", get(script_handler))
        .route("/generate", post(generate_handler))
        .route("/flashcards", get(flashcards_handler))
        .route("/save-session", post(save_session_handler))
        .route("/export/:format", get(export_handler))
        .route("/auth/register", post(register_handler))
        .route("/auth/login", post(login_handler))
        .route("/auth/logout", post(logout_handler))
        .route("/auth/profile", get(profile_handler))
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Start the HTTP server
pub async fn serve(state: AppState) -> Result<()> {
    let bind = state.config.server.bind;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind HTTP listener: {}", e))?;

    tracing::info!("Starting HTTP server on {}", bind);

    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("HTTP server error: {}", e))?;

    Ok(())
}
