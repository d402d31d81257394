//! api-server: HTTP API for the user administration service.
//!
//! Exposes the profile and user stores as a REST API for the admin frontend:
//! - `/profiles`: list, get, create, rename, delete profiles.
//! - `/users`: list (optionally by `profileId`), get, create, partial update,
//!   delete users, and `PATCH /users/:id/toggle-status`.
//!
//! Storage is in-memory only; everything resets on restart. Unless
//! `SEED_DATA=false`, the stores start with a few demo profiles and users.
//!
//! Run:
//! ```bash
//! # pretty logs (default); PORT optional
//! cargo run -p api-server
//!
//! # JSON logs, CORS restricted to the frontend, empty stores
//! LOG_FORMAT=json FRONTEND_URL=http://localhost:3000 SEED_DATA=false \
//!   cargo run -p api-server
//! ```
//!
//! Configuration: See `config.rs` for all environment variables.

mod config;
mod error;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use domain::adapters::memory_repo::{InMemoryProfileRepo, InMemoryUserRepo};
use domain::service::{ProfileService, UserService};
use domain::{
    CoreError, Entity, IdGenerator, NewProfile, NewUser, Profile, ProfileId, ProfilePatch, User,
    UserId, UserPatch,
};
use http_common::{envelope, Envelope};
use serde::Deserialize;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::{ApiResult, JsonBody};

/// Random v4 UUIDs for new records.
#[derive(Clone, Copy, Debug, Default)]
struct UuidIdGenerator;

impl IdGenerator for UuidIdGenerator {
    fn next_id(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

type Profiles = ProfileService<InMemoryProfileRepo, UuidIdGenerator>;
type Users = UserService<InMemoryUserRepo, Arc<Profiles>, UuidIdGenerator>;

#[derive(Clone)]
struct AppState {
    profiles: Arc<Profiles>,
    users: Arc<Users>,
}

impl AppState {
    /// Construct empty stores, the user store holding a handle to the profile store.
    fn in_memory() -> Self {
        let profiles = Arc::new(ProfileService::new(InMemoryProfileRepo::new(), UuidIdGenerator));
        let users = Arc::new(UserService::new(
            InMemoryUserRepo::new(),
            Arc::clone(&profiles),
            UuidIdGenerator,
        ));
        Self { profiles, users }
    }

    fn seeded() -> Result<Self, CoreError> {
        let state = Self::in_memory();
        let summary = domain::seed::seed_demo_data(&*state.profiles, &*state.users)?;
        info!(
            profiles = summary.profiles,
            users = summary.users,
            "seeded demo data"
        );
        Ok(state)
    }
}

#[tokio::main]
async fn main() {
    // Load and validate config first (fail fast on misconfiguration)
    let cfg = match config::Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    init_tracing(&cfg);
    cfg.log_summary();

    let state = if cfg.seed_data {
        match AppState::seeded() {
            Ok(s) => s,
            Err(e) => {
                error!(err = %e, "failed to seed demo data");
                std::process::exit(1);
            }
        }
    } else {
        AppState::in_memory()
    };

    // Request ID header name
    let x_request_id = axum::http::HeaderName::from_static("x-request-id");

    let app = router(state)
        .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            }),
        )
        .layer(SetRequestIdLayer::new(x_request_id, MakeRequestUuid))
        .layer(cors_layer(&cfg));

    let addr: SocketAddr = ([0, 0, 0, 0], cfg.port).into();
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            error!(%addr, err = %e, "failed to bind");
            std::process::exit(1);
        }
    };
    info!(%addr, domain = %domain::about(), "api-server listening");
    if let Err(e) = axum::serve(listener, app).await {
        error!(err = %e, "server error");
        std::process::exit(1);
    }
}

fn init_tracing(cfg: &config::Config) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);
    match cfg.log_format {
        config::LogFormat::Json => {
            registry
                .with(
                    fmt::layer()
                        .json()
                        .with_target(true)
                        .with_timer(fmt::time::SystemTime)
                        .with_writer(std::io::stdout),
                )
                .init();
        }
        config::LogFormat::Pretty => {
            registry
                .with(
                    fmt::layer()
                        .pretty()
                        .with_target(true)
                        .with_writer(std::io::stdout),
                )
                .init();
        }
    }
}

// CORS - origin already validated in Config::from_env()
fn cors_layer(cfg: &config::Config) -> CorsLayer {
    if cfg.cors_is_permissive() {
        return CorsLayer::permissive();
    }
    CorsLayer::new()
        .allow_origin(AllowOrigin::list([cfg.cors_allow_origin.clone()]))
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::HEAD,
            axum::http::Method::PUT,
            axum::http::Method::PATCH,
            axum::http::Method::POST,
            axum::http::Method::DELETE,
        ])
        .allow_headers([axum::http::header::CONTENT_TYPE])
        .allow_credentials(true)
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/profiles", get(list_profiles).post(create_profile))
        .route(
            "/profiles/:id",
            get(get_profile).put(update_profile).delete(delete_profile),
        )
        .route("/users", get(list_users).post(create_user))
        .route("/users/profile/:profile_id", get(list_users_by_profile))
        .route(
            "/users/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route("/users/:id/toggle-status", patch(toggle_user_status))
        .with_state(state)
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct CreateProfileReq {
    name: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct UpdateProfileReq {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct CreateUserReq {
    first_name: String,
    last_name: String,
    email: String,
    is_active: bool,
    profile_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct UpdateUserReq {
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    last_name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    is_active: Option<bool>,
    #[serde(default)]
    profile_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsersQuery {
    profile_id: Option<String>,
}

/// A blank path segment names no record, so it is a miss rather than bad input.
fn profile_path_id(raw: String) -> Result<ProfileId, CoreError> {
    if raw.trim().is_empty() {
        return Err(CoreError::NotFound {
            entity: Entity::Profile,
            id: raw,
        });
    }
    ProfileId::new(raw)
}

fn user_path_id(raw: String) -> Result<UserId, CoreError> {
    if raw.trim().is_empty() {
        return Err(CoreError::NotFound {
            entity: Entity::User,
            id: raw,
        });
    }
    UserId::new(raw)
}

async fn health() -> Json<Envelope<serde_json::Value>> {
    Json(envelope(serde_json::json!({"status": "ok"})))
}

async fn list_profiles(State(state): State<AppState>) -> ApiResult<Json<Envelope<Vec<Profile>>>> {
    Ok(Json(envelope(state.profiles.find_all()?)))
}

async fn get_profile(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Envelope<Profile>>> {
    let id = profile_path_id(id)?;
    Ok(Json(envelope(state.profiles.find_one(&id)?)))
}

async fn create_profile(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<CreateProfileReq>,
) -> ApiResult<(StatusCode, Json<Envelope<Profile>>)> {
    let profile = state.profiles.create(NewProfile { name: body.name })?;
    info!(profile_id = %profile.id, name = %profile.name, "profile created");
    Ok((StatusCode::CREATED, Json(envelope(profile))))
}

async fn update_profile(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<UpdateProfileReq>,
) -> ApiResult<Json<Envelope<Profile>>> {
    let id = profile_path_id(id)?;
    let profile = state
        .profiles
        .update(&id, ProfilePatch { name: body.name })?;
    info!(profile_id = %profile.id, name = %profile.name, "profile updated");
    Ok(Json(envelope(profile)))
}

async fn delete_profile(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = profile_path_id(id)?;
    state.profiles.remove(&id)?;
    info!(profile_id = %id, "profile deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn list_users(
    State(state): State<AppState>,
    Query(q): Query<UsersQuery>,
) -> ApiResult<Json<Envelope<Vec<User>>>> {
    let users = match q.profile_id.filter(|s| !s.is_empty()) {
        Some(profile_id) => state.users.find_by_profile(&ProfileId::new(profile_id)?)?,
        None => state.users.find_all()?,
    };
    Ok(Json(envelope(users)))
}

async fn list_users_by_profile(
    State(state): State<AppState>,
    Path(profile_id): Path<String>,
) -> ApiResult<Json<Envelope<Vec<User>>>> {
    let profile_id = profile_path_id(profile_id)?;
    Ok(Json(envelope(state.users.find_by_profile(&profile_id)?)))
}

async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Envelope<User>>> {
    let id = user_path_id(id)?;
    Ok(Json(envelope(state.users.find_one(&id)?)))
}

async fn create_user(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<CreateUserReq>,
) -> ApiResult<(StatusCode, Json<Envelope<User>>)> {
    let input = NewUser {
        first_name: body.first_name,
        last_name: body.last_name,
        email: body.email,
        is_active: body.is_active,
        profile_id: ProfileId::new(body.profile_id)?,
    };
    let user = state.users.create(input)?;
    info!(user_id = %user.id, profile_id = %user.profile_id, "user created");
    Ok((StatusCode::CREATED, Json(envelope(user))))
}

async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<UpdateUserReq>,
) -> ApiResult<Json<Envelope<User>>> {
    let id = user_path_id(id)?;
    let patch = UserPatch {
        first_name: body.first_name,
        last_name: body.last_name,
        email: body.email,
        is_active: body.is_active,
        profile_id: body.profile_id.map(ProfileId::new).transpose()?,
    };
    let user = state.users.update(&id, patch)?;
    info!(user_id = %user.id, "user updated");
    Ok(Json(envelope(user)))
}

async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = user_path_id(id)?;
    state.users.remove(&id)?;
    info!(user_id = %id, "user deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn toggle_user_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Envelope<User>>> {
    let id = user_path_id(id)?;
    let user = state.users.toggle_status(&id)?;
    info!(user_id = %user.id, is_active = user.is_active, "user status toggled");
    Ok(Json(envelope(user)))
}
