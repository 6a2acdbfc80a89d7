//! JSON request/response shapes that aren't already domain value objects.
//!
//! [`mcb_domain::value_objects::search::SearchResponse`] and friends are
//! already `Serialize`/`Deserialize` and are used directly as response
//! bodies; this module only covers the handful of shapes specific to the
//! HTTP surface (health, auth, error envelopes).

use serde::{Deserialize, Serialize};

/// `{error: string}` envelope every error response shares.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Human-readable error message.
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self { error: message.into() }
    }
}

/// `GET /health` response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub vector_index_size: usize,
    pub embedding_model_version: String,
}

/// `POST /auth/login` request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// `POST /auth/login` response body.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub username: String,
    pub role: String,
}

/// `GET /auth/me` response body, and entries of `GET /auth/users`.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub username: String,
    pub role: String,
}

impl From<mcb_domain::ports::infrastructure::auth::Identity> for UserResponse {
    fn from(identity: mcb_domain::ports::infrastructure::auth::Identity) -> Self {
        Self { username: identity.username, role: identity.role }
    }
}

/// `GET /auth/users` response body.
#[derive(Debug, Serialize)]
pub struct UserListResponse {
    pub count: usize,
    pub users: Vec<UserResponse>,
}

/// `POST /auth/users` request body.
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    #[serde(default = "default_role")]
    pub role: String,
}

fn default_role() -> String {
    "user".to_string()
}

/// `POST /auth/password` request body.
#[derive(Debug, Deserialize)]
pub struct SetPasswordRequest {
    /// Defaults to the caller's own username; admins may set another user's password.
    pub username: Option<String>,
    pub new_password: String,
}

/// `GET /torrent_files` response body.
#[derive(Debug, Serialize)]
pub struct TorrentFilesResponse {
    pub count: usize,
    pub files: Vec<mcb_domain::ports::providers::catalog::TorrentFile>,
}

/// `GET /tmdb_latest` response body: each entry is a hydrated row's fields
/// plus its `pg_id`/`title`, folded into one flat JSON object.
#[derive(Debug, Serialize)]
pub struct TmdbLatestResponse {
    pub count: usize,
    pub results: Vec<serde_json::Value>,
}

/// `GET /tmdb_detail` response body.
#[derive(Debug, Serialize)]
pub struct TmdbDetailResponse {
    pub found: bool,
    pub detail: Option<serde_json::Value>,
}

/// Fold a [`HydratedRow`](mcb_domain::ports::providers::catalog::HydratedRow)
/// into one flat JSON object (`pg_id`, `title`, plus every hydrated field).
pub fn hydrated_row_to_json(row: mcb_domain::ports::providers::catalog::HydratedRow) -> serde_json::Value {
    let mut map: serde_json::Map<String, serde_json::Value> = row.fields.into_iter().collect();
    map.insert("pg_id".to_string(), serde_json::Value::String(row.pg_id));
    map.insert("title".to_string(), serde_json::Value::String(row.title));
    serde_json::Value::Object(map)
}
