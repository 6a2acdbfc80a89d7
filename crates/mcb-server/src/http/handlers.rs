//! HTTP handlers for the search API, auxiliary catalog lookups, and auth.
//!
//! Every handler maps domain errors to a JSON `{error: string}` body and an
//! appropriate status code at this boundary, logging the full error chain
//! before responding.

use mcb_application::domain_services::search_service::SearchQuery;
use mcb_domain::error::Error;
use mcb_domain::ports::providers::enrichment::{EnrichmentQuery, EnrichmentStatus};
use mcb_domain::value_objects::{SearchResponse, SearchResult, SizeSort};
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::{State, delete, get, post};
use std::sync::Arc;
use tracing::{error, warn};

use mcb_infrastructure::bootstrap::Server;

use super::guards::{AdminGuard, UserGuard};
use super::models::{
    CreateUserRequest, ErrorResponse, HealthResponse, LoginRequest, LoginResponse,
    SetPasswordRequest, TmdbDetailResponse, TmdbLatestResponse, TorrentFilesResponse,
    UserListResponse, UserResponse, hydrated_row_to_json,
};

type ApiError = (Status, Json<ErrorResponse>);

/// Map a domain error to a status code and JSON body, logging the chain.
fn map_error(context: &str, err: Error) -> ApiError {
    error!(error = %err, context, "request failed");
    let status = match &err {
        Error::NotFound { .. } => Status::NotFound,
        Error::InvalidArgument { .. } => Status::BadRequest,
        Error::Authentication { .. } => Status::Unauthorized,
        Error::Configuration { .. } | Error::Config { .. } => Status::InternalServerError,
        _ => Status::InternalServerError,
    };
    (status, Json(ErrorResponse::new(err.to_string())))
}

fn bad_request(message: impl Into<String>) -> ApiError {
    (Status::BadRequest, Json(ErrorResponse::new(message)))
}

/// `GET /health`
#[get("/health")]
pub async fn health(server: &State<Arc<Server>>) -> Result<Json<HealthResponse>, ApiError> {
    let vector_index_size = server
        .vector_store
        .size()
        .await
        .map_err(|e| map_error("health", e))?;
    Ok(Json(HealthResponse {
        status: "ok",
        vector_index_size,
        embedding_model_version: server.config.embedding_model_version.clone(),
    }))
}

/// `GET /search`
#[allow(clippy::too_many_arguments)]
#[get("/search?<q>&<topk>&<exclude_nsfw>&<tmdb_only>&<size_min_gb>&<size_sort>&<page_size>&<cursor>")]
pub async fn search(
    _auth: UserGuard,
    server: &State<Arc<Server>>,
    q: String,
    topk: Option<usize>,
    exclude_nsfw: Option<bool>,
    tmdb_only: Option<bool>,
    size_min_gb: Option<f64>,
    size_sort: Option<String>,
    page_size: Option<usize>,
    cursor: Option<usize>,
) -> Result<Json<SearchResponse>, ApiError> {
    if q.trim().is_empty() {
        return Err(bad_request("q must not be empty"));
    }

    let size_sort = match size_sort.as_deref() {
        None => None,
        Some("asc") => Some(SizeSort::Asc),
        Some("desc") => Some(SizeSort::Desc),
        Some(other) => return Err(bad_request(format!("size_sort must be asc or desc, got '{other}'"))),
    };

    let query = SearchQuery {
        q,
        topk: topk.unwrap_or(20).clamp(1, 100),
        exclude_nsfw: exclude_nsfw.unwrap_or(true),
        tmdb_only: tmdb_only.unwrap_or(false),
        size_min_gb: size_min_gb.filter(|v| *v >= 0.0),
        size_sort,
        page_size: page_size.unwrap_or(20).clamp(1, 100),
        cursor: cursor.unwrap_or(0),
    };

    server
        .search_service
        .search(&query)
        .await
        .map(Json)
        .map_err(|e| map_error("search", e))
}

/// `GET /search_keyword`
#[allow(clippy::too_many_arguments)]
#[get("/search_keyword?<q>&<sources>&<topk>&<page_size>")]
pub async fn search_keyword(
    _auth: UserGuard,
    server: &State<Arc<Server>>,
    q: String,
    sources: Option<String>,
    topk: Option<usize>,
    page_size: Option<usize>,
) -> Result<Json<SearchResponse>, ApiError> {
    if q.trim().is_empty() {
        return Err(bad_request("q must not be empty"));
    }

    let page_size = page_size.unwrap_or(20).clamp(1, 100);
    let limit = topk.unwrap_or(20).clamp(1, 100).max(page_size);
    let source_names: Vec<String> = match sources {
        Some(list) => list.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect(),
        None => server.source_names(),
    };

    let results: Vec<SearchResult> = server
        .search_service
        .search_keyword(&q, &source_names, limit)
        .await
        .map_err(|e| map_error("search_keyword", e))?;

    let count = results.len().min(page_size);
    Ok(Json(SearchResponse {
        count,
        next_cursor: None,
        page_size,
        results: results.into_iter().take(page_size).collect(),
    }))
}

/// `GET /torrent_files`
#[get("/torrent_files?<info_hash>&<limit>")]
pub async fn torrent_files(
    _auth: UserGuard,
    server: &State<Arc<Server>>,
    info_hash: String,
    limit: Option<usize>,
) -> Result<Json<TorrentFilesResponse>, ApiError> {
    if info_hash.trim().is_empty() {
        return Err(bad_request("info_hash must not be empty"));
    }
    let files = server
        .catalog
        .fetch_torrent_files(&server.config.bitmagnet.schema, &info_hash, limit.unwrap_or(100))
        .await
        .map_err(|e| map_error("torrent_files", e))?;
    Ok(Json(TorrentFilesResponse { count: files.len(), files }))
}

/// `GET /tmdb_latest`
#[get("/tmdb_latest?<limit>")]
pub async fn tmdb_latest(
    _auth: UserGuard,
    server: &State<Arc<Server>>,
    limit: Option<usize>,
) -> Result<Json<TmdbLatestResponse>, ApiError> {
    let rows = server
        .catalog
        .fetch_latest_tmdb(&server.config.bitmagnet.schema, limit.unwrap_or(20).clamp(1, 100))
        .await
        .map_err(|e| map_error("tmdb_latest", e))?;
    let results: Vec<serde_json::Value> = rows.into_iter().map(hydrated_row_to_json).collect();
    Ok(Json(TmdbLatestResponse { count: results.len(), results }))
}

/// `GET /tmdb_detail`
///
/// Falls through to a live enrichment call when the detail is missing and
/// TMDB enrichment is enabled, then re-reads the catalog once.
#[get("/tmdb_detail?<tmdb_id>&<content_type>")]
pub async fn tmdb_detail(
    _auth: UserGuard,
    server: &State<Arc<Server>>,
    tmdb_id: i64,
    content_type: String,
) -> Result<Json<TmdbDetailResponse>, ApiError> {
    let schema = &server.config.bitmagnet.schema;

    let row = server
        .catalog
        .fetch_tmdb_detail(schema, tmdb_id, &content_type)
        .await
        .map_err(|e| map_error("tmdb_detail", e))?;

    let row = match row {
        Some(row) => Some(row),
        None => {
            if let (Some(client), Some(store)) = (server.tmdb_client.as_ref(), server.enrichment_store.as_ref()) {
                let query = EnrichmentQuery {
                    reference: format!("{content_type}:{tmdb_id}"),
                    params: serde_json::json!({"tmdb_id": tmdb_id, "content_type": content_type}),
                };
                match client.fetch(&query).await {
                    Ok(record) => {
                        if record.status == EnrichmentStatus::Ok {
                            if let Err(e) = store.put(schema, &query.reference, record).await {
                                warn!(error = %e, "failed to cache live tmdb_detail enrichment");
                            }
                            server
                                .catalog
                                .fetch_tmdb_detail(schema, tmdb_id, &content_type)
                                .await
                                .map_err(|e| map_error("tmdb_detail", e))?
                        } else {
                            None
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, tmdb_id, content_type, "live tmdb_detail enrichment failed");
                        None
                    }
                }
            } else {
                None
            }
        }
    };

    Ok(Json(TmdbDetailResponse { found: row.is_some(), detail: row.map(hydrated_row_to_json) }))
}

/// `GET /sync_status`
#[get("/sync_status")]
pub async fn sync_status(
    _auth: UserGuard,
    server: &State<Arc<Server>>,
) -> Json<mcb_domain::ports::infrastructure::sync_status::SyncStatusSnapshot> {
    Json(server.sync_status.current().await)
}

/// `POST /auth/login`
#[post("/auth/login", format = "json", data = "<body>")]
pub async fn login(
    server: &State<Arc<Server>>,
    body: Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let body = body.into_inner();
    let identity = server
        .auth
        .login(&body.username, &body.password)
        .await
        .map_err(|e| map_error("auth/login", e))?
        .ok_or_else(|| (Status::Unauthorized, Json(ErrorResponse::new("invalid credentials"))))?;

    let token = server
        .auth
        .issue_token(&identity)
        .await
        .map_err(|e| map_error("auth/login", e))?;

    Ok(Json(LoginResponse { token, username: identity.username, role: identity.role }))
}

/// `GET /auth/me`
#[get("/auth/me")]
pub fn me(auth: UserGuard) -> Json<UserResponse> {
    Json(auth.0.into())
}

/// `GET /auth/users`
#[get("/auth/users")]
pub async fn list_users(
    _auth: AdminGuard,
    server: &State<Arc<Server>>,
) -> Result<Json<UserListResponse>, ApiError> {
    let users: Vec<UserResponse> = server
        .auth
        .list_users()
        .await
        .map_err(|e| map_error("auth/users", e))?
        .into_iter()
        .map(UserResponse::from)
        .collect();
    Ok(Json(UserListResponse { count: users.len(), users }))
}

/// `POST /auth/users`
#[post("/auth/users", format = "json", data = "<body>")]
pub async fn create_user(
    _auth: AdminGuard,
    server: &State<Arc<Server>>,
    body: Json<CreateUserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let body = body.into_inner();
    server
        .auth
        .add_user(&body.username, &body.password, &body.role)
        .await
        .map_err(|e| map_error("auth/users", e))?;
    Ok(Json(UserResponse { username: body.username, role: body.role }))
}

/// `DELETE /auth/users/<username>`
#[delete("/auth/users/<username>")]
pub async fn delete_user(
    _auth: AdminGuard,
    server: &State<Arc<Server>>,
    username: &str,
) -> Result<Status, ApiError> {
    server.auth.delete_user(username).await.map_err(|e| map_error("auth/users", e))?;
    Ok(Status::NoContent)
}

/// `POST /auth/password`
#[post("/auth/password", format = "json", data = "<body>")]
pub async fn set_password(
    auth: UserGuard,
    server: &State<Arc<Server>>,
    body: Json<SetPasswordRequest>,
) -> Result<Status, ApiError> {
    let body = body.into_inner();
    let target = body.username.as_deref().unwrap_or(&auth.0.username);

    if target != auth.0.username && !auth.0.is_admin() {
        return Err((Status::Forbidden, Json(ErrorResponse::new("only admins may change another user's password"))));
    }

    server
        .auth
        .set_password(target, &body.new_password)
        .await
        .map_err(|e| map_error("auth/password", e))?;
    Ok(Status::Ok)
}
