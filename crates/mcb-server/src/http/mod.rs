//! Rocket HTTP surface: request guards, JSON DTOs, and route handlers.

pub mod guards;
pub mod handlers;
pub mod models;

use mcb_infrastructure::bootstrap::Server;
use std::sync::Arc;

/// Build the Rocket instance, mounting every route under `/` and managing
/// the shared [`Server`] as request-guard state.
pub fn rocket(server: Arc<Server>) -> rocket::Rocket<rocket::Build> {
    rocket::build().manage(server).mount(
        "/",
        rocket::routes![
            handlers::health,
            handlers::search,
            handlers::search_keyword,
            handlers::torrent_files,
            handlers::tmdb_latest,
            handlers::tmdb_detail,
            handlers::sync_status,
            handlers::login,
            handlers::me,
            handlers::list_users,
            handlers::create_user,
            handlers::delete_user,
            handlers::set_password,
        ],
    )
}
