//! Bearer-token request guards.
//!
//! `UserGuard` extracts and verifies the `Authorization: Bearer <token>`
//! header against the configured [`AuthServiceInterface`]. When auth is
//! disabled it is a no-op that yields an anonymous/guest identity; when
//! enabled, a missing, malformed, or expired token fails the request with
//! 401. `AdminGuard` additionally requires the `admin` role, failing with
//! 403 otherwise.

use mcb_domain::ports::infrastructure::auth::Identity;
use rocket::http::Status;
use rocket::request::{FromRequest, Outcome, Request};
use std::sync::Arc;

use mcb_infrastructure::bootstrap::Server;
use mcb_infrastructure::constants::{AUTHORIZATION_HEADER, BEARER_PREFIX};

/// An authenticated (or, when auth is disabled, anonymous) identity.
pub struct UserGuard(pub Identity);

/// An authenticated identity with the `admin` role.
pub struct AdminGuard(pub Identity);

fn anonymous() -> Identity {
    Identity { username: "anonymous".to_string(), role: "guest".to_string() }
}

async fn authenticate(req: &Request<'_>) -> Result<Identity, Status> {
    let server = req
        .rocket()
        .state::<Arc<Server>>()
        .ok_or(Status::InternalServerError)?;

    if !server.auth.enabled() {
        return Ok(anonymous());
    }

    let header = req.headers().get_one(AUTHORIZATION_HEADER).ok_or(Status::Unauthorized)?;
    let token = header.strip_prefix(BEARER_PREFIX).ok_or(Status::Unauthorized)?;

    server
        .auth
        .verify_token(token)
        .await
        .map_err(|_| Status::InternalServerError)?
        .ok_or(Status::Unauthorized)
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for UserGuard {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match authenticate(req).await {
            Ok(identity) => Outcome::Success(UserGuard(identity)),
            Err(status) => Outcome::Error((status, ())),
        }
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AdminGuard {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match authenticate(req).await {
            Ok(identity) if identity.is_admin() => Outcome::Success(AdminGuard(identity)),
            Ok(_) => Outcome::Error((Status::Forbidden, ())),
            Err(status) => Outcome::Error((status, ())),
        }
    }
}
