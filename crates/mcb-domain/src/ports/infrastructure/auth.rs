//! Authentication Service Port
//!
//! Bearer-token auth backed by a bootstrap admin credential plus a
//! file-persisted user store. See [`crate::value_objects`] for the
//! absence of a dedicated `User` value object: identity here is
//! deliberately minimal (username + role) since nothing else in the
//! system needs richer user profiles.

use crate::error::Result;
use async_trait::async_trait;
use shaku::Interface;

/// An authenticated identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Username.
    pub username: String,
    /// `"admin"` or `"user"`.
    pub role: String,
}

impl Identity {
    /// True when this identity has the admin role.
    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }
}

/// Authentication service interface.
#[async_trait]
pub trait AuthServiceInterface: Interface + Send + Sync {
    /// Verify credentials (admin bootstrap or file-stored user) and return the identity.
    async fn login(&self, username: &str, password: &str) -> Result<Option<Identity>>;

    /// Issue a bearer token for an already-authenticated identity.
    async fn issue_token(&self, identity: &Identity) -> Result<String>;

    /// Resolve a bearer token to its identity, pruning expired tokens first.
    async fn verify_token(&self, token: &str) -> Result<Option<Identity>>;

    /// List non-admin users.
    async fn list_users(&self) -> Result<Vec<Identity>>;

    /// Add a new user with a salted, hashed password.
    async fn add_user(&self, username: &str, password: &str, role: &str) -> Result<()>;

    /// Remove a user.
    async fn delete_user(&self, username: &str) -> Result<()>;

    /// Change a user's password.
    async fn set_password(&self, username: &str, new_password: &str) -> Result<()>;

    /// Whether auth enforcement is enabled at all.
    fn enabled(&self) -> bool;
}
