//! File-backed bearer-token authentication.
//!
//! Grounded on the reference implementation's `AuthStore`: a bootstrap
//! admin credential carried in config (never persisted, never listed,
//! never deletable) plus a JSON file of additional users, each with a
//! random salt and a `sha256(salt:password)` hash. Tokens are opaque
//! random hex strings held in memory only and pruned lazily past their
//! TTL on every lookup.

use crate::constants::{SALT_BYTES, TOKEN_BYTES};
use async_trait::async_trait;
use chrono::Utc;
use mcb_domain::error::{Error, Result};
use mcb_domain::ports::infrastructure::auth::{AuthServiceInterface, Identity};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredUser {
    username: String,
    role: String,
    salt: String,
    password_hash: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct UserStoreFile {
    #[serde(default)]
    users: Vec<StoredUser>,
}

struct IssuedToken {
    username: String,
    role: String,
    issued_at: i64,
}

fn hash_password(password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{salt}:{password}").as_bytes());
    hex::encode(hasher.finalize())
}

fn random_hex(num_bytes: usize) -> String {
    // uuid::Uuid::new_v4() is getrandom-backed; concatenate as many v4
    // UUIDs (16 bytes each) as needed and truncate to the requested length.
    let mut out = String::with_capacity(num_bytes * 2);
    while out.len() < num_bytes * 2 {
        out.push_str(&uuid::Uuid::new_v4().simple().to_string());
    }
    out.truncate(num_bytes * 2);
    out
}

/// File-backed [`AuthServiceInterface`] implementation.
pub struct FileAuthService {
    enabled: bool,
    admin_user: String,
    admin_password: String,
    user_store_path: PathBuf,
    token_ttl_seconds: u64,
    tokens: RwLock<HashMap<String, IssuedToken>>,
}

impl FileAuthService {
    /// Build a new auth service. `user_store_path`'s parent directory is
    /// created lazily on first write, matching the reference `_ensure_store`.
    pub fn new(
        enabled: bool,
        admin_user: String,
        admin_password: String,
        user_store_path: PathBuf,
        token_ttl_seconds: u64,
    ) -> Self {
        Self {
            enabled,
            admin_user,
            admin_password,
            user_store_path,
            token_ttl_seconds,
            tokens: RwLock::new(HashMap::new()),
        }
    }

    async fn load_store(&self) -> Result<UserStoreFile> {
        match crate::utils::FileUtils::read_string_if_exists(&self.user_store_path).await? {
            Some(content) => serde_json::from_str(&content).map_err(|e| Error::Infrastructure {
                message: format!("failed to parse user store: {e}"),
                source: Some(Box::new(e)),
            }),
            None => Ok(UserStoreFile::default()),
        }
    }

    async fn save_store(&self, store: &UserStoreFile) -> Result<()> {
        crate::utils::FileUtils::ensure_dir_write_json(
            &self.user_store_path,
            store,
            "auth user store",
        )
        .await
    }

    async fn prune_tokens(&self) {
        let now = Utc::now().timestamp();
        let ttl = self.token_ttl_seconds as i64;
        let mut tokens = self.tokens.write().await;
        tokens.retain(|_, meta| now - meta.issued_at <= ttl);
    }
}

#[async_trait]
impl AuthServiceInterface for FileAuthService {
    async fn login(&self, username: &str, password: &str) -> Result<Option<Identity>> {
        if username == self.admin_user && password == self.admin_password {
            return Ok(Some(Identity {
                username: username.to_string(),
                role: "admin".to_string(),
            }));
        }

        let store = self.load_store().await?;
        for user in &store.users {
            if user.username != username {
                continue;
            }
            if user.password_hash == hash_password(password, &user.salt) {
                return Ok(Some(Identity {
                    username: user.username.clone(),
                    role: user.role.clone(),
                }));
            }
        }
        Ok(None)
    }

    async fn issue_token(&self, identity: &Identity) -> Result<String> {
        self.prune_tokens().await;
        let token = random_hex(TOKEN_BYTES);
        let mut tokens = self.tokens.write().await;
        tokens.insert(
            token.clone(),
            IssuedToken {
                username: identity.username.clone(),
                role: identity.role.clone(),
                issued_at: Utc::now().timestamp(),
            },
        );
        Ok(token)
    }

    async fn verify_token(&self, token: &str) -> Result<Option<Identity>> {
        self.prune_tokens().await;
        let tokens = self.tokens.read().await;
        Ok(tokens.get(token).map(|meta| Identity {
            username: meta.username.clone(),
            role: meta.role.clone(),
        }))
    }

    async fn list_users(&self) -> Result<Vec<Identity>> {
        let store = self.load_store().await?;
        Ok(store
            .users
            .into_iter()
            .map(|u| Identity {
                username: u.username,
                role: u.role,
            })
            .collect())
    }

    async fn add_user(&self, username: &str, password: &str, role: &str) -> Result<()> {
        let mut store = self.load_store().await?;
        if store.users.iter().any(|u| u.username == username) {
            return Err(Error::invalid_argument(format!(
                "user '{username}' already exists"
            )));
        }
        let salt = random_hex(SALT_BYTES);
        store.users.push(StoredUser {
            username: username.to_string(),
            role: role.to_string(),
            salt: salt.clone(),
            password_hash: hash_password(password, &salt),
        });
        self.save_store(&store).await
    }

    async fn delete_user(&self, username: &str) -> Result<()> {
        let mut store = self.load_store().await?;
        store.users.retain(|u| u.username != username);
        self.save_store(&store).await
    }

    async fn set_password(&self, username: &str, new_password: &str) -> Result<()> {
        let mut store = self.load_store().await?;
        let user = store
            .users
            .iter_mut()
            .find(|u| u.username == username)
            .ok_or_else(|| Error::not_found(format!("user '{username}' not found")))?;
        let salt = random_hex(SALT_BYTES);
        user.salt = salt.clone();
        user.password_hash = hash_password(new_password, &salt);
        self.save_store(&store).await
    }

    fn enabled(&self) -> bool {
        self.enabled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(enabled: bool, path: PathBuf) -> FileAuthService {
        FileAuthService::new(
            enabled,
            "admin".to_string(),
            "adminpass".to_string(),
            path,
            3600,
        )
    }

    #[tokio::test]
    async fn bootstrap_admin_login_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(true, dir.path().join("users.json"));
        let identity = svc.login("admin", "adminpass").await.unwrap().unwrap();
        assert_eq!(identity.role, "admin");
        assert!(identity.is_admin());
    }

    #[tokio::test]
    async fn wrong_password_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(true, dir.path().join("users.json"));
        assert!(svc.login("admin", "wrong").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn add_user_then_login() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(true, dir.path().join("users.json"));
        svc.add_user("alice", "hunter2", "user").await.unwrap();
        let identity = svc.login("alice", "hunter2").await.unwrap().unwrap();
        assert_eq!(identity.username, "alice");
        assert_eq!(identity.role, "user");
        assert!(!identity.is_admin());
    }

    #[tokio::test]
    async fn duplicate_user_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(true, dir.path().join("users.json"));
        svc.add_user("alice", "hunter2", "user").await.unwrap();
        assert!(svc.add_user("alice", "other", "user").await.is_err());
    }

    #[tokio::test]
    async fn token_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(true, dir.path().join("users.json"));
        let identity = Identity {
            username: "admin".to_string(),
            role: "admin".to_string(),
        };
        let token = svc.issue_token(&identity).await.unwrap();
        let resolved = svc.verify_token(&token).await.unwrap().unwrap();
        assert_eq!(resolved.username, "admin");
    }

    #[tokio::test]
    async fn expired_token_is_pruned() {
        let dir = tempfile::tempdir().unwrap();
        let mut svc = service(true, dir.path().join("users.json"));
        svc.token_ttl_seconds = 0;
        let identity = Identity {
            username: "admin".to_string(),
            role: "admin".to_string(),
        };
        let token = svc.issue_token(&identity).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert!(svc.verify_token(&token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn set_password_changes_hash() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(true, dir.path().join("users.json"));
        svc.add_user("alice", "hunter2", "user").await.unwrap();
        svc.set_password("alice", "newpass").await.unwrap();
        assert!(svc.login("alice", "hunter2").await.unwrap().is_none());
        assert!(svc.login("alice", "newpass").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn delete_user_removes_login() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(true, dir.path().join("users.json"));
        svc.add_user("alice", "hunter2", "user").await.unwrap();
        svc.delete_user("alice").await.unwrap();
        assert!(svc.login("alice", "hunter2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_users_excludes_admin() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(true, dir.path().join("users.json"));
        svc.add_user("alice", "hunter2", "user").await.unwrap();
        let users = svc.list_users().await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].username, "alice");
    }

    #[test]
    fn enabled_flag_reflects_config() {
        let svc = service(false, PathBuf::from("/tmp/unused.json"));
        assert!(!svc.enabled());
    }
}
