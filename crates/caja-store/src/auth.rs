//! # Authentication & Lockout Gate
//!
//! Validates credentials against the synced user collection with a remote
//! point-lookup fallback, and enforces the failed-attempt lockout.
//!
//! ## Login Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  login(identifier, secret)                                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  1. Lockout window active? ──yes──► LockedOut { remaining minutes }    │
//! │       │ no                                                              │
//! │       ▼                                                                 │
//! │  2. Resolve user                                                        │
//! │     snapshot: case-insensitive username/email match                     │
//! │       │ miss (snapshot may not have synced yet)                         │
//! │       ▼                                                                 │
//! │     remote point-lookups, in order:                                     │
//! │       exact username → usernameLower → exact email                      │
//! │       │                                                                 │
//! │       ├── nobody ──► NotFound                                           │
//! │       ▼                                                                 │
//! │  3. Verify secret against the stored argon2 hash (constant time)       │
//! │       ├── mismatch ──► count failure; 3rd failure locks 5 minutes      │
//! │       ▼                                                                 │
//! │  4. Success: reset the bucket, set + persist the session               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A record with no stored hash accepts any secret (legacy imports); the
//! hash is set on the first password change.

use std::sync::{Arc, Mutex, RwLock};

use chrono::Utc;
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use caja_core::lockout::{FailureOutcome, LockoutTracker};
use caja_core::{User, MAX_LOGIN_ATTEMPTS};
use caja_db::{decode_doc, Collection, DbError, DocumentStore};

use crate::error::StoreError;
use crate::session::SessionStore;
use crate::snapshot::SnapshotCache;
use crate::store::SyncedStore;

// =============================================================================
// Errors
// =============================================================================

/// Login failures, each with a human-readable message that distinguishes
/// not-found, wrong-password-with-counter, and locked-out-with-time.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("User not found")]
    NotFound,

    #[error("Incorrect password. Attempts: {attempts}/{max}")]
    InvalidCredentials { attempts: u32, max: u32 },

    #[error("Account locked. Try again in {minutes} minutes")]
    LockedOut { minutes: i64 },

    /// The user lookup could not reach the document store.
    #[error("Remote operation failed: {0}")]
    Remote(#[from] DbError),
}

// =============================================================================
// Password Hashing
// =============================================================================

/// Hashes a password with a fresh random salt (argon2id).
pub fn hash_password(plain: &str) -> Result<String, StoreError> {
    use argon2::password_hash::{rand_core::OsRng, SaltString};
    use argon2::{Argon2, PasswordHasher};

    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| StoreError::PasswordHash(e.to_string()))
}

/// Verifies a password against a stored hash in constant time.
///
/// An unparseable hash verifies as false rather than erroring: a corrupt
/// hash must lock the account, not crash the login path.
pub fn verify_password(plain: &str, hash: &str) -> bool {
    use argon2::{Argon2, PasswordHash, PasswordVerifier};

    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok()
}

// =============================================================================
// Auth Gate
// =============================================================================

/// The login state machine plus the current session.
pub struct AuthGate {
    docs: DocumentStore,
    cache: Arc<SnapshotCache>,
    lockouts: Mutex<LockoutTracker>,
    session: SessionStore,
    current_user: RwLock<Option<User>>,
}

impl AuthGate {
    /// Builds the gate over a synced store, restoring any persisted session.
    pub fn new(store: &SyncedStore, session: SessionStore) -> Self {
        let restored = session.load();
        if let Some(user) = &restored {
            info!(user = %user.username, "Session restored");
        }
        AuthGate {
            docs: store.docs(),
            cache: store.cache(),
            lockouts: Mutex::new(LockoutTracker::new()),
            session,
            current_user: RwLock::new(restored),
        }
    }

    /// Attempts a login. See the module docs for the full flow.
    pub async fn login(&self, identifier: &str, secret: &str) -> Result<User, AuthError> {
        let now = Utc::now();

        // 1. An active lockout rejects every attempt, even a correct one
        if let Some(minutes) = self
            .lockouts
            .lock()
            .expect("lockout lock poisoned")
            .remaining_lockout_minutes(identifier, now)
        {
            return Err(AuthError::LockedOut { minutes });
        }

        // 2. Resolve the identifier to a user
        let Some(user) = self.resolve(identifier).await? else {
            return Err(AuthError::NotFound);
        };

        // 3. Verify the secret (records with no hash accept any secret)
        if let Some(hash) = &user.password_hash {
            if !verify_password(secret, hash) {
                let outcome = self
                    .lockouts
                    .lock()
                    .expect("lockout lock poisoned")
                    .record_failure(identifier, now);
                return Err(match outcome {
                    FailureOutcome::Counted { attempts } => AuthError::InvalidCredentials {
                        attempts,
                        max: MAX_LOGIN_ATTEMPTS,
                    },
                    FailureOutcome::LockedOut { minutes } => AuthError::LockedOut { minutes },
                });
            }
        }

        // 4. Success: clean slate for the identifier, session set + persisted
        self.lockouts
            .lock()
            .expect("lockout lock poisoned")
            .reset(identifier);
        *self
            .current_user
            .write()
            .expect("session lock poisoned") = Some(user.clone());
        if let Err(e) = self.session.save(&user) {
            // The login itself stands; only the restart persistence is lost
            warn!(error = %e, "Failed to persist session");
        }

        info!(user = %user.username, role = %user.role, "Login successful");
        Ok(user)
    }

    /// Ends the session and clears its persistence.
    pub fn logout(&self) {
        let previous = self
            .current_user
            .write()
            .expect("session lock poisoned")
            .take();
        if let Err(e) = self.session.clear() {
            warn!(error = %e, "Failed to clear persisted session");
        }
        if let Some(user) = previous {
            info!(user = %user.username, "Logged out");
        }
    }

    /// The logged-in user, if any.
    pub fn current_user(&self) -> Option<User> {
        self.current_user
            .read()
            .expect("session lock poisoned")
            .clone()
    }

    /// Snapshot first; on a miss, remote point-lookups in a fixed order.
    /// The snapshot can be empty right after startup, before the first
    /// subscription fire - the fallback covers that window.
    async fn resolve(&self, identifier: &str) -> Result<Option<User>, DbError> {
        if let Some(user) = self.cache.user_by_identifier(identifier) {
            return Ok(Some(user));
        }

        let trimmed = identifier.trim();
        let lower = trimmed.to_lowercase();
        let lookups = [
            ("username", trimmed),
            ("usernameLower", lower.as_str()),
            ("email", trimmed),
        ];

        for (field, value) in lookups {
            let hits = self.docs.find_by_field(Collection::Users, field, value).await?;
            if let Some(body) = hits.into_iter().next() {
                let id = body
                    .get("id")
                    .and_then(Value::as_str)
                    .unwrap_or("<missing id>")
                    .to_string();
                return Ok(Some(decode_doc(Collection::Users, &id, body)?));
            }
        }

        Ok(None)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{NewUser, SyncedStore};
    use crate::testutil::{temp_session, test_store};
    use caja_core::{Role, SUPER_ADMIN_INITIAL_PASSWORD, SUPER_ADMIN_USERNAME};

    async fn gate_with_user(
        username: &str,
        password: &str,
    ) -> (caja_db::Database, SyncedStore, AuthGate) {
        let (db, store) = test_store().await;
        let _sub = store.subscribe().await.unwrap();
        store
            .add_local(caja_core::Local {
                id: "l1".to_string(),
                name: "Sucursal Centro".to_string(),
                address: "Av. Principal 123".to_string(),
                is_active: true,
                subscription_status: caja_core::SubscriptionStatus::Active,
                last_payment_date: None,
                cash_in_register_cents: None,
            })
            .await
            .unwrap();
        store
            .add_user(NewUser {
                username: username.to_string(),
                email: Some(format!("{}@example.com", username.to_lowercase())),
                password: Some(password.to_string()),
                role: Role::Seller,
                name: username.to_string(),
                local_id: Some("l1".to_string()),
            })
            .await
            .unwrap();
        let gate = AuthGate::new(&store, temp_session("gate"));
        (db, store, gate)
    }

    #[tokio::test]
    async fn test_bootstrap_admin_can_log_in() {
        let (_db, store) = test_store().await;
        let _sub = store.subscribe().await.unwrap();

        let gate = AuthGate::new(&store, temp_session("bootstrap"));
        let user = gate
            .login(SUPER_ADMIN_USERNAME, SUPER_ADMIN_INITIAL_PASSWORD)
            .await
            .unwrap();
        assert_eq!(user.role, Role::SuperAdmin);
        assert!(gate.current_user().is_some());
    }

    #[tokio::test]
    async fn test_username_lookup_is_case_insensitive() {
        let (_db, _store, gate) = gate_with_user("Maria", "secret123").await;

        for identifier in ["maria", "MARIA", "Maria"] {
            let user = gate.login(identifier, "secret123").await.unwrap();
            assert_eq!(user.username, "Maria");
        }

        // Email works as an identifier too
        assert!(gate.login("maria@example.com", "secret123").await.is_ok());
    }

    #[tokio::test]
    async fn test_three_strikes_lock_even_the_right_password_out() {
        let (_db, _store, gate) = gate_with_user("maria", "secret123").await;

        for expected in 1..=2u32 {
            let err = gate.login("maria", "wrong").await.unwrap_err();
            assert!(matches!(
                err,
                AuthError::InvalidCredentials { attempts, max: 3 } if attempts == expected
            ));
        }

        let err = gate.login("maria", "wrong").await.unwrap_err();
        assert!(matches!(err, AuthError::LockedOut { minutes: 5 }));

        // Fourth attempt inside the window: correct secret, still locked
        let err = gate.login("maria", "secret123").await.unwrap_err();
        assert!(matches!(err, AuthError::LockedOut { .. }));
    }

    #[tokio::test]
    async fn test_success_resets_the_counter() {
        let (_db, _store, gate) = gate_with_user("maria", "secret123").await;

        gate.login("maria", "wrong").await.unwrap_err();
        gate.login("maria", "wrong").await.unwrap_err();
        gate.login("maria", "secret123").await.unwrap();

        // Two more failures count from zero, no lockout yet
        gate.login("maria", "wrong").await.unwrap_err();
        let err = gate.login("maria", "wrong").await.unwrap_err();
        assert!(matches!(
            err,
            AuthError::InvalidCredentials { attempts: 2, max: 3 }
        ));
    }

    #[tokio::test]
    async fn test_lockout_bucket_is_shared_across_identifier_case() {
        let (_db, _store, gate) = gate_with_user("maria", "secret123").await;

        gate.login("maria", "wrong").await.unwrap_err();
        gate.login("MARIA", "wrong").await.unwrap_err();
        let err = gate.login("Maria", "wrong").await.unwrap_err();
        assert!(matches!(err, AuthError::LockedOut { .. }));
    }

    #[tokio::test]
    async fn test_unknown_identifier_is_not_found() {
        let (_db, _store, gate) = gate_with_user("maria", "secret123").await;

        let err = gate.login("nobody", "whatever").await.unwrap_err();
        assert!(matches!(err, AuthError::NotFound));
        assert_eq!(err.to_string(), "User not found");
    }

    #[tokio::test]
    async fn test_remote_fallback_covers_an_unsynced_snapshot() {
        // No subscription: the snapshot stays empty, so resolution must go
        // through the remote point-lookups
        let (_db, store) = test_store().await;
        store
            .docs()
            .put(
                Collection::Users,
                "u9",
                &serde_json::json!({
                    "id": "u9",
                    "username": "Carla",
                    "usernameLower": "carla",
                    "role": "SUPER_ADMIN",
                    "name": "Carla"
                }),
            )
            .await
            .unwrap();

        let gate = AuthGate::new(&store, temp_session("fallback"));
        // No stored hash: any secret passes (legacy import)
        let user = gate.login("CARLA", "anything").await.unwrap();
        assert_eq!(user.id, "u9");
    }

    #[tokio::test]
    async fn test_logout_clears_session() {
        let (_db, _store, gate) = gate_with_user("maria", "secret123").await;

        gate.login("maria", "secret123").await.unwrap();
        assert!(gate.current_user().is_some());

        gate.logout();
        assert!(gate.current_user().is_none());
    }

    #[test]
    fn test_hash_roundtrip_and_tamper() {
        let hash = hash_password("secret123").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("secret123", &hash));
        assert!(!verify_password("secret124", &hash));
        assert!(!verify_password("secret123", "not-a-hash"));

        // Salted: the same password never hashes the same twice
        let second = hash_password("secret123").unwrap();
        assert_ne!(hash, second);
    }
}
