//! # caja-store: Synced Collection Store for Caja POS
//!
//! Mirrors the five remote collections into local snapshots through live
//! subscriptions, and layers the business workflows - sale recording, the
//! cancellation state machine, authentication - on top.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     caja-store (THIS CRATE)                             │
//! │                                                                         │
//! │  ┌─────────────┐  ┌──────────────┐  ┌────────────┐  ┌──────────────┐  │
//! │  │ SyncedStore │  │ SnapshotCache│  │  AuthGate  │  │ SessionStore │  │
//! │  │  (store.rs) │  │ (snapshot.rs)│  │  (auth.rs) │  │ (session.rs) │  │
//! │  │             │  │              │  │            │  │              │  │
//! │  │ CRUD ops    │─►│ users        │◄─│ login      │  │ survives     │  │
//! │  │ record_sale │  │ locales      │  │ lockout    │─►│ restarts     │  │
//! │  │ cancel flow │  │ products     │  │ argon2     │  │              │  │
//! │  │ (workflow)  │  │ sales, tasks │  │            │  │              │  │
//! │  └──────┬──────┘  └──────▲───────┘  └────────────┘  └──────────────┘  │
//! │         │                │ single writer: listener task                │
//! │         ▼                │                                             │
//! │  ┌──────────────────────┴──────────────────────────────────────────┐  │
//! │  │                caja-db (document store + change events)         │  │
//! │  └─────────────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`store`] - the synced store: subscriptions, entity CRUD, sale recording
//! - [`workflow`] - the sale cancellation state machine
//! - [`snapshot`] - the collection snapshot cache
//! - [`auth`] - login, lockout, password hashing
//! - [`session`] - current-user persistence across restarts
//! - [`retry`] - timeout + bounded backoff for remote operations
//! - [`config`] - TOML + env configuration
//! - [`error`] - store error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use caja_db::{Database, DbConfig};
//! use caja_store::{AuthGate, RetryPolicy, SessionStore, StoreConfig, SyncedStore};
//!
//! let config = StoreConfig::load();
//! let db = Database::new(DbConfig::new(&config.database_path)).await?;
//!
//! let store = SyncedStore::new(&db, RetryPolicy::from(&config.retry));
//! let subscription = store.subscribe().await?;
//!
//! let auth = AuthGate::new(&store, SessionStore::new(&config.session_path));
//! let user = auth.login("maria", "secret123").await?;
//!
//! // ... sell things ...
//!
//! subscription.unsubscribe();
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod auth;
pub mod config;
pub mod error;
pub mod retry;
pub mod session;
pub mod snapshot;
pub mod store;
pub mod workflow;

// =============================================================================
// Re-exports
// =============================================================================

pub use auth::{hash_password, verify_password, AuthError, AuthGate};
pub use config::{RetryConfig, StoreConfig};
pub use error::{StoreError, StoreResult};
pub use retry::RetryPolicy;
pub use session::{SessionStore, SESSION_STORAGE_KEY};
pub use snapshot::SnapshotCache;
pub use store::{
    LocalPatch, NewSale, NewTask, NewUser, ProductPatch, ReceiptContext, RecordedSale,
    SubscriptionHandle, SyncedStore, TaskPatch, UserPatch,
};

// =============================================================================
// Test Utilities
// =============================================================================
