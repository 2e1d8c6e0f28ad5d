//! # caja-db: Document Store Layer for Caja POS
//!
//! This crate is the remote authoritative copy of every collection: a
//! document store over SQLite with live change notification. The synced
//! store in `caja-store` mirrors it through subscriptions.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Caja POS Data Flow                               │
//! │                                                                         │
//! │  Store operation (record_sale, add_user, ...)                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                      caja-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │ DocumentStore │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │ (document.rs) │    │  (embedded)  │  │   │
//! │  │   │               │    │               │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ put / patch   │    │ 001_docu-    │  │   │
//! │  │   │ Change events │    │ find / txn    │    │ ments.sql    │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  documents table: (collection, id) → camelCase JSON body               │
//! │  collections: users, locales, products, sales, tasks                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`document`] - Document CRUD, queries, transactions, change events
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Document store error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use caja_db::{Collection, Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/caja.db")).await?;
//! let docs = db.documents();
//!
//! // Point write, then every subscriber re-reads the collection
//! docs.put(Collection::Products, &product.id, &body).await?;
//!
//! // Multi-document atomic unit of work
//! let mut txn = docs.begin().await?;
//! txn.put(Collection::Sales, &sale.id, &sale_body).await?;
//! txn.decrement_if_at_least(Collection::Products, &product.id, "stock", 2).await?;
//! txn.commit().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod document;
pub mod error;
pub mod migrations;
pub mod pool;

// =============================================================================
// Re-exports
// =============================================================================

pub use document::{decode_doc, ChangeEvent, Collection, DocumentStore, DocumentTxn};
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
