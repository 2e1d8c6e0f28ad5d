//! # Document Store
//!
//! CRUD, queries, and transactions over the `documents` table, plus the
//! change-notification fan-out that drives live subscriptions.
//!
//! ## How a Write Becomes a Snapshot
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Write → Notify → Re-read                            │
//! │                                                                         │
//! │  put/patch/delete/commit                                                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  documents table mutated (atomically, WAL)                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ChangeEvent { collection } broadcast to every subscriber               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Subscribers re-read the FULL collection and replace their snapshot     │
//! │                                                                         │
//! │  Full-snapshot delivery keeps subscribers trivially correct: there is  │
//! │  no per-document diffing to get wrong, at the cost of re-reading a     │
//! │  collection per event.                                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Conditional Writes
//! `decrement_if_at_least` is the server-side answer to the classic POS race:
//! two terminals both read stock=1 and both try to sell it. The decrement
//! carries its own precondition, so exactly one transaction commits.

use std::collections::BTreeSet;

use serde::de::DeserializeOwned;
use serde_json::Value;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use tokio::sync::broadcast;
use tracing::debug;

use crate::error::{DbError, DbResult};

// =============================================================================
// Collections
// =============================================================================

/// The five synced collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Collection {
    Users,
    Locales,
    Products,
    Sales,
    Tasks,
}

impl Collection {
    /// All collections, in subscription order.
    pub const ALL: [Collection; 5] = [
        Collection::Users,
        Collection::Locales,
        Collection::Products,
        Collection::Sales,
        Collection::Tasks,
    ];

    /// The collection's name as stored in the `collection` column.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Locales => "locales",
            Collection::Products => "products",
            Collection::Sales => "sales",
            Collection::Tasks => "tasks",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Change Events
// =============================================================================

/// Emitted after every committed mutation of a collection.
///
/// Carries no payload: subscribers re-read the full collection, which is
/// the full-snapshot delivery model this store guarantees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeEvent {
    pub collection: Collection,
}

/// Capacity of the change broadcast channel. A lagging subscriber misses
/// intermediate events but recovers on the next one it sees, since every
/// event triggers a full re-read.
const CHANGE_CHANNEL_CAPACITY: usize = 256;

// =============================================================================
// Field Paths
// =============================================================================

/// Maps a field name to a json_extract path, rejecting anything that is not
/// a plain identifier. Caller-supplied field names never reach SQL text.
fn json_path(field: &str) -> DbResult<String> {
    if field.is_empty()
        || !field
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(DbError::InvalidField(field.to_string()));
    }
    Ok(format!("$.{field}"))
}

fn row_body(row: &SqliteRow) -> DbResult<Value> {
    let body: String = row.try_get("body").map_err(DbError::from)?;
    serde_json::from_str(&body).map_err(|e| DbError::Internal(format!("corrupt body: {e}")))
}

/// Decodes a raw document body into a typed entity.
pub fn decode_doc<T: DeserializeOwned>(collection: Collection, id: &str, body: Value) -> DbResult<T> {
    serde_json::from_value(body).map_err(|source| DbError::Decode {
        collection: collection.to_string(),
        id: id.to_string(),
        source,
    })
}

// =============================================================================
// Shared Statement Executors
// =============================================================================
// Each statement is written once and run against either the pool or an open
// transaction via SqliteExecutor.

async fn exec_put<'e, E>(exec: E, collection: Collection, id: &str, body: &Value) -> DbResult<()>
where
    E: sqlx::SqliteExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO documents (collection, id, body)
        VALUES (?1, ?2, ?3)
        ON CONFLICT (collection, id) DO UPDATE SET body = excluded.body
        "#,
    )
    .bind(collection.as_str())
    .bind(id)
    .bind(body.to_string())
    .execute(exec)
    .await?;
    Ok(())
}

async fn exec_patch<'e, E>(exec: E, collection: Collection, id: &str, merge: &Value) -> DbResult<()>
where
    E: sqlx::SqliteExecutor<'e>,
{
    let result = sqlx::query(
        r#"
        UPDATE documents
        SET body = json_patch(body, ?3)
        WHERE collection = ?1 AND id = ?2
        "#,
    )
    .bind(collection.as_str())
    .bind(id)
    .bind(merge.to_string())
    .execute(exec)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found(collection.as_str(), id));
    }
    Ok(())
}

async fn exec_delete<'e, E>(exec: E, collection: Collection, id: &str) -> DbResult<()>
where
    E: sqlx::SqliteExecutor<'e>,
{
    let result = sqlx::query("DELETE FROM documents WHERE collection = ?1 AND id = ?2")
        .bind(collection.as_str())
        .bind(id)
        .execute(exec)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found(collection.as_str(), id));
    }
    Ok(())
}

async fn exec_get<'e, E>(exec: E, collection: Collection, id: &str) -> DbResult<Option<Value>>
where
    E: sqlx::SqliteExecutor<'e>,
{
    let row = sqlx::query("SELECT body FROM documents WHERE collection = ?1 AND id = ?2")
        .bind(collection.as_str())
        .bind(id)
        .fetch_optional(exec)
        .await?;

    row.map(|r| row_body(&r)).transpose()
}

async fn exec_increment<'e, E>(
    exec: E,
    collection: Collection,
    id: &str,
    field: &str,
    delta: i64,
) -> DbResult<i64>
where
    E: sqlx::SqliteExecutor<'e>,
{
    let path = json_path(field)?;
    let new_value: Option<i64> = sqlx::query_scalar(
        r#"
        UPDATE documents
        SET body = json_set(body, ?3, COALESCE(json_extract(body, ?3), 0) + ?4)
        WHERE collection = ?1 AND id = ?2
        RETURNING CAST(json_extract(body, ?3) AS INTEGER)
        "#,
    )
    .bind(collection.as_str())
    .bind(id)
    .bind(&path)
    .bind(delta)
    .fetch_optional(exec)
    .await?;

    new_value.ok_or_else(|| DbError::not_found(collection.as_str(), id))
}

// =============================================================================
// Document Store
// =============================================================================

/// Handle for document operations outside a transaction.
///
/// Every mutating call notifies subscribers once it has landed. Reads never
/// notify.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    pool: SqlitePool,
    events: broadcast::Sender<ChangeEvent>,
}

impl DocumentStore {
    pub(crate) fn new(pool: SqlitePool, events: broadcast::Sender<ChangeEvent>) -> Self {
        DocumentStore { pool, events }
    }

    pub(crate) fn channel() -> broadcast::Sender<ChangeEvent> {
        broadcast::channel(CHANGE_CHANNEL_CAPACITY).0
    }

    /// Subscribes to change events for all collections.
    pub fn changes(&self) -> broadcast::Receiver<ChangeEvent> {
        self.events.subscribe()
    }

    fn notify(&self, collection: Collection) {
        // No receivers is fine - nobody has subscribed yet
        let _ = self.events.send(ChangeEvent { collection });
    }

    /// Writes a full document (insert or replace) keyed by its id.
    pub async fn put(&self, collection: Collection, id: &str, body: &Value) -> DbResult<()> {
        debug!(collection = %collection, id = %id, "put document");
        exec_put(&self.pool, collection, id, body).await?;
        self.notify(collection);
        Ok(())
    }

    /// Merges the given fields into an existing document (RFC 7396 style:
    /// only the supplied keys change, `null` removes a key).
    pub async fn patch(&self, collection: Collection, id: &str, merge: &Value) -> DbResult<()> {
        debug!(collection = %collection, id = %id, "patch document");
        exec_patch(&self.pool, collection, id, merge).await?;
        self.notify(collection);
        Ok(())
    }

    /// Removes a document by id.
    pub async fn delete(&self, collection: Collection, id: &str) -> DbResult<()> {
        debug!(collection = %collection, id = %id, "delete document");
        exec_delete(&self.pool, collection, id).await?;
        self.notify(collection);
        Ok(())
    }

    /// Point read by id.
    pub async fn get(&self, collection: Collection, id: &str) -> DbResult<Option<Value>> {
        exec_get(&self.pool, collection, id).await
    }

    /// Full snapshot of a collection, ordered by id for determinism.
    pub async fn fetch_collection(&self, collection: Collection) -> DbResult<Vec<Value>> {
        let rows = sqlx::query("SELECT body FROM documents WHERE collection = ?1 ORDER BY id")
            .bind(collection.as_str())
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_body).collect()
    }

    /// Exact-match field query - the only filter shape this store offers.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let hits = docs.find_by_field(Collection::Users, "usernameLower", "maria").await?;
    /// ```
    pub async fn find_by_field(
        &self,
        collection: Collection,
        field: &str,
        value: &str,
    ) -> DbResult<Vec<Value>> {
        let path = json_path(field)?;
        let rows = sqlx::query(
            r#"
            SELECT body FROM documents
            WHERE collection = ?1 AND json_extract(body, ?2) = ?3
            ORDER BY id
            "#,
        )
        .bind(collection.as_str())
        .bind(&path)
        .bind(value)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_body).collect()
    }

    /// Atomically adds `delta` to a numeric field, treating a missing field
    /// as zero. Returns the new value.
    pub async fn increment(
        &self,
        collection: Collection,
        id: &str,
        field: &str,
        delta: i64,
    ) -> DbResult<i64> {
        debug!(collection = %collection, id = %id, field = %field, delta = %delta, "increment");
        let new_value = exec_increment(&self.pool, collection, id, field, delta).await?;
        self.notify(collection);
        Ok(new_value)
    }

    /// Opens a multi-document atomic unit of work.
    ///
    /// Either every write in the transaction lands or none do; change
    /// events fire only after a successful commit, one per touched
    /// collection.
    pub async fn begin(&self) -> DbResult<DocumentTxn> {
        let tx = self.pool.begin().await?;
        Ok(DocumentTxn {
            tx,
            events: self.events.clone(),
            touched: BTreeSet::new(),
        })
    }
}

// =============================================================================
// Transactions
// =============================================================================

/// A multi-document atomic transaction.
///
/// Dropping without [`commit`](DocumentTxn::commit) rolls back; no change
/// events fire for a rolled-back transaction.
pub struct DocumentTxn {
    tx: Transaction<'static, Sqlite>,
    events: broadcast::Sender<ChangeEvent>,
    touched: BTreeSet<Collection>,
}

impl DocumentTxn {
    /// Writes a full document (insert or replace) keyed by its id.
    pub async fn put(&mut self, collection: Collection, id: &str, body: &Value) -> DbResult<()> {
        exec_put(&mut *self.tx, collection, id, body).await?;
        self.touched.insert(collection);
        Ok(())
    }

    /// Merges the given fields into an existing document.
    pub async fn patch(&mut self, collection: Collection, id: &str, merge: &Value) -> DbResult<()> {
        exec_patch(&mut *self.tx, collection, id, merge).await?;
        self.touched.insert(collection);
        Ok(())
    }

    /// Removes a document by id.
    pub async fn delete(&mut self, collection: Collection, id: &str) -> DbResult<()> {
        exec_delete(&mut *self.tx, collection, id).await?;
        self.touched.insert(collection);
        Ok(())
    }

    /// Point read inside the transaction (sees its own writes).
    pub async fn get(&mut self, collection: Collection, id: &str) -> DbResult<Option<Value>> {
        exec_get(&mut *self.tx, collection, id).await
    }

    /// Atomically adds `delta` to a numeric field. Returns the new value.
    pub async fn increment(
        &mut self,
        collection: Collection,
        id: &str,
        field: &str,
        delta: i64,
    ) -> DbResult<i64> {
        let new_value = exec_increment(&mut *self.tx, collection, id, field, delta).await?;
        self.touched.insert(collection);
        Ok(new_value)
    }

    /// Subtracts `amount` from a numeric field ONLY if the stored value is
    /// at least `amount`. Returns the new value.
    ///
    /// ## Errors
    /// - [`DbError::NotFound`] when the document doesn't exist
    /// - [`DbError::PreconditionFailed`] when the field holds less than
    ///   `amount` - the caller is expected to roll back the transaction
    pub async fn decrement_if_at_least(
        &mut self,
        collection: Collection,
        id: &str,
        field: &str,
        amount: i64,
    ) -> DbResult<i64> {
        let path = json_path(field)?;

        let new_value: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE documents
            SET body = json_set(body, ?3, json_extract(body, ?3) - ?4)
            WHERE collection = ?1 AND id = ?2
              AND CAST(json_extract(body, ?3) AS INTEGER) >= ?4
            RETURNING CAST(json_extract(body, ?3) AS INTEGER)
            "#,
        )
        .bind(collection.as_str())
        .bind(id)
        .bind(&path)
        .bind(amount)
        .fetch_optional(&mut *self.tx)
        .await?;

        if let Some(new_value) = new_value {
            self.touched.insert(collection);
            return Ok(new_value);
        }

        // Disambiguate: missing document vs unmet precondition. A document
        // without the field counts as holding zero.
        let available: Option<Option<i64>> =
            sqlx::query_scalar("SELECT CAST(json_extract(body, ?3) AS INTEGER) FROM documents WHERE collection = ?1 AND id = ?2")
                .bind(collection.as_str())
                .bind(id)
                .bind(&path)
                .fetch_optional(&mut *self.tx)
                .await?;

        match available {
            None => Err(DbError::not_found(collection.as_str(), id)),
            Some(available) => Err(DbError::PreconditionFailed {
                collection: collection.to_string(),
                id: id.to_string(),
                field: field.to_string(),
                available: available.unwrap_or(0),
                requested: amount,
            }),
        }
    }

    /// Commits the transaction, then fires one change event per touched
    /// collection.
    pub async fn commit(self) -> DbResult<()> {
        self.tx.commit().await?;
        for collection in self.touched {
            let _ = self.events.send(ChangeEvent { collection });
        }
        Ok(())
    }

    /// Rolls back explicitly. Dropping the transaction does the same.
    pub async fn rollback(self) -> DbResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use serde_json::json;

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_put_get_roundtrip() {
        let db = db().await;
        let docs = db.documents();

        docs.put(Collection::Products, "p1", &json!({"id": "p1", "stock": 5}))
            .await
            .unwrap();

        let body = docs.get(Collection::Products, "p1").await.unwrap().unwrap();
        assert_eq!(body["stock"], 5);

        // Same id in a different collection is a different document
        assert!(docs.get(Collection::Sales, "p1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_patch_merges_fields() {
        let db = db().await;
        let docs = db.documents();

        docs.put(
            Collection::Products,
            "p1",
            &json!({"id": "p1", "name": "Coke", "stock": 5}),
        )
        .await
        .unwrap();

        docs.patch(Collection::Products, "p1", &json!({"stock": 3}))
            .await
            .unwrap();

        let body = docs.get(Collection::Products, "p1").await.unwrap().unwrap();
        assert_eq!(body["stock"], 3);
        assert_eq!(body["name"], "Coke");
    }

    #[tokio::test]
    async fn test_patch_missing_document_is_not_found() {
        let db = db().await;
        let err = db
            .documents()
            .patch(Collection::Products, "ghost", &json!({"stock": 3}))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_find_by_field_exact_match_only() {
        let db = db().await;
        let docs = db.documents();

        docs.put(
            Collection::Users,
            "u1",
            &json!({"id": "u1", "usernameLower": "maria"}),
        )
        .await
        .unwrap();

        let hits = docs
            .find_by_field(Collection::Users, "usernameLower", "maria")
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);

        // Exact match: a different case does not hit
        let misses = docs
            .find_by_field(Collection::Users, "usernameLower", "Maria")
            .await
            .unwrap();
        assert!(misses.is_empty());
    }

    #[tokio::test]
    async fn test_field_names_are_guarded() {
        let db = db().await;
        let err = db
            .documents()
            .find_by_field(Collection::Users, "a'; DROP TABLE documents;--", "x")
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::InvalidField(_)));
    }

    #[tokio::test]
    async fn test_increment_treats_missing_field_as_zero() {
        let db = db().await;
        let docs = db.documents();

        docs.put(Collection::Locales, "l1", &json!({"id": "l1", "name": "Centro"}))
            .await
            .unwrap();

        let v = docs
            .increment(Collection::Locales, "l1", "cashInRegisterCents", 2_500)
            .await
            .unwrap();
        assert_eq!(v, 2_500);

        let v = docs
            .increment(Collection::Locales, "l1", "cashInRegisterCents", -500)
            .await
            .unwrap();
        assert_eq!(v, 2_000);
    }

    #[tokio::test]
    async fn test_conditional_decrement() {
        let db = db().await;
        let docs = db.documents();

        docs.put(Collection::Products, "p1", &json!({"id": "p1", "stock": 2}))
            .await
            .unwrap();

        let mut txn = db.documents().begin().await.unwrap();
        let left = txn
            .decrement_if_at_least(Collection::Products, "p1", "stock", 2)
            .await
            .unwrap();
        assert_eq!(left, 0);
        txn.commit().await.unwrap();

        // Nothing left: the precondition rejects the next decrement
        let mut txn = db.documents().begin().await.unwrap();
        let err = txn
            .decrement_if_at_least(Collection::Products, "p1", "stock", 1)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::PreconditionFailed { available: 0, requested: 1, .. }
        ));
        txn.rollback().await.unwrap();
    }

    #[tokio::test]
    async fn test_rolled_back_transaction_leaves_no_trace() {
        let db = db().await;
        let docs = db.documents();

        docs.put(Collection::Products, "p1", &json!({"id": "p1", "stock": 5}))
            .await
            .unwrap();

        let mut rx = docs.changes();

        let mut txn = docs.begin().await.unwrap();
        txn.put(Collection::Sales, "s1", &json!({"id": "s1"})).await.unwrap();
        txn.decrement_if_at_least(Collection::Products, "p1", "stock", 3)
            .await
            .unwrap();
        txn.rollback().await.unwrap();

        // No partial writes...
        assert!(docs.get(Collection::Sales, "s1").await.unwrap().is_none());
        let body = docs.get(Collection::Products, "p1").await.unwrap().unwrap();
        assert_eq!(body["stock"], 5);
        // ...and no change events
        assert!(matches!(rx.try_recv(), Err(broadcast::error::TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn test_commit_fires_one_event_per_collection() {
        let db = db().await;
        let docs = db.documents();
        let mut rx = docs.changes();

        let mut txn = docs.begin().await.unwrap();
        txn.put(Collection::Sales, "s1", &json!({"id": "s1"})).await.unwrap();
        txn.put(Collection::Products, "p1", &json!({"id": "p1", "stock": 1}))
            .await
            .unwrap();
        txn.put(Collection::Products, "p2", &json!({"id": "p2", "stock": 1}))
            .await
            .unwrap();
        txn.commit().await.unwrap();

        let mut seen = Vec::new();
        while let Ok(event) = rx.try_recv() {
            seen.push(event.collection);
        }
        seen.sort();
        assert_eq!(seen, vec![Collection::Products, Collection::Sales]);
    }

    #[tokio::test]
    async fn test_decode_doc_into_core_type() {
        let db = db().await;
        let docs = db.documents();

        docs.put(
            Collection::Products,
            "p1",
            &json!({
                "id": "p1",
                "localId": "l1",
                "name": "Coca-Cola 330ml",
                "priceCents": 150,
                "stock": 10,
                "minStock": 3,
                "category": "Beverages",
                "sku": "COKE-330"
            }),
        )
        .await
        .unwrap();

        let body = docs.get(Collection::Products, "p1").await.unwrap().unwrap();
        let product: caja_core::Product = decode_doc(Collection::Products, "p1", body).unwrap();
        assert_eq!(product.sku, "COKE-330");
        assert_eq!(product.stock, 10);
    }
}
