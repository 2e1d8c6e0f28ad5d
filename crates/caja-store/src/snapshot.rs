//! # Snapshot Cache
//!
//! Local mirror of the five synced collections.
//!
//! ## Single-Writer Discipline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        SnapshotCache                                    │
//! │                                                                         │
//! │   subscription listener (ONLY writer)                                   │
//! │        │ replace_users / replace_products / ...                        │
//! │        ▼                                                                │
//! │   ┌──────────────────────────────────────────────┐                     │
//! │   │ users     RwLock<Arc<Vec<User>>>             │                     │
//! │   │ locales   RwLock<Arc<Vec<Local>>>            │                     │
//! │   │ products  RwLock<Arc<Vec<Product>>>          │                     │
//! │   │ sales     RwLock<Arc<Vec<Sale>>>             │                     │
//! │   │ tasks     RwLock<Arc<Vec<Task>>>             │                     │
//! │   └──────────────────────────────────────────────┘                     │
//! │        │ users() / products() / ... hand out Arc clones                │
//! │        ▼                                                                │
//! │   readers (auth gate, dashboards, carts) - never mutate                │
//! │                                                                         │
//! │  Whole-array replacement, never in-place edits: a reader holding an    │
//! │  Arc keeps a consistent snapshot while the next one swaps in.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Write operations NEVER touch this cache directly - they write to the
//! document store and the change notification brings the data back.

use std::sync::{Arc, RwLock};

use caja_core::{Local, Product, Sale, Task, User};

/// In-memory snapshots of all five collections.
///
/// The cache is passed around as an explicit `Arc<SnapshotCache>` handle -
/// there are no globals.
#[derive(Debug, Default)]
pub struct SnapshotCache {
    users: RwLock<Arc<Vec<User>>>,
    locales: RwLock<Arc<Vec<Local>>>,
    products: RwLock<Arc<Vec<Product>>>,
    sales: RwLock<Arc<Vec<Sale>>>,
    tasks: RwLock<Arc<Vec<Task>>>,
}

macro_rules! snapshot_accessors {
    ($field:ident, $replace:ident, $ty:ty) => {
        /// Current snapshot. Cheap: clones an Arc, not the data.
        pub fn $field(&self) -> Arc<Vec<$ty>> {
            self.$field
                .read()
                .expect("snapshot lock poisoned")
                .clone()
        }

        /// Replaces the whole snapshot. Subscription listener only.
        pub(crate) fn $replace(&self, next: Vec<$ty>) {
            *self.$field.write().expect("snapshot lock poisoned") = Arc::new(next);
        }
    };
}

impl SnapshotCache {
    snapshot_accessors!(users, replace_users, User);
    snapshot_accessors!(locales, replace_locales, Local);
    snapshot_accessors!(products, replace_products, Product);
    snapshot_accessors!(sales, replace_sales, Sale);
    snapshot_accessors!(tasks, replace_tasks, Task);

    /// Looks up a product by id in the current snapshot.
    pub fn product(&self, id: &str) -> Option<Product> {
        self.products().iter().find(|p| p.id == id).cloned()
    }

    /// Looks up a sale by id in the current snapshot.
    pub fn sale(&self, id: &str) -> Option<Sale> {
        self.sales().iter().find(|s| s.id == id).cloned()
    }

    /// Looks up a locale by id in the current snapshot.
    pub fn locale(&self, id: &str) -> Option<Local> {
        self.locales().iter().find(|l| l.id == id).cloned()
    }

    /// Case-insensitive username/email lookup in the current snapshot.
    pub fn user_by_identifier(&self, identifier: &str) -> Option<User> {
        self.users()
            .iter()
            .find(|u| u.matches_identifier(identifier))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caja_core::Role;

    fn user(username: &str) -> User {
        User {
            id: format!("id-{username}"),
            username: username.to_string(),
            email: None,
            password_hash: None,
            role: Role::SuperAdmin,
            name: username.to_string(),
            local_id: None,
        }
    }

    #[test]
    fn test_replacement_does_not_disturb_held_snapshots() {
        let cache = SnapshotCache::default();
        cache.replace_users(vec![user("maria")]);

        let held = cache.users();
        cache.replace_users(vec![user("maria"), user("ana")]);

        // The held Arc still sees the old consistent snapshot
        assert_eq!(held.len(), 1);
        assert_eq!(cache.users().len(), 2);
    }

    #[test]
    fn test_identifier_lookup_is_case_insensitive() {
        let cache = SnapshotCache::default();
        cache.replace_users(vec![user("Maria")]);

        assert!(cache.user_by_identifier("maria").is_some());
        assert!(cache.user_by_identifier("MARIA").is_some());
        assert!(cache.user_by_identifier("pedro").is_none());
    }
}
