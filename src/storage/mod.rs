// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Credential Store
//!
//! Durable identity state behind the [`CredentialStore`] trait.
//!
//! ## Backends
//!
//! - [`InMemoryCredentialStore`]: process-local maps, used when no data
//!   directory is configured and in tests
//! - [`RedbCredentialStore`]: embedded redb database (pure Rust, ACID)
//!
//! ## Uniqueness
//!
//! Email, username (case-insensitive) and wallet address are unique. Each
//! backend checks and claims all three keys atomically inside `insert` and
//! `update`; this is the authoritative linearisation point for concurrent
//! registrations. Conflicts are reported as [`StoreError::Conflict`] naming
//! the first colliding field in the order email, wallet address, username.

pub mod memory;
pub mod redb_store;

use async_trait::async_trait;

use crate::models::{Identity, NewIdentity, SystemOverview, WalletAddress};

pub use memory::InMemoryCredentialStore;
pub use redb_store::RedbCredentialStore;

/// An identity field with a uniqueness constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniqueField {
    Email,
    WalletAddress,
    Username,
}

impl UniqueField {
    /// Wire name, used as the error detail.
    pub fn as_str(&self) -> &'static str {
        match self {
            UniqueField::Email => "email",
            UniqueField::WalletAddress => "wallet_address",
            UniqueField::Username => "username",
        }
    }

    /// Human label, used in error messages.
    pub fn label(&self) -> &'static str {
        match self {
            UniqueField::Email => "Email",
            UniqueField::WalletAddress => "Wallet address",
            UniqueField::Username => "Username",
        }
    }
}

/// Pick the reported conflict in priority order.
pub(crate) fn first_conflict(email: bool, wallet_address: bool, username: bool) -> Option<UniqueField> {
    if email {
        Some(UniqueField::Email)
    } else if wallet_address {
        Some(UniqueField::WalletAddress)
    } else if username {
        Some(UniqueField::Username)
    } else {
        None
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("identity {0} not found")]
    NotFound(u64),

    #[error("{} already bound to another identity", .0.as_str())]
    Conflict(UniqueField),

    /// The storage task was cancelled or panicked. Not retriable.
    #[error("storage operation cancelled")]
    Cancelled,

    #[error("storage backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence contract for identities.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Short backend name for logs and health output.
    fn backend(&self) -> &'static str;

    async fn find_by_id(&self, id: u64) -> StoreResult<Option<Identity>>;

    /// `email` must already be normalised.
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<Identity>>;

    async fn find_by_username(&self, username: &str) -> StoreResult<Option<Identity>>;

    async fn find_by_wallet_address(
        &self,
        wallet_address: &WalletAddress,
    ) -> StoreResult<Option<Identity>>;

    /// Create an identity, assigning its id and timestamps.
    async fn insert(&self, identity: NewIdentity) -> StoreResult<Identity>;

    /// Replace the mutable fields of an existing identity.
    ///
    /// `id` and `created_at` are taken from the stored record; `updated_at`
    /// is set to now.
    async fn update(&self, identity: Identity) -> StoreResult<Identity>;

    async fn delete(&self, id: u64) -> StoreResult<()>;

    /// Identities ordered by id, plus the total count.
    async fn list(&self, offset: u64, limit: u64) -> StoreResult<(Vec<Identity>, u64)>;

    async fn overview(&self) -> StoreResult<SystemOverview>;

    /// Cheap readiness probe.
    async fn ping(&self) -> StoreResult<()>;
}

#[cfg(test)]
pub(crate) mod conformance {
    //! Behaviour every backend must share.

    use super::*;
    use crate::auth::Role;
    use std::sync::Arc;

    pub fn new_identity(n: u32) -> NewIdentity {
        NewIdentity {
            username: format!("user{n}"),
            email: format!("user{n}@example.com"),
            password_hash: "$argon2id$v=19$m=256,t=1,p=1$c2FsdA$aGFzaA".into(),
            wallet_address: None,
            role: Role::Regular,
        }
    }

    pub fn wallet(n: u8) -> WalletAddress {
        WalletAddress::parse(&format!("0x{}", format!("{n:02x}").repeat(20))).unwrap()
    }

    pub async fn insert_assigns_ids_and_finds(store: &dyn CredentialStore) {
        let mut new = new_identity(1);
        new.wallet_address = Some(wallet(1));
        let a = store.insert(new).await.unwrap();
        let b = store.insert(new_identity(2)).await.unwrap();
        assert!(a.id > 0);
        assert!(b.id > a.id);
        assert_eq!(a.created_at, a.updated_at);

        assert_eq!(store.find_by_id(a.id).await.unwrap().unwrap(), a);
        assert_eq!(
            store.find_by_email("user1@example.com").await.unwrap().unwrap().id,
            a.id
        );
        assert_eq!(
            store.find_by_username("USER2").await.unwrap().unwrap().id,
            b.id
        );
        assert_eq!(
            store.find_by_wallet_address(&wallet(1)).await.unwrap().unwrap().id,
            a.id
        );
        assert!(store.find_by_id(999).await.unwrap().is_none());
        assert!(store.find_by_wallet_address(&wallet(9)).await.unwrap().is_none());
    }

    pub async fn insert_reports_conflicts_in_priority_order(store: &dyn CredentialStore) {
        let mut first = new_identity(1);
        first.wallet_address = Some(wallet(1));
        store.insert(first).await.unwrap();

        // All three collide: email wins
        let mut all = new_identity(1);
        all.wallet_address = Some(wallet(1));
        assert!(matches!(
            store.insert(all).await,
            Err(StoreError::Conflict(UniqueField::Email))
        ));

        // Wallet and username collide: wallet wins
        let mut wallet_and_name = new_identity(1);
        wallet_and_name.email = "other@example.com".into();
        wallet_and_name.wallet_address = Some(wallet(1));
        assert!(matches!(
            store.insert(wallet_and_name).await,
            Err(StoreError::Conflict(UniqueField::WalletAddress))
        ));

        // Username differs only by case
        let mut name = new_identity(2);
        name.username = "USER1".into();
        assert!(matches!(
            store.insert(name).await,
            Err(StoreError::Conflict(UniqueField::Username))
        ));

        let (_, total) = store.list(0, 10).await.unwrap();
        assert_eq!(total, 1);
    }

    pub async fn update_rebinds_indexes(store: &dyn CredentialStore) {
        let mut new = new_identity(1);
        new.wallet_address = Some(wallet(1));
        let mut a = store.insert(new).await.unwrap();
        let b = store.insert(new_identity(2)).await.unwrap();

        a.email = "renamed@example.com".into();
        a.wallet_address = Some(wallet(2));
        a.role = Role::Admin;
        let updated = store.update(a.clone()).await.unwrap();
        assert_eq!(updated.created_at, a.created_at);
        assert!(updated.updated_at >= a.updated_at);
        assert_eq!(updated.role, Role::Admin);

        assert!(store.find_by_email("user1@example.com").await.unwrap().is_none());
        assert!(store.find_by_wallet_address(&wallet(1)).await.unwrap().is_none());
        assert_eq!(
            store.find_by_wallet_address(&wallet(2)).await.unwrap().unwrap().id,
            a.id
        );

        // Keeping its own keys is not a conflict
        assert!(store.update(updated.clone()).await.is_ok());

        // Taking another identity's email is
        let mut stolen = b.clone();
        stolen.email = "renamed@example.com".into();
        assert!(matches!(
            store.update(stolen).await,
            Err(StoreError::Conflict(UniqueField::Email))
        ));

        let mut ghost = b;
        ghost.id = 404;
        assert!(matches!(store.update(ghost).await, Err(StoreError::NotFound(404))));
    }

    pub async fn delete_releases_keys(store: &dyn CredentialStore) {
        let mut new = new_identity(1);
        new.wallet_address = Some(wallet(1));
        let a = store.insert(new.clone()).await.unwrap();

        store.delete(a.id).await.unwrap();
        assert!(store.find_by_id(a.id).await.unwrap().is_none());
        assert!(matches!(store.delete(a.id).await, Err(StoreError::NotFound(_))));

        let again = store.insert(new).await.unwrap();
        assert_ne!(again.id, a.id);
    }

    pub async fn list_and_overview(store: &dyn CredentialStore) {
        for n in 1..=5u32 {
            let mut new = new_identity(n);
            if n % 2 == 0 {
                new.wallet_address = Some(wallet(n as u8));
            }
            if n == 5 {
                new.role = Role::Admin;
            }
            store.insert(new).await.unwrap();
        }

        let (page, total) = store.list(2, 2).await.unwrap();
        assert_eq!(total, 5);
        let names: Vec<_> = page.iter().map(|i| i.username.as_str()).collect();
        assert_eq!(names, ["user3", "user4"]);

        let (past_end, total) = store.list(10, 2).await.unwrap();
        assert!(past_end.is_empty());
        assert_eq!(total, 5);

        let overview = store.overview().await.unwrap();
        assert_eq!(
            overview,
            SystemOverview {
                total_users: 5,
                admin_users: 1,
                wallet_bound_users: 2,
            }
        );
    }

    pub async fn concurrent_wallet_claims_admit_one(store: Arc<dyn CredentialStore>) {
        let mut tasks = Vec::new();
        for n in 0..8u32 {
            let store = store.clone();
            tasks.push(tokio::spawn(async move {
                let mut new = new_identity(100 + n);
                new.wallet_address = Some(wallet(7));
                store.insert(new).await
            }));
        }

        let mut ok = 0;
        let mut conflicts = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(_) => ok += 1,
                Err(StoreError::Conflict(UniqueField::WalletAddress)) => conflicts += 1,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!(ok, 1);
        assert_eq!(conflicts, 7);
    }
}
