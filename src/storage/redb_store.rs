// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded credential store backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `identities`: id → serialized [`StoredIdentity`]
//! - `email_index`: normalised email → id
//! - `username_index`: lower-cased username → id
//! - `wallet_index`: lower-case wallet address → id
//! - `meta`: `"last_id"` → highest id ever assigned
//!
//! redb serialises write transactions, so the uniqueness check and the index
//! writes of one insert or update commit together or not at all.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};

use super::{first_conflict, CredentialStore, StoreError, StoreResult};
use crate::auth::Role;
use crate::models::{username_key, Identity, NewIdentity, SystemOverview, WalletAddress};

// =============================================================================
// Table Definitions
// =============================================================================

const IDENTITIES: TableDefinition<u64, &[u8]> = TableDefinition::new("identities");
const EMAIL_INDEX: TableDefinition<&str, u64> = TableDefinition::new("email_index");
const USERNAME_INDEX: TableDefinition<&str, u64> = TableDefinition::new("username_index");
const WALLET_INDEX: TableDefinition<&str, u64> = TableDefinition::new("wallet_index");
const META: TableDefinition<&str, u64> = TableDefinition::new("meta");

const LAST_ID_KEY: &str = "last_id";

/// Database file name inside the data directory.
pub const DB_FILE_NAME: &str = "identities.redb";

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
enum RedbStoreError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("redb database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl From<RedbStoreError> for StoreError {
    fn from(e: RedbStoreError) -> Self {
        match e {
            RedbStoreError::Store(inner) => inner,
            other => StoreError::Backend(other.to_string()),
        }
    }
}

type DbResult<T> = Result<T, RedbStoreError>;

// =============================================================================
// Record Format
// =============================================================================

/// On-disk identity record.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredIdentity {
    id: u64,
    username: String,
    email: String,
    password_hash: String,
    #[serde(default)]
    wallet_address: Option<WalletAddress>,
    role: Role,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<&Identity> for StoredIdentity {
    fn from(identity: &Identity) -> Self {
        Self {
            id: identity.id,
            username: identity.username.clone(),
            email: identity.email.clone(),
            password_hash: identity.password_hash.clone(),
            wallet_address: identity.wallet_address.clone(),
            role: identity.role,
            created_at: identity.created_at,
            updated_at: identity.updated_at,
        }
    }
}

impl From<StoredIdentity> for Identity {
    fn from(stored: StoredIdentity) -> Self {
        Self {
            id: stored.id,
            username: stored.username,
            email: stored.email,
            password_hash: stored.password_hash,
            wallet_address: stored.wallet_address,
            role: stored.role,
            created_at: stored.created_at,
            updated_at: stored.updated_at,
        }
    }
}

fn decode(bytes: &[u8]) -> DbResult<Identity> {
    let stored: StoredIdentity = serde_json::from_slice(bytes)?;
    Ok(stored.into())
}

// =============================================================================
// Blocking Operations
// =============================================================================

/// Which index a lookup goes through.
#[derive(Debug, Clone, Copy)]
enum Index {
    Email,
    Username,
    Wallet,
}

impl Index {
    fn table(self) -> TableDefinition<'static, &'static str, u64> {
        match self {
            Index::Email => EMAIL_INDEX,
            Index::Username => USERNAME_INDEX,
            Index::Wallet => WALLET_INDEX,
        }
    }
}

fn get_by_id(db: &Database, id: u64) -> DbResult<Option<Identity>> {
    let read_txn = db.begin_read()?;
    let table = read_txn.open_table(IDENTITIES)?;
    match table.get(id)? {
        Some(value) => Ok(Some(decode(value.value())?)),
        None => Ok(None),
    }
}

fn get_by_index(db: &Database, index: Index, key: &str) -> DbResult<Option<Identity>> {
    let read_txn = db.begin_read()?;
    let index_table = read_txn.open_table(index.table())?;
    let Some(id) = index_table.get(key)?.map(|v| v.value()) else {
        return Ok(None);
    };

    let identities = read_txn.open_table(IDENTITIES)?;
    match identities.get(id)? {
        Some(value) => Ok(Some(decode(value.value())?)),
        None => Ok(None),
    }
}

fn insert_identity(db: &Database, new: NewIdentity) -> DbResult<Identity> {
    let write_txn = db.begin_write()?;
    let identity = {
        let mut identities = write_txn.open_table(IDENTITIES)?;
        let mut emails = write_txn.open_table(EMAIL_INDEX)?;
        let mut usernames = write_txn.open_table(USERNAME_INDEX)?;
        let mut wallets = write_txn.open_table(WALLET_INDEX)?;
        let mut meta = write_txn.open_table(META)?;

        let name_key = username_key(&new.username);
        let email_taken = emails.get(new.email.as_str())?.is_some();
        let wallet_taken = match &new.wallet_address {
            Some(wallet) => wallets.get(wallet.as_str())?.is_some(),
            None => false,
        };
        let username_taken = usernames.get(name_key.as_str())?.is_some();

        if let Some(field) = first_conflict(email_taken, wallet_taken, username_taken) {
            return Err(StoreError::Conflict(field).into());
        }

        let id = meta.get(LAST_ID_KEY)?.map(|v| v.value()).unwrap_or(0) + 1;
        meta.insert(LAST_ID_KEY, id)?;

        let now = Utc::now();
        let identity = Identity {
            id,
            username: new.username,
            email: new.email,
            password_hash: new.password_hash,
            wallet_address: new.wallet_address,
            role: new.role,
            created_at: now,
            updated_at: now,
        };

        let json = serde_json::to_vec(&StoredIdentity::from(&identity))?;
        identities.insert(id, json.as_slice())?;
        emails.insert(identity.email.as_str(), id)?;
        usernames.insert(name_key.as_str(), id)?;
        if let Some(wallet) = &identity.wallet_address {
            wallets.insert(wallet.as_str(), id)?;
        }
        identity
    };
    write_txn.commit()?;
    Ok(identity)
}

fn update_identity(db: &Database, mut identity: Identity) -> DbResult<Identity> {
    let id = identity.id;
    let write_txn = db.begin_write()?;
    {
        let mut identities = write_txn.open_table(IDENTITIES)?;
        let mut emails = write_txn.open_table(EMAIL_INDEX)?;
        let mut usernames = write_txn.open_table(USERNAME_INDEX)?;
        let mut wallets = write_txn.open_table(WALLET_INDEX)?;

        let existing = match identities.get(id)? {
            Some(value) => decode(value.value())?,
            None => return Err(StoreError::NotFound(id).into()),
        };

        let taken = |owner: Option<u64>| owner.is_some_and(|owner| owner != id);
        let name_key = username_key(&identity.username);
        let email_taken = taken(emails.get(identity.email.as_str())?.map(|v| v.value()));
        let wallet_taken = match &identity.wallet_address {
            Some(wallet) => taken(wallets.get(wallet.as_str())?.map(|v| v.value())),
            None => false,
        };
        let username_taken = taken(usernames.get(name_key.as_str())?.map(|v| v.value()));

        if let Some(field) = first_conflict(email_taken, wallet_taken, username_taken) {
            return Err(StoreError::Conflict(field).into());
        }

        emails.remove(existing.email.as_str())?;
        usernames.remove(username_key(&existing.username).as_str())?;
        if let Some(wallet) = &existing.wallet_address {
            wallets.remove(wallet.as_str())?;
        }

        identity.created_at = existing.created_at;
        identity.updated_at = Utc::now();

        let json = serde_json::to_vec(&StoredIdentity::from(&identity))?;
        identities.insert(id, json.as_slice())?;
        emails.insert(identity.email.as_str(), id)?;
        usernames.insert(name_key.as_str(), id)?;
        if let Some(wallet) = &identity.wallet_address {
            wallets.insert(wallet.as_str(), id)?;
        }
    }
    write_txn.commit()?;
    Ok(identity)
}

fn delete_identity(db: &Database, id: u64) -> DbResult<()> {
    let write_txn = db.begin_write()?;
    {
        let mut identities = write_txn.open_table(IDENTITIES)?;
        let existing = match identities.remove(id)? {
            Some(value) => decode(value.value())?,
            None => return Err(StoreError::NotFound(id).into()),
        };

        let mut emails = write_txn.open_table(EMAIL_INDEX)?;
        let mut usernames = write_txn.open_table(USERNAME_INDEX)?;
        let mut wallets = write_txn.open_table(WALLET_INDEX)?;

        emails.remove(existing.email.as_str())?;
        usernames.remove(username_key(&existing.username).as_str())?;
        if let Some(wallet) = &existing.wallet_address {
            wallets.remove(wallet.as_str())?;
        }
    }
    write_txn.commit()?;
    Ok(())
}

fn list_identities(db: &Database, offset: u64, limit: u64) -> DbResult<(Vec<Identity>, u64)> {
    let read_txn = db.begin_read()?;
    let table = read_txn.open_table(IDENTITIES)?;

    let mut page = Vec::new();
    let mut total = 0u64;
    for entry in table.iter()? {
        let (_, value) = entry?;
        if total >= offset && (page.len() as u64) < limit {
            page.push(decode(value.value())?);
        }
        total += 1;
    }
    Ok((page, total))
}

fn compute_overview(db: &Database) -> DbResult<SystemOverview> {
    let read_txn = db.begin_read()?;
    let table = read_txn.open_table(IDENTITIES)?;

    let mut overview = SystemOverview::default();
    for entry in table.iter()? {
        let (_, value) = entry?;
        let identity = decode(value.value())?;
        overview.total_users += 1;
        if identity.role.is_admin() {
            overview.admin_users += 1;
        }
        if identity.wallet_address.is_some() {
            overview.wallet_bound_users += 1;
        }
    }
    Ok(overview)
}

// =============================================================================
// RedbCredentialStore
// =============================================================================

/// Credential store persisted in a redb file.
///
/// All redb work runs on the blocking thread pool.
#[derive(Clone)]
pub struct RedbCredentialStore {
    db: Arc<Database>,
}

impl std::fmt::Debug for RedbCredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbCredentialStore").finish_non_exhaustive()
    }
}

impl RedbCredentialStore {
    /// Open (or create) the database at `path`.
    pub fn open(path: &Path) -> StoreResult<Self> {
        Self::open_inner(path).map_err(StoreError::from)
    }

    /// Open `identities.redb` inside `dir`, creating the directory if needed.
    pub fn open_in_dir(dir: &Path) -> StoreResult<Self> {
        std::fs::create_dir_all(dir).map_err(|e| {
            StoreError::Backend(format!("cannot create data directory {}: {e}", dir.display()))
        })?;
        Self::open(&dir.join(DB_FILE_NAME))
    }

    fn open_inner(path: &Path) -> DbResult<Self> {
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(IDENTITIES)?;
            let _ = write_txn.open_table(EMAIL_INDEX)?;
            let _ = write_txn.open_table(USERNAME_INDEX)?;
            let _ = write_txn.open_table(WALLET_INDEX)?;
            let _ = write_txn.open_table(META)?;
        }
        write_txn.commit()?;

        tracing::info!(path = %path.display(), "Opened identity database");
        Ok(Self { db: Arc::new(db) })
    }

    async fn run<T, F>(&self, op: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> DbResult<T> + Send + 'static,
    {
        let db = self.db.clone();
        match tokio::task::spawn_blocking(move || op(&db)).await {
            Ok(result) => result.map_err(StoreError::from),
            Err(e) => {
                tracing::error!(error = %e, "identity database task did not complete");
                Err(StoreError::Cancelled)
            }
        }
    }
}

#[async_trait]
impl CredentialStore for RedbCredentialStore {
    fn backend(&self) -> &'static str {
        "redb"
    }

    async fn find_by_id(&self, id: u64) -> StoreResult<Option<Identity>> {
        self.run(move |db| get_by_id(db, id)).await
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<Identity>> {
        let key = email.to_string();
        self.run(move |db| get_by_index(db, Index::Email, &key)).await
    }

    async fn find_by_username(&self, username: &str) -> StoreResult<Option<Identity>> {
        let key = username_key(username);
        self.run(move |db| get_by_index(db, Index::Username, &key)).await
    }

    async fn find_by_wallet_address(
        &self,
        wallet_address: &WalletAddress,
    ) -> StoreResult<Option<Identity>> {
        let key = wallet_address.as_str().to_string();
        self.run(move |db| get_by_index(db, Index::Wallet, &key)).await
    }

    async fn insert(&self, identity: NewIdentity) -> StoreResult<Identity> {
        self.run(move |db| insert_identity(db, identity)).await
    }

    async fn update(&self, identity: Identity) -> StoreResult<Identity> {
        self.run(move |db| update_identity(db, identity)).await
    }

    async fn delete(&self, id: u64) -> StoreResult<()> {
        self.run(move |db| delete_identity(db, id)).await
    }

    async fn list(&self, offset: u64, limit: u64) -> StoreResult<(Vec<Identity>, u64)> {
        self.run(move |db| list_identities(db, offset, limit)).await
    }

    async fn overview(&self) -> StoreResult<SystemOverview> {
        self.run(compute_overview).await
    }

    async fn ping(&self) -> StoreResult<()> {
        self.run(|db| {
            let read_txn = db.begin_read()?;
            let _ = read_txn.open_table(META)?;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::conformance;

    fn temp_store() -> (RedbCredentialStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = RedbCredentialStore::open_in_dir(dir.path()).unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn insert_assigns_ids_and_finds() {
        let (store, _dir) = temp_store();
        conformance::insert_assigns_ids_and_finds(&store).await;
    }

    #[tokio::test]
    async fn insert_reports_conflicts_in_priority_order() {
        let (store, _dir) = temp_store();
        conformance::insert_reports_conflicts_in_priority_order(&store).await;
    }

    #[tokio::test]
    async fn update_rebinds_indexes() {
        let (store, _dir) = temp_store();
        conformance::update_rebinds_indexes(&store).await;
    }

    #[tokio::test]
    async fn delete_releases_keys() {
        let (store, _dir) = temp_store();
        conformance::delete_releases_keys(&store).await;
    }

    #[tokio::test]
    async fn list_and_overview() {
        let (store, _dir) = temp_store();
        conformance::list_and_overview(&store).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_wallet_claims_admit_one() {
        let (store, _dir) = temp_store();
        conformance::concurrent_wallet_claims_admit_one(Arc::new(store)).await;
    }

    #[tokio::test]
    async fn data_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let id = {
            let store = RedbCredentialStore::open_in_dir(dir.path()).unwrap();
            store.insert(conformance::new_identity(1)).await.unwrap().id
        };

        let reopened = RedbCredentialStore::open_in_dir(dir.path()).unwrap();
        let found = reopened.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(found.email, "user1@example.com");
        assert!(found.password_hash.starts_with("$argon2id$"));

        let next = reopened.insert(conformance::new_identity(2)).await.unwrap();
        assert_eq!(next.id, id + 1);
    }

    #[tokio::test]
    async fn ids_are_not_reused_after_delete() {
        let (store, _dir) = temp_store();
        let a = store.insert(conformance::new_identity(1)).await.unwrap();
        store.delete(a.id).await.unwrap();
        let b = store.insert(conformance::new_identity(2)).await.unwrap();
        assert!(b.id > a.id);
    }
}
