// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Process-local credential store.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{first_conflict, CredentialStore, StoreError, StoreResult};
use crate::models::{username_key, Identity, NewIdentity, SystemOverview, WalletAddress};

#[derive(Debug, Default)]
struct Tables {
    last_id: u64,
    identities: BTreeMap<u64, Identity>,
    by_email: HashMap<String, u64>,
    by_username: HashMap<String, u64>,
    by_wallet: HashMap<WalletAddress, u64>,
}

impl Tables {
    /// Keys owned by `id` itself do not count as taken.
    fn check_unique(
        &self,
        id: Option<u64>,
        email: &str,
        username: &str,
        wallet: Option<&WalletAddress>,
    ) -> StoreResult<()> {
        let taken = |owner: Option<&u64>| owner.is_some_and(|owner| Some(*owner) != id);

        match first_conflict(
            taken(self.by_email.get(email)),
            wallet.is_some_and(|w| taken(self.by_wallet.get(w))),
            taken(self.by_username.get(&username_key(username))),
        ) {
            Some(field) => Err(StoreError::Conflict(field)),
            None => Ok(()),
        }
    }

    fn index(&mut self, identity: &Identity) {
        self.by_email.insert(identity.email.clone(), identity.id);
        self.by_username
            .insert(username_key(&identity.username), identity.id);
        if let Some(wallet) = &identity.wallet_address {
            self.by_wallet.insert(wallet.clone(), identity.id);
        }
    }

    fn unindex(&mut self, identity: &Identity) {
        self.by_email.remove(&identity.email);
        self.by_username.remove(&username_key(&identity.username));
        if let Some(wallet) = &identity.wallet_address {
            self.by_wallet.remove(wallet);
        }
    }

    fn lookup(&self, id: Option<&u64>) -> Option<Identity> {
        id.and_then(|id| self.identities.get(id)).cloned()
    }
}

/// Credential store held in process memory.
///
/// Uniqueness checks and index updates happen under a single write lock.
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    tables: RwLock<Tables>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn find_by_id(&self, id: u64) -> StoreResult<Option<Identity>> {
        Ok(self.tables.read().await.identities.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<Identity>> {
        let tables = self.tables.read().await;
        Ok(tables.lookup(tables.by_email.get(email)))
    }

    async fn find_by_username(&self, username: &str) -> StoreResult<Option<Identity>> {
        let tables = self.tables.read().await;
        Ok(tables.lookup(tables.by_username.get(&username_key(username))))
    }

    async fn find_by_wallet_address(
        &self,
        wallet_address: &WalletAddress,
    ) -> StoreResult<Option<Identity>> {
        let tables = self.tables.read().await;
        Ok(tables.lookup(tables.by_wallet.get(wallet_address)))
    }

    async fn insert(&self, new: NewIdentity) -> StoreResult<Identity> {
        let mut tables = self.tables.write().await;
        tables.check_unique(
            None,
            &new.email,
            &new.username,
            new.wallet_address.as_ref(),
        )?;

        tables.last_id += 1;
        let now = Utc::now();
        let identity = Identity {
            id: tables.last_id,
            username: new.username,
            email: new.email,
            password_hash: new.password_hash,
            wallet_address: new.wallet_address,
            role: new.role,
            created_at: now,
            updated_at: now,
        };

        tables.index(&identity);
        tables.identities.insert(identity.id, identity.clone());
        Ok(identity)
    }

    async fn update(&self, mut identity: Identity) -> StoreResult<Identity> {
        let mut tables = self.tables.write().await;
        let existing = tables
            .identities
            .get(&identity.id)
            .cloned()
            .ok_or(StoreError::NotFound(identity.id))?;

        tables.check_unique(
            Some(identity.id),
            &identity.email,
            &identity.username,
            identity.wallet_address.as_ref(),
        )?;

        identity.created_at = existing.created_at;
        identity.updated_at = Utc::now();

        tables.unindex(&existing);
        tables.index(&identity);
        tables.identities.insert(identity.id, identity.clone());
        Ok(identity)
    }

    async fn delete(&self, id: u64) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let existing = tables
            .identities
            .remove(&id)
            .ok_or(StoreError::NotFound(id))?;
        tables.unindex(&existing);
        Ok(())
    }

    async fn list(&self, offset: u64, limit: u64) -> StoreResult<(Vec<Identity>, u64)> {
        let tables = self.tables.read().await;
        let page = tables
            .identities
            .values()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect();
        Ok((page, tables.identities.len() as u64))
    }

    async fn overview(&self) -> StoreResult<SystemOverview> {
        let tables = self.tables.read().await;
        Ok(SystemOverview {
            total_users: tables.identities.len() as u64,
            admin_users: tables.identities.values().filter(|i| i.role.is_admin()).count() as u64,
            wallet_bound_users: tables.by_wallet.len() as u64,
        })
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}
