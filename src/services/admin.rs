// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Administrative identity management.
//!
//! Callers are expected to have passed the admin gate already; this service
//! does not re-check roles.

use std::sync::Arc;

use crate::error::ApiError;
use crate::models::{Identity, IdentityPatch, IdentityResponse, PageQuery, SystemOverview, UserPage};
use crate::storage::{CredentialStore, StoreError};

#[derive(Clone)]
pub struct AdminService {
    store: Arc<dyn CredentialStore>,
}

impl AdminService {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    pub async fn list_users(&self, query: PageQuery) -> Result<UserPage, ApiError> {
        let (page, page_size) = query.resolve();
        let offset = u64::from(page - 1) * u64::from(page_size);
        let (users, total) = self.store.list(offset, u64::from(page_size)).await?;

        Ok(UserPage {
            total,
            page,
            page_size,
            users: users.iter().map(IdentityResponse::from).collect(),
        })
    }

    pub async fn get_user(&self, id: u64) -> Result<Identity, ApiError> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(id).into())
    }

    /// Apply `patch` to identity `id`. An empty patch returns the identity
    /// unchanged without writing.
    pub async fn update_user(&self, id: u64, patch: IdentityPatch) -> Result<Identity, ApiError> {
        let mut identity = self.get_user(id).await?;
        if patch.is_empty() {
            return Ok(identity);
        }

        patch.apply_to(&mut identity)?;
        let updated = self.store.update(identity).await?;
        tracing::info!(user_id = id, role = %updated.role, "Identity updated by admin");
        Ok(updated)
    }

    pub async fn delete_user(&self, id: u64) -> Result<(), ApiError> {
        self.store.delete(id).await?;
        tracing::info!(user_id = id, "Identity deleted by admin");
        Ok(())
    }

    pub async fn system_overview(&self) -> Result<SystemOverview, ApiError> {
        Ok(self.store.overview().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::error::ErrorCode;
    use crate::models::{NewIdentity, WalletAddress};
    use crate::storage::InMemoryCredentialStore;

    const WALLET: &str = "0x742d35cc6634c0532925a3b844bc9e7595f4ab12";

    async fn seeded(count: u32) -> AdminService {
        let store = Arc::new(InMemoryCredentialStore::new());
        for n in 1..=count {
            store
                .insert(NewIdentity {
                    username: format!("member{n}"),
                    email: format!("member{n}@example.com"),
                    password_hash: "$argon2id$v=19$m=256,t=1,p=1$c2FsdA$aGFzaA".into(),
                    wallet_address: (n == 1).then(|| WalletAddress::parse(WALLET).unwrap()),
                    role: Role::Regular,
                })
                .await
                .unwrap();
        }
        AdminService::new(store)
    }

    #[tokio::test]
    async fn list_users_paginates() {
        let admin = seeded(12).await;

        let first = admin.list_users(PageQuery::default()).await.unwrap();
        assert_eq!(first.total, 12);
        assert_eq!(first.users.len(), 10);
        assert_eq!(first.users[0].username, "member1");

        let second = admin
            .list_users(PageQuery {
                page: Some(2),
                page_size: None,
            })
            .await
            .unwrap();
        assert_eq!(second.users.len(), 2);
        assert_eq!(second.users[0].username, "member11");
    }

    #[tokio::test]
    async fn update_user_applies_patch() {
        let admin = seeded(2).await;
        let patch: IdentityPatch =
            serde_json::from_str(r#"{"role":"admin","wallet_address":null}"#).unwrap();

        let updated = admin.update_user(1, patch).await.unwrap();
        assert_eq!(updated.role, Role::Admin);
        assert!(updated.wallet_address.is_none());

        let overview = admin.system_overview().await.unwrap();
        assert_eq!(overview.admin_users, 1);
        assert_eq!(overview.wallet_bound_users, 0);
    }

    #[tokio::test]
    async fn update_user_reports_conflicts() {
        let admin = seeded(2).await;
        let patch: IdentityPatch =
            serde_json::from_str(&format!(r#"{{"username":"Member1","wallet_address":"{WALLET}"}}"#))
                .unwrap();

        let err = admin.update_user(2, patch).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::DuplicateEntity);
        assert_eq!(err.detail.as_deref(), Some("wallet_address"));
    }

    #[tokio::test]
    async fn missing_user_is_not_found() {
        let admin = seeded(1).await;
        assert_eq!(admin.get_user(9).await.unwrap_err().code, ErrorCode::NotFound);
        assert_eq!(
            admin
                .update_user(9, IdentityPatch::default())
                .await
                .unwrap_err()
                .code,
            ErrorCode::NotFound
        );
        assert_eq!(admin.delete_user(9).await.unwrap_err().code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn delete_user_removes_identity() {
        let admin = seeded(2).await;
        admin.delete_user(1).await.unwrap();

        let overview = admin.system_overview().await.unwrap();
        assert_eq!(overview.total_users, 1);
        assert_eq!(overview.wallet_bound_users, 0);
    }
}
