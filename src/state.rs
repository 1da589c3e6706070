// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use axum::extract::FromRef;

use crate::auth::{Eip191Verifier, PasswordError, PasswordHasher, TokenCodec};
use crate::config::AppConfig;
use crate::services::{AdminService, SessionAuthenticator};
use crate::storage::{CredentialStore, InMemoryCredentialStore, RedbCredentialStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("credential store unavailable: {0}")]
    Store(#[from] StoreError),

    #[error("password hasher misconfigured: {0}")]
    Password(#[from] PasswordError),
}

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn CredentialStore>,
    pub tokens: Arc<TokenCodec>,
    pub sessions: Arc<SessionAuthenticator>,
    pub admin: AdminService,
}

impl AppState {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        tokens: Arc<TokenCodec>,
        sessions: SessionAuthenticator,
    ) -> Self {
        Self {
            admin: AdminService::new(store.clone()),
            store,
            tokens,
            sessions: Arc::new(sessions),
        }
    }

    /// Assemble the application from startup configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self, StateError> {
        let store: Arc<dyn CredentialStore> = match &config.data_dir {
            Some(dir) => Arc::new(RedbCredentialStore::open_in_dir(dir)?),
            None => {
                tracing::warn!("DATA_DIR not set; identities are kept in memory only");
                Arc::new(InMemoryCredentialStore::new())
            }
        };

        let tokens = Arc::new(TokenCodec::new(config.jwt_secret_bytes()));
        let hasher = PasswordHasher::new(config.hash_params)?;

        let mut sessions =
            SessionAuthenticator::new(store.clone(), hasher, tokens.clone(), config.token_ttl)?;
        if config.wallet_login_enabled {
            sessions = sessions.with_wallet_verifier(Arc::new(Eip191Verifier));
        } else {
            tracing::info!("Wallet login disabled");
        }

        Ok(Self::new(store, tokens, sessions))
    }
}

impl FromRef<AppState> for Arc<TokenCodec> {
    fn from_ref(state: &AppState) -> Self {
        state.tokens.clone()
    }
}
