// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session Authenticator: registration, login and identity lookup.
//!
//! ## Registration
//!
//! The email, wallet and username pre-checks are advisory. Two concurrent
//! registrations can both pass them; the store's atomic uniqueness check is
//! what decides, and its conflict is reported the same way.
//!
//! ## Login
//!
//! Every credential mismatch (unknown email, wrong password, unknown wallet,
//! signature from another key) yields the same [`ApiError::invalid_credentials`].

use std::sync::Arc;

use chrono::Duration;

use crate::auth::{PasswordError, PasswordHasher, Role, TokenCodec, WalletSignatureVerifier};
use crate::error::ApiError;
use crate::models::{
    AuthResponse, Identity, LoginCredentials, NewIdentity, Registration, WalletAddress,
};
use crate::storage::{CredentialStore, StoreError, UniqueField};

/// A verified identity together with a freshly issued token.
#[derive(Debug, Clone)]
pub struct Session {
    pub identity: Identity,
    pub token: String,
}

impl From<Session> for AuthResponse {
    fn from(session: Session) -> Self {
        AuthResponse {
            identity: session.identity.into(),
            token: session.token,
        }
    }
}

/// Orchestrates credential checks and token issuance.
pub struct SessionAuthenticator {
    store: Arc<dyn CredentialStore>,
    hasher: PasswordHasher,
    tokens: Arc<TokenCodec>,
    token_ttl: Duration,
    wallet_verifier: Option<Arc<dyn WalletSignatureVerifier>>,
    /// Verified against when the email is unknown, so both failure paths
    /// do the same amount of work.
    decoy_hash: Arc<str>,
}

impl std::fmt::Debug for SessionAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionAuthenticator")
            .field("store", &self.store.backend())
            .field("token_ttl", &self.token_ttl)
            .field("wallet_login", &self.wallet_verifier.is_some())
            .finish_non_exhaustive()
    }
}

impl SessionAuthenticator {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        hasher: PasswordHasher,
        tokens: Arc<TokenCodec>,
        token_ttl: Duration,
    ) -> Result<Self, PasswordError> {
        let decoy_hash = hasher.hash("decoy-password-never-assigned")?;
        Ok(Self {
            store,
            hasher,
            tokens,
            token_ttl,
            wallet_verifier: None,
            decoy_hash: decoy_hash.into(),
        })
    }

    /// Enable wallet-signature login.
    pub fn with_wallet_verifier(mut self, verifier: Arc<dyn WalletSignatureVerifier>) -> Self {
        self.wallet_verifier = Some(verifier);
        self
    }

    pub fn wallet_login_enabled(&self) -> bool {
        self.wallet_verifier.is_some()
    }

    /// Create a `regular` identity and log it in.
    pub async fn register(&self, registration: Registration) -> Result<Session, ApiError> {
        self.ensure_available(&registration).await?;

        let password_hash = self.hash_password(registration.password).await?;

        let identity = self
            .store
            .insert(NewIdentity {
                username: registration.username,
                email: registration.email,
                password_hash,
                wallet_address: registration.wallet_address,
                role: Role::Regular,
            })
            .await
            .map_err(|e| {
                if let StoreError::Conflict(field) = &e {
                    tracing::info!(field = field.as_str(), "registration lost uniqueness race");
                }
                ApiError::from(e)
            })?;

        tracing::info!(
            user_id = identity.id,
            wallet_bound = identity.wallet_address.is_some(),
            "Identity registered"
        );
        self.open_session(identity)
    }

    pub async fn login(&self, credentials: LoginCredentials) -> Result<Session, ApiError> {
        let identity = match credentials {
            LoginCredentials::Password { email, password } => {
                self.check_password(&email, password).await?
            }
            LoginCredentials::Wallet {
                wallet_address,
                message,
                signature,
            } => self.check_wallet(&wallet_address, &message, &signature).await?,
        };

        tracing::info!(user_id = identity.id, role = %identity.role, "Login succeeded");
        self.open_session(identity)
    }

    pub async fn get_by_id(&self, id: u64) -> Result<Identity, ApiError> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(id).into())
    }

    async fn ensure_available(&self, registration: &Registration) -> Result<(), ApiError> {
        if self.store.find_by_email(&registration.email).await?.is_some() {
            return Err(ApiError::duplicate(UniqueField::Email));
        }
        if let Some(wallet) = &registration.wallet_address {
            if self.store.find_by_wallet_address(wallet).await?.is_some() {
                return Err(ApiError::duplicate(UniqueField::WalletAddress));
            }
        }
        if self
            .store
            .find_by_username(&registration.username)
            .await?
            .is_some()
        {
            return Err(ApiError::duplicate(UniqueField::Username));
        }
        Ok(())
    }

    async fn check_password(&self, email: &str, password: String) -> Result<Identity, ApiError> {
        let identity = self.store.find_by_email(email).await?;
        let digest = match &identity {
            Some(identity) => Arc::from(identity.password_hash.as_str()),
            None => self.decoy_hash.clone(),
        };

        let matches = self.verify_password(digest, password).await?;
        match identity {
            Some(identity) if matches => Ok(identity),
            _ => {
                tracing::debug!("Password login rejected");
                Err(ApiError::invalid_credentials())
            }
        }
    }

    async fn check_wallet(
        &self,
        wallet_address: &WalletAddress,
        message: &str,
        signature: &str,
    ) -> Result<Identity, ApiError> {
        let Some(verifier) = &self.wallet_verifier else {
            return Err(ApiError::web3_signature("Wallet login is not enabled"));
        };

        if !verifier.verify(wallet_address.as_str(), message, signature)? {
            tracing::debug!("Wallet signature does not match claimed address");
            return Err(ApiError::invalid_credentials());
        }

        self.store
            .find_by_wallet_address(wallet_address)
            .await?
            .ok_or_else(|| {
                tracing::debug!("Verified wallet is not bound to any identity");
                ApiError::invalid_credentials()
            })
    }

    fn open_session(&self, identity: Identity) -> Result<Session, ApiError> {
        let token = self.tokens.issue(&identity.principal(), self.token_ttl)?;
        Ok(Session { identity, token })
    }

    async fn hash_password(&self, password: String) -> Result<String, ApiError> {
        let hasher = self.hasher.clone();
        let digest = tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| ApiError::crypto(format!("hashing task failed: {e}")))??;
        Ok(digest)
    }

    async fn verify_password(&self, digest: Arc<str>, password: String) -> Result<bool, ApiError> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.verify(&digest, &password))
            .await
            .map_err(|e| ApiError::crypto(format!("verification task failed: {e}")))
    }
}
