// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Argon2id password hashing.
//!
//! Digests are PHC strings (`$argon2id$v=19$m=...,t=...,p=...$salt$hash`), so
//! the salt and work factor travel with each stored hash and older hashes
//! keep verifying after the work factor is raised.

use argon2::{
    password_hash::{
        rand_core::{OsRng, RngCore},
        PasswordHash, PasswordHasher as _, PasswordVerifier as _, Salt, SaltString,
    },
    Algorithm, Argon2, Params, Version,
};

/// Password hashing failure.
///
/// Only raised for infrastructure faults; a wrong password is not an error.
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("invalid argon2 parameters: {0}")]
    InvalidParams(String),
    #[error("password hashing failed: {0}")]
    HashingFailed(String),
}

/// Argon2id work factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashParams {
    /// Memory cost in KiB
    pub memory_kib: u32,
    /// Number of passes
    pub iterations: u32,
    /// Degree of parallelism
    pub parallelism: u32,
}

impl Default for HashParams {
    /// OWASP-recommended Argon2id baseline (19 MiB, 2 passes, 1 lane).
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

/// One-way credential transform with a fresh random salt per hash.
#[derive(Clone)]
pub struct PasswordHasher {
    argon2: Argon2<'static>,
}

impl std::fmt::Debug for PasswordHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordHasher").finish_non_exhaustive()
    }
}

impl PasswordHasher {
    pub fn new(params: HashParams) -> Result<Self, PasswordError> {
        let params = Params::new(
            params.memory_kib,
            params.iterations,
            params.parallelism,
            None,
        )
        .map_err(|e| PasswordError::InvalidParams(e.to_string()))?;

        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    /// Hash a plaintext password into a PHC string.
    pub fn hash(&self, plaintext: &str) -> Result<String, PasswordError> {
        self.hash_with_rng(plaintext, &mut OsRng)
    }

    fn hash_with_rng(
        &self,
        plaintext: &str,
        rng: &mut impl RngCore,
    ) -> Result<String, PasswordError> {
        let mut salt_bytes = [0u8; Salt::RECOMMENDED_LENGTH];
        rng.try_fill_bytes(&mut salt_bytes)
            .map_err(|e| PasswordError::HashingFailed(format!("entropy source: {e}")))?;
        let salt = SaltString::encode_b64(&salt_bytes)
            .map_err(|e| PasswordError::HashingFailed(e.to_string()))?;

        let hash = self
            .argon2
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|e| PasswordError::HashingFailed(e.to_string()))?;

        Ok(hash.to_string())
    }

    /// Check a plaintext against a stored digest.
    ///
    /// A malformed digest verifies as `false`. The final tag comparison is
    /// constant-time.
    pub fn verify(&self, digest: &str, plaintext: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(digest) else {
            return false;
        };
        // Parameters come from the digest itself, not from `self.argon2`.
        self.argon2
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok()
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self {
            argon2: Argon2::default(),
        }
    }
}

#[cfg(test)]
pub(crate) fn test_hasher() -> PasswordHasher {
    PasswordHasher::new(HashParams {
        memory_kib: 256,
        iterations: 1,
        parallelism: 1,
    })
    .expect("valid test params")
}
