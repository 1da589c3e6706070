// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet signature verification for wallet-based login.
//!
//! The session authenticator only depends on [`WalletSignatureVerifier`].
//! [`Eip191Verifier`] checks `personal_sign` signatures produced by EVM
//! wallets (MetaMask, WalletConnect, hardware signers).

use std::str::FromStr;

use alloy::primitives::{Address, Signature};

/// Failure to even evaluate a signature.
///
/// A well-formed signature from the wrong key is `Ok(false)`, not an error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WalletSignatureError {
    #[error("malformed wallet address: {0}")]
    MalformedAddress(String),
    #[error("malformed signature: {0}")]
    MalformedSignature(String),
    #[error("signer recovery failed: {0}")]
    RecoveryFailed(String),
}

/// Decides whether `signature` over `message` was produced by the key that
/// owns `address`.
pub trait WalletSignatureVerifier: Send + Sync {
    fn verify(
        &self,
        address: &str,
        message: &str,
        signature: &str,
    ) -> Result<bool, WalletSignatureError>;
}

/// EIP-191 (`personal_sign`) verifier over secp256k1.
#[derive(Debug, Clone, Copy, Default)]
pub struct Eip191Verifier;

impl WalletSignatureVerifier for Eip191Verifier {
    fn verify(
        &self,
        address: &str,
        message: &str,
        signature: &str,
    ) -> Result<bool, WalletSignatureError> {
        let expected = Address::from_str(address.trim())
            .map_err(|e| WalletSignatureError::MalformedAddress(e.to_string()))?;

        let raw = alloy::hex::decode(signature.trim())
            .map_err(|e| WalletSignatureError::MalformedSignature(e.to_string()))?;
        if raw.len() != 65 {
            return Err(WalletSignatureError::MalformedSignature(format!(
                "expected 65 bytes, got {}",
                raw.len()
            )));
        }
        let signature = Signature::from_raw(&raw)
            .map_err(|e| WalletSignatureError::MalformedSignature(e.to_string()))?;

        let recovered = signature
            .recover_address_from_msg(message.as_bytes())
            .map_err(|e| WalletSignatureError::RecoveryFailed(e.to_string()))?;

        Ok(recovered == expected)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use alloy::signers::{local::PrivateKeySigner, SignerSync};

    /// Deterministic signer so tests don't depend on an RNG feature.
    pub fn signer(seed: u8) -> PrivateKeySigner {
        PrivateKeySigner::from_slice(&[seed; 32]).expect("valid secp256k1 scalar")
    }

    /// Returns `(checksummed address, 0x-prefixed signature)`.
    pub fn sign(seed: u8, message: &str) -> (String, String) {
        let signer = signer(seed);
        let signature = signer
            .sign_message_sync(message.as_bytes())
            .expect("signing succeeds");
        (
            signer.address().to_string(),
            alloy::hex::encode_prefixed(signature.as_bytes()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::sign;
    use super::*;

    const MESSAGE: &str = "Sign in to the storefront\nnonce: 8c1f0a";

    #[test]
    fn accepts_signature_from_owner() {
        let (address, signature) = sign(0x11, MESSAGE);
        assert_eq!(Eip191Verifier.verify(&address, MESSAGE, &signature), Ok(true));
    }

    #[test]
    fn address_comparison_ignores_case() {
        let (address, signature) = sign(0x11, MESSAGE);
        let lower = address.to_lowercase();
        assert_eq!(Eip191Verifier.verify(&lower, MESSAGE, &signature), Ok(true));
    }

    #[test]
    fn rejects_signature_from_other_key() {
        let (address, _) = sign(0x11, MESSAGE);
        let (_, other_signature) = sign(0x22, MESSAGE);
        assert_eq!(
            Eip191Verifier.verify(&address, MESSAGE, &other_signature),
            Ok(false)
        );
    }

    #[test]
    fn rejects_signature_over_other_message() {
        let (address, signature) = sign(0x11, MESSAGE);
        assert_eq!(
            Eip191Verifier.verify(&address, "a different message", &signature),
            Ok(false)
        );
    }

    #[test]
    fn malformed_inputs_are_errors() {
        let (address, signature) = sign(0x11, MESSAGE);

        assert!(matches!(
            Eip191Verifier.verify("0x1234", MESSAGE, &signature),
            Err(WalletSignatureError::MalformedAddress(_))
        ));
        assert!(matches!(
            Eip191Verifier.verify(&address, MESSAGE, "0xzz"),
            Err(WalletSignatureError::MalformedSignature(_))
        ));
        assert!(matches!(
            Eip191Verifier.verify(&address, MESSAGE, "0xdeadbeef"),
            Err(WalletSignatureError::MalformedSignature(_))
        ));
    }
}
