// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet signature recovery (EIP-191 `personal_sign`).

use alloy::primitives::Signature;
use thiserror::Error;

use crate::models::WalletAddress;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("malformed signature: {0}")]
    Malformed(String),

    #[error("signer could not be recovered")]
    RecoveryFailed,
}

/// Recover the address that signed `message` with `personal_sign`.
///
/// `signature` is the 65-byte `r || s || v` form, 0x-hex.
pub fn recover_signer(message: &str, signature: &str) -> Result<WalletAddress, SignatureError> {
    let bytes = alloy::hex::decode(signature.trim())
        .map_err(|e| SignatureError::Malformed(e.to_string()))?;
    let signature = Signature::try_from(bytes.as_slice())
        .map_err(|e| SignatureError::Malformed(e.to_string()))?;

    signature
        .recover_address_from_msg(message.as_bytes())
        .map(WalletAddress::from)
        .map_err(|_| SignatureError::RecoveryFailed)
}
