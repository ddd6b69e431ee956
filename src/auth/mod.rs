// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Two kinds of caller reach this service:
//!
//! 1. **Wallets** prove control of an address by signing a message with
//!    `personal_sign`. No session is created; every request is re-verified.
//! 2. **The indexer** (an internal service mirroring chain state) presents
//!    `Authorization: Bearer <INTERNAL_API_TOKEN>`.
//!
//! ## Security
//!
//! - Internal endpoints fail closed when no token is configured
//! - Contact challenges are single-use and expire by default
//! - Signature failures never reveal which address was expected

pub mod challenge;
pub mod error;
pub mod extractor;
pub mod signature;

pub use challenge::{ChallengeMode, ChallengePolicy};
pub use error::AuthError;
pub use extractor::InternalAuth;
pub use signature::{recover_signer, SignatureError};
