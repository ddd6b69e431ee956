// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Contact Vault - encrypted contact exchange for a task marketplace
//!
//! Task creators deposit contact details that only the creator and the
//! accepted helper can ever read. Details are encrypted under a per-task
//! data key, and that key is wrapped to each participant's secp256k1
//! encryption key. The server stores and releases ciphertext only.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Wallet signature recovery, challenges and the internal token
//! - `contacts` - Key wrapping, authorization gate and task mirror
//! - `crypto` - ECIES key wrapping and payload encryption
//! - `storage` - redb database and audit log

pub mod api;
pub mod auth;
pub mod config;
pub mod contacts;
pub mod crypto;
pub mod error;
pub mod logging;
pub mod models;
pub mod state;
pub mod storage;
