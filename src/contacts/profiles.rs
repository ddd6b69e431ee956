// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Profile store: wallet address → encryption public key.

use chrono::{DateTime, Duration, Utc};

use super::ContactError;
use crate::auth::challenge::{registration_message, REGISTRATION_MAX_SKEW_SECS};
use crate::auth::recover_signer;
use crate::crypto::EncryptionPublicKey;
use crate::models::{Profile, WalletAddress};
use crate::storage::{ContactDatabase, DbError};

pub struct ProfileRegistry<'a> {
    db: &'a ContactDatabase,
}

impl<'a> ProfileRegistry<'a> {
    pub fn new(db: &'a ContactDatabase) -> Self {
        Self { db }
    }

    /// Register (or rotate) the encryption key for `address`.
    ///
    /// `signature` must be `personal_sign` over
    /// `Register encryption key {public_key} for {address} at {issued_at}`,
    /// using the strings exactly as submitted. `issued_at` must be within
    /// [`REGISTRATION_MAX_SKEW_SECS`] of `now` and later than the stored
    /// registration, otherwise `StaleRegistration` is returned and the
    /// stored key is kept.
    pub fn register_encryption_key(
        &self,
        address: &str,
        public_key: &str,
        issued_at: &str,
        signature: &str,
        now: DateTime<Utc>,
    ) -> Result<Profile, ContactError> {
        let wallet = WalletAddress::parse(address)
            .map_err(|e| ContactError::InvalidInput(e.to_string()))?;
        let key = EncryptionPublicKey::from_hex(public_key)
            .map_err(|e| ContactError::InvalidInput(e.to_string()))?;
        let signed_at = DateTime::parse_from_rfc3339(issued_at)
            .map_err(|e| ContactError::InvalidInput(format!("issuedAt: {e}")))?
            .with_timezone(&Utc);

        let message = registration_message(public_key, address, issued_at);
        let signer = recover_signer(&message, signature).map_err(|_| ContactError::InvalidSignature)?;
        if signer != wallet {
            return Err(ContactError::InvalidSignature);
        }

        let skew = Duration::seconds(REGISTRATION_MAX_SKEW_SECS);
        if signed_at < now - skew || signed_at > now + skew {
            return Err(ContactError::StaleRegistration);
        }

        let profile = Profile {
            address: wallet,
            encryption_public_key: key.to_hex(),
            updated_at: signed_at,
        };
        self.db.put_profile_if_newer(&profile).map_err(|e| match e {
            DbError::Conflict(_) => ContactError::StaleRegistration,
            other => other.into(),
        })?;
        tracing::info!(address = %profile.address, "Encryption key registered");
        Ok(profile)
    }

    pub fn get_profile(&self, address: &WalletAddress) -> Result<Option<Profile>, ContactError> {
        Ok(self.db.get_profile(address)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contacts::testing::{sign, Fixture};
    use crate::crypto::EncryptionKeyPair;
    use alloy::signers::local::PrivateKeySigner;
    use chrono::SecondsFormat;

    struct Registration {
        address: String,
        public_key: String,
        issued_at: String,
        signature: String,
    }

    fn signed(signer: &PrivateKeySigner, address: &str, at: DateTime<Utc>) -> Registration {
        let public_key = EncryptionKeyPair::generate().public.to_hex();
        let issued_at = at.to_rfc3339_opts(SecondsFormat::Secs, true);
        let signature = sign(signer, &registration_message(&public_key, address, &issued_at));
        Registration {
            address: address.to_string(),
            public_key,
            issued_at,
            signature,
        }
    }

    fn submit(fx: &Fixture, r: &Registration, now: DateTime<Utc>) -> Result<Profile, ContactError> {
        ProfileRegistry::new(&fx.db).register_encryption_key(
            &r.address,
            &r.public_key,
            &r.issued_at,
            &r.signature,
            now,
        )
    }

    #[test]
    fn registers_key_signed_by_owner() {
        let fx = Fixture::new();
        let now = Utc::now();
        let registration = signed(&fx.alice_signer, &fx.alice_signer.address().to_string(), now);

        let profile = submit(&fx, &registration, now).unwrap();
        assert_eq!(profile.address, fx.alice);
        assert_eq!(profile.encryption_public_key, registration.public_key);
        assert_eq!(
            ProfileRegistry::new(&fx.db).get_profile(&fx.alice).unwrap(),
            Some(profile)
        );
    }

    #[test]
    fn cannot_register_for_someone_else() {
        let fx = Fixture::new();
        let now = Utc::now();
        let registration = signed(&fx.eve_signer, fx.alice.as_str(), now);

        assert!(matches!(
            submit(&fx, &registration, now),
            Err(ContactError::InvalidSignature)
        ));
        assert!(fx.db.get_profile(&fx.alice).unwrap().is_none());
    }

    #[test]
    fn replayed_registration_cannot_roll_back_a_rotation() {
        let fx = Fixture::new();
        let now = Utc::now();
        let address = fx.alice.to_string();
        let old = signed(&fx.alice_signer, &address, now - Duration::seconds(60));
        let rotated = signed(&fx.alice_signer, &address, now);

        submit(&fx, &old, now).unwrap();
        submit(&fx, &rotated, now).unwrap();

        assert!(matches!(
            submit(&fx, &old, now),
            Err(ContactError::StaleRegistration)
        ));
        assert!(matches!(
            submit(&fx, &rotated, now),
            Err(ContactError::StaleRegistration)
        ));
        let stored = fx.db.get_profile(&fx.alice).unwrap().unwrap();
        assert_eq!(stored.encryption_public_key, rotated.public_key);
    }

    #[test]
    fn registration_outside_clock_window_is_stale() {
        let fx = Fixture::new();
        let now = Utc::now();
        let address = fx.alice.to_string();
        let window = Duration::seconds(REGISTRATION_MAX_SKEW_SECS + 1);

        for at in [now - window, now + window] {
            let registration = signed(&fx.alice_signer, &address, at);
            assert!(matches!(
                submit(&fx, &registration, now),
                Err(ContactError::StaleRegistration)
            ));
        }
        assert!(fx.db.get_profile(&fx.alice).unwrap().is_none());
    }

    #[test]
    fn rejects_bad_keys_addresses_and_timestamps() {
        let fx = Fixture::new();
        let registry = ProfileRegistry::new(&fx.db);
        let now = Utc::now();
        let issued_at = now.to_rfc3339();
        assert!(matches!(
            registry.register_encryption_key(fx.alice.as_str(), "0x1234", &issued_at, "0x", now),
            Err(ContactError::InvalidInput(_))
        ));
        let key = EncryptionKeyPair::generate().public.to_hex();
        assert!(matches!(
            registry.register_encryption_key("alice", &key, &issued_at, "0x", now),
            Err(ContactError::InvalidInput(_))
        ));
        assert!(matches!(
            registry.register_encryption_key(fx.alice.as_str(), &key, "yesterday", "0x", now),
            Err(ContactError::InvalidInput(_))
        ));
    }
}
