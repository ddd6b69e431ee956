// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Contact Disclosure
//!
//! A task's contact details are encrypted once under a per-task DEK. The DEK
//! is wrapped separately for the creator and, after acceptance, for the
//! helper. Either party later proves wallet control to the gate and receives
//! their own wrapped DEK plus the encrypted payload, which only their client
//! can open.
//!
//! ```text
//! publish ──▶ create_contact_key ──▶ creator wrap + escrow
//! accept  ──▶ wrap_if_ready      ──▶ helper wrap, escrow cleared
//! request ──▶ verify_contact_request ──▶ {role, wrappedDEK, payload}
//!                                          │
//!                                 client: decrypt_contacts
//! ```
//!
//! Services borrow the database for the duration of one call and take the
//! chain id and the current time explicitly.

pub mod client;
pub mod error;
pub mod gate;
pub mod profiles;
pub mod role;
pub mod tasks;
pub mod wrapping;

#[cfg(test)]
pub(crate) mod testing;

pub use client::decrypt_contacts;
pub use error::ContactError;
pub use gate::{AuthorizationGate, ContactGrant, ContactRequest, IssuedChallenge};
pub use profiles::ProfileRegistry;
pub use role::ContactRole;
pub use tasks::{NewTask, TaskMirror};
pub use wrapping::KeyWrappingService;

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::testing::{sign, Fixture};
    use super::*;
    use crate::auth::ChallengePolicy;

    /// Task 8 from publish to both parties reading "tg:@alice".
    #[test]
    fn task_eight_end_to_end() {
        let fx = Fixture::new();
        fx.publish(8);
        let alice_keys = fx.register(&fx.alice);
        let bob_keys = fx.register(&fx.bob);

        let created = fx
            .wrapping()
            .create_for_creator(8, "tg:@alice", Utc::now())
            .unwrap();
        assert!(created.helper_wrapped_dek.is_none());

        fx.accept(8, &fx.bob);
        let wrapped = fx.wrapping().wrap_for_helper(8, Utc::now()).unwrap();
        assert!(wrapped.helper_wrapped_dek.is_some());

        let gate = fx.gate(ChallengePolicy::Static);
        let message = "Request contacts for task 8";

        let grant = gate
            .verify_contact_request(
                &ContactRequest {
                    task_id: 8,
                    address: fx.bob.clone(),
                    signature: sign(&fx.bob_signer, message),
                    message: message.into(),
                },
                Utc::now(),
            )
            .unwrap();
        assert_eq!(grant.role, ContactRole::Helper);
        assert_eq!(Some(&grant.wrapped_dek), wrapped.helper_wrapped_dek.as_ref());
        assert_eq!(
            decrypt_contacts(&grant.wrapped_dek, &bob_keys.secret, &grant.encrypted_payload)
                .unwrap(),
            "tg:@alice"
        );

        let grant = gate
            .verify_contact_request(
                &ContactRequest {
                    task_id: 8,
                    address: fx.alice.clone(),
                    signature: sign(&fx.alice_signer, message),
                    message: message.into(),
                },
                Utc::now(),
            )
            .unwrap();
        assert_eq!(grant.role, ContactRole::Creator);
        assert_eq!(
            decrypt_contacts(&grant.wrapped_dek, &alice_keys.secret, &grant.encrypted_payload)
                .unwrap(),
            "tg:@alice"
        );

        // The helper's key cannot open the creator's wrap.
        assert!(decrypt_contacts(&grant.wrapped_dek, &bob_keys.secret, &grant.encrypted_payload)
            .is_err());
    }
}
