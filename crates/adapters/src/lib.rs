// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! acme-adapters: the externally-facing edge of the core. Everything
//! `spec.md` §1 sketches as an external collaborator — systemprofile
//! interrogation, signed-identity credential fetch, the outbound
//! streaming sink — is consumed here through a narrow trait, with a
//! test-grade concrete implementation standing in for the real OS/network
//! integration this workspace does not own.

pub mod credential;
pub mod https_publisher;
pub mod state_probe;

pub use credential::{Credentials, CredentialError, CredentialSource, StaticCredentialSource};
pub use https_publisher::HttpsPublisher;
pub use state_probe::EnvStateProbe;
