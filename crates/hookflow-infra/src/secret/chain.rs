//! Secret chain builder -- wires concrete providers in priority order.
//!
//! This module lives in `hookflow-infra` because it assembles concrete
//! provider implementations. The resulting chain is passed to `SecretStore`
//! in `hookflow-core` via the `DynSecretProvider` abstraction.

use std::sync::Arc;

use hookflow_core::port::secret::DynSecretProvider;

use crate::keychain::KeychainProvider;
use crate::secret::env::EnvSecretProvider;
use crate::secret::file::FileSecretProvider;

/// Build the secret resolution chain: environment, files, then the OS
/// keychain when one is available.
///
/// Each provider only answers references of its own scheme, so the order
/// matters only for precedence between equal references.
pub fn build_secret_chain(keychain: Option<KeychainProvider>) -> Vec<DynSecretProvider> {
    let mut chain: Vec<DynSecretProvider> = vec![
        Arc::new(EnvSecretProvider::new()),
        Arc::new(FileSecretProvider::new()),
    ];

    if let Some(kc) = keychain {
        chain.push(Arc::new(kc));
    }

    chain
}
