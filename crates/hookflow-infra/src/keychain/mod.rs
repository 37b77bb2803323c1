//! OS keychain adapter for secret storage.
//!
//! Uses the `keyring` crate to read secrets via:
//! - macOS Keychain
//! - Linux Secret Service (GNOME Keyring, KDE Wallet)
//! - Windows Credential Manager
//!
//! Answers `keychain:service/account` references only.

use hookflow_core::port::secret::SecretProvider;
use hookflow_types::error::SecretError;
use hookflow_types::secret::SecretReference;
use secrecy::SecretString;

pub struct KeychainProvider;

impl KeychainProvider {
    pub fn new() -> Self {
        Self
    }
}

impl Default for KeychainProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl SecretProvider for KeychainProvider {
    fn name(&self) -> &'static str {
        "keychain"
    }

    async fn resolve(
        &self,
        reference: &SecretReference,
    ) -> Result<Option<SecretString>, SecretError> {
        let SecretReference::Keychain { service, account } = reference else {
            return Ok(None);
        };

        let entry = keyring::Entry::new(service, account)
            .map_err(|e| SecretError::ProviderUnavailable(format!("keychain entry error: {e}")))?;

        match entry.get_password() {
            Ok(value) => Ok(Some(SecretString::from(value))),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(SecretError::ProviderUnavailable(format!(
                "keychain get error: {e}"
            ))),
        }
    }
}
