//! Secret resolution service.
//!
//! SecretStore resolves a reference through a chain of providers in priority
//! order. Providers skip references they do not handle, so the first provider
//! that returns a value wins.

use hookflow_types::error::SecretError;
use hookflow_types::secret::SecretReference;
use secrecy::SecretString;

use crate::port::secret::DynSecretProvider;

pub struct SecretStore {
    providers: Vec<DynSecretProvider>,
}

impl SecretStore {
    /// Providers should be ordered by precedence (highest priority first).
    pub fn new(providers: Vec<DynSecretProvider>) -> Self {
        Self { providers }
    }

    /// Resolve `reference` to its value.
    ///
    /// A provider error does not stop the chain; it is returned only if no
    /// later provider produces the secret.
    pub async fn resolve(&self, reference: &SecretReference) -> Result<SecretString, SecretError> {
        let mut last_error = None;

        for provider in &self.providers {
            match provider.resolve_boxed(reference).await {
                Ok(Some(value)) => {
                    tracing::debug!(
                        provider = provider.name(),
                        reference = %reference,
                        "secret resolved"
                    );
                    return Ok(value);
                }
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!(
                        provider = provider.name(),
                        reference = %reference,
                        error = %e,
                        "secret provider failed"
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| SecretError::NotFound(reference.to_string())))
    }
}
