//! Secret provider trait definition.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use hookflow_types::error::SecretError;
use hookflow_types::secret::SecretReference;
use secrecy::SecretString;

/// A secret storage backend (environment, file, keychain).
///
/// Returns `Ok(None)` for references this provider does not handle or does
/// not hold, so providers can be chained with first-match-wins semantics.
pub trait SecretProvider: Send + Sync {
    fn name(&self) -> &'static str;

    fn resolve(
        &self,
        reference: &SecretReference,
    ) -> impl Future<Output = Result<Option<SecretString>, SecretError>> + Send;
}

/// Object-safe version of [`SecretProvider`] with boxed futures.
pub trait SecretProviderDyn: Send + Sync {
    fn name(&self) -> &'static str;

    fn resolve_boxed<'a>(
        &'a self,
        reference: &'a SecretReference,
    ) -> Pin<Box<dyn Future<Output = Result<Option<SecretString>, SecretError>> + Send + 'a>>;
}

impl<T: SecretProvider> SecretProviderDyn for T {
    fn name(&self) -> &'static str {
        SecretProvider::name(self)
    }

    fn resolve_boxed<'a>(
        &'a self,
        reference: &'a SecretReference,
    ) -> Pin<Box<dyn Future<Output = Result<Option<SecretString>, SecretError>> + Send + 'a>> {
        Box::pin(self.resolve(reference))
    }
}

pub type DynSecretProvider = Arc<dyn SecretProviderDyn>;
