//! Environment variable secret provider.
//!
//! Read-only provider for `env:NAME` references. An unset or empty variable
//! is "not here" rather than an error so the chain can continue.

use hookflow_core::port::secret::SecretProvider;
use hookflow_types::error::SecretError;
use hookflow_types::secret::SecretReference;
use secrecy::SecretString;

pub struct EnvSecretProvider;

impl EnvSecretProvider {
    pub fn new() -> Self {
        Self
    }
}

impl Default for EnvSecretProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl SecretProvider for EnvSecretProvider {
    fn name(&self) -> &'static str {
        "env"
    }

    async fn resolve(
        &self,
        reference: &SecretReference,
    ) -> Result<Option<SecretString>, SecretError> {
        let SecretReference::Env(name) = reference else {
            return Ok(None);
        };

        match std::env::var(name) {
            Ok(value) if !value.trim().is_empty() => Ok(Some(SecretString::from(value))),
            Ok(_) => Ok(None),
            Err(std::env::VarError::NotPresent) => Ok(None),
            // Secrets must be valid strings; treat as absent.
            Err(std::env::VarError::NotUnicode(_)) => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[tokio::test]
    async fn test_env_provider_get_existing() {
        // SAFETY: the variable name is unique to this test.
        unsafe { std::env::set_var("HOOKFLOW_TEST_SECRET_1", "test-value-123") };

        let provider = EnvSecretProvider::new();
        let result = provider
            .resolve(&SecretReference::Env("HOOKFLOW_TEST_SECRET_1".to_string()))
            .await
            .unwrap();

        assert_eq!(result.unwrap().expose_secret(), "test-value-123");

        // SAFETY: the variable was set above by this test only.
        unsafe { std::env::remove_var("HOOKFLOW_TEST_SECRET_1") };
    }

    #[tokio::test]
    async fn test_env_provider_get_missing() {
        let provider = EnvSecretProvider::new();
        let result = provider
            .resolve(&SecretReference::Env("NONEXISTENT_VAR_XYZ_123".to_string()))
            .await
            .unwrap();

        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_env_provider_empty_value_is_missing() {
        // SAFETY: the variable name is unique to this test.
        unsafe { std::env::set_var("HOOKFLOW_TEST_SECRET_EMPTY", "") };

        let provider = EnvSecretProvider::new();
        let result = provider
            .resolve(&SecretReference::Env("HOOKFLOW_TEST_SECRET_EMPTY".to_string()))
            .await
            .unwrap();
        assert!(result.is_none());

        // SAFETY: the variable was set above by this test only.
        unsafe { std::env::remove_var("HOOKFLOW_TEST_SECRET_EMPTY") };
    }

    #[tokio::test]
    async fn test_env_provider_skips_other_schemes() {
        let provider = EnvSecretProvider::new();
        let result = provider
            .resolve(&SecretReference::File("/etc/hostname".into()))
            .await
            .unwrap();
        assert!(result.is_none());
    }
}
