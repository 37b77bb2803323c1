//! File secret provider for `file:/path` references (mounted secrets).

use hookflow_core::port::secret::SecretProvider;
use hookflow_types::error::SecretError;
use hookflow_types::secret::SecretReference;
use secrecy::SecretString;

pub struct FileSecretProvider;

impl FileSecretProvider {
    pub fn new() -> Self {
        Self
    }
}

impl Default for FileSecretProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl SecretProvider for FileSecretProvider {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn resolve(
        &self,
        reference: &SecretReference,
    ) -> Result<Option<SecretString>, SecretError> {
        let SecretReference::File(path) = reference else {
            return Ok(None);
        };

        match tokio::fs::read_to_string(path).await {
            Ok(content) => {
                // Mounted secrets usually end with a newline.
                let value = content.trim_end_matches(['\r', '\n']);
                if value.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(SecretString::from(value.to_string())))
                }
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(SecretError::ProviderUnavailable(format!(
                "cannot read {}: {err}",
                path.display()
            ))),
        }
    }
}
