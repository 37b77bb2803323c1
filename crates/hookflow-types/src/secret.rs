use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SecretError;

/// Keychain service used when a `keychain:` reference names only an account.
pub const DEFAULT_KEYCHAIN_SERVICE: &str = "hookflow";

/// Where a secret lives. The reference itself is safe to log; the value is not.
///
/// String forms:
/// - `env:GITHUB_TOKEN` (a bare `GITHUB_TOKEN` means the same)
/// - `file:/run/secrets/github-token`
/// - `keychain:service/account` or `keychain:account`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SecretReference {
    Env(String),
    File(PathBuf),
    Keychain { service: String, account: String },
}

impl SecretReference {
    /// Provider name for log fields.
    pub fn scheme(&self) -> &'static str {
        match self {
            SecretReference::Env(_) => "env",
            SecretReference::File(_) => "file",
            SecretReference::Keychain { .. } => "keychain",
        }
    }
}

impl FromStr for SecretReference {
    type Err = SecretError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || SecretError::InvalidReference(s.to_string());

        let (scheme, rest) = s.split_once(':').unwrap_or(("env", s));
        match scheme {
            "env" => {
                let valid = !rest.is_empty()
                    && rest.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_');
                if valid {
                    Ok(SecretReference::Env(rest.to_string()))
                } else {
                    Err(invalid())
                }
            }
            "file" if !rest.is_empty() => Ok(SecretReference::File(PathBuf::from(rest))),
            "keychain" => match rest.split_once('/') {
                Some((service, account)) if !service.is_empty() && !account.is_empty() => {
                    Ok(SecretReference::Keychain {
                        service: service.to_string(),
                        account: account.to_string(),
                    })
                }
                None if !rest.is_empty() => Ok(SecretReference::Keychain {
                    service: DEFAULT_KEYCHAIN_SERVICE.to_string(),
                    account: rest.to_string(),
                }),
                _ => Err(invalid()),
            },
            _ => Err(invalid()),
        }
    }
}

impl TryFrom<String> for SecretReference {
    type Error = SecretError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SecretReference> for String {
    fn from(reference: SecretReference) -> Self {
        reference.to_string()
    }
}

impl fmt::Display for SecretReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecretReference::Env(name) => write!(f, "env:{name}"),
            SecretReference::File(path) => write!(f, "file:{}", path.display()),
            SecretReference::Keychain { service, account } => {
                write!(f, "keychain:{service}/{account}")
            }
        }
    }
}
