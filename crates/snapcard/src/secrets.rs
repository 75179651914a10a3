//! Credential resolution for external collaborators.
//!
//! A [`SecretRef`] names where a credential lives. Sources are tried in
//! priority order:
//!
//! 1. **Inline value** - convenient for local runs (`"apiKey": "..."`)
//! 2. **File** - container secret mounts (`"apiKeyFile": "/run/secrets/gemini"`)
//! 3. **Environment variable** - deployment default (`"apiKeyEnvVar": "GEMINI_API_KEY"`)

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("No source configured for credential '{name}'")]
    NoSourceProvided { name: String },

    #[error("Failed to read credential '{name}' from file '{path}': {source}")]
    FileReadError {
        name: String,
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Environment variable '{var}' for credential '{name}' is not set")]
    EnvVarNotSet { name: String, var: String },

    #[error("Environment variable '{var}' for credential '{name}' contains invalid UTF-8")]
    EnvVarNotUnicode { name: String, var: String },

    #[error("Credential '{name}' resolved to an empty value")]
    Empty { name: String },
}

pub type Result<T> = std::result::Result<T, SecretError>;

/// Where to find one credential.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env_var: Option<String>,
}

impl SecretRef {
    /// A reference that only reads the given environment variable.
    pub fn from_env_var(var: impl Into<String>) -> Self {
        Self {
            value: None,
            file: None,
            env_var: Some(var.into()),
        }
    }

    /// Whether any source is configured.
    pub fn is_configured(&self) -> bool {
        non_empty(self.value.as_deref()).is_some()
            || non_empty(self.file.as_deref()).is_some()
            || non_empty(self.env_var.as_deref()).is_some()
    }

    /// Resolves the credential. `name` only labels errors and logs.
    pub fn resolve(&self, name: &str) -> Result<SecretString> {
        if let Some(value) = non_empty(self.value.as_deref()) {
            return Ok(SecretString::from(value.to_string()));
        }

        if let Some(path) = non_empty(self.file.as_deref()) {
            let expanded = expand_home(path);
            let content =
                std::fs::read_to_string(&expanded).map_err(|e| SecretError::FileReadError {
                    name: name.to_string(),
                    path: expanded.clone(),
                    source: e,
                })?;
            return checked(name, content.trim());
        }

        if let Some(var) = non_empty(self.env_var.as_deref()) {
            return match std::env::var(var) {
                Ok(value) => checked(name, value.trim()),
                Err(std::env::VarError::NotPresent) => Err(SecretError::EnvVarNotSet {
                    name: name.to_string(),
                    var: var.to_string(),
                }),
                Err(std::env::VarError::NotUnicode(_)) => Err(SecretError::EnvVarNotUnicode {
                    name: name.to_string(),
                    var: var.to_string(),
                }),
            };
        }

        Err(SecretError::NoSourceProvided {
            name: name.to_string(),
        })
    }

    /// Like [`resolve`](Self::resolve) but treats "nothing configured" and an
    /// unset environment variable as absent rather than an error.
    pub fn resolve_optional(&self, name: &str) -> Result<Option<SecretString>> {
        match self.resolve(name) {
            Ok(secret) => Ok(Some(secret)),
            Err(SecretError::NoSourceProvided { .. }) | Err(SecretError::EnvVarNotSet { .. }) => {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

fn checked(name: &str, value: &str) -> Result<SecretString> {
    if value.is_empty() {
        return Err(SecretError::Empty {
            name: name.to_string(),
        });
    }
    Ok(SecretString::from(value.to_string()))
}

/// Expands a leading `~` to the home directory. `~user` is not supported.
pub fn expand_home(path: &str) -> String {
    if path == "~" || path.starts_with("~/") {
        if let Some(home) = dirs::home_dir() {
            let home = home.to_string_lossy();
            return if path == "~" {
                home.into_owned()
            } else {
                path.replacen('~', &home, 1)
            };
        }
    }
    path.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    #[serial]
    fn test_inline_value_wins() {
        std::env::set_var("SNAPCARD_TEST_KEY_1", "from_env");
        let secret = SecretRef {
            value: Some("inline".into()),
            file: None,
            env_var: Some("SNAPCARD_TEST_KEY_1".into()),
        };
        assert_eq!(secret.resolve("model").unwrap().expose_secret(), "inline");
        std::env::remove_var("SNAPCARD_TEST_KEY_1");
    }

    #[test]
    #[serial]
    fn test_file_beats_env_and_is_trimmed() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "  from_file  ").unwrap();
        std::env::set_var("SNAPCARD_TEST_KEY_2", "from_env");

        let secret = SecretRef {
            value: Some("   ".into()),
            file: Some(file.path().to_string_lossy().into_owned()),
            env_var: Some("SNAPCARD_TEST_KEY_2".into()),
        };
        assert_eq!(secret.resolve("model").unwrap().expose_secret(), "from_file");
        std::env::remove_var("SNAPCARD_TEST_KEY_2");
    }

    #[test]
    #[serial]
    fn test_env_var_source() {
        std::env::set_var("SNAPCARD_TEST_KEY_3", "from_env\n");
        let secret = SecretRef::from_env_var("SNAPCARD_TEST_KEY_3");
        assert_eq!(secret.resolve("model").unwrap().expose_secret(), "from_env");
        std::env::remove_var("SNAPCARD_TEST_KEY_3");
    }

    #[test]
    fn test_missing_sources() {
        let err = SecretRef::default().resolve("model").unwrap_err();
        assert!(matches!(err, SecretError::NoSourceProvided { .. }));
        assert!(!SecretRef::default().is_configured());

        let err = SecretRef::from_env_var("SNAPCARD_DEFINITELY_UNSET_987")
            .resolve("model")
            .unwrap_err();
        assert!(matches!(err, SecretError::EnvVarNotSet { .. }));
    }

    #[test]
    fn test_unreadable_file() {
        let secret = SecretRef {
            file: Some("/nonexistent/snapcard/secret".into()),
            ..Default::default()
        };
        assert!(matches!(
            secret.resolve("model"),
            Err(SecretError::FileReadError { .. })
        ));
    }

    #[test]
    fn test_resolve_optional_absent() {
        assert!(SecretRef::default()
            .resolve_optional("model")
            .unwrap()
            .is_none());
        assert!(SecretRef::from_env_var("SNAPCARD_DEFINITELY_UNSET_654")
            .resolve_optional("model")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_empty_file_rejected() {
        let file = NamedTempFile::new().unwrap();
        let secret = SecretRef {
            file: Some(file.path().to_string_lossy().into_owned()),
            ..Default::default()
        };
        assert!(matches!(
            secret.resolve("model"),
            Err(SecretError::Empty { .. })
        ));
    }

    #[test]
    fn test_expand_home_leaves_plain_paths() {
        assert_eq!(expand_home("/abs/path"), "/abs/path");
        assert_eq!(expand_home("rel/path"), "rel/path");
        if let Some(home) = dirs::home_dir() {
            assert_eq!(
                expand_home("~/key"),
                format!("{}/key", home.to_string_lossy())
            );
        }
    }
}
