use std::fmt;

use tracing::debug;
use zeroize::Zeroizing;

use crate::error::ConfigError;

/// A username and password supplied for a single authentication call.
///
/// The password buffer is wiped when the credential is dropped.
#[derive(Clone)]
pub struct Credential {
    pub username: String,
    password: Zeroizing<String>,
}

impl Credential {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: Zeroizing::new(password.into()),
        }
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Resolves the admin secret from sources other than the config file.
pub struct SecretProvider;

impl SecretProvider {
    /// Get a secret from a shell command (stdout, trailing newline trimmed).
    pub fn from_command(command: &str) -> Result<String, ConfigError> {
        debug!("Running secret command");
        let output = std::process::Command::new("sh")
            .arg("-c")
            .arg(command)
            .output()
            .map_err(|e| ConfigError::CredentialError(format!("Failed to run command: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ConfigError::CredentialError(format!(
                "Secret command failed ({}): {}",
                output.status, stderr
            )));
        }

        let secret = String::from_utf8(output.stdout)
            .map_err(|e| ConfigError::CredentialError(format!("Invalid UTF-8 in secret: {}", e)))?
            .trim_end_matches('\n')
            .trim_end_matches('\r')
            .to_string();

        Ok(secret)
    }

    /// Get a secret from the OS keychain, stored under the `dirauth` service.
    pub fn from_keychain(entry_name: &str) -> Result<String, ConfigError> {
        let entry = keyring::Entry::new("dirauth", entry_name)
            .map_err(|e| ConfigError::CredentialError(format!("Keychain access failed: {}", e)))?;

        entry
            .get_password()
            .map_err(|e| ConfigError::CredentialError(format!("Keychain get failed: {}", e)))
    }
}
