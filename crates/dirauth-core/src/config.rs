use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::credentials::SecretProvider;
use crate::error::ConfigError;

/// Attribute matched against the username when none is configured.
pub const DEFAULT_USER_FILTER_ATTRIBUTE: &str = "uid";

/// Connect timeout applied when none is configured.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(8);

/// Transport security used when dialing the directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TlsMode {
    #[default]
    None,
    Ldaps,
    StartTls,
}

impl TlsMode {
    /// URL scheme used for this mode.
    pub fn scheme(&self) -> &'static str {
        match self {
            TlsMode::Ldaps => "ldaps",
            TlsMode::None | TlsMode::StartTls => "ldap",
        }
    }
}

/// The privileged read-only identity used to look users up.
#[derive(Clone)]
pub struct AdminIdentity {
    name: String,
    secret: Zeroizing<String>,
}

impl AdminIdentity {
    pub fn new(name: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            secret: Zeroizing::new(secret.into()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl fmt::Debug for AdminIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminIdentity")
            .field("name", &self.name)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Validated, immutable settings for an [`AuthSession`](crate::session::AuthSession).
#[derive(Debug, Clone)]
pub struct AuthConfig {
    host: String,
    admin: AdminIdentity,
    base_dn: String,
    user_filter_attribute: String,
    tls_mode: TlsMode,
    connect_timeout: Duration,
}

impl AuthConfig {
    /// Build a config, rejecting empty required fields.
    ///
    /// An empty `user_filter_attribute` falls back to `"uid"`.
    pub fn new(
        host: impl Into<String>,
        admin: AdminIdentity,
        base_dn: impl Into<String>,
        user_filter_attribute: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let host = host.into();
        let base_dn = base_dn.into();
        let mut user_filter_attribute = user_filter_attribute.into();

        if host.is_empty() {
            return Err(ConfigError::MissingField("host"));
        }
        if admin.name.is_empty() {
            return Err(ConfigError::MissingField("admin.name"));
        }
        if admin.secret.is_empty() {
            return Err(ConfigError::MissingField("admin.secret"));
        }
        if base_dn.is_empty() {
            return Err(ConfigError::MissingField("base_dn"));
        }
        if user_filter_attribute.is_empty() {
            user_filter_attribute = DEFAULT_USER_FILTER_ATTRIBUTE.to_string();
        }

        Ok(Self {
            host,
            admin,
            base_dn,
            user_filter_attribute,
            tls_mode: TlsMode::default(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        })
    }

    pub fn with_tls_mode(mut self, tls_mode: TlsMode) -> Self {
        self.tls_mode = tls_mode;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Parse and validate a config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(content)?;
        file.into_config()
    }

    /// Read, parse and validate a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// `~/.config/dirauth/config.toml` (platform equivalent).
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("dirauth").join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("dirauth.toml"))
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn admin(&self) -> &AdminIdentity {
        &self.admin
    }

    pub fn base_dn(&self) -> &str {
        &self.base_dn
    }

    pub fn user_filter_attribute(&self) -> &str {
        &self.user_filter_attribute
    }

    pub fn tls_mode(&self) -> TlsMode {
        self.tls_mode
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Copy of this config pointing at another host or base DN.
    /// The result goes through the same validation as [`AuthConfig::new`].
    pub fn with_overrides(
        &self,
        host: Option<String>,
        base_dn: Option<String>,
    ) -> Result<Self, ConfigError> {
        let config = Self::new(
            host.unwrap_or_else(|| self.host.clone()),
            self.admin.clone(),
            base_dn.unwrap_or_else(|| self.base_dn.clone()),
            self.user_filter_attribute.clone(),
        )?;
        Ok(config
            .with_tls_mode(self.tls_mode)
            .with_connect_timeout(self.connect_timeout))
    }
}

/// On-disk layout of the config file.
#[derive(Debug, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    host: String,
    #[serde(default)]
    tls_mode: TlsMode,
    #[serde(default = "default_timeout")]
    timeout_secs: u64,
    #[serde(default)]
    base_dn: String,
    #[serde(default)]
    user_filter_attribute: String,
    admin: AdminSection,
}

#[derive(Debug, Deserialize)]
struct AdminSection {
    #[serde(default)]
    name: String,
    #[serde(default)]
    secret: Option<String>,
    #[serde(default)]
    secret_command: Option<String>,
    #[serde(default)]
    secret_keychain: Option<String>,
}

fn default_timeout() -> u64 {
    DEFAULT_CONNECT_TIMEOUT.as_secs()
}

impl AdminSection {
    fn resolve_secret(&self) -> Result<String, ConfigError> {
        // An empty inline secret falls through to the other sources.
        if let Some(secret) = self.secret.as_ref().filter(|s| !s.is_empty()) {
            return Ok(secret.clone());
        }
        if let Some(ref command) = self.secret_command {
            return SecretProvider::from_command(command);
        }
        if let Some(ref entry) = self.secret_keychain {
            return SecretProvider::from_keychain(entry);
        }
        Ok(String::new())
    }
}

impl ConfigFile {
    fn into_config(self) -> Result<AuthConfig, ConfigError> {
        if self.timeout_secs == 0 {
            return Err(ConfigError::ZeroValue("timeout_secs"));
        }
        let secret = self.admin.resolve_secret()?;
        let admin = AdminIdentity::new(self.admin.name, secret);
        let config = AuthConfig::new(self.host, admin, self.base_dn, self.user_filter_attribute)?;
        Ok(config
            .with_tls_mode(self.tls_mode)
            .with_connect_timeout(Duration::from_secs(self.timeout_secs)))
    }
}
