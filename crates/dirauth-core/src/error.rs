use std::fmt;

use thiserror::Error;

/// LDAP result code for `invalidCredentials` (RFC 4511, section 4.1.9).
pub const INVALID_CREDENTIALS_RC: u32 = 49;

/// Message signature some directory clients use for result code 49.
const INVALID_CREDENTIALS_TEXT: &str = "Invalid Credentials";

/// A failure reported by the directory-protocol collaborator.
///
/// `code` is the LDAP result code when the server answered with one;
/// transport and client-side failures (timeouts, filter parse errors,
/// dropped connections) have no code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryFault {
    pub code: Option<u32>,
    pub message: String,
}

impl DirectoryFault {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    pub fn with_code(code: u32, message: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            message: message.into(),
        }
    }

    /// Whether the directory rejected a bind as bad credentials.
    ///
    /// The structured result code wins; the textual signature is only
    /// consulted when no code was reported.
    pub fn is_invalid_credentials(&self) -> bool {
        match self.code {
            Some(rc) => rc == INVALID_CREDENTIALS_RC,
            None => self.message.contains(INVALID_CREDENTIALS_TEXT),
        }
    }
}

impl fmt::Display for DirectoryFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(rc) => write!(f, "rc={}: {}", rc, self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for DirectoryFault {}

impl From<ldap3::LdapError> for DirectoryFault {
    fn from(err: ldap3::LdapError) -> Self {
        match err {
            ldap3::LdapError::LdapResult { result } => {
                let text = if result.text.is_empty() {
                    format!("LDAP result code {}", result.rc)
                } else {
                    result.text
                };
                Self::with_code(result.rc, text)
            }
            other => Self::new(other.to_string()),
        }
    }
}

/// Outcome of a failed authenticate or attribute lookup.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("user not found")]
    UserNotFound,

    #[error("invalid password")]
    InvalidPassword,

    #[error("connection failed: {0}")]
    Connection(DirectoryFault),

    #[error("directory error: {0}")]
    Directory(DirectoryFault),
}

impl AuthError {
    /// True for the two outcomes caused by the end user's input rather
    /// than by the directory or its configuration.
    pub fn is_credential_failure(&self) -> bool {
        matches!(self, AuthError::UserNotFound | AuthError::InvalidPassword)
    }
}

/// Problems detected while building or loading an [`AuthConfig`](crate::config::AuthConfig).
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config.{0} is empty")]
    MissingField(&'static str),

    #[error("config.{0} must be greater than zero")]
    ZeroValue(&'static str),

    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("credential error: {0}")]
    CredentialError(String),
}
