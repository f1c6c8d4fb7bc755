//! LDAP authentication by proxy.
//!
//! An [`AuthSession`] binds as a read-only admin, searches for the user's
//! DN, then binds as that DN with the supplied password.
//!
//! ```no_run
//! use dirauth_core::{AdminIdentity, AuthConfig, AuthError, AuthSession};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AuthConfig::new(
//!     "ldap.forumsys.com:389",
//!     AdminIdentity::new("cn=read-only-admin,dc=example,dc=com", "password"),
//!     "dc=example,dc=com",
//!     "uid",
//! )?;
//! let session = AuthSession::new(config);
//!
//! match session.authenticate("tesla", "password").await {
//!     Ok(()) => println!("welcome"),
//!     Err(AuthError::UserNotFound) | Err(AuthError::InvalidPassword) => println!("denied"),
//!     Err(e) => return Err(e.into()),
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod connection;
pub mod credentials;
pub mod directory;
pub mod entry;
pub mod error;
pub mod filter;
pub mod session;

pub use config::{AdminIdentity, AuthConfig, TlsMode};
pub use connection::LdapConnector;
pub use credentials::Credential;
pub use directory::{Connector, DirectorySession, SearchRequest};
pub use entry::DirectoryEntry;
pub use error::{AuthError, ConfigError, DirectoryFault};
pub use session::AuthSession;
