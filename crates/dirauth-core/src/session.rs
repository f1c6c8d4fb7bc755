use tracing::{debug, info, warn};

use crate::config::AuthConfig;
use crate::connection::LdapConnector;
use crate::credentials::Credential;
use crate::directory::{Connector, DirectorySession, SearchRequest};
use crate::entry::DirectoryEntry;
use crate::error::{AuthError, DirectoryFault};
use crate::filter::{user_filter, validate_filter};

/// Attribute requested when only the DN of a match is needed.
const DN_ATTRIBUTE: &str = "dn";

/// Authenticates users by proxy: bind as the read-only admin, look the user
/// up, then bind as the user.
///
/// Every operation opens its own session and closes it before returning, so
/// an `AuthSession` can be shared freely between tasks.
#[derive(Debug)]
pub struct AuthSession<C = LdapConnector> {
    config: AuthConfig,
    connector: C,
}

impl AuthSession<LdapConnector> {
    pub fn new(config: AuthConfig) -> Self {
        let connector = LdapConnector::from_config(&config);
        Self { config, connector }
    }
}

impl<C: Connector> AuthSession<C> {
    /// Use a custom [`Connector`] instead of dialing with `ldap3`.
    pub fn with_connector(config: AuthConfig, connector: C) -> Self {
        Self { config, connector }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Verify `password` for `username`.
    ///
    /// Empty usernames and passwords are rejected without touching the
    /// network. Admin-bind and search failures are reported as
    /// [`AuthError::Directory`], never as a credential failure.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<(), AuthError> {
        if username.is_empty() {
            return Err(AuthError::UserNotFound);
        }
        if password.is_empty() {
            return Err(AuthError::InvalidPassword);
        }

        let mut session = self.connect().await?;
        let result = self.authenticate_on(&mut session, username, password).await;
        session.close().await;

        if result.is_ok() {
            info!("Authenticated {}", username);
        }
        result
    }

    pub async fn authenticate_credential(&self, credential: &Credential) -> Result<(), AuthError> {
        self.authenticate(&credential.username, credential.password())
            .await
    }

    /// Search below the base DN with an arbitrary filter.
    ///
    /// A filter that matches nothing yields an empty vector. Malformed
    /// filters are rejected before connecting.
    pub async fn search_attributes(
        &self,
        filter: &str,
        attributes: &[&str],
    ) -> Result<Vec<DirectoryEntry>, AuthError> {
        validate_filter(filter)
            .map_err(|e| AuthError::Directory(DirectoryFault::new(format!("invalid filter: {e}"))))?;

        let request = SearchRequest::subtree(
            self.config.base_dn(),
            filter.trim(),
            attributes.iter().map(|a| a.to_string()).collect(),
        );
        self.admin_search(&request).await
    }

    /// Look up a single user's entry by username.
    ///
    /// Only the first match is returned; further matches are ignored.
    pub async fn get_attributes(
        &self,
        username: &str,
        attributes: &[&str],
    ) -> Result<DirectoryEntry, AuthError> {
        if username.is_empty() {
            return Err(AuthError::UserNotFound);
        }

        let request = SearchRequest::subtree(
            self.config.base_dn(),
            user_filter(self.config.user_filter_attribute(), username),
            attributes.iter().map(|a| a.to_string()).collect(),
        );
        self.admin_search(&request)
            .await?
            .into_iter()
            .next()
            .ok_or(AuthError::UserNotFound)
    }

    async fn connect(&self) -> Result<C::Session, AuthError> {
        let host = self.config.host();
        debug!("Connecting to {}", host);
        self.connector
            .connect(host)
            .await
            .map_err(AuthError::Connection)
    }

    async fn admin_search(&self, request: &SearchRequest) -> Result<Vec<DirectoryEntry>, AuthError> {
        let mut session = self.connect().await?;
        let result = self.admin_search_on(&mut session, request).await;
        session.close().await;
        result
    }

    async fn admin_search_on(
        &self,
        session: &mut C::Session,
        request: &SearchRequest,
    ) -> Result<Vec<DirectoryEntry>, AuthError> {
        self.admin_bind(session).await?;
        let entries = session.search(request).await.map_err(AuthError::Directory)?;
        debug!("Search {} returned {} entries", request.filter, entries.len());
        Ok(entries)
    }

    async fn admin_bind(&self, session: &mut C::Session) -> Result<(), AuthError> {
        let admin = self.config.admin();
        session
            .bind(admin.name(), admin.secret())
            .await
            .map_err(|fault| {
                warn!("Admin bind as {} failed: {}", admin.name(), fault);
                AuthError::Directory(fault)
            })?;
        debug!("Bound as {}", admin.name());
        Ok(())
    }

    async fn authenticate_on(
        &self,
        session: &mut C::Session,
        username: &str,
        password: &str,
    ) -> Result<(), AuthError> {
        let request = SearchRequest::subtree(
            self.config.base_dn(),
            user_filter(self.config.user_filter_attribute(), username),
            vec![DN_ATTRIBUTE.to_string()],
        );
        let entries = self.admin_search_on(session, &request).await?;

        // Directory order decides when several entries match.
        let user_dn = match entries.into_iter().next() {
            Some(entry) => entry.dn,
            None => return Err(AuthError::UserNotFound),
        };

        debug!("Binding as {}", user_dn);
        session.bind(&user_dn, password).await.map_err(|fault| {
            if fault.is_invalid_credentials() {
                AuthError::InvalidPassword
            } else {
                AuthError::Directory(fault)
            }
        })
    }
}
