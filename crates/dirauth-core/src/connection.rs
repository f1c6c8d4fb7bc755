use std::time::Duration;

use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, SearchEntry, SearchOptions};
use tracing::{debug, warn};

use crate::config::{AuthConfig, TlsMode};
use crate::directory::{Connector, DirectorySession, SearchRequest};
use crate::entry::DirectoryEntry;
use crate::error::DirectoryFault;

/// Dials LDAP directories with `ldap3`.
#[derive(Debug, Clone)]
pub struct LdapConnector {
    tls_mode: TlsMode,
    timeout: Duration,
}

impl LdapConnector {
    pub fn new(tls_mode: TlsMode, timeout: Duration) -> Self {
        Self { tls_mode, timeout }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(config.tls_mode(), config.connect_timeout())
    }
}

impl Connector for LdapConnector {
    type Session = LdapSession;

    async fn connect(&self, host: &str) -> Result<LdapSession, DirectoryFault> {
        let url = ldap_url(host, self.tls_mode);
        let conn_settings = LdapConnSettings::new()
            .set_conn_timeout(self.timeout)
            .set_starttls(self.tls_mode == TlsMode::StartTls);

        debug!("Dialing {} (timeout {:?})", url, self.timeout);
        let (conn, ldap) =
            tokio::time::timeout(self.timeout, LdapConnAsync::with_settings(conn_settings, &url))
                .await
                .map_err(|_| {
                    DirectoryFault::new(format!("connect to {} timed out after {:?}", url, self.timeout))
                })?
                .map_err(|e| DirectoryFault::new(format!("{}: {}", url, e)))?;
        ldap3::drive!(conn);

        Ok(LdapSession { ldap })
    }
}

/// An `ldap3` handle used for one bind-search-bind sequence.
pub struct LdapSession {
    ldap: Ldap,
}

impl DirectorySession for LdapSession {
    async fn bind(&mut self, dn: &str, secret: &str) -> Result<(), DirectoryFault> {
        self.ldap.simple_bind(dn, secret).await?.success()?;
        Ok(())
    }

    async fn search(&mut self, request: &SearchRequest) -> Result<Vec<DirectoryEntry>, DirectoryFault> {
        let options = SearchOptions::new()
            .deref(request.deref)
            .sizelimit(request.size_limit)
            .timelimit(request.time_limit)
            .typesonly(request.types_only);

        let (entries, _res) = self
            .ldap
            .with_search_options(options)
            .search(
                &request.base_dn,
                request.scope,
                &request.filter,
                request.attributes.clone(),
            )
            .await?
            .success()?;

        Ok(entries
            .into_iter()
            .map(|e| DirectoryEntry::from_search_entry(SearchEntry::construct(e)))
            .collect())
    }

    async fn close(mut self) {
        if let Err(e) = self.ldap.unbind().await {
            warn!("Unbind failed: {}", e);
        }
    }
}

/// Build the LDAP URL for a configured host.
///
/// Hosts that already carry a scheme are used verbatim; bare `host:port`
/// values get the scheme matching the TLS mode.
pub fn ldap_url(host: &str, tls_mode: TlsMode) -> String {
    if host.contains("://") {
        host.to_string()
    } else {
        format!("{}://{}", tls_mode.scheme(), host)
    }
}
