//! The directory-protocol seam.
//!
//! [`AuthSession`](crate::session::AuthSession) only talks to the directory
//! through these traits. The production implementation lives in
//! [`connection`](crate::connection) and is backed by `ldap3`.

use std::future::Future;

use ldap3::{DerefAliases, Scope};

use crate::entry::DirectoryEntry;
use crate::error::DirectoryFault;

/// Parameters of a single LDAP search operation.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub base_dn: String,
    pub scope: Scope,
    pub deref: DerefAliases,
    pub size_limit: i32,
    pub time_limit: i32,
    pub types_only: bool,
    pub filter: String,
    pub attributes: Vec<String>,
}

impl SearchRequest {
    /// Whole-subtree search with no size or time limit that never
    /// dereferences aliases.
    pub fn subtree(
        base_dn: impl Into<String>,
        filter: impl Into<String>,
        attributes: Vec<String>,
    ) -> Self {
        Self {
            base_dn: base_dn.into(),
            scope: Scope::Subtree,
            deref: DerefAliases::Never,
            size_limit: 0,
            time_limit: 0,
            types_only: false,
            filter: filter.into(),
            attributes,
        }
    }
}

/// Opens protocol sessions against a directory host.
pub trait Connector: Send + Sync {
    type Session: DirectorySession;

    /// Dial `host` and return a session ready for bind and search.
    fn connect(
        &self,
        host: &str,
    ) -> impl Future<Output = Result<Self::Session, DirectoryFault>> + Send;
}

/// A live, exclusively owned protocol session.
///
/// Callers must finish every session with [`DirectorySession::close`].
pub trait DirectorySession: Send {
    fn bind(
        &mut self,
        dn: &str,
        secret: &str,
    ) -> impl Future<Output = Result<(), DirectoryFault>> + Send;

    fn search(
        &mut self,
        request: &SearchRequest,
    ) -> impl Future<Output = Result<Vec<DirectoryEntry>, DirectoryFault>> + Send;

    /// Release the session. Errors while closing are not reported.
    fn close(self) -> impl Future<Output = ()> + Send;
}
