//! In-memory directory used to drive `AuthSession` without a server.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use dirauth_core::{
    AdminIdentity, AuthConfig, Connector, DirectoryEntry, DirectoryFault, DirectorySession,
    SearchRequest,
};

pub const HOST: &str = "ldap.example.test:389";
pub const BASE_DN: &str = "dc=example,dc=com";
pub const ADMIN_DN: &str = "cn=read-only-admin,dc=example,dc=com";
pub const ADMIN_SECRET: &str = "password";
pub const TESLA_DN: &str = "uid=tesla,dc=example,dc=com";
pub const TESLA_PASSWORD: &str = "password";

/// A protocol call observed by the fake directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Connect(String),
    Bind(String),
    Search(String),
    Close,
}

struct StoredEntry {
    entry: DirectoryEntry,
    password: String,
}

#[derive(Default)]
struct State {
    admin_dn: String,
    admin_secret: String,
    entries: Vec<StoredEntry>,
    refuse_connect: bool,
    user_bind_fault: Option<DirectoryFault>,
    ops: Vec<Op>,
    requests: Vec<SearchRequest>,
}

#[derive(Clone)]
pub struct MemoryDirectory {
    state: Arc<Mutex<State>>,
}

impl MemoryDirectory {
    pub fn new(admin_dn: &str, admin_secret: &str) -> Self {
        let state = State {
            admin_dn: admin_dn.to_string(),
            admin_secret: admin_secret.to_string(),
            ..State::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// A small directory shaped like the public forumsys test server.
    pub fn example() -> Self {
        let dir = Self::new(ADMIN_DN, ADMIN_SECRET);
        dir.add_entry(
            TESLA_DN,
            TESLA_PASSWORD,
            &[
                ("uid", &["tesla"]),
                ("cn", &["Nikola Tesla"]),
                ("mail", &["tesla@ldap.example.com"]),
                ("objectClass", &["inetOrgPerson", "posixAccount"]),
            ],
        );
        dir.add_entry(
            "uid=einstein,dc=example,dc=com",
            "relativity",
            &[
                ("uid", &["einstein"]),
                ("cn", &["Albert Einstein"]),
                ("mail", &["einstein@ldap.example.com"]),
                ("objectClass", &["inetOrgPerson"]),
            ],
        );
        dir.add_entry(
            "uid=twin,ou=first,dc=example,dc=com",
            "first",
            &[("uid", &["twin"]), ("cn", &["First Twin"])],
        );
        dir.add_entry(
            "uid=twin,ou=second,dc=example,dc=com",
            "second",
            &[("uid", &["twin"]), ("cn", &["Second Twin"])],
        );
        dir.add_entry(
            "uid=outsider,dc=other,dc=org",
            "outside",
            &[("uid", &["outsider"])],
        );
        dir
    }

    pub fn add_entry(&self, dn: &str, password: &str, attrs: &[(&str, &[&str])]) {
        let attributes: BTreeMap<String, Vec<String>> = attrs
            .iter()
            .map(|(name, values)| {
                (
                    name.to_string(),
                    values.iter().map(|v| v.to_string()).collect(),
                )
            })
            .collect();
        self.state.lock().unwrap().entries.push(StoredEntry {
            entry: DirectoryEntry::new(dn.to_string(), attributes),
            password: password.to_string(),
        });
    }

    pub fn refuse_connections(&self) {
        self.state.lock().unwrap().refuse_connect = true;
    }

    /// Make every non-admin bind fail with `fault`.
    pub fn fail_user_binds_with(&self, fault: DirectoryFault) {
        self.state.lock().unwrap().user_bind_fault = Some(fault);
    }

    pub fn ops(&self) -> Vec<Op> {
        self.state.lock().unwrap().ops.clone()
    }

    pub fn requests(&self) -> Vec<SearchRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn count(&self, wanted: fn(&Op) -> bool) -> usize {
        self.state.lock().unwrap().ops.iter().filter(|op| wanted(op)).count()
    }
}

impl Connector for MemoryDirectory {
    type Session = MemorySession;

    async fn connect(&self, host: &str) -> Result<MemorySession, DirectoryFault> {
        let mut state = self.state.lock().unwrap();
        state.ops.push(Op::Connect(host.to_string()));
        if state.refuse_connect {
            return Err(DirectoryFault::new(format!(
                "dial tcp {}: connection refused",
                host
            )));
        }
        Ok(MemorySession {
            state: Arc::clone(&self.state),
        })
    }
}

pub struct MemorySession {
    state: Arc<Mutex<State>>,
}

impl DirectorySession for MemorySession {
    async fn bind(&mut self, dn: &str, secret: &str) -> Result<(), DirectoryFault> {
        let mut state = self.state.lock().unwrap();
        state.ops.push(Op::Bind(dn.to_string()));

        if dn == state.admin_dn {
            return if secret == state.admin_secret {
                Ok(())
            } else {
                Err(invalid_credentials())
            };
        }
        if let Some(ref fault) = state.user_bind_fault {
            return Err(fault.clone());
        }
        let accepted = state
            .entries
            .iter()
            .any(|e| e.entry.dn.eq_ignore_ascii_case(dn) && e.password == secret);
        if accepted {
            Ok(())
        } else {
            Err(invalid_credentials())
        }
    }

    async fn search(
        &mut self,
        request: &SearchRequest,
    ) -> Result<Vec<DirectoryEntry>, DirectoryFault> {
        let mut state = self.state.lock().unwrap();
        state.ops.push(Op::Search(request.filter.clone()));
        state.requests.push(request.clone());

        let filter = Filter::parse(&request.filter)
            .ok_or_else(|| DirectoryFault::new("Filter Compile Error: unexpected end of filter"))?;
        let base = request.base_dn.to_lowercase();

        Ok(state
            .entries
            .iter()
            .filter(|e| e.entry.dn.to_lowercase().ends_with(&base))
            .filter(|e| filter.matches(&e.entry))
            .map(|e| project(&e.entry, &request.attributes))
            .collect())
    }

    async fn close(self) {
        self.state.lock().unwrap().ops.push(Op::Close);
    }
}

fn invalid_credentials() -> DirectoryFault {
    DirectoryFault::with_code(49, "Invalid Credentials")
}

/// Keep only the requested attributes; an empty list or `*` keeps all.
fn project(entry: &DirectoryEntry, attributes: &[String]) -> DirectoryEntry {
    if attributes.is_empty() || attributes.iter().any(|a| a == "*") {
        return entry.clone();
    }
    let attrs = entry
        .attributes
        .iter()
        .filter(|(name, _)| attributes.iter().any(|a| a.eq_ignore_ascii_case(name)))
        .map(|(name, values)| (name.clone(), values.clone()))
        .collect();
    DirectoryEntry::new(entry.dn.clone(), attrs)
}

/// Just enough of RFC 4515 for the tests: equality, presence, `&` and `|`.
enum Filter {
    Equal(String, String),
    Present(String),
    And(Vec<Filter>),
    Or(Vec<Filter>),
}

impl Filter {
    fn parse(input: &str) -> Option<Filter> {
        let (filter, rest) = Self::parse_one(input)?;
        rest.is_empty().then_some(filter)
    }

    fn parse_one(input: &str) -> Option<(Filter, &str)> {
        let inner = input.strip_prefix('(')?;
        match inner.chars().next()? {
            '&' | '|' => {
                let mut rest = &inner[1..];
                let mut parts = Vec::new();
                while rest.starts_with('(') {
                    let (part, next) = Self::parse_one(rest)?;
                    parts.push(part);
                    rest = next;
                }
                let rest = rest.strip_prefix(')')?;
                if parts.is_empty() {
                    return None;
                }
                let filter = if inner.starts_with('&') {
                    Filter::And(parts)
                } else {
                    Filter::Or(parts)
                };
                Some((filter, rest))
            }
            _ => {
                let close = inner.find(')')?;
                let item = &inner[..close];
                let (attr, value) = item.split_once('=')?;
                if attr.is_empty() || attr.contains('(') {
                    return None;
                }
                let filter = if value == "*" {
                    Filter::Present(attr.to_string())
                } else {
                    Filter::Equal(attr.to_string(), unescape(value)?)
                };
                Some((filter, &inner[close + 1..]))
            }
        }
    }

    fn matches(&self, entry: &DirectoryEntry) -> bool {
        match self {
            Filter::Equal(attr, value) => values(entry, attr)
                .iter()
                .any(|v| v.eq_ignore_ascii_case(value)),
            Filter::Present(attr) => !values(entry, attr).is_empty(),
            Filter::And(parts) => parts.iter().all(|p| p.matches(entry)),
            Filter::Or(parts) => parts.iter().any(|p| p.matches(entry)),
        }
    }
}

fn values<'a>(entry: &'a DirectoryEntry, attr: &str) -> &'a [String] {
    entry
        .attributes
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(attr))
        .map(|(_, v)| v.as_slice())
        .unwrap_or(&[])
}

fn unescape(value: &str) -> Option<String> {
    let mut out = Vec::new();
    let bytes = value.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' {
            let hex = value.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

pub fn config() -> AuthConfig {
    config_with(ADMIN_SECRET, "")
}

pub fn config_with(admin_secret: &str, filter_attribute: &str) -> AuthConfig {
    AuthConfig::new(
        HOST,
        AdminIdentity::new(ADMIN_DN, admin_secret),
        BASE_DN,
        filter_attribute,
    )
    .unwrap()
}
