use std::collections::BTreeMap;
use std::fmt::Write;

use serde::{Deserialize, Serialize};

/// A directory entry returned by a search: its DN and attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub dn: String,
    pub attributes: BTreeMap<String, Vec<String>>,
}

impl DirectoryEntry {
    pub fn new(dn: String, attributes: BTreeMap<String, Vec<String>>) -> Self {
        Self { dn, attributes }
    }

    pub fn from_search_entry(entry: ldap3::SearchEntry) -> Self {
        Self {
            dn: entry.dn,
            attributes: entry.attrs.into_iter().collect(),
        }
    }

    /// Get the first value of an attribute, if present.
    pub fn first_value(&self, attr: &str) -> Option<&str> {
        self.attributes
            .get(attr)
            .and_then(|vals| vals.first())
            .map(|s| s.as_str())
    }

    /// Render the entry as an indented listing, one value per line.
    ///
    /// ```text
    /// dn: uid=tesla,dc=example,dc=com
    ///   mail:
    ///     tesla@ldap.forumsys.com
    /// ```
    pub fn pretty(&self, indent: usize) -> String {
        let pad = " ".repeat(indent);
        let mut out = String::new();
        let _ = writeln!(out, "dn: {}", self.dn);
        for (name, values) in &self.attributes {
            let _ = writeln!(out, "{pad}{name}:");
            for value in values {
                let _ = writeln!(out, "{pad}{pad}{value}");
            }
        }
        out
    }
}
