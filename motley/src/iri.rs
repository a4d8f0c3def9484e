/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! References into the federated object graph.
//!
//! An [`Iri`] is kept as the string a backend handed us. Parsing is
//! done on demand: containment checks, cursor extraction and display
//! naming each parse only the parts they need, and fall back to plain
//! string handling when the reference is not a valid URL.

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use url::Url;

/// The ActivityStreams public collection. Never dereferenced.
pub const PUBLIC_NS: &str = "https://www.w3.org/ns/activitystreams#Public";

/// Last path segments that name a collection, either from the
/// ActivityPub vocabulary or from FedBOX's top-level collections.
pub const COLLECTION_NAMES: &[&str] = &[
    "inbox",
    "outbox",
    "followers",
    "following",
    "liked",
    "likes",
    "shares",
    "replies",
    "blocked",
    "ignored",
    "streams",
    "actors",
    "activities",
    "objects",
];

/// A reference to an item in the object graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Iri(String);

impl Iri {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub const fn empty() -> Self {
        Self(String::new())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether this is the public audience sentinel.
    pub fn is_public(&self) -> bool {
        matches!(self.0.as_str(), PUBLIC_NS | "as:Public" | "Public")
    }

    /// Whether `self` lies within the subtree rooted at `root`.
    ///
    /// Scheme and host compare case-insensitively, ports must match,
    /// and the path must equal `root`'s path or extend it on a segment
    /// boundary. Query and fragment are ignored.
    pub fn contains_under(&self, root: &Iri) -> bool {
        match (Url::parse(&self.0), Url::parse(&root.0)) {
            (Ok(this), Ok(root)) => {
                if this.scheme() != root.scheme()
                    || this.host_str().map(str::to_ascii_lowercase)
                        != root.host_str().map(str::to_ascii_lowercase)
                    || this.port_or_known_default() != root.port_or_known_default()
                {
                    return false;
                }
                path_under(this.path(), root.path())
            }
            _ => path_under(strip_query(&self.0), strip_query(&root.0)),
        }
    }

    /// The last non-empty path segment, or `""` if there is none.
    pub fn last_segment(&self) -> &str {
        let path = match self.0.find("://") {
            Some(idx) => {
                let rest = &self.0[idx + 3..];
                rest.find('/').map_or("", |p| &rest[p..])
            }
            None => self.0.as_str(),
        };
        strip_query(path)
            .split('/')
            .rfind(|segment| !segment.is_empty())
            .unwrap_or("")
    }

    /// Value of the named query parameter, if present.
    pub fn query_param(&self, name: &str) -> Option<String> {
        let url = Url::parse(&self.0).ok()?;
        url.query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    }

    /// The reference with its query string and fragment removed.
    pub fn without_query(&self) -> Iri {
        Iri::new(strip_query(&self.0))
    }

    /// The collection name this reference ends with, when it follows
    /// the collection-naming convention.
    pub fn collection_name(&self) -> Option<&'static str> {
        let last = self.last_segment();
        COLLECTION_NAMES
            .iter()
            .copied()
            .find(|name| name.eq_ignore_ascii_case(last))
    }

    pub fn host(&self) -> Option<String> {
        Url::parse(&self.0)
            .ok()
            .and_then(|url| url.host_str().map(str::to_ascii_lowercase))
    }

    /// The URL path, without query, always starting with `/`.
    pub fn path(&self) -> String {
        match Url::parse(&self.0) {
            Ok(url) => url.path().to_string(),
            Err(_) => format!("/{}", strip_query(&self.0).trim_start_matches('/')),
        }
    }

    /// Append a path segment.
    pub fn join_segment(&self, segment: &str) -> Iri {
        let base = strip_query(&self.0).trim_end_matches('/');
        Iri::new(format!("{}/{}", base, segment))
    }
}

fn strip_query(s: &str) -> &str {
    let end = s.find(['?', '#']).unwrap_or(s.len());
    &s[..end]
}

fn path_under(path: &str, root: &str) -> bool {
    let root = root.trim_end_matches('/');
    if root.is_empty() {
        return true;
    }
    match path.strip_prefix(root) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

impl fmt::Display for Iri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Iri {
    fn from(s: &str) -> Self {
        Iri::new(s)
    }
}

impl From<String> for Iri {
    fn from(s: String) -> Self {
        Iri(s)
    }
}

impl AsRef<str> for Iri {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_requires_segment_boundary() {
        let root = Iri::from("https://example.com/actors");
        assert!(Iri::from("https://example.com/actors").contains_under(&root));
        assert!(Iri::from("https://example.com/actors/alice").contains_under(&root));
        assert!(Iri::from("https://example.com/actors/alice?after=x").contains_under(&root));
        assert!(!Iri::from("https://example.com/actorsx").contains_under(&root));
        assert!(!Iri::from("https://example.com/objects/1").contains_under(&root));
    }

    #[test]
    fn contains_ignores_host_case_and_trailing_slash() {
        let root = Iri::from("https://Example.COM/");
        assert!(Iri::from("https://example.com/objects/1").contains_under(&root));
        assert!(!Iri::from("https://other.com/objects/1").contains_under(&root));
        assert!(!Iri::from("http://example.com/objects/1").contains_under(&root));
    }

    #[test]
    fn last_segment_skips_query_and_trailing_slash() {
        assert_eq!(Iri::from("https://example.com/actors/alice/").last_segment(), "alice");
        assert_eq!(
            Iri::from("https://example.com/outbox?after=abc").last_segment(),
            "outbox"
        );
        assert_eq!(Iri::from("https://example.com").last_segment(), "");
        assert_eq!(Iri::from("https://example.com/").last_segment(), "");
    }

    #[test]
    fn query_param_decodes_value() {
        let iri = Iri::from("https://example.com/outbox?after=https%3A%2F%2Fexample.com%2Fo%2F1");
        assert_eq!(
            iri.query_param("after").as_deref(),
            Some("https://example.com/o/1")
        );
        assert_eq!(iri.query_param("before"), None);
    }

    #[test]
    fn public_sentinel_forms() {
        assert!(Iri::from(PUBLIC_NS).is_public());
        assert!(Iri::from("as:Public").is_public());
        assert!(!Iri::from("https://example.com/public").is_public());
    }

    #[test]
    fn collection_names_are_detected() {
        assert_eq!(
            Iri::from("https://example.com/actors/alice/outbox").collection_name(),
            Some("outbox")
        );
        assert_eq!(Iri::from("https://example.com/Objects").collection_name(), Some("objects"));
        assert_eq!(Iri::from("https://example.com/objects/1").collection_name(), None);
    }

    #[test]
    fn join_segment_drops_query() {
        let iri = Iri::from("https://example.com/outbox/?after=1");
        assert_eq!(iri.join_segment("2").as_str(), "https://example.com/outbox/2");
    }
}
