/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! The read-only backend contract and backend discovery.
//!
//! A [`Backend`] resolves one reference at a time. Collections are
//! returned one page at a time, honouring the cursor [`Filters`]; the
//! caller decides whether to follow further pages.

pub mod fs;
pub mod http;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::config::Env;
use crate::config::Limits;
use crate::config::StorageConfig;
use crate::config::StorageType;
use crate::iri::Iri;
use crate::item::DecodeError;
use crate::item::Item;

/// Cursor and size constraints for a single load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Filters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<Iri>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before: Option<Iri>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_items: Option<usize>,
}

impl Filters {
    pub fn with_after(mut self, after: Iri) -> Self {
        self.after = Some(after);
        self
    }

    pub fn with_before(mut self, before: Iri) -> Self {
        self.before = Some(before);
        self
    }

    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = Some(max_items);
        self
    }
}

/// Backend failure modes.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("not found: {0}")]
    NotFound(Iri),

    #[error("unreachable {iri}: {reason}")]
    Unreachable { iri: Iri, reason: String },

    #[error("reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid item at {iri}: {source}")]
    Decode {
        iri: Iri,
        #[source]
        source: DecodeError,
    },

    #[error("{0} storage is not implemented")]
    NotImplemented(String),
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }
}

/// A read-only source of items.
#[async_trait]
pub trait Backend: Send + Sync + fmt::Debug {
    /// Load the item identified by `iri`. Collections come back as a
    /// single page selected by `filters`.
    async fn load(&self, iri: &Iri, filters: &Filters) -> Result<Item, StorageError>;

    /// Short human-readable description, used in logs.
    fn describe(&self) -> String;
}

/// Instantiate the backend described by `config` for the given root.
pub fn open(
    config: &StorageConfig,
    env: Env,
    root: &Iri,
    limits: &Limits,
) -> Result<Arc<dyn Backend>, StorageError> {
    match config.kind {
        StorageType::Fs => {
            let base = config.base_path(env, root.host().as_deref());
            Ok(Arc::new(fs::FsBackend::open(base, limits.page_size)?))
        }
        StorageType::Http => Ok(Arc::new(http::HttpBackend::new(limits.http_timeout)?)),
        StorageType::BoltDb | StorageType::Badger | StorageType::Sqlite => {
            Err(StorageError::NotImplemented(config.kind.to_string()))
        }
    }
}

/// Select the page of `items` described by `filters`.
///
/// Elements are matched to cursors by reference. `after` skips up to
/// and including the cursor, `before` stops short of it, and the result
/// is truncated to `max_items` (or `page_size` when unset).
pub fn page_items(items: &[Item], filters: &Filters, page_size: usize) -> Vec<Item> {
    let start = match &filters.after {
        Some(after) => items
            .iter()
            .position(|it| it.id() == after)
            .map_or(items.len(), |idx| idx + 1),
        None => 0,
    };
    let end = match &filters.before {
        Some(before) => items
            .iter()
            .position(|it| it.id() == before)
            .unwrap_or(items.len()),
        None => items.len(),
    };
    let limit = filters.max_items.unwrap_or(page_size).max(1);
    items
        .get(start..end.max(start))
        .unwrap_or_default()
        .iter()
        .take(limit)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn refs(n: usize) -> Vec<Item> {
        (1..=n)
            .map(|i| Item::Reference(Iri::new(format!("https://e/o/{}", i))))
            .collect()
    }

    #[test]
    fn page_items_follows_after_cursor() {
        let items = refs(10);
        let page = page_items(&items, &Filters::default().with_after("https://e/o/3".into()), 4);
        let ids: Vec<_> = page.iter().map(|i| i.id().as_str().to_string()).collect();
        assert_eq!(ids, ["https://e/o/4", "https://e/o/5", "https://e/o/6", "https://e/o/7"]);
    }

    #[test]
    fn page_items_unknown_cursor_is_empty() {
        let items = refs(3);
        let page = page_items(&items, &Filters::default().with_after("https://e/o/x".into()), 10);
        assert!(page.is_empty());
    }

    #[test]
    fn page_items_before_and_max() {
        let items = refs(10);
        let filters = Filters::default()
            .with_before("https://e/o/5".into())
            .with_max_items(2);
        let page = page_items(&items, &filters, 50);
        assert_eq!(page.len(), 2);
        assert_eq!(page[1].id().as_str(), "https://e/o/2");
    }

    #[test]
    fn filters_serialize_as_query() {
        let filters = Filters::default()
            .with_after("https://e/o/1".into())
            .with_max_items(5);
        let value = serde_json::to_value(&filters).unwrap();
        assert_eq!(
            value,
            serde_json::json!({ "after": "https://e/o/1", "maxItems": 5 })
        );
    }

    #[test]
    fn unsupported_backends_are_not_implemented() {
        let cfg = StorageConfig {
            kind: StorageType::Sqlite,
            path: PathBuf::from("/nonexistent"),
        };
        let err = open(&cfg, Env::Dev, &Iri::from("https://e"), &Limits::default()).unwrap_err();
        assert!(matches!(err, StorageError::NotImplemented(_)));
    }
}
