/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Filesystem storage.
//!
//! Each item lives in a directory mirroring its URL path, as a JSON
//! document named `__raw`:
//!
//! ```text
//! <base>/actors/alice/__raw
//! <base>/actors/alice/outbox/__raw
//! <base>/objects/1/__raw
//! ```
//!
//! The base may also be one level up, with a directory per host.
//! A directory that has no document of its own is served as an
//! `OrderedCollection` of its child items, in name order.

use std::io::ErrorKind;
use std::path::Path;
use std::path::PathBuf;

use async_trait::async_trait;

use super::Backend;
use super::Filters;
use super::StorageError;
use super::page_items;
use crate::iri::Iri;
use crate::item::Collection;
use crate::item::CollectionKind;
use crate::item::Item;
use crate::item::Object;

/// Name of the document holding an item's JSON.
pub const RAW_FILE: &str = "__raw";

#[derive(Debug, Clone)]
pub struct FsBackend {
    base: PathBuf,
    page_size: usize,
}

impl FsBackend {
    /// Open storage rooted at `base`. The directory must exist.
    pub fn open(base: PathBuf, page_size: usize) -> Result<Self, StorageError> {
        if !base.is_dir() {
            return Err(StorageError::Io {
                source: std::io::Error::new(ErrorKind::NotFound, "storage directory missing"),
                path: base,
            });
        }
        Ok(Self {
            base,
            page_size: page_size.max(1),
        })
    }

    /// Candidate directories for `iri`, host-less layout first.
    fn item_dirs(&self, iri: &Iri) -> Option<Vec<PathBuf>> {
        let path = iri.path();
        let mut relative = PathBuf::new();
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            if segment == ".." || segment == "." {
                return None;
            }
            relative.push(segment);
        }
        let mut dirs = vec![self.base.join(&relative)];
        if let Some(host) = iri.host() {
            dirs.push(self.base.join(host).join(&relative));
        }
        Some(dirs)
    }

    async fn read_document(&self, iri: &Iri, path: &Path) -> Result<Option<Item>, StorageError> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Item::from_slice(&bytes)
                .map(Some)
                .map_err(|source| StorageError::Decode {
                    iri: iri.clone(),
                    source,
                }),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    async fn list_children(&self, iri: &Iri, dir: &Path) -> Result<Vec<Item>, StorageError> {
        let io_err = |source| StorageError::Io {
            path: dir.to_path_buf(),
            source,
        };
        let mut entries = tokio::fs::read_dir(dir).await.map_err(io_err)?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
            if entry.path().join(RAW_FILE).is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names
            .iter()
            .map(|name| Item::Reference(iri.join_segment(name)))
            .collect())
    }

    fn page(&self, mut col: Box<Collection>, filters: &Filters) -> Item {
        let total = col.total_items.max(col.items.len());
        col.items = page_items(&col.items, filters, self.page_size);
        col.total_items = total;
        Item::Collection(col)
    }
}

#[async_trait]
impl Backend for FsBackend {
    async fn load(&self, iri: &Iri, filters: &Filters) -> Result<Item, StorageError> {
        let iri = iri.without_query();
        let dirs = self
            .item_dirs(&iri)
            .ok_or_else(|| StorageError::NotFound(iri.clone()))?;

        for dir in &dirs {
            if let Some(item) = self.read_document(&iri, &dir.join(RAW_FILE)).await? {
                tracing::trace!(iri = %iri, path = %dir.display(), "loaded document");
                return Ok(match item {
                    Item::Collection(col) => self.page(col, filters),
                    other => other,
                });
            }
        }

        for dir in &dirs {
            if dir.is_dir() {
                let items = self.list_children(&iri, dir).await?;
                let col = Collection {
                    object: Object {
                        id: iri.clone(),
                        kind: CollectionKind::OrderedCollection.as_str().to_string(),
                        ..Default::default()
                    },
                    kind: CollectionKind::OrderedCollection,
                    total_items: items.len(),
                    items,
                    ..Default::default()
                };
                return Ok(self.page(Box::new(col), filters));
            }
        }

        Err(StorageError::NotFound(iri))
    }

    fn describe(&self) -> String {
        format!("fs:{}", self.base.display())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use serde_json::json;

    use super::*;

    fn write_item(base: &Path, path: &str, value: serde_json::Value) {
        let dir = base.join(path.trim_start_matches('/'));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(RAW_FILE), serde_json::to_vec(&value).unwrap()).unwrap();
    }

    #[tokio::test]
    async fn loads_stored_document() {
        let dir = tempfile::tempdir().unwrap();
        write_item(
            dir.path(),
            "actors/alice",
            json!({ "id": "https://example.com/actors/alice", "type": "Person" }),
        );
        let backend = FsBackend::open(dir.path().to_path_buf(), 50).unwrap();
        let item = backend
            .load(&"https://example.com/actors/alice".into(), &Filters::default())
            .await
            .unwrap();
        assert_eq!(item.type_name(), "Person");
    }

    #[tokio::test]
    async fn loads_from_host_directory() {
        let dir = tempfile::tempdir().unwrap();
        write_item(
            dir.path(),
            "example.com/objects/1",
            json!({ "id": "https://example.com/objects/1", "type": "Note" }),
        );
        let backend = FsBackend::open(dir.path().to_path_buf(), 50).unwrap();
        let item = backend
            .load(&"https://example.com/objects/1".into(), &Filters::default())
            .await
            .unwrap();
        assert_eq!(item.type_name(), "Note");
    }

    #[tokio::test]
    async fn directory_is_served_as_collection_page() {
        let dir = tempfile::tempdir().unwrap();
        for i in 1..=5 {
            write_item(
                dir.path(),
                &format!("objects/{}", i),
                json!({ "id": format!("https://example.com/objects/{}", i), "type": "Note" }),
            );
        }
        let backend = FsBackend::open(dir.path().to_path_buf(), 2).unwrap();
        let first = backend
            .load(&"https://example.com/objects".into(), &Filters::default())
            .await
            .unwrap();
        let col = first.as_collection().unwrap();
        assert_eq!(col.total_items, 5);
        assert_eq!(col.items.len(), 2);

        let next = backend
            .load(
                &"https://example.com/objects".into(),
                &Filters::default().with_after(col.items[1].id().clone()),
            )
            .await
            .unwrap();
        let col = next.as_collection().unwrap();
        assert_eq!(col.items[0].id().as_str(), "https://example.com/objects/3");
    }

    #[tokio::test]
    async fn missing_item_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FsBackend::open(dir.path().to_path_buf(), 50).unwrap();
        let err = backend
            .load(&"https://example.com/objects/9".into(), &Filters::default())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn parent_segments_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FsBackend::open(dir.path().to_path_buf(), 50).unwrap();
        let err = backend
            .load(&"objects/../../etc".into(), &Filters::default())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn missing_base_fails_to_open() {
        assert!(FsBackend::open(PathBuf::from("/nonexistent/motley"), 50).is_err());
    }
}
