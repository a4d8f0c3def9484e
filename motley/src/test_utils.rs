/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! In-memory fixtures shared by the library and binary tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::iri::Iri;
use crate::item::Collection;
use crate::item::CollectionKind;
use crate::item::Item;
use crate::item::Object;
use crate::storage::Backend;
use crate::storage::Filters;
use crate::storage::StorageError;
use crate::storage::page_items;
use crate::store::Store;
use crate::store::StoreRouter;

#[derive(Debug, Clone, Copy)]
enum Failure {
    NotFound,
    Unreachable,
}

/// A backend serving items from memory and counting every load.
///
/// Flat collections are paged like the filesystem backend: `after`
/// and `before` cursors select by element reference and each page
/// holds at most `page_size` elements. Explicit page shapes are
/// returned untouched, keyed by the `after` cursor in their id so a
/// chain of pages can be served one link at a time.
#[derive(Debug)]
pub struct MockBackend {
    items: Mutex<HashMap<Iri, Item>>,
    failures: Mutex<HashMap<Iri, Failure>>,
    calls: Mutex<HashMap<Iri, usize>>,
    loads: Mutex<Vec<(Iri, Filters)>>,
    page_size: usize,
    delay: Option<Duration>,
}

impl MockBackend {
    pub fn new(page_size: usize) -> Self {
        Self {
            items: Mutex::new(HashMap::new()),
            failures: Mutex::new(HashMap::new()),
            calls: Mutex::new(HashMap::new()),
            loads: Mutex::new(Vec::new()),
            page_size,
            delay: None,
        }
    }

    /// Sleep for `delay` before answering each load.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Store `item` under its own reference. Explicit pages keep their
    /// `after` cursor in the key.
    pub fn insert(&self, item: Item) {
        let base = item.id().without_query();
        let key = match item.id().query_param("after") {
            Some(after) if item.as_collection().is_some_and(|col| col.kind.is_page()) => {
                page_key(&base, &after)
            }
            _ => base,
        };
        self.insert_at(key, item);
    }

    /// Store `item` under an explicit reference.
    pub fn insert_at(&self, iri: impl Into<Iri>, item: Item) {
        self.items.lock().unwrap().insert(iri.into(), item);
    }

    pub fn insert_json(&self, value: Value) {
        self.insert(Item::from_value(&value).unwrap());
    }

    pub fn fail_not_found(&self, iri: impl Into<Iri>) {
        self.failures
            .lock()
            .unwrap()
            .insert(iri.into(), Failure::NotFound);
    }

    pub fn fail_unreachable(&self, iri: impl Into<Iri>) {
        self.failures
            .lock()
            .unwrap()
            .insert(iri.into(), Failure::Unreachable);
    }

    /// Stop failing loads of `iri`.
    pub fn heal(&self, iri: impl Into<Iri>) {
        self.failures.lock().unwrap().remove(&iri.into());
    }

    /// Number of loads issued for `iri`, across all filters.
    pub fn calls(&self, iri: impl Into<Iri>) -> usize {
        self.calls
            .lock()
            .unwrap()
            .get(&iri.into())
            .copied()
            .unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    /// Every load issued, in order.
    pub fn loads(&self) -> Vec<(Iri, Filters)> {
        self.loads.lock().unwrap().clone()
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn load(&self, iri: &Iri, filters: &Filters) -> Result<Item, StorageError> {
        let key = iri.without_query();
        *self.calls.lock().unwrap().entry(key.clone()).or_default() += 1;
        self.loads
            .lock()
            .unwrap()
            .push((key.clone(), filters.clone()));

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let failure = self.failures.lock().unwrap().get(&key).copied();
        match failure {
            Some(Failure::NotFound) => return Err(StorageError::NotFound(key)),
            Some(Failure::Unreachable) => {
                return Err(StorageError::Unreachable {
                    iri: key,
                    reason: "injected failure".to_string(),
                });
            }
            None => {}
        }

        let item = {
            let items = self.items.lock().unwrap();
            filters
                .after
                .as_ref()
                .and_then(|after| items.get(&page_key(&key, after.as_str())))
                .or_else(|| items.get(&key))
                .cloned()
        }
        .ok_or_else(|| StorageError::NotFound(key.clone()))?;
        Ok(match item {
            Item::Collection(mut col) if !col.kind.is_page() => {
                col.total_items = col.total_items.max(col.items.len());
                col.items = page_items(&col.items, filters, self.page_size);
                Item::Collection(col)
            }
            other => other,
        })
    }

    fn describe(&self) -> String {
        "mock".to_string()
    }
}

fn page_key(base: &Iri, after: &str) -> Iri {
    Iri::new(format!("{}?after={}", base, after))
}

/// A router with a single store rooted at `root`.
pub fn router_for(root: &str, backend: Arc<MockBackend>) -> Arc<StoreRouter> {
    Arc::new(StoreRouter::from_stores(
        vec![Store::new(Item::Reference(Iri::from(root)), backend)],
        tracing::Span::none(),
    ))
}

/// A bare `Note` object.
pub fn note(id: &str) -> Item {
    Item::Object(Box::new(Object {
        id: Iri::from(id),
        kind: "Note".to_string(),
        ..Default::default()
    }))
}

/// An `OrderedCollection` at `id` holding `n` note references
/// `<id>/1 ..= <id>/n`.
pub fn ordered_collection(id: &str, n: usize) -> Item {
    let base = Iri::from(id);
    let items = (1..=n)
        .map(|i| Item::Reference(base.join_segment(&i.to_string())))
        .collect::<Vec<_>>();
    Item::Collection(Box::new(Collection {
        object: Object {
            id: base,
            kind: "OrderedCollection".to_string(),
            ..Default::default()
        },
        kind: CollectionKind::OrderedCollection,
        total_items: n,
        items,
        ..Default::default()
    }))
}
