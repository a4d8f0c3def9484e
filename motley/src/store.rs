/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Federated reads across several backends.
//!
//! Each [`Store`] pairs a backend with the root item it is
//! authoritative for. A reference is routed to the first store whose
//! root contains it. Roots are expected not to overlap; when they do,
//! the earlier store shadows the later one and a warning is logged at
//! initialization.

use std::sync::Arc;

use tracing::Span;

use crate::config::Env;
use crate::config::Limits;
use crate::config::StorageConfig;
use crate::iri::Iri;
use crate::item::Item;
use crate::storage;
use crate::storage::Backend;
use crate::storage::Filters;
use crate::storage::StorageError;

/// A backend paired with the subtree it serves.
#[derive(Debug, Clone)]
pub struct Store {
    root: Item,
    backend: Arc<dyn Backend>,
}

impl Store {
    pub fn new(root: Item, backend: Arc<dyn Backend>) -> Self {
        Self { root, backend }
    }

    pub fn root(&self) -> &Item {
        &self.root
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    /// Whether `iri` falls inside this store's subtree.
    pub fn owns(&self, iri: &Iri) -> bool {
        iri.contains_under(self.root.id())
    }
}

/// Routes loads to the store that owns each reference.
///
/// The store list is fixed after construction, so a router can be
/// shared across tasks behind an `Arc`.
#[derive(Debug)]
pub struct StoreRouter {
    stores: Vec<Store>,
    span: Span,
}

impl StoreRouter {
    pub fn from_stores(stores: Vec<Store>, span: Span) -> Self {
        for (i, earlier) in stores.iter().enumerate() {
            for later in &stores[i + 1..] {
                if later.owns(earlier.root.id()) || earlier.owns(later.root.id()) {
                    tracing::warn!(
                        parent: &span,
                        first = %earlier.root.id(),
                        second = %later.root.id(),
                        "overlapping store roots; the first one wins"
                    );
                }
            }
        }
        Self { stores, span }
    }

    /// Open one backend per (storage, root) pair and load each root.
    ///
    /// Pairs whose backend cannot be opened or whose root cannot be
    /// loaded are dropped. Only an unsupported storage type fails.
    pub async fn initialize(
        roots: &[Iri],
        configs: &[StorageConfig],
        env: Env,
        limits: Limits,
        span: Span,
    ) -> Result<Self, StorageError> {
        Self::initialize_with(roots, configs, span, |config, root| {
            storage::open(config, env, root, &limits)
        })
        .await
    }

    /// Like [`StoreRouter::initialize`], with a custom backend opener.
    pub async fn initialize_with<F>(
        roots: &[Iri],
        configs: &[StorageConfig],
        span: Span,
        open: F,
    ) -> Result<Self, StorageError>
    where
        F: Fn(&StorageConfig, &Iri) -> Result<Arc<dyn Backend>, StorageError>,
    {
        let mut stores = Vec::new();
        for config in configs {
            for root in roots {
                let backend = match open(config, root) {
                    Ok(backend) => backend,
                    Err(err @ StorageError::NotImplemented(_)) => return Err(err),
                    Err(err) => {
                        tracing::warn!(
                            parent: &span,
                            root = %root,
                            storage = %config.kind,
                            path = %config.path.display(),
                            error = %err,
                            "unable to open storage"
                        );
                        continue;
                    }
                };
                match backend.load(root, &Filters::default()).await {
                    Ok(Item::Collection(col)) => {
                        tracing::info!(
                            parent: &span,
                            root = %root,
                            count = col.items.len(),
                            "root is a collection, adding a store per element"
                        );
                        stores.extend(
                            col.items
                                .into_iter()
                                .map(|item| Store::new(item, Arc::clone(&backend))),
                        );
                    }
                    Ok(item) => {
                        tracing::info!(
                            parent: &span,
                            root = %root,
                            backend = %backend.describe(),
                            "added store"
                        );
                        stores.push(Store::new(item, backend));
                    }
                    Err(err) => {
                        tracing::warn!(
                            parent: &span,
                            root = %root,
                            backend = %backend.describe(),
                            error = %err,
                            "unable to load store root"
                        );
                    }
                }
            }
        }
        Ok(Self::from_stores(stores, span))
    }

    /// Load `iri` from the first store that owns it.
    pub async fn load(&self, iri: &Iri, filters: &Filters) -> Result<Item, StorageError> {
        let Some(store) = self.store_for(iri) else {
            tracing::debug!(parent: &self.span, iri = %iri, "no store owns reference");
            return Err(StorageError::NotFound(iri.clone()));
        };
        tracing::trace!(
            parent: &self.span,
            iri = %iri,
            backend = %store.backend.describe(),
            ?filters,
            "load"
        );
        store.backend.load(iri, filters).await
    }

    pub fn store_for(&self, iri: &Iri) -> Option<&Store> {
        self.stores.iter().find(|store| store.owns(iri))
    }

    pub fn stores(&self) -> &[Store] {
        &self.stores
    }

    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }
}
