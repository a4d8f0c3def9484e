/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Cursor-following pagination.
//!
//! A [`Collector`] loads a collection and keeps loading the following
//! page until it has accumulated the configured maximum, or the
//! collection runs out of pages. Each page's cursor is only known
//! once the previous page has arrived, so pages are fetched strictly
//! one after another, each as a task in the collector's join set.
//!
//! Cursors follow two conventions:
//! - explicit pages (`CollectionPage`, `OrderedCollectionPage`) carry
//!   `next`/`prev` links whose `after`/`before` query parameters are
//!   the cursors;
//! - flat collections are continued after their last element, as long
//!   as `totalItems` says more remain.
//!
//! Follow-up pages are always requested from the collection's own
//! reference, with the cursor passed in [`Filters`].

use std::collections::HashSet;
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::Span;

use crate::iri::Iri;
use crate::item::Collection;
use crate::item::Item;
use crate::scope::Scope;
use crate::scope::ScopeError;
use crate::storage::Filters;
use crate::storage::StorageError;
use crate::store::StoreRouter;

/// Upper bound on pages fetched for one collection, far above any
/// legitimate depth.
pub const MAX_PAGES: usize = 1024;

/// Outcome of absorbing one page.
#[derive(Debug)]
pub enum PageFetch {
    /// Load the page after this cursor.
    Continue(Iri),
    /// Pagination ended normally.
    Stop(Termination),
    /// The page could not be loaded.
    Failed(StorageError),
}

/// Why pagination stopped. None of these are errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The configured maximum was reached.
    Limit,
    /// No further cursor.
    Exhausted,
    /// The next cursor was already consumed, or points at the page
    /// itself.
    CursorLoop,
    /// The reference resolved to a single non-collection item.
    SingleItem,
    /// [`MAX_PAGES`] pages were fetched.
    PageCap,
}

/// The cursors adjacent to one page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cursors {
    pub prev: Option<Iri>,
    pub next: Option<Iri>,
}

/// Compute the cursors for `page`, given that `seen` elements of the
/// collection (including this page's) have been loaded so far.
pub fn page_cursors(page: &Collection, seen: usize) -> Cursors {
    let link_param = |link: &Option<Item>, param: &str| {
        link.as_ref()
            .and_then(|item| item.id().query_param(param))
            .filter(|cursor| !cursor.is_empty())
            .map(Iri::from)
    };

    let mut cursors = if page.kind.is_page() {
        let more = page.total_items == 0 || page.total_items > seen;
        Cursors {
            prev: link_param(&page.prev, "before"),
            next: link_param(&page.next, "after").filter(|_| more),
        }
    } else {
        Cursors {
            prev: None,
            next: page
                .items
                .last()
                .filter(|_| page.total_items > seen)
                .map(|last| last.id().clone())
                .filter(|id| !id.is_empty()),
        }
    };

    if let Some(next) = &cursors.next
        && page.id().query_param("after").as_deref() == Some(next.as_str())
    {
        cursors.next = None;
    }
    cursors
}

/// What a pagination run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectSummary {
    /// Pages absorbed, including a preloaded first page.
    pub pages: usize,
    /// Items handed to the accumulator.
    pub accumulated: usize,
    pub termination: Termination,
    /// The first loaded item, with its first-page elements.
    pub head: Option<Item>,
    /// The `prev` cursor of the first page, when it had one.
    pub prev: Option<Iri>,
}

#[derive(Debug, thiserror::Error)]
pub enum CollectError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Scope(#[from] ScopeError),

    #[error("load task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

struct Progress {
    pages: usize,
    seen: usize,
    accumulated: usize,
    consumed: HashSet<Iri>,
    head: Option<Item>,
    prev: Option<Iri>,
}

/// Accumulates collection elements across pages, up to a bound.
#[derive(Debug, Clone)]
pub struct Collector {
    router: Arc<StoreRouter>,
    max_items: usize,
    span: Span,
}

impl Collector {
    pub fn new(router: Arc<StoreRouter>, max_items: usize, span: Span) -> Self {
        Self {
            router,
            max_items: max_items.max(1),
            span,
        }
    }

    pub fn max_items(&self) -> usize {
        self.max_items
    }

    /// A single bounded load of `iri`: the item itself, or the first
    /// page of a collection.
    pub async fn load_one(&self, scope: &Scope, iri: &Iri) -> Result<Item, CollectError> {
        let item = scope.run(self.router.load(iri, &Filters::default())).await??;
        Ok(item)
    }

    /// Load `iri` and hand its elements to `accumulate`, following
    /// `next` cursors until the maximum is reached or the collection
    /// is exhausted. A non-collection item is handed over as is.
    pub async fn collect<A>(
        &self,
        scope: &Scope,
        iri: &Iri,
        filters: Filters,
        accumulate: A,
    ) -> Result<CollectSummary, CollectError>
    where
        A: FnMut(Item),
    {
        self.paginate(scope, iri.without_query(), filters, None, accumulate)
            .await
    }

    /// Like [`Collector::collect`], for a collection whose first page
    /// was already loaded: `head` is absorbed as that page and only
    /// the pages after it are requested.
    pub async fn collect_from<A>(
        &self,
        scope: &Scope,
        head: Item,
        filters: Filters,
        accumulate: A,
    ) -> Result<CollectSummary, CollectError>
    where
        A: FnMut(Item),
    {
        let base = head.id().without_query();
        self.paginate(scope, base, filters, Some(head), accumulate)
            .await
    }

    async fn paginate<A>(
        &self,
        scope: &Scope,
        base: Iri,
        filters: Filters,
        head: Option<Item>,
        mut accumulate: A,
    ) -> Result<CollectSummary, CollectError>
    where
        A: FnMut(Item),
    {
        let mut progress = Progress {
            pages: 0,
            seen: 0,
            accumulated: 0,
            consumed: HashSet::new(),
            head: None,
            prev: None,
        };

        let mut tasks = JoinSet::new();
        let mut loaded = head.map(Ok);
        if loaded.is_none() {
            self.spawn_load(&mut tasks, base.clone(), filters.clone());
        }

        let termination = loop {
            let page = match loaded.take() {
                Some(page) => page,
                None => match scope.run(tasks.join_next()).await? {
                    Some(joined) => joined?,
                    None => break Termination::Exhausted,
                },
            };
            progress.pages += 1;
            match self.absorb(page, &mut progress, &mut accumulate) {
                PageFetch::Continue(next) => {
                    if progress.pages >= MAX_PAGES {
                        tracing::warn!(parent: &self.span, iri = %base, pages = progress.pages, "page cap reached");
                        break Termination::PageCap;
                    }
                    progress.consumed.insert(next.clone());
                    tracing::trace!(parent: &self.span, iri = %base, after = %next, "following cursor");
                    self.spawn_load(&mut tasks, base.clone(), filters.clone().with_after(next));
                }
                PageFetch::Stop(termination) => break termination,
                PageFetch::Failed(err) => {
                    tracing::debug!(parent: &self.span, iri = %base, error = %err, "page load failed");
                    return Err(err.into());
                }
            }
        };

        tracing::debug!(
            parent: &self.span,
            iri = %base,
            pages = progress.pages,
            accumulated = progress.accumulated,
            ?termination,
            "collected"
        );
        Ok(CollectSummary {
            pages: progress.pages,
            accumulated: progress.accumulated,
            termination,
            head: progress.head,
            prev: progress.prev,
        })
    }

    fn spawn_load(
        &self,
        tasks: &mut JoinSet<Result<Item, StorageError>>,
        iri: Iri,
        filters: Filters,
    ) {
        let router = Arc::clone(&self.router);
        tasks.spawn(async move { router.load(&iri, &filters).await });
    }

    fn absorb<A>(
        &self,
        loaded: Result<Item, StorageError>,
        progress: &mut Progress,
        accumulate: &mut A,
    ) -> PageFetch
    where
        A: FnMut(Item),
    {
        let page = match loaded {
            Ok(Item::Collection(page)) => page,
            Ok(item) => {
                if progress.head.is_none() {
                    progress.head = Some(item.clone());
                }
                accumulate(item);
                progress.accumulated += 1;
                return PageFetch::Stop(Termination::SingleItem);
            }
            Err(err) => return PageFetch::Failed(err),
        };

        if progress.head.is_none() {
            progress.head = Some(Item::Collection(page.clone()));
        }
        progress.seen += page.items.len();
        let cursors = page_cursors(&page, progress.seen);
        if progress.pages == 1 {
            progress.prev = cursors.prev.clone();
        }

        for item in page.items {
            if progress.accumulated >= self.max_items {
                break;
            }
            accumulate(item);
            progress.accumulated += 1;
        }
        if progress.accumulated >= self.max_items {
            return PageFetch::Stop(Termination::Limit);
        }

        match cursors.next {
            None => PageFetch::Stop(Termination::Exhausted),
            Some(next) if progress.consumed.contains(&next) => {
                PageFetch::Stop(Termination::CursorLoop)
            }
            Some(next) => PageFetch::Continue(next),
        }
    }
}
