/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Node sync driven from a single-threaded event loop.
//!
//! The [`Session`] owns all tree state. Loads never touch it: a sync
//! runs as a spawned task on a clone of the node's item and posts a
//! [`SyncEvent`] back over a channel. The loop hands each event to
//! [`Session::apply`], which is the only place a sync result is
//! committed.
//!
//! Each sync belongs to a cycle. Cancelling a sync (selecting another
//! node, going back, shutting down) clears the node's `SYNCING` flag,
//! so the late result is recognised as stale and dropped.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::Span;

use crate::collector::CollectError;
use crate::collector::CollectSummary;
use crate::collector::Collector;
use crate::collector::Termination;
use crate::config::Limits;
use crate::deref::DerefSummary;
use crate::deref::Dereferencer;
use crate::item::Item;
use crate::navigation::AdvanceRejected;
use crate::navigation::Navigator;
use crate::node::NodeId;
use crate::node::NodeState;
use crate::node::child_elements;
use crate::node::expands_as_collection;
use crate::node::is_collapsible_item;
use crate::scope::Scope;
use crate::scope::ScopeError;
use crate::storage::Filters;
use crate::store::StoreRouter;
use crate::tree::Forest;
use crate::tree::Tree;

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Collect(#[from] CollectError),

    #[error("sync {0}")]
    Scope(#[from] ScopeError),
}

/// What a successful sync produced for one node.
#[derive(Debug)]
pub struct Synced {
    /// The materialised, dereferenced item.
    pub item: Item,
    /// Children to commit, when the node had none yet.
    pub children: Option<Vec<(Item, Option<&'static str>)>>,
    pub pages: usize,
    pub termination: Option<Termination>,
    pub deref: DerefSummary,
}

/// Posted by a sync task when it finishes.
#[derive(Debug)]
pub struct SyncEvent {
    pub node: NodeId,
    pub cycle: u64,
    pub outcome: Result<Synced, SyncError>,
}

/// How [`Session::apply`] handled an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncReport {
    /// The result belonged to a cancelled or superseded sync.
    Stale,
    Synced { node: NodeId, children: usize },
    Failed { node: NodeId, message: String },
}

/// The work of one sync, detached from the session.
struct SyncJob {
    item: Item,
    has_children: bool,
    collector: Collector,
    deref: Dereferencer,
}

impl SyncJob {
    async fn run(self, scope: &Scope) -> Result<Synced, SyncError> {
        let mut item = self.item;

        // Materialise bare references that do not name a collection.
        let mut loaded = false;
        if let Item::Reference(iri) = &item
            && !iri.is_public()
            && !expands_as_collection(&item)
        {
            let iri = iri.clone();
            item = self.collector.load_one(scope, &iri).await?;
            loaded = true;
        }

        let mut collected: Option<(Vec<Item>, CollectSummary)> = None;
        if !self.has_children && expands_as_collection(&item) {
            let mut elements = Vec::new();
            let accumulate = |it: Item| elements.push(it);
            let summary = if loaded {
                // The first page is already here.
                self.collector
                    .collect_from(scope, item.clone(), Filters::default(), accumulate)
                    .await?
            } else {
                let iri = item.id().clone();
                self.collector
                    .collect(scope, &iri, Filters::default(), accumulate)
                    .await?
            };
            if item.is_reference()
                && let Some(head) = &summary.head
            {
                item = head.clone();
            }
            collected = Some((elements, summary));
        }

        let deref = self.deref.dereference(scope, &mut item).await?;

        let (children, pages, termination) = match collected {
            Some((elements, summary)) => {
                let resolved: HashMap<_, _> = item
                    .as_collection()
                    .map(|col| {
                        col.items
                            .iter()
                            .filter(|it| !it.is_reference())
                            .map(|it| (it.id().clone(), it.clone()))
                            .collect()
                    })
                    .unwrap_or_default();
                let children = elements
                    .into_iter()
                    .map(|element| {
                        let found = match &element {
                            Item::Reference(iri) => resolved.get(iri).cloned(),
                            _ => None,
                        };
                        (found.unwrap_or(element), None)
                    })
                    .collect();
                (Some(children), summary.pages, Some(summary.termination))
            }
            None if self.has_children => (None, 0, None),
            None => (Some(child_elements(&item)), 0, None),
        };

        Ok(Synced {
            item,
            children,
            pages,
            termination,
            deref,
        })
    }
}

/// Tree state plus the machinery that loads it.
#[derive(Debug)]
pub struct Session {
    forest: Forest,
    nav: Navigator,
    collector: Collector,
    deref: Dereferencer,
    sync_timeout: Duration,
    tx: mpsc::UnboundedSender<SyncEvent>,
    in_flight: Option<(NodeId, Scope)>,
    cycles: u64,
    span: Span,
}

impl Session {
    /// A session with one top-level node per store root.
    pub fn new(
        router: Arc<StoreRouter>,
        limits: Limits,
        span: Span,
    ) -> (Self, mpsc::UnboundedReceiver<SyncEvent>) {
        let mut forest = Forest::new();
        let roots = forest.insert_roots(router.stores().iter().map(|s| s.root().clone()));
        let collector = Collector::new(router, limits.max_items, span.clone());
        let deref = Dereferencer::new(collector.clone(), span.clone());
        let (tx, rx) = mpsc::unbounded_channel();
        let session = Self {
            forest,
            nav: Navigator::new(Tree::new(roots)),
            collector,
            deref,
            sync_timeout: limits.sync_timeout,
            tx,
            in_flight: None,
            cycles: 0,
            span,
        };
        (session, rx)
    }

    pub fn forest(&self) -> &Forest {
        &self.forest
    }

    pub fn tree(&self) -> &Tree {
        self.nav.current()
    }

    pub fn navigator(&self) -> &Navigator {
        &self.nav
    }

    pub fn selected(&self) -> Option<NodeId> {
        self.nav.current().selected()
    }

    /// The node whose sync is running, if any.
    pub fn syncing(&self) -> Option<NodeId> {
        self.in_flight.as_ref().map(|(id, _)| *id)
    }

    /// Select `id`, syncing it unless it already synced cleanly.
    /// Returns whether a sync was started.
    pub fn select(&mut self, id: NodeId) -> bool {
        if self.forest.get(id).is_none() {
            return false;
        }
        if let Some(prev) = self.selected()
            && prev != id
        {
            self.forest[prev].state.remove(NodeState::SELECTED);
        }
        if self.syncing().is_some_and(|busy| busy != id) {
            self.cancel_in_flight();
        }
        self.forest[id].state.insert(NodeState::SELECTED);
        self.nav.current_mut().set_selected(Some(id));
        self.sync_if_needed(id)
    }

    /// Flip a collapsible node between collapsed and expanded.
    /// Expanding a node that was never loaded syncs it.
    pub fn toggle(&mut self, id: NodeId) -> bool {
        let Some(node) = self.forest.get_mut(id) else {
            return false;
        };
        if !node.state.is_collapsible() {
            return false;
        }
        node.state.toggle(NodeState::COLLAPSED);
        if !node.state.is_collapsed() && node.children.is_none() {
            self.sync_if_needed(id);
        }
        true
    }

    pub fn collapse_all(&mut self) {
        let tree = self.nav.current().clone();
        tree.collapse_all(&mut self.forest);
    }

    /// Show `id` as the single root of a new view.
    pub fn advance(&mut self, id: NodeId) -> Result<(), AdvanceRejected> {
        if self.forest.get(id).is_some_and(|n| n.state.is_error()) {
            return Err(AdvanceRejected::Errored(id));
        }
        let prev = self.selected();
        self.nav.advance(&self.forest, id)?;
        if let Some(prev) = prev
            && prev != id
        {
            self.forest[prev].state.remove(NodeState::SELECTED);
        }
        if self.syncing().is_some_and(|busy| busy != id) {
            self.cancel_in_flight();
        }
        let node = &mut self.forest[id];
        node.state.insert(NodeState::SELECTED);
        node.state.remove(NodeState::COLLAPSED);
        tracing::debug!(parent: &self.span, node = %id, depth = self.nav.depth(), "advanced");
        self.sync_if_needed(id);
        Ok(())
    }

    /// Return to the previous view. Returns false when there is none.
    pub fn back(&mut self) -> bool {
        let prev = self.selected();
        if self.nav.depth() == 0 {
            return false;
        }
        self.cancel_in_flight();
        self.nav.back();
        if let Some(prev) = prev {
            self.forest[prev].state.remove(NodeState::SELECTED);
        }
        if let Some(selected) = self.selected() {
            self.forest[selected].state.insert(NodeState::SELECTED);
        }
        tracing::debug!(parent: &self.span, depth = self.nav.depth(), "back");
        true
    }

    /// Cancel any in-flight sync.
    pub fn shutdown(&mut self) {
        self.cancel_in_flight();
    }

    /// Commit a finished sync.
    pub fn apply(&mut self, event: SyncEvent) -> SyncReport {
        let id = event.node;
        let Some(node) = self.forest.get_mut(id) else {
            return SyncReport::Stale;
        };
        if node.cycle != event.cycle || !node.state.is_syncing() {
            tracing::trace!(parent: &self.span, node = %id, cycle = event.cycle, "dropping stale sync result");
            return SyncReport::Stale;
        }
        node.state.remove(NodeState::SYNCING);
        if self.syncing() == Some(id) {
            self.in_flight = None;
        }

        match event.outcome {
            Ok(synced) => {
                let node = &mut self.forest[id];
                if is_collapsible_item(&synced.item) {
                    node.state.insert(NodeState::COLLAPSIBLE);
                }
                node.item = synced.item;
                node.state.insert(NodeState::SYNCED);
                let children = match synced.children {
                    Some(children) => match self.forest.set_children(id, children) {
                        Some(ids) => ids.len(),
                        None => {
                            tracing::debug!(parent: &self.span, node = %id, "children already populated, discarding");
                            self.forest[id].children().map_or(0, <[NodeId]>::len)
                        }
                    },
                    None => self.forest[id].children().map_or(0, <[NodeId]>::len),
                };
                tracing::debug!(
                    parent: &self.span,
                    node = %id,
                    children,
                    pages = synced.pages,
                    termination = ?synced.termination,
                    resolved = synced.deref.resolved,
                    failed = synced.deref.failed,
                    "synced"
                );
                SyncReport::Synced { node: id, children }
            }
            Err(err) => {
                let message = err.to_string();
                let node = &mut self.forest[id];
                node.state.insert(NodeState::ERROR);
                node.error = Some(message.clone());
                let iri = node.item.id().clone();
                tracing::warn!(parent: &self.span, node = %id, iri = %iri, error = %message, "sync failed");
                SyncReport::Failed { node: id, message }
            }
        }
    }

    fn sync_if_needed(&mut self, id: NodeId) -> bool {
        if self.forest[id].needs_sync() {
            self.start_sync(id);
            true
        } else {
            false
        }
    }

    fn start_sync(&mut self, id: NodeId) {
        self.cycles += 1;
        let cycle = self.cycles;
        let node = &mut self.forest[id];
        node.cycle = cycle;
        node.error = None;
        node.state.remove(NodeState::SYNCED | NodeState::ERROR);
        node.state.insert(NodeState::SYNCING);

        let job = SyncJob {
            item: node.item.clone(),
            has_children: node.children.is_some(),
            collector: self.collector.clone(),
            deref: self.deref.clone(),
        };
        let scope = Scope::new(self.sync_timeout);
        self.in_flight = Some((id, scope.clone()));
        tracing::debug!(parent: &self.span, node = %id, cycle, iri = %job.item.id(), "sync started");

        let tx = self.tx.clone();
        tokio::spawn(async move {
            let outcome = job.run(&scope).await;
            // The receiver is gone once the loop has exited.
            let _ = tx.send(SyncEvent {
                node: id,
                cycle,
                outcome,
            });
        });
    }

    fn cancel_in_flight(&mut self) {
        if let Some((id, scope)) = self.in_flight.take() {
            scope.cancel();
            self.forest[id].state.remove(NodeState::SYNCING);
            tracing::debug!(parent: &self.span, node = %id, "sync cancelled");
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tracing_test::traced_test;

    use super::*;
    use crate::iri::Iri;
    use crate::test_utils::MockBackend;
    use crate::test_utils::ordered_collection;
    use crate::test_utils::router_for;

    const ALICE: &str = "https://fed.example/actors/alice";
    const OUTBOX: &str = "https://fed.example/actors/alice/outbox";

    fn backend() -> Arc<MockBackend> {
        let backend = Arc::new(MockBackend::new(50));
        backend.insert_json(json!({
            "id": ALICE,
            "type": "Person",
            "preferredUsername": "alice",
            "inbox": format!("{}/inbox", ALICE),
            "outbox": OUTBOX
        }));
        backend.insert(ordered_collection(OUTBOX, 250));
        backend.insert(ordered_collection(&format!("{}/inbox", ALICE), 0));
        backend
    }

    fn session(backend: Arc<MockBackend>, span: Span) -> (Session, mpsc::UnboundedReceiver<SyncEvent>) {
        Session::new(router_for(ALICE, backend), Limits::default(), span)
    }

    async fn settle(session: &mut Session, rx: &mut mpsc::UnboundedReceiver<SyncEvent>) -> SyncReport {
        let event = rx.recv().await.unwrap();
        session.apply(event)
    }

    #[tokio::test]
    async fn root_sync_enumerates_actor_collections() {
        let (mut session, mut rx) = session(backend(), Span::none());
        let root = session.tree().roots()[0];
        assert!(session.select(root));
        assert!(session.forest()[root].state().is_syncing());

        let report = settle(&mut session, &mut rx).await;
        assert_eq!(report, SyncReport::Synced { node: root, children: 2 });
        let node = &session.forest()[root];
        assert!(node.state().is_synced());
        assert!(!node.state().is_syncing());
        assert_eq!(node.name(), "alice");
        let names: Vec<_> = node
            .children()
            .unwrap()
            .iter()
            .map(|&c| session.forest()[c].name())
            .collect();
        assert_eq!(names, ["inbox", "outbox"]);
    }

    #[tokio::test]
    async fn outbox_children_stop_at_the_maximum() {
        let backend = backend();
        let (mut session, mut rx) = session(backend.clone(), Span::none());
        let root = session.tree().roots()[0];
        session.select(root);
        settle(&mut session, &mut rx).await;
        let outbox = session.forest()[root].children().unwrap()[1];

        assert!(session.select(outbox));
        let report = settle(&mut session, &mut rx).await;
        assert_eq!(report, SyncReport::Synced { node: outbox, children: 100 });
        assert_eq!(backend.calls(OUTBOX), 2);
        assert_eq!(session.forest()[outbox].name(), "OrderedCollection[250]");
    }

    #[tokio::test]
    async fn unnamed_collection_root_loads_each_page_once() {
        const THINGS: &str = "https://fed.example/things";
        let backend = Arc::new(MockBackend::new(50));
        backend.insert(ordered_collection(THINGS, 120));
        let (mut session, mut rx) = Session::new(
            router_for(THINGS, backend.clone()),
            Limits::default(),
            Span::none(),
        );
        let root = session.tree().roots()[0];

        assert!(session.select(root));
        let report = settle(&mut session, &mut rx).await;
        assert_eq!(report, SyncReport::Synced { node: root, children: 100 });
        let afters: Vec<_> = backend
            .loads()
            .into_iter()
            .filter(|(iri, _)| iri.as_str() == THINGS)
            .map(|(_, filters)| filters.after)
            .collect();
        assert_eq!(afters, [None, Some(Iri::from("https://fed.example/things/50"))]);
        assert_eq!(backend.calls(THINGS), 2);
    }

    #[tokio::test]
    async fn synced_node_is_not_loaded_again() {
        let backend = backend();
        let (mut session, mut rx) = session(backend.clone(), Span::none());
        let root = session.tree().roots()[0];
        session.select(root);
        settle(&mut session, &mut rx).await;
        let calls = backend.total_calls();

        let inbox = session.forest()[root].children().unwrap()[0];
        assert!(session.select(inbox));
        settle(&mut session, &mut rx).await;
        let calls_after_inbox = backend.total_calls();
        assert!(calls_after_inbox > calls);

        assert!(!session.select(root));
        assert!(!session.select(inbox));
        assert!(session.toggle(inbox));
        assert_eq!(backend.total_calls(), calls_after_inbox);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn advance_then_back_keeps_loaded_nodes() {
        let backend = backend();
        let (mut session, mut rx) = session(backend.clone(), Span::none());
        let root = session.tree().roots()[0];
        session.select(root);
        settle(&mut session, &mut rx).await;
        let before_tree = session.tree().clone();
        let before_children = session.forest()[root].children().unwrap().to_vec();
        let outbox = before_children[1];

        session.advance(outbox).unwrap();
        assert_eq!(session.tree().roots(), [outbox]);
        assert_eq!(session.tree().parent(session.forest(), outbox), None);
        settle(&mut session, &mut rx).await;
        let calls = backend.total_calls();

        assert!(session.back());
        assert_eq!(session.tree().roots(), before_tree.roots());
        assert_eq!(session.forest()[root].children().unwrap(), before_children);
        assert_eq!(session.selected(), Some(outbox));
        assert_eq!(backend.total_calls(), calls);
        assert!(!session.back());
    }

    #[tokio::test]
    async fn advance_into_current_root_is_rejected() {
        let (mut session, mut rx) = session(backend(), Span::none());
        let root = session.tree().roots()[0];
        session.select(root);
        settle(&mut session, &mut rx).await;
        assert_eq!(session.advance(root), Err(AdvanceRejected::AlreadyRoot(root)));
    }

    #[tokio::test]
    #[traced_test]
    async fn failed_sync_is_retried_on_reselect() {
        let backend = backend();
        backend.fail_unreachable(ALICE);
        let (mut session, mut rx) = session(backend.clone(), tracing::info_span!("session"));
        let root = session.tree().roots()[0];

        session.select(root);
        let report = settle(&mut session, &mut rx).await;
        assert!(matches!(report, SyncReport::Failed { node, .. } if node == root));
        let node = &session.forest()[root];
        assert!(node.state().is_error());
        assert!(!node.state().is_synced());
        assert!(node.error().is_some());
        assert!(logs_contain("sync failed"));
        assert_eq!(session.advance(root), Err(AdvanceRejected::Errored(root)));

        backend.heal(ALICE);
        assert!(session.select(root));
        let report = settle(&mut session, &mut rx).await;
        assert_eq!(report, SyncReport::Synced { node: root, children: 2 });
        let node = &session.forest()[root];
        assert!(node.state().is_synced());
        assert!(!node.state().is_error());
        assert_eq!(node.error(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn moving_away_discards_the_previous_sync() {
        let backend = Arc::new(MockBackend::new(50).with_delay(Duration::from_millis(100)));
        backend.insert(ordered_collection(OUTBOX, 3));
        backend.insert(ordered_collection(&format!("{}/inbox", ALICE), 0));
        let router = Arc::new(StoreRouter::from_stores(
            vec![
                crate::store::Store::new(Item::Reference(OUTBOX.into()), backend.clone()),
                crate::store::Store::new(
                    Item::Reference(format!("{}/inbox", ALICE).into()),
                    backend.clone(),
                ),
            ],
            Span::none(),
        ));
        let (mut session, mut rx) = Session::new(router, Limits::default(), Span::none());
        let (outbox, inbox) = (session.tree().roots()[0], session.tree().roots()[1]);

        session.select(outbox);
        session.select(inbox);
        assert!(!session.forest()[outbox].state().is_syncing());
        assert!(!session.forest()[outbox].state().is_selected());

        let mut reports = vec![
            settle(&mut session, &mut rx).await,
            settle(&mut session, &mut rx).await,
        ];
        reports.sort_by_key(|r| matches!(r, SyncReport::Synced { .. }));
        assert_eq!(reports[0], SyncReport::Stale);
        assert_eq!(reports[1], SyncReport::Synced { node: inbox, children: 0 });
        assert!(session.forest()[outbox].children().is_none());
        assert!(!session.forest()[outbox].state().is_error());

        // Coming back syncs it again.
        assert!(session.select(outbox));
        assert_eq!(
            settle(&mut session, &mut rx).await,
            SyncReport::Synced { node: outbox, children: 3 }
        );
    }

    #[tokio::test]
    async fn shutdown_cancels_in_flight() {
        let (mut session, mut rx) = session(backend(), Span::none());
        let root = session.tree().roots()[0];
        session.select(root);
        session.shutdown();
        assert_eq!(session.syncing(), None);
        assert_eq!(settle(&mut session, &mut rx).await, SyncReport::Stale);
    }
}
