/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! The navigable unit of the browser tree.
//!
//! A [`Node`] wraps one [`Item`] and tracks where it sits in the tree
//! plus a [`NodeState`] bitset. Nodes live in a [`Forest`] arena and
//! refer to each other by [`NodeId`]; the parent link is a plain index
//! used for upward traversal only.
//!
//! [`Forest`]: crate::tree::Forest

use std::fmt;

use bitflags::bitflags;

use crate::item::Collection;
use crate::item::Item;

bitflags! {
    /// Independent display and sync flags of a node.
    ///
    /// `SYNCED` and `ERROR` are the two outcomes of a sync cycle and
    /// never set together. Starting a new cycle clears both.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct NodeState: u16 {
        const COLLAPSED = 1 << 0;
        const COLLAPSIBLE = 1 << 1;
        const SELECTED = 1 << 2;
        const LAST_CHILD = 1 << 3;
        const HIDDEN = 1 << 4;
        const SYNCING = 1 << 5;
        const SYNCED = 1 << 6;
        const ERROR = 1 << 7;
    }
}

impl NodeState {
    pub fn is_collapsed(self) -> bool {
        self.contains(Self::COLLAPSED)
    }

    pub fn is_collapsible(self) -> bool {
        self.contains(Self::COLLAPSIBLE)
    }

    pub fn is_selected(self) -> bool {
        self.contains(Self::SELECTED)
    }

    pub fn is_last_child(self) -> bool {
        self.contains(Self::LAST_CHILD)
    }

    pub fn is_hidden(self) -> bool {
        self.contains(Self::HIDDEN)
    }

    pub fn is_syncing(self) -> bool {
        self.contains(Self::SYNCING)
    }

    pub fn is_synced(self) -> bool {
        self.contains(Self::SYNCED)
    }

    pub fn is_error(self) -> bool {
        self.contains(Self::ERROR)
    }
}

/// Index of a node in its forest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One explorable point in the graph.
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) item: Item,
    /// Fixed label, for nodes whose item does not name itself well.
    pub(crate) label: Option<String>,
    pub(crate) parent: Option<NodeId>,
    /// `None` until the first sync commits children.
    pub(crate) children: Option<Vec<NodeId>>,
    pub(crate) state: NodeState,
    pub(crate) error: Option<String>,
    /// Current sync cycle; results from older cycles are dropped.
    pub(crate) cycle: u64,
}

impl Node {
    /// A new collapsed node. It is collapsible when its item looks
    /// like it has children, before anything is loaded.
    pub fn new(item: Item, parent: Option<NodeId>) -> Self {
        let mut state = NodeState::COLLAPSED;
        if is_collapsible_item(&item) {
            state |= NodeState::COLLAPSIBLE;
        }
        Self {
            item,
            label: None,
            parent,
            children: None,
            state,
            error: None,
            cycle: 0,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn item(&self) -> &Item {
        &self.item
    }

    pub fn name(&self) -> String {
        match &self.label {
            Some(label) => label.clone(),
            None => display_name(&self.item),
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> Option<&[NodeId]> {
        self.children.as_deref()
    }

    pub fn has_children(&self) -> bool {
        self.children.as_ref().is_some_and(|c| !c.is_empty())
    }

    pub fn state(&self) -> NodeState {
        self.state
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Whether selecting this node should start a sync.
    pub fn needs_sync(&self) -> bool {
        !self.state.is_syncing() && (!self.state.is_synced() || self.state.is_error())
    }
}

/// The name shown for `item` in the tree.
pub fn display_name(item: &Item) -> String {
    let name = match item {
        Item::Actor(actor) => actor
            .preferred_username
            .first()
            .or_else(|| actor.object.name.first())
            .map(str::to_string)
            .unwrap_or_else(|| item.id().last_segment().to_string()),
        Item::Activity(act) => {
            let kind = &act.intransitive.object.kind;
            match act.object.as_ref().map(Item::type_name) {
                Some(object_kind) if !object_kind.is_empty() => {
                    format!("{} » {}", kind, object_kind)
                }
                _ => kind.clone(),
            }
        }
        Item::IntransitiveActivity(act) => act.object.kind.clone(),
        Item::Collection(col) => format!("{}[{}]", col.kind.as_str(), col.total_items),
        Item::Object(obj) => obj
            .name
            .first()
            .map(str::to_string)
            .unwrap_or_else(|| obj.id.last_segment().to_string()),
        Item::Link(link) => link
            .name
            .first()
            .map(str::to_string)
            .unwrap_or_else(|| link.href.last_segment().to_string()),
        Item::Reference(iri) => iri.last_segment().to_string(),
    };
    if name.is_empty() {
        item.id().to_string()
    } else {
        name
    }
}

/// Whether `item` should offer an expand affordance before it is
/// loaded.
pub fn is_collapsible_item(item: &Item) -> bool {
    if item.id().collection_name().is_some() || item.is_collection() {
        return true;
    }
    match item {
        Item::Actor(_) => true,
        Item::Object(_) | Item::Activity(_) | Item::IntransitiveActivity(_) => {
            item.object_props().is_some_and(|obj| {
                obj.likes.is_some() || obj.shares.is_some() || obj.replies.is_some()
            })
        }
        Item::Collection(_) | Item::Link(_) | Item::Reference(_) => false,
    }
}

/// Whether a node over `item` gets its children from the collector.
pub fn expands_as_collection(item: &Item) -> bool {
    match item {
        Item::Collection(col) => !col.id().is_empty(),
        Item::Reference(iri) => iri.collection_name().is_some(),
        _ => false,
    }
}

/// The child items of a non-collection node, each with an optional
/// fixed label.
pub fn child_elements(item: &Item) -> Vec<(Item, Option<&'static str>)> {
    fn push(out: &mut Vec<(Item, Option<&'static str>)>, value: &Option<Item>) {
        if let Some(value) = value {
            out.push((value.clone(), None));
        }
    }

    let mut out = Vec::new();
    match item {
        Item::Actor(actor) => {
            push(&mut out, &actor.inbox);
            push(&mut out, &actor.outbox);
            push(&mut out, &actor.liked);
            push(&mut out, &actor.followers);
            push(&mut out, &actor.following);
            if !actor.streams.is_empty() {
                let streams = Collection::of(actor.streams.clone());
                out.push((Item::Collection(Box::new(streams)), Some("streams")));
            }
            push(&mut out, &actor.object.likes);
            push(&mut out, &actor.object.shares);
            push(&mut out, &actor.object.replies);
        }
        Item::Object(_) | Item::Activity(_) | Item::IntransitiveActivity(_) => {
            if let Some(obj) = item.object_props() {
                push(&mut out, &obj.likes);
                push(&mut out, &obj.shares);
                push(&mut out, &obj.replies);
            }
        }
        Item::Collection(col) if col.id().is_empty() => {
            out.extend(col.items.iter().cloned().map(|it| (it, None)));
        }
        Item::Collection(_) | Item::Link(_) | Item::Reference(_) => {}
    }
    out
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::iri::Iri;

    fn decode(value: serde_json::Value) -> Item {
        Item::from_value(&value).unwrap()
    }

    #[test]
    fn state_flags_combine() {
        let mut state = NodeState::COLLAPSED | NodeState::COLLAPSIBLE;
        assert!(state.is_collapsed());
        assert!(state.is_collapsible());
        assert!(!state.is_synced());
        state |= NodeState::SYNCED;
        state.remove(NodeState::COLLAPSED);
        assert!(state.is_synced());
        assert!(!state.is_collapsed());
    }

    #[test]
    fn actor_names() {
        let actor = decode(json!({
            "id": "https://fed.example/actors/1",
            "type": "Person",
            "name": "Alice A.",
            "preferredUsername": "alice"
        }));
        assert_eq!(display_name(&actor), "alice");

        let named = decode(json!({
            "id": "https://fed.example/actors/1",
            "type": "Person",
            "name": "Alice A."
        }));
        assert_eq!(display_name(&named), "Alice A.");

        let bare = decode(json!({ "id": "https://fed.example/actors/1", "type": "Service" }));
        assert_eq!(display_name(&bare), "1");
    }

    #[test]
    fn activity_names() {
        let create = decode(json!({
            "id": "https://fed.example/activities/1",
            "type": "Create",
            "object": { "id": "https://fed.example/objects/1", "type": "Note" }
        }));
        assert_eq!(display_name(&create), "Create » Note");

        let unresolved = decode(json!({
            "id": "https://fed.example/activities/2",
            "type": "Like",
            "object": "https://fed.example/objects/1"
        }));
        assert_eq!(display_name(&unresolved), "Like");

        let arrive = decode(json!({ "id": "https://fed.example/activities/3", "type": "Arrive" }));
        assert_eq!(display_name(&arrive), "Arrive");
    }

    #[test]
    fn collection_and_fallback_names() {
        let outbox = decode(json!({
            "id": "https://fed.example/actors/alice/outbox",
            "type": "OrderedCollection",
            "totalItems": 250
        }));
        assert_eq!(display_name(&outbox), "OrderedCollection[250]");

        let reference = Item::Reference(Iri::from("https://fed.example/objects/42"));
        assert_eq!(display_name(&reference), "42");

        let host = Item::Reference(Iri::from("https://fed.example/"));
        assert_eq!(display_name(&host), "https://fed.example/");
    }

    #[test]
    fn collection_references_are_collapsible_before_load() {
        let outbox = Node::new(
            Item::Reference("https://fed.example/actors/alice/outbox".into()),
            None,
        );
        assert!(outbox.state().is_collapsible());
        assert!(outbox.state().is_collapsed());
        assert!(outbox.children().is_none());

        let note = Node::new(Item::Reference("https://fed.example/objects/1".into()), None);
        assert!(!note.state().is_collapsible());
        assert!(expands_as_collection(outbox.item()));
        assert!(!expands_as_collection(note.item()));
    }

    #[test]
    fn actor_children_follow_collection_order() {
        let actor = decode(json!({
            "id": "https://fed.example/actors/alice",
            "type": "Person",
            "inbox": "https://fed.example/actors/alice/inbox",
            "outbox": "https://fed.example/actors/alice/outbox",
            "followers": "https://fed.example/actors/alice/followers",
            "liked": "https://fed.example/actors/alice/liked",
            "streams": ["https://fed.example/actors/alice/photos"],
            "likes": "https://fed.example/actors/alice/likes"
        }));
        let children = child_elements(&actor);
        let names: Vec<_> = children
            .iter()
            .map(|(item, label)| label.map(str::to_string).unwrap_or_else(|| display_name(item)))
            .collect();
        assert_eq!(names, ["inbox", "outbox", "liked", "followers", "streams", "likes"]);
    }

    #[test]
    fn leaves_have_no_children() {
        let link = decode(json!({ "type": "Link", "href": "https://elsewhere.example/x" }));
        assert!(child_elements(&link).is_empty());
        assert!(child_elements(&Item::Reference("https://fed.example/x".into())).is_empty());
    }

    #[test]
    fn errored_node_needs_sync_again() {
        let mut node = Node::new(Item::Reference("https://fed.example/objects/1".into()), None);
        assert!(node.needs_sync());
        node.state |= NodeState::SYNCED;
        assert!(!node.needs_sync());
        node.state = (node.state - NodeState::SYNCED) | NodeState::ERROR;
        assert!(node.needs_sync());
    }
}
