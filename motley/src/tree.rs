/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Node storage and tree views.
//!
//! All nodes ever created for a session live in one [`Forest`]. A
//! [`Tree`] is a view over it: an ordered list of top-level roots plus
//! the selection. Views are cheap to copy, so saving one as a
//! breadcrumb keeps every node it reaches alive and unchanged.
//!
//! Traversals are expressed as folds (`fold_tree`, `fold_tree_mut`)
//! over the forest, and the UI renders the pure projection produced by
//! [`Tree::flatten`].

use std::ops::ControlFlow;
use std::ops::Index;
use std::ops::IndexMut;

use crate::item::Item;
use crate::node::Node;
use crate::node::NodeId;
use crate::node::NodeState;

/// Arena owning every node.
#[derive(Debug, Default, Clone)]
pub struct Forest {
    nodes: Vec<Node>,
}

impl Forest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Create top-level nodes for `items`, marking the last one.
    pub fn insert_roots(&mut self, items: impl IntoIterator<Item = Item>) -> Vec<NodeId> {
        let roots: Vec<_> = items
            .into_iter()
            .map(|item| self.insert(Node::new(item, None)))
            .collect();
        if let Some(&last) = roots.last() {
            self[last].state |= NodeState::LAST_CHILD;
        }
        roots
    }

    /// Commit the children of `parent`.
    ///
    /// Children are committed at most once: when `parent` already has
    /// a child list nothing changes and `None` is returned.
    pub fn set_children(
        &mut self,
        parent: NodeId,
        children: Vec<(Item, Option<&'static str>)>,
    ) -> Option<&[NodeId]> {
        if self.get(parent)?.children.is_some() {
            return None;
        }
        let mut ids = Vec::with_capacity(children.len());
        for (item, label) in children {
            let mut node = Node::new(item, Some(parent));
            if let Some(label) = label {
                node = node.with_label(label);
            }
            ids.push(self.insert(node));
        }
        if let Some(&last) = ids.last() {
            self[last].state |= NodeState::LAST_CHILD;
        }
        let node = &mut self[parent];
        if !ids.is_empty() {
            node.state |= NodeState::COLLAPSIBLE;
        }
        node.children = Some(ids);
        node.children.as_deref()
    }
}

impl Index<NodeId> for Forest {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }
}

impl IndexMut<NodeId> for Forest {
    fn index_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }
}

/// Generic tree fold.
///
/// Applies `f` to `id` at `depth` after folding each of its children,
/// handing it their results in order. Children not yet loaded fold as
/// an empty list.
pub fn fold_tree<'a, B, F>(forest: &'a Forest, id: NodeId, depth: usize, f: &F) -> B
where
    F: Fn(NodeId, &'a Node, usize, Vec<B>) -> B,
{
    let node = &forest[id];
    let child_results: Vec<B> = node
        .children()
        .unwrap_or_default()
        .iter()
        .map(|&child| fold_tree(forest, child, depth + 1, f))
        .collect();
    f(id, node, depth, child_results)
}

/// Mutable pre-order traversal with early exit via `ControlFlow`.
pub fn fold_tree_mut<B, F>(forest: &mut Forest, id: NodeId, f: &mut F) -> ControlFlow<B>
where
    F: FnMut(NodeId, &mut Node) -> ControlFlow<B>,
{
    f(id, &mut forest[id])?;
    let children = forest[id].children.clone().unwrap_or_default();
    for child in children {
        fold_tree_mut(forest, child, f)?;
    }
    ControlFlow::Continue(())
}

/// A single row in the flattened view.
#[derive(Debug, Clone, Copy)]
pub struct FlatRow<'a> {
    pub id: NodeId,
    pub node: &'a Node,
    /// Indentation level, top-level roots at 0.
    pub depth: usize,
}

/// The rows of a tree as currently displayed.
#[derive(Debug)]
pub struct VisibleRows<'a> {
    rows: Vec<FlatRow<'a>>,
}

impl<'a> VisibleRows<'a> {
    pub fn new(rows: Vec<FlatRow<'a>>) -> Self {
        Self { rows }
    }

    pub fn get(&self, pos: usize) -> Option<&FlatRow<'a>> {
        self.rows.get(pos)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn as_slice(&self) -> &[FlatRow<'a>] {
        &self.rows
    }

    pub fn position(&self, id: NodeId) -> Option<usize> {
        self.rows.iter().position(|row| row.id == id)
    }

    /// Check whether a later row at the same depth exists (for tree
    /// connector rendering: `├─` vs `└─`).
    pub fn has_sibling_after(&self, idx: usize, depth: usize) -> bool {
        for row in self.rows.iter().skip(idx + 1) {
            if row.depth < depth {
                return false;
            }
            if row.depth == depth {
                return true;
            }
        }
        false
    }
}

/// A displayed tree: top-level roots over a [`Forest`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tree {
    roots: Vec<NodeId>,
    selected: Option<NodeId>,
}

impl Tree {
    pub fn new(roots: Vec<NodeId>) -> Self {
        Self {
            roots,
            selected: None,
        }
    }

    /// A tree with `root` as its only top-level node.
    pub fn single(root: NodeId) -> Self {
        Self {
            roots: vec![root],
            selected: Some(root),
        }
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn first_root(&self) -> Option<NodeId> {
        self.roots.first().copied()
    }

    pub fn is_root(&self, id: NodeId) -> bool {
        self.roots.contains(&id)
    }

    pub fn selected(&self) -> Option<NodeId> {
        self.selected
    }

    pub fn set_selected(&mut self, id: Option<NodeId>) {
        self.selected = id;
    }

    /// The parent of `id` within this view. Top-level roots have none,
    /// even when the node was reached from a parent in another view.
    pub fn parent(&self, forest: &Forest, id: NodeId) -> Option<NodeId> {
        if self.is_root(id) {
            return None;
        }
        forest.get(id)?.parent
    }

    /// Whether `id` is reachable from one of this view's roots.
    pub fn contains(&self, forest: &Forest, id: NodeId) -> bool {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if self.is_root(current) {
                return true;
            }
            cursor = forest.get(current).and_then(Node::parent);
        }
        false
    }

    /// Depth of `id` below its top-level root.
    pub fn depth(&self, forest: &Forest, id: NodeId) -> Option<usize> {
        let mut depth = 0;
        let mut current = id;
        while !self.is_root(current) {
            current = forest.get(current)?.parent?;
            depth += 1;
        }
        Some(depth)
    }

    /// Flatten into visible rows. Hidden nodes are skipped with their
    /// subtrees, and only expanded nodes contribute children.
    pub fn flatten<'a>(&self, forest: &'a Forest) -> VisibleRows<'a> {
        let rows = self
            .roots
            .iter()
            .flat_map(|&root| flatten_visible(forest, root, 0))
            .collect();
        VisibleRows::new(rows)
    }

    /// Collapse every loaded node in this view.
    pub fn collapse_all(&self, forest: &mut Forest) {
        for &root in &self.roots {
            let _ = fold_tree_mut(forest, root, &mut |_, node| {
                node.state |= NodeState::COLLAPSED;
                ControlFlow::<()>::Continue(())
            });
        }
    }

    /// Every node in this view that has been loaded, in pre-order.
    pub fn collect_ids(&self, forest: &Forest) -> Vec<NodeId> {
        self.roots
            .iter()
            .flat_map(|&root| {
                fold_tree(forest, root, 0, &|id, _, _, child_results: Vec<Vec<NodeId>>| {
                    let mut ids = vec![id];
                    ids.extend(child_results.into_iter().flatten());
                    ids
                })
            })
            .collect()
    }
}

/// Flatten visible nodes below and including `id`.
pub fn flatten_visible(forest: &Forest, id: NodeId, depth: usize) -> Vec<FlatRow<'_>> {
    fold_tree(forest, id, depth, &|id, node, depth, child_results| {
        if node.state.is_hidden() {
            return Vec::new();
        }
        let mut rows = vec![FlatRow { id, node, depth }];
        if !node.state.is_collapsed() {
            for child_rows in child_results {
                rows.extend(child_rows);
            }
        }
        rows
    })
}
