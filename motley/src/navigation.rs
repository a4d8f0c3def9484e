/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Advance into a subtree as the new display root, and come back.
//!
//! Breadcrumbs are saved [`Tree`] views. Since views only name nodes
//! in the shared forest, restoring one brings back exactly the nodes
//! it showed, with whatever they had loaded.

use crate::node::NodeId;
use crate::tree::Forest;
use crate::tree::Tree;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AdvanceRejected {
    #[error("node {0} is already the root of the current view")]
    AlreadyRoot(NodeId),
    #[error("node {0} is not part of the current view")]
    NotInView(NodeId),
    #[error("node {0} failed to load")]
    Errored(NodeId),
}

/// The displayed tree plus the breadcrumb stack.
#[derive(Debug, Clone, Default)]
pub struct Navigator {
    current: Tree,
    breadcrumbs: Vec<Tree>,
}

impl Navigator {
    pub fn new(tree: Tree) -> Self {
        Self {
            current: tree,
            breadcrumbs: Vec::new(),
        }
    }

    pub fn current(&self) -> &Tree {
        &self.current
    }

    pub fn current_mut(&mut self) -> &mut Tree {
        &mut self.current
    }

    pub fn breadcrumbs(&self) -> &[Tree] {
        &self.breadcrumbs
    }

    pub fn depth(&self) -> usize {
        self.breadcrumbs.len()
    }

    /// Show `node` as the single root of a new view, saving the
    /// current one.
    pub fn advance(&mut self, forest: &Forest, node: NodeId) -> Result<(), AdvanceRejected> {
        if self.current.roots() == [node] {
            return Err(AdvanceRejected::AlreadyRoot(node));
        }
        if !self.current.contains(forest, node) {
            return Err(AdvanceRejected::NotInView(node));
        }
        let mut saved = std::mem::replace(&mut self.current, Tree::single(node));
        saved.set_selected(Some(node));
        self.breadcrumbs.push(saved);
        Ok(())
    }

    /// Restore the most recent breadcrumb. Returns false when there is
    /// none.
    pub fn back(&mut self) -> bool {
        match self.breadcrumbs.pop() {
            Some(tree) => {
                self.current = tree;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::Item;

    fn forest() -> (Forest, Tree, NodeId) {
        let mut forest = Forest::new();
        let roots = forest.insert_roots([
            Item::Reference("https://a.example/actors/alice".into()),
            Item::Reference("https://b.example/actors/bob".into()),
        ]);
        let outbox = forest
            .set_children(
                roots[0],
                vec![(Item::Reference("https://a.example/actors/alice/outbox".into()), None)],
            )
            .unwrap()[0];
        (forest, Tree::new(roots), outbox)
    }

    #[test]
    fn advance_then_back_restores_the_same_view() {
        let (forest, tree, outbox) = forest();
        let mut nav = Navigator::new(tree.clone());

        nav.advance(&forest, outbox).unwrap();
        assert_eq!(nav.current().roots(), [outbox]);
        assert_eq!(nav.current().parent(&forest, outbox), None);
        assert_eq!(nav.depth(), 1);

        assert!(nav.back());
        assert_eq!(nav.current().roots(), tree.roots());
        assert_eq!(nav.current().selected(), Some(outbox));
        assert_eq!(nav.depth(), 0);
    }

    #[test]
    fn back_without_breadcrumbs_is_a_no_op() {
        let (_, tree, _) = forest();
        let mut nav = Navigator::new(tree.clone());
        assert!(!nav.back());
        assert_eq!(nav.current(), &tree);
    }

    #[test]
    fn advancing_into_the_current_root_is_rejected() {
        let (forest, tree, outbox) = forest();
        let mut nav = Navigator::new(tree);
        nav.advance(&forest, outbox).unwrap();
        assert_eq!(
            nav.advance(&forest, outbox),
            Err(AdvanceRejected::AlreadyRoot(outbox))
        );
        assert_eq!(nav.depth(), 1);
    }

    #[test]
    fn advancing_outside_the_view_is_rejected() {
        let (forest, tree, outbox) = forest();
        let bob = tree.roots()[1];
        let mut nav = Navigator::new(tree);
        nav.advance(&forest, outbox).unwrap();
        assert_eq!(
            nav.advance(&forest, bob),
            Err(AdvanceRejected::NotInView(bob))
        );
    }

    #[test]
    fn breadcrumbs_nest() {
        let (mut forest, tree, outbox) = forest();
        let first = forest
            .set_children(
                outbox,
                vec![(Item::Reference("https://a.example/objects/1".into()), None)],
            )
            .unwrap()[0];
        let mut nav = Navigator::new(tree.clone());
        nav.advance(&forest, outbox).unwrap();
        nav.advance(&forest, first).unwrap();
        assert_eq!(nav.depth(), 2);
        assert!(nav.back());
        assert_eq!(nav.current().roots(), [outbox]);
        assert!(nav.back());
        assert_eq!(nav.current().roots(), tree.roots());
    }
}
