/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

use motley::node::NodeId;

/// Result of handling a keypress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum KeyResult {
    /// Nothing changed.
    None,
    /// The cursor moved; select the row under it.
    SelectionChanged,
    /// Expand or collapse the node.
    Toggle(NodeId),
    /// Show the node as the root of a new view.
    Advance(NodeId),
    /// Return to the previous view.
    Back,
    /// The visible rows changed shape.
    RowsChanged,
}
