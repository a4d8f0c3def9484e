/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

/// Navigation cursor over the visible rows of the tree pane.
///
/// Invariant: `pos < len` (or `pos == 0` when `len == 0`).
/// Movement methods return `true` when the position changes.
#[derive(Debug, Clone)]
pub(crate) struct Cursor {
    pos: usize,
    len: usize,
}

impl Cursor {
    pub(crate) fn new(len: usize) -> Self {
        Self { pos: 0, len }
    }

    pub(crate) fn move_up(&mut self) -> bool {
        if self.pos > 0 {
            self.pos -= 1;
            true
        } else {
            false
        }
    }

    pub(crate) fn move_down(&mut self) -> bool {
        if self.pos + 1 < self.len {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    pub(crate) fn home(&mut self) -> bool {
        self.jump(0)
    }

    pub(crate) fn end(&mut self) -> bool {
        self.jump(self.len.saturating_sub(1))
    }

    pub(crate) fn page_down(&mut self, amount: usize) -> bool {
        self.jump((self.pos + amount).min(self.len.saturating_sub(1)))
    }

    pub(crate) fn page_up(&mut self, amount: usize) -> bool {
        self.jump(self.pos.saturating_sub(amount))
    }

    fn jump(&mut self, new_pos: usize) -> bool {
        if self.pos != new_pos {
            self.pos = new_pos;
            true
        } else {
            false
        }
    }

    /// Update length and clamp position to remain valid.
    pub(crate) fn update_len(&mut self, new_len: usize) {
        self.len = new_len;
        self.pos = self.pos.min(new_len.saturating_sub(1));
    }

    /// Set position directly, clamped to the valid range.
    pub(crate) fn set_pos(&mut self, new_pos: usize) {
        self.pos = new_pos.min(self.len.saturating_sub(1));
    }

    pub(crate) fn pos(&self) -> usize {
        self.pos
    }

    #[allow(dead_code)] // used by tests
    pub(crate) fn len(&self) -> usize {
        self.len
    }
}
