/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

use ratatui::layout::Rect;
use ratatui::style::Modifier;
use ratatui::style::Style;
use ratatui::text::Line;
use ratatui::text::Span;
use ratatui::widgets::Block;
use ratatui::widgets::Borders;
use ratatui::widgets::List;
use ratatui::widgets::ListItem;
use ratatui::widgets::ListState;

use crate::App;

/// Render the object tree (left pane).
///
/// Each visible row carries indentation and connectors, a fold glyph
/// for collapsible nodes and a style for its shape. Loading and failed
/// nodes are marked; the cursor row is highlighted.
pub(crate) fn render_tree(frame: &mut ratatui::Frame<'_>, area: Rect, app: &App) {
    let rows = app.visible_rows();
    let scheme = &app.theme.scheme;

    let items: Vec<ListItem> = rows
        .as_slice()
        .iter()
        .enumerate()
        .map(|(vis_idx, row)| {
            let node = row.node;
            let state = node.state();
            let indent = "  ".repeat(row.depth);

            let connector = if row.depth == 0 {
                ""
            } else if rows.has_sibling_after(vis_idx, row.depth) {
                "├─ "
            } else {
                "└─ "
            };

            let fold = if !state.is_collapsible() {
                "  "
            } else if state.is_collapsed() {
                "▶ "
            } else {
                "▼ "
            };

            let at_cursor = vis_idx == app.cursor.pos();
            // Style precedence: cursor > failed > loading > shape.
            let style = if at_cursor {
                scheme.stat_selection.add_modifier(Modifier::BOLD)
            } else if state.is_error() {
                scheme.node_failed
            } else if state.is_syncing() {
                scheme.node_syncing
            } else {
                scheme.item_style(node.item())
            };

            let marker = if at_cursor {
                app.theme.labels.selection_caret
            } else {
                "  "
            };

            let mut spans = vec![Span::styled(
                format!("{}{}{}{}{}", marker, indent, connector, fold, node.name()),
                style,
            )];
            if state.is_syncing() {
                spans.push(Span::styled(format!(" {}", app.spinner()), scheme.node_syncing));
            } else if state.is_error() {
                spans.push(Span::styled(" ✗", scheme.node_failed));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();

    let block = Block::default()
        .title(app.theme.labels.pane_tree)
        .borders(Borders::ALL)
        .border_style(scheme.border);

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default());
    let mut list_state = ListState::default()
        .with_selected(Some(app.cursor.pos()))
        .with_offset(app.tree_scroll_offset);
    frame.render_stateful_widget(list, area, &mut list_state);
}
