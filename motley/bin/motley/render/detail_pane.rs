/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

use ratatui::layout::Rect;
use ratatui::text::Line;
use ratatui::text::Span;
use ratatui::widgets::Block;
use ratatui::widgets::Borders;
use ratatui::widgets::Paragraph;
use ratatui::widgets::Wrap;

use crate::App;
use crate::format::detail_lines;
use crate::format::state_label;

/// Render the fields of the selected item (right pane).
///
/// A node that failed to load shows its error above whatever it
/// still holds, which for a never-loaded node is just its reference.
pub(crate) fn render_detail_pane(frame: &mut ratatui::Frame<'_>, area: Rect, app: &App) {
    let scheme = &app.theme.scheme;
    let labels = &app.theme.labels;

    let Some(node) = app.selected_node() else {
        let block = Block::default()
            .title(labels.pane_details)
            .borders(Borders::ALL)
            .border_style(scheme.border);
        let p = Paragraph::new(Span::styled(labels.no_selection, scheme.info)).block(block);
        frame.render_widget(p, area);
        return;
    };

    let mut lines = Vec::new();
    let title = match node.error() {
        Some(err) => {
            lines.push(Line::from(vec![
                Span::styled(labels.error_message, scheme.error),
                Span::styled(err, scheme.error),
            ]));
            labels.pane_error
        }
        None => labels.pane_details,
    };
    lines.push(Line::from(Span::styled(
        format!("[{}]", state_label(node, labels)),
        scheme.header_class_bracket,
    )));
    for (label, value) in detail_lines(node.item(), labels) {
        lines.push(Line::from(vec![
            Span::styled(label, scheme.detail_label),
            Span::styled(value, scheme.stat_value),
        ]));
    }

    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(scheme.border);
    let p = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false });
    frame.render_widget(p, area);
}
