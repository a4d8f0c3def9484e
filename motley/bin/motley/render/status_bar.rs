/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::text::Line;
use ratatui::text::Span;
use ratatui::widgets::Block;
use ratatui::widgets::Borders;
use ratatui::widgets::Paragraph;

use crate::App;
use crate::ThemeName;
use crate::format::state_label;

/// Render the header.
///
/// Line 1: app name • env • roots • view depth • load spinner.
/// Line 2: the selection, its state, and the last error if any.
pub(crate) fn render_header(frame: &mut ratatui::Frame<'_>, area: Rect, app: &App) {
    let l = &app.theme.labels;
    let s = &app.theme.scheme;

    let mut line1 = vec![
        Span::styled(l.app_name, s.app_name),
        Span::styled(l.separator, s.stat_label),
        Span::styled(l.env, s.stat_label),
        Span::styled(app.env.as_str(), s.stat_system),
        Span::styled(l.separator, s.stat_label),
        Span::styled(l.stores, s.stat_label),
        Span::styled(app.origin.as_str(), s.stat_url),
    ];

    let depth = app.session.navigator().depth();
    if depth > 0 {
        line1.extend([
            Span::styled(l.separator, s.stat_label),
            Span::styled(l.view, s.stat_label),
            Span::styled(depth.to_string(), s.stat_system),
        ]);
    }

    if !matches!(app.theme_name, ThemeName::Nord) {
        line1.extend([
            Span::styled(l.separator, s.stat_label),
            Span::styled(format!("theme:{}", app.theme_name), s.stat_system),
        ]);
    }

    if app.session.syncing().is_some() {
        line1.extend([
            Span::styled(l.separator, s.stat_label),
            Span::styled(format!("{} {}", app.spinner(), l.syncing), s.stat_timing),
        ]);
    }

    let mut line2 = Vec::new();
    match app.selected_node() {
        Some(node) => {
            let kind = match node.item().type_name() {
                "" => "Reference",
                kind => kind,
            };
            let state = node.state();
            let state_style = if state.is_error() {
                s.node_failed
            } else if state.is_syncing() {
                s.node_syncing
            } else {
                s.info
            };
            line2.extend([
                Span::styled(l.selection_caret, s.stat_selection),
                Span::styled(kind.to_string(), s.item_style(node.item())),
                Span::styled(" ", Style::default()),
                Span::styled(node.name(), s.stat_selection),
                Span::styled(" [", s.header_class_bracket),
                Span::styled(state_label(node, l), state_style),
                Span::styled("]", s.header_class_bracket),
            ]);
        }
        None => line2.push(Span::styled(l.no_selection, s.info)),
    }
    if let Some(err) = &app.error {
        line2.extend([
            Span::styled(l.separator, s.stat_label),
            Span::styled(err.as_str(), s.error),
        ]);
    }

    let header = Paragraph::new(vec![Line::from(line1), Line::from(line2)]).block(
        Block::default()
            .borders(Borders::BOTTOM)
            .border_style(s.border),
    );
    frame.render_widget(header, area);
}

/// Render the key help line.
pub(crate) fn render_footer(frame: &mut ratatui::Frame<'_>, area: Rect, app: &App) {
    let footer = Paragraph::new(app.theme.labels.footer_help_text)
        .style(app.theme.scheme.footer_help)
        .block(Block::default().borders(Borders::TOP));
    frame.render_widget(footer, area);
}
