/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

use std::io;
use std::time::Duration;

use crossterm::event::Event;
use crossterm::event::EventStream;
use crossterm::event::KeyCode;
use crossterm::event::KeyEvent;
use crossterm::event::KeyEventKind;
use crossterm::event::KeyModifiers;
use futures::StreamExt;
use motley::config::Env;
use motley::node::Node;
use motley::node::NodeId;
use motley::session::Session;
use motley::session::SyncEvent;
use motley::session::SyncReport;
use motley::tree::VisibleRows;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tokio::sync::mpsc;

use crate::Cursor;
use crate::KeyResult;
use crate::Theme;
use crate::ThemeName;
use crate::render::ui;

/// Rows moved by PageUp/PageDown and their vi/Emacs aliases.
const PAGE: usize = 10;

/// Redraw cadence while nothing else happens; drives the spinner.
const TICK: Duration = Duration::from_millis(100);

pub(crate) const SPINNER_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Runtime state for the browser.
///
/// `App` owns the [`Session`] (tree, navigation and loading) and the
/// purely visual state layered on top of it: the cursor over visible
/// rows, scrolling and the theme.
pub(crate) struct App {
    pub(crate) session: Session,
    /// Deployment environment, shown in the header.
    pub(crate) env: Env,
    /// The configured roots, shown in the header.
    pub(crate) origin: String,
    /// Set when the user requests exit (`q` / `Esc` / `Ctrl-C`).
    pub(crate) should_quit: bool,
    /// Navigation cursor over visible tree rows.
    pub(crate) cursor: Cursor,
    /// Top visible row of the tree pane.
    pub(crate) tree_scroll_offset: usize,
    /// Rows the tree pane can show (updated before each draw).
    pub(crate) tree_viewport_height: usize,
    /// Last failure or rejected action, cleared by the next key.
    pub(crate) error: Option<String>,
    pub(crate) spinner_frame: usize,
    pub(crate) theme: Theme,
    pub(crate) theme_name: ThemeName,
}

impl App {
    pub(crate) fn new(session: Session, env: Env, theme_name: ThemeName) -> Self {
        let forest = session.forest();
        let origin = match session.tree().roots() {
            [] => String::new(),
            [only] => forest[*only].item().id().to_string(),
            [first, rest @ ..] => format!("{} (+{})", forest[*first].item().id(), rest.len()),
        };
        let len = session.tree().flatten(forest).len();
        Self {
            session,
            env,
            origin,
            should_quit: false,
            cursor: Cursor::new(len),
            tree_scroll_offset: 0,
            tree_viewport_height: 20,
            error: None,
            spinner_frame: 0,
            theme: Theme::new(theme_name),
            theme_name,
        }
    }

    pub(crate) fn visible_rows(&self) -> VisibleRows<'_> {
        self.session.tree().flatten(self.session.forest())
    }

    /// The node under the cursor.
    pub(crate) fn cursor_node(&self) -> Option<NodeId> {
        self.visible_rows().get(self.cursor.pos()).map(|row| row.id)
    }

    pub(crate) fn selected_node(&self) -> Option<&Node> {
        self.session
            .selected()
            .and_then(|id| self.session.forest().get(id))
    }

    /// Select the node under the cursor. Returns whether a load
    /// started.
    pub(crate) fn select_at_cursor(&mut self) -> bool {
        match self.cursor_node() {
            Some(id) => self.session.select(id),
            None => false,
        }
    }

    /// Re-sync the cursor with the session after the rows changed.
    ///
    /// The cursor lands on the selected node, or on its closest
    /// visible ancestor, which then becomes the selection.
    pub(crate) fn follow_selection(&mut self) {
        let selected = self.session.selected();
        let (len, found) = {
            let rows = self.visible_rows();
            let tree = self.session.tree();
            let forest = self.session.forest();
            let mut target = selected;
            let mut found = None;
            while let Some(id) = target {
                if let Some(pos) = rows.position(id) {
                    found = Some((id, pos));
                    break;
                }
                target = tree.parent(forest, id);
            }
            (rows.len(), found)
        };
        self.cursor.update_len(len);
        if let Some((id, pos)) = found {
            self.cursor.set_pos(pos);
            if Some(id) != selected {
                self.session.select(id);
            }
        }
        self.ensure_cursor_visible();
    }

    /// Adjust the scroll offset so the cursor stays in the viewport.
    pub(crate) fn ensure_cursor_visible(&mut self) {
        let pos = self.cursor.pos();
        if pos < self.tree_scroll_offset {
            self.tree_scroll_offset = pos;
        } else if pos >= self.tree_scroll_offset + self.tree_viewport_height {
            self.tree_scroll_offset = pos.saturating_sub(self.tree_viewport_height.saturating_sub(1));
        }
    }

    /// Handle a single keypress and update cursor state.
    ///
    /// Anything that touches the session is returned as a
    /// [`KeyResult`] for [`App::apply_key_result`].
    pub(crate) fn on_key(&mut self, key: KeyEvent) -> KeyResult {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let moved = match key.code {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.should_quit = true;
                return KeyResult::None;
            }
            KeyCode::Char('c') if ctrl => {
                self.should_quit = true;
                return KeyResult::None;
            }
            KeyCode::Char('l') if ctrl => {
                // Scroll the selected row to the top.
                self.tree_scroll_offset = self.cursor.pos();
                return KeyResult::None;
            }
            KeyCode::Up | KeyCode::Char('k') => self.cursor.move_up(),
            KeyCode::Down | KeyCode::Char('j') => self.cursor.move_down(),
            KeyCode::Home | KeyCode::Char('g') => self.cursor.home(),
            KeyCode::End | KeyCode::Char('G') => self.cursor.end(),
            KeyCode::PageDown => self.cursor.page_down(PAGE),
            KeyCode::PageUp => self.cursor.page_up(PAGE),
            KeyCode::Char('d') if ctrl => self.cursor.page_down(PAGE),
            KeyCode::Char('u') if ctrl => self.cursor.page_up(PAGE),
            KeyCode::Char('v') if ctrl => self.cursor.page_down(PAGE),
            KeyCode::Char('v') if key.modifiers.contains(KeyModifiers::ALT) => {
                self.cursor.page_up(PAGE)
            }
            KeyCode::Tab | KeyCode::Char(' ') => {
                return match self.cursor_node() {
                    Some(id) if self.session.forest()[id].state().is_collapsible() => {
                        KeyResult::Toggle(id)
                    }
                    _ => KeyResult::None,
                };
            }
            KeyCode::Enter | KeyCode::Char('l') => {
                return self.cursor_node().map_or(KeyResult::None, KeyResult::Advance);
            }
            KeyCode::Backspace | KeyCode::Char('h') => return KeyResult::Back,
            KeyCode::Char('c') => {
                self.session.collapse_all();
                return KeyResult::RowsChanged;
            }
            _ => return KeyResult::None,
        };
        if moved {
            self.ensure_cursor_visible();
            KeyResult::SelectionChanged
        } else {
            KeyResult::None
        }
    }

    /// Carry out the session side of a keypress.
    pub(crate) fn apply_key_result(&mut self, result: KeyResult) {
        match result {
            KeyResult::None => {}
            KeyResult::SelectionChanged => {
                self.select_at_cursor();
            }
            KeyResult::Toggle(id) => {
                self.session.toggle(id);
                self.follow_selection();
            }
            KeyResult::Advance(id) => match self.session.advance(id) {
                Ok(()) => {
                    self.tree_scroll_offset = 0;
                    self.follow_selection();
                }
                Err(rejected) => self.error = Some(rejected.to_string()),
            },
            KeyResult::Back => {
                if self.session.back() {
                    self.follow_selection();
                }
            }
            KeyResult::RowsChanged => self.follow_selection(),
        }
    }

    pub(crate) fn handle_key(&mut self, key: KeyEvent) {
        self.error = None;
        let result = self.on_key(key);
        self.apply_key_result(result);
    }

    /// Commit a finished load and keep the cursor on the selection.
    pub(crate) fn on_sync(&mut self, event: SyncEvent) -> SyncReport {
        let report = self.session.apply(event);
        match &report {
            SyncReport::Stale => return report,
            SyncReport::Failed { message, .. } => self.error = Some(message.clone()),
            SyncReport::Synced { .. } => {}
        }
        self.follow_selection();
        report
    }

    pub(crate) fn on_tick(&mut self) {
        if self.session.syncing().is_some() {
            self.spinner_frame = (self.spinner_frame + 1) % SPINNER_FRAMES.len();
        }
    }

    pub(crate) fn spinner(&self) -> &'static str {
        SPINNER_FRAMES[self.spinner_frame % SPINNER_FRAMES.len()]
    }
}

/// Drive the main event loop.
///
/// Renders, then waits for a key, a finished load or the next tick,
/// until the user exits.
pub(crate) async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    mut app: App,
    mut loads: mpsc::UnboundedReceiver<SyncEvent>,
) -> anyhow::Result<()> {
    let mut tick = tokio::time::interval(TICK);
    let mut events = EventStream::new();
    app.select_at_cursor();

    loop {
        // Header (3) and footer (2) rows, plus the tree pane borders.
        let terminal_size = terminal.size()?;
        app.tree_viewport_height = terminal_size.height.saturating_sub(7) as usize;

        terminal.draw(|frame| ui(frame, &app))?;

        tokio::select! {
            _ = tick.tick() => app.on_tick(),
            Some(event) = loads.recv() => {
                app.on_sync(event);
            }
            maybe_event = events.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                        app.handle_key(key);
                    }
                    Some(Ok(_)) => {}
                    Some(Err(err)) => return Err(err.into()),
                    None => break,
                }
            }
        }

        if app.should_quit {
            break;
        }
    }

    app.session.shutdown();
    Ok(())
}
