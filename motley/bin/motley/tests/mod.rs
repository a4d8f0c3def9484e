/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Integration tests that exercise multiple modules together (App +
//! session + cursor + rendering). Per-module unit tests live in each
//! module's own `#[cfg(test)] mod tests` block.

use std::sync::Arc;
use std::time::Duration;

use crossterm::event::KeyCode;
use crossterm::event::KeyEvent;
use crossterm::event::KeyModifiers;
use motley::config::Limits;
use motley::session::SyncEvent;
use motley::session::SyncReport;
use motley::test_utils::MockBackend;
use motley::test_utils::ordered_collection;
use motley::test_utils::router_for;
use ratatui::backend::TestBackend;
use serde_json::json;
use tokio::sync::mpsc;

use super::*;

const ALICE: &str = "https://fed.example/actors/alice";
const INBOX: &str = "https://fed.example/actors/alice/inbox";
const OUTBOX: &str = "https://fed.example/actors/alice/outbox";

fn populate(backend: MockBackend) -> Arc<MockBackend> {
    let backend = Arc::new(backend);
    backend.insert_json(json!({
        "id": ALICE,
        "type": "Person",
        "preferredUsername": "alice",
        "inbox": INBOX,
        "outbox": OUTBOX
    }));
    backend.insert(ordered_collection(OUTBOX, 250));
    backend.insert(ordered_collection(INBOX, 0));
    backend
}

fn browser(backend: Arc<MockBackend>) -> (App, mpsc::UnboundedReceiver<SyncEvent>) {
    let (session, loads) = Session::new(
        router_for(ALICE, backend),
        Limits::default(),
        tracing::Span::none(),
    );
    (App::new(session, Env::Dev, ThemeName::Nord), loads)
}

fn press(app: &mut App, code: KeyCode) {
    app.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
}

fn ctrl(app: &mut App, c: char) {
    app.handle_key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL));
}

async fn settle(app: &mut App, loads: &mut mpsc::UnboundedReceiver<SyncEvent>) -> SyncReport {
    let event = loads.recv().await.unwrap();
    app.on_sync(event)
}

fn names(app: &App) -> Vec<String> {
    app.visible_rows()
        .as_slice()
        .iter()
        .map(|row| row.node.name())
        .collect()
}

/// Load the root and expand it: rows are alice, inbox, outbox.
async fn expanded_root(
    backend: Arc<MockBackend>,
) -> (App, mpsc::UnboundedReceiver<SyncEvent>) {
    let (mut app, mut loads) = browser(backend);
    assert!(app.select_at_cursor());
    settle(&mut app, &mut loads).await;
    press(&mut app, KeyCode::Tab);
    (app, loads)
}

// Startup selection loads the root; Tab expands it.
#[tokio::test]
async fn root_loads_then_expands_on_tab() {
    let (mut app, mut loads) = browser(populate(MockBackend::new(50)));
    assert_eq!(names(&app), ["alice"]);
    assert_eq!(app.cursor.len(), 1);

    assert!(app.select_at_cursor());
    let report = settle(&mut app, &mut loads).await;
    assert!(matches!(report, SyncReport::Synced { children: 2, .. }));
    // Loading does not expand.
    assert_eq!(app.visible_rows().len(), 1);

    press(&mut app, KeyCode::Tab);
    assert_eq!(names(&app), ["alice", "inbox", "outbox"]);
    assert_eq!(app.cursor.len(), 3);

    press(&mut app, KeyCode::Char(' '));
    assert_eq!(names(&app), ["alice"]);
}

// Moving the cursor selects and loads the row under it.
#[tokio::test]
async fn moving_the_cursor_loads_the_row() {
    let backend = populate(MockBackend::new(50));
    let (mut app, mut loads) = expanded_root(backend.clone()).await;

    press(&mut app, KeyCode::Char('j'));
    assert_eq!(app.cursor.pos(), 1);
    let inbox = app.cursor_node().unwrap();
    assert_eq!(app.session.selected(), Some(inbox));
    assert_eq!(app.session.syncing(), Some(inbox));
    settle(&mut app, &mut loads).await;

    press(&mut app, KeyCode::Down);
    let outbox = app.cursor_node().unwrap();
    let report = settle(&mut app, &mut loads).await;
    assert_eq!(report, SyncReport::Synced { node: outbox, children: 100 });
    assert_eq!(backend.calls(OUTBOX), 2);
    assert_eq!(app.selected_node().unwrap().name(), "OrderedCollection[250]");

    press(&mut app, KeyCode::Tab);
    assert_eq!(app.cursor.len(), 103);
    assert_eq!(app.cursor.pos(), 2);

    // Moving back up to a loaded node does not load again.
    let calls = backend.total_calls();
    press(&mut app, KeyCode::Char('k'));
    press(&mut app, KeyCode::Char('k'));
    assert_eq!(app.session.syncing(), None);
    assert_eq!(backend.total_calls(), calls);
}

// Jumping to the end scrolls the viewport with the cursor.
#[tokio::test]
async fn end_scrolls_the_viewport() {
    let (mut app, mut loads) = expanded_root(populate(MockBackend::new(50))).await;
    press(&mut app, KeyCode::Char('G'));
    settle(&mut app, &mut loads).await;
    press(&mut app, KeyCode::Tab);
    assert_eq!(app.cursor.len(), 103);

    press(&mut app, KeyCode::Char('G'));
    assert_eq!(app.cursor.pos(), 102);
    assert_eq!(app.tree_scroll_offset, 102 - (app.tree_viewport_height - 1));

    ctrl(&mut app, 'u');
    assert_eq!(app.cursor.pos(), 92);
    press(&mut app, KeyCode::Home);
    assert_eq!(app.cursor.pos(), 0);
    assert_eq!(app.tree_scroll_offset, 0);
}

// Advance shows the node alone; back restores the view and cursor
// without loading anything.
#[tokio::test]
async fn advance_and_back_restore_the_cursor() {
    let backend = populate(MockBackend::new(50));
    let (mut app, mut loads) = expanded_root(backend.clone()).await;
    press(&mut app, KeyCode::End);
    let outbox = app.cursor_node().unwrap();
    settle(&mut app, &mut loads).await;

    press(&mut app, KeyCode::Enter);
    assert_eq!(app.session.tree().roots(), [outbox]);
    assert_eq!(app.session.navigator().depth(), 1);
    assert_eq!(app.cursor.pos(), 0);
    assert_eq!(app.cursor.len(), 101);
    let calls = backend.total_calls();

    press(&mut app, KeyCode::Backspace);
    assert_eq!(app.session.navigator().depth(), 0);
    assert_eq!(app.session.selected(), Some(outbox));
    assert_eq!(app.cursor.pos(), 2);
    assert_eq!(app.cursor.len(), 103);
    assert_eq!(backend.total_calls(), calls);

    // Nothing further back.
    press(&mut app, KeyCode::Char('h'));
    assert_eq!(app.cursor.pos(), 2);
}

// Opening the only root of the view is refused with a message.
#[tokio::test]
async fn advancing_into_the_view_root_is_refused() {
    let (mut app, _loads) = expanded_root(populate(MockBackend::new(50))).await;
    press(&mut app, KeyCode::Char('l'));
    assert!(app.error.as_deref().unwrap().contains("already the root"));
    assert_eq!(app.session.navigator().depth(), 0);

    press(&mut app, KeyCode::Char('j'));
    assert_eq!(app.error, None);
}

// Collapsing everything moves the selection to the visible ancestor.
#[tokio::test]
async fn collapse_all_selects_the_visible_ancestor() {
    let (mut app, mut loads) = expanded_root(populate(MockBackend::new(50))).await;
    let root = app.session.tree().roots()[0];
    press(&mut app, KeyCode::Char('j'));
    settle(&mut app, &mut loads).await;

    press(&mut app, KeyCode::Char('c'));
    assert_eq!(names(&app), ["alice"]);
    assert_eq!(app.cursor.pos(), 0);
    assert_eq!(app.session.selected(), Some(root));
    assert_eq!(app.session.syncing(), None);
}

// A failed load is surfaced and blocks advancing into the node.
#[tokio::test]
async fn failed_load_is_reported() {
    let backend = populate(MockBackend::new(50));
    backend.fail_unreachable(OUTBOX);
    let (mut app, mut loads) = expanded_root(backend.clone()).await;

    press(&mut app, KeyCode::End);
    let report = settle(&mut app, &mut loads).await;
    assert!(matches!(report, SyncReport::Failed { .. }));
    assert!(app.error.is_some());
    assert!(app.selected_node().unwrap().state().is_error());

    press(&mut app, KeyCode::Enter);
    assert!(app.error.as_deref().unwrap().contains("failed to load"));
    assert_eq!(app.session.navigator().depth(), 0);

    // Selecting it again retries.
    backend.heal(OUTBOX);
    press(&mut app, KeyCode::Up);
    settle(&mut app, &mut loads).await;
    press(&mut app, KeyCode::Down);
    let report = settle(&mut app, &mut loads).await;
    assert!(matches!(report, SyncReport::Synced { children: 100, .. }));
}

// Moving on before a load finishes discards its result.
#[tokio::test(start_paused = true)]
async fn moving_on_discards_the_unfinished_load() {
    let backend = populate(MockBackend::new(50).with_delay(Duration::from_millis(50)));
    let (mut app, mut loads) = expanded_root(backend).await;

    press(&mut app, KeyCode::Down);
    let inbox = app.cursor_node().unwrap();
    press(&mut app, KeyCode::Down);
    let outbox = app.cursor_node().unwrap();
    assert!(!app.session.forest()[inbox].state().is_syncing());

    let mut reports = vec![
        settle(&mut app, &mut loads).await,
        settle(&mut app, &mut loads).await,
    ];
    reports.sort_by_key(|r| matches!(r, SyncReport::Synced { .. }));
    assert_eq!(reports[0], SyncReport::Stale);
    assert_eq!(reports[1], SyncReport::Synced { node: outbox, children: 100 });
    assert!(!app.session.forest()[inbox].state().is_synced());
}

#[tokio::test]
async fn quit_keys() {
    let (mut app, _loads) = browser(populate(MockBackend::new(50)));
    press(&mut app, KeyCode::Char('c'));
    assert!(!app.should_quit);
    ctrl(&mut app, 'c');
    assert!(app.should_quit);

    let (mut app, _loads) = browser(populate(MockBackend::new(50)));
    press(&mut app, KeyCode::Esc);
    assert!(app.should_quit);
}

#[tokio::test]
async fn frame_shows_tree_and_details() {
    let (mut app, _loads) = expanded_root(populate(MockBackend::new(50))).await;
    app.on_tick();

    let mut terminal = Terminal::new(TestBackend::new(120, 30)).unwrap();
    terminal.draw(|frame| render::ui(frame, &app)).unwrap();
    let screen: String = terminal
        .backend()
        .buffer()
        .content()
        .iter()
        .map(|cell| cell.symbol())
        .collect();
    assert!(screen.contains("motley"));
    assert!(screen.contains("Objects"));
    assert!(screen.contains("outbox"));
    assert!(screen.contains("Username: alice"));
    assert!(screen.contains("Person"));
}

#[test]
fn url_without_type_browses_over_http() {
    let args = Args::try_parse_from(["motley", "--url", ALICE, "--max-items", "20"]).unwrap();
    let options = resolve_options(&args).unwrap();
    assert_eq!(options.urls, [ALICE]);
    assert_eq!(options.storage[0].kind, StorageType::Http);
    assert_eq!(options.limits.max_items, 20);
}

#[test]
fn path_without_type_browses_the_filesystem() {
    let args = Args::try_parse_from([
        "motley",
        "--url",
        ALICE,
        "--path",
        "/var/lib/fedbox",
        "--timeout-ms",
        "250",
    ])
    .unwrap();
    let options = resolve_options(&args).unwrap();
    assert_eq!(options.storage[0].kind, StorageType::Fs);
    assert_eq!(options.storage[0].path, PathBuf::from("/var/lib/fedbox"));
    assert_eq!(options.limits.sync_timeout, Duration::from_millis(250));
}

#[test]
fn nothing_to_browse_is_an_error() {
    let args = Args::try_parse_from(["motley"]).unwrap();
    assert!(resolve_options(&args).is_err());

    let args = Args::try_parse_from(["motley", "--url", ALICE, "--type", "mysql"]).unwrap();
    assert!(resolve_options(&args).is_err());
}

#[test]
fn config_directory_with_cli_overrides() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join(".env"),
        "FEDBOX_HOSTNAME=fed.example\nFEDBOX_MAX_ITEMS=20\n",
    )
    .unwrap();
    let config = dir.path().to_str().unwrap();

    let args = Args::try_parse_from(["motley", "--config", config]).unwrap();
    let options = resolve_options(&args).unwrap();
    assert_eq!(options.urls, ["https://fed.example"]);
    assert_eq!(options.limits.max_items, 20);

    let args =
        Args::try_parse_from(["motley", "--config", config, "--max-items", "5"]).unwrap();
    assert_eq!(resolve_options(&args).unwrap().limits.max_items, 5);
}
