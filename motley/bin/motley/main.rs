/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Interactive terminal browser for federated ActivityPub object
//! graphs.
//!
//! Shows the configured roots as a tree and loads each node the first
//! time it is selected. Collections are paged in up to a bound, so
//! very large outboxes or follower lists stay responsive.
//!
//! ```bash
//! motley --url https://fedbox.example/actors/alice --type http
//! motley --config /etc/fedbox --env prod
//! ```
//!
//! ## Keys
//!
//! | Key | Action |
//! |-----|--------|
//! | `j` / `k` / arrows | move (and load the row) |
//! | `g` / `G` / Home / End | jump to top / bottom |
//! | PgUp / PgDn / Ctrl-U / Ctrl-D | page |
//! | Tab / Space | expand or collapse |
//! | Enter / `l` | open the node as the root of a new view |
//! | Backspace / `h` | back to the previous view |
//! | `c` | collapse all |
//! | `q` / Esc / Ctrl-C | quit |
//!
//! Logs go to a file (`--log-file`, default `motley.log` in the temp
//! directory) since the terminal belongs to the UI.

mod actions;
mod app;
mod format;
mod model;
mod render;
mod theme;

#[cfg(test)]
mod tests;

use std::io;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub(crate) use actions::*;
use anyhow::Context;
pub(crate) use app::*;
use clap::Parser;
use crossterm::ExecutableCommand;
use crossterm::terminal::EnterAlternateScreen;
use crossterm::terminal::LeaveAlternateScreen;
use crossterm::terminal::disable_raw_mode;
use crossterm::terminal::enable_raw_mode;
use indicatif::ProgressBar;
use indicatif::ProgressStyle;
pub(crate) use model::*;
use motley::config;
use motley::config::Env;
use motley::config::Options;
use motley::config::StorageConfig;
use motley::config::StorageType;
use motley::iri::Iri;
use motley::session::Session;
use motley::store::StoreRouter;
use motley::telemetry;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
pub(crate) use theme::*;

/// Build session options from the command line.
///
/// With `--config`, options come from the env files in that
/// directory. Otherwise `--url`, `--path` and `--type` describe the
/// roots and their storage; without `--type`, a `--path` means the
/// filesystem and no path means HTTP. `--max-items` and
/// `--timeout-ms` override either source.
pub(crate) fn resolve_options(args: &Args) -> anyhow::Result<Options> {
    let env = args.env.as_deref().map(str::parse::<Env>).transpose()?;
    let mut options = match &args.config {
        Some(dir) => config::load_from_env(dir, env)
            .with_context(|| format!("loading configuration from {}", dir.display()))?,
        None => {
            let kind = match (&args.storage, &args.path) {
                (Some(kind), _) => kind.parse::<StorageType>()?,
                (None, Some(_)) => StorageType::Fs,
                (None, None) => StorageType::Http,
            };
            let path = args.path.clone().unwrap_or_else(|| PathBuf::from("."));
            Options {
                env: env.unwrap_or_default(),
                urls: args.urls.clone(),
                storage: vec![StorageConfig { kind, path }],
                ..Options::default()
            }
        }
    };
    if let Some(max_items) = args.max_items {
        options.limits.max_items = max_items;
    }
    if let Some(ms) = args.timeout_ms {
        options.limits.sync_timeout = Duration::from_millis(ms);
    }
    if options.urls.is_empty() {
        anyhow::bail!("nothing to browse: pass --url, or set HOSTNAME in the configuration");
    }
    Ok(options)
}

// Terminal setup / teardown

/// Enable raw mode, switch to the alternate screen and clear it.
fn setup_terminal() -> io::Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    stdout.execute(EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;
    Ok(terminal)
}

/// Restore the terminal to normal shell mode.
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> io::Result<()> {
    disable_raw_mode()?;
    terminal.backend_mut().execute(LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let options = resolve_options(&args)?;

    let log_path = args
        .log_file
        .clone()
        .unwrap_or_else(telemetry::default_log_path);
    telemetry::init_file_logging(&log_path, options.log_level)?;

    if !io::stdout().is_terminal() {
        eprintln!("This TUI requires a real terminal.");
        return Ok(());
    }

    tracing::info!(
        env = %options.env,
        roots = ?options.urls,
        max_items = options.limits.max_items,
        "starting"
    );

    // The spinner runs on stderr before the alternate screen.
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")?);
    spinner.set_message(format!(
        "motley: loading {} ...",
        options.urls.join(", ")
    ));
    spinner.enable_steady_tick(Duration::from_millis(80));

    let roots: Vec<Iri> = options.urls.iter().map(|u| Iri::from(u.as_str())).collect();
    let router = StoreRouter::initialize(
        &roots,
        &options.storage,
        options.env,
        options.limits,
        tracing::info_span!("router"),
    )
    .await;
    spinner.finish_and_clear();

    let router = router.context("initializing storage")?;
    if router.is_empty() {
        anyhow::bail!(
            "none of the roots could be loaded; see {}",
            log_path.display()
        );
    }

    let (session, loads) = Session::new(
        Arc::new(router),
        options.limits,
        tracing::info_span!("session"),
    );
    let app = App::new(session, options.env, args.theme);

    let mut terminal = setup_terminal()?;
    let result = run_app(&mut terminal, app, loads).await;
    restore_terminal(&mut terminal)?;
    result
}
