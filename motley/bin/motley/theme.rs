/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

use std::fmt;
use std::path::PathBuf;

use clap::Parser;
use clap::ValueEnum;
use motley::item::Item;
use ratatui::style::Color;
use ratatui::style::Modifier;
use ratatui::style::Style;

/// Color theme selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum ThemeName {
    /// Arctic, north-bluish palette for dark terminals.
    #[default]
    Nord,
    /// Desaturated Nord accents for light terminals.
    DoomNordLight,
}

impl fmt::Display for ThemeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThemeName::Nord => write!(f, "nord"),
            ThemeName::DoomNordLight => write!(f, "doom-nord-light"),
        }
    }
}

/// Command-line arguments.
#[derive(Debug, Parser)]
#[command(
    name = "motley",
    about = "Terminal browser for federated ActivityPub object graphs"
)]
pub(crate) struct Args {
    /// Root reference to browse. Repeat to browse several.
    #[arg(long = "url", value_name = "IRI")]
    pub(crate) urls: Vec<String>,

    /// Base path of the storage holding the roots.
    #[arg(long)]
    pub(crate) path: Option<PathBuf>,

    /// Storage type: fs, http, boltdb, badger or sqlite.
    #[arg(long = "type", value_name = "TYPE")]
    pub(crate) storage: Option<String>,

    /// Directory holding `.env` files. When set, options come from
    /// there instead of `--url`/`--path`/`--type`.
    #[arg(long, value_name = "DIR")]
    pub(crate) config: Option<PathBuf>,

    /// Environment overlay: dev, prod, qa or test.
    #[arg(long)]
    pub(crate) env: Option<String>,

    /// Maximum number of collection elements loaded per node.
    #[arg(long)]
    pub(crate) max_items: Option<usize>,

    /// Time budget for loading one node, in milliseconds.
    #[arg(long)]
    pub(crate) timeout_ms: Option<u64>,

    /// Log file (defaults to motley.log in the temp directory).
    #[arg(long, value_name = "FILE")]
    pub(crate) log_file: Option<PathBuf>,

    /// Color theme.
    #[arg(long, value_enum, default_value_t = ThemeName::Nord)]
    pub(crate) theme: ThemeName,
}

/// User-visible text.
pub(crate) struct Labels {
    pub(crate) app_name: &'static str,
    pub(crate) separator: &'static str,
    pub(crate) selection_caret: &'static str,
    pub(crate) no_selection: &'static str,
    pub(crate) env: &'static str,
    pub(crate) view: &'static str,
    pub(crate) stores: &'static str,
    pub(crate) syncing: &'static str,
    pub(crate) synced: &'static str,
    pub(crate) failed: &'static str,
    pub(crate) pending: &'static str,
    pub(crate) id: &'static str,
    pub(crate) kind: &'static str,
    pub(crate) media_type: &'static str,
    pub(crate) name: &'static str,
    pub(crate) username: &'static str,
    pub(crate) summary: &'static str,
    pub(crate) content: &'static str,
    pub(crate) published: &'static str,
    pub(crate) updated: &'static str,
    pub(crate) url: &'static str,
    pub(crate) href: &'static str,
    pub(crate) attributed_to: &'static str,
    pub(crate) in_reply_to: &'static str,
    pub(crate) recipients: &'static str,
    pub(crate) tags: &'static str,
    pub(crate) inbox: &'static str,
    pub(crate) outbox: &'static str,
    pub(crate) liked: &'static str,
    pub(crate) followers: &'static str,
    pub(crate) following: &'static str,
    pub(crate) streams: &'static str,
    pub(crate) actor: &'static str,
    pub(crate) object: &'static str,
    pub(crate) target: &'static str,
    pub(crate) result: &'static str,
    pub(crate) origin: &'static str,
    pub(crate) instrument: &'static str,
    pub(crate) total_items: &'static str,
    pub(crate) first: &'static str,
    pub(crate) next: &'static str,
    pub(crate) prev: &'static str,
    pub(crate) part_of: &'static str,
    pub(crate) children: &'static str,
    pub(crate) error_message: &'static str,
    pub(crate) pane_tree: &'static str,
    pub(crate) pane_details: &'static str,
    pub(crate) pane_error: &'static str,
    pub(crate) footer_help_text: &'static str,
}

impl Labels {
    pub(crate) fn en() -> Self {
        Self {
            app_name: "motley",
            separator: " • ",
            selection_caret: "▸ ",
            no_selection: "No selection",
            env: "env:",
            view: "view:",
            stores: "stores:",
            syncing: "loading",
            synced: "loaded",
            failed: "failed",
            pending: "not loaded",
            id: "Id: ",
            kind: "Type: ",
            media_type: "Media type: ",
            name: "Name: ",
            username: "Username: ",
            summary: "Summary: ",
            content: "Content: ",
            published: "Published: ",
            updated: "Updated: ",
            url: "URL: ",
            href: "Href: ",
            attributed_to: "Attributed to: ",
            in_reply_to: "In reply to: ",
            recipients: "Recipients: ",
            tags: "Tags: ",
            inbox: "Inbox: ",
            outbox: "Outbox: ",
            liked: "Liked: ",
            followers: "Followers: ",
            following: "Following: ",
            streams: "Streams: ",
            actor: "Actor: ",
            object: "Object: ",
            target: "Target: ",
            result: "Result: ",
            origin: "Origin: ",
            instrument: "Instrument: ",
            total_items: "Total items: ",
            first: "First: ",
            next: "Next: ",
            prev: "Prev: ",
            part_of: "Part of: ",
            children: "Children: ",
            error_message: "Error: ",
            pane_tree: "Objects",
            pane_details: "Details",
            pane_error: "Error",
            footer_help_text: "q: quit | j/k: navigate | g/G: top/bottom | Tab: expand/collapse | Enter/l: open | Backspace/h: back | c: collapse all",
        }
    }
}

/// Color scheme for the TUI.
///
/// Each field is a semantic role; themes assign concrete colors.
pub(crate) struct ColorScheme {
    // UI chrome
    pub(crate) app_name: Style,
    pub(crate) border: Style,
    pub(crate) footer_help: Style,

    // Item shapes in the tree
    pub(crate) node_actor: Style,
    pub(crate) node_activity: Style,
    pub(crate) node_object: Style,
    pub(crate) node_collection: Style,
    pub(crate) node_link: Style,
    pub(crate) node_reference: Style,

    // Node states
    pub(crate) node_syncing: Style,
    pub(crate) node_failed: Style,

    pub(crate) error: Style,
    pub(crate) info: Style,

    // Header
    pub(crate) stat_selection: Style,
    pub(crate) stat_label: Style,
    pub(crate) stat_value: Style,
    pub(crate) stat_url: Style,
    pub(crate) stat_system: Style,
    pub(crate) stat_timing: Style,
    pub(crate) header_class_bracket: Style,

    pub(crate) detail_label: Style,
}

impl ColorScheme {
    /// Nord color scheme (https://www.nordtheme.com/).
    pub(crate) fn nord() -> Self {
        let polar3 = Color::Rgb(76, 86, 106); // #4C566A
        let snow0 = Color::Rgb(216, 222, 233); // #D8DEE9
        let snow2 = Color::Rgb(236, 239, 244); // #ECEFF4
        let frost_teal = Color::Rgb(143, 188, 187); // #8FBCBB
        let frost_cyan = Color::Rgb(136, 192, 208); // #88C0D0
        let frost_blue = Color::Rgb(129, 161, 193); // #81A1C1
        let frost_dark = Color::Rgb(94, 129, 172); // #5E81AC
        let aurora_red = Color::Rgb(191, 97, 106); // #BF616A
        let aurora_orange = Color::Rgb(208, 135, 112); // #D08770
        let aurora_yellow = Color::Rgb(235, 203, 139); // #EBCB8B
        let aurora_green = Color::Rgb(163, 190, 140); // #A3BE8C
        let aurora_purple = Color::Rgb(180, 142, 173); // #B48EAD

        Self {
            app_name: Style::default().fg(frost_cyan).add_modifier(Modifier::BOLD),
            border: Style::default().fg(polar3),
            footer_help: Style::default().fg(polar3),

            node_actor: Style::default().fg(aurora_green),
            node_activity: Style::default().fg(aurora_yellow),
            node_object: Style::default().fg(frost_blue),
            node_collection: Style::default().fg(frost_teal),
            node_link: Style::default().fg(frost_dark),
            node_reference: Style::default().fg(snow0),

            node_syncing: Style::default().fg(aurora_orange),
            node_failed: Style::default().fg(aurora_red),

            error: Style::default().fg(aurora_red),
            info: Style::default().fg(frost_cyan),

            stat_selection: Style::default().fg(aurora_purple),
            stat_label: Style::default().fg(snow0),
            stat_value: Style::default().fg(snow2).add_modifier(Modifier::BOLD),
            stat_url: Style::default().fg(polar3),
            stat_system: Style::default().fg(frost_dark),
            stat_timing: Style::default().fg(aurora_yellow),
            header_class_bracket: Style::default().fg(polar3),

            detail_label: Style::default().fg(snow0),
        }
    }

    /// doom-nord-light color scheme.
    pub(crate) fn doom_nord_light() -> Self {
        let base7 = Color::Rgb(96, 114, 140); // #60728C
        let fg = Color::Rgb(59, 66, 82); // #3B4252
        let fg_alt = Color::Rgb(46, 52, 64); // #2E3440
        let red = Color::Rgb(153, 50, 75); // #99324B
        let orange = Color::Rgb(172, 68, 38); // #AC4426
        let green = Color::Rgb(79, 137, 76); // #4F894C
        let yellow = Color::Rgb(154, 117, 0); // #9A7500
        let blue = Color::Rgb(59, 110, 168); // #3B6EA8
        let dark_blue = Color::Rgb(82, 114, 175); // #5272AF
        let teal = Color::Rgb(41, 131, 141); // #29838D
        let cyan = Color::Rgb(57, 142, 172); // #398EAC
        let violet = Color::Rgb(132, 40, 121); // #842879

        Self {
            app_name: Style::default().fg(teal).add_modifier(Modifier::BOLD),
            border: Style::default().fg(base7),
            footer_help: Style::default().fg(base7),

            node_actor: Style::default().fg(green),
            node_activity: Style::default().fg(yellow),
            node_object: Style::default().fg(blue),
            node_collection: Style::default().fg(teal),
            node_link: Style::default().fg(dark_blue),
            node_reference: Style::default().fg(fg),

            node_syncing: Style::default().fg(orange),
            node_failed: Style::default().fg(red),

            error: Style::default().fg(red),
            info: Style::default().fg(cyan),

            stat_selection: Style::default().fg(violet),
            stat_label: Style::default().fg(fg),
            stat_value: Style::default().fg(fg_alt).add_modifier(Modifier::BOLD),
            stat_url: Style::default().fg(base7),
            stat_system: Style::default().fg(dark_blue),
            stat_timing: Style::default().fg(yellow),
            header_class_bracket: Style::default().fg(base7),

            detail_label: Style::default().fg(fg),
        }
    }

    /// Style for an item by its shape.
    pub(crate) fn item_style(&self, item: &Item) -> Style {
        match item {
            Item::Actor(_) => self.node_actor,
            Item::Activity(_) | Item::IntransitiveActivity(_) => self.node_activity,
            Item::Object(_) => self.node_object,
            Item::Collection(_) => self.node_collection,
            Item::Link(_) => self.node_link,
            Item::Reference(_) => self.node_reference,
        }
    }
}

/// Colors plus text.
pub(crate) struct Theme {
    pub(crate) scheme: ColorScheme,
    pub(crate) labels: Labels,
}

impl Theme {
    pub(crate) fn new(theme_name: ThemeName) -> Self {
        let scheme = match theme_name {
            ThemeName::Nord => ColorScheme::nord(),
            ThemeName::DoomNordLight => ColorScheme::doom_nord_light(),
        };
        Self {
            scheme,
            labels: Labels::en(),
        }
    }
}
