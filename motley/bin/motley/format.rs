/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

use motley::item::Collection;
use motley::item::IntransitiveActivity;
use motley::item::Item;
use motley::item::NaturalLanguageValues;
use motley::item::Object;
use motley::node::Node;
use motley::node::display_name;

use crate::theme::Labels;

/// One `label: value` line of the detail pane.
pub(crate) type DetailLine = (&'static str, String);

/// How a referenced item reads inline: the bare IRI for references,
/// otherwise its name followed by its IRI.
pub(crate) fn format_ref(item: &Item) -> String {
    match item {
        Item::Reference(iri) => iri.to_string(),
        _ => {
            let name = display_name(item);
            let id = item.id().as_str();
            if id.is_empty() || name == id {
                name
            } else {
                format!("{} <{}>", name, id)
            }
        }
    }
}

pub(crate) fn format_refs<'a>(items: impl IntoIterator<Item = &'a Item>) -> String {
    items
        .into_iter()
        .filter(|it| !it.id().is_public())
        .map(format_ref)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Collapse runs of whitespace, including newlines, to single spaces.
pub(crate) fn one_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// The short state tag shown next to a node.
pub(crate) fn state_label(node: &Node, labels: &Labels) -> &'static str {
    let state = node.state();
    if state.is_syncing() {
        labels.syncing
    } else if state.is_error() {
        labels.failed
    } else if state.is_synced() {
        labels.synced
    } else {
        labels.pending
    }
}

/// The type-specific fields of `item`, empty ones left out.
pub(crate) fn detail_lines(item: &Item, labels: &Labels) -> Vec<DetailLine> {
    let mut out = Vec::new();
    push(&mut out, labels.id, item.id().to_string());
    push(&mut out, labels.kind, item.type_name().to_string());

    match item {
        Item::Reference(_) => {}
        Item::Link(link) => {
            push(&mut out, labels.href, link.href.to_string());
            push_text(&mut out, labels.name, &link.name);
            push(&mut out, labels.media_type, link.media_type.clone().unwrap_or_default());
        }
        Item::Object(obj) => object_lines(&mut out, obj, labels),
        Item::Actor(actor) => {
            push_text(&mut out, labels.username, &actor.preferred_username);
            object_lines(&mut out, &actor.object, labels);
            push_opt(&mut out, labels.inbox, &actor.inbox);
            push_opt(&mut out, labels.outbox, &actor.outbox);
            push_opt(&mut out, labels.liked, &actor.liked);
            push_opt(&mut out, labels.followers, &actor.followers);
            push_opt(&mut out, labels.following, &actor.following);
            push(&mut out, labels.streams, format_refs(&actor.streams));
        }
        Item::IntransitiveActivity(act) => activity_lines(&mut out, act, None, labels),
        Item::Activity(act) => {
            activity_lines(&mut out, &act.intransitive, act.object.as_ref(), labels)
        }
        Item::Collection(col) => collection_lines(&mut out, col, labels),
    }
    out
}

fn object_lines(out: &mut Vec<DetailLine>, obj: &Object, labels: &Labels) {
    push(out, labels.media_type, obj.media_type.clone().unwrap_or_default());
    push_text(out, labels.name, &obj.name);
    push_text(out, labels.summary, &obj.summary);
    push_text(out, labels.content, &obj.content);
    push(out, labels.published, obj.published.clone().unwrap_or_default());
    push(out, labels.updated, obj.updated.clone().unwrap_or_default());
    push_opt(out, labels.url, &obj.url);
    push_opt(out, labels.attributed_to, &obj.attributed_to);
    push_opt(out, labels.in_reply_to, &obj.in_reply_to);
    let recipients = obj
        .to
        .iter()
        .chain(&obj.cc)
        .chain(&obj.bto)
        .chain(&obj.bcc)
        .chain(&obj.audience);
    push(out, labels.recipients, format_refs(recipients));
    push(out, labels.tags, format_refs(&obj.tag));
}

fn activity_lines(
    out: &mut Vec<DetailLine>,
    act: &IntransitiveActivity,
    object: Option<&Item>,
    labels: &Labels,
) {
    push_opt(out, labels.actor, &act.actor);
    if let Some(object) = object {
        push(out, labels.object, format_ref(object));
    }
    push_opt(out, labels.target, &act.target);
    push_opt(out, labels.result, &act.result);
    push_opt(out, labels.origin, &act.origin);
    push_opt(out, labels.instrument, &act.instrument);
    object_lines(out, &act.object, labels);
}

fn collection_lines(out: &mut Vec<DetailLine>, col: &Collection, labels: &Labels) {
    push(out, labels.total_items, col.total_items.to_string());
    push(out, labels.children, col.items.len().to_string());
    push_opt(out, labels.first, &col.first);
    push_opt(out, labels.next, &col.next);
    push_opt(out, labels.prev, &col.prev);
    push_opt(out, labels.part_of, &col.part_of);
    push_text(out, labels.name, &col.object.name);
    push_text(out, labels.summary, &col.object.summary);
}

fn push(out: &mut Vec<DetailLine>, label: &'static str, value: String) {
    if !value.is_empty() {
        out.push((label, value));
    }
}

fn push_opt(out: &mut Vec<DetailLine>, label: &'static str, value: &Option<Item>) {
    if let Some(item) = value {
        push(out, label, format_ref(item));
    }
}

fn push_text(out: &mut Vec<DetailLine>, label: &'static str, value: &NaturalLanguageValues) {
    if let Some(text) = value.first() {
        push(out, label, one_line(text));
    }
}
