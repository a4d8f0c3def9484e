/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! One-level resolution of an item's reference-valued properties.
//!
//! Only the references an item holds directly are resolved. Items
//! substituted in are not themselves dereferenced, which keeps each
//! pass bounded to one load per property value.

use std::collections::HashMap;
use std::collections::HashSet;

use tokio::task::JoinSet;
use tracing::Span;

use crate::collector::CollectError;
use crate::collector::Collector;
use crate::iri::Iri;
use crate::item::CollectionKind;
use crate::item::Item;
use crate::scope::Scope;
use crate::scope::ScopeError;

/// A reference-valued property the dereferencer knows how to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Property {
    AttributedTo,
    InReplyTo,
    Tag,
    To,
    Cc,
    Bto,
    Bcc,
    Audience,
    Actor,
    Target,
    Instrument,
    Result,
    Object,
    /// The elements of a collection.
    Items,
}

const OBJECT_PROPERTIES: &[Property] = &[
    Property::AttributedTo,
    Property::InReplyTo,
    Property::Tag,
    Property::To,
    Property::Cc,
    Property::Bto,
    Property::Bcc,
    Property::Audience,
];

const INTRANSITIVE_PROPERTIES: &[Property] = &[
    Property::AttributedTo,
    Property::InReplyTo,
    Property::Tag,
    Property::To,
    Property::Cc,
    Property::Bto,
    Property::Bcc,
    Property::Audience,
    Property::Actor,
    Property::Target,
    Property::Instrument,
    Property::Result,
];

const ACTIVITY_PROPERTIES: &[Property] = &[
    Property::AttributedTo,
    Property::InReplyTo,
    Property::Tag,
    Property::To,
    Property::Cc,
    Property::Bto,
    Property::Bcc,
    Property::Audience,
    Property::Actor,
    Property::Target,
    Property::Instrument,
    Property::Result,
    Property::Object,
];

/// The properties resolved for `item`, by shape.
pub fn properties(item: &Item) -> &'static [Property] {
    match item {
        Item::Object(_) | Item::Actor(_) => OBJECT_PROPERTIES,
        Item::IntransitiveActivity(_) => INTRANSITIVE_PROPERTIES,
        Item::Activity(_) => ACTIVITY_PROPERTIES,
        Item::Collection(_) => &[Property::Items],
        Item::Link(_) | Item::Reference(_) => &[],
    }
}

enum Place<'a> {
    One(&'a mut Option<Item>),
    Many(&'a mut Vec<Item>),
}

fn place(item: &mut Item, prop: Property) -> Option<Place<'_>> {
    let place = match (item, prop) {
        (Item::Collection(col), Property::Items) => Place::Many(&mut col.items),
        (Item::Activity(act), Property::Object) => Place::One(&mut act.object),
        (Item::Activity(act), Property::Actor) => Place::One(&mut act.intransitive.actor),
        (Item::Activity(act), Property::Target) => Place::One(&mut act.intransitive.target),
        (Item::Activity(act), Property::Instrument) => {
            Place::One(&mut act.intransitive.instrument)
        }
        (Item::Activity(act), Property::Result) => Place::One(&mut act.intransitive.result),
        (Item::IntransitiveActivity(act), Property::Actor) => Place::One(&mut act.actor),
        (Item::IntransitiveActivity(act), Property::Target) => Place::One(&mut act.target),
        (Item::IntransitiveActivity(act), Property::Instrument) => {
            Place::One(&mut act.instrument)
        }
        (Item::IntransitiveActivity(act), Property::Result) => Place::One(&mut act.result),
        (item, prop) => {
            let obj = item.object_props_mut()?;
            match prop {
                Property::AttributedTo => Place::One(&mut obj.attributed_to),
                Property::InReplyTo => Place::One(&mut obj.in_reply_to),
                Property::Tag => Place::Many(&mut obj.tag),
                Property::To => Place::Many(&mut obj.to),
                Property::Cc => Place::Many(&mut obj.cc),
                Property::Bto => Place::Many(&mut obj.bto),
                Property::Bcc => Place::Many(&mut obj.bcc),
                Property::Audience => Place::Many(&mut obj.audience),
                _ => return None,
            }
        }
    };
    Some(place)
}

/// A reference still worth loading: bare, non-empty and not public.
fn unresolved(item: &Item) -> Option<&Iri> {
    match item {
        Item::Reference(iri) if !iri.is_empty() && !iri.is_public() => Some(iri),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct Slot {
    prop: Property,
    index: usize,
}

/// Counts from one dereference pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DerefSummary {
    pub resolved: usize,
    /// References left unresolved because their load failed.
    pub failed: usize,
}

/// Resolves references through a [`Collector`].
#[derive(Debug, Clone)]
pub struct Dereferencer {
    collector: Collector,
    span: Span,
}

impl Dereferencer {
    pub fn new(collector: Collector, span: Span) -> Self {
        Self { collector, span }
    }

    /// Resolve the unresolved references held directly by `item`, in
    /// place. Every reference is loaded as its own task under `scope`.
    ///
    /// A failed load leaves its reference untouched. Only the scope
    /// ending early fails the pass, and then `item` is left as it was.
    pub async fn dereference(
        &self,
        scope: &Scope,
        item: &mut Item,
    ) -> Result<DerefSummary, ScopeError> {
        let mut pending = Vec::new();
        for &prop in properties(item) {
            match place(item, prop) {
                Some(Place::One(Some(value))) => {
                    if let Some(iri) = unresolved(value) {
                        pending.push((Slot { prop, index: 0 }, iri.clone()));
                    }
                }
                Some(Place::Many(values)) => {
                    for (index, value) in values.iter().enumerate() {
                        if let Some(iri) = unresolved(value) {
                            pending.push((Slot { prop, index }, iri.clone()));
                        }
                    }
                }
                Some(Place::One(None)) | None => {}
            }
        }
        if pending.is_empty() {
            return Ok(DerefSummary::default());
        }

        // One load per distinct reference, fanned back out to its slots.
        let mut slots: HashMap<Iri, Vec<Slot>> = HashMap::new();
        for (slot, iri) in pending {
            slots.entry(iri).or_default().push(slot);
        }

        let mut tasks: JoinSet<(Iri, Result<Item, CollectError>)> = JoinSet::new();
        for iri in slots.keys().cloned() {
            let collector = self.collector.clone();
            let scope = scope.child();
            tasks.spawn(async move {
                let res = collector.load_one(&scope, &iri).await;
                (iri, res)
            });
        }

        let mut summary = DerefSummary::default();
        let mut resolved = HashMap::new();
        while let Some(joined) = scope.run(tasks.join_next()).await? {
            match joined {
                Ok((iri, Ok(value))) => {
                    for &slot in slots.get(&iri).into_iter().flatten() {
                        resolved.insert(slot, value.clone());
                    }
                }
                Ok((iri, Err(err))) => {
                    if let CollectError::Scope(err) = err {
                        return Err(err);
                    }
                    let held = slots.get(&iri).map_or(&[][..], Vec::as_slice);
                    summary.failed += held.len();
                    tracing::debug!(
                        parent: &self.span,
                        item = %item.id(),
                        properties = ?held.iter().map(|slot| slot.prop).collect::<Vec<_>>(),
                        iri = %iri,
                        error = %err,
                        "unable to dereference"
                    );
                }
                Err(err) => {
                    summary.failed += 1;
                    tracing::warn!(parent: &self.span, item = %item.id(), error = %err, "dereference task failed");
                }
            }
        }
        summary.resolved = resolved.len();

        for &prop in properties(item) {
            match place(item, prop) {
                Some(Place::One(value)) => {
                    if let Some(found) = resolved.remove(&Slot { prop, index: 0 }) {
                        *value = Some(found);
                    }
                }
                Some(Place::Many(values)) => {
                    let old = std::mem::take(values);
                    for (index, value) in old.into_iter().enumerate() {
                        match resolved.remove(&Slot { prop, index }) {
                            Some(Item::Collection(col)) if col.kind == CollectionKind::Items => {
                                values.extend(col.items);
                            }
                            Some(found) => values.push(found),
                            None => values.push(value),
                        }
                    }
                    dedup_by_id(values);
                }
                None => {}
            }
        }

        tracing::debug!(
            parent: &self.span,
            item = %item.id(),
            resolved = summary.resolved,
            failed = summary.failed,
            "dereferenced"
        );
        Ok(summary)
    }
}

/// Drop later items sharing an id with an earlier one. Anonymous items
/// are kept.
fn dedup_by_id(items: &mut Vec<Item>) {
    let mut seen = HashSet::new();
    items.retain(|item| {
        let id = item.id();
        id.is_empty() || seen.insert(id.clone())
    });
}
