/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! The item model: a closed sum over the shapes a backend can return.
//!
//! Items are decoded from ActivityStreams JSON by dispatching on the
//! `type` property. Any property that may hold another item is kept as
//! an [`Item`] so it can be either a bare [`Item::Reference`] or a
//! concrete shape after dereferencing.

use serde_json::Map;
use serde_json::Value;

use crate::iri::Iri;

pub const ACTOR_TYPES: &[&str] = &["Application", "Group", "Organization", "Person", "Service"];

pub const INTRANSITIVE_ACTIVITY_TYPES: &[&str] = &["Arrive", "Travel", "Question"];

pub const ACTIVITY_TYPES: &[&str] = &[
    "Accept",
    "Add",
    "Announce",
    "Block",
    "Create",
    "Delete",
    "Dislike",
    "Flag",
    "Follow",
    "Ignore",
    "Invite",
    "Join",
    "Leave",
    "Like",
    "Listen",
    "Move",
    "Offer",
    "Read",
    "Reject",
    "Remove",
    "TentativeAccept",
    "TentativeReject",
    "Undo",
    "Update",
    "View",
];

pub const LINK_TYPES: &[&str] = &["Link", "Mention"];

/// Errors raised while decoding an item from its wire form.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("expected an object, array or reference, found {0}")]
    UnexpectedShape(&'static str),
}

/// A language-tagged string value (`name`, `summary`, `content`, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LangValue {
    pub lang: Option<String>,
    pub value: String,
}

/// All language variants of one natural-language property.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NaturalLanguageValues(pub Vec<LangValue>);

impl NaturalLanguageValues {
    pub fn plain(value: impl Into<String>) -> Self {
        Self(vec![LangValue {
            lang: None,
            value: value.into(),
        }])
    }

    /// The first non-empty value, regardless of language.
    pub fn first(&self) -> Option<&str> {
        self.0
            .iter()
            .map(|v| v.value.as_str())
            .find(|v| !v.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.first().is_none()
    }
}

/// Properties shared by every non-link shape.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Object {
    pub id: Iri,
    pub kind: String,
    pub name: NaturalLanguageValues,
    pub summary: NaturalLanguageValues,
    pub content: NaturalLanguageValues,
    pub media_type: Option<String>,
    pub published: Option<String>,
    pub updated: Option<String>,
    pub url: Option<Item>,
    pub attributed_to: Option<Item>,
    pub in_reply_to: Option<Item>,
    pub tag: Vec<Item>,
    pub to: Vec<Item>,
    pub cc: Vec<Item>,
    pub bto: Vec<Item>,
    pub bcc: Vec<Item>,
    pub audience: Vec<Item>,
    pub likes: Option<Item>,
    pub shares: Option<Item>,
    pub replies: Option<Item>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Actor {
    pub object: Object,
    pub preferred_username: NaturalLanguageValues,
    pub inbox: Option<Item>,
    pub outbox: Option<Item>,
    pub liked: Option<Item>,
    pub followers: Option<Item>,
    pub following: Option<Item>,
    pub streams: Vec<Item>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IntransitiveActivity {
    pub object: Object,
    pub actor: Option<Item>,
    pub target: Option<Item>,
    pub result: Option<Item>,
    pub origin: Option<Item>,
    pub instrument: Option<Item>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Activity {
    pub intransitive: IntransitiveActivity,
    pub object: Option<Item>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Link {
    pub id: Iri,
    pub kind: String,
    pub href: Iri,
    pub name: NaturalLanguageValues,
    pub media_type: Option<String>,
}

/// The collection shapes. `Items` is an anonymous JSON array.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CollectionKind {
    Collection,
    #[default]
    OrderedCollection,
    CollectionPage,
    OrderedCollectionPage,
    Items,
}

impl CollectionKind {
    fn from_type(kind: &str) -> Option<Self> {
        match kind {
            "Collection" => Some(Self::Collection),
            "OrderedCollection" => Some(Self::OrderedCollection),
            "CollectionPage" => Some(Self::CollectionPage),
            "OrderedCollectionPage" => Some(Self::OrderedCollectionPage),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Collection => "Collection",
            Self::OrderedCollection => "OrderedCollection",
            Self::CollectionPage => "CollectionPage",
            Self::OrderedCollectionPage => "OrderedCollectionPage",
            Self::Items => "",
        }
    }

    /// Whether this is an explicit page of a larger collection.
    pub fn is_page(&self) -> bool {
        matches!(self, Self::CollectionPage | Self::OrderedCollectionPage)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Collection {
    pub object: Object,
    pub kind: CollectionKind,
    pub total_items: usize,
    pub items: Vec<Item>,
    pub first: Option<Item>,
    pub last: Option<Item>,
    pub next: Option<Item>,
    pub prev: Option<Item>,
    pub part_of: Option<Item>,
}

impl Collection {
    /// An anonymous collection of the given items.
    pub fn of(items: Vec<Item>) -> Self {
        Self {
            kind: CollectionKind::Items,
            total_items: items.len(),
            items,
            ..Default::default()
        }
    }

    pub fn id(&self) -> &Iri {
        &self.object.id
    }
}

/// One node of the federated object graph.
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Reference(Iri),
    Object(Box<Object>),
    Link(Box<Link>),
    Actor(Box<Actor>),
    Activity(Box<Activity>),
    IntransitiveActivity(Box<IntransitiveActivity>),
    Collection(Box<Collection>),
}

impl Item {
    /// The identifying reference of this item.
    pub fn id(&self) -> &Iri {
        match self {
            Item::Reference(iri) => iri,
            Item::Link(link) => {
                if link.id.is_empty() {
                    &link.href
                } else {
                    &link.id
                }
            }
            Item::Object(_)
            | Item::Actor(_)
            | Item::Activity(_)
            | Item::IntransitiveActivity(_)
            | Item::Collection(_) => self.object_props().map_or(&EMPTY_IRI, |o| &o.id),
        }
    }

    /// The ActivityStreams type tag, empty for bare references and
    /// anonymous collections.
    pub fn type_name(&self) -> &str {
        match self {
            Item::Reference(_) => "",
            Item::Link(link) => &link.kind,
            Item::Collection(col) if col.kind == CollectionKind::Items => "",
            _ => self.object_props().map_or("", |o| o.kind.as_str()),
        }
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, Item::Reference(_))
    }

    pub fn is_collection(&self) -> bool {
        matches!(self, Item::Collection(_))
    }

    pub fn as_collection(&self) -> Option<&Collection> {
        match self {
            Item::Collection(col) => Some(col),
            _ => None,
        }
    }

    /// The shared object properties, for every shape that has them.
    pub fn object_props(&self) -> Option<&Object> {
        match self {
            Item::Object(obj) => Some(obj),
            Item::Actor(actor) => Some(&actor.object),
            Item::Activity(act) => Some(&act.intransitive.object),
            Item::IntransitiveActivity(act) => Some(&act.object),
            Item::Collection(col) => Some(&col.object),
            Item::Reference(_) | Item::Link(_) => None,
        }
    }

    pub fn object_props_mut(&mut self) -> Option<&mut Object> {
        match self {
            Item::Object(obj) => Some(obj),
            Item::Actor(actor) => Some(&mut actor.object),
            Item::Activity(act) => Some(&mut act.intransitive.object),
            Item::IntransitiveActivity(act) => Some(&mut act.object),
            Item::Collection(col) => Some(&mut col.object),
            Item::Reference(_) | Item::Link(_) => None,
        }
    }

    /// Decode an item from raw JSON bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Item, DecodeError> {
        let value: Value = serde_json::from_slice(bytes)?;
        Item::from_value(&value)
    }

    /// Decode an item from a JSON value.
    pub fn from_value(value: &Value) -> Result<Item, DecodeError> {
        match value {
            Value::String(s) => Ok(Item::Reference(Iri::new(s.as_str()))),
            Value::Array(values) => {
                let items = values
                    .iter()
                    .filter(|v| !v.is_null())
                    .map(Item::from_value)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Item::Collection(Box::new(Collection::of(items))))
            }
            Value::Object(map) => Ok(decode_object(map)),
            Value::Null => Err(DecodeError::UnexpectedShape("null")),
            Value::Bool(_) => Err(DecodeError::UnexpectedShape("boolean")),
            Value::Number(_) => Err(DecodeError::UnexpectedShape("number")),
        }
    }
}

static EMPTY_IRI: Iri = Iri::empty();

impl From<Iri> for Item {
    fn from(iri: Iri) -> Self {
        Item::Reference(iri)
    }
}

fn type_of(map: &Map<String, Value>) -> String {
    match map.get("type") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(types)) => types
            .iter()
            .find_map(|t| t.as_str())
            .unwrap_or_default()
            .to_string(),
        _ => String::new(),
    }
}

fn decode_object(map: &Map<String, Value>) -> Item {
    let kind = type_of(map);
    if LINK_TYPES.contains(&kind.as_str()) {
        return Item::Link(Box::new(Link {
            id: iri_prop(map, "id"),
            href: iri_prop(map, "href"),
            name: nlv_prop(map, "name"),
            media_type: str_prop(map, "mediaType"),
            kind,
        }));
    }

    let object = object_props(map, kind.clone());
    if ACTOR_TYPES.contains(&kind.as_str()) {
        return Item::Actor(Box::new(Actor {
            object,
            preferred_username: nlv_prop(map, "preferredUsername"),
            inbox: item_prop(map, "inbox"),
            outbox: item_prop(map, "outbox"),
            liked: item_prop(map, "liked"),
            followers: item_prop(map, "followers"),
            following: item_prop(map, "following"),
            streams: items_prop(map, "streams"),
        }));
    }
    if INTRANSITIVE_ACTIVITY_TYPES.contains(&kind.as_str()) {
        return Item::IntransitiveActivity(Box::new(intransitive_props(map, object)));
    }
    if ACTIVITY_TYPES.contains(&kind.as_str()) {
        return Item::Activity(Box::new(Activity {
            intransitive: intransitive_props(map, object),
            object: item_prop(map, "object"),
        }));
    }
    if let Some(col_kind) = CollectionKind::from_type(&kind) {
        let mut items = items_prop(map, "orderedItems");
        if items.is_empty() {
            items = items_prop(map, "items");
        }
        // An explicit page without a total leaves it unknown (zero).
        let total_items = map
            .get("totalItems")
            .and_then(Value::as_u64)
            .map_or(if col_kind.is_page() { 0 } else { items.len() }, |n| {
                n as usize
            });
        return Item::Collection(Box::new(Collection {
            object,
            kind: col_kind,
            total_items,
            items,
            first: item_prop(map, "first"),
            last: item_prop(map, "last"),
            next: item_prop(map, "next"),
            prev: item_prop(map, "prev"),
            part_of: item_prop(map, "partOf"),
        }));
    }
    Item::Object(Box::new(object))
}

fn intransitive_props(map: &Map<String, Value>, object: Object) -> IntransitiveActivity {
    IntransitiveActivity {
        object,
        actor: item_prop(map, "actor"),
        target: item_prop(map, "target"),
        result: item_prop(map, "result"),
        origin: item_prop(map, "origin"),
        instrument: item_prop(map, "instrument"),
    }
}

fn object_props(map: &Map<String, Value>, kind: String) -> Object {
    Object {
        id: iri_prop(map, "id"),
        kind,
        name: nlv_prop(map, "name"),
        summary: nlv_prop(map, "summary"),
        content: nlv_prop(map, "content"),
        media_type: str_prop(map, "mediaType"),
        published: str_prop(map, "published"),
        updated: str_prop(map, "updated"),
        url: item_prop(map, "url"),
        attributed_to: item_prop(map, "attributedTo"),
        in_reply_to: item_prop(map, "inReplyTo"),
        tag: items_prop(map, "tag"),
        to: items_prop(map, "to"),
        cc: items_prop(map, "cc"),
        bto: items_prop(map, "bto"),
        bcc: items_prop(map, "bcc"),
        audience: items_prop(map, "audience"),
        likes: item_prop(map, "likes"),
        shares: item_prop(map, "shares"),
        replies: item_prop(map, "replies"),
    }
}

fn iri_prop(map: &Map<String, Value>, key: &str) -> Iri {
    map.get(key)
        .and_then(Value::as_str)
        .map(Iri::from)
        .unwrap_or_default()
}

fn str_prop(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key).and_then(Value::as_str).map(str::to_string)
}

// Malformed nested values are dropped rather than failing the whole
// item; a backend may hand us partially-valid documents.
fn item_prop(map: &Map<String, Value>, key: &str) -> Option<Item> {
    map.get(key)
        .filter(|v| !v.is_null())
        .and_then(|v| Item::from_value(v).ok())
}

fn items_prop(map: &Map<String, Value>, key: &str) -> Vec<Item> {
    match map.get(key) {
        Some(Value::Array(values)) => values
            .iter()
            .filter_map(|v| Item::from_value(v).ok())
            .collect(),
        Some(Value::Null) | None => Vec::new(),
        Some(other) => Item::from_value(other).into_iter().collect(),
    }
}

fn nlv_prop(map: &Map<String, Value>, key: &str) -> NaturalLanguageValues {
    let mut values = Vec::new();
    if let Some(Value::String(s)) = map.get(key) {
        values.push(LangValue {
            lang: None,
            value: s.clone(),
        });
    }
    if let Some(Value::Object(langs)) = map.get(&format!("{}Map", key)) {
        for (lang, value) in langs {
            if let Some(s) = value.as_str() {
                values.push(LangValue {
                    lang: Some(lang.clone()),
                    value: s.to_string(),
                });
            }
        }
    }
    NaturalLanguageValues(values)
}
