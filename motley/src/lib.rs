/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Lazy tree navigation over a federated ActivityPub object graph.
//!
//! The graph is read through one or more storage backends, each
//! authoritative for the subtree under its root ([`store`]). A
//! [`session::Session`] presents the roots as a tree and loads a node
//! only when it is selected: bare references are materialised, their
//! direct references resolved one level deep ([`deref`]), and
//! collections paged in up to a bound ([`collector`]). Advancing into
//! a subtree and going back ([`navigation`]) reuses everything loaded.

pub mod collector;
pub mod config;
pub mod deref;
pub mod iri;
pub mod item;
pub mod navigation;
pub mod node;
pub mod scope;
pub mod session;
pub mod storage;
pub mod store;
pub mod telemetry;
#[cfg(any(test, feature = "testing"))]
pub mod test_utils;
pub mod tree;
