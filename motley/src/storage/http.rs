/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Read-only access to a live ActivityPub server.
//!
//! Items are fetched with `GET <iri>` and ActivityStreams content
//! negotiation. Filters travel as the `after`, `before` and `maxItems`
//! query parameters.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::ACCEPT;

use super::Backend;
use super::Filters;
use super::StorageError;
use crate::iri::Iri;
use crate::item::Item;

const ACCEPT_ACTIVITY: &str =
    "application/activity+json, application/ld+json; profile=\"https://www.w3.org/ns/activitystreams\"";

#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
}

impl HttpBackend {
    pub fn new(timeout: Duration) -> Result<Self, StorageError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("motley/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| StorageError::Unreachable {
                iri: Iri::empty(),
                reason: format!("building HTTP client: {}", err),
            })?;
        Ok(Self { client })
    }

    async fn get(&self, iri: &Iri, filters: &Filters) -> Result<Item, StorageError> {
        let unreachable = |reason: String| StorageError::Unreachable {
            iri: iri.clone(),
            reason,
        };
        let resp = self
            .client
            .get(iri.as_str())
            .query(filters)
            .header(ACCEPT, ACCEPT_ACTIVITY)
            .send()
            .await
            .map_err(|e| unreachable(format!("request failed: {}", e)))?;
        match resp.status() {
            status if status.is_success() => {
                let bytes = resp
                    .bytes()
                    .await
                    .map_err(|e| unreachable(format!("reading body: {}", e)))?;
                Item::from_slice(&bytes).map_err(|source| StorageError::Decode {
                    iri: iri.clone(),
                    source,
                })
            }
            StatusCode::NOT_FOUND | StatusCode::GONE => Err(StorageError::NotFound(iri.clone())),
            status => Err(unreachable(format!("HTTP {}", status))),
        }
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn load(&self, iri: &Iri, filters: &Filters) -> Result<Item, StorageError> {
        let item = self.get(iri, filters).await?;

        // Servers commonly return a collection header whose elements
        // live on its first page.
        if let Item::Collection(col) = &item
            && filters.after.is_none()
            && filters.before.is_none()
            && col.items.is_empty()
            && !col.kind.is_page()
            && let Some(first) = &col.first
        {
            match first {
                Item::Reference(first_iri) if first_iri != iri => {
                    tracing::trace!(iri = %iri, first = %first_iri, "following first page");
                    return self.get(first_iri, &Filters::default()).await;
                }
                Item::Collection(_) => return Ok(first.clone()),
                _ => {}
            }
        }
        Ok(item)
    }

    fn describe(&self) -> String {
        "http".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unreachable_host_is_reported() {
        let backend = HttpBackend::new(Duration::from_millis(200)).unwrap();
        let err = backend
            .load(&"http://127.0.0.1:1/objects/1".into(), &Filters::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Unreachable { .. }));
    }
}
