/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Cancellable, time-bounded scopes for background loads.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Why a scoped future did not complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ScopeError {
    #[error("cancelled")]
    Cancelled,
    #[error("timed out")]
    TimedOut,
}

/// A cancellation token paired with a deadline.
///
/// Child scopes share the deadline and are cancelled with their
/// parent. Cancellation is cooperative: work already handed to a
/// backend may finish, but [`Scope::run`] reports it as cancelled.
#[derive(Debug, Clone)]
pub struct Scope {
    token: CancellationToken,
    deadline: Instant,
}

impl Scope {
    pub fn new(timeout: Duration) -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: Instant::now() + timeout,
        }
    }

    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Drive `fut` until it completes, the scope is cancelled, or the
    /// deadline passes.
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output, ScopeError> {
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(ScopeError::Cancelled),
            res = tokio::time::timeout_at(self.deadline, fut) => res.map_err(|_| ScopeError::TimedOut),
        }
    }
}
