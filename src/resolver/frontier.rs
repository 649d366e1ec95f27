// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Search bookkeeping.
//!
//! The __frontier__ holds tokens that changed and still need their dependents
//! looked up. The __closed list__ holds tokens that were already expanded.

use std::collections::{HashSet, VecDeque};

/// FIFO worklist of tokens awaiting expansion.
///
/// # Invariant
///
/// - No token is queued twice.
/// - Tokens pop in insertion order.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct Frontier {
    queue: VecDeque<String>,
    queued: HashSet<String>,
}

impl Frontier {
    /// Construct new empty frontier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue token at the back of the frontier.
    ///
    /// Returns `false` if the token was already queued.
    pub fn push(&mut self, token: impl Into<String>) -> bool {
        let token = token.into();
        if self.queued.contains(&token) {
            return false;
        }

        self.queued.insert(token.clone());
        self.queue.push_back(token);
        true
    }

    /// Take next token from the front of the frontier.
    pub fn pop(&mut self) -> Option<String> {
        let token = self.queue.pop_front()?;
        self.queued.remove(&token);
        Some(token)
    }

    /// Token is currently queued.
    pub fn contains(&self, token: impl AsRef<str>) -> bool {
        self.queued.contains(token.as_ref())
    }

    /// Iterate through queued tokens in pop order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.queue.iter().map(String::as_str)
    }

    /// Nothing left to expand.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Number of queued tokens.
    pub fn len(&self) -> usize {
        self.queue.len()
    }
}

impl<S> Extend<S> for Frontier
where
    S: Into<String>,
{
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        for token in iter {
            self.push(token);
        }
    }
}

impl<S> FromIterator<S> for Frontier
where
    S: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut frontier = Self::new();
        frontier.extend(iter);
        frontier
    }
}

/// Tokens that were already expanded.
///
/// Only ever grows.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct ClosedList(HashSet<String>);

impl ClosedList {
    /// Construct new empty closed list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark token as expanded.
    pub fn close(&mut self, token: impl Into<String>) {
        self.0.insert(token.into());
    }

    /// Token was already expanded.
    pub fn contains(&self, token: impl AsRef<str>) -> bool {
        self.0.contains(token.as_ref())
    }

    /// Number of expanded tokens.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Nothing expanded yet.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
