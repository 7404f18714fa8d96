//! Frontier of URLs waiting to be fetched
//!
//! This module handles:
//! - The FIFO queue of pending URLs (breadth-first order)
//! - The visited set that guarantees a URL is enqueued at most once

use std::collections::{HashSet, VecDeque};

/// FIFO work queue gated by a visited set
///
/// A URL enters the visited set in the same call that appends it to the
/// queue, so membership in the visited set is the only duplicate check ever
/// needed; the queue itself is never scanned.
#[derive(Debug, Default)]
pub struct Frontier {
    /// Every URL ever enqueued
    visited: HashSet<String>,

    /// URLs still waiting to be fetched, oldest first
    pending: VecDeque<String>,
}

impl Frontier {
    /// Creates an empty frontier
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueues a URL unless it has been seen before
    ///
    /// # Returns
    ///
    /// * `true` - The URL was new and is now at the tail of the queue
    /// * `false` - The URL was already visited; nothing changed
    pub fn enqueue_if_new(&mut self, url: &str) -> bool {
        if self.visited.contains(url) {
            return false;
        }

        self.visited.insert(url.to_string());
        self.pending.push_back(url.to_string());
        tracing::trace!("Enqueued {} ({} pending)", url, self.pending.len());
        true
    }

    /// Enqueues every new URL from `urls`, returning how many were added
    pub fn extend<'a, I>(&mut self, urls: I) -> usize
    where
        I: IntoIterator<Item = &'a String>,
    {
        urls.into_iter()
            .filter(|url| self.enqueue_if_new(url))
            .count()
    }

    /// Removes up to `max_size` URLs from the head of the queue
    pub fn dequeue_batch(&mut self, max_size: usize) -> Vec<String> {
        let take = max_size.min(self.pending.len());
        self.pending.drain(..take).collect()
    }

    /// Returns whether no URL is pending
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Returns the number of pending URLs
    pub fn size(&self) -> usize {
        self.pending.len()
    }

    /// Returns whether a URL has ever been enqueued
    pub fn is_visited(&self, url: &str) -> bool {
        self.visited.contains(url)
    }

    /// Returns the number of URLs ever enqueued
    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }
}
