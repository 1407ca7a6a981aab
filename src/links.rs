//! Deferred resolution of cross-place references
//!
//! Places reference each other by URI, and a target may be read before or
//! after the record that points at it (or never). Links are kept in an arena
//! and indexed by target URI; every place read is matched against that index,
//! and every new link is matched against the places already seen.

use crate::rows::LinkPayload;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, error};

/// A reference from one place to another, not yet known to be resolvable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingLink {
    pub source_id: String,
    /// URI of the target place, used for matching
    pub target_key: String,
    /// Target place id, set exactly once
    pub resolved: Option<String>,
    pub payload: LinkPayload,
}

impl PendingLink {
    pub fn new(source_id: impl Into<String>, target_key: impl Into<String>, payload: LinkPayload) -> Self {
        Self {
            source_id: source_id.into(),
            target_key: target_key.into(),
            resolved: None,
            payload,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved.is_some()
    }

    /// Set the target id on the link and its payload. Returns false if the
    /// link was already resolved, leaving it untouched.
    fn resolve(&mut self, target_id: &str) -> bool {
        if self.resolved.is_some() {
            return false;
        }
        self.resolved = Some(target_id.to_string());
        self.payload.set_target(target_id);
        true
    }
}

/// Run-scoped set of pending links.
#[derive(Debug, Default)]
pub struct LinkResolver {
    links: Vec<PendingLink>,
    /// Target URI -> slots in `links` still waiting for it
    waiting: HashMap<String, Vec<usize>>,
    /// Place URI -> place id, for every place read so far
    seen: HashMap<String, String>,
    resolved: usize,
}

impl LinkResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a link, resolving it at once if its target was already read.
    pub fn add(&mut self, mut link: PendingLink) {
        let slot = self.links.len();
        match self.seen.get(&link.target_key) {
            Some(target_id) => {
                if link.resolve(target_id) {
                    self.resolved += 1;
                }
            }
            None => self.waiting.entry(link.target_key.clone()).or_default().push(slot),
        }
        self.links.push(link);
    }

    /// Record a newly read place and resolve every link waiting for its URI.
    /// Returns the number of links resolved.
    pub fn resolve_against(&mut self, place_id: &str, place_uri: &str) -> usize {
        if place_uri.is_empty() {
            return 0;
        }
        self.seen.insert(place_uri.to_string(), place_id.to_string());

        let Some(slots) = self.waiting.remove(place_uri) else {
            return 0;
        };
        let mut count = 0;
        for slot in slots {
            if self.links[slot].resolve(place_id) {
                count += 1;
            }
        }
        self.resolved += count;
        debug!(place_id, count, "resolved forward links");
        count
    }

    /// Drop every link still unresolved, logging each. Returns how many
    /// were dropped.
    pub fn drain_unresolved(&mut self) -> usize {
        let before = self.links.len();
        self.links.retain(|link| {
            if !link.is_resolved() {
                error!(
                    source = %link.source_id,
                    target = %link.target_key,
                    "unresolved link"
                );
            }
            link.is_resolved()
        });
        self.waiting.clear();
        before - self.links.len()
    }

    pub fn links(&self) -> &[PendingLink] {
        &self.links
    }

    pub fn into_links(self) -> Vec<PendingLink> {
        self.links
    }

    /// Move the links out, leaving the resolver empty of links but still
    /// aware of the places it has seen.
    pub fn take_links(&mut self) -> Vec<PendingLink> {
        self.waiting.clear();
        std::mem::take(&mut self.links)
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn resolved_count(&self) -> usize {
        self.resolved
    }

    pub fn pending_count(&self) -> usize {
        self.waiting.values().map(Vec::len).sum()
    }
}
