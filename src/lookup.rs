//! Lookup interning: categorical strings to dense integer surrogate keys
//!
//! Every categorical value met during an import (review states, certainty
//! URIs, reference types, ...) is replaced by a small positive integer.
//! Ids are assigned in first-seen order, so the order of `get_id` calls
//! decides the final table. The set is single-threaded by construction:
//! it is owned by the reader and borrowed by the adapter, never shared.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Group for review states (`review_state`)
pub const STATE_GROUP: &str = "state";
/// Group for name types (`nameType`)
pub const NAME_TYPE_GROUP: &str = "name-type";
/// Group for name transcription accuracy
pub const NAME_ACCURACY_GROUP: &str = "name-trac";
/// Group for name transcription completeness
pub const NAME_COMPLETENESS_GROUP: &str = "name-trcp";
/// Group for connection association certainty
pub const CONNECTION_CERTAINTY_GROUP: &str = "conn-cert";
/// Group for reference types
pub const REFERENCE_TYPE_GROUP: &str = "ref-type";
/// Group for reference citation type URIs
pub const CITATION_TYPE_GROUP: &str = "ref-cit-type";

/// One interned value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupEntry {
    /// Surrogate key, 1-based
    pub id: i32,
    /// Optional namespace
    pub group: Option<String>,
    /// Full name as first seen (identity is case-insensitive)
    pub full_name: String,
    /// Optional short display name, from the first sighting only
    pub short_name: Option<String>,
}

impl std::fmt::Display for LookupEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.id, self.full_name)
    }
}

type LookupKey = (Option<String>, String);

/// Run-scoped set of lookup entries, populated incrementally.
#[derive(Debug, Default)]
pub struct LookupSet {
    index: HashMap<LookupKey, usize>,
    entries: Vec<LookupEntry>,
}

impl LookupSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the id for `full_name` in `group`, creating the entry on a miss.
    ///
    /// Returns 0 without touching the set when `full_name` is missing or
    /// empty. On a hit the stored entry is returned unchanged: a different
    /// `short_name` is ignored.
    pub fn get_id(&mut self, full_name: Option<&str>, short_name: Option<&str>, group: Option<&str>) -> i32 {
        let Some(full_name) = full_name.filter(|s| !s.is_empty()) else {
            return 0;
        };

        let key = (group.map(str::to_string), full_name.to_lowercase());
        if let Some(&slot) = self.index.get(&key) {
            return self.entries[slot].id;
        }

        let id = self.entries.len() as i32 + 1;
        self.entries.push(LookupEntry {
            id,
            group: key.0.clone(),
            full_name: full_name.to_string(),
            short_name: short_name.map(str::to_string),
        });
        self.index.insert(key, self.entries.len() - 1);
        id
    }

    /// Shorthand for an ungrouped lookup with no short name.
    pub fn id_of(&mut self, full_name: Option<&str>) -> i32 {
        self.get_id(full_name, None, None)
    }

    /// Shorthand for a grouped lookup with no short name.
    pub fn grouped_id_of(&mut self, full_name: Option<&str>, group: &str) -> i32 {
        self.get_id(full_name, None, Some(group))
    }

    /// All entries, in id order.
    pub fn entries(&self) -> &[LookupEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.index.clear();
        self.entries.clear();
    }
}
