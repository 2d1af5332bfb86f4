//! Identity-based deduplication
//!
//! Candidates from every song and strategy are folded into one
//! [`IdentityMap`]. The first candidate to claim an identity key keeps it;
//! later candidates with the same key are dropped regardless of tier or
//! score, so the result depends only on merge order.

use super::types::CandidateTrack;
use std::collections::HashMap;

/// `lowercase(artist) + "_" + lowercase(name)`
pub fn identity_key(artist: &str, name: &str) -> String {
    format!("{}_{}", artist.to_lowercase(), name.to_lowercase())
}

/// Insertion-ordered map from identity key to candidate
#[derive(Debug, Clone, Default)]
pub struct IdentityMap {
    index: HashMap<String, usize>,
    entries: Vec<CandidateTrack>,
}

impl IdentityMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold step: returns the map with `candidate` added if its key is new
    pub fn merge(mut self, candidate: CandidateTrack) -> Self {
        self.insert(candidate);
        self
    }

    /// Fold a whole batch in order
    pub fn merge_all<I>(self, candidates: I) -> Self
    where
        I: IntoIterator<Item = CandidateTrack>,
    {
        candidates.into_iter().fold(self, IdentityMap::merge)
    }

    /// Returns false (and leaves the map untouched) if the key is taken
    pub fn insert(&mut self, candidate: CandidateTrack) -> bool {
        let key = candidate.identity_key();
        if self.index.contains_key(&key) {
            return false;
        }
        self.index.insert(key, self.entries.len());
        self.entries.push(candidate);
        true
    }

    pub fn get(&self, key: &str) -> Option<&CandidateTrack> {
        self.index.get(key).map(|&i| &self.entries[i])
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Candidates in first-insertion order
    pub fn into_values(self) -> Vec<CandidateTrack> {
        self.entries
    }
}
