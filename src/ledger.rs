// 📒 Assignment Ledger - Which player ids are already taken this run
// Owned by one resolution run and threaded through both passes.

use crate::records::PlayerId;
use std::collections::{HashMap, HashSet};

/// Who claimed an id
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimSource {
    /// Exact-name or distinguishing-year match (pass 1)
    Deterministic,

    /// Approximate match for the given normalized query name (pass 2)
    Fuzzy(String),
}

#[derive(Debug, Clone, Default)]
pub struct AssignmentLedger {
    deterministic: HashSet<PlayerId>,
    fuzzy: HashMap<PlayerId, String>,
}

impl AssignmentLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a claim. Claims only accumulate; returns false if this exact
    /// claim was already present.
    pub fn claim(&mut self, player_id: PlayerId, source: ClaimSource) -> bool {
        match source {
            ClaimSource::Deterministic => self.deterministic.insert(player_id),
            ClaimSource::Fuzzy(name) => {
                if self.fuzzy.contains_key(&player_id) {
                    return false;
                }
                self.fuzzy.insert(player_id, name);
                true
            }
        }
    }

    pub fn is_claimed(&self, player_id: PlayerId) -> bool {
        self.deterministic.contains(&player_id) || self.fuzzy.contains_key(&player_id)
    }

    pub fn is_deterministic(&self, player_id: PlayerId) -> bool {
        self.deterministic.contains(&player_id)
    }

    /// Query name that fuzzy-claimed this id, if any
    pub fn fuzzy_claimant(&self, player_id: PlayerId) -> Option<&str> {
        self.fuzzy.get(&player_id).map(|name| name.as_str())
    }

    pub fn deterministic_count(&self) -> usize {
        self.deterministic.len()
    }

    pub fn fuzzy_count(&self) -> usize {
        self.fuzzy.len()
    }
}
