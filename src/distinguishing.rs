// 📅 Distinguishing-Year Resolver - Tell same-named players apart by season
//
// For a colliding name, a season is "distinguishing" when exactly one of the
// colliding ids was active in it. Example:
//   A: 1990-1998, B: 1995-2003  →  A owns 1990-1994, B owns 1999-2003,
//   1995-1998 belongs to nobody (both active).

use crate::collisions::{CareerSpanIndex, NameGroups};
use crate::records::PlayerId;
use std::collections::{BTreeSet, HashMap};
use tracing::warn;

// ============================================================================
// PER-NAME YEARS
// ============================================================================

/// Distinguishing years for one colliding name
///
/// Year sets are pairwise disjoint. Ids without a career span are present
/// with an empty set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DistinguishingYears {
    /// Group order is kept so lookups are deterministic
    entries: Vec<(PlayerId, BTreeSet<i32>)>,
}

impl DistinguishingYears {
    /// Compute the year sets for one group of colliding ids
    pub fn resolve(ids: &[PlayerId], spans: &CareerSpanIndex) -> Self {
        let mut entries: Vec<(PlayerId, BTreeSet<i32>)> =
            ids.iter().map(|id| (*id, BTreeSet::new())).collect();

        let known: Vec<_> = ids.iter().filter_map(|id| spans.get(*id)).collect();
        if known.len() < ids.len() {
            warn!(
                missing = ids.len() - known.len(),
                "colliding ids without career span contribute no distinguishing years"
            );
        }

        let (Some(min_year), Some(max_year)) = (
            known.iter().map(|s| s.first_season).min(),
            known.iter().map(|s| s.last_season).max(),
        ) else {
            return DistinguishingYears { entries };
        };

        for year in min_year..=max_year {
            let mut active = known.iter().filter(|s| s.contains(year));

            // Exactly one active id → that id owns the year
            if let (Some(only), None) = (active.next(), active.next()) {
                if let Some((_, years)) = entries.iter_mut().find(|(id, _)| *id == only.player_id) {
                    years.insert(year);
                }
            }
        }

        DistinguishingYears { entries }
    }

    /// The id that owns `season`, if any
    pub fn owner_of(&self, season: i32) -> Option<PlayerId> {
        self.entries
            .iter()
            .find(|(_, years)| years.contains(&season))
            .map(|(id, _)| *id)
    }

    pub fn years_for(&self, player_id: PlayerId) -> Option<&BTreeSet<i32>> {
        self.entries
            .iter()
            .find(|(id, _)| *id == player_id)
            .map(|(_, years)| years)
    }

    pub fn iter(&self) -> impl Iterator<Item = (PlayerId, &BTreeSet<i32>)> {
        self.entries.iter().map(|(id, years)| (*id, years))
    }
}

// ============================================================================
// MAP OVER ALL COLLIDING NAMES
// ============================================================================

/// Normalized name → distinguishing years
#[derive(Debug, Clone, Default)]
pub struct DistinguishingYearMap {
    by_name: HashMap<String, DistinguishingYears>,
}

impl DistinguishingYearMap {
    pub fn build(groups: &NameGroups, spans: &CareerSpanIndex) -> Self {
        let by_name = groups
            .iter()
            .map(|(name, ids)| (name.to_string(), DistinguishingYears::resolve(ids, spans)))
            .collect();

        DistinguishingYearMap { by_name }
    }

    pub fn get(&self, name: &str) -> Option<&DistinguishingYears> {
        self.by_name.get(name)
    }

    /// Owner of (name, season), None when ambiguous, out of range or unknown
    pub fn owner_of(&self, name: &str, season: i32) -> Option<PlayerId> {
        self.by_name.get(name).and_then(|years| years.owner_of(season))
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

// ============================================================================
// TESTS
// ============================================================================
