// 👯 Duplicate-Name Detector - Names shared by more than one player id
// Also hosts the career span index used to tell those players apart.

use crate::records::{CanonicalIdentity, CareerSpan, PlayerId};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

// ============================================================================
// NAME GROUPS
// ============================================================================

/// Normalized name → colliding player ids (only groups of 2+)
///
/// Ids keep the order in which they first appear in the season table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NameGroups {
    groups: BTreeMap<String, Vec<PlayerId>>,
}

impl NameGroups {
    /// Group identities at or after `cutoff_season` by name
    pub fn detect(identities: &[CanonicalIdentity], cutoff_season: i32) -> Self {
        let mut by_name: BTreeMap<String, Vec<PlayerId>> = BTreeMap::new();

        for row in identities.iter().filter(|r| r.season >= cutoff_season) {
            let ids = by_name.entry(row.name.clone()).or_default();
            if !ids.contains(&row.player_id) {
                ids.push(row.player_id);
            }
        }

        by_name.retain(|_, ids| ids.len() > 1);
        debug!(collisions = by_name.len(), "duplicate-name detection complete");

        NameGroups { groups: by_name }
    }

    pub fn get(&self, name: &str) -> Option<&[PlayerId]> {
        self.groups.get(name).map(|ids| ids.as_slice())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.groups.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Iterate in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[PlayerId])> {
        self.groups
            .iter()
            .map(|(name, ids)| (name.as_str(), ids.as_slice()))
    }
}

// ============================================================================
// CAREER SPAN INDEX
// ============================================================================

/// player id → career span, restricted to careers reaching the cutoff
#[derive(Debug, Clone, Default)]
pub struct CareerSpanIndex {
    spans: HashMap<PlayerId, CareerSpan>,
}

impl CareerSpanIndex {
    /// Spans ending before `cutoff_season` are dropped. If an id appears
    /// twice, the first row wins.
    pub fn build(spans: &[CareerSpan], cutoff_season: i32) -> Self {
        let mut index = HashMap::new();

        for span in spans.iter().filter(|s| s.last_season >= cutoff_season) {
            index.entry(span.player_id).or_insert(*span);
        }

        CareerSpanIndex { spans: index }
    }

    pub fn get(&self, player_id: PlayerId) -> Option<&CareerSpan> {
        self.spans.get(&player_id)
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn row(season: i32, id: i64, name: &str) -> CanonicalIdentity {
        CanonicalIdentity::new(season, PlayerId(id), name, None)
    }

    #[test]
    fn test_detects_only_multi_id_names() {
        let identities = vec![
            row(1995, 1, "Charles Smith"),
            row(1996, 1, "Charles Smith"),
            row(1998, 2, "charles smith "),
            row(1996, 3, "Patrick Ewing"),
        ];

        let groups = NameGroups::detect(&identities, 1990);

        assert_eq!(groups.len(), 1);
        assert_eq!(groups.get("charles smith"), Some(&[PlayerId(1), PlayerId(2)][..]));
        assert!(!groups.contains("patrick ewing"));
    }

    #[test]
    fn test_cutoff_excludes_older_seasons() {
        let identities = vec![row(1985, 1, "Mark Davis"), row(1995, 2, "Mark Davis")];

        let groups = NameGroups::detect(&identities, 1990);
        assert!(groups.is_empty());

        let groups = NameGroups::detect(&identities, 1980);
        assert_eq!(groups.len(), 1);
    }

    #[test]
    fn test_empty_input_yields_empty_groups() {
        let groups = NameGroups::detect(&[], 1990);
        assert!(groups.is_empty());
        assert_eq!(groups.iter().count(), 0);
    }

    #[test]
    fn test_span_index_filters_by_cutoff_and_keeps_first() {
        let spans = vec![
            CareerSpan::new(PlayerId(1), 1975, 1985).unwrap(),
            CareerSpan::new(PlayerId(2), 1988, 1996).unwrap(),
            CareerSpan::new(PlayerId(2), 2000, 2001).unwrap(),
        ];

        let index = CareerSpanIndex::build(&spans, 1990);

        assert_eq!(index.len(), 1);
        assert!(index.get(PlayerId(1)).is_none());
        assert_eq!(index.get(PlayerId(2)).unwrap().first_season, 1988);
    }
}
