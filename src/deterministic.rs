// 🎯 Deterministic Matcher - Exact-name resolution (pass 1)
//
// A name owned by one player id resolves in every season. A colliding name
// resolves only in a distinguishing year; otherwise it stays unresolved and
// is never sent to fuzzy matching.

use crate::collisions::NameGroups;
use crate::distinguishing::DistinguishingYearMap;
use crate::ledger::{AssignmentLedger, ClaimSource};
use crate::outcome::MatchMethod;
use crate::records::{normalize_name, CanonicalIdentity, PlayerId};
use std::collections::HashMap;

/// Pass-1 result for a single (name, season)
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExactMatch {
    Resolved { player_id: PlayerId, method: MatchMethod },

    /// Colliding name, season not distinguishing
    Ambiguous,

    /// Name not in the season table; goes to the fuzzy queue
    NotFound,
}

pub struct DeterministicMatcher<'a> {
    unique: HashMap<&'a str, PlayerId>,
    groups: &'a NameGroups,
    years: &'a DistinguishingYearMap,
}

impl<'a> DeterministicMatcher<'a> {
    pub fn new(
        identities: &'a [CanonicalIdentity],
        cutoff_season: i32,
        groups: &'a NameGroups,
        years: &'a DistinguishingYearMap,
    ) -> Self {
        let unique = identities
            .iter()
            .filter(|row| row.season >= cutoff_season && !groups.contains(&row.name))
            .map(|row| (row.name.as_str(), row.player_id))
            .collect();

        DeterministicMatcher { unique, groups, years }
    }

    /// Number of names resolvable regardless of season
    pub fn unique_names(&self) -> usize {
        self.unique.len()
    }

    /// Look up one record and claim the id on success
    pub fn match_record(&self, name: &str, season: i32, ledger: &mut AssignmentLedger) -> ExactMatch {
        let name = normalize_name(name);

        let result = if self.groups.contains(&name) {
            match self.years.owner_of(&name, season) {
                Some(player_id) => ExactMatch::Resolved {
                    player_id,
                    method: MatchMethod::Distinguished,
                },
                None => ExactMatch::Ambiguous,
            }
        } else if let Some(player_id) = self.unique.get(name.as_str()) {
            ExactMatch::Resolved {
                player_id: *player_id,
                method: MatchMethod::Unique,
            }
        } else {
            ExactMatch::NotFound
        };

        if let ExactMatch::Resolved { player_id, .. } = result {
            ledger.claim(player_id, ClaimSource::Deterministic);
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collisions::CareerSpanIndex;
    use crate::records::CareerSpan;

    fn fixture() -> (Vec<CanonicalIdentity>, Vec<CareerSpan>) {
        let identities = vec![
            CanonicalIdentity::new(1992, PlayerId(1), "Tony Smith", Some("LAL".into())),
            CanonicalIdentity::new(1997, PlayerId(1), "Tony Smith", Some("CHH".into())),
            CanonicalIdentity::new(1997, PlayerId(2), "Tony Smith", Some("MIA".into())),
            CanonicalIdentity::new(2001, PlayerId(2), "Tony Smith", Some("MIA".into())),
            CanonicalIdentity::new(1995, PlayerId(3), "Reggie Miller", Some("IND".into())),
            CanonicalIdentity::new(1985, PlayerId(4), "Old Timer", None),
        ];
        let spans = vec![
            CareerSpan::new(PlayerId(1), 1990, 1998).unwrap(),
            CareerSpan::new(PlayerId(2), 1995, 2003).unwrap(),
            CareerSpan::new(PlayerId(3), 1988, 2005).unwrap(),
        ];
        (identities, spans)
    }

    #[test]
    fn test_resolution_paths() {
        let (identities, spans) = fixture();
        let groups = NameGroups::detect(&identities, 1990);
        let years = DistinguishingYearMap::build(&groups, &CareerSpanIndex::build(&spans, 1990));
        let matcher = DeterministicMatcher::new(&identities, 1990, &groups, &years);
        let mut ledger = AssignmentLedger::new();

        // Unique name resolves in any season, even one it never played
        assert_eq!(
            matcher.match_record("REGGIE MILLER ", 2010, &mut ledger),
            ExactMatch::Resolved {
                player_id: PlayerId(3),
                method: MatchMethod::Unique
            }
        );

        assert_eq!(
            matcher.match_record("Tony Smith", 1992, &mut ledger),
            ExactMatch::Resolved {
                player_id: PlayerId(1),
                method: MatchMethod::Distinguished
            }
        );
        assert_eq!(matcher.match_record("Tony Smith", 1996, &mut ledger), ExactMatch::Ambiguous);
        assert_eq!(matcher.match_record("Tony Smith", 2015, &mut ledger), ExactMatch::Ambiguous);
        assert_eq!(matcher.match_record("Reggie Millar", 1995, &mut ledger), ExactMatch::NotFound);

        // Seasons before the cutoff do not seed names
        assert_eq!(matcher.match_record("Old Timer", 1985, &mut ledger), ExactMatch::NotFound);

        assert!(ledger.is_deterministic(PlayerId(1)));
        assert!(ledger.is_deterministic(PlayerId(3)));
        assert!(!ledger.is_claimed(PlayerId(2)));
        assert_eq!(matcher.unique_names(), 1);
    }
}
