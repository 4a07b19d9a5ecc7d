// ⚙️ Linkage Engine - Salary records → player ids
//
// Pipeline (single-threaded, one ledger per run):
//   1. duplicate-name detection + career span index
//   2. distinguishing years for every colliding name
//   3. pass 1: deterministic matching (claims ids)
//   4. pass 2: fuzzy matching over the unmatched (name, season) queue

use crate::collisions::{CareerSpanIndex, NameGroups};
use crate::config::LinkageConfig;
use crate::deterministic::{DeterministicMatcher, ExactMatch};
use crate::distinguishing::DistinguishingYearMap;
use crate::fuzzy::{FuzzyMatcher, FuzzyQuery};
use crate::ledger::AssignmentLedger;
use crate::loader;
use crate::outcome::{LinkageReport, Resolution, ResolutionOutcome};
use crate::records::{CanonicalIdentity, CareerSpan, SalaryRecord};
use anyhow::Result;
use std::path::Path;
use tracing::info;

// ============================================================================
// INPUTS
// ============================================================================

/// Fully materialized inputs for one run
#[derive(Debug, Clone, Default)]
pub struct LinkageInputs {
    pub identities: Vec<CanonicalIdentity>,
    pub spans: Vec<CareerSpan>,
    pub salaries: Vec<SalaryRecord>,
}

impl LinkageInputs {
    pub fn new(identities: Vec<CanonicalIdentity>, spans: Vec<CareerSpan>, salaries: Vec<SalaryRecord>) -> Self {
        LinkageInputs {
            identities,
            spans,
            salaries,
        }
    }

    /// Load the three CSV sources
    pub fn load(season_info: &Path, career_info: &Path, salaries: &Path) -> Result<Self> {
        Ok(LinkageInputs {
            identities: loader::load_season_info(season_info)?,
            spans: loader::load_career_info(career_info)?,
            salaries: loader::load_salaries(salaries)?,
        })
    }
}

// ============================================================================
// ENGINE
// ============================================================================

pub struct LinkageEngine {
    config: LinkageConfig,
}

/// Pass-1 state for one salary record
enum Pending {
    Done(ResolutionOutcome),
    Fuzzy,
}

impl LinkageEngine {
    pub fn new(config: LinkageConfig) -> Self {
        LinkageEngine { config }
    }

    pub fn config(&self) -> &LinkageConfig {
        &self.config
    }

    /// Resolve every salary record. Output keeps salary input order.
    pub fn resolve(&self, inputs: &LinkageInputs) -> LinkageReport {
        let cutoff = self.config.cutoff_season;

        let groups = NameGroups::detect(&inputs.identities, cutoff);
        let spans = CareerSpanIndex::build(&inputs.spans, cutoff);
        let years = DistinguishingYearMap::build(&groups, &spans);

        info!(
            identities = inputs.identities.len(),
            spans = spans.len(),
            collisions = groups.len(),
            cutoff,
            "precomputation complete"
        );

        let mut ledger = AssignmentLedger::new();

        // Pass 1
        let deterministic = DeterministicMatcher::new(&inputs.identities, cutoff, &groups, &years);
        let mut pending = Vec::with_capacity(inputs.salaries.len());
        let mut queue = Vec::new();

        for record in &inputs.salaries {
            let state = match deterministic.match_record(&record.name, record.season, &mut ledger) {
                ExactMatch::Resolved { player_id, method } => {
                    Pending::Done(ResolutionOutcome::Resolved { player_id, method })
                }
                ExactMatch::Ambiguous => Pending::Done(ResolutionOutcome::UnresolvedAmbiguous),
                ExactMatch::NotFound => {
                    queue.push(FuzzyQuery::new(&record.name, record.season));
                    Pending::Fuzzy
                }
            };
            pending.push(state);
        }

        info!(
            records = inputs.salaries.len(),
            claimed = ledger.deterministic_count(),
            queued = queue.len(),
            "deterministic pass complete"
        );

        // Pass 2
        let fuzzy = FuzzyMatcher::new(&inputs.identities, &ledger, &self.config);
        let fuzzy_result = fuzzy.run(&queue, &mut ledger);

        let resolutions: Vec<Resolution> = inputs
            .salaries
            .iter()
            .zip(pending)
            .map(|(record, state)| {
                let outcome = match state {
                    Pending::Done(outcome) => outcome,
                    Pending::Fuzzy => fuzzy_result.outcome_for(&record.normalized_name(), record.season),
                };
                Resolution::new(record, outcome)
            })
            .collect();

        let report = LinkageReport::new(resolutions, groups.len());
        info!("{}", report.summary());
        report
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ContestPolicy;
    use crate::outcome::{MatchMethod, OutcomeCategory};
    use crate::records::PlayerId;
    use std::collections::HashMap;

    fn identity(season: i32, id: i64, name: &str) -> CanonicalIdentity {
        CanonicalIdentity::new(season, PlayerId(id), name, None)
    }

    fn span(id: i64, first: i32, last: i32) -> CareerSpan {
        CareerSpan::new(PlayerId(id), first, last).unwrap()
    }

    fn salary(name: &str, season: i32) -> SalaryRecord {
        SalaryRecord::new(name, season, 1_500_000.0)
    }

    /// One unique player and one colliding pair overlapping 1995-1998
    fn league() -> LinkageInputs {
        let mut identities = Vec::new();
        for season in 1990..=1998 {
            identities.push(identity(season, 1, "Charles Smith"));
        }
        for season in 1995..=2003 {
            identities.push(identity(season, 2, "Charles Smith"));
        }
        for season in 1991..=2000 {
            identities.push(identity(season, 3, "Shaquille O'Neal"));
        }

        LinkageInputs::new(identities, vec![span(1, 1990, 1998), span(2, 1995, 2003), span(3, 1991, 2000)], Vec::new())
    }

    #[test]
    fn test_end_to_end_unique_and_colliding() {
        let mut inputs = league();
        inputs.salaries = vec![
            salary("Shaquille O'Neal", 1993),
            salary("Charles Smith", 1992),
            salary("Charles Smith", 1996),
        ];

        let report = LinkageEngine::new(LinkageConfig::default()).resolve(&inputs);

        assert_eq!(report.counts.unique, 1);
        assert_eq!(report.counts.distinguished, 1);
        assert_eq!(report.counts.ambiguous, 1);
        assert_eq!(report.collision_names, 1);

        assert_eq!(report.resolutions[0].record.player_id, Some(PlayerId(3)));
        assert_eq!(report.resolutions[1].record.player_id, Some(PlayerId(1)));
        // Structurally ambiguous year stays null
        assert_eq!(report.resolutions[2].record.player_id, None);
        assert_eq!(report.resolutions[2].outcome, ResolutionOutcome::UnresolvedAmbiguous);

        println!("✅ {}", report.summary());
    }

    #[test]
    fn test_unique_name_resolves_every_season() {
        let mut inputs = league();
        inputs.salaries = (1991..=2000).map(|s| salary("shaquille o'neal", s)).collect();

        let report = LinkageEngine::new(LinkageConfig::default()).resolve(&inputs);

        assert_eq!(report.counts.unique, 10);
        assert!(report
            .resolutions
            .iter()
            .all(|r| r.record.player_id == Some(PlayerId(3))));
    }

    #[test]
    fn test_ambiguous_collision_never_fuzzy_matched() {
        let mut inputs = league();
        // Unclaimed candidate in the same season with a near-identical name
        inputs.identities.push(identity(1996, 9, "Charles Smyth"));
        inputs.salaries = vec![salary("Charles Smith", 1996)];

        let report = LinkageEngine::new(LinkageConfig::default()).resolve(&inputs);

        assert_eq!(report.counts.ambiguous, 1);
        assert_eq!(report.counts.fuzzy, 0);
    }

    #[test]
    fn test_fuzzy_skips_deterministically_claimed_ids() {
        let mut inputs = league();
        inputs.salaries = vec![salary("Shaquille O'Neal", 1995), salary("Shaquile ONeal", 1995)];

        let report = LinkageEngine::new(LinkageConfig::default()).resolve(&inputs);

        // The only close candidate (id 3) was taken in pass 1
        assert_eq!(report.resolutions[0].record.player_id, Some(PlayerId(3)));
        assert_ne!(report.resolutions[1].record.player_id, Some(PlayerId(3)));
    }

    #[test]
    fn test_fuzzy_match_applies_to_all_rows_of_name() {
        let mut inputs = league();
        inputs.identities.push(identity(1999, 7, "Dikembe Mutombo"));
        inputs.identities.push(identity(2000, 7, "Dikembe Mutombo"));
        inputs.salaries = vec![salary("Dikembe Mutumbo", 1999), salary("Dikembe Mutumbo", 2000)];

        let report = LinkageEngine::new(LinkageConfig::default()).resolve(&inputs);

        assert_eq!(report.counts.fuzzy, 2);
        for resolution in &report.resolutions {
            assert_eq!(resolution.record.player_id, Some(PlayerId(7)));
            assert!(matches!(
                resolution.outcome,
                ResolutionOutcome::Resolved {
                    method: MatchMethod::Fuzzy { .. },
                    ..
                }
            ));
        }
    }

    #[test]
    fn test_unknown_season_has_no_candidate() {
        let mut inputs = league();
        inputs.salaries = vec![salary("Nobody Known", 2015)];

        let report = LinkageEngine::new(LinkageConfig::default()).resolve(&inputs);

        assert_eq!(report.resolutions[0].outcome, ResolutionOutcome::UnresolvedNoCandidate);
        assert_eq!(report.names_in(OutcomeCategory::NoCandidate), vec!["nobody known".to_string()]);
    }

    #[test]
    fn test_no_fuzzy_id_assigned_to_two_names() {
        let mut inputs = league();
        inputs.identities.push(identity(1999, 7, "Dikembe Mutombo"));
        inputs.salaries = vec![
            salary("Dikembe Mutumbo", 1999),
            salary("Dikembe Mutambo", 1999),
            salary("Dikembi Mutombo", 1999),
        ];

        for policy in [ContestPolicy::FirstCome, ContestPolicy::HighestScore] {
            let config = LinkageConfig::default().with_contest_policy(policy);
            let report = LinkageEngine::new(config).resolve(&inputs);

            let mut owners: HashMap<PlayerId, String> = HashMap::new();
            for resolution in report.by_category(OutcomeCategory::Resolved) {
                if let ResolutionOutcome::Resolved {
                    player_id,
                    method: MatchMethod::Fuzzy { .. },
                } = resolution.outcome
                {
                    let name = resolution.record.normalized_name();
                    let owner = owners.entry(player_id).or_insert_with(|| name.clone());
                    assert_eq!(*owner, name);
                }
            }
            assert_eq!(report.counts.fuzzy, 1);
        }
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let mut inputs = league();
        inputs.identities.push(identity(1999, 7, "Dikembe Mutombo"));
        inputs.identities.push(identity(1999, 8, "Dikembe Mutumbo Jr"));
        inputs.salaries = vec![
            salary("Charles Smith", 1996),
            salary("Dikembe Mutumbo", 1999),
            salary("Dikembe Mutambo", 1999),
            salary("Charles Smith", 2002),
        ];

        let engine = LinkageEngine::new(LinkageConfig::default());
        let first = engine.resolve(&inputs);
        let second = engine.resolve(&inputs);

        assert_eq!(first.resolutions, second.resolutions);
        assert_eq!(first.counts, second.counts);
    }

    #[test]
    fn test_empty_inputs() {
        let report = LinkageEngine::new(LinkageConfig::default()).resolve(&LinkageInputs::default());

        assert_eq!(report.counts.total(), 0);
        assert_eq!(report.collision_names, 0);
    }
}
