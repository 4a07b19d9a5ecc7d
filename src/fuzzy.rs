// 🔍 Fuzzy Matcher - Approximate name matching within a season
//
// Acceptance policy for a query against its season's unclaimed candidates:
//   - no candidates            → no match
//   - one candidate            → accept if score > threshold
//   - two or more candidates   → accept if score > threshold AND the lead over
//                                the runner-up beats the margin rule
//   - in every case the winning id must not belong to another query name

use crate::config::{ContestPolicy, LinkageConfig, MarginRule, SimilarityMetric};
use crate::ledger::{AssignmentLedger, ClaimSource};
use crate::outcome::{MatchMethod, Rejection, ResolutionOutcome};
use crate::records::{normalize_name, CanonicalIdentity, PlayerId};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

// ============================================================================
// SCORING
// ============================================================================

impl SimilarityMetric {
    /// Similarity on a 0-100 scale, rounded to whole points.
    /// Symmetric; inputs are normalized first.
    pub fn score(&self, a: &str, b: &str) -> f64 {
        let a = normalize_name(a);
        let b = normalize_name(b);

        let raw = match self {
            SimilarityMetric::Levenshtein => strsim::normalized_levenshtein(&a, &b),
            SimilarityMetric::JaroWinkler => strsim::jaro_winkler(&a, &b),
            SimilarityMetric::SorensenDice => strsim::sorensen_dice(&a, &b),
        };

        (raw * 100.0).round()
    }
}

impl MarginRule {
    /// Lead the top score must strictly exceed, given all candidate scores
    pub fn required_margin(&self, scores: &[f64]) -> f64 {
        match self {
            MarginRule::PopulationStdDev => std_dev(scores, 0),
            MarginRule::SampleStdDev => std_dev(scores, 1),
            MarginRule::Fixed { min_margin } => *min_margin,
        }
    }
}

/// Standard deviation with `ddof` delta degrees of freedom
fn std_dev(scores: &[f64], ddof: usize) -> f64 {
    if scores.len() <= ddof {
        return 0.0;
    }

    let n = scores.len() as f64;
    let mean = scores.iter().sum::<f64>() / n;
    let variance = scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / (n - ddof as f64);
    variance.sqrt()
}

// ============================================================================
// VERDICTS
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub player_id: PlayerId,
    pub name: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Accept { player_id: PlayerId, score: f64 },
    NoCandidate,
    Reject { top_score: f64, rejection: Rejection },
}

/// Apply the score and margin rules to candidates ranked best-first.
/// Claim conflicts are checked separately by the caller.
pub fn evaluate(ranked: &[ScoredCandidate], threshold: f64, margin_rule: MarginRule) -> Verdict {
    let Some(top) = ranked.first() else {
        return Verdict::NoCandidate;
    };

    if !(top.score > threshold) {
        return Verdict::Reject {
            top_score: top.score,
            rejection: Rejection::BelowThreshold,
        };
    }

    if let Some(second) = ranked.get(1) {
        let scores: Vec<f64> = ranked.iter().map(|c| c.score).collect();
        let margin = top.score - second.score;

        if !(margin > margin_rule.required_margin(&scores)) {
            return Verdict::Reject {
                top_score: top.score,
                rejection: Rejection::NarrowMargin,
            };
        }
    }

    Verdict::Accept {
        player_id: top.player_id,
        score: top.score,
    }
}

// ============================================================================
// FUZZY PASS
// ============================================================================

/// A salary name with no exact counterpart, and the season it was paid in
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FuzzyQuery {
    /// Normalized
    pub name: String,
    pub season: i32,
}

impl FuzzyQuery {
    pub fn new(name: &str, season: i32) -> Self {
        FuzzyQuery {
            name: normalize_name(name),
            season,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FuzzyAssignment {
    pub player_id: PlayerId,
    pub score: f64,
    /// Season whose candidate pool produced the match
    pub season: i32,
}

/// Assignments are per query name: every row with that name gets the id
#[derive(Debug, Clone, Default)]
pub struct FuzzyPassResult {
    pub assignments: HashMap<String, FuzzyAssignment>,
    pub verdicts: HashMap<FuzzyQuery, Verdict>,
}

impl FuzzyPassResult {
    pub fn outcome_for(&self, name: &str, season: i32) -> ResolutionOutcome {
        if let Some(assignment) = self.assignments.get(name) {
            return ResolutionOutcome::Resolved {
                player_id: assignment.player_id,
                method: MatchMethod::Fuzzy {
                    score: assignment.score,
                },
            };
        }

        let key = FuzzyQuery {
            name: name.to_string(),
            season,
        };

        match self.verdicts.get(&key) {
            Some(Verdict::Reject { top_score, rejection }) => ResolutionOutcome::UnresolvedLowConfidence {
                top_score: *top_score,
                rejection: *rejection,
            },
            // Accepted but never assigned: lost its id in a contest
            Some(Verdict::Accept { score, .. }) => ResolutionOutcome::UnresolvedLowConfidence {
                top_score: *score,
                rejection: Rejection::AlreadyClaimed,
            },
            Some(Verdict::NoCandidate) | None => ResolutionOutcome::UnresolvedNoCandidate,
        }
    }
}

pub struct FuzzyMatcher<'a> {
    /// season → distinct (id, name) pairs not claimed in pass 1
    pool: HashMap<i32, Vec<(PlayerId, &'a str)>>,
    config: &'a LinkageConfig,
}

impl<'a> FuzzyMatcher<'a> {
    /// Build the candidate pool once, after the deterministic pass
    pub fn new(
        identities: &'a [CanonicalIdentity],
        ledger: &AssignmentLedger,
        config: &'a LinkageConfig,
    ) -> Self {
        let mut pool: HashMap<i32, Vec<(PlayerId, &'a str)>> = HashMap::new();
        let mut seen: HashSet<(i32, PlayerId, &'a str)> = HashSet::new();

        for row in identities {
            if row.season < config.cutoff_season || ledger.is_deterministic(row.player_id) {
                continue;
            }
            // Traded players have one row per team
            if seen.insert((row.season, row.player_id, row.name.as_str())) {
                pool.entry(row.season)
                    .or_default()
                    .push((row.player_id, row.name.as_str()));
            }
        }

        FuzzyMatcher { pool, config }
    }

    pub fn candidate_count(&self, season: i32) -> usize {
        self.pool.get(&season).map_or(0, |c| c.len())
    }

    /// Score every candidate in the query's season, best first.
    /// Ties keep pool order.
    pub fn rank(&self, query: &FuzzyQuery) -> Vec<ScoredCandidate> {
        let mut ranked: Vec<ScoredCandidate> = self
            .pool
            .get(&query.season)
            .map(|candidates| {
                candidates
                    .iter()
                    .map(|(player_id, name)| ScoredCandidate {
                        player_id: *player_id,
                        name: name.to_string(),
                        score: self.config.similarity.score(&query.name, name),
                    })
                    .collect()
            })
            .unwrap_or_default();

        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
        ranked
    }

    fn verdict(&self, query: &FuzzyQuery) -> Verdict {
        let ranked = self.rank(query);
        let verdict = evaluate(&ranked, self.config.fuzzy_threshold, self.config.margin_rule);

        debug!(
            name = %query.name,
            season = query.season,
            candidates = ranked.len(),
            top = ranked.first().map(|c| c.name.as_str()).unwrap_or("-"),
            ?verdict,
            "fuzzy verdict"
        );

        verdict
    }

    /// Run pass 2 over the queued queries (duplicates are processed once)
    pub fn run(&self, queries: &[FuzzyQuery], ledger: &mut AssignmentLedger) -> FuzzyPassResult {
        let mut seen = HashSet::new();
        let queries: Vec<&FuzzyQuery> = queries.iter().filter(|q| seen.insert(*q)).collect();

        let result = match self.config.contest_policy {
            ContestPolicy::FirstCome => self.run_first_come(&queries, ledger),
            ContestPolicy::HighestScore => self.run_highest_score(&queries, ledger),
        };

        info!(
            queries = queries.len(),
            assigned_names = result.assignments.len(),
            policy = ?self.config.contest_policy,
            "fuzzy pass complete"
        );

        result
    }

    /// Queries in input order; the first to accept an id keeps it
    fn run_first_come(&self, queries: &[&FuzzyQuery], ledger: &mut AssignmentLedger) -> FuzzyPassResult {
        let mut result = FuzzyPassResult::default();

        for query in queries {
            if result.assignments.contains_key(&query.name) {
                continue;
            }

            let verdict = match self.verdict(query) {
                Verdict::Accept { player_id, score } => {
                    if try_claim(ledger, player_id, &query.name) {
                        result.assignments.insert(
                            query.name.clone(),
                            FuzzyAssignment {
                                player_id,
                                score,
                                season: query.season,
                            },
                        );
                        Verdict::Accept { player_id, score }
                    } else {
                        Verdict::Reject {
                            top_score: score,
                            rejection: Rejection::AlreadyClaimed,
                        }
                    }
                }
                other => other,
            };

            result.verdicts.insert((*query).clone(), verdict);
        }

        result
    }

    /// All verdicts first, then contested ids go to the best score.
    /// Equal scores fall back to input order.
    fn run_highest_score(&self, queries: &[&FuzzyQuery], ledger: &mut AssignmentLedger) -> FuzzyPassResult {
        let mut result = FuzzyPassResult::default();
        let mut proposals: Vec<(&FuzzyQuery, PlayerId, f64)> = Vec::new();

        for query in queries {
            let verdict = self.verdict(query);
            if let Verdict::Accept { player_id, score } = verdict {
                proposals.push((*query, player_id, score));
            }
            result.verdicts.insert((*query).clone(), verdict);
        }

        // Stable: equal scores stay in input order
        proposals.sort_by(|a, b| b.2.total_cmp(&a.2));

        for (query, player_id, score) in proposals {
            if result.assignments.contains_key(&query.name) {
                continue;
            }

            if try_claim(ledger, player_id, &query.name) {
                result.assignments.insert(
                    query.name.clone(),
                    FuzzyAssignment {
                        player_id,
                        score,
                        season: query.season,
                    },
                );
            } else {
                result.verdicts.insert(
                    query.clone(),
                    Verdict::Reject {
                        top_score: score,
                        rejection: Rejection::AlreadyClaimed,
                    },
                );
            }
        }

        result
    }
}

/// Claim `player_id` for `name` unless another query name holds it
fn try_claim(ledger: &mut AssignmentLedger, player_id: PlayerId, name: &str) -> bool {
    if let Some(claimant) = ledger.fuzzy_claimant(player_id) {
        return claimant == name;
    }
    ledger.claim(player_id, ClaimSource::Fuzzy(name.to_string()))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(scores: &[f64]) -> Vec<ScoredCandidate> {
        scores
            .iter()
            .enumerate()
            .map(|(i, s)| ScoredCandidate {
                player_id: PlayerId(i as i64 + 1),
                name: format!("candidate {}", i),
                score: *s,
            })
            .collect()
    }

    fn identity(season: i32, id: i64, name: &str) -> CanonicalIdentity {
        CanonicalIdentity::new(season, PlayerId(id), name, None)
    }

    #[test]
    fn test_score_scale_and_symmetry() {
        let metric = SimilarityMetric::Levenshtein;

        assert_eq!(metric.score("john smith", "jon smith"), 90.0);
        assert_eq!(metric.score("jon smith", "john smith"), 90.0);
        assert_eq!(metric.score("  John Smith", "john smith "), 100.0);
        assert!(metric.score("john smith", "zzzz") < 50.0);

        for metric in [SimilarityMetric::JaroWinkler, SimilarityMetric::SorensenDice] {
            let s = metric.score("dikembe mutombo", "dikembe mutumbo");
            assert!((0.0..=100.0).contains(&s));
            assert_eq!(s, metric.score("dikembe mutumbo", "dikembe mutombo"));
        }
    }

    #[test]
    fn test_population_std_dev() {
        assert_eq!(std_dev(&[60.0, 58.0], 0), 1.0);
        assert_eq!(std_dev(&[90.0, 40.0], 0), 25.0);
        assert_eq!(std_dev(&[5.0], 1), 0.0);
        assert!((std_dev(&[60.0, 58.0], 1) - 2f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_single_candidate_above_threshold_accepted() {
        let verdict = evaluate(&scored(&[82.0]), 50.0, MarginRule::PopulationStdDev);
        assert_eq!(
            verdict,
            Verdict::Accept {
                player_id: PlayerId(1),
                score: 82.0
            }
        );
    }

    #[test]
    fn test_threshold_is_strict() {
        let verdict = evaluate(&scored(&[50.0]), 50.0, MarginRule::PopulationStdDev);
        assert!(matches!(
            verdict,
            Verdict::Reject {
                rejection: Rejection::BelowThreshold,
                ..
            }
        ));
    }

    #[test]
    fn test_clear_winner_accepted() {
        let verdict = evaluate(&scored(&[90.0, 40.0]), 50.0, MarginRule::PopulationStdDev);
        assert!(matches!(verdict, Verdict::Accept { score, .. } if score == 90.0));
    }

    #[test]
    fn test_narrow_margin_rejected() {
        // margin 1, population std-dev ~1.118
        let verdict = evaluate(&scored(&[60.0, 59.0, 58.0, 57.0]), 50.0, MarginRule::PopulationStdDev);
        assert_eq!(
            verdict,
            Verdict::Reject {
                top_score: 60.0,
                rejection: Rejection::NarrowMargin
            }
        );

        // Two candidates: std-dev is half the gap, so only a tie fails
        let pair = scored(&[60.0, 58.0]);
        assert!(matches!(evaluate(&pair, 50.0, MarginRule::PopulationStdDev), Verdict::Accept { .. }));
        assert!(matches!(
            evaluate(&pair, 50.0, MarginRule::Fixed { min_margin: 5.0 }),
            Verdict::Reject {
                rejection: Rejection::NarrowMargin,
                ..
            }
        ));
        assert!(matches!(
            evaluate(&scored(&[70.0, 70.0]), 50.0, MarginRule::PopulationStdDev),
            Verdict::Reject {
                rejection: Rejection::NarrowMargin,
                ..
            }
        ));
    }

    #[test]
    fn test_empty_pool_is_no_candidate() {
        assert_eq!(evaluate(&[], 50.0, MarginRule::PopulationStdDev), Verdict::NoCandidate);
    }

    #[test]
    fn test_pool_excludes_deterministic_claims_and_dedupes_trades() {
        let identities = vec![
            identity(1995, 1, "John Smith"),
            identity(1995, 1, "John Smith"),
            identity(1995, 2, "Taken Player"),
            identity(1996, 3, "Other Season"),
            identity(1985, 4, "Too Early"),
        ];
        let config = LinkageConfig::default();
        let mut ledger = AssignmentLedger::new();
        ledger.claim(PlayerId(2), ClaimSource::Deterministic);

        let matcher = FuzzyMatcher::new(&identities, &ledger, &config);

        assert_eq!(matcher.candidate_count(1995), 1);
        assert_eq!(matcher.candidate_count(1996), 1);
        assert_eq!(matcher.candidate_count(1985), 0);
    }

    #[test]
    fn test_jon_smith_matches_john_smith() {
        let identities = vec![identity(1995, 11, "John Smith")];
        let config = LinkageConfig::default();
        let mut ledger = AssignmentLedger::new();
        let matcher = FuzzyMatcher::new(&identities, &ledger, &config);

        let result = matcher.run(&[FuzzyQuery::new("Jon Smith", 1995)], &mut ledger);

        let assignment = result.assignments.get("jon smith").unwrap();
        assert_eq!(assignment.player_id, PlayerId(11));
        assert_eq!(ledger.fuzzy_claimant(PlayerId(11)), Some("jon smith"));
        assert!(result.outcome_for("jon smith", 1995).is_resolved());
    }

    #[test]
    fn test_first_come_keeps_contested_id() {
        let identities = vec![identity(1995, 11, "John Smith")];
        let config = LinkageConfig::default();
        let mut ledger = AssignmentLedger::new();
        let matcher = FuzzyMatcher::new(&identities, &ledger, &config);

        // "john smyth" (90) is queued first, "jon smith" (90) second
        let queries = vec![FuzzyQuery::new("john smyth", 1995), FuzzyQuery::new("jon smith", 1995)];
        let result = matcher.run(&queries, &mut ledger);

        assert_eq!(result.assignments.get("john smyth").unwrap().player_id, PlayerId(11));
        assert!(!result.assignments.contains_key("jon smith"));
        assert_eq!(
            result.outcome_for("jon smith", 1995),
            ResolutionOutcome::UnresolvedLowConfidence {
                top_score: 90.0,
                rejection: Rejection::AlreadyClaimed
            }
        );
    }

    #[test]
    fn test_highest_score_overrides_input_order() {
        let identities = vec![identity(1995, 11, "John Smith")];
        let config = LinkageConfig::default().with_contest_policy(ContestPolicy::HighestScore);
        let mut ledger = AssignmentLedger::new();
        let matcher = FuzzyMatcher::new(&identities, &ledger, &config);

        // "jhn smth" scores 80, "jon smith" scores 90
        let queries = vec![FuzzyQuery::new("jhn smth", 1995), FuzzyQuery::new("jon smith", 1995)];
        let result = matcher.run(&queries, &mut ledger);

        assert_eq!(result.assignments.get("jon smith").unwrap().player_id, PlayerId(11));
        assert!(!result.assignments.contains_key("jhn smth"));
        assert!(matches!(
            result.outcome_for("jhn smth", 1995),
            ResolutionOutcome::UnresolvedLowConfidence {
                rejection: Rejection::AlreadyClaimed,
                ..
            }
        ));

        // Same queries, first-come: the earlier name wins instead
        let config = LinkageConfig::default();
        let mut ledger = AssignmentLedger::new();
        let matcher = FuzzyMatcher::new(&identities, &ledger, &config);
        let result = matcher.run(&queries, &mut ledger);
        assert_eq!(result.assignments.get("jhn smth").unwrap().player_id, PlayerId(11));
    }

    #[test]
    fn test_name_resolved_once_across_seasons() {
        let identities = vec![identity(1995, 11, "John Smith"), identity(1996, 12, "John Smyth")];
        let config = LinkageConfig::default();
        let mut ledger = AssignmentLedger::new();
        let matcher = FuzzyMatcher::new(&identities, &ledger, &config);

        let queries = vec![FuzzyQuery::new("jon smith", 1995), FuzzyQuery::new("jon smith", 1996)];
        let result = matcher.run(&queries, &mut ledger);

        // Second season never reassigns the name
        assert_eq!(result.assignments.len(), 1);
        assert_eq!(result.assignments.get("jon smith").unwrap().player_id, PlayerId(11));
        assert_eq!(result.outcome_for("jon smith", 1996).player_id(), Some(PlayerId(11)));
        assert_eq!(ledger.fuzzy_count(), 1);
    }

    #[test]
    fn test_no_two_names_share_a_fuzzy_id() {
        let identities = vec![
            identity(1995, 1, "Anfernee Hardaway"),
            identity(1995, 2, "Dikembe Mutombo"),
            identity(1995, 3, "Hakeem Olajuwon"),
        ];

        for policy in [ContestPolicy::FirstCome, ContestPolicy::HighestScore] {
            let config = LinkageConfig::default().with_contest_policy(policy);
            let mut ledger = AssignmentLedger::new();
            let matcher = FuzzyMatcher::new(&identities, &ledger, &config);

            let queries = vec![
                FuzzyQuery::new("penny hardaway", 1995),
                FuzzyQuery::new("anfernee hardawey", 1995),
                FuzzyQuery::new("dikembe mutumbo", 1995),
                FuzzyQuery::new("akeem olajuwon", 1995),
                FuzzyQuery::new("hakeem olajuwan", 1995),
            ];
            let result = matcher.run(&queries, &mut ledger);

            let mut ids: Vec<PlayerId> = result.assignments.values().map(|a| a.player_id).collect();
            let before = ids.len();
            ids.sort();
            ids.dedup();
            assert_eq!(ids.len(), before, "policy {:?} double-assigned an id", policy);
        }

        println!("✅ Ledger invariant holds under both contest policies");
    }
}
