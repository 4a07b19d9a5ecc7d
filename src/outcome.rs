// 🧾 Resolution Outcomes - Per-record results and the run report
// Unresolved records are an expected outcome; the report makes them auditable.

use crate::records::{PlayerId, SalaryRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// OUTCOME TYPES
// ============================================================================

/// How a resolved record got its id
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum MatchMethod {
    /// Name maps to exactly one player id
    Unique,

    /// Colliding name, season owned by one id
    Distinguished,

    /// Approximate name match within the season
    Fuzzy { score: f64 },
}

impl MatchMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchMethod::Unique => "unique",
            MatchMethod::Distinguished => "distinguished",
            MatchMethod::Fuzzy { .. } => "fuzzy",
        }
    }
}

/// Why a fuzzy match was turned down
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    /// Best score not above the threshold
    BelowThreshold,

    /// Best score does not stand out from the rest
    NarrowMargin,

    /// Best id already went to another query name
    AlreadyClaimed,
}

impl Rejection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rejection::BelowThreshold => "below_threshold",
            Rejection::NarrowMargin => "narrow_margin",
            Rejection::AlreadyClaimed => "already_claimed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ResolutionOutcome {
    Resolved {
        player_id: PlayerId,
        #[serde(flatten)]
        method: MatchMethod,
    },

    /// Colliding name and no distinguishing year covers the season
    UnresolvedAmbiguous,

    /// No unclaimed candidate in the season
    UnresolvedNoCandidate,

    UnresolvedLowConfidence {
        top_score: f64,
        rejection: Rejection,
    },
}

impl ResolutionOutcome {
    pub fn is_resolved(&self) -> bool {
        matches!(self, ResolutionOutcome::Resolved { .. })
    }

    pub fn player_id(&self) -> Option<PlayerId> {
        match self {
            ResolutionOutcome::Resolved { player_id, .. } => Some(*player_id),
            _ => None,
        }
    }

    pub fn category(&self) -> OutcomeCategory {
        match self {
            ResolutionOutcome::Resolved { .. } => OutcomeCategory::Resolved,
            ResolutionOutcome::UnresolvedAmbiguous => OutcomeCategory::Ambiguous,
            ResolutionOutcome::UnresolvedNoCandidate => OutcomeCategory::NoCandidate,
            ResolutionOutcome::UnresolvedLowConfidence { .. } => OutcomeCategory::LowConfidence,
        }
    }
}

/// Flat outcome label for counting, storage and filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeCategory {
    Resolved,
    Ambiguous,
    NoCandidate,
    LowConfidence,
}

impl OutcomeCategory {
    pub const ALL: [OutcomeCategory; 4] = [
        OutcomeCategory::Resolved,
        OutcomeCategory::Ambiguous,
        OutcomeCategory::NoCandidate,
        OutcomeCategory::LowConfidence,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeCategory::Resolved => "resolved",
            OutcomeCategory::Ambiguous => "ambiguous",
            OutcomeCategory::NoCandidate => "no_candidate",
            OutcomeCategory::LowConfidence => "low_confidence",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        OutcomeCategory::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(value.trim()))
    }
}

// ============================================================================
// RESOLUTION (record + outcome)
// ============================================================================

/// A salary record after linkage; `record.player_id` mirrors the outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub record: SalaryRecord,
    pub outcome: ResolutionOutcome,
}

impl Resolution {
    pub fn new(record: &SalaryRecord, outcome: ResolutionOutcome) -> Self {
        let mut record = record.clone();
        record.player_id = outcome.player_id();
        Resolution { record, outcome }
    }
}

// ============================================================================
// LINKAGE REPORT
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeCounts {
    pub unique: usize,
    pub distinguished: usize,
    pub fuzzy: usize,
    pub ambiguous: usize,
    pub no_candidate: usize,
    pub low_confidence: usize,
}

impl OutcomeCounts {
    pub fn from_resolutions(resolutions: &[Resolution]) -> Self {
        let mut counts = OutcomeCounts::default();

        for resolution in resolutions {
            match &resolution.outcome {
                ResolutionOutcome::Resolved { method, .. } => match method {
                    MatchMethod::Unique => counts.unique += 1,
                    MatchMethod::Distinguished => counts.distinguished += 1,
                    MatchMethod::Fuzzy { .. } => counts.fuzzy += 1,
                },
                ResolutionOutcome::UnresolvedAmbiguous => counts.ambiguous += 1,
                ResolutionOutcome::UnresolvedNoCandidate => counts.no_candidate += 1,
                ResolutionOutcome::UnresolvedLowConfidence { .. } => counts.low_confidence += 1,
            }
        }

        counts
    }

    pub fn resolved(&self) -> usize {
        self.unique + self.distinguished + self.fuzzy
    }

    pub fn unresolved(&self) -> usize {
        self.ambiguous + self.no_candidate + self.low_confidence
    }

    pub fn total(&self) -> usize {
        self.resolved() + self.unresolved()
    }

    pub fn for_category(&self, category: OutcomeCategory) -> usize {
        match category {
            OutcomeCategory::Resolved => self.resolved(),
            OutcomeCategory::Ambiguous => self.ambiguous,
            OutcomeCategory::NoCandidate => self.no_candidate,
            OutcomeCategory::LowConfidence => self.low_confidence,
        }
    }
}

/// Result of one resolution run, in salary input order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkageReport {
    pub resolutions: Vec<Resolution>,
    pub counts: OutcomeCounts,
    /// Number of names shared by 2+ player ids
    pub collision_names: usize,
    pub resolved_at: DateTime<Utc>,
}

impl LinkageReport {
    pub fn new(resolutions: Vec<Resolution>, collision_names: usize) -> Self {
        let counts = OutcomeCounts::from_resolutions(&resolutions);
        LinkageReport {
            resolutions,
            counts,
            collision_names,
            resolved_at: Utc::now(),
        }
    }

    /// Share of records that received a player id (0.0 - 1.0)
    pub fn resolution_rate(&self) -> f64 {
        let total = self.counts.total();
        if total == 0 {
            return 0.0;
        }
        self.counts.resolved() as f64 / total as f64
    }

    /// Records with their ids filled in where resolvable
    pub fn records(&self) -> Vec<SalaryRecord> {
        self.resolutions.iter().map(|r| r.record.clone()).collect()
    }

    pub fn resolved_records(&self) -> Vec<SalaryRecord> {
        self.resolutions
            .iter()
            .filter(|r| r.outcome.is_resolved())
            .map(|r| r.record.clone())
            .collect()
    }

    pub fn by_category(&self, category: OutcomeCategory) -> Vec<&Resolution> {
        self.resolutions
            .iter()
            .filter(|r| r.outcome.category() == category)
            .collect()
    }

    /// Distinct normalized names in a category, in first-seen order
    pub fn names_in(&self, category: OutcomeCategory) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for resolution in self.by_category(category) {
            let name = resolution.record.normalized_name();
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }

    pub fn summary(&self) -> String {
        format!(
            "Linkage: {} records, {} resolved ({:.1}%: {} unique, {} distinguished, {} fuzzy), {} unresolved ({} ambiguous, {} no candidate, {} low confidence), {} colliding names",
            self.counts.total(),
            self.counts.resolved(),
            self.resolution_rate() * 100.0,
            self.counts.unique,
            self.counts.distinguished,
            self.counts.fuzzy,
            self.counts.unresolved(),
            self.counts.ambiguous,
            self.counts.no_candidate,
            self.counts.low_confidence,
            self.collision_names,
        )
    }
}

// ============================================================================
// TESTS
// ============================================================================
