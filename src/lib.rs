// Roster Link - Core Library
// Links salary rows to stable player ids; used by the CLI, API server, and tests

pub mod records;
pub mod error;
pub mod config;
pub mod loader;
pub mod collisions;     // Duplicate-name detection + career span index
pub mod distinguishing; // Distinguishing-year resolver
pub mod ledger;         // Run-scoped id claims
pub mod outcome;        // Per-record outcomes + linkage report
pub mod deterministic;  // Pass 1: exact names
pub mod fuzzy;          // Pass 2: approximate names
pub mod engine;
pub mod join;
pub mod export;
pub mod db;
pub mod logging;

#[cfg(feature = "tui")]
pub mod ui;

// Re-export commonly used types
pub use records::{normalize_name, CanonicalIdentity, CareerSpan, PlayerId, Provenance, SalaryRecord};
pub use error::LinkError;
pub use config::{ContestPolicy, LinkageConfig, MarginRule, SimilarityMetric};
pub use loader::{
    load_career_info, load_salaries, load_season_info,
    parse_salary, parse_season_label,
};
pub use collisions::{CareerSpanIndex, NameGroups};
pub use distinguishing::{DistinguishingYearMap, DistinguishingYears};
pub use ledger::{AssignmentLedger, ClaimSource};
pub use outcome::{
    LinkageReport, MatchMethod, OutcomeCategory, OutcomeCounts,
    Rejection, Resolution, ResolutionOutcome,
};
pub use deterministic::{DeterministicMatcher, ExactMatch};
pub use fuzzy::{evaluate, FuzzyMatcher, FuzzyQuery, ScoredCandidate, Verdict};
pub use engine::{LinkageEngine, LinkageInputs};
pub use join::{join_salaries, PlayerSeasonSalary, SeasonKey};
pub use export::{write_joined, write_resolutions, ResolutionRow};
pub use db::{
    StoredResolution, StoredRun, StoreSummary, SeasonStat, Event,
    setup_database, open_database, insert_run, insert_event, get_events_for_entity,
    get_all_resolutions, get_resolutions_by_outcome, get_resolutions_by_name,
    get_resolutions_by_season, get_runs, get_season_stats, verify_count,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
