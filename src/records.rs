// 🏀 Record Types - Canonical identities, career spans, salary rows
// Typed rows for both sources. Names are compared in normalized form only.

use crate::error::LinkError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::ops::RangeInclusive;

// ============================================================================
// PLAYER ID
// ============================================================================

/// Stable identifier from the statistics source
///
/// Opaque to the matcher: only equality, hashing and ordering are used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub i64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Normalized comparison form of a player name: trimmed, lowercased
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

// ============================================================================
// CANONICAL IDENTITY
// ============================================================================

/// One (season, player) row of the statistics dataset
///
/// Several rows may share a (season, player_id) pair when a player was
/// traded mid-season; the matcher deduplicates where it matters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalIdentity {
    pub season: i32,
    pub player_id: PlayerId,
    /// Normalized name
    pub name: String,
    pub team: Option<String>,
}

impl CanonicalIdentity {
    pub fn new(season: i32, player_id: PlayerId, name: &str, team: Option<String>) -> Self {
        CanonicalIdentity {
            season,
            player_id,
            name: normalize_name(name),
            team,
        }
    }
}

// ============================================================================
// CAREER SPAN
// ============================================================================

/// First and last active season of a player (closed interval)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CareerSpan {
    pub player_id: PlayerId,
    pub first_season: i32,
    pub last_season: i32,
}

impl CareerSpan {
    /// Build a span, rejecting inverted ranges
    pub fn new(player_id: PlayerId, first_season: i32, last_season: i32) -> Result<Self, LinkError> {
        if first_season > last_season {
            return Err(LinkError::InvertedSpan {
                player_id,
                first_season,
                last_season,
            });
        }

        Ok(CareerSpan {
            player_id,
            first_season,
            last_season,
        })
    }

    /// Inclusive on both ends: a one-season career [Y, Y] contains Y
    pub fn contains(&self, season: i32) -> bool {
        self.first_season <= season && season <= self.last_season
    }

    pub fn seasons(&self) -> RangeInclusive<i32> {
        self.first_season..=self.last_season
    }
}

// ============================================================================
// SALARY RECORD
// ============================================================================

/// Where a loaded row came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    pub source_file: String,
    pub line_number: usize,
}

/// One salary row, keyed only by free-text name and season
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalaryRecord {
    /// Name as written in the salary source
    pub name: String,

    /// First year of the "YYYY-YY" label
    pub season: i32,

    /// Inflation-adjusted salary
    pub salary: f64,

    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salary_unadjusted: Option<f64>,

    /// Set at most once, by the linkage engine
    #[serde(default)]
    pub player_id: Option<PlayerId>,

    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provenance: Option<Provenance>,
}

impl SalaryRecord {
    pub fn new(name: impl Into<String>, season: i32, salary: f64) -> Self {
        SalaryRecord {
            name: name.into(),
            season,
            salary,
            salary_unadjusted: None,
            player_id: None,
            provenance: None,
        }
    }

    /// Builder: add unadjusted salary
    pub fn with_unadjusted(mut self, salary: f64) -> Self {
        self.salary_unadjusted = Some(salary);
        self
    }

    /// Builder: add provenance
    pub fn with_provenance(mut self, source_file: impl Into<String>, line_number: usize) -> Self {
        self.provenance = Some(Provenance {
            source_file: source_file.into(),
            line_number,
        });
        self
    }

    pub fn normalized_name(&self) -> String {
        normalize_name(&self.name)
    }

    /// Compute idempotency hash for storage
    /// Identity of a salary row = normalized name + season + salary, plus
    /// source file and line when known (same-name players can share a salary)
    pub fn compute_idempotency_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(format!(
            "{}|{}|{}",
            self.normalized_name(),
            self.season,
            self.salary
        ));
        if let Some(provenance) = &self.provenance {
            hasher.update(format!("|{}|{}", provenance.source_file, provenance.line_number));
        }
        format!("{:x}", hasher.finalize())
    }
}

// ============================================================================
// TESTS
// ============================================================================
