// ⚙️ Linkage Configuration - Rules as Data
// Thresholds and policies for a resolution run, loadable from JSON

use crate::error::LinkError;
use anyhow::{Context as AnyhowContext, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Salary data is unreliable before this season
pub const DEFAULT_CUTOFF_SEASON: i32 = 1990;

/// Fuzzy scores must be strictly above this (0-100 scale)
pub const DEFAULT_FUZZY_THRESHOLD: f64 = 50.0;

// ============================================================================
// POLICIES
// ============================================================================

/// How far the best fuzzy score must lead the runner-up
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MarginRule {
    /// Lead must exceed the population std-dev of all candidate scores
    #[default]
    PopulationStdDev,

    /// Same, with the n-1 (sample) estimator
    SampleStdDev,

    /// Lead must exceed a fixed number of points
    Fixed { min_margin: f64 },
}

/// String similarity metric, scaled to 0-100
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityMetric {
    /// 1 - levenshtein / max_len
    #[default]
    Levenshtein,
    JaroWinkler,
    SorensenDice,
}

/// Who wins when two query names fuzzy-match the same player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ContestPolicy {
    /// First query in salary input order keeps the id
    #[default]
    FirstCome,

    /// Highest-scoring (name, id) pair keeps the id, ties by input order
    HighestScore,
}

// ============================================================================
// LINKAGE CONFIG
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkageConfig {
    /// Minimum season eligible for matching
    pub cutoff_season: i32,

    /// Minimum (exclusive) similarity for a fuzzy acceptance
    pub fuzzy_threshold: f64,

    pub margin_rule: MarginRule,

    pub similarity: SimilarityMetric,

    pub contest_policy: ContestPolicy,
}

impl Default for LinkageConfig {
    fn default() -> Self {
        LinkageConfig {
            cutoff_season: DEFAULT_CUTOFF_SEASON,
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
            margin_rule: MarginRule::default(),
            similarity: SimilarityMetric::default(),
            contest_policy: ContestPolicy::default(),
        }
    }
}

impl LinkageConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load config from JSON file (missing fields take defaults)
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        let config: LinkageConfig =
            serde_json::from_str(&content).context("Failed to parse config JSON")?;

        config.validate()?;
        Ok(config)
    }

    /// Builder: override cutoff season
    pub fn with_cutoff_season(mut self, season: i32) -> Self {
        self.cutoff_season = season;
        self
    }

    /// Builder: override fuzzy threshold
    pub fn with_fuzzy_threshold(mut self, threshold: f64) -> Self {
        self.fuzzy_threshold = threshold;
        self
    }

    pub fn with_margin_rule(mut self, rule: MarginRule) -> Self {
        self.margin_rule = rule;
        self
    }

    pub fn with_similarity(mut self, metric: SimilarityMetric) -> Self {
        self.similarity = metric;
        self
    }

    pub fn with_contest_policy(mut self, policy: ContestPolicy) -> Self {
        self.contest_policy = policy;
        self
    }

    pub fn validate(&self) -> Result<(), LinkError> {
        if !(0.0..=100.0).contains(&self.fuzzy_threshold) {
            return Err(LinkError::InvalidConfig(format!(
                "fuzzy_threshold must be within 0-100, got {}",
                self.fuzzy_threshold
            )));
        }

        if let MarginRule::Fixed { min_margin } = self.margin_rule {
            if !min_margin.is_finite() || min_margin < 0.0 {
                return Err(LinkError::InvalidConfig(format!(
                    "fixed margin must be a non-negative number, got {}",
                    min_margin
                )));
            }
        }

        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
