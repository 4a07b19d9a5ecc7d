// ⚠️ Error Types - Boundary failures
// The matching core never fails; only loading and configuration do.

use crate::records::PlayerId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LinkError {
    /// Season label did not look like "1990-91"
    #[error("invalid season label {label:?} (expected YYYY-YY)")]
    InvalidSeasonLabel { label: String },

    /// Salary could not be parsed after stripping `$` and `,`
    #[error("invalid salary amount {raw:?}")]
    InvalidSalary { raw: String },

    /// CareerSpan invariant: first_season <= last_season
    #[error("career span for player {player_id} is inverted ({first_season} > {last_season})")]
    InvertedSpan {
        player_id: PlayerId,
        first_season: i32,
        last_season: i32,
    },

    /// A required column decoded to NA or was empty
    #[error("{file}:{line}: missing required value for `{column}`")]
    MissingField {
        file: String,
        line: usize,
        column: &'static str,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
