// 📤 CSV Export - Resolutions and joined salary rows

use crate::join::PlayerSeasonSalary;
use crate::outcome::{MatchMethod, Resolution, ResolutionOutcome};
use anyhow::{Context, Result};
use serde::Serialize;
use std::io::Write;
use std::path::Path;

/// Flat CSV row for one resolution
#[derive(Debug, Clone, Serialize)]
pub struct ResolutionRow {
    pub name: String,
    pub season: i32,
    pub salary: f64,
    pub salary_unadjusted: Option<f64>,
    pub player_id: Option<i64>,
    pub outcome: &'static str,
    pub method: Option<&'static str>,
    pub score: Option<f64>,
    pub rejection: Option<&'static str>,
    pub source_file: Option<String>,
    pub line_number: Option<usize>,
}

impl From<&Resolution> for ResolutionRow {
    fn from(resolution: &Resolution) -> Self {
        let record = &resolution.record;

        let (method, score, rejection) = match &resolution.outcome {
            ResolutionOutcome::Resolved { method, .. } => {
                let score = match method {
                    MatchMethod::Fuzzy { score } => Some(*score),
                    _ => None,
                };
                (Some(method.as_str()), score, None)
            }
            ResolutionOutcome::UnresolvedLowConfidence { top_score, rejection } => {
                (None, Some(*top_score), Some(rejection.as_str()))
            }
            _ => (None, None, None),
        };

        ResolutionRow {
            name: record.name.clone(),
            season: record.season,
            salary: record.salary,
            salary_unadjusted: record.salary_unadjusted,
            player_id: record.player_id.map(|id| id.0),
            outcome: resolution.outcome.category().as_str(),
            method,
            score,
            rejection,
            source_file: record.provenance.as_ref().map(|p| p.source_file.clone()),
            line_number: record.provenance.as_ref().map(|p| p.line_number),
        }
    }
}

/// Write rows as CSV with a header line
pub fn write_rows<W: Write, T: Serialize>(writer: W, rows: &[T]) -> Result<usize> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for row in rows {
        csv_writer.serialize(row).context("Failed to serialize CSV row")?;
    }
    csv_writer.flush().context("Failed to flush CSV output")?;
    Ok(rows.len())
}

pub fn write_resolutions(path: &Path, resolutions: &[Resolution]) -> Result<usize> {
    let rows: Vec<ResolutionRow> = resolutions.iter().map(ResolutionRow::from).collect();
    let file = std::fs::File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    write_rows(file, &rows)
}

pub fn write_joined(path: &Path, rows: &[PlayerSeasonSalary]) -> Result<usize> {
    let file = std::fs::File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    write_rows(file, rows)
}
