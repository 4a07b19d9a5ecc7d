// 📂 CSV Loaders - Statistics and salary sources → typed records
// NA markers become None here; nothing downstream sees sentinel strings.

use crate::error::LinkError;
use crate::records::{CanonicalIdentity, CareerSpan, PlayerId, SalaryRecord};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Markers treated as missing data
pub const NA_MARKERS: &[&str] = &["NA", "N/A", ""];

// ============================================================================
// RAW ROWS (one per source file)
// ============================================================================

/// `Player Season Info.csv` - other columns are ignored
#[derive(Debug, Deserialize)]
struct SeasonInfoRow {
    season: Option<String>,
    player_id: Option<String>,
    player: Option<String>,
    tm: Option<String>,
}

/// `Player Career Info.csv`
#[derive(Debug, Deserialize)]
struct CareerInfoRow {
    player_id: Option<String>,
    first_seas: Option<String>,
    last_seas: Option<String>,
}

/// `nba_player_salaries.csv`
#[derive(Debug, Deserialize)]
struct SalaryRow {
    #[serde(rename = "Player Name")]
    player_name: Option<String>,

    #[serde(rename = "Year")]
    year: Option<String>,

    #[serde(rename = "Salary (Adjusted)")]
    salary_adjusted: Option<String>,

    #[serde(rename = "Salary (Unadjusted)", default)]
    salary_unadjusted: Option<String>,
}

// ============================================================================
// VALUE PARSING
// ============================================================================

/// Collapse NA markers to None
fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !NA_MARKERS.contains(&v.as_str()))
}

fn required(
    value: Option<String>,
    file: &str,
    line: usize,
    column: &'static str,
) -> Result<String, LinkError> {
    present(value).ok_or_else(|| LinkError::MissingField {
        file: file.to_string(),
        line,
        column,
    })
}

/// Integers may have been written as floats by an upstream dataframe ("1990.0")
fn parse_int(raw: &str) -> Option<i64> {
    if let Ok(v) = raw.parse::<i64>() {
        return Some(v);
    }

    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && v.fract() == 0.0)
        .map(|v| v as i64)
}

fn int_field(value: Option<String>, file: &str, line: usize, column: &'static str) -> Result<i64> {
    let raw = required(value, file, line, column)?;
    parse_int(&raw).with_context(|| format!("{}:{}: `{}` is not an integer: {:?}", file, line, column, raw))
}

fn year_field(value: Option<String>, file: &str, line: usize, column: &'static str) -> Result<i32> {
    let year = int_field(value, file, line, column)?;
    i32::try_from(year).with_context(|| format!("{}:{}: `{}` is out of range: {}", file, line, column, year))
}

/// "1990-91" → 1990 (first year of the label). A bare "1990" is accepted too.
pub fn parse_season_label(label: &str) -> Result<i32, LinkError> {
    let invalid = || LinkError::InvalidSeasonLabel {
        label: label.to_string(),
    };

    let trimmed = label.trim();
    let mut parts = trimmed.splitn(2, '-');
    let first = parts.next().unwrap_or_default();

    if first.len() != 4 || !first.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }

    if let Some(rest) = parts.next() {
        if rest.is_empty() || !rest.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
    }

    first.parse::<i32>().map_err(|_| invalid())
}

/// "$1,234,567" → 1234567.0
pub fn parse_salary(raw: &str) -> Result<f64, LinkError> {
    let cleaned: String = raw
        .chars()
        .filter(|c| *c != '$' && *c != ',' && !c.is_whitespace())
        .collect();

    cleaned
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| LinkError::InvalidSalary {
            raw: raw.to_string(),
        })
}

// ============================================================================
// LOADERS
// ============================================================================

/// Iterate deserialized rows together with their 1-based line numbers
fn read_rows<R: Read, T: for<'de> Deserialize<'de>>(reader: R, source: &str) -> Result<Vec<(usize, T)>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let headers = rdr
        .headers()
        .with_context(|| format!("Failed to read CSV header of {}", source))?
        .clone();

    let mut rows = Vec::new();
    for (index, result) in rdr.records().enumerate() {
        let record = result.with_context(|| format!("Failed to read CSV row in {}", source))?;
        // Header is line 1
        let line = record
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(index + 2);

        let row: T = record
            .deserialize(Some(&headers))
            .with_context(|| format!("{}:{}: failed to deserialize row", source, line))?;
        rows.push((line, row));
    }

    Ok(rows)
}

fn source_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Read canonical identities from a season-info CSV stream
pub fn read_season_info<R: Read>(reader: R, source: &str) -> Result<Vec<CanonicalIdentity>> {
    let mut identities = Vec::new();

    for (line, row) in read_rows::<_, SeasonInfoRow>(reader, source)? {
        let season = year_field(row.season, source, line, "season")?;
        let player_id = PlayerId(int_field(row.player_id, source, line, "player_id")?);
        let name = required(row.player, source, line, "player")?;

        identities.push(CanonicalIdentity::new(season, player_id, &name, present(row.tm)));
    }

    Ok(identities)
}

/// Read career spans from a career-info CSV stream
pub fn read_career_info<R: Read>(reader: R, source: &str) -> Result<Vec<CareerSpan>> {
    let mut spans = Vec::new();

    for (line, row) in read_rows::<_, CareerInfoRow>(reader, source)? {
        let player_id = PlayerId(int_field(row.player_id, source, line, "player_id")?);
        let first = year_field(row.first_seas, source, line, "first_seas")?;
        let last = year_field(row.last_seas, source, line, "last_seas")?;

        let span = CareerSpan::new(player_id, first, last)
            .with_context(|| format!("{}:{}: rejected career span", source, line))?;
        spans.push(span);
    }

    Ok(spans)
}

/// Read salary records from a salary CSV stream
pub fn read_salaries<R: Read>(reader: R, source: &str) -> Result<Vec<SalaryRecord>> {
    let mut salaries = Vec::new();

    for (line, row) in read_rows::<_, SalaryRow>(reader, source)? {
        let name = required(row.player_name, source, line, "Player Name")?;
        let label = required(row.year, source, line, "Year")?;
        let season = parse_season_label(&label)
            .with_context(|| format!("{}:{}: bad season label", source, line))?;
        let raw_salary = required(row.salary_adjusted, source, line, "Salary (Adjusted)")?;
        let salary = parse_salary(&raw_salary)
            .with_context(|| format!("{}:{}: bad salary", source, line))?;

        let mut record = SalaryRecord::new(name, season, salary).with_provenance(source, line);
        if let Some(raw) = present(row.salary_unadjusted) {
            let unadjusted = parse_salary(&raw)
                .with_context(|| format!("{}:{}: bad unadjusted salary", source, line))?;
            record = record.with_unadjusted(unadjusted);
        }

        salaries.push(record);
    }

    Ok(salaries)
}

pub fn load_season_info(path: &Path) -> Result<Vec<CanonicalIdentity>> {
    let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    read_season_info(file, &source_name(path))
}

pub fn load_career_info(path: &Path) -> Result<Vec<CareerSpan>> {
    let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    read_career_info(file, &source_name(path))
}

pub fn load_salaries(path: &Path) -> Result<Vec<SalaryRecord>> {
    let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    read_salaries(file, &source_name(path))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_season_label() {
        assert_eq!(parse_season_label("1990-91").unwrap(), 1990);
        assert_eq!(parse_season_label(" 1999-2000 ").unwrap(), 1999);
        assert_eq!(parse_season_label("2004").unwrap(), 2004);

        assert!(parse_season_label("90-91").is_err());
        assert!(parse_season_label("1990-").is_err());
        assert!(parse_season_label("abcd-ef").is_err());
    }

    #[test]
    fn test_parse_salary() {
        assert_eq!(parse_salary("$1,234,567").unwrap(), 1_234_567.0);
        assert_eq!(parse_salary("850000").unwrap(), 850_000.0);
        assert_eq!(parse_salary(" $ 12,500.50 ").unwrap(), 12_500.5);
        assert!(matches!(parse_salary("n/a"), Err(LinkError::InvalidSalary { .. })));
    }

    #[test]
    fn test_read_season_info_ignores_extra_columns_and_na_team() {
        let data = "\
season,seas_id,player_id,player,birth_year,pos,age,tm,experience
1995,100,7,Patrick Ewing,1962,C,33,NYK,11
1995,101,8,Rookie Guy,NA,PG,NA,NA,1
";
        let rows = read_season_info(data.as_bytes(), "season.csv").unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "patrick ewing");
        assert_eq!(rows[0].team.as_deref(), Some("NYK"));
        assert_eq!(rows[1].player_id, PlayerId(8));
        assert_eq!(rows[1].team, None);
    }

    #[test]
    fn test_read_season_info_missing_player_id_reports_line() {
        let data = "\
season,player_id,player,tm
1995,7,Patrick Ewing,NYK
1996,NA,Someone,BOS
";
        let err = read_season_info(data.as_bytes(), "season.csv").unwrap_err();
        let link_err = err.downcast_ref::<LinkError>().unwrap();

        match link_err {
            LinkError::MissingField { line, column, .. } => {
                assert_eq!(*line, 3);
                assert_eq!(*column, "player_id");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_read_career_info_accepts_float_years_and_rejects_inverted() {
        let data = "\
player_id,player,hof,num_seasons,first_seas,last_seas
1,A,FALSE,5,1990.0,1994.0
";
        let spans = read_career_info(data.as_bytes(), "career.csv").unwrap();
        assert_eq!(spans[0].first_season, 1990);
        assert_eq!(spans[0].last_season, 1994);

        let bad = "\
player_id,player,hof,num_seasons,first_seas,last_seas
2,B,FALSE,1,2001,1999
";
        assert!(read_career_info(bad.as_bytes(), "career.csv").is_err());
    }

    #[test]
    fn test_out_of_range_year_reports_line() {
        let data = "\
season,player_id,player,tm
1995,7,Patrick Ewing,NYK
4294969295,8,Overflow Guy,BOS
";
        let err = read_season_info(data.as_bytes(), "season.csv").unwrap_err();
        assert!(err.to_string().contains("season.csv:3"), "{}", err);

        let career = "\
player_id,player,hof,num_seasons,first_seas,last_seas
1,A,FALSE,5,1990,99999999999
";
        let err = read_career_info(career.as_bytes(), "career.csv").unwrap_err();
        assert!(err.to_string().contains("career.csv:2"), "{}", err);
    }

    #[test]
    fn test_bad_unadjusted_salary_reports_line() {
        let data = "\
Player Name,Year,Salary (Adjusted),Salary (Unadjusted)
Michael Jordan,1996-97,\"$55,000,000\",\"$30,140,000\"
Role Player,1997-98,\"$1,000,000\",garbage
";
        let err = read_salaries(data.as_bytes(), "salaries.csv").unwrap_err();

        assert!(err.to_string().contains("salaries.csv:3"), "{}", err);
        assert!(matches!(err.downcast_ref::<LinkError>(), Some(LinkError::InvalidSalary { .. })));
    }

    #[test]
    fn test_load_salaries_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Player Name,Year,Salary (Adjusted),Salary (Unadjusted)").unwrap();
        writeln!(file, "Michael Jordan,1996-97,\"$55,000,000\",\"$30,140,000\"").unwrap();
        writeln!(file, "Role Player,1997-98,\"$1,000,000\",NA").unwrap();

        let salaries = load_salaries(file.path()).unwrap();

        assert_eq!(salaries.len(), 2);
        assert_eq!(salaries[0].season, 1996);
        assert_eq!(salaries[0].salary, 55_000_000.0);
        assert_eq!(salaries[0].salary_unadjusted, Some(30_140_000.0));
        assert_eq!(salaries[0].player_id, None);
        assert_eq!(salaries[0].provenance.as_ref().unwrap().line_number, 2);
        assert_eq!(salaries[1].salary_unadjusted, None);

        println!("✅ Loaded {} salary rows", salaries.len());
    }
}
