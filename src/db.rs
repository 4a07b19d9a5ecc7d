use crate::config::LinkageConfig;
use crate::export::ResolutionRow;
use crate::outcome::{LinkageReport, OutcomeCategory, OutcomeCounts};
use crate::records::normalize_name;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use tracing::info;

/// One resolution as persisted (flat, query-friendly)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredResolution {
    pub idempotency_hash: String,
    pub run_id: String,
    pub name: String,
    pub season: i32,
    pub salary: f64,
    pub salary_unadjusted: Option<f64>,
    pub player_id: Option<i64>,
    pub outcome: String,
    pub method: Option<String>,
    pub score: Option<f64>,
    pub rejection: Option<String>,
    pub source_file: Option<String>,
    pub line_number: Option<i64>,
}

impl StoredResolution {
    pub fn category(&self) -> Option<OutcomeCategory> {
        OutcomeCategory::parse(&self.outcome)
    }

    pub fn is_resolved(&self) -> bool {
        self.player_id.is_some()
    }
}

/// One stored resolution run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredRun {
    pub run_id: String,
    pub resolved_at: DateTime<Utc>,
    pub config: serde_json::Value,
    pub counts: OutcomeCounts,
    pub collision_names: i64,
}

/// What an import of one run did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreSummary {
    pub run_id: String,
    pub inserted: usize,
    /// Rows already stored whose outcome changed in this run
    pub updated: usize,
    /// Rows already stored with the same outcome
    pub duplicates: usize,
}

/// Outcome columns of a stored row, compared across runs
type StoredOutcome = (Option<i64>, String, Option<String>, Option<f64>, Option<String>);

/// Event for audit trail
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Event {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub entity_type: String,
    pub entity_id: String,
    pub data: serde_json::Value,
    pub actor: String,
}

impl Event {
    pub fn new(
        event_type: &str,
        entity_type: &str,
        entity_id: &str,
        data: serde_json::Value,
        actor: &str,
    ) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type: event_type.to_string(),
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            data,
            actor: actor.to_string(),
        }
    }
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    // ==========================================================================
    // Runs Table (one row per resolution run)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS runs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            run_id TEXT UNIQUE NOT NULL,
            resolved_at TEXT NOT NULL,
            config TEXT NOT NULL,
            counts TEXT NOT NULL,
            collision_names INTEGER NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    // ==========================================================================
    // Resolutions Table (deduplicated by salary row identity)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS resolutions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            idempotency_hash TEXT UNIQUE NOT NULL,
            run_id TEXT NOT NULL,
            name TEXT NOT NULL,
            normalized_name TEXT NOT NULL,
            season INTEGER NOT NULL,
            salary REAL NOT NULL,
            salary_unadjusted REAL,
            player_id INTEGER,
            outcome TEXT NOT NULL,
            method TEXT,
            score REAL,
            rejection TEXT,
            source_file TEXT,
            line_number INTEGER,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    // ==========================================================================
    // Events Table (audit trail)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id TEXT UNIQUE NOT NULL,
            timestamp TEXT NOT NULL,
            event_type TEXT NOT NULL,
            entity_type TEXT NOT NULL,
            entity_id TEXT NOT NULL,
            data TEXT NOT NULL,
            actor TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    // ==========================================================================
    // Indexes
    // ==========================================================================
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_resolutions_season ON resolutions(season)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_resolutions_outcome ON resolutions(outcome)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_resolutions_name ON resolutions(normalized_name)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_events_entity ON events(entity_type, entity_id)",
        [],
    )?;

    Ok(())
}

/// Open (or create) a database file and make sure the schema exists
pub fn open_database(path: &std::path::Path) -> Result<Connection> {
    let conn = Connection::open(path).with_context(|| format!("Failed to open database {}", path.display()))?;
    setup_database(&conn)?;
    Ok(conn)
}

/// Store a run and its resolutions. A salary row already present (same
/// idempotency hash) is not duplicated: its outcome columns and `run_id` are
/// overwritten by this run, so stored rows always agree with the latest run
/// that saw them.
pub fn insert_run(conn: &Connection, report: &LinkageReport, config: &LinkageConfig) -> Result<StoreSummary> {
    let run_id = uuid::Uuid::new_v4().to_string();

    conn.execute(
        "INSERT INTO runs (run_id, resolved_at, config, counts, collision_names)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            run_id,
            report.resolved_at.to_rfc3339(),
            serde_json::to_string(config)?,
            serde_json::to_string(&report.counts)?,
            report.collision_names as i64,
        ],
    )?;

    let mut inserted = 0;
    let mut updated = 0;
    let mut duplicates = 0;

    for resolution in &report.resolutions {
        let hash = resolution.record.compute_idempotency_hash();
        let row = ResolutionRow::from(resolution);

        let previous: Option<StoredOutcome> = conn
            .query_row(
                "SELECT player_id, outcome, method, score, rejection
                 FROM resolutions WHERE idempotency_hash = ?1",
                params![hash],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?)),
            )
            .optional()?;

        conn.execute(
            "INSERT INTO resolutions (
                idempotency_hash, run_id, name, normalized_name, season, salary,
                salary_unadjusted, player_id, outcome, method, score, rejection,
                source_file, line_number
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            ON CONFLICT(idempotency_hash) DO UPDATE SET
                run_id = excluded.run_id,
                salary_unadjusted = excluded.salary_unadjusted,
                player_id = excluded.player_id,
                outcome = excluded.outcome,
                method = excluded.method,
                score = excluded.score,
                rejection = excluded.rejection",
            params![
                hash,
                run_id,
                row.name,
                normalize_name(&row.name),
                row.season,
                row.salary,
                row.salary_unadjusted,
                row.player_id,
                row.outcome,
                row.method,
                row.score,
                row.rejection,
                row.source_file,
                row.line_number.map(|n| n as i64),
            ],
        )?;

        let current: StoredOutcome = (
            row.player_id,
            row.outcome.to_string(),
            row.method.map(str::to_string),
            row.score,
            row.rejection.map(str::to_string),
        );

        match previous {
            None => inserted += 1,
            Some(previous) if previous == current => duplicates += 1,
            Some(_) => updated += 1,
        }
    }

    let event = Event::new(
        "run_stored",
        "run",
        &run_id,
        serde_json::json!({
            "records": report.resolutions.len(),
            "inserted": inserted,
            "updated": updated,
            "duplicates": duplicates,
            "resolution_rate": report.resolution_rate(),
        }),
        "roster_link",
    );
    insert_event(conn, &event)?;

    info!(%run_id, inserted, updated, duplicates, "run stored");

    Ok(StoreSummary {
        run_id,
        inserted,
        updated,
        duplicates,
    })
}

/// Insert event into audit trail
pub fn insert_event(conn: &Connection, event: &Event) -> Result<()> {
    let data_json = serde_json::to_string(&event.data)?;

    conn.execute(
        "INSERT INTO events (
            event_id, timestamp, event_type, entity_type, entity_id, data, actor
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            event.event_id,
            event.timestamp.to_rfc3339(),
            event.event_type,
            event.entity_type,
            event.entity_id,
            data_json,
            event.actor,
        ],
    )?;

    Ok(())
}

/// Get events for a specific entity
pub fn get_events_for_entity(
    conn: &Connection,
    entity_type: &str,
    entity_id: &str,
) -> Result<Vec<Event>> {
    let mut stmt = conn.prepare(
        "SELECT event_id, timestamp, event_type, entity_type, entity_id, data, actor
         FROM events
         WHERE entity_type = ?1 AND entity_id = ?2
         ORDER BY timestamp DESC",
    )?;

    let events = stmt
        .query_map(params![entity_type, entity_id], |row| {
            let timestamp_str: String = row.get(1)?;
            let data_json: String = row.get(5)?;

            Ok(Event {
                event_id: row.get(0)?,
                timestamp: parse_timestamp(&timestamp_str)?,
                event_type: row.get(2)?,
                entity_type: row.get(3)?,
                entity_id: row.get(4)?,
                data: serde_json::from_str(&data_json)
                    .map_err(|_| rusqlite::Error::InvalidQuery)?,
                actor: row.get(6)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(events)
}

fn parse_timestamp(value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| rusqlite::Error::InvalidQuery)
}

// ============================================================================
// QUERIES
// ============================================================================

const RESOLUTION_COLUMNS: &str = "idempotency_hash, run_id, name, season, salary, salary_unadjusted,
    player_id, outcome, method, score, rejection, source_file, line_number";

fn map_resolution(row: &Row) -> rusqlite::Result<StoredResolution> {
    Ok(StoredResolution {
        idempotency_hash: row.get(0)?,
        run_id: row.get(1)?,
        name: row.get(2)?,
        season: row.get(3)?,
        salary: row.get(4)?,
        salary_unadjusted: row.get(5)?,
        player_id: row.get(6)?,
        outcome: row.get(7)?,
        method: row.get(8)?,
        score: row.get(9)?,
        rejection: row.get(10)?,
        source_file: row.get(11)?,
        line_number: row.get(12)?,
    })
}

fn query_resolutions<P: rusqlite::Params>(conn: &Connection, filter: &str, params: P) -> Result<Vec<StoredResolution>> {
    let sql = format!(
        "SELECT {} FROM resolutions {} ORDER BY season, name, id",
        RESOLUTION_COLUMNS, filter
    );
    let mut stmt = conn.prepare(&sql)?;

    let resolutions = stmt
        .query_map(params, map_resolution)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(resolutions)
}

pub fn get_all_resolutions(conn: &Connection) -> Result<Vec<StoredResolution>> {
    query_resolutions(conn, "", [])
}

pub fn get_resolutions_by_outcome(conn: &Connection, category: OutcomeCategory) -> Result<Vec<StoredResolution>> {
    query_resolutions(conn, "WHERE outcome = ?1", params![category.as_str()])
}

/// Exact match on the normalized salary name
pub fn get_resolutions_by_name(conn: &Connection, name: &str) -> Result<Vec<StoredResolution>> {
    query_resolutions(conn, "WHERE normalized_name = ?1", params![normalize_name(name)])
}

pub fn get_resolutions_by_season(conn: &Connection, season: i32) -> Result<Vec<StoredResolution>> {
    query_resolutions(conn, "WHERE season = ?1", params![season])
}

pub fn get_runs(conn: &Connection) -> Result<Vec<StoredRun>> {
    let mut stmt = conn.prepare(
        "SELECT run_id, resolved_at, config, counts, collision_names
         FROM runs
         ORDER BY id DESC",
    )?;

    let runs = stmt
        .query_map([], |row| {
            let resolved_at: String = row.get(1)?;
            let config: String = row.get(2)?;
            let counts: String = row.get(3)?;

            Ok(StoredRun {
                run_id: row.get(0)?,
                resolved_at: parse_timestamp(&resolved_at)?,
                config: serde_json::from_str(&config).map_err(|_| rusqlite::Error::InvalidQuery)?,
                counts: serde_json::from_str(&counts).map_err(|_| rusqlite::Error::InvalidQuery)?,
                collision_names: row.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(runs)
}

pub fn verify_count(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM resolutions", [], |row| row.get(0))?;

    Ok(count)
}

/// Season statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeasonStat {
    pub season: i32,
    pub records: i64,
    pub resolved: i64,
    pub ambiguous: i64,
    pub no_candidate: i64,
    pub low_confidence: i64,
    pub resolved_salary: f64,
}

impl SeasonStat {
    pub fn resolution_rate(&self) -> f64 {
        if self.records == 0 {
            return 0.0;
        }
        self.resolved as f64 / self.records as f64
    }
}

/// Get statistics grouped by season
pub fn get_season_stats(conn: &Connection) -> Result<Vec<SeasonStat>> {
    let mut stmt = conn.prepare(
        "SELECT
            season,
            COUNT(*) as records,
            SUM(CASE WHEN outcome = 'resolved' THEN 1 ELSE 0 END) as resolved,
            SUM(CASE WHEN outcome = 'ambiguous' THEN 1 ELSE 0 END) as ambiguous,
            SUM(CASE WHEN outcome = 'no_candidate' THEN 1 ELSE 0 END) as no_candidate,
            SUM(CASE WHEN outcome = 'low_confidence' THEN 1 ELSE 0 END) as low_confidence,
            COALESCE(SUM(CASE WHEN outcome = 'resolved' THEN salary ELSE 0 END), 0.0) as resolved_salary
         FROM resolutions
         GROUP BY season
         ORDER BY season",
    )?;

    let stats = stmt
        .query_map([], |row| {
            Ok(SeasonStat {
                season: row.get(0)?,
                records: row.get(1)?,
                resolved: row.get(2)?,
                ambiguous: row.get(3)?,
                no_candidate: row.get(4)?,
                low_confidence: row.get(5)?,
                resolved_salary: row.get(6)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(stats)
}
