// 🔗 Salary Join - Player seasons × resolved salaries on (season, player_id)

use crate::records::{CanonicalIdentity, PlayerId, SalaryRecord};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SeasonKey {
    pub season: i32,
    pub player_id: PlayerId,
}

/// One player season with its salary attached
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSeasonSalary {
    pub season: i32,
    pub player_id: PlayerId,
    pub player: String,
    pub team: Option<String>,
    pub salary: f64,
    pub salary_unadjusted: Option<f64>,
}

/// Inner join: season rows without a resolved salary are dropped.
/// When a key has several salary rows the first one is used.
pub fn join_salaries(identities: &[CanonicalIdentity], salaries: &[SalaryRecord]) -> Vec<PlayerSeasonSalary> {
    let mut by_key: HashMap<SeasonKey, &SalaryRecord> = HashMap::new();
    for record in salaries {
        if let Some(player_id) = record.player_id {
            by_key
                .entry(SeasonKey {
                    season: record.season,
                    player_id,
                })
                .or_insert(record);
        }
    }

    let joined: Vec<PlayerSeasonSalary> = identities
        .iter()
        .filter_map(|row| {
            let key = SeasonKey {
                season: row.season,
                player_id: row.player_id,
            };
            by_key.get(&key).map(|record| PlayerSeasonSalary {
                season: row.season,
                player_id: row.player_id,
                player: row.name.clone(),
                team: row.team.clone(),
                salary: record.salary,
                salary_unadjusted: record.salary_unadjusted,
            })
        })
        .collect();

    info!(
        season_rows = identities.len(),
        salary_keys = by_key.len(),
        joined = joined.len(),
        "salary join complete"
    );

    joined
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_drops_rows_without_salary() {
        let identities = vec![
            CanonicalIdentity::new(1995, PlayerId(1), "Grant Hill", Some("DET".into())),
            CanonicalIdentity::new(1996, PlayerId(1), "Grant Hill", Some("DET".into())),
            CanonicalIdentity::new(1995, PlayerId(2), "Jason Kidd", Some("DAL".into())),
        ];

        let mut hill = SalaryRecord::new("Grant Hill", 1995, 3_500_000.0).with_unadjusted(2_000_000.0);
        hill.player_id = Some(PlayerId(1));
        let mut dup = SalaryRecord::new("Grant Hill", 1995, 9.0);
        dup.player_id = Some(PlayerId(1));
        // Unresolved salary rows never join
        let kidd = SalaryRecord::new("Jason Kid", 1995, 4_000_000.0);

        let joined = join_salaries(&identities, &[hill, dup, kidd]);

        assert_eq!(joined.len(), 1);
        assert_eq!(joined[0].player, "grant hill");
        assert_eq!(joined[0].team.as_deref(), Some("DET"));
        assert_eq!(joined[0].salary, 3_500_000.0);
        assert_eq!(joined[0].salary_unadjusted, Some(2_000_000.0));
    }

    #[test]
    fn test_join_keeps_each_team_row() {
        let identities = vec![
            CanonicalIdentity::new(1997, PlayerId(5), "Chris Gatling", Some("DAL".into())),
            CanonicalIdentity::new(1997, PlayerId(5), "Chris Gatling", Some("NJN".into())),
        ];
        let mut salary = SalaryRecord::new("Chris Gatling", 1997, 1_000_000.0);
        salary.player_id = Some(PlayerId(5));

        let joined = join_salaries(&identities, &[salary]);
        assert_eq!(joined.len(), 2);
    }
}
