use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, OpenFlags, params};
use serde_json::Value;

use crate::records::{DataQualityReport, PlayerSeasonRecord, RawPlayerRecord, convert_raw_records};

pub const STATS_TABLE: &str = "player_season_stats";

/// Records for one team-season plus what had to be defaulted to get them.
#[derive(Debug, Clone, Default)]
pub struct LoadedRoster {
    pub team: Option<String>,
    pub season: Option<String>,
    pub records: Vec<PlayerSeasonRecord>,
    pub quality: DataQualityReport,
}

impl LoadedRoster {
    pub fn from_records(records: Vec<PlayerSeasonRecord>) -> Self {
        Self {
            quality: DataQualityReport {
                records_total: records.len(),
                ..Default::default()
            },
            records,
            ..Default::default()
        }
    }

    pub fn label(&self) -> String {
        match (&self.team, &self.season) {
            (Some(team), Some(season)) => format!("{team} ({season})"),
            (Some(team), None) => team.clone(),
            (None, Some(season)) => format!("unknown team ({season})"),
            (None, None) => "unknown team".to_string(),
        }
    }

    fn log_quality(&self) {
        for warning in self.quality.warnings() {
            log::warn!("{}: {warning}", self.label());
        }
    }
}

pub fn load_roster_json(path: &Path) -> Result<LoadedRoster> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("read roster file {}", path.display()))?;
    parse_roster_json(&raw).with_context(|| format!("parse roster file {}", path.display()))
}

/// Accepts either a bare array of player objects or an object with a
/// `players` array and optional `team` / `season` strings.
pub fn parse_roster_json(raw: &str) -> Result<LoadedRoster> {
    let root: Value = serde_json::from_str(raw).context("roster is not valid JSON")?;
    let (team, season, players) = match root {
        Value::Array(items) => (None, None, items),
        Value::Object(mut obj) => {
            let team = obj.get("team").and_then(metadata_string);
            let season = obj.get("season").and_then(metadata_string);
            let players = match obj.remove("players") {
                Some(Value::Array(items)) => items,
                Some(_) => return Err(anyhow!("`players` must be an array")),
                None => return Err(anyhow!("roster object has no `players` array")),
            };
            (team, season, players)
        }
        _ => return Err(anyhow!("roster must be an array or an object")),
    };

    let mut skipped = 0usize;
    let mut raws = Vec::with_capacity(players.len());
    for item in players {
        if !item.is_object() {
            skipped += 1;
            continue;
        }
        match serde_json::from_value::<RawPlayerRecord>(item) {
            Ok(r) => raws.push(r),
            Err(err) => {
                log::debug!("skipping malformed player entry: {err}");
                skipped += 1;
            }
        }
    }

    let (records, mut quality) = convert_raw_records(raws);
    quality.skipped_entries = skipped;
    let roster = LoadedRoster {
        team,
        season,
        records,
        quality,
    };
    roster.log_quality();
    Ok(roster)
}

fn metadata_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Opens an existing stats database without write access.
pub fn open_db(path: &Path) -> Result<Connection> {
    Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .with_context(|| format!("open sqlite db {}", path.display()))
}

pub fn list_teams(conn: &Connection, season: &str) -> Result<Vec<String>> {
    let sql = format!("SELECT DISTINCT team FROM {STATS_TABLE} WHERE season = ?1 ORDER BY team");
    let mut stmt = conn.prepare(&sql).context("prepare team listing")?;
    let rows = stmt
        .query_map(params![season], |row| row.get::<_, String>(0))
        .context("query teams")?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row.context("read team row")?);
    }
    Ok(out)
}

pub fn load_roster_sqlite(conn: &Connection, team: &str, season: &str) -> Result<LoadedRoster> {
    let sql = format!(
        "SELECT player_id, player_name, position, appearances, minutes, goals, assists, average_rating \
         FROM {STATS_TABLE} WHERE team = ?1 AND season = ?2 ORDER BY rowid"
    );
    let mut stmt = conn
        .prepare(&sql)
        .with_context(|| format!("prepare roster query for {team}"))?;
    let rows = stmt
        .query_map(params![team, season], |row| {
            Ok(RawPlayerRecord {
                player_id: json_from_sql(row.get::<_, SqlValue>(0)?),
                player_name: text_from_sql(row.get::<_, SqlValue>(1)?),
                position: text_from_sql(row.get::<_, SqlValue>(2)?),
                appearances: json_from_sql(row.get::<_, SqlValue>(3)?),
                minutes: json_from_sql(row.get::<_, SqlValue>(4)?),
                goals: json_from_sql(row.get::<_, SqlValue>(5)?),
                assists: json_from_sql(row.get::<_, SqlValue>(6)?),
                average_rating: json_from_sql(row.get::<_, SqlValue>(7)?),
            })
        })
        .with_context(|| format!("query roster for {team} {season}"))?;

    let mut raws = Vec::new();
    for row in rows {
        raws.push(row.context("read roster row")?);
    }
    let (records, quality) = convert_raw_records(raws);
    let roster = LoadedRoster {
        team: Some(team.to_string()),
        season: Some(season.to_string()),
        records,
        quality,
    };
    roster.log_quality();
    Ok(roster)
}

/// Every team's roster for `season`, in team-name order.
pub fn load_season_sqlite(conn: &Connection, season: &str) -> Result<Vec<LoadedRoster>> {
    let teams = list_teams(conn, season)?;
    if teams.is_empty() {
        log::warn!("no teams found for season {season}");
    }
    teams
        .iter()
        .map(|team| load_roster_sqlite(conn, team, season))
        .collect()
}

fn json_from_sql(value: SqlValue) -> Option<Value> {
    match value {
        SqlValue::Null | SqlValue::Blob(_) => None,
        SqlValue::Integer(i) => Some(Value::from(i)),
        SqlValue::Real(f) => serde_json::Number::from_f64(f).map(Value::Number),
        SqlValue::Text(s) => Some(Value::String(s)),
    }
}

fn text_from_sql(value: SqlValue) -> Option<String> {
    match value {
        SqlValue::Text(s) => Some(s),
        SqlValue::Integer(i) => Some(i.to_string()),
        SqlValue::Real(f) => Some(f.to_string()),
        SqlValue::Null | SqlValue::Blob(_) => None,
    }
}
