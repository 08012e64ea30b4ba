use std::fs;
use std::path::PathBuf;

use rusqlite::{Connection, params};

use squad_contrib::PlayerId;
use squad_contrib::source::{
    list_teams, load_roster_json, load_roster_sqlite, load_season_sqlite, parse_roster_json,
};

fn seeded_db() -> Connection {
    let conn = Connection::open_in_memory().expect("in-memory db");
    conn.execute_batch(
        r#"
        CREATE TABLE player_season_stats (
            player_id INTEGER,
            player_name TEXT,
            position TEXT,
            team TEXT NOT NULL,
            season TEXT NOT NULL,
            appearances INTEGER,
            minutes INTEGER,
            goals INTEGER,
            assists INTEGER,
            average_rating REAL
        );
        "#,
    )
    .expect("schema");
    let rows: &[(i64, &str, Option<&str>, &str, &str, Option<i64>, Option<i64>, Option<i64>, Option<i64>, Option<f64>)] = &[
        (1, "Keeper", Some("Goalkeeper"), "Rovers", "2023/24", Some(38), Some(3420), Some(0), Some(0), Some(6.9)),
        (2, "Striker", Some("Forward"), "Rovers", "2023/24", Some(35), Some(2900), Some(21), Some(4), Some(7.6)),
        (3, "Sub", None, "Rovers", "2023/24", Some(6), None, Some(1), None, None),
        (4, "Old Striker", Some("Forward"), "Rovers", "2022/23", Some(30), Some(2500), Some(15), Some(2), Some(7.1)),
        (10, "Captain", Some("Midfielder"), "United", "2023/24", Some(36), Some(3100), Some(7), Some(9), Some(7.3)),
    ];
    for r in rows {
        conn.execute(
            "INSERT INTO player_season_stats VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![r.0, r.1, r.2, r.3, r.4, r.5, r.6, r.7, r.8, r.9],
        )
        .expect("insert");
    }
    conn
}

#[test]
fn sqlite_roster_is_scoped_to_team_and_season() {
    let conn = seeded_db();
    let roster = load_roster_sqlite(&conn, "Rovers", "2023/24").unwrap();
    assert_eq!(roster.records.len(), 3);
    assert_eq!(roster.team.as_deref(), Some("Rovers"));
    let ids: Vec<_> = roster.records.iter().map(|r| r.player_id.clone()).collect();
    assert_eq!(
        ids,
        vec![PlayerId::Numeric(1), PlayerId::Numeric(2), PlayerId::Numeric(3)]
    );
}

#[test]
fn sqlite_nulls_default_to_zero_and_are_counted() {
    let conn = seeded_db();
    let roster = load_roster_sqlite(&conn, "Rovers", "2023/24").unwrap();
    let sub = &roster.records[2];
    assert_eq!(sub.minutes, 0);
    assert_eq!(sub.assists, 0);
    assert_eq!(sub.position, "Unknown");
    assert_eq!(sub.average_rating, None);
    assert_eq!(roster.quality.missing_minutes, 1);
    assert_eq!(roster.quality.missing_assists, 1);
    assert_eq!(roster.quality.missing_rating, 1);
    assert!(!roster.quality.is_clean());
}

#[test]
fn season_listing_and_bulk_load() {
    let conn = seeded_db();
    assert_eq!(list_teams(&conn, "2023/24").unwrap(), vec!["Rovers", "United"]);
    let rosters = load_season_sqlite(&conn, "2023/24").unwrap();
    assert_eq!(rosters.len(), 2);
    assert_eq!(rosters[1].records.len(), 1);
    assert!(load_season_sqlite(&conn, "1999/00").unwrap().is_empty());
}

#[test]
fn missing_table_is_an_error() {
    let conn = Connection::open_in_memory().unwrap();
    assert!(load_roster_sqlite(&conn, "Rovers", "2023/24").is_err());
}

#[test]
fn json_file_round_trip_through_disk() {
    let dir = std::env::temp_dir().join(format!("squad_contrib_sources_{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    let path = dir.join("roster.json");
    fs::write(
        &path,
        r#"{
            "team": "Rovers",
            "season": "2023/24",
            "players": [
                {"player_id": 2, "player_name": "Striker", "position": "Forward", "appearances": 35,
                 "minutes": 2900, "goals": 21, "assists": 4, "average_rating": 7.6},
                {"player_id": 2, "player_name": "Striker again", "minutes": 10},
                {"name": "No Id", "minutes": "450", "goals": null}
            ]
        }"#,
    )
    .unwrap();

    let roster = load_roster_json(&path).unwrap();
    assert_eq!(roster.records.len(), 2);
    assert_eq!(roster.records[0].player_name, "Striker");
    assert_eq!(roster.records[1].player_id, PlayerId::Text("row-2".into()));
    assert_eq!(roster.records[1].minutes, 450);
    assert_eq!(roster.quality.duplicate_ids, 1);
    assert_eq!(roster.quality.missing_id, 1);
    assert_eq!(roster.quality.missing_goals, 2);

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn missing_file_reports_path() {
    let path = PathBuf::from("/definitely/not/here/roster.json");
    let err = load_roster_json(&path).unwrap_err();
    assert!(format!("{err:#}").contains("roster.json"));
}

#[test]
fn non_object_entries_are_skipped() {
    let roster = parse_roster_json(r#"[1, "two", {"player_id": 3, "minutes": 900}]"#).unwrap();
    assert_eq!(roster.records.len(), 1);
    assert_eq!(roster.quality.skipped_entries, 2);
}
