use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Opaque player identifier. Data sources hand out either integer ids or
/// string slugs; both are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PlayerId {
    Numeric(i64),
    Text(String),
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayerId::Numeric(id) => write!(f, "{id}"),
            PlayerId::Text(id) => f.write_str(id),
        }
    }
}

impl From<i64> for PlayerId {
    fn from(value: i64) -> Self {
        PlayerId::Numeric(value)
    }
}

impl From<u32> for PlayerId {
    fn from(value: u32) -> Self {
        PlayerId::Numeric(i64::from(value))
    }
}

impl From<&str> for PlayerId {
    fn from(value: &str) -> Self {
        PlayerId::Text(value.to_string())
    }
}

impl From<String> for PlayerId {
    fn from(value: String) -> Self {
        PlayerId::Text(value)
    }
}

pub const UNKNOWN_POSITION: &str = "Unknown";

/// One player's aggregates for one team-season.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSeasonRecord {
    pub player_id: PlayerId,
    pub player_name: String,
    pub position: String,
    pub appearances: u32,
    pub minutes: u32,
    pub goals: u32,
    pub assists: u32,
    /// `None` and `Some(0.0)` both mean "no rating available".
    #[serde(default)]
    pub average_rating: Option<f64>,
}

impl PlayerSeasonRecord {
    pub fn builder(player_id: impl Into<PlayerId>) -> PlayerSeasonRecordBuilder {
        PlayerSeasonRecordBuilder::new(player_id.into())
    }

    /// Rating used by the team score; missing ratings count as zero.
    pub fn rating_or_zero(&self) -> f64 {
        self.average_rating
            .filter(|r| r.is_finite())
            .unwrap_or(0.0)
    }

    pub fn has_rating(&self) -> bool {
        self.rating_or_zero() != 0.0
    }

    pub fn goal_contributions(&self) -> u32 {
        self.goals.saturating_add(self.assists)
    }
}

/// Builds a [`PlayerSeasonRecord`], filling anything unset with zero,
/// an empty name, or [`UNKNOWN_POSITION`].
#[derive(Debug, Clone)]
pub struct PlayerSeasonRecordBuilder {
    player_id: PlayerId,
    player_name: Option<String>,
    position: Option<String>,
    appearances: Option<u32>,
    minutes: Option<u32>,
    goals: Option<u32>,
    assists: Option<u32>,
    average_rating: Option<f64>,
}

impl PlayerSeasonRecordBuilder {
    fn new(player_id: PlayerId) -> Self {
        Self {
            player_id,
            player_name: None,
            position: None,
            appearances: None,
            minutes: None,
            goals: None,
            assists: None,
            average_rating: None,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.player_name = Some(name.into());
        self
    }

    pub fn position(mut self, position: impl Into<String>) -> Self {
        self.position = Some(position.into());
        self
    }

    pub fn appearances(mut self, appearances: u32) -> Self {
        self.appearances = Some(appearances);
        self
    }

    pub fn minutes(mut self, minutes: u32) -> Self {
        self.minutes = Some(minutes);
        self
    }

    pub fn goals(mut self, goals: u32) -> Self {
        self.goals = Some(goals);
        self
    }

    pub fn assists(mut self, assists: u32) -> Self {
        self.assists = Some(assists);
        self
    }

    pub fn rating(mut self, rating: f64) -> Self {
        self.average_rating = Some(rating);
        self
    }

    /// Which numeric fields `build` will default.
    pub fn defaults(&self) -> FieldDefaults {
        FieldDefaults {
            appearances: self.appearances.is_none(),
            minutes: self.minutes.is_none(),
            goals: self.goals.is_none(),
            assists: self.assists.is_none(),
            rating: self
                .average_rating
                .is_none_or(|r| !r.is_finite() || r == 0.0),
        }
    }

    pub fn build(self) -> PlayerSeasonRecord {
        let position = self
            .position
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| UNKNOWN_POSITION.to_string());
        PlayerSeasonRecord {
            player_name: self
                .player_name
                .unwrap_or_else(|| self.player_id.to_string()),
            player_id: self.player_id,
            position,
            appearances: self.appearances.unwrap_or(0),
            minutes: self.minutes.unwrap_or(0),
            goals: self.goals.unwrap_or(0),
            assists: self.assists.unwrap_or(0),
            average_rating: self.average_rating.filter(|r| r.is_finite()),
        }
    }
}

/// Numeric fields that were absent on input and defaulted to zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldDefaults {
    pub appearances: bool,
    pub minutes: bool,
    pub goals: bool,
    pub assists: bool,
    pub rating: bool,
}

impl FieldDefaults {
    pub fn any_counted(&self) -> bool {
        self.appearances || self.minutes || self.goals || self.assists
    }
}

/// Loosely-shaped player row as it comes out of scraped JSON or API dumps.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPlayerRecord {
    #[serde(default, alias = "id")]
    pub player_id: Option<Value>,
    #[serde(default, alias = "name")]
    pub player_name: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default, alias = "games", alias = "matches")]
    pub appearances: Option<Value>,
    #[serde(default, alias = "minutes_played")]
    pub minutes: Option<Value>,
    #[serde(default)]
    pub goals: Option<Value>,
    #[serde(default)]
    pub assists: Option<Value>,
    #[serde(default, alias = "rating")]
    pub average_rating: Option<Value>,
}

/// Outcome of converting one raw row.
#[derive(Debug, Clone)]
pub struct ConvertedRecord {
    pub record: PlayerSeasonRecord,
    pub defaults: FieldDefaults,
    pub missing_id: bool,
    pub clamped: usize,
}

impl RawPlayerRecord {
    /// `row` is the zero-based position in the source, used to mint an id
    /// for rows that carry none.
    pub fn into_record(self, row: usize) -> ConvertedRecord {
        let mut clamped = 0usize;
        let parsed_id = self.player_id.as_ref().and_then(id_from_value);
        let missing_id = parsed_id.is_none();
        let player_id = parsed_id.unwrap_or_else(|| PlayerId::Text(format!("row-{row}")));

        let mut builder = PlayerSeasonRecord::builder(player_id);
        if let Some(name) = self.player_name.filter(|n| !n.trim().is_empty()) {
            builder = builder.name(name.trim());
        }
        if let Some(position) = self.position {
            builder = builder.position(position);
        }
        if let Some(v) = count_from_value(self.appearances.as_ref(), &mut clamped) {
            builder = builder.appearances(v);
        }
        if let Some(v) = count_from_value(self.minutes.as_ref(), &mut clamped) {
            builder = builder.minutes(v);
        }
        if let Some(v) = count_from_value(self.goals.as_ref(), &mut clamped) {
            builder = builder.goals(v);
        }
        if let Some(v) = count_from_value(self.assists.as_ref(), &mut clamped) {
            builder = builder.assists(v);
        }
        let mut rating_rejected = false;
        let rating = self
            .average_rating
            .as_ref()
            .filter(|v| v.as_str().is_none_or(|s| !s.trim().is_empty()));
        match rating.map(rating_from_value) {
            Some(Some(r)) if r.is_finite() && r >= 0.0 => builder = builder.rating(r),
            Some(Some(_)) | Some(None) => rating_rejected = true,
            None => {}
        }
        clamped += usize::from(rating_rejected);

        let mut defaults = builder.defaults();
        // A rejected rating is reported once, as clamped.
        defaults.rating &= !rating_rejected;
        ConvertedRecord {
            record: builder.build(),
            defaults,
            missing_id,
            clamped,
        }
    }
}

fn id_from_value(value: &Value) -> Option<PlayerId> {
    match value {
        Value::Number(n) => n.as_i64().map(PlayerId::Numeric),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                None
            } else {
                Some(PlayerId::Text(s.to_string()))
            }
        }
        _ => None,
    }
}

/// Lenient count parsing: `"1,034"` and `"450 mins"` both read as numbers.
fn number_from_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            if let Ok(v) = s.trim().parse::<f64>() {
                return Some(v);
            }
            let cleaned: String = s
                .trim()
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
                .collect();
            if cleaned.is_empty() || cleaned == "-" {
                None
            } else {
                cleaned.parse::<f64>().ok()
            }
        }
        _ => None,
    }
}

/// Ratings are parsed strictly, except that a lone comma between digits is
/// read as a decimal separator (`"7,5"` is 7.5).
fn rating_from_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(v) = s.parse::<f64>() {
                return Some(v);
            }
            let digits = |part: &str| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit());
            match s.split_once(',') {
                Some((whole, frac)) if digits(whole) && digits(frac) => {
                    format!("{whole}.{frac}").parse::<f64>().ok()
                }
                _ => None,
            }
        }
        _ => None,
    }
}

fn count_from_value(value: Option<&Value>, clamped: &mut usize) -> Option<u32> {
    let raw = number_from_value(value?)?;
    if !raw.is_finite() || raw < 0.0 {
        *clamped += 1;
        return Some(0);
    }
    if raw > f64::from(u32::MAX) {
        *clamped += 1;
        return Some(u32::MAX);
    }
    Some(raw.floor() as u32)
}

/// Counts of lenient defaulting applied while loading one roster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataQualityReport {
    pub records_total: usize,
    pub skipped_entries: usize,
    pub missing_id: usize,
    pub missing_appearances: usize,
    pub missing_minutes: usize,
    pub missing_goals: usize,
    pub missing_assists: usize,
    pub missing_rating: usize,
    pub duplicate_ids: usize,
    pub clamped_values: usize,
}

impl DataQualityReport {
    pub fn record(&mut self, converted: &ConvertedRecord) {
        self.records_total += 1;
        let d = converted.defaults;
        self.missing_appearances += usize::from(d.appearances);
        self.missing_minutes += usize::from(d.minutes);
        self.missing_goals += usize::from(d.goals);
        self.missing_assists += usize::from(d.assists);
        self.missing_rating += usize::from(d.rating);
        self.missing_id += usize::from(converted.missing_id);
        self.clamped_values += converted.clamped;
    }

    /// Missing ratings are normal for bench players and do not make a
    /// roster unclean.
    pub fn is_clean(&self) -> bool {
        self.skipped_entries == 0
            && self.missing_id == 0
            && self.missing_appearances == 0
            && self.missing_minutes == 0
            && self.missing_goals == 0
            && self.missing_assists == 0
            && self.duplicate_ids == 0
            && self.clamped_values == 0
    }

    pub fn warnings(&self) -> Vec<String> {
        let mut out = Vec::new();
        let mut push = |count: usize, what: &str| {
            if count > 0 {
                out.push(format!("{count} of {} records {what}", self.records_total));
            }
        };
        push(self.missing_id, "had no player id");
        push(self.missing_minutes, "had no minutes (defaulted to 0)");
        push(self.missing_goals, "had no goals (defaulted to 0)");
        push(self.missing_assists, "had no assists (defaulted to 0)");
        push(
            self.missing_appearances,
            "had no appearances (defaulted to 0)",
        );
        push(self.missing_rating, "had no rating");
        push(self.duplicate_ids, "repeated an earlier player id (dropped)");
        if self.clamped_values > 0 {
            out.push(format!(
                "{} unreadable or out-of-range values rejected or clamped",
                self.clamped_values
            ));
        }
        if self.skipped_entries > 0 {
            out.push(format!(
                "{} entries were not player objects (skipped)",
                self.skipped_entries
            ));
        }
        out
    }
}

/// Converts raw rows into records, dropping repeated ids so each id is
/// unique within the returned set.
pub fn convert_raw_records(
    raw: impl IntoIterator<Item = RawPlayerRecord>,
) -> (Vec<PlayerSeasonRecord>, DataQualityReport) {
    let mut quality = DataQualityReport::default();
    let mut seen: HashSet<PlayerId> = HashSet::new();
    let mut records = Vec::new();
    for (row, item) in raw.into_iter().enumerate() {
        let converted = item.into_record(row);
        quality.record(&converted);
        if !seen.insert(converted.record.player_id.clone()) {
            quality.duplicate_ids += 1;
            continue;
        }
        records.push(converted.record);
    }
    (records, quality)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(v: Value) -> RawPlayerRecord {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn builder_fills_defaults() {
        let rec = PlayerSeasonRecord::builder(7u32).minutes(450).build();
        assert_eq!(rec.player_id, PlayerId::Numeric(7));
        assert_eq!(rec.player_name, "7");
        assert_eq!(rec.position, UNKNOWN_POSITION);
        assert_eq!(rec.goals, 0);
        assert_eq!(rec.average_rating, None);
        assert_eq!(rec.rating_or_zero(), 0.0);
    }

    #[test]
    fn raw_record_accepts_aliases_and_strings() {
        let conv = raw(json!({
            "id": "p-9",
            "name": " Jane Doe ",
            "games": 12,
            "minutes_played": "1,034",
            "goals": 3.0,
            "rating": "7.21"
        }))
        .into_record(0);
        assert_eq!(conv.record.player_id, PlayerId::Text("p-9".into()));
        assert_eq!(conv.record.player_name, "Jane Doe");
        assert_eq!(conv.record.appearances, 12);
        assert_eq!(conv.record.minutes, 1034);
        assert_eq!(conv.record.goals, 3);
        assert_eq!(conv.record.average_rating, Some(7.21));
        assert!(conv.defaults.assists);
        assert!(!conv.defaults.minutes);
        assert!(!conv.missing_id);
    }

    #[test]
    fn negative_values_clamp_to_zero() {
        let conv = raw(json!({"player_id": 1, "minutes": -30, "goals": 2})).into_record(0);
        assert_eq!(conv.record.minutes, 0);
        assert_eq!(conv.clamped, 1);
    }

    #[test]
    fn comma_decimal_rating_and_exponent_counts() {
        let conv = raw(json!({
            "player_id": 5,
            "minutes": "1e3",
            "rating": "7,5"
        }))
        .into_record(0);
        assert_eq!(conv.record.average_rating, Some(7.5));
        assert_eq!(conv.record.minutes, 1000);
        assert_eq!(conv.clamped, 0);
        assert!(!conv.defaults.rating);
    }

    #[test]
    fn bad_rating_is_reported_once() {
        let rows = vec![
            raw(json!({"player_id": 1, "minutes": 900, "rating": -3.0})),
            raw(json!({"player_id": 2, "minutes": 900, "rating": "7,5,1"})),
            raw(json!({"player_id": 3, "minutes": 900, "rating": null})),
        ];
        let (records, quality) = convert_raw_records(rows);
        assert!(records.iter().all(|r| r.average_rating.is_none()));
        assert_eq!(quality.clamped_values, 2);
        assert_eq!(quality.missing_rating, 1);
    }

    #[test]
    fn missing_id_gets_row_slug() {
        let conv = raw(json!({"minutes": 90})).into_record(4);
        assert_eq!(conv.record.player_id, PlayerId::Text("row-4".into()));
        assert!(conv.missing_id);
    }

    #[test]
    fn duplicates_keep_first() {
        let rows = vec![
            raw(json!({"player_id": 1, "minutes": 900, "goals": 1, "assists": 0, "appearances": 10})),
            raw(json!({"player_id": 1, "minutes": 10})),
            raw(json!({"player_id": 2, "minutes": 300, "goals": 0, "assists": 0, "appearances": 4})),
        ];
        let (records, quality) = convert_raw_records(rows);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].minutes, 900);
        assert_eq!(quality.duplicate_ids, 1);
        assert_eq!(quality.records_total, 3);
        assert!(!quality.is_clean());
        assert!(
            quality
                .warnings()
                .iter()
                .any(|w| w.contains("repeated an earlier player id"))
        );
    }
}
