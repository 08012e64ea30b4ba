use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use rust_xlsxwriter::{Workbook, Worksheet};
use serde::{Deserialize, Serialize};

use crate::batch::TeamAnalysis;
use crate::contribution::AnalysisResult;

pub const REPORT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContributionReport {
    pub version: u32,
    pub generated_at: String,
    #[serde(default)]
    pub team: Option<String>,
    #[serde(default)]
    pub season: Option<String>,
    #[serde(default)]
    pub data_quality_warnings: Vec<String>,
    pub result: AnalysisResult,
}

impl ContributionReport {
    pub fn new(team: Option<String>, season: Option<String>, result: AnalysisResult) -> Self {
        Self {
            version: REPORT_VERSION,
            generated_at: Utc::now().to_rfc3339(),
            team,
            season,
            data_quality_warnings: Vec::new(),
            result,
        }
    }

    pub fn from_team_analysis(analysis: &TeamAnalysis) -> Self {
        let mut report = Self::new(
            analysis.team.clone(),
            analysis.season.clone(),
            analysis.result.clone(),
        );
        report.data_quality_warnings = analysis.quality.warnings();
        report
    }
}

pub fn write_json_report<T: Serialize>(path: &Path, report: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("create report directory {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(report).context("serialize contribution report")?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).with_context(|| format!("write {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("swap report into {}", path.display()))?;
    Ok(())
}

pub fn read_json_report(path: &Path) -> Result<ContributionReport> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("read report {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parse report {}", path.display()))
}

/// Two sheets: one summary row per team and one row per ranked player.
pub fn write_xlsx_report(path: &Path, reports: &[ContributionReport]) -> Result<()> {
    let mut summary_rows = vec![header(&[
        "Team",
        "Season",
        "Method",
        "Min Minutes",
        "Eligible",
        "Excluded",
        "Team Score",
        "Normalized",
    ])];
    let mut player_rows = vec![header(&[
        "Team",
        "Rank",
        "Player ID",
        "Player",
        "Position",
        "Minutes",
        "Goals",
        "Assists",
        "Rating",
        "Marginal",
        "Contribution %",
    ])];

    for report in reports {
        let team = report.team.clone().unwrap_or_default();
        let r = &report.result;
        summary_rows.push(vec![
            Cell::Text(team.clone()),
            Cell::Text(report.season.clone().unwrap_or_default()),
            Cell::Text(r.method.to_string()),
            Cell::Number(f64::from(r.min_minutes)),
            Cell::Number(r.eligible_players as f64),
            Cell::Number(r.excluded_players as f64),
            Cell::Number(r.team_performance_score),
            Cell::Text(if r.normalized { "yes" } else { "no" }.to_string()),
        ]);
        for p in &r.ranked {
            player_rows.push(vec![
                Cell::Text(team.clone()),
                Cell::Number(p.contribution_rank as f64),
                Cell::Text(p.player_id.to_string()),
                Cell::Text(p.player_name.clone()),
                Cell::Text(p.position.clone()),
                Cell::Number(f64::from(p.minutes)),
                Cell::Number(f64::from(p.goals)),
                Cell::Number(f64::from(p.assists)),
                p.average_rating.map(Cell::Number).unwrap_or(Cell::Empty),
                Cell::Number(p.marginal_score),
                Cell::Number(p.shapley_contribution),
            ]);
        }
    }

    let mut workbook = Workbook::new();
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Summary")?;
        write_rows(sheet, &summary_rows)?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Contributions")?;
        write_rows(sheet, &player_rows)?;
    }
    workbook
        .save(path)
        .with_context(|| format!("failed writing workbook to {}", path.display()))?;
    Ok(())
}

enum Cell {
    Text(String),
    Number(f64),
    Empty,
}

fn header(columns: &[&str]) -> Vec<Cell> {
    columns.iter().map(|c| Cell::Text((*c).to_string())).collect()
}

fn write_rows(worksheet: &mut Worksheet, rows: &[Vec<Cell>]) -> Result<()> {
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, cell) in row.iter().enumerate() {
            let (r, c) = (row_idx as u32, col_idx as u16);
            let written = match cell {
                Cell::Text(value) => worksheet.write_string(r, c, value),
                Cell::Number(value) => worksheet.write_number(r, c, *value),
                Cell::Empty => continue,
            };
            written.with_context(|| format!("write cell ({row_idx},{col_idx})"))?;
        }
    }
    Ok(())
}

/// Fixed-width text table of the ranked list, optionally cut to `top`.
pub fn render_table(result: &AnalysisResult, top: Option<usize>) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "method: {}  eligible: {}  excluded (<{} min): {}  team score: {:.3}",
        result.method,
        result.eligible_players,
        result.min_minutes,
        result.excluded_players,
        result.team_performance_score
    );
    if !result.normalized && !result.is_empty() {
        let _ = writeln!(
            out,
            "note: total contribution was not positive; values are raw marginals, not percentages"
        );
    }
    if result.is_empty() {
        let _ = writeln!(out, "no players met the minutes threshold");
        return out;
    }

    let _ = writeln!(
        out,
        "{:>4}  {:<24} {:<12} {:>6} {:>3} {:>3} {:>6} {:>9}",
        "Rank", "Player", "Position", "Min", "G", "A", "Rating", "Contrib"
    );
    let rows = match top {
        Some(n) => result.top(n),
        None => &result.ranked[..],
    };
    for p in rows {
        let rating = p
            .average_rating
            .filter(|r| *r != 0.0)
            .map(|r| format!("{r:.2}"))
            .unwrap_or_else(|| "-".to_string());
        let _ = writeln!(
            out,
            "{:>4}  {:<24} {:<12} {:>6} {:>3} {:>3} {:>6} {:>8.2}{}",
            p.contribution_rank,
            truncate(&p.player_name, 24),
            truncate(&p.position, 12),
            p.minutes,
            p.goals,
            p.assists,
            rating,
            p.shapley_contribution,
            if result.normalized { "%" } else { " " }
        );
    }
    out
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
        out.push('~');
        out
    }
}
