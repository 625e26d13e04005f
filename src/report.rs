// src/report.rs
use crate::models::{MetricResult, SweepReport};
use anyhow::{Context, Result};
use serde::Serialize;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

pub const NO_RECOMMENDATION: &str = "No valid results with computable metrics to suggest a best strength.";

const CONSIDERATIONS: [&str; 6] = [
    "1. Low BRISQUE score: Better perceptual image quality (fewer artifacts).",
    "2. SSIM score: Similarity to the control image (without LoRA).",
    "   - Subtle LoRA: Aim for higher SSIM with good BRISQUE.",
    "   - Significant LoRA changes: SSIM will be lower; focus on desired effect and BRISQUE.",
    "3. Balance: Good quality (low BRISQUE) and desired LoRA effect (informed by SSIM and visual inspection).",
    "4. Excessive Strength: Watch for BRISQUE increasing or SSIM dropping too drastically/unnaturally.",
];

// 分隔线：强度列加一，再加固定的66个
const RULE_TAIL: usize = 66;

/// 强度列宽度：至少8，且能容纳 "0." 加上小数位
fn strength_width(decimal_places: u32) -> usize {
    8.max(decimal_places as usize + 4)
}

/// 生成汇总表
pub fn render_summary(report: &SweepReport) -> String {
    let width = strength_width(report.decimal_places);
    let mut out = String::new();

    let _ = writeln!(out, "--- Strength Analysis Summary ---");
    let _ = writeln!(
        out,
        "{:<width$} | BRISQUE (Lower is better) | SSIM (to Control, 1.0=identical)",
        "Strength",
        width = width
    );
    let _ = writeln!(out, "{}", "-".repeat(width + 1 + RULE_TAIL));

    for result in &report.results {
        let _ = writeln!(out, "{}", render_row(result, width));
    }
    out
}

fn render_row(result: &MetricResult, width: usize) -> String {
    match &result.error {
        None => format!(
            "{:<width$} | {:<25.2} | {:.4}",
            result.strength,
            result.brisque,
            result.ssim,
            width = width
        ),
        Some(reason) => format!(
            "{:<width$} | {:<25} | N/A ({})",
            result.strength,
            "N/A",
            reason,
            width = width
        ),
    }
}

/// 生成推荐段落；没有有效结果时只输出一行提示
pub fn render_recommendation(report: &SweepReport) -> String {
    let mut out = String::new();

    match report.best_result() {
        Some(best) => {
            let _ = writeln!(
                out,
                "--- Suggested Best Strength (based on lowest BRISQUE, preferring lower strength on tie) ---"
            );
            let _ = writeln!(out, "Strength: {}", best.strength);
            let _ = writeln!(out, "  BRISQUE: {:.2}", best.brisque);
            let _ = writeln!(out, "  SSIM to Control: {:.4}", best.ssim);
            let _ = writeln!(out);
            let _ = writeln!(out, "Considerations for choosing the best strength:");
            for line in CONSIDERATIONS {
                let _ = writeln!(out, "{}", line);
            }
        }
        None => {
            let _ = writeln!(out, "{}", NO_RECOMMENDATION);
        }
    }
    out
}

#[derive(Debug, Serialize)]
struct JsonEntry {
    strength: String,
    index: usize,
    brisque: Option<f64>,
    ssim: Option<f64>,
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct JsonReport {
    decimal_places: u32,
    tolerance: f64,
    recommended_strength: Option<String>,
    results: Vec<JsonEntry>,
}

impl From<&SweepReport> for JsonReport {
    fn from(report: &SweepReport) -> Self {
        let results = report
            .results
            .iter()
            .map(|r| {
                // 哨兵值不是合法JSON数字，失败条目输出null
                let valid = r.is_valid();
                JsonEntry {
                    strength: r.strength.to_string(),
                    index: r.index,
                    brisque: valid.then_some(r.brisque),
                    ssim: valid.then_some(r.ssim),
                    error: r.error.as_ref().map(ToString::to_string),
                }
            })
            .collect();

        Self {
            decimal_places: report.decimal_places,
            tolerance: report.tolerance,
            recommended_strength: report.best_result().map(|b| b.strength.to_string()),
            results,
        }
    }
}

pub fn to_json(report: &SweepReport) -> Result<String> {
    serde_json::to_string_pretty(&JsonReport::from(report)).context("Failed to serialize report")
}

pub fn write_json(report: &SweepReport, path: &Path) -> Result<()> {
    let json = to_json(report)?;
    fs::write(path, json).with_context(|| format!("Failed to write report to {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ControlId, EntryError, StrengthValue};
    use serde_json::Value;
    use tempfile::tempdir;

    fn s(value: f64) -> StrengthValue {
        StrengthValue::from_f64(value, 1)
    }

    fn sample_report() -> SweepReport {
        SweepReport::new(
            vec![
                MetricResult::scored(s(0.1), 1, 25.25, 0.91234),
                MetricResult::failed(s(0.2), 2, EntryError::LoraMissing),
                MetricResult::failed(s(0.3), 3, EntryError::ControlMissing(ControlId::Indexed(3))),
            ],
            1,
            0.01,
        )
    }

    #[test]
    fn test_summary_table_layout() {
        let summary = render_summary(&sample_report());
        let lines: Vec<&str> = summary.lines().collect();

        assert_eq!(lines[0], "--- Strength Analysis Summary ---");
        assert_eq!(
            lines[1],
            "Strength | BRISQUE (Lower is better) | SSIM (to Control, 1.0=identical)"
        );
        assert_eq!(lines[2], "-".repeat(75));
        assert_eq!(lines[3], format!("0.1      | {:<25} | 0.9123", "25.25"));
        assert_eq!(lines[4], format!("0.2      | {:<25} | N/A (LoRA image missing)", "N/A"));
        assert!(lines[5].ends_with("N/A (Control image set 03 missing)"));
    }

    #[test]
    fn test_strength_column_grows_with_precision() {
        assert_eq!(strength_width(1), 8);
        assert_eq!(strength_width(4), 8);
        assert_eq!(strength_width(6), 10);

        let report = SweepReport::new(
            vec![MetricResult::scored(StrengthValue::from_f64(0.25, 6), 1, 1.0, 1.0)],
            6,
            0.01,
        );
        let summary = render_summary(&report);
        assert!(summary.lines().nth(3).unwrap().starts_with("0.250000   | "));
    }

    #[test]
    fn test_recommendation_block() {
        let text = render_recommendation(&sample_report());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "--- Suggested Best Strength (based on lowest BRISQUE, preferring lower strength on tie) ---"
        );
        assert_eq!(lines[1], "Strength: 0.1");
        assert_eq!(lines[2], "  BRISQUE: 25.25");
        assert_eq!(lines[3], "  SSIM to Control: 0.9123");
        assert_eq!(lines[5], "Considerations for choosing the best strength:");
        assert_eq!(
            lines.iter().filter(|l| l.starts_with(|c: char| c.is_ascii_digit())).count(),
            4
        );
        assert!(lines[10].starts_with("4. Excessive Strength: Watch for BRISQUE increasing"));
    }

    #[test]
    fn test_no_recommendation_when_all_failed() {
        let report = SweepReport::new(
            vec![MetricResult::failed(s(0.1), 1, EntryError::LoraMissing)],
            1,
            0.01,
        );
        let text = render_recommendation(&report);
        assert!(text.contains(NO_RECOMMENDATION));
        assert!(!text.contains("Suggested"));
    }

    #[test]
    fn test_json_export() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("report.json");
        write_json(&sample_report(), &path).unwrap();

        let value: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["recommended_strength"], "0.1");
        assert_eq!(value["results"][0]["strength"], "0.1");
        assert_eq!(value["results"][0]["index"], 1);
        assert!(value["results"][0]["error"].is_null());
        assert!(value["results"][1]["brisque"].is_null());
        assert!(value["results"][1]["ssim"].is_null());
        assert_eq!(value["results"][1]["error"], "LoRA image missing");
    }
}
