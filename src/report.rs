//! 処理結果の表示・保存

use crate::error::Result;
use crate::export::{Artifact, ExportFailure};
use crate::pipeline::SplitOutcome;
use product_sorter_common::{CategoryCount, ConfidenceTier, RunStats};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

/// 強制割当の表示上限
const FORCED_DISPLAY_LIMIT: usize = 10;

/// JSONレポート
#[derive(Debug, Serialize)]
pub struct RunReport<'a> {
    pub generated_at: String,
    pub input: &'a Path,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sheet: Option<&'a str>,
    pub stats: &'a RunStats,
    pub artifacts: &'a [Artifact],
    pub failures: &'a [ExportFailure],
}

impl<'a> RunReport<'a> {
    pub fn new(outcome: &'a SplitOutcome) -> Self {
        Self {
            generated_at: chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%:z").to_string(),
            input: &outcome.input,
            sheet: outcome.sheet.as_deref(),
            stats: &outcome.stats,
            artifacts: &outcome.export.artifacts,
            failures: &outcome.export.failures,
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// 件数の多い順（同数はカテゴリ指定順を維持）
pub fn sorted_distribution(stats: &RunStats) -> Vec<&CategoryCount> {
    let mut sorted: Vec<&CategoryCount> = stats.distribution.iter().collect();
    sorted.sort_by(|a, b| b.count.cmp(&a.count));
    sorted
}

fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 * 100.0 / total as f64
    }
}

/// コンソール用サマリー
pub fn format_summary(stats: &RunStats, artifacts: &[Artifact]) -> String {
    let mut lines = Vec::new();

    if let Some(reason) = &stats.reason {
        lines.push(format!("⚠ {}", reason));
    }

    lines.push(format!("  総行数: {}", stats.total_rows));
    lines.push(format!("  キーワード一致: {}", stats.well_matched));
    if stats.oracle_matched > 0 {
        lines.push(format!("  AI判定: {}", stats.oracle_matched));
    }
    lines.push(format!("  自動割当: {}", stats.forced_matched));
    lines.push(format!("  出力ファイル: {}", artifacts.len()));

    if !stats.priority_columns.is_empty() || !stats.secondary_columns.is_empty() {
        lines.push(format!(
            "  判定列: {}",
            stats
                .priority_columns
                .iter()
                .chain(stats.secondary_columns.iter())
                .cloned()
                .collect::<Vec<_>>()
                .join(", ")
        ));
    }

    let distribution = sorted_distribution(stats);
    if !distribution.is_empty() {
        lines.push("  カテゴリ分布:".to_string());
        for entry in distribution {
            lines.push(format!(
                "    {}: {}件 ({:.1}%)",
                entry.category,
                entry.count,
                percentage(entry.count, stats.total_rows)
            ));
        }
    }

    let tiers: BTreeMap<&ConfidenceTier, &usize> =
        stats.tiers.iter().filter(|(_, count)| **count > 0).collect();
    if !tiers.is_empty() {
        let text = tiers
            .iter()
            .map(|(tier, count)| format!("{} {}", tier, count))
            .collect::<Vec<_>>()
            .join(" / ");
        lines.push(format!("  信頼度: {}", text));
    }

    if !stats.forced_assignments.is_empty() {
        lines.push("  自動割当の内訳:".to_string());
        for forced in stats.forced_assignments.iter().take(FORCED_DISPLAY_LIMIT) {
            lines.push(format!(
                "    行{}: {} → {}",
                forced.row_index + 1,
                forced.item,
                forced.assigned_to
            ));
        }
        let rest = stats.forced_assignments.len().saturating_sub(FORCED_DISPLAY_LIMIT);
        if rest > 0 {
            lines.push(format!("    ...他{}件", rest));
        }
    }

    lines.join("\n")
}

/// 出力ファイル一覧
pub fn format_artifacts(artifacts: &[Artifact]) -> Vec<String> {
    artifacts
        .iter()
        .map(|a| format!("✔ {} ({}件): {}", a.category, a.rows, a.path.display()))
        .collect()
}
