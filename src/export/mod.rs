//! カテゴリ別Excel出力
//!
//! 振り分け結果の各カテゴリを `{stem}_{category}.xlsx` として書き出す。
//! 1カテゴリの書き込み失敗は記録して残りを続行する。

use crate::error::{Result, SorterError};
use product_sorter_common::export::excel_core::{generate_table_buffer, ExcelStyle};
use product_sorter_common::{Partition, Table};
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// 出力ファイル
#[derive(Debug, Clone, Serialize)]
pub struct Artifact {
    pub category: String,
    pub path: PathBuf,
    pub rows: usize,
}

/// 出力に失敗したカテゴリ
#[derive(Debug, Clone, Serialize)]
pub struct ExportFailure {
    pub category: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ExportReport {
    pub artifacts: Vec<Artifact>,
    pub failures: Vec<ExportFailure>,
}

/// ファイル名に使えない文字を `_` に置換
pub fn sanitize_file_component(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let trimmed = sanitized.trim().trim_end_matches('.');
    if trimmed.is_empty() {
        "_".to_string()
    } else {
        trimmed.to_string()
    }
}

/// 出力ファイル名 `{stem}_{category}.xlsx`（同じ実行内で重複しない）
///
/// サニタイズ後に衝突したカテゴリは `{stem}_{category}_2.xlsx` のように連番を付ける。
/// 大文字小文字だけの違いも衝突とみなす。
fn unique_file_name(stem: &str, category: &str, used: &mut HashSet<String>) -> String {
    let base = format!("{}_{}", stem, sanitize_file_component(category));
    let mut name = format!("{}.xlsx", base);
    let mut suffix = 2;
    while !used.insert(name.to_lowercase()) {
        name = format!("{}_{}.xlsx", base, suffix);
        suffix += 1;
    }
    name
}

/// 1つの表をxlsxとして書き出し
pub fn write_table(table: &Table, path: &Path, style: &ExcelStyle) -> Result<()> {
    let buffer = generate_table_buffer(table, style).map_err(SorterError::ExcelGeneration)?;
    std::fs::write(path, buffer)?;
    Ok(())
}

/// 振り分け結果を全カテゴリ分書き出し
pub fn export_partition(
    partition: &Partition,
    output_dir: &Path,
    stem: &str,
    style: &ExcelStyle,
) -> Result<ExportReport> {
    std::fs::create_dir_all(output_dir)?;

    let mut report = ExportReport::default();
    let mut used = HashSet::new();
    for output in partition.iter() {
        let file_name = unique_file_name(stem, &output.category, &mut used);
        let path = output_dir.join(file_name);
        match write_table(&output.table, &path, style) {
            Ok(()) => {
                tracing::debug!(category = %output.category, path = %path.display(), "出力完了");
                report.artifacts.push(Artifact {
                    category: output.category.clone(),
                    path,
                    rows: output.table.len(),
                });
            }
            Err(e) => {
                tracing::warn!(category = %output.category, "出力失敗: {}", e);
                report.failures.push(ExportFailure {
                    category: output.category.clone(),
                    message: e.to_string(),
                });
            }
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_file_name() {
        let mut used = HashSet::new();
        assert_eq!(unique_file_name("products", "Lighting", &mut used), "products_Lighting.xlsx");
        assert_eq!(unique_file_name("p", "  ", &mut used), "p__.xlsx");
    }

    #[test]
    fn test_unique_file_name_suffixes_collisions() {
        let mut used = HashSet::new();
        assert_eq!(unique_file_name("p", "Tools/Hardware", &mut used), "p_Tools_Hardware.xlsx");
        assert_eq!(unique_file_name("p", "Tools_Hardware", &mut used), "p_Tools_Hardware_2.xlsx");
        assert_eq!(unique_file_name("p", "tools:hardware", &mut used), "p_tools_hardware_3.xlsx");
        assert_eq!(unique_file_name("p", "Fans", &mut used), "p_Fans.xlsx");
    }

    #[test]
    fn test_sanitize_trailing_dot() {
        assert_eq!(sanitize_file_component("Misc."), "Misc");
        assert_eq!(sanitize_file_component("a:b"), "a_b");
    }
}
