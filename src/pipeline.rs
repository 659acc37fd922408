//! 分割処理パイプライン
//!
//! 読み込み → 採点 → オラクル → 強制割当 → 振り分け → 出力。
//! 入力の読み込みに失敗した場合は理由付きの0件結果を返す。

use crate::error::{Result, SorterError};
use crate::export::{export_partition, ExportReport};
use crate::oracle::ProgressOracle;
use crate::workbook::{read_table, sheet_info};
use dialoguer::Select;
use product_sorter_common::export::excel_core::ExcelStyle;
use product_sorter_common::{
    partition, process_table, Classifier, Oracle, Partition, ProcessOutcome, RunStats, Table,
};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

/// 分割オプション
#[derive(Debug, Clone)]
pub struct SplitOptions {
    /// 判定するカテゴリ（この順で同点を解決し、強制割当を巡回する）
    pub enabled: Vec<String>,
    /// 走査列の明示指定（空なら自動判定）
    pub selected_columns: Vec<String>,
    pub output_dir: PathBuf,
    pub dry_run: bool,
    pub style: ExcelStyle,
}

/// 1ブックの処理結果
#[derive(Debug, Clone)]
pub struct SplitOutcome {
    pub input: PathBuf,
    pub sheet: Option<String>,
    pub stats: RunStats,
    pub export: ExportReport,
}

impl SplitOutcome {
    fn failed(input: &Path, sheet: Option<String>, reason: String) -> Self {
        Self {
            input: input.to_path_buf(),
            sheet,
            stats: RunStats::empty(reason),
            export: ExportReport::default(),
        }
    }
}

/// 表を分類して振り分け（オラクル問い合わせ中は進捗を表示）
pub fn classify_and_partition(
    classifier: &Classifier,
    table: &Table,
    options: &SplitOptions,
    oracle: Option<&mut dyn Oracle>,
) -> (ProcessOutcome, Partition) {
    let selected = (!options.selected_columns.is_empty()).then_some(options.selected_columns.as_slice());

    let outcome = match oracle {
        Some(oracle) => {
            let mut progress = ProgressOracle::new(oracle);
            let outcome = process_table(classifier, table, &options.enabled, selected, Some(&mut progress));
            tracing::debug!(queries = progress.queries(), "オラクル問い合わせ完了");
            progress.finish();
            outcome
        }
        None => process_table(classifier, table, &options.enabled, selected, None),
    };

    let parts = partition(table, &outcome.labels, &options.enabled);
    (outcome, parts)
}

/// 1ブックを分割
pub fn split_workbook(
    input: &Path,
    sheet: Option<&str>,
    classifier: &Classifier,
    options: &SplitOptions,
    oracle: Option<&mut dyn Oracle>,
) -> SplitOutcome {
    let table = match read_table(input, sheet) {
        Ok(table) => table,
        Err(e) => {
            tracing::warn!(input = %input.display(), "読み込み失敗: {}", e);
            return SplitOutcome::failed(input, sheet.map(str::to_string), e.to_string());
        }
    };

    let (outcome, parts) = classify_and_partition(classifier, &table, options, oracle);

    let export = if options.dry_run || parts.is_empty() {
        ExportReport::default()
    } else {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "output".to_string());
        match export_partition(&parts, &options.output_dir, &stem, &options.style) {
            Ok(report) => report,
            Err(e) => {
                tracing::warn!(output = %options.output_dir.display(), "出力先の準備に失敗: {}", e);
                let mut stats = outcome.stats;
                stats.reason = Some(e.to_string());
                return SplitOutcome {
                    input: input.to_path_buf(),
                    sheet: sheet.map(str::to_string),
                    stats,
                    export: ExportReport::default(),
                };
            }
        }
    };

    SplitOutcome {
        input: input.to_path_buf(),
        sheet: sheet.map(str::to_string),
        stats: outcome.stats,
        export,
    }
}

/// 読み込むシートを決定
///
/// 指定があればそれを使う。複数シートがあり端末から実行されていれば対話選択、
/// それ以外（ブックが読めない場合を含む）は先頭シート（`None`）。
pub fn choose_sheet(input: &Path, requested: Option<String>) -> Result<Option<String>> {
    if requested.is_some() {
        return Ok(requested);
    }

    // 読めないブックは先頭シート扱いにして、読み込み失敗は分割結果の理由として返す
    let sheets = match sheet_info(input) {
        Ok(sheets) => sheets,
        Err(e) => {
            tracing::debug!(input = %input.display(), "シート一覧を取得できません: {}", e);
            return Ok(None);
        }
    };
    if sheets.len() <= 1 || !std::io::stdin().is_terminal() {
        return Ok(None);
    }

    let items: Vec<String> = sheets.iter().map(|s| s.to_string()).collect();
    let index = Select::new()
        .with_prompt("シートを選択してください")
        .items(&items)
        .default(0)
        .interact()
        .map_err(|e| SorterError::Config(e.to_string()))?;

    Ok(Some(sheets[index].name.clone()))
}
