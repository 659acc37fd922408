//! 表データと分類結果の型定義
//!
//! - CellValue / Row / Table: 読み込んだシート（ヘッダー + 行）
//! - Classification: 1行ごとの分類結果
//! - ColumnRoster: 走査対象の列（優先列 / 補助列）
//! - RunStats: 1回の処理の統計

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// セルの値
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    /// 日付・日時（Excelのシリアル値）
    ///
    /// JSONでは数値として書き出すため、読み戻すと `Number` になる。
    DateTime(f64),
}

/// Excelシリアル値の起点（1900年うるう年バグ込みで 1899-12-30）
const EXCEL_EPOCH: (i32, u32, u32) = (1899, 12, 30);
const MILLIS_PER_DAY: f64 = 86_400_000.0;

impl CellValue {
    /// シリアル値を日時に変換
    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        let CellValue::DateTime(serial) = self else {
            return None;
        };
        if !serial.is_finite() || *serial < 0.0 {
            return None;
        }
        let (y, m, d) = EXCEL_EPOCH;
        let epoch = NaiveDate::from_ymd_opt(y, m, d)?.and_hms_opt(0, 0, 0)?;
        let millis = (serial * MILLIS_PER_DAY).round() as i64;
        epoch.checked_add_signed(TimeDelta::try_milliseconds(millis)?)
    }

    /// 時刻部分を持つ日時かどうか
    pub fn has_time(&self) -> bool {
        matches!(self, CellValue::DateTime(serial) if serial.fract() != 0.0)
    }
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// 分類用のテキスト表現（空セルはNone）
    pub fn as_text(&self) -> Option<String> {
        if self.is_empty() {
            return None;
        }
        Some(self.to_string())
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Text(s) => write!(f, "{}", s),
            CellValue::Number(n) => {
                // 整数値は小数点なしで表示（1.0 → "1"）
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    write!(f, "{:.0}", n)
                } else {
                    write!(f, "{}", n)
                }
            }
            CellValue::Bool(true) => write!(f, "True"),
            CellValue::Bool(false) => write!(f, "False"),
            CellValue::DateTime(serial) => match self.as_datetime() {
                Some(dt) if self.has_time() => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
                Some(dt) => write!(f, "{}", dt.format("%Y-%m-%d")),
                None => write!(f, "{}", serial),
            },
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

/// 1行分のセル（ヘッダー順）
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Row {
    pub cells: Vec<CellValue>,
}

impl Row {
    pub fn new(cells: Vec<CellValue>) -> Self {
        Self { cells }
    }

    pub fn cell(&self, index: usize) -> Option<&CellValue> {
        self.cells.get(index)
    }

    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(CellValue::is_empty)
    }
}

/// シート1枚分の表データ
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Row>) -> Self {
        Self { headers, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// 列名から列番号を取得
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// 指定行・指定列のセル
    pub fn cell(&self, row: usize, column: &str) -> Option<&CellValue> {
        let col = self.column_index(column)?;
        self.rows.get(row)?.cell(col)
    }

    /// テキスト列かどうか（空でないセルに文字列が1つでもあれば文字列列とみなす）
    pub fn is_text_column(&self, index: usize) -> bool {
        self.rows
            .iter()
            .filter_map(|r| r.cell(index))
            .any(|c| matches!(c, CellValue::Text(s) if !s.trim().is_empty()))
    }
}

/// 分類の由来
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchOrigin {
    /// キーワード一致
    Keyword,
    /// 外部オラクル（AI / 検索）の判定
    Oracle,
    /// ラウンドロビンによる強制割当
    Forced,
    #[default]
    Unmatched,
}

/// 1行の分類結果
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Classification {
    pub category: Option<String>,
    pub score: u32,
    pub source_column: Option<String>,
    pub origin: MatchOrigin,
}

impl Classification {
    pub fn unmatched() -> Self {
        Self::default()
    }

    pub fn keyword(category: String, score: u32, source_column: Option<String>) -> Self {
        Self {
            category: Some(category),
            score,
            source_column,
            origin: MatchOrigin::Keyword,
        }
    }

    pub fn is_matched(&self) -> bool {
        self.category.is_some()
    }

    pub fn tier(&self) -> ConfidenceTier {
        match self.origin {
            MatchOrigin::Oracle => ConfidenceTier::Oracle,
            MatchOrigin::Forced => ConfidenceTier::Forced,
            MatchOrigin::Unmatched => ConfidenceTier::None,
            MatchOrigin::Keyword => ConfidenceTier::from_score(self.score),
        }
    }
}

/// 信頼度の段階
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceTier {
    High,
    Medium,
    Low,
    Oracle,
    Forced,
    None,
}

impl ConfidenceTier {
    pub const HIGH_THRESHOLD: u32 = 40;
    pub const MEDIUM_THRESHOLD: u32 = 20;

    pub fn from_score(score: u32) -> Self {
        if score >= Self::HIGH_THRESHOLD {
            ConfidenceTier::High
        } else if score >= Self::MEDIUM_THRESHOLD {
            ConfidenceTier::Medium
        } else if score > 0 {
            ConfidenceTier::Low
        } else {
            ConfidenceTier::None
        }
    }
}

impl fmt::Display for ConfidenceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfidenceTier::High => write!(f, "High"),
            ConfidenceTier::Medium => write!(f, "Medium"),
            ConfidenceTier::Low => write!(f, "Low"),
            ConfidenceTier::Oracle => write!(f, "Oracle"),
            ConfidenceTier::Forced => write!(f, "Forced"),
            ConfidenceTier::None => write!(f, "None"),
        }
    }
}

/// 走査対象の列
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ColumnRoster {
    /// カテゴリ・種別を直接表す列（スコア2倍）
    pub priority: Vec<String>,
    /// 名称・説明・SKUなどの補助列
    pub secondary: Vec<String>,
}

impl ColumnRoster {
    /// 優先列 → 補助列の順に全列を返す
    pub fn all(&self) -> impl Iterator<Item = &String> {
        self.priority.iter().chain(self.secondary.iter())
    }
}

/// 強制割当の記録
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForcedAssignment {
    pub row_index: usize,
    pub item: String,
    pub assigned_to: String,
}

/// カテゴリ別件数
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: usize,
}

/// 処理統計
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RunStats {
    pub total_rows: usize,
    /// キーワードで一致した行数
    pub well_matched: usize,
    pub oracle_matched: usize,
    pub forced_matched: usize,
    /// 出力されるカテゴリ数（空カテゴリは除く）
    pub categories_found: usize,
    pub distribution: Vec<CategoryCount>,
    pub tiers: BTreeMap<ConfidenceTier, usize>,
    pub forced_assignments: Vec<ForcedAssignment>,
    pub priority_columns: Vec<String>,
    pub secondary_columns: Vec<String>,
    /// 0件になった理由（読み込み失敗など）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl RunStats {
    /// 0件の結果（理由付き）
    pub fn empty(reason: impl Into<String>) -> Self {
        Self {
            reason: Some(reason.into()),
            ..Default::default()
        }
    }
}
