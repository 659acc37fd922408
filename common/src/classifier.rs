//! 行分類モジュール
//!
//! テキストをカテゴリ辞書と照合してスコアを計算する。
//!
//! ## スコアリング
//! 1. 除外語が単語一致したカテゴリは候補から外す（減点ではなく除外）
//! 2. キーワードごとに 単語一致 +20 / 部分一致 +10 を累積
//! 3. SKUパターン一致ごとに +15
//! 4. 合計 × カテゴリ倍率 が最大のカテゴリを採用（同点は指定順で先勝ち）
//!
//! 行単位では優先列（カテゴリ・種別など）の一致を2倍し、
//! 優先列で一致がなければ補助列（名称・説明など）を走査する。

use crate::category::CategoryTable;
use crate::error::{Error, Result};
use crate::types::{CellValue, Classification, ColumnRoster, Row, Table};
use regex::Regex;

/// 単語一致の点数
pub const WHOLE_WORD_SCORE: u32 = 20;
/// 部分一致の点数
pub const SUBSTRING_SCORE: u32 = 10;
/// SKUパターン一致の点数
pub const SKU_PATTERN_SCORE: u32 = 15;
/// 優先列での一致の倍率
pub const PRIORITY_BOOST: u32 = 2;

/// カテゴリ・種別を表す列名パターン
pub const PRIORITY_COLUMN_PATTERNS: &[&str] = &[
    "category", "categories", "cat", "product category",
    "type", "product type", "item type", "product_type", "item_type",
    "class", "classification", "group", "department",
];

/// 名称・説明・SKUなどを表す列名パターン
pub const SECONDARY_COLUMN_PATTERNS: &[&str] = &[
    "description", "desc", "product description", "item description",
    "name", "product name", "item name", "product_name", "item_name",
    "title", "product", "item", "sku", "model",
];

/// テキストを照合用に正規化
///
/// 小文字化し、区切り記号を空白に置換して連続空白を1つにまとめる。
pub fn normalize_text(text: &str) -> String {
    lazy_static::lazy_static! {
        static ref SEPARATOR_RE: Regex = Regex::new(r#"[,._\-/\\|;:()\[\]{}+&"'#*]"#).unwrap();
    }

    let lowered = text.to_lowercase();
    let replaced = SEPARATOR_RE.replace_all(&lowered, " ");
    replaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 正規化済みテキスト内で単語として一致するか（空白または先頭・末尾で区切られる）
fn contains_whole_word(text: &str, phrase: &str) -> bool {
    if phrase.is_empty() {
        return false;
    }
    format!(" {} ", text).contains(&format!(" {} ", phrase))
}

/// 照合用に前処理したカテゴリ
#[derive(Debug, Clone)]
struct CompiledCategory {
    name: String,
    keywords: Vec<String>,
    exclude: Vec<String>,
    sku_patterns: Vec<Regex>,
    weight: u32,
}

impl CompiledCategory {
    fn is_excluded(&self, text: &str) -> bool {
        self.exclude.iter().any(|word| contains_whole_word(text, word))
    }

    fn score(&self, normalized: &str, raw_lower: &str) -> u32 {
        let mut score: u32 = 0;
        for keyword in &self.keywords {
            if contains_whole_word(normalized, keyword) {
                score = score.saturating_add(WHOLE_WORD_SCORE);
            } else if !keyword.is_empty() && normalized.contains(keyword.as_str()) {
                score = score.saturating_add(SUBSTRING_SCORE);
            }
        }
        for pattern in &self.sku_patterns {
            if pattern.is_match(raw_lower) {
                score = score.saturating_add(SKU_PATTERN_SCORE);
            }
        }
        score.saturating_mul(self.weight)
    }
}

/// カテゴリ分類器
#[derive(Debug, Clone)]
pub struct Classifier {
    table: CategoryTable,
    compiled: Vec<CompiledCategory>,
}

impl Classifier {
    /// 辞書から分類器を構築（SKUパターンの正規表現をコンパイル）
    pub fn new(table: CategoryTable) -> Result<Self> {
        let mut compiled = Vec::with_capacity(table.categories().len());
        for cat in table.categories() {
            let sku_patterns = cat
                .sku_patterns
                .iter()
                .map(|p| {
                    Regex::new(&format!("(?i){}", p)).map_err(|source| Error::Pattern {
                        category: cat.name.clone(),
                        source,
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            compiled.push(CompiledCategory {
                name: cat.name.clone(),
                keywords: cat.keywords.iter().map(|k| normalize_text(k)).collect(),
                exclude: cat.exclude.iter().map(|k| normalize_text(k)).collect(),
                sku_patterns,
                weight: cat.weight,
            });
        }
        Ok(Self { table, compiled })
    }

    pub fn table(&self) -> &CategoryTable {
        &self.table
    }

    fn compiled(&self, name: &str) -> Option<&CompiledCategory> {
        self.compiled.iter().find(|c| c.name == name)
    }

    /// テキスト1件を採点
    ///
    /// # Returns
    /// `(最高スコアのカテゴリ, スコア)`。一致なし・空テキストは `(None, 0)`
    pub fn score_text(&self, text: &str, enabled: &[String]) -> (Option<String>, u32) {
        let normalized = normalize_text(text);
        if normalized.is_empty() {
            return (None, 0);
        }
        let raw_lower = text.trim().to_lowercase();

        let mut best: Option<&str> = None;
        let mut best_score = 0;

        for name in enabled {
            let Some(cat) = self.compiled(name) else {
                continue;
            };
            if cat.is_excluded(&normalized) {
                continue;
            }
            let score = cat.score(&normalized, &raw_lower);
            if score > best_score {
                best_score = score;
                best = Some(cat.name.as_str());
            }
        }

        (best.map(str::to_string), best_score)
    }

    /// セル1つを採点（空セルは不一致）
    pub fn score_cell(&self, cell: &CellValue, enabled: &[String]) -> (Option<String>, u32) {
        match cell.as_text() {
            Some(text) => self.score_text(&text, enabled),
            None => (None, 0),
        }
    }

    /// 1行を分類
    ///
    /// 優先列の一致はスコア2倍。優先列で一致がなければ補助列の最高スコアを採用。
    pub fn score_row(
        &self,
        headers: &[String],
        row: &Row,
        roster: &ColumnRoster,
        enabled: &[String],
    ) -> Classification {
        let mut best = Classification::unmatched();

        let cell_for = |column: &String| -> Option<&CellValue> {
            let index = headers.iter().position(|h| h == column)?;
            row.cell(index)
        };

        for column in &roster.priority {
            let Some(cell) = cell_for(column) else {
                continue;
            };
            if let (Some(category), score) = self.score_cell(cell, enabled) {
                let boosted = score.saturating_mul(PRIORITY_BOOST);
                if boosted > best.score {
                    best = Classification::keyword(category, boosted, Some(column.clone()));
                }
            }
        }

        if best.score == 0 {
            for column in &roster.secondary {
                let Some(cell) = cell_for(column) else {
                    continue;
                };
                if let (Some(category), score) = self.score_cell(cell, enabled) {
                    if score > best.score {
                        best = Classification::keyword(category, score, Some(column.clone()));
                    }
                }
            }
        }

        best
    }
}

/// 列名が指定パターンのいずれかを含むか
fn matches_any(column: &str, patterns: &[&str]) -> bool {
    let lowered = column.trim().to_lowercase();
    patterns.iter().any(|p| lowered.contains(p))
}

/// 走査対象の列を列名から判定
///
/// - 優先列: カテゴリ・種別系の列名
/// - 補助列: 名称・説明・SKU系の列名、または文字列を含むその他の列
pub fn find_candidate_columns(table: &Table) -> ColumnRoster {
    let mut roster = ColumnRoster::default();
    for (index, column) in table.headers.iter().enumerate() {
        if matches_any(column, PRIORITY_COLUMN_PATTERNS) {
            roster.priority.push(column.clone());
        } else if matches_any(column, SECONDARY_COLUMN_PATTERNS) || table.is_text_column(index) {
            roster.secondary.push(column.clone());
        }
    }
    roster
}

/// ユーザー指定の列だけで走査対象を構成
///
/// 列名パターンで優先列と補助列に振り分け、それ以外の指定列は型に関わらず補助列とする。
/// 表に存在しない列名は無視する。
pub fn roster_for_selection<S: AsRef<str>>(table: &Table, selected: &[S]) -> ColumnRoster {
    let mut roster = ColumnRoster::default();
    for column in &table.headers {
        if !selected.iter().any(|s| s.as_ref() == column) {
            continue;
        }
        if matches_any(column, PRIORITY_COLUMN_PATTERNS) {
            roster.priority.push(column.clone());
        } else {
            roster.secondary.push(column.clone());
        }
    }
    roster
}
