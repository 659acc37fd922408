//! 行処理モジュール
//!
//! 表全体に分類器を適用し、全行に必ずカテゴリを付ける。
//!
//! ## 処理フロー
//! 1. 走査対象の列を1回だけ決定
//! 2. 各行をキーワード採点（行ごとに独立）
//! 3. 一致しなかった行のみ外部オラクルに問い合わせ（任意）
//! 4. 残りを行番号によるラウンドロビンで強制割当

use crate::classifier::{find_candidate_columns, roster_for_selection, Classifier};
use crate::oracle::Oracle;
use crate::types::{
    CategoryCount, Classification, ColumnRoster, ForcedAssignment, MatchOrigin, RunStats, Table,
};
use rayon::prelude::*;
use std::collections::BTreeMap;

/// オラクルに渡す行テキストの最大文字数
const ORACLE_TEXT_LIMIT: usize = 500;
/// 強制割当の記録に残す品名の最大文字数
const FORCED_ITEM_LIMIT: usize = 50;

/// 処理結果
#[derive(Debug, Clone, Default)]
pub struct ProcessOutcome {
    pub labels: Vec<Classification>,
    pub roster: ColumnRoster,
    pub stats: RunStats,
}

/// 全行をキーワード採点
///
/// `selected_columns` が指定されればその列だけを走査し、なければ列名から自動判定する。
pub fn classify_table(
    classifier: &Classifier,
    table: &Table,
    enabled: &[String],
    selected_columns: Option<&[String]>,
) -> (Vec<Classification>, ColumnRoster) {
    let roster = match selected_columns {
        Some(selected) if !selected.is_empty() => roster_for_selection(table, selected),
        _ => find_candidate_columns(table),
    };

    let labels = table
        .rows
        .par_iter()
        .map(|row| classifier.score_row(&table.headers, row, &roster, enabled))
        .collect();

    (labels, roster)
}

/// 走査対象列の値を連結した行テキスト
pub fn row_text(table: &Table, row_index: usize, roster: &ColumnRoster) -> String {
    let text = roster
        .all()
        .filter_map(|column| table.cell(row_index, column).and_then(|c| c.as_text()))
        .collect::<Vec<_>>()
        .join(" | ");
    text.chars().take(ORACLE_TEXT_LIMIT).collect()
}

/// 未一致の行を外部オラクルに問い合わせる
///
/// # Returns
/// オラクルで分類できた行数
pub fn consult_oracle(
    table: &Table,
    roster: &ColumnRoster,
    labels: &mut [Classification],
    enabled: &[String],
    oracle: &mut dyn Oracle,
) -> usize {
    if enabled.is_empty() {
        return 0;
    }

    let mut matched = 0;
    for (index, label) in labels.iter_mut().enumerate() {
        if label.is_matched() {
            continue;
        }
        let text = row_text(table, index, roster);
        if text.is_empty() {
            continue;
        }

        let answer = oracle
            .lookup(&text, enabled)
            .and_then(|name| enabled.iter().find(|c| c.eq_ignore_ascii_case(&name)).cloned());

        match answer {
            Some(category) => {
                tracing::debug!(row = index, %category, "オラクル判定");
                label.category = Some(category);
                label.origin = MatchOrigin::Oracle;
                matched += 1;
            }
            None => tracing::debug!(row = index, "オラクル判定なし"),
        }
    }
    matched
}

/// 未一致の行をラウンドロビンで強制割当
///
/// 行番号 `i` には `enabled[i % enabled.len()]` を割り当てる（未一致行だけの連番ではない）。
/// `enabled` が空なら何もしない。
pub fn apply_fallback(mut labels: Vec<Classification>, enabled: &[String]) -> Vec<Classification> {
    if enabled.is_empty() {
        return labels;
    }

    for (index, label) in labels.iter_mut().enumerate() {
        if label.is_matched() {
            continue;
        }
        label.category = Some(enabled[index % enabled.len()].clone());
        label.score = 0;
        label.source_column = None;
        label.origin = MatchOrigin::Forced;
    }
    labels
}

/// 強制割当の記録用に品名を取得
fn item_name(table: &Table, row_index: usize, roster: &ColumnRoster) -> String {
    roster
        .all()
        .find_map(|column| table.cell(row_index, column).and_then(|c| c.as_text()))
        .map(|text| text.chars().take(FORCED_ITEM_LIMIT).collect())
        .unwrap_or_else(|| "Unknown".to_string())
}

/// 分類結果から統計を作成
pub fn build_stats(
    table: &Table,
    labels: &[Classification],
    roster: &ColumnRoster,
    enabled: &[String],
) -> RunStats {
    let distribution: Vec<CategoryCount> = enabled
        .iter()
        .map(|category| CategoryCount {
            category: category.clone(),
            count: labels
                .iter()
                .filter(|l| l.category.as_deref() == Some(category.as_str()))
                .count(),
        })
        .filter(|c| c.count > 0)
        .collect();

    let mut tiers = BTreeMap::new();
    for label in labels {
        *tiers.entry(label.tier()).or_insert(0) += 1;
    }

    let forced_assignments = labels
        .iter()
        .enumerate()
        .filter(|(_, l)| l.origin == MatchOrigin::Forced)
        .filter_map(|(index, l)| {
            Some(ForcedAssignment {
                row_index: index,
                item: item_name(table, index, roster),
                assigned_to: l.category.clone()?,
            })
        })
        .collect::<Vec<_>>();

    let count_origin = |origin: MatchOrigin| labels.iter().filter(|l| l.origin == origin).count();

    RunStats {
        total_rows: table.len(),
        well_matched: count_origin(MatchOrigin::Keyword),
        oracle_matched: count_origin(MatchOrigin::Oracle),
        forced_matched: forced_assignments.len(),
        categories_found: distribution.len(),
        distribution,
        tiers,
        forced_assignments,
        priority_columns: roster.priority.clone(),
        secondary_columns: roster.secondary.clone(),
        reason: None,
    }
}

/// 採点 → オラクル → 強制割当 → 統計 を一括実行
///
/// 空の表はエラーではなく0件の結果を返す。
pub fn process_table(
    classifier: &Classifier,
    table: &Table,
    enabled: &[String],
    selected_columns: Option<&[String]>,
    oracle: Option<&mut dyn Oracle>,
) -> ProcessOutcome {
    if table.is_empty() {
        return ProcessOutcome {
            stats: RunStats::empty("入力データが0行です"),
            ..Default::default()
        };
    }

    let (mut labels, roster) = classify_table(classifier, table, enabled, selected_columns);

    if let Some(oracle) = oracle {
        consult_oracle(table, &roster, &mut labels, enabled, oracle);
    }

    let labels = apply_fallback(labels, enabled);
    let mut stats = build_stats(table, &labels, &roster, enabled);
    if enabled.is_empty() {
        stats.reason = Some("カテゴリが選択されていません".to_string());
    }

    ProcessOutcome { labels, roster, stats }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::CategoryTable;
    use crate::oracle::NoopOracle;
    use crate::types::{CellValue, ConfidenceTier, Row};

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn product_table(items: &[&str]) -> Table {
        Table::new(
            names(&["Product Name"]),
            items.iter().map(|i| Row::new(vec![CellValue::from(*i)])).collect(),
        )
    }

    fn classifier() -> Classifier {
        Classifier::new(CategoryTable::builtin()).unwrap()
    }

    /// 指定カテゴリを常に返すテスト用オラクル
    struct FixedOracle {
        answer: Option<String>,
        calls: usize,
    }

    impl Oracle for FixedOracle {
        fn lookup(&mut self, _text: &str, _candidates: &[String]) -> Option<String> {
            self.calls += 1;
            self.answer.clone()
        }
    }

    #[test]
    fn test_example_scenario_with_fallback() {
        let table = product_table(&["LED Ceiling Light", "Oscillating Tower Fan", "Random Gadget"]);
        let enabled = names(&["Lighting", "Fans"]);
        let outcome = process_table(&classifier(), &table, &enabled, None, None);

        let labels: Vec<_> = outcome.labels.iter().map(|l| l.category.as_deref()).collect();
        assert_eq!(labels, vec![Some("Lighting"), Some("Fans"), Some("Lighting")]);
        assert_eq!(outcome.labels[2].origin, MatchOrigin::Forced);
        assert_eq!(outcome.stats.well_matched, 2);
        assert_eq!(outcome.stats.forced_matched, 1);
        assert_eq!(outcome.stats.forced_assignments[0].item, "Random Gadget");
    }

    #[test]
    fn test_fallback_is_positional() {
        let labels = vec![
            Classification::keyword("Fans".into(), 20, None),
            Classification::unmatched(),
            Classification::unmatched(),
            Classification::unmatched(),
        ];
        let enabled = names(&["Lighting", "Fans", "Decor"]);
        let result = apply_fallback(labels, &enabled);
        let cats: Vec<_> = result.iter().map(|l| l.category.clone().unwrap()).collect();
        // 行1 → 1 % 3 = Fans, 行2 → Decor, 行3 → Lighting
        assert_eq!(cats, names(&["Fans", "Fans", "Decor", "Lighting"]));
        assert_eq!(result[0].origin, MatchOrigin::Keyword);
        assert!(result[1..].iter().all(|l| l.origin == MatchOrigin::Forced && l.score == 0));
    }

    #[test]
    fn test_fallback_without_categories() {
        let labels = vec![Classification::unmatched()];
        let result = apply_fallback(labels, &[]);
        assert_eq!(result[0].category, None);
    }

    #[test]
    fn test_fallback_deterministic_across_runs() {
        let table = product_table(&["a", "b", "c", "d", "e"]);
        let enabled = names(&["Decor", "Kitchen"]);
        let first = process_table(&classifier(), &table, &enabled, None, None);
        let second = process_table(&classifier(), &table, &enabled, None, None);
        assert_eq!(first.labels, second.labels);
    }

    #[test]
    fn test_empty_table() {
        let table = Table::new(names(&["Product Name"]), vec![]);
        let outcome = process_table(&classifier(), &table, &names(&["Fans"]), None, None);
        assert!(outcome.labels.is_empty());
        assert_eq!(outcome.stats.total_rows, 0);
        assert!(outcome.stats.reason.is_some());
    }

    #[test]
    fn test_every_row_labelled_once() {
        let table = product_table(&[
            "Ceiling Fan", "Table Lamp", "Sofa Set", "Wall Mirror", "Mystery", "", "42",
        ]);
        let enabled = names(&["Fans", "Lighting", "Furniture"]);
        let outcome = process_table(&classifier(), &table, &enabled, None, None);
        assert_eq!(outcome.labels.len(), table.len());
        for label in &outcome.labels {
            let category = label.category.as_deref().unwrap();
            assert!(enabled.iter().any(|c| c == category));
        }
        let total: usize = outcome.stats.distribution.iter().map(|c| c.count).sum();
        assert_eq!(total, table.len());
    }

    #[test]
    fn test_keyword_invariant_before_fallback() {
        let table = product_table(&["Ceiling Fan", "Gadget", "ceiling fan light kit"]);
        let enabled = names(&["Fans", "Lighting"]);
        let (labels, _) = classify_table(&classifier(), &table, &enabled, None);
        for label in &labels {
            assert_eq!(label.score == 0, label.category.is_none());
        }
        assert_eq!(labels[2].category, None);
    }

    #[test]
    fn test_oracle_only_for_unmatched_rows() {
        let table = product_table(&["Ceiling Fan", "Bladeless air multiplier"]);
        let enabled = names(&["Lighting", "Fans"]);
        let mut oracle = FixedOracle { answer: Some("fans".into()), calls: 0 };
        let outcome = process_table(&classifier(), &table, &enabled, None, Some(&mut oracle as &mut dyn Oracle));

        assert_eq!(oracle.calls, 1);
        assert_eq!(outcome.labels[1].category.as_deref(), Some("Fans"));
        assert_eq!(outcome.labels[1].origin, MatchOrigin::Oracle);
        assert_eq!(outcome.stats.oracle_matched, 1);
        assert_eq!(outcome.stats.tiers.get(&ConfidenceTier::Oracle), Some(&1));
    }

    #[test]
    fn test_oracle_answer_outside_candidates_is_ignored() {
        let table = product_table(&["Gadget"]);
        let enabled = names(&["Lighting", "Fans"]);
        let mut oracle = FixedOracle { answer: Some("Toys".into()), calls: 0 };
        let outcome = process_table(&classifier(), &table, &enabled, None, Some(&mut oracle as &mut dyn Oracle));
        assert_eq!(outcome.labels[0].origin, MatchOrigin::Forced);
    }

    #[test]
    fn test_noop_oracle_matches_keyword_only() {
        let table = product_table(&["Gadget", "Desk"]);
        let enabled = names(&["Furniture", "Decor"]);
        let mut oracle = NoopOracle;
        let with = process_table(&classifier(), &table, &enabled, None, Some(&mut oracle as &mut dyn Oracle));
        let without = process_table(&classifier(), &table, &enabled, None, None);
        assert_eq!(with.labels, without.labels);
    }

    #[test]
    fn test_selected_columns_override() {
        let table = Table::new(
            names(&["Name", "Notes"]),
            vec![Row::new(vec!["Ceiling Fan".into(), "Chandelier".into()])],
        );
        let enabled = names(&["Fans", "Lighting"]);
        let selected = names(&["Notes"]);
        let (labels, roster) = classify_table(&classifier(), &table, &enabled, Some(&selected));
        assert_eq!(roster.secondary, selected);
        assert_eq!(labels[0].category.as_deref(), Some("Lighting"));
    }

    #[test]
    fn test_row_text() {
        let table = Table::new(
            names(&["Type", "Name", "Price"]),
            vec![Row::new(vec![CellValue::Empty, "Tower Fan".into(), 59.0.into()])],
        );
        let roster = ColumnRoster {
            priority: names(&["Type"]),
            secondary: names(&["Name", "Price"]),
        };
        assert_eq!(row_text(&table, 0, &roster), "Tower Fan | 59");
    }
}
