//! 分割処理の統合テスト
//!
//! rust_xlsxwriterで入力ブックを作り、読み込みからカテゴリ別出力までを通しで検証

use product_sorter::pipeline::{split_workbook, SplitOptions};
use product_sorter::scanner::scan_folder;
use product_sorter::workbook::{read_table, sheet_info};
use product_sorter_common::export::excel_core::ExcelStyle;
use product_sorter_common::{CategoryTable, CellValue, Classifier, Oracle};
use rust_xlsxwriter::Workbook;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

/// 商品シートとサマリーシートを持つブックを作成
fn write_products_workbook(path: &Path, items: &[&str]) {
    let mut workbook = Workbook::new();

    let sheet = workbook.add_worksheet();
    sheet.set_name("Main Data").unwrap();
    sheet.write_string(0, 0, "Product Name").unwrap();
    sheet.write_string(0, 1, "Price").unwrap();
    sheet.write_string(0, 2, "Stock").unwrap();
    for (i, item) in items.iter().enumerate() {
        let row = (i + 1) as u32;
        sheet.write_string(row, 0, *item).unwrap();
        sheet.write_number(row, 1, 10.0 + i as f64).unwrap();
        sheet.write_number(row, 2, (i * 5) as f64).unwrap();
    }

    let summary = workbook.add_worksheet();
    summary.set_name("Summary").unwrap();
    summary.write_string(0, 0, "Category").unwrap();
    summary.write_string(1, 0, "Lighting").unwrap();

    workbook.save(path).unwrap();
}

fn options(output_dir: PathBuf, enabled: &[&str]) -> SplitOptions {
    SplitOptions {
        enabled: enabled.iter().map(|s| s.to_string()).collect(),
        selected_columns: Vec::new(),
        output_dir,
        dry_run: false,
        style: ExcelStyle::default(),
    }
}

fn classifier() -> Classifier {
    Classifier::new(CategoryTable::builtin()).expect("辞書の初期化失敗")
}

#[test]
fn test_sheet_info_lists_all_sheets() {
    let dir = tempdir().expect("Failed to create temp dir");
    let input = dir.path().join("products.xlsx");
    write_products_workbook(&input, &["LED Ceiling Light", "Tower Fan"]);

    let sheets = sheet_info(&input).expect("シート情報取得失敗");
    let names: Vec<_> = sheets.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Main Data", "Summary"]);
    assert_eq!((sheets[0].rows, sheets[0].cols), (3, 3));
}

#[test]
fn test_split_workbook_end_to_end() {
    let dir = tempdir().expect("Failed to create temp dir");
    let input = dir.path().join("products.xlsx");
    write_products_workbook(
        &input,
        &["LED Ceiling Light", "Tower Fan", "Office Chair", "Pendant Light"],
    );

    let out = dir.path().join("out");
    let outcome = split_workbook(
        &input,
        None,
        &classifier(),
        &options(out.clone(), &["Lighting", "Fans"]),
        None,
    );

    assert!(outcome.stats.reason.is_none());
    assert_eq!(outcome.stats.total_rows, 4);
    assert_eq!(outcome.stats.well_matched, 3);
    assert_eq!(outcome.stats.forced_matched, 1);
    assert_eq!(outcome.stats.forced_assignments[0].item, "Office Chair");
    // 行2 → 2 % 2 = Lighting
    assert_eq!(outcome.stats.forced_assignments[0].assigned_to, "Lighting");
    assert!(outcome.stats.priority_columns.is_empty());
    assert_eq!(outcome.stats.secondary_columns, vec!["Product Name"]);

    assert_eq!(outcome.export.artifacts.len(), 2);
    let lighting = read_table(&out.join("products_Lighting.xlsx"), None).expect("Lighting読み込み失敗");
    let fans = read_table(&out.join("products_Fans.xlsx"), None).expect("Fans読み込み失敗");

    // 全行がちょうど1つのカテゴリに入る
    assert_eq!(lighting.len() + fans.len(), 4);
    assert_eq!(fans.len(), 1);
    assert_eq!(fans.cell(0, "Product Name"), Some(&CellValue::from("Tower Fan")));
    assert_eq!(lighting.headers, vec!["Product Name", "Price", "Stock"]);
    assert_eq!(
        lighting.cell(1, "Product Name"),
        Some(&CellValue::from("Office Chair"))
    );
}

#[test]
fn test_split_named_sheet() {
    let dir = tempdir().expect("Failed to create temp dir");
    let input = dir.path().join("products.xlsx");
    write_products_workbook(&input, &["Tower Fan"]);

    let out = dir.path().join("out");
    let outcome = split_workbook(
        &input,
        Some("Summary"),
        &classifier(),
        &options(out.clone(), &["Lighting"]),
        None,
    );

    assert_eq!(outcome.sheet.as_deref(), Some("Summary"));
    assert_eq!(outcome.stats.total_rows, 1);
    assert!(out.join("products_Lighting.xlsx").exists());
}

#[test]
fn test_missing_sheet_is_zero_row_outcome() {
    let dir = tempdir().expect("Failed to create temp dir");
    let input = dir.path().join("products.xlsx");
    write_products_workbook(&input, &["Tower Fan"]);

    let outcome = split_workbook(
        &input,
        Some("Nope"),
        &classifier(),
        &options(dir.path().join("out"), &["Fans"]),
        None,
    );

    assert_eq!(outcome.stats.total_rows, 0);
    assert!(outcome.stats.reason.is_some());
    assert!(outcome.export.artifacts.is_empty());
}

#[test]
fn test_dry_run_writes_nothing() {
    let dir = tempdir().expect("Failed to create temp dir");
    let input = dir.path().join("products.xlsx");
    write_products_workbook(&input, &["Tower Fan", "Floor Lamp"]);

    let out = dir.path().join("out");
    let mut opts = options(out.clone(), &["Lighting", "Fans"]);
    opts.dry_run = true;

    let outcome = split_workbook(&input, None, &classifier(), &opts, None);
    assert_eq!(outcome.stats.total_rows, 2);
    assert_eq!(outcome.stats.categories_found, 2);
    assert!(outcome.export.artifacts.is_empty());
    assert!(!out.exists());
}

/// 判定できない行に常に同じカテゴリを返すテスト用オラクル
struct AlwaysFans;

impl Oracle for AlwaysFans {
    fn lookup(&mut self, _text: &str, _candidates: &[String]) -> Option<String> {
        Some("Fans".to_string())
    }
}

#[test]
fn test_oracle_answers_replace_forced_assignment() {
    let dir = tempdir().expect("Failed to create temp dir");
    let input = dir.path().join("products.xlsx");
    write_products_workbook(&input, &["Floor Lamp", "Air Mover 3000"]);

    let mut oracle = AlwaysFans;
    let outcome = split_workbook(
        &input,
        None,
        &classifier(),
        &options(dir.path().join("out"), &["Lighting", "Fans"]),
        Some(&mut oracle as &mut dyn Oracle),
    );

    assert_eq!(outcome.stats.oracle_matched, 1);
    assert_eq!(outcome.stats.forced_matched, 0);
    assert_eq!(outcome.export.artifacts.len(), 2);
}

#[test]
fn test_scan_then_split_folder() {
    let dir = tempdir().expect("Failed to create temp dir");
    write_products_workbook(&dir.path().join("a.xlsx"), &["Tower Fan"]);
    write_products_workbook(&dir.path().join("b.xlsx"), &["Floor Lamp"]);

    let workbooks = scan_folder(dir.path(), false).expect("スキャン失敗");
    assert_eq!(workbooks.len(), 2);

    let classifier = classifier();
    for info in &workbooks {
        let outcome = split_workbook(
            &info.path,
            None,
            &classifier,
            &options(dir.path().to_path_buf(), &["Lighting", "Fans"]),
            None,
        );
        assert_eq!(outcome.stats.total_rows, 1);
    }

    assert!(dir.path().join("a_Fans.xlsx").exists());
    assert!(dir.path().join("b_Lighting.xlsx").exists());
}
