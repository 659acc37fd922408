//! ブック読み込みモジュール
//!
//! calamineでxlsx/xlsm/xls/xlsb/odsを読み込み、
//! 先頭行をヘッダーとした表データに変換する。

use crate::error::{Result, SorterError};
use calamine::{open_workbook_auto, open_workbook_auto_from_rs, Data, Range, Reader};
use product_sorter_common::{CellValue, Row, Table};
use serde::Serialize;
use std::io::Cursor;
use std::path::Path;

/// 読み込み対象の拡張子
pub const WORKBOOK_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xls", "xlsb", "ods"];

/// シート情報
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SheetInfo {
    pub name: String,
    pub rows: usize,
    pub cols: usize,
}

impl std::fmt::Display for SheetInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({} rows, {} columns)", self.name, self.rows, self.cols)
    }
}

/// 拡張子がブック形式かどうか
pub fn is_workbook_extension(ext: &str) -> bool {
    WORKBOOK_EXTENSIONS.contains(&ext.to_lowercase().as_str())
}

/// calamineのセルを変換
fn convert_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) if dt.is_duration() => CellValue::Number(dt.as_f64()),
        Data::DateTime(dt) => CellValue::DateTime(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(e) => CellValue::Text(e.to_string()),
    }
}

/// ヘッダー名を決定（空は `Unnamed: N`、重複は `.1` `.2` を付与）
fn build_headers(raw: &[Data]) -> Vec<String> {
    let mut headers: Vec<String> = Vec::with_capacity(raw.len());
    for (index, cell) in raw.iter().enumerate() {
        let base = match convert_cell(cell) {
            CellValue::Empty => format!("Unnamed: {}", index),
            value => {
                let text = value.to_string().trim().to_string();
                if text.is_empty() {
                    format!("Unnamed: {}", index)
                } else {
                    text
                }
            }
        };

        let mut name = base.clone();
        let mut suffix = 1;
        while headers.contains(&name) {
            name = format!("{}.{}", base, suffix);
            suffix += 1;
        }
        headers.push(name);
    }
    headers
}

/// シート範囲を表に変換（全セル空の行は除外）
pub fn range_to_table(range: &Range<Data>) -> Table {
    let mut rows_iter = range.rows();
    let Some(header_row) = rows_iter.next() else {
        return Table::default();
    };

    let headers = build_headers(header_row);
    let rows = rows_iter
        .map(|r| {
            let mut cells: Vec<CellValue> = r.iter().map(convert_cell).collect();
            cells.resize(headers.len(), CellValue::Empty);
            Row::new(cells)
        })
        .filter(|r| !r.is_blank())
        .collect();

    Table::new(headers, rows)
}

/// 全シートの情報を取得
pub fn sheet_info(path: &Path) -> Result<Vec<SheetInfo>> {
    if !path.exists() {
        return Err(SorterError::FileNotFound(path.display().to_string()));
    }
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| SorterError::Workbook(format!("{}: {}", path.display(), e)))?;

    let mut sheets = Vec::new();
    for name in workbook.sheet_names() {
        match workbook.worksheet_range(&name) {
            Ok(range) => {
                let (rows, cols) = range.get_size();
                sheets.push(SheetInfo { name, rows, cols });
            }
            Err(e) => tracing::debug!(sheet = %name, "シート読み込みをスキップ: {}", e),
        }
    }
    Ok(sheets)
}

/// 指定シート（省略時は先頭シート）を読み込み
pub fn read_table(path: &Path, sheet: Option<&str>) -> Result<Table> {
    if !path.exists() {
        return Err(SorterError::FileNotFound(path.display().to_string()));
    }
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| SorterError::Workbook(format!("{}: {}", path.display(), e)))?;

    let name = resolve_sheet_name(&workbook.sheet_names(), sheet)?;
    let range = workbook
        .worksheet_range(&name)
        .map_err(|e| SorterError::Workbook(format!("{}: {}", name, e)))?;
    Ok(range_to_table(&range))
}

/// メモリ上のブックを読み込み
pub fn read_table_from_bytes(data: Vec<u8>, sheet: Option<&str>) -> Result<Table> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(data))
        .map_err(|e| SorterError::Workbook(e.to_string()))?;

    let name = resolve_sheet_name(&workbook.sheet_names(), sheet)?;
    let range = workbook
        .worksheet_range(&name)
        .map_err(|e| SorterError::Workbook(format!("{}: {}", name, e)))?;
    Ok(range_to_table(&range))
}

fn resolve_sheet_name(names: &[String], sheet: Option<&str>) -> Result<String> {
    match sheet {
        Some(requested) => names
            .iter()
            .find(|n| n.as_str() == requested)
            .cloned()
            .ok_or_else(|| SorterError::SheetNotFound(requested.to_string())),
        None => names
            .first()
            .cloned()
            .ok_or_else(|| SorterError::Workbook("シートがありません".into())),
    }
}
