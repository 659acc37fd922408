//! Excel生成（共通ライブラリ）
//!
//! カテゴリ別の表を1シートのxlsxとして出力する。
//! ヘッダー行は太字・白文字・塗りつぶし、列幅は内容に合わせて上限付きで調整。

use crate::types::{CellValue, Table};
use rust_xlsxwriter::*;

/// 出力シート名
pub const SHEET_NAME: &str = "Data";
/// 列幅の最小値（文字数）
pub const MIN_COLUMN_WIDTH: usize = 10;
/// 列幅の余白
pub const COLUMN_PADDING: usize = 3;
/// 列幅の既定上限
pub const DEFAULT_MAX_COLUMN_WIDTH: usize = 50;
/// xlsxの1セルあたりの最大文字数
const MAX_CELL_CHARS: usize = 32_767;

/// 出力オプション
#[derive(Debug, Clone, Copy)]
pub struct ExcelStyle {
    pub header_fill: u32,
    pub header_font_color: u32,
    pub border_color: u32,
    pub max_column_width: usize,
}

impl Default for ExcelStyle {
    fn default() -> Self {
        Self {
            header_fill: 0x667EEA,
            header_font_color: 0xFFFFFF,
            border_color: 0xE2E8F0,
            max_column_width: DEFAULT_MAX_COLUMN_WIDTH,
        }
    }
}

/// 列幅を計算（最長セル + 余白、上限あり）
pub fn column_widths(table: &Table, max_width: usize) -> Vec<usize> {
    (0..table.headers.len())
        .map(|col| {
            let longest = table
                .rows
                .iter()
                .filter_map(|r| r.cell(col))
                .map(|c| c.to_string().chars().count())
                .chain(std::iter::once(table.headers[col].chars().count()))
                .max()
                .unwrap_or(0);
            (longest.max(MIN_COLUMN_WIDTH) + COLUMN_PADDING).min(max_width)
        })
        .collect()
}

/// 日付セルの表示形式
pub const DATE_FORMAT: &str = "yyyy-mm-dd";
/// 日時セルの表示形式
pub const DATETIME_FORMAT: &str = "yyyy-mm-dd hh:mm:ss";

/// データセルの書式（装飾なしでも日付は日付書式で書く）
struct CellFormats {
    value: Option<Format>,
    date: Format,
    datetime: Format,
}

impl CellFormats {
    fn new(value: Option<Format>) -> Self {
        let base = value.clone().unwrap_or_default();
        Self {
            date: base.clone().set_num_format(DATE_FORMAT),
            datetime: base.set_num_format(DATETIME_FORMAT),
            value,
        }
    }
}

/// セルを書き込み（書けない値は切り詰めた文字列として書く）
fn write_cell(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: &CellValue,
    formats: &CellFormats,
) -> Result<(), XlsxError> {
    let written = match (value, formats.value.as_ref()) {
        (CellValue::Empty, Some(f)) => worksheet.write_blank(row, col, f).map(|_| ()),
        (CellValue::Empty, None) => Ok(()),
        (CellValue::Text(s), Some(f)) => worksheet.write_string_with_format(row, col, s, f).map(|_| ()),
        (CellValue::Text(s), None) => worksheet.write_string(row, col, s).map(|_| ()),
        (CellValue::Number(n), Some(f)) => worksheet.write_number_with_format(row, col, *n, f).map(|_| ()),
        (CellValue::Number(n), None) => worksheet.write_number(row, col, *n).map(|_| ()),
        (CellValue::Bool(b), Some(f)) => worksheet.write_boolean_with_format(row, col, *b, f).map(|_| ()),
        (CellValue::Bool(b), None) => worksheet.write_boolean(row, col, *b).map(|_| ()),
        (CellValue::DateTime(serial), _) => {
            let format = if value.has_time() { &formats.datetime } else { &formats.date };
            worksheet.write_number_with_format(row, col, *serial, format).map(|_| ())
        }
    };

    match written {
        Ok(()) => Ok(()),
        Err(_) => {
            // 長すぎる文字列・NaNなど
            let text: String = value.to_string().chars().take(MAX_CELL_CHARS).collect();
            worksheet.write_string(row, col, &text).map(|_| ())
        }
    }
}

/// 装飾付きでシートを書き込み
fn write_styled(workbook: &mut Workbook, table: &Table, style: &ExcelStyle) -> Result<(), XlsxError> {
    let header_format = Format::new()
        .set_bold()
        .set_font_size(11.0)
        .set_font_color(Color::RGB(style.header_font_color))
        .set_background_color(Color::RGB(style.header_fill))
        .set_pattern(FormatPattern::Solid)
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter)
        .set_border(FormatBorder::Thin)
        .set_border_color(Color::RGB(style.border_color));

    let value_format = Format::new()
        .set_align(FormatAlign::VerticalCenter)
        .set_border(FormatBorder::Thin)
        .set_border_color(Color::RGB(style.border_color));

    let formats = CellFormats::new(Some(value_format));

    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;

    for (col, header) in table.headers.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, header, &header_format)?;
    }

    for (r, row) in table.rows.iter().enumerate() {
        for col in 0..table.headers.len() {
            let value = row.cell(col).cloned().unwrap_or_default();
            write_cell(worksheet, (r + 1) as u32, col as u16, &value, &formats)?;
        }
    }

    for (col, width) in column_widths(table, style.max_column_width).into_iter().enumerate() {
        worksheet.set_column_width(col as u16, width as f64)?;
    }

    Ok(())
}

/// 装飾なしでシートを書き込み
fn write_plain(workbook: &mut Workbook, table: &Table) -> Result<(), XlsxError> {
    let formats = CellFormats::new(None);
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;

    for (col, header) in table.headers.iter().enumerate() {
        worksheet.write_string(0, col as u16, header)?;
    }
    for (r, row) in table.rows.iter().enumerate() {
        for col in 0..table.headers.len() {
            let value = row.cell(col).cloned().unwrap_or_default();
            write_cell(worksheet, (r + 1) as u32, col as u16, &value, &formats)?;
        }
    }
    Ok(())
}

/// 表をxlsxバッファに生成
///
/// 装飾付きの生成に失敗した場合は装飾なしで作り直す。
///
/// # Arguments
/// * `table` - 出力する表（ヘッダー + 行）
/// * `style` - ヘッダー色・列幅上限
pub fn generate_table_buffer(table: &Table, style: &ExcelStyle) -> Result<Vec<u8>, String> {
    let mut workbook = Workbook::new();
    let styled = write_styled(&mut workbook, table, style).and_then(|_| workbook.save_to_buffer());

    match styled {
        Ok(buffer) => Ok(buffer),
        Err(e) => {
            tracing::warn!("装飾付きExcel生成に失敗、装飾なしで再生成: {}", e);
            let mut workbook = Workbook::new();
            write_plain(&mut workbook, table)
                .and_then(|_| workbook.save_to_buffer())
                .map_err(|e| format!("Excel保存エラー: {}", e))
        }
    }
}
