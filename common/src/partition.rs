//! カテゴリ別の振り分け
//!
//! 最終ラベルに従って行をカテゴリごとの表に分ける。
//! 分類用の補助情報は含めず、元の列だけを保持する。

use crate::types::{Classification, Row, Table};

/// 1カテゴリ分の表
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryTableOutput {
    pub category: String,
    pub table: Table,
}

/// カテゴリ → 行 の対応（有効カテゴリの指定順）
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Partition {
    entries: Vec<CategoryTableOutput>,
}

impl Partition {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, category: &str) -> Option<&Table> {
        self.entries
            .iter()
            .find(|e| e.category == category)
            .map(|e| &e.table)
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.category.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &CategoryTableOutput> {
        self.entries.iter()
    }

    /// 全カテゴリの行数合計
    pub fn total_rows(&self) -> usize {
        self.entries.iter().map(|e| e.table.len()).sum()
    }
}

/// 行をカテゴリごとに振り分け
///
/// 行の順序と列はそのまま保持する。0件のカテゴリは出力しない。
pub fn partition(table: &Table, labels: &[Classification], enabled: &[String]) -> Partition {
    let entries = enabled
        .iter()
        .filter_map(|category| {
            let rows: Vec<Row> = table
                .rows
                .iter()
                .zip(labels)
                .filter(|(_, label)| label.category.as_deref() == Some(category.as_str()))
                .map(|(row, _)| row.clone())
                .collect();

            if rows.is_empty() {
                return None;
            }
            Some(CategoryTableOutput {
                category: category.clone(),
                table: Table::new(table.headers.clone(), rows),
            })
        })
        .collect();

    Partition { entries }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CellValue;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn label(category: &str) -> Classification {
        Classification::keyword(category.to_string(), 20, None)
    }

    #[test]
    fn test_partition_preserves_order_and_columns() {
        let table = Table::new(
            names(&["Name", "Price"]),
            vec![
                Row::new(vec!["Tower Fan".into(), 59.0.into()]),
                Row::new(vec!["Floor Lamp".into(), 89.0.into()]),
                Row::new(vec!["Wall Fan".into(), 39.0.into()]),
            ],
        );
        let labels = vec![label("Fans"), label("Lighting"), label("Fans")];
        let result = partition(&table, &labels, &names(&["Lighting", "Fans", "Decor"]));

        assert_eq!(result.categories().collect::<Vec<_>>(), vec!["Lighting", "Fans"]);
        let fans = result.get("Fans").unwrap();
        assert_eq!(fans.headers, names(&["Name", "Price"]));
        assert_eq!(fans.rows[0].cells[0], CellValue::from("Tower Fan"));
        assert_eq!(fans.rows[1].cells[0], CellValue::from("Wall Fan"));
        assert!(result.get("Decor").is_none());
        assert_eq!(result.total_rows(), 3);
    }

    #[test]
    fn test_partition_empty_table() {
        let table = Table::new(names(&["Name"]), vec![]);
        let result = partition(&table, &[], &names(&["Fans"]));
        assert!(result.is_empty());
    }
}
