use crate::error::{Result, SorterError};
use crate::workbook::is_workbook_extension;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone)]
pub struct WorkbookInfo {
    pub path: PathBuf,
    pub file_name: String,
}

/// フォルダ内のブックを列挙
///
/// Excelのロックファイル（`~$`で始まる）は除外する。
pub fn scan_folder(folder: &Path, recursive: bool) -> Result<Vec<WorkbookInfo>> {
    if !folder.exists() {
        return Err(SorterError::FolderNotFound(folder.display().to_string()));
    }

    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut workbooks = Vec::new();

    for entry in WalkDir::new(folder)
        .max_depth(max_depth)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();

        if !path.is_file() {
            continue;
        }

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        if file_name.starts_with("~$") {
            continue;
        }

        let is_workbook = path
            .extension()
            .map(|ext| is_workbook_extension(&ext.to_string_lossy()))
            .unwrap_or(false);
        if is_workbook {
            workbooks.push(WorkbookInfo {
                path: path.to_path_buf(),
                file_name,
            });
        }
    }

    // パスでソート
    workbooks.sort_by(|a, b| a.path.cmp(&b.path));

    Ok(workbooks)
}
