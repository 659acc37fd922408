use thiserror::Error;

#[derive(Error, Debug)]
pub enum SorterError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("APIキーが設定されていません。`product-sorter config --set-api-key YOUR_KEY` で設定してください")]
    MissingApiKey,

    #[error("ファイルが見つかりません: {0}")]
    FileNotFound(String),

    #[error("フォルダが見つかりません: {0}")]
    FolderNotFound(String),

    #[error("ブック読み込みエラー: {0}")]
    Workbook(String),

    #[error("シートが見つかりません: {0}")]
    SheetNotFound(String),

    #[error("カテゴリが選択されていません。-c/--categories または --all-categories で指定してください")]
    NoCategoriesSelected,

    #[error("未知のカテゴリ: {0}（`product-sorter categories` で一覧を確認してください）")]
    UnknownCategory(String),

    #[error("API呼び出しエラー: {0}")]
    ApiCall(String),

    #[error("APIレスポンスのパースに失敗: {0}")]
    ApiParse(String),

    #[error("Excel生成エラー: {0}")]
    ExcelGeneration(String),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Common(#[from] product_sorter_common::Error),
}

pub type Result<T> = std::result::Result<T, SorterError>;
