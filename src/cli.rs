use clap::{Args, Parser, Subcommand};
use crate::ai_provider::AiProvider;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "product-sorter")]
#[command(about = "商品データのカテゴリ判定・カテゴリ別Excel分割ツール", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// オラクルに使うAIプロバイダ (claude/codex/gemini/api)
    #[arg(long, default_value = "claude", global = true)]
    pub ai_provider: AiProvider,
}

/// split / batch 共通の分類オプション
#[derive(Args, Debug, Clone, Default)]
pub struct ClassifyArgs {
    /// 判定するカテゴリ（カンマ区切り、省略時は設定の既定値）
    #[arg(short, long, value_delimiter = ',')]
    pub categories: Vec<String>,

    /// 辞書の全カテゴリを判定対象にする
    #[arg(long, conflicts_with = "categories")]
    pub all_categories: bool,

    /// 走査する列を明示（カンマ区切り、省略時は列名から自動判定）
    #[arg(long, value_delimiter = ',')]
    pub columns: Vec<String>,

    /// カスタムカテゴリ辞書（JSON）
    #[arg(long)]
    pub category_file: Option<PathBuf>,

    /// 一致しなかった行をAIに問い合わせる
    #[arg(long)]
    pub use_oracle: bool,

    /// オラクル応答キャッシュを使用
    #[arg(long, requires = "use_oracle")]
    pub use_cache: bool,

    /// ファイルを書き出さず結果のみ表示
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// ブックを読み込みカテゴリ別のExcelに分割
    Split {
        /// 入力ブック (xlsx/xlsm/xls/xlsb/ods)
        #[arg(required = true)]
        input: PathBuf,

        /// シート名（省略時は対話選択、非対話時は先頭シート）
        #[arg(short, long)]
        sheet: Option<String>,

        /// 出力ディレクトリ（デフォルト: 入力ファイルと同じ場所）
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// 処理結果をJSONで保存
        #[arg(long)]
        report: Option<PathBuf>,

        #[command(flatten)]
        classify: ClassifyArgs,
    },

    /// フォルダ内の全ブックを一括分割
    Batch {
        /// ブックを含むフォルダ
        #[arg(required = true)]
        folder: PathBuf,

        /// 出力ディレクトリ（デフォルト: 各ブックと同じ場所）
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// サブフォルダも再帰的にスキャン
        #[arg(short = 'r', long)]
        recursive: bool,

        #[command(flatten)]
        classify: ClassifyArgs,
    },

    /// ブック内のシート一覧を表示
    Sheets {
        /// 入力ブック
        #[arg(required = true)]
        input: PathBuf,
    },

    /// カテゴリ辞書を表示
    Categories {
        /// カスタムカテゴリ辞書（JSON）
        #[arg(long)]
        category_file: Option<PathBuf>,
    },

    /// 設定を表示/編集
    Config {
        /// APIキーを設定
        #[arg(long)]
        set_api_key: Option<String>,

        /// 既定カテゴリを設定（カンマ区切り）
        #[arg(long, value_delimiter = ',')]
        set_default_categories: Option<Vec<String>>,

        /// 設定を表示
        #[arg(long)]
        show: bool,
    },

    /// オラクル応答キャッシュ管理
    Cache {
        /// キャッシュを削除
        #[arg(long)]
        clear: bool,

        /// 対象フォルダ（省略時はカレント）
        #[arg(short, long)]
        folder: Option<PathBuf>,

        /// キャッシュ情報を表示
        #[arg(long)]
        info: bool,
    },
}
