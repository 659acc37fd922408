use clap::Parser;
use product_sorter::{cli, config, error, oracle, pipeline, report, scanner, workbook};
use cli::{ClassifyArgs, Cli, Commands};
use config::Config;
use error::{Result, SorterError};
use oracle::{OracleCache, OracleSession};
use pipeline::{SplitOptions, SplitOutcome};
use product_sorter_common::export::excel_core::ExcelStyle;
use product_sorter_common::{CategoryTable, Classifier};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// カテゴリ辞書を読み込み（CLI指定 → 設定 → 組み込み）
fn load_category_table(category_file: Option<&Path>, config: &Config) -> Result<CategoryTable> {
    match category_file.or(config.categories_file.as_deref()) {
        Some(path) => {
            if !path.exists() {
                return Err(SorterError::FileNotFound(path.display().to_string()));
            }
            Ok(CategoryTable::from_file(path)?)
        }
        None => Ok(CategoryTable::builtin()),
    }
}

/// 判定対象カテゴリを決定
fn resolve_enabled(args: &ClassifyArgs, table: &CategoryTable, config: &Config) -> Result<Vec<String>> {
    let requested = if args.all_categories {
        table.names()
    } else if args.categories.is_empty() {
        config.default_categories.clone()
    } else {
        args.categories.clone()
    };

    let enabled = table
        .resolve_names(&requested)
        .map_err(SorterError::UnknownCategory)?;
    if enabled.is_empty() {
        return Err(SorterError::NoCategoriesSelected);
    }
    Ok(enabled)
}

fn default_output_dir(input: &Path) -> PathBuf {
    input
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn start_oracle(cli: &Cli, args: &ClassifyArgs, config: &Config, cache_folder: &Path) -> Result<OracleSession> {
    if !args.use_oracle {
        return Ok(OracleSession::Disabled);
    }
    OracleSession::start(
        cli.ai_provider,
        config,
        cli.verbose,
        args.use_cache.then_some(cache_folder),
    )
}

fn finish_oracle(session: &OracleSession) {
    match session.finish() {
        Ok(Some(hits)) => println!("✔ オラクルキャッシュを保存 (ヒット: {}件)", hits),
        Ok(None) => {}
        Err(e) => println!("⚠ キャッシュ保存エラー: {}", e),
    }
}

fn print_outcome(outcome: &SplitOutcome, dry_run: bool) {
    println!("{}", report::format_summary(&outcome.stats, &outcome.export.artifacts));
    if dry_run {
        println!("  (ドライラン: ファイルは出力していません)");
    }
    for line in report::format_artifacts(&outcome.export.artifacts) {
        println!("{}", line);
    }
    for failure in &outcome.export.failures {
        println!("✖ {}: {}", failure.category, failure.message);
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let config = Config::load()?;

    match &cli.command {
        Commands::Split { input, sheet, output, report: report_path, classify } => {
            println!("📦 product-sorter - カテゴリ分割\n");

            let table = load_category_table(classify.category_file.as_deref(), &config)?;
            let enabled = resolve_enabled(classify, &table, &config)?;
            let classifier = Classifier::new(table)?;

            // 1. シート決定
            println!("[1/3] ブックを確認中...");
            let sheet = pipeline::choose_sheet(input, sheet.clone())?;
            println!(
                "✔ {} (シート: {})\n",
                input.display(),
                sheet.as_deref().unwrap_or("先頭シート")
            );

            // 2. 判定・振り分け
            let output_dir = output.clone().unwrap_or_else(|| default_output_dir(input));
            let options = SplitOptions {
                enabled: enabled.clone(),
                selected_columns: classify.columns.clone(),
                output_dir: output_dir.clone(),
                dry_run: classify.dry_run,
                style: ExcelStyle {
                    max_column_width: config.max_column_width,
                    ..ExcelStyle::default()
                },
            };
            println!(
                "[2/3] カテゴリ判定中... ({}){}",
                enabled.join(", "),
                if classify.use_oracle { " (AI判定有効)" } else { "" }
            );
            let mut session = start_oracle(&cli, classify, &config, &output_dir)?;
            let outcome = pipeline::split_workbook(
                input,
                sheet.as_deref(),
                &classifier,
                &options,
                session.as_oracle(),
            );
            finish_oracle(&session);
            println!("✔ 判定完了\n");

            // 3. 結果
            println!("[3/3] 結果");
            print_outcome(&outcome, classify.dry_run);

            if let Some(path) = report_path {
                report::RunReport::new(&outcome).save(path)?;
                println!("✔ レポートを保存: {}", path.display());
            }

            println!("\n✅ 完了");
        }

        Commands::Batch { folder, output, recursive, classify } => {
            println!("🚀 product-sorter - 一括分割\n");

            let table = load_category_table(classify.category_file.as_deref(), &config)?;
            let enabled = resolve_enabled(classify, &table, &config)?;
            let classifier = Classifier::new(table)?;

            // 1. スキャン
            println!("[1/2] ブックをスキャン中...");
            let workbooks = scanner::scan_folder(folder, *recursive)?;
            println!("✔ {}件のブックを検出\n", workbooks.len());

            if workbooks.is_empty() {
                return Ok(());
            }

            // 2. 分割
            println!("[2/2] 分割中...{}", if classify.use_oracle { " (AI判定有効)" } else { "" });
            let cache_folder = output.clone().unwrap_or_else(|| folder.clone());
            let mut session = start_oracle(&cli, classify, &config, &cache_folder)?;
            let mut produced: HashSet<PathBuf> = HashSet::new();
            let mut total_rows = 0;
            let mut total_files = 0;

            for (index, info) in workbooks.iter().enumerate() {
                if produced.contains(&info.path) {
                    tracing::debug!(path = %info.path.display(), "今回の出力ファイルをスキップ");
                    continue;
                }

                println!("\n({}/{}) {}", index + 1, workbooks.len(), info.file_name);
                let options = SplitOptions {
                    enabled: enabled.clone(),
                    selected_columns: classify.columns.clone(),
                    output_dir: output.clone().unwrap_or_else(|| default_output_dir(&info.path)),
                    dry_run: classify.dry_run,
                    style: ExcelStyle {
                        max_column_width: config.max_column_width,
                        ..ExcelStyle::default()
                    },
                };
                let outcome =
                    pipeline::split_workbook(&info.path, None, &classifier, &options, session.as_oracle());
                print_outcome(&outcome, classify.dry_run);

                total_rows += outcome.stats.total_rows;
                total_files += outcome.export.artifacts.len();
                produced.extend(outcome.export.artifacts.iter().map(|a| a.path.clone()));
            }
            finish_oracle(&session);

            println!("\n✅ 完了: {}行 → {}ファイル", total_rows, total_files);
        }

        Commands::Sheets { input } => {
            let sheets = workbook::sheet_info(input)?;
            println!("シート一覧: {}", input.display());
            for (i, sheet) in sheets.iter().enumerate() {
                println!("  {}) {}", i + 1, sheet);
            }
        }

        Commands::Categories { category_file } => {
            let table = load_category_table(category_file.as_deref(), &config)?;
            println!("カテゴリ辞書 ({}件):", table.categories().len());
            for category in table.categories() {
                println!("  {} (重み: {})", category.name, category.weight);
                println!("    キーワード: {}", category.keywords.join(", "));
                if !category.exclude.is_empty() {
                    println!("    除外: {}", category.exclude.join(", "));
                }
                if !category.sku_patterns.is_empty() {
                    println!("    品番パターン: {}", category.sku_patterns.join(", "));
                }
            }
        }

        Commands::Config { set_api_key, set_default_categories, show } => {
            let mut config = config;

            if let Some(key) = set_api_key {
                config.set_api_key(key.clone())?;
                println!("✔ APIキーを設定しました");
            }

            if let Some(categories) = set_default_categories {
                let table = load_category_table(None, &config)?;
                let resolved = table
                    .resolve_names(categories)
                    .map_err(SorterError::UnknownCategory)?;
                if resolved.is_empty() {
                    return Err(SorterError::NoCategoriesSelected);
                }
                config.set_default_categories(resolved)?;
                println!("✔ 既定カテゴリを設定しました: {}", config.default_categories.join(", "));
            }

            if *show {
                println!("設定:");
                println!("  モデル: {}", config.model);
                println!("  タイムアウト: {}秒", config.timeout_seconds);
                println!("  呼び出し間隔: {}ms", config.oracle_delay_ms);
                println!("  既定カテゴリ: {}", config.default_categories.join(", "));
                println!(
                    "  カテゴリ辞書: {}",
                    config
                        .categories_file
                        .as_ref()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| "組み込み".to_string())
                );
                println!("  列幅上限: {}", config.max_column_width);
                println!("  APIキー: {}", if config.get_api_key().is_ok() { "設定済み" } else { "未設定" });
            }
        }

        Commands::Cache { clear, folder, info } => {
            let target = folder.clone().unwrap_or_else(|| PathBuf::from("."));
            let cache_path = OracleCache::cache_path(&target);

            if *info || !*clear {
                // デフォルトまたは--info: 情報表示
                if cache_path.exists() {
                    let cache = OracleCache::load(&target);
                    println!("キャッシュ情報:");
                    println!("  パス: {}", cache_path.display());
                    println!("  件数: {}", cache.len());
                    if let Ok(meta) = std::fs::metadata(&cache_path) {
                        println!("  サイズ: {} bytes", meta.len());
                    }
                } else {
                    println!("キャッシュファイルが存在しません: {}", cache_path.display());
                }
            }

            if *clear {
                match OracleCache::clear(&target) {
                    Ok(true) => println!("✔ キャッシュを削除しました: {}", cache_path.display()),
                    Ok(false) => println!("キャッシュファイルが存在しません"),
                    Err(e) => println!("キャッシュ削除エラー: {}", e),
                }
            }
        }
    }

    Ok(())
}
