use crate::error::{Result, SorterError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_key: Option<String>,
    pub model: String,
    /// オラクル1回あたりのタイムアウト
    pub timeout_seconds: u64,
    /// オラクル呼び出し間の待機（レート制限対策）
    pub oracle_delay_ms: u64,
    /// カテゴリ未指定時に使うカテゴリ
    pub default_categories: Vec<String>,
    /// カスタムカテゴリ辞書（JSON）
    pub categories_file: Option<PathBuf>,
    /// 出力Excelの列幅上限
    pub max_column_width: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default_config())
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| SorterError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("product-sorter").join("config.json"))
    }

    fn default_config() -> Self {
        Self {
            api_key: None,
            model: "claude-sonnet-4-20250514".into(),
            timeout_seconds: 10,
            oracle_delay_ms: 500,
            default_categories: vec!["Lighting".into(), "Fans".into()],
            categories_file: None,
            max_column_width: 50,
        }
    }

    pub fn get_api_key(&self) -> Result<String> {
        // 環境変数を優先
        if let Ok(key) = std::env::var("ANTHROPIC_API_KEY") {
            if !key.trim().is_empty() {
                return Ok(key);
            }
        }

        self.api_key.clone().ok_or(SorterError::MissingApiKey)
    }

    pub fn set_api_key(&mut self, key: String) -> Result<()> {
        self.api_key = Some(key);
        self.save()
    }

    pub fn set_default_categories(&mut self, categories: Vec<String>) -> Result<()> {
        self.default_categories = categories;
        self.save()
    }
}
