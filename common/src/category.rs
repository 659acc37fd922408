//! カテゴリ辞書モジュール
//!
//! カテゴリごとのキーワード・除外語・SKUパターンをデータとして保持する。
//! 組み込み辞書のほか、JSONファイルから差し替え可能。

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// カテゴリ定義
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    /// 一致すると加点されるキーワード
    pub keywords: Vec<String>,
    /// 1つでも単語一致すればこのカテゴリは候補から外れる
    #[serde(default)]
    pub exclude: Vec<String>,
    /// SKU・型番の正規表現（小文字化した原文に対して評価）
    #[serde(default)]
    pub sku_patterns: Vec<String>,
    /// スコア倍率
    #[serde(default = "default_weight")]
    pub weight: u32,
}

fn default_weight() -> u32 {
    1
}

/// スコア倍率の上限
pub const MAX_WEIGHT: u32 = 100;

impl Category {
    pub fn new(name: &str, keywords: &[&str], exclude: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            keywords: keywords.iter().map(|s| s.to_string()).collect(),
            exclude: exclude.iter().map(|s| s.to_string()).collect(),
            sku_patterns: Vec::new(),
            weight: default_weight(),
        }
    }
}

/// カテゴリ辞書（宣言順を保持）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryTable {
    categories: Vec<Category>,
}

impl Default for CategoryTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl CategoryTable {
    /// カテゴリ一覧から辞書を構築（名前の重複・空キーワードは拒否）
    pub fn new(categories: Vec<Category>) -> Result<Self> {
        for (i, cat) in categories.iter().enumerate() {
            if cat.name.trim().is_empty() {
                return Err(Error::Config(format!("{}番目のカテゴリ名が空です", i + 1)));
            }
            if cat.keywords.is_empty() && cat.sku_patterns.is_empty() {
                return Err(Error::Config(format!(
                    "カテゴリ '{}' にキーワードがありません",
                    cat.name
                )));
            }
            if cat.weight == 0 || cat.weight > MAX_WEIGHT {
                return Err(Error::Config(format!(
                    "カテゴリ '{}' の重み {} は範囲外です (1〜{})",
                    cat.name, cat.weight, MAX_WEIGHT
                )));
            }
            if categories[..i].iter().any(|c| c.name.eq_ignore_ascii_case(&cat.name)) {
                return Err(Error::Config(format!("カテゴリ '{}' が重複しています", cat.name)));
            }
        }
        Ok(Self { categories })
    }

    /// JSON文字列から読み込み
    ///
    /// 形式: `[{"name": "Fans", "keywords": ["fan"], "exclude": ["light"]}, ...]`
    pub fn from_json(json: &str) -> Result<Self> {
        let categories: Vec<Category> = serde_json::from_str(json)?;
        Self::new(categories)
    }

    /// JSONファイルから読み込み
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn get(&self, name: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.name == name)
    }

    /// 全カテゴリ名（宣言順）
    pub fn names(&self) -> Vec<String> {
        self.categories.iter().map(|c| c.name.clone()).collect()
    }

    /// ユーザー入力のカテゴリ名を正式名に解決（大文字小文字は無視）
    ///
    /// 未知の名前があれば `Err(名前)` を返す。重複は除去し、入力順を保つ。
    pub fn resolve_names<S: AsRef<str>>(&self, requested: &[S]) -> std::result::Result<Vec<String>, String> {
        let mut resolved: Vec<String> = Vec::new();
        for name in requested {
            let name = name.as_ref().trim();
            if name.is_empty() {
                continue;
            }
            let found = self
                .categories
                .iter()
                .find(|c| c.name.eq_ignore_ascii_case(name))
                .ok_or_else(|| name.to_string())?;
            if !resolved.contains(&found.name) {
                resolved.push(found.name.clone());
            }
        }
        Ok(resolved)
    }

    /// 組み込み辞書
    pub fn builtin() -> Self {
        Self {
            categories: vec![
                Category::new(
                    "Fans",
                    &[
                        "fan", "ventilator", "blower", "exhaust", "ventilation",
                        "air circulator", "cooling fan", "pedestal", "tower fan",
                        "ceiling fan", "table fan", "wall fan", "stand fan",
                        "industrial fan", "oscillating",
                    ],
                    &["light", "lamp", "bulb", "led", "fixture", "lighting", "illumination"],
                ),
                Category::new(
                    "Lighting",
                    &[
                        "light", "lamp", "bulb", "lighting", "led", "fixture",
                        "chandelier", "luminaire", "illumination", "lantern", "sconce",
                        "pendant", "downlight", "spotlight", "track light",
                        "ceiling light", "wall light", "floor lamp", "table lamp",
                        "desk lamp",
                    ],
                    &["fan", "ventilator", "blower", "exhaust", "cooling"],
                ),
                Category::new(
                    "Furniture",
                    &[
                        "chair", "table", "desk", "cabinet", "shelf", "sofa", "couch",
                        "bed", "furniture", "wardrobe", "dresser", "bookcase", "stool",
                        "bench", "ottoman",
                    ],
                    &[],
                ),
                Category::new(
                    "Decor",
                    &[
                        "decor", "decoration", "vase", "mirror", "sculpture", "cushion",
                        "rug", "carpet", "curtain", "decorative", "ornament",
                    ],
                    &[],
                ),
                Category::new(
                    "Electronics",
                    &[
                        "tv", "television", "monitor", "speaker", "computer", "laptop",
                        "printer", "electronic", "router",
                    ],
                    &[],
                ),
                Category::new(
                    "Kitchen",
                    &[
                        "kitchen", "cookware", "utensil", "microwave", "oven",
                        "refrigerator", "blender",
                    ],
                    &[],
                ),
                Category::new(
                    "Bathroom",
                    &["bathroom", "toilet", "sink", "shower", "bathtub", "vanity"],
                    &[],
                ),
                Category::new(
                    "Outdoor",
                    &["outdoor", "patio", "garden", "lawn", "bbq", "grill"],
                    &[],
                ),
            ],
        }
    }
}
