//! オラクル応答キャッシュモジュール
//!
//! 行テキストと候補カテゴリのSHA-256をキーにして応答をキャッシュし、
//! 同じ問い合わせの再実行をスキップする。

use crate::error::Result;
use product_sorter_common::Oracle;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

const CACHE_FILE_NAME: &str = ".oracle-cache.json";

/// キャッシュファイルの構造
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleCache {
    /// バージョン（互換性チェック用）
    version: u32,
    /// キー → 応答のマップ
    entries: HashMap<String, CacheEntry>,
}

/// キャッシュエントリ
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// 問い合わせた行テキスト
    pub text: String,
    /// 判定されたカテゴリ
    pub category: String,
}

impl OracleCache {
    const CURRENT_VERSION: u32 = 1;

    pub fn cache_path(folder: &Path) -> PathBuf {
        folder.join(CACHE_FILE_NAME)
    }

    /// キャッシュファイルを読み込み（壊れていれば空から始める）
    pub fn load(folder: &Path) -> Self {
        let cache_path = Self::cache_path(folder);
        if !cache_path.exists() {
            return Self::default();
        }

        let file = match File::open(&cache_path) {
            Ok(f) => f,
            Err(_) => return Self::default(),
        };

        let reader = BufReader::new(file);
        match serde_json::from_reader::<_, OracleCache>(reader) {
            Ok(cache) if cache.version == Self::CURRENT_VERSION => cache,
            Ok(_) => {
                tracing::warn!("キャッシュバージョン不一致、再生成します");
                Self::default()
            }
            Err(_) => Self::default(),
        }
    }

    /// キャッシュファイルを保存
    pub fn save(&self, folder: &Path) -> Result<()> {
        std::fs::create_dir_all(folder)?;
        let file = File::create(Self::cache_path(folder))?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// キャッシュファイルを削除
    ///
    /// # Returns
    /// 削除した場合 `true`、存在しなかった場合 `false`
    pub fn clear(folder: &Path) -> Result<bool> {
        let cache_path = Self::cache_path(folder);
        if cache_path.exists() {
            std::fs::remove_file(cache_path)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    pub fn get(&self, key: &str) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    pub fn insert(&mut self, key: String, text: String, category: String) {
        self.entries.insert(key, CacheEntry { text, category });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for OracleCache {
    fn default() -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            entries: HashMap::new(),
        }
    }
}

/// 問い合わせのキャッシュキー
pub fn cache_key(text: &str, candidates: &[String]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    for candidate in candidates {
        hasher.update([0x1f]);
        hasher.update(candidate.as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// キャッシュ付きオラクル
///
/// 判定できた応答のみ保存する（タイムアウト等の失敗は次回再問い合わせ）。
pub struct CachedOracle<O: Oracle> {
    inner: O,
    cache: OracleCache,
    folder: PathBuf,
    hits: usize,
}

impl<O: Oracle> CachedOracle<O> {
    pub fn load(inner: O, folder: &Path) -> Self {
        Self {
            inner,
            cache: OracleCache::load(folder),
            folder: folder.to_path_buf(),
            hits: 0,
        }
    }

    /// キャッシュヒット数
    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn save(&self) -> Result<()> {
        self.cache.save(&self.folder)
    }
}

impl<O: Oracle> Oracle for CachedOracle<O> {
    fn lookup(&mut self, text: &str, candidates: &[String]) -> Option<String> {
        let key = cache_key(text, candidates);
        if let Some(entry) = self.cache.get(&key) {
            self.hits += 1;
            return Some(entry.category.clone());
        }

        let answer = self.inner.lookup(text, candidates)?;
        self.cache.insert(key, text.to_string(), answer.clone());
        Some(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CountingOracle {
        calls: usize,
    }

    impl Oracle for CountingOracle {
        fn lookup(&mut self, _text: &str, _candidates: &[String]) -> Option<String> {
            self.calls += 1;
            Some("Fans".to_string())
        }
    }

    #[test]
    fn test_cache_key_depends_on_candidates() {
        let a = cache_key("tower fan", &["Fans".to_string()]);
        let b = cache_key("tower fan", &["Fans".to_string(), "Lighting".to_string()]);
        assert_ne!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_save_creates_missing_folder() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let folder = dir.path().join("not-yet").join("out");
        let mut cache = OracleCache::default();
        cache.insert("k".into(), "air mover".into(), "Fans".into());

        cache.save(&folder).unwrap();
        assert_eq!(OracleCache::load(&folder).len(), 1);
    }

    #[test]
    fn test_cached_oracle_skips_repeat_calls() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let candidates = vec!["Fans".to_string()];
        let mut oracle = CachedOracle::load(CountingOracle { calls: 0 }, dir.path());

        assert_eq!(oracle.lookup("air mover", &candidates).as_deref(), Some("Fans"));
        assert_eq!(oracle.lookup("air mover", &candidates).as_deref(), Some("Fans"));
        assert_eq!(oracle.inner.calls, 1);
        assert_eq!(oracle.hits(), 1);
    }
}
