pub mod api;
pub mod cache;
pub mod command;

pub use api::ApiOracle;
pub use cache::{cache_key, CachedOracle, OracleCache};
pub use command::CliOracle;

use crate::ai_provider::AiProvider;
use crate::config::Config;
use crate::error::Result;
use indicatif::{ProgressBar, ProgressStyle};
use product_sorter_common::Oracle;
use std::path::Path;
use std::time::{Duration, Instant};

/// 連続呼び出しの間隔を空ける
#[derive(Debug)]
pub struct Throttle {
    delay: Duration,
    last: Option<Instant>,
}

impl Throttle {
    pub fn new(delay: Duration) -> Self {
        Self { delay, last: None }
    }

    /// 前回呼び出しから `delay` 経過するまで待機
    pub fn wait(&mut self) {
        if let Some(last) = self.last {
            let elapsed = last.elapsed();
            if elapsed < self.delay {
                std::thread::sleep(self.delay - elapsed);
            }
        }
        self.last = Some(Instant::now());
    }
}

/// プロバイダに応じたオラクルを生成
pub fn build_oracle(provider: AiProvider, config: &Config, verbose: bool) -> Result<Box<dyn Oracle>> {
    let timeout = Duration::from_secs(config.timeout_seconds);
    let delay = Duration::from_millis(config.oracle_delay_ms);

    match provider {
        AiProvider::Api => {
            let api_key = config.get_api_key()?;
            let oracle = ApiOracle::new(api_key, config.model.clone(), timeout, delay)?;
            Ok(Box::new(oracle))
        }
        cli => Ok(Box::new(CliOracle::new(cli, timeout, delay, verbose))),
    }
}

/// 1回の実行で使うオラクル（キャッシュ有無を含む）
pub enum OracleSession {
    Disabled,
    Direct(Box<dyn Oracle>),
    Cached(CachedOracle<Box<dyn Oracle>>),
}

impl OracleSession {
    /// `use_cache` のときは `cache_folder` のキャッシュを読み込んで包む
    pub fn start(
        provider: AiProvider,
        config: &Config,
        verbose: bool,
        cache_folder: Option<&Path>,
    ) -> Result<Self> {
        let oracle = build_oracle(provider, config, verbose)?;
        Ok(match cache_folder {
            Some(folder) => {
                let cached = CachedOracle::load(oracle, folder);
                tracing::debug!(folder = %folder.display(), "オラクルキャッシュを読み込みました");
                Self::Cached(cached)
            }
            None => Self::Direct(oracle),
        })
    }

    pub fn as_oracle(&mut self) -> Option<&mut dyn Oracle> {
        match self {
            Self::Disabled => None,
            Self::Direct(oracle) => Some(&mut **oracle),
            Self::Cached(oracle) => Some(oracle),
        }
    }

    /// キャッシュを保存し、ヒット数を返す
    pub fn finish(&self) -> Result<Option<usize>> {
        match self {
            Self::Cached(oracle) => {
                oracle.save()?;
                Ok(Some(oracle.hits()))
            }
            _ => Ok(None),
        }
    }
}

/// 問い合わせごとに進捗表示を進めるラッパー
///
/// 問い合わせ件数は事前に分からないため、件数カウンタ付きのスピナーで表示する。
pub struct ProgressOracle<'a> {
    inner: &'a mut dyn Oracle,
    bar: ProgressBar,
}

impl<'a> ProgressOracle<'a> {
    pub fn new(inner: &'a mut dyn Oracle) -> Self {
        let bar = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("  {spinner} オラクル問い合わせ {pos}件 {msg}") {
            bar.set_style(style);
        }
        Self { inner, bar }
    }

    /// 問い合わせ件数
    pub fn queries(&self) -> u64 {
        self.bar.position()
    }

    pub fn finish(self) {
        self.bar.finish_and_clear();
    }
}

impl Oracle for ProgressOracle<'_> {
    fn lookup(&mut self, text: &str, candidates: &[String]) -> Option<String> {
        let answer = self.inner.lookup(text, candidates);
        self.bar.inc(1);
        answer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SorterError;

    #[test]
    fn test_throttle_first_call_does_not_wait() {
        let mut throttle = Throttle::new(Duration::from_secs(5));
        let start = Instant::now();
        throttle.wait();
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_throttle_spaces_calls() {
        let mut throttle = Throttle::new(Duration::from_millis(30));
        throttle.wait();
        let start = Instant::now();
        throttle.wait();
        assert!(start.elapsed() >= Duration::from_millis(25));
    }

    #[test]
    fn test_progress_oracle_counts_queries() {
        let mut inner = product_sorter_common::NoopOracle;
        let mut progress = ProgressOracle::new(&mut inner);
        let candidates = vec!["Fans".to_string()];
        assert_eq!(progress.lookup("air mover", &candidates), None);
        assert_eq!(progress.lookup("gadget", &candidates), None);
        assert_eq!(progress.queries(), 2);
        progress.finish();
    }

    #[test]
    fn test_disabled_session_has_no_oracle() {
        let mut session = OracleSession::Disabled;
        assert!(session.as_oracle().is_none());
        assert_eq!(session.finish().unwrap(), None);
    }

    #[test]
    fn test_build_oracle_api_requires_key() {
        let config = Config {
            api_key: None,
            ..Config::default()
        };
        if std::env::var("ANTHROPIC_API_KEY").is_err() {
            assert!(matches!(
                build_oracle(AiProvider::Api, &config, false),
                Err(SorterError::MissingApiKey)
            ));
        }
    }
}
