//! 外部オラクル（AI / 検索）インターフェース
//!
//! キーワードで一致しなかった行について、外部の判定を任意で仰ぐ。
//! 既定実装 `NoopOracle` は常に判定なしを返すため、
//! ネットワークなしで分類ロジック全体をテストできる。

/// 外部判定の能力
pub trait Oracle {
    /// 行テキストと候補カテゴリから最も近いカテゴリを返す
    ///
    /// 失敗（タイムアウト・通信エラー・解釈不能な応答）は `None` として扱う。
    fn lookup(&mut self, text: &str, candidates: &[String]) -> Option<String>;
}

/// 何も判定しないオラクル
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopOracle;

impl Oracle for NoopOracle {
    fn lookup(&mut self, _text: &str, _candidates: &[String]) -> Option<String> {
        None
    }
}

impl<O: Oracle + ?Sized> Oracle for Box<O> {
    fn lookup(&mut self, text: &str, candidates: &[String]) -> Option<String> {
        (**self).lookup(text, candidates)
    }
}

/// オラクル向けプロンプトを構築
pub fn build_oracle_prompt(text: &str, candidates: &[String]) -> String {
    format!(
        "You are classifying a product row from a spreadsheet.\n\
         Product text: {text}\n\
         Candidate categories: {list}\n\
         Reply with JSON only, exactly like {{\"category\": \"<one of the candidates>\"}}. \
         If none of the candidates fits, reply {{\"category\": null}}.",
        text = text,
        list = candidates.join(", "),
    )
}
