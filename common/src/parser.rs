//! オラクル応答パーサー
//!
//! AI CLI / APIの応答テキストからカテゴリ名を取り出す。

use crate::error::{Error, Result};
use serde::Deserialize;

/// 応答からJSON部分を抽出
///
/// 抽出優先順位:
/// 1. ```json ... ``` ブロック
/// 2. 生の {...} オブジェクト
/// 3. エラー
///
/// # Examples
/// ```
/// use product_sorter_common::extract_json;
///
/// let response = "answer: {\"category\": \"Fans\"}";
/// let json = extract_json(response).unwrap();
/// assert_eq!(json, "{\"category\": \"Fans\"}");
/// ```
pub fn extract_json(response: &str) -> Result<&str> {
    // ```json ... ``` ブロックを探す
    if let Some(start_marker) = response.find("```json") {
        let start = start_marker + 7; // "```json" の長さ
        if let Some(end_offset) = response[start..].find("```") {
            let end = start + end_offset;
            return Ok(response[start..end].trim());
        }
    }

    // 生の {...} を探す
    if let Some(start) = response.find('{') {
        if let Some(end) = response.rfind('}') {
            if end >= start {
                return Ok(&response[start..=end]);
            }
        }
    }

    Err(Error::Parse("JSONが見つかりません".into()))
}

#[derive(Deserialize)]
struct OracleAnswer {
    category: Option<String>,
}

/// 候補の中から正式名を探す（大文字小文字・前後空白を無視）
fn match_candidate(value: &str, candidates: &[String]) -> Option<String> {
    let value = value.trim().trim_matches(|c| c == '"' || c == '\'' || c == '.');
    candidates
        .iter()
        .find(|c| c.eq_ignore_ascii_case(value))
        .cloned()
}

/// オラクル応答からカテゴリを取り出す
///
/// `{"category": "Fans"}` 形式を優先し、JSONがなければ候補名そのものの行を探す。
/// 候補にない名前・null・"none" は `None`。
pub fn parse_oracle_answer(response: &str, candidates: &[String]) -> Option<String> {
    if let Ok(json) = extract_json(response) {
        if let Ok(answer) = serde_json::from_str::<OracleAnswer>(json.trim()) {
            return answer
                .category
                .and_then(|name| match_candidate(&name, candidates));
        }
    }

    response
        .lines()
        .find_map(|line| match_candidate(line, candidates))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates() -> Vec<String> {
        vec!["Lighting".to_string(), "Fans".to_string()]
    }

    #[test]
    fn test_extract_json_block() {
        let response = "Result:\n```json\n{\"category\": \"Fans\"}\n```\n";
        assert_eq!(extract_json(response).unwrap(), "{\"category\": \"Fans\"}");
    }

    #[test]
    fn test_extract_json_missing() {
        assert!(matches!(extract_json("no json here"), Err(Error::Parse(_))));
    }

    #[test]
    fn test_parse_answer_json() {
        let answer = parse_oracle_answer(r#"{"category": "fans"}"#, &candidates());
        assert_eq!(answer.as_deref(), Some("Fans"));
    }

    #[test]
    fn test_parse_answer_null() {
        assert_eq!(parse_oracle_answer(r#"{"category": null}"#, &candidates()), None);
    }

    #[test]
    fn test_parse_answer_unknown_category() {
        assert_eq!(parse_oracle_answer(r#"{"category": "Toys"}"#, &candidates()), None);
    }

    #[test]
    fn test_parse_answer_plain_text() {
        let answer = parse_oracle_answer("I think this is:\nLighting.\n", &candidates());
        assert_eq!(answer.as_deref(), Some("Lighting"));
    }

    #[test]
    fn test_parse_answer_garbage() {
        assert_eq!(parse_oracle_answer("Sorry, I cannot tell.", &candidates()), None);
    }
}
