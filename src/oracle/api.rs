//! Anthropic Messages API連携オラクル

use super::Throttle;
use crate::error::{Result, SorterError};
use product_sorter_common::{build_oracle_prompt, parse_oracle_answer, Oracle};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const MESSAGES_API_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 64;

/// Messages APIリクエスト
#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

/// Messages APIレスポンス
#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

pub struct ApiOracle {
    client: reqwest::blocking::Client,
    api_key: String,
    model: String,
    throttle: Throttle,
}

impl ApiOracle {
    pub fn new(api_key: String, model: String, timeout: Duration, delay: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SorterError::ApiCall(format!("HTTPクライアント初期化エラー: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            model,
            throttle: Throttle::new(delay),
        })
    }

    fn request(&self, prompt: &str) -> Result<String> {
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: MAX_TOKENS,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(MESSAGES_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .map_err(|e| SorterError::ApiCall(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().unwrap_or_default();
            return Err(SorterError::ApiCall(format!("HTTP {}: {}", status, text.trim())));
        }

        let parsed: MessagesResponse = response
            .json()
            .map_err(|e| SorterError::ApiParse(e.to_string()))?;

        Ok(parsed
            .content
            .into_iter()
            .map(|block| block.text)
            .collect::<Vec<_>>()
            .join("\n"))
    }
}

impl Oracle for ApiOracle {
    fn lookup(&mut self, text: &str, candidates: &[String]) -> Option<String> {
        self.throttle.wait();
        let prompt = build_oracle_prompt(text, candidates);
        match self.request(&prompt) {
            Ok(response) => parse_oracle_answer(&response, candidates),
            Err(e) => {
                tracing::warn!("オラクル呼び出し失敗: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_shape() {
        let body = MessagesRequest {
            model: "claude-sonnet-4-20250514",
            max_tokens: MAX_TOKENS,
            messages: vec![Message { role: "user", content: "hi" }],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["max_tokens"], 64);
    }

    #[test]
    fn test_response_parse() {
        let raw = r#"{"content": [{"type": "text", "text": "{\"category\": \"Fans\"}"}]}"#;
        let parsed: MessagesResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.content[0].text, "{\"category\": \"Fans\"}");
    }
}
