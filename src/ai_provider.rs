use clap::ValueEnum;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum AiProvider {
    Claude,
    Codex,
    Gemini,
    /// Anthropic Messages API（HTTP）
    Api,
}

impl AiProvider {
    /// CLI実行ファイル名（API利用時はNone）
    pub fn command_name(&self) -> Option<&'static str> {
        match self {
            AiProvider::Claude => Some("claude"),
            AiProvider::Codex => Some("codex"),
            AiProvider::Gemini => Some("gemini"),
            AiProvider::Api => None,
        }
    }

    /// プロンプトを渡すCLI引数
    pub fn cli_args(&self, prompt: &str) -> Vec<String> {
        match self {
            AiProvider::Claude => vec![
                "-p".into(),
                prompt.into(),
                "--output-format".into(),
                "text".into(),
            ],
            AiProvider::Codex => vec!["exec".into(), prompt.into()],
            AiProvider::Gemini => vec!["-p".into(), prompt.into()],
            AiProvider::Api => Vec::new(),
        }
    }
}
