//! AI CLI連携オラクル
//!
//! claude / codex / gemini のCLIにプロンプトを渡し、応答からカテゴリを読み取る。
//! 1回の呼び出しはタイムアウトで打ち切る。

use super::Throttle;
use crate::ai_provider::AiProvider;
use crate::error::{Result, SorterError};
use product_sorter_common::{build_oracle_prompt, parse_oracle_answer, Oracle};
use std::io::Read;
use std::process::{Command, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

pub struct CliOracle {
    provider: AiProvider,
    timeout: Duration,
    throttle: Throttle,
    verbose: bool,
}

impl CliOracle {
    pub fn new(provider: AiProvider, timeout: Duration, delay: Duration, verbose: bool) -> Self {
        Self {
            provider,
            timeout,
            throttle: Throttle::new(delay),
            verbose,
        }
    }

    fn build_command(&self, command_name: &str, prompt: &str) -> Command {
        // Windowsではcmd /c経由
        #[cfg(windows)]
        let mut command = {
            let mut c = Command::new("cmd");
            c.args(["/c", command_name]);
            c
        };

        #[cfg(not(windows))]
        let mut command = Command::new(command_name);

        command
            .args(self.provider.cli_args(prompt))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        command
    }

    fn run(&self, prompt: &str) -> Result<String> {
        let command_name = self
            .provider
            .command_name()
            .ok_or_else(|| SorterError::Config("APIプロバイダはCLIでは実行できません".into()))?;

        // 改行をスペースに置換してCLI引数で渡す
        let prompt = prompt.replace('\n', " ");

        let response = run_with_timeout(self.build_command(command_name, &prompt), command_name, self.timeout)?;

        if self.verbose {
            let preview: String = response.chars().take(200).collect();
            tracing::debug!("CLI応答: {}", preview);
        }

        Ok(response)
    }
}

/// パイプを別スレッドで読み切る（子プロセスがパイプ詰まりで止まらないように）
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<String> {
    std::thread::spawn(move || {
        let mut buf = String::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_string(&mut buf);
        }
        buf
    })
}

/// コマンドを実行し、標準出力を返す（タイムアウトでkill）
fn run_with_timeout(mut command: Command, command_name: &str, timeout: Duration) -> Result<String> {
    let mut child = command
        .spawn()
        .map_err(|e| SorterError::ApiCall(format!("{} CLI実行エラー: {}", command_name, e)))?;

    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let started = Instant::now();
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if started.elapsed() >= timeout {
            let _ = child.kill();
            let _ = child.wait();
            return Err(SorterError::ApiCall(format!(
                "{} CLIがタイムアウトしました ({}秒)",
                command_name,
                timeout.as_secs()
            )));
        }
        std::thread::sleep(POLL_INTERVAL);
    };

    let response = stdout
        .join()
        .map_err(|_| SorterError::ApiCall("CLI出力の読み取りに失敗".into()))?;
    let errors = stderr.join().unwrap_or_default();

    if !status.success() {
        let tail: String = errors.trim().chars().take(200).collect();
        return Err(SorterError::ApiCall(format!(
            "{} CLI failed (code {:?}): {}",
            command_name,
            status.code(),
            tail
        )));
    }

    Ok(response)
}

impl Oracle for CliOracle {
    fn lookup(&mut self, text: &str, candidates: &[String]) -> Option<String> {
        self.throttle.wait();
        let prompt = build_oracle_prompt(text, candidates);
        match self.run(&prompt) {
            Ok(response) => parse_oracle_answer(&response, candidates),
            Err(e) => {
                tracing::warn!("オラクル呼び出し失敗: {}", e);
                None
            }
        }
    }
}
