//! The concrete [`AgentSession`] bound to the orchestrator's
//! `session_factory`: shells out to the configured provider's CLI, one
//! child process per prompt, mirroring [`nxa_tasks`]'s own
//! spawn-piped-stdio approach rather than inventing a second way to run
//! a child process.

use std::process::Stdio;

use async_trait::async_trait;
use nxa_domain::config::ProviderFamily;
use nxa_domain::error::{Error, Result};
use nxa_sessions::AgentSession;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// One provider CLI invocation per `prompt` call. No history of its own —
/// `compact_history` keeps the trait default of `Ok(false)`, so context
/// overflow recovery always falls through to memory-level compaction.
pub struct ProcessSession {
    binary: String,
    model: Option<String>,
}

impl ProcessSession {
    pub fn new(provider: ProviderFamily, model: Option<String>) -> Self {
        Self {
            binary: provider_binary(provider).to_string(),
            model,
        }
    }
}

fn provider_binary(provider: ProviderFamily) -> &'static str {
    match provider {
        ProviderFamily::GeminiCli => "gemini",
        ProviderFamily::OpenaiCodex => "codex",
        ProviderFamily::Anthropic => "claude",
    }
}

#[async_trait]
impl AgentSession for ProcessSession {
    async fn prompt(&self, text: &str) -> Result<String> {
        let mut command = Command::new(&self.binary);
        command.arg("-p").stdin(Stdio::piped()).stdout(Stdio::piped()).stderr(Stdio::piped());
        if let Some(model) = &self.model {
            command.arg("--model").arg(model);
        }

        let mut child = command
            .spawn()
            .map_err(|e| Error::Other(format!("failed to launch {}: {e}", self.binary)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(text.as_bytes())
                .await
                .map_err(|e| Error::Other(format!("failed to write prompt: {e}")))?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| Error::Other(format!("{} exited abnormally: {e}", self.binary)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Other(format!("{} failed: {stderr}", self.binary)));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_expected_binary_per_provider() {
        assert_eq!(provider_binary(ProviderFamily::Anthropic), "claude");
        assert_eq!(provider_binary(ProviderFamily::GeminiCli), "gemini");
        assert_eq!(provider_binary(ProviderFamily::OpenaiCodex), "codex");
    }
}
