use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Default LLM credential family / model selection.
//
// The LLM client library itself is an external collaborator (assumed to
// expose `session.prompt(text)`); this config only records *which*
// provider/model the orchestrator should ask the session factory for.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderFamily {
    GeminiCli,
    OpenaiCodex,
    Anthropic,
}

impl Default for ProviderFamily {
    fn default() -> Self {
        Self::Anthropic
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LlmConfig {
    #[serde(default)]
    pub default_provider: ProviderFamily,
    /// `provider/model` override, e.g. `"anthropic/claude-opus"`.
    #[serde(default)]
    pub default_model: Option<String>,
}
