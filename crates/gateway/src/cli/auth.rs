//! `nxclaw auth` — record or check provider authentication.
//!
//! Authentication itself happens out of band (the provider CLI's own
//! device-code or API-key flow); this command only records the result
//! into `<home>/agent/auth.json`, the file [`crate::auth_provider::FileAuthProvider`]
//! treats as the authentication signal.

use nxa_domain::config::Config;

pub async fn auth(config: Config, provider: Option<String>, status_only: bool) -> anyhow::Result<()> {
    let layout = config.layout();
    let auth_json = layout.auth_json();

    if status_only {
        let authenticated = tokio::fs::metadata(&auth_json).await.map(|m| m.len() > 0).unwrap_or(false);
        println!("authenticated: {authenticated}");
        return Ok(());
    }

    let provider = provider.unwrap_or_else(|| format!("{:?}", config.llm.default_provider));
    let record = serde_json::json!({ "provider": provider, "recordedAt": chrono::Utc::now() });
    nxa_fsutil::write_json_atomic(&auth_json, &record)?;
    println!("recorded authentication for provider: {provider}");
    Ok(())
}
