//! `nxclaw start` — boot every collaborator, then either run one prompt
//! and exit (`--once`) or serve the HTTP dashboard and tick the
//! autonomous loop until the process is signalled to stop.
//!
//! `--no-slack`/`--no-telegram` are accepted for interface compatibility
//! with the channel-adapter toggles, but since chat channel adapters are
//! external collaborators no adapter process exists here to suppress.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{header, Method};
use nxa_domain::config::Config;
use nxa_runtime::IncomingMessage;
use tower_http::cors::CorsLayer;

use crate::bootstrap;

pub async fn start(config: Config, once: Option<String>, no_slack: bool, no_telegram: bool, no_dashboard: bool) -> anyhow::Result<()> {
    if no_slack {
        tracing::info!("slack adapter suppressed (no adapter is wired up in this build)");
    }
    if no_telegram {
        tracing::info!("telegram adapter suppressed (no adapter is wired up in this build)");
    }

    let dashboard_config = config.dashboard.clone();
    let state = bootstrap::build_app_state(Arc::new(config)).await?;

    if let Some(message) = once {
        let reply = state
            .runtime
            .handle_incoming(IncomingMessage {
                source: "cli".to_string(),
                channel_id: "once".to_string(),
                user_id: "cli".to_string(),
                session_id: None,
                text: message,
            })
            .await;
        println!("{reply}");
        state.runtime.shutdown().await;
        return Ok(());
    }

    let loop_handle = nxa_autonomous::spawn_loop(state.autonomous.clone());

    if no_dashboard {
        tracing::info!("dashboard disabled by --no-dashboard; running the autonomous loop only");
        loop_handle.await?;
        return Ok(());
    }

    let governor_config = std::sync::Arc::new(
        tower_governor::governor::GovernorConfigBuilder::default()
            .per_second(4)
            .burst_size(20)
            .finish()
            .expect("rate limit config: per_second and burst_size must be > 0"),
    );
    let cors_layer = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    let app = crate::api::router(state.clone())
        .layer(cors_layer)
        .layer(tower_governor::GovernorLayer { config: governor_config })
        .with_state(state.clone());
    let addr: SocketAddr = format!("{}:{}", dashboard_config.host, dashboard_config.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "nxclaw dashboard listening");

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;

    state.runtime.shutdown().await;
    Ok(())
}
