//! `nxclaw status` — a one-shot snapshot without starting any servers.

use std::sync::Arc;

use nxa_domain::config::Config;

use crate::bootstrap;

pub async fn status(config: Config) -> anyhow::Result<()> {
    let state = bootstrap::build_app_state(Arc::new(config)).await?;
    let runtime_state = state.runtime.get_state(false, 0).await;
    let autonomous = state.autonomous.snapshot();

    println!("authenticated: {}", runtime_state.authenticated);
    println!("queue depth: {}/{}", runtime_state.queue_depth, runtime_state.max_queue_depth);
    println!("lanes: {}", runtime_state.lanes.len());
    println!(
        "tasks: {} running, {} queued, {} schedules",
        runtime_state.task_health.running, runtime_state.task_health.queued, runtime_state.task_health.schedules
    );
    println!(
        "objectives: {} pending, {} in progress",
        runtime_state.objective_stats.pending, runtime_state.objective_stats.in_progress
    );
    println!("autonomous loop: enabled={} running={}", autonomous.enabled, autonomous.running);

    Ok(())
}
