//! `TaskManager` — supervises background command/schedule tasks.
//!
//! A single `Task` entity covers both one-shot commands and recurring
//! schedules (see [`crate::model`]). The manager owns no child process
//! state beyond what's needed to route output, kill signals, and the
//! retry-queue dispatch loop; everything durable lives in the `Task` map,
//! rewritten atomically on a debounce timer.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use nxa_domain::config::{HomeLayout, TasksConfig};
use nxa_eventbus::EventBus;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncBufReadExt;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use crate::model::{
    QueuePreview, RunCommandRequest, ScheduleCommandRequest, Task, TaskError, TaskHealth,
    TaskStatus, TaskType,
};

#[derive(Debug, Default, Serialize, Deserialize)]
struct TaskFile {
    tasks: Vec<Task>,
}

enum ChildOutcome {
    Exited(std::io::Result<std::process::ExitStatus>),
    Killed,
    TimedOut,
}

pub struct TaskManager {
    tasks: RwLock<HashMap<Uuid, Task>>,
    layout: HomeLayout,
    config: TasksConfig,
    events: Option<EventBus>,
    dispatching: AtomicBool,
    persist_tx: mpsc::UnboundedSender<()>,
    kill_txs: Mutex<HashMap<Uuid, mpsc::Sender<()>>>,
    waiters: Mutex<HashMap<Uuid, Vec<oneshot::Sender<()>>>>,
    schedule_timers: Mutex<HashMap<Uuid, tokio::task::JoinHandle<()>>>,
    weak_self: Weak<TaskManager>,
}

impl TaskManager {
    /// Load persisted tasks, recover startup state, and spawn the persist
    /// debounce loop and any schedule timers.
    pub fn spawn(layout: HomeLayout, config: TasksConfig, events: Option<EventBus>) -> Arc<TaskManager> {
        let file: TaskFile = nxa_fsutil::read_json_or_default(&layout.tasks_json()).unwrap_or_default();
        let mut tasks = HashMap::new();
        for mut task in file.tasks {
            match task.task_type {
                TaskType::Schedule => {
                    if !task.status.is_terminal() {
                        task.status = TaskStatus::Running;
                    }
                }
                TaskType::Command => {
                    if !task.status.is_terminal() {
                        task.status = TaskStatus::Queued;
                        task.retry_at = None;
                        task.pid = None;
                        task.touch();
                    }
                }
            }
            tasks.insert(task.id, task);
        }

        let (persist_tx, persist_rx) = mpsc::unbounded_channel();
        let persist_debounce_ms = config.persist_debounce_ms;

        let manager = Arc::new_cyclic(|weak| TaskManager {
            tasks: RwLock::new(tasks),
            layout,
            config,
            events,
            dispatching: AtomicBool::new(false),
            persist_tx,
            kill_txs: Mutex::new(HashMap::new()),
            waiters: Mutex::new(HashMap::new()),
            schedule_timers: Mutex::new(HashMap::new()),
            weak_self: weak.clone(),
        });

        tokio::spawn(run_persist_loop(manager.clone(), persist_rx, persist_debounce_ms));

        let schedule_ids: Vec<Uuid> = manager
            .tasks
            .read()
            .values()
            .filter(|t| t.task_type == TaskType::Schedule && t.status == TaskStatus::Running)
            .map(|t| t.id)
            .collect();
        for id in schedule_ids {
            manager.clone().install_schedule_timer(id);
        }

        manager.clone().dispatch();
        manager
    }

    fn arc(&self) -> Arc<TaskManager> {
        self.weak_self.upgrade().expect("TaskManager dropped while an operation was in flight")
    }

    fn request_persist(&self) {
        let _ = self.persist_tx.send(());
    }

    async fn persist_now(&self) {
        let snapshot: Vec<Task> = self.tasks.read().values().cloned().collect();
        let file = TaskFile { tasks: snapshot };
        if let Err(err) = nxa_fsutil::write_json_atomic_async(self.layout.tasks_json(), &file).await {
            tracing::warn!(error = %err, "failed to persist tasks");
        }
    }

    fn prune_finished(&self) {
        let mut tasks = self.tasks.write();
        let mut finished: Vec<(Uuid, chrono::DateTime<Utc>)> = tasks
            .values()
            .filter(|t| t.task_type == TaskType::Command && t.status.is_terminal())
            .map(|t| (t.id, t.updated_at))
            .collect();
        if finished.len() <= self.config.max_finished_tasks {
            return;
        }
        finished.sort_by(|a, b| b.1.cmp(&a.1));
        for (id, _) in finished.into_iter().skip(self.config.max_finished_tasks) {
            tasks.remove(&id);
        }
    }

    fn emit_event(&self, kind: &str, task_id: Uuid, mut payload: serde_json::Value) {
        let Some(events) = &self.events else { return };
        if let serde_json::Value::Object(map) = &mut payload {
            map.insert("taskId".into(), serde_json::Value::String(task_id.to_string()));
        }
        events.emit(kind.to_string(), payload);
    }

    fn register_waiter(&self, task_id: Uuid) -> oneshot::Receiver<()> {
        let (tx, rx) = oneshot::channel();
        self.waiters.lock().entry(task_id).or_default().push(tx);
        rx
    }

    fn resolve_waiters(&self, task_id: Uuid) {
        if let Some(txs) = self.waiters.lock().remove(&task_id) {
            for tx in txs {
                let _ = tx.send(());
            }
        }
    }

    // ── Public operations ───────────────────────────────────────────

    fn create_command_task(&self, req: &RunCommandRequest, parent_task_id: Option<Uuid>) -> Task {
        let id = Uuid::new_v4();
        let now = Utc::now();
        Task {
            id,
            name: req.name.clone(),
            task_type: TaskType::Command,
            command: req.command.clone(),
            workdir: req.workdir.clone(),
            status: TaskStatus::Queued,
            created_at: now,
            updated_at: now,
            last_run: None,
            next_run: None,
            interval_ms: None,
            parent_task_id,
            exit_code: None,
            pid: None,
            error: None,
            log_path: Some(self.layout.task_log(&id.to_string()).display().to_string()),
            tail: Default::default(),
            attempts: 0,
            max_retries: TasksConfig::clamp_max_retries(req.max_retries),
            retry_delay_ms: TasksConfig::clamp_retry_delay_ms(req.retry_delay_ms),
            timeout_ms: req.timeout_ms,
            background: req.background,
            retry_at: None,
        }
    }

    /// `runCommand`: dedupes against an identical running command when
    /// requested, otherwise queues and dispatches; awaits completion
    /// unless `background` is set.
    pub async fn run_command(&self, req: RunCommandRequest) -> Result<Task, TaskError> {
        if req.command.trim().is_empty() {
            return Err(TaskError::MissingCommand);
        }
        if req.dedupe_running {
            let existing = self
                .tasks
                .read()
                .values()
                .find(|t| t.task_type == TaskType::Command && t.status == TaskStatus::Running && t.command == req.command)
                .cloned();
            if let Some(t) = existing {
                return Ok(t);
            }
        }

        let background = req.background;
        let task = self.create_command_task(&req, None);
        let task_id = task.id;
        self.tasks.write().insert(task_id, task.clone());
        self.request_persist();

        if background {
            self.arc().dispatch();
            return Ok(self.tasks.read().get(&task_id).cloned().unwrap_or(task));
        }

        let waiter = self.register_waiter(task_id);
        self.arc().dispatch();
        let _ = waiter.await;
        Ok(self.tasks.read().get(&task_id).cloned().unwrap_or(task))
    }

    /// `enqueueCommand`: `runCommand` with `background`/`forceQueue` forced.
    pub fn enqueue_command(&self, mut req: RunCommandRequest) -> Result<Task, TaskError> {
        req.background = true;
        if req.command.trim().is_empty() {
            return Err(TaskError::MissingCommand);
        }
        let task = self.create_command_task(&req, None);
        let task_id = task.id;
        self.tasks.write().insert(task_id, task.clone());
        self.request_persist();
        self.arc().dispatch();
        Ok(self.tasks.read().get(&task_id).cloned().unwrap_or(task))
    }

    /// `scheduleCommand`: persists a `running`-sentinel schedule task and
    /// installs its repeating timer.
    pub fn schedule_command(&self, req: ScheduleCommandRequest) -> Result<Task, TaskError> {
        if req.command.trim().is_empty() {
            return Err(TaskError::MissingCommand);
        }
        if req.interval_ms < 1000 {
            return Err(TaskError::BadInterval);
        }

        let id = Uuid::new_v4();
        let now = Utc::now();
        let task = Task {
            id,
            name: req.name,
            task_type: TaskType::Schedule,
            command: req.command,
            workdir: req.workdir,
            status: TaskStatus::Running,
            created_at: now,
            updated_at: now,
            last_run: None,
            next_run: Some(now + ChronoDuration::milliseconds(req.interval_ms as i64)),
            interval_ms: Some(req.interval_ms),
            parent_task_id: None,
            exit_code: None,
            pid: None,
            error: None,
            log_path: None,
            tail: Default::default(),
            attempts: 0,
            max_retries: TasksConfig::clamp_max_retries(req.max_retries),
            retry_delay_ms: TasksConfig::clamp_retry_delay_ms(req.retry_delay_ms),
            timeout_ms: req.timeout_ms,
            background: true,
            retry_at: None,
        };
        self.tasks.write().insert(id, task.clone());
        self.request_persist();
        self.arc().install_schedule_timer(id);
        Ok(task)
    }

    /// `stop`: clears any schedule timer, removes the task from queue
    /// consideration, sends a terminate signal to its child if running,
    /// and marks it `stopped` (terminal, preserved by the retry path).
    pub fn stop(&self, task_id: Uuid) -> bool {
        let applied = {
            let mut tasks = self.tasks.write();
            match tasks.get_mut(&task_id) {
                Some(t) if !t.status.is_terminal() => {
                    t.status = TaskStatus::Stopped;
                    t.touch();
                    true
                }
                _ => false,
            }
        };
        if !applied {
            return false;
        }
        if let Some(tx) = self.kill_txs.lock().remove(&task_id) {
            let _ = tx.try_send(());
        }
        if let Some(handle) = self.schedule_timers.lock().remove(&task_id) {
            handle.abort();
        }
        self.request_persist();
        self.emit_event("end", task_id, serde_json::json!({"reason": "stopped"}));
        true
    }

    /// `tail`: log-file tail, falling back to the in-memory buffer when
    /// the file is absent.
    pub fn tail(&self, task_id: Uuid, lines: usize) -> Option<String> {
        let lines = lines.clamp(1, 500);
        let log_path = self.tasks.read().get(&task_id)?.log_path.clone();

        if let Some(path) = log_path {
            if let Ok(text) = std::fs::read_to_string(&path) {
                let all: Vec<&str> = text.lines().collect();
                let start = all.len().saturating_sub(lines);
                return Some(all[start..].join("\n"));
            }
        }

        let tasks = self.tasks.read();
        let t = tasks.get(&task_id)?;
        let start = t.tail.len().saturating_sub(lines);
        Some(t.tail.iter().skip(start).cloned().collect::<Vec<_>>().join("\n"))
    }

    /// `list`: snapshot sorted by `updatedAt` desc.
    pub fn list(&self, include_finished: bool) -> Vec<Task> {
        let mut out: Vec<Task> = self
            .tasks
            .read()
            .values()
            .filter(|t| include_finished || !t.status.is_terminal())
            .cloned()
            .collect();
        out.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        out
    }

    pub fn get_health(&self) -> TaskHealth {
        let tasks = self.tasks.read();
        TaskHealth {
            running: tasks.values().filter(|t| t.task_type == TaskType::Command && t.status == TaskStatus::Running).count(),
            queued: tasks.values().filter(|t| t.task_type == TaskType::Command && t.status == TaskStatus::Queued).count(),
            schedules: tasks.values().filter(|t| t.task_type == TaskType::Schedule && t.status == TaskStatus::Running).count(),
            finished: tasks.values().filter(|t| t.task_type == TaskType::Command && t.status.is_terminal()).count(),
            max_concurrent: self.config.max_concurrent_processes,
        }
    }

    pub fn get_queue_snapshot(&self, limit: usize) -> QueuePreview {
        let tasks = self.tasks.read();
        let mut queued: Vec<&Task> = tasks
            .values()
            .filter(|t| t.task_type == TaskType::Command && t.status == TaskStatus::Queued)
            .collect();
        queued.sort_by_key(|t| t.retry_at.unwrap_or(t.created_at));
        let depth = queued.len();
        let preview = queued.into_iter().take(limit).map(|t| t.id).collect();
        QueuePreview { depth, preview }
    }

    // ── Schedule timers ──────────────────────────────────────────────

    fn install_schedule_timer(self: Arc<Self>, schedule_id: Uuid) {
        let interval_ms = self.tasks.read().get(&schedule_id).and_then(|t| t.interval_ms);
        let Some(interval_ms) = interval_ms else { return };

        let manager = self.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_millis(interval_ms.max(1000)));
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            ticker.tick().await; // first tick fires immediately; skip it
            loop {
                ticker.tick().await;
                let still_running = manager
                    .tasks
                    .read()
                    .get(&schedule_id)
                    .map(|t| t.status == TaskStatus::Running)
                    .unwrap_or(false);
                if !still_running {
                    break;
                }
                manager.clone().spawn_schedule_tick(schedule_id);
            }
        });
        self.schedule_timers.lock().insert(schedule_id, handle);
    }

    fn spawn_schedule_tick(self: Arc<Self>, schedule_id: Uuid) {
        let child_id = Uuid::new_v4();
        {
            let mut tasks = self.tasks.write();
            let Some(sched) = tasks.get(&schedule_id).cloned() else { return };
            let now = Utc::now();
            let child = Task {
                id: child_id,
                name: sched.name.clone(),
                task_type: TaskType::Command,
                command: sched.command.clone(),
                workdir: sched.workdir.clone(),
                status: TaskStatus::Queued,
                created_at: now,
                updated_at: now,
                last_run: None,
                next_run: None,
                interval_ms: None,
                parent_task_id: Some(schedule_id),
                exit_code: None,
                pid: None,
                error: None,
                log_path: Some(self.layout.task_log(&child_id.to_string()).display().to_string()),
                tail: Default::default(),
                attempts: 0,
                max_retries: sched.max_retries,
                retry_delay_ms: sched.retry_delay_ms,
                timeout_ms: sched.timeout_ms,
                background: true,
                retry_at: None,
            };
            tasks.insert(child_id, child);
            if let Some(s) = tasks.get_mut(&schedule_id) {
                s.last_run = Some(now);
                s.next_run = Some(now + ChronoDuration::milliseconds(sched.interval_ms.unwrap_or(0) as i64));
                s.touch();
            }
        }
        self.request_persist();
        self.dispatch();
    }

    // ── Dispatch loop ────────────────────────────────────────────────

    fn dispatch(self: Arc<Self>) {
        if self.dispatching.swap(true, Ordering::SeqCst) {
            return;
        }
        tokio::spawn(async move {
            self.dispatch_inner().await;
            self.dispatching.store(false, Ordering::SeqCst);
        });
    }

    async fn dispatch_inner(self: Arc<Self>) {
        loop {
            let running_count = self
                .tasks
                .read()
                .values()
                .filter(|t| t.task_type == TaskType::Command && t.status == TaskStatus::Running)
                .count();
            if running_count >= self.config.max_concurrent_processes {
                break;
            }

            let now = Utc::now();
            let next = {
                let tasks = self.tasks.read();
                tasks
                    .values()
                    .filter(|t| {
                        t.task_type == TaskType::Command
                            && t.status == TaskStatus::Queued
                            && t.retry_at.map(|r| r <= now).unwrap_or(true)
                    })
                    .min_by_key(|t| t.retry_at.unwrap_or(t.created_at))
                    .map(|t| t.id)
            };
            let Some(task_id) = next else { break };

            {
                let mut tasks = self.tasks.write();
                if let Some(t) = tasks.get_mut(&task_id) {
                    t.status = TaskStatus::Running;
                    t.attempts += 1;
                    t.last_run = Some(Utc::now());
                    t.retry_at = None;
                    t.touch();
                }
            }
            self.request_persist();

            let manager = self.clone();
            tokio::spawn(async move { manager.run_child(task_id).await });
        }

        let wake_at = self
            .tasks
            .read()
            .values()
            .filter(|t| t.task_type == TaskType::Command && t.status == TaskStatus::Queued)
            .filter_map(|t| t.retry_at)
            .min();
        if let Some(at) = wake_at {
            let manager = self.clone();
            let delay = (at - Utc::now()).to_std().unwrap_or(Duration::from_millis(0));
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                manager.dispatch();
            });
        }
    }

    // ── Launch protocol ──────────────────────────────────────────────

    async fn run_child(self: Arc<Self>, task_id: Uuid) {
        let (command, workdir, timeout_ms, log_path) = {
            let tasks = self.tasks.read();
            let Some(t) = tasks.get(&task_id) else { return };
            (t.command.clone(), t.workdir.clone(), t.timeout_ms, t.log_path.clone())
        };

        self.emit_event("start", task_id, serde_json::json!({"command": command}));

        let mut cmd = tokio::process::Command::new("sh");
        cmd.arg("-c").arg(&command);
        cmd.stdout(std::process::Stdio::piped());
        cmd.stderr(std::process::Stdio::piped());
        if let Some(wd) = &workdir {
            cmd.current_dir(wd);
        }

        let mut child = match cmd.spawn() {
            Ok(c) => c,
            Err(e) => {
                self.finish_failed(task_id, None, format!("failed to spawn: {e}"));
                return;
            }
        };

        let pid = child.id();
        if let Some(t) = self.tasks.write().get_mut(&task_id) {
            t.pid = pid;
        }

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let (kill_tx, mut kill_rx) = mpsc::channel::<()>(1);
        self.kill_txs.lock().insert(task_id, kill_tx);

        let manager_out = self.clone();
        let log_out = log_path.clone();
        let stdout_task = tokio::spawn(async move {
            if let Some(stdout) = stdout {
                let mut reader = tokio::io::BufReader::new(stdout).lines();
                while let Ok(Some(line)) = reader.next_line().await {
                    manager_out.record_output_line(task_id, &line, log_out.as_deref());
                }
            }
        });
        let manager_err = self.clone();
        let log_err = log_path.clone();
        let stderr_task = tokio::spawn(async move {
            if let Some(stderr) = stderr {
                let mut reader = tokio::io::BufReader::new(stderr).lines();
                while let Ok(Some(line)) = reader.next_line().await {
                    manager_err.record_output_line(task_id, &line, log_err.as_deref());
                }
            }
        });

        let timeout_dur = Duration::from_millis(timeout_ms.max(1));
        let outcome = tokio::select! {
            result = child.wait() => ChildOutcome::Exited(result),
            _ = kill_rx.recv() => {
                let _ = child.kill().await;
                ChildOutcome::Killed
            }
            _ = tokio::time::sleep(timeout_dur) => {
                let _ = child.kill().await;
                ChildOutcome::TimedOut
            }
        };
        let _ = stdout_task.await;
        let _ = stderr_task.await;
        self.kill_txs.lock().remove(&task_id);

        match outcome {
            ChildOutcome::Exited(Ok(status)) if status.code() == Some(0) => {
                self.finish_completed(task_id, status.code());
            }
            ChildOutcome::Exited(Ok(status)) => {
                let code = status.code();
                self.maybe_retry_or_fail(task_id, code, format!("exited with code {}", code.unwrap_or(-1)));
            }
            ChildOutcome::Exited(Err(e)) => {
                self.maybe_retry_or_fail(task_id, None, format!("wait failed: {e}"));
            }
            ChildOutcome::TimedOut => {
                self.maybe_retry_or_fail(task_id, None, "timed out".to_string());
            }
            ChildOutcome::Killed => {
                self.finish_after_stop(task_id);
            }
        }
    }

    fn record_output_line(&self, task_id: Uuid, line: &str, log_path: Option<&str>) {
        if let Some(t) = self.tasks.write().get_mut(&task_id) {
            t.push_tail_line(line.to_string(), self.config.tail_lines);
        }
        if let Some(path) = log_path {
            if let Err(err) = append_log_line(std::path::Path::new(path), line) {
                tracing::warn!(error = %err, "failed to append task log line");
            }
        }
        self.emit_event("output", task_id, serde_json::json!({"line": line}));
    }

    fn finish_completed(&self, task_id: Uuid, exit_code: Option<i32>) {
        if let Some(t) = self.tasks.write().get_mut(&task_id) {
            t.status = TaskStatus::Completed;
            t.exit_code = exit_code;
            t.error = None;
            t.pid = None;
            t.touch();
        }
        self.request_persist();
        self.prune_finished();
        self.resolve_waiters(task_id);
        self.emit_event("end", task_id, serde_json::json!({}));
    }

    fn finish_failed(&self, task_id: Uuid, exit_code: Option<i32>, error: String) {
        if let Some(t) = self.tasks.write().get_mut(&task_id) {
            t.status = TaskStatus::Failed;
            t.exit_code = exit_code;
            t.error = Some(error);
            t.pid = None;
            t.touch();
        }
        self.request_persist();
        self.prune_finished();
        self.resolve_waiters(task_id);
        self.emit_event("end", task_id, serde_json::json!({}));
    }

    fn finish_after_stop(&self, task_id: Uuid) {
        if let Some(t) = self.tasks.write().get_mut(&task_id) {
            t.pid = None;
            t.touch();
        }
        self.request_persist();
        self.prune_finished();
        self.resolve_waiters(task_id);
    }

    fn maybe_retry_or_fail(&self, task_id: Uuid, exit_code: Option<i32>, error: String) {
        let (attempts, max_retries, retry_delay_ms, already_stopped) = {
            let tasks = self.tasks.read();
            match tasks.get(&task_id) {
                Some(t) => (t.attempts, t.max_retries, t.retry_delay_ms, t.status == TaskStatus::Stopped),
                None => return,
            }
        };
        if already_stopped {
            self.finish_after_stop(task_id);
            return;
        }
        if attempts <= max_retries {
            let retry_at = Utc::now() + ChronoDuration::milliseconds(retry_delay_ms.max(250) as i64);
            if let Some(t) = self.tasks.write().get_mut(&task_id) {
                t.status = TaskStatus::Queued;
                t.exit_code = exit_code;
                t.error = Some(error.clone());
                t.pid = None;
                t.retry_at = Some(retry_at);
                t.touch();
            }
            self.request_persist();
            self.emit_event("retry", task_id, serde_json::json!({"retryAt": retry_at, "error": error}));

            let manager = self.arc();
            let delay = (retry_at - Utc::now()).to_std().unwrap_or(Duration::from_millis(0));
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                manager.dispatch();
            });
        } else {
            self.finish_failed(task_id, exit_code, error);
        }
    }
}

fn append_log_line(path: &std::path::Path, line: &str) -> std::io::Result<()> {
    use std::io::Write;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{line}")
}

async fn run_persist_loop(manager: Arc<TaskManager>, mut rx: mpsc::UnboundedReceiver<()>, debounce_ms: u64) {
    let debounce = Duration::from_millis(debounce_ms);
    loop {
        let Some(()) = rx.recv().await else { break };
        tokio::time::sleep(debounce).await;
        while rx.try_recv().is_ok() {}
        manager.persist_now().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RunCommandRequest;

    fn request(command: &str) -> RunCommandRequest {
        RunCommandRequest {
            command: command.to_string(),
            name: None,
            workdir: None,
            background: false,
            dedupe_running: false,
            max_retries: 0,
            retry_delay_ms: 250,
            timeout_ms: 5_000,
        }
    }

    #[tokio::test]
    async fn run_command_rejects_empty_command() {
        let dir = tempfile::tempdir().unwrap();
        let manager = TaskManager::spawn(HomeLayout::new(dir.path()), TasksConfig::default(), None);
        let result = manager.run_command(request("")).await;
        assert!(matches!(result, Err(TaskError::MissingCommand)));
    }

    #[tokio::test]
    async fn run_command_foreground_completes_successfully() {
        let dir = tempfile::tempdir().unwrap();
        let manager = TaskManager::spawn(HomeLayout::new(dir.path()), TasksConfig::default(), None);
        let task = manager.run_command(request("exit 0")).await.unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.exit_code, Some(0));
    }

    #[tokio::test]
    async fn run_command_retries_then_fails() {
        let dir = tempfile::tempdir().unwrap();
        let manager = TaskManager::spawn(HomeLayout::new(dir.path()), TasksConfig::default(), None);
        let mut req = request("exit 7");
        req.max_retries = 2;
        req.retry_delay_ms = 250;

        let task = manager.run_command(req).await.unwrap();
        // The foreground waiter only resolves on the *first* terminal
        // transition of this task id; poll list() until truly terminal.
        let mut final_task = task;
        for _ in 0..50 {
            if final_task.status.is_terminal() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
            if let Some(t) = manager.list(true).into_iter().find(|t| t.id == final_task.id) {
                final_task = t;
            }
        }
        assert_eq!(final_task.status, TaskStatus::Failed);
        assert_eq!(final_task.attempts, 3);
        assert_eq!(final_task.exit_code, Some(7));
    }

    #[tokio::test]
    async fn schedule_command_rejects_short_interval() {
        let dir = tempfile::tempdir().unwrap();
        let manager = TaskManager::spawn(HomeLayout::new(dir.path()), TasksConfig::default(), None);
        let result = manager.schedule_command(ScheduleCommandRequest {
            command: "echo hi".into(),
            name: None,
            workdir: None,
            interval_ms: 500,
            max_retries: 0,
            retry_delay_ms: 250,
            timeout_ms: 5_000,
        });
        assert!(matches!(result, Err(TaskError::BadInterval)));
    }

    #[tokio::test]
    async fn stop_marks_queued_task_stopped_without_launch() {
        let dir = tempfile::tempdir().unwrap();
        let config = TasksConfig {
            max_concurrent_processes: 0,
            ..TasksConfig::default()
        };
        let manager = TaskManager::spawn(HomeLayout::new(dir.path()), config, None);
        let task = manager.enqueue_command(request("echo hi")).unwrap();
        assert_eq!(task.status, TaskStatus::Queued);

        let stopped = manager.stop(task.id);
        assert!(stopped);
        let found = manager.list(true).into_iter().find(|t| t.id == task.id).unwrap();
        assert_eq!(found.status, TaskStatus::Stopped);
    }

    #[tokio::test]
    async fn dedupe_running_returns_existing_task() {
        let dir = tempfile::tempdir().unwrap();
        let manager = TaskManager::spawn(HomeLayout::new(dir.path()), TasksConfig::default(), None);
        let mut req = request("sleep 1");
        req.background = true;
        req.dedupe_running = true;
        let first = manager.run_command(req.clone()).await.unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        let second = manager.run_command(req).await.unwrap();
        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn queue_snapshot_orders_by_retry_at_then_created_at() {
        let dir = tempfile::tempdir().unwrap();
        let config = TasksConfig {
            max_concurrent_processes: 0,
            ..TasksConfig::default()
        };
        let manager = TaskManager::spawn(HomeLayout::new(dir.path()), config, None);
        manager.enqueue_command(request("echo one")).unwrap();
        manager.enqueue_command(request("echo two")).unwrap();

        let snapshot = manager.get_queue_snapshot(10);
        assert_eq!(snapshot.depth, 2);
        assert_eq!(snapshot.preview.len(), 2);
    }
}
