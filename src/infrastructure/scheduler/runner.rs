//! Background scheduler for key issuance and rotation
//!
//! A timer task polls the clock and pushes due tasks onto a channel; a
//! worker task drains the channel and runs each task against the
//! [`LifecycleEngine`]. Both stop when the [`SchedulerHandle`] is stopped.

use std::sync::Arc;

use metrics::counter;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, warn};

use crate::domain::{Clock, DomainError};
use crate::infrastructure::access_key::{IssueReport, LifecycleEngine, RotationReport};
use crate::infrastructure::observability::record_pool_size;

use super::schedule::{DueTracker, ScheduleConfig, ScheduledTask};

/// Capacity of the due-task channel
const SIGNAL_BUFFER: usize = 16;

/// What a task run did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskReport {
    Issued(IssueReport),
    Rotated(RotationReport),
}

impl TaskReport {
    /// Keys written by the run
    pub fn inserted(&self) -> usize {
        match self {
            Self::Issued(report) => report.inserted,
            Self::Rotated(report) => report.issued.inserted,
        }
    }

    /// Keys deleted by the run
    pub fn swept(&self) -> u64 {
        match self {
            Self::Issued(_) => 0,
            Self::Rotated(report) => report.swept,
        }
    }
}

/// A due task, optionally with someone waiting for its outcome
#[derive(Debug)]
struct TaskSignal {
    task: ScheduledTask,
    reply: Option<oneshot::Sender<Result<TaskReport, DomainError>>>,
}

/// Runs key tasks on a fixed cadence
#[derive(Debug, Clone)]
pub struct Scheduler {
    engine: Arc<LifecycleEngine>,
    config: ScheduleConfig,
}

impl Scheduler {
    pub fn new(engine: Arc<LifecycleEngine>, config: ScheduleConfig) -> Self {
        Self { engine, config }
    }

    pub fn config(&self) -> &ScheduleConfig {
        &self.config
    }

    /// Startup batch, run before serving traffic so the pool is never empty
    pub async fn bootstrap(&self) -> Result<TaskReport, DomainError> {
        let report = self.issue(self.engine.now()).await?;
        info!(inserted = report.inserted(), "Startup key batch issued");
        Ok(report)
    }

    /// Run one task immediately on the caller's task
    pub async fn run_task(&self, task: ScheduledTask) -> Result<TaskReport, DomainError> {
        let now = self.engine.now();

        match task {
            ScheduledTask::DailyIssue => self.issue(now).await,
            ScheduledTask::Rotation => self
                .engine
                .rotate(self.config.batch_size, now)
                .await
                .map(TaskReport::Rotated),
        }
    }

    async fn issue(&self, now: i64) -> Result<TaskReport, DomainError> {
        if self.config.sweep_before_issue {
            self.engine
                .rotate(self.config.batch_size, now)
                .await
                .map(TaskReport::Rotated)
        } else {
            self.engine
                .issue_batch_at(self.config.batch_size, now)
                .await
                .map(TaskReport::Issued)
        }
    }

    /// Run a task and record the outcome. Failures are logged, never raised.
    async fn execute(&self, task: ScheduledTask) -> Result<TaskReport, DomainError> {
        let result = self.run_task(task).await;

        match &result {
            Ok(report) => {
                counter!("scheduler_task_runs_total", "task" => task.name(), "status" => "ok")
                    .increment(1);
                info!(
                    task = %task,
                    inserted = report.inserted(),
                    swept = report.swept(),
                    "Scheduled task completed"
                );

                if let Ok(stored) = self.engine.stored_count().await {
                    record_pool_size(stored);
                }
            }
            Err(e) => {
                counter!("scheduler_task_runs_total", "task" => task.name(), "status" => "error")
                    .increment(1);
                error!(task = %task, error = %e, "Scheduled task failed");
            }
        }

        result
    }

    /// Spawn the timer and worker tasks on the current runtime
    pub fn start(self) -> SchedulerHandle {
        let (signal_tx, signal_rx) = mpsc::channel(SIGNAL_BUFFER);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let clock = self.engine.clock().clone();
        let tracker = DueTracker::from_config(&self.config, clock.now());

        info!(
            next_daily = tracker.next_daily(),
            next_rotation = tracker.next_rotation(),
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            "Key scheduler started"
        );

        let timer = tokio::spawn(run_timer(
            clock,
            tracker,
            self.config.poll_interval,
            signal_tx.clone(),
            shutdown_rx.clone(),
        ));
        let worker = tokio::spawn(self.run_worker(signal_rx, shutdown_rx));

        SchedulerHandle {
            signals: signal_tx,
            shutdown: shutdown_tx,
            timer,
            worker,
        }
    }

    async fn run_worker(
        self,
        mut signals: mpsc::Receiver<TaskSignal>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                signal = signals.recv() => {
                    let Some(signal) = signal else { break };
                    let result = self.execute(signal.task).await;

                    if let Some(reply) = signal.reply {
                        let _ = reply.send(result);
                    }
                }
            }
        }

        info!("Key scheduler worker stopped");
    }
}

async fn run_timer(
    clock: Arc<dyn Clock>,
    mut tracker: DueTracker,
    poll_interval: std::time::Duration,
    signals: mpsc::Sender<TaskSignal>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = ticker.tick() => {
                for task in tracker.poll(clock.now()) {
                    let signal = TaskSignal { task, reply: None };
                    if signals.send(signal).await.is_err() {
                        return;
                    }
                }
            }
        }
    }

    info!("Key scheduler timer stopped");
}

/// Owner of a running scheduler
#[derive(Debug)]
pub struct SchedulerHandle {
    signals: mpsc::Sender<TaskSignal>,
    shutdown: watch::Sender<bool>,
    timer: JoinHandle<()>,
    worker: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Queue a task behind any due ones and wait for its outcome
    pub async fn fire(&self, task: ScheduledTask) -> Result<TaskReport, DomainError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let signal = TaskSignal {
            task,
            reply: Some(reply_tx),
        };

        self.signals
            .send(signal)
            .await
            .map_err(|_| DomainError::internal("Key scheduler is not running"))?;

        reply_rx
            .await
            .map_err(|_| DomainError::internal("Key scheduler stopped before the task ran"))?
    }

    pub fn is_running(&self) -> bool {
        !self.worker.is_finished()
    }

    /// Signal both loops to exit and wait for them
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);

        for (name, task) in [("timer", self.timer), ("worker", self.worker)] {
            if let Err(e) = task.await {
                warn!(task = name, error = %e, "Key scheduler task ended abnormally");
            }
        }

        info!("Key scheduler stopped");
    }
}
