//! Periodic and on-demand pipeline runs.
//!
//! One controller task owns all scheduler state and is driven only by [`Command`]s sent through a
//! [`SchedulerHandle`]. Every run, scheduled or manual, must take the single-run gate first, so two
//! runs never overlap. Each run executes in its own task; a panic inside it is caught at the join
//! handle and reported as a failed run.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, OwnedMutexGuard, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};

use crate::errors::Error;
use crate::run::{Pipeline, RunReport};

pub const RUN_IN_PROGRESS: &str = "A pipeline run is already in progress";

/// Anything the scheduler can run.
#[async_trait]
pub trait PipelineRunner: Send + Sync + 'static {
    async fn run_pipeline(&self) -> RunReport;
}

#[async_trait]
impl PipelineRunner for Pipeline {
    async fn run_pipeline(&self) -> RunReport {
        self.run().await
    }
}

/// Read-only view of the scheduler, as served by the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerSnapshot {
    pub running: bool,
    pub interval_minutes: u64,
    pub last_run: Option<DateTime<Utc>>,
    pub next_run: Option<DateTime<Utc>>,
    pub checks_today: u64,
    pub changes_detected: u64,
    pub run_in_progress: bool,
}

/// Per-day run counters. They reset the first time they are touched on a new local day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyCounters {
    day: NaiveDate,
    pub checks_today: u64,
    pub changes_detected: u64,
}

impl DailyCounters {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            day: today,
            checks_today: 0,
            changes_detected: 0,
        }
    }

    pub fn roll(&mut self, today: NaiveDate) {
        if today != self.day {
            *self = Self::new(today);
        }
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

enum Command {
    Start,
    Stop,
    TriggerNow(oneshot::Sender<RunReport>),
    UpdateInterval(Duration),
    Snapshot(oneshot::Sender<SchedulerSnapshot>),
}

/// Sent by a run's watcher task once the run is over.
struct RunFinished {
    report: RunReport,
    reply: Option<oneshot::Sender<RunReport>>,
}

/// Cloneable remote control for the scheduler controller task.
#[derive(Clone)]
pub struct SchedulerHandle {
    commands: mpsc::Sender<Command>,
}

impl SchedulerHandle {
    pub async fn start(&self) -> Result<(), Error> {
        self.send(Command::Start).await
    }

    pub async fn stop(&self) -> Result<(), Error> {
        self.send(Command::Stop).await
    }

    pub async fn update_interval(&self, minutes: u64) -> Result<(), Error> {
        self.send(Command::UpdateInterval(minutes_to_duration(minutes))).await
    }

    /// Runs the pipeline now and waits for its report.
    /// Fails fast with [`RUN_IN_PROGRESS`] when another run holds the gate.
    pub async fn trigger_now(&self) -> Result<RunReport, Error> {
        let (reply, response) = oneshot::channel();
        self.send(Command::TriggerNow(reply)).await?;
        response.await.map_err(|_| Error::SchedulerUnavailable)
    }

    pub async fn snapshot(&self) -> Result<SchedulerSnapshot, Error> {
        let (reply, response) = oneshot::channel();
        self.send(Command::Snapshot(reply)).await?;
        response.await.map_err(|_| Error::SchedulerUnavailable)
    }

    async fn send(&self, command: Command) -> Result<(), Error> {
        self.commands.send(command).await.map_err(|_| Error::SchedulerUnavailable)
    }
}

fn minutes_to_duration(minutes: u64) -> Duration {
    Duration::from_secs(minutes.max(1).saturating_mul(60))
}

pub struct Scheduler {
    runner: Arc<dyn PipelineRunner>,
    gate: Arc<Mutex<()>>,
    interval: Duration,
    running: bool,
    next_tick: Option<Instant>,
    next_run: Option<DateTime<Utc>>,
    last_run: Option<DateTime<Utc>>,
    counters: DailyCounters,
    finished_tx: mpsc::UnboundedSender<RunFinished>,
}

impl Scheduler {
    /// Spawns the controller task. The scheduler starts ticking right away when `enabled`;
    /// the first scheduled run happens one interval later.
    pub fn spawn(runner: Arc<dyn PipelineRunner>, interval_minutes: u64, enabled: bool) -> (SchedulerHandle, JoinHandle<()>) {
        Self::spawn_with_period(runner, minutes_to_duration(interval_minutes), enabled)
    }

    /// Same as [`Scheduler::spawn`] with an arbitrary period.
    pub fn spawn_with_period(runner: Arc<dyn PipelineRunner>, interval: Duration, enabled: bool) -> (SchedulerHandle, JoinHandle<()>) {
        let (commands, command_rx) = mpsc::channel(32);
        let (finished_tx, finished_rx) = mpsc::unbounded_channel();
        let mut scheduler = Scheduler {
            runner,
            gate: Arc::new(Mutex::new(())),
            interval,
            running: false,
            next_tick: None,
            next_run: None,
            last_run: None,
            counters: DailyCounters::new(today()),
            finished_tx,
        };
        if enabled {
            scheduler.start();
        }
        let task = tokio::spawn(scheduler.control_loop(command_rx, finished_rx));
        (SchedulerHandle { commands }, task)
    }

    /// Exits once every [`SchedulerHandle`] is dropped.
    async fn control_loop(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut finished: mpsc::UnboundedReceiver<RunFinished>,
    ) {
        loop {
            let tick = self.next_tick;
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.handle(command),
                    None => break,
                },
                Some(done) = finished.recv() => self.finish_run(done),
                _ = sleep_until(tick.unwrap_or_else(Instant::now)), if tick.is_some() => self.tick(),
            }
        }
        tracing::info!("Scheduler controller stopped");
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Start => self.start(),
            Command::Stop => self.stop(),
            Command::TriggerNow(reply) => match self.gate.clone().try_lock_owned() {
                Ok(guard) => self.begin_run(guard, Some(reply)),
                Err(_) => {
                    tracing::warn!("Manual run rejected: {}", RUN_IN_PROGRESS);
                    let _ = reply.send(RunReport::failure(RUN_IN_PROGRESS));
                }
            },
            Command::UpdateInterval(interval) => {
                self.interval = interval;
                tracing::info!("Scheduler interval set to {} minutes", interval.as_secs() / 60);
                if self.running {
                    self.schedule_next();
                }
            }
            Command::Snapshot(reply) => {
                let _ = reply.send(self.snapshot());
            }
        }
    }

    fn start(&mut self) {
        if self.running {
            return;
        }
        self.running = true;
        self.schedule_next();
        tracing::info!("Scheduler started: running every {} minutes", self.interval.as_secs() / 60);
    }

    fn stop(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;
        self.next_tick = None;
        self.next_run = None;
        tracing::info!("Scheduler stopped");
    }

    fn schedule_next(&mut self) {
        self.next_tick = Some(Instant::now() + self.interval);
        self.next_run = chrono::Duration::from_std(self.interval)
            .ok()
            .map(|interval| Utc::now() + interval);
    }

    fn tick(&mut self) {
        self.schedule_next();
        match self.gate.clone().try_lock_owned() {
            Ok(guard) => self.begin_run(guard, None),
            Err(_) => tracing::warn!("Skipping scheduled run: {}", RUN_IN_PROGRESS),
        }
    }

    /// Runs the pipeline in its own task while `guard` holds the gate.
    fn begin_run(&mut self, guard: OwnedMutexGuard<()>, reply: Option<oneshot::Sender<RunReport>>) {
        self.counters.roll(today());
        self.counters.checks_today += 1;

        let runner = self.runner.clone();
        let finished = self.finished_tx.clone();
        tokio::spawn(async move {
            let run = tokio::spawn(async move { runner.run_pipeline().await });
            let report = match run.await {
                Ok(report) => report,
                Err(e) if e.is_panic() => {
                    tracing::error!("Pipeline run panicked: {}", e);
                    RunReport::failure("Pipeline run panicked")
                }
                Err(e) => {
                    tracing::error!("Pipeline run was cancelled: {}", e);
                    RunReport::failure("Pipeline run was cancelled")
                }
            };
            drop(guard);
            let _ = finished.send(RunFinished { report, reply });
        });
    }

    fn finish_run(&mut self, done: RunFinished) {
        self.last_run = Some(Utc::now());
        self.counters.roll(today());
        self.counters.changes_detected += done.report.new_jobs as u64;
        if let Some(reply) = done.reply {
            let _ = reply.send(done.report);
        }
    }

    fn snapshot(&mut self) -> SchedulerSnapshot {
        self.counters.roll(today());
        SchedulerSnapshot {
            running: self.running,
            interval_minutes: self.interval.as_secs() / 60,
            last_run: self.last_run,
            next_run: self.next_run,
            checks_today: self.counters.checks_today,
            changes_detected: self.counters.changes_detected,
            run_in_progress: self.gate.try_lock().is_err(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use tokio::sync::Notify;

    /// Counts runs; each run waits for `release` when one is given.
    struct StubRunner {
        runs: AtomicUsize,
        new_jobs: usize,
        release: Option<Arc<Notify>>,
        panics: bool,
    }

    impl StubRunner {
        fn new(new_jobs: usize) -> Arc<Self> {
            Arc::new(Self {
                runs: AtomicUsize::new(0),
                new_jobs,
                release: None,
                panics: false,
            })
        }

        fn blocking(release: Arc<Notify>) -> Arc<Self> {
            Arc::new(Self {
                runs: AtomicUsize::new(0),
                new_jobs: 1,
                release: Some(release),
                panics: false,
            })
        }

        fn panicking() -> Arc<Self> {
            Arc::new(Self {
                runs: AtomicUsize::new(0),
                new_jobs: 0,
                release: None,
                panics: true,
            })
        }

        fn runs(&self) -> usize {
            self.runs.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PipelineRunner for StubRunner {
        async fn run_pipeline(&self) -> RunReport {
            self.runs.fetch_add(1, Ordering::SeqCst);
            if let Some(release) = &self.release {
                release.notified().await;
            }
            if self.panics {
                panic!("boom");
            }
            RunReport {
                success: true,
                message: format!("Found {} new jobs", self.new_jobs),
                new_jobs: self.new_jobs,
                total_parsed: self.new_jobs,
                sources_checked: 1,
                sources_successful: 1,
            }
        }
    }

    #[test]
    fn test_daily_counters_reset_on_new_day() {
        let monday = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap();
        let tuesday = NaiveDate::from_ymd_opt(2025, 3, 4).unwrap();

        let mut counters = DailyCounters::new(monday);
        counters.checks_today = 4;
        counters.changes_detected = 2;

        counters.roll(monday);
        assert_eq!(counters.checks_today, 4);

        counters.roll(tuesday);
        assert_eq!(counters.checks_today, 0);
        assert_eq!(counters.changes_detected, 0);
    }

    #[test]
    fn test_interval_minutes_floor_at_one() {
        assert_eq!(minutes_to_duration(0), Duration::from_secs(60));
        assert_eq!(minutes_to_duration(15), Duration::from_secs(900));
    }

    #[tokio::test]
    async fn test_trigger_now_updates_counters() {
        let runner = StubRunner::new(2);
        let (handle, _task) = Scheduler::spawn(runner.clone(), 60, false);

        let report = handle.trigger_now().await.unwrap();
        assert!(report.success);
        assert_eq!(report.new_jobs, 2);

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.checks_today, 1);
        assert_eq!(snapshot.changes_detected, 2);
        assert!(snapshot.last_run.is_some());
        assert!(!snapshot.running);
        assert!(!snapshot.run_in_progress);
        assert_eq!(runner.runs(), 1);
    }

    #[tokio::test]
    async fn test_second_manual_trigger_is_rejected_while_running() {
        let release = Arc::new(Notify::new());
        let runner = StubRunner::blocking(release.clone());
        let (handle, _task) = Scheduler::spawn(runner.clone(), 60, false);

        let first = tokio::spawn({
            let handle = handle.clone();
            async move { handle.trigger_now().await }
        });
        while runner.runs() == 0 {
            tokio::task::yield_now().await;
        }

        let second = handle.trigger_now().await.unwrap();
        assert!(!second.success);
        assert_eq!(second.message, RUN_IN_PROGRESS);
        assert!(handle.snapshot().await.unwrap().run_in_progress);

        release.notify_one();
        let first = first.await.unwrap().unwrap();
        assert!(first.success);
        assert_eq!(runner.runs(), 1);
    }

    #[tokio::test]
    async fn test_panicking_run_is_reported_and_gate_released() {
        let runner = StubRunner::panicking();
        let (handle, _task) = Scheduler::spawn(runner.clone(), 60, false);

        let report = handle.trigger_now().await.unwrap();
        assert!(!report.success);
        assert_eq!(report.message, "Pipeline run panicked");

        let again = handle.trigger_now().await.unwrap();
        assert_eq!(again.message, "Pipeline run panicked");
        assert_eq!(runner.runs(), 2);
    }

    #[tokio::test]
    async fn test_scheduled_ticks_run_the_pipeline() {
        let runner = StubRunner::new(0);
        let (handle, _task) = Scheduler::spawn_with_period(runner.clone(), Duration::from_millis(20), true);

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(runner.runs() >= 2, "expected repeated runs, got {}", runner.runs());

        handle.stop().await.unwrap();
        let snapshot = handle.snapshot().await.unwrap();
        assert!(!snapshot.running);
        assert_eq!(snapshot.next_run, None);
    }

    #[tokio::test]
    async fn test_start_stop_and_interval_update() {
        let (handle, _task) = Scheduler::spawn(StubRunner::new(0), 60, false);
        assert_eq!(handle.snapshot().await.unwrap().next_run, None);

        handle.start().await.unwrap();
        handle.update_interval(15).await.unwrap();
        let snapshot = handle.snapshot().await.unwrap();
        assert!(snapshot.running);
        assert_eq!(snapshot.interval_minutes, 15);
        let next = snapshot.next_run.unwrap();
        assert!(next > Utc::now() + chrono::Duration::minutes(14));

        handle.stop().await.unwrap();
        assert!(!handle.snapshot().await.unwrap().running);
    }

    #[tokio::test]
    async fn test_stopped_scheduler_is_unavailable() {
        let (handle, task) = Scheduler::spawn(StubRunner::new(0), 60, false);
        task.abort();
        let _ = task.await;
        assert!(matches!(handle.snapshot().await, Err(Error::SchedulerUnavailable)));
    }
}
