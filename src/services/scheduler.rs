use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::FutureExt;
use log::{error, info};
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Source of scheduler ticks
#[async_trait]
pub trait Trigger: Send {
    /// Wait for the next tick. `None` ends the schedule.
    async fn next_tick(&mut self) -> Option<DateTime<Utc>>;
}

/// Wall-clock trigger driven by a cron expression (seconds field first, UTC)
pub struct CronTrigger {
    schedule: cron::Schedule,
}

impl CronTrigger {
    pub fn parse(expression: &str) -> Result<Self> {
        let schedule = cron::Schedule::from_str(expression)
            .with_context(|| format!("Invalid cron expression '{}'", expression))?;
        Ok(Self { schedule })
    }

    pub fn upcoming(&self) -> Option<DateTime<Utc>> {
        self.schedule.upcoming(Utc).next()
    }
}

#[async_trait]
impl Trigger for CronTrigger {
    async fn next_tick(&mut self) -> Option<DateTime<Utc>> {
        let next = self.upcoming()?;
        let wait = (next - Utc::now()).to_std().unwrap_or_default();
        tokio::time::sleep(wait).await;
        Some(next)
    }
}

/// Trigger fired by hand through a [`ManualTicker`]
pub struct ManualTrigger {
    ticks: mpsc::UnboundedReceiver<()>,
}

/// Sending half of a [`ManualTrigger`]; dropping it ends the schedule
#[derive(Clone)]
pub struct ManualTicker {
    ticks: mpsc::UnboundedSender<()>,
}

impl ManualTrigger {
    pub fn new() -> (ManualTicker, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ManualTicker { ticks: tx }, Self { ticks: rx })
    }
}

impl ManualTicker {
    pub fn tick(&self) -> bool {
        self.ticks.send(()).is_ok()
    }
}

#[async_trait]
impl Trigger for ManualTrigger {
    async fn next_tick(&mut self) -> Option<DateTime<Utc>> {
        self.ticks.recv().await.map(|_| Utc::now())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Completed,
    Failed,
    Panicked,
}

/// Tick counters shared between the scheduler loop and its handle
#[derive(Debug, Default)]
pub struct TickStats {
    completed: AtomicU64,
    failed: AtomicU64,
    panicked: AtomicU64,
}

impl TickStats {
    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::SeqCst)
    }

    pub fn panicked(&self) -> u64 {
        self.panicked.load(Ordering::SeqCst)
    }

    pub fn finished(&self) -> u64 {
        self.completed() + self.failed() + self.panicked()
    }

    fn record(&self, outcome: TickOutcome) {
        let counter = match outcome {
            TickOutcome::Completed => &self.completed,
            TickOutcome::Failed => &self.failed,
            TickOutcome::Panicked => &self.panicked,
        };
        counter.fetch_add(1, Ordering::SeqCst);
    }
}

/// A registered schedule
pub struct ScheduleHandle {
    task: JoinHandle<()>,
    stats: Arc<TickStats>,
}

impl ScheduleHandle {
    pub fn stats(&self) -> Arc<TickStats> {
        Arc::clone(&self.stats)
    }

    /// Stop firing new ticks. Ticks already running finish on their own.
    pub fn stop(&self) {
        self.task.abort();
    }

    /// Wait until the trigger is exhausted or the schedule is stopped.
    pub async fn join(self) {
        let _ = self.task.await;
    }
}

/// Runs a callback on every tick of a trigger, containing each tick's failures
pub struct Scheduler;

impl Scheduler {
    /// Register `callback(arg)` on `trigger`.
    ///
    /// Every tick runs on its own task, so a slow tick may overlap the next
    /// one. Errors and panics are logged and counted; they never stop the
    /// schedule.
    pub fn schedule<T, F, Fut, A>(mut trigger: T, callback: F, arg: A) -> ScheduleHandle
    where
        T: Trigger + 'static,
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
        A: Clone + Send + Sync + 'static,
    {
        let stats = Arc::new(TickStats::default());
        let loop_stats = Arc::clone(&stats);
        let callback = Arc::new(callback);

        let task = tokio::spawn(async move {
            let mut tick = 0u64;
            while let Some(fired_at) = trigger.next_tick().await {
                tick += 1;
                info!("Tick {} fired at {}", tick, fired_at.to_rfc3339());
                let callback = Arc::clone(&callback);
                let arg = arg.clone();
                let stats = Arc::clone(&loop_stats);
                tokio::spawn(async move {
                    let outcome = run_guarded_tick(tick, move || (*callback)(arg)).await;
                    stats.record(outcome);
                });
            }
            info!("Schedule finished after {} ticks", tick);
        });

        ScheduleHandle { task, stats }
    }

    /// Register `callback(arg)` on a cron expression.
    ///
    /// An invalid expression is logged and nothing is scheduled.
    pub fn schedule_cron<F, Fut, A>(expression: &str, callback: F, arg: A) -> Option<ScheduleHandle>
    where
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
        A: Clone + Send + Sync + 'static,
    {
        match CronTrigger::parse(expression) {
            Ok(trigger) => {
                if let Some(next) = trigger.upcoming() {
                    info!("Scheduled '{}', first tick at {}", expression, next.to_rfc3339());
                }
                Some(Self::schedule(trigger, callback, arg))
            }
            Err(e) => {
                error!("Failed to register schedule: {:#}", e);
                None
            }
        }
    }
}

/// Run one tick to completion, turning errors and panics into an outcome.
///
/// `run` is called inside the guard, so a panic while building the future
/// is caught the same way as one raised while polling it.
pub async fn run_guarded_tick<F, Fut>(tick: u64, run: F) -> TickOutcome
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let guarded = AssertUnwindSafe(async move { run().await }).catch_unwind();
    match guarded.await {
        Ok(Ok(())) => {
            info!("Tick {} completed", tick);
            TickOutcome::Completed
        }
        Ok(Err(e)) => {
            error!("Tick {} failed: {:#}", tick, e);
            TickOutcome::Failed
        }
        Err(payload) => {
            error!("Tick {} panicked: {}", tick, panic_message(payload.as_ref()));
            TickOutcome::Panicked
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::wait_for_finished;
    use std::sync::Mutex;
    use std::time::Duration;

    #[test]
    fn test_hourly_expression_fires_on_the_hour() {
        let trigger = CronTrigger::parse("0 0 * * * *").unwrap();

        let next = trigger.upcoming().unwrap();

        assert_eq!(next.format("%M:%S").to_string(), "00:00");
        assert!(next > Utc::now());
    }

    #[test]
    fn test_invalid_expression_is_rejected() {
        assert!(CronTrigger::parse("every hour").is_err());
    }

    #[tokio::test]
    async fn test_invalid_expression_registers_nothing() {
        let calls = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&calls);

        let handle = Scheduler::schedule_cron(
            "not a schedule",
            move |_: usize| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    anyhow::Ok(())
                }
            },
            5,
        );

        assert!(handle.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_callback_receives_argument_on_every_tick() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let (ticker, trigger) = ManualTrigger::new();

        let handle = Scheduler::schedule(
            trigger,
            move |limit: usize| {
                let sink = Arc::clone(&sink);
                async move {
                    sink.lock().unwrap().push(limit);
                    anyhow::Ok(())
                }
            },
            5,
        );
        let stats = handle.stats();

        assert!(ticker.tick());
        assert!(ticker.tick());
        wait_for_finished(&stats, 2).await;

        assert_eq!(*seen.lock().unwrap(), vec![5, 5]);
        assert_eq!(stats.completed(), 2);
        handle.stop();
    }

    #[tokio::test]
    async fn test_failed_tick_does_not_stop_later_ticks() {
        let runs = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&runs);
        let (ticker, trigger) = ManualTrigger::new();

        let handle = Scheduler::schedule(
            trigger,
            move |_: ()| {
                let run = counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    if run == 0 {
                        anyhow::bail!("ratings API returned status 500");
                    }
                    Ok(())
                }
            },
            (),
        );
        let stats = handle.stats();

        ticker.tick();
        wait_for_finished(&stats, 1).await;
        ticker.tick();
        wait_for_finished(&stats, 2).await;

        assert_eq!(stats.failed(), 1);
        assert_eq!(stats.completed(), 1);
        handle.stop();
    }

    #[tokio::test]
    async fn test_panicking_tick_is_contained() {
        async fn explode() -> Result<()> {
            panic!("boom")
        }

        let outcome = run_guarded_tick(1, explode).await;

        assert_eq!(outcome, TickOutcome::Panicked);
    }

    #[tokio::test]
    async fn test_callback_panicking_before_returning_future_is_contained() {
        let calls = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&calls);
        let (ticker, trigger) = ManualTrigger::new();

        let handle = Scheduler::schedule(
            trigger,
            move |_: ()| {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    panic!("callback blew up before building its future");
                }
                async { anyhow::Ok(()) }
            },
            (),
        );
        let stats = handle.stats();

        ticker.tick();
        wait_for_finished(&stats, 1).await;
        ticker.tick();
        wait_for_finished(&stats, 2).await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(stats.panicked(), 1);
        assert_eq!(stats.failed(), 0);
        assert_eq!(stats.completed(), 1);
        handle.stop();
    }

    #[tokio::test]
    async fn test_schedule_ends_when_ticker_is_dropped() {
        let (ticker, trigger) = ManualTrigger::new();
        let handle = Scheduler::schedule(trigger, |_: ()| async { anyhow::Ok(()) }, ());

        drop(ticker);

        tokio::time::timeout(Duration::from_secs(1), handle.join())
            .await
            .expect("schedule should end");
    }
}
