//! Scheduler engine — the single scheduling authority.
//!
//! One `tokio::select!` loop owns the fire queue: it sleeps until the
//! earliest entry, and is woken early by handle commands (add/remove/
//! enable), pipeline completions, or cancellation. Each due entry runs a
//! dedup → fetch → parse → dispatch pipeline as a spawned task; the queue
//! entry stays out of the heap until the pipeline completes, so one
//! destination never has two pipelines in flight. Concurrency across
//! destinations is bounded by a semaphore.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::{mpsc, oneshot, Mutex, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use vigil_channels::Notifier;
use vigil_core::config::SchedulerConfig;
use vigil_report::{parse, ReportFetcher};

use crate::dedup;
use crate::destination::Destination;
use crate::queue::{FireQueue, ScheduleEntry};
use crate::store::ScheduleStore;

/// Engine tuning knobs.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// How late a wake may be and still fire. Later wakes are missed
    /// occurrences: skipped and rescheduled, never fired stale.
    pub grace_secs: u64,
    /// Max pipelines in flight across destinations.
    pub max_concurrent: usize,
    /// How long shutdown waits for in-flight pipelines.
    pub drain_secs: u64,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            grace_secs: 60,
            max_concurrent: 4,
            drain_secs: 30,
        }
    }
}

impl From<&SchedulerConfig> for EngineOptions {
    fn from(cfg: &SchedulerConfig) -> Self {
        Self {
            grace_secs: cfg.grace_secs,
            max_concurrent: cfg.max_concurrent.max(1),
            drain_secs: cfg.drain_secs,
        }
    }
}

enum Command {
    Add(Destination),
    Remove(String),
    SetEnabled(String, bool),
    Snapshot(oneshot::Sender<Vec<ScheduleEntry>>),
}

/// Cheap cloneable handle for mutating a running engine. Every operation
/// wakes the loop immediately; none waits out a stale sleep.
#[derive(Clone)]
pub struct SchedulerHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl SchedulerHandle {
    pub fn add(&self, destination: Destination) {
        let _ = self.tx.send(Command::Add(destination));
    }

    pub fn remove(&self, id: &str) {
        let _ = self.tx.send(Command::Remove(id.to_string()));
    }

    pub fn set_enabled(&self, id: &str, enabled: bool) {
        let _ = self.tx.send(Command::SetEnabled(id.to_string(), enabled));
    }

    /// Pending fire-queue entries, in fire order. Empty if the engine has
    /// stopped.
    pub async fn snapshot(&self) -> Vec<ScheduleEntry> {
        let (tx, rx) = oneshot::channel();
        if self.tx.send(Command::Snapshot(tx)).is_err() {
            return Vec::new();
        }
        rx.await.unwrap_or_default()
    }
}

/// What a pipeline reports back for rescheduling.
struct PipelineOutcome {
    destination_id: String,
    scheduled_at: DateTime<Utc>,
}

/// The scheduler engine. Constructed with [`Scheduler::new`], driven by
/// [`Scheduler::run`].
pub struct Scheduler {
    state: EngineState,
    cmd_rx: mpsc::UnboundedReceiver<Command>,
}

struct EngineState {
    store: Arc<Mutex<ScheduleStore>>,
    fetcher: Arc<dyn ReportFetcher>,
    notifier: Arc<dyn Notifier>,
    opts: EngineOptions,
    queue: FireQueue,
    inflight: HashSet<String>,
    /// What each spawned pipeline was fired for, keyed by task id. Lets a
    /// panicked pipeline still release its destination and reschedule.
    pending: HashMap<tokio::task::Id, PipelineOutcome>,
    semaphore: Arc<Semaphore>,
}

impl Scheduler {
    pub fn new(
        store: ScheduleStore,
        fetcher: Arc<dyn ReportFetcher>,
        notifier: Arc<dyn Notifier>,
        opts: EngineOptions,
    ) -> (Self, SchedulerHandle) {
        let (tx, cmd_rx) = mpsc::unbounded_channel();
        let semaphore = Arc::new(Semaphore::new(opts.max_concurrent.max(1)));
        let scheduler = Self {
            state: EngineState {
                store: Arc::new(Mutex::new(store)),
                fetcher,
                notifier,
                opts,
                queue: FireQueue::new(),
                inflight: HashSet::new(),
                pending: HashMap::new(),
                semaphore,
            },
            cmd_rx,
        };
        (scheduler, SchedulerHandle { tx })
    }

    /// Run until cancelled. Survives any single pipeline failure; the only
    /// exits are cancellation and all handles being dropped.
    pub async fn run(self, cancel: CancellationToken) {
        let Scheduler { mut state, mut cmd_rx } = self;
        state.seed().await;
        let mut pipelines: JoinSet<PipelineOutcome> = JoinSet::new();

        info!(
            "⏰ Scheduler started ({} scheduled, grace {}s, max {} concurrent)",
            state.queue.len(),
            state.opts.grace_secs,
            state.opts.max_concurrent
        );

        loop {
            let deadline = state.queue.peek_deadline();
            tokio::select! {
                _ = cancel.cancelled() => break,
                cmd = cmd_rx.recv() => match cmd {
                    Some(cmd) => state.handle_command(cmd).await,
                    None => break,
                },
                Some(res) = pipelines.join_next_with_id(), if !pipelines.is_empty() => {
                    state.on_pipeline_done(res).await;
                }
                _ = wait_until(deadline) => state.fire_due(&mut pipelines, Utc::now()).await,
            }
        }

        if !pipelines.is_empty() {
            info!(
                "⏳ Shutting down — waiting up to {}s for {} in-flight pipeline(s)",
                state.opts.drain_secs,
                pipelines.len()
            );
            let drain = std::time::Duration::from_secs(state.opts.drain_secs);
            if tokio::time::timeout(drain, drain_all(&mut pipelines))
                .await
                .is_err()
            {
                warn!("⚠️ Drain deadline reached — aborting remaining pipelines");
                pipelines.shutdown().await;
            }
        }
        info!("⏰ Scheduler stopped");
    }
}

async fn drain_all(pipelines: &mut JoinSet<PipelineOutcome>) {
    while pipelines.join_next().await.is_some() {}
}

/// Sleep until a wall-clock deadline; forever if there is none.
async fn wait_until(deadline: Option<DateTime<Utc>>) {
    match deadline {
        Some(at) => {
            let now = Utc::now();
            if at > now {
                if let Ok(dur) = (at - now).to_std() {
                    tokio::time::sleep(dur).await;
                }
            }
        }
        None => std::future::pending::<()>().await,
    }
}

impl EngineState {
    /// Build the initial queue from the store. Occurrences that passed
    /// while the process was down are not fired; every destination starts
    /// at its next future occurrence.
    async fn seed(&mut self) {
        let now = Utc::now();
        let destinations = self.store.lock().await.list();
        for dest in destinations {
            if dest.enabled {
                self.queue.insert(ScheduleEntry {
                    next_fire_at: dest.schedule.first_fire_after(now),
                    destination_id: dest.id,
                });
            }
        }
    }

    async fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Add(dest) => {
                let id = dest.id.clone();
                let enabled = dest.enabled;
                let schedule = dest.schedule.clone();
                if let Err(e) = self.store.lock().await.upsert(dest) {
                    warn!("⚠️ Failed to persist '{id}': {e}");
                    return;
                }
                if !enabled {
                    self.queue.remove(&id);
                } else if !self.inflight.contains(&id) {
                    // In-flight destinations get their entry back on
                    // pipeline completion, from the updated store record.
                    let next = schedule.first_fire_after(Utc::now());
                    info!("📅 Destination added: '{id}' ({schedule}), next fire {next}");
                    self.queue.insert(ScheduleEntry {
                        next_fire_at: next,
                        destination_id: id,
                    });
                }
            }
            Command::Remove(id) => {
                match self.store.lock().await.remove(&id) {
                    Ok(true) => info!("🗑️ Destination removed: '{id}'"),
                    Ok(false) => {}
                    Err(e) => warn!("⚠️ Failed to remove '{id}': {e}"),
                }
                self.queue.remove(&id);
            }
            Command::SetEnabled(id, enabled) => {
                let schedule = {
                    let mut store = self.store.lock().await;
                    match store.set_enabled(&id, enabled) {
                        Ok(true) => store.get(&id).map(|d| d.schedule.clone()),
                        Ok(false) => {
                            warn!("⚠️ Unknown destination '{id}'");
                            return;
                        }
                        Err(e) => {
                            warn!("⚠️ Failed to update '{id}': {e}");
                            return;
                        }
                    }
                };
                if !enabled {
                    self.queue.remove(&id);
                    info!("🚫 Destination disabled: '{id}'");
                } else if let Some(schedule) = schedule {
                    if !self.inflight.contains(&id) {
                        let next = schedule.first_fire_after(Utc::now());
                        info!("✅ Destination enabled: '{id}', next fire {next}");
                        self.queue.insert(ScheduleEntry {
                            next_fire_at: next,
                            destination_id: id,
                        });
                    }
                }
            }
            Command::Snapshot(tx) => {
                let _ = tx.send(self.queue.entries());
            }
        }
    }

    /// Fire every queue entry due at `now`. `now` is a parameter so the
    /// due-vs-missed decision can be driven directly in tests.
    async fn fire_due(&mut self, pipelines: &mut JoinSet<PipelineOutcome>, now: DateTime<Utc>) {
        let grace = Duration::seconds(i64::try_from(self.opts.grace_secs).unwrap_or(60));

        for entry in self.queue.pop_due(now) {
            let id = entry.destination_id.clone();
            let dest = self.store.lock().await.get(&id).cloned();
            let Some(dest) = dest else { continue };
            if !dest.enabled {
                continue;
            }

            if now - entry.next_fire_at > grace {
                let next = dest.schedule.next_after_fire(entry.next_fire_at, now);
                warn!(
                    "😴 Missed fire for '{id}' (scheduled {}, woke {}) — skipping to {next}",
                    entry.next_fire_at, now
                );
                self.queue.insert(ScheduleEntry {
                    next_fire_at: next,
                    destination_id: id,
                });
                continue;
            }

            info!("🔔 Firing '{id}' (scheduled {})", entry.next_fire_at);
            self.inflight.insert(id.clone());
            let handle = pipelines.spawn(run_pipeline(
                self.store.clone(),
                self.fetcher.clone(),
                self.notifier.clone(),
                id.clone(),
                entry.next_fire_at,
                self.semaphore.clone(),
            ));
            self.pending.insert(
                handle.id(),
                PipelineOutcome {
                    destination_id: id,
                    scheduled_at: entry.next_fire_at,
                },
            );
        }
    }

    /// Reschedule after a pipeline finishes. A pipeline that panicked or
    /// was aborted is resolved through the pending map, so its destination
    /// is released and rescheduled instead of staying in flight forever.
    async fn on_pipeline_done(
        &mut self,
        res: Result<(tokio::task::Id, PipelineOutcome), tokio::task::JoinError>,
    ) {
        let outcome = match res {
            Ok((task_id, outcome)) => {
                self.pending.remove(&task_id);
                outcome
            }
            Err(e) => match self.pending.remove(&e.id()) {
                Some(outcome) => {
                    warn!(
                        "⚠️ Pipeline for '{}' did not finish: {e}",
                        outcome.destination_id
                    );
                    outcome
                }
                None => {
                    warn!("⚠️ Pipeline task failed: {e}");
                    return;
                }
            },
        };
        self.inflight.remove(&outcome.destination_id);
        let dest = self
            .store
            .lock()
            .await
            .get(&outcome.destination_id)
            .cloned();
        if let Some(dest) = dest {
            if dest.enabled {
                let next = dest.schedule.next_after_fire(outcome.scheduled_at, Utc::now());
                self.queue.insert(ScheduleEntry {
                    next_fire_at: next,
                    destination_id: outcome.destination_id,
                });
            }
        }
    }
}

/// One delivery cycle for one destination. Every failure is local: log,
/// return, retry at the next fire. `mark_notified` runs only after a
/// successful dispatch, and only if the destination is still enabled —
/// a destination disabled mid-flight has its result discarded.
async fn run_pipeline(
    store: Arc<Mutex<ScheduleStore>>,
    fetcher: Arc<dyn ReportFetcher>,
    notifier: Arc<dyn Notifier>,
    destination_id: String,
    scheduled_at: DateTime<Utc>,
    semaphore: Arc<Semaphore>,
) -> PipelineOutcome {
    let outcome = PipelineOutcome {
        destination_id: destination_id.clone(),
        scheduled_at,
    };
    let _permit = match semaphore.acquire_owned().await {
        Ok(permit) => permit,
        Err(_) => return outcome,
    };

    let dest = store.lock().await.get(&destination_id).cloned();
    let Some(dest) = dest else { return outcome };
    if !dest.enabled {
        return outcome;
    }

    // The dedup decision depends only on persisted state, so it runs
    // ahead of the fetch; a suppressed cycle costs no network round trip.
    let now = Utc::now();
    if !dedup::should_notify(&dest, now) {
        info!("🔁 '{}' already served this period — skipping", dest.id);
        return outcome;
    }

    let raw = match fetcher.fetch().await {
        Ok(raw) => raw,
        Err(e) => {
            warn!("⚠️ Fetch for '{}' failed: {e}", dest.id);
            return outcome;
        }
    };
    let parsed = match parse(&raw) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!("⚠️ Parse for '{}' failed — cycle skipped: {e}", dest.id);
            return outcome;
        }
    };
    if parsed.warnings > 0 {
        warn!(
            "⚠️ {} malformed record(s) skipped for '{}'",
            parsed.warnings, dest.id
        );
    }

    if let Err(e) = notifier.send(&dest.id, &parsed.report).await {
        warn!(
            "⚠️ Dispatch to '{}' failed — will retry next fire: {e}",
            dest.id
        );
        return outcome;
    }

    let mut store = store.lock().await;
    match store.get(&dest.id) {
        Some(current) if current.enabled => {
            if let Err(e) = store.mark_notified(&dest.id, now) {
                warn!("⚠️ Failed to record delivery for '{}': {e}", dest.id);
            }
        }
        _ => info!("🚫 '{}' disabled mid-flight — result discarded", dest.id),
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;
    use vigil_core::error::{Result, VigilError};
    use vigil_report::Report;

    fn temp_store(name: &str) -> ScheduleStore {
        let dir = std::env::temp_dir().join(format!("vigil-test-engine-{name}"));
        std::fs::remove_dir_all(&dir).ok();
        std::fs::create_dir_all(&dir).unwrap();
        ScheduleStore::open(&dir.join("destinations.json")).unwrap()
    }

    fn status_page() -> Vec<u8> {
        b"<div class=\"summary\"><p>Total: 10</p><p>Success: 8</p></div>\
          <div class=\"user-card\"><h3>S1 \xe2\x9d\x8c</h3>\
          <p>Duration: 2s</p><pre>timeout</pre></div>"
            .to_vec()
    }

    struct StubFetcher {
        fail: bool,
    }

    #[async_trait]
    impl ReportFetcher for StubFetcher {
        async fn fetch(&self) -> Result<Vec<u8>> {
            if self.fail {
                Err(VigilError::Fetch("stub outage".into()))
            } else {
                Ok(status_page())
            }
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        fail: bool,
        sent: StdMutex<Vec<String>>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        fn name(&self) -> &str {
            "recording"
        }
        async fn send(&self, destination_id: &str, _report: &Report) -> Result<()> {
            if self.fail {
                return Err(VigilError::Dispatch("stub sink down".into()));
            }
            self.sent.lock().unwrap().push(destination_id.to_string());
            Ok(())
        }
    }

    /// Disables the destination in the store while the send is in flight.
    struct DisablingNotifier {
        store: Arc<Mutex<ScheduleStore>>,
    }

    #[async_trait]
    impl Notifier for DisablingNotifier {
        fn name(&self) -> &str {
            "disabling"
        }
        async fn send(&self, destination_id: &str, _report: &Report) -> Result<()> {
            self.store
                .lock()
                .await
                .set_enabled(destination_id, false)
                .unwrap();
            Ok(())
        }
    }

    fn bare_state(store: ScheduleStore, notifier: Arc<dyn Notifier>) -> EngineState {
        EngineState {
            store: Arc::new(Mutex::new(store)),
            fetcher: Arc::new(StubFetcher { fail: false }),
            notifier,
            opts: EngineOptions::default(),
            queue: FireQueue::new(),
            inflight: HashSet::new(),
            pending: HashMap::new(),
            semaphore: Arc::new(Semaphore::new(4)),
        }
    }

    async fn pipeline(
        store: Arc<Mutex<ScheduleStore>>,
        fetcher: StubFetcher,
        notifier: Arc<dyn Notifier>,
    ) {
        run_pipeline(
            store,
            Arc::new(fetcher),
            notifier,
            "grp1".into(),
            Utc::now(),
            Arc::new(Semaphore::new(4)),
        )
        .await;
    }

    #[tokio::test]
    async fn test_pipeline_success_marks_notified() {
        let mut s = temp_store("success");
        s.upsert(Destination::every("grp1", 60)).unwrap();
        let store = Arc::new(Mutex::new(s));
        let notifier = Arc::new(RecordingNotifier::default());

        pipeline(store.clone(), StubFetcher { fail: false }, notifier.clone()).await;

        assert_eq!(*notifier.sent.lock().unwrap(), vec!["grp1".to_string()]);
        assert!(store.lock().await.get("grp1").unwrap().last_notified.is_some());
    }

    #[tokio::test]
    async fn test_pipeline_dedup_suppresses_second_fire() {
        let mut s = temp_store("dedup");
        s.upsert(Destination::every("grp1", 3600)).unwrap();
        let store = Arc::new(Mutex::new(s));
        let notifier = Arc::new(RecordingNotifier::default());

        pipeline(store.clone(), StubFetcher { fail: false }, notifier.clone()).await;
        pipeline(store.clone(), StubFetcher { fail: false }, notifier.clone()).await;

        assert_eq!(notifier.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_pipeline_dispatch_failure_enables_retry() {
        let mut s = temp_store("retry");
        s.upsert(Destination::every("grp1", 3600)).unwrap();
        let store = Arc::new(Mutex::new(s));

        let failing = Arc::new(RecordingNotifier {
            fail: true,
            ..Default::default()
        });
        pipeline(store.clone(), StubFetcher { fail: false }, failing).await;
        assert!(store.lock().await.get("grp1").unwrap().last_notified.is_none());

        // Same period, but no success recorded yet: the next fire delivers.
        let working = Arc::new(RecordingNotifier::default());
        pipeline(store.clone(), StubFetcher { fail: false }, working.clone()).await;
        assert_eq!(working.sent.lock().unwrap().len(), 1);
        assert!(store.lock().await.get("grp1").unwrap().last_notified.is_some());
    }

    #[tokio::test]
    async fn test_pipeline_fetch_failure_skips_cycle() {
        let mut s = temp_store("fetchfail");
        s.upsert(Destination::every("grp1", 60)).unwrap();
        let store = Arc::new(Mutex::new(s));
        let notifier = Arc::new(RecordingNotifier::default());

        pipeline(store.clone(), StubFetcher { fail: true }, notifier.clone()).await;

        assert!(notifier.sent.lock().unwrap().is_empty());
        assert!(store.lock().await.get("grp1").unwrap().last_notified.is_none());
    }

    #[tokio::test]
    async fn test_disabled_mid_flight_is_not_persisted() {
        let mut s = temp_store("midflight");
        s.upsert(Destination::every("grp1", 60)).unwrap();
        let store = Arc::new(Mutex::new(s));
        let notifier = Arc::new(DisablingNotifier {
            store: store.clone(),
        });

        pipeline(store.clone(), StubFetcher { fail: false }, notifier).await;

        let guard = store.lock().await;
        let dest = guard.get("grp1").unwrap();
        assert!(!dest.enabled);
        assert!(dest.last_notified.is_none());
    }

    #[tokio::test]
    async fn test_engine_add_remove_keeps_single_entry() {
        let store = temp_store("handle");
        let (scheduler, handle) = Scheduler::new(
            store,
            Arc::new(StubFetcher { fail: false }),
            Arc::new(RecordingNotifier::default()),
            EngineOptions::default(),
        );
        let cancel = CancellationToken::new();
        let task = tokio::spawn(scheduler.run(cancel.clone()));

        // Far-future intervals: entries exist but never fire in this test.
        handle.add(Destination::every("grp1", 3600));
        handle.add(Destination::every("grp1", 7200));
        handle.add(Destination::every("grp2", 3600));
        let entries = handle.snapshot().await;
        assert_eq!(entries.len(), 2);

        handle.remove("grp2");
        let entries = handle.snapshot().await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].destination_id, "grp1");

        handle.set_enabled("grp1", false);
        assert!(handle.snapshot().await.is_empty());
        handle.set_enabled("grp1", true);
        assert_eq!(handle.snapshot().await.len(), 1);

        cancel.cancel();
        tokio::time::timeout(std::time::Duration::from_secs(5), task)
            .await
            .expect("engine did not stop on cancel")
            .unwrap();
    }

    #[tokio::test]
    async fn test_engine_fires_due_destination() {
        let store = temp_store("fires");
        let notifier = Arc::new(RecordingNotifier::default());
        let (scheduler, handle) = Scheduler::new(
            store,
            Arc::new(StubFetcher { fail: false }),
            notifier.clone(),
            EngineOptions::default(),
        );
        let cancel = CancellationToken::new();
        let task = tokio::spawn(scheduler.run(cancel.clone()));

        handle.add(Destination::every("grp1", 1));
        tokio::time::sleep(std::time::Duration::from_millis(1500)).await;

        assert_eq!(
            notifier.sent.lock().unwrap().first(),
            Some(&"grp1".to_string())
        );

        cancel.cancel();
        tokio::time::timeout(std::time::Duration::from_secs(5), task)
            .await
            .expect("engine did not stop on cancel")
            .unwrap();
    }

    #[tokio::test]
    async fn test_missed_wake_skips_and_reschedules() {
        let mut s = temp_store("missed");
        s.upsert(Destination::every("grp1", 600)).unwrap();
        let notifier = Arc::new(RecordingNotifier::default());
        let mut state = bare_state(s, notifier.clone());

        let now = Utc::now();
        // Well past the default 60s grace window.
        state.queue.insert(ScheduleEntry {
            next_fire_at: now - Duration::seconds(300),
            destination_id: "grp1".to_string(),
        });

        let mut pipelines: JoinSet<PipelineOutcome> = JoinSet::new();
        state.fire_due(&mut pipelines, now).await;

        assert!(pipelines.is_empty());
        assert!(notifier.sent.lock().unwrap().is_empty());
        assert_eq!(state.queue.len(), 1);
        assert!(state.queue.peek_deadline().is_some_and(|at| at > now));
    }

    #[tokio::test]
    async fn test_wake_within_grace_spawns_pipeline() {
        let mut s = temp_store("grace");
        s.upsert(Destination::every("grp1", 600)).unwrap();
        let notifier = Arc::new(RecordingNotifier::default());
        let mut state = bare_state(s, notifier);

        let now = Utc::now();
        state.queue.insert(ScheduleEntry {
            next_fire_at: now - Duration::seconds(10),
            destination_id: "grp1".to_string(),
        });

        let mut pipelines: JoinSet<PipelineOutcome> = JoinSet::new();
        state.fire_due(&mut pipelines, now).await;

        assert_eq!(pipelines.len(), 1);
        assert!(state.inflight.contains("grp1"));
        assert!(state.queue.peek_deadline().is_none());
    }

    #[tokio::test]
    async fn test_panicked_pipeline_releases_destination() {
        let mut s = temp_store("panicked");
        s.upsert(Destination::every("grp1", 600)).unwrap();
        let mut state = bare_state(s, Arc::new(RecordingNotifier::default()));
        state.inflight.insert("grp1".to_string());

        let mut pipelines: JoinSet<PipelineOutcome> = JoinSet::new();
        let handle = pipelines.spawn(async { panic!("pipeline blew up") });
        state.pending.insert(
            handle.id(),
            PipelineOutcome {
                destination_id: "grp1".to_string(),
                scheduled_at: Utc::now(),
            },
        );

        let res = pipelines.join_next_with_id().await.expect("one task");
        assert!(res.is_err());
        state.on_pipeline_done(res).await;

        assert!(state.inflight.is_empty());
        assert!(state.pending.is_empty());
        // The destination is back in the queue, not retired.
        assert_eq!(state.queue.len(), 1);
    }

    #[test]
    fn test_options_from_config_clamps_concurrency() {
        let cfg = SchedulerConfig {
            grace_secs: 30,
            max_concurrent: 0,
            drain_secs: 5,
            store_path: String::new(),
        };
        let opts = EngineOptions::from(&cfg);
        assert_eq!(opts.max_concurrent, 1);
        assert_eq!(opts.grace_secs, 30);
    }
}
