use crate::resolve::resolve;
use crate::source::SnapshotSource;
use crate::state::{Field, ResolvedState, diff};
use crate::subscribers::{Notification, Registry, Topic, Unsubscribe};
use lodestar_cache::ResolverSet;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

struct Link {
    source: Box<dyn SnapshotSource>,
    /// Set after the first failed open so retries stay quiet.
    open_failing: bool,
}

struct Inner {
    /// Held from read through the state swap, so cycles never interleave with
    /// each other or with `stop`/`restart`.
    link: Mutex<Link>,
    /// Bumped on every stop. A cycle started by an earlier poll task does not
    /// commit.
    generation: AtomicU64,
    resolvers: ResolverSet,
    current: Mutex<Option<ResolvedState>>,
    subscribers: Arc<Registry>,
}

impl Link {
    fn read_state(&mut self, resolvers: &ResolverSet) -> ResolvedState {
        if !self.source.open() {
            if !self.open_failing {
                warn!("link segment unavailable, retrying every cycle");
                self.open_failing = true;
            }
            return ResolvedState::disconnected();
        }
        if self.open_failing {
            info!("link segment available");
            self.open_failing = false;
        }
        match self.source.read() {
            Some(frame) => resolve(&frame, resolvers),
            None => ResolvedState::disconnected(),
        }
    }
}

impl Inner {
    /// One cycle. `generation` is set for cycles run by the poll task.
    fn cycle(&self, generation: Option<u64>) -> Vec<Field> {
        let (changed, next) = {
            let mut link = self.link.lock();
            if generation.is_some_and(|g| g != self.generation.load(Ordering::Acquire)) {
                debug!("cycle from a stopped poll task skipped");
                return Vec::new();
            }
            let next = link.read_state(&self.resolvers);
            let mut current = self.current.lock();
            let changed = diff(current.as_ref(), &next);
            if !changed.is_empty() {
                *current = Some(next.clone());
            }
            (changed, next)
        };
        if !changed.is_empty() {
            debug!(changed = changed.len(), connected = next.connected, "state changed");
            self.subscribers.dispatch(&changed, &next);
        }
        changed
    }

    /// Waits for a running cycle to finish, then closes the link.
    fn halt(&self, clear_state: bool) {
        let mut link = self.link.lock();
        self.generation.fetch_add(1, Ordering::AcqRel);
        link.source.close();
        if clear_state {
            self.current.lock().take();
        }
    }
}

/// Drives poll, resolve, diff and notify on a fixed interval.
///
/// Subscribers run synchronously on the poll task, one cycle at a time, and
/// always see a single consistent state.
pub struct StateOrchestrator {
    inner: Arc<Inner>,
    interval: Duration,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl StateOrchestrator {
    pub fn new<S>(source: S, resolvers: ResolverSet, interval: Duration) -> Self
    where
        S: SnapshotSource + 'static,
    {
        Self {
            inner: Arc::new(Inner {
                link: Mutex::new(Link {
                    source: Box::new(source),
                    open_failing: false,
                }),
                generation: AtomicU64::new(0),
                resolvers,
                current: Mutex::new(None),
                subscribers: Arc::default(),
            }),
            interval,
            task: Mutex::new(None),
        }
    }

    /// Begin polling on the current tokio runtime. The first cycle runs
    /// immediately. No-op while already running.
    ///
    /// # Panics
    /// Panics if called outside a tokio runtime.
    pub fn start(&self) {
        let mut task = self.task.lock();
        if task.as_ref().is_some_and(|t| !t.is_finished()) {
            return;
        }
        let inner = Arc::clone(&self.inner);
        let period = self.interval;
        let generation = inner.generation.load(Ordering::Acquire);
        *task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                inner.cycle(Some(generation));
            }
        }));
        info!(interval_ms = period.as_millis() as u64, "state polling started");
    }

    /// Halt polling and release the link. Background cache fetches already in
    /// flight are left to finish.
    pub fn stop(&self) {
        self.abort_task();
        self.inner.halt(false);
    }

    /// Reopen the link and report every field on the next cycle. Meant for
    /// resume after system suspend.
    pub fn restart(&self) {
        self.abort_task();
        self.inner.halt(true);
        info!("state polling restarting");
        self.start();
    }

    fn abort_task(&self) {
        if let Some(task) = self.task.lock().take() {
            task.abort();
            info!("state polling stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.lock().as_ref().is_some_and(|t| !t.is_finished())
    }

    /// One cycle, run on the caller's thread. Returns the fields that changed.
    pub fn poll_once(&self) -> Vec<Field> {
        self.inner.cycle(None)
    }

    /// `None` before the first cycle and right after a restart.
    pub fn current_state(&self) -> Option<ResolvedState> {
        self.inner.current.lock().clone()
    }

    pub fn on<T, F>(&self, topic: T, callback: F) -> Unsubscribe
    where
        T: Into<Topic>,
        F: Fn(&Notification<'_>) + Send + Sync + 'static,
    {
        self.inner.subscribers.add(topic.into(), callback)
    }
}

impl Drop for StateOrchestrator {
    fn drop(&mut self) {
        if let Some(task) = self.task.get_mut().take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{FieldValue, Named};
    use lodestar_link::LinkFrame;
    use lodestar_snapshot::{Context, Identity, RawSnapshot};
    use lodestar_store::Store;
    use std::sync::atomic::AtomicUsize;
    use std::sync::mpsc;
    use std::thread;

    #[derive(Default)]
    struct Script {
        frame: Option<LinkFrame>,
        open_ok: bool,
        opens: usize,
        closes: usize,
        /// Makes the next read signal the first sender, then block until the
        /// receiver gets a message.
        gate: Option<(mpsc::Sender<()>, mpsc::Receiver<()>)>,
    }

    /// Source whose next frame the test controls from outside.
    #[derive(Clone, Default)]
    struct Scripted(Arc<Mutex<Script>>);

    impl Scripted {
        fn online() -> Self {
            let s = Self::default();
            s.0.lock().open_ok = true;
            s
        }

        fn set(&self, identity: Identity, context: Context, connected: bool) {
            self.0.lock().frame = Some(LinkFrame {
                snapshot: RawSnapshot {
                    tick: 100,
                    identity: Some(identity),
                    context,
                    ..RawSnapshot::default()
                },
                connected,
            });
        }
    }

    impl SnapshotSource for Scripted {
        fn open(&mut self) -> bool {
            let mut s = self.0.lock();
            s.opens += 1;
            s.open_ok
        }

        fn read(&mut self) -> Option<LinkFrame> {
            let gate = self.0.lock().gate.take();
            if let Some((entered, release)) = gate {
                let _ = entered.send(());
                let _ = release.recv();
            }
            self.0.lock().frame.clone()
        }

        fn close(&mut self) {
            self.0.lock().closes += 1;
        }
    }

    fn orchestrator(source: &Scripted) -> StateOrchestrator {
        let store = Store::open_in_memory().unwrap();
        lodestar_cache::seed_static(&store).unwrap();
        StateOrchestrator::new(
            source.clone(),
            ResolverSet::offline(&store),
            Duration::from_millis(20),
        )
    }

    fn necromancer() -> Identity {
        Identity {
            name: "Vex Morrow".into(),
            profession: 8,
            specialization: 0,
            ..Identity::default()
        }
    }

    fn open_world() -> Context {
        Context {
            map_type: 5,
            ..Context::default()
        }
    }

    #[test]
    fn first_cycle_reports_every_field() {
        let source = Scripted::online();
        source.set(necromancer(), open_world(), true);
        let orch = orchestrator(&source);
        assert_eq!(orch.current_state(), None);

        assert_eq!(orch.poll_once(), Field::ALL.to_vec());
        let state = orch.current_state().unwrap();
        assert_eq!(state.profession, Named::new(8, "Necromancer"));
        assert_eq!(state.specialization, Named::new(0, "Core"));
        assert_eq!(state.game_mode, Named::new(5, "Open World"));

        assert!(orch.poll_once().is_empty());
    }

    #[test]
    fn field_subscribers_get_new_value_and_state() {
        let source = Scripted::online();
        source.set(necromancer(), open_world(), true);
        let orch = orchestrator(&source);
        orch.poll_once();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _h = orch.on(Field::Mount, move |note: &Notification<'_>| {
            if let Notification::Field { value, state, .. } = note {
                sink.lock().push((value.clone(), state.mount.clone()));
            }
        });

        source.set(
            necromancer(),
            Context {
                mount_index: 6,
                ..open_world()
            },
            true,
        );
        assert_eq!(orch.poll_once(), vec![Field::Mount]);
        assert_eq!(
            *seen.lock(),
            vec![(
                FieldValue::Named(Named::new(6, "Warclaw")),
                Named::new(6, "Warclaw")
            )]
        );
    }

    #[test]
    fn panicking_subscriber_is_isolated() {
        let source = Scripted::online();
        source.set(necromancer(), open_world(), true);
        let orch = orchestrator(&source);

        let hits = Arc::new(AtomicUsize::new(0));
        let _bad = orch.on(Field::Profession, |_: &Notification<'_>| panic!("boom"));
        let counted = Arc::clone(&hits);
        let _good = orch.on(Topic::Any, move |note: &Notification<'_>| {
            if let Notification::Changed { fields, .. } = note {
                counted.fetch_add(fields.len(), Ordering::SeqCst);
            }
        });

        orch.poll_once();
        assert_eq!(hits.load(Ordering::SeqCst), Field::ALL.len());
        assert!(orch.current_state().is_some());
    }

    #[test]
    fn losing_the_producer_goes_offline() {
        let source = Scripted::online();
        source.set(necromancer(), open_world(), true);
        let orch = orchestrator(&source);
        orch.poll_once();

        source.set(necromancer(), open_world(), false);
        let changed = orch.poll_once();
        assert!(changed.contains(&Field::Connected));
        assert!(changed.contains(&Field::Profession));
        assert_eq!(orch.current_state().unwrap(), ResolvedState::disconnected());
    }

    #[test]
    fn failed_open_reads_as_disconnected() {
        let source = Scripted::default();
        let orch = orchestrator(&source);

        orch.poll_once();
        orch.poll_once();
        assert_eq!(orch.current_state().unwrap(), ResolvedState::disconnected());
        assert_eq!(source.0.lock().opens, 2);

        source.0.lock().open_ok = true;
        source.set(necromancer(), open_world(), true);
        assert!(orch.poll_once().contains(&Field::Connected));
    }

    #[tokio::test]
    async fn start_polls_immediately_and_stop_closes() {
        let source = Scripted::online();
        source.set(necromancer(), open_world(), true);
        let orch = orchestrator(&source);

        orch.start();
        orch.start();
        assert!(orch.is_running());
        for _ in 0..100 {
            if orch.current_state().is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(orch.current_state().unwrap().connected);

        orch.stop();
        assert!(!orch.is_running());
        assert_eq!(source.0.lock().closes, 1);
    }

    #[tokio::test]
    async fn restart_reports_everything_again() {
        let source = Scripted::online();
        source.set(necromancer(), open_world(), true);
        let orch = orchestrator(&source);
        orch.poll_once();

        let cycles = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&cycles);
        let _h = orch.on(Topic::Any, move |note: &Notification<'_>| {
            if let Notification::Changed { fields, .. } = note {
                sink.lock().push(fields.len());
            }
        });

        orch.restart();
        assert_eq!(source.0.lock().closes, 1);
        for _ in 0..100 {
            if !cycles.lock().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        orch.stop();
        assert_eq!(cycles.lock().first(), Some(&Field::ALL.len()));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn restart_during_blocked_read_reports_everything() {
        let source = Scripted::online();
        source.set(necromancer(), open_world(), true);
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        source.0.lock().gate = Some((entered_tx, release_rx));
        let orch = orchestrator(&source);

        let cycles = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&cycles);
        let _h = orch.on(Topic::Any, move |note: &Notification<'_>| {
            if let Notification::Changed { fields, .. } = note {
                sink.lock().push(fields.len());
            }
        });

        orch.start();
        tokio::task::spawn_blocking(move || entered_rx.recv())
            .await
            .unwrap()
            .unwrap();
        let releaser = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            release_tx.send(()).unwrap();
        });
        orch.restart();
        releaser.join().unwrap();

        for _ in 0..100 {
            if cycles.lock().len() >= 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        orch.stop();
        assert_eq!(*cycles.lock(), vec![Field::ALL.len(), Field::ALL.len()]);
        assert!(orch.current_state().unwrap().connected);
    }
}
