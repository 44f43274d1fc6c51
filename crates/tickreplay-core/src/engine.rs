//! The replay engine: virtual clock, emission timer, and prefetch timer.
//!
//! # State machine
//!
//! ```text
//! Idle --start--> Running --stop--> Stopped --resume--> Running
//!                                      \--start--> Running (fresh session)
//! ```
//!
//! `start` and `resume` while `Running` are rejected with
//! [`ReplayError::SessionAlreadyRunning`]; timers are never restarted
//! silently, because a second pair of timers would emit every bucket twice.
//!
//! # Timers
//!
//! A running session owns one driver task that multiplexes two intervals
//! with `tokio::select!`, so the timers interleave but never run
//! concurrently:
//!
//! - the **emission** interval fires every quantum, takes bucket
//!   `anchor + offset` out of the [`WindowIndex`], forwards its payloads to
//!   the transport and advances the offset. It never waits on storage.
//! - the **prefetch** interval fires every `prefetch_range_seconds` virtual
//!   seconds (first after `prefetch_start_delay_seconds`) and spawns a query
//!   for `[anchor + offset, anchor + offset + range + grace)`. The query runs
//!   detached; ticks are clock-driven, not completion-driven.
//!
//! Every scheduled prefetch window carries a generation number. A result
//! that arrives after a newer window has been scheduled is discarded, so
//! the latest-scheduled window wins.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tickreplay_types::{
    BucketKey, Instrument, ReplayState, SessionId, SessionStatus, StreamMode, TickRecord,
};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::clock::{ClockError, VirtualClock};
use crate::config::ReplayConfig;
use crate::frame::frame_bucket;
use crate::storage::{StorageError, StorageQuery};
use crate::transport::TransportSession;
use crate::window::WindowIndex;

/// Shortest emission period the driver will run at.
const MIN_EMISSION_QUANTUM: Duration = Duration::from_millis(1);

/// Errors returned by [`ReplayEngine`] lifecycle operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReplayError {
    /// No record exists at or after the requested start.
    #[error("no record for instrument {instrument} at or after {from}")]
    NotFound {
        /// Instrument that was requested.
        instrument: Instrument,
        /// Requested start time.
        from: DateTime<Utc>,
    },

    /// The gating window fetch failed.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// A session is already running; it has been left untouched.
    #[error("a replay session is already running")]
    SessionAlreadyRunning,

    /// There is no stopped session to resume.
    #[error("no stopped replay session to resume")]
    NotResumable,

    /// There is no running session to stop.
    #[error("no running replay session to stop")]
    NotRunning,

    /// The virtual clock left the representable time range.
    #[error("clock overflow: {0}")]
    ClockOverflow(#[from] ClockError),
}

impl From<StorageError> for ReplayError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { instrument, from } => Self::NotFound { instrument, from },
            StorageError::Unavailable(reason) => Self::StorageUnavailable(reason),
        }
    }
}

/// Timing and framing parameters for the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    /// Real time per virtual second.
    pub emission_quantum: Duration,
    /// Virtual seconds between prefetch ticks.
    pub prefetch_range_seconds: u32,
    /// Extra look-ahead seconds per prefetch window.
    pub prefetch_grace_seconds: u32,
    /// Virtual seconds before the first prefetch tick.
    pub prefetch_start_delay_seconds: u32,
    /// Virtual seconds fetched before emission starts.
    pub initial_window_seconds: u32,
    /// Wire framing for emitted buckets.
    pub stream_mode: StreamMode,
}

impl EngineSettings {
    /// Extract engine settings from the replay configuration.
    pub const fn from_config(config: &ReplayConfig) -> Self {
        Self {
            emission_quantum: Duration::from_millis(config.emission_quantum_ms),
            prefetch_range_seconds: config.prefetch_range_seconds,
            prefetch_grace_seconds: config.prefetch_grace_seconds,
            prefetch_start_delay_seconds: config.prefetch_start_delay_seconds,
            initial_window_seconds: config.initial_window_seconds,
            stream_mode: config.stream_mode,
        }
    }

    /// Length of one prefetch window in virtual seconds.
    pub const fn prefetch_window_seconds(&self) -> u32 {
        self.prefetch_range_seconds
            .saturating_add(self.prefetch_grace_seconds)
    }

    /// Emission period; never zero, since a zero-period interval panics.
    fn quantum(&self) -> Duration {
        self.emission_quantum.max(MIN_EMISSION_QUANTUM)
    }

    fn prefetch_period(&self) -> Duration {
        self.quantum()
            .saturating_mul(self.prefetch_range_seconds.max(1))
    }

    fn prefetch_start_delay(&self) -> Duration {
        self.quantum()
            .saturating_mul(self.prefetch_start_delay_seconds)
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from_config(&ReplayConfig::default())
    }
}

/// State shared between the driver task and detached prefetch tasks.
#[derive(Debug)]
struct SessionShared {
    clock: VirtualClock,
    window: Mutex<WindowIndex>,
    generation: AtomicU64,
}

impl SessionShared {
    fn new(anchor: BucketKey, window: WindowIndex) -> Arc<Self> {
        Arc::new(Self {
            clock: VirtualClock::new(anchor),
            window: Mutex::new(window),
            generation: AtomicU64::new(0),
        })
    }
}

/// The explicit session handle owned by the engine.
struct ReplaySession {
    id: SessionId,
    instrument: Instrument,
    anchor_time: DateTime<Utc>,
    state: ReplayState,
    needs_resume: bool,
    shared: Arc<SessionShared>,
    driver: Option<JoinHandle<()>>,
}

impl ReplaySession {
    fn ensure_resumable(&self) -> Result<(), ReplayError> {
        match self.state {
            ReplayState::Running => {
                warn!(session_id = %self.id, "Rejecting resume: session already running");
                Err(ReplayError::SessionAlreadyRunning)
            }
            ReplayState::Stopped if self.needs_resume => Ok(()),
            ReplayState::Stopped | ReplayState::Idle => Err(ReplayError::NotResumable),
        }
    }

    fn cancel_timers(&mut self) {
        if let Some(handle) = self.driver.take() {
            handle.abort();
        }
    }
}

impl Drop for ReplaySession {
    fn drop(&mut self) {
        self.cancel_timers();
    }
}

/// Replays one instrument's tick log against a virtual clock.
///
/// The engine owns at most one `ReplaySession` at a time. Storage queries
/// run outside the session lock, so `status` stays responsive while a slow
/// start is in progress. The running check is repeated under the lock
/// before a session is installed: of two concurrent starts, one wins and
/// the other is rejected.
pub struct ReplayEngine<S> {
    storage: Arc<S>,
    settings: EngineSettings,
    session: Mutex<Option<ReplaySession>>,
}

impl<S: StorageQuery> ReplayEngine<S> {
    /// Create an idle engine over `storage`.
    pub fn new(storage: Arc<S>, settings: EngineSettings) -> Self {
        Self {
            storage,
            settings,
            session: Mutex::new(None),
        }
    }

    /// Return the storage backend.
    pub const fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    /// Start a fresh session replaying `instrument` from `from`.
    ///
    /// Resolves the anchor, fetches the initial window synchronously, and
    /// only then starts the emission and prefetch timers. A stopped session
    /// is discarded and replaced.
    ///
    /// # Errors
    ///
    /// - [`ReplayError::SessionAlreadyRunning`] if a session is running.
    /// - [`ReplayError::NotFound`] if nothing was recorded at or after `from`.
    /// - [`ReplayError::StorageUnavailable`] if a gating query fails.
    pub async fn start(
        &self,
        instrument: Instrument,
        from: DateTime<Utc>,
        transport: Arc<dyn TransportSession>,
    ) -> Result<SessionId, ReplayError> {
        if self.state().await == ReplayState::Running {
            warn!(%instrument, "Rejecting start: session already running");
            return Err(ReplayError::SessionAlreadyRunning);
        }

        let anchor_time = self
            .storage
            .first_timestamp_at_or_after(&instrument, from)
            .await?;
        let anchor = BucketKey::from_timestamp(anchor_time);
        let records = fetch_window(
            self.storage.as_ref(),
            &instrument,
            anchor_time,
            anchor,
            self.settings.initial_window_seconds,
        )
        .await?;

        let mut guard = self.session.lock().await;
        if guard.as_ref().is_some_and(|s| s.state == ReplayState::Running) {
            warn!(%instrument, "Rejecting start: another session started first");
            return Err(ReplayError::SessionAlreadyRunning);
        }

        let shared = SessionShared::new(anchor, WindowIndex::from_records(&records));
        let id = SessionId::new();
        let driver = self.spawn_driver(id, &instrument, anchor_time, &shared, transport);

        info!(
            session_id = %id,
            %instrument,
            requested = %from,
            anchor = %anchor,
            initial_records = records.len(),
            "Replay session started"
        );

        *guard = Some(ReplaySession {
            id,
            instrument,
            anchor_time,
            state: ReplayState::Running,
            needs_resume: false,
            shared,
            driver: Some(driver),
        });
        Ok(id)
    }

    /// Resume the stopped session, delivering to `transport`.
    ///
    /// The initial window is refetched at the session's original anchor
    /// (not "now"), the window index is replaced, and the virtual offset is
    /// reset to 0, so the consumer replays the session from its anchor.
    ///
    /// # Errors
    ///
    /// - [`ReplayError::SessionAlreadyRunning`] if the session is running.
    /// - [`ReplayError::NotResumable`] if there is no stopped session.
    /// - [`ReplayError::StorageUnavailable`] if the window fetch fails; the
    ///   session stays stopped and can be resumed again.
    pub async fn resume(&self, transport: Arc<dyn TransportSession>) -> Result<SessionId, ReplayError> {
        let (id, instrument, anchor_time, anchor) = {
            let guard = self.session.lock().await;
            let Some(session) = guard.as_ref() else {
                return Err(ReplayError::NotResumable);
            };
            session.ensure_resumable()?;
            (
                session.id,
                session.instrument.clone(),
                session.anchor_time,
                session.shared.clock.anchor(),
            )
        };

        let records = fetch_window(
            self.storage.as_ref(),
            &instrument,
            anchor_time,
            anchor,
            self.settings.initial_window_seconds,
        )
        .await?;

        let mut guard = self.session.lock().await;
        let Some(session) = guard.as_mut() else {
            return Err(ReplayError::NotResumable);
        };
        session.ensure_resumable()?;
        if session.id != id {
            return Err(ReplayError::NotResumable);
        }

        let shared = SessionShared::new(anchor, WindowIndex::from_records(&records));
        let driver = self.spawn_driver(
            session.id,
            &session.instrument,
            session.anchor_time,
            &shared,
            transport,
        );
        session.shared = shared;
        session.driver = Some(driver);
        session.state = ReplayState::Running;
        session.needs_resume = false;

        info!(
            session_id = %session.id,
            instrument = %session.instrument,
            anchor = %anchor,
            initial_records = records.len(),
            "Replay session resumed"
        );
        Ok(session.id)
    }

    /// Cancel both timers and cache the session for resume.
    ///
    /// The window index is retained. A prefetch query already in flight
    /// still completes and merges into the retained window.
    ///
    /// # Errors
    ///
    /// Returns [`ReplayError::NotRunning`] if no session is running.
    pub async fn stop(&self) -> Result<(), ReplayError> {
        let mut guard = self.session.lock().await;
        let Some(session) = guard.as_mut().filter(|s| s.state == ReplayState::Running) else {
            return Err(ReplayError::NotRunning);
        };
        session.cancel_timers();
        session.state = ReplayState::Stopped;
        session.needs_resume = true;
        info!(
            session_id = %session.id,
            offset = session.shared.clock.offset(),
            "Replay session stopped"
        );
        Ok(())
    }

    /// Return the current lifecycle state.
    pub async fn state(&self) -> ReplayState {
        self.session
            .lock()
            .await
            .as_ref()
            .map_or(ReplayState::Idle, |s| s.state)
    }

    /// Return a point-in-time snapshot of the session.
    pub async fn status(&self) -> SessionStatus {
        let guard = self.session.lock().await;
        let Some(session) = guard.as_ref() else {
            return SessionStatus::idle();
        };
        let buffered_buckets = session.shared.window.lock().await.pending_buckets();
        SessionStatus {
            state: session.state,
            session_id: Some(session.id),
            instrument: Some(session.instrument.clone()),
            anchor_time: Some(session.anchor_time),
            virtual_offset: session.shared.clock.offset(),
            needs_resume: session.needs_resume,
            buffered_buckets,
        }
    }

    fn spawn_driver(
        &self,
        session_id: SessionId,
        instrument: &Instrument,
        anchor_time: DateTime<Utc>,
        shared: &Arc<SessionShared>,
        transport: Arc<dyn TransportSession>,
    ) -> JoinHandle<()> {
        let driver = Driver {
            session_id,
            storage: Arc::clone(&self.storage),
            shared: Arc::clone(shared),
            transport,
            instrument: instrument.clone(),
            anchor_time,
            settings: self.settings,
        };
        tokio::spawn(driver.run())
    }
}

/// Fetch `seconds` virtual seconds starting at bucket `from`, dropping
/// records that precede the session anchor inside the anchor's second.
async fn fetch_window<S: StorageQuery>(
    storage: &S,
    instrument: &Instrument,
    anchor_time: DateTime<Utc>,
    from: BucketKey,
    seconds: u32,
) -> Result<Vec<TickRecord>, StorageError> {
    let mut records = storage
        .records_in_window(instrument, from.start(), seconds)
        .await?;
    records.retain(|r| r.timestamp >= anchor_time);
    Ok(records)
}

/// Everything the timer task of one running session needs.
struct Driver<S> {
    session_id: SessionId,
    storage: Arc<S>,
    shared: Arc<SessionShared>,
    transport: Arc<dyn TransportSession>,
    instrument: Instrument,
    anchor_time: DateTime<Utc>,
    settings: EngineSettings,
}

impl<S: StorageQuery> Driver<S> {
    async fn run(self) {
        let start = Instant::now();
        let mut emission = tokio::time::interval_at(start, self.settings.quantum());
        emission.set_missed_tick_behavior(MissedTickBehavior::Burst);

        let first_prefetch = start
            .checked_add(self.settings.prefetch_start_delay())
            .unwrap_or(start);
        let mut prefetch = tokio::time::interval_at(first_prefetch, self.settings.prefetch_period());
        prefetch.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = emission.tick() => {
                    if let Err(e) = self.emit_next().await {
                        warn!(session_id = %self.session_id, error = %e, "Emission halted");
                        return;
                    }
                }
                _ = prefetch.tick() => self.schedule_prefetch(),
            }
        }
    }

    /// Emission timer body: take the current bucket, forward it, advance.
    async fn emit_next(&self) -> Result<(), ClockError> {
        let clock = &self.shared.clock;
        let key = clock.current_key()?;
        let (payloads, held) = {
            let mut window = self.shared.window.lock().await;
            let payloads = window.take(key);
            window.reclaim_before(key);
            (payloads, window.len())
        };

        debug!(
            session_id = %self.session_id,
            bucket = %key,
            offset = clock.offset(),
            records = payloads.len(),
            held,
            "Emitting bucket"
        );

        match frame_bucket(self.settings.stream_mode, payloads) {
            Ok(frames) => {
                for frame in frames {
                    if self.transport.send(frame).is_err() {
                        debug!(session_id = %self.session_id, "Transport closed, dropping bucket");
                        break;
                    }
                }
            }
            Err(e) => warn!(bucket = %key, error = %e, "Failed to frame bucket"),
        }

        clock.advance()?;
        Ok(())
    }

    /// Prefetch timer body: tag a new window and query it in the background.
    fn schedule_prefetch(&self) {
        let generation = self
            .shared
            .generation
            .fetch_add(1, Ordering::AcqRel)
            .wrapping_add(1);
        let offset = self.shared.clock.offset();
        let from = match self.shared.clock.key_at(offset) {
            Ok(key) => key,
            Err(e) => {
                warn!(session_id = %self.session_id, error = %e, "Skipping prefetch");
                return;
            }
        };
        let seconds = self.settings.prefetch_window_seconds();

        debug!(
            session_id = %self.session_id,
            generation,
            from = %from,
            seconds,
            "Scheduling prefetch window"
        );

        let storage = Arc::clone(&self.storage);
        let shared = Arc::clone(&self.shared);
        let instrument = self.instrument.clone();
        let anchor_time = self.anchor_time;
        let session_id = self.session_id;
        tokio::spawn(async move {
            let result = fetch_window(storage.as_ref(), &instrument, anchor_time, from, seconds).await;
            let records = match result {
                Ok(records) => records,
                Err(e) => {
                    warn!(
                        %session_id,
                        generation,
                        from = %from,
                        error = %e,
                        "Prefetch failed, retrying next cycle"
                    );
                    return;
                }
            };

            let mut window = shared.window.lock().await;
            let latest = shared.generation.load(Ordering::Acquire);
            if latest != generation {
                debug!(%session_id, generation, latest, "Discarding stale prefetch window");
                return;
            }
            let summary = window.merge(&records);
            debug!(
                %session_id,
                generation,
                from = %from,
                buckets_written = summary.buckets_written,
                buckets_skipped = summary.buckets_skipped,
                records = summary.records_written,
                "Prefetch window merged"
            );
        });
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use chrono::{TimeDelta, TimeZone};
    use tokio::sync::mpsc;

    use super::*;
    use crate::storage::MemoryStore;
    use crate::transport::ChannelTransport;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2022, 6, 21, 9, 0, 0).unwrap()
    }

    fn at(secs: i64) -> DateTime<Utc> {
        t0() + TimeDelta::seconds(secs)
    }

    fn instrument() -> Instrument {
        Instrument::new("7974").unwrap()
    }

    fn engine(records: Vec<TickRecord>) -> ReplayEngine<MemoryStore> {
        let store = Arc::new(MemoryStore::new(instrument(), records));
        ReplayEngine::new(store, EngineSettings::default())
    }

    fn transport() -> (Arc<dyn TransportSession>, mpsc::UnboundedReceiver<String>) {
        let (transport, rx) = ChannelTransport::new();
        (Arc::new(transport), rx)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<String>) -> Vec<String> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(msg);
        }
        out
    }

    #[tokio::test(start_paused = true)]
    async fn start_anchors_on_first_record_and_emits_in_virtual_time() {
        let engine = engine(vec![
            TickRecord::new(1, at(2), "A".to_owned()),
            TickRecord::new(2, at(6), "B".to_owned()),
        ]);
        let (tx, mut rx) = transport();
        engine.start(instrument(), t0(), tx).await.unwrap();

        let status = engine.status().await;
        assert_eq!(status.anchor_time, Some(at(2)));
        assert_eq!(status.state, ReplayState::Running);

        // Offset 0 fires immediately.
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(drain(&mut rx), vec!["A"]);

        // Offsets 1-3 are empty.
        tokio::time::sleep(Duration::from_millis(3000)).await;
        assert!(drain(&mut rx).is_empty());

        // Offset 4 carries B.
        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(drain(&mut rx), vec!["B"]);
        assert_eq!(engine.status().await.virtual_offset, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn start_without_records_is_not_found() {
        let engine = engine(vec![TickRecord::new(1, at(2), "A".to_owned())]);
        let (tx, _rx) = transport();
        let result = engine.start(instrument(), at(3), tx).await;
        assert!(matches!(result, Err(ReplayError::NotFound { .. })));
        assert_eq!(engine.state().await, ReplayState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn double_start_is_rejected() {
        let engine = engine(vec![TickRecord::new(1, at(0), "A".to_owned())]);
        let (tx, _rx) = transport();
        engine.start(instrument(), t0(), Arc::clone(&tx)).await.unwrap();
        let second = engine.start(instrument(), t0(), tx).await;
        assert_eq!(second, Err(ReplayError::SessionAlreadyRunning));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_then_resume_transitions() {
        let engine = engine(vec![TickRecord::new(1, at(0), "A".to_owned())]);
        let (tx, _rx) = transport();
        assert_eq!(engine.resume(Arc::clone(&tx)).await, Err(ReplayError::NotResumable));
        assert_eq!(engine.stop().await, Err(ReplayError::NotRunning));

        engine.start(instrument(), t0(), Arc::clone(&tx)).await.unwrap();
        engine.stop().await.unwrap();
        let status = engine.status().await;
        assert_eq!(status.state, ReplayState::Stopped);
        assert!(status.needs_resume);

        engine.resume(Arc::clone(&tx)).await.unwrap();
        assert_eq!(engine.state().await, ReplayState::Running);
        assert_eq!(engine.resume(tx).await, Err(ReplayError::SessionAlreadyRunning));
    }

    #[tokio::test(start_paused = true)]
    async fn batched_mode_sends_one_array_per_second() {
        let store = Arc::new(MemoryStore::new(
            instrument(),
            vec![
                TickRecord::new(1, at(0), "{\"p\":1}".to_owned()),
                TickRecord::new(2, at(0), "{\"p\":2}".to_owned()),
            ],
        ));
        let settings = EngineSettings {
            stream_mode: StreamMode::Batched,
            ..EngineSettings::default()
        };
        let engine = ReplayEngine::new(store, settings);
        let (tx, mut rx) = transport();
        engine.start(instrument(), t0(), tx).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(drain(&mut rx), vec!["[{\"p\":1},{\"p\":2}]"]);
    }

    #[tokio::test(start_paused = true)]
    async fn anchor_second_excludes_records_before_requested_start() {
        let engine = engine(vec![
            TickRecord::new(1, t0() + TimeDelta::milliseconds(100), "early".to_owned()),
            TickRecord::new(2, t0() + TimeDelta::milliseconds(700), "late".to_owned()),
        ]);
        let (tx, mut rx) = transport();
        engine
            .start(instrument(), t0() + TimeDelta::milliseconds(500), tx)
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(drain(&mut rx), vec!["late"]);
    }

    #[tokio::test(start_paused = true)]
    async fn status_answers_while_start_waits_on_storage() {
        let store = MemoryStore::new(instrument(), vec![TickRecord::new(1, at(0), "A".to_owned())])
            .with_latency(Duration::from_secs(2));
        let engine = Arc::new(ReplayEngine::new(Arc::new(store), EngineSettings::default()));
        let (tx, _rx) = transport();
        let starting = tokio::spawn({
            let engine = Arc::clone(&engine);
            async move { engine.start(instrument(), t0(), tx).await }
        });

        tokio::time::sleep(Duration::from_millis(500)).await;
        let asked = Instant::now();
        assert_eq!(engine.status().await.state, ReplayState::Idle);
        assert_eq!(asked.elapsed(), Duration::ZERO);

        starting.await.unwrap().unwrap();
        assert_eq!(engine.state().await, ReplayState::Running);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_starts_install_one_session() {
        let store = MemoryStore::new(instrument(), vec![TickRecord::new(1, at(0), "A".to_owned())])
            .with_latency(Duration::from_secs(1));
        let engine = Arc::new(ReplayEngine::new(Arc::new(store), EngineSettings::default()));
        let spawn_start = || {
            let engine = Arc::clone(&engine);
            let (tx, _rx) = transport();
            tokio::spawn(async move { engine.start(instrument(), t0(), tx).await })
        };
        let first = spawn_start();
        let second = spawn_start();
        let results = [first.await.unwrap(), second.await.unwrap()];

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results.contains(&Err(ReplayError::SessionAlreadyRunning)));

        // One emission timer: offsets 0, 1, 2 in two and a half quanta.
        tokio::time::sleep(Duration::from_millis(2_500)).await;
        assert_eq!(engine.status().await.virtual_offset, 3);
    }

    #[test]
    fn storage_errors_map_onto_replay_errors() {
        let err: ReplayError = StorageError::Unavailable("down".to_owned()).into();
        assert_eq!(err, ReplayError::StorageUnavailable("down".to_owned()));
    }

    #[test]
    fn settings_derive_timer_periods() {
        let settings = EngineSettings::default();
        assert_eq!(settings.prefetch_period(), Duration::from_secs(10));
        assert_eq!(settings.prefetch_start_delay(), Duration::from_secs(5));
        assert_eq!(settings.prefetch_window_seconds(), 13);
    }
}
