//! Periodic capture loop.
//!
//! `CaptureLoop` fires a tick every `interval` seconds while active. Each
//! tick grabs a frame, has it analysed, commits the result to the
//! [`LogStore`], and speaks feedback. At most one analysis is in flight at a
//! time: a tick that fires while an earlier one is still analysing is
//! skipped. Results of an analysis that was in flight when the loop was
//! stopped are discarded. A capture that takes longer than
//! [`CAPTURE_TIMEOUT`] is abandoned and the tick counts as having no frame.

pub mod preprocess;
pub mod source;
pub mod speech;

pub use source::{
    create_source, CaptureError, CommandFrameSource, FileFrameSource, FrameSource,
};
pub use speech::{create_speaker, CommandSpeaker, NullSpeaker, Speaker, SpeechError};

use crate::agent::{AnalysisClient, AnalysisResult, Frame, Presence};
use crate::config::{clamp_interval, CaptureConfig, SpeechConfig};
use crate::history::{LogEntry, LogStore};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Upper bound on a single frame grab. Dropping the capture future kills a
/// command source's child process.
pub const CAPTURE_TIMEOUT: Duration = Duration::from_secs(10);

/// What a single tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Result committed to history
    Completed(LogEntry),
    /// An earlier analysis was still running; nothing captured
    SkippedInFlight,
    /// The camera had no frame to give
    NoFrame,
    /// The loop was stopped before the tick could start
    Stopped,
    /// The loop was stopped while analysing; result dropped
    Discarded(AnalysisResult),
}

impl TickOutcome {
    fn label(&self) -> &'static str {
        match self {
            TickOutcome::Completed(_) => "completed",
            TickOutcome::SkippedInFlight => "skipped_in_flight",
            TickOutcome::NoFrame => "no_frame",
            TickOutcome::Stopped => "stopped",
            TickOutcome::Discarded(_) => "discarded",
        }
    }
}

/// Tunables for the loop, usually derived from configuration.
#[derive(Debug, Clone)]
pub struct LoopOptions {
    pub interval_seconds: u64,
    pub preprocess: bool,
    pub hint_prefix: String,
    pub absent_prompt: String,
}

impl LoopOptions {
    pub fn from_config(capture: &CaptureConfig, speech: &SpeechConfig) -> Self {
        Self {
            interval_seconds: capture.interval_seconds,
            preprocess: capture.preprocess,
            hint_prefix: speech.hint_prefix.clone(),
            absent_prompt: speech.absent_prompt.clone(),
        }
    }
}

impl Default for LoopOptions {
    fn default() -> Self {
        Self::from_config(&CaptureConfig::default(), &SpeechConfig::default())
    }
}

/// Releases the in-flight flag on drop.
struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

struct Running {
    cancel: CancellationToken,
    _handle: JoinHandle<()>,
}

/// State shared between the loop handle, the scheduler task, and tick tasks.
struct Shared {
    source: Arc<dyn FrameSource>,
    client: AnalysisClient,
    store: Arc<LogStore>,
    speaker: Arc<dyn Speaker>,
    preprocess: bool,
    hint_prefix: String,
    absent_prompt: String,
    interval_secs: AtomicU64,
    in_flight: AtomicBool,
    /// Bumped on every start and stop
    epoch: AtomicU64,
}

/// Timer-driven capture → analyse → record → speak loop.
pub struct CaptureLoop {
    shared: Arc<Shared>,
    running: Mutex<Option<Running>>,
}

impl CaptureLoop {
    pub fn new(
        source: Arc<dyn FrameSource>,
        client: AnalysisClient,
        store: Arc<LogStore>,
        speaker: Arc<dyn Speaker>,
        options: LoopOptions,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                source,
                client,
                store,
                speaker,
                preprocess: options.preprocess,
                hint_prefix: options.hint_prefix,
                absent_prompt: options.absent_prompt,
                interval_secs: AtomicU64::new(clamp_interval(options.interval_seconds)),
                in_flight: AtomicBool::new(false),
                epoch: AtomicU64::new(0),
            }),
            running: Mutex::new(None),
        }
    }

    /// Begin scheduling ticks. Returns false if already active.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self) -> bool {
        let mut running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
        if running.is_some() {
            return false;
        }

        let epoch = self.shared.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(Arc::clone(&self.shared).run(cancel.clone(), epoch));

        *running = Some(Running {
            cancel,
            _handle: handle,
        });
        true
    }

    /// Stop scheduling ticks. Returns false if already idle.
    pub fn stop(&self) -> bool {
        let running = self
            .running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        match running {
            Some(running) => {
                self.shared.epoch.fetch_add(1, Ordering::SeqCst);
                running.cancel.cancel();
                true
            }
            None => false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Change the interval; values below the floor are raised to it.
    ///
    /// While active, the new value applies from the next scheduling cycle.
    pub fn set_interval(&self, seconds: u64) -> u64 {
        let effective = clamp_interval(seconds);
        self.shared.interval_secs.store(effective, Ordering::SeqCst);
        tracing::info!(interval_seconds = effective, "Capture interval changed");
        effective
    }

    /// Effective interval in seconds.
    pub fn interval(&self) -> u64 {
        self.shared.interval_secs.load(Ordering::SeqCst)
    }

    /// Run one tick now, outside the schedule.
    pub async fn tick(&self) -> TickOutcome {
        let epoch = self.shared.epoch.load(Ordering::SeqCst);
        self.shared.tick(epoch).await
    }

    pub fn store(&self) -> &Arc<LogStore> {
        &self.shared.store
    }
}

impl Drop for CaptureLoop {
    fn drop(&mut self) {
        self.stop();
    }
}

impl Shared {
    async fn run(self: Arc<Self>, cancel: CancellationToken, epoch: u64) {
        tracing::info!(
            interval_seconds = self.interval_secs.load(Ordering::SeqCst),
            source = %self.source.describe(),
            "Capture loop started"
        );

        loop {
            // Re-read each cycle so interval changes apply to the next tick
            let interval = Duration::from_secs(self.interval_secs.load(Ordering::SeqCst));

            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Capture loop stopped");
                    break;
                }
                _ = tokio::time::sleep(interval) => {
                    // Ticks run detached so a slow analysis never delays the schedule
                    let shared = Arc::clone(&self);
                    tokio::spawn(async move {
                        let outcome = shared.tick(epoch).await;
                        tracing::debug!(outcome = outcome.label(), "Tick finished");
                    });
                }
            }
        }
    }

    async fn tick(&self, epoch: u64) -> TickOutcome {
        let outcome = self.tick_inner(epoch).await;
        metrics::counter!("studycam_ticks_total", "outcome" => outcome.label()).increment(1);
        outcome
    }

    async fn tick_inner(&self, epoch: u64) -> TickOutcome {
        if self.epoch.load(Ordering::SeqCst) != epoch {
            return TickOutcome::Stopped;
        }

        let Some(guard) = InFlightGuard::acquire(&self.in_flight) else {
            tracing::debug!("Previous analysis still in flight, skipping tick");
            return TickOutcome::SkippedInFlight;
        };

        let frame = match tokio::time::timeout(CAPTURE_TIMEOUT, self.source.capture()).await {
            Ok(Ok(Some(frame))) if !frame.is_empty() => frame,
            Ok(Ok(_)) => {
                tracing::debug!("No frame available, skipping tick");
                return TickOutcome::NoFrame;
            }
            Ok(Err(e)) => {
                tracing::debug!(error = %e, "Frame capture failed, skipping tick");
                return TickOutcome::NoFrame;
            }
            Err(_) => {
                tracing::warn!(
                    source = %self.source.describe(),
                    timeout_seconds = CAPTURE_TIMEOUT.as_secs(),
                    "Frame capture timed out, skipping tick"
                );
                return TickOutcome::NoFrame;
            }
        };

        let frame = if self.preprocess {
            Self::enhance(frame).await
        } else {
            frame
        };

        let result = self.client.analyze(&frame).await;

        if self.epoch.load(Ordering::SeqCst) != epoch {
            tracing::info!("Capture loop stopped during analysis, discarding result");
            return TickOutcome::Discarded(result);
        }

        let entry = self.store.append(result);
        drop(guard);

        self.give_feedback(&entry.result).await;
        TickOutcome::Completed(entry)
    }

    /// Preprocess off the async threads, falling back to the raw frame.
    async fn enhance(frame: Frame) -> Frame {
        let raw = frame.clone();
        match tokio::task::spawn_blocking(move || preprocess::enhance_or_raw(frame)).await {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(error = %e, "Preprocessing task failed, analysing raw frame");
                raw
            }
        }
    }

    async fn give_feedback(&self, result: &AnalysisResult) {
        let utterance = if result.need_hint && !result.hint.is_empty() {
            format!("{}{}", self.hint_prefix, result.hint)
        } else if result.present == Presence::Absent {
            self.absent_prompt.clone()
        } else {
            return;
        };

        if let Err(e) = self.speaker.speak(&utterance).await {
            tracing::warn!(error = %e, "Spoken feedback failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{AgentError, AgentProfile, VisionAgent};
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Notify;

    /// Hands out a fixed frame and counts captures.
    #[derive(Default)]
    struct CountingSource {
        captures: AtomicUsize,
        empty: bool,
        /// The first capture never completes
        hang_first: bool,
    }

    #[async_trait]
    impl FrameSource for CountingSource {
        async fn capture(&self) -> Result<Option<Frame>, CaptureError> {
            let previous = self.captures.fetch_add(1, Ordering::SeqCst);
            if self.hang_first && previous == 0 {
                std::future::pending::<()>().await;
            }
            if self.empty {
                Ok(None)
            } else {
                Ok(Some(Frame::jpeg(vec![0xff, 0xd8])))
            }
        }

        fn describe(&self) -> String {
            "counting".to_string()
        }
    }

    /// Replies with a fixed result; optionally waits for `release` first.
    struct ScriptedAgent {
        reply: Result<AnalysisResult, String>,
        gated: bool,
        entered: Notify,
        release: Notify,
        calls: AtomicUsize,
    }

    impl ScriptedAgent {
        fn ok(result: AnalysisResult) -> Self {
            Self {
                reply: Ok(result),
                gated: false,
                entered: Notify::new(),
                release: Notify::new(),
                calls: AtomicUsize::new(0),
            }
        }

        fn failing(message: &str) -> Self {
            Self {
                reply: Err(message.to_string()),
                ..Self::ok(AnalysisResult::default())
            }
        }

        fn gated(result: AnalysisResult) -> Self {
            Self {
                gated: true,
                ..Self::ok(result)
            }
        }
    }

    #[async_trait]
    impl VisionAgent for ScriptedAgent {
        fn id(&self) -> &str {
            "scripted"
        }

        fn name(&self) -> &str {
            "Scripted"
        }

        fn profile(&self) -> AgentProfile {
            AgentProfile {
                backend_type: "scripted".to_string(),
                model: "test".to_string(),
                remote: false,
            }
        }

        async fn analyze(&self, _frame: &Frame) -> Result<AnalysisResult, AgentError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.gated {
                self.entered.notify_one();
                self.release.notified().await;
            }
            self.reply.clone().map_err(AgentError::Network)
        }
    }

    #[derive(Default)]
    struct RecordingSpeaker {
        spoken: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Speaker for RecordingSpeaker {
        async fn speak(&self, text: &str) -> Result<(), SpeechError> {
            self.spoken.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    struct Harness {
        source: Arc<CountingSource>,
        agent: Arc<ScriptedAgent>,
        speaker: Arc<RecordingSpeaker>,
        store: Arc<LogStore>,
        capture: Arc<CaptureLoop>,
    }

    fn harness(agent: ScriptedAgent, source: CountingSource, interval: u64) -> Harness {
        let source = Arc::new(source);
        let agent = Arc::new(agent);
        let speaker = Arc::new(RecordingSpeaker::default());
        let store = Arc::new(LogStore::in_memory());

        let options = LoopOptions {
            interval_seconds: interval,
            preprocess: false,
            hint_prefix: "Hint: ".to_string(),
            absent_prompt: "Nobody is here.".to_string(),
        };
        let capture = Arc::new(CaptureLoop::new(
            source.clone(),
            AnalysisClient::new(agent.clone(), Duration::from_secs(30)),
            store.clone(),
            speaker.clone(),
            options,
        ));

        Harness {
            source,
            agent,
            speaker,
            store,
            capture,
        }
    }

    fn present(page: &str) -> AnalysisResult {
        AnalysisResult {
            present: Presence::Present,
            page: page.to_string(),
            status: "solving".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_tick_commits_result() {
        let h = harness(ScriptedAgent::ok(present("12")), CountingSource::default(), 5);

        let outcome = h.capture.tick().await;

        let entry = match outcome {
            TickOutcome::Completed(entry) => entry,
            other => panic!("expected Completed, got {:?}", other),
        };
        assert_eq!(entry.result.page, "12");
        assert_eq!(h.store.list(), vec![entry]);
        assert!(h.speaker.spoken.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_tick_without_frame_is_silent_skip() {
        let source = CountingSource {
            empty: true,
            ..Default::default()
        };
        let h = harness(ScriptedAgent::ok(present("1")), source, 5);

        assert_eq!(h.capture.tick().await, TickOutcome::NoFrame);
        assert_eq!(h.agent.calls.load(Ordering::SeqCst), 0);
        assert!(h.store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_capture_times_out_and_frees_loop() {
        let source = CountingSource {
            hang_first: true,
            ..Default::default()
        };
        let h = harness(ScriptedAgent::ok(present("8")), source, 5);

        let started = tokio::time::Instant::now();
        assert_eq!(h.capture.tick().await, TickOutcome::NoFrame);
        assert!(started.elapsed() >= CAPTURE_TIMEOUT);
        assert_eq!(h.agent.calls.load(Ordering::SeqCst), 0);

        // The in-flight flag was released with the abandoned capture
        assert!(matches!(h.capture.tick().await, TickOutcome::Completed(_)));
        assert_eq!(h.source.captures.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_capture_does_not_stall_schedule() {
        let source = CountingSource {
            hang_first: true,
            ..Default::default()
        };
        let h = harness(ScriptedAgent::ok(present("8")), source, 6);
        h.capture.start();

        // t=6 hangs until t=16; t=12 is skipped; t=18 and t=24 commit
        tokio::time::sleep(Duration::from_secs(25)).await;

        assert_eq!(h.store.len(), 2);
        assert!(h.capture.is_active());
    }

    #[tokio::test]
    async fn test_hint_is_spoken() {
        let result = AnalysisResult {
            need_hint: true,
            hint: "Re-read the question.".to_string(),
            ..present("3")
        };
        let h = harness(ScriptedAgent::ok(result), CountingSource::default(), 5);

        h.capture.tick().await;

        assert_eq!(
            *h.speaker.spoken.lock().unwrap(),
            vec!["Hint: Re-read the question.".to_string()]
        );
    }

    #[tokio::test]
    async fn test_need_hint_without_text_falls_through_to_absent() {
        let result = AnalysisResult {
            present: Presence::Absent,
            need_hint: true,
            ..Default::default()
        };
        let h = harness(ScriptedAgent::ok(result), CountingSource::default(), 5);

        h.capture.tick().await;

        assert_eq!(
            *h.speaker.spoken.lock().unwrap(),
            vec!["Nobody is here.".to_string()]
        );
    }

    #[tokio::test]
    async fn test_unknown_presence_is_not_spoken() {
        let h = harness(
            ScriptedAgent::failing("connection refused"),
            CountingSource::default(),
            5,
        );

        let outcome = h.capture.tick().await;

        assert!(matches!(outcome, TickOutcome::Completed(ref e) if e.result.is_error()));
        assert!(h.speaker.spoken.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_overlapping_tick_is_skipped() {
        let h = harness(
            ScriptedAgent::gated(present("5")),
            CountingSource::default(),
            5,
        );

        let first = tokio::spawn({
            let capture = Arc::clone(&h.capture);
            async move { capture.tick().await }
        });
        h.agent.entered.notified().await;

        // Second tick while the first is still analysing
        assert_eq!(h.capture.tick().await, TickOutcome::SkippedInFlight);
        assert_eq!(h.source.captures.load(Ordering::SeqCst), 1);
        assert_eq!(h.agent.calls.load(Ordering::SeqCst), 1);

        h.agent.release.notify_one();
        assert!(matches!(first.await.unwrap(), TickOutcome::Completed(_)));

        // Guard released: the next tick runs again
        h.agent.release.notify_one();
        assert!(matches!(h.capture.tick().await, TickOutcome::Completed(_)));
        assert_eq!(h.store.len(), 2);
    }

    #[test]
    fn test_interval_floor() {
        let h = harness(ScriptedAgent::ok(present("1")), CountingSource::default(), 2);
        assert_eq!(h.capture.interval(), 5);

        for requested in [0, 1, 4, 5] {
            assert_eq!(h.capture.set_interval(requested), 5);
            assert_eq!(h.capture.interval(), 5);
        }
        assert_eq!(h.capture.set_interval(12), 12);
    }

    #[tokio::test(start_paused = true)]
    async fn test_schedule_fires_every_interval() {
        let h = harness(ScriptedAgent::ok(present("1")), CountingSource::default(), 5);

        assert!(h.capture.start());
        assert!(!h.capture.start());
        assert!(h.capture.is_active());

        tokio::time::sleep(Duration::from_secs(16)).await;

        assert_eq!(h.source.captures.load(Ordering::SeqCst), 3);
        assert_eq!(h.store.len(), 3);

        assert!(h.capture.stop());
        assert!(!h.capture.stop());
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(h.source.captures.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_do_not_stop_schedule() {
        let h = harness(
            ScriptedAgent::failing("connection refused"),
            CountingSource::default(),
            5,
        );
        h.capture.start();

        tokio::time::sleep(Duration::from_secs(11)).await;

        let entries = h.store.list();
        assert_eq!(entries.len(), 2);
        for entry in &entries {
            assert_eq!(entry.result.status, "error");
            assert_eq!(entry.result.present, Presence::Unknown);
            assert!(entry.result.error.as_deref().unwrap().starts_with("Scripted"));
        }
        assert!(h.capture.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_change_applies_next_cycle() {
        let h = harness(ScriptedAgent::ok(present("1")), CountingSource::default(), 5);
        h.capture.start();

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(h.source.captures.load(Ordering::SeqCst), 1);

        // The sleep for t=10 is already scheduled with the old interval
        h.capture.set_interval(20);
        tokio::time::sleep(Duration::from_secs(23)).await; // t=29
        assert_eq!(h.source.captures.load(Ordering::SeqCst), 2);

        tokio::time::sleep(Duration::from_secs(2)).await; // t=31
        assert_eq!(h.source.captures.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_discards_in_flight_result() {
        let h = harness(
            ScriptedAgent::gated(AnalysisResult {
                present: Presence::Absent,
                ..Default::default()
            }),
            CountingSource::default(),
            5,
        );
        h.capture.start();

        tokio::time::sleep(Duration::from_secs(6)).await;
        h.agent.entered.notified().await;

        h.capture.stop();
        h.agent.release.notify_one();
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert!(h.store.is_empty());
        assert!(h.speaker.spoken.lock().unwrap().is_empty());

        // Restarting begins a fresh epoch and commits again
        h.agent.release.notify_one();
        h.capture.start();
        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(h.store.len(), 1);
    }
}
