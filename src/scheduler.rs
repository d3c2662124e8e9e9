//! The frame loop.
//!
//! [`FrameScheduler::spawn`] starts a thread that owns every part of the overlay. It first waits
//! until the render surface has been synchronized to the size of the displayed video (see
//! [`SizeSync`]), then processes one frame per [`FrameClock`] tick until it is cancelled. A frame
//! is always processed completely before the next tick is awaited, so under load ticks are
//! skipped rather than queued.

use std::{
    io,
    panic::resume_unwind,
    sync::{
        atomic::{AtomicU8, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use crossbeam_channel::{RecvTimeoutError, Sender, TryRecvError};

use crate::config::OverlayOptions;
use crate::image::Resolution;
use crate::landmark::{AttributeDetection, MeshSubject, PoseSubject};
use crate::model::{AttributeConfig, Frame, MeshConfig, Model, PoseConfig};
use crate::orchestrator::Orchestrator;
use crate::render::RenderSurface;
use crate::telemetry::{LogSink, TelemetrySink};
use crate::toggle::Toggles;

/// The video being annotated.
pub trait VideoSource {
    /// The size at which the video is currently displayed.
    ///
    /// Returns an empty [`Resolution`] while no video is playing yet.
    fn display_resolution(&self) -> Resolution;

    /// Returns the frame that is currently displayed.
    fn current_frame(&mut self) -> anyhow::Result<Frame>;
}

/// Paces the frame loop, typically to the display's refresh rate.
pub trait FrameClock {
    /// Blocks until the next frame should be processed.
    ///
    /// Returns `false` if `cancel` was triggered while waiting.
    fn wait_for_frame(&mut self, cancel: &Cancellation) -> bool;
}

/// A [`FrameClock`] that ticks at a fixed interval.
///
/// If a frame takes longer than the interval, the missed ticks are skipped and the clock ticks
/// again immediately.
#[derive(Debug, Clone)]
pub struct IntervalClock {
    interval: Duration,
    next: Option<Instant>,
}

impl IntervalClock {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next: None,
        }
    }

    /// # Panics
    ///
    /// Panics if `hz` is zero.
    pub fn from_hz(hz: u32) -> Self {
        assert!(hz != 0, "refresh rate must be greater than zero");
        Self::new(Duration::from_secs(1) / hz)
    }
}

impl FrameClock for IntervalClock {
    fn wait_for_frame(&mut self, cancel: &Cancellation) -> bool {
        let now = Instant::now();
        let deadline = match self.next {
            Some(next) if next > now => next,
            _ => now,
        };
        self.next = Some(deadline + self.interval);
        if deadline > now {
            !cancel.sleep(deadline - now)
        } else {
            !cancel.is_cancelled()
        }
    }
}

/// Receives the frame rate text after every frame.
pub trait FpsDisplay {
    fn show(&mut self, text: &str);
}

impl<F: FnMut(&str)> FpsDisplay for F {
    fn show(&mut self, text: &str) {
        self(text)
    }
}

/// An [`FpsDisplay`] that logs at *trace* level.
#[derive(Debug, Default)]
pub struct LogFpsDisplay;

impl FpsDisplay for LogFpsDisplay {
    fn show(&mut self, text: &str) {
        log::trace!("{text}");
    }
}

/// The receiving side of a cancellation signal.
///
/// Cancellation is signalled by dropping the sending side, so it also happens when the owning
/// [`SchedulerHandle`] goes away.
#[derive(Debug, Clone)]
pub struct Cancellation {
    recv: crossbeam_channel::Receiver<()>,
}

impl Cancellation {
    /// Creates a connected pair of cancel trigger and [`Cancellation`].
    ///
    /// Dropping the returned [`Sender`] cancels.
    pub fn new() -> (Sender<()>, Self) {
        let (sender, recv) = crossbeam_channel::bounded(0);
        (sender, Self { recv })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.recv.try_recv(), Err(TryRecvError::Disconnected))
    }

    /// Sleeps for `duration`, waking up early on cancellation.
    ///
    /// Returns `true` if cancelled.
    pub fn sleep(&self, duration: Duration) -> bool {
        matches!(
            self.recv.recv_timeout(duration),
            Err(RecvTimeoutError::Disconnected)
        )
    }
}

/// Startup state of the frame loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// The render surface has not been synchronized to the video size yet.
    Idle,
    /// At least one synchronization succeeded, but not enough to start.
    Armed,
    /// Frames are being processed.
    Running,
}

impl SyncState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Idle,
            1 => Self::Armed,
            _ => Self::Running,
        }
    }
}

/// Counts confirmations that the render surface matches the displayed video size.
///
/// The host lays out the video asynchronously, so its displayed size can change shortly after it
/// starts playing. The frame loop only starts once the sizes matched on the required number of
/// consecutive synchronizations.
#[derive(Debug, Clone)]
pub struct SizeSync {
    required: u32,
    confirmations: u32,
}

impl SizeSync {
    /// # Panics
    ///
    /// Panics if `required` is zero.
    pub fn new(required: u32) -> Self {
        assert!(required != 0, "at least one size confirmation is required");
        Self {
            required,
            confirmations: 0,
        }
    }

    pub fn state(&self) -> SyncState {
        match self.confirmations {
            0 => SyncState::Idle,
            n if n < self.required => SyncState::Armed,
            _ => SyncState::Running,
        }
    }

    /// Records one synchronization attempt and returns the new state.
    ///
    /// The attempt counts if the video has a non-empty size and `surface` matches it. Once
    /// [`SyncState::Running`] is reached, further calls have no effect.
    pub fn confirm(&mut self, surface: Resolution, video: Resolution) -> SyncState {
        if self.state() != SyncState::Running && !video.is_empty() && surface == video {
            self.confirmations += 1;
        }
        self.state()
    }
}

/// Host-side collaborators of the frame loop.
pub struct Host {
    toggles: Toggles,
    clock: Option<Box<dyn FrameClock + Send>>,
    telemetry: Box<dyn TelemetrySink + Send>,
    fps_display: Box<dyn FpsDisplay + Send>,
}

impl Host {
    /// Creates a host that reads `toggles` and logs telemetry and the frame rate.
    ///
    /// Unless a [`FrameClock`] is set, frames are paced by an [`IntervalClock`] at the refresh
    /// rate of the [`OverlayOptions`] the scheduler was created with.
    pub fn new(toggles: Toggles) -> Self {
        Self {
            toggles,
            clock: None,
            telemetry: Box::new(LogSink),
            fps_display: Box::new(LogFpsDisplay),
        }
    }

    pub fn clock<C: FrameClock + Send + 'static>(self, clock: C) -> Self {
        Self {
            clock: Some(Box::new(clock)),
            ..self
        }
    }

    pub fn telemetry<T: TelemetrySink + Send + 'static>(self, telemetry: T) -> Self {
        Self {
            telemetry: Box::new(telemetry),
            ..self
        }
    }

    pub fn fps_display<D: FpsDisplay + Send + 'static>(self, display: D) -> Self {
        Self {
            fps_display: Box::new(display),
            ..self
        }
    }
}

/// Configures and spawns the frame loop.
#[derive(Debug, Clone)]
pub struct FrameScheduler {
    thread_name: String,
    frame_interval: Duration,
    sync_interval: Duration,
    sync_confirmations: u32,
}

impl FrameScheduler {
    pub fn new(options: &OverlayOptions) -> Self {
        Self {
            thread_name: options.frame_thread_name().to_string(),
            frame_interval: options.frame_interval(),
            sync_interval: options.size_sync_interval(),
            sync_confirmations: options.size_sync_confirmations(),
        }
    }

    /// Spawns the frame loop thread.
    ///
    /// The thread bootstraps the models, synchronizes `surface` to the size of `video`, and then
    /// processes frames until cancelled. When it exits, `surface` is handed back through
    /// [`SchedulerHandle::join`].
    pub fn spawn<M, P, A, V, S>(
        self,
        orchestrator: Orchestrator<M, P, A>,
        video: V,
        surface: S,
        host: Host,
    ) -> io::Result<SchedulerHandle<S>>
    where
        M: Model<Config = MeshConfig, Output = Vec<MeshSubject>> + Send + 'static,
        P: Model<Config = PoseConfig, Output = Vec<PoseSubject>> + Send + 'static,
        A: Model<Config = AttributeConfig, Output = Vec<AttributeDetection>> + Send + 'static,
        V: VideoSource + Send + 'static,
        S: RenderSurface + Send + 'static,
    {
        let (cancel, cancellation) = Cancellation::new();
        let state = Arc::new(AtomicU8::new(SyncState::Idle as u8));
        let frame_loop = FrameLoop {
            scheduler: self.clone(),
            orchestrator,
            video,
            surface,
            host,
            state: state.clone(),
        };

        let handle = thread::Builder::new()
            .name(self.thread_name.clone())
            .spawn(move || {
                log::trace!("frame loop '{}' starting", frame_loop.scheduler.thread_name);
                let name = frame_loop.scheduler.thread_name.clone();
                let result = frame_loop.run(&cancellation);
                match &result {
                    Ok(_) => log::trace!("frame loop '{name}' exiting"),
                    Err(e) => log::error!("frame loop '{name}' stopped: {e:#}"),
                }
                result
            })?;

        Ok(SchedulerHandle {
            cancel: Some(cancel),
            handle: Some(handle),
            state,
        })
    }
}

struct FrameLoop<M, P, A, V, S> {
    scheduler: FrameScheduler,
    orchestrator: Orchestrator<M, P, A>,
    video: V,
    surface: S,
    host: Host,
    state: Arc<AtomicU8>,
}

impl<M, P, A, V, S> FrameLoop<M, P, A, V, S>
where
    M: Model<Config = MeshConfig, Output = Vec<MeshSubject>>,
    P: Model<Config = PoseConfig, Output = Vec<PoseSubject>>,
    A: Model<Config = AttributeConfig, Output = Vec<AttributeDetection>>,
    V: VideoSource,
    S: RenderSurface,
{
    fn run(mut self, cancel: &Cancellation) -> anyhow::Result<S> {
        self.orchestrator.bootstrap()?;

        if !self.synchronize_size(cancel) {
            return Ok(self.surface);
        }

        let interval = self.scheduler.frame_interval;
        let mut clock = self
            .host
            .clock
            .take()
            .unwrap_or_else(|| Box::new(IntervalClock::new(interval)));
        while clock.wait_for_frame(cancel) {
            let toggles = self.host.toggles.snapshot();
            let frame = self.video.current_frame()?;
            let output = pollster::block_on(self.orchestrator.process_frame(
                &frame,
                toggles,
                &mut self.surface,
                &mut *self.host.telemetry,
            ));
            self.host.fps_display.show(&format!("FPS: {}", output.fps));
        }

        Ok(self.surface)
    }

    /// Returns `false` if cancelled before the loop could start.
    fn synchronize_size(&mut self, cancel: &Cancellation) -> bool {
        let mut sync = SizeSync::new(self.scheduler.sync_confirmations);
        loop {
            let video = self.video.display_resolution();
            if !video.is_empty() && self.surface.resolution() != video {
                if let Err(e) = self.surface.resize(video) {
                    log::warn!("failed to resize render surface to {video}: {e}");
                }
            }

            let state = sync.confirm(self.surface.resolution(), video);
            log::debug!(
                "size sync: surface {}, video {video} -> {state:?}",
                self.surface.resolution()
            );
            self.state.store(state as u8, Ordering::Relaxed);
            if state == SyncState::Running {
                return true;
            }

            if cancel.sleep(self.scheduler.sync_interval) {
                return false;
            }
        }
    }
}

/// Handle to a running frame loop.
///
/// Dropping the handle cancels the loop and waits for it to exit. If the loop thread panicked,
/// the panic is propagated to the thread dropping the handle.
pub struct SchedulerHandle<S> {
    cancel: Option<Sender<()>>,
    handle: Option<JoinHandle<anyhow::Result<S>>>,
    state: Arc<AtomicU8>,
}

impl<S> SchedulerHandle<S> {
    /// Stops the loop before its next frame (or during startup).
    ///
    /// A frame that is already being processed is completed first.
    pub fn cancel(&mut self) {
        if self.cancel.take().is_some() {
            log::debug!("frame loop cancelled");
        }
    }

    pub fn state(&self) -> SyncState {
        SyncState::from_u8(self.state.load(Ordering::Relaxed))
    }

    /// Returns `true` if the loop thread has exited.
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, |h| h.is_finished())
    }

    /// Waits for the loop to exit and returns the render surface.
    ///
    /// This does not cancel the loop; call [`SchedulerHandle::cancel`] first unless the loop is
    /// known to stop by itself (eg. because the video source failed). Returns the error that
    /// stopped the loop, if any.
    pub fn join(mut self) -> anyhow::Result<S> {
        match self.handle.take() {
            Some(handle) => match handle.join() {
                Ok(result) => result,
                Err(payload) => resume_unwind(payload),
            },
            None => anyhow::bail!("frame loop was already joined"),
        }
    }
}

impl<S> Drop for SchedulerHandle<S> {
    fn drop(&mut self) {
        self.cancel();
        if let Some(handle) = self.handle.take() {
            match handle.join() {
                Ok(_) => {}
                Err(payload) => {
                    if !thread::panicking() {
                        resume_unwind(payload);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RES: Resolution = Resolution::new(640, 480);

    #[test]
    fn size_sync_two_confirmations() {
        let mut sync = SizeSync::new(2);
        assert_eq!(sync.state(), SyncState::Idle);
        assert_eq!(sync.confirm(RES, RES), SyncState::Armed);
        assert_eq!(sync.confirm(RES, RES), SyncState::Running);
        assert_eq!(sync.confirm(Resolution::new(1, 1), RES), SyncState::Running);
    }

    #[test]
    fn size_sync_waits_for_video() {
        let mut sync = SizeSync::new(2);
        let empty = Resolution::default();
        assert_eq!(sync.confirm(empty, empty), SyncState::Idle);
        assert_eq!(sync.confirm(Resolution::new(300, 150), RES), SyncState::Idle);
        assert_eq!(sync.confirm(RES, RES), SyncState::Armed);
        // A mismatch does not count, but doesn't reset either.
        assert_eq!(sync.confirm(RES, Resolution::new(800, 600)), SyncState::Armed);
        assert_eq!(sync.confirm(RES, RES), SyncState::Running);
    }

    #[test]
    fn single_confirmation() {
        let mut sync = SizeSync::new(1);
        assert_eq!(sync.confirm(RES, RES), SyncState::Running);
    }

    #[test]
    fn cancellation() {
        let (trigger, cancel) = Cancellation::new();
        assert!(!cancel.is_cancelled());
        assert!(!cancel.sleep(Duration::from_millis(1)));
        drop(trigger);
        assert!(cancel.is_cancelled());

        let start = Instant::now();
        assert!(cancel.sleep(Duration::from_secs(10)));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn interval_clock_paces() {
        let (_trigger, cancel) = Cancellation::new();
        let mut clock = IntervalClock::new(Duration::from_millis(20));
        let start = Instant::now();
        for _ in 0..4 {
            assert!(clock.wait_for_frame(&cancel));
        }
        // First tick is immediate, the other three are 20ms apart.
        assert!(start.elapsed() >= Duration::from_millis(60));
    }

    #[test]
    fn interval_clock_skips_missed_ticks() {
        let (_trigger, cancel) = Cancellation::new();
        let mut clock = IntervalClock::new(Duration::from_millis(5));
        assert!(clock.wait_for_frame(&cancel));
        thread::sleep(Duration::from_millis(30));
        let start = Instant::now();
        assert!(clock.wait_for_frame(&cancel));
        assert!(start.elapsed() < Duration::from_millis(5));
    }

    #[test]
    fn interval_clock_observes_cancellation() {
        let (trigger, cancel) = Cancellation::new();
        let mut clock = IntervalClock::from_hz(1);
        assert!(clock.wait_for_frame(&cancel));
        drop(trigger);
        assert!(!clock.wait_for_frame(&cancel));
    }

    #[test]
    fn fps_display_closure() {
        let mut shown = Vec::new();
        {
            let mut display = |text: &str| shown.push(text.to_string());
            display.show("FPS: 12");
        }
        assert_eq!(shown, ["FPS: 12"]);
    }
}
