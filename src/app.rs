//! Capture / detect / display loop and keyboard handling

use crate::dashboard::draw_pause_overlay;
use crate::detector_trait::Detector;
use crate::error::Result;
use crate::renderer::DetectionRenderer;
use crate::types::{RuntimeParameters, SessionStats, SessionSummary};
use image::RgbImage;
use log::{info, warn};
use std::borrow::Cow;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Frames between two FPS readouts on the dashboard
pub const FPS_SAMPLE_INTERVAL: u64 = 30;

const KEY_ESCAPE: u8 = 27;

/// Source of frames, typically a camera
pub trait FrameSource {
    /// Next frame, or `None` once the stream has ended
    fn read(&mut self) -> Result<Option<RgbImage>>;
}

/// Interactive window that shows frames and reports key presses
pub trait FrameDisplay {
    fn show(&mut self, frame: &RgbImage) -> Result<()>;

    /// Wait briefly for a key press and return its code, if any
    fn poll_key(&mut self) -> Result<Option<i32>>;
}

/// Keyboard commands understood by the loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Quit,
    Save,
    IncreaseConfidence,
    DecreaseConfidence,
    TogglePause,
}

impl KeyAction {
    pub fn from_key(code: i32) -> Option<Self> {
        if code < 0 {
            return None;
        }

        match (code & 0xFF) as u8 {
            b'q' | KEY_ESCAPE => Some(Self::Quit),
            b's' => Some(Self::Save),
            b'+' | b'=' => Some(Self::IncreaseConfidence),
            b'-' | b'_' => Some(Self::DecreaseConfidence),
            b' ' => Some(Self::TogglePause),
            _ => None,
        }
    }
}

/// What to do when detection or rendering fails for a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Stop the session and report the error
    #[default]
    FailFast,
    /// Log the error and continue with the next frame
    SkipFrame,
}

/// Why the loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    QuitRequested,
    StreamEnded,
    Interrupted,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QuitRequested => write!(f, "stopped by user"),
            Self::StreamEnded => write!(f, "end of stream"),
            Self::Interrupted => write!(f, "interrupted"),
        }
    }
}

/// Sampled FPS readout
///
/// The value only changes on every `interval`-th frame and is held between
/// samples.
#[derive(Debug, Clone)]
pub struct FpsMeter {
    interval: u64,
    fps: f64,
}

impl FpsMeter {
    pub fn new(interval: u64) -> Self {
        Self {
            interval: interval.max(1),
            fps: 0.0,
        }
    }

    /// Feed the running frame count and elapsed time, get the displayed FPS
    pub fn update(&mut self, frame_count: u64, elapsed_secs: f64) -> f64 {
        if frame_count % self.interval == 0 && elapsed_secs > 0.0 {
            self.fps = frame_count as f64 / elapsed_secs;
        }
        self.fps
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }
}

impl Default for FpsMeter {
    fn default() -> Self {
        Self::new(FPS_SAMPLE_INTERVAL)
    }
}

/// Loop settings that are fixed for the session
#[derive(Debug, Clone)]
pub struct AppOptions {
    /// Directory snapshots are written to
    pub output_dir: PathBuf,
    pub failure_policy: FailurePolicy,
    pub initial_confidence: f32,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            failure_policy: FailurePolicy::FailFast,
            initial_confidence: crate::types::DEFAULT_CONFIDENCE,
        }
    }
}

/// Single-threaded application loop
///
/// Owns the frame source, the display and the runtime parameters. Dropping
/// the app releases the camera and closes the window.
pub struct App<D: Detector, S: FrameSource, V: FrameDisplay> {
    renderer: DetectionRenderer<D>,
    source: S,
    display: V,
    params: RuntimeParameters,
    stats: SessionStats,
    fps: FpsMeter,
    current_frame: Option<RgbImage>,
    options: AppOptions,
    shutdown: Arc<AtomicBool>,
}

impl<D: Detector, S: FrameSource, V: FrameDisplay> App<D, S, V> {
    pub fn new(detector: D, source: S, display: V, options: AppOptions) -> Self {
        Self {
            renderer: DetectionRenderer::new(detector),
            source,
            display,
            params: RuntimeParameters::new(options.initial_confidence),
            stats: SessionStats::new(),
            fps: FpsMeter::default(),
            current_frame: None,
            options,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag that stops the loop at the next iteration when set
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    pub fn params(&self) -> &RuntimeParameters {
        &self.params
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn display(&self) -> &V {
        &self.display
    }

    pub fn renderer(&self) -> &DetectionRenderer<D> {
        &self.renderer
    }

    /// Last annotated frame, without any pause placard
    pub fn current_frame(&self) -> Option<&RgbImage> {
        self.current_frame.as_ref()
    }

    /// Run until quit, stream end, interrupt or a fatal frame error
    pub fn run(&mut self) -> Result<StopReason> {
        loop {
            if let Some(reason) = self.step()? {
                info!("Session finished: {}", reason);
                return Ok(reason);
            }
        }
    }

    /// One loop iteration: capture and process (unless paused), display,
    /// then handle at most one key
    pub fn step(&mut self) -> Result<Option<StopReason>> {
        if self.shutdown.load(Ordering::SeqCst) {
            return Ok(Some(StopReason::Interrupted));
        }

        if !self.params.paused {
            let Some(mut frame) = self.source.read()? else {
                return Ok(Some(StopReason::StreamEnded));
            };

            let frame_index = self.stats.begin_frame();
            let elapsed = self.stats.elapsed().as_secs_f64();
            let fps = self.fps.update(frame_index, elapsed);

            match self
                .renderer
                .process(&mut frame, &self.params, fps, frame_index, elapsed)
            {
                Ok(count) => {
                    self.stats.record_detections(count);
                    self.current_frame = Some(frame);
                }
                Err(e) => match self.options.failure_policy {
                    FailurePolicy::FailFast => return Err(e),
                    FailurePolicy::SkipFrame => {
                        warn!("Skipping frame {}: {}", frame_index, e);
                    }
                },
            }
        }

        // The placard goes on a copy so the retained frame never changes
        let shown: Option<Cow<'_, RgbImage>> = match (&self.current_frame, self.params.paused) {
            (Some(frame), true) => {
                let mut overlay = frame.clone();
                draw_pause_overlay(&mut overlay);
                Some(Cow::Owned(overlay))
            }
            (Some(frame), false) => Some(Cow::Borrowed(frame)),
            (None, _) => None,
        };

        if let Some(frame) = shown.as_deref() {
            self.display.show(frame)?;
        }

        let Some(action) = self.display.poll_key()?.and_then(KeyAction::from_key) else {
            return Ok(None);
        };

        match action {
            KeyAction::Quit => return Ok(Some(StopReason::QuitRequested)),
            KeyAction::Save => match shown.as_deref() {
                Some(frame) => match save_snapshot(frame, &self.options.output_dir) {
                    Ok(path) => info!("📸 Saved: {}", path.display()),
                    Err(e) => warn!("Failed to save snapshot: {}", e),
                },
                None => warn!("Nothing to save yet"),
            },
            KeyAction::IncreaseConfidence => {
                self.params.increase_confidence();
                info!("⬆️  Confidence: {:.0}%", self.params.confidence_percent());
            }
            KeyAction::DecreaseConfidence => {
                self.params.decrease_confidence();
                info!("⬇️  Confidence: {:.0}%", self.params.confidence_percent());
            }
            KeyAction::TogglePause => {
                let paused = self.params.toggle_pause();
                info!("⏸️  {}", if paused { "PAUSED" } else { "RESUMED" });
            }
        }

        Ok(None)
    }

    /// Summary of the session so far
    pub fn summary(&self) -> SessionSummary {
        self.stats.summary()
    }

    /// Release camera and window, then return the session summary
    pub fn finish(self) -> SessionSummary {
        let summary = self.summary();
        drop(self);
        summary
    }
}

/// Write a frame to `ppe_<unix seconds>.jpg` inside `dir`
///
/// Two saves within the same second overwrite each other.
pub fn save_snapshot(frame: &RgbImage, dir: &Path) -> Result<PathBuf> {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let path = dir.join(format!("ppe_{}.jpg", secs));
    frame.save(&path)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector_stub::StubDetector;
    use crate::error::DashboardError;
    use crate::types::{BoundingBox, Detection, MAX_CONFIDENCE, MIN_CONFIDENCE};
    use image::Rgb;
    use std::collections::VecDeque;

    struct VecSource {
        frames: VecDeque<RgbImage>,
        reads: usize,
    }

    impl VecSource {
        fn new(count: u8) -> Self {
            Self {
                frames: (0..count)
                    .map(|i| RgbImage::from_pixel(640, 480, Rgb([i.wrapping_mul(20), 60, 90])))
                    .collect(),
                reads: 0,
            }
        }
    }

    impl FrameSource for VecSource {
        fn read(&mut self) -> Result<Option<RgbImage>> {
            self.reads += 1;
            Ok(self.frames.pop_front())
        }
    }

    #[derive(Default)]
    struct ScriptedDisplay {
        keys: VecDeque<Option<char>>,
        shown: Vec<RgbImage>,
    }

    impl ScriptedDisplay {
        fn with_keys(keys: &[Option<char>]) -> Self {
            Self {
                keys: keys.iter().copied().collect(),
                shown: Vec::new(),
            }
        }
    }

    impl FrameDisplay for ScriptedDisplay {
        fn show(&mut self, frame: &RgbImage) -> Result<()> {
            self.shown.push(frame.clone());
            Ok(())
        }

        fn poll_key(&mut self) -> Result<Option<i32>> {
            Ok(self.keys.pop_front().flatten().map(|c| c as i32))
        }
    }

    fn helmet() -> Detection {
        Detection::new("Helmet", 0.9, BoundingBox::new(50.0, 120.0, 150.0, 200.0))
    }

    fn app(
        frames: u8,
        keys: &[Option<char>],
        options: AppOptions,
    ) -> App<StubDetector, VecSource, ScriptedDisplay> {
        App::new(
            StubDetector::new(vec![vec![helmet()]]),
            VecSource::new(frames),
            ScriptedDisplay::with_keys(keys),
            options,
        )
    }

    #[test]
    fn test_key_mapping() {
        assert_eq!(KeyAction::from_key('q' as i32), Some(KeyAction::Quit));
        assert_eq!(KeyAction::from_key(27), Some(KeyAction::Quit));
        assert_eq!(KeyAction::from_key('s' as i32), Some(KeyAction::Save));
        assert_eq!(KeyAction::from_key('=' as i32), Some(KeyAction::IncreaseConfidence));
        assert_eq!(KeyAction::from_key('_' as i32), Some(KeyAction::DecreaseConfidence));
        assert_eq!(KeyAction::from_key(' ' as i32), Some(KeyAction::TogglePause));
        // Extended key codes carry modifier bits above the low byte
        assert_eq!(KeyAction::from_key(0x100000 | 'q' as i32), Some(KeyAction::Quit));
        assert_eq!(KeyAction::from_key(-1), None);
        assert_eq!(KeyAction::from_key('x' as i32), None);
    }

    #[test]
    fn test_fps_meter_samples_every_interval() {
        let mut meter = FpsMeter::new(30);
        for frame in 1..30 {
            assert_eq!(meter.update(frame, frame as f64 * 0.1), 0.0);
        }
        let sampled = meter.update(30, 1.5);
        assert_eq!(sampled, 20.0);

        // Held while time keeps advancing
        for frame in 31..60 {
            assert_eq!(meter.update(frame, 100.0 + frame as f64), sampled);
        }
        assert_eq!(meter.update(60, 2.0), 30.0);
        assert_eq!(meter.fps(), 30.0);
    }

    #[test]
    fn test_quit_key_stops_loop() {
        let mut app = app(10, &[None, None, Some('q')], AppOptions::default());
        assert_eq!(app.run().unwrap(), StopReason::QuitRequested);

        let summary = app.finish();
        assert_eq!(summary.frames, 3);
        assert_eq!(summary.total_detections, 3);
    }

    #[test]
    fn test_stream_end_is_clean_termination() {
        let mut app = app(4, &[], AppOptions::default());
        assert_eq!(app.run().unwrap(), StopReason::StreamEnded);
        assert_eq!(app.display().shown.len(), 4);
        assert_eq!(app.stats().frame_count, 4);
        assert_eq!(app.renderer().detector().calls(), 4);
    }

    #[test]
    fn test_immediate_quit_has_no_average() {
        let mut app = app(0, &[], AppOptions::default());
        assert_eq!(app.run().unwrap(), StopReason::StreamEnded);

        let summary = app.finish();
        assert!(matches!(
            summary.detections_per_frame(),
            Err(DashboardError::NoFramesProcessed)
        ));
    }

    #[test]
    fn test_pause_freezes_displayed_frame() {
        let keys = [None, Some(' '), None, Some(' '), Some('q')];
        let mut app = app(10, &keys, AppOptions::default());

        for _ in 0..2 {
            assert_eq!(app.step().unwrap(), None);
        }
        let before_pause = app.current_frame().cloned().unwrap();
        assert!(app.params().paused);

        assert_eq!(app.step().unwrap(), None);
        assert_eq!(app.step().unwrap(), None);
        assert!(!app.params().paused);

        // No camera reads while paused, retained frame untouched
        assert_eq!(app.source().reads, 2);
        assert_eq!(app.current_frame(), Some(&before_pause));

        let shown = &app.display().shown;
        assert_eq!(shown.len(), 4);
        assert_eq!(shown[2], shown[3]);
        assert_ne!(shown[2], before_pause);
        assert_eq!(shown[1], before_pause);

        assert_eq!(app.step().unwrap(), Some(StopReason::QuitRequested));
        assert_eq!(app.source().reads, 3);
        assert_eq!(app.stats().frame_count, 3);
    }

    #[test]
    fn test_pause_before_first_frame_shows_nothing() {
        let mut app = app(3, &[Some(' '), None, None], AppOptions::default());
        app.step().unwrap();
        app.step().unwrap();
        app.step().unwrap();

        // First iteration read one frame before the pause took effect
        assert_eq!(app.display().shown.len(), 3);
        assert_eq!(app.source().reads, 1);

        let mut idle = App::new(
            StubDetector::empty(),
            VecSource::new(3),
            ScriptedDisplay::default(),
            AppOptions::default(),
        );
        idle.params.paused = true;
        assert_eq!(idle.step().unwrap(), None);
        assert!(idle.display().shown.is_empty());
    }

    #[test]
    fn test_confidence_keys_clamp() {
        let mut keys = vec![Some('+'); 40];
        keys.push(Some('q'));
        let mut app = app(100, &keys, AppOptions::default());
        app.run().unwrap();
        assert_eq!(app.params().confidence_threshold, MAX_CONFIDENCE);

        let mut keys = vec![Some('-'); 40];
        keys.push(Some('q'));
        let mut app = self::app(100, &keys, AppOptions::default());
        app.run().unwrap();
        assert_eq!(app.params().confidence_threshold, MIN_CONFIDENCE);
    }

    #[test]
    fn test_save_key_writes_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let options = AppOptions {
            output_dir: dir.path().to_path_buf(),
            ..AppOptions::default()
        };
        let mut app = app(5, &[Some('s'), Some('q')], options);
        app.run().unwrap();

        let saved: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(saved.len(), 1);
        assert!(saved[0].starts_with("ppe_") && saved[0].ends_with(".jpg"));

        let img = image::open(dir.path().join(&saved[0])).unwrap();
        assert_eq!((img.width(), img.height()), (640, 480));
    }

    #[test]
    fn test_failed_save_keeps_session_running() {
        let dir = tempfile::tempdir().unwrap();
        let options = AppOptions {
            output_dir: dir.path().join("missing").join("snapshots"),
            ..AppOptions::default()
        };
        let mut app = app(10, &[None, Some('s'), None, None, Some('q')], options);

        assert_eq!(app.run().unwrap(), StopReason::QuitRequested);
        assert_eq!(app.stats().frame_count, 5);
        assert!(!dir.path().join("missing").exists());
    }

    #[test]
    fn test_fail_fast_propagates_error() {
        let mut detector = StubDetector::empty();
        detector.push_frame(vec![helmet()]);
        detector.push_failure("inference exploded");

        let mut app = App::new(
            detector,
            VecSource::new(5),
            ScriptedDisplay::default(),
            AppOptions::default(),
        );
        assert!(app.run().is_err());

        let summary = app.finish();
        assert_eq!(summary.frames, 2);
        assert_eq!(summary.total_detections, 1);
    }

    #[test]
    fn test_skip_frame_policy_continues() {
        let mut detector = StubDetector::empty();
        detector.push_failure("inference exploded");
        detector.push_frame(vec![helmet()]);

        let options = AppOptions {
            failure_policy: FailurePolicy::SkipFrame,
            ..AppOptions::default()
        };
        let mut app = App::new(detector, VecSource::new(3), ScriptedDisplay::default(), options);
        assert_eq!(app.run().unwrap(), StopReason::StreamEnded);

        assert_eq!(app.stats().frame_count, 3);
        assert_eq!(app.stats().total_detections, 2);
        assert_eq!(app.display().shown.len(), 2);
    }

    #[test]
    fn test_shutdown_flag_interrupts() {
        let mut app = app(5, &[], AppOptions::default());
        app.step().unwrap();
        app.shutdown_flag().store(true, Ordering::SeqCst);

        assert_eq!(app.run().unwrap(), StopReason::Interrupted);
        assert_eq!(app.stats().frame_count, 1);
    }
}
