use crate::config::SessionConfig;
use crate::error::Result;
use crate::log::{LogRecord, TrialLog};
use crate::trial::TrialOutcome;
use reach_core::{
    BBox, Canvas, FeedbackTransform, FinishPolicy, PixelPoint, ShapeId, Surface,
    TargetVisibility, TransformInput, TrialState, mode,
};
use reach_timing::Clock;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, trace};

/// Where shapes wait before they are revealed.
const OFF_CANVAS: PixelPoint = PixelPoint::new(-100, -100);

/// Host events delivered to a running trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// The start control was activated.
    Start,
    /// A click anywhere on the canvas; starts the trial when it hits the start control.
    Click(PixelPoint),
    PointerMoved { x: i32, y: i32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeedbackMarker {
    pub position: PixelPoint,
    pub radius: f64,
}

/// One reach trial: target placement, start, per-sample feedback and logging,
/// finish detection.
pub struct TrialSession<S: Surface, C: Clock> {
    surface: S,
    clock: C,
    canvas: Canvas,
    transform: FeedbackTransform,
    finish_policy: FinishPolicy,

    state: TrialState,
    target: PixelPoint,
    marker: FeedbackMarker,
    target_disk: ShapeId,
    feedback_disk: ShapeId,
    start_control: ShapeId,

    pointer: Option<PixelPoint>,
    start_time: Option<Duration>,
    log_path: PathBuf,
    log: Option<TrialLog>,
    samples: usize,
    elapsed: Option<Duration>,
}

impl<S: Surface, C: Clock> TrialSession<S, C> {
    /// Validates `config` and lays out the idle canvas. Nothing is drawn and
    /// no file is touched when the configuration is rejected.
    pub fn new(config: SessionConfig, mut surface: S, clock: C) -> Result<Self> {
        config.validate()?;

        let canvas = config.canvas();
        let target = canvas.target_location(config.target);
        let radius = config.marker_radius;
        let log_path = config.resolve_logfile(&clock);

        let target_at = match config.target_visibility {
            TargetVisibility::HiddenUntilStart => OFF_CANVAS,
            TargetVisibility::AlwaysVisible => target,
        };
        let target_disk = surface.create_disk(target_at, radius, config.feedback.target_color());
        let feedback_disk =
            surface.create_disk(OFF_CANVAS, radius, config.feedback.feedback_color());

        let (cx, h) = (canvas.width as f64 / 2.0, canvas.height as f64);
        let start_control =
            surface.create_rect(BBox::new(cx - 50.0, h - 100.0, cx + 50.0, h), mode::BLUE);

        debug!(
            target_px = ?target,
            feedback = %config.feedback,
            transform = ?config.transform,
            log = %log_path.display(),
            "trial session laid out"
        );

        Ok(Self {
            surface,
            clock,
            canvas,
            transform: config.transform,
            finish_policy: config.finish_policy,
            state: TrialState::Idle,
            target,
            marker: FeedbackMarker {
                position: OFF_CANVAS,
                radius,
            },
            target_disk,
            feedback_disk,
            start_control,
            pointer: None,
            start_time: None,
            log_path,
            log: None,
            samples: 0,
            elapsed: None,
        })
    }

    /// Feeds one host event through the state machine. Returns the outcome
    /// on the single event that finishes the trial.
    pub fn handle_event(&mut self, event: SessionEvent) -> Result<Option<TrialOutcome>> {
        match (self.state, event) {
            (TrialState::Idle, SessionEvent::Start) => {
                self.start()?;
                Ok(None)
            }
            (TrialState::Idle, SessionEvent::Click(p))
                if self.surface.hit_test(self.start_control, p) =>
            {
                self.start()?;
                Ok(None)
            }
            (state, SessionEvent::PointerMoved { x, y }) if state.accepts_samples() => {
                self.motion(PixelPoint::new(x, y))
            }
            (state, event) => {
                trace!(?state, ?event, "event ignored");
                Ok(None)
            }
        }
    }

    fn start(&mut self) -> Result<()> {
        let log = TrialLog::create(&self.log_path)?;
        self.start_time = Some(self.clock.now());
        self.log = Some(log);
        self.surface.move_disk(self.target_disk, self.target, None);
        self.state = TrialState::Started;
        info!(target_px = ?self.target, log = %self.log_path.display(), "trial started");
        Ok(())
    }

    fn motion(&mut self, p: PixelPoint) -> Result<Option<TrialOutcome>> {
        self.pointer = Some(p);
        self.state = TrialState::Running;
        let marker = self.feedback_marker_for(p);
        self.marker = marker;
        self.surface
            .move_disk(self.feedback_disk, marker.position, Some(marker.radius));
        self.log_sample()?;
        Ok(self.check_finished())
    }

    /// Runs the active transform for pointer `p` and clips the result.
    fn feedback_marker_for(&self, p: PixelPoint) -> FeedbackMarker {
        let input = TransformInput::new(
            self.canvas.height as f64,
            self.canvas.width as f64,
            self.target.x as f64,
            self.target.y as f64,
            p.x as f64,
            p.y as f64,
        );
        let feedback = self.transform.apply(&input);
        FeedbackMarker {
            position: self.canvas.clip(feedback.x, feedback.y),
            radius: feedback.radius.unwrap_or(self.marker.radius),
        }
    }

    fn log_sample(&mut self) -> Result<()> {
        let (Some(pointer), Some(start), Some(log)) = (self.pointer, self.start_time, &self.log)
        else {
            return Ok(());
        };
        let elapsed = self.clock.elapsed(start);
        let record = LogRecord::new(self.target, self.marker.position, pointer, elapsed);
        log.append(&record)?;
        self.samples += 1;
        trace!(?pointer, feedback = ?self.marker.position, "sample logged");
        Ok(())
    }

    fn check_finished(&mut self) -> Option<TrialOutcome> {
        let pointer = self.pointer?;
        let reached = match self.finish_policy {
            FinishPolicy::Overlap => self.surface.overlapping(self.feedback_disk, self.target_disk),
            FinishPolicy::DirectEntry => self.surface.hit_test(self.target_disk, pointer),
        };
        if reached { self.finish() } else { None }
    }

    fn finish(&mut self) -> Option<TrialOutcome> {
        if self.state.is_finished() {
            return None;
        }
        let start = self.start_time?;
        let elapsed = self.clock.elapsed(start);
        self.elapsed = Some(elapsed);
        self.state = TrialState::Finished;
        self.log = None;
        self.surface.close();
        info!(
            elapsed_ms = elapsed.as_secs_f64() * 1e3,
            samples = self.samples,
            "trial finished"
        );
        Some(TrialOutcome {
            elapsed,
            samples: self.samples,
            log_path: self.log_path.clone(),
        })
    }

    pub fn state(&self) -> TrialState {
        self.state
    }

    pub fn target(&self) -> PixelPoint {
        self.target
    }

    pub fn feedback_marker(&self) -> FeedbackMarker {
        self.marker
    }

    pub fn pointer(&self) -> Option<PixelPoint> {
        self.pointer
    }

    /// Set once the trial has finished.
    pub fn elapsed(&self) -> Option<Duration> {
        self.elapsed
    }

    pub fn samples(&self) -> usize {
        self.samples
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn into_surface(self) -> S {
        self.surface
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ConfigError, SessionError};
    use crate::log::read_log;
    use chrono::NaiveDate;
    use reach_core::{FeedbackMode, NormalizedPoint, Rgba};
    use reach_timing::ManualClock;
    use tempfile::{TempDir, tempdir};

    #[derive(Debug, Clone)]
    struct Shape {
        bounds: BBox,
        disk: bool,
        color: Rgba,
    }

    /// Records shapes as plain boxes; disks hit-test as circles.
    #[derive(Debug, Default)]
    struct FakeSurface {
        shapes: Vec<Shape>,
        closed: usize,
    }

    impl Surface for FakeSurface {
        fn create_disk(&mut self, center: PixelPoint, radius: f64, color: Rgba) -> ShapeId {
            self.shapes.push(Shape {
                bounds: BBox::around(center, radius),
                disk: true,
                color,
            });
            ShapeId(self.shapes.len() - 1)
        }

        fn create_rect(&mut self, bounds: BBox, color: Rgba) -> ShapeId {
            self.shapes.push(Shape {
                bounds,
                disk: false,
                color,
            });
            ShapeId(self.shapes.len() - 1)
        }

        fn move_disk(&mut self, id: ShapeId, center: PixelPoint, radius: Option<f64>) {
            let shape = &mut self.shapes[id.0];
            let r = radius.unwrap_or(shape.bounds.width() / 2.0);
            shape.bounds = BBox::around(center, r);
        }

        fn bbox(&self, id: ShapeId) -> Option<BBox> {
            self.shapes.get(id.0).map(|s| s.bounds)
        }

        fn hit_test(&self, id: ShapeId, p: PixelPoint) -> bool {
            let Some(s) = self.shapes.get(id.0) else {
                return false;
            };
            if !s.disk {
                return s.bounds.contains(p);
            }
            let r = s.bounds.width() / 2.0;
            let (cx, cy) = (s.bounds.x0 + r, s.bounds.y0 + r);
            (p.x as f64 - cx).hypot(p.y as f64 - cy) <= r
        }

        fn close(&mut self) {
            self.closed += 1;
        }

        fn is_closed(&self) -> bool {
            self.closed > 0
        }
    }

    fn clock() -> ManualClock {
        let wall = NaiveDate::from_ymd_opt(2024, 5, 17)
            .and_then(|d| d.and_hms_opt(10, 30, 0))
            .unwrap();
        ManualClock::new(wall)
    }

    fn session(
        dir: &TempDir,
        config: SessionConfig,
    ) -> (TrialSession<FakeSurface, ManualClock>, ManualClock) {
        let clock = clock();
        let config = SessionConfig {
            logfile: Some(dir.path().join("trial.csv")),
            ..config
        };
        let s = TrialSession::new(config, FakeSurface::default(), clock.clone()).unwrap();
        (s, clock)
    }

    fn moved(x: i32, y: i32) -> SessionEvent {
        SessionEvent::PointerMoved { x, y }
    }

    #[test]
    fn idle_layout_hides_target_and_marker() {
        let dir = tempdir().unwrap();
        let (s, _) = session(&dir, SessionConfig::default());
        assert_eq!(s.state(), TrialState::Idle);
        assert_eq!(s.target(), PixelPoint::new(500, 500));
        let surface = s.surface();
        assert_eq!(surface.shapes.len(), 3);
        assert_eq!(surface.shapes[0].bounds, BBox::around(OFF_CANVAS, 25.0));
        assert_eq!(surface.shapes[0].color, FeedbackMode::Reflected.target_color());
        assert_eq!(surface.shapes[1].bounds, BBox::around(OFF_CANVAS, 25.0));
        assert_eq!(surface.shapes[2].bounds, BBox::new(450.0, 900.0, 550.0, 1000.0));
        assert!(!dir.path().join("trial.csv").exists());
    }

    #[test]
    fn always_visible_target_is_placed_up_front() {
        let dir = tempdir().unwrap();
        let cfg = SessionConfig {
            target_visibility: TargetVisibility::AlwaysVisible,
            ..SessionConfig::default()
        };
        let (s, _) = session(&dir, cfg);
        assert_eq!(
            s.surface().shapes[0].bounds,
            BBox::around(PixelPoint::new(500, 500), 25.0)
        );
    }

    #[test]
    fn config_error_before_anything_is_drawn() {
        let cfg = SessionConfig {
            target: NormalizedPoint::new(-0.1, 0.5),
            ..SessionConfig::default()
        };
        let err = match TrialSession::new(cfg, FakeSurface::default(), clock()) {
            Err(e) => e,
            Ok(_) => panic!("expected a configuration error"),
        };
        assert!(matches!(
            err,
            SessionError::Config(ConfigError::TargetOutOfRange { .. })
        ));
    }

    #[test]
    fn motion_before_start_is_ignored() {
        let dir = tempdir().unwrap();
        let (mut s, _) = session(&dir, SessionConfig::default());
        assert_eq!(s.handle_event(moved(500, 500)).unwrap(), None);
        assert_eq!(s.state(), TrialState::Idle);
        assert_eq!(s.pointer(), None);
        assert_eq!(s.feedback_marker().position, OFF_CANVAS);
    }

    #[test]
    fn start_reveals_target_and_writes_header() {
        let dir = tempdir().unwrap();
        let (mut s, _) = session(&dir, SessionConfig::default());
        s.handle_event(SessionEvent::Start).unwrap();
        assert_eq!(s.state(), TrialState::Started);
        assert_eq!(
            s.surface().shapes[0].bounds,
            BBox::around(PixelPoint::new(500, 500), 25.0)
        );
        assert!(read_log(s.log_path()).unwrap().is_empty());
    }

    #[test]
    fn click_outside_start_control_does_nothing() {
        let dir = tempdir().unwrap();
        let (mut s, _) = session(&dir, SessionConfig::default());
        s.handle_event(SessionEvent::Click(PixelPoint::new(10, 10))).unwrap();
        assert_eq!(s.state(), TrialState::Idle);
        s.handle_event(SessionEvent::Click(PixelPoint::new(500, 950))).unwrap();
        assert_eq!(s.state(), TrialState::Started);
    }

    #[test]
    fn header_is_identical_across_sessions() {
        let first_line = |path: &Path| {
            let text = std::fs::read(path).unwrap();
            let end = text.iter().position(|&b| b == b'\n').unwrap();
            text[..=end].to_vec()
        };

        let dir_a = tempdir().unwrap();
        let (mut a, _) = session(&dir_a, SessionConfig::default());
        let dir_b = tempdir().unwrap();
        let cfg = SessionConfig {
            width: 1920,
            height: 1080,
            transform: FeedbackTransform::Rotate90,
            finish_policy: FinishPolicy::DirectEntry,
            ..SessionConfig::default().with_feedback("rotated").unwrap()
        };
        let (mut b, _) = session(&dir_b, cfg);

        a.handle_event(SessionEvent::Start).unwrap();
        b.handle_event(SessionEvent::Start).unwrap();
        a.handle_event(moved(100, 100)).unwrap();
        b.handle_event(moved(700, 300)).unwrap();

        let (ha, hb) = (first_line(a.log_path()), first_line(b.log_path()));
        assert_eq!(ha, hb);
        assert_eq!(
            ha,
            b"target_x, target_y, feedback_x, feedback_y, mouse_x, mouse_y, elapsed_time\n"
        );
    }

    #[test]
    fn start_without_samples_never_finishes() {
        let dir = tempdir().unwrap();
        let (mut s, clock) = session(&dir, SessionConfig::default());
        s.handle_event(SessionEvent::Start).unwrap();
        clock.advance(Duration::from_secs(30));
        s.handle_event(SessionEvent::Start).unwrap();
        assert_eq!(s.state(), TrialState::Started);
        assert_eq!(s.elapsed(), None);
        assert_eq!(s.samples(), 0);
        assert!(read_log(s.log_path()).unwrap().is_empty());
        assert!(!s.surface().is_closed());
    }

    #[test]
    fn samples_are_logged_in_order() {
        let dir = tempdir().unwrap();
        let cfg = SessionConfig {
            transform: FeedbackTransform::Mirror,
            ..SessionConfig::default()
        };
        let (mut s, clock) = session(&dir, cfg);
        s.handle_event(SessionEvent::Start).unwrap();
        clock.advance(Duration::from_millis(250));
        s.handle_event(moved(100, 200)).unwrap();
        clock.advance(Duration::from_millis(250));
        s.handle_event(moved(5, 990)).unwrap();

        assert_eq!(s.state(), TrialState::Running);
        let rows = read_log(s.log_path()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(
            (rows[0].feedback_x, rows[0].feedback_y, rows[0].mouse_x, rows[0].mouse_y),
            (900, 200, 100, 200)
        );
        assert_eq!(rows[0].elapsed_time, "0:00:00.250000");
        // 1000 - 5 = 995 and 990 both clip to 980
        assert_eq!((rows[1].feedback_x, rows[1].feedback_y), (980, 980));
        assert_eq!(rows[1].elapsed_time, "0:00:00.500000");
        assert_eq!((rows[1].target_x, rows[1].target_y), (500, 500));
    }

    #[test]
    fn overlap_finishes_exactly_once() {
        let dir = tempdir().unwrap();
        let (mut s, clock) = session(&dir, SessionConfig::default());
        s.handle_event(SessionEvent::Start).unwrap();
        clock.advance(Duration::from_secs(1));
        assert_eq!(s.handle_event(moved(300, 300)).unwrap(), None);
        clock.advance(Duration::from_secs(1));
        // 50 px apart on x: boxes of radius 25 touch
        let outcome = s.handle_event(moved(450, 500)).unwrap().unwrap();
        assert_eq!(outcome.elapsed, Duration::from_secs(2));
        assert_eq!(outcome.samples, 2);
        assert_eq!(s.state(), TrialState::Finished);
        assert_eq!(s.elapsed(), Some(Duration::from_secs(2)));
        assert_eq!(s.surface().closed, 1);

        clock.advance(Duration::from_secs(1));
        assert_eq!(s.handle_event(moved(500, 500)).unwrap(), None);
        assert_eq!(s.handle_event(SessionEvent::Start).unwrap(), None);
        assert_eq!(s.surface().closed, 1);
        assert_eq!(s.elapsed(), Some(Duration::from_secs(2)));
        assert_eq!(read_log(&outcome.log_path).unwrap().len(), 2);
    }

    #[test]
    fn mirrored_marker_can_finish_while_pointer_is_far() {
        let dir = tempdir().unwrap();
        let cfg = SessionConfig {
            transform: FeedbackTransform::Mirror,
            target: NormalizedPoint::new(0.0, 0.5),
            ..SessionConfig::default()
        };
        let (mut s, _) = session(&dir, cfg);
        assert_eq!(s.target(), PixelPoint::new(250, 500));
        s.handle_event(SessionEvent::Start).unwrap();
        let outcome = s.handle_event(moved(750, 500)).unwrap();
        assert!(outcome.is_some());
    }

    #[test]
    fn direct_entry_ignores_feedback_overlap() {
        let dir = tempdir().unwrap();
        let cfg = SessionConfig {
            transform: FeedbackTransform::Mirror,
            target: NormalizedPoint::new(0.0, 0.5),
            finish_policy: FinishPolicy::DirectEntry,
            ..SessionConfig::default()
        };
        let (mut s, _) = session(&dir, cfg);
        s.handle_event(SessionEvent::Start).unwrap();
        // feedback lands on the target, the pointer does not
        assert_eq!(s.handle_event(moved(750, 500)).unwrap(), None);
        // box corner of the target disk, outside the circle
        assert_eq!(s.handle_event(moved(272, 522)).unwrap(), None);
        assert!(s.handle_event(moved(260, 505)).unwrap().is_some());
        assert_eq!(s.samples(), 3);
    }

    #[test]
    fn point_reflect_snaps_and_resizes_marker() {
        let dir = tempdir().unwrap();
        let cfg = SessionConfig {
            transform: FeedbackTransform::PointReflectSnap,
            ..SessionConfig::default()
        };
        let (mut s, _) = session(&dir, cfg);
        s.handle_event(SessionEvent::Start).unwrap();

        assert_eq!(s.handle_event(moved(800, 100)).unwrap(), None);
        let marker = s.feedback_marker();
        assert_eq!(marker.position, PixelPoint::new(200, 900));
        assert_eq!(marker.radius, 250.0);

        // 28.28 px from the target: snapped, and the 19 px marker overlaps it
        assert!(s.handle_event(moved(520, 520)).unwrap().is_some());
        assert_eq!(s.feedback_marker().position, PixelPoint::new(500, 500));
        assert_eq!(s.feedback_marker().radius, 19.0);
    }

    #[test]
    fn rotated_colours_follow_mode() {
        let dir = tempdir().unwrap();
        let cfg = SessionConfig::default().with_feedback("rotated").unwrap();
        let (s, _) = session(&dir, cfg);
        assert_eq!(s.surface().shapes[0].color, mode::RED);
        assert_eq!(s.surface().shapes[1].color, mode::GREEN);
    }

    #[test]
    fn log_failure_propagates() {
        let dir = tempdir().unwrap();
        let (mut s, _) = session(&dir, SessionConfig::default());
        s.handle_event(SessionEvent::Start).unwrap();
        std::fs::remove_file(s.log_path()).unwrap();
        let err = s.handle_event(moved(10, 10)).unwrap_err();
        assert!(matches!(err, SessionError::Io(_)));
    }
}
