use anyhow::{Context, Result};
use pixels::{Pixels, SurfaceTexture};
use rand::rngs::StdRng;
use reach_core::{PixelPoint, Surface};
use reach_experiment::{Experiment, ExperimentConfig, SessionEvent, TrialSession};
use reach_render::SkiaSurface;
use reach_timing::MonotonicClock;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use winit::{
    application::ApplicationHandler,
    dpi::{PhysicalPosition, PhysicalSize},
    event::{ElementState, MouseButton, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowId},
};

type Session = TrialSession<SkiaSurface, MonotonicClock>;

pub struct App {
    window: Option<Arc<Window>>,
    pixels: Option<Pixels<'static>>,
    experiment: Experiment<StdRng>,
    session: Option<Session>,
    clock: MonotonicClock,
    cursor: Option<PixelPoint>,
    next_trial_at: Option<Instant>,
    failure: Option<anyhow::Error>,
    should_exit: bool,
}

impl App {
    pub fn new(config: ExperimentConfig) -> Self {
        Self {
            window: None,
            pixels: None,
            experiment: Experiment::new(config),
            session: None,
            clock: MonotonicClock::new(),
            cursor: None,
            next_trial_at: None,
            failure: None,
            should_exit: false,
        }
    }

    pub fn run(mut self) -> Result<()> {
        let event_loop = EventLoop::new()?;
        info!(
            participant = %self.experiment.config.participant,
            trials = self.experiment.config.total_trials(),
            "press the blue control to start each trial, ESC to quit"
        );

        event_loop.run_app(&mut self)?;

        match self.failure.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn create_window_and_surface(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let (width, height) = (self.experiment.config.width, self.experiment.config.height);
        let window_attributes = Window::default_attributes()
            .with_title("Reaching experiment")
            .with_inner_size(PhysicalSize::new(width, height))
            .with_resizable(false);

        let window = Arc::new(event_loop.create_window(window_attributes)?);
        let physical_size = window.inner_size();
        info!(
            canvas = %format!("{width}×{height}"),
            window = %format!("{}×{}", physical_size.width, physical_size.height),
            scale_factor = window.scale_factor(),
            "display configured"
        );

        let surface_texture =
            SurfaceTexture::new(physical_size.width, physical_size.height, window.clone());
        self.pixels = Some(Pixels::new(width, height, surface_texture)?);

        window.request_redraw();
        self.window = Some(window);
        Ok(())
    }

    /// Replaces the finished session with the next one, or leaves the event
    /// loop once every block has run.
    fn begin_next_trial(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        self.next_trial_at = None;
        let config = &self.experiment.config;
        let surface = SkiaSurface::new(config.width, config.height)?;
        match self.experiment.next_trial(surface, self.clock.clone())? {
            Some(session) => {
                let (done, total) = self.experiment.progress();
                debug!(trial = done + 1, total, "trial ready");
                self.session = Some(session);
                self.request_redraw();
            }
            None => self.finish_run(event_loop)?,
        }
        Ok(())
    }

    fn finish_run(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let path = self.experiment.write_results()?;
        println!("\nExperiment completed.");
        for block in self.experiment.block_summaries() {
            println!(
                "  {:<12} {} trials, mean {:.3} s",
                block.name, block.trials, block.mean_elapsed_secs
            );
        }
        println!("Results saved to {}", path.display());
        self.cleanup_and_exit(event_loop);
        Ok(())
    }

    fn dispatch(&mut self, event: SessionEvent, event_loop: &ActiveEventLoop) -> Result<()> {
        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };
        let outcome = session.handle_event(event)?;
        self.request_redraw();

        if let Some(outcome) = outcome {
            self.experiment.complete_trial(outcome);
            let pause = self.experiment.config.inter_trial_interval_ms;
            if pause == 0 {
                self.begin_next_trial(event_loop)?;
            } else {
                let at = Instant::now() + Duration::from_millis(pause);
                self.next_trial_at = Some(at);
                event_loop.set_control_flow(ControlFlow::WaitUntil(at));
            }
        }
        Ok(())
    }

    fn render(&mut self) -> Result<()> {
        let (Some(pixels), Some(session)) = (self.pixels.as_mut(), self.session.as_mut()) else {
            return Ok(());
        };
        let stats = session.surface_mut().render_frame(pixels.frame_mut())?;
        pixels.render()?;
        if stats.redrawn {
            debug!(
                draw_ms = stats.draw.as_secs_f64() * 1e3,
                copy_ms = stats.copy.as_secs_f64() * 1e3,
                shapes = stats.shapes,
                "frame"
            );
        }
        Ok(())
    }

    fn request_redraw(&self) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    /// Window position to canvas pixel; positions outside the canvas are kept
    /// unclamped.
    fn to_canvas(&self, position: PhysicalPosition<f64>) -> PixelPoint {
        let pos = (position.x as f32, position.y as f32);
        match self.pixels.as_ref().map(|p| p.window_pos_to_pixel(pos)) {
            Some(Ok((x, y))) => PixelPoint::new(x as i32, y as i32),
            Some(Err((x, y))) => PixelPoint::new(x as i32, y as i32),
            None => PixelPoint::new(pos.0 as i32, pos.1 as i32),
        }
    }

    fn handle_input(&mut self, key: winit::keyboard::PhysicalKey, event_loop: &ActiveEventLoop) {
        use winit::keyboard::{KeyCode, PhysicalKey};
        if let PhysicalKey::Code(k) = key {
            match k {
                KeyCode::Space => self.guard(event_loop, |app, el| {
                    app.dispatch(SessionEvent::Start, el)
                }),
                KeyCode::Escape => self.cleanup_and_exit(event_loop),
                _ => {}
            }
        }
    }

    /// Runs a fallible step; the first error ends the event loop and is
    /// returned from [`App::run`].
    fn guard<F>(&mut self, event_loop: &ActiveEventLoop, f: F)
    where
        F: FnOnce(&mut Self, &ActiveEventLoop) -> Result<()>,
    {
        if let Err(e) = f(self, event_loop) {
            error!("{e:#}");
            self.failure = Some(e);
            self.cleanup_and_exit(event_loop);
        }
    }

    fn cleanup_and_exit(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(session) = self.session.as_mut() {
            if !session.state().is_finished() {
                warn!(
                    log = %session.log_path().display(),
                    "leaving with a trial in progress"
                );
            }
            session.surface_mut().close();
        }
        self.should_exit = true;
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            self.guard(event_loop, |app, el| {
                app.create_window_and_surface(el)
                    .context("creating window and surface")?;
                app.begin_next_trial(el)
            });
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => self.cleanup_and_exit(event_loop),
            WindowEvent::RedrawRequested => self.guard(event_loop, |app, _| app.render()),
            WindowEvent::CursorMoved { position, .. } => {
                let p = self.to_canvas(position);
                self.cursor = Some(p);
                self.guard(event_loop, |app, el| {
                    app.dispatch(SessionEvent::PointerMoved { x: p.x, y: p.y }, el)
                });
            }
            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                button: MouseButton::Left,
                ..
            } => {
                if let Some(p) = self.cursor {
                    self.guard(event_loop, |app, el| app.dispatch(SessionEvent::Click(p), el));
                }
            }
            WindowEvent::KeyboardInput { event, .. } if event.state.is_pressed() => {
                self.handle_input(event.physical_key, event_loop);
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.should_exit {
            event_loop.exit();
            return;
        }
        if let Some(at) = self.next_trial_at {
            if Instant::now() >= at {
                event_loop.set_control_flow(ControlFlow::Wait);
                self.guard(event_loop, |app, el| app.begin_next_trial(el));
            } else {
                event_loop.set_control_flow(ControlFlow::WaitUntil(at));
            }
        }
    }
}
