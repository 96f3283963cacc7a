use std::time::Instant;

use anyhow::{Context, Result};
use ouroboros::self_referencing;

use winit::application::ApplicationHandler;
use winit::dpi::{LogicalSize, PhysicalSize};
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::core::{App as CoreApp, AppControl, FrameCtx, WindowCtx};
use crate::device::{Gpu, GpuInit};
use crate::time::{FrameClock, FrameLimiter};

/// Window/runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
    pub resizable: bool,

    /// Maximum frames per second; `0` redraws as fast as presentation allows.
    pub frame_limit: u32,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "OpenGL".to_string(),
            initial_size: LogicalSize::new(1280.0, 700.0),
            resizable: true,
            frame_limit: 60,
        }
    }
}

/// Entry point for the runtime.
pub struct Runtime;

impl Runtime {
    /// Opens the window, runs `app` until the window closes, then returns.
    ///
    /// Failure to create the window or GPU context, or an error raised by the app
    /// while drawing, is returned once the window has closed.
    pub fn run<A>(config: RuntimeConfig, gpu_init: GpuInit, app: A) -> Result<()>
    where
        A: 'static + CoreApp,
    {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut state = AppState::new(config, gpu_init, app);

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        match state.failure.take() {
            Some(err) => Err(err),
            None => {
                log::info!("window closed; exiting");
                Ok(())
            }
        }
    }
}

#[self_referencing]
struct WindowEntry {
    clock: FrameClock,
    limiter: FrameLimiter,

    window: Window,

    #[borrows(window)]
    #[covariant]
    gpu: Gpu<'this>,
}

struct AppState<A>
where
    A: CoreApp + 'static,
{
    config: RuntimeConfig,
    gpu_init: GpuInit,
    app: A,

    window: Option<WindowEntry>,
    exit_requested: bool,
    failure: Option<anyhow::Error>,
}

impl<A> AppState<A>
where
    A: CoreApp + 'static,
{
    fn new(config: RuntimeConfig, gpu_init: GpuInit, app: A) -> Self {
        Self {
            config,
            gpu_init,
            app,
            window: None,
            exit_requested: false,
            failure: None,
        }
    }

    fn create_window_entry(&self, event_loop: &ActiveEventLoop) -> Result<WindowEntry> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(self.config.initial_size)
            .with_resizable(self.config.resizable);

        let window = event_loop
            .create_window(attrs)
            .context("failed to create window")?;

        let gpu_init = self.gpu_init.clone();

        let mut entry = WindowEntryTryBuilder {
            clock: FrameClock::default(),
            limiter: FrameLimiter::new(self.config.frame_limit),
            window,
            gpu_builder: |w| {
                pollster::block_on(Gpu::new(w, gpu_init))
                    .context("GPU initialization failed for window")
            },
        }
        .try_build()?;

        // Animation time starts once the GPU is ready, not when the window opened.
        entry.with_clock_mut(|clock| clock.reset());
        Ok(entry)
    }

    /// Lets the app release GPU resources, then drops the window and its GPU context.
    fn close_window(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(entry) = self.window.take() {
            self.app.on_exit();
            drop(entry);
        }
        self.exit_requested = true;
        event_loop.exit();
    }

    fn draw_frame(&mut self) -> Result<AppControl> {
        // Split borrows to avoid `self` capture inside `ouroboros` closures.
        let (app, window) = (&mut self.app, &mut self.window);
        let Some(entry) = window.as_mut() else {
            return Ok(AppControl::Continue);
        };

        entry.with_mut(|fields| {
            if !pace_frame(fields.limiter, fields.gpu.size(), Instant::now()) {
                return Ok(AppControl::Continue);
            }

            let time = fields.clock.tick();

            let mut ctx = FrameCtx {
                window: WindowCtx {
                    window: fields.window,
                },
                gpu: fields.gpu,
                time,
            };

            app.on_frame(&mut ctx)
        })
    }
}

/// Consumes a redraw slot and reports whether there is anything to draw.
///
/// The slot is marked even for a zero-size (minimized) drawable so the limiter
/// keeps pacing redraw requests while nothing is visible.
fn pace_frame(limiter: &mut FrameLimiter, size: PhysicalSize<u32>, now: Instant) -> bool {
    limiter.mark(now);
    size.width > 0 && size.height > 0
}

/// Turns a frame result into a control directive, keeping the first error for
/// `Runtime::run` to return.
fn settle_frame(result: Result<AppControl>, failure: &mut Option<anyhow::Error>) -> AppControl {
    match result {
        Ok(control) => control,
        Err(err) => {
            log::error!("frame failed: {err:#}");
            failure.get_or_insert(err);
            AppControl::Exit
        }
    }
}

impl<A> ApplicationHandler for AppState<A>
where
    A: CoreApp + 'static,
{
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() || self.exit_requested {
            return;
        }

        match self.create_window_entry(event_loop) {
            Ok(entry) => {
                entry.with_window(|w| w.request_redraw());
                self.window = Some(entry);
                log::info!(
                    "window \"{}\" opened ({}x{}, frame limit {})",
                    self.config.title,
                    self.config.initial_size.width,
                    self.config.initial_size.height,
                    self.config.frame_limit
                );
            }
            Err(e) => {
                log::error!("failed to create window: {e:#}");
                self.failure = Some(e);
                self.exit_requested = true;
                event_loop.exit();
            }
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }

        let Some(entry) = self.window.as_ref() else { return };

        let now = Instant::now();
        let (due, deadline) = entry.with_limiter(|l| (l.is_due(now), l.deadline()));

        if due {
            event_loop.set_control_flow(ControlFlow::Wait);
            entry.with_window(|w| w.request_redraw());
        } else if let Some(deadline) = deadline {
            event_loop.set_control_flow(ControlFlow::WaitUntil(deadline));
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }

        if self.app.on_window_event(&event) == AppControl::Exit {
            self.close_window(event_loop);
            return;
        }

        let Some(entry) = self.window.as_mut() else { return };

        match &event {
            WindowEvent::CloseRequested => {
                log::info!("close requested");
                self.close_window(event_loop);
            }

            WindowEvent::Resized(new_size) => {
                log::debug!("resized to {}x{}", new_size.width, new_size.height);
                entry.with_gpu_mut(|gpu| gpu.resize(*new_size));
                entry.with_window(|w| w.request_redraw());
            }

            WindowEvent::ScaleFactorChanged { .. } => {
                let new_size = entry.with_window(|w| w.inner_size());
                entry.with_gpu_mut(|gpu| gpu.resize(new_size));
                entry.with_window(|w| w.request_redraw());
            }

            WindowEvent::RedrawRequested => {
                let result = self.draw_frame();
                if settle_frame(result, &mut self.failure) == AppControl::Exit {
                    self.close_window(event_loop);
                }
            }

            _ => {}
        }
    }
}
