use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use choreography::{media_channel, Choreographer, ClipPlayer, MediaElement, MediaEvent, Phase};
use crossbeam_channel::Receiver;
use tracing::{debug, error, info, warn};
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::{Window, WindowBuilder};

use crate::controls::{action_for_key, ControlAction, DebugSettings};
use crate::gpu::{sequence_duration, GpuState};
use crate::runtime::{time_source_for_clock, BoxedTimeSource, FrameDelta};
use crate::types::RendererConfig;
use crate::viewport::ViewportState;

/// Everything the event loop drives: GPU state, the clip and the choreographer.
pub(crate) struct WindowState {
    window: Arc<Window>,
    gpu: GpuState,
    clip: ClipPlayer,
    clip_fps: f32,
    media_events: Receiver<MediaEvent>,
    choreographer: Choreographer,
    time_source: BoxedTimeSource,
    frame_delta: FrameDelta,
    debug: DebugSettings,
    debug_enabled: bool,
}

impl WindowState {
    pub(crate) fn new(window: Arc<Window>, config: &RendererConfig) -> Result<Self> {
        let physical_size = window.inner_size();
        let viewport = ViewportState::from_physical(physical_size, window.scale_factor());
        let gpu = GpuState::new(window.as_ref(), physical_size, viewport, config)?;

        let choreographer = Choreographer::from_config(&config.transition, config.bloom.strength)
            .context("invalid transition script")?;
        let clip_duration = sequence_duration(
            gpu.clip_frame_count(),
            config.clip_fps,
            config.clip_duration,
        );
        let (events_tx, media_events) = media_channel();
        let clip = ClipPlayer::new(clip_duration, events_tx);
        info!(
            clip = ?clip_duration,
            transition = ?choreographer.transition_length(),
            "clip playing"
        );

        Ok(Self {
            window,
            gpu,
            clip,
            clip_fps: config.clip_fps,
            media_events,
            choreographer,
            time_source: time_source_for_clock(config.clock, config.time_step),
            frame_delta: FrameDelta::default(),
            debug: DebugSettings::new(0.0, config.bloom.strength),
            debug_enabled: config.debug_controls,
        })
    }

    pub(crate) fn window(&self) -> &Window {
        &self.window
    }

    fn apply_window_geometry(&mut self, physical_size: PhysicalSize<u32>, scale_factor: f64) {
        if physical_size.width == 0 || physical_size.height == 0 {
            return;
        }
        let viewport = ViewportState::from_physical(physical_size, scale_factor);
        self.gpu.resize(physical_size, viewport);
    }

    /// Returns `false` when the key asks the loop to exit.
    fn handle_key(&mut self, action: ControlAction) -> bool {
        match action {
            ControlAction::Exit => return false,
            ControlAction::TriggerTransition => {
                debug!("debug: finishing clip");
                self.clip.finish();
            }
            adjustment => {
                if self.debug.apply(adjustment) {
                    info!(
                        distortion = self.debug.distortion,
                        bloom = self.debug.bloom_strength,
                        "debug settings"
                    );
                }
            }
        }
        true
    }

    /// One frame: advance the clip, let the choreographer react, draw.
    fn tick(&mut self, now: Instant) -> Result<(), wgpu::SurfaceError> {
        let delta = self.frame_delta.tick(now);
        self.clip.tick(delta);
        self.choreographer.drain_events(&self.media_events);

        let seconds = self.time_source.sample();
        self.gpu.set_time(seconds);
        {
            let mut targets = self.gpu.transition_targets();
            self.choreographer.advance(delta, &mut self.clip, &mut targets);
            if self.debug_enabled && self.choreographer.phase() == Phase::Idle {
                self.debug.write_to(&mut targets);
            }
        }

        let frame = self
            .clip
            .frame_index(self.clip_fps, self.gpu.clip_frame_count());
        self.gpu.render(frame, self.clip.opacity())
    }
}

pub(crate) fn run_window(config: RendererConfig) -> Result<()> {
    let event_loop =
        EventLoop::new().map_err(|err| anyhow!("failed to create event loop: {err}"))?;

    let window_size = PhysicalSize::new(config.surface_size.0, config.surface_size.1);
    let window = WindowBuilder::new()
        .with_title("pointfade")
        .with_inner_size(window_size)
        .build(&event_loop)
        .map_err(|err| anyhow!("failed to create window: {err}"))?;
    let window = Arc::new(window);

    let mut state = WindowState::new(window.clone(), &config)
        .context("failed to initialise window renderer")?;
    state.window().request_redraw();

    let run_result = event_loop.run(move |event, elwt| match event {
        Event::WindowEvent { window_id, event } if window_id == state.window().id() => {
            match event {
                WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                    elwt.exit();
                }
                WindowEvent::KeyboardInput { event, .. } => {
                    if event.state != ElementState::Pressed || event.repeat {
                        return;
                    }
                    if let Some(action) = action_for_key(&event.logical_key, state.debug_enabled)
                    {
                        if !state.handle_key(action) {
                            elwt.exit();
                        }
                    }
                }
                WindowEvent::Resized(new_size) => {
                    let scale_factor = state.window().scale_factor();
                    state.apply_window_geometry(new_size, scale_factor);
                }
                WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                    let size = state.window().inner_size();
                    state.apply_window_geometry(size, scale_factor);
                }
                WindowEvent::RedrawRequested => {
                    if let Err(err) = state.tick(Instant::now()) {
                        match err {
                            wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => {
                                state.gpu.reconfigure();
                            }
                            wgpu::SurfaceError::OutOfMemory => {
                                error!("surface out of memory; exiting");
                                elwt.exit();
                            }
                            wgpu::SurfaceError::Timeout => {
                                warn!("surface timeout; retrying next frame");
                            }
                            other => {
                                warn!("surface error: {other:?}; retrying next frame");
                            }
                        }
                    }
                }
                _ => {}
            }
        }
        Event::AboutToWait => {
            state.window().request_redraw();
            elwt.set_control_flow(ControlFlow::Wait);
        }
        _ => {}
    });

    run_result.map_err(|err| anyhow!("window event loop error: {err}"))
}
