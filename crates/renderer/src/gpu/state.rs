use std::time::{Duration, Instant};

use anyhow::Result;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use tracing::{debug, warn};
use winit::dpi::PhysicalSize;

use crate::camera::Camera;
use crate::geometry::PointGrid;
use crate::types::RendererConfig;
use crate::viewport::ViewportState;

use super::context::GpuContext;
use super::material::{MaterialSources, PointMaterial};
use super::overlay::{ClipOverlay, OverlaySources};
use super::post::PostChain;
use super::uniforms::{ShaderUniformSet, TransitionTargets};

struct RenderStats {
    frames_since_update: u32,
    last_update: Instant,
    frames_per_second: f32,
    frame_count: u64,
}

impl RenderStats {
    fn new() -> Self {
        Self {
            frames_since_update: 0,
            last_update: Instant::now(),
            frames_per_second: 60.0,
            frame_count: 0,
        }
    }

    /// Counts one frame; returns the refreshed FPS once per second.
    fn record(&mut self, now: Instant) -> Option<f32> {
        self.frame_count = self.frame_count.saturating_add(1);
        self.frames_since_update += 1;
        let elapsed = now.saturating_duration_since(self.last_update);
        if elapsed < Duration::from_secs(1) {
            return None;
        }
        self.frames_per_second = self.frames_since_update as f32 / elapsed.as_secs_f32();
        self.frames_since_update = 0;
        self.last_update = now;
        Some(self.frames_per_second)
    }
}

/// Everything needed to put one composited frame on screen.
pub(crate) struct GpuState {
    context: GpuContext,
    post: PostChain,
    material: PointMaterial,
    overlay: ClipOverlay,
    uniforms: ShaderUniformSet,
    camera: Camera,
    viewport: ViewportState,
    content_aspect: f32,
    stats: RenderStats,
}

impl GpuState {
    pub fn new<T>(
        target: &T,
        physical_size: PhysicalSize<u32>,
        viewport: ViewportState,
        config: &RendererConfig,
    ) -> Result<Self>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        let context = GpuContext::new(
            target,
            physical_size,
            config.antialiasing,
            config.color_space,
        )?;

        let grid = PointGrid::from_config(&config.grid);
        let material = PointMaterial::new(
            &context.device,
            &context.queue,
            &grid,
            MaterialSources {
                texture_a: &config.texture_a,
                texture_b: &config.texture_b,
                color_space: context.color_space,
            },
            context.sample_count,
        )?;
        let overlay = ClipOverlay::new(
            &context.device,
            &context.queue,
            context.surface_format,
            OverlaySources {
                frames: config.clip_frames.as_deref(),
                still: &config.texture_a,
                color_space: context.color_space,
            },
        )?;
        let post = PostChain::new(
            &context.device,
            &context.queue,
            context.surface_format,
            context.sample_count,
            viewport.render_size(),
            config.bloom,
        );

        let mut state = Self {
            context,
            post,
            material,
            overlay,
            uniforms: ShaderUniformSet::default(),
            camera: Camera::new(viewport.aspect()),
            viewport,
            content_aspect: config.content_aspect,
            stats: RenderStats::new(),
        };
        state.write_viewport();
        Ok(state)
    }

    pub fn clip_frame_count(&self) -> usize {
        self.overlay.frame_count()
    }

    /// Applies a new window geometry to the surface, post targets, camera and
    /// resolution uniform before the next frame is drawn.
    pub fn resize(&mut self, physical_size: PhysicalSize<u32>, viewport: ViewportState) {
        self.context.resize(physical_size);
        let (width, height) = viewport.render_size();
        self.post
            .set_size(&self.context.device, &self.context.queue, width, height);
        self.viewport = viewport;
        self.camera.set_aspect(viewport.aspect());
        self.write_viewport();
        debug!(
            width = viewport.width,
            height = viewport.height,
            scale_factor = viewport.scale_factor,
            "applied viewport"
        );
    }

    /// Reconfigures the surface at its current size after it was lost.
    pub fn reconfigure(&mut self) {
        let size = self.context.size;
        self.context.resize(size);
    }

    pub fn set_time(&mut self, seconds: f32) {
        self.uniforms.frame_writer().set_time(seconds);
    }

    pub fn transition_targets(&mut self) -> TransitionTargets<'_> {
        TransitionTargets {
            uniforms: self.uniforms.transition_writer(),
            bloom: self.post.params_mut(),
        }
    }

    fn write_viewport(&mut self) {
        let resolution = self.viewport.resolution(self.content_aspect);
        let view_projection = self.camera.view_projection();
        let mut writer = self.uniforms.frame_writer();
        writer.set_viewport(resolution);
        writer.set_view_projection(view_projection);
    }

    pub fn render(
        &mut self,
        clip_frame: usize,
        clip_opacity: f32,
    ) -> Result<(), wgpu::SurfaceError> {
        let acquire_start = Instant::now();
        let frame = self.context.surface.get_current_texture()?;
        let acquire = acquire_start.elapsed();
        let budget = Duration::from_secs_f32(1.0 / self.stats.frames_per_second.max(1.0));
        if acquire > budget {
            warn!(
                "acquiring frame took {}ms, over the frame budget of {}ms",
                acquire.as_millis(),
                budget.as_millis(),
            );
        }

        if let Some(fps) = self.stats.record(Instant::now()) {
            let values = self.uniforms.values();
            debug!(
                fps = fps.round(),
                frame_count = self.stats.frame_count,
                time = values.time,
                distortion = values.distortion,
                progress = values.progress,
                bloom = self.post.params().strength,
                clip_opacity,
                "render stats"
            );
        }

        self.material.upload(&self.context.queue, &self.uniforms);

        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("render encoder"),
                });

        self.material.encode(&mut encoder, self.post.scene_attachment());
        self.post.render(&self.context.queue, &mut encoder, &view);
        let cover = self.viewport.resolution(self.overlay.aspect());
        self.overlay.render(
            &self.context.queue,
            &mut encoder,
            &view,
            clip_frame,
            clip_opacity,
            cover,
        );

        self.context.queue.submit(Some(encoder.finish()));
        frame.present();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_report_once_per_second() {
        let mut stats = RenderStats::new();
        let start = stats.last_update;
        for frame in 1..30 {
            assert_eq!(
                stats.record(start + Duration::from_millis(frame * 16)),
                None
            );
        }
        let fps = stats
            .record(start + Duration::from_secs(1))
            .expect("stats after one second");
        assert!((fps - 30.0).abs() < 1e-3);
        assert_eq!(stats.frame_count, 30);
        assert_eq!(stats.frames_since_update, 0);
    }
}
