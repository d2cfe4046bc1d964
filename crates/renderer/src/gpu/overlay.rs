use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use bytemuck::{Pod, Zeroable};
use wgpu::naga::ShaderStage;

use crate::compile::{compile_glsl, FULLSCREEN_VERTEX_GLSL, OVERLAY_FRAGMENT_GLSL};

use super::context::SurfaceColorSpace;
use super::post::{
    fullscreen_pipeline_with_layouts, sampler_entry, texture_entry, uniform_buffer, uniform_entry,
};
use super::textures::{linear_clamp_sampler, list_frames, SourceTexture};

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct OverlayUniforms {
    cover: [f32; 4],
    opacity: f32,
    _padding: [f32; 3],
}

/// Playback length of a frame sequence, or `fallback` for a still image.
pub fn sequence_duration(frame_count: usize, fps: f32, fallback: Duration) -> Duration {
    if frame_count > 1 && fps > 0.0 {
        Duration::from_secs_f32(frame_count as f32 / fps)
    } else {
        fallback
    }
}

struct OverlayFrame {
    texture: SourceTexture,
    bind_group: wgpu::BindGroup,
}

/// Draws the current clip frame over the composited scene.
pub(crate) struct ClipOverlay {
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    frames: Vec<OverlayFrame>,
    aspect: f32,
}

pub(crate) struct OverlaySources<'a> {
    /// Directory of numbered frames.
    pub frames: Option<&'a Path>,
    /// Still shown when no frame directory is configured.
    pub still: &'a Path,
    pub color_space: SurfaceColorSpace,
}

impl ClipOverlay {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        surface_format: wgpu::TextureFormat,
        sources: OverlaySources<'_>,
    ) -> Result<Self> {
        let paths = match sources.frames {
            Some(dir) => list_frames(dir)?,
            None => vec![sources.still.to_path_buf()],
        };

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("overlay uniform layout"),
            entries: &[uniform_entry(0), sampler_entry(1)],
        });
        let frame_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("overlay frame layout"),
            entries: &[texture_entry(0)],
        });

        let sampler = linear_clamp_sampler(device, "overlay sampler");
        let uniform_buffer = uniform_buffer(
            device,
            "overlay uniforms",
            std::mem::size_of::<OverlayUniforms>(),
        );
        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("overlay uniform bind group"),
            layout: &uniform_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
        });

        let mut frames = Vec::with_capacity(paths.len());
        for path in &paths {
            let texture = SourceTexture::load(device, queue, path, sources.color_space)
                .with_context(|| format!("failed to load clip frame {}", path.display()))?;
            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("overlay frame bind group"),
                layout: &frame_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&texture.view),
                }],
            });
            frames.push(OverlayFrame {
                texture,
                bind_group,
            });
        }
        let aspect = frames
            .first()
            .map(|frame| {
                let (width, height) = frame.texture.size;
                height as f32 / width.max(1) as f32
            })
            .unwrap_or(1.0);

        let vertex = compile_glsl(
            device,
            "overlay vertex",
            FULLSCREEN_VERTEX_GLSL,
            ShaderStage::Vertex,
        );
        let fragment = compile_glsl(
            device,
            "overlay fragment",
            OVERLAY_FRAGMENT_GLSL,
            ShaderStage::Fragment,
        );
        let pipeline = fullscreen_pipeline_with_layouts(
            device,
            "overlay pipeline",
            &[&uniform_layout, &frame_layout],
            &vertex,
            &fragment,
            surface_format,
            Some(wgpu::BlendState::ALPHA_BLENDING),
        );

        tracing::debug!(frames = frames.len(), aspect, "built clip overlay");
        Ok(Self {
            pipeline,
            uniform_buffer,
            uniform_bind_group,
            frames,
            aspect,
        })
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Height over width of the clip frames.
    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    /// Blends frame `frame_index` over `target`; a transparent clip draws nothing.
    pub fn render(
        &self,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        frame_index: usize,
        opacity: f32,
        cover: [f32; 4],
    ) {
        if opacity <= 0.0 {
            return;
        }
        let Some(frame) = self
            .frames
            .get(frame_index.min(self.frames.len().saturating_sub(1)))
        else {
            return;
        };

        let uniforms = OverlayUniforms {
            cover,
            opacity: opacity.min(1.0),
            _padding: [0.0; 3],
        };
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("overlay pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            occlusion_query_set: None,
            timestamp_writes: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.uniform_bind_group, &[]);
        pass.set_bind_group(1, &frame.bind_group, &[]);
        pass.draw(0..3, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_block_is_two_vec4s() {
        assert_eq!(std::mem::size_of::<OverlayUniforms>(), 32);
    }

    #[test]
    fn sequence_length_follows_frame_rate() {
        let fallback = Duration::from_secs(6);
        assert_eq!(sequence_duration(90, 30.0, fallback), Duration::from_secs(3));
        assert_eq!(sequence_duration(1, 30.0, fallback), fallback);
        assert_eq!(sequence_duration(90, 0.0, fallback), fallback);
    }
}
