use std::path::Path;

use anyhow::Result;
use wgpu::naga::ShaderStage;
use wgpu::util::DeviceExt;

use crate::compile::{compile_glsl, POINTS_FRAGMENT_GLSL, POINTS_VERTEX_GLSL};
use crate::geometry::{PointGrid, PointVertex};

use super::context::{SurfaceColorSpace, SCENE_FORMAT};
use super::post::{sampler_entry, texture_entry, uniform_buffer, uniform_entry};
use super::textures::{linear_clamp_sampler, SourceTexture};
use super::uniforms::{MaterialUniforms, ShaderUniformSet};

/// Texels with every RGB channel below this are not drawn.
pub const DISCARD_THRESHOLD: f32 = 0.1;

/// CPU mirror of the fragment cross-fade: `mix(a, b, progress)`.
pub fn blend_colors(a: [f32; 4], b: [f32; 4], progress: f32) -> [f32; 4] {
    std::array::from_fn(|index| a[index] + (b[index] - a[index]) * progress)
}

pub fn is_discarded(color: [f32; 4]) -> bool {
    color[..3].iter().all(|&channel| channel < DISCARD_THRESHOLD)
}

/// Dual-source point material: the grid, both source images and the uniforms.
pub(crate) struct PointMaterial {
    pipeline: wgpu::RenderPipeline,
    vertex_buffer: wgpu::Buffer,
    vertex_count: u32,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    texture_bind_group: wgpu::BindGroup,
    _textures: [SourceTexture; 2],
}

pub(crate) struct MaterialSources<'a> {
    pub texture_a: &'a Path,
    pub texture_b: &'a Path,
    pub color_space: SurfaceColorSpace,
}

impl PointMaterial {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        grid: &PointGrid,
        sources: MaterialSources<'_>,
        sample_count: u32,
    ) -> Result<Self> {
        let texture_a = SourceTexture::load(device, queue, sources.texture_a, sources.color_space)?;
        let texture_b = SourceTexture::load(device, queue, sources.texture_b, sources.color_space)?;
        if texture_a.size != texture_b.size {
            tracing::warn!(
                a = ?texture_a.size,
                b = ?texture_b.size,
                "source images differ in size; both are stretched over the grid"
            );
        }

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("point grid"),
            contents: bytemuck::cast_slice(grid.vertices()),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let uniform_buffer = uniform_buffer(
            device,
            "material uniforms",
            std::mem::size_of::<MaterialUniforms>(),
        );
        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("material uniform layout"),
            entries: &[uniform_entry(0)],
        });
        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("material uniform bind group"),
            layout: &uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let sampler = linear_clamp_sampler(device, "material sampler");
        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("material texture layout"),
            entries: &[sampler_entry(0), texture_entry(1), texture_entry(2)],
        });
        let texture_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("material texture bind group"),
            layout: &texture_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&texture_a.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&texture_b.view),
                },
            ],
        });

        let vertex_module = compile_glsl(
            device,
            "points vertex",
            POINTS_VERTEX_GLSL,
            ShaderStage::Vertex,
        );
        let fragment_module = compile_glsl(
            device,
            "points fragment",
            POINTS_FRAGMENT_GLSL,
            ShaderStage::Fragment,
        );
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("points pipeline layout"),
            bind_group_layouts: &[&uniform_layout, &texture_layout],
            push_constant_ranges: &[],
        });
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("points pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &vertex_module,
                entry_point: Some("main"),
                buffers: &[PointVertex::layout()],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::PointList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState {
                count: sample_count,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            fragment: Some(wgpu::FragmentState {
                module: &fragment_module,
                entry_point: Some("main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: SCENE_FORMAT,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multiview: None,
            cache: None,
        });

        let (columns, rows) = grid.dimensions();
        tracing::debug!(columns, rows, points = grid.len(), "built point material");

        Ok(Self {
            pipeline,
            vertex_buffer,
            vertex_count: grid.len() as u32,
            uniform_buffer,
            uniform_bind_group,
            texture_bind_group,
            _textures: [texture_a, texture_b],
        })
    }

    pub fn upload(&self, queue: &wgpu::Queue, uniforms: &ShaderUniformSet) {
        queue.write_buffer(&self.uniform_buffer, 0, uniforms.as_bytes());
    }

    pub fn encode(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        attachment: wgpu::RenderPassColorAttachment<'_>,
    ) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("points pass"),
            color_attachments: &[Some(attachment)],
            depth_stencil_attachment: None,
            occlusion_query_set: None,
            timestamp_writes: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.uniform_bind_group, &[]);
        pass.set_bind_group(1, &self.texture_bind_group, &[]);
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.draw(0..self.vertex_count, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn near_black_is_discarded() {
        assert!(is_discarded([0.05, 0.05, 0.05, 1.0]));
        assert!(!is_discarded([0.5, 0.5, 0.5, 1.0]));
        assert!(!is_discarded([0.05, 0.05, 0.2, 1.0]));
    }

    #[test]
    fn blend_follows_progress() {
        let a = [1.0, 0.0, 0.0, 1.0];
        let b = [0.0, 0.0, 1.0, 1.0];
        assert_eq!(blend_colors(a, b, 0.0), a);
        assert_eq!(blend_colors(a, b, 1.0), b);
        assert_eq!(blend_colors(a, b, 0.5), [0.5, 0.0, 0.5, 1.0]);
    }

    #[test]
    fn dark_blend_of_bright_sources_can_still_draw() {
        let black = [0.0, 0.0, 0.0, 1.0];
        let white = [1.0, 1.0, 1.0, 1.0];
        assert!(is_discarded(blend_colors(black, white, 0.05)));
        assert!(!is_discarded(blend_colors(black, white, 0.5)));
    }
}
