use bytemuck::{Pod, Zeroable};
use wgpu::naga::ShaderStage;

use crate::compile::{
    compile_glsl, BLUR_FRAGMENT_GLSL, COMPOSITE_FRAGMENT_GLSL, FULLSCREEN_VERTEX_GLSL,
    HIGH_PASS_FRAGMENT_GLSL,
};

use super::context::SCENE_FORMAT;
use super::textures::linear_clamp_sampler;

pub const MIP_COUNT: usize = 5;
/// Blur kernel radius per mip, finest first.
pub const KERNEL_RADII: [u32; MIP_COUNT] = [3, 5, 7, 9, 11];
/// Length of the weight array in the blur uniform block.
pub const MAX_KERNEL_WEIGHTS: usize = 12;
/// Per-mip contribution before the radius remap.
pub const BLOOM_FACTORS: [f32; MIP_COUNT] = [1.0, 0.8, 0.6, 0.4, 0.2];
const HIGH_PASS_SMOOTH_WIDTH: f32 = 0.01;

/// Tunables of the bloom pass; `strength` is animated by the choreographer.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BloomParameters {
    pub threshold: f32,
    pub strength: f32,
    pub radius: f32,
}

/// Weight of one mip in the composite: `mix(factor, 1.2 - factor, radius)`.
pub fn bloom_factor(factor: f32, radius: f32) -> f32 {
    factor + (1.2 - factor - factor) * radius
}

/// One side of a normalised Gaussian with `sigma = radius`.
///
/// `weights[0]` is the centre tap, `weights[i]` applies to both `+i` and `-i`,
/// so `weights[0] + 2 * sum(weights[1..])` is 1.
pub fn gaussian_weights(radius: u32) -> Vec<f32> {
    let radius = radius.max(1);
    let sigma = radius as f32;
    let pdf = |x: f32| 0.398_94 * (-0.5 * x * x / (sigma * sigma)).exp() / sigma;
    let raw: Vec<f32> = (0..radius).map(|i| pdf(i as f32)).collect();
    let total = raw[0] + 2.0 * raw[1..].iter().sum::<f32>();
    raw.into_iter().map(|weight| weight / total).collect()
}

/// Blur target sizes: half the render size, halved again per mip.
pub fn mip_sizes(width: u32, height: u32) -> [(u32, u32); MIP_COUNT] {
    let base_width = (width / 2).max(1);
    let base_height = (height / 2).max(1);
    std::array::from_fn(|level| {
        (
            (base_width >> level).max(1),
            (base_height >> level).max(1),
        )
    })
}

fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// CPU mirror of the high-pass fragment stage.
pub fn high_pass(color: [f32; 3], threshold: f32) -> [f32; 3] {
    let luma = 0.299 * color[0] + 0.587 * color[1] + 0.114 * color[2];
    let alpha = smoothstep(threshold, threshold + HIGH_PASS_SMOOTH_WIDTH, luma);
    color.map(|channel| channel * alpha)
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct HighPassUniforms {
    threshold: f32,
    smooth_width: f32,
    _padding: [f32; 2],
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct BlurUniforms {
    texel_size: [f32; 2],
    direction: [f32; 2],
    radius: i32,
    _padding: [i32; 3],
    weights: [[f32; 4]; MAX_KERNEL_WEIGHTS],
}

impl BlurUniforms {
    fn new(size: (u32, u32), direction: [f32; 2], radius: u32) -> Self {
        let mut weights = [[0.0; 4]; MAX_KERNEL_WEIGHTS];
        for (slot, weight) in weights.iter_mut().zip(gaussian_weights(radius)) {
            slot[0] = weight;
        }
        Self {
            texel_size: [1.0 / size.0 as f32, 1.0 / size.1 as f32],
            direction,
            radius: radius as i32,
            _padding: [0; 3],
            weights,
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct CompositeUniforms {
    strength: f32,
    _padding: [f32; 3],
    factors: [[f32; 4]; MIP_COUNT],
}

impl CompositeUniforms {
    fn new(params: &BloomParameters) -> Self {
        let mut factors = [[0.0; 4]; MIP_COUNT];
        for (slot, factor) in factors.iter_mut().zip(BLOOM_FACTORS) {
            slot[0] = bloom_factor(factor, params.radius);
        }
        Self {
            strength: params.strength,
            _padding: [0.0; 3],
            factors,
        }
    }
}

struct RenderTarget {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl RenderTarget {
    fn new(device: &wgpu::Device, label: &str, size: (u32, u32), sample_count: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: size.0,
                height: size.1,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count,
            dimension: wgpu::TextureDimension::D2,
            format: SCENE_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            _texture: texture,
            view,
        }
    }
}

struct BlurPass {
    _uniforms: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    target: RenderTarget,
}

/// Size-dependent resources, rebuilt as a unit on resize.
struct Targets {
    size: (u32, u32),
    scene: RenderTarget,
    multisampled: Option<RenderTarget>,
    bright: RenderTarget,
    high_pass_bind_group: wgpu::BindGroup,
    horizontal: Vec<BlurPass>,
    vertical: Vec<BlurPass>,
    composite_bind_group: wgpu::BindGroup,
}

/// Offscreen scene target plus the bloom chain that resolves it to the surface.
pub(crate) struct PostChain {
    params: BloomParameters,
    sample_count: u32,
    sampler: wgpu::Sampler,
    pass_layout: wgpu::BindGroupLayout,
    composite_layout: wgpu::BindGroupLayout,
    high_pass_pipeline: wgpu::RenderPipeline,
    blur_pipeline: wgpu::RenderPipeline,
    composite_pipeline: wgpu::RenderPipeline,
    high_pass_uniforms: wgpu::Buffer,
    composite_uniforms: wgpu::Buffer,
    targets: Targets,
}

impl PostChain {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        surface_format: wgpu::TextureFormat,
        sample_count: u32,
        size: (u32, u32),
        params: BloomParameters,
    ) -> Self {
        let sampler = linear_clamp_sampler(device, "post sampler");
        let pass_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("post pass layout"),
            entries: &[uniform_entry(0), sampler_entry(1), texture_entry(2)],
        });
        let mut composite_entries = vec![uniform_entry(0), sampler_entry(1)];
        composite_entries.extend((2..=2 + MIP_COUNT as u32).map(texture_entry));
        let composite_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("composite layout"),
            entries: &composite_entries,
        });

        let vertex = compile_glsl(
            device,
            "fullscreen vertex",
            FULLSCREEN_VERTEX_GLSL,
            ShaderStage::Vertex,
        );
        let high_pass_fragment = compile_glsl(
            device,
            "high-pass fragment",
            HIGH_PASS_FRAGMENT_GLSL,
            ShaderStage::Fragment,
        );
        let blur_fragment = compile_glsl(
            device,
            "blur fragment",
            BLUR_FRAGMENT_GLSL,
            ShaderStage::Fragment,
        );
        let composite_fragment = compile_glsl(
            device,
            "composite fragment",
            COMPOSITE_FRAGMENT_GLSL,
            ShaderStage::Fragment,
        );

        let high_pass_pipeline = fullscreen_pipeline(
            device,
            "high-pass pipeline",
            &pass_layout,
            &vertex,
            &high_pass_fragment,
            SCENE_FORMAT,
            None,
        );
        let blur_pipeline = fullscreen_pipeline(
            device,
            "blur pipeline",
            &pass_layout,
            &vertex,
            &blur_fragment,
            SCENE_FORMAT,
            None,
        );
        let composite_pipeline = fullscreen_pipeline(
            device,
            "composite pipeline",
            &composite_layout,
            &vertex,
            &composite_fragment,
            surface_format,
            None,
        );

        let high_pass_uniforms = uniform_buffer(
            device,
            "high-pass uniforms",
            std::mem::size_of::<HighPassUniforms>(),
        );
        let composite_uniforms = uniform_buffer(
            device,
            "composite uniforms",
            std::mem::size_of::<CompositeUniforms>(),
        );

        let targets = Targets::new(
            device,
            queue,
            TargetLayouts {
                sampler: &sampler,
                pass_layout: &pass_layout,
                composite_layout: &composite_layout,
                high_pass_uniforms: &high_pass_uniforms,
                composite_uniforms: &composite_uniforms,
            },
            size,
            sample_count,
        );

        Self {
            params,
            sample_count,
            sampler,
            pass_layout,
            composite_layout,
            high_pass_pipeline,
            blur_pipeline,
            composite_pipeline,
            high_pass_uniforms,
            composite_uniforms,
            targets,
        }
    }

    pub fn params(&self) -> &BloomParameters {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut BloomParameters {
        &mut self.params
    }

    /// Recreates every render target for `width` x `height` pixels.
    pub fn set_size(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        width: u32,
        height: u32,
    ) {
        let size = (width.max(1), height.max(1));
        if size == self.targets.size {
            return;
        }
        self.targets = Targets::new(
            device,
            queue,
            TargetLayouts {
                sampler: &self.sampler,
                pass_layout: &self.pass_layout,
                composite_layout: &self.composite_layout,
                high_pass_uniforms: &self.high_pass_uniforms,
                composite_uniforms: &self.composite_uniforms,
            },
            size,
            self.sample_count,
        );
        tracing::debug!(width = size.0, height = size.1, "resized post targets");
    }

    /// Color attachment the particle pass draws into, cleared to black.
    pub fn scene_attachment(&self) -> wgpu::RenderPassColorAttachment<'_> {
        let (view, resolve_target) = match &self.targets.multisampled {
            Some(multisampled) => (&multisampled.view, Some(&self.targets.scene.view)),
            None => (&self.targets.scene.view, None),
        };
        wgpu::RenderPassColorAttachment {
            view,
            depth_slice: None,
            resolve_target,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                store: wgpu::StoreOp::Store,
            },
        }
    }

    /// Encodes the bloom passes and the composite into `output_view`.
    pub fn render(
        &self,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        output_view: &wgpu::TextureView,
    ) {
        queue.write_buffer(
            &self.composite_uniforms,
            0,
            bytemuck::bytes_of(&CompositeUniforms::new(&self.params)),
        );

        if self.params.strength > 0.0 {
            let high_pass = HighPassUniforms {
                threshold: self.params.threshold,
                smooth_width: HIGH_PASS_SMOOTH_WIDTH,
                _padding: [0.0; 2],
            };
            queue.write_buffer(&self.high_pass_uniforms, 0, bytemuck::bytes_of(&high_pass));

            draw_fullscreen(
                encoder,
                "high-pass",
                &self.high_pass_pipeline,
                &self.targets.high_pass_bind_group,
                &self.targets.bright.view,
            );
            for (horizontal, vertical) in self.targets.horizontal.iter().zip(&self.targets.vertical)
            {
                draw_fullscreen(
                    encoder,
                    "blur horizontal",
                    &self.blur_pipeline,
                    &horizontal.bind_group,
                    &horizontal.target.view,
                );
                draw_fullscreen(
                    encoder,
                    "blur vertical",
                    &self.blur_pipeline,
                    &vertical.bind_group,
                    &vertical.target.view,
                );
            }
        }

        draw_fullscreen(
            encoder,
            "composite",
            &self.composite_pipeline,
            &self.targets.composite_bind_group,
            output_view,
        );
    }
}

struct TargetLayouts<'a> {
    sampler: &'a wgpu::Sampler,
    pass_layout: &'a wgpu::BindGroupLayout,
    composite_layout: &'a wgpu::BindGroupLayout,
    high_pass_uniforms: &'a wgpu::Buffer,
    composite_uniforms: &'a wgpu::Buffer,
}

impl Targets {
    fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layouts: TargetLayouts<'_>,
        size: (u32, u32),
        sample_count: u32,
    ) -> Self {
        let scene = RenderTarget::new(device, "scene target", size, 1);
        let multisampled = (sample_count > 1)
            .then(|| RenderTarget::new(device, "scene msaa target", size, sample_count));
        let mips = mip_sizes(size.0, size.1);
        let bright = RenderTarget::new(device, "bloom bright target", mips[0], 1);
        let high_pass_bind_group = pass_bind_group(
            device,
            "high-pass bind group",
            &layouts,
            layouts.high_pass_uniforms,
            &scene.view,
        );

        let mut horizontal: Vec<BlurPass> = Vec::with_capacity(MIP_COUNT);
        let mut vertical: Vec<BlurPass> = Vec::with_capacity(MIP_COUNT);
        for (level, (&mip_size, &radius)) in mips.iter().zip(KERNEL_RADII.iter()).enumerate() {
            let source = match vertical.last() {
                Some(previous) => &previous.target.view,
                None => &bright.view,
            };
            let h_pass = blur_pass(
                device,
                queue,
                &layouts,
                source,
                mip_size,
                [1.0, 0.0],
                radius,
                level,
            );
            let v_pass = blur_pass(
                device,
                queue,
                &layouts,
                &h_pass.target.view,
                mip_size,
                [0.0, 1.0],
                radius,
                level,
            );
            horizontal.push(h_pass);
            vertical.push(v_pass);
        }

        let mut entries = vec![
            wgpu::BindGroupEntry {
                binding: 0,
                resource: layouts.composite_uniforms.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(layouts.sampler),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::TextureView(&scene.view),
            },
        ];
        for (offset, pass) in vertical.iter().enumerate() {
            entries.push(wgpu::BindGroupEntry {
                binding: 3 + offset as u32,
                resource: wgpu::BindingResource::TextureView(&pass.target.view),
            });
        }
        let composite_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("composite bind group"),
            layout: layouts.composite_layout,
            entries: &entries,
        });

        Self {
            size,
            scene,
            multisampled,
            bright,
            high_pass_bind_group,
            horizontal,
            vertical,
            composite_bind_group,
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn blur_pass(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layouts: &TargetLayouts<'_>,
    source: &wgpu::TextureView,
    size: (u32, u32),
    direction: [f32; 2],
    radius: u32,
    level: usize,
) -> BlurPass {
    let axis = if direction[0] > 0.0 { "h" } else { "v" };
    let label = format!("bloom blur {axis}{level}");
    let uniforms = uniform_buffer(device, &label, std::mem::size_of::<BlurUniforms>());
    queue.write_buffer(
        &uniforms,
        0,
        bytemuck::bytes_of(&BlurUniforms::new(size, direction, radius)),
    );
    let bind_group = pass_bind_group(device, &label, layouts, &uniforms, source);
    let target = RenderTarget::new(device, &label, size, 1);
    BlurPass {
        _uniforms: uniforms,
        bind_group,
        target,
    }
}

fn pass_bind_group(
    device: &wgpu::Device,
    label: &str,
    layouts: &TargetLayouts<'_>,
    uniforms: &wgpu::Buffer,
    source: &wgpu::TextureView,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout: layouts.pass_layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: uniforms.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(layouts.sampler),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::TextureView(source),
            },
        ],
    })
}

fn draw_fullscreen(
    encoder: &mut wgpu::CommandEncoder,
    label: &str,
    pipeline: &wgpu::RenderPipeline,
    bind_group: &wgpu::BindGroup,
    target: &wgpu::TextureView,
) {
    let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: target,
            depth_slice: None,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                store: wgpu::StoreOp::Store,
            },
        })],
        depth_stencil_attachment: None,
        occlusion_query_set: None,
        timestamp_writes: None,
    });
    pass.set_pipeline(pipeline);
    pass.set_bind_group(0, bind_group, &[]);
    pass.draw(0..3, 0..1);
}

pub(crate) fn uniform_buffer(device: &wgpu::Device, label: &str, size: usize) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size: size as wgpu::BufferAddress,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

pub(crate) fn uniform_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

pub(crate) fn sampler_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    }
}

pub(crate) fn texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

/// Full-screen triangle pipeline over a single bind group.
pub(crate) fn fullscreen_pipeline(
    device: &wgpu::Device,
    label: &str,
    layout: &wgpu::BindGroupLayout,
    vertex: &wgpu::ShaderModule,
    fragment: &wgpu::ShaderModule,
    format: wgpu::TextureFormat,
    blend: Option<wgpu::BlendState>,
) -> wgpu::RenderPipeline {
    fullscreen_pipeline_with_layouts(device, label, &[layout], vertex, fragment, format, blend)
}

pub(crate) fn fullscreen_pipeline_with_layouts(
    device: &wgpu::Device,
    label: &str,
    layouts: &[&wgpu::BindGroupLayout],
    vertex: &wgpu::ShaderModule,
    fragment: &wgpu::ShaderModule,
    format: wgpu::TextureFormat,
    blend: Option<wgpu::BlendState>,
) -> wgpu::RenderPipeline {
    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts: layouts,
        push_constant_ranges: &[],
    });
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: vertex,
            entry_point: Some("main"),
            buffers: &[],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        fragment: Some(wgpu::FragmentState {
            module: fragment,
            entry_point: Some("main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        multiview: None,
        cache: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_blocks_match_std140_sizes() {
        assert_eq!(std::mem::size_of::<HighPassUniforms>(), 16);
        assert_eq!(std::mem::size_of::<BlurUniforms>(), 224);
        assert_eq!(std::mem::size_of::<CompositeUniforms>(), 96);
    }

    #[test]
    fn factors_remap_with_radius() {
        assert_eq!(bloom_factor(1.0, 0.0), 1.0);
        assert!((bloom_factor(1.0, 1.0) - 0.2).abs() < 1e-6);
        assert!((bloom_factor(0.2, 1.0) - 1.0).abs() < 1e-6);
        assert!((bloom_factor(0.6, 0.5) - 0.6).abs() < 1e-6);
    }

    #[test]
    fn gaussian_weights_are_normalised_and_decreasing() {
        for radius in KERNEL_RADII {
            let weights = gaussian_weights(radius);
            assert_eq!(weights.len(), radius as usize);
            let total = weights[0] + 2.0 * weights[1..].iter().sum::<f32>();
            assert!((total - 1.0).abs() < 1e-5, "radius {radius} sums to {total}");
            assert!(weights.windows(2).all(|pair| pair[0] > pair[1]));
        }
    }

    #[test]
    fn mips_halve_down_to_one_pixel() {
        let sizes = mip_sizes(1600, 900);
        assert_eq!(sizes[0], (800, 450));
        assert_eq!(sizes[4], (50, 28));

        let tiny = mip_sizes(3, 3);
        assert!(tiny.iter().all(|&(w, h)| w >= 1 && h >= 1));
    }

    #[test]
    fn high_pass_keeps_only_bright_texels() {
        assert_eq!(high_pass([0.05, 0.05, 0.05], 0.1), [0.0, 0.0, 0.0]);
        assert_eq!(high_pass([0.5, 0.5, 0.5], 0.1), [0.5, 0.5, 0.5]);
        assert_eq!(high_pass([0.5, 0.5, 0.5], 0.0), [0.5, 0.5, 0.5]);
    }

    #[test]
    fn composite_uniforms_carry_strength_and_factors() {
        let params = BloomParameters {
            threshold: 0.0,
            strength: 5.0,
            radius: 0.0,
        };
        let uniforms = CompositeUniforms::new(&params);
        assert_eq!(uniforms.strength, 5.0);
        let factors: Vec<f32> = uniforms.factors.iter().map(|slot| slot[0]).collect();
        assert_eq!(factors, BLOOM_FACTORS);
    }
}
