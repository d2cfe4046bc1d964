use bytemuck::{Pod, Zeroable};
use choreography::ParameterSink;
use glam::Mat4;

use super::post::BloomParameters;

/// std140 mirror of `MaterialParams` in the point shaders.
#[repr(C, align(16))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct MaterialUniforms {
    pub view_proj: [[f32; 4]; 4],
    /// Logical width, height and the two cover factors.
    pub resolution: [f32; 4],
    pub time: f32,
    pub distortion: f32,
    pub progress: f32,
    pub _padding: f32,
}

unsafe impl Zeroable for MaterialUniforms {}
unsafe impl Pod for MaterialUniforms {}

impl Default for MaterialUniforms {
    fn default() -> Self {
        Self {
            view_proj: Mat4::IDENTITY.to_cols_array_2d(),
            resolution: [1.0, 1.0, 1.0, 1.0],
            time: 0.0,
            distortion: 0.0,
            progress: 0.0,
            _padding: 0.0,
        }
    }
}

/// CPU copy of the material uniforms, uploaded once per frame.
///
/// Writers split access by owner: the render loop drives time, viewport and
/// camera, the choreographer only touches the transition values.
#[derive(Debug, Default)]
pub(crate) struct ShaderUniformSet {
    values: MaterialUniforms,
}

impl ShaderUniformSet {
    pub fn values(&self) -> &MaterialUniforms {
        &self.values
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(&self.values)
    }

    pub fn frame_writer(&mut self) -> FrameWriter<'_> {
        FrameWriter {
            values: &mut self.values,
        }
    }

    pub fn transition_writer(&mut self) -> TransitionWriter<'_> {
        TransitionWriter {
            values: &mut self.values,
        }
    }
}

pub(crate) struct FrameWriter<'a> {
    values: &'a mut MaterialUniforms,
}

impl FrameWriter<'_> {
    pub fn set_time(&mut self, seconds: f32) {
        self.values.time = seconds;
    }

    pub fn set_viewport(&mut self, resolution: [f32; 4]) {
        self.values.resolution = resolution;
    }

    pub fn set_view_projection(&mut self, matrix: Mat4) {
        self.values.view_proj = matrix.to_cols_array_2d();
    }
}

pub(crate) struct TransitionWriter<'a> {
    values: &'a mut MaterialUniforms,
}

impl TransitionWriter<'_> {
    pub fn set_distortion(&mut self, value: f32) {
        self.values.distortion = value.max(0.0);
    }

    pub fn set_progress(&mut self, value: f32) {
        self.values.progress = value.clamp(0.0, 1.0);
    }
}

/// Everything a running transition is allowed to write.
pub(crate) struct TransitionTargets<'a> {
    pub(crate) uniforms: TransitionWriter<'a>,
    pub(crate) bloom: &'a mut BloomParameters,
}

impl ParameterSink for TransitionTargets<'_> {
    fn set_distortion(&mut self, value: f32) {
        self.uniforms.set_distortion(value);
    }

    fn set_bloom_strength(&mut self, value: f32) {
        self.bloom.strength = value.max(0.0);
    }

    fn set_progress(&mut self, value: f32) {
        self.uniforms.set_progress(value);
    }
}
