use std::path::PathBuf;

use anyhow::{Context, Result};
use sceneconfig::{AntialiasSetting, ClockMode, ColorSpaceSetting, SceneConfig};

use crate::gpu::BloomParameters;

/// Output color handling for the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorSpaceMode {
    /// Gamma-encoded swapchain, matching how the source images are authored.
    #[default]
    Auto,
    /// Treat textures and output as gamma-encoded; use non-sRGB surfaces.
    Gamma,
    /// Sample textures as sRGB and let an sRGB swapchain re-encode on write.
    Linear,
}

impl From<ColorSpaceSetting> for ColorSpaceMode {
    fn from(value: ColorSpaceSetting) -> Self {
        match value {
            ColorSpaceSetting::Auto => Self::Auto,
            ColorSpaceSetting::Gamma => Self::Gamma,
            ColorSpaceSetting::Linear => Self::Linear,
        }
    }
}

/// Anti-aliasing policy for the particle pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Antialiasing {
    /// Pick the highest sample count supported by the offscreen scene format.
    #[default]
    Auto,
    /// Render points straight into the single-sampled scene target.
    Off,
    /// Request a specific MSAA sample count (clamped to what the device supports).
    Samples(u32),
}

impl From<AntialiasSetting> for Antialiasing {
    fn from(value: AntialiasSetting) -> Self {
        match value {
            AntialiasSetting::Auto => Self::Auto,
            AntialiasSetting::Off => Self::Off,
            AntialiasSetting::Samples2 => Self::Samples(2),
            AntialiasSetting::Samples4 => Self::Samples(4),
            AntialiasSetting::Samples8 => Self::Samples(8),
            AntialiasSetting::Samples16 => Self::Samples(16),
        }
    }
}

/// Immutable configuration passed to the renderer at start-up.
///
/// Built from a validated [`SceneConfig`]; image paths are required here
/// because the material cannot be constructed without both sources.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Initial window size in physical pixels.
    pub surface_size: (u32, u32),
    pub texture_a: PathBuf,
    pub texture_b: PathBuf,
    /// Directory holding the clip as numbered frames; texture A stands in when absent.
    pub clip_frames: Option<PathBuf>,
    pub clip_fps: f32,
    pub clip_duration: std::time::Duration,
    /// Height over width of the source images.
    pub content_aspect: f32,
    pub grid: sceneconfig::Grid,
    pub bloom: BloomParameters,
    pub transition: sceneconfig::Transition,
    pub time_step: f32,
    pub clock: ClockMode,
    pub antialiasing: Antialiasing,
    pub color_space: ColorSpaceMode,
    pub debug_controls: bool,
}

impl RendererConfig {
    pub fn from_scene(scene: &SceneConfig) -> Result<Self> {
        let texture_a = scene
            .content
            .texture_a
            .clone()
            .context("scene has no content.texture_a")?;
        let texture_b = scene
            .content
            .texture_b
            .clone()
            .context("scene has no content.texture_b")?;

        Ok(Self {
            surface_size: (scene.render.size[0], scene.render.size[1]),
            texture_a,
            texture_b,
            clip_frames: scene.clip.frames.clone(),
            clip_fps: scene.clip.fps,
            clip_duration: scene.clip.duration,
            content_aspect: scene.content.aspect(),
            grid: scene.grid.clone(),
            bloom: BloomParameters {
                threshold: scene.bloom.threshold,
                strength: scene.bloom.strength,
                radius: scene.bloom.radius,
            },
            transition: scene.transition.clone(),
            time_step: scene.render.time_step,
            clock: scene.render.clock,
            antialiasing: scene
                .render
                .antialias
                .map(Antialiasing::from)
                .unwrap_or_default(),
            color_space: scene.render.color_space.into(),
            debug_controls: scene.debug.controls,
        })
    }
}
