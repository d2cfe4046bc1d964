//! Renderer crate for pointfade.
//!
//! Draws a dense grid of points textured by two source images, warps it with
//! animated noise and blooms the result, while a clip plays on top. When the
//! clip ends the choreographer runs one transition from image A to image B and
//! back to rest. The overall flow is:
//!
//! ```text
//!   CLI / scene.toml
//!          │ RendererConfig
//!          ▼
//!   Renderer::run ──▶ WindowState ──▶ winit event loop ──▶ tick()
//!                                                    │
//!     ClipPlayer::tick ─▶ ended ─▶ Choreographer ────┤
//!                                                    ▼
//!              points pass ─▶ bloom chain ─▶ composite ─▶ clip overlay
//! ```
//!
//! `WindowState` owns the GPU resources and the clip; `Renderer` is the thin
//! entry point. Shader time comes from a [`TimeSource`] (fixed step by default)
//! while the clip and the transition advance by real frame time.

mod camera;
mod compile;
mod controls;
mod geometry;
mod gpu;
mod runtime;
mod types;
mod viewport;
mod window;

use anyhow::Result;

pub use camera::Camera;
pub use controls::{action_for_key, ControlAction, DebugSettings};
pub use geometry::{PointGrid, PointVertex};
pub use gpu::{
    bloom_factor, blend_colors, gaussian_weights, high_pass, is_discarded, mip_sizes,
    sequence_duration, BloomParameters, BLOOM_FACTORS, DISCARD_THRESHOLD, KERNEL_RADII,
    MAX_KERNEL_WEIGHTS, MIP_COUNT,
};
pub use runtime::{
    time_source_for_clock, BoxedTimeSource, FixedStepTimeSource, FrameDelta, TimeSource,
    WallClockTimeSource, MAX_FRAME_DELTA,
};
pub use types::{Antialiasing, ColorSpaceMode, RendererConfig};
pub use viewport::{cover_factors, ViewportState, MAX_SCALE_FACTOR};

/// High-level entry point that owns the chosen configuration.
pub struct Renderer {
    config: RendererConfig,
}

impl Renderer {
    pub fn new(config: RendererConfig) -> Self {
        Self { config }
    }

    /// Opens the window and runs until it is closed.
    pub fn run(self) -> Result<()> {
        tracing::info!(
            texture_a = %self.config.texture_a.display(),
            texture_b = %self.config.texture_b.display(),
            width = self.config.surface_size.0,
            height = self.config.surface_size.1,
            "starting renderer"
        );
        window::run_window(self.config)
    }
}
