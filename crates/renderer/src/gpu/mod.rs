//! GPU side of the particle transition.
//!
//! - `context` owns wgpu instance/device/surface wiring and rebuilds the
//!   swapchain when the window resizes.
//! - `textures` decodes source images and clip frames into sampled textures.
//! - `uniforms` keeps the CPU copy of the material block and hands out the
//!   disjoint frame/transition writers.
//! - `material` draws the point grid into the offscreen scene target.
//! - `post` runs the bloom chain and composites onto the surface.
//! - `overlay` blends the current clip frame over the composite.
//! - `state` glues everything together behind the `GpuState` API used by
//!   `window`.

mod context;
mod material;
mod overlay;
mod post;
mod state;
mod textures;
mod uniforms;

pub use material::{blend_colors, is_discarded, DISCARD_THRESHOLD};
pub use overlay::sequence_duration;
pub use post::{
    bloom_factor, gaussian_weights, high_pass, mip_sizes, BloomParameters, BLOOM_FACTORS,
    KERNEL_RADII, MAX_KERNEL_WEIGHTS, MIP_COUNT,
};
pub(crate) use state::GpuState;
