use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::imageops::flip_vertical_in_place;
use image::GenericImageView;
use wgpu::util::{DeviceExt, TextureDataOrder};

use super::context::SurfaceColorSpace;

const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

/// Decoded image uploaded as a sampled texture.
pub(crate) struct SourceTexture {
    pub _texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub size: (u32, u32),
}

impl SourceTexture {
    /// Decodes `path` and uploads it bottom row first so `v` grows upwards.
    pub(crate) fn load(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        path: &Path,
        color_space: SurfaceColorSpace,
    ) -> Result<Self> {
        let image = image::open(path)
            .with_context(|| format!("failed to open image at {}", path.display()))?;
        let (width, height) = image.dimensions();
        let mut rgba = image.to_rgba8();
        flip_vertical_in_place(&mut rgba);

        let texture_format = match color_space {
            SurfaceColorSpace::Gamma => wgpu::TextureFormat::Rgba8Unorm,
            SurfaceColorSpace::Linear => wgpu::TextureFormat::Rgba8UnormSrgb,
        };
        let label = path.display().to_string();
        let texture = device.create_texture_with_data(
            queue,
            &wgpu::TextureDescriptor {
                label: Some(&label),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: texture_format,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            TextureDataOrder::LayerMajor,
            &rgba,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        tracing::debug!(path = %path.display(), width, height, "loaded texture");
        Ok(Self {
            _texture: texture,
            view,
            size: (width, height),
        })
    }
}

pub(crate) fn linear_clamp_sampler(device: &wgpu::Device, label: &str) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some(label),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::FilterMode::Linear,
        ..Default::default()
    })
}

/// Image files in `dir`, in playback order (see [`frame_order_key`]).
pub(crate) fn list_frames(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read clip frames in {}", dir.display()))?;
    let mut frames = Vec::new();
    for entry in entries {
        let path = entry
            .with_context(|| format!("failed to list {}", dir.display()))?
            .path();
        let is_image = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                IMAGE_EXTENSIONS
                    .iter()
                    .any(|known| ext.eq_ignore_ascii_case(known))
            })
            .unwrap_or(false);
        if path.is_file() && is_image {
            frames.push(path);
        }
    }
    frames.sort_by_cached_key(|path| frame_order_key(path));
    if frames.is_empty() {
        anyhow::bail!("no image frames found in {}", dir.display());
    }
    Ok(frames)
}

/// Sort key for a frame file: the stem without its trailing digits, then those
/// digits as a number, then the full name. `frame2` plays before `frame10`.
fn frame_order_key(path: &Path) -> (String, Option<u64>, String) {
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let prefix = stem.trim_end_matches(|c: char| c.is_ascii_digit());
    let number = stem[prefix.len()..].parse().ok();
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    (prefix.to_string(), number, name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_are_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["0002.png", "0001.PNG", "0010.jpg", "notes.txt"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested.png")).unwrap();

        let frames = list_frames(dir.path()).unwrap();
        let names: Vec<_> = frames
            .iter()
            .map(|path| path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["0001.PNG", "0002.png", "0010.jpg"]);
    }

    #[test]
    fn unpadded_frame_numbers_sort_numerically() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["frame10.png", "frame2.png", "frame1.png", "frame.png"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }

        let frames = list_frames(dir.path()).unwrap();
        let names: Vec<_> = frames
            .iter()
            .map(|path| path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["frame.png", "frame1.png", "frame2.png", "frame10.png"]);
    }

    #[test]
    fn empty_frame_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = list_frames(dir.path()).unwrap_err();
        assert!(err.to_string().contains("no image frames"));
    }
}
