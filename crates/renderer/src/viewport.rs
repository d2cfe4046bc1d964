use winit::dpi::PhysicalSize;

/// Device pixel ratios above this are rendered at this density.
pub const MAX_SCALE_FACTOR: f64 = 2.0;

/// Window geometry applied as a unit on resize.
///
/// `width`/`height` are logical pixels. The renderer draws at
/// `logical * scale_factor` where the scale factor is clamped to `[1, 2]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportState {
    pub width: u32,
    pub height: u32,
    pub scale_factor: f64,
}

impl ViewportState {
    pub fn new(width: u32, height: u32, scale_factor: f64) -> Self {
        let scale_factor = if scale_factor.is_finite() {
            scale_factor.clamp(1.0, MAX_SCALE_FACTOR)
        } else {
            1.0
        };
        Self {
            width: width.max(1),
            height: height.max(1),
            scale_factor,
        }
    }

    /// Builds the state from a window's physical size and its unclamped scale factor.
    pub fn from_physical(size: PhysicalSize<u32>, scale_factor: f64) -> Self {
        let host = if scale_factor.is_finite() && scale_factor > 0.0 {
            scale_factor
        } else {
            1.0
        };
        let logical = size.to_logical::<f64>(host);
        Self::new(
            logical.width.round() as u32,
            logical.height.round() as u32,
            scale_factor,
        )
    }

    /// Pixel size of the offscreen targets.
    pub fn render_size(&self) -> (u32, u32) {
        let scale = |value: u32| ((value as f64 * self.scale_factor).round() as u32).max(1);
        (scale(self.width), scale(self.height))
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    /// `[width, height, a1, a2]` for content whose height/width ratio is `content_aspect`.
    pub fn resolution(&self, content_aspect: f32) -> [f32; 4] {
        let (a1, a2) = cover_factors(self.width, self.height, content_aspect);
        [self.width as f32, self.height as f32, a1, a2]
    }
}

/// UV scale factors that make fixed-aspect content cover the viewport.
///
/// One factor is always 1; the other is at most 1 and crops the overflowing
/// axis.
pub fn cover_factors(width: u32, height: u32, content_aspect: f32) -> (f32, f32) {
    let width = width.max(1) as f32;
    let height = height.max(1) as f32;
    if height / width > content_aspect {
        ((width / height) * content_aspect, 1.0)
    } else {
        (1.0, (height / width) / content_aspect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONTENT_ASPECT: f32 = 853.0 / 1280.0;

    #[test]
    fn wide_viewport_crops_vertically() {
        let (a1, a2) = cover_factors(1600, 900, CONTENT_ASPECT);
        assert_eq!(a1, 1.0);
        assert!((a2 - 0.844_1).abs() < 1e-3, "a2 = {a2}");
    }

    #[test]
    fn tall_viewport_crops_horizontally() {
        let (a1, a2) = cover_factors(800, 1600, CONTENT_ASPECT);
        assert_eq!(a2, 1.0);
        assert!((a1 - 0.5 * CONTENT_ASPECT).abs() < 1e-6);
    }

    #[test]
    fn exactly_one_factor_is_unity() {
        for width in (1..=4000).step_by(97) {
            for height in (1..=4000).step_by(89) {
                let (a1, a2) = cover_factors(width, height, CONTENT_ASPECT);
                assert!(a1 == 1.0 || a2 == 1.0, "{width}x{height} -> ({a1}, {a2})");
                assert!(a1 <= 1.0 + 1e-6 && a2 <= 1.0 + 1e-6);
                assert!(a1 > 0.0 && a2 > 0.0);
            }
        }
    }

    #[test]
    fn matching_aspect_needs_no_crop() {
        assert_eq!(cover_factors(1280, 853, CONTENT_ASPECT), (1.0, 1.0));
    }

    #[test]
    fn resolution_carries_viewport_and_cover() {
        let viewport = ViewportState::new(1600, 900, 1.0);
        let resolution = viewport.resolution(CONTENT_ASPECT);
        assert_eq!(&resolution[..3], &[1600.0, 900.0, 1.0]);
        assert!((resolution[3] - 0.844_1).abs() < 1e-3);
    }

    #[test]
    fn scale_factor_is_clamped() {
        assert_eq!(ViewportState::new(10, 10, 3.0).scale_factor, 2.0);
        assert_eq!(ViewportState::new(10, 10, 0.5).scale_factor, 1.0);
        assert_eq!(ViewportState::new(10, 10, f64::NAN).scale_factor, 1.0);
    }

    #[test]
    fn physical_size_maps_to_logical_and_render_size() {
        let viewport = ViewportState::from_physical(PhysicalSize::new(3000, 1500), 3.0);
        assert_eq!((viewport.width, viewport.height), (1000, 500));
        assert_eq!(viewport.render_size(), (2000, 1000));
    }

    #[test]
    fn zero_dimensions_are_clamped() {
        let viewport = ViewportState::new(0, 0, 1.0);
        assert_eq!((viewport.width, viewport.height), (1, 1));
        assert_eq!(viewport.render_size(), (1, 1));
    }
}
