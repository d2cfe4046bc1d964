/// Easing curves available to tweens.
///
/// `Cubic*` are the "power2" family of common animation libraries; `QuadOut`
/// is the usual default ease for short opacity fades.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Ease {
    Linear,
    QuadOut,
    CubicIn,
    CubicOut,
    CubicInOut,
}

impl Ease {
    pub fn sample(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Ease::Linear => t,
            Ease::QuadOut => 1.0 - (1.0 - t) * (1.0 - t),
            Ease::CubicIn => t * t * t,
            Ease::CubicOut => 1.0 - (1.0 - t).powi(3),
            Ease::CubicInOut => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Ease; 5] = [
        Ease::Linear,
        Ease::QuadOut,
        Ease::CubicIn,
        Ease::CubicOut,
        Ease::CubicInOut,
    ];

    #[test]
    fn curves_hit_both_endpoints_exactly() {
        for ease in ALL {
            assert_eq!(ease.sample(0.0), 0.0, "{ease:?}");
            assert_eq!(ease.sample(1.0), 1.0, "{ease:?}");
        }
    }

    #[test]
    fn curves_are_monotonic() {
        for ease in ALL {
            let mut last = 0.0;
            for step in 0..=100 {
                let value = ease.sample(step as f32 / 100.0);
                assert!(value >= last - f32::EPSILON, "{ease:?} at {step}");
                last = value;
            }
        }
    }

    #[test]
    fn in_out_is_symmetric_about_midpoint() {
        let curve = Ease::CubicInOut;
        assert!((curve.sample(0.5) - 0.5).abs() < 1e-6);
        let early = curve.sample(0.25);
        let late = curve.sample(0.75);
        assert!((early + late - 1.0).abs() < 1e-6);
        assert!(early < 0.25);
    }

    #[test]
    fn in_starts_slow_and_out_starts_fast() {
        assert!(Ease::CubicIn.sample(0.3) < 0.3);
        assert!(Ease::CubicOut.sample(0.3) > 0.3);
        assert!(Ease::QuadOut.sample(0.3) > 0.3);
    }

    #[test]
    fn out_of_range_input_is_clamped() {
        assert_eq!(Ease::CubicIn.sample(-1.0), 0.0);
        assert_eq!(Ease::CubicOut.sample(2.0), 1.0);
    }
}
