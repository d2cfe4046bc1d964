use choreography::ParameterSink;
use winit::keyboard::{Key, NamedKey};

pub const MAX_DEBUG_DISTORTION: f32 = sceneconfig::DISTORTION_RANGE.1;
pub const MAX_DEBUG_BLOOM: f32 = sceneconfig::BLOOM_STRENGTH_RANGE.1;
pub const DEBUG_STEP: f32 = 0.1;

/// What a key press asks the render loop to do.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlAction {
    AdjustDistortion(f32),
    AdjustBloom(f32),
    ResetDebug,
    /// Pretend the clip just ended.
    TriggerTransition,
    Exit,
}

/// Maps a pressed key to its action. Everything except `Escape` requires
/// debug controls to be enabled.
pub fn action_for_key(key: &Key, debug_enabled: bool) -> Option<ControlAction> {
    let action = match key {
        Key::Named(NamedKey::Escape) => return Some(ControlAction::Exit),
        Key::Named(NamedKey::Space) => ControlAction::TriggerTransition,
        Key::Character(text) => match text.as_str() {
            " " => ControlAction::TriggerTransition,
            "[" => ControlAction::AdjustDistortion(-DEBUG_STEP),
            "]" => ControlAction::AdjustDistortion(DEBUG_STEP),
            "-" => ControlAction::AdjustBloom(-DEBUG_STEP),
            "=" => ControlAction::AdjustBloom(DEBUG_STEP),
            "0" => ControlAction::ResetDebug,
            _ => return None,
        },
        _ => return None,
    };
    debug_enabled.then_some(action)
}

/// Manual distortion and bloom values shown while no transition runs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DebugSettings {
    pub distortion: f32,
    pub bloom_strength: f32,
    defaults: (f32, f32),
}

impl DebugSettings {
    pub fn new(distortion: f32, bloom_strength: f32) -> Self {
        let distortion = distortion.clamp(0.0, MAX_DEBUG_DISTORTION);
        let bloom_strength = bloom_strength.clamp(0.0, MAX_DEBUG_BLOOM);
        Self {
            distortion,
            bloom_strength,
            defaults: (distortion, bloom_strength),
        }
    }

    /// Applies an adjustment; returns whether a value changed.
    pub fn apply(&mut self, action: ControlAction) -> bool {
        let before = (self.distortion, self.bloom_strength);
        match action {
            ControlAction::AdjustDistortion(step) => {
                self.distortion =
                    round_step(self.distortion + step).clamp(0.0, MAX_DEBUG_DISTORTION);
            }
            ControlAction::AdjustBloom(step) => {
                self.bloom_strength =
                    round_step(self.bloom_strength + step).clamp(0.0, MAX_DEBUG_BLOOM);
            }
            ControlAction::ResetDebug => {
                (self.distortion, self.bloom_strength) = self.defaults;
            }
            ControlAction::TriggerTransition | ControlAction::Exit => {}
        }
        before != (self.distortion, self.bloom_strength)
    }

    pub fn write_to<S: ParameterSink + ?Sized>(&self, sink: &mut S) {
        sink.set_distortion(self.distortion);
        sink.set_bloom_strength(self.bloom_strength);
    }
}

/// Snaps to the step grid so repeated presses do not accumulate float error.
fn round_step(value: f32) -> f32 {
    (value / DEBUG_STEP).round() * DEBUG_STEP
}

#[cfg(test)]
mod tests {
    use super::*;

    fn character(text: &str) -> Key {
        Key::Character(text.into())
    }

    #[test]
    fn keys_map_to_actions() {
        assert_eq!(
            action_for_key(&character("]"), true),
            Some(ControlAction::AdjustDistortion(DEBUG_STEP))
        );
        assert_eq!(
            action_for_key(&character("-"), true),
            Some(ControlAction::AdjustBloom(-DEBUG_STEP))
        );
        assert_eq!(
            action_for_key(&Key::Named(NamedKey::Space), true),
            Some(ControlAction::TriggerTransition)
        );
        assert_eq!(action_for_key(&character("x"), true), None);
    }

    #[test]
    fn only_escape_works_without_debug_controls() {
        assert_eq!(
            action_for_key(&Key::Named(NamedKey::Escape), false),
            Some(ControlAction::Exit)
        );
        assert_eq!(action_for_key(&character("]"), false), None);
        assert_eq!(action_for_key(&Key::Named(NamedKey::Space), false), None);
    }

    #[test]
    fn adjustments_clamp_to_ranges() {
        let mut settings = DebugSettings::new(0.0, 0.0);
        assert!(!settings.apply(ControlAction::AdjustDistortion(-DEBUG_STEP)));
        assert_eq!(settings.distortion, 0.0);

        for _ in 0..40 {
            settings.apply(ControlAction::AdjustDistortion(DEBUG_STEP));
        }
        assert_eq!(settings.distortion, MAX_DEBUG_DISTORTION);

        for _ in 0..120 {
            settings.apply(ControlAction::AdjustBloom(DEBUG_STEP));
        }
        assert_eq!(settings.bloom_strength, MAX_DEBUG_BLOOM);
    }

    #[test]
    fn steps_stay_on_grid() {
        let mut settings = DebugSettings::new(0.0, 0.0);
        for _ in 0..7 {
            settings.apply(ControlAction::AdjustDistortion(DEBUG_STEP));
        }
        assert!((settings.distortion - 0.7).abs() < 1e-6);
    }

    #[test]
    fn reset_restores_initial_values() {
        let mut settings = DebugSettings::new(0.0, 1.5);
        settings.apply(ControlAction::AdjustBloom(DEBUG_STEP));
        settings.apply(ControlAction::AdjustDistortion(DEBUG_STEP));
        assert!(settings.apply(ControlAction::ResetDebug));
        assert_eq!((settings.distortion, settings.bloom_strength), (0.0, 1.5));
    }

    #[test]
    fn settings_write_through_the_sink() {
        #[derive(Default)]
        struct Recorder {
            distortion: f32,
            bloom: f32,
            progress_writes: usize,
        }
        impl ParameterSink for Recorder {
            fn set_distortion(&mut self, value: f32) {
                self.distortion = value;
            }
            fn set_bloom_strength(&mut self, value: f32) {
                self.bloom = value;
            }
            fn set_progress(&mut self, _value: f32) {
                self.progress_writes += 1;
            }
        }

        let mut recorder = Recorder::default();
        DebugSettings::new(1.0, 2.0).write_to(&mut recorder);
        assert_eq!((recorder.distortion, recorder.bloom), (1.0, 2.0));
        assert_eq!(recorder.progress_writes, 0);
    }
}
