use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

/// Distortion range exposed to the manual debug controls.
pub const DISTORTION_RANGE: (f32, f32) = (0.0, 3.0);
/// Bloom strength range exposed to the manual debug controls.
pub const BLOOM_STRENGTH_RANGE: (f32, f32) = (0.0, 10.0);

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SceneConfig {
    pub version: u32,
    #[serde(default)]
    pub content: Content,
    #[serde(default)]
    pub grid: Grid,
    #[serde(default)]
    pub clip: Clip,
    #[serde(default)]
    pub bloom: Bloom,
    #[serde(default)]
    pub transition: Transition,
    #[serde(default)]
    pub render: Render,
    #[serde(default)]
    pub debug: DebugControls,
}

/// The two still images and the fixed aspect ratio they share.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub texture_a: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub texture_b: Option<PathBuf>,
    pub width: u32,
    pub height: u32,
}

impl Default for Content {
    fn default() -> Self {
        Self {
            texture_a: None,
            texture_b: None,
            width: 1280,
            height: 853,
        }
    }
}

impl Content {
    /// Height over width, compared against the viewport's own `h / w`.
    pub fn aspect(&self) -> f32 {
        self.height.max(1) as f32 / self.width.max(1) as f32
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Grid {
    pub width: f32,
    pub height: f32,
    pub segments_x: u32,
    pub segments_y: u32,
}

impl Default for Grid {
    fn default() -> Self {
        Self {
            width: 480.0 * 1.74,
            height: 820.0 * 1.74,
            segments_x: 480,
            segments_y: 820,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Clip {
    /// Directory holding the clip as an ordered image sequence.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frames: Option<PathBuf>,
    pub fps: f32,
    /// Playback length when no frame sequence is supplied.
    #[serde(
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub duration: Duration,
}

impl Default for Clip {
    fn default() -> Self {
        Self {
            frames: None,
            fps: 30.0,
            duration: Duration::from_secs(6),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Bloom {
    pub threshold: f32,
    pub strength: f32,
    pub radius: f32,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Transition {
    pub distortion_peak: f32,
    pub bloom_peak: f32,
    /// Length of both the distortion/bloom ramp up and the ramp back down.
    #[serde(
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub ramp: Duration,
    #[serde(
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub crossfade: Duration,
    #[serde(
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub crossfade_delay: Duration,
    #[serde(
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub video_fade: Duration,
}

impl Default for Transition {
    fn default() -> Self {
        Self {
            distortion_peak: 3.0,
            bloom_peak: 5.0,
            ramp: Duration::from_secs(2),
            crossfade: Duration::from_secs(1),
            crossfade_delay: Duration::from_millis(1500),
            video_fade: Duration::from_millis(100),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClockMode {
    /// Advance shader time by `time_step` every frame regardless of frame rate.
    #[default]
    Fixed,
    /// Advance shader time by real elapsed seconds scaled to `time_step` at 60 FPS.
    Wall,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AntialiasSetting {
    Auto,
    Off,
    Samples2,
    Samples4,
    Samples8,
    Samples16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorSpaceSetting {
    #[default]
    Auto,
    Gamma,
    Linear,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Render {
    pub time_step: f32,
    pub clock: ClockMode,
    #[serde(
        deserialize_with = "deserialize_antialias_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub antialias: Option<AntialiasSetting>,
    pub color_space: ColorSpaceSetting,
    pub size: [u32; 2],
}

impl Default for Render {
    fn default() -> Self {
        Self {
            time_step: 0.05,
            clock: ClockMode::Fixed,
            antialias: None,
            color_space: ColorSpaceSetting::Auto,
            size: [1280, 720],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct DebugControls {
    pub controls: bool,
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Duration;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a duration as number of seconds or human-readable string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(v)
                .map_err(|err| E::custom(format!("invalid duration '{v}': {err}")))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Duration::from_secs(v))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0 {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Duration::from_secs(v as u64))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v.is_nan() || v.is_sign_negative() {
                return Err(E::custom("duration must be non-negative"));
            }
            Duration::try_from_secs_f64(v)
                .map_err(|err| E::custom(format!("invalid duration {v}: {err}")))
        }
    }

    deserializer.deserialize_any(Visitor)
}

fn serialize_duration<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&humantime::format_duration(*value).to_string())
}

fn deserialize_antialias_opt<'de, D>(deserializer: D) -> Result<Option<AntialiasSetting>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Helper {
        Str(String),
        Num(i64),
    }

    let helper: Option<Helper> = Option::deserialize(deserializer)?;
    let result = match helper {
        None => None,
        Some(Helper::Str(raw)) => Some(parse_antialias(&raw).map_err(de::Error::custom)?),
        Some(Helper::Num(value)) => {
            if value < 0 {
                return Err(de::Error::custom("antialias value must be non-negative"));
            }
            Some(parse_antialias(&value.to_string()).map_err(de::Error::custom)?)
        }
    };
    Ok(result)
}

pub fn parse_antialias(raw: &str) -> Result<AntialiasSetting, String> {
    let normalized = raw.trim().to_ascii_lowercase();
    match normalized.as_str() {
        "auto" | "max" | "default" => Ok(AntialiasSetting::Auto),
        "off" | "none" | "disable" | "disabled" | "0" | "1" => Ok(AntialiasSetting::Off),
        "2" | "samples2" => Ok(AntialiasSetting::Samples2),
        "4" | "samples4" => Ok(AntialiasSetting::Samples4),
        "8" | "samples8" => Ok(AntialiasSetting::Samples8),
        "16" | "samples16" => Ok(AntialiasSetting::Samples16),
        other => Err(format!("invalid antialias setting '{other}'")),
    }
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            version: 1,
            content: Content::default(),
            grid: Grid::default(),
            clip: Clip::default(),
            bloom: Bloom::default(),
            transition: Transition::default(),
            render: Render::default(),
            debug: DebugControls::default(),
        }
    }
}

impl SceneConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: SceneConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    /// Reads and validates a config file. Relative asset paths inside the
    /// file are resolved against the file's directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&contents)?;
        if let Some(base) = path.parent() {
            config.resolve_relative_to(base);
        }
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    fn resolve_relative_to(&mut self, base: &Path) {
        let resolve = |slot: &mut Option<PathBuf>| {
            if let Some(path) = slot.as_mut() {
                if path.is_relative() {
                    *path = base.join(&*path);
                }
            }
        };
        resolve(&mut self.content.texture_a);
        resolve(&mut self.content.texture_b);
        resolve(&mut self.clip.frames);
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != 1 {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected 1",
                self.version
            )));
        }

        if self.content.width == 0 || self.content.height == 0 {
            return Err(ConfigError::Invalid(
                "content width and height must be greater than zero".into(),
            ));
        }

        if !(self.grid.width > 0.0 && self.grid.height > 0.0) {
            return Err(ConfigError::Invalid(
                "grid width and height must be greater than zero".into(),
            ));
        }
        if self.grid.segments_x == 0 || self.grid.segments_y == 0 {
            return Err(ConfigError::Invalid(
                "grid must have at least one segment along each axis".into(),
            ));
        }

        if !(self.clip.fps > 0.0) {
            return Err(ConfigError::Invalid("clip.fps must be > 0".into()));
        }
        if self.clip.frames.is_none() && self.clip.duration.is_zero() {
            return Err(ConfigError::Invalid(
                "clip.duration must be greater than zero when no frames are given".into(),
            ));
        }

        let bloom = &self.bloom;
        if bloom.threshold < 0.0 || bloom.strength < 0.0 || bloom.radius < 0.0 {
            return Err(ConfigError::Invalid("bloom values must be >= 0".into()));
        }
        if bloom.radius > 1.0 {
            return Err(ConfigError::Invalid("bloom.radius must be <= 1".into()));
        }

        let transition = &self.transition;
        check_range(
            "transition.distortion_peak",
            transition.distortion_peak,
            DISTORTION_RANGE,
        )?;
        check_range(
            "transition.bloom_peak",
            transition.bloom_peak,
            BLOOM_STRENGTH_RANGE,
        )?;
        for (name, value) in [
            ("transition.ramp", transition.ramp),
            ("transition.crossfade", transition.crossfade),
            ("transition.video_fade", transition.video_fade),
        ] {
            if value.is_zero() {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be greater than zero"
                )));
            }
        }

        if !(self.render.time_step > 0.0) {
            return Err(ConfigError::Invalid("render.time_step must be > 0".into()));
        }
        if self.render.size[0] == 0 || self.render.size[1] == 0 {
            return Err(ConfigError::Invalid(
                "render.size must be non-zero in both dimensions".into(),
            ));
        }

        Ok(())
    }
}

fn check_range(name: &str, value: f32, (min, max): (f32, f32)) -> Result<(), ConfigError> {
    if value.is_nan() || value < min || value > max {
        return Err(ConfigError::Invalid(format!(
            "{name} must be within [{min}, {max}], got {value}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
version = 1

[content]
texture_a = "images/end.jpg"
texture_b = "images/start.jpg"

[clip]
frames = "clip"
fps = 24

[bloom]
threshold = 0.1
radius = 0.4

[transition]
distortion_peak = 2.5
ramp = "3s"
crossfade = 1.5
crossfade_delay = "2s"

[render]
clock = "wall"
antialias = 4
size = [1600, 900]

[debug]
controls = true
"#;

    #[test]
    fn oversized_duration_is_a_parse_error() {
        let err = SceneConfig::from_toml_str("version = 1\n[transition]\ncrossfade = 1e30\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)), "{err:?}");
        assert!(err.to_string().contains("invalid duration"));
    }

    #[test]
    fn parses_sample_config() {
        let config = SceneConfig::from_toml_str(SAMPLE).expect("parse config");
        assert_eq!(config.version, 1);
        assert_eq!(
            config.content.texture_a.as_deref(),
            Some(Path::new("images/end.jpg"))
        );
        assert_eq!(config.clip.fps, 24.0);
        assert_eq!(config.transition.distortion_peak, 2.5);
        assert_eq!(config.transition.bloom_peak, 5.0);
        assert_eq!(config.transition.ramp, Duration::from_secs(3));
        assert_eq!(config.transition.crossfade, Duration::from_millis(1500));
        assert_eq!(config.transition.video_fade, Duration::from_millis(100));
        assert_eq!(config.render.clock, ClockMode::Wall);
        assert_eq!(config.render.antialias, Some(AntialiasSetting::Samples4));
        assert_eq!(config.render.size, [1600, 900]);
        assert!(config.debug.controls);
    }

    #[test]
    fn defaults_match_reference_choreography() {
        let config = SceneConfig::from_toml_str("version = 1").unwrap();
        assert_eq!(config, SceneConfig::default());
        assert!((config.content.aspect() - 853.0 / 1280.0).abs() < 1e-6);
        assert_eq!(config.grid.segments_x, 480);
        assert_eq!(config.grid.segments_y, 820);
        assert_eq!(config.render.time_step, 0.05);
        assert_eq!(config.bloom, Bloom::default());
    }

    #[test]
    fn rejects_unknown_version() {
        let err = SceneConfig::from_toml_str("version = 2").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_out_of_range_peaks() {
        let config = r#"
version = 1

[transition]
distortion_peak = 4.0
"#;
        let err = SceneConfig::from_toml_str(config).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(message) if message.contains("distortion_peak")));

        let config = r#"
version = 1

[transition]
bloom_peak = 12
"#;
        assert!(SceneConfig::from_toml_str(config).is_err());
    }

    #[test]
    fn rejects_zero_ramp() {
        let config = r#"
version = 1

[transition]
ramp = "0s"
"#;
        let err = SceneConfig::from_toml_str(config).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_negative_duration() {
        let config = r#"
version = 1

[transition]
crossfade = -1.0
"#;
        let err = SceneConfig::from_toml_str(config).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn serialized_config_round_trips() {
        let config = SceneConfig::from_toml_str(SAMPLE).unwrap();
        let rendered = config.to_toml_string().unwrap();
        assert!(rendered.contains("ramp = \"3s\""));
        let reparsed = SceneConfig::from_toml_str(&rendered).unwrap();
        assert_eq!(reparsed, config);
    }
}
