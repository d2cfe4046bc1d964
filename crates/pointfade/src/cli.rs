use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use sceneconfig::{AntialiasSetting, ColorSpaceSetting};

#[derive(Parser, Debug)]
#[command(
    name = "pointfade",
    author,
    version,
    about = "Point-cloud image transition with bloom, played whenever the clip ends"
)]
pub struct Args {
    /// Scene configuration file; defaults to `$XDG_CONFIG_HOME/pointfade/scene.toml`.
    #[arg(long, value_name = "FILE", env = "POINTFADE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Image shown before the transition.
    #[arg(long, value_name = "PATH")]
    pub texture_a: Option<PathBuf>,

    /// Image the transition blends into.
    #[arg(long, value_name = "PATH")]
    pub texture_b: Option<PathBuf>,

    /// Directory of numbered frames played as the clip.
    #[arg(long, value_name = "DIR")]
    pub clip: Option<PathBuf>,

    /// Clip length when no frame directory is given (e.g. `6s`, `2500ms`).
    #[arg(long, value_name = "DURATION", value_parser = parse_duration)]
    pub clip_duration: Option<Duration>,

    /// Window size (e.g. `1280x720`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_surface_size)]
    pub size: Option<[u32; 2]>,

    /// Anti-aliasing policy: `auto`, `off`, or an explicit MSAA sample count (e.g. `4`).
    #[arg(long, value_name = "MODE", value_parser = sceneconfig::parse_antialias)]
    pub antialias: Option<AntialiasSetting>,

    /// Output color space handling: `auto`, `gamma`, or `linear`.
    #[arg(long, value_name = "MODE", value_parser = parse_color_space)]
    pub color_space: Option<ColorSpaceSetting>,

    /// Enable keyboard controls for distortion, bloom and triggering the transition.
    #[arg(long)]
    pub debug_controls: bool,

    /// Print the effective scene configuration as TOML and exit.
    #[arg(long)]
    pub print_config: bool,
}

pub fn parse() -> Args {
    Args::parse()
}

pub fn parse_surface_size(value: &str) -> Result<[u32; 2], String> {
    let (width, height) = value
        .trim()
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("invalid size '{value}'; expected WIDTHxHEIGHT"))?;
    let parse = |part: &str| -> Result<u32, String> {
        let parsed: u32 = part
            .trim()
            .parse()
            .map_err(|_| format!("invalid size component '{part}'"))?;
        if parsed == 0 {
            return Err("size components must be greater than zero".to_string());
        }
        Ok(parsed)
    };
    Ok([parse(width)?, parse(height)?])
}

pub fn parse_duration(value: &str) -> Result<Duration, String> {
    let trimmed = value.trim();
    if let Ok(seconds) = trimmed.parse::<f64>() {
        if seconds.is_finite() && seconds > 0.0 {
            return Ok(Duration::from_secs_f64(seconds));
        }
        return Err("duration must be positive".to_string());
    }
    humantime::parse_duration(trimmed).map_err(|err| format!("invalid duration '{trimmed}': {err}"))
}

pub fn parse_color_space(value: &str) -> Result<ColorSpaceSetting, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("color space must not be empty".to_string());
    }

    let normalized = trimmed.to_ascii_lowercase();
    match normalized.as_str() {
        "auto" => Ok(ColorSpaceSetting::Auto),
        "gamma" | "srgb-off" => Ok(ColorSpaceSetting::Gamma),
        "linear" | "srgb" => Ok(ColorSpaceSetting::Linear),
        other => Err(format!(
            "unknown color space '{other}'; expected auto, gamma, or linear"
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sizes() {
        assert_eq!(parse_surface_size("1280x720"), Ok([1280, 720]));
        assert_eq!(parse_surface_size(" 800X600 "), Ok([800, 600]));
        assert!(parse_surface_size("1280").is_err());
        assert!(parse_surface_size("0x720").is_err());
    }

    #[test]
    fn parses_durations_in_seconds_or_humantime() {
        assert_eq!(parse_duration("6"), Ok(Duration::from_secs(6)));
        assert_eq!(parse_duration("2500ms"), Ok(Duration::from_millis(2500)));
        assert!(parse_duration("-1").is_err());
        assert!(parse_duration("soon").is_err());
    }

    #[test]
    fn parses_color_spaces() {
        assert_eq!(parse_color_space("Linear"), Ok(ColorSpaceSetting::Linear));
        assert_eq!(parse_color_space("gamma"), Ok(ColorSpaceSetting::Gamma));
        assert!(parse_color_space("").is_err());
        assert!(parse_color_space("hdr").is_err());
    }

    #[test]
    fn cli_flags_parse_together() {
        let args = Args::try_parse_from([
            "pointfade",
            "--texture-a",
            "a.jpg",
            "--size",
            "640x480",
            "--antialias",
            "4",
            "--clip-duration",
            "3s",
            "--debug-controls",
        ])
        .expect("valid flags");
        assert_eq!(args.texture_a, Some(PathBuf::from("a.jpg")));
        assert_eq!(args.size, Some([640, 480]));
        assert_eq!(args.antialias, Some(AntialiasSetting::Samples4));
        assert_eq!(args.clip_duration, Some(Duration::from_secs(3)));
        assert!(args.debug_controls);
        assert!(!args.print_config);
    }
}
