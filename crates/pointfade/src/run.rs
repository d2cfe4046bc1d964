use anyhow::{Context, Result};
use renderer::{Renderer, RendererConfig};
use sceneconfig::SceneConfig;
use tracing_subscriber::EnvFilter;

use crate::cli::Args;
use crate::paths::AppPaths;

pub fn run(args: Args) -> Result<()> {
    initialise_tracing();

    let paths = AppPaths::discover()?;
    tracing::debug!(config = %paths.config_dir().display(), "resolved pointfade paths");

    let scene = load_scene(&args, &paths)?;
    if args.print_config {
        let rendered = scene
            .to_toml_string()
            .context("failed to render scene configuration")?;
        print!("{rendered}");
        return Ok(());
    }

    let renderer_config = RendererConfig::from_scene(&scene)?;
    Renderer::new(renderer_config).run()
}

fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_scene(args: &Args, paths: &AppPaths) -> Result<SceneConfig> {
    let mut scene = match paths.scene_file(args.config.as_deref()) {
        Some(path) => {
            let scene = SceneConfig::load(&path)
                .with_context(|| format!("failed to load scene from {}", path.display()))?;
            tracing::info!(path = %path.display(), "loaded scene configuration");
            scene
        }
        None => {
            tracing::debug!("no scene file found; using defaults");
            SceneConfig::default()
        }
    };

    apply_overrides(&mut scene, args);
    scene
        .validate()
        .context("scene configuration is invalid after applying flags")?;
    Ok(scene)
}

fn apply_overrides(scene: &mut SceneConfig, args: &Args) {
    if let Some(path) = &args.texture_a {
        scene.content.texture_a = Some(path.clone());
    }
    if let Some(path) = &args.texture_b {
        scene.content.texture_b = Some(path.clone());
    }
    if let Some(dir) = &args.clip {
        scene.clip.frames = Some(dir.clone());
    }
    if let Some(duration) = args.clip_duration {
        scene.clip.duration = duration;
    }
    if let Some(size) = args.size {
        scene.render.size = size;
    }
    if let Some(antialias) = args.antialias {
        scene.render.antialias = Some(antialias);
    }
    if let Some(color_space) = args.color_space {
        scene.render.color_space = color_space;
    }
    if args.debug_controls {
        scene.debug.controls = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::path::PathBuf;
    use std::time::Duration;

    #[test]
    fn flags_override_scene_values() {
        let args = Args::try_parse_from([
            "pointfade",
            "--texture-b",
            "b.png",
            "--clip-duration",
            "4s",
            "--color-space",
            "linear",
            "--debug-controls",
        ])
        .unwrap();
        let mut scene = SceneConfig::default();
        scene.content.texture_a = Some(PathBuf::from("a.png"));
        apply_overrides(&mut scene, &args);

        assert_eq!(scene.content.texture_a, Some(PathBuf::from("a.png")));
        assert_eq!(scene.content.texture_b, Some(PathBuf::from("b.png")));
        assert_eq!(scene.clip.duration, Duration::from_secs(4));
        assert_eq!(
            scene.render.color_space,
            sceneconfig::ColorSpaceSetting::Linear
        );
        assert!(scene.debug.controls);
        assert!(scene.validate().is_ok());
    }
}
