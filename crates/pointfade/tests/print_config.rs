use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use std::time::Duration;

use sceneconfig::{AntialiasSetting, SceneConfig};
use tempfile::TempDir;

fn pointfade(config_home: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_pointfade"))
        .env("XDG_CONFIG_HOME", config_home)
        .env_remove("POINTFADE_CONFIG")
        .env_remove("RUST_LOG")
        .args(args)
        .output()
        .expect("failed to run pointfade")
}

#[test]
fn print_config_resolves_paths_and_applies_flags() {
    let root = TempDir::new().unwrap();
    let scene_dir = root.path().join("scenes");
    fs::create_dir_all(&scene_dir).unwrap();
    let scene_path = scene_dir.join("night.toml");
    fs::write(
        &scene_path,
        r#"
version = 1

[content]
texture_a = "city.jpg"
texture_b = "/srv/images/forest.jpg"

[bloom]
threshold = 0.2
strength = 0.5
radius = 0.3
"#,
    )
    .unwrap();

    let output = pointfade(
        &root.path().join("config"),
        &[
            "--config",
            scene_path.to_str().unwrap(),
            "--clip-duration",
            "4s",
            "--antialias",
            "4",
            "--print-config",
        ],
    );
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let printed = String::from_utf8(output.stdout).unwrap();
    let scene = SceneConfig::from_toml_str(&printed).expect("printed config parses");
    assert_eq!(scene.content.texture_a, Some(scene_dir.join("city.jpg")));
    assert_eq!(
        scene.content.texture_b.as_deref(),
        Some(Path::new("/srv/images/forest.jpg"))
    );
    assert_eq!(scene.clip.duration, Duration::from_secs(4));
    assert_eq!(scene.render.antialias, Some(AntialiasSetting::Samples4));
    assert!((scene.bloom.strength - 0.5).abs() < f32::EPSILON);
}

#[test]
fn default_scene_file_is_picked_up() {
    let root = TempDir::new().unwrap();
    let config_home = root.path().join("config");
    let app_dir = config_home.join("pointfade");
    fs::create_dir_all(&app_dir).unwrap();
    fs::write(
        app_dir.join("scene.toml"),
        "version = 1\n[debug]\ncontrols = true\n",
    )
    .unwrap();

    let output = pointfade(&config_home, &["--print-config"]);
    assert!(output.status.success());

    let scene = SceneConfig::from_toml_str(&String::from_utf8(output.stdout).unwrap()).unwrap();
    assert!(scene.debug.controls);
}

#[test]
fn missing_textures_fail_before_opening_a_window() {
    let root = TempDir::new().unwrap();
    let output = pointfade(&root.path().join("config"), &[]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("texture_a"), "stderr: {stderr}");
}

#[test]
fn invalid_override_is_rejected() {
    let root = TempDir::new().unwrap();
    let output = pointfade(&root.path().join("config"), &["--size", "0x720"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("size"), "stderr: {stderr}");
}
