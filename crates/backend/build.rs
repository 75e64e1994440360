use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Копирует config.toml из корня workspace рядом с собранным бинарником,
/// где его ищет `shared::config::load_config`.
fn main() {
    println!("cargo:rerun-if-changed=../../config.toml");

    let Some(target_dir) = profile_dir() else {
        println!("cargo:warning=target profile directory not found, config.toml is not copied");
        return;
    };

    let source_config = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../config.toml");
    if !source_config.exists() {
        println!("cargo:warning=config.toml not found, embedded defaults will be used");
        return;
    }

    let dest_config = target_dir.join("config.toml");
    if let Err(e) = fs::copy(&source_config, &dest_config) {
        panic!("Failed to copy config.toml to {}: {}", dest_config.display(), e);
    }
}

/// OUT_DIR выглядит как target/<profile>/build/backend-xxx/out
fn profile_dir() -> Option<PathBuf> {
    let out_dir = PathBuf::from(env::var("OUT_DIR").ok()?);
    let profile = env::var("PROFILE").ok()?;
    out_dir
        .ancestors()
        .find(|p| p.ends_with(&profile))
        .map(Path::to_path_buf)
}
