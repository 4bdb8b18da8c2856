//! Regenerate the C header for `planar-locate-ffi`.
//!
//! Usage: `generate-ffi-header [OUT]`, default `include/planar_locate.h`
//! inside the crate directory.

use std::path::PathBuf;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let crate_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let out = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| crate_dir.join("include").join("planar_locate.h"));
    if let Some(parent) = out.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let config = cbindgen::Config::from_file(crate_dir.join("cbindgen.toml"))
        .map_err(|e| format!("cbindgen.toml: {e}"))?;
    cbindgen::Builder::new()
        .with_crate(&crate_dir)
        .with_config(config)
        .generate()?
        .write_to_file(&out);
    println!("wrote {}", out.display());
    Ok(())
}
