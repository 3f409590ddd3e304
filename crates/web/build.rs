//! Build script for the web crate.
//!
//! Generates a content hash for the stylesheet, used as a cache-busting
//! query string on its link.

use std::env;
use std::fs;
use std::path::Path;

use sha2::{Digest, Sha256};

fn main() {
    hash_css();
}

/// Hash style.css.
///
/// Sets `CSS_HASH` for use with `env!("CSS_HASH")`.
fn hash_css() {
    let manifest_dir =
        env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR must be set by Cargo");
    let css_path = Path::new(&manifest_dir).join("static/css/style.css");

    println!("cargo:rerun-if-changed={}", css_path.display());

    let content = match fs::read(&css_path) {
        Ok(content) => content,
        Err(e) => {
            println!("cargo:warning=Could not read style.css: {e}");
            println!("cargo:rustc-env=CSS_HASH=");
            return;
        }
    };

    // First 8 hex chars of SHA256
    let mut hasher = Sha256::new();
    hasher.update(&content);
    let hash = format!("{:x}", hasher.finalize());
    let short_hash = &hash[..8];

    println!("cargo:rustc-env=CSS_HASH={short_hash}");
}
