//! Build script for quire
//!
//! The built-in themes are embedded with `include_str!`, so the crate has to
//! be rebuilt whenever a theme file changes.

fn main() {
    println!("cargo:rerun-if-changed=src/themes/");
    println!("cargo:rerun-if-changed=build.rs");
}
