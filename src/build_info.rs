//! Build-time information captured by `build.rs`

/// Build timestamp (when the binary was compiled)
pub const BUILD_TIMESTAMP: &str = env!("VERGEN_BUILD_TIMESTAMP");

/// Cargo optimization level (0, 1, 2, 3, s, z)
pub const CARGO_OPT_LEVEL: &str = env!("VERGEN_CARGO_OPT_LEVEL");

/// Target triple (e.g., x86_64-unknown-linux-gnu)
pub const CARGO_TARGET_TRIPLE: &str = env!("VERGEN_CARGO_TARGET_TRIPLE");

/// Rust compiler version (e.g., 1.75.0)
pub const RUSTC_SEMVER: &str = env!("VERGEN_RUSTC_SEMVER");

/// Rust channel (stable, beta, or nightly)
pub const RUSTC_CHANNEL: &str = env!("VERGEN_RUSTC_CHANNEL");

/// Crate version with target and optimization level
///
/// Example: `0.1.0 (x86_64-unknown-linux-gnu-opt3)`
pub fn version_string() -> String {
    format!(
        "{} ({}-opt{})",
        env!("CARGO_PKG_VERSION"),
        CARGO_TARGET_TRIPLE,
        CARGO_OPT_LEVEL
    )
}

/// Multi-line build report for `--version-info`
pub fn detailed_info() -> String {
    format!(
        "Version: {}\nBuilt: {}\nTarget: {}\nOptimization: {}\nRustc: {} ({})",
        env!("CARGO_PKG_VERSION"),
        BUILD_TIMESTAMP,
        CARGO_TARGET_TRIPLE,
        CARGO_OPT_LEVEL,
        RUSTC_SEMVER,
        RUSTC_CHANNEL
    )
}
