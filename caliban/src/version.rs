//! Build-time version string: package version plus a short git commit hash,
//! with a `.dirty` suffix when the working tree had uncommitted changes at build time. Computed
//! once in `build.rs` so it never drifts from what was actually compiled.

include!(concat!(env!("OUT_DIR"), "/version.rs"));
