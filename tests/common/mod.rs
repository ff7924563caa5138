//! Shared helpers for mirrorsync integration tests
//!
//! Upstream repositories are real git repositories built with the `git` CLI in
//! temporary directories; the fake cache covers refresh decisions and injected
//! fetch failures without touching git at all.

pub mod fake_cache;
pub mod repository;
