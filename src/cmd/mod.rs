pub mod rate;
pub mod report;

use std::path::PathBuf;

/// Rate cache used when `--cache` is not given.
pub const DEFAULT_CACHE: &str = ".cache";

fn default_cache() -> PathBuf {
    PathBuf::from(DEFAULT_CACHE)
}
