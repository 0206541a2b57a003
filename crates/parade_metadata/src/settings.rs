use std::num::NonZeroUsize;

use camino::Utf8Path;
use globset::GlobSet;

/// Resolved, validated configuration for one run.
#[derive(Debug, Clone)]
pub struct ProjectSettings {
    pub(crate) discovery: DiscoverySettings,
    pub(crate) worker: WorkerSettings,
}

impl ProjectSettings {
    pub const fn discovery(&self) -> &DiscoverySettings {
        &self.discovery
    }

    pub const fn worker(&self) -> &WorkerSettings {
        &self.worker
    }
}

#[derive(Debug, Clone)]
pub struct DiscoverySettings {
    pub exclude: GlobSet,
    pub respect_ignore_files: bool,
}

impl DiscoverySettings {
    pub fn is_excluded(&self, path: impl AsRef<Utf8Path>) -> bool {
        self.exclude.is_match(path.as_ref().as_std_path())
    }
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            exclude: GlobSet::empty(),
            respect_ignore_files: false,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct WorkerSettings {
    /// Program and leading arguments; empty means the test file is executed directly.
    pub launcher: Vec<String>,
    pub max_workers: Option<NonZeroUsize>,
}
