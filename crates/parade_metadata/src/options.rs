use std::num::NonZeroUsize;

use globset::{Glob, GlobSetBuilder};
use serde::Deserialize;

use crate::ConfigError;
use crate::settings::{DiscoverySettings, ProjectSettings, WorkerSettings};

/// Directories skipped while matching unless the configuration says otherwise.
pub const DEFAULT_EXCLUDE: [&str; 2] = ["**/node_modules/**", "**/.git/**"];

/// The contents of a `parade.toml` file, or the equivalent command-line overrides.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Options {
    pub discovery: Option<DiscoveryOptions>,
    pub worker: Option<WorkerOptions>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct DiscoveryOptions {
    /// Glob patterns for paths that are never treated as test files.
    pub exclude: Option<Vec<String>>,

    /// Whether `.gitignore` and `.ignore` files are respected while matching.
    pub respect_ignore_files: Option<bool>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct WorkerOptions {
    /// Program and arguments placed before each test file on the worker command line.
    pub launcher: Option<Vec<String>>,

    /// Upper bound on concurrently running workers. Unbounded when unset.
    pub max_workers: Option<NonZeroUsize>,
}

impl Options {
    pub fn from_toml_str(source: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(source)
    }

    /// Merge two option sets; values in `self` win over values in `other`.
    #[must_use]
    pub fn combine(self, other: Self) -> Self {
        Self {
            discovery: combine_with(self.discovery, other.discovery, DiscoveryOptions::combine),
            worker: combine_with(self.worker, other.worker, WorkerOptions::combine),
        }
    }

    pub fn to_settings(&self) -> Result<ProjectSettings, ConfigError> {
        let discovery = self.discovery.clone().unwrap_or_default();
        let worker = self.worker.clone().unwrap_or_default();

        let exclude_patterns = discovery.exclude.unwrap_or_else(|| {
            DEFAULT_EXCLUDE
                .iter()
                .map(ToString::to_string)
                .collect()
        });

        let mut exclude = GlobSetBuilder::new();
        for pattern in &exclude_patterns {
            let glob = Glob::new(pattern).map_err(|source| ConfigError::InvalidExclude {
                pattern: pattern.clone(),
                source,
            })?;
            exclude.add(glob);
        }
        let exclude = exclude.build().map_err(|source| ConfigError::InvalidExclude {
            pattern: exclude_patterns.join(", "),
            source,
        })?;

        let launcher = worker.launcher.unwrap_or_default();
        if launcher.first().is_some_and(|program| program.trim().is_empty()) {
            return Err(ConfigError::EmptyLauncher);
        }

        Ok(ProjectSettings {
            discovery: DiscoverySettings {
                exclude,
                respect_ignore_files: discovery.respect_ignore_files.unwrap_or(false),
            },
            worker: WorkerSettings {
                launcher,
                max_workers: worker.max_workers,
            },
        })
    }
}

impl DiscoveryOptions {
    fn combine(self, other: Self) -> Self {
        Self {
            exclude: self.exclude.or(other.exclude),
            respect_ignore_files: self.respect_ignore_files.or(other.respect_ignore_files),
        }
    }
}

impl WorkerOptions {
    fn combine(self, other: Self) -> Self {
        Self {
            launcher: self.launcher.or(other.launcher),
            max_workers: self.max_workers.or(other.max_workers),
        }
    }
}

fn combine_with<T>(ours: Option<T>, theirs: Option<T>, f: impl FnOnce(T, T) -> T) -> Option<T> {
    match (ours, theirs) {
        (Some(ours), Some(theirs)) => Some(f(ours, theirs)),
        (ours, theirs) => ours.or(theirs),
    }
}
