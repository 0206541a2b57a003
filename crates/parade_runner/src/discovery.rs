use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use crossbeam_channel::Sender;
use globset::{GlobBuilder, GlobMatcher};
use ignore::WalkBuilder;
use parade_metadata::DiscoverySettings;

use crate::orchestration::Inbound;

#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("invalid pattern `{pattern}`")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("failed to walk `{root}`")]
    Walk {
        root: Utf8PathBuf,
        #[source]
        source: ignore::Error,
    },
}

/// Produces test files for the coordinator, then signals completion or failure.
pub(crate) trait DiscoverySource: Send + 'static {
    fn discover(self, events: &Sender<Inbound>);
}

/// Streams files matching a glob pattern as the directory walk finds them.
///
/// `*` and `?` never cross a path separator; `**` matches any number of
/// directories. The walk starts at the longest literal prefix of the pattern.
#[derive(Debug)]
pub struct GlobDiscovery {
    matcher: GlobMatcher,
    root: Utf8PathBuf,
    /// Set when the pattern has no literal prefix and the walk starts at `.`.
    implicit_root: bool,
    max_depth: Option<usize>,
    settings: DiscoverySettings,
}

impl GlobDiscovery {
    pub fn new(pattern: &str, settings: DiscoverySettings) -> Result<Self, DiscoveryError> {
        let matcher = GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()
            .map_err(|source| DiscoveryError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })?
            .compile_matcher();

        let mut root = Utf8PathBuf::new();
        let mut remaining = Vec::new();
        for component in Utf8Path::new(pattern).components() {
            if remaining.is_empty() && !is_glob(component) {
                root.push(component);
            } else {
                remaining.push(component.as_str());
            }
        }

        let max_depth = (!remaining.contains(&"**")).then_some(remaining.len());
        let implicit_root = root.as_str().is_empty();
        if implicit_root {
            root = Utf8PathBuf::from(".");
        }

        Ok(Self {
            matcher,
            root,
            implicit_root,
            max_depth,
            settings,
        })
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    fn walk(&self, events: &Sender<Inbound>) -> Result<(), DiscoveryError> {
        if !self.root.exists() {
            tracing::debug!(root = %self.root, "Pattern root does not exist");
            return Ok(());
        }

        let walker = WalkBuilder::new(&self.root)
            .standard_filters(self.settings.respect_ignore_files)
            .hidden(false)
            .require_git(false)
            .max_depth(self.max_depth)
            .sort_by_file_name(|a, b| a.cmp(b))
            .build();

        for entry in walker {
            let entry = entry.map_err(|source| DiscoveryError::Walk {
                root: self.root.clone(),
                source,
            })?;

            if !entry.file_type().is_some_and(|file_type| file_type.is_file()) {
                continue;
            }

            let Some(path) = Utf8Path::from_path(entry.path()) else {
                tracing::warn!(path = %entry.path().display(), "Skipping non-UTF-8 path");
                continue;
            };

            let path = if self.implicit_root {
                path.strip_prefix(".").unwrap_or(path)
            } else {
                path
            };

            if self.settings.is_excluded(path) || !self.matcher.is_match(path) {
                continue;
            }

            tracing::debug!(file = %path, "Matched test file");
            if events.send(Inbound::Discovered(path.to_path_buf())).is_err() {
                // The coordinator stopped listening.
                return Ok(());
            }
        }

        Ok(())
    }
}

impl DiscoverySource for GlobDiscovery {
    fn discover(self, events: &Sender<Inbound>) {
        let inbound = match self.walk(events) {
            Ok(()) => Inbound::DiscoveryComplete,
            Err(error) => Inbound::DiscoveryFailed(error),
        };
        events.send(inbound).ok();
    }
}

fn is_glob(component: Utf8Component<'_>) -> bool {
    matches!(component, Utf8Component::Normal(_))
        && component.as_str().contains(['*', '?', '[', '{'])
}
