mod options;
mod settings;

pub use options::{DEFAULT_EXCLUDE, DiscoveryOptions, Options, WorkerOptions};
pub use settings::{DiscoverySettings, ProjectSettings, WorkerSettings};

use camino::{Utf8Path, Utf8PathBuf};

pub const CONFIG_FILE_NAME: &str = "parade.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read `{path}`")]
    Read {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse `{path}`")]
    Parse {
        path: Utf8PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid exclude pattern `{pattern}`")]
    InvalidExclude {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("`worker.launcher` must name a program")]
    EmptyLauncher,
}

/// The configuration in effect for a run and where it came from.
#[derive(Debug, Clone)]
pub struct ProjectMetadata {
    root: Utf8PathBuf,
    config_file: Option<Utf8PathBuf>,
    options: Options,
}

impl ProjectMetadata {
    /// Load the configuration file named by `overrides`, or discover one from `cwd`.
    ///
    /// A relative override is resolved against `cwd`.
    pub fn load(cwd: &Utf8Path, overrides: &ProjectOptionsOverrides) -> Result<Self, ConfigError> {
        match &overrides.config_file_override {
            Some(path) => Self::from_config_file(cwd.join(path), cwd),
            None => Self::discover(cwd),
        }
    }

    /// Look for `parade.toml` in `cwd` and its ancestors.
    ///
    /// Without a configuration file the defaults apply and `cwd` is the root.
    pub fn discover(cwd: &Utf8Path) -> Result<Self, ConfigError> {
        for ancestor in cwd.ancestors() {
            let candidate = ancestor.join(CONFIG_FILE_NAME);
            if candidate.is_file() {
                tracing::debug!(path = %candidate, "Found configuration file");
                return Self::from_config_file(candidate, cwd);
            }
        }

        tracing::debug!("No `{CONFIG_FILE_NAME}` found, using defaults");
        Ok(Self {
            root: cwd.to_path_buf(),
            config_file: None,
            options: Options::default(),
        })
    }

    pub fn from_config_file(path: Utf8PathBuf, cwd: &Utf8Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let options = Options::from_toml_str(&source).map_err(|source| ConfigError::Parse {
            path: path.clone(),
            source,
        })?;

        let root = path.parent().map_or_else(|| cwd.to_path_buf(), Utf8Path::to_path_buf);

        Ok(Self {
            root,
            config_file: Some(path),
            options,
        })
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn config_file(&self) -> Option<&Utf8Path> {
        self.config_file.as_deref()
    }

    pub const fn options(&self) -> &Options {
        &self.options
    }

    pub fn apply_overrides(&mut self, overrides: &ProjectOptionsOverrides) {
        self.options = overrides
            .options
            .clone()
            .combine(std::mem::take(&mut self.options));
    }

    pub fn to_settings(&self) -> Result<ProjectSettings, ConfigError> {
        self.options.to_settings()
    }
}

/// Options given on the command line, which take precedence over the configuration file.
#[derive(Debug, Default, Clone)]
pub struct ProjectOptionsOverrides {
    pub config_file_override: Option<Utf8PathBuf>,
    pub options: Options,
}

impl ProjectOptionsOverrides {
    pub const fn new(config_file_override: Option<Utf8PathBuf>, options: Options) -> Self {
        Self {
            config_file_override,
            options,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;

    use pretty_assertions::assert_eq;

    use super::*;

    fn temp_root() -> (tempfile::TempDir, Utf8PathBuf) {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf8");
        (dir, path)
    }

    #[test]
    fn discover_without_config_uses_defaults() {
        let (_dir, root) = temp_root();
        let metadata = ProjectMetadata::discover(&root).unwrap();
        assert_eq!(metadata.root(), root);
        assert_eq!(metadata.config_file(), None);
        assert_eq!(metadata.options(), &Options::default());
    }

    #[test]
    fn discover_finds_config_in_ancestor() {
        let (_dir, root) = temp_root();
        std::fs::write(root.join(CONFIG_FILE_NAME), "[worker]\nlauncher = [\"sh\"]\n").unwrap();
        let nested = root.join("tests").join("unit");
        std::fs::create_dir_all(&nested).unwrap();

        let metadata = ProjectMetadata::discover(&nested).unwrap();
        assert_eq!(metadata.root(), root);
        assert_eq!(metadata.config_file(), Some(root.join(CONFIG_FILE_NAME).as_path()));
        assert_eq!(
            metadata.to_settings().unwrap().worker().launcher,
            vec!["sh".to_string()]
        );
    }

    #[test]
    fn invalid_config_file_names_the_path() {
        let (_dir, root) = temp_root();
        let path = root.join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[worker\n").unwrap();

        let error = ProjectMetadata::discover(&root).unwrap_err();
        assert!(matches!(&error, ConfigError::Parse { path: p, .. } if *p == path));
    }

    #[test]
    fn load_prefers_the_config_file_override() {
        let (_dir, root) = temp_root();
        std::fs::write(root.join(CONFIG_FILE_NAME), "[worker]\nlauncher = [\"sh\"]\n").unwrap();
        let custom = root.join("ci").join("parade.toml");
        std::fs::create_dir_all(custom.parent().unwrap()).unwrap();
        std::fs::write(&custom, "[worker]\nlauncher = [\"bash\", \"-e\"]\n").unwrap();

        let overrides =
            ProjectOptionsOverrides::new(Some(Utf8PathBuf::from("ci/parade.toml")), Options::default());
        let metadata = ProjectMetadata::load(&root, &overrides).unwrap();

        assert_eq!(metadata.config_file(), Some(custom.as_path()));
        assert_eq!(metadata.root(), root.join("ci"));
        assert_eq!(
            metadata.to_settings().unwrap().worker().launcher,
            vec!["bash".to_string(), "-e".to_string()]
        );
    }

    #[test]
    fn load_without_override_discovers() {
        let (_dir, root) = temp_root();
        let metadata = ProjectMetadata::load(&root, &ProjectOptionsOverrides::default()).unwrap();
        assert_eq!(metadata.config_file(), None);
        assert_eq!(metadata.options(), &Options::default());
    }

    #[test]
    fn missing_override_is_a_read_error() {
        let (_dir, root) = temp_root();
        let overrides =
            ProjectOptionsOverrides::new(Some(Utf8PathBuf::from("missing.toml")), Options::default());
        let error = ProjectMetadata::load(&root, &overrides).unwrap_err();
        assert!(matches!(&error, ConfigError::Read { path, .. } if *path == root.join("missing.toml")));
    }

    #[test]
    fn overrides_win_over_file() {
        let (_dir, root) = temp_root();
        std::fs::write(root.join(CONFIG_FILE_NAME), "[worker]\nmax-workers = 8\n").unwrap();

        let mut metadata = ProjectMetadata::discover(&root).unwrap();
        metadata.apply_overrides(&ProjectOptionsOverrides::new(
            None,
            Options {
                worker: Some(WorkerOptions {
                    max_workers: NonZeroUsize::new(1),
                    ..WorkerOptions::default()
                }),
                ..Options::default()
            },
        ));

        assert_eq!(
            metadata.to_settings().unwrap().worker().max_workers,
            NonZeroUsize::new(1)
        );
    }
}
