//! Configuration file loader with multi-source merging

use super::file_config::FileConfig;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::path::{Path, PathBuf};

const APP_DIR: &str = "ratchet";
const PROJECT_FILES: [&str; 2] = ["ratchet.toml", ".ratchet.toml"];
const ENV_PREFIX: &str = "RATCHET_";

/// Where a configuration layer comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Environment,
    Explicit,
    Project,
    Global,
    Default,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Environment => "Env",
            SourceKind::Explicit => "Explicit",
            SourceKind::Project => "Project",
            SourceKind::Global => "Global",
            SourceKind::Default => "Default",
        }
    }
}

/// One configuration layer, for `ratchet config --sources`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSource {
    pub kind: SourceKind,
    pub location: String,
    pub found: bool,
}

/// Configuration loader that handles file discovery and merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from all sources with proper priority
    ///
    /// Priority (highest to lowest):
    /// 1. `RATCHET_*` environment variables (`RATCHET_AGENT__MAX_ITERATIONS=10`)
    /// 2. Explicit config path (if provided)
    /// 3. Project root: `./ratchet.toml` or `./.ratchet.toml`
    /// 4. Global: `$XDG_CONFIG_HOME/ratchet/config.toml`
    /// 5. Default values
    pub fn load(config_path: Option<&PathBuf>) -> Result<FileConfig, Box<figment::Error>> {
        Self::load_from(Path::new("."), config_path)
    }

    /// Same as [`load`](Self::load) with project files looked up in `root`.
    pub fn load_from(
        root: &Path,
        config_path: Option<&PathBuf>,
    ) -> Result<FileConfig, Box<figment::Error>> {
        let mut figment = Figment::new().merge(Serialized::defaults(FileConfig::default()));

        if let Some(global_path) = Self::global_config_path()
            && global_path.exists()
        {
            figment = figment.merge(Toml::file(&global_path));
        }

        if let Some(path) = Self::project_config_path(root) {
            figment = figment.merge(Toml::file(&path));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        figment.extract().map_err(Box::new)
    }

    /// Load only default configuration
    pub fn load_defaults() -> FileConfig {
        FileConfig::default()
    }

    /// Returns `$XDG_CONFIG_HOME/ratchet/config.toml` if set, otherwise the
    /// platform config directory.
    pub fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR).join("config.toml"))
    }

    /// The first project-level config file found in `root`.
    pub fn project_config_path(root: &Path) -> Option<PathBuf> {
        PROJECT_FILES
            .iter()
            .map(|name| root.join(name))
            .find(|path| path.exists())
    }

    /// Configuration layers in priority order, highest first.
    pub fn sources(root: &Path, config_path: Option<&PathBuf>) -> Vec<ConfigSource> {
        let mut sources = Vec::new();

        let env_set = std::env::vars().any(|(key, _)| key.starts_with(ENV_PREFIX));
        sources.push(ConfigSource {
            kind: SourceKind::Environment,
            location: format!("{}*", ENV_PREFIX),
            found: env_set,
        });

        if let Some(path) = config_path {
            sources.push(ConfigSource {
                kind: SourceKind::Explicit,
                location: path.display().to_string(),
                found: path.exists(),
            });
        }

        sources.push(match Self::project_config_path(root) {
            Some(path) => ConfigSource {
                kind: SourceKind::Project,
                location: path.display().to_string(),
                found: true,
            },
            None => ConfigSource {
                kind: SourceKind::Project,
                location: PROJECT_FILES.join(" or "),
                found: false,
            },
        });

        if let Some(path) = Self::global_config_path() {
            sources.push(ConfigSource {
                kind: SourceKind::Global,
                location: path.display().to_string(),
                found: path.exists(),
            });
        }

        sources.push(ConfigSource {
            kind: SourceKind::Default,
            location: "built-in defaults".to_string(),
            found: true,
        });
        sources
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_load_defaults() {
        let config = ConfigLoader::load_defaults();
        assert_eq!(config.agent.max_iterations, 50);
        assert!(config.output.color);
    }

    #[test]
    fn test_global_config_path_returns_some() {
        let path = ConfigLoader::global_config_path();
        assert!(path.is_some());
        assert!(path.unwrap().to_string_lossy().contains(APP_DIR));
    }

    #[test]
    fn test_project_file_then_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(".ratchet.toml"),
            "[agent]\nmax_iterations = 7\nmodel = \"project-model\"\n",
        )
        .unwrap();
        let explicit = dir.path().join("override.toml");
        fs::write(&explicit, "[agent]\nmax_iterations = 9\n").unwrap();

        let config = ConfigLoader::load_from(dir.path(), None).unwrap();
        assert_eq!(config.agent.max_iterations, 7);

        let config = ConfigLoader::load_from(dir.path(), Some(&explicit)).unwrap();
        assert_eq!(config.agent.max_iterations, 9);
        // untouched keys survive from the lower layer
        assert_eq!(config.agent.model, "project-model");
    }

    #[test]
    fn test_type_mismatch_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("ratchet.toml"), "[agent]\nmax_iterations = \"many\"\n").unwrap();
        assert!(ConfigLoader::load_from(dir.path(), None).is_err());
    }

    #[test]
    fn test_sources_list_project_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("ratchet.toml"), "").unwrap();
        let sources = ConfigLoader::sources(dir.path(), None);
        let project = sources
            .iter()
            .find(|s| s.kind == SourceKind::Project)
            .unwrap();
        assert!(project.found);
        assert_eq!(sources.last().unwrap().kind, SourceKind::Default);
    }
}
