//! Config file discovery and layered merging.
//!
//! Resolution order (later overrides earlier):
//! 1. `~/.config/aem-mcp/config.toml` (or `$AEM_MCP_CONFIG_DIR/config.toml`)
//! 2. `./aem-mcp.toml` (project-local)
//! 3. An explicit file passed on the command line
//! 4. `AEM_*` environment variables

use std::path::{Path, PathBuf};

use crate::{AemConfig, ConfigError, Result};

/// Default config filename for project-local config.
const PROJECT_CONFIG_FILE: &str = "aem-mcp.toml";

/// Default config filename within the user config directory.
const USER_CONFIG_FILE: &str = "config.toml";

/// Application name for XDG directory resolution.
const APP_NAME: &str = "aem-mcp";

/// Environment variable that overrides the user config directory.
const CONFIG_DIR_ENV: &str = "AEM_MCP_CONFIG_DIR";

/// Tracks where each config layer was loaded from.
#[derive(Debug, Clone)]
pub struct ConfigSource {
    /// Path to the config file.
    pub path: PathBuf,
    /// Whether the file was found and loaded.
    pub loaded: bool,
}

/// Result of config discovery and loading.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// The merged configuration.
    pub config: AemConfig,
    /// Sources that were checked, lowest precedence first.
    pub sources: Vec<ConfigSource>,
}

impl LoadedConfig {
    /// Paths of sources that were actually loaded.
    pub fn loaded_from(&self) -> Vec<&Path> {
        self.sources
            .iter()
            .filter(|s| s.loaded)
            .map(|s| s.path.as_path())
            .collect()
    }
}

/// Options controlling discovery.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Overrides the user config directory.
    pub config_dir: Option<PathBuf>,
    /// Directory searched for the project-local file. Defaults to the cwd.
    pub project_dir: Option<PathBuf>,
    /// An explicit file that must exist.
    pub explicit_file: Option<PathBuf>,
    /// Skip `AEM_*` environment overrides.
    pub skip_env: bool,
}

/// Load configuration with default discovery.
pub fn load_config() -> Result<LoadedConfig> {
    load_config_with_options(&LoadOptions::default())
}

/// Load configuration with explicit control over each layer.
pub fn load_config_with_options(options: &LoadOptions) -> Result<LoadedConfig> {
    let mut config = AemConfig::new();
    let mut sources = Vec::new();

    let user_path = match &options.config_dir {
        Some(dir) => Some(dir.join(USER_CONFIG_FILE)),
        None => xdg_config_path(),
    };
    if let Some(path) = user_path {
        sources.push(load_layer(&mut config, &path)?);
    }

    let project_path = options
        .project_dir
        .as_ref()
        .map(|d| d.join(PROJECT_CONFIG_FILE))
        .unwrap_or_else(|| PathBuf::from(PROJECT_CONFIG_FILE));
    sources.push(load_layer(&mut config, &project_path)?);

    if let Some(path) = &options.explicit_file {
        config.merge(load_config_file(path)?);
        sources.push(ConfigSource {
            path: path.clone(),
            loaded: true,
        });
    }

    if !options.skip_env {
        config.apply_env()?;
    }

    Ok(LoadedConfig { config, sources })
}

/// Load config from a specific file path (no discovery).
pub fn load_config_file(path: &Path) -> Result<AemConfig> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.display().to_string(),
        source: e,
    })?;
    AemConfig::from_toml(&contents)
}

/// The user config directory (`$AEM_MCP_CONFIG_DIR` or `~/.config/aem-mcp`).
pub fn xdg_config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV)
        && !dir.is_empty()
    {
        return Some(PathBuf::from(dir));
    }
    dirs::config_dir().map(|d| d.join(APP_NAME))
}

/// The user config file path.
pub fn xdg_config_path() -> Option<PathBuf> {
    xdg_config_dir().map(|d| d.join(USER_CONFIG_FILE))
}

fn load_layer(config: &mut AemConfig, path: &Path) -> Result<ConfigSource> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "config layer not present");
        return Ok(ConfigSource {
            path: path.to_path_buf(),
            loaded: false,
        });
    }

    let layer = load_config_file(path)?;
    config.merge(layer);
    tracing::debug!(path = %path.display(), "loaded config layer");

    Ok(ConfigSource {
        path: path.to_path_buf(),
        loaded: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn options(user: &Path, project: &Path) -> LoadOptions {
        LoadOptions {
            config_dir: Some(user.to_path_buf()),
            project_dir: Some(project.to_path_buf()),
            explicit_file: None,
            skip_env: true,
        }
    }

    #[test]
    fn test_no_files_yields_defaults() {
        let user = tempdir().unwrap();
        let project = tempdir().unwrap();

        let loaded = load_config_with_options(&options(user.path(), project.path())).unwrap();
        assert_eq!(loaded.config, AemConfig::default());
        assert!(loaded.loaded_from().is_empty());
        assert_eq!(loaded.sources.len(), 2);
    }

    #[test]
    fn test_project_overrides_user() {
        let user = tempdir().unwrap();
        let project = tempdir().unwrap();

        std::fs::write(
            user.path().join(USER_CONFIG_FILE),
            "[server]\nbase_url = \"http://user\"\n[auth]\nusername = \"admin\"\n",
        )
        .unwrap();
        std::fs::write(
            project.path().join(PROJECT_CONFIG_FILE),
            "[server]\nbase_url = \"http://project\"\n",
        )
        .unwrap();

        let loaded = load_config_with_options(&options(user.path(), project.path())).unwrap();
        assert_eq!(
            loaded.config.server.base_url.as_deref(),
            Some("http://project")
        );
        assert_eq!(loaded.config.auth.username.as_deref(), Some("admin"));
        assert_eq!(loaded.loaded_from().len(), 2);
    }

    #[test]
    fn test_explicit_file_wins_and_must_exist() {
        let user = tempdir().unwrap();
        let project = tempdir().unwrap();
        let explicit = project.path().join("custom.toml");
        std::fs::write(&explicit, "[server]\ntimeout_secs = 3\n").unwrap();

        let mut opts = options(user.path(), project.path());
        opts.explicit_file = Some(explicit);
        let loaded = load_config_with_options(&opts).unwrap();
        assert_eq!(loaded.config.server.timeout_secs, Some(3));

        opts.explicit_file = Some(project.path().join("missing.toml"));
        let err = load_config_with_options(&opts).unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let user = tempdir().unwrap();
        let project = tempdir().unwrap();
        std::fs::write(project.path().join(PROJECT_CONFIG_FILE), "[server\n").unwrap();

        let result = load_config_with_options(&options(user.path(), project.path()));
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}
