//! Configuration for the AEM MCP server.
//!
//! Provides TOML-based configuration with:
//! - Config file layering (user config + project-local + explicit file)
//! - `AEM_*` environment overrides applied last
//! - Lazy credential checks: nothing here fails because a credential is
//!   missing, the auth layer reports that when the credential is first used

pub mod discovery;
pub mod error;
pub mod types;

pub use discovery::{
    ConfigSource, LoadOptions, LoadedConfig, load_config, load_config_file,
    load_config_with_options, xdg_config_dir, xdg_config_path,
};
pub use error::{ConfigError, Result};
pub use types::{
    AemConfig, AuthConfig, AuthMode, DEFAULT_TIMEOUT_SECS, DEFAULT_TOKEN_ENDPOINT, ServerConfig,
    env,
};
