//! duck-chat configuration.
//!
//! A single optional TOML file selects the default model and a few
//! front-end and transport knobs. Every field has a default, so a missing
//! or partial file works out of the box.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! let config = duck_config::load_config().expect("failed to load config");
//! println!("streaming by default: {}", config.stream);
//! ```

pub mod schema;
pub mod toml_loader;
pub mod validation;

pub use schema::{DuckConfig, HttpConfig};
pub use toml_loader::{create_default_config, default_config_path, load_default, load_from_path};

use duck_common::ConfigError;

/// Load config from the platform default path, falling back to defaults
/// when no file exists.
pub fn load_config() -> Result<DuckConfig, ConfigError> {
    load_default()
}
