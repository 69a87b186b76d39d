// Configuration management module
// TOML settings rooted at the base directory plus environment overrides

pub mod display;
pub mod settings;

pub use display::show_config;
pub use settings::{Config, ConfigError, OpenAiConfig, RetrievalConfig};
