//! Configuration management for the ontology compiler
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (ontogen.toml)
//! - Environment variables (ONTOGEN__*)
//!
//! Command-line flags override whatever is loaded here.
//!
//! ## Example config file (ontogen.toml):
//! ```toml
//! [schemas]
//! dir = "./schemas"
//!
//! [generation]
//! output_dir = "./generated"
//! language = "python"
//! strictness = "strict"
//! ```

use config_crate::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::codegen::{GenerationOptions, Strictness};
use crate::error::Result;

/// Main configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompilerConfig {
    /// Where raw schemas live
    #[serde(default)]
    pub schemas: SchemaSourceConfig,

    /// Generation settings
    #[serde(default)]
    pub generation: GenerationConfig,
}

/// Schema source configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaSourceConfig {
    /// Directory holding one subdirectory per schema
    #[serde(default = "default_schemas_dir")]
    pub dir: PathBuf,
}

/// Generation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Root of the generated tree
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Target language
    #[serde(default = "default_language")]
    pub language: String,

    /// Refuse to generate while references dangle
    #[serde(default)]
    pub strictness: Strictness,
}

// Default value functions
fn default_schemas_dir() -> PathBuf {
    PathBuf::from("schemas")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("generated")
}

fn default_language() -> String {
    "python".to_string()
}

impl Default for SchemaSourceConfig {
    fn default() -> Self {
        Self {
            dir: default_schemas_dir(),
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            language: default_language(),
            strictness: Strictness::default(),
        }
    }
}

impl CompilerConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration, layering an explicit file over the defaults
    pub fn load_from(config_path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        for location in ["ontogen.toml", ".ontogen.toml", "config/ontogen.toml"] {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // XDG config directory
        if let Some(dirs) = directories::ProjectDirs::from("dev", "ontogen", "ontogen") {
            let xdg_config = dirs.config_dir().join("ontogen.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path).required(true));
        }

        // ONTOGEN__GENERATION__LANGUAGE=python
        builder = builder.add_source(
            Environment::with_prefix("ONTOGEN")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// Generation options as seen by the engine
    pub fn generation_options(&self) -> GenerationOptions {
        GenerationOptions {
            language: self.generation.language.clone(),
            output_dir: self.generation.output_dir.clone(),
            strictness: self.generation.strictness,
        }
    }
}
