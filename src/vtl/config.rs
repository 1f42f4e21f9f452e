//! Render configuration
//!
//! `defaults/vtl.default.toml` is embedded into the crate and is the only place default
//! values are written down: [RenderOptions::default] is deserialised from it. Embedders layer
//! their own files and overrides on top with [Loader] before building the options.

use crate::vtl::gobbling::SpaceGobbling;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat, ValueKind};
use serde::Deserialize;
use std::path::Path;

const DEFAULT_TOML: &str = include_str!("../../defaults/vtl.default.toml");

/// Knobs for one render.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RenderOptions {
    /// Whitespace policy around directive-only lines; unknown names mean `lines`
    pub space_gobbling: SpaceGobbling,
    /// Iterations after which a `#foreach` is silently cut short
    pub max_loop_iterations: usize,
    /// Nesting bound for macro invocations
    pub max_macro_depth: usize,
    /// Nesting bound for `#parse` and `#evaluate`
    pub max_parse_depth: usize,
    /// Syntactic nesting bound (blocks, brackets, ternaries); deeper sources are syntax errors
    pub max_nesting_depth: usize,
    /// Declared template encoding. Sources are always Rust strings; this is informational.
    pub encoding: String,
    /// Let later `#macro` definitions replace earlier ones
    pub allow_macro_replace: bool,
    /// Render loader failures as nothing instead of failing the render
    pub tolerant_loader: bool,
}

impl RenderOptions {
    pub fn with_space_gobbling(mut self, mode: SpaceGobbling) -> Self {
        self.space_gobbling = mode;
        self
    }

    pub fn with_max_loop_iterations(mut self, limit: usize) -> Self {
        self.max_loop_iterations = limit;
        self
    }

    pub fn with_max_nesting_depth(mut self, limit: usize) -> Self {
        self.max_nesting_depth = limit;
        self
    }

    pub fn with_tolerant_loader(mut self, tolerant: bool) -> Self {
        self.tolerant_loader = tolerant;
        self
    }
}

impl Default for RenderOptions {
    fn default() -> Self {
        load_defaults().unwrap_or_else(|error| {
            log::error!("embedded defaults failed to load: {}", error);
            RenderOptions {
                space_gobbling: SpaceGobbling::Lines,
                max_loop_iterations: 1000,
                max_macro_depth: 20,
                max_parse_depth: 10,
                max_nesting_depth: 64,
                encoding: "UTF-8".to_string(),
                allow_macro_replace: false,
                tolerant_loader: false,
            }
        })
    }
}

/// Layers configuration files and overrides over the embedded defaults.
#[derive(Debug, Clone)]
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
}

impl Loader {
    /// Start a loader seeded with the embedded defaults.
    pub fn new() -> Self {
        let builder = Config::builder().add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml));
        Self { builder }
    }

    /// Layer a TOML file. Missing files are an error at build time.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(true);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Layer a TOML file if it exists.
    pub fn with_optional_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(false);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Layer TOML text, e.g. a section of the embedder's own configuration.
    pub fn with_toml(mut self, text: &str) -> Self {
        self.builder = self.builder.add_source(File::from_str(text, FileFormat::Toml));
        self
    }

    pub fn set_override<I>(mut self, key: &str, value: I) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    pub fn build(self) -> Result<RenderOptions, ConfigError> {
        self.builder.build()?.try_deserialize()
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

pub fn load_defaults() -> Result<RenderOptions, ConfigError> {
    Loader::new().build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_loads_default_options() {
        let options = load_defaults().expect("defaults to deserialize");
        assert_eq!(options.space_gobbling, SpaceGobbling::Lines);
        assert_eq!(options.max_loop_iterations, 1000);
        assert_eq!(options.max_macro_depth, 20);
        assert_eq!(options.max_parse_depth, 10);
        assert_eq!(options.max_nesting_depth, 64);
        assert_eq!(options.encoding, "UTF-8");
        assert!(!options.allow_macro_replace);
        assert!(!options.tolerant_loader);
        assert_eq!(RenderOptions::default(), options);
    }

    #[test]
    fn test_overrides() {
        let options = Loader::new()
            .set_override("space_gobbling", "structured")
            .expect("override to apply")
            .set_override("max_loop_iterations", 5)
            .expect("override to apply")
            .build()
            .expect("options to build");
        assert_eq!(options.space_gobbling, SpaceGobbling::Structured);
        assert_eq!(options.max_loop_iterations, 5);
    }

    #[test]
    fn test_unknown_gobbling_mode_falls_back_to_lines() {
        let options = Loader::new()
            .with_toml("space_gobbling = \"sideways\"")
            .build()
            .expect("options to build");
        assert_eq!(options.space_gobbling, SpaceGobbling::Lines);
    }

    #[test]
    fn test_layered_files() {
        let dir = std::env::temp_dir().join(format!("vtl-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("temp dir");
        let path = dir.join("vtl.toml");
        let mut file = std::fs::File::create(&path).expect("temp file");
        writeln!(file, "max_macro_depth = 3\ntolerant_loader = true").expect("write");

        let options = Loader::new()
            .with_file(&path)
            .with_optional_file(dir.join("absent.toml"))
            .build()
            .expect("options to build");
        assert_eq!(options.max_macro_depth, 3);
        assert!(options.tolerant_loader);

        let missing = Loader::new().with_file(dir.join("absent.toml")).build();
        assert!(missing.is_err());
        std::fs::remove_dir_all(&dir).ok();
    }
}
