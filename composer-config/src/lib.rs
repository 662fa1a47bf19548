//! Shared configuration loader for the composer toolchain.
//!
//! `defaults/composer.default.toml` is embedded into every binary so that docs
//! and runtime behavior stay in sync. Applications layer user-specific files on
//! top of those defaults via [`Loader`] before deserializing into
//! [`ComposerConfig`].

use composer_babel::i18n::{interpolate, Translate};
use composer_babel::{EditorOptions, TokenizerOptions};
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat, ValueKind};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

const DEFAULT_TOML: &str = include_str!("../defaults/composer.default.toml");

/// Name of the optional per-project configuration file.
pub const PROJECT_FILE: &str = "composer.toml";

/// Top-level configuration consumed by composer applications.
#[derive(Debug, Clone, Deserialize)]
pub struct ComposerConfig {
    pub markdown: MarkdownConfig,
    pub editor: EditorConfig,
    pub translations: Translations,
}

impl ComposerConfig {
    /// Editor settings with the configured markdown dialect.
    pub fn editor_options(&self) -> EditorOptions {
        EditorOptions {
            history_depth: self.editor.history_depth,
            input_rule_lookbehind: self.editor.input_rule_lookbehind,
            tokenizer: (&self.markdown).into(),
        }
    }
}

/// Inline constructs recognized when importing markdown.
#[derive(Debug, Clone, Deserialize)]
pub struct MarkdownConfig {
    pub hashtags: bool,
    pub mentions: bool,
    pub emoji: bool,
    pub quotes: bool,
}

impl From<&MarkdownConfig> for TokenizerOptions {
    fn from(config: &MarkdownConfig) -> Self {
        TokenizerOptions {
            hashtags: config.hashtags,
            mentions: config.mentions,
            emoji: config.emoji,
            quotes: config.quotes,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EditorConfig {
    pub history_depth: usize,
    pub input_rule_lookbehind: usize,
}

/// Label templates keyed by translation key. Templates use `{name}`
/// parameters; unknown keys translate to themselves.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Translations(BTreeMap<String, String>);

impl Translations {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }
}

impl Translate for Translations {
    fn translate(&self, key: &str, params: &[(&str, &str)]) -> String {
        interpolate(self.get(key).unwrap_or(key), params)
    }
}

/// Helper for layering user overrides over the built-in defaults.
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

    /// Layer a configuration file. Missing files trigger an error.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(true);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Layer an optional configuration file (ignored if the file is absent).
    pub fn with_optional_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(false);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Layer `composer.toml` from `dir` when present.
    pub fn with_project_file(self, dir: impl AsRef<Path>) -> Self {
        self.with_optional_file(dir.as_ref().join(PROJECT_FILE))
    }

    /// Apply a single key/value override (useful for CLI settings).
    pub fn set_override<I>(mut self, key: &str, value: I) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    /// Finalize the builder and deserialize the resulting configuration.
    pub fn build(self) -> Result<ComposerConfig, ConfigError> {
        self.builder.build()?.try_deserialize()
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience helper for callers that only need the defaults.
pub fn load_defaults() -> Result<ComposerConfig, ConfigError> {
    Loader::new().build()
}
