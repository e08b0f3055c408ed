// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for trx-merge.
//!
//! The config is made up of the embedded [`TrxMergeConfig::DEFAULT_CONFIG`], overlaid with an
//! optional TOML file.

use crate::{errors::ConfigParseError, merge::DedupPolicy};
use camino::{Utf8Path, Utf8PathBuf};
use config::{builder::DefaultState, Config, ConfigBuilder, File, FileFormat};
use serde::Deserialize;

/// Overall configuration for trx-merge.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct TrxMergeConfig {
    /// Merge settings.
    pub merge: MergeConfig,

    /// Input discovery settings.
    pub discovery: DiscoveryConfig,
}

/// The `[merge]` section.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct MergeConfig {
    /// The policy used to pick between results for the same test.
    pub dedup: DedupPolicy,
}

/// The `[discovery]` section.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct DiscoveryConfig {
    /// The extension of files picked up from input directories, without the leading dot.
    pub extension: String,

    /// Whether input directories are searched recursively.
    pub recursive: bool,
}

impl TrxMergeConfig {
    /// The default location of the config file, relative to the current directory.
    pub const CONFIG_PATH: &'static str = ".config/trx-merge.toml";

    /// The default config, embedded in the binary.
    pub const DEFAULT_CONFIG: &'static str = include_str!("../default-config.toml");

    /// Reads the config.
    ///
    /// If `file` is `None`, [`Self::CONFIG_PATH`] under `base_dir` is read if it exists. A file
    /// passed in explicitly must exist.
    pub fn from_sources(
        base_dir: &Utf8Path,
        file: Option<&Utf8Path>,
    ) -> Result<Self, ConfigParseError> {
        let (config_file, source) = match file {
            Some(file) => (file.to_owned(), File::new(file.as_str(), FileFormat::Toml)),
            None => {
                let config_file = base_dir.join(Self::CONFIG_PATH);
                let source = File::new(config_file.as_str(), FileFormat::Toml).required(false);
                (config_file, source)
            }
        };

        Self::build(Self::make_default_config().add_source(source), config_file)
    }

    /// Parses config from a TOML string, layered over the default config.
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigParseError> {
        Self::build(
            Self::make_default_config().add_source(File::from_str(toml, FileFormat::Toml)),
            "<inline>",
        )
    }

    /// Returns the default config.
    pub fn default_config() -> Result<Self, ConfigParseError> {
        Self::build(Self::make_default_config(), "<default config>")
    }

    fn make_default_config() -> ConfigBuilder<DefaultState> {
        Config::builder().add_source(File::from_str(Self::DEFAULT_CONFIG, FileFormat::Toml))
    }

    fn build(
        builder: ConfigBuilder<DefaultState>,
        config_file: impl Into<Utf8PathBuf>,
    ) -> Result<Self, ConfigParseError> {
        builder
            .build()
            .and_then(|config| config.try_deserialize())
            .map_err(|err| ConfigParseError::new(config_file, err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino_tempfile::Utf8TempDir;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_config_is_valid() {
        let config = TrxMergeConfig::default_config().expect("default config is valid");
        assert_eq!(
            config,
            TrxMergeConfig {
                merge: MergeConfig {
                    dedup: DedupPolicy::LatestStart,
                },
                discovery: DiscoveryConfig {
                    extension: "trx".to_owned(),
                    recursive: false,
                },
            }
        );
    }

    #[test]
    fn overrides_layer_over_defaults() {
        let config = TrxMergeConfig::from_toml_str(indoc! {r#"
            [merge]
            dedup = "last-input"
        "#})
        .expect("config parses");
        assert_eq!(config.merge.dedup, DedupPolicy::LastInput);
        assert_eq!(config.discovery.extension, "trx");
        assert!(!config.discovery.recursive);
    }

    #[test]
    fn invalid_dedup_policy() {
        let err = TrxMergeConfig::from_toml_str(indoc! {r#"
            [merge]
            dedup = "first-input"
        "#})
        .expect_err("unknown policy is rejected");
        assert_eq!(err.config_file(), "<inline>");
    }

    #[test]
    fn missing_default_file_is_fine() {
        let temp_dir = Utf8TempDir::with_prefix("trx-merge-").expect("temp dir created");
        let config = TrxMergeConfig::from_sources(temp_dir.path(), None).expect("config reads");
        assert_eq!(config, TrxMergeConfig::default_config().expect("default config is valid"));
    }

    #[test]
    fn reads_default_file_location() {
        let temp_dir = Utf8TempDir::with_prefix("trx-merge-").expect("temp dir created");
        let config_dir = temp_dir.path().join(".config");
        std::fs::create_dir(&config_dir).expect("config dir created");
        std::fs::write(
            config_dir.join("trx-merge.toml"),
            indoc! {r#"
                [discovery]
                extension = "xml"
                recursive = true
            "#},
        )
        .expect("config written");

        let config = TrxMergeConfig::from_sources(temp_dir.path(), None).expect("config reads");
        assert_eq!(config.discovery.extension, "xml");
        assert!(config.discovery.recursive);
        assert_eq!(config.merge.dedup, DedupPolicy::LatestStart);
    }

    #[test]
    fn explicit_file_must_exist() {
        let temp_dir = Utf8TempDir::with_prefix("trx-merge-").expect("temp dir created");
        let missing = temp_dir.path().join("missing.toml");
        let err = TrxMergeConfig::from_sources(temp_dir.path(), Some(&missing))
            .expect_err("missing explicit config fails");
        assert_eq!(err.config_file(), missing.as_path());
    }
}
