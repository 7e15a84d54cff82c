use serde::Deserialize;
use std::{
    fs, io,
    path::{Path, PathBuf},
    time::Duration,
};
use thiserror::Error;

use locus_core::OrchestratorConfig;

pub const DEFAULT_CONFIG_PATH: &str = "locus.toml";
const STORE_DIR_NAME: &str = "locus";

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct LocusConfig {
    pub orchestrator: OrchestratorSection,
    pub store: StoreSection,
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct OrchestratorSection {
    pub staleness_secs: u64,
    pub resolution_timeout_secs: u64,
}

impl Default for OrchestratorSection {
    fn default() -> Self {
        Self {
            staleness_secs: OrchestratorConfig::DEFAULT_STALENESS_THRESHOLD.as_secs(),
            resolution_timeout_secs: 0,
        }
    }
}

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct StoreSection {
    pub dir: Option<PathBuf>,
}

/// Command-line values that win over the file.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Overrides {
    pub staleness_secs: Option<u64>,
    pub resolution_timeout_secs: Option<u64>,
    pub store_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub orchestrator: OrchestratorConfig,
    pub store_dir: PathBuf,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to parse toml at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("no data directory on this platform: pass --store-dir or set [store] dir")]
    NoDataDir,
}

pub fn load_config(path: impl AsRef<Path>) -> Result<LocusConfig, ConfigError> {
    read_toml(path.as_ref())
}

/// Like [`load_config`], but a missing file yields the defaults.
pub fn load_config_or_default(path: impl AsRef<Path>) -> Result<LocusConfig, ConfigError> {
    match load_config(path) {
        Err(ConfigError::Read { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
            Ok(LocusConfig::default())
        }
        other => other,
    }
}

pub(crate) fn read_toml<T>(path: &Path) -> Result<T, ConfigError>
where
    T: for<'de> Deserialize<'de>,
{
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

pub fn resolve_settings(
    config: &LocusConfig,
    overrides: Overrides,
) -> Result<Settings, ConfigError> {
    let staleness = overrides
        .staleness_secs
        .unwrap_or(config.orchestrator.staleness_secs);
    let timeout = overrides
        .resolution_timeout_secs
        .unwrap_or(config.orchestrator.resolution_timeout_secs);
    let store_dir = overrides
        .store_dir
        .or_else(|| config.store.dir.clone())
        .or_else(default_store_dir)
        .ok_or(ConfigError::NoDataDir)?;

    let orchestrator = OrchestratorConfig::default()
        .with_staleness_threshold(Duration::from_secs(staleness))
        .with_resolution_timeout((timeout > 0).then(|| Duration::from_secs(timeout)));

    Ok(Settings {
        orchestrator,
        store_dir,
    })
}

fn default_store_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join(STORE_DIR_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn parses_example_config() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("locus.example.toml");
        let config = load_config(path).expect("should parse example config");

        assert_eq!(config.orchestrator.staleness_secs, 60);
        assert_eq!(config.orchestrator.resolution_timeout_secs, 120);
        assert_eq!(config.store.dir.as_deref(), Some(Path::new("/var/lib/locus")));
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let config: LocusConfig = toml::from_str("[store]\ndir = \"/tmp/x\"\n").expect("parse");

        assert_eq!(config.orchestrator, OrchestratorSection::default());

        let settings = resolve_settings(&config, Overrides::default()).expect("settings");
        assert_eq!(settings.orchestrator, OrchestratorConfig::default());
        assert_eq!(settings.store_dir, PathBuf::from("/tmp/x"));
    }

    #[test]
    fn overrides_win_over_the_file() {
        let config: LocusConfig = toml::from_str(
            "[orchestrator]\nstaleness_secs = 90\nresolution_timeout_secs = 30\n\n[store]\ndir = \"/from/file\"\n",
        )
        .expect("parse");

        let settings = resolve_settings(
            &config,
            Overrides {
                staleness_secs: Some(5),
                resolution_timeout_secs: Some(0),
                store_dir: Some("/from/flag".into()),
            },
        )
        .expect("settings");

        assert_eq!(settings.orchestrator.staleness_threshold, Duration::from_secs(5));
        assert_eq!(settings.orchestrator.resolution_timeout, None);
        assert_eq!(settings.store_dir, PathBuf::from("/from/flag"));

        let settings = resolve_settings(&config, Overrides::default()).expect("settings");
        assert_eq!(
            settings.orchestrator.resolution_timeout,
            Some(Duration::from_secs(30))
        );
    }

    #[test]
    fn absent_file_is_only_tolerated_when_optional() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("locus.toml");

        assert!(matches!(load_config(&path), Err(ConfigError::Read { .. })));
        assert_eq!(
            load_config_or_default(&path).expect("defaults"),
            LocusConfig::default()
        );

        fs::write(&path, "[orchestrator\n").expect("write");
        assert!(matches!(
            load_config_or_default(&path),
            Err(ConfigError::Parse { .. })
        ));
    }
}
