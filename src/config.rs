use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::combiner::{CombinerOptions, MatchMode};
use crate::error::CombinerError;
use crate::scorer::{DEFAULT_BOILERPLATE_FRACTION, DEFAULT_DESCRIPTION_WEIGHT};
use crate::text::default_platform_markers;

pub const DEFAULT_CONFIG_FILE: &str = "kira-gc.json";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub mode: Option<MatchMode>,
    #[serde(default)]
    pub threshold: Option<f64>,
    #[serde(default)]
    pub sample_matching: Option<bool>,
    #[serde(default)]
    pub boilerplate_fraction: Option<f64>,
    #[serde(default)]
    pub description_weight: Option<f64>,
    #[serde(default)]
    pub platform_markers: Option<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub options: CombinerOptions,
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, CombinerError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Err(CombinerError::MissingConfig);
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| CombinerError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| CombinerError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, CombinerError> {
        let schema_version = config.schema_version.unwrap_or(1);

        let options = CombinerOptions {
            mode: config.mode.unwrap_or_default(),
            threshold: config.threshold,
            sample_matching: config.sample_matching.unwrap_or(true),
            boilerplate_fraction: config
                .boilerplate_fraction
                .unwrap_or(DEFAULT_BOILERPLATE_FRACTION),
            description_weight: config
                .description_weight
                .unwrap_or(DEFAULT_DESCRIPTION_WEIGHT),
            platform_markers: config
                .platform_markers
                .unwrap_or_else(default_platform_markers),
        };
        options.validate()?;

        Ok(ResolvedConfig {
            schema_version,
            options,
        })
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let resolved = ConfigLoader::resolve_config(Config::default()).unwrap();
        assert_eq!(resolved.schema_version, 1);
        assert_eq!(resolved.options, CombinerOptions::default());
    }

    #[test]
    fn parse_config_fields() {
        let config: Config = serde_json::from_str(
            r#"{"mode": "strict", "threshold": 0.9, "platform_markers": ["hg-u133"]}"#,
        )
        .unwrap();
        let resolved = ConfigLoader::resolve_config(config).unwrap();
        assert_eq!(resolved.options.mode, MatchMode::Strict);
        assert_eq!(resolved.options.threshold(), 0.9);
        assert_eq!(resolved.options.platform_markers, vec!["hg-u133"]);
    }

    #[test]
    fn invalid_fraction_is_rejected() {
        let config = Config {
            boilerplate_fraction: Some(1.5),
            ..Config::default()
        };
        let err = ConfigLoader::resolve_config(config).unwrap_err();
        assert_matches!(err, CombinerError::InvalidBoilerplateFraction(_));
    }
}
