//! Configuration resolution: YAML file, then environment and CLI overrides.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};

use nowcast::NowcastConfig;

use crate::cli::Args;

/// Source settings that may be overridden from the environment or CLI.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceOverrides {
    pub bucket: Option<String>,
    pub endpoint: Option<String>,
    pub aws_region: Option<String>,
    pub prefix: Option<String>,
    pub source_dir: Option<PathBuf>,
}

impl SourceOverrides {
    pub fn from_args(args: &Args) -> Self {
        Self {
            bucket: args.bucket.clone(),
            endpoint: args.endpoint.clone(),
            aws_region: args.aws_region.clone(),
            prefix: args.prefix.clone(),
            source_dir: args.source_dir.clone(),
        }
    }

    pub fn apply(self, config: &mut NowcastConfig) {
        if let Some(bucket) = self.bucket {
            config.source.bucket = bucket;
        }
        if let Some(endpoint) = self.endpoint {
            // Custom endpoints are usually local mirrors
            config.source.allow_http = endpoint.starts_with("http://");
            config.source.endpoint = Some(endpoint);
        }
        if let Some(region) = self.aws_region {
            config.source.region = region;
        }
        if let Some(prefix) = self.prefix {
            config.pipeline.key_prefix = prefix;
        }
        if let Some(dir) = self.source_dir {
            config.source.local_root = Some(dir);
        }
    }
}

/// Load the configuration file, or the built-in defaults when none is given.
pub fn load(path: Option<&Path>) -> Result<NowcastConfig> {
    match path {
        Some(path) => {
            let config = NowcastConfig::load(path)
                .with_context(|| format!("Failed to load config file: {}", path.display()))?;
            info!(path = %path.display(), "Loaded configuration");
            Ok(config)
        }
        None => {
            warn!("No config file given, using built-in New Zealand registry");
            Ok(NowcastConfig::default())
        }
    }
}

/// Full configuration for a run: file, overrides, optional region filter.
pub fn resolve(args: &Args) -> Result<NowcastConfig> {
    let mut config = load(args.config.as_deref())?;
    SourceOverrides::from_args(args).apply(&mut config);

    if let Some(region) = &args.region {
        config.registry = config
            .registry
            .only_region(region)
            .with_context(|| format!("Unknown region: {}", region))?;
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_apply() {
        let mut config = NowcastConfig::default();
        SourceOverrides {
            bucket: Some("mirror".to_string()),
            endpoint: Some("http://localhost:9000".to_string()),
            aws_region: None,
            prefix: Some("magnetometer".to_string()),
            source_dir: None,
        }
        .apply(&mut config);

        assert_eq!(config.source.bucket, "mirror");
        assert_eq!(config.source.endpoint.as_deref(), Some("http://localhost:9000"));
        assert!(config.source.allow_http);
        assert_eq!(config.source.region, "ap-southeast-2");
        assert_eq!(config.pipeline.key_prefix, "magnetometer");
    }

    #[test]
    fn test_no_overrides_keeps_defaults() {
        let mut config = NowcastConfig::default();
        SourceOverrides::default().apply(&mut config);
        assert_eq!(config, NowcastConfig::default());
    }
}
