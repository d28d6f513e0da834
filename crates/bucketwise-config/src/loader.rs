// Bucketwise - Multi-bucket object storage provider
// Copyright (C) 2025 Bucketwise Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published
// by the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
use crate::error::{ConfigError, ConfigResult};
use crate::normalize::ProviderOptions;
use crate::schema::{Config, ProviderConfig};
use crate::validation::Validator;
use serde::de::DeserializeOwned;
use std::path::Path;
use tokio::fs;
use tracing::{debug, info};

/// Prefix shared by every environment override
pub const ENV_PREFIX: &str = "BUCKETWISE_";

/// Configuration format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Yaml,
    Json,
}

impl ConfigFormat {
    /// Detect format from file extension
    pub fn from_path<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(ConfigFormat::Toml),
            Some("yaml") | Some("yml") => Ok(ConfigFormat::Yaml),
            Some("json") => Ok(ConfigFormat::Json),
            Some(ext) => Err(ConfigError::UnsupportedFormat(ext.to_string())),
            None => Err(ConfigError::InvalidPath(path.to_path_buf())),
        }
    }

    /// Get format name as string
    pub fn name(&self) -> &'static str {
        match self {
            ConfigFormat::Toml => "TOML",
            ConfigFormat::Yaml => "YAML",
            ConfigFormat::Json => "JSON",
        }
    }

    fn parse<T: DeserializeOwned>(&self, content: &str) -> ConfigResult<T> {
        Ok(match self {
            ConfigFormat::Toml => toml::from_str(content)?,
            ConfigFormat::Yaml => serde_yaml::from_str(content)?,
            ConfigFormat::Json => serde_json::from_str(content)?,
        })
    }
}

/// Configuration loader
#[derive(Debug)]
pub struct ConfigLoader {
    validate: bool,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        ConfigLoader { validate: true }
    }

    /// Create a loader without validation
    pub fn without_validation() -> Self {
        ConfigLoader { validate: false }
    }

    /// Load configuration from a file
    pub async fn load_file<P: AsRef<Path>>(&self, path: P) -> ConfigResult<Config> {
        let path = path.as_ref();
        debug!("Loading configuration from: {}", path.display());

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).await?;
        let format = ConfigFormat::from_path(path)?;

        info!(
            "Loaded {} configuration file: {}",
            format.name(),
            path.display()
        );

        self.load_from_string(&content, format)
    }

    /// Load configuration from a string
    pub fn load_from_string(&self, content: &str, format: ConfigFormat) -> ConfigResult<Config> {
        let config: Config = format.parse(content)?;
        debug!("Configuration loaded from {}", format.name());

        if self.validate {
            config.validate()?;
            info!("Configuration validated successfully");
        }

        Ok(config)
    }

    /// Load configuration with `BUCKETWISE_*` environment overrides
    pub async fn load_with_overrides<P: AsRef<Path>>(&self, path: P) -> ConfigResult<Config> {
        let mut config = self.load_file(path).await?;
        self.apply_env_overrides(&mut config)?;
        if self.validate {
            config.validate()?;
        }
        Ok(config)
    }

    /// Load a raw host option bag (legacy or nested shape) and normalize it.
    ///
    /// Normalization always validates; the loader's validation flag does not
    /// apply here.
    pub fn load_options(&self, content: &str, format: ConfigFormat) -> ConfigResult<ProviderConfig> {
        let options: ProviderOptions = format.parse(content)?;
        debug!("Provider options loaded from {}", format.name());
        options.normalize()
    }

    /// Apply overrides from the process environment
    pub fn apply_env_overrides(&self, config: &mut Config) -> ConfigResult<()> {
        self.apply_overrides_from(config, |name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable lookup
    pub fn apply_overrides_from<F>(&self, config: &mut Config, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |suffix: &str| {
            let name = format!("{ENV_PREFIX}{suffix}");
            lookup(&name).map(|value| (name, value))
        };

        // Provider settings
        if let Some((_, value)) = var("DEFAULT_BUCKET") {
            config.provider.default_bucket = Some(value);
        }
        if let Some((name, value)) = var("POOL") {
            config.provider.pool = parse_bool(&name, &value)?;
        }
        if let Some((name, value)) = var("SIGNED_URL_EXPIRES") {
            config.provider.signed_url_expires = value.parse().map_err(|_| {
                ConfigError::env_var_parsing_error(&name, &value, "expected a number of seconds")
            })?;
        }
        if let Some((_, value)) = var("KEY_PREFIX") {
            config.provider.key_prefix = Some(value);
        }
        if let Some((_, value)) = var("BASE_URL") {
            config.provider.base_url = Some(value);
        }
        if let Some((_, value)) = var("ENDPOINT") {
            config.provider.endpoint = Some(value);
        }
        if let Some((_, value)) = var("REGION") {
            config.provider.region = Some(value);
        }

        // Observability settings
        if let Some((_, value)) = var("LOG_LEVEL") {
            config.observability.log_level = value;
        }
        if let Some((_, value)) = var("LOG_FORMAT") {
            config.observability.log_format = value;
        }

        Ok(())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse boolean from string (accepts: true, false, yes, no, 1, 0, on, off)
fn parse_bool(variable: &str, value: &str) -> ConfigResult<bool> {
    match value.to_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Ok(true),
        "false" | "no" | "0" | "off" => Ok(false),
        _ => Err(ConfigError::env_var_parsing_error(
            variable,
            value,
            "expected 'true', 'false', 'yes', 'no', '1', '0', 'on', or 'off'",
        )),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(ConfigFormat::from_path("config.toml").unwrap(), ConfigFormat::Toml);
        assert_eq!(ConfigFormat::from_path("config.yaml").unwrap(), ConfigFormat::Yaml);
        assert_eq!(ConfigFormat::from_path("config.yml").unwrap(), ConfigFormat::Yaml);
        assert_eq!(ConfigFormat::from_path("config.json").unwrap(), ConfigFormat::Json);
    }

    #[test]
    fn test_format_detection_error() {
        assert!(ConfigFormat::from_path("config.xml").is_err());
        assert!(ConfigFormat::from_path("config").is_err());
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("V", "true").unwrap());
        assert!(parse_bool("V", "yes").unwrap());
        assert!(parse_bool("V", "1").unwrap());
        assert!(parse_bool("V", "on").unwrap());
        assert!(!parse_bool("V", "false").unwrap());
        assert!(!parse_bool("V", "no").unwrap());
        assert!(!parse_bool("V", "0").unwrap());
        assert!(!parse_bool("V", "off").unwrap());
        assert!(parse_bool("V", "invalid").is_err());
    }

    #[test]
    fn test_parse_toml() {
        let loader = ConfigLoader::new();
        let toml = r#"
        [provider]
        default_bucket = "uploads"
        signed_url_expires = 300

        [provider.buckets]
        uploads = "real-uploads"
        private = "real-private"

        [provider.public_domains]
        uploads = "https://cdn.x"
        "#;
        let config = loader.load_from_string(toml, ConfigFormat::Toml).unwrap();
        assert_eq!(config.provider.physical_bucket("private"), Some("real-private"));
        assert_eq!(config.provider.signed_url_expires, 300);
        assert_eq!(config.observability.log_level, "info");
    }

    #[test]
    fn test_parse_yaml() {
        let loader = ConfigLoader::new();
        let yaml = r#"provider:
  buckets:
    uploads: real-uploads
  pool: true
observability:
  log_format: json"#;
        let config = loader.load_from_string(yaml, ConfigFormat::Yaml).unwrap();
        assert!(config.provider.pool);
        assert_eq!(config.observability.log_format, "json");
    }

    #[test]
    fn test_validation_toggle() {
        let json = r#"{"provider": {"signed_url_expires": 0}}"#;
        assert!(ConfigLoader::new().load_from_string(json, ConfigFormat::Json).is_err());
        assert!(ConfigLoader::without_validation()
            .load_from_string(json, ConfigFormat::Json)
            .is_ok());
    }

    #[test]
    fn test_load_options_normalizes() {
        let loader = ConfigLoader::new();
        let yaml = r#"bucket: legacy-bucket
rootPath: /tenant/"#;
        let config = loader.load_options(yaml, ConfigFormat::Yaml).unwrap();
        assert_eq!(config.physical_bucket("default"), Some("legacy-bucket"));
        assert_eq!(config.key_prefix.as_deref(), Some("tenant"));
    }

    #[test]
    fn test_env_overrides() {
        let loader = ConfigLoader::new();
        let mut config = Config::default();
        let env = lookup(&[
            ("BUCKETWISE_DEFAULT_BUCKET", "uploads"),
            ("BUCKETWISE_POOL", "yes"),
            ("BUCKETWISE_SIGNED_URL_EXPIRES", "60"),
            ("BUCKETWISE_LOG_LEVEL", "debug"),
        ]);

        loader.apply_overrides_from(&mut config, env).unwrap();
        assert_eq!(config.provider.default_bucket.as_deref(), Some("uploads"));
        assert!(config.provider.pool);
        assert_eq!(config.provider.signed_url_expires, 60);
        assert_eq!(config.observability.log_level, "debug");
    }

    #[test]
    fn test_env_override_parse_error_names_variable() {
        let loader = ConfigLoader::new();
        let mut config = Config::default();
        let env = lookup(&[("BUCKETWISE_SIGNED_URL_EXPIRES", "soon")]);

        let err = loader.apply_overrides_from(&mut config, env).unwrap_err();
        assert!(err.to_string().contains("BUCKETWISE_SIGNED_URL_EXPIRES"));
    }
}
