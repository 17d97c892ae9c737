//! Configuration management for the media uploader
//!
//! The environment is read exactly once, in [`Config::from_env`]. Everything
//! downstream receives the resulting values explicitly.

use serde::Deserialize;
use std::collections::BTreeSet;
use std::env;
use std::time::Duration;

use crate::upload::{RetryPolicy, ValidationPolicy};

const MIB: u64 = 1024 * 1024;

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub upload: UploadConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub provider: StorageProvider,
    pub endpoint: Option<String>,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageProvider {
    Minio,
    R2,
    S3,
    B2,
    Memory,
}

impl StorageProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageProvider::Minio => "minio",
            StorageProvider::R2 => "r2",
            StorageProvider::S3 => "s3",
            StorageProvider::B2 => "b2",
            StorageProvider::Memory => "memory",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "minio" => Some(StorageProvider::Minio),
            "r2" => Some(StorageProvider::R2),
            "s3" | "aws" => Some(StorageProvider::S3),
            "b2" => Some(StorageProvider::B2),
            "memory" => Some(StorageProvider::Memory),
            _ => None,
        }
    }
}

/// Upload pipeline settings
#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    pub max_part_size: u64,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
    pub max_file_size: u64,
    pub allowed_content_types: BTreeSet<String>,
    pub allow_empty: bool,
    pub key_prefix: String,
    pub body_limit: usize,
}

impl UploadConfig {
    pub fn validation_policy(&self) -> ValidationPolicy {
        ValidationPolicy {
            max_file_size: self.max_file_size,
            allowed_content_types: self.allowed_content_types.clone(),
            allow_empty: self.allow_empty,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_retries,
            backoff: Duration::from_millis(self.retry_backoff_ms),
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        UploadConfig {
            max_part_size: 5 * MIB,
            max_retries: 3,
            retry_backoff_ms: 0,
            max_file_size: 5 * MIB,
            allowed_content_types: ["image/jpeg", "image/png"]
                .into_iter()
                .map(String::from)
                .collect(),
            allow_empty: false,
            key_prefix: "media".to_string(),
            body_limit: 64 * MIB as usize,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            storage: StorageConfig {
                provider: StorageProvider::Memory,
                endpoint: None,
                bucket: "media".to_string(),
                access_key: String::new(),
                secret_key: String::new(),
                region: "us-east-1".to_string(),
            },
            upload: UploadConfig::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = UploadConfig::default();

        let provider = match lookup("S3_PROVIDER") {
            Some(value) => StorageProvider::parse(&value).ok_or(ConfigError::Invalid {
                name: "S3_PROVIDER",
                value,
            })?,
            None => StorageProvider::S3,
        };

        let (bucket, access_key, secret_key) = if provider == StorageProvider::Memory {
            (
                lookup("S3_BUCKET").unwrap_or_else(|| "media".to_string()),
                String::new(),
                String::new(),
            )
        } else {
            (
                lookup("S3_BUCKET").ok_or(ConfigError::Missing("S3_BUCKET"))?,
                lookup("S3_ACCESS_KEY").ok_or(ConfigError::Missing("S3_ACCESS_KEY"))?,
                lookup("S3_SECRET_KEY").ok_or(ConfigError::Missing("S3_SECRET_KEY"))?,
            )
        };

        let endpoint = lookup("S3_ENDPOINT").filter(|e| !e.is_empty());
        if endpoint.is_none() && !matches!(provider, StorageProvider::S3 | StorageProvider::Memory) {
            return Err(ConfigError::Missing("S3_ENDPOINT"));
        }

        let allowed_content_types = match lookup("UPLOAD_ALLOWED_TYPES") {
            Some(list) => list
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect(),
            None => defaults.allowed_content_types,
        };

        Ok(Config {
            server: ServerConfig {
                host: lookup("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: parse_or(&lookup, "SERVER_PORT", 3000)?,
            },
            storage: StorageConfig {
                provider,
                endpoint,
                bucket,
                access_key,
                secret_key,
                region: lookup("S3_REGION").unwrap_or_else(|| "us-east-1".to_string()),
            },
            upload: UploadConfig {
                max_part_size: parse_or(&lookup, "UPLOAD_MAX_PART_SIZE", defaults.max_part_size)?,
                max_retries: parse_or(&lookup, "UPLOAD_MAX_RETRIES", defaults.max_retries)?,
                retry_backoff_ms: parse_or(&lookup, "UPLOAD_RETRY_BACKOFF_MS", defaults.retry_backoff_ms)?,
                max_file_size: parse_or(&lookup, "UPLOAD_MAX_FILE_SIZE", defaults.max_file_size)?,
                allowed_content_types,
                allow_empty: parse_or(&lookup, "UPLOAD_ALLOW_EMPTY", defaults.allow_empty)?,
                key_prefix: lookup("UPLOAD_KEY_PREFIX").unwrap_or(defaults.key_prefix),
                body_limit: parse_or(&lookup, "UPLOAD_BODY_LIMIT", defaults.body_limit)?,
            },
        })
    }
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(name) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_memory_provider_needs_no_credentials() {
        let config = Config::from_lookup(lookup_from(&[("S3_PROVIDER", "memory")])).unwrap();

        assert_eq!(config.storage.provider, StorageProvider::Memory);
        assert_eq!(config.upload.max_part_size, 5 * MIB);
        assert_eq!(config.upload.max_retries, 3);
        assert!(config.upload.allowed_content_types.contains("image/png"));
    }

    #[test]
    fn test_s3_requires_credentials() {
        let result = Config::from_lookup(lookup_from(&[("S3_BUCKET", "media")]));
        assert!(matches!(result, Err(ConfigError::Missing("S3_ACCESS_KEY"))));
    }

    #[test]
    fn test_minio_requires_endpoint() {
        let result = Config::from_lookup(lookup_from(&[
            ("S3_PROVIDER", "minio"),
            ("S3_BUCKET", "media"),
            ("S3_ACCESS_KEY", "admin"),
            ("S3_SECRET_KEY", "secret"),
        ]));
        assert!(matches!(result, Err(ConfigError::Missing("S3_ENDPOINT"))));
    }

    #[test]
    fn test_upload_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("S3_PROVIDER", "memory"),
            ("UPLOAD_MAX_PART_SIZE", "1048576"),
            ("UPLOAD_MAX_RETRIES", "5"),
            ("UPLOAD_ALLOWED_TYPES", "image/gif, image/webp"),
            ("UPLOAD_ALLOW_EMPTY", "true"),
        ]))
        .unwrap();

        assert_eq!(config.upload.max_part_size, MIB);
        assert_eq!(config.upload.retry_policy().max_attempts, 5);
        let policy = config.upload.validation_policy();
        assert!(policy.allow_empty);
        assert!(policy.allowed_content_types.contains("image/webp"));
        assert!(!policy.allowed_content_types.contains("image/png"));
    }

    #[test]
    fn test_invalid_number_is_an_error() {
        let result = Config::from_lookup(lookup_from(&[
            ("S3_PROVIDER", "memory"),
            ("UPLOAD_MAX_RETRIES", "three"),
        ]));
        assert!(matches!(
            result,
            Err(ConfigError::Invalid { name: "UPLOAD_MAX_RETRIES", .. })
        ));
    }
}
