//! Runtime settings read from the environment (and `.env`).

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::controller::PollConfig;
use crate::transcription::provider::caption_api::CaptionApiConfig;
use crate::transcription::provider::replicate::{DEFAULT_BASE_URL, ReplicateConfig};
use crate::transcription::{
    CaptionApiProvider, CaptionError, DevanagariRomanizer, NoopTransliterator, ReplicateProvider,
    TranscriptionProvider, Transliterator,
};

pub const DEFAULT_CAPTION_API_URL: &str = "http://localhost:8000";

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Set {0} environment variable")]
    Missing(&'static str),
    #[error("Invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Which transcription backend to talk to
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderConfig {
    CaptionApi {
        base_url: String,
    },
    Replicate {
        base_url: String,
        api_token: String,
        version: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransliteratorKind {
    Builtin,
    None,
}

impl FromStr for TransliteratorKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "builtin" => Ok(TransliteratorKind::Builtin),
            "none" | "off" => Ok(TransliteratorKind::None),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub discord_token: String,
    pub guild_id: Option<u64>,
    pub provider: ProviderConfig,
    pub poll: PollConfig,
    pub transliterator: TransliteratorKind,
    pub max_upload_bytes: u64,
    pub http_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the config from any variable source; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let discord_token = get("DISCORD_TOKEN").ok_or(ConfigError::Missing("DISCORD_TOKEN"))?;
        let guild_id = parse_opt::<u64>("GUILD_ID", get("GUILD_ID"))?;

        let provider = match get("CAPTION_PROVIDER").as_deref() {
            None | Some("caption-api") | Some("caption_api") => ProviderConfig::CaptionApi {
                base_url: get("CAPTION_API_URL")
                    .unwrap_or_else(|| DEFAULT_CAPTION_API_URL.to_string()),
            },
            Some("replicate") => ProviderConfig::Replicate {
                base_url: get("REPLICATE_API_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
                api_token: get("REPLICATE_API_TOKEN")
                    .ok_or(ConfigError::Missing("REPLICATE_API_TOKEN"))?,
                version: get("REPLICATE_MODEL_VERSION")
                    .ok_or(ConfigError::Missing("REPLICATE_MODEL_VERSION"))?,
            },
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "CAPTION_PROVIDER",
                    value: other.to_string(),
                });
            }
        };

        let defaults = PollConfig::default();
        let interval = parse_opt::<u64>("POLL_INTERVAL_SECS", get("POLL_INTERVAL_SECS"))?
            .map(Duration::from_secs)
            .unwrap_or(defaults.interval);
        let max_interval = parse_opt::<u64>("POLL_MAX_INTERVAL_SECS", get("POLL_MAX_INTERVAL_SECS"))?
            .map(Duration::from_secs)
            .unwrap_or(interval);
        let backoff = parse_opt::<f64>("POLL_BACKOFF", get("POLL_BACKOFF"))?.unwrap_or(defaults.backoff);
        let max_attempts =
            parse_opt::<u32>("POLL_MAX_ATTEMPTS", get("POLL_MAX_ATTEMPTS"))?.unwrap_or(defaults.max_attempts);

        if interval.is_zero() {
            return Err(invalid("POLL_INTERVAL_SECS", "0"));
        }
        if !backoff.is_finite() || backoff < 1.0 {
            return Err(invalid("POLL_BACKOFF", &backoff.to_string()));
        }
        if max_attempts == 0 {
            return Err(invalid("POLL_MAX_ATTEMPTS", "0"));
        }

        let transliterator = match get("TRANSLITERATOR") {
            None => TransliteratorKind::Builtin,
            Some(value) => value
                .parse()
                .map_err(|_| invalid("TRANSLITERATOR", &value))?,
        };

        let max_upload_mb = parse_opt::<u64>("MAX_UPLOAD_MB", get("MAX_UPLOAD_MB"))?.unwrap_or(25);
        let http_timeout = parse_opt::<u64>("HTTP_TIMEOUT_SECS", get("HTTP_TIMEOUT_SECS"))?.unwrap_or(60);

        Ok(Self {
            discord_token,
            guild_id,
            provider,
            poll: PollConfig {
                interval,
                max_interval,
                backoff,
                max_attempts,
            },
            transliterator,
            max_upload_bytes: max_upload_mb * 1024 * 1024,
            http_timeout: Duration::from_secs(http_timeout),
        })
    }

    pub fn build_provider(&self) -> Result<Arc<dyn TranscriptionProvider>, CaptionError> {
        Ok(match &self.provider {
            ProviderConfig::CaptionApi { base_url } => Arc::new(CaptionApiProvider::new(
                CaptionApiConfig::new(base_url.as_str()).with_timeout(self.http_timeout),
            )?),
            ProviderConfig::Replicate {
                base_url,
                api_token,
                version,
            } => Arc::new(ReplicateProvider::new(
                ReplicateConfig::new(api_token.as_str(), version.as_str())
                    .with_base_url(base_url.as_str())
                    .with_timeout(self.http_timeout),
            )?),
        })
    }

    pub fn build_transliterator(&self) -> Arc<dyn Transliterator> {
        match self.transliterator {
            TransliteratorKind::Builtin => Arc::new(DevanagariRomanizer),
            TransliteratorKind::None => Arc::new(NoopTransliterator),
        }
    }
}

fn invalid(name: &'static str, value: &str) -> ConfigError {
    ConfigError::Invalid {
        name,
        value: value.to_string(),
    }
}

fn parse_opt<T: FromStr>(name: &'static str, value: Option<String>) -> Result<Option<T>, ConfigError> {
    value
        .map(|v| v.parse::<T>().map_err(|_| invalid(name, &v)))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[("DISCORD_TOKEN", "token")]).unwrap();

        assert_eq!(config.guild_id, None);
        assert_eq!(
            config.provider,
            ProviderConfig::CaptionApi {
                base_url: DEFAULT_CAPTION_API_URL.to_string()
            }
        );
        assert_eq!(config.poll, PollConfig::default());
        assert_eq!(config.transliterator, TransliteratorKind::Builtin);
        assert_eq!(config.max_upload_bytes, 25 * 1024 * 1024);
        assert_eq!(config.http_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_token_is_required() {
        assert_eq!(config(&[]).unwrap_err(), ConfigError::Missing("DISCORD_TOKEN"));
        assert_eq!(
            config(&[("DISCORD_TOKEN", "  ")]).unwrap_err(),
            ConfigError::Missing("DISCORD_TOKEN")
        );
    }

    #[test]
    fn test_replicate_requires_credentials() {
        let err = config(&[("DISCORD_TOKEN", "t"), ("CAPTION_PROVIDER", "replicate")]).unwrap_err();
        assert_eq!(err, ConfigError::Missing("REPLICATE_API_TOKEN"));

        let config = config(&[
            ("DISCORD_TOKEN", "t"),
            ("CAPTION_PROVIDER", "replicate"),
            ("REPLICATE_API_TOKEN", "r8_abc"),
            ("REPLICATE_MODEL_VERSION", "v1"),
        ])
        .unwrap();
        assert_eq!(
            config.provider,
            ProviderConfig::Replicate {
                base_url: DEFAULT_BASE_URL.to_string(),
                api_token: "r8_abc".to_string(),
                version: "v1".to_string(),
            }
        );
    }

    #[test]
    fn test_poll_settings() {
        let config = config(&[
            ("DISCORD_TOKEN", "t"),
            ("POLL_INTERVAL_SECS", "2"),
            ("POLL_MAX_INTERVAL_SECS", "10"),
            ("POLL_BACKOFF", "1.5"),
            ("POLL_MAX_ATTEMPTS", "40"),
        ])
        .unwrap();
        assert_eq!(config.poll.interval, Duration::from_secs(2));
        assert_eq!(config.poll.max_interval, Duration::from_secs(10));
        assert_eq!(config.poll.backoff, 1.5);
        assert_eq!(config.poll.max_attempts, 40);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            config(&[("DISCORD_TOKEN", "t"), ("POLL_MAX_ATTEMPTS", "lots")]),
            Err(ConfigError::Invalid { name: "POLL_MAX_ATTEMPTS", .. })
        ));
        assert!(matches!(
            config(&[("DISCORD_TOKEN", "t"), ("POLL_BACKOFF", "0.5")]),
            Err(ConfigError::Invalid { name: "POLL_BACKOFF", .. })
        ));
        assert!(matches!(
            config(&[("DISCORD_TOKEN", "t"), ("CAPTION_PROVIDER", "local")]),
            Err(ConfigError::Invalid { name: "CAPTION_PROVIDER", .. })
        ));
        assert!(matches!(
            config(&[("DISCORD_TOKEN", "t"), ("GUILD_ID", "abc")]),
            Err(ConfigError::Invalid { name: "GUILD_ID", .. })
        ));
    }

    #[test]
    fn test_transliterator_choice() {
        let config = config(&[("DISCORD_TOKEN", "t"), ("TRANSLITERATOR", "none")]).unwrap();
        assert_eq!(config.transliterator, TransliteratorKind::None);
        assert!(!config.build_transliterator().is_available());
    }
}
