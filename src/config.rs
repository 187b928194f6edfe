use std::path::PathBuf;
use std::time::Duration;

use crate::pipeline::flows::ollama_types::{validate_base_url, validate_model_name};

/// Application-level constants
pub const APP_NAME: &str = "Seva Health";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default Ollama endpoint.
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Default model for all three flows (multimodal, tool-capable).
pub const DEFAULT_MODEL: &str = "gemma3:4b";

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8787";

/// Upper bound for a single action, model call and tool calls included.
pub const DEFAULT_FLOW_TIMEOUT_SECS: u64 = 30;

/// Maximum decoded image size accepted by image analysis (5 MiB).
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Largest value `SEVA_MAX_IMAGE_BYTES` may be set to (64 MiB).
pub const MAX_IMAGE_BYTES_LIMIT: usize = 64 * 1024 * 1024;

/// Language used when the caller does not pick one.
pub const DEFAULT_LANGUAGE: &str = "english";

/// Languages offered to patients: (tag sent to the model, display label).
///
/// Advisory only: actions accept any non-empty language tag.
pub const SUPPORTED_LANGUAGES: &[(&str, &str)] = &[
    ("english", "English"),
    ("hindi", "हिंदी"),
    ("odia", "ଓଡ଼ିଆ"),
    ("telugu", "తెలుగు"),
    ("tamil", "தமிழ்"),
    ("bengali", "বাংলা"),
];

/// Default tracing filter when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "seva_lib=info,tower_http=info"
}

/// Get the application data directory
/// ~/SevaHealth/ on all platforms
pub fn app_data_dir() -> Result<PathBuf, ConfigError> {
    let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
    Ok(home.join("SevaHealth"))
}

/// Get the default directory for downloaded reports
pub fn default_export_dir() -> Result<PathBuf, ConfigError> {
    Ok(app_data_dir()?.join("reports"))
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot determine home directory")]
    NoHomeDir,

    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: &'static str, value: String },

    #[error("Invalid model name: '{0}'")]
    InvalidModelName(String),

    #[error("Invalid Ollama URL: '{0}'")]
    InvalidUrl(String),
}

/// Runtime configuration, read from `SEVA_*` environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub ollama_url: String,
    pub model: String,
    pub bind_addr: std::net::SocketAddr,
    pub flow_timeout: Duration,
    pub max_image_bytes: usize,
    pub export_dir: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup (environment, tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let ollama_url = get("SEVA_OLLAMA_URL").unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string());
        validate_base_url(&ollama_url).map_err(|_| ConfigError::InvalidUrl(ollama_url.clone()))?;

        let model = get("SEVA_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());
        validate_model_name(&model).map_err(|_| ConfigError::InvalidModelName(model.clone()))?;

        let bind_raw = get("SEVA_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_raw.parse().map_err(|_| ConfigError::InvalidValue {
            key: "SEVA_BIND_ADDR",
            value: bind_raw.clone(),
        })?;

        let flow_timeout_secs = parse_positive("SEVA_FLOW_TIMEOUT_SECS", get("SEVA_FLOW_TIMEOUT_SECS"))?
            .unwrap_or(DEFAULT_FLOW_TIMEOUT_SECS);

        let max_image_bytes = match parse_positive("SEVA_MAX_IMAGE_BYTES", get("SEVA_MAX_IMAGE_BYTES"))? {
            None => DEFAULT_MAX_IMAGE_BYTES,
            Some(n) => usize::try_from(n)
                .ok()
                .filter(|&bytes| bytes <= MAX_IMAGE_BYTES_LIMIT)
                .ok_or_else(|| ConfigError::InvalidValue {
                    key: "SEVA_MAX_IMAGE_BYTES",
                    value: n.to_string(),
                })?,
        };

        let export_dir = match get("SEVA_EXPORT_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => default_export_dir()?,
        };

        Ok(Self {
            ollama_url,
            model,
            bind_addr,
            flow_timeout: Duration::from_secs(flow_timeout_secs),
            max_image_bytes,
            export_dir,
        })
    }
}

fn parse_positive(key: &'static str, raw: Option<String>) -> Result<Option<u64>, ConfigError> {
    match raw {
        None => Ok(None),
        Some(value) => match value.trim().parse::<u64>() {
            Ok(n) if n > 0 => Ok(Some(n)),
            _ => Err(ConfigError::InvalidValue { key, value }),
        },
    }
}

/// Normalize a caller-supplied language tag; blank falls back to english.
pub fn normalize_language(language: &str) -> String {
    let trimmed = language.trim();
    if trimmed.is_empty() {
        DEFAULT_LANGUAGE.to_string()
    } else {
        trimmed.to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = AppConfig::from_lookup(lookup_from(&[("SEVA_EXPORT_DIR", "/tmp/seva")])).unwrap();
        assert_eq!(config.ollama_url, DEFAULT_OLLAMA_URL);
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.flow_timeout, Duration::from_secs(30));
        assert_eq!(config.max_image_bytes, DEFAULT_MAX_IMAGE_BYTES);
        assert_eq!(config.bind_addr.port(), 8787);
        assert_eq!(config.export_dir, PathBuf::from("/tmp/seva"));
    }

    #[test]
    fn overrides_are_read() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("SEVA_OLLAMA_URL", "http://127.0.0.1:9999"),
            ("SEVA_MODEL", "medgemma:4b"),
            ("SEVA_FLOW_TIMEOUT_SECS", "45"),
            ("SEVA_MAX_IMAGE_BYTES", "1024"),
            ("SEVA_BIND_ADDR", "0.0.0.0:9000"),
            ("SEVA_EXPORT_DIR", "/tmp/seva"),
        ]))
        .unwrap();
        assert_eq!(config.ollama_url, "http://127.0.0.1:9999");
        assert_eq!(config.model, "medgemma:4b");
        assert_eq!(config.flow_timeout, Duration::from_secs(45));
        assert_eq!(config.max_image_bytes, 1024);
        assert_eq!(config.bind_addr.port(), 9000);
    }

    #[test]
    fn zero_timeout_rejected() {
        let err = AppConfig::from_lookup(lookup_from(&[
            ("SEVA_FLOW_TIMEOUT_SECS", "0"),
            ("SEVA_EXPORT_DIR", "/tmp/seva"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: "SEVA_FLOW_TIMEOUT_SECS", .. }));
    }

    #[test]
    fn oversized_image_limit_rejected() {
        let err = AppConfig::from_lookup(lookup_from(&[
            ("SEVA_MAX_IMAGE_BYTES", "18446744073709551615"),
            ("SEVA_EXPORT_DIR", "/tmp/seva"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: "SEVA_MAX_IMAGE_BYTES", .. }));

        let at_limit = MAX_IMAGE_BYTES_LIMIT.to_string();
        let config = AppConfig::from_lookup(lookup_from(&[
            ("SEVA_MAX_IMAGE_BYTES", at_limit.as_str()),
            ("SEVA_EXPORT_DIR", "/tmp/seva"),
        ]))
        .unwrap();
        assert_eq!(config.max_image_bytes, MAX_IMAGE_BYTES_LIMIT);
    }

    #[test]
    fn bad_model_name_rejected() {
        let err = AppConfig::from_lookup(lookup_from(&[
            ("SEVA_MODEL", "; rm -rf /"),
            ("SEVA_EXPORT_DIR", "/tmp/seva"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidModelName(_)));
    }

    #[test]
    fn bad_url_rejected() {
        let err = AppConfig::from_lookup(lookup_from(&[
            ("SEVA_OLLAMA_URL", "localhost:11434"),
            ("SEVA_EXPORT_DIR", "/tmp/seva"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUrl(_)));
    }

    #[test]
    fn language_normalization() {
        assert_eq!(normalize_language("  Hindi "), "hindi");
        assert_eq!(normalize_language(""), "english");
        assert_eq!(normalize_language("   "), "english");
    }

    #[test]
    fn supported_languages_start_with_english() {
        assert_eq!(SUPPORTED_LANGUAGES[0].0, DEFAULT_LANGUAGE);
        assert_eq!(SUPPORTED_LANGUAGES.len(), 6);
    }

    #[test]
    fn app_name_is_seva() {
        assert_eq!(APP_NAME, "Seva Health");
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, "0.1.0");
    }
}
