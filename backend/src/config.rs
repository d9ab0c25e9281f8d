use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_SPACE_ID: &str = "Praneel12/oral-health-classifier";
pub const DEFAULT_API_NAME: &str = "/classify_image";
pub const DEFAULT_HUB_ENDPOINT: &str = "https://huggingface.co";

const DEFAULT_ALLOWED_ORIGINS: &[&str] = &[
    "http://localhost:5173",
    "http://localhost:5174",
    "http://localhost:3000",
    "http://127.0.0.1:5173",
    "http://127.0.0.1:5174",
    "https://ai-powered-oral-lesion-classification.vercel.app",
    "https://*.vercel.app",
];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct RemoteConfig {
    pub space_id: String,
    /// Base URL of the space; resolved through the hub when unset.
    pub space_host: Option<String>,
    pub hub_endpoint: String,
    pub api_name: String,
    pub token: Option<String>,
    pub timeout: Duration,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            space_id: DEFAULT_SPACE_ID.to_string(),
            space_host: None,
            hub_endpoint: DEFAULT_HUB_ENDPOINT.to_string(),
            api_name: DEFAULT_API_NAME.to_string(),
            token: None,
            timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub model_path: PathBuf,
    pub remote: RemoteConfig,
    pub allowed_origins: Vec<String>,
}

pub fn default_model_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("models")
        .join("malignant_benign.tflite")
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match non_empty("PORT") {
            Some(value) => value
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidValue { key: "PORT", value })?,
            None => 5000,
        };

        let timeout_secs = match non_empty("REMOTE_TIMEOUT_SECS") {
            Some(value) => value
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or(ConfigError::InvalidValue {
                    key: "REMOTE_TIMEOUT_SECS",
                    value,
                })?,
            None => 60,
        };

        let allowed_origins = match non_empty("CORS_ALLOWED_ORIGINS") {
            Some(value) => value
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(String::from)
                .collect(),
            None => DEFAULT_ALLOWED_ORIGINS.iter().map(|o| o.to_string()).collect(),
        };

        Ok(Self {
            host: non_empty("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            model_path: non_empty("MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(default_model_path),
            remote: RemoteConfig {
                space_id: non_empty("HF_SPACE_ID").unwrap_or_else(|| DEFAULT_SPACE_ID.to_string()),
                space_host: non_empty("HF_SPACE_HOST"),
                hub_endpoint: non_empty("HF_HUB_ENDPOINT")
                    .unwrap_or_else(|| DEFAULT_HUB_ENDPOINT.to_string()),
                api_name: non_empty("HF_API_NAME").unwrap_or_else(|| DEFAULT_API_NAME.to_string()),
                token: non_empty("HF_TOKEN"),
                timeout: Duration::from_secs(timeout_secs),
            },
            allowed_origins,
        })
    }
}

/// Matches an origin against a configured entry; `*` matches any run of characters.
pub fn origin_matches(pattern: &str, origin: &str) -> bool {
    match pattern.split_once('*') {
        None => pattern == origin,
        Some((prefix, suffix)) => {
            origin.len() >= prefix.len() + suffix.len()
                && origin.starts_with(prefix)
                && origin.ends_with(suffix)
        }
    }
}
