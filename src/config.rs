//! Process configuration.
//!
//! Read once at startup from environment variables:
//! - `HOST` - Optional. Listen host. Defaults to `0.0.0.0`.
//! - `PORT` - Optional. Listen port. Defaults to `8086`.
//! - `MODEL_NAME` - Optional. Gemini model identifier. Defaults to `gemini-2.5-flash`.
//! - `GOOGLE_API_KEY` (or `GEMINI_API_KEY`) - Required. Gemini API key.
//! - `GOOGLE_API_BASE_URL` - Optional. Overrides the Gemini REST endpoint.
//! - `AGENT_URL` - Optional. Public URL advertised in the agent card.
//!   Defaults to `http://{HOST}:{PORT}/`.
//! - `MAX_ITERATIONS` - Optional. Model/tool round trips per request. Defaults to `24`.

use std::str::FromStr;

use crate::error::ConfigError;
use crate::llm::{DEFAULT_GOOGLE_MODEL, GoogleModelConfig};

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8086;
pub const DEFAULT_MAX_ITERATIONS: u32 = 24;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub model: String,
    pub api_key: String,
    pub api_base_url: Option<String>,
    pub public_url: String,
    pub max_iterations: u32,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let host = get("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = parse_or(get("PORT"), "PORT", DEFAULT_PORT)?;
        let model = get("MODEL_NAME").unwrap_or_else(|| DEFAULT_GOOGLE_MODEL.to_string());
        let api_key = get("GOOGLE_API_KEY")
            .or_else(|| get("GEMINI_API_KEY"))
            .ok_or_else(|| ConfigError::MissingEnvVar("GOOGLE_API_KEY".to_string()))?;
        let api_base_url = get("GOOGLE_API_BASE_URL");
        let public_url = get("AGENT_URL").unwrap_or_else(|| format!("http://{host}:{port}/"));
        let max_iterations = parse_or(get("MAX_ITERATIONS"), "MAX_ITERATIONS", DEFAULT_MAX_ITERATIONS)?;

        if max_iterations == 0 {
            return Err(ConfigError::InvalidValue {
                name: "MAX_ITERATIONS".to_string(),
                message: "must be at least 1".to_string(),
            });
        }

        Ok(Self {
            host,
            port,
            model,
            api_key,
            api_base_url,
            public_url,
            max_iterations,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn google_model_config(&self) -> GoogleModelConfig {
        GoogleModelConfig::new(self.api_key.clone(), self.model.clone())
            .with_api_base_url(self.api_base_url.clone())
    }
}

fn parse_or<T>(value: Option<String>, name: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        Some(raw) => raw.trim().parse().map_err(|err: T::Err| ConfigError::InvalidValue {
            name: name.to_string(),
            message: format!("{raw:?}: {err}"),
        }),
        None => Ok(default),
    }
}
