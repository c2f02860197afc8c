use anyhow::{bail, Result};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Dev,
    Staging,
    Prod,
}

impl Environment {
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "prod" | "production" => Self::Prod,
            "staging" => Self::Staging,
            _ => Self::Dev,
        }
    }

    pub fn is_dev(&self) -> bool {
        matches!(self, Self::Dev)
    }

    pub fn is_prod(&self) -> bool {
        matches!(self, Self::Prod)
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub env: Environment,
    pub server_addr: String,

    // CORS
    pub cors_allow_origins: Vec<String>,

    // Text generation backend
    pub use_mock: bool,
    pub ai_api_base: String,
    pub ai_api_key: String,
    pub ai_model: String,
    pub ai_timeout_seconds: u64,

    // Reference data
    pub rack_units_path: PathBuf,
    pub prompts_dir: PathBuf,
    pub provider_name: String,
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        let env = Environment::from_str(&var_or("ENV", "dev"));
        let server_addr = var_or("SERVER_ADDR", "0.0.0.0:5050");

        // CORS
        let cors_allow_origins = var_or("CORS_ALLOW_ORIGINS", "http://localhost:5173")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        // Text generation backend
        let use_mock = var_or("USE_MOCK", "0") == "1";
        let ai_api_base = var_or("AI_API_BASE", "");
        let ai_api_key = var_or("AI_API_KEY", "");
        if !use_mock && (ai_api_base.is_empty() || ai_api_key.is_empty()) {
            bail!("AI_API_BASE and AI_API_KEY must be set unless USE_MOCK=1");
        }
        let ai_model = var_or("AI_MODEL", "meta/llama-3.3-70b-instruct");
        let ai_timeout_seconds = env::var("AI_TIMEOUT_SECONDS")
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(60);

        // Reference data
        let rack_units_path = PathBuf::from(var_or("RACK_UNITS_PATH", "data/rack_units.json"));
        let prompts_dir = PathBuf::from(var_or("PROMPTS_DIR", "prompts"));
        let provider_name = var_or("PROVIDER_NAME", "WWT");

        Ok(Settings {
            env,
            server_addr,
            cors_allow_origins,
            use_mock,
            ai_api_base,
            ai_api_key,
            ai_model,
            ai_timeout_seconds,
            rack_units_path,
            prompts_dir,
            provider_name,
        })
    }

    /// Settings for an in-process test server backed by the mock generator.
    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            env: Environment::Dev,
            server_addr: "127.0.0.1:0".to_string(),
            cors_allow_origins: vec!["http://localhost:5173".to_string()],
            use_mock: true,
            ai_api_base: String::new(),
            ai_api_key: String::new(),
            ai_model: "mock".to_string(),
            ai_timeout_seconds: 5,
            rack_units_path: PathBuf::from("data/rack_units.json"),
            prompts_dir: PathBuf::from("prompts"),
            provider_name: "WWT".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_parsing() {
        assert_eq!(Environment::from_str("Production"), Environment::Prod);
        assert_eq!(Environment::from_str("staging"), Environment::Staging);
        assert_eq!(Environment::from_str("anything"), Environment::Dev);
        assert!(Environment::Dev.is_dev());
        assert!(Environment::Prod.is_prod());
    }
}
