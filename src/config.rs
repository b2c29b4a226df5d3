use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub mistral: MistralConfig,
    pub chunking: ChunkingConfig,
    pub retrieval: RetrievalConfig,
    pub limits: LimitsConfig,
    pub baseline: BaselineConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3000".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MistralConfig {
    pub chat_model: String,
    pub embed_model: String,
    pub temperature: f32,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub backoff_cap_secs: u64,
}

impl Default for MistralConfig {
    fn default() -> Self {
        Self {
            chat_model: "mistral-small-latest".to_string(),
            embed_model: "mistral-embed".to_string(),
            temperature: 0.2,
            timeout_secs: 30,
            max_retries: 3,
            backoff_cap_secs: 10,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ChunkingConfig {
    pub max_chars: usize,
    pub overlap_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chars: 1000,
            overlap_chars: 200,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 5 }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LimitsConfig {
    pub rate_window_ms: u64,
    pub rate_max_requests: u32,
    pub max_message_chars: usize,
    pub max_upload_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            rate_window_ms: 60_000,
            rate_max_requests: 20,
            max_message_chars: 1000,
            max_upload_bytes: 20 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BaselineConfig {
    pub path: PathBuf,
}

impl Default for BaselineConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/baseline.json"),
        }
    }
}

/// Loads configuration from a TOML file, falling back to built-in defaults
/// when the file does not exist, then applies environment overrides
/// (`PORT`, `RATE_LIMIT_WINDOW_MS`, `RATE_LIMIT_MAX_REQUESTS`).
pub fn load_config(path: &Path) -> Result<Config> {
    let mut config = if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content).with_context(|| "Failed to parse config file")?
    } else {
        Config::default()
    };

    apply_env_overrides(&mut config)?;
    validate(&config)?;
    Ok(config)
}

fn apply_env_overrides(config: &mut Config) -> Result<()> {
    if let Ok(port) = std::env::var("PORT") {
        let port: u16 = port
            .parse()
            .with_context(|| format!("Invalid PORT value: {}", port))?;
        let host = config
            .server
            .bind
            .rsplit_once(':')
            .map(|(h, _)| h.to_string())
            .unwrap_or_else(|| config.server.bind.clone());
        config.server.bind = format!("{}:{}", host, port);
    }

    if let Ok(window) = std::env::var("RATE_LIMIT_WINDOW_MS") {
        config.limits.rate_window_ms = window
            .parse()
            .with_context(|| format!("Invalid RATE_LIMIT_WINDOW_MS value: {}", window))?;
    }

    if let Ok(max) = std::env::var("RATE_LIMIT_MAX_REQUESTS") {
        config.limits.rate_max_requests = max
            .parse()
            .with_context(|| format!("Invalid RATE_LIMIT_MAX_REQUESTS value: {}", max))?;
    }

    Ok(())
}

fn validate(config: &Config) -> Result<()> {
    if config.chunking.max_chars == 0 {
        anyhow::bail!("chunking.max_chars must be > 0");
    }
    if config.chunking.overlap_chars >= config.chunking.max_chars {
        anyhow::bail!("chunking.overlap_chars must be < chunking.max_chars");
    }
    if config.retrieval.top_k < 1 {
        anyhow::bail!("retrieval.top_k must be >= 1");
    }
    if config.limits.rate_window_ms == 0 {
        anyhow::bail!("limits.rate_window_ms must be > 0");
    }
    if config.limits.rate_max_requests < 1 {
        anyhow::bail!("limits.rate_max_requests must be >= 1");
    }
    if config.limits.max_message_chars < 1 {
        anyhow::bail!("limits.max_message_chars must be >= 1");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(validate(&config).is_ok());
        assert_eq!(config.retrieval.top_k, 5);
        assert_eq!(config.limits.max_message_chars, 1000);
    }

    #[test]
    fn rejects_overlap_not_below_max() {
        let mut config = Config::default();
        config.chunking.max_chars = 100;
        config.chunking.overlap_chars = 100;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let config = load_config(Path::new("/nonexistent/rfia.toml")).unwrap();
        assert_eq!(config.mistral.chat_model, "mistral-small-latest");
    }
}
