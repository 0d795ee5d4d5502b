use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const ZEPHYR_DIR: &str = ".zephyr";

pub const DEFAULT_MODEL: &str = "mistralai/Mistral-7B-Instruct-v0.2";
pub const DEFAULT_MAX_ITERATIONS: usize = 5;
pub const DEFAULT_OBSERVATION_CHARS: usize = 4_000;

/// Generation settings forwarded to the model provider on every turn.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SamplingConfig {
    pub temperature: f64,
    pub top_k: u32,
    pub top_p: f64,
    pub repetition_penalty: f64,
    pub max_new_tokens: u32,
    /// Cut generation as soon as the model starts writing its own observation.
    pub stop: Vec<String>,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            temperature: 0.01,
            top_k: 50,
            top_p: 0.95,
            repetition_penalty: 1.1,
            max_new_tokens: 512,
            stop: [
                "\nObservation",
                "Observation:",
                "<|user|>",
                "<|assistant|>",
                "\n\n\n",
                "Note:",
                "(STOP HERE",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ToolsConfig {
    pub tavily_api_key: Option<String>,
    pub arxiv_max_results: usize,
    pub content_max_chars: usize,
    pub request_timeout_secs: u64,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            tavily_api_key: None,
            arxiv_max_results: 5,
            content_max_chars: 4_000,
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub provider: Option<String>,
    pub api_key: String,
    pub base_url: Option<String>,
    pub model: String,
    pub max_iterations: usize,
    pub max_observation_chars: usize,
    pub sampling: SamplingConfig,
    pub tools: ToolsConfig,
    pub server: ServerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            provider: None,
            api_key: String::new(),
            base_url: None,
            model: DEFAULT_MODEL.to_string(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            max_observation_chars: DEFAULT_OBSERVATION_CHARS,
            sampling: SamplingConfig::default(),
            tools: ToolsConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

pub fn get_zephyr_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(ZEPHYR_DIR)
}

pub fn get_config_path() -> PathBuf {
    get_zephyr_dir().join("config.toml")
}

pub fn ensure_zephyr_dir() -> Result<PathBuf> {
    let zephyr_dir = get_zephyr_dir();

    if !zephyr_dir.exists() {
        std::fs::create_dir_all(&zephyr_dir).with_context(|| {
            format!(
                "Failed to create zephyr directory at {}",
                zephyr_dir.display()
            )
        })?;
    }

    Ok(zephyr_dir)
}

impl Config {
    /// Reads `~/.zephyr/config.toml` when present, then layers the process
    /// environment on top.
    pub fn load() -> Result<Self> {
        let mut config = if config_exists() {
            load_config()?
        } else {
            Config::default()
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Applies environment overrides using `lookup` so callers (and tests)
    /// can supply their own source of variables.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(provider) = non_empty("ZEPHYR_PROVIDER") {
            self.provider = Some(provider);
        }
        if let Some(model) = non_empty("ZEPHYR_MODEL") {
            self.model = model;
        }
        if let Some(base_url) = non_empty("ZEPHYR_BASE_URL") {
            self.base_url = Some(base_url);
        }
        if let Some(key) = non_empty("ZEPHYR_API_KEY") {
            self.api_key = key;
        }
        if let Some(key) = non_empty("TAVILY_API_KEY") {
            self.tools.tavily_api_key = Some(key);
        }
        if let Some(host) = non_empty("ZEPHYR_HOST") {
            self.server.host = host;
        }
        if let Some(port) = non_empty("ZEPHYR_PORT") {
            self.server.port = port
                .parse()
                .with_context(|| format!("Invalid ZEPHYR_PORT value '{port}'"))?;
        }
        if let Some(max) = non_empty("ZEPHYR_MAX_ITERATIONS") {
            self.max_iterations = max
                .parse()
                .with_context(|| format!("Invalid ZEPHYR_MAX_ITERATIONS value '{max}'"))?;
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            bail!("No model configured");
        }
        if self.max_iterations == 0 {
            bail!("max_iterations must be at least 1");
        }
        if self.max_observation_chars == 0 {
            bail!("max_observation_chars must be at least 1");
        }
        if self.sampling.temperature < 0.0 {
            bail!("sampling.temperature must not be negative");
        }
        if !(self.sampling.top_p > 0.0 && self.sampling.top_p <= 1.0) {
            bail!("sampling.top_p must be in (0, 1]");
        }
        if self.sampling.max_new_tokens == 0 {
            bail!("sampling.max_new_tokens must be at least 1");
        }
        Ok(())
    }
}

pub fn load_config() -> Result<Config> {
    let config_path = get_config_path();

    let content = std::fs::read_to_string(&config_path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            anyhow::anyhow!(
                "Config file not found. Run 'zephyr onboard' to set up your configuration."
            )
        } else {
            anyhow::anyhow!("Failed to read config from {}: {}", config_path.display(), e)
        }
    })?;

    parse_config(&content)
        .with_context(|| format!("Failed to parse config from {}", config_path.display()))
}

pub fn parse_config(content: &str) -> Result<Config> {
    Ok(toml::from_str(content)?)
}

pub fn save_config(config: &Config) -> Result<()> {
    ensure_zephyr_dir()?;

    let config_path = get_config_path();
    let content =
        toml::to_string_pretty(config).with_context(|| "Failed to serialize config to TOML")?;

    std::fs::write(&config_path, content)
        .with_context(|| format!("Failed to write config to {}", config_path.display()))?;

    Ok(())
}

pub fn config_exists() -> bool {
    get_config_path().exists()
}
