//! TOML configuration parsing and validation.
//!
//! Every command reads the same file (default `./config/eqa.toml`). Only
//! `[data]` is mandatory; `[matching]`, `[llm]` and `[server]` fall back to
//! the defaults below.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub data: DataConfig,
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Location and format of the two input tables.
#[derive(Debug, Deserialize, Clone)]
pub struct DataConfig {
    pub equipments: PathBuf,
    pub interventions: PathBuf,
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
}

fn default_delimiter() -> String {
    ";".to_string()
}

impl DataConfig {
    /// The delimiter as the single byte expected by the CSV reader.
    pub fn delimiter_byte(&self) -> Result<u8> {
        match self.delimiter.as_bytes() {
            [b] => Ok(*b),
            _ => anyhow::bail!(
                "data.delimiter must be a single ASCII character, got '{}'",
                self.delimiter
            ),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct MatchingConfig {
    #[serde(default = "default_max_candidates")]
    pub max_candidates: usize,
    #[serde(default = "default_cutoff")]
    pub cutoff: f64,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            max_candidates: default_max_candidates(),
            cutoff: default_cutoff(),
        }
    }
}

fn default_max_candidates() -> usize {
    5
}
fn default_cutoff() -> f64 {
    0.5
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            base_url: default_base_url(),
            model: None,
            api_key_env: default_api_key_env(),
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_base_url() -> String {
    "https://api.mistral.ai".to_string()
}
fn default_api_key_env() -> String {
    "MISTRAL_API_KEY".to_string()
}
fn default_temperature() -> f64 {
    0.2
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_max_retries() -> u32 {
    2
}

impl LlmConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let mut config = parse_config(&content)?;

    // Data paths are relative to the config file, not the working directory
    if let Some(base) = path.parent() {
        config.data.equipments = resolve_relative(base, &config.data.equipments);
        config.data.interventions = resolve_relative(base, &config.data.interventions);
    }

    Ok(config)
}

/// Parse and validate configuration text without touching the filesystem.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;

    config.data.delimiter_byte()?;

    if config.matching.max_candidates == 0 {
        anyhow::bail!("matching.max_candidates must be >= 1");
    }

    if !(0.0..=1.0).contains(&config.matching.cutoff) {
        anyhow::bail!("matching.cutoff must be in [0.0, 1.0]");
    }

    if !(0.0..=2.0).contains(&config.llm.temperature) {
        anyhow::bail!("llm.temperature must be in [0.0, 2.0]");
    }

    if config.llm.timeout_secs == 0 {
        anyhow::bail!("llm.timeout_secs must be > 0");
    }

    if config.llm.is_enabled() {
        match config.llm.provider.as_str() {
            "mistral" => {
                if config.llm.model.is_none() {
                    anyhow::bail!(
                        "llm.model must be specified when provider is '{}'",
                        config.llm.provider
                    );
                }
            }
            other => anyhow::bail!(
                "Unknown llm provider: '{}'. Must be disabled or mistral.",
                other
            ),
        }
    }

    Ok(config)
}

fn resolve_relative(base: &Path, p: &Path) -> PathBuf {
    if p.is_absolute() || base.as_os_str().is_empty() {
        p.to_path_buf()
    } else {
        base.join(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[data]
equipments = "equipments.csv"
interventions = "interventions.csv"
"#;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let cfg = parse_config(MINIMAL).unwrap();
        assert_eq!(cfg.data.delimiter_byte().unwrap(), b';');
        assert_eq!(cfg.matching.max_candidates, 5);
        assert!((cfg.matching.cutoff - 0.5).abs() < 1e-9);
        assert!(!cfg.llm.is_enabled());
        assert_eq!(cfg.llm.api_key_env, "MISTRAL_API_KEY");
        assert_eq!(cfg.server.bind, "127.0.0.1:8000");
    }

    #[test]
    fn test_cutoff_out_of_range_rejected() {
        let text = format!("{}\n[matching]\ncutoff = 1.5\n", MINIMAL);
        let err = parse_config(&text).unwrap_err();
        assert!(err.to_string().contains("cutoff"));
    }

    #[test]
    fn test_zero_candidates_rejected() {
        let text = format!("{}\n[matching]\nmax_candidates = 0\n", MINIMAL);
        assert!(parse_config(&text).is_err());
    }

    #[test]
    fn test_multichar_delimiter_rejected() {
        let text = r#"
[data]
equipments = "e.csv"
interventions = "i.csv"
delimiter = ";;"
"#;
        assert!(parse_config(text).is_err());
    }

    #[test]
    fn test_mistral_requires_model() {
        let text = format!("{}\n[llm]\nprovider = \"mistral\"\n", MINIMAL);
        let err = parse_config(&text).unwrap_err();
        assert!(err.to_string().contains("llm.model"));

        let text = format!(
            "{}\n[llm]\nprovider = \"mistral\"\nmodel = \"mistral-small-latest\"\n",
            MINIMAL
        );
        let cfg = parse_config(&text).unwrap();
        assert!(cfg.llm.is_enabled());
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let text = format!("{}\n[llm]\nprovider = \"openai\"\n", MINIMAL);
        assert!(parse_config(&text).is_err());
    }

    #[test]
    fn test_data_paths_resolved_against_config_dir() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("eqa.toml");
        std::fs::write(&path, MINIMAL).unwrap();
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.data.equipments, tmp.path().join("equipments.csv"));
    }
}
