use crate::config::Config;
use crate::providers::{HuggingFaceProvider, OpenAIProvider};
use crate::traits::Provider;
use anyhow::{Result, anyhow};
use std::sync::Arc;

pub fn create_provider(config: &Config) -> Result<Arc<dyn Provider>> {
    create_provider_with_env(config, |key| std::env::var(key).ok())
}

fn create_provider_with_env<F>(config: &Config, lookup: F) -> Result<Arc<dyn Provider>>
where
    F: Fn(&str) -> Option<String>,
{
    let provider_name = config.provider.as_deref().unwrap_or("huggingface");

    match provider_name.to_lowercase().as_str() {
        "huggingface" | "hf" => {
            let api_token = resolve_api_key_with_fallback(
                &["HUGGINGFACEHUB_API_TOKEN", "HF_TOKEN", "ZEPHYR_API_KEY"],
                &config.api_key,
                &lookup,
            )
            .map_err(|_| {
                anyhow!("Token not found. Set HUGGINGFACEHUB_API_TOKEN or run `zephyr onboard`.")
            })?;
            let mut provider = HuggingFaceProvider::new(api_token).with_model(config.model.clone());
            if let Some(base_url) = &config.base_url {
                provider = provider.with_base_url(base_url.clone());
            }
            Ok(Arc::new(provider))
        }
        "openai" => {
            let api_key = resolve_api_key_with_fallback(
                &["OPENAI_API_KEY", "ZEPHYR_API_KEY"],
                &config.api_key,
                &lookup,
            )?;
            let mut provider = OpenAIProvider::new(api_key).with_model(config.model.clone());
            if let Some(base_url) = &config.base_url {
                provider = provider.with_base_url(base_url.clone());
            }
            Ok(Arc::new(provider))
        }
        _ => Err(anyhow!(
            "Unknown provider: {}. Available: huggingface/hf, openai",
            provider_name
        )),
    }
}

fn resolve_api_key_with_fallback<F>(env_vars: &[&str], config_key: &str, lookup: F) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    for var_name in env_vars {
        if let Some(key) = lookup(var_name).filter(|k| !k.trim().is_empty()) {
            return Ok(key);
        }
    }
    if !config_key.is_empty() {
        Ok(config_key.to_string())
    } else {
        Err(anyhow!("No API key found"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn defaults_to_huggingface() {
        let config = Config {
            api_key: "hf_config".into(),
            ..Config::default()
        };
        let provider = create_provider_with_env(&config, no_env).unwrap();
        assert_eq!(provider.name(), "huggingface");
    }

    #[test]
    fn missing_token_is_reported() {
        let err = create_provider_with_env(&Config::default(), no_env)
            .err()
            .unwrap();
        assert!(err.to_string().starts_with("Token not found"));
    }

    #[test]
    fn env_token_beats_config() {
        let lookup = |key: &str| (key == "HF_TOKEN").then(|| "hf_env".to_string());
        let key = resolve_api_key_with_fallback(
            &["HUGGINGFACEHUB_API_TOKEN", "HF_TOKEN"],
            "hf_config",
            lookup,
        )
        .unwrap();
        assert_eq!(key, "hf_env");
    }

    #[test]
    fn openai_and_unknown_providers() {
        let config = Config {
            provider: Some("OpenAI".into()),
            api_key: "sk-test".into(),
            ..Config::default()
        };
        assert_eq!(
            create_provider_with_env(&config, no_env).unwrap().name(),
            "openai"
        );

        let config = Config {
            provider: Some("glm".into()),
            ..Config::default()
        };
        let err = create_provider_with_env(&config, no_env).err().unwrap();
        assert!(err.to_string().contains("Unknown provider: glm"));
    }
}
