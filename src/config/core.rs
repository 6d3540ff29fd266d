use super::LazyparConfig;
use anyhow::{Context, Result};
use figment::{
    Figment,
    providers::{Env, Format, Json, Serialized, Toml},
};
use std::path::Path;

// Embed the default config at compile time
const DEFAULT_CONFIG: &str = include_str!("../../default-config.toml");

impl LazyparConfig {
    pub fn load() -> Result<Self> {
        Self::load_with_custom_config(None)
    }

    pub fn load_with_custom_config(custom_config: Option<&str>) -> Result<Self> {
        Self::figment(custom_config)
            .extract()
            .context("Failed to load lazypar configuration")
    }

    /// Merged provider chain, lowest priority first
    pub fn figment(custom_config: Option<&str>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(LazyparConfig::default()))
            .merge(Toml::string(DEFAULT_CONFIG)); // Embedded defaults

        // If custom config is specified, use only that + defaults + env vars
        if let Some(custom_path) = custom_config {
            figment = Self::merge_file(figment, Path::new(custom_path));
        } else {
            let user_config = Self::user_config_path();
            figment = figment
                // User config
                .merge(Toml::file(&user_config))
                .merge(Json::file(user_config.replace(".toml", ".json")))
                // Project config
                .merge(Toml::file("lazypar.toml"))
                .merge(Json::file("lazypar.json"));
        }

        // Environment variables always have highest priority
        figment.merge(Env::prefixed("LAZYPAR_").split("__"))
    }

    fn merge_file(figment: Figment, path: &Path) -> Figment {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("")
            .to_lowercase();

        match extension.as_str() {
            "json" => figment.merge(Json::file(path)),
            _ => figment.merge(Toml::file(path)),
        }
    }

    /// Location of the per-user configuration file
    pub fn user_config_path() -> String {
        match std::env::var("HOME") {
            Ok(home) => format!("{home}/.config/lazypar/config.toml"),
            Err(_) => "~/.config/lazypar/config.toml".to_string(),
        }
    }
}
