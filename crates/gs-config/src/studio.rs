use gs_quota::PlanTable;
use serde::{Deserialize, Serialize};

use crate::auth::AuthConfig;
use crate::generation::GenerationConfig;
use crate::paths::ConfigPaths;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StudioConfig {
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    /// Plans listed in the file are merged over the built-in table.
    #[serde(default)]
    pub plans: PlanTable,
    #[serde(skip)]
    paths: Option<ConfigPaths>,
}

impl StudioConfig {
    /// Returns the `ConfigPaths` for this config, falling back to the default
    /// location (may fail if `$HOME` is unset).
    pub fn paths(&self) -> anyhow::Result<ConfigPaths> {
        match &self.paths {
            Some(p) => Ok(p.clone()),
            None => ConfigPaths::new(),
        }
    }

    pub fn set_paths(&mut self, paths: ConfigPaths) {
        self.paths = Some(paths);
    }

    /// Load config from the default location (`~/.genstudio/config.toml`).
    pub fn load() -> anyhow::Result<Self> {
        let paths = ConfigPaths::new()?;
        Self::load_from(&paths)
    }

    pub fn load_from(paths: &ConfigPaths) -> anyhow::Result<Self> {
        let config_file = paths.config_path();
        let mut config = if config_file.exists() {
            let content = std::fs::read_to_string(&config_file)?;
            let mut config: StudioConfig = toml::from_str(&content)?;
            config.plans = PlanTable::default().merged_with(&config.plans);
            config
        } else {
            Self::default()
        };
        config.paths = Some(paths.clone());
        config.validate()?;
        Ok(config)
    }

    /// Validate config values. Called automatically by `load` / `load_from`.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.plans.validate()?;
        let g = &self.generation;
        if g.api_base_url.trim().is_empty() {
            anyhow::bail!("generation.api_base_url must not be empty");
        }
        if g.api_key_env.trim().is_empty() {
            anyhow::bail!("generation.api_key_env must not be empty");
        }
        for (field, model) in [
            ("image_model", &g.image_model),
            ("speech_model", &g.speech_model),
            ("video_model", &g.video_model),
        ] {
            if model.trim().is_empty() {
                anyhow::bail!("generation.{} must not be empty", field);
            }
        }
        if g.poll_interval_secs == 0 {
            anyhow::bail!("generation.poll_interval_secs must be greater than 0");
        }
        if g.request_timeout_secs == 0 {
            anyhow::bail!("generation.request_timeout_secs must be greater than 0");
        }
        Ok(())
    }

    pub fn to_toml(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
