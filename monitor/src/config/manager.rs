// File: monitor/src/config/manager.rs
use super::{Config, SiteConfigFile};
use anyhow::{anyhow, Result};
use glob::glob;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info};

use crate::database::{Database, SiteRecord};

pub struct ConfigManager {
    current_config: Arc<Config>,
}

impl ConfigManager {
    pub async fn new(config_dir: String) -> Result<Self> {
        let config = Self::load_configuration(&config_dir).await?;
        Ok(Self {
            current_config: Arc::new(config),
        })
    }

    pub fn get_current_config(&self) -> Arc<Config> {
        self.current_config.clone()
    }

    async fn load_configuration(config_dir: &str) -> Result<Config> {
        let main_config_path = format!("{}/main.toml", config_dir);
        let main_config_content = fs::read_to_string(&main_config_path)
            .await
            .map_err(|e| anyhow!("Failed to read main config {}: {}", main_config_path, e))?;

        let mut config: Config = toml::from_str(&main_config_content)
            .map_err(|e| anyhow!("Failed to parse main config: {}", e))?;

        // Load one file per site
        let pattern = format!("{}/*.toml", config_dir);
        let mut sites = HashMap::new();
        let mut monitors = HashMap::new();

        for entry in glob(&pattern).map_err(|e| anyhow!("Glob pattern error: {}", e))? {
            let path = entry.map_err(|e| anyhow!("Glob entry error: {}", e))?;
            let filename = path
                .file_name()
                .and_then(|name| name.to_str())
                .ok_or_else(|| anyhow!("Invalid filename"))?;

            // Skip main.toml as it's already loaded
            if filename == "main.toml" {
                continue;
            }

            let site_id = filename
                .strip_suffix(".toml")
                .ok_or_else(|| anyhow!("Invalid config filename: {}", filename))?;

            debug!("Loading site config: {}", path.display());

            let content = fs::read_to_string(&path)
                .await
                .map_err(|e| anyhow!("Failed to read {}: {}", path.display(), e))?;

            let site_file: SiteConfigFile = toml::from_str(&content)
                .map_err(|e| anyhow!("Failed to parse {}: {}", path.display(), e))?;

            for (monitor_name, monitor_config) in site_file.monitors {
                // Don't double-prefix names that already carry the site id
                let monitor_id = if monitor_name.starts_with(&format!("{}-", site_id)) {
                    monitor_name
                } else {
                    format!("{}-{}", site_id, monitor_name)
                };

                let monitor = monitor_config.into_monitor(&monitor_id, site_id);
                monitor
                    .validate()
                    .map_err(|e| anyhow!("{} in {}", e, path.display()))?;

                monitors.insert(monitor_id, monitor);
            }

            sites.insert(site_id.to_string(), site_file.site);
        }

        config.sites = sites;
        config.monitors = monitors;

        info!(
            "Loaded {} sites, {} monitors",
            config.sites.len(),
            config.monitors.len()
        );

        Ok(config)
    }

    /// Upsert configured sites and monitor definitions. Runtime state of
    /// existing monitors is left untouched.
    pub async fn sync_to_database(&self, database: &Database) -> Result<()> {
        let config = &self.current_config;

        for (site_id, site) in &config.sites {
            database
                .upsert_site(&SiteRecord {
                    id: site_id.clone(),
                    name: site.name.clone(),
                })
                .await?;
        }

        for monitor in config.monitors.values() {
            database.sync_monitor_definition(monitor).await?;
        }

        info!(
            "Synced {} sites and {} monitors to the database",
            config.sites.len(),
            config.monitors.len()
        );
        Ok(())
    }
}
