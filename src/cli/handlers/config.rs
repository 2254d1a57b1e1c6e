//! Configuration management handler
//!
//! Shows, initializes and locates the configuration files.

use super::super::{CliContext, ConfigAction};
use crate::config::ConfigManager;
use anyhow::Result;
use std::path::PathBuf;

/// Handler for configuration operations
pub struct ConfigHandler<'a> {
    context: &'a CliContext,
}

impl<'a> ConfigHandler<'a> {
    /// Create new configuration handler
    pub fn new(context: &'a CliContext) -> Self {
        Self { context }
    }

    pub fn handle(&self, action: ConfigAction) -> Result<()> {
        match action {
            ConfigAction::Show => {
                println!("{}", toml::to_string_pretty(self.context.config_manager.config())?);
            }
            ConfigAction::Init { global, force } => self.handle_init(global, force)?,
            ConfigAction::Path => {
                let manager = &self.context.config_manager;
                println!("config: {}", manager.config_path().display());
                match manager.events_dir() {
                    Some(dir) => println!("events: {}", dir.display()),
                    None => println!("events: none"),
                }
            }
        }
        Ok(())
    }

    fn handle_init(&self, global: bool, force: bool) -> Result<()> {
        let project = if global {
            None
        } else {
            Some(
                self.context
                    .project_path
                    .clone()
                    .unwrap_or_else(|| PathBuf::from(".")),
            )
        };

        let config_path = ConfigManager::get_config_path(project)?;
        let existed = config_path.exists();

        let mut manager = ConfigManager::from_path(config_path.clone())?;
        if let Some(events_dir) = manager.events_dir() {
            std::fs::create_dir_all(&events_dir)?;
            println!("Event files go in: {}", events_dir.display());
        }

        if existed && !force {
            println!("Configuration already initialized at: {}", config_path.display());
            println!("Use --force to overwrite");
            return Ok(());
        }

        if force {
            *manager.config_mut() = Default::default();
        }
        manager.save()?;
        println!("Configuration initialized successfully at: {}", config_path.display());
        Ok(())
    }
}
