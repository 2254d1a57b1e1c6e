//! CLI Context for dependency injection and shared state
//!
//! This module provides the CliContext abstraction that centralizes
//! configuration management for the CLI handlers.

use crate::config::{Config, ConfigManager};
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// CLI execution context containing shared dependencies and configuration
#[derive(Clone)]
pub struct CliContext {
    pub project_path: Option<PathBuf>,
    pub verbose: bool,
    pub config_manager: Arc<ConfigManager>,
}

impl CliContext {
    /// Create a new CLI context with the specified project path and verbosity
    pub fn new(project_path: Option<PathBuf>, verbose: bool) -> Result<Self> {
        let resolved_project_path = Self::resolve_project_path(project_path);
        let config_manager = Arc::new(ConfigManager::new(resolved_project_path.clone())?);

        Ok(Self {
            project_path: resolved_project_path,
            verbose,
            config_manager,
        })
    }

    /// Auto-detect project path by looking for .popup-notifier/config.toml
    fn resolve_project_path(project_path: Option<PathBuf>) -> Option<PathBuf> {
        if let Some(path) = project_path {
            return Some(path);
        }

        let current_dir = std::env::current_dir().ok()?;
        let config_path = ConfigManager::get_config_path(Some(current_dir.clone())).ok()?;
        config_path.exists().then_some(current_dir)
    }

    /// Effective configuration, with the events directory resolved
    pub fn config(&self) -> Config {
        let mut config = self.config_manager.config().clone();
        config.app.events_dir = self.config_manager.events_dir();
        config
    }

    /// Initialize logging based on verbosity and configuration.
    ///
    /// Console output goes to stderr. With `daemon.log_path` set, a daily
    /// rolling file is written too; keep the returned guard alive until exit.
    pub fn init_logging(&self) -> Result<Option<WorkerGuard>> {
        let config = self.config_manager.config();
        let log_level = if self.verbose {
            "debug"
        } else {
            config.daemon.log_level.as_str()
        };
        let env_filter = EnvFilter::from_default_env()
            .add_directive(log_level.parse().unwrap_or_else(|_| tracing::Level::INFO.into()));

        let console_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

        let guard = match &config.daemon.log_path {
            Some(log_path) => {
                let dir = log_path
                    .parent()
                    .filter(|dir| !dir.as_os_str().is_empty())
                    .unwrap_or_else(|| std::path::Path::new("."));
                std::fs::create_dir_all(dir).context("Failed to create log directory")?;
                let file_name = log_path
                    .file_name()
                    .unwrap_or_else(|| std::ffi::OsStr::new("popup-notifier.log"));

                let file_appender = tracing_appender::rolling::daily(dir, file_name);
                let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
                let file_layer = tracing_subscriber::fmt::layer()
                    .with_writer(file_writer)
                    .with_ansi(false);

                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(console_layer)
                    .with(file_layer)
                    .try_init()
                    .context("Failed to initialize logging")?;
                Some(guard)
            }
            None => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(console_layer)
                    .try_init()
                    .context("Failed to initialize logging")?;
                None
            }
        };

        if self.verbose {
            tracing::debug!("Verbose logging enabled");
            tracing::debug!("Project path: {:?}", self.project_path);
            tracing::debug!("Config path: {:?}", self.config_manager.config_path());
        }

        Ok(guard)
    }
}
