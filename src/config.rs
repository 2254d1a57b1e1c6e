use crate::errors::{AppError, AppResult, ErrorContextExt};
use crate::popup::DisplayConfig;
use directories::BaseDirs;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

// Re-export shared types for convenience
pub use crate::shared::config::{AppConfig, BusConfig, Config, DaemonConfig, EventsFile};

const CONFIG_DIR_NAME: &str = "popup-notifier";
const PROJECT_DIR_NAME: &str = ".popup-notifier";
const EVENTS_FILE_SUFFIX: &str = ".notifyrc.toml";

/// Configuration manager for the popup notifier
///
/// Handles loading, saving, and managing configuration for both project-level
/// and global configurations. Project configurations take precedence over global ones.
///
/// # Configuration Hierarchy
///
/// 1. **Project-level**: `.popup-notifier/config.toml` in project root
/// 2. **Global**: `<user config dir>/popup-notifier/config.toml`
///
/// # Example
///
/// ```rust,no_run
/// use popup_notifier::config::ConfigManager;
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config_manager = ConfigManager::new(None)?;
///     println!("Call timeout: {} ms", config_manager.config().bus.call_timeout_ms);
///     Ok(())
/// }
/// ```
pub struct ConfigManager {
    config_path: PathBuf,
    config: Config,
}

impl ConfigManager {
    /// Creates a new ConfigManager instance
    ///
    /// With a project path, the project config is used when it exists, then the
    /// global one; when neither exists a project config is created.
    ///
    /// # Errors
    ///
    /// This function will return an error if:
    /// - The configuration directory cannot be created
    /// - The configuration file cannot be read or parsed
    /// - Default configuration cannot be serialized and written
    pub fn new(project_path: Option<PathBuf>) -> AppResult<Self> {
        if let Some(ref path) = project_path {
            let project_config_path = Self::get_config_path(Some(path.clone()))?;
            if project_config_path.exists() {
                return Self::from_path(project_config_path);
            }

            let global_config_path = Self::get_config_path(None)?;
            if global_config_path.exists() {
                return Self::from_path(global_config_path);
            }

            Self::from_path(project_config_path)
        } else {
            Self::from_path(Self::get_config_path(None)?)
        }
    }

    /// Load (or create with defaults) the config file at an explicit location
    pub fn from_path(config_path: PathBuf) -> AppResult<Self> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .in_file_operation(parent, "create config directory")?;
        }
        let config = Self::load_or_create(&config_path)?;
        Ok(ConfigManager {
            config_path,
            config,
        })
    }

    pub fn get_config_path(project_path: Option<PathBuf>) -> AppResult<PathBuf> {
        let base_path = match project_path {
            Some(path) => path.join(PROJECT_DIR_NAME),
            None => Self::global_dir()?,
        };
        Ok(base_path.join("config.toml"))
    }

    /// `<user config dir>/popup-notifier`
    pub fn global_dir() -> AppResult<PathBuf> {
        let base_dirs =
            BaseDirs::new().ok_or_else(|| AppError::config("Failed to get base directories"))?;
        Ok(base_dirs.config_dir().join(CONFIG_DIR_NAME))
    }

    fn load_or_create(path: &Path) -> AppResult<Config> {
        if path.exists() {
            let content = fs::read_to_string(path).in_file_operation(path, "read config file")?;
            toml::from_str(&content)
                .map_err(|e| AppError::config_with_source("Failed to parse config file", e))
        } else {
            let config = Config::default();
            let content = toml::to_string_pretty(&config)
                .map_err(|e| AppError::config_with_source("Failed to serialize default config", e))?;
            fs::write(path, content).in_file_operation(path, "write default config")?;
            Ok(config)
        }
    }

    /// Saves the current configuration to the file it was loaded from
    pub fn save(&self) -> AppResult<()> {
        let content = toml::to_string_pretty(&self.config).with_context("Failed to serialize config")?;
        fs::write(&self.config_path, content)
            .in_file_operation(&self.config_path, "write config file")?;
        Ok(())
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// After modifying the configuration, call [`save()`](Self::save) to persist changes.
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// Directory holding the per-application event files
    pub fn events_dir(&self) -> Option<PathBuf> {
        self.config.app.events_dir.clone().or_else(|| {
            self.config_path
                .parent()
                .map(|dir| dir.join("events"))
        })
    }
}

/// Per-application event files, loaded lazily and cached
///
/// A missing file is not an error: the application simply has no event
/// configuration and every event falls back to defaults.
#[derive(Debug, Default)]
pub struct EventsRegistry {
    dir: Option<PathBuf>,
    cache: HashMap<String, Arc<EventsFile>>,
}

impl EventsRegistry {
    pub fn new(dir: Option<PathBuf>) -> Self {
        Self {
            dir,
            cache: HashMap::new(),
        }
    }

    /// Path of `<dir>/<app>.notifyrc.toml`
    pub fn events_path(&self, app_name: &str) -> Option<PathBuf> {
        self.dir
            .as_ref()
            .map(|dir| dir.join(format!("{}{}", app_name, EVENTS_FILE_SUFFIX)))
    }

    /// Event file of an application, empty when there is none
    pub fn events(&mut self, app_name: &str) -> Arc<EventsFile> {
        if let Some(events) = self.cache.get(app_name) {
            return Arc::clone(events);
        }

        let events = match self.events_path(app_name) {
            Some(path) => match load_events_file(&path) {
                Ok(Some(events)) => {
                    debug!("Loaded events for '{}' from {}", app_name, path.display());
                    events
                }
                Ok(None) => EventsFile::default(),
                Err(e) => {
                    warn!(category = e.category(), "Ignoring events file: {}", e);
                    EventsFile::default()
                }
            },
            None => EventsFile::default(),
        };

        let events = Arc::new(events);
        self.cache.insert(app_name.to_string(), Arc::clone(&events));
        events
    }

    pub fn display_config(&mut self, app_name: &str, event_id: &str) -> DisplayConfig {
        DisplayConfig::new(app_name, event_id).with_events(self.events(app_name))
    }

    /// Forget every cached file; the next lookup reads from disk again
    pub fn reload(&mut self) {
        debug!("Dropping {} cached event files", self.cache.len());
        self.cache.clear();
    }
}

fn load_events_file(path: &Path) -> AppResult<Option<EventsFile>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path).in_file_operation(path, "read events file")?;
    let events = toml::from_str(&content)
        .with_context_lazy(|| format!("Failed to parse {}", path.display()))?;
    Ok(Some(events))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_from_path_creates_default_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let manager = ConfigManager::from_path(path.clone()).unwrap();
        assert!(path.exists());
        assert_eq!(manager.config(), &Config::default());
        assert_eq!(manager.events_dir(), Some(dir.path().join("nested").join("events")));
    }

    #[test]
    fn test_save_round_trips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let mut manager = ConfigManager::from_path(path.clone()).unwrap();
        manager.config_mut().bus.call_timeout_ms = 500;
        manager.config_mut().app.desktop_entry = Some("org.example.App".into());
        manager.save().unwrap();

        let reloaded = ConfigManager::from_path(path).unwrap();
        assert_eq!(reloaded.config().bus.call_timeout_ms, 500);
        assert_eq!(
            reloaded.config().app.desktop_entry.as_deref(),
            Some("org.example.App")
        );
    }

    #[test]
    fn test_project_config_path() {
        let path = ConfigManager::get_config_path(Some(PathBuf::from("/work/project"))).unwrap();
        assert_eq!(path, PathBuf::from("/work/project/.popup-notifier/config.toml"));
    }

    #[test]
    fn test_invalid_config_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[bus]\ncall_timeout_ms = \"soon\"\n").unwrap();

        let err = ConfigManager::from_path(path).err().unwrap();
        assert_eq!(err.category(), "config");
    }

    #[test]
    fn test_registry_loads_and_caches() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("builder.notifyrc.toml"),
            "[global]\nname = \"Builder\"\n\n[events.done]\nicon_name = \"emblem-ok\"\n",
        )
        .unwrap();

        let mut registry = EventsRegistry::new(Some(dir.path().to_path_buf()));
        let config = registry.display_config("builder", "done");
        assert_eq!(config.caption(), "Builder");
        assert_eq!(config.icon_name(), "emblem-ok");

        fs::write(dir.path().join("builder.notifyrc.toml"), "[global]\nname = \"Other\"\n").unwrap();
        assert_eq!(registry.display_config("builder", "done").caption(), "Builder");

        registry.reload();
        assert_eq!(registry.display_config("builder", "done").caption(), "Other");
    }

    #[test]
    fn test_registry_tolerates_missing_and_broken_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("broken.notifyrc.toml"), "[global\n").unwrap();

        let mut registry = EventsRegistry::new(Some(dir.path().to_path_buf()));
        assert_eq!(*registry.events("missing"), EventsFile::default());
        assert_eq!(*registry.events("broken"), EventsFile::default());
        assert_eq!(registry.display_config("missing", "e").caption(), "missing");
    }

    #[test]
    fn test_registry_without_directory() {
        let mut registry = EventsRegistry::new(None);
        assert!(registry.events_path("app").is_none());
        assert!(registry.display_config("app", "e").shows_popup());
    }
}
