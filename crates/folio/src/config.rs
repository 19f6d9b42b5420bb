use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs::try_exists;

use crate::page::NEW_PAGE_PLACEHOLDER;
use crate::settings::DecorationSettings;

const DEFAULT_AUTOSAVE_NAME: &str = "autosave";

const SAMPLE_TEMPLATE: &str = "\
# Sample Document

This is a demonstration of a paginated rich-text editor. Content is divided \
into pages, and manual page breaks can be placed anywhere in a page.

## Features Included:

- A4 page dimensions with visual boundaries
- Manual page breaks
- Headers and footers with dynamic page numbers
- Print-friendly styling
- Zoom controls for better viewing
- Margin adjustments
- Page thumbnails sidebar
- Watermark support

## Typography Support

The editor supports various text formatting options including **bold**, \
*italic*, ~~strikethrough~~, and different heading levels.

You can also create lists and add links such as https://example.com.
";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub decoration: DecorationSettings,
    pub pages: PageConfig,
    pub autosave: AutosaveConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PageConfig {
    /// HTML given to pages created without content.
    pub new_page_placeholder: String,
    /// Markdown rendered into the first page of a new document.
    pub template: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AutosaveConfig {
    pub enabled: bool,
    pub name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            decoration: DecorationSettings::default(),
            pages: PageConfig::default(),
            autosave: AutosaveConfig::default(),
        }
    }
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            new_page_placeholder: String::from(NEW_PAGE_PLACEHOLDER),
            template: String::from(SAMPLE_TEMPLATE),
        }
    }
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            name: String::from(DEFAULT_AUTOSAVE_NAME),
        }
    }
}

impl Config {
    pub async fn load() -> Result<Self> {
        let Some(config_path) = Self::config_path() else {
            return Ok(Self::default());
        };

        if !try_exists(&config_path).await? {
            log::info!("Config file does not exist, creating default");
            return Ok(Self::write_default().await);
        }

        let content = match tokio::fs::read_to_string(&config_path).await {
            Ok(content) => content,
            Err(io_err) => {
                log::error!("Failed to read config file: {}", io_err);
                return Ok(Self::write_default().await);
            }
        };

        if content.trim().is_empty() {
            log::warn!("Config file is empty, creating new one");
            return Ok(Self::write_default().await);
        }

        match serde_json::from_str::<Self>(&content) {
            Ok(mut config) => {
                config.validate()?;
                log::info!("Successfully loaded config from: {}", config_path.display());
                Ok(config)
            }
            Err(json_err) => {
                log::error!("Failed to parse config file: {}", json_err);
                Self::backup_broken(&config_path).await;
                Ok(Self::write_default().await)
            }
        }
    }

    /// Defaults, written back to disk when possible. A failed write is
    /// logged and the defaults are still used.
    async fn write_default() -> Self {
        let default_config = Self::default();
        if let Err(e) = default_config.save().await {
            log::warn!("Failed to write default config: {:#}", e);
        }
        default_config
    }

    async fn backup_broken(config_path: &Path) {
        let backup_path = config_path.with_extension("bak");
        match tokio::fs::copy(config_path, &backup_path).await {
            Ok(_) => log::info!("Backed up broken config to: {}", backup_path.display()),
            Err(e) => log::warn!("Failed to backup broken config: {}", e),
        }
    }

    pub async fn save(&self) -> Result<()> {
        let Some(config_path) = Self::config_path() else {
            return Ok(());
        };

        let mut config_to_save = self.clone();
        config_to_save.validate()?;

        if let Some(parent) = config_path.parent() {
            tokio::fs::create_dir_all(parent).await.with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
            log::debug!("Config directory exists or was created: {}", parent.display());
        }

        let content =
            serde_json::to_string_pretty(&config_to_save).context("Failed to serialize config")?;
        tokio::fs::write(&config_path, content)
            .await
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;
        log::info!("Successfully saved config to: {}", config_path.display());
        Ok(())
    }

    /// Validate configuration values and fix invalid ones
    pub fn validate(&mut self) -> Result<()> {
        let mut has_issues = false;

        let margins = self.decoration.margins.clamped();
        if margins != self.decoration.margins {
            log::warn!("Margins out of range: {:?}, clamping", self.decoration.margins);
            self.decoration.margins = margins;
            has_issues = true;
        }

        if self.pages.new_page_placeholder.trim().is_empty() {
            log::warn!("Empty new page placeholder, using default");
            self.pages.new_page_placeholder = NEW_PAGE_PLACEHOLDER.to_string();
            has_issues = true;
        }

        if !is_valid_name(&self.autosave.name) {
            log::warn!(
                "Invalid autosave name: {:?}, using default",
                self.autosave.name
            );
            self.autosave.name = DEFAULT_AUTOSAVE_NAME.to_string();
            has_issues = true;
        }

        if has_issues {
            log::info!("Configuration validation completed with corrections");
        }

        Ok(())
    }

    /// First page content for a new document.
    pub fn template_html(&self) -> String {
        pagecore::to_html(&self.pages.template)
    }

    fn config_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("FOLIO_CONFIG_PATH") {
            return Some(PathBuf::from(path));
        }

        if let Ok(dir) = std::env::var("FOLIO_CONFIG_DIR") {
            return Some(PathBuf::from(dir).join("config.json"));
        }

        ProjectDirs::from("com", "folio", "folio").map(|dirs| dirs.config_dir().join("config.json"))
    }
}

/// Names double as file stems, so they must not escape their directory.
pub(crate) fn is_valid_name(name: &str) -> bool {
    !name.trim().is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::MAX_MARGIN;
    use pagecore::marker;
    use std::sync::{Mutex, MutexGuard, OnceLock};
    use tempfile::TempDir;

    fn config_test_lock() -> MutexGuard<'static, ()> {
        static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        LOCK.get_or_init(|| Mutex::new(()))
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }

    struct ConfigEnv {
        previous_dir: Option<String>,
        previous_path: Option<String>,
    }

    impl ConfigEnv {
        fn set(path: &std::path::Path) -> Self {
            let env = Self {
                previous_dir: std::env::var("FOLIO_CONFIG_DIR").ok(),
                previous_path: std::env::var("FOLIO_CONFIG_PATH").ok(),
            };
            std::env::set_var("FOLIO_CONFIG_DIR", path);
            std::env::remove_var("FOLIO_CONFIG_PATH");
            env
        }
    }

    impl Drop for ConfigEnv {
        fn drop(&mut self) {
            match self.previous_dir.take() {
                Some(value) => std::env::set_var("FOLIO_CONFIG_DIR", value),
                None => std::env::remove_var("FOLIO_CONFIG_DIR"),
            }
            match self.previous_path.take() {
                Some(value) => std::env::set_var("FOLIO_CONFIG_PATH", value),
                None => std::env::remove_var("FOLIO_CONFIG_PATH"),
            }
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.decoration.header_text, "Document Header");
        assert_eq!(config.decoration.footer_text, "Document Footer");
        assert_eq!(config.pages.new_page_placeholder, NEW_PAGE_PLACEHOLDER);
        assert!(!config.autosave.enabled);
        assert_eq!(config.autosave.name, "autosave");
    }

    #[test]
    fn test_template_renders_to_html() {
        let html = Config::default().template_html();
        assert!(html.starts_with("<h1>Sample Document</h1>"));
        assert!(html.contains("<strong>bold</strong>"));
        assert!(html.contains("<ul>"));
        assert_eq!(marker::count_page_breaks(&html), 0);
    }

    #[test]
    fn test_validate_corrects_values() {
        let mut config = Config::default();
        config.decoration.margins.left = 900;
        config.pages.new_page_placeholder = "  ".to_string();
        config.autosave.name = "../escape".to_string();

        config.validate().unwrap();
        assert_eq!(config.decoration.margins.left, MAX_MARGIN);
        assert_eq!(config.pages.new_page_placeholder, NEW_PAGE_PLACEHOLDER);
        assert_eq!(config.autosave.name, "autosave");
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"decoration": {"headerText": "Memo"}}"#).unwrap();
        assert_eq!(config.decoration.header_text, "Memo");
        assert_eq!(config.decoration.zoom.percent(), 100);
        assert_eq!(config.pages.new_page_placeholder, NEW_PAGE_PLACEHOLDER);
    }

    #[test]
    fn test_valid_names() {
        assert!(is_valid_name("draft-1"));
        assert!(!is_valid_name(""));
        assert!(!is_valid_name(".."));
        assert!(!is_valid_name("a/b"));
        assert!(!is_valid_name("a\\b"));
    }

    #[tokio::test]
    async fn test_config_load_creates_default() {
        let temp_dir = TempDir::new().unwrap();
        let _guard = config_test_lock();
        let env = ConfigEnv::set(temp_dir.path());

        let config = Config::load().await.unwrap();
        assert_eq!(config.decoration.watermark_text, "CONFIDENTIAL");
        assert!(temp_dir.path().join("config.json").exists());

        drop(env);
    }

    #[tokio::test]
    async fn test_load_falls_back_when_default_cannot_be_written() {
        let temp_dir = TempDir::new().unwrap();
        let occupied = temp_dir.path().join("config.json");
        std::fs::create_dir(&occupied).unwrap();

        let _guard = config_test_lock();
        let env = ConfigEnv::set(temp_dir.path());
        // a directory sits where the file should be: reading and writing both fail
        std::env::set_var("FOLIO_CONFIG_PATH", &occupied);

        let config = Config::load().await.unwrap();
        assert_eq!(config.decoration.footer_text, "Document Footer");
        assert!(occupied.is_dir());

        drop(env);
    }

    #[tokio::test]
    async fn test_broken_config_is_backed_up() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        let _guard = config_test_lock();
        let env = ConfigEnv::set(temp_dir.path());

        let config = Config::load().await.unwrap();
        assert_eq!(config.decoration.header_text, "Document Header");
        assert_eq!(
            std::fs::read_to_string(temp_dir.path().join("config.bak")).unwrap(),
            "{ not json"
        );

        drop(env);
    }
}
