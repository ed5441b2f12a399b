use anyhow::{Result, anyhow};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use toml::{Table, Value};

const DEFAULTS: &str = include_str!("../../config/default.toml");

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub general: GeneralConfig,
    pub catalogs: CatalogsConfig,
    pub installer: InstallerConfig,
    pub ui: UiConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneralConfig {
    #[serde(default)]
    pub catalog_dir: Option<String>,
    pub log_filter: String,
}

/// Sub-directory of `catalog_dir` backing each catalog.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogsConfig {
    pub packages: String,
    pub extensions: String,
}

/// Argument vectors the item name (or service name) is appended to.
#[derive(Debug, Clone, Deserialize)]
pub struct InstallerConfig {
    pub package_command: Vec<String>,
    pub extension_command: Vec<String>,
    pub service_command: Vec<String>,
    pub user_service_command: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UiConfig {
    pub tick_rate_ms: u64,
    pub log_history: usize,
}

impl AppConfig {
    /// Load configuration with layering: defaults → user config.
    pub fn load() -> Result<Self> {
        let mut config = Self::defaults()?;

        if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "archutils") {
            let config_path = proj_dirs.config_dir().join("config.toml");
            if config_path.exists() {
                let user_str = fs::read_to_string(&config_path)?;
                config = Self::layered(&user_str)
                    .map_err(|err| anyhow!("{}: {err}", config_path.display()))?;
            }
        }

        if let Some(dir) = config.general.catalog_dir.as_mut()
            && dir.starts_with('~')
        {
            let home = dirs_home().ok_or_else(|| anyhow!("cannot determine home directory"))?;
            *dir = dir.replacen('~', &home.to_string_lossy(), 1);
        }

        Ok(config)
    }

    pub fn defaults() -> Result<Self> {
        Ok(toml::from_str(DEFAULTS)?)
    }

    /// Applies the keys present in `user` on top of the embedded defaults.
    fn layered(user: &str) -> Result<Self> {
        let mut base: Table = toml::from_str(DEFAULTS)?;
        let overlay: Table = toml::from_str(user)?;
        merge(&mut base, overlay);
        let config: Self = Value::Table(base).try_into()?;
        Ok(config)
    }

    pub fn catalog_dir(&self) -> PathBuf {
        match &self.general.catalog_dir {
            Some(dir) => PathBuf::from(dir),
            None => directories::ProjectDirs::from("", "", "archutils")
                .map(|d| d.data_dir().join("catalogs"))
                .unwrap_or_else(|| PathBuf::from("catalogs")),
        }
    }
}

/// Tables merge key by key; any other value replaces the base one.
fn merge(base: &mut Table, overlay: Table) {
    for (key, value) in overlay {
        match value {
            Value::Table(overlay_table) => {
                if let Some(Value::Table(base_table)) = base.get_mut(&key) {
                    merge(base_table, overlay_table);
                } else {
                    base.insert(key, Value::Table(overlay_table));
                }
            }
            value => {
                base.insert(key, value);
            }
        }
    }
}

fn dirs_home() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_defaults_parse() {
        let config = AppConfig::defaults().unwrap();
        assert_eq!(config.catalogs.packages, "packages");
        assert_eq!(config.catalogs.extensions, "vscode");
        assert_eq!(config.installer.package_command[0], "paru");
        assert!(config.general.catalog_dir.is_none());
        assert!(config.ui.log_history > 0);
    }

    #[test]
    fn explicit_catalog_dir_wins() {
        let mut config = AppConfig::defaults().unwrap();
        config.general.catalog_dir = Some("/srv/catalogs".to_string());
        assert_eq!(config.catalog_dir(), PathBuf::from("/srv/catalogs"));
    }

    #[test]
    fn partial_user_file_keeps_other_defaults() {
        let config = AppConfig::layered("[general]\ncatalog_dir = \"~/cats\"\n").unwrap();
        let defaults = AppConfig::defaults().unwrap();

        assert_eq!(config.general.catalog_dir.as_deref(), Some("~/cats"));
        assert_eq!(config.general.log_filter, defaults.general.log_filter);
        assert_eq!(config.catalogs.packages, "packages");
        assert_eq!(config.installer.package_command, defaults.installer.package_command);
        assert_eq!(config.ui.tick_rate_ms, defaults.ui.tick_rate_ms);
    }

    #[test]
    fn user_arrays_replace_default_arrays() {
        let config = AppConfig::layered(
            "[installer]\nextension_command = [\"code\", \"--install-extension\"]\n",
        )
        .unwrap();
        assert_eq!(config.installer.extension_command, vec!["code", "--install-extension"]);
        assert_eq!(config.installer.package_command[0], "paru");
    }

    #[test]
    fn empty_user_file_is_the_defaults() {
        let config = AppConfig::layered("").unwrap();
        assert_eq!(config.ui.log_history, AppConfig::defaults().unwrap().ui.log_history);
    }

    #[test]
    fn wrong_type_in_user_file_is_rejected() {
        assert!(AppConfig::layered("[ui]\ntick_rate_ms = \"fast\"\n").is_err());
    }
}
