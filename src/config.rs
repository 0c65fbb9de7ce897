use crate::error::{Result, SmetaError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Настройки по умолчанию для листов без собственной схемы
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Разрешённые единицы через запятую
    pub unit_allow_raw: String,
    pub require_qty: bool,
    pub include_empty_sections: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            unit_allow_raw: "м2,м3,шт,пм,компл".into(),
            require_qty: true,
            include_empty_sections: false,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| SmetaError::Config("Не найден домашний каталог".into()))?;
        Ok(home.join(".config").join("smeta-structure").join("config.json"))
    }
}
