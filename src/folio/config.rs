use crate::error::{FolioError, Result};
use crate::store::SearchMethod;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILENAME: &str = "config.json";
const DEFAULT_PAGE_SIZE: usize = 20;

/// One store entry of the workgroup, as persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MemberConfig {
    pub path: PathBuf,

    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Lower values are searched first.
    #[serde(default)]
    pub priority: i32,
}

impl MemberConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            enabled: true,
            priority: 0,
        }
    }
}

/// Configuration for folio, stored in `<config dir>/config.json`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FolioConfig {
    /// Rows per search page
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    #[serde(default)]
    pub search_method: SearchMethod,

    /// Whether two live documents in one store may share a name
    #[serde(default)]
    pub allow_duplicate_names: bool,

    #[serde(default)]
    pub stores: Vec<MemberConfig>,

    #[serde(default)]
    pub selected: Option<PathBuf>,
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

fn default_enabled() -> bool {
    true
}

impl Default for FolioConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            search_method: SearchMethod::default(),
            allow_duplicate_names: false,
            stores: Vec::new(),
            selected: None,
        }
    }
}

impl FolioConfig {
    /// Load config from the given directory, or return defaults if not found
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join(CONFIG_FILENAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path).map_err(FolioError::Io)?;
        let config: FolioConfig =
            serde_json::from_str(&content).map_err(FolioError::Serialization)?;
        Ok(config)
    }

    /// Save config to the given directory
    pub fn save<P: AsRef<Path>>(&self, config_dir: P) -> Result<()> {
        let config_dir = config_dir.as_ref();

        if !config_dir.exists() {
            fs::create_dir_all(config_dir).map_err(FolioError::Io)?;
        }

        let config_path = config_dir.join(CONFIG_FILENAME);
        let content = serde_json::to_string_pretty(self).map_err(FolioError::Serialization)?;
        fs::write(config_path, content).map_err(FolioError::Io)?;
        Ok(())
    }

    /// Page size used for navigation, never zero.
    pub fn page_size(&self) -> usize {
        self.page_size.max(1)
    }

    pub fn add_store(&mut self, path: impl Into<PathBuf>, priority: i32) {
        let path = path.into();
        match self.stores.iter_mut().find(|m| m.path == path) {
            Some(member) => member.priority = priority,
            None => self.stores.push(MemberConfig {
                path,
                enabled: true,
                priority,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = FolioConfig::default();
        assert_eq!(config.page_size, 20);
        assert_eq!(config.search_method, SearchMethod::Heading);
        assert!(!config.allow_duplicate_names);
        assert!(config.stores.is_empty());
    }

    #[test]
    fn test_load_missing_config() {
        let dir = tempdir().unwrap();
        let config = FolioConfig::load(dir.path().join("absent")).unwrap();
        assert_eq!(config, FolioConfig::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let mut config = FolioConfig {
            page_size: 5,
            search_method: SearchMethod::FullText,
            ..FolioConfig::default()
        };
        config.add_store("/tmp/a.db", 1);
        config.add_store("/tmp/b.db", 0);
        config.selected = Some("/tmp/b.db".into());

        config.save(dir.path().join("nested")).unwrap();
        let loaded = FolioConfig::load(dir.path().join("nested")).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILENAME),
            r#"{"stores": [{"path": "/tmp/a.db"}]}"#,
        )
        .unwrap();

        let config = FolioConfig::load(dir.path()).unwrap();
        assert_eq!(config.page_size, 20);
        assert_eq!(config.stores, vec![MemberConfig::new("/tmp/a.db")]);
    }

    #[test]
    fn test_add_store_updates_existing_entry() {
        let mut config = FolioConfig::default();
        config.add_store("/tmp/a.db", 3);
        config.add_store("/tmp/a.db", 1);
        assert_eq!(config.stores.len(), 1);
        assert_eq!(config.stores[0].priority, 1);
    }

    #[test]
    fn test_zero_page_size_is_clamped() {
        let config = FolioConfig {
            page_size: 0,
            ..FolioConfig::default()
        };
        assert_eq!(config.page_size(), 1);
    }
}
