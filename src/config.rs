//! Client configuration file
//!
//! The client remembers its username and joined rooms in a small JSON file,
//! `$HOME/.tiny` by default.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::AppError;

/// File name under the home directory
pub const CONFIG_FILE_NAME: &str = ".tiny";

/// Persisted client preferences
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Username sent as the handshake
    pub username: String,
    /// Rooms the user has joined
    #[serde(default)]
    pub rooms: Vec<String>,
}

impl ClientConfig {
    pub fn new(username: String) -> Self {
        Self {
            username,
            rooms: Vec::new(),
        }
    }

    /// `$HOME/.tiny`, if a home directory is known
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(CONFIG_FILE_NAME))
    }

    /// Load the config; `Ok(None)` when the file does not exist
    pub fn load(path: &Path) -> Result<Option<Self>, AppError> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let config = serde_json::from_str(&text)?;
        debug!("Loaded client config from {}", path.display());
        Ok(Some(config))
    }

    pub fn save(&self, path: &Path) -> Result<(), AppError> {
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, text)?;
        debug!("Saved client config to {}", path.display());
        Ok(())
    }

    pub fn remember_room(&mut self, room: &str) {
        if !self.rooms.iter().any(|r| r == room) {
            self.rooms.push(room.to_string());
        }
    }

    pub fn forget_room(&mut self, room: &str) {
        self.rooms.retain(|r| r != room);
    }

    /// Usernames chosen interactively must be alphabetic
    pub fn is_valid_username(name: &str) -> bool {
        !name.is_empty() && name.chars().all(char::is_alphabetic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = ClientConfig::load(&dir.path().join(CONFIG_FILE_NAME)).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);

        let mut config = ClientConfig::new("alice".to_string());
        config.remember_room("pokemon");
        config.save(&path).unwrap();

        assert_eq!(ClientConfig::load(&path).unwrap(), Some(config));
    }

    #[test]
    fn test_rooms_default_when_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, r#"{"username": "bob"}"#).unwrap();

        let config = ClientConfig::load(&path).unwrap().unwrap();
        assert_eq!(config.username, "bob");
        assert!(config.rooms.is_empty());
    }

    #[test]
    fn test_corrupt_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "not json").unwrap();

        assert!(matches!(ClientConfig::load(&path), Err(AppError::Config(_))));
    }

    #[test]
    fn test_remember_and_forget_rooms() {
        let mut config = ClientConfig::new("alice".to_string());
        config.remember_room("pokemon");
        config.remember_room("pokemon");
        config.remember_room("digimon");
        assert_eq!(config.rooms, vec!["pokemon", "digimon"]);

        config.forget_room("pokemon");
        assert_eq!(config.rooms, vec!["digimon"]);
    }

    #[test]
    fn test_username_validation() {
        assert!(ClientConfig::is_valid_username("alice"));
        assert!(!ClientConfig::is_valid_username(""));
        assert!(!ClientConfig::is_valid_username("alice1"));
        assert!(!ClientConfig::is_valid_username("al ice"));
    }
}
