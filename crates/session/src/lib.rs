//! Session store implementations for Fuente.

pub mod file_backend;
pub mod in_memory;

use std::path::PathBuf;
use std::sync::Arc;

pub use file_backend::FileStore;
use fuente_core::SessionStore;
pub use in_memory::InMemoryStore;

/// Default path for the file backend: `~/.fuente/sessions.jsonl`.
pub fn default_file_path() -> PathBuf {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".fuente").join("sessions.jsonl")
}

/// Build a session store from configuration.
pub fn from_config(config: &fuente_config::SessionConfig) -> Arc<dyn SessionStore> {
    match config.backend.as_str() {
        "file" => {
            let path = config
                .file_path
                .as_ref()
                .map(PathBuf::from)
                .unwrap_or_else(default_file_path);
            Arc::new(FileStore::new(path))
        }
        _ => Arc::new(InMemoryStore::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_builds_memory_backend_by_default() {
        let store = from_config(&fuente_config::SessionConfig::default());
        assert_eq!(store.name(), "memory");
    }

    #[test]
    fn factory_builds_file_backend() {
        let config = fuente_config::SessionConfig {
            backend: "file".into(),
            file_path: Some("/tmp/fuente-test-sessions.jsonl".into()),
        };
        let store = from_config(&config);
        assert_eq!(store.name(), "file");
    }
}
