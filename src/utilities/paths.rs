//! Path management for on-disk memory storage.

use std::env;
use std::path::PathBuf;

/// Application directory name under the platform data directory.
const APP_AUTHOR: &str = "PersonaCrew";

/// Returns the directory used for SQLite storage, creating it if necessary.
///
/// `PERSONA_STORAGE_DIR` overrides the whole path; otherwise a
/// platform-specific data directory keyed by the project name is used.
pub fn db_storage_path() -> PathBuf {
    if let Ok(dir) = env::var("PERSONA_STORAGE_DIR") {
        let path = PathBuf::from(dir);
        let _ = std::fs::create_dir_all(&path);
        return path;
    }

    let app_name = get_project_directory_name();

    // Linux: ~/.local/share/<author>/<app>
    // macOS: ~/Library/Application Support/<author>/<app>
    // Windows: %LOCALAPPDATA%\<author>\<app>
    let data_dir = if cfg!(target_os = "linux") {
        let home = env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
        PathBuf::from(home)
            .join(".local")
            .join("share")
            .join(APP_AUTHOR)
            .join(&app_name)
    } else if cfg!(target_os = "macos") {
        let home = env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
        PathBuf::from(home)
            .join("Library")
            .join("Application Support")
            .join(APP_AUTHOR)
            .join(&app_name)
    } else if cfg!(target_os = "windows") {
        let local_app_data = env::var("LOCALAPPDATA")
            .unwrap_or_else(|_| env::var("APPDATA").unwrap_or_else(|_| "C:\\tmp".to_string()));
        PathBuf::from(local_app_data).join(APP_AUTHOR).join(&app_name)
    } else {
        PathBuf::from("/tmp").join(APP_AUTHOR).join(&app_name)
    };

    let _ = std::fs::create_dir_all(&data_dir);
    data_dir
}

/// Returns the current project directory name, used to namespace storage.
pub fn get_project_directory_name() -> String {
    env::current_dir()
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().to_string()))
        .unwrap_or_else(|| "persona_default".to_string())
}

/// File name of the episodic memory database inside the storage directory.
pub const EPISODIC_DB_FILE: &str = "episodic_memory.db";

/// Default location of the episodic memory database.
pub fn episodic_db_path() -> PathBuf {
    db_storage_path().join(EPISODIC_DB_FILE)
}
