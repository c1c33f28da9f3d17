use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const SETTINGS_FILE_NAME: &str = "settings.json";
const APP_DIR_NAME: &str = "carelink";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    /// Base URL of the portal backend.
    pub base_url: String,

    /// Client-side timeout applied to every request. The backend has no
    /// timeout contract of its own, so this is the only bound on a hung call.
    pub request_timeout_secs: u64,

    /// Audio encodings to negotiate, in priority order. The first entry the
    /// runtime can both encode and play back wins.
    pub codec_candidates: Vec<String>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:4000".to_string(),
            request_timeout_secs: 30,
            codec_candidates: vec!["audio/wav".to_string(), "audio/webm;codecs=opus".to_string()],
        }
    }
}

fn settings_path() -> Result<PathBuf, String> {
    let dir = dirs::config_dir()
        .ok_or_else(|| "Could not determine config directory".to_string())?
        .join(APP_DIR_NAME);
    Ok(dir.join(SETTINGS_FILE_NAME))
}

/// Load settings from disk, then apply the `PORTAL_BASE_URL` env override.
/// Missing or unreadable settings fall back to defaults rather than failing.
pub fn load_settings() -> ClientSettings {
    let mut settings = match settings_path() {
        Ok(path) => read_settings_file(&path),
        Err(e) => {
            log::warn!("Settings: {}", e);
            ClientSettings::default()
        }
    };

    if let Ok(url) = std::env::var("PORTAL_BASE_URL") {
        if !url.is_empty() {
            settings.base_url = url;
        }
    }

    settings
}

fn read_settings_file(path: &PathBuf) -> ClientSettings {
    match std::fs::read_to_string(path) {
        Ok(contents) => match serde_json::from_str::<ClientSettings>(&contents) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("Settings: failed to parse {:?}: {}", path, e);
                ClientSettings::default()
            }
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => ClientSettings::default(),
        Err(e) => {
            log::warn!("Settings: failed to read {:?}: {}", path, e);
            ClientSettings::default()
        }
    }
}

pub fn save_settings(settings: &ClientSettings) -> Result<(), String> {
    let path = settings_path()?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory {:?}: {}", parent, e))?;
    }

    let contents =
        serde_json::to_string_pretty(settings).map_err(|e| format!("Serialize settings: {}", e))?;

    // Write atomically: write to a temp file in the same directory, then rename.
    // This prevents partial/corrupt settings.json if the app crashes mid-write.
    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, &contents)
        .map_err(|e| format!("Write temp settings {:?}: {}", tmp_path, e))?;

    // On Unix, rename will atomically replace the destination. On Windows, rename
    // fails if the destination exists, so we remove it first (ignoring NotFound).
    if cfg!(windows) {
        if path.exists() {
            if let Err(e) = std::fs::remove_file(&path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    return Err(format!("Remove existing settings file {:?}: {}", path, e));
                }
            }
        }
    }

    std::fs::rename(&tmp_path, &path)
        .map_err(|e| format!("Rename temp settings {:?} to {:?}: {}", tmp_path, path, e))?;
    Ok(())
}
