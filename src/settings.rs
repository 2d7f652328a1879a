use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub const DEFAULT_HOST: &str = "8.8.8.8";
pub const DEFAULT_INTERVAL_SECS: u32 = 10;
pub const MIN_INTERVAL_SECS: u32 = 1;
pub const MAX_INTERVAL_SECS: u32 = 100;

const SETTINGS_DIR: &str = "PingMonitor";
const SETTINGS_FILE: &str = "settings.txt";

#[derive(Debug, Error)]
enum SettingsError {
    #[error("could not find config directory")]
    NoConfigDir,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedSettings {
    pub host: String,
    pub interval_secs: u32,
    pub muted: bool,
}

impl Default for PersistedSettings {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            interval_secs: DEFAULT_INTERVAL_SECS,
            muted: false,
        }
    }
}

impl PersistedSettings {
    /// Parses the three-line settings record. Each line that is missing or
    /// malformed falls back to its own default.
    pub fn parse(content: &str) -> Self {
        let defaults = Self::default();
        let mut lines = content.lines().map(str::trim);

        let host = lines
            .next()
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .unwrap_or(defaults.host);
        let interval_secs = lines
            .next()
            .and_then(|line| line.parse::<u32>().ok())
            .filter(|secs| is_valid_interval(*secs))
            .unwrap_or(defaults.interval_secs);
        let muted = lines
            .next()
            .and_then(parse_flag)
            .unwrap_or(defaults.muted);

        Self {
            host,
            interval_secs,
            muted,
        }
    }

    pub fn render(&self) -> String {
        format!(
            "{}\n{}\n{}\n",
            self.host,
            self.interval_secs,
            if self.muted { "True" } else { "False" }
        )
    }
}

pub fn is_valid_interval(secs: u32) -> bool {
    (MIN_INTERVAL_SECS..=MAX_INTERVAL_SECS).contains(&secs)
}

fn parse_flag(line: &str) -> Option<bool> {
    if line.eq_ignore_ascii_case("true") || line == "1" {
        Some(true)
    } else if line.eq_ignore_ascii_case("false") || line == "0" {
        Some(false)
    } else {
        None
    }
}

/// Best-effort persistence of [`PersistedSettings`].
///
/// Failures are logged and swallowed; the monitor keeps running on whatever
/// it holds in memory.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: Option<PathBuf>,
}

impl SettingsStore {
    /// Store in the platform config directory (`<config>/PingMonitor/settings.txt`).
    pub fn open_default() -> Self {
        let path = dirs::config_dir().map(|dir| dir.join(SETTINGS_DIR).join(SETTINGS_FILE));
        if path.is_none() {
            log::warn!("{}; settings will not be saved", SettingsError::NoConfigDir);
        }
        Self { path }
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn load(&self) -> PersistedSettings {
        match self.try_load() {
            Ok(Some(settings)) => settings,
            Ok(None) => PersistedSettings::default(),
            Err(e) => {
                log::warn!("Failed to load settings: {e}");
                PersistedSettings::default()
            }
        }
    }

    /// Writes `settings`, returning whether they reached disk.
    pub fn save(&self, settings: &PersistedSettings) -> bool {
        match self.try_save(settings) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Failed to save settings: {e}");
                false
            }
        }
    }

    fn try_load(&self) -> Result<Option<PersistedSettings>, SettingsError> {
        let path = self.path.as_ref().ok_or(SettingsError::NoConfigDir)?;
        if !path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(path)?;
        Ok(Some(PersistedSettings::parse(&String::from_utf8_lossy(&bytes))))
    }

    fn try_save(&self, settings: &PersistedSettings) -> Result<(), SettingsError> {
        let path = self.path.as_ref().ok_or(SettingsError::NoConfigDir)?;
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(path, settings.render())?;
        Ok(())
    }
}
