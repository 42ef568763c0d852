//! Engine configuration, loaded from a TOML file in the data directory.
//!
//! Invalid values are clamped to their defaults rather than rejected —
//! matching the coordinator's configuration contract: a malformed knob
//! should degrade to a safe default, not refuse to start.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Config file name placed in the database data directory.
pub const CONFIG_FILE_NAME: &str = "in-mem.toml";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    pub db_count: usize,
    pub max_memory: u64,
    pub max_clients: u32,
    pub password: String,

    pub enable_snap: bool,
    pub snap_path: String,
    pub snap_interval_sec: u64,

    pub enable_aol: bool,
    pub aol_path: String,
    /// `0` = no, `1` = everysec, `2` = always.
    pub aol_sync: i64,

    pub port: u16,
    pub host: String,
    pub read_timeout: u64,
    pub write_timeout: u64,
    pub heartbeat_timeout: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            db_count: 16,
            max_memory: 0,
            max_clients: 10_000,
            password: String::new(),
            enable_snap: false,
            snap_path: "cache/6379.rdb".to_string(),
            snap_interval_sec: 3600,
            enable_aol: false,
            aol_path: "cache/6379.aof".to_string(),
            aol_sync: 1,
            port: 6379,
            host: "0.0.0.0".to_string(),
            read_timeout: 60,
            write_timeout: 60,
            heartbeat_timeout: 30,
        }
    }
}

impl EngineConfig {
    /// Read and parse config from a file path.
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config: EngineConfig = toml::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        config.clamp_to_valid();
        Ok(config)
    }

    /// Write the default config file if it does not already exist.
    pub fn write_default_if_missing(path: &Path) -> std::io::Result<()> {
        if !path.exists() {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            std::fs::write(path, Self::default_toml())?;
        }
        Ok(())
    }

    pub fn write_to_file(&self, path: &Path) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    pub fn default_toml() -> &'static str {
        r#"# in-mem store configuration

db_count = 16
max_memory = 0
max_clients = 10000
password = ""

enable_snap = false
snap_path = "cache/6379.rdb"
snap_interval_sec = 3600

enable_aol = false
aol_path = "cache/6379.aof"
# 0 = no, 1 = everysec, 2 = always
aol_sync = 1

port = 6379
host = "0.0.0.0"
read_timeout = 60
write_timeout = 60
heartbeat_timeout = 30
"#
    }

    /// Combine `snap_path` with `port` to isolate multiple instances that
    /// share a data directory (spec §4.7 step 1): `cache/dump.rdb` with
    /// `port=6380` becomes `cache/dump-6380.rdb`. A path with no file stem
    /// (unlikely, but not impossible) falls back to appending the port as
    /// a bare suffix.
    pub fn effective_snap_path(&self) -> std::path::PathBuf {
        Self::with_port_suffix(&self.snap_path, self.port)
    }

    fn with_port_suffix(raw: &str, port: u16) -> std::path::PathBuf {
        let path = Path::new(raw);
        let parent = path.parent();
        let stem = path.file_stem().and_then(|s| s.to_str());
        let ext = path.extension().and_then(|s| s.to_str());
        let file_name = match (stem, ext) {
            (Some(stem), Some(ext)) => format!("{stem}-{port}.{ext}"),
            (Some(stem), None) => format!("{stem}-{port}"),
            (None, _) => format!("{raw}-{port}"),
        };
        match parent {
            Some(p) if !p.as_os_str().is_empty() => p.join(file_name),
            _ => std::path::PathBuf::from(file_name),
        }
    }

    /// Replace out-of-range values with their default counterpart rather
    /// than failing to start.
    fn clamp_to_valid(&mut self) {
        let default = EngineConfig::default();
        if self.db_count == 0 {
            self.db_count = default.db_count;
        }
        if !(0..=2).contains(&self.aol_sync) {
            self.aol_sync = default.aol_sync;
        }
        if self.port == 0 {
            self.port = default.port;
        }
    }
}
