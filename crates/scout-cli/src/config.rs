//! Robot configuration – reads/writes `~/.scout/config.toml`.
//!
//! Every field has a default, so an empty or partial file is valid:
//!
//! ```toml
//! serial_device = "/dev/ttyTHS1"
//! baud_rate = 115200
//! frame_width = 640
//!
//! [dispatcher]
//! command_delay_ms = 100
//!
//! [tracker]
//! tracking_threshold = 3
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use scout_hal::{DEFAULT_BAUD_RATE, DispatcherConfig};
use scout_perception::TrackerConfig;
use scout_runtime::{NavigationConfig, PipelineConfig};
use scout_types::ScoutError;
use serde::{Deserialize, Serialize};

/// Persisted robot configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Serial device of the motor controller.  Unset means the simulated
    /// motor controller is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial_device: Option<String>,

    /// Baud rate of the serial link.
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// Recorded detector output to replay instead of the simulated camera.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replay: Option<PathBuf>,

    /// Frame size of the simulated camera, and of replayed frames that do not
    /// state their own.
    #[serde(default = "default_frame_width")]
    pub frame_width: u32,
    #[serde(default = "default_frame_height")]
    pub frame_height: u32,

    #[serde(default)]
    pub tracker: TrackerConfig,
    #[serde(default)]
    pub navigation: NavigationConfig,
    #[serde(default)]
    pub dispatcher: DispatcherConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

fn default_baud_rate() -> u32 {
    DEFAULT_BAUD_RATE
}
fn default_frame_width() -> u32 {
    640
}
fn default_frame_height() -> u32 {
    480
}

impl Default for Config {
    fn default() -> Self {
        Self {
            serial_device: None,
            baud_rate: default_baud_rate(),
            replay: None,
            frame_width: default_frame_width(),
            frame_height: default_frame_height(),
            tracker: TrackerConfig::default(),
            navigation: NavigationConfig::default(),
            dispatcher: DispatcherConfig::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

/// Return the path to `~/.scout/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".scout").join("config.toml")
}

/// Load the config from disk.  Returns `None` if the file does not exist.
pub fn load() -> Result<Option<Config>, ScoutError> {
    load_from(&config_path())
}

pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, ScoutError> {
    Ok(read_from(path)?.map(|mut cfg| {
        apply_env_overrides(&mut cfg);
        cfg
    }))
}

/// Parse the file at `path` without environment overrides.
pub(crate) fn read_from(path: &Path) -> Result<Option<Config>, ScoutError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| ScoutError::Config(format!("failed to read {}: {e}", path.display())))?;
    toml::from_str(&raw)
        .map(Some)
        .map_err(|e| ScoutError::Config(format!("failed to parse {}: {e}", path.display())))
}

/// Apply `SCOUT_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `SCOUT_SERIAL_DEVICE` | `serial_device` |
/// | `SCOUT_SERIAL_BAUD` | `baud_rate` |
/// | `SCOUT_REPLAY` | `replay` |
/// | `SCOUT_FRAME_WIDTH` | `frame_width` |
/// | `SCOUT_COMMAND_DELAY_MS` | `dispatcher.command_delay_ms` |
///
/// Unparsable numbers are ignored.
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("SCOUT_SERIAL_DEVICE") {
        cfg.serial_device = Some(v);
    }
    if let Ok(v) = std::env::var("SCOUT_SERIAL_BAUD")
        && let Ok(baud) = v.parse::<u32>()
    {
        cfg.baud_rate = baud;
    }
    if let Ok(v) = std::env::var("SCOUT_REPLAY") {
        cfg.replay = Some(PathBuf::from(v));
    }
    if let Ok(v) = std::env::var("SCOUT_FRAME_WIDTH")
        && let Ok(width) = v.parse::<u32>()
    {
        cfg.frame_width = width;
    }
    if let Ok(v) = std::env::var("SCOUT_COMMAND_DELAY_MS")
        && let Ok(ms) = v.parse::<u64>()
    {
        cfg.dispatcher.command_delay_ms = ms;
    }
}

/// Save the config to disk, creating `~/.scout/` if necessary.
pub fn save(cfg: &Config) -> Result<(), ScoutError> {
    save_to(cfg, &config_path())
}

pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), ScoutError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| ScoutError::Config(format!("failed to create config directory: {e}")))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700))
                .map_err(|e| ScoutError::Config(format!("failed to set config directory permissions: {e}")))?;
        }
    }
    let raw = toml::to_string_pretty(cfg).map_err(|e| ScoutError::Serialization(e.to_string()))?;
    #[cfg(unix)]
    {
        use std::io::Write;
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .and_then(|mut f| f.write_all(raw.as_bytes()))
            .map_err(|e| ScoutError::Config(format!("failed to write {}: {e}", path.display())))?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw).map_err(|e| ScoutError::Config(format!("failed to write {}: {e}", path.display())))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_path_points_to_scout_dir() {
        let p = config_path_for_home("/home/operator");
        assert_eq!(p, PathBuf::from("/home/operator/.scout/config.toml"));
    }

    #[test]
    fn load_from_returns_none_when_missing() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        assert!(load_from(&path).expect("no error").is_none());
    }

    #[test]
    fn roundtrip_default_config() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());

        save_to(&Config::default(), &path).expect("save");
        let loaded = read_from(&path).expect("load ok").expect("some");
        assert_eq!(loaded.frame_width, 640);
        assert_eq!(loaded.baud_rate, 115_200);
        assert_eq!(loaded.tracker.tracking_threshold, 3);
        assert_eq!(loaded.dispatcher.command_delay_ms, 100);
        assert_eq!(loaded.pipeline.frame_interval_ms, 30);
        assert!(loaded.serial_device.is_none());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "serial_device = \"/dev/ttyACM0\"\n\n[navigation]\nobstacle_size_threshold = 0.5\n",
        )
        .expect("write");

        let cfg = read_from(&path).expect("load ok").expect("some");
        assert_eq!(cfg.serial_device.as_deref(), Some("/dev/ttyACM0"));
        assert!((cfg.navigation.obstacle_size_threshold - 0.5).abs() < f32::EPSILON);
        assert!((cfg.navigation.third_split - 0.33).abs() < f32::EPSILON);
        assert_eq!(cfg.frame_height, 480);
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "frame_width = \"wide\"").expect("write");
        assert!(matches!(read_from(&path), Err(ScoutError::Config(_))));
    }

    #[cfg(unix)]
    #[test]
    fn config_file_has_restrictive_permissions() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        save_to(&Config::default(), &path).expect("save");

        let file_mode = fs::metadata(&path).expect("file metadata").permissions().mode() & 0o777;
        assert_eq!(file_mode, 0o600);
        let dir_mode = fs::metadata(path.parent().unwrap())
            .expect("dir metadata")
            .permissions()
            .mode()
            & 0o777;
        assert_eq!(dir_mode, 0o700);
    }

    // Env-var tests use distinct variables so they can run in parallel.

    #[test]
    fn apply_env_overrides_changes_serial_device() {
        // SAFETY: no other test touches this variable.
        unsafe { std::env::set_var("SCOUT_SERIAL_DEVICE", "/dev/ttyUSB1") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.serial_device.as_deref(), Some("/dev/ttyUSB1"));
        unsafe { std::env::remove_var("SCOUT_SERIAL_DEVICE") };
    }

    #[test]
    fn apply_env_overrides_changes_baud_rate() {
        // SAFETY: no other test touches this variable.
        unsafe { std::env::set_var("SCOUT_SERIAL_BAUD", "57600") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.baud_rate, 57_600);
        unsafe { std::env::remove_var("SCOUT_SERIAL_BAUD") };
    }

    #[test]
    fn apply_env_overrides_changes_command_delay() {
        // SAFETY: no other test touches this variable.
        unsafe { std::env::set_var("SCOUT_COMMAND_DELAY_MS", "250") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.dispatcher.command_delay_ms, 250);
        unsafe { std::env::remove_var("SCOUT_COMMAND_DELAY_MS") };
    }

    #[test]
    fn apply_env_overrides_ignores_invalid_width() {
        // SAFETY: no other test touches this variable.
        unsafe { std::env::set_var("SCOUT_FRAME_WIDTH", "wide") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.frame_width, 640);
        unsafe { std::env::remove_var("SCOUT_FRAME_WIDTH") };
    }

    #[test]
    fn apply_env_overrides_changes_replay() {
        // SAFETY: no other test touches this variable.
        unsafe { std::env::set_var("SCOUT_REPLAY", "/tmp/run.jsonl") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.replay, Some(PathBuf::from("/tmp/run.jsonl")));
        unsafe { std::env::remove_var("SCOUT_REPLAY") };
    }
}
