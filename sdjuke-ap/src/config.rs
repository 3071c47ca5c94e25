//! Configuration for the sdjuke-ap player
//!
//! Bootstrap-only: read once at startup from an optional TOML file, then
//! overridden by command-line arguments. Sources in priority order:
//!
//! 1. Command-line arguments
//! 2. Environment (`SDJUKE_ROOT_FOLDER` for the root folder)
//! 3. TOML configuration file
//! 4. Built-in defaults

use crate::audio::output::DEFAULT_RING_FRAMES;
use crate::audio::stream_buffer::{
    CompressedStreamBuffer, DEFAULT_LOW_WATER_MARK, DEFAULT_STREAM_CAPACITY,
};
use crate::error::{Error, Result};
use crate::playback::navigator::{DEFAULT_EXTENSION, DEFAULT_MAX_PATH_LEN};
use crate::playback::player_loop::{
    LoopTiming, DEFAULT_IDLE_RETRY, DEFAULT_SKIP_DEBOUNCE, DEFAULT_TRACK_GAP,
};
use sdjuke_common::config::{RootFolderResolver, RootFolderSource};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Bootstrap configuration as written in the TOML file
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct TomlConfig {
    /// Folder scanned for tracks (optional, see resolution order)
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// Accepted file extension, without the dot
    #[serde(default)]
    pub extension: Option<String>,

    /// Joined paths of this many bytes or more are skipped
    #[serde(default)]
    pub max_path_len: Option<usize>,

    #[serde(default)]
    pub stream: StreamConfig,

    #[serde(default)]
    pub timing: TimingConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Compressed-stream buffer sizing
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StreamConfig {
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    #[serde(default = "default_low_water_mark")]
    pub low_water_mark: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            low_water_mark: default_low_water_mark(),
        }
    }
}

/// Player loop pauses, in milliseconds
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimingConfig {
    #[serde(default = "default_track_gap_ms")]
    pub track_gap_ms: u64,

    #[serde(default = "default_skip_debounce_ms")]
    pub skip_debounce_ms: u64,

    #[serde(default = "default_idle_retry_ms")]
    pub idle_retry_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            track_gap_ms: default_track_gap_ms(),
            skip_debounce_ms: default_skip_debounce_ms(),
            idle_retry_ms: default_idle_retry_ms(),
        }
    }
}

impl TimingConfig {
    pub fn loop_timing(&self) -> LoopTiming {
        LoopTiming {
            track_gap: Duration::from_millis(self.track_gap_ms),
            skip_debounce: Duration::from_millis(self.skip_debounce_ms),
            idle_retry: Duration::from_millis(self.idle_retry_ms),
        }
    }
}

/// Audio output backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputBackend {
    /// System audio device via cpal
    #[default]
    Cpal,
    /// 16-bit stereo WAV file(s)
    Wav,
}

/// Output bus settings
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    #[serde(default)]
    pub backend: OutputBackend,

    /// Output device name; the default device when unset or not found
    #[serde(default)]
    pub device: Option<String>,

    /// cpal ring buffer size in stereo frames
    #[serde(default = "default_ring_frames")]
    pub ring_frames: usize,

    #[serde(default = "default_wav_path")]
    pub wav_path: PathBuf,

    /// Pace WAV writes to real time
    #[serde(default = "default_wav_realtime")]
    pub wav_realtime: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            backend: OutputBackend::default(),
            device: None,
            ring_frames: default_ring_frames(),
            wav_path: default_wav_path(),
            wav_realtime: default_wav_realtime(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_capacity() -> usize {
    DEFAULT_STREAM_CAPACITY
}

fn default_low_water_mark() -> usize {
    DEFAULT_LOW_WATER_MARK
}

fn default_track_gap_ms() -> u64 {
    DEFAULT_TRACK_GAP.as_millis() as u64
}

fn default_skip_debounce_ms() -> u64 {
    DEFAULT_SKIP_DEBOUNCE.as_millis() as u64
}

fn default_idle_retry_ms() -> u64 {
    DEFAULT_IDLE_RETRY.as_millis() as u64
}

fn default_ring_frames() -> usize {
    DEFAULT_RING_FRAMES
}

fn default_wav_path() -> PathBuf {
    PathBuf::from("sdjuke-out.wav")
}

fn default_wav_realtime() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Command-line values that take precedence over the TOML file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub root_folder: Option<PathBuf>,
    pub output: Option<OutputBackend>,
    pub device: Option<String>,
    pub wav_path: Option<PathBuf>,
    pub log_level: Option<String>,
}

/// Fully resolved player configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub root_folder: PathBuf,
    pub root_source: RootFolderSource,
    pub extension: String,
    pub max_path_len: usize,
    pub stream: StreamConfig,
    pub timing: LoopTiming,
    pub output: OutputConfig,
    pub log_level: String,
    /// File the TOML values came from, if any
    pub source_file: Option<PathBuf>,
}

impl Config {
    /// Merge file values and overrides, then validate.
    pub fn resolve(
        toml: TomlConfig,
        overrides: Overrides,
        resolver: &RootFolderResolver,
        source_file: Option<PathBuf>,
    ) -> Result<Self> {
        let (root_folder, root_source) = resolver.resolve(
            overrides.root_folder.as_deref(),
            toml.root_folder.as_deref(),
        );

        let extension = toml
            .extension
            .unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
            .trim_start_matches('.')
            .to_string();
        if extension.is_empty() {
            return Err(Error::Config("extension must not be empty".to_string()));
        }

        let max_path_len = toml.max_path_len.unwrap_or(DEFAULT_MAX_PATH_LEN);
        if max_path_len == 0 {
            return Err(Error::Config("max_path_len must be positive".to_string()));
        }

        let mut output = toml.output;
        if let Some(backend) = overrides.output {
            output.backend = backend;
        }
        if let Some(device) = overrides.device {
            output.device = Some(device);
        }
        if let Some(path) = overrides.wav_path {
            output.wav_path = path;
        }
        if output.ring_frames == 0 {
            return Err(Error::Config("output.ring_frames must be positive".to_string()));
        }

        let config = Self {
            root_folder,
            root_source,
            extension,
            max_path_len,
            stream: toml.stream,
            timing: toml.timing.loop_timing(),
            output,
            log_level: overrides.log_level.unwrap_or(toml.logging.level),
            source_file,
        };

        // Surface sizing errors at startup rather than at first use
        config.stream_buffer()?;
        Ok(config)
    }

    /// Load the TOML file (explicit path or search path) and resolve it.
    pub fn load(explicit: Option<&Path>, overrides: Overrides) -> Result<Self> {
        let (toml, source_file) = sdjuke_common::config::load_toml_config::<TomlConfig>(explicit)?;
        Self::resolve(toml, overrides, &RootFolderResolver::default(), source_file)
    }

    /// Allocate the compressed-stream buffer with the configured sizes
    pub fn stream_buffer(&self) -> Result<CompressedStreamBuffer> {
        CompressedStreamBuffer::new(self.stream.capacity, self.stream.low_water_mark)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn resolver() -> RootFolderResolver {
        RootFolderResolver::new("SDJUKE_TEST_ROOT_UNSET")
    }

    #[test]
    fn test_empty_file_gives_defaults() {
        let toml: TomlConfig = sdjuke_common::config::parse_toml("").unwrap();
        let config = Config::resolve(toml, Overrides::default(), &resolver(), None).unwrap();

        assert_eq!(config.extension, "mp3");
        assert_eq!(config.max_path_len, 300);
        assert_eq!(config.stream.capacity, 8192);
        assert_eq!(config.stream.low_water_mark, 1024);
        assert_eq!(config.timing, LoopTiming::default());
        assert_eq!(config.output.backend, OutputBackend::Cpal);
        assert_eq!(config.output.ring_frames, 4096);
        assert!(config.output.wav_realtime);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.root_source, RootFolderSource::CompiledDefault);
    }

    #[test]
    fn test_partial_timing_keeps_loop_defaults() {
        let toml: TomlConfig = sdjuke_common::config::parse_toml(
            r#"
            [timing]
            track_gap_ms = 100
            "#,
        )
        .unwrap();

        assert_eq!(TimingConfig::default().loop_timing(), LoopTiming::default());

        let timing = toml.timing.loop_timing();
        assert_eq!(timing.track_gap, Duration::from_millis(100));
        assert_eq!(timing.skip_debounce, DEFAULT_SKIP_DEBOUNCE);
        assert_eq!(timing.idle_retry, DEFAULT_IDLE_RETRY);
    }

    #[test]
    fn test_full_file() {
        let toml: TomlConfig = sdjuke_common::config::parse_toml(
            r#"
            root_folder = "/sdcard"
            extension = ".MP3"
            max_path_len = 256

            [stream]
            capacity = 16384
            low_water_mark = 2048

            [timing]
            track_gap_ms = 0
            skip_debounce_ms = 250
            idle_retry_ms = 1000

            [output]
            backend = "wav"
            wav_path = "/tmp/out.wav"
            wav_realtime = false

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();
        let config = Config::resolve(toml, Overrides::default(), &resolver(), None).unwrap();

        assert_eq!(config.root_folder, PathBuf::from("/sdcard"));
        assert_eq!(config.root_source, RootFolderSource::ConfigFile);
        assert_eq!(config.extension, "MP3");
        assert_eq!(config.max_path_len, 256);
        assert_eq!(config.stream.capacity, 16384);
        assert_eq!(config.timing.track_gap, Duration::ZERO);
        assert_eq!(config.timing.skip_debounce, Duration::from_millis(250));
        assert_eq!(config.output.backend, OutputBackend::Wav);
        assert!(!config.output.wav_realtime);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_overrides_win() {
        let toml: TomlConfig = sdjuke_common::config::parse_toml(
            r#"
            root_folder = "/from-file"
            [output]
            device = "hw:0"
            "#,
        )
        .unwrap();
        let overrides = Overrides {
            root_folder: Some(PathBuf::from("/from-cli")),
            output: Some(OutputBackend::Wav),
            device: Some("USB DAC".to_string()),
            wav_path: Some(PathBuf::from("capture.wav")),
            log_level: Some("trace".to_string()),
        };

        let config = Config::resolve(toml, overrides, &resolver(), None).unwrap();

        assert_eq!(config.root_folder, PathBuf::from("/from-cli"));
        assert_eq!(config.root_source, RootFolderSource::CommandLine);
        assert_eq!(config.output.backend, OutputBackend::Wav);
        assert_eq!(config.output.device.as_deref(), Some("USB DAC"));
        assert_eq!(config.output.wav_path, PathBuf::from("capture.wav"));
        assert_eq!(config.log_level, "trace");
    }

    #[test]
    #[serial]
    fn test_env_beats_file() {
        std::env::set_var("SDJUKE_TEST_ROOT_ENV", "/from-env");
        let toml = TomlConfig {
            root_folder: Some(PathBuf::from("/from-file")),
            ..Default::default()
        };

        let config = Config::resolve(
            toml,
            Overrides::default(),
            &RootFolderResolver::new("SDJUKE_TEST_ROOT_ENV"),
            None,
        )
        .unwrap();
        std::env::remove_var("SDJUKE_TEST_ROOT_ENV");

        assert_eq!(config.root_folder, PathBuf::from("/from-env"));
        assert_eq!(config.root_source, RootFolderSource::Environment);
    }

    #[test]
    fn test_invalid_sizing_rejected() {
        let toml: TomlConfig = sdjuke_common::config::parse_toml(
            r#"
            [stream]
            capacity = 1024
            "#,
        )
        .unwrap();
        assert!(Config::resolve(toml, Overrides::default(), &resolver(), None).is_err());

        let toml: TomlConfig = sdjuke_common::config::parse_toml(r#"extension = """#).unwrap();
        assert!(Config::resolve(toml, Overrides::default(), &resolver(), None).is_err());
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let result: sdjuke_common::Result<TomlConfig> =
            sdjuke_common::config::parse_toml("volume = 11");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "root_folder = \"/music\"\n[timing]\nidle_retry_ms = 10\n").unwrap();

        // The environment may set the root folder; only check file-sourced values
        let config = Config::load(Some(&path), Overrides::default()).unwrap();
        assert_eq!(config.timing.idle_retry, Duration::from_millis(10));
        assert_eq!(config.source_file.as_deref(), Some(path.as_path()));

        assert!(Config::load(Some(&dir.path().join("missing.toml")), Overrides::default()).is_err());
    }
}
