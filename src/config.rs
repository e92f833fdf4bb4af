//! Host configuration
//!
//! JSON file describing the MIDI link, the video links and the panel
//! topology. Every section is optional; omitted fields take defaults.
//!
//! ```json
//! {
//!   "midi": { "link": { "port": "/dev/ttyUSB0" }, "channels": 6 },
//!   "video": {
//!     "fps": 24,
//!     "frame_width": 32, "frame_height": 16, "panel_size": 16,
//!     "links": [ { "port": "/dev/ttyUSB1", "baud_rate": 1000000 } ],
//!     "devices": [
//!       { "id": 0, "link": 0, "origin_x": 0, "origin_y": 0 },
//!       { "id": 1, "link": 0, "origin_x": 16, "origin_y": 0 }
//!     ]
//!   }
//! }
//! ```

use crate::midi::{ExtractOptions, MAX_HARDWARE_CHANNELS};
use crate::video::{DeviceSpec, Topology};
use crate::{LedToneError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

fn default_baud_rate() -> u32 {
    115_200
}

fn default_queue_depth() -> usize {
    64
}

fn default_channels() -> u8 {
    4
}

fn default_drum_patterns() -> Vec<String> {
    ExtractOptions::default().drum_track_patterns
}

fn default_lateness_ms() -> u64 {
    5
}

fn default_fps() -> f64 {
    30.0
}

/// One serial link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkConfig {
    /// Serial device path
    pub port: String,
    /// Line rate
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    /// Writer queue depth in packets
    #[serde(default = "default_queue_depth")]
    pub queue_depth: usize,
}

impl LinkConfig {
    /// Link on `port` with default rate and queue depth
    pub fn new(port: impl Into<String>) -> Self {
        LinkConfig {
            port: port.into(),
            baud_rate: default_baud_rate(),
            queue_depth: default_queue_depth(),
        }
    }
}

/// MIDI playback settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MidiConfig {
    /// Link to the buzzer receivers
    pub link: LinkConfig,
    /// Hardware tone channels across all receivers
    #[serde(default = "default_channels")]
    pub channels: u8,
    /// Track name fragments marking percussion tracks
    #[serde(default = "default_drum_patterns")]
    pub drum_track_patterns: Vec<String>,
    /// Lateness beyond which a send is reported
    #[serde(default = "default_lateness_ms")]
    pub lateness_warning_ms: u64,
}

impl MidiConfig {
    /// Settings for `link` with every other field defaulted
    pub fn new(link: LinkConfig) -> Self {
        MidiConfig {
            link,
            channels: default_channels(),
            drum_track_patterns: default_drum_patterns(),
            lateness_warning_ms: default_lateness_ms(),
        }
    }

    /// Extractor options derived from these settings
    pub fn extract_options(&self) -> ExtractOptions {
        ExtractOptions {
            drum_track_patterns: self.drum_track_patterns.clone(),
        }
    }

    /// Lateness warning threshold
    pub fn lateness_warning(&self) -> Duration {
        Duration::from_millis(self.lateness_warning_ms)
    }

    fn validate(&self) -> Result<()> {
        let channels = usize::from(self.channels);
        if !(1..=MAX_HARDWARE_CHANNELS).contains(&channels) {
            return Err(LedToneError::ConfigError(format!(
                "midi.channels {} outside 1..={}",
                channels, MAX_HARDWARE_CHANNELS
            )));
        }
        validate_link("midi.link", &self.link)
    }
}

/// Video streaming settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoConfig {
    /// Target frame rate
    #[serde(default = "default_fps")]
    pub fps: f64,
    /// Frame width in pixels
    pub frame_width: usize,
    /// Frame height in pixels
    pub frame_height: usize,
    /// Panel edge length in pixels
    pub panel_size: usize,
    /// Links, indexed by `DeviceSpec::link`
    pub links: Vec<LinkConfig>,
    /// Receivers
    pub devices: Vec<DeviceSpec>,
}

impl VideoConfig {
    /// Validated topology for these settings
    pub fn topology(&self) -> Result<Topology> {
        Topology::new(
            self.frame_width,
            self.frame_height,
            self.panel_size,
            self.links.len(),
            self.devices.clone(),
        )
    }

    fn validate(&self) -> Result<()> {
        if !self.fps.is_finite() || self.fps <= 0.0 {
            return Err(LedToneError::ConfigError(format!(
                "video.fps must be positive, got {}",
                self.fps
            )));
        }
        for (i, link) in self.links.iter().enumerate() {
            validate_link(&format!("video.links[{}]", i), link)?;
        }
        self.topology().map(|_| ())
    }
}

fn validate_link(what: &str, link: &LinkConfig) -> Result<()> {
    if link.port.is_empty() {
        return Err(LedToneError::ConfigError(format!("{}: empty port", what)));
    }
    if link.baud_rate == 0 {
        return Err(LedToneError::ConfigError(format!("{}: zero baud rate", what)));
    }
    if link.queue_depth == 0 {
        return Err(LedToneError::ConfigError(format!("{}: zero queue depth", what)));
    }
    Ok(())
}

/// Top-level host configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostConfig {
    /// MIDI playback, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub midi: Option<MidiConfig>,
    /// Video streaming, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video: Option<VideoConfig>,
}

impl HostConfig {
    /// Parse and validate JSON
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: HostConfig = serde_json::from_str(json)
            .map_err(|e| LedToneError::ConfigError(format!("invalid config JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        tracing::debug!(path = %path.as_ref().display(), "loading config");
        Self::from_json_str(&text)
    }

    /// Check every section
    pub fn validate(&self) -> Result<()> {
        if let Some(midi) = &self.midi {
            midi.validate()?;
        }
        if let Some(video) = &self.video {
            video.validate()?;
        }
        Ok(())
    }

    /// Serialize as pretty JSON
    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| LedToneError::Other(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"{
        "midi": { "link": { "port": "/dev/ttyUSB0" }, "channels": 6 },
        "video": {
            "fps": 24,
            "frame_width": 32, "frame_height": 16, "panel_size": 16,
            "links": [ { "port": "/dev/ttyUSB1", "baud_rate": 1000000 } ],
            "devices": [
                { "id": 0, "link": 0, "origin_x": 0, "origin_y": 0 },
                { "id": 1, "link": 0, "origin_x": 16, "origin_y": 0 }
            ]
        }
    }"#;

    #[test]
    fn test_defaults_applied() {
        let config = HostConfig::from_json_str(SAMPLE).unwrap();
        let midi = config.midi.unwrap();
        assert_eq!(midi.channels, 6);
        assert_eq!(midi.link.baud_rate, 115_200);
        assert_eq!(midi.link.queue_depth, 64);
        assert_eq!(midi.drum_track_patterns, vec!["drum", "perc"]);
        assert_eq!(midi.lateness_warning(), Duration::from_millis(5));

        let video = config.video.unwrap();
        assert_eq!(video.fps, 24.0);
        assert_eq!(video.topology().unwrap().devices().len(), 2);
    }

    #[test]
    fn test_empty_config_is_valid() {
        let config = HostConfig::from_json_str("{}").unwrap();
        assert!(config.midi.is_none());
        assert!(config.video.is_none());
    }

    #[test]
    fn test_rejects_bad_channel_count() {
        let json = r#"{ "midi": { "link": { "port": "p" }, "channels": 16 } }"#;
        assert!(matches!(
            HostConfig::from_json_str(json),
            Err(LedToneError::ConfigError(_))
        ));
    }

    #[test]
    fn test_rejects_bad_topology() {
        let json = r#"{ "video": {
            "frame_width": 16, "frame_height": 16, "panel_size": 16,
            "links": [ { "port": "p" } ],
            "devices": [
                { "id": 4, "link": 0, "origin_x": 0, "origin_y": 0 },
                { "id": 4, "link": 0, "origin_x": 0, "origin_y": 0 }
            ]
        } }"#;
        assert!(HostConfig::from_json_str(json).is_err());
    }

    #[test]
    fn test_load_from_file_round_trips() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let config = HostConfig::load(file.path()).unwrap();
        let again = HostConfig::from_json_str(&config.to_json_string().unwrap()).unwrap();
        assert_eq!(config, again);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        assert!(matches!(
            HostConfig::load("/nonexistent/ledtone.json"),
            Err(LedToneError::Io(_))
        ));
    }
}
