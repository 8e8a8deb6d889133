//! Device abstraction
//!
//! The session drives devices through these traits so the state machine can
//! run against the real cpal backend or an in-memory fake.

use std::fmt;

use thiserror::Error;

use super::buffer::SharedBuffer;

/// Errors that can occur while enumerating or opening devices
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Failed to enumerate capture devices: {0}")]
    Enumeration(String),

    #[error("No capture devices found")]
    NoCaptureDevices,

    #[error("Capture device {0} not found")]
    DeviceNotFound(usize),

    #[error("No default output device")]
    NoOutputDevice,

    #[error("No supported stream configuration: {0}")]
    Config(String),

    #[error("Unsupported sample format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to build stream: {0}")]
    StreamBuild(String),
}

/// Which of the two session devices an operation refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceRole {
    Recorder,
    Player,
}

impl fmt::Display for DeviceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Recorder => f.write_str("recording"),
            Self::Player => f.write_str("playback"),
        }
    }
}

/// Audio format, either requested or negotiated with a device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioSpec {
    pub sample_rate: u32,
    pub channels: u16,
    /// Bytes per single-channel sample
    pub bytes_per_sample: u16,
    /// Frames per callback period
    pub period_frames: u32,
}

impl AudioSpec {
    pub fn bytes_per_frame(&self) -> usize {
        self.channels as usize * self.bytes_per_sample as usize
    }

    pub fn bytes_per_second(&self) -> usize {
        self.sample_rate as usize * self.bytes_per_frame()
    }
}

impl Default for AudioSpec {
    /// 44.1 kHz stereo `f32` with a 4096-frame period
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            channels: 2,
            bytes_per_sample: 4,
            period_frames: 4096,
        }
    }
}

/// An open device. Created paused.
pub trait AudioDevice {
    /// The spec the device actually accepted
    fn spec(&self) -> AudioSpec;

    /// Start the device callback; no-op when already running
    fn resume(&mut self);

    /// Stop the device callback; no-op when already paused
    fn pause(&mut self);
}

/// Source of capture devices and the default output device
pub trait AudioBackend {
    /// Names of the available capture devices, in selection order
    fn capture_devices(&self) -> Result<Vec<String>, AudioError>;

    /// Open capture device `index`; its callback appends into `buffer`
    fn open_recorder(
        &mut self,
        index: usize,
        desired: &AudioSpec,
        buffer: SharedBuffer,
    ) -> Result<Box<dyn AudioDevice>, AudioError>;

    /// Open the default output device; its callback replays `buffer`, whose
    /// contents are laid out as described by `recorded`
    fn open_player(
        &mut self,
        desired: &AudioSpec,
        recorded: &AudioSpec,
        buffer: SharedBuffer,
    ) -> Result<Box<dyn AudioDevice>, AudioError>;
}
