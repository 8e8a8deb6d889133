//! Audio module - devices and the in-memory take
//!
//! This module provides:
//! - The take buffer shared with device callbacks
//! - Device traits the session drives
//! - The cpal backend with its recording and playback callbacks

mod backend;
mod buffer;
mod device;
mod input;
mod output;

pub use backend::CpalBackend;
pub use buffer::{AudioBuffer, SharedBuffer};
pub use device::{AudioBackend, AudioDevice, AudioError, AudioSpec, DeviceRole};
