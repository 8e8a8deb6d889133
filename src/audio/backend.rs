//! cpal implementation of the device traits

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, StreamConfig, SupportedBufferSize, SupportedStreamConfigRange};

use super::buffer::SharedBuffer;
use super::device::{AudioBackend, AudioDevice, AudioError, AudioSpec, DeviceRole};
use super::{input, output};

/// Stream setup picked from what a device supports
#[derive(Debug, Clone)]
struct Negotiated {
    config: StreamConfig,
    format: SampleFormat,
    spec: AudioSpec,
}

fn is_convertible(format: SampleFormat) -> bool {
    matches!(
        format,
        SampleFormat::F32 | SampleFormat::I16 | SampleFormat::U16
    )
}

/// Pick the supported configuration closest to `desired`.
///
/// Preference order: `f32` with the requested channel count and rate, then
/// any convertible format with the channel count and rate, then anything at
/// the rate, then anything convertible at its highest rate.
fn negotiate(ranges: &[SupportedStreamConfigRange], desired: &AudioSpec) -> Option<Negotiated> {
    let rate_fits = |c: &&SupportedStreamConfigRange| {
        desired.sample_rate >= c.min_sample_rate().0 && desired.sample_rate <= c.max_sample_rate().0
    };
    let usable = || ranges.iter().filter(|c| is_convertible(c.sample_format()));

    let best = usable()
        .filter(|c| c.sample_format() == SampleFormat::F32)
        .filter(|c| c.channels() == desired.channels)
        .find(rate_fits)
        .or_else(|| {
            usable()
                .filter(|c| c.channels() == desired.channels)
                .find(rate_fits)
        })
        .or_else(|| usable().find(rate_fits))
        .or_else(|| usable().next())?;

    let sample_rate = if rate_fits(&best) {
        cpal::SampleRate(desired.sample_rate)
    } else {
        best.max_sample_rate()
    };

    let (buffer_size, period_frames) = match *best.buffer_size() {
        SupportedBufferSize::Range { min, max } => {
            let frames = desired.period_frames.clamp(min, max);
            (cpal::BufferSize::Fixed(frames), frames)
        }
        SupportedBufferSize::Unknown => (cpal::BufferSize::Default, desired.period_frames),
    };

    let mut config: StreamConfig = best.clone().with_sample_rate(sample_rate).config();
    config.buffer_size = buffer_size;

    Some(Negotiated {
        spec: AudioSpec {
            sample_rate: sample_rate.0,
            channels: config.channels,
            // Samples are stored as f32 whatever the device format
            bytes_per_sample: 4,
            period_frames,
        },
        config,
        format: best.sample_format(),
    })
}

/// An open cpal stream
pub struct CpalDevice {
    role: DeviceRole,
    stream: cpal::Stream,
    spec: AudioSpec,
    paused: bool,
}

impl CpalDevice {
    /// Wrap a freshly built stream, making sure it is not running
    fn new_paused(role: DeviceRole, stream: cpal::Stream, spec: AudioSpec) -> Self {
        let mut device = Self {
            role,
            stream,
            spec,
            paused: false,
        };
        device.pause();
        device
    }
}

impl AudioDevice for CpalDevice {
    fn spec(&self) -> AudioSpec {
        self.spec
    }

    fn resume(&mut self) {
        if !self.paused {
            return;
        }
        if let Err(e) = self.stream.play() {
            log::warn!("Failed to resume {} device: {}", self.role, e);
        }
        self.paused = false;
    }

    fn pause(&mut self) {
        if self.paused {
            return;
        }
        if let Err(e) = self.stream.pause() {
            log::warn!("Failed to pause {} device: {}", self.role, e);
        }
        self.paused = true;
    }
}

impl Drop for CpalDevice {
    fn drop(&mut self) {
        log::info!("Closing {} device", self.role);
    }
}

/// Devices from the platform's default cpal host
pub struct CpalBackend {
    host: cpal::Host,
    max_devices: usize,
}

impl CpalBackend {
    /// Use the default host, listing at most `max_devices` capture devices
    pub fn new(max_devices: usize) -> Self {
        let host = cpal::default_host();
        log::info!("Audio host: {:?}", host.id());
        Self { host, max_devices }
    }
}

impl AudioBackend for CpalBackend {
    fn capture_devices(&self) -> Result<Vec<String>, AudioError> {
        let names: Vec<String> = self
            .host
            .input_devices()
            .map_err(|e| AudioError::Enumeration(e.to_string()))?
            .take(self.max_devices)
            .map(|d| d.name().unwrap_or_else(|_| "Unknown".to_string()))
            .collect();

        if names.is_empty() {
            return Err(AudioError::NoCaptureDevices);
        }
        Ok(names)
    }

    fn open_recorder(
        &mut self,
        index: usize,
        desired: &AudioSpec,
        buffer: SharedBuffer,
    ) -> Result<Box<dyn AudioDevice>, AudioError> {
        let device = self
            .host
            .input_devices()
            .map_err(|e| AudioError::Enumeration(e.to_string()))?
            .nth(index)
            .ok_or(AudioError::DeviceNotFound(index))?;

        let name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        let ranges: Vec<_> = device
            .supported_input_configs()
            .map_err(|e| AudioError::Config(e.to_string()))?
            .collect();
        let negotiated = negotiate(&ranges, desired)
            .ok_or_else(|| AudioError::Config(format!("{} offers no usable input format", name)))?;

        log::info!(
            "Recording from {}: {:?} ({:?})",
            name,
            negotiated.spec,
            negotiated.format
        );

        let stream = input::build_recorder(&device, &negotiated.config, negotiated.format, buffer)?;
        Ok(Box::new(CpalDevice::new_paused(
            DeviceRole::Recorder,
            stream,
            negotiated.spec,
        )))
    }

    fn open_player(
        &mut self,
        desired: &AudioSpec,
        recorded: &AudioSpec,
        buffer: SharedBuffer,
    ) -> Result<Box<dyn AudioDevice>, AudioError> {
        let device = self
            .host
            .default_output_device()
            .ok_or(AudioError::NoOutputDevice)?;

        let name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        let ranges: Vec<_> = device
            .supported_output_configs()
            .map_err(|e| AudioError::Config(e.to_string()))?
            .collect();

        // Ask for the recorded layout so the take plays back unconverted
        let wanted = AudioSpec {
            sample_rate: recorded.sample_rate,
            channels: recorded.channels,
            ..*desired
        };
        let negotiated = negotiate(&ranges, &wanted)
            .ok_or_else(|| AudioError::Config(format!("{} offers no usable output format", name)))?;

        if negotiated.spec.sample_rate != recorded.sample_rate {
            log::warn!(
                "{} plays at {}Hz but the take is {}Hz; playback speed will differ",
                name,
                negotiated.spec.sample_rate,
                recorded.sample_rate
            );
        }
        log::info!(
            "Playing through {}: {:?} ({:?})",
            name,
            negotiated.spec,
            negotiated.format
        );

        let stream = output::build_player(
            &device,
            &negotiated.config,
            negotiated.format,
            buffer,
            recorded.channels as usize,
        )?;
        Ok(Box::new(CpalDevice::new_paused(
            DeviceRole::Player,
            stream,
            negotiated.spec,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cpal::SampleRate;

    fn range(channels: u16, min: u32, max: u32, format: SampleFormat) -> SupportedStreamConfigRange {
        SupportedStreamConfigRange::new(
            channels,
            SampleRate(min),
            SampleRate(max),
            SupportedBufferSize::Range { min: 64, max: 8192 },
            format,
        )
    }

    #[test]
    fn test_prefers_exact_f32_match() {
        let ranges = vec![
            range(2, 8000, 96000, SampleFormat::I16),
            range(1, 8000, 96000, SampleFormat::F32),
            range(2, 8000, 96000, SampleFormat::F32),
        ];
        let n = negotiate(&ranges, &AudioSpec::default()).unwrap();
        assert_eq!(n.format, SampleFormat::F32);
        assert_eq!(n.spec, AudioSpec::default());
        assert_eq!(n.config.buffer_size, cpal::BufferSize::Fixed(4096));
    }

    #[test]
    fn test_falls_back_to_convertible_format() {
        let ranges = vec![range(2, 44100, 48000, SampleFormat::I16)];
        let n = negotiate(&ranges, &AudioSpec::default()).unwrap();
        assert_eq!(n.format, SampleFormat::I16);
        assert_eq!(n.spec.bytes_per_sample, 4);
        assert_eq!(n.spec.channels, 2);
    }

    #[test]
    fn test_negotiated_channels_and_rate_may_differ() {
        let ranges = vec![range(1, 48000, 48000, SampleFormat::F32)];
        let n = negotiate(&ranges, &AudioSpec::default()).unwrap();
        assert_eq!(n.spec.channels, 1);
        assert_eq!(n.spec.sample_rate, 48000);
    }

    #[test]
    fn test_period_clamped_to_device_range() {
        let ranges = vec![SupportedStreamConfigRange::new(
            2,
            SampleRate(44100),
            SampleRate(44100),
            SupportedBufferSize::Range { min: 128, max: 1024 },
            SampleFormat::F32,
        )];
        let n = negotiate(&ranges, &AudioSpec::default()).unwrap();
        assert_eq!(n.spec.period_frames, 1024);
    }

    #[test]
    fn test_no_convertible_format() {
        let ranges = vec![range(2, 44100, 44100, SampleFormat::I32)];
        assert!(negotiate(&ranges, &AudioSpec::default()).is_none());
    }
}
