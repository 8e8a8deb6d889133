//! Recording callback
//!
//! Captured samples are converted to `f32` and appended to the take buffer
//! at the cursor. The callback never waits for the lock: while the UI thread
//! holds it the period is dropped.

use cpal::traits::DeviceTrait;
use cpal::{FromSample, Sample, SampleFormat, SizedSample, StreamConfig};

use super::buffer::SharedBuffer;
use super::device::AudioError;

/// Build a capture stream that appends into `buffer`
pub(super) fn build_recorder(
    device: &cpal::Device,
    config: &StreamConfig,
    format: SampleFormat,
    buffer: SharedBuffer,
) -> Result<cpal::Stream, AudioError> {
    match format {
        SampleFormat::F32 => record_stream::<f32>(device, config, buffer),
        SampleFormat::I16 => record_stream::<i16>(device, config, buffer),
        SampleFormat::U16 => record_stream::<u16>(device, config, buffer),
        format => Err(AudioError::UnsupportedFormat(format!("{:?}", format))),
    }
}

fn record_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    buffer: SharedBuffer,
) -> Result<cpal::Stream, AudioError>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                if let Some(mut take) = buffer.try_lock() {
                    for &sample in data {
                        take.write_sample(sample.to_sample::<f32>());
                    }
                }
            },
            |err| log::error!("Recording stream error: {}", err),
            None,
        )
        .map_err(|e| AudioError::StreamBuild(e.to_string()))
}
