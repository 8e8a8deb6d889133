//! Playback callback
//!
//! Reads the take back frame by frame from the cursor. When the output
//! device negotiated a different channel count than the recording, extra
//! output channels repeat the last recorded channel and surplus recorded
//! channels are skipped.

use cpal::traits::DeviceTrait;
use cpal::{FromSample, Sample, SampleFormat, SizedSample, StreamConfig};

use super::buffer::{AudioBuffer, SharedBuffer};
use super::device::AudioError;

/// Build an output stream that replays `buffer`
pub(super) fn build_player(
    device: &cpal::Device,
    config: &StreamConfig,
    format: SampleFormat,
    buffer: SharedBuffer,
    recorded_channels: usize,
) -> Result<cpal::Stream, AudioError> {
    match format {
        SampleFormat::F32 => play_stream::<f32>(device, config, buffer, recorded_channels),
        SampleFormat::I16 => play_stream::<i16>(device, config, buffer, recorded_channels),
        SampleFormat::U16 => play_stream::<u16>(device, config, buffer, recorded_channels),
        format => Err(AudioError::UnsupportedFormat(format!("{:?}", format))),
    }
}

fn play_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    buffer: SharedBuffer,
    recorded_channels: usize,
) -> Result<cpal::Stream, AudioError>
where
    T: SizedSample + FromSample<f32>,
{
    let channels = config.channels as usize;

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| match buffer.try_lock() {
                Some(mut take) => {
                    for frame in data.chunks_mut(channels) {
                        fill_frame(&mut take, frame, recorded_channels);
                    }
                }
                None => data.fill(T::EQUILIBRIUM),
            },
            |err| log::error!("Playback stream error: {}", err),
            None,
        )
        .map_err(|e| AudioError::StreamBuild(e.to_string()))
}

/// Consume one recorded frame from the cursor into an output frame
#[inline]
fn fill_frame<T>(take: &mut AudioBuffer, frame: &mut [T], recorded_channels: usize)
where
    T: Sample + FromSample<f32>,
{
    let mut last = 0.0;
    for ch in 0..recorded_channels {
        last = take.read_sample();
        if let Some(slot) = frame.get_mut(ch) {
            *slot = T::from_sample(last);
        }
    }
    for slot in frame.iter_mut().skip(recorded_channels) {
        *slot = T::from_sample(last);
    }
}
