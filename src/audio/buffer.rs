//! In-memory take buffer shared between the UI thread and the device callbacks
//!
//! A take is stored as raw bytes with a single cursor. The recording callback
//! appends at the cursor, the playback callback reads from it, and the UI
//! thread decides when a pass is over by comparing the cursor with the
//! logical limit.
//!
//! ## Sharing
//!
//! The buffer lives behind a mutex inside [`SharedBuffer`]. Device callbacks
//! only ever `try_lock` it: if the UI thread is holding the lock for its
//! limit check the callback skips that period instead of waiting, so the
//! audio thread never blocks. The UI thread takes the lock for the short
//! "compare cursor, pause device" sequence so that it is atomic with respect
//! to a cursor advance.
//!
//! ## Bounds
//!
//! Callers are trusted to stop before the end of the buffer; the poller
//! pauses the active device once the cursor passes `max_pos`, and the buffer
//! carries one second of headroom for the period that may land in between.
//! Copies that would still cross `capacity` are truncated and the cursor
//! saturates, so `cursor <= capacity` always holds.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};

use super::device::AudioSpec;

/// Fixed-capacity byte buffer with a single read/write cursor
#[derive(Debug, Default)]
pub struct AudioBuffer {
    data: Vec<u8>,
    cursor: usize,
    max_pos: usize,
}

impl AudioBuffer {
    /// A zero-capacity buffer, used before any device has been opened
    pub fn empty() -> Self {
        Self::default()
    }

    /// Allocate `capacity` zeroed bytes with a logical limit of `max_pos`.
    ///
    /// `max_pos` is clamped to `capacity`.
    pub fn with_limits(capacity: usize, max_pos: usize) -> Self {
        Self {
            data: vec![0; capacity],
            cursor: 0,
            max_pos: max_pos.min(capacity),
        }
    }

    /// Size a buffer for `max_seconds` of audio in the given format, plus
    /// one second of headroom.
    pub fn for_spec(spec: &AudioSpec, max_seconds: u32) -> Self {
        let bytes_per_second = spec.bytes_per_second();
        Self::with_limits(
            (max_seconds as usize + 1) * bytes_per_second,
            max_seconds as usize * bytes_per_second,
        )
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn max_pos(&self) -> usize {
        self.max_pos
    }

    #[cfg(test)]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Rewind the cursor to the start of the buffer
    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    /// Clear the whole buffer, headroom included.
    ///
    /// Playback reads past `max_pos` until the next poll, so bytes left in
    /// the headroom by an earlier, longer pass would otherwise be heard.
    pub fn zero_fill(&mut self) {
        self.data.fill(0);
    }

    /// Copy `source` into the buffer at the cursor and advance past it
    #[inline]
    pub fn append_from(&mut self, source: &[u8]) {
        let end = (self.cursor + source.len()).min(self.data.len());
        let count = end - self.cursor;
        self.data[self.cursor..end].copy_from_slice(&source[..count]);
        self.cursor = end;
    }

    /// Copy bytes from the cursor into `destination` and advance past them.
    ///
    /// Any part of `destination` beyond the end of the buffer is silenced.
    #[inline]
    pub fn fill_into(&mut self, destination: &mut [u8]) {
        let end = (self.cursor + destination.len()).min(self.data.len());
        let count = end - self.cursor;
        destination[..count].copy_from_slice(&self.data[self.cursor..end]);
        destination[count..].fill(0);
        self.cursor = end;
    }

    /// Whether the cursor has moved beyond the logical limit.
    ///
    /// Strictly greater: the device is stopped on the first poll after the
    /// limit is crossed, so up to one period past `max_pos` gets copied.
    pub fn is_past_limit(&self) -> bool {
        self.cursor > self.max_pos
    }

    /// Append one sample as native-endian `f32` bytes
    #[inline]
    pub fn write_sample(&mut self, sample: f32) {
        self.append_from(&sample.to_ne_bytes());
    }

    /// Read one native-endian `f32` sample, silence past the end
    #[inline]
    pub fn read_sample(&mut self) -> f32 {
        let mut bytes = [0u8; 4];
        self.fill_into(&mut bytes);
        f32::from_ne_bytes(bytes)
    }

    /// Fraction of the logical region the cursor has covered, in `0.0..=1.0`
    pub fn progress(&self) -> f32 {
        if self.max_pos == 0 {
            return 0.0;
        }
        (self.cursor as f32 / self.max_pos as f32).min(1.0)
    }
}

/// Lock-guarded handle to the take buffer
///
/// Cloned into each device callback; the session keeps its own reference.
pub struct SharedBuffer {
    inner: Arc<Mutex<AudioBuffer>>,
}

impl SharedBuffer {
    /// Create an unallocated shared buffer
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(AudioBuffer::empty())),
        }
    }

    /// Lock the buffer from the UI thread.
    ///
    /// A callback that panicked mid-copy leaves plain bytes behind, so a
    /// poisoned lock is still usable.
    pub fn lock(&self) -> MutexGuard<'_, AudioBuffer> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Lock the buffer from a device callback without waiting
    #[inline]
    pub fn try_lock(&self) -> Option<MutexGuard<'_, AudioBuffer>> {
        match self.inner.try_lock() {
            Ok(guard) => Some(guard),
            Err(TryLockError::Poisoned(poisoned)) => Some(poisoned.into_inner()),
            Err(TryLockError::WouldBlock) => None,
        }
    }

    /// Clone reference to share between threads
    pub fn clone_ref(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Default for SharedBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for SharedBuffer {
    fn clone(&self) -> Self {
        self.clone_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cd_spec() -> AudioSpec {
        AudioSpec {
            sample_rate: 44100,
            channels: 2,
            bytes_per_sample: 4,
            period_frames: 4096,
        }
    }

    #[test]
    fn test_sizing_from_negotiated_spec() {
        let buffer = AudioBuffer::for_spec(&cd_spec(), 5);
        assert_eq!(buffer.max_pos(), 5 * 44100 * 2 * 4);
        assert_eq!(buffer.capacity(), 6 * 44100 * 2 * 4);
        assert_eq!(buffer.cursor(), 0);
        assert!(buffer.as_bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_max_pos_clamped_to_capacity() {
        let buffer = AudioBuffer::with_limits(8, 100);
        assert_eq!(buffer.max_pos(), 8);
    }

    #[test]
    fn test_append_and_fill_advance_cursor() {
        let mut buffer = AudioBuffer::with_limits(16, 12);
        buffer.append_from(&[1, 2, 3, 4]);
        buffer.append_from(&[5, 6]);
        assert_eq!(buffer.cursor(), 6);
        assert_eq!(&buffer.as_bytes()[..6], &[1, 2, 3, 4, 5, 6]);

        buffer.reset();
        let mut out = [0u8; 4];
        buffer.fill_into(&mut out);
        assert_eq!(out, [1, 2, 3, 4]);
        assert_eq!(buffer.cursor(), 4);
    }

    #[test]
    fn test_cursor_never_exceeds_capacity() {
        let mut buffer = AudioBuffer::with_limits(10, 6);
        for _ in 0..5 {
            buffer.append_from(&[7; 4]);
            assert!(buffer.cursor() <= buffer.capacity());
        }
        assert_eq!(buffer.cursor(), 10);

        buffer.reset();
        let mut out = [0xFFu8; 4];
        for _ in 0..5 {
            buffer.fill_into(&mut out);
            assert!(buffer.cursor() <= buffer.capacity());
        }
        // Past the end the destination is silenced
        assert_eq!(out, [0; 4]);
    }

    #[test]
    fn test_fill_into_silences_tail_across_end() {
        let mut buffer = AudioBuffer::with_limits(6, 4);
        buffer.append_from(&[9; 6]);
        buffer.reset();
        buffer.append_from(&[1, 1, 1, 1]);

        let mut out = [0xAAu8; 4];
        buffer.fill_into(&mut out);
        assert_eq!(out, [9, 9, 0, 0]);
    }

    #[test]
    fn test_limit_is_strictly_greater() {
        let mut buffer = AudioBuffer::with_limits(12, 8);
        buffer.append_from(&[0; 8]);
        assert!(!buffer.is_past_limit());
        buffer.append_from(&[0; 1]);
        assert!(buffer.is_past_limit());
    }

    #[test]
    fn test_reset_clears_limit() {
        let mut buffer = AudioBuffer::for_spec(&cd_spec(), 1);
        let period = [0u8; 4096 * 8];
        while !buffer.is_past_limit() {
            buffer.append_from(&period);
        }
        buffer.reset();
        assert!(!buffer.is_past_limit());
    }

    #[test]
    fn test_zero_fill_clears_headroom_too() {
        let mut buffer = AudioBuffer::with_limits(12, 8);
        buffer.append_from(&[3; 12]);
        buffer.zero_fill();
        assert!(buffer.as_bytes().iter().all(|&b| b == 0));
        assert_eq!(buffer.cursor(), 12);
    }

    #[test]
    fn test_rerecord_does_not_replay_earlier_overshoot() {
        let mut buffer = AudioBuffer::with_limits(24, 16);

        // First take runs all the way into the headroom
        buffer.append_from(&[0x7F; 24]);

        // Second take stops on the first poll past the limit
        buffer.reset();
        buffer.zero_fill();
        while !buffer.is_past_limit() {
            buffer.append_from(&[0x11; 4]);
        }
        assert_eq!(buffer.cursor(), 20);

        // Playback uses a longer period and overshoots further
        buffer.reset();
        let mut period = [0u8; 8];
        while !buffer.is_past_limit() {
            buffer.fill_into(&mut period);
            assert!(!period.contains(&0x7F), "played {:?}", period);
        }
        assert_eq!(period, [0x11, 0x11, 0x11, 0x11, 0, 0, 0, 0]);
    }

    #[test]
    fn test_sample_accessors() {
        let mut buffer = AudioBuffer::with_limits(12, 12);
        buffer.write_sample(0.5);
        buffer.write_sample(-0.25);
        buffer.reset();
        assert_eq!(buffer.read_sample(), 0.5);
        assert_eq!(buffer.read_sample(), -0.25);
        assert_eq!(buffer.read_sample(), 0.0);
        assert_eq!(buffer.read_sample(), 0.0);
        assert_eq!(buffer.cursor(), 12);
    }

    #[test]
    fn test_progress() {
        let mut buffer = AudioBuffer::with_limits(12, 8);
        assert_eq!(buffer.progress(), 0.0);
        buffer.append_from(&[0; 4]);
        assert_eq!(buffer.progress(), 0.5);
        buffer.append_from(&[0; 8]);
        assert_eq!(buffer.progress(), 1.0);
        assert_eq!(AudioBuffer::empty().progress(), 0.0);
    }

    #[test]
    fn test_callback_skips_while_ui_holds_lock() {
        let shared = SharedBuffer::new();
        *shared.lock() = AudioBuffer::with_limits(8, 4);

        let callback_side = shared.clone_ref();
        let guard = shared.lock();
        assert!(callback_side.try_lock().is_none());
        drop(guard);

        callback_side.try_lock().unwrap().write_sample(1.0);
        assert_eq!(shared.lock().cursor(), 4);
    }
}
