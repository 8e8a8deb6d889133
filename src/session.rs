//! Recording session
//!
//! Owns the devices, the take buffer and the current state, and executes the
//! effects produced by the reducer. The UI thread calls [`Session::poll`]
//! once per frame and forwards digit keys to [`Session::key_pressed`].
//!
//! Every dispatch holds the buffer lock for its whole run, so the poll's
//! "compare cursor with limit, then pause" is atomic with respect to the
//! device callbacks advancing the cursor.

use std::collections::VecDeque;

use crate::audio::{AudioBackend, AudioBuffer, AudioDevice, AudioSpec, DeviceRole, SharedBuffer};
use crate::state::{reduce, Effect, Event, Failure, Prompt, State};

/// Session parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionConfig {
    /// Format requested from both devices
    pub desired: AudioSpec,
    /// Length of a take
    pub max_seconds: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            desired: AudioSpec::default(),
            max_seconds: 5,
        }
    }
}

pub struct Session {
    backend: Box<dyn AudioBackend>,
    config: SessionConfig,
    state: State,
    prompt: String,
    devices: Vec<String>,
    buffer: SharedBuffer,
    /// Progress of the running pass, sampled while the buffer lock is held
    progress: Option<f32>,
    recorder: Option<Box<dyn AudioDevice>>,
    player: Option<Box<dyn AudioDevice>>,
}

impl Session {
    /// Enumerate capture devices and start in device selection.
    ///
    /// With no capture devices the session starts in the error state.
    pub fn new(backend: Box<dyn AudioBackend>, config: SessionConfig) -> Self {
        let (state, prompt, devices) = match backend.capture_devices() {
            Ok(devices) => {
                log::info!("Found {} capture device(s)", devices.len());
                (
                    State::SelectingDevice {
                        device_count: devices.len(),
                    },
                    Prompt::SelectDevice,
                    devices,
                )
            }
            Err(e) => {
                log::error!("Unable to get audio capture device: {}", e);
                let failure = Failure::NoCaptureDevices;
                (State::Error(failure), Prompt::Failed(failure), Vec::new())
            }
        };

        Self {
            backend,
            config,
            state,
            prompt: prompt.text(config.max_seconds),
            devices,
            buffer: SharedBuffer::new(),
            progress: None,
            recorder: None,
            player: None,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Capture devices offered for selection
    pub fn devices(&self) -> &[String] {
        &self.devices
    }

    /// Handle to the take buffer shared with the device callbacks
    #[cfg(test)]
    pub fn buffer(&self) -> SharedBuffer {
        self.buffer.clone_ref()
    }

    /// Fraction of the take covered by the running device, as of the last
    /// poll or key press
    pub fn progress(&self) -> Option<f32> {
        self.progress
    }

    /// Forward a digit key press
    pub fn key_pressed(&mut self, digit: u8) {
        self.dispatch(Event::Key(digit));
    }

    /// Stop the running device once its cursor passes the take limit, and
    /// sample progress under the same lock.
    ///
    /// Safe to call every frame in any state.
    pub fn poll(&mut self) {
        if self.state.active_device().is_none() {
            return;
        }
        let shared = self.buffer.clone_ref();
        let mut buffer = shared.lock();
        if buffer.is_past_limit() {
            self.run(Event::LimitReached, &mut buffer);
        } else {
            self.sample_progress(&buffer);
        }
    }

    /// Close both devices and release the buffer, mid-take or not
    pub fn shutdown(&mut self) {
        if self.recorder.is_none() && self.player.is_none() && self.buffer.lock().capacity() == 0
        {
            return;
        }
        log::info!("Shutting down session in state {}", self.state.name());
        self.recorder = None;
        self.player = None;
        self.progress = None;
        *self.buffer.lock() = AudioBuffer::empty();
    }

    fn dispatch(&mut self, event: Event) {
        let shared = self.buffer.clone_ref();
        let mut buffer = shared.lock();
        self.run(event, &mut buffer);
    }

    /// Feed `event` and any follow-up events through the reducer
    fn run(&mut self, event: Event, buffer: &mut AudioBuffer) {
        let mut pending = VecDeque::from([event]);
        while let Some(event) = pending.pop_front() {
            let (next, effects) = reduce(&self.state, event);
            if next != self.state {
                log::info!("{} -> {}", self.state.name(), next.name());
            }
            self.state = next;
            for effect in effects {
                if let Some(follow_up) = self.execute(effect, buffer) {
                    pending.push_back(follow_up);
                }
            }
        }
        self.sample_progress(buffer);
    }

    fn sample_progress(&mut self, buffer: &AudioBuffer) {
        self.progress = self.state.active_device().map(|_| buffer.progress());
    }

    fn execute(&mut self, effect: Effect, buffer: &mut AudioBuffer) -> Option<Event> {
        match effect {
            Effect::OpenDevices { index } => Some(self.open_devices(index, buffer)),
            Effect::ResetCursor => {
                buffer.reset();
                None
            }
            Effect::ZeroFill => {
                buffer.zero_fill();
                None
            }
            Effect::Resume(role) => {
                if let Some(device) = self.device_mut(role) {
                    device.resume();
                }
                None
            }
            Effect::Pause(role) => {
                if let Some(device) = self.device_mut(role) {
                    device.pause();
                }
                None
            }
            Effect::ShowPrompt(prompt) => {
                self.prompt = prompt.text(self.config.max_seconds);
                None
            }
        }
    }

    fn device_mut(&mut self, role: DeviceRole) -> Option<&mut Box<dyn AudioDevice>> {
        match role {
            DeviceRole::Recorder => self.recorder.as_mut(),
            DeviceRole::Player => self.player.as_mut(),
        }
    }

    /// Open the recorder, then the player, then size the buffer from the
    /// recorder's negotiated spec
    fn open_devices(&mut self, index: usize, buffer: &mut AudioBuffer) -> Event {
        let name = self.devices.get(index).map(String::as_str).unwrap_or("?");
        log::info!("Opening capture device {}: {}", index, name);

        let desired = self.config.desired;
        let recorder = match self
            .backend
            .open_recorder(index, &desired, self.buffer.clone_ref())
        {
            Ok(device) => device,
            Err(e) => {
                log::error!("Failed to open recording device: {}", e);
                return Event::OpenFailed(DeviceRole::Recorder);
            }
        };
        let recorded = recorder.spec();
        self.recorder = Some(recorder);

        let player = match self
            .backend
            .open_player(&desired, &recorded, self.buffer.clone_ref())
        {
            Ok(device) => device,
            Err(e) => {
                log::error!("Failed to open playback device: {}", e);
                return Event::OpenFailed(DeviceRole::Player);
            }
        };
        self.player = Some(player);

        *buffer = AudioBuffer::for_spec(&recorded, self.config.max_seconds);
        log::info!(
            "Allocated {} byte take buffer, limit {} bytes",
            buffer.capacity(),
            buffer.max_pos()
        );
        Event::DevicesOpened
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.shutdown();
    }
}
