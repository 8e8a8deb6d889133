//! Recording state machine
//!
//! All transitions go through [`reduce`], which returns the next state and
//! the effects to run. The session executes effects against the devices and
//! the take buffer; device-open results come back in as events.

use crate::audio::DeviceRole;

/// What went wrong, for the terminal error state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    /// No capture devices could be listed
    NoCaptureDevices,
    /// Opening the recording or playback device failed
    DeviceOpen(DeviceRole),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    SelectingDevice { device_count: usize },
    Stopped,
    Recording,
    Recorded,
    Playback,
    Error(Failure),
}

impl State {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SelectingDevice { .. } => "Selecting device",
            Self::Stopped => "Stopped",
            Self::Recording => "Recording",
            Self::Recorded => "Recorded",
            Self::Playback => "Playback",
            Self::Error(_) => "Error",
        }
    }

    /// The device whose cursor the per-frame poll has to watch
    pub fn active_device(&self) -> Option<DeviceRole> {
        match self {
            Self::Recording => Some(DeviceRole::Recorder),
            Self::Playback => Some(DeviceRole::Player),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Digit key 0-9
    Key(u8),
    /// The poll found the cursor past the take limit
    LimitReached,
    /// Both devices opened and the buffer is allocated
    DevicesOpened,
    /// A device failed to open
    OpenFailed(DeviceRole),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Open the capture device at `index` and the default output device
    OpenDevices { index: usize },
    ResetCursor,
    ZeroFill,
    Resume(DeviceRole),
    Pause(DeviceRole),
    ShowPrompt(Prompt),
}

/// User-facing instruction for the current state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prompt {
    SelectDevice,
    ReadyToRecord,
    Recording,
    Recorded,
    Playing,
    Failed(Failure),
}

impl Prompt {
    pub fn text(&self, max_seconds: u32) -> String {
        match self {
            Self::SelectDevice => "Select your recording device:".to_string(),
            Self::ReadyToRecord => format!("Press 1 to record for {} seconds.", max_seconds),
            Self::Recording => "Recording...".to_string(),
            Self::Recorded => "Press 1 to play back. Press 2 to record again.".to_string(),
            Self::Playing => "Playing...".to_string(),
            Self::Failed(Failure::NoCaptureDevices) => {
                "Unable to get audio capture device!".to_string()
            }
            Self::Failed(Failure::DeviceOpen(role)) => format!("Failed to open {} device!", role),
        }
    }
}

/// Reducer: (state, event) -> (next_state, effects)
///
/// Pairs not listed leave the state untouched and produce no effects.
pub fn reduce(state: &State, event: Event) -> (State, Vec<Effect>) {
    use DeviceRole::{Player, Recorder};
    use Effect::*;
    use Event::*;

    match (*state, event) {
        (State::SelectingDevice { device_count }, Key(digit)) if (digit as usize) < device_count => {
            (*state, vec![OpenDevices { index: digit as usize }])
        }
        (State::SelectingDevice { .. }, DevicesOpened) => {
            (State::Stopped, vec![ShowPrompt(Prompt::ReadyToRecord)])
        }
        (State::SelectingDevice { .. }, OpenFailed(role)) => {
            let failure = Failure::DeviceOpen(role);
            (State::Error(failure), vec![ShowPrompt(Prompt::Failed(failure))])
        }

        (State::Stopped, Key(1)) => (
            State::Recording,
            vec![ResetCursor, Resume(Recorder), ShowPrompt(Prompt::Recording)],
        ),

        (State::Recording, LimitReached) => (
            State::Recorded,
            vec![Pause(Recorder), ShowPrompt(Prompt::Recorded)],
        ),

        (State::Recorded, Key(1)) => (
            State::Playback,
            vec![ResetCursor, Resume(Player), ShowPrompt(Prompt::Playing)],
        ),
        (State::Recorded, Key(2)) => (
            State::Recording,
            vec![
                ResetCursor,
                ZeroFill,
                Resume(Recorder),
                ShowPrompt(Prompt::Recording),
            ],
        ),

        (State::Playback, LimitReached) => (
            State::Recorded,
            vec![Pause(Player), ShowPrompt(Prompt::Recorded)],
        ),

        _ => (*state, vec![]),
    }
}
