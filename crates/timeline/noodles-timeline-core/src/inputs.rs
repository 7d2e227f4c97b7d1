//! Input contracts for `TimelineEngine::update`.
//!
//! Hosts batch transport commands per tick; they are applied to the active
//! timeline, in order, before time is advanced.

use serde::{Deserialize, Serialize};

use crate::data::Frame;

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Inputs {
    /// Transport commands applied before stepping.
    #[serde(default)]
    pub commands: Vec<TransportCommand>,
}

impl Inputs {
    pub fn with_command(mut self, command: TransportCommand) -> Self {
        self.commands.push(command);
        self
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum TransportCommand {
    Play,
    PlayReverse,
    Pause,
    /// Pause and rewind to the range start.
    Stop,
    GoToFrame { frame: Frame },
    NextKey,
    PreviousKey,
    SetFrameRateMs { frame_rate_ms: i32 },
    SetLooping { looping: bool },
    SetRecord { record: bool },
}
