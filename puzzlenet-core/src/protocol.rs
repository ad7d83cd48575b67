//! Puzzlenet link protocol: command vocabulary, message triplet and timing constants.

use std::fmt;

/// Field delimiter on the wire. Never allowed inside `command` or `data`.
pub const DELIMITER: char = '|';

/// Largest datagram the radio carries.
pub const MAX_PAYLOAD: usize = 250;

/// A peer with no traffic for longer than this is disconnected.
pub const HEARTBEAT_TIMEOUT_MS: u64 = 30_000;

/// Coordinator → satellite heartbeat period.
pub const COORDINATOR_HEARTBEAT_MS: u64 = 10_000;

/// Satellite → coordinator heartbeat period.
pub const SATELLITE_HEARTBEAT_MS: u64 = 15_000;

/// Same-key repeats inside this window are suppressed on selection keypads.
pub const KEY_DEBOUNCE_MS: u64 = 200;

/// Minimum spacing between accepted contact-sensor samples.
pub const CONTACT_DEBOUNCE_MS: u64 = 100;

/// Contact detections are ignored this long after entering the waiting stage.
pub const CONTACT_ARMING_MS: u64 = 300;

/// How long the lock relay stays energized.
pub const LOCK_HOLD_MS: u64 = 5_000;

/// How long an error notice stays on the display before the prompt returns.
pub const NOTICE_MS: u64 = 2_000;

/// Hint button hold time before a hint request is sent.
pub const HINT_HOLD_MS: u64 = 3_000;

/// Closed command vocabulary exchanged between coordinator and satellites.
/// Anything else decodes to `Unknown` so dispatch can report it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Command {
    Heartbeat,
    StatusUpdate,
    CodeEntered,
    CodeCorrect,
    CodeIncorrect,
    Tag1Detected,
    Tag2Detected,
    MagnetDetected,
    LanguageSelected,
    LockOpened,
    HintRequest,
    AudioFinished,
    VolumeSet,
    Status,
    PlayAudio,
    StopAudio,
    SetVolume,
    StartGame,
    PauseGame,
    ResumeGame,
    EndGame,
    ResetPuzzle,
    OpenLock,
    GetStatus,
    Restart,
    RelayOn,
    Error,
    Unknown(String),
}

impl Command {
    pub fn as_str(&self) -> &str {
        match self {
            Command::Heartbeat => "heartbeat",
            Command::StatusUpdate => "status_update",
            Command::CodeEntered => "code_entered",
            Command::CodeCorrect => "code_correct",
            Command::CodeIncorrect => "code_incorrect",
            Command::Tag1Detected => "tag1_detected",
            Command::Tag2Detected => "tag2_detected",
            Command::MagnetDetected => "magnet_detected",
            Command::LanguageSelected => "language_selected",
            Command::LockOpened => "lock_opened",
            Command::HintRequest => "hint_request",
            Command::AudioFinished => "audio_finished",
            Command::VolumeSet => "volume_set",
            Command::Status => "status",
            Command::PlayAudio => "play_audio",
            Command::StopAudio => "stop_audio",
            Command::SetVolume => "set_volume",
            Command::StartGame => "start_game",
            Command::PauseGame => "pause_game",
            Command::ResumeGame => "resume_game",
            Command::EndGame => "end_game",
            Command::ResetPuzzle => "reset_puzzle",
            Command::OpenLock => "open_lock",
            Command::GetStatus => "get_status",
            Command::Restart => "restart",
            Command::RelayOn => "relay_on",
            Command::Error => "error",
            Command::Unknown(s) => s,
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "heartbeat" => Command::Heartbeat,
            "status_update" => Command::StatusUpdate,
            "code_entered" => Command::CodeEntered,
            "code_correct" => Command::CodeCorrect,
            "code_incorrect" => Command::CodeIncorrect,
            "tag1_detected" => Command::Tag1Detected,
            "tag2_detected" => Command::Tag2Detected,
            "magnet_detected" => Command::MagnetDetected,
            "language_selected" => Command::LanguageSelected,
            "lock_opened" => Command::LockOpened,
            "hint_request" => Command::HintRequest,
            "audio_finished" => Command::AudioFinished,
            "volume_set" => Command::VolumeSet,
            "status" => Command::Status,
            "play_audio" => Command::PlayAudio,
            "stop_audio" => Command::StopAudio,
            "set_volume" => Command::SetVolume,
            "start_game" => Command::StartGame,
            "pause_game" => Command::PauseGame,
            "resume_game" => Command::ResumeGame,
            "end_game" => Command::EndGame,
            "reset_puzzle" => Command::ResetPuzzle,
            "open_lock" => Command::OpenLock,
            "get_status" => Command::GetStatus,
            "restart" => Command::Restart,
            "relay_on" => Command::RelayOn,
            "error" => Command::Error,
            other => Command::Unknown(other.to_string()),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One application message. `timestamp` is the sender's millisecond counter since boot;
/// it is not comparable across nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub command: Command,
    pub data: String,
    pub timestamp: u64,
}

impl Message {
    pub fn new(command: Command, data: impl Into<String>, timestamp: u64) -> Self {
        Self {
            command,
            data: data.into(),
            timestamp,
        }
    }
}
