//! Typed dispatch: maps a decoded [`Message`] to the action it asks of the
//! receiving role. Commands that make no sense for a role are `UnknownCommand`.

use crate::peripherals::MAX_VOLUME;
use crate::protocol::{Command, Message, LOCK_HOLD_MS};

/// Coordinator → satellite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SatelliteRequest {
    Heartbeat,
    ResetPuzzle,
    OpenLock,
    GetStatus,
    Restart,
    RelayOn { hold_ms: u64 },
    PlayAudio(String),
    StopAudio,
    SetVolume(u8),
    StartGame(String),
    PauseGame,
    ResumeGame,
    EndGame(String),
}

/// Satellite → coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SatelliteReport {
    Heartbeat,
    StatusUpdate(String),
    CodeEntered(String),
    CodeCorrect(String),
    CodeIncorrect(String),
    Tag1Detected(String),
    Tag2Detected(String),
    MagnetDetected,
    LanguageSelected(String),
    LockOpened(String),
    HintRequest,
    AudioFinished(String),
    VolumeSet(String),
    Status(String),
    Error(String),
}

/// No handler for this command on the receiving role. Logged, never replied to.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown command {command:?}")]
pub struct UnknownCommand {
    pub command: String,
}

impl UnknownCommand {
    fn of(command: &Command) -> Self {
        Self {
            command: command.as_str().to_string(),
        }
    }
}

/// Volume from a `set_volume` payload. Non-numeric text reads as 0.
pub fn parse_volume(data: &str) -> u8 {
    let v = data.trim().parse::<i64>().unwrap_or(0);
    v.clamp(0, MAX_VOLUME as i64) as u8
}

/// Hold time from a `relay_on` payload. Missing or invalid means the default hold.
pub fn parse_hold(data: &str) -> u64 {
    match data.trim().parse::<u64>() {
        Ok(ms) if ms > 0 => ms,
        _ => LOCK_HOLD_MS,
    }
}

pub fn satellite_request(msg: &Message) -> Result<SatelliteRequest, UnknownCommand> {
    let data = msg.data.as_str();
    let request = match &msg.command {
        Command::Heartbeat => SatelliteRequest::Heartbeat,
        Command::ResetPuzzle => SatelliteRequest::ResetPuzzle,
        Command::OpenLock => SatelliteRequest::OpenLock,
        Command::GetStatus => SatelliteRequest::GetStatus,
        Command::Restart => SatelliteRequest::Restart,
        Command::RelayOn => SatelliteRequest::RelayOn {
            hold_ms: parse_hold(data),
        },
        Command::PlayAudio => SatelliteRequest::PlayAudio(data.trim().to_string()),
        Command::StopAudio => SatelliteRequest::StopAudio,
        Command::SetVolume => SatelliteRequest::SetVolume(parse_volume(data)),
        Command::StartGame => SatelliteRequest::StartGame(data.to_string()),
        Command::PauseGame => SatelliteRequest::PauseGame,
        Command::ResumeGame => SatelliteRequest::ResumeGame,
        Command::EndGame => SatelliteRequest::EndGame(data.to_string()),
        c @ (Command::StatusUpdate
        | Command::CodeEntered
        | Command::CodeCorrect
        | Command::CodeIncorrect
        | Command::Tag1Detected
        | Command::Tag2Detected
        | Command::MagnetDetected
        | Command::LanguageSelected
        | Command::LockOpened
        | Command::HintRequest
        | Command::AudioFinished
        | Command::VolumeSet
        | Command::Status
        | Command::Error
        | Command::Unknown(_)) => return Err(UnknownCommand::of(c)),
    };
    Ok(request)
}

pub fn satellite_report(msg: &Message) -> Result<SatelliteReport, UnknownCommand> {
    let data = msg.data.clone();
    let report = match &msg.command {
        Command::Heartbeat => SatelliteReport::Heartbeat,
        Command::StatusUpdate => SatelliteReport::StatusUpdate(data),
        Command::CodeEntered => SatelliteReport::CodeEntered(data),
        Command::CodeCorrect => SatelliteReport::CodeCorrect(data),
        Command::CodeIncorrect => SatelliteReport::CodeIncorrect(data),
        Command::Tag1Detected => SatelliteReport::Tag1Detected(data),
        Command::Tag2Detected => SatelliteReport::Tag2Detected(data),
        Command::MagnetDetected => SatelliteReport::MagnetDetected,
        Command::LanguageSelected => SatelliteReport::LanguageSelected(data),
        Command::LockOpened => SatelliteReport::LockOpened(data),
        Command::HintRequest => SatelliteReport::HintRequest,
        Command::AudioFinished => SatelliteReport::AudioFinished(data),
        Command::VolumeSet => SatelliteReport::VolumeSet(data),
        Command::Status => SatelliteReport::Status(data),
        Command::Error => SatelliteReport::Error(data),
        c @ (Command::PlayAudio
        | Command::StopAudio
        | Command::SetVolume
        | Command::StartGame
        | Command::PauseGame
        | Command::ResumeGame
        | Command::EndGame
        | Command::ResetPuzzle
        | Command::OpenLock
        | Command::GetStatus
        | Command::Restart
        | Command::RelayOn
        | Command::Unknown(_)) => return Err(UnknownCommand::of(c)),
    };
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(command: &str, data: &str) -> Message {
        Message::new(Command::parse(command), data, 1)
    }

    #[test]
    fn requests_carry_parsed_payloads() {
        assert_eq!(
            satellite_request(&msg("relay_on", "1500")),
            Ok(SatelliteRequest::RelayOn { hold_ms: 1500 })
        );
        assert_eq!(
            satellite_request(&msg("relay_on", "")),
            Ok(SatelliteRequest::RelayOn {
                hold_ms: LOCK_HOLD_MS
            })
        );
        assert_eq!(
            satellite_request(&msg("set_volume", "99")),
            Ok(SatelliteRequest::SetVolume(30))
        );
        assert_eq!(
            satellite_request(&msg("set_volume", "-4")),
            Ok(SatelliteRequest::SetVolume(0))
        );
        assert_eq!(
            satellite_request(&msg("play_audio", "golab")),
            Ok(SatelliteRequest::PlayAudio("golab".into()))
        );
    }

    #[test]
    fn reports_are_not_requests() {
        let err = satellite_request(&msg("status_update", "{}")).unwrap_err();
        assert_eq!(err.command, "status_update");
        assert!(satellite_request(&msg("launch_rockets", "")).is_err());
    }

    #[test]
    fn requests_are_not_reports() {
        assert!(satellite_report(&msg("reset_puzzle", "")).is_err());
        assert_eq!(
            satellite_report(&msg("hint_request", "button_hold")),
            Ok(SatelliteReport::HintRequest)
        );
        assert_eq!(
            satellite_report(&msg("code_incorrect", "999")),
            Ok(SatelliteReport::CodeIncorrect("999".into()))
        );
    }
}
