//! Coordinator runtime: tracks every satellite's link and last reported puzzle
//! state, relays operator commands, owns the game session and the hint mailbox.
//!
//! The query types derive `Serialize` so an operator dashboard can render them as-is.

use serde::{Deserialize, Serialize};

use crate::address::PeerAddress;
use crate::dispatch::{self, SatelliteReport};
use crate::link::{AllowList, Datagram, Inbox, Link, SendError};
use crate::liveness::{HeartbeatTimer, LivenessMonitor};
use crate::peripherals::MAX_VOLUME;
use crate::protocol::{Command, Message, COORDINATOR_HEARTBEAT_MS, DELIMITER, HEARTBEAT_TIMEOUT_MS};
use crate::puzzle::history::COORDINATOR_HISTORY_CAPACITY;
use crate::puzzle::{CodeHistory, CodeHistoryEntry, CodeReport, DigitFrequency, PuzzleSnapshot};
use crate::satellite::send_to;
use crate::wire::{self, EncodeError};

/// Default number of players when the operator gives none.
pub const DEFAULT_PLAYER_COUNT: u32 = 4;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SatelliteEntry {
    pub name: String,
    pub address: PeerAddress,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    pub satellites: Vec<SatelliteEntry>,
    /// Satellite that receives session and audio commands.
    pub session_satellite: Option<String>,
    pub heartbeat_ms: u64,
    pub timeout_ms: u64,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            satellites: Vec::new(),
            session_satellite: None,
            heartbeat_ms: COORDINATOR_HEARTBEAT_MS,
            timeout_ms: HEARTBEAT_TIMEOUT_MS,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    #[error("no satellite named {0:?}")]
    UnknownSatellite(String),
    #[error("no session satellite configured")]
    NoSessionSatellite,
    #[error("satellite {0:?} is not connected")]
    NotConnected(String),
    #[error("data {0:?} contains the field delimiter")]
    DelimiterInData(String),
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error(transparent)]
    Send(#[from] SendError),
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("no active game session")]
    NoActiveSession,
    #[error("session relay failed: {0}")]
    Relay(#[from] RouteError),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GameSession {
    pub id: String,
    pub group_label: String,
    pub player_count: u32,
    pub is_test: bool,
    pub is_active: bool,
    pub is_paused: bool,
    pub started_at: u64,
}

/// Operator input for a new session. Missing fields get defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StartGame {
    pub session_id: Option<String>,
    pub group_label: Option<String>,
    pub player_count: Option<u32>,
    pub is_test: bool,
}

/// Single-slot hint mailbox.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HintRequest {
    pub pending: bool,
    pub requested_at: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HintPoll {
    pub hint_requested: bool,
    pub hint_time: u64,
    pub timestamp: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SatelliteStatus {
    pub name: String,
    pub address: PeerAddress,
    pub connected: bool,
    pub last_seen_at: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoordinatorStatus {
    pub uptime_ms: u64,
    pub uptime: String,
    pub satellites: Vec<SatelliteStatus>,
    pub session: GameSession,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PuzzleStatus {
    pub name: String,
    pub connected: bool,
    pub last_update: Option<u64>,
    pub snapshot: Option<PuzzleSnapshot>,
    pub history: Vec<CodeHistoryEntry>,
    pub digit_frequency: DigitFrequency,
}

struct SatelliteRecord {
    name: String,
    address: PeerAddress,
    snapshot: Option<PuzzleSnapshot>,
    last_update: Option<u64>,
    history: CodeHistory,
}

/// `HH:MM:SS` of a millisecond counter, hours wrapping at 24.
pub fn format_uptime(ms: u64) -> String {
    let secs = ms / 1000;
    format!(
        "{:02}:{:02}:{:02}",
        (secs / 3600) % 24,
        (secs / 60) % 60,
        secs % 60
    )
}

/// Operator text travels in the data field, which must not split the frame.
fn check_field(data: &str) -> Result<(), RouteError> {
    if data.contains(DELIMITER) {
        return Err(RouteError::DelimiterInData(data.to_string()));
    }
    Ok(())
}

pub struct Coordinator<L: Link> {
    link: L,
    allow: AllowList,
    liveness: LivenessMonitor,
    heartbeat: HeartbeatTimer,
    satellites: Vec<SatelliteRecord>,
    session_satellite: Option<String>,
    session: GameSession,
    hint: HintRequest,
    booted_at: u64,
}

impl<L: Link> Coordinator<L> {
    pub fn new(link: L, config: CoordinatorConfig, now_ms: u64) -> Self {
        let addresses: Vec<PeerAddress> = config.satellites.iter().map(|s| s.address).collect();
        let satellites = config
            .satellites
            .into_iter()
            .map(|s| SatelliteRecord {
                name: s.name,
                address: s.address,
                snapshot: None,
                last_update: None,
                history: CodeHistory::new(COORDINATOR_HISTORY_CAPACITY),
            })
            .collect();
        Self {
            link,
            allow: AllowList::new(addresses.iter().copied()),
            liveness: LivenessMonitor::new(addresses, config.timeout_ms),
            heartbeat: HeartbeatTimer::new(config.heartbeat_ms, now_ms),
            satellites,
            session_satellite: config.session_satellite,
            session: GameSession::default(),
            hint: HintRequest::default(),
            booted_at: now_ms,
        }
    }

    pub fn session(&self) -> &GameSession {
        &self.session
    }

    pub fn hint(&self) -> HintRequest {
        self.hint
    }

    pub fn is_connected(&self, name: &str) -> bool {
        self.record(name)
            .is_some_and(|r| self.liveness.is_connected(&r.address))
    }

    fn record(&self, name: &str) -> Option<&SatelliteRecord> {
        self.satellites.iter().find(|s| s.name == name)
    }

    /// One loop iteration: drain the inbox, then tick.
    pub fn run_once(&mut self, inbox: &Inbox, now_ms: u64) {
        for datagram in inbox.drain() {
            self.handle_datagram(datagram, now_ms);
        }
        self.tick(now_ms);
    }

    /// Expire silent satellites and heartbeat the connected ones.
    pub fn tick(&mut self, now_ms: u64) {
        for lost in self.liveness.check(now_ms) {
            if let Some(r) = self.satellites.iter().find(|s| s.address == lost) {
                log::warn!("satellite {} disconnected, no longer routable", r.name);
            }
        }
        if self.heartbeat.due(now_ms) {
            let connected: Vec<PeerAddress> = self
                .liveness
                .links()
                .iter()
                .filter(|l| l.connected)
                .map(|l| l.address)
                .collect();
            for to in connected {
                send_to(
                    &mut self.link,
                    to,
                    Command::Heartbeat,
                    "coordinator_ping".into(),
                    now_ms,
                );
            }
        }
    }

    pub fn handle_datagram(&mut self, datagram: Datagram, now_ms: u64) {
        if !self.allow.admit(&datagram) {
            return;
        }
        self.liveness.record_traffic(datagram.from, now_ms);
        let msg = match wire::decode(&datagram.bytes) {
            Ok(msg) => msg,
            Err(e) => {
                log::warn!("{} from {}", e, datagram.from);
                return;
            }
        };
        let Some(idx) = self.satellites.iter().position(|s| s.address == datagram.from) else {
            return;
        };
        log::debug!(
            "<- {} {}|{}",
            self.satellites[idx].name,
            msg.command,
            msg.data
        );
        match dispatch::satellite_report(&msg) {
            Ok(report) => self.handle_report(idx, report, now_ms),
            Err(e) => log::warn!("{} from {}", e, self.satellites[idx].name),
        }
    }

    fn handle_report(&mut self, idx: usize, report: SatelliteReport, now_ms: u64) {
        let record = &mut self.satellites[idx];
        match report {
            SatelliteReport::StatusUpdate(json) => {
                match serde_json::from_str::<PuzzleSnapshot>(&json) {
                    Ok(snapshot) => {
                        record.snapshot = Some(snapshot);
                        record.last_update = Some(now_ms);
                    }
                    Err(e) => log::warn!("bad status_update from {}: {}", record.name, e),
                }
            }
            SatelliteReport::CodeEntered(json) => match serde_json::from_str::<CodeReport>(&json) {
                Ok(report) => {
                    if record.history.contains(&report.code, report.entered_at) {
                        log::debug!("duplicate code_entered from {}", record.name);
                    } else {
                        log::info!(
                            "{} code {} ({})",
                            record.name,
                            report.code,
                            if report.correct { "correct" } else { "wrong" }
                        );
                        record.history.push(CodeHistoryEntry {
                            code: report.code,
                            correct: report.correct,
                            entered_at: report.entered_at,
                        });
                    }
                    record.last_update = Some(now_ms);
                }
                Err(e) => log::warn!("bad code_entered from {}: {}", record.name, e),
            },
            SatelliteReport::HintRequest => {
                log::info!("hint requested via {}", record.name);
                self.hint.pending = true;
                self.hint.requested_at = now_ms;
            }
            SatelliteReport::Heartbeat => log::debug!("heartbeat from {}", record.name),
            SatelliteReport::Error(e) => log::warn!("{} reports error: {}", record.name, e),
            other => log::info!("{}: {:?}", record.name, other),
        }
    }

    /// Send one command to a connected satellite. Never retried; a disconnected
    /// target fails fast without touching the radio.
    pub fn route_command(
        &mut self,
        name: &str,
        command: Command,
        data: impl Into<String>,
        now_ms: u64,
    ) -> Result<(), RouteError> {
        let to = self
            .record(name)
            .map(|r| r.address)
            .ok_or_else(|| RouteError::UnknownSatellite(name.to_string()))?;
        if !self.liveness.is_connected(&to) {
            log::warn!("not sending {} to {}: not connected", command, name);
            return Err(RouteError::NotConnected(name.to_string()));
        }
        let data: String = data.into();
        check_field(&data)?;
        let msg = Message::new(command, data, now_ms);
        let bytes = wire::encode(&msg)?;
        if let Err(e) = self.link.send(to, &bytes) {
            log::warn!("send {} to {} failed: {}", msg.command, name, e);
            return Err(e.into());
        }
        log::debug!("-> {} {}|{}", name, msg.command, msg.data);
        Ok(())
    }

    fn route_to_session(
        &mut self,
        command: Command,
        data: impl Into<String>,
        now_ms: u64,
    ) -> Result<(), RouteError> {
        let name = self
            .session_satellite
            .clone()
            .ok_or(RouteError::NoSessionSatellite)?;
        self.route_command(&name, command, data, now_ms)
    }

    /// Start a session. The session is active even if the relay fails; the relay
    /// error is returned for the operator.
    pub fn start_game(&mut self, request: StartGame, now_ms: u64) -> Result<(), SessionError> {
        let id = request
            .session_id
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let group_label = request
            .group_label
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "Unknown".to_string());
        check_field(&group_label)?;
        self.session = GameSession {
            id,
            group_label,
            player_count: request.player_count.unwrap_or(DEFAULT_PLAYER_COUNT),
            is_test: request.is_test,
            is_active: true,
            is_paused: false,
            started_at: now_ms,
        };
        log::info!(
            "session {} started for {}",
            self.session.id,
            self.session.group_label
        );
        let group = self.session.group_label.clone();
        self.route_to_session(Command::StartGame, group, now_ms)?;
        Ok(())
    }

    pub fn pause_game(&mut self, now_ms: u64) -> Result<(), SessionError> {
        self.set_paused(true, now_ms)
    }

    pub fn resume_game(&mut self, now_ms: u64) -> Result<(), SessionError> {
        self.set_paused(false, now_ms)
    }

    fn set_paused(&mut self, paused: bool, now_ms: u64) -> Result<(), SessionError> {
        if !self.session.is_active {
            return Err(SessionError::NoActiveSession);
        }
        self.session.is_paused = paused;
        log::info!(
            "session {} {}",
            self.session.id,
            if paused { "paused" } else { "resumed" }
        );
        let command = if paused {
            Command::PauseGame
        } else {
            Command::ResumeGame
        };
        self.route_to_session(command, "", now_ms)?;
        Ok(())
    }

    /// Relay the end, then clear the session whatever the relay outcome.
    pub fn end_game(&mut self, status: &str, now_ms: u64) -> Result<(), SessionError> {
        if !self.session.is_active {
            return Err(SessionError::NoActiveSession);
        }
        let relayed = self.route_to_session(Command::EndGame, status, now_ms);
        log::info!("session {} ended: {}", self.session.id, status);
        self.session = GameSession::default();
        relayed?;
        Ok(())
    }

    pub fn play_audio(&mut self, name: &str, now_ms: u64) -> Result<(), RouteError> {
        self.route_to_session(Command::PlayAudio, name, now_ms)
    }

    pub fn stop_audio(&mut self, now_ms: u64) -> Result<(), RouteError> {
        self.route_to_session(Command::StopAudio, "", now_ms)
    }

    pub fn set_volume(&mut self, volume: i64, now_ms: u64) -> Result<(), RouteError> {
        let v = volume.clamp(0, MAX_VOLUME as i64);
        self.route_to_session(Command::SetVolume, v.to_string(), now_ms)
    }

    pub fn open_lock(&mut self, satellite: &str, now_ms: u64) -> Result<(), RouteError> {
        self.route_command(satellite, Command::OpenLock, "", now_ms)
    }

    pub fn reset_puzzle(&mut self, satellite: &str, now_ms: u64) -> Result<(), RouteError> {
        self.route_command(satellite, Command::ResetPuzzle, "", now_ms)
    }

    pub fn request_status(&mut self, satellite: &str, now_ms: u64) -> Result<(), RouteError> {
        self.route_command(satellite, Command::GetStatus, "", now_ms)
    }

    pub fn restart(&mut self, satellite: &str, now_ms: u64) -> Result<(), RouteError> {
        self.route_command(satellite, Command::Restart, "", now_ms)
    }

    /// Best effort to every satellite; one outcome per satellite.
    pub fn restart_all(&mut self, now_ms: u64) -> Vec<(String, Result<(), RouteError>)> {
        let names: Vec<String> = self.satellites.iter().map(|s| s.name.clone()).collect();
        names
            .into_iter()
            .map(|name| {
                let outcome = self.restart(&name, now_ms);
                (name, outcome)
            })
            .collect()
    }

    pub fn status(&self, now_ms: u64) -> CoordinatorStatus {
        let uptime_ms = now_ms.saturating_sub(self.booted_at);
        let satellites = self
            .satellites
            .iter()
            .map(|s| {
                let link = self.liveness.link(&s.address);
                SatelliteStatus {
                    name: s.name.clone(),
                    address: s.address,
                    connected: link.is_some_and(|l| l.connected),
                    last_seen_at: link.map(|l| l.last_seen_at).unwrap_or(0),
                }
            })
            .collect();
        CoordinatorStatus {
            uptime_ms,
            uptime: format_uptime(uptime_ms),
            satellites,
            session: self.session.clone(),
        }
    }

    /// Read and clear the hint mailbox.
    pub fn poll_hint(&mut self, now_ms: u64) -> HintPoll {
        let poll = HintPoll {
            hint_requested: self.hint.pending,
            hint_time: self.hint.requested_at,
            timestamp: now_ms,
        };
        self.hint.pending = false;
        poll
    }

    pub fn puzzle_status(&self, satellite: &str) -> Option<PuzzleStatus> {
        let r = self.record(satellite)?;
        Some(PuzzleStatus {
            name: r.name.clone(),
            connected: self.liveness.is_connected(&r.address),
            last_update: r.last_update,
            snapshot: r.snapshot.clone(),
            history: r.history.iter().cloned().collect(),
            digit_frequency: r.snapshot.as_ref().map(|s| s.digits).unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::{RadioPort, SimulatedRadio};
    use crate::puzzle::{PuzzleFlags, Stage};

    const HUB: PeerAddress = PeerAddress::new([0x24, 0, 0, 0, 0, 0x01]);
    const CASE: PeerAddress = PeerAddress::new([0x24, 0, 0, 0, 0, 0x02]);
    const BIRD: PeerAddress = PeerAddress::new([0x24, 0, 0, 0, 0, 0x03]);

    fn coordinator() -> (Coordinator<RadioPort>, SimulatedRadio) {
        let radio = SimulatedRadio::reliable();
        let config = CoordinatorConfig {
            satellites: vec![
                SatelliteEntry {
                    name: "suitcase".into(),
                    address: CASE,
                },
                SatelliteEntry {
                    name: "golab".into(),
                    address: BIRD,
                },
            ],
            session_satellite: Some("golab".into()),
            ..CoordinatorConfig::default()
        };
        (Coordinator::new(radio.port(HUB), config, 0), radio)
    }

    fn from(addr: PeerAddress, command: Command, data: &str, ts: u64) -> Datagram {
        Datagram {
            from: addr,
            bytes: wire::encode(&Message::new(command, data, ts)).unwrap(),
        }
    }

    fn heard(radio: &SimulatedRadio, addr: PeerAddress) -> Vec<Message> {
        radio
            .deliver(addr)
            .iter()
            .map(|d| wire::decode(&d.bytes).unwrap())
            .collect()
    }

    fn code_entered(code: &str, at: u64) -> String {
        serde_json::to_string(&CodeReport {
            code: code.into(),
            correct: false,
            entered_at: at,
            stage_ms: 0,
        })
        .unwrap()
    }

    #[test]
    fn route_fails_fast_when_disconnected() {
        let (mut c, radio) = coordinator();
        assert!(matches!(
            c.open_lock("suitcase", 10),
            Err(RouteError::NotConnected(_))
        ));
        assert!(matches!(
            c.open_lock("nowhere", 10),
            Err(RouteError::UnknownSatellite(_))
        ));
        assert_eq!(radio.stats(), (0, 0));

        c.handle_datagram(from(CASE, Command::Heartbeat, "suitcase_alive", 5), 20);
        assert!(c.open_lock("suitcase", 30).is_ok());
        assert_eq!(heard(&radio, CASE)[0].command, Command::OpenLock);
    }

    #[test]
    fn liveness_expires_after_timeout() {
        let (mut c, _radio) = coordinator();
        c.handle_datagram(from(CASE, Command::CodeCorrect, "124", 1), 1_000);
        c.tick(31_000);
        assert!(c.is_connected("suitcase"));
        c.tick(31_001);
        assert!(!c.is_connected("suitcase"));
        assert!(matches!(
            c.reset_puzzle("suitcase", 31_002),
            Err(RouteError::NotConnected(_))
        ));
    }

    #[test]
    fn heartbeats_only_connected_satellites() {
        let (mut c, radio) = coordinator();
        c.handle_datagram(from(CASE, Command::Heartbeat, "", 1), 5_000);
        c.tick(10_001);
        let beats = heard(&radio, CASE);
        assert_eq!(beats.len(), 1);
        assert_eq!(beats[0].data, "coordinator_ping");
        assert!(heard(&radio, BIRD).is_empty());
    }

    #[test]
    fn status_update_replaces_snapshot() {
        let (mut c, _radio) = coordinator();
        let mut snapshot = PuzzleSnapshot {
            stage: Stage::KeypadActive,
            flags: PuzzleFlags::TAG1_USED,
            entered: 3,
            stage_ms: 1_200,
            relay: true,
            digits: DigitFrequency::from_counts([0, 1, 1, 0, 1, 0, 0, 0, 0, 0]),
        };
        let json = serde_json::to_string(&snapshot).unwrap();
        c.handle_datagram(from(CASE, Command::StatusUpdate, &json, 1), 100);
        c.handle_datagram(from(CASE, Command::StatusUpdate, &json, 1), 150);
        snapshot.stage = Stage::WaitingTag2;
        let json = serde_json::to_string(&snapshot).unwrap();
        c.handle_datagram(from(CASE, Command::StatusUpdate, &json, 2), 200);

        let status = c.puzzle_status("suitcase").unwrap();
        assert_eq!(status.snapshot, Some(snapshot));
        assert_eq!(status.last_update, Some(200));
        assert_eq!(status.digit_frequency.count(4), 1);
        assert!(status.connected);

        c.handle_datagram(from(CASE, Command::StatusUpdate, "{not json", 3), 300);
        assert_eq!(c.puzzle_status("suitcase").unwrap().last_update, Some(200));
    }

    #[test]
    fn mirrored_history_dedupes_and_caps() {
        let (mut c, _radio) = coordinator();
        let dup = code_entered("999", 42);
        c.handle_datagram(from(CASE, Command::CodeEntered, &dup, 42), 100);
        c.handle_datagram(from(CASE, Command::CodeEntered, &dup, 42), 101);
        assert_eq!(c.puzzle_status("suitcase").unwrap().history.len(), 1);
        for i in 0..12u64 {
            let json = code_entered(&i.to_string(), 1_000 + i);
            c.handle_datagram(from(CASE, Command::CodeEntered, &json, 1_000 + i), 200 + i);
        }
        let history = c.puzzle_status("suitcase").unwrap().history;
        assert_eq!(history.len(), COORDINATOR_HISTORY_CAPACITY);
        assert_eq!(history[0].code, "2");
        assert_eq!(history[9].code, "11");
    }

    #[test]
    fn hint_mailbox_is_single_slot() {
        let (mut c, _radio) = coordinator();
        assert!(!c.poll_hint(0).hint_requested);
        c.handle_datagram(from(BIRD, Command::HintRequest, "button_hold", 1), 1_000);
        c.handle_datagram(from(BIRD, Command::HintRequest, "button_hold", 2), 2_000);
        let poll = c.poll_hint(2_500);
        assert_eq!(
            poll,
            HintPoll {
                hint_requested: true,
                hint_time: 2_000,
                timestamp: 2_500
            }
        );
        assert!(!c.poll_hint(2_600).hint_requested);
    }

    #[test]
    fn session_lifecycle() {
        let (mut c, radio) = coordinator();
        assert!(matches!(
            c.pause_game(0),
            Err(SessionError::NoActiveSession)
        ));
        c.handle_datagram(from(BIRD, Command::Heartbeat, "golab_alive", 1), 10);
        c.start_game(
            StartGame {
                group_label: Some("Team A".into()),
                ..StartGame::default()
            },
            100,
        )
        .unwrap();
        let s = c.session().clone();
        assert!(s.is_active && !s.is_paused);
        assert_eq!(s.player_count, DEFAULT_PLAYER_COUNT);
        assert_eq!(s.id.len(), 36);
        c.pause_game(200).unwrap();
        assert!(c.session().is_paused);
        c.resume_game(300).unwrap();
        assert!(!c.session().is_paused);
        let sent: Vec<Command> = heard(&radio, BIRD).into_iter().map(|m| m.command).collect();
        assert_eq!(
            sent,
            vec![Command::StartGame, Command::PauseGame, Command::ResumeGame]
        );
    }

    #[test]
    fn end_game_resets_even_when_relay_fails() {
        let (mut c, _radio) = coordinator();
        let started = c.start_game(
            StartGame {
                session_id: Some("abc".into()),
                ..StartGame::default()
            },
            100,
        );
        assert!(matches!(
            started,
            Err(SessionError::Relay(RouteError::NotConnected(_)))
        ));
        assert!(c.session().is_active);
        assert_eq!(c.session().id, "abc");
        assert!(c.end_game("completed", 200).is_err());
        assert_eq!(*c.session(), GameSession::default());
    }

    #[test]
    fn end_game_without_session_sends_nothing() {
        let (mut c, radio) = coordinator();
        c.handle_datagram(from(BIRD, Command::Heartbeat, "golab_alive", 1), 10);
        assert!(matches!(
            c.end_game("completed", 20),
            Err(SessionError::NoActiveSession)
        ));
        assert!(heard(&radio, BIRD).is_empty());
    }

    #[test]
    fn delimiter_in_operator_text_is_rejected() {
        let (mut c, radio) = coordinator();
        c.handle_datagram(from(BIRD, Command::Heartbeat, "golab_alive", 1), 10);
        let started = c.start_game(
            StartGame {
                group_label: Some("Team|A".into()),
                ..StartGame::default()
            },
            20,
        );
        assert!(matches!(
            started,
            Err(SessionError::Relay(RouteError::DelimiterInData(_)))
        ));
        assert!(!c.session().is_active);
        assert!(matches!(
            c.play_audio("hint|1", 30),
            Err(RouteError::DelimiterInData(_))
        ));
        assert!(heard(&radio, BIRD).is_empty());
    }

    #[test]
    fn volume_is_clamped_before_relay() {
        let (mut c, radio) = coordinator();
        c.handle_datagram(from(BIRD, Command::Heartbeat, "golab_alive", 1), 10);
        c.set_volume(99, 20).unwrap();
        c.set_volume(-5, 30).unwrap();
        let data: Vec<String> = heard(&radio, BIRD).into_iter().map(|m| m.data).collect();
        assert_eq!(data, vec!["30", "0"]);
    }

    #[test]
    fn restart_all_reports_each_satellite() {
        let (mut c, _radio) = coordinator();
        c.handle_datagram(from(CASE, Command::Heartbeat, "", 1), 10);
        let outcomes = c.restart_all(20);
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes[0].1.is_ok());
        assert!(matches!(outcomes[1].1, Err(RouteError::NotConnected(_))));
    }

    #[test]
    fn uptime_format() {
        assert_eq!(format_uptime(0), "00:00:00");
        assert_eq!(format_uptime(3_723_000), "01:02:03");
        assert_eq!(format_uptime(25 * 3_600_000), "01:00:00");
    }

    #[test]
    fn status_lists_every_satellite() {
        let (mut c, _radio) = coordinator();
        c.handle_datagram(from(BIRD, Command::Heartbeat, "", 1), 500);
        let status = c.status(61_000);
        assert_eq!(status.uptime, "00:01:01");
        assert_eq!(status.satellites.len(), 2);
        assert!(!status.satellites[0].connected);
        assert!(status.satellites[1].connected);
        assert_eq!(status.satellites[1].last_seen_at, 500);
        let json = serde_json::to_string(&status).unwrap();
        assert!(json.contains("\"golab\""));
    }
}
