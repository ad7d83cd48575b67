//! Satellite runtime: one context object per node. The host feeds it inbound
//! datagrams and calls [`Satellite::poll`] once per loop iteration.

use crate::address::PeerAddress;
use crate::audio_station::{AudioStation, StationAction};
use crate::dispatch::{self, SatelliteRequest};
use crate::link::{AllowList, Datagram, Inbox, Link};
use crate::liveness::{HeartbeatTimer, LivenessMonitor};
use crate::peripherals::Peripherals;
use crate::protocol::{Command, Message, HEARTBEAT_TIMEOUT_MS, SATELLITE_HEARTBEAT_MS};
use crate::puzzle::{PuzzleAction, PuzzleEngine};
use crate::wire;

/// What this satellite drives.
pub enum SatelliteRole {
    Puzzle(PuzzleEngine),
    AudioStation(AudioStation),
}

#[derive(Debug, Clone)]
pub struct SatelliteConfig {
    pub coordinator: PeerAddress,
    pub heartbeat_ms: u64,
    pub timeout_ms: u64,
    /// Payload of the periodic heartbeat, e.g. `suitcase_alive`.
    pub heartbeat_data: String,
}

impl SatelliteConfig {
    pub fn new(coordinator: PeerAddress, heartbeat_data: impl Into<String>) -> Self {
        Self {
            coordinator,
            heartbeat_ms: SATELLITE_HEARTBEAT_MS,
            timeout_ms: HEARTBEAT_TIMEOUT_MS,
            heartbeat_data: heartbeat_data.into(),
        }
    }
}

pub struct Satellite<L: Link> {
    link: L,
    coordinator: PeerAddress,
    allow: AllowList,
    liveness: LivenessMonitor,
    heartbeat: HeartbeatTimer,
    heartbeat_data: String,
    role: SatelliteRole,
    peripherals: Peripherals,
    restart_requested: bool,
}

impl<L: Link> Satellite<L> {
    pub fn new(
        link: L,
        config: SatelliteConfig,
        role: SatelliteRole,
        peripherals: Peripherals,
        now_ms: u64,
    ) -> Self {
        Self {
            link,
            coordinator: config.coordinator,
            allow: AllowList::new([config.coordinator]),
            liveness: LivenessMonitor::new([config.coordinator], config.timeout_ms),
            heartbeat: HeartbeatTimer::new(config.heartbeat_ms, now_ms),
            heartbeat_data: config.heartbeat_data,
            role,
            peripherals,
            restart_requested: false,
        }
    }

    /// Announce the initial state. Call once before the loop starts.
    pub fn boot(&mut self, now_ms: u64) {
        match &mut self.role {
            SatelliteRole::Puzzle(engine) => {
                let actions = vec![PuzzleAction::ClearDisplay, engine.status_action(now_ms)];
                self.apply(actions, now_ms);
            }
            SatelliteRole::AudioStation(station) => {
                let volume = station.volume();
                if let Some(audio) = self.peripherals.audio.as_mut() {
                    audio.set_volume(volume);
                }
            }
        }
    }

    pub fn role(&self) -> &SatelliteRole {
        &self.role
    }

    pub fn puzzle(&self) -> Option<&PuzzleEngine> {
        match &self.role {
            SatelliteRole::Puzzle(engine) => Some(engine),
            SatelliteRole::AudioStation(_) => None,
        }
    }

    pub fn station(&self) -> Option<&AudioStation> {
        match &self.role {
            SatelliteRole::AudioStation(station) => Some(station),
            SatelliteRole::Puzzle(_) => None,
        }
    }

    pub fn coordinator_connected(&self) -> bool {
        self.liveness.is_connected(&self.coordinator)
    }

    /// Set once the coordinator asked for a restart. The host rebuilds the node.
    pub fn restart_requested(&self) -> bool {
        self.restart_requested
    }

    /// One loop iteration: drain the inbox, then poll.
    pub fn run_once(&mut self, inbox: &Inbox, now_ms: u64) {
        for datagram in inbox.drain() {
            self.handle_datagram(datagram, now_ms);
        }
        self.poll(now_ms);
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
        log::debug!("<- {} {}|{}", datagram.from, msg.command, msg.data);
        match dispatch::satellite_request(&msg) {
            Ok(request) => self.handle_request(request, now_ms),
            Err(e) => log::warn!("{} from {}", e, datagram.from),
        }
    }

    /// Hardware inputs, timed states, liveness and the heartbeat.
    pub fn poll(&mut self, now_ms: u64) {
        for lost in self.liveness.check(now_ms) {
            log::warn!("coordinator {} silent; continuing on our own", lost);
        }
        match &mut self.role {
            SatelliteRole::Puzzle(engine) => {
                let p = &mut self.peripherals;
                let mut actions = Vec::new();
                if let Some(tag) = p.tags.as_mut().and_then(|t| t.poll_tag()) {
                    actions.extend(engine.on_tag(&tag, now_ms));
                }
                if let Some(key) = p.keypad.as_mut().and_then(|k| k.poll_key()) {
                    actions.extend(engine.on_key(key, now_ms));
                }
                if let Some(contact) = p.contact.as_mut() {
                    actions.extend(engine.on_contact(contact.level(), now_ms));
                }
                actions.extend(engine.poll(now_ms));
                self.apply(actions, now_ms);
            }
            SatelliteRole::AudioStation(station) => {
                let p = &mut self.peripherals;
                let pressed = p.button.as_mut().is_some_and(|b| b.is_pressed());
                let mut actions = station.on_button(pressed, now_ms);
                if let Some(event) = p.audio.as_mut().and_then(|a| a.poll_event()) {
                    actions.extend(station.on_audio_event(event));
                }
                self.apply_station(actions, now_ms);
            }
        }
        if self.heartbeat.due(now_ms) {
            let data = self.heartbeat_data.clone();
            self.send(Command::Heartbeat, data, now_ms);
        }
    }

    fn handle_request(&mut self, request: SatelliteRequest, now_ms: u64) {
        if let SatelliteRequest::Restart = request {
            log::info!("restart requested by coordinator");
            self.restart_requested = true;
            return;
        }
        if let SatelliteRequest::Heartbeat = request {
            log::debug!("coordinator heartbeat");
            return;
        }
        match &mut self.role {
            SatelliteRole::Puzzle(engine) => {
                let actions = match request {
                    SatelliteRequest::ResetPuzzle => engine.reset(now_ms),
                    SatelliteRequest::OpenLock => engine.open_lock(now_ms),
                    SatelliteRequest::GetStatus => vec![engine.status_action(now_ms)],
                    SatelliteRequest::RelayOn { hold_ms } => engine.relay_on_for(hold_ms, now_ms),
                    other => {
                        log::warn!("puzzle satellite ignores {:?}", other);
                        Vec::new()
                    }
                };
                self.apply(actions, now_ms);
            }
            SatelliteRole::AudioStation(station) => {
                let actions = match request {
                    SatelliteRequest::PlayAudio(name) => station.play(&name),
                    SatelliteRequest::StopAudio => station.stop(),
                    SatelliteRequest::SetVolume(v) => station.set_volume(v),
                    SatelliteRequest::StartGame(group) => station.start_game(&group),
                    SatelliteRequest::PauseGame => station.pause_game(),
                    SatelliteRequest::ResumeGame => station.resume_game(),
                    SatelliteRequest::EndGame(status) => station.end_game(&status),
                    SatelliteRequest::GetStatus => {
                        vec![StationAction::Send(Command::Status, station.status_text())]
                    }
                    other => {
                        log::warn!("audio station ignores {:?}", other);
                        Vec::new()
                    }
                };
                self.apply_station(actions, now_ms);
            }
        }
    }

    fn apply(&mut self, actions: Vec<PuzzleAction>, now_ms: u64) {
        let p = &mut self.peripherals;
        for action in actions {
            match action {
                PuzzleAction::Send(command, data) => {
                    send_to(&mut self.link, self.coordinator, command, data, now_ms);
                }
                PuzzleAction::PlayTrack(track) => {
                    if let Some(audio) = p.audio.as_mut() {
                        audio.play(track);
                    }
                }
                PuzzleAction::Show(lines) => {
                    if let Some(display) = p.display.as_mut() {
                        display.show(&lines);
                    }
                }
                PuzzleAction::ClearDisplay => {
                    if let Some(display) = p.display.as_mut() {
                        display.clear();
                    }
                }
                PuzzleAction::SetRelay(on) => {
                    if let Some(relay) = p.relay.as_mut() {
                        relay.set(on);
                    }
                }
            }
        }
    }

    fn apply_station(&mut self, actions: Vec<StationAction>, now_ms: u64) {
        for action in actions {
            if let StationAction::Send(command, data) = action {
                send_to(&mut self.link, self.coordinator, command, data, now_ms);
                continue;
            }
            let Some(audio) = self.peripherals.audio.as_mut() else {
                continue;
            };
            match action {
                StationAction::Play(track) => audio.play(track),
                StationAction::Stop => audio.stop(),
                StationAction::Pause => audio.pause(),
                StationAction::Resume => audio.resume(),
                StationAction::SetVolume(v) => audio.set_volume(v),
                StationAction::Send(..) => {}
            }
        }
    }

    fn send(&mut self, command: Command, data: String, now_ms: u64) -> bool {
        send_to(&mut self.link, self.coordinator, command, data, now_ms)
    }
}

/// Encode and send once. Failures are logged and reported to the caller, never retried.
pub(crate) fn send_to<L: Link>(
    link: &mut L,
    to: PeerAddress,
    command: Command,
    data: String,
    now_ms: u64,
) -> bool {
    let msg = Message::new(command, data, now_ms);
    let bytes = match wire::encode(&msg) {
        Ok(b) => b,
        Err(e) => {
            log::warn!("cannot encode {}: {}", msg.command, e);
            return false;
        }
    };
    match link.send(to, &bytes) {
        Ok(()) => {
            log::debug!("-> {} {}|{}", to, msg.command, msg.data);
            true
        }
        Err(e) => {
            log::warn!("send {} to {} failed: {}", msg.command, to, e);
            false
        }
    }
}
