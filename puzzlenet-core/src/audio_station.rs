//! Hint station: a satellite with a push button and an audio player but no puzzle.
//! It mirrors the game state the coordinator announces and turns a long button
//! press into a hint request.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::peripherals::{AudioEvent, MAX_VOLUME};
use crate::protocol::{Command, HINT_HOLD_MS};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AudioStationConfig {
    /// Name used in `play_audio` → track number on the player.
    pub tracks: BTreeMap<String, u16>,
    pub default_volume: u8,
    pub hint_hold_ms: u64,
}

impl Default for AudioStationConfig {
    fn default() -> Self {
        let tracks = [("golab", 1), ("hint1", 2), ("hint2", 2)]
            .into_iter()
            .map(|(n, t)| (n.to_string(), t))
            .collect();
        Self {
            tracks,
            default_volume: 20,
            hint_hold_ms: HINT_HOLD_MS,
        }
    }
}

/// Work for the satellite runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StationAction {
    Send(Command, String),
    Play(u16),
    Stop,
    Pause,
    Resume,
    SetVolume(u8),
}

/// Fires once per press, after the button has been held for the full hold time.
#[derive(Debug, Clone)]
struct HoldDetector {
    hold_ms: u64,
    pressed_since: Option<u64>,
    fired: bool,
}

impl HoldDetector {
    fn sample(&mut self, pressed: bool, now_ms: u64) -> bool {
        if !pressed {
            if let Some(since) = self.pressed_since.take() {
                if !self.fired {
                    log::debug!("button released after {} ms", now_ms.saturating_sub(since));
                }
            }
            self.fired = false;
            return false;
        }
        let since = *self.pressed_since.get_or_insert(now_ms);
        if !self.fired && now_ms.saturating_sub(since) >= self.hold_ms {
            self.fired = true;
            return true;
        }
        false
    }
}

pub struct AudioStation {
    config: AudioStationConfig,
    game_active: bool,
    game_paused: bool,
    group: String,
    playing: Option<String>,
    volume: u8,
    button: HoldDetector,
}

impl AudioStation {
    pub fn new(config: AudioStationConfig) -> Self {
        let volume = config.default_volume.min(MAX_VOLUME);
        Self {
            button: HoldDetector {
                hold_ms: config.hint_hold_ms,
                pressed_since: None,
                fired: false,
            },
            config,
            game_active: false,
            game_paused: false,
            group: String::new(),
            playing: None,
            volume,
        }
    }

    /// Volume to apply to the player at boot.
    pub fn volume(&self) -> u8 {
        self.volume
    }

    pub fn game_active(&self) -> bool {
        self.game_active
    }

    pub fn game_paused(&self) -> bool {
        self.game_paused
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn playing(&self) -> Option<&str> {
        self.playing.as_deref()
    }

    pub fn on_button(&mut self, pressed: bool, now_ms: u64) -> Vec<StationAction> {
        if !self.button.sample(pressed, now_ms) {
            return Vec::new();
        }
        if !self.game_active {
            log::info!("hint button held but no game is active");
            return Vec::new();
        }
        log::info!("hint requested");
        vec![StationAction::Send(Command::HintRequest, "button_hold".into())]
    }

    pub fn on_audio_event(&mut self, event: AudioEvent) -> Vec<StationAction> {
        let Some(name) = self.playing.take() else {
            return Vec::new();
        };
        match event {
            AudioEvent::Finished => {
                log::info!("finished playing {}", name);
                vec![StationAction::Send(Command::AudioFinished, name)]
            }
            AudioEvent::Error(code) => {
                log::warn!("player error {} while playing {}", code, name);
                vec![StationAction::Send(Command::Error, format!("audio:{}", code))]
            }
        }
    }

    pub fn play(&mut self, name: &str) -> Vec<StationAction> {
        let Some(&track) = self.config.tracks.get(name) else {
            log::warn!("unknown audio file {}", name);
            return vec![StationAction::Send(
                Command::Error,
                format!("unknown_file:{}", name),
            )];
        };
        let mut out = Vec::new();
        if self.playing.is_some() {
            out.push(StationAction::Stop);
        }
        log::info!("playing {} (track {})", name, track);
        self.playing = Some(name.to_string());
        out.push(StationAction::Play(track));
        out
    }

    pub fn stop(&mut self) -> Vec<StationAction> {
        if self.playing.take().is_none() {
            return Vec::new();
        }
        vec![
            StationAction::Stop,
            StationAction::Send(Command::AudioFinished, "stopped".into()),
        ]
    }

    pub fn set_volume(&mut self, volume: u8) -> Vec<StationAction> {
        self.volume = volume.min(MAX_VOLUME);
        vec![
            StationAction::SetVolume(self.volume),
            StationAction::Send(Command::VolumeSet, self.volume.to_string()),
        ]
    }

    pub fn start_game(&mut self, group: &str) -> Vec<StationAction> {
        log::info!("game started for {}", group);
        self.game_active = true;
        self.game_paused = false;
        self.group = group.to_string();
        vec![StationAction::Send(
            Command::Status,
            format!("game_started:{}", group),
        )]
    }

    pub fn pause_game(&mut self) -> Vec<StationAction> {
        if !self.game_active {
            return Vec::new();
        }
        self.game_paused = true;
        if self.playing.is_some() {
            return vec![StationAction::Pause];
        }
        Vec::new()
    }

    pub fn resume_game(&mut self) -> Vec<StationAction> {
        if !self.game_active {
            return Vec::new();
        }
        self.game_paused = false;
        if self.playing.is_some() {
            return vec![StationAction::Resume];
        }
        Vec::new()
    }

    pub fn end_game(&mut self, status: &str) -> Vec<StationAction> {
        log::info!("game ended: {}", status);
        self.game_active = false;
        self.game_paused = false;
        self.group.clear();
        let mut out = Vec::new();
        if self.playing.take().is_some() {
            out.push(StationAction::Stop);
        }
        out.push(StationAction::Send(
            Command::Status,
            format!("game_ended:{}", status),
        ));
        out
    }

    /// Local state for `get_status`.
    pub fn status_text(&self) -> String {
        match (&self.playing, self.game_active) {
            (Some(name), _) => format!("playing:{}", name),
            (None, true) => format!("active:{}", self.group),
            (None, false) => "idle".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn station() -> AudioStation {
        AudioStation::new(AudioStationConfig::default())
    }

    fn hold(s: &mut AudioStation, from: u64, to: u64) -> Vec<StationAction> {
        let mut out = Vec::new();
        let mut t = from;
        while t <= to {
            out.extend(s.on_button(true, t));
            t += 50;
        }
        out
    }

    #[test]
    fn long_press_requests_one_hint_while_active() {
        let mut s = station();
        s.start_game("Team A");
        let out = hold(&mut s, 0, 5_000);
        assert_eq!(
            out,
            vec![StationAction::Send(Command::HintRequest, "button_hold".into())]
        );
        s.on_button(false, 5_050);
        assert_eq!(hold(&mut s, 6_000, 9_000).len(), 1);
    }

    #[test]
    fn short_press_or_idle_game_sends_nothing() {
        let mut s = station();
        assert!(hold(&mut s, 0, 4_000).is_empty());
        s.on_button(false, 4_050);
        s.start_game("Team A");
        assert!(hold(&mut s, 5_000, 7_900).is_empty());
        s.on_button(false, 7_950);
        assert!(hold(&mut s, 8_000, 8_500).is_empty());
    }

    #[test]
    fn play_unknown_and_replace() {
        let mut s = station();
        assert_eq!(
            s.play("nope"),
            vec![StationAction::Send(Command::Error, "unknown_file:nope".into())]
        );
        assert_eq!(s.play("golab"), vec![StationAction::Play(1)]);
        assert_eq!(
            s.play("hint1"),
            vec![StationAction::Stop, StationAction::Play(2)]
        );
        assert_eq!(s.playing(), Some("hint1"));
    }

    #[test]
    fn finished_and_error_events_report_once() {
        let mut s = station();
        s.play("golab");
        assert_eq!(
            s.on_audio_event(AudioEvent::Finished),
            vec![StationAction::Send(Command::AudioFinished, "golab".into())]
        );
        assert!(s.on_audio_event(AudioEvent::Finished).is_empty());
        s.play("hint2");
        assert_eq!(
            s.on_audio_event(AudioEvent::Error(3)),
            vec![StationAction::Send(Command::Error, "audio:3".into())]
        );
        assert_eq!(s.playing(), None);
    }

    #[test]
    fn stop_reports_only_when_playing() {
        let mut s = station();
        assert!(s.stop().is_empty());
        s.play("golab");
        assert_eq!(
            s.stop(),
            vec![
                StationAction::Stop,
                StationAction::Send(Command::AudioFinished, "stopped".into())
            ]
        );
    }

    #[test]
    fn session_mirror() {
        let mut s = station();
        assert!(s.pause_game().is_empty());
        s.start_game("Team B");
        s.play("golab");
        assert_eq!(s.pause_game(), vec![StationAction::Pause]);
        assert!(s.game_paused());
        assert_eq!(s.resume_game(), vec![StationAction::Resume]);
        let out = s.end_game("completed");
        assert_eq!(
            out,
            vec![
                StationAction::Stop,
                StationAction::Send(Command::Status, "game_ended:completed".into())
            ]
        );
        assert!(!s.game_active());
        assert_eq!(s.status_text(), "idle");
    }

    #[test]
    fn volume_is_clamped() {
        let mut s = station();
        assert_eq!(s.volume(), 20);
        let out = s.set_volume(200);
        assert_eq!(out[0], StationAction::SetVolume(30));
        assert_eq!(out[1], StationAction::Send(Command::VolumeSet, "30".into()));
    }
}
