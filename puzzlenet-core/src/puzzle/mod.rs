//! Per-satellite puzzle progression.
//!
//! A total function over (state, input): unrecognized input maps to "no transition",
//! nothing here fails. The engine never touches hardware; it returns [`PuzzleAction`]s
//! for the satellite runtime to carry out.

pub mod history;
pub mod input;
pub mod stage;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::protocol::{
    Command, CONTACT_ARMING_MS, CONTACT_DEBOUNCE_MS, KEY_DEBOUNCE_MS, LOCK_HOLD_MS, NOTICE_MS,
};

pub use history::{CodeHistory, CodeHistoryEntry, DigitFrequency};
pub use input::{ContactEdgeDetector, ContactLevel, KeyDebouncer};
pub use stage::{Stage, Variant};

pub const TRACK_TAG1: u16 = 1;
pub const TRACK_KEY: u16 = 2;
pub const TRACK_CODE_CORRECT: u16 = 3;
pub const TRACK_CODE_WRONG: u16 = 4;

bitflags! {
    /// Progression guards. Only ever set during a session; cleared by reset.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct PuzzleFlags: u16 {
        const TAG1_USED = 1;
        const TAG2_ALLOWED = 1 << 1;
        const TAG2_USED = 1 << 2;
        const MAGNET_ALLOWED = 1 << 3;
        const MAGNET_USED = 1 << 4;
        const LANGUAGE_CHOSEN = 1 << 5;
        const COMPARTMENT_OPENED = 1 << 6;
    }
}

mod flag_bits {
    use super::PuzzleFlags;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    pub fn serialize<S: Serializer>(v: &PuzzleFlags, serializer: S) -> Result<S::Ok, S::Error> {
        v.bits().serialize(serializer)
    }
    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<PuzzleFlags, D::Error> {
        let bits = u16::deserialize(d)?;
        Ok(PuzzleFlags::from_bits_truncate(bits))
    }
}

/// Timing knobs. Defaults are the field-tested values.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Timings {
    pub key_debounce_ms: u64,
    pub contact_debounce_ms: u64,
    pub contact_arming_ms: u64,
    pub lock_hold_ms: u64,
    pub notice_ms: u64,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            key_debounce_ms: KEY_DEBOUNCE_MS,
            contact_debounce_ms: CONTACT_DEBOUNCE_MS,
            contact_arming_ms: CONTACT_ARMING_MS,
            lock_hold_ms: LOCK_HOLD_MS,
            notice_ms: NOTICE_MS,
        }
    }
}

/// One selectable language on the final keypad screen.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LanguageKey {
    pub key: char,
    pub name: String,
    pub track: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PuzzleConfig {
    pub variant: Variant,
    pub tag1: Vec<String>,
    pub tag2: Vec<String>,
    pub correct_code: String,
    pub max_code_len: usize,
    pub erase_key: char,
    pub commit_key: char,
    pub languages: Vec<LanguageKey>,
    pub compartment_key: char,
    pub timings: Timings,
}

impl Default for PuzzleConfig {
    fn default() -> Self {
        Self {
            variant: Variant::Suitcase,
            tag1: vec!["F1AAF73".into()],
            tag2: vec!["E3BF25E2".into()],
            correct_code: "81522252839".into(),
            max_code_len: 11,
            erase_key: '*',
            commit_key: '#',
            languages: vec![
                LanguageKey {
                    key: '1',
                    name: "POLSKI".into(),
                    track: 5,
                },
                LanguageKey {
                    key: '2',
                    name: "SLASKI".into(),
                    track: 6,
                },
            ],
            compartment_key: '3',
            timings: Timings::default(),
        }
    }
}

impl PuzzleConfig {
    pub fn magnet_box() -> Self {
        Self {
            variant: Variant::MagnetBox,
            tag2: Vec::new(),
            languages: Vec::new(),
            ..Self::default()
        }
    }
}

/// Work for the satellite runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PuzzleAction {
    Send(Command, String),
    PlayTrack(u16),
    Show(Vec<String>),
    ClearDisplay,
    SetRelay(bool),
}

/// Compact state report carried by `status_update`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PuzzleSnapshot {
    pub stage: Stage,
    #[serde(with = "flag_bits")]
    pub flags: PuzzleFlags,
    pub entered: usize,
    pub stage_ms: u64,
    pub relay: bool,
    pub digits: DigitFrequency,
}

/// Payload of `code_entered`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeReport {
    pub code: String,
    pub correct: bool,
    pub entered_at: u64,
    #[serde(default)]
    pub stage_ms: u64,
}

const PROMPT_CODE: &str = "Numbers + #:";
const NOTICE_WRONG: &str = "Wrong numbers";
const PROMPT_TAG2: &str = "Present tag 2";
const PROMPT_MAGNET: &str = "Close the latch";
const PROMPT_COMPARTMENT: &str = "Pick compartment";
const NOTICE_OPEN: &str = "Compartment open";

pub struct PuzzleEngine {
    config: PuzzleConfig,
    stage: Stage,
    flags: PuzzleFlags,
    entered: String,
    stage_entered_at: u64,
    history: CodeHistory,
    digits: DigitFrequency,
    selection: KeyDebouncer,
    contact: ContactEdgeDetector,
    relay_on: bool,
    relay_release_at: Option<u64>,
    notice_until: Option<u64>,
    language: Option<String>,
}

impl PuzzleEngine {
    pub fn new(config: PuzzleConfig, now_ms: u64) -> Self {
        let t = config.timings.clone();
        Self {
            stage: config.variant.initial(),
            config,
            flags: PuzzleFlags::empty(),
            entered: String::new(),
            stage_entered_at: now_ms,
            history: CodeHistory::new(history::SATELLITE_HISTORY_CAPACITY),
            digits: DigitFrequency::default(),
            selection: KeyDebouncer::new(t.key_debounce_ms),
            contact: ContactEdgeDetector::new(t.contact_debounce_ms, t.contact_arming_ms),
            relay_on: false,
            relay_release_at: None,
            notice_until: None,
            language: None,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn flags(&self) -> PuzzleFlags {
        self.flags
    }

    pub fn entered(&self) -> &str {
        &self.entered
    }

    pub fn stage_entered_at(&self) -> u64 {
        self.stage_entered_at
    }

    pub fn history(&self) -> &CodeHistory {
        &self.history
    }

    pub fn digit_frequency(&self) -> &DigitFrequency {
        &self.digits
    }

    pub fn relay_on(&self) -> bool {
        self.relay_on
    }

    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    pub fn variant(&self) -> Variant {
        self.config.variant
    }

    pub fn snapshot(&self, now_ms: u64) -> PuzzleSnapshot {
        PuzzleSnapshot {
            stage: self.stage,
            flags: self.flags,
            entered: self.entered.len(),
            stage_ms: now_ms.saturating_sub(self.stage_entered_at),
            relay: self.relay_on,
            digits: self.digits,
        }
    }

    /// `status_update` carrying the current snapshot.
    pub fn status_action(&self, now_ms: u64) -> PuzzleAction {
        let json = serde_json::to_string(&self.snapshot(now_ms)).unwrap_or_default();
        PuzzleAction::Send(Command::StatusUpdate, json)
    }

    /// A tag was read. Fires only when the current stage expects that tag.
    pub fn on_tag(&mut self, tag: &str, now_ms: u64) -> Vec<PuzzleAction> {
        match self.stage {
            Stage::WaitingTag1
                if !self.flags.contains(PuzzleFlags::TAG1_USED)
                    && input::tag_matches(tag, &self.config.tag1) =>
            {
                self.flags.insert(PuzzleFlags::TAG1_USED);
                self.advance(now_ms);
                let mut out = vec![PuzzleAction::PlayTrack(TRACK_TAG1)];
                out.extend(self.engage_relay(self.config.timings.lock_hold_ms, now_ms));
                out.push(PuzzleAction::Show(vec![PROMPT_CODE.into()]));
                out.push(PuzzleAction::Send(Command::Tag1Detected, tag.trim().to_uppercase()));
                out.push(self.status_action(now_ms));
                out
            }
            Stage::WaitingTag2
                if self.flags.contains(PuzzleFlags::TAG2_ALLOWED)
                    && !self.flags.contains(PuzzleFlags::TAG2_USED)
                    && input::tag_matches(tag, &self.config.tag2) =>
            {
                self.flags.insert(PuzzleFlags::TAG2_USED);
                self.advance(now_ms);
                vec![
                    PuzzleAction::Show(self.language_menu()),
                    PuzzleAction::Send(Command::Tag2Detected, tag.trim().to_uppercase()),
                    self.status_action(now_ms),
                ]
            }
            _ => {
                log::debug!("tag {} ignored in {}", tag, self.stage);
                Vec::new()
            }
        }
    }

    /// A key was pressed on the keypad.
    pub fn on_key(&mut self, key: char, now_ms: u64) -> Vec<PuzzleAction> {
        match self.stage {
            Stage::KeypadActive => self.code_key(key, now_ms),
            Stage::LanguageSelect => self.language_key(key, now_ms),
            Stage::Completed if self.flags.contains(PuzzleFlags::LANGUAGE_CHOSEN) => {
                self.language_key(key, now_ms)
            }
            Stage::WaitingCompartment => self.compartment_key(key, now_ms),
            _ => Vec::new(),
        }
    }

    /// One contact sensor sample. Only the magnet stage listens.
    pub fn on_contact(&mut self, level: ContactLevel, now_ms: u64) -> Vec<PuzzleAction> {
        if self.stage != Stage::WaitingMagnet
            || !self.flags.contains(PuzzleFlags::MAGNET_ALLOWED)
            || self.flags.contains(PuzzleFlags::MAGNET_USED)
        {
            return Vec::new();
        }
        if !self.contact.sample(level, now_ms) {
            return Vec::new();
        }
        self.flags.insert(PuzzleFlags::MAGNET_USED);
        self.advance(now_ms);
        vec![
            PuzzleAction::Show(vec![PROMPT_COMPARTMENT.into()]),
            PuzzleAction::Send(Command::MagnetDetected, "closed".into()),
            self.status_action(now_ms),
        ]
    }

    /// Timed states: relay hold and the error notice.
    pub fn poll(&mut self, now_ms: u64) -> Vec<PuzzleAction> {
        let mut out = Vec::new();
        if self.relay_release_at.is_some_and(|t| now_ms >= t) {
            self.relay_release_at = None;
            self.relay_on = false;
            out.push(PuzzleAction::SetRelay(false));
        }
        if self.notice_until.is_some_and(|t| now_ms >= t) {
            self.notice_until = None;
            out.push(self.code_screen());
        }
        out
    }

    /// Back to the first stage with every flag cleared. History and digit counts stay.
    pub fn reset(&mut self, now_ms: u64) -> Vec<PuzzleAction> {
        log::info!("puzzle reset from {}", self.stage);
        self.flags = PuzzleFlags::empty();
        self.entered.clear();
        self.language = None;
        self.selection.clear();
        self.relay_on = false;
        self.relay_release_at = None;
        self.notice_until = None;
        self.enter(self.config.variant.initial(), now_ms);
        vec![
            PuzzleAction::SetRelay(false),
            PuzzleAction::ClearDisplay,
            self.status_action(now_ms),
        ]
    }

    /// Operator-initiated unlock.
    pub fn open_lock(&mut self, now_ms: u64) -> Vec<PuzzleAction> {
        log::info!("lock opened by operator");
        let mut out = self.engage_relay(self.config.timings.lock_hold_ms, now_ms);
        out.push(PuzzleAction::Send(Command::LockOpened, "panel_command".into()));
        out
    }

    /// Energize the relay for `hold_ms` without reporting back.
    pub fn relay_on_for(&mut self, hold_ms: u64, now_ms: u64) -> Vec<PuzzleAction> {
        self.engage_relay(hold_ms, now_ms)
    }

    fn engage_relay(&mut self, hold_ms: u64, now_ms: u64) -> Vec<PuzzleAction> {
        self.relay_release_at = Some(now_ms.saturating_add(hold_ms));
        if self.relay_on {
            return Vec::new();
        }
        self.relay_on = true;
        vec![PuzzleAction::SetRelay(true)]
    }

    fn advance(&mut self, now_ms: u64) {
        if let Some(next) = self.config.variant.next(self.stage) {
            self.enter(next, now_ms);
        }
    }

    fn enter(&mut self, stage: Stage, now_ms: u64) {
        log::info!("stage {} -> {}", self.stage, stage);
        self.stage = stage;
        self.stage_entered_at = now_ms;
        if stage == Stage::WaitingMagnet {
            self.contact.arm(now_ms);
        }
    }

    fn code_screen(&self) -> PuzzleAction {
        PuzzleAction::Show(vec![PROMPT_CODE.into(), self.entered.clone()])
    }

    fn language_menu(&self) -> Vec<String> {
        self.config
            .languages
            .iter()
            .map(|l| format!("{} - {}", l.key, l.name))
            .collect()
    }

    fn code_key(&mut self, key: char, now_ms: u64) -> Vec<PuzzleAction> {
        let mut out = vec![PuzzleAction::PlayTrack(TRACK_KEY)];
        if key.is_ascii_digit() {
            if self.entered.len() < self.config.max_code_len {
                self.entered.push(key);
                self.notice_until = None;
                out.push(self.code_screen());
            }
        } else if key == self.config.erase_key {
            if self.entered.pop().is_some() {
                self.notice_until = None;
                out.push(self.code_screen());
            }
        } else if key == self.config.commit_key && !self.entered.is_empty() {
            out.extend(self.commit_code(now_ms));
        }
        out
    }

    fn commit_code(&mut self, now_ms: u64) -> Vec<PuzzleAction> {
        let code = std::mem::take(&mut self.entered);
        let correct = code == self.config.correct_code;
        let report = CodeReport {
            code: code.clone(),
            correct,
            entered_at: now_ms,
            stage_ms: now_ms.saturating_sub(self.stage_entered_at),
        };
        self.history.push(CodeHistoryEntry {
            code: code.clone(),
            correct,
            entered_at: now_ms,
        });
        self.digits.record(&code);
        log::info!(
            "code {} entered: {}",
            code,
            if correct { "correct" } else { "wrong" }
        );
        let mut out = vec![PuzzleAction::Send(
            Command::CodeEntered,
            serde_json::to_string(&report).unwrap_or_default(),
        )];
        if correct {
            self.advance(now_ms);
            match self.stage {
                Stage::WaitingTag2 => {
                    self.flags.insert(PuzzleFlags::TAG2_ALLOWED);
                    out.push(PuzzleAction::Show(vec![PROMPT_TAG2.into()]));
                }
                Stage::WaitingMagnet => {
                    self.flags.insert(PuzzleFlags::MAGNET_ALLOWED);
                    out.push(PuzzleAction::Show(vec![PROMPT_MAGNET.into()]));
                }
                _ => {}
            }
            out.push(PuzzleAction::PlayTrack(TRACK_CODE_CORRECT));
            out.push(PuzzleAction::Send(Command::CodeCorrect, code));
            out.push(self.status_action(now_ms));
        } else {
            self.notice_until = Some(now_ms.saturating_add(self.config.timings.notice_ms));
            out.push(PuzzleAction::PlayTrack(TRACK_CODE_WRONG));
            out.push(PuzzleAction::Show(vec![NOTICE_WRONG.into()]));
            out.push(PuzzleAction::Send(Command::CodeIncorrect, code));
        }
        out
    }

    fn language_key(&mut self, key: char, now_ms: u64) -> Vec<PuzzleAction> {
        if !self.selection.accept(key, now_ms) {
            return Vec::new();
        }
        let Some(choice) = self.config.languages.iter().find(|l| l.key == key).cloned() else {
            return Vec::new();
        };
        log::info!("language {} selected", choice.name);
        self.language = Some(choice.name.clone());
        let mut out = vec![
            PuzzleAction::PlayTrack(choice.track),
            PuzzleAction::Send(Command::LanguageSelected, choice.name),
        ];
        if self.stage == Stage::LanguageSelect {
            self.flags.insert(PuzzleFlags::LANGUAGE_CHOSEN);
            self.advance(now_ms);
            out.push(self.status_action(now_ms));
        }
        out
    }

    fn compartment_key(&mut self, key: char, now_ms: u64) -> Vec<PuzzleAction> {
        if !self.selection.accept(key, now_ms) || key != self.config.compartment_key {
            return Vec::new();
        }
        self.flags.insert(PuzzleFlags::COMPARTMENT_OPENED);
        self.advance(now_ms);
        let mut out = self.engage_relay(self.config.timings.lock_hold_ms, now_ms);
        out.push(PuzzleAction::Show(vec![NOTICE_OPEN.into()]));
        out.push(PuzzleAction::Send(Command::LockOpened, "compartment".into()));
        out.push(self.status_action(now_ms));
        out
    }
}
