//! Narrow interfaces to the hardware a satellite drives. Electrical details live
//! behind these traits; the core only polls and commands.

use std::cell::{RefCell, RefMut};
use std::collections::VecDeque;
use std::rc::Rc;

use crate::puzzle::ContactLevel;

/// Highest volume the audio module accepts.
pub const MAX_VOLUME: u8 = 30;

/// Asynchronous report from the audio module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioEvent {
    Finished,
    Error(i32),
}

pub trait AudioPlayer {
    fn play(&mut self, track: u16);
    fn stop(&mut self);
    fn pause(&mut self);
    fn resume(&mut self);
    /// 0..=MAX_VOLUME; callers clamp.
    fn set_volume(&mut self, volume: u8);
    fn poll_event(&mut self) -> Option<AudioEvent>;
}

/// Line-based text display.
pub trait Display {
    fn show(&mut self, lines: &[String]);
    fn clear(&mut self);
}

pub trait Keypad {
    /// Key pressed since the last poll, if any.
    fn poll_key(&mut self) -> Option<char>;
}

pub trait TagReader {
    /// Identifier of a newly presented tag, if any.
    fn poll_tag(&mut self) -> Option<String>;
}

pub trait ContactSensor {
    fn level(&mut self) -> ContactLevel;
}

pub trait Relay {
    fn set(&mut self, on: bool);
}

pub trait PushButton {
    fn is_pressed(&mut self) -> bool;
}

/// Everything a satellite may have attached. Missing hardware is `None`.
#[derive(Default)]
pub struct Peripherals {
    pub audio: Option<Box<dyn AudioPlayer>>,
    pub display: Option<Box<dyn Display>>,
    pub keypad: Option<Box<dyn Keypad>>,
    pub tags: Option<Box<dyn TagReader>>,
    pub contact: Option<Box<dyn ContactSensor>>,
    pub relay: Option<Box<dyn Relay>>,
    pub button: Option<Box<dyn PushButton>>,
}

/// Scripted inputs and recorded outputs of a [`MockBoard`].
#[derive(Debug, Default)]
pub struct BoardState {
    pub keys: VecDeque<char>,
    pub tags: VecDeque<String>,
    pub contact: ContactLevel,
    pub button: bool,
    pub audio_events: VecDeque<AudioEvent>,
    pub played: Vec<u16>,
    pub stopped: usize,
    pub paused: bool,
    pub volume: Option<u8>,
    pub screen: Vec<String>,
    pub relay: bool,
    pub relay_changes: usize,
}

/// In-memory board implementing every peripheral trait over one shared state.
#[derive(Debug, Clone, Default)]
pub struct MockBoard(Rc<RefCell<BoardState>>);

impl MockBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// A full peripheral set backed by this board.
    pub fn peripherals(&self) -> Peripherals {
        Peripherals {
            audio: Some(Box::new(self.clone())),
            display: Some(Box::new(self.clone())),
            keypad: Some(Box::new(self.clone())),
            tags: Some(Box::new(self.clone())),
            contact: Some(Box::new(self.clone())),
            relay: Some(Box::new(self.clone())),
            button: Some(Box::new(self.clone())),
        }
    }

    pub fn state(&self) -> RefMut<'_, BoardState> {
        self.0.borrow_mut()
    }
}

impl AudioPlayer for MockBoard {
    fn play(&mut self, track: u16) {
        self.state().played.push(track);
    }
    fn stop(&mut self) {
        self.state().stopped += 1;
    }
    fn pause(&mut self) {
        self.state().paused = true;
    }
    fn resume(&mut self) {
        self.state().paused = false;
    }
    fn set_volume(&mut self, volume: u8) {
        self.state().volume = Some(volume);
    }
    fn poll_event(&mut self) -> Option<AudioEvent> {
        self.state().audio_events.pop_front()
    }
}

impl Display for MockBoard {
    fn show(&mut self, lines: &[String]) {
        self.state().screen = lines.to_vec();
    }
    fn clear(&mut self) {
        self.state().screen.clear();
    }
}

impl Keypad for MockBoard {
    fn poll_key(&mut self) -> Option<char> {
        self.state().keys.pop_front()
    }
}

impl TagReader for MockBoard {
    fn poll_tag(&mut self) -> Option<String> {
        self.state().tags.pop_front()
    }
}

impl ContactSensor for MockBoard {
    fn level(&mut self) -> ContactLevel {
        self.state().contact
    }
}

impl Relay for MockBoard {
    fn set(&mut self, on: bool) {
        let mut s = self.state();
        if s.relay != on {
            s.relay_changes += 1;
        }
        s.relay = on;
    }
}

impl PushButton for MockBoard {
    fn is_pressed(&mut self) -> bool {
        self.state().button
    }
}
