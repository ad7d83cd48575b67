//! Console stand-ins for the hardware: stdin lines become peripheral input or
//! operator commands, peripheral output goes to the log.

use std::cell::{RefCell, RefMut};
use std::collections::VecDeque;
use std::rc::Rc;

use puzzlenet_core::peripherals::{
    AudioEvent, AudioPlayer, ContactSensor, Display, Keypad, Peripherals, PushButton, Relay,
    TagReader,
};
use puzzlenet_core::puzzle::ContactLevel;

#[derive(Debug, Default)]
struct Inputs {
    keys: VecDeque<char>,
    tags: VecDeque<String>,
    contact: ContactLevel,
    button: bool,
    audio_events: VecDeque<AudioEvent>,
}

/// Shared input queue behind every console peripheral.
#[derive(Debug, Clone, Default)]
pub struct ConsoleBoard(Rc<RefCell<Inputs>>);

impl ConsoleBoard {
    pub fn new() -> Self {
        Self::default()
    }

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

    fn inputs(&self) -> RefMut<'_, Inputs> {
        self.0.borrow_mut()
    }

    pub fn feed(&self, input: BoardInput) {
        let mut i = self.inputs();
        match input {
            BoardInput::Tag(t) => i.tags.push_back(t),
            BoardInput::Keys(k) => i.keys.extend(k.chars()),
            BoardInput::Contact(level) => i.contact = level,
            BoardInput::Button(pressed) => i.button = pressed,
            BoardInput::Audio(e) => i.audio_events.push_back(e),
        }
    }
}

impl AudioPlayer for ConsoleBoard {
    fn play(&mut self, track: u16) {
        log::info!("[audio] play track {}", track);
    }
    fn stop(&mut self) {
        log::info!("[audio] stop");
    }
    fn pause(&mut self) {
        log::info!("[audio] pause");
    }
    fn resume(&mut self) {
        log::info!("[audio] resume");
    }
    fn set_volume(&mut self, volume: u8) {
        log::info!("[audio] volume {}", volume);
    }
    fn poll_event(&mut self) -> Option<AudioEvent> {
        self.inputs().audio_events.pop_front()
    }
}

impl Display for ConsoleBoard {
    fn show(&mut self, lines: &[String]) {
        log::info!("[display] {}", lines.join(" | "));
    }
    fn clear(&mut self) {
        log::info!("[display] (clear)");
    }
}

impl Keypad for ConsoleBoard {
    fn poll_key(&mut self) -> Option<char> {
        self.inputs().keys.pop_front()
    }
}

impl TagReader for ConsoleBoard {
    fn poll_tag(&mut self) -> Option<String> {
        self.inputs().tags.pop_front()
    }
}

impl ContactSensor for ConsoleBoard {
    fn level(&mut self) -> ContactLevel {
        self.inputs().contact
    }
}

impl Relay for ConsoleBoard {
    fn set(&mut self, on: bool) {
        log::info!("[relay] {}", if on { "on" } else { "off" });
    }
}

impl PushButton for ConsoleBoard {
    fn is_pressed(&mut self) -> bool {
        self.inputs().button
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardInput {
    Tag(String),
    Keys(String),
    Contact(ContactLevel),
    Button(bool),
    Audio(AudioEvent),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperatorCommand {
    Start(Option<String>),
    Pause,
    Resume,
    End(String),
    Play(String),
    Stop,
    Volume(i64),
    OpenLock(String),
    Reset(String),
    GetStatus(String),
    Restart(String),
    RestartAll,
    Status,
    Hint,
    Puzzle(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleInput {
    Board(BoardInput),
    Operator(OperatorCommand),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("unknown command {0:?}")]
    Unknown(String),
    #[error("{0} needs an argument")]
    MissingArgument(&'static str),
    #[error("bad argument {0:?}")]
    BadArgument(String),
}

pub const HELP: &str = "\
satellite: tag <id> | keys <keys> | contact open|closed | button down|up | audio finished|error <code>
coordinator: start [group] | pause | resume | end <status> | play <name> | stop | volume <n>
             open <sat> | reset <sat> | get <sat> | restart <sat> | restart-all
             status | hint | puzzle <sat>";

pub fn parse_line(line: &str) -> Result<ConsoleInput, ParseError> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((w, r)) => (w, r.trim()),
        None => (line, ""),
    };
    let arg = |name: &'static str| {
        if rest.is_empty() {
            Err(ParseError::MissingArgument(name))
        } else {
            Ok(rest.to_string())
        }
    };
    use BoardInput as B;
    use OperatorCommand as O;
    let input = match word {
        "tag" => ConsoleInput::Board(B::Tag(arg("tag")?)),
        "keys" => ConsoleInput::Board(B::Keys(arg("keys")?.replace(' ', ""))),
        "contact" => ConsoleInput::Board(B::Contact(match rest {
            "open" => ContactLevel::Open,
            "closed" => ContactLevel::Closed,
            other => return Err(ParseError::BadArgument(other.into())),
        })),
        "button" => ConsoleInput::Board(B::Button(match rest {
            "down" => true,
            "up" => false,
            other => return Err(ParseError::BadArgument(other.into())),
        })),
        "audio" => {
            let event = match rest.split_once(' ') {
                None if rest == "finished" => AudioEvent::Finished,
                Some(("error", code)) => AudioEvent::Error(
                    code.trim()
                        .parse()
                        .map_err(|_| ParseError::BadArgument(code.into()))?,
                ),
                _ => return Err(ParseError::BadArgument(rest.into())),
            };
            ConsoleInput::Board(B::Audio(event))
        }
        "start" => ConsoleInput::Operator(O::Start((!rest.is_empty()).then(|| rest.to_string()))),
        "pause" => ConsoleInput::Operator(O::Pause),
        "resume" => ConsoleInput::Operator(O::Resume),
        "end" => ConsoleInput::Operator(O::End(arg("end")?)),
        "play" => ConsoleInput::Operator(O::Play(arg("play")?)),
        "stop" => ConsoleInput::Operator(O::Stop),
        "volume" => ConsoleInput::Operator(O::Volume(
            arg("volume")?
                .parse()
                .map_err(|_| ParseError::BadArgument(rest.into()))?,
        )),
        "open" => ConsoleInput::Operator(O::OpenLock(arg("open")?)),
        "reset" => ConsoleInput::Operator(O::Reset(arg("reset")?)),
        "get" => ConsoleInput::Operator(O::GetStatus(arg("get")?)),
        "restart" => ConsoleInput::Operator(O::Restart(arg("restart")?)),
        "restart-all" => ConsoleInput::Operator(O::RestartAll),
        "status" => ConsoleInput::Operator(O::Status),
        "hint" => ConsoleInput::Operator(O::Hint),
        "puzzle" => ConsoleInput::Operator(O::Puzzle(arg("puzzle")?)),
        other => return Err(ParseError::Unknown(other.into())),
    };
    Ok(input)
}
